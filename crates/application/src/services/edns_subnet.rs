use dohgate_domain::EcsSubnet;
use hickory_proto::op::{Edns, Message};
use hickory_proto::rr::rdata::opt::{ClientSubnet, EdnsCode, EdnsOption};

/// UDP payload size advertised when a fresh OPT record has to be created.
pub const DEFAULT_EDNS_PAYLOAD: u16 = 1232;

/// Attaches a Client-Subnet option to `message`.
///
/// An existing OPT record is reused with its other options intact; only a
/// previous Client-Subnet option is replaced, so the message never carries two.
pub fn append_client_subnet(message: &mut Message, subnet: &EcsSubnet) {
    let option = EdnsOption::Subnet(ClientSubnet::new(subnet.addr(), subnet.prefix(), 0));

    let edns = message.extensions_mut().get_or_insert_with(|| {
        let mut edns = Edns::new();
        edns.set_max_payload(DEFAULT_EDNS_PAYLOAD);
        edns
    });

    let options = edns.options_mut();
    options.remove(EdnsCode::Subnet);
    options.insert(option);
}

/// Client-Subnet carried by `message`, if any.
pub fn client_subnet_of(message: &Message) -> Option<EcsSubnet> {
    let edns = message.extensions().as_ref()?;
    match edns.options().get(EdnsCode::Subnet)? {
        EdnsOption::Subnet(subnet) => EcsSubnet::new(subnet.addr(), subnet.source_prefix()).ok(),
        _ => None,
    }
}
