use dohgate_domain::{DomainError, RecordType};
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name};

pub fn to_hickory_type(record_type: RecordType) -> hickory_proto::rr::RecordType {
    record_type.to_u16().into()
}

/// Parses a user supplied name, treating it as fully qualified.
pub fn parse_name(domain: &str) -> Result<Name, DomainError> {
    let mut name = Name::from_utf8(domain.trim())
        .map_err(|e| DomainError::InvalidDomainName(format!("'{}': {}", domain, e)))?;
    name.set_fqdn(true);
    Ok(name)
}

/// Standard recursive query: random id, RD set, single IN question.
pub fn build_query(domain: &str, record_type: RecordType) -> Result<Message, DomainError> {
    let mut query = Query::query(parse_name(domain)?, to_hickory_type(record_type));
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new();
    message
        .set_id(fastrand::u16(..))
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(query);

    Ok(message)
}
