use super::{EcsSubnet, RecordType};
use std::sync::Arc;

/// A one-shot lookup request: name, type and an optional client subnet.
#[derive(Debug, Clone)]
pub struct DnsQuery {
    pub domain: Arc<str>,
    pub record_type: RecordType,
    pub subnet: Option<EcsSubnet>,
}

impl DnsQuery {
    pub fn new(domain: impl Into<Arc<str>>, record_type: RecordType) -> Self {
        Self {
            domain: domain.into(),
            record_type,
            subnet: None,
        }
    }

    pub fn with_subnet(mut self, subnet: EcsSubnet) -> Self {
        self.subnet = Some(subnet);
        self
    }
}
