mod edns_subnet;
mod query_builder;
mod responses;

pub use edns_subnet::{append_client_subnet, client_subnet_of, DEFAULT_EDNS_PAYLOAD};
pub use query_builder::{build_query, parse_name, to_hickory_type};
pub use responses::{error_response, min_answer_ttl};
