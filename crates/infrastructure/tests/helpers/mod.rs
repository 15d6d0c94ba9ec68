#![allow(dead_code)]
pub mod dns_server_mock;
pub mod http_upstream_mock;
pub mod static_client;

pub use dns_server_mock::{answer_for, MockBehavior, MockDnsServer, MOCK_ANSWER};
pub use http_upstream_mock::MockHttpUpstream;
pub use static_client::StaticClient;
