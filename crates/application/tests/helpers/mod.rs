#![allow(dead_code)]

mod mock_client;

pub use mock_client::{answer_for, MockDnsClient};
