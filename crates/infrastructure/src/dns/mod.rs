pub mod client;
pub mod json;
pub mod server;
pub mod tls;
pub mod transport;
pub mod wire;

pub use client::{create_client, Client};
pub use server::{create_service, Service};
