//! RFC 8484 client.
//!
//! Queries go out as `GET ?dns=<base64url>` with the id zeroed (§4.1) so
//! identical questions share HTTP cache entries. The caller's id is put back
//! on the answer.

use super::http::{build_http_client, fetch_body};
use crate::dns::wire::{decode, encode};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use dohgate_application::ports::{DnsClient, ExchangeContext};
use dohgate_domain::DomainError;
use hickory_proto::op::Message;
use std::time::Duration;
use tracing::debug;

pub const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

pub struct Rfc8484Client {
    url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl Rfc8484Client {
    pub fn new(url: &str, insecure: bool, timeout: Duration) -> Result<Self, DomainError> {
        Ok(Self {
            url: url.to_string(),
            http: build_http_client(insecure, timeout)?,
            timeout,
        })
    }

    pub fn encode_query(query: &Message) -> Result<String, DomainError> {
        let mut wire_query = query.clone();
        wire_query.set_id(0);
        Ok(URL_SAFE_NO_PAD.encode(encode(&wire_query)?))
    }

    async fn fetch(&self, query: &Message) -> Result<Message, DomainError> {
        let request = self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, DNS_MESSAGE_CONTENT_TYPE)
            .query(&[("dns", Self::encode_query(query)?)]);

        let body = fetch_body(&self.url, request).await?;
        let mut answer = decode(&body)?;
        answer.set_id(query.id());
        Ok(answer)
    }
}

#[async_trait]
impl DnsClient for Rfc8484Client {
    fn url(&self) -> &str {
        &self.url
    }

    async fn exchange(&self, ctx: &ExchangeContext, query: &Message) -> Result<Message, DomainError> {
        let ctx = ctx.narrowed(self.timeout);
        let answer = ctx.run(&self.url, self.fetch(query)).await?;

        debug!(url = %self.url, answers = answer.answers().len(), "RFC 8484 exchange complete");
        Ok(answer)
    }
}
