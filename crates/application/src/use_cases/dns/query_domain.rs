use crate::ports::{DnsClient, ExchangeContext};
use crate::services::{append_client_subnet, build_query};
use dohgate_domain::{DnsQuery, DomainError};
use hickory_proto::op::Message;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Result of a one-shot lookup: the query as sent and what came back.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub query: Message,
    pub answer: Message,
    pub elapsed: Duration,
    pub server: String,
}

/// Resolves a single name through the configured upstream.
pub struct QueryDomainUseCase {
    client: Arc<dyn DnsClient>,
    timeout: Duration,
}

impl QueryDomainUseCase {
    pub fn new(client: Arc<dyn DnsClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn execute(&self, request: &DnsQuery) -> Result<QueryOutcome, DomainError> {
        let mut query = build_query(&request.domain, request.record_type)?;
        if let Some(subnet) = &request.subnet {
            append_client_subnet(&mut query, subnet);
        }

        let ctx = ExchangeContext::new(self.timeout);
        let start = Instant::now();
        let answer = self.client.exchange(&ctx, &query).await?;
        let elapsed = start.elapsed();

        debug!(
            domain = %request.domain,
            record_type = %request.record_type,
            server = %self.client.url(),
            rcode = %answer.response_code(),
            answers = answer.answers().len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Query resolved"
        );

        Ok(QueryOutcome {
            query,
            answer,
            elapsed,
            server: self.client.url().to_string(),
        })
    }
}
