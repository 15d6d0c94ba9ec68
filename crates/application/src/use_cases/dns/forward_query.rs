use crate::ports::{DnsClient, ExchangeContext};
use crate::services::error_response;
use hickory_proto::op::{Message, ResponseCode};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Relays an inbound query to the bound client. Never fails: upstream
/// errors become a SERVFAIL for the one requester.
pub struct ForwardQueryUseCase {
    client: Arc<dyn DnsClient>,
    timeout: Duration,
}

impl ForwardQueryUseCase {
    pub fn new(client: Arc<dyn DnsClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn upstream(&self) -> &str {
        self.client.url()
    }

    pub async fn execute(&self, query: &Message) -> Message {
        self.execute_with_cancellation(query, CancellationToken::new())
            .await
    }

    pub async fn execute_with_cancellation(
        &self,
        query: &Message,
        cancel: CancellationToken,
    ) -> Message {
        let ctx = ExchangeContext::with_cancellation(self.timeout, cancel);

        match self.client.exchange(&ctx, query).await {
            Ok(mut answer) => {
                answer.set_id(query.id());
                if answer.queries().is_empty() {
                    answer.add_queries(query.queries().iter().cloned());
                }
                debug!(
                    id = query.id(),
                    upstream = %self.client.url(),
                    rcode = %answer.response_code(),
                    "Query forwarded"
                );
                answer
            }
            Err(e) => {
                let name = query
                    .queries()
                    .first()
                    .map(|q| q.name().to_string())
                    .unwrap_or_default();
                warn!(error = %e, domain = %name, upstream = %self.client.url(), "Upstream exchange failed");
                error_response(query, ResponseCode::ServFail)
            }
        }
    }
}
