use async_trait::async_trait;
use dohgate_domain::DomainError;
use hickory_proto::op::Message;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation signal carried into a single exchange.
#[derive(Debug, Clone)]
pub struct ExchangeContext {
    deadline: Instant,
    cancel: CancellationToken,
}

impl ExchangeContext {
    pub fn new(timeout: Duration) -> Self {
        Self::with_cancellation(timeout, CancellationToken::new())
    }

    pub fn with_cancellation(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancel,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Same cancellation, deadline pulled in to at most `timeout` from now.
    pub fn narrowed(&self, timeout: Duration) -> Self {
        Self {
            deadline: self.deadline.min(Instant::now() + timeout),
            cancel: self.cancel.clone(),
        }
    }

    /// Drives `fut` until it completes, the deadline passes or the caller cancels.
    /// Dropping the future on either of the latter tears down its I/O.
    pub async fn run<T, F>(&self, server: &str, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DomainError::Cancelled),
            result = tokio::time::timeout_at(self.deadline, fut) => match result {
                Ok(inner) => inner,
                Err(_) => Err(DomainError::TransportTimeout {
                    server: server.to_string(),
                }),
            },
        }
    }
}

/// Outbound capability: send one DNS message upstream and return the answer.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait DnsClient: Send + Sync {
    /// Identifies the upstream in logs and CLI output.
    fn url(&self) -> &str;

    async fn exchange(&self, ctx: &ExchangeContext, query: &Message) -> Result<Message, DomainError>;
}
