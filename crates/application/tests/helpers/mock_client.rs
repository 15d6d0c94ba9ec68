use async_trait::async_trait;
use dohgate_application::ports::{DnsClient, ExchangeContext};
use dohgate_domain::DomainError;
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers every question with a fixed A record, optionally after a delay.
#[derive(Clone)]
pub struct MockDnsClient {
    url: String,
    address: Ipv4Addr,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    failure: Arc<Mutex<Option<DomainError>>>,
    seen: Arc<Mutex<Vec<Message>>>,
}

impl MockDnsClient {
    pub fn new(address: Ipv4Addr) -> Self {
        Self {
            url: "mock://upstream".to_string(),
            address,
            delays: Arc::new(Mutex::new(HashMap::new())),
            failure: Arc::new(Mutex::new(None)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn delay(&self, name: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(name.to_string(), delay);
    }

    pub fn fail_with(&self, error: DomainError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn seen(&self) -> Vec<Message> {
        self.seen.lock().unwrap().clone()
    }
}

pub fn answer_for(query: &Message, address: Ipv4Addr) -> Message {
    let mut answer = Message::new();
    answer
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_recursion_desired(true)
        .set_recursion_available(true)
        .set_response_code(ResponseCode::NoError)
        .add_queries(query.queries().iter().cloned());
    if let Some(q) = query.queries().first() {
        answer.add_answer(Record::from_rdata(q.name().clone(), 300, RData::A(A(address))));
    }
    answer
}

#[async_trait]
impl DnsClient for MockDnsClient {
    fn url(&self) -> &str {
        &self.url
    }

    async fn exchange(&self, ctx: &ExchangeContext, query: &Message) -> Result<Message, DomainError> {
        self.seen.lock().unwrap().push(query.clone());

        let name = query
            .queries()
            .first()
            .map(|q| q.name().to_string())
            .unwrap_or_default();
        let delay = self.delays.lock().unwrap().get(&name).copied();
        let failure = self.failure.lock().unwrap().clone();
        let address = self.address;
        let query = query.clone();

        ctx.run(&self.url, async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match failure {
                Some(e) => Err(e),
                None => Ok(answer_for(&query, address)),
            }
        })
        .await
    }
}
