use super::http::{build_http_client, fetch_body};
use crate::dns::json::{JsonMessage, DNS_JSON_CONTENT_TYPE};
use async_trait::async_trait;
use dohgate_application::ports::{DnsClient, ExchangeContext};
use dohgate_application::services::client_subnet_of;
use dohgate_domain::DomainError;
use hickory_proto::op::Message;
use std::time::Duration;
use tracing::debug;

/// Client for the JSON resolution API (`GET /resolve?name=&type=`).
pub struct GoogleClient {
    url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl GoogleClient {
    pub fn new(url: &str, insecure: bool, timeout: Duration) -> Result<Self, DomainError> {
        Ok(Self {
            url: url.to_string(),
            http: build_http_client(insecure, timeout)?,
            timeout,
        })
    }

    fn query_params(query: &Message) -> Result<Vec<(&'static str, String)>, DomainError> {
        let question = query
            .queries()
            .first()
            .ok_or_else(|| DomainError::InvalidDnsMessage("query has no question".to_string()))?;

        let mut params = vec![
            ("name", question.name().to_string()),
            ("type", u16::from(question.query_type()).to_string()),
        ];
        if query.checking_disabled() {
            params.push(("cd", "1".to_string()));
        }
        if let Some(subnet) = client_subnet_of(query) {
            params.push(("edns_client_subnet", subnet.to_string()));
        }
        Ok(params)
    }

    async fn fetch(&self, query: &Message) -> Result<Message, DomainError> {
        let params = Self::query_params(query)?;
        let request = self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, DNS_JSON_CONTENT_TYPE)
            .query(&params);

        let body = fetch_body(&self.url, request).await?;
        let document = JsonMessage::from_slice(&body)?;

        let mut answer = document.into_message()?;
        answer.set_id(query.id());
        if answer.queries().is_empty() {
            answer.add_queries(query.queries().iter().cloned());
        }
        Ok(answer)
    }
}

#[async_trait]
impl DnsClient for GoogleClient {
    fn url(&self) -> &str {
        &self.url
    }

    async fn exchange(&self, ctx: &ExchangeContext, query: &Message) -> Result<Message, DomainError> {
        let ctx = ctx.narrowed(self.timeout);
        let answer = ctx.run(&self.url, self.fetch(query)).await?;

        debug!(url = %self.url, answers = answer.answers().len(), "JSON exchange complete");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dohgate_application::services::{append_client_subnet, build_query};
    use dohgate_domain::RecordType;

    #[test]
    fn test_query_params_numeric_type_and_subnet() {
        let mut query = build_query("example.com", RecordType::AAAA).unwrap();
        append_client_subnet(&mut query, &"203.0.113.9/24".parse().unwrap());

        let params = GoogleClient::query_params(&query).unwrap();

        assert_eq!(
            params,
            vec![
                ("name", "example.com.".to_string()),
                ("type", "28".to_string()),
                ("edns_client_subnet", "203.0.113.0/24".to_string()),
            ]
        );
    }
}
