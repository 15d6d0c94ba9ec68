//! DNS message ⇄ JSON document, in the shape of the public JSON resolution API.
//!
//! The JSON form never carries a transaction id or the OPT record, so going
//! back to a message synthesizes a fresh envelope.

pub mod rdata;

use dohgate_application::services::client_subnet_of;
use dohgate_domain::DomainError;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, Record, RecordType};
use serde::{Deserialize, Serialize};

pub const DNS_JSON_CONTENT_TYPE: &str = "application/dns-json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonMessage {
    #[serde(rename = "Status")]
    pub status: u16,
    #[serde(rename = "TC", default)]
    pub tc: bool,
    #[serde(rename = "RD", default)]
    pub rd: bool,
    #[serde(rename = "RA", default)]
    pub ra: bool,
    #[serde(rename = "AD", default)]
    pub ad: bool,
    #[serde(rename = "CD", default)]
    pub cd: bool,
    #[serde(rename = "Question", default)]
    pub question: Vec<JsonQuestion>,
    #[serde(rename = "Answer", default, skip_serializing_if = "Vec::is_empty")]
    pub answer: Vec<JsonRecord>,
    #[serde(rename = "Authority", default, skip_serializing_if = "Vec::is_empty")]
    pub authority: Vec<JsonRecord>,
    #[serde(rename = "Comment", default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edns_client_subnet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonQuestion {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: u16,
    #[serde(rename = "TTL")]
    pub ttl: u32,
    pub data: String,
}

impl JsonRecord {
    fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            name: record.name().to_string(),
            record_type: record.record_type().into(),
            ttl: record.ttl(),
            data: rdata::render(record.data())?,
        })
    }

    fn to_record(&self) -> Option<Result<Record, DomainError>> {
        let record_type: RecordType = self.record_type.into();
        let data = rdata::parse(record_type, &self.data)?;
        Some(data.and_then(|data| {
            Ok(Record::from_rdata(json_name(&self.name)?, self.ttl, data))
        }))
    }
}

impl JsonMessage {
    /// JSON view of `answer`, with the question and client subnet taken from `question`.
    pub fn from_answer(question: &Message, answer: &Message) -> Self {
        Self {
            status: answer.response_code().into(),
            tc: answer.truncated(),
            rd: answer.recursion_desired(),
            ra: answer.recursion_available(),
            ad: answer.authentic_data(),
            cd: answer.checking_disabled(),
            question: question
                .queries()
                .iter()
                .map(|q| JsonQuestion {
                    name: q.name().to_string(),
                    record_type: q.query_type().into(),
                })
                .collect(),
            answer: answer.answers().iter().filter_map(JsonRecord::from_record).collect(),
            authority: answer
                .name_servers()
                .iter()
                .filter_map(JsonRecord::from_record)
                .collect(),
            comment: None,
            edns_client_subnet: client_subnet_of(question).map(|s| s.to_string()),
        }
    }

    /// Rebuilds a response message with a fresh id. Records of unsupported
    /// types are skipped.
    pub fn into_message(self) -> Result<Message, DomainError> {
        let rcode: ResponseCode = self.status.into();

        let mut message = Message::new();
        message
            .set_id(fastrand::u16(..))
            .set_message_type(MessageType::Response)
            .set_op_code(OpCode::Query)
            .set_truncated(self.tc)
            .set_recursion_desired(self.rd)
            .set_recursion_available(self.ra)
            .set_authentic_data(self.ad)
            .set_checking_disabled(self.cd)
            .set_response_code(rcode);

        for q in &self.question {
            let mut query = Query::query(json_name(&q.name)?, q.record_type.into());
            query.set_query_class(DNSClass::IN);
            message.add_query(query);
        }
        for record in self.answer.iter().filter_map(JsonRecord::to_record) {
            message.add_answer(record?);
        }
        for record in self.authority.iter().filter_map(JsonRecord::to_record) {
            message.add_name_server(record?);
        }

        Ok(message)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DomainError> {
        serde_json::from_slice(bytes).map_err(|e| DomainError::InvalidJson(e.to_string()))
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, DomainError> {
        serde_json::to_vec(self).map_err(|e| DomainError::InvalidJson(e.to_string()))
    }

    pub fn to_string_pretty(&self) -> Result<String, DomainError> {
        serde_json::to_string_pretty(self).map_err(|e| DomainError::InvalidJson(e.to_string()))
    }
}

fn json_name(text: &str) -> Result<Name, DomainError> {
    let mut name = Name::from_utf8(text)
        .map_err(|e| DomainError::InvalidJson(format!("bad name '{}': {}", text, e)))?;
    name.set_fqdn(true);
    Ok(name)
}
