//! Renderings of a one-shot lookup for the terminal.

use chrono::{DateTime, Local};
use dohgate_application::services::client_subnet_of;
use dohgate_application::use_cases::QueryOutcome;
use dohgate_domain::DomainError;
use dohgate_infrastructure::dns::json::JsonMessage;
use hickory_proto::op::{Message, MessageType};
use hickory_proto::rr::{RData, Record};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Dig,
    Short,
    Json,
}

pub fn render(outcome: &QueryOutcome, format: OutputFormat) -> Result<String, DomainError> {
    match format {
        OutputFormat::Dig => Ok(render_dig(outcome, Local::now())),
        OutputFormat::Short => Ok(render_short(&outcome.answer)),
        OutputFormat::Json => JsonMessage::from_answer(&outcome.query, &outcome.answer).to_string_pretty(),
    }
}

/// Addresses and CNAME targets of the answer section, one per line.
fn render_short(answer: &Message) -> String {
    answer
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            RData::A(a) => Some(a.0.to_string()),
            RData::AAAA(aaaa) => Some(aaaa.0.to_string()),
            RData::CNAME(target) => Some(target.0.to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_dig(outcome: &QueryOutcome, when: DateTime<Local>) -> String {
    let m = &outcome.answer;
    let mut out = String::new();

    let _ = writeln!(
        out,
        ";; ->>HEADER<<- opcode: {}, status: {}, id: {}",
        opcode_name(m),
        rcode_name(m),
        m.id()
    );
    let _ = writeln!(
        out,
        ";; flags:{}; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
        flags(m),
        m.queries().len(),
        m.answers().len(),
        m.name_servers().len(),
        m.additionals().len() + usize::from(m.extensions().is_some())
    );

    if let Some(edns) = m.extensions() {
        let _ = writeln!(out, "\n;; OPT PSEUDOSECTION:");
        let _ = writeln!(out, "; EDNS: version: {}, udp: {}", edns.version(), edns.max_payload());
        if let Some(subnet) = client_subnet_of(m) {
            let _ = writeln!(out, "; CLIENT-SUBNET: {}", subnet);
        }
    }

    let _ = writeln!(out, "\n;; QUESTION SECTION:");
    for q in m.queries() {
        let _ = writeln!(out, ";{}\t\t{}\t{}", q.name(), q.query_class(), q.query_type());
    }

    for (title, records) in [
        ("ANSWER", m.answers()),
        ("AUTHORITY", m.name_servers()),
        ("ADDITIONAL", m.additionals()),
    ] {
        if records.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n;; {} SECTION:", title);
        for record in records {
            let _ = writeln!(out, "{}", record_line(record));
        }
    }

    let _ = writeln!(out, "\n;; Query time: {} msec", outcome.elapsed.as_millis());
    let _ = writeln!(out, ";; SERVER: {}", outcome.server);
    let _ = writeln!(out, ";; WHEN: {}", when.format("%a %b %e %H:%M:%S %Z %Y"));
    out
}

fn record_line(record: &Record) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        record.name(),
        record.ttl(),
        record.dns_class(),
        record.record_type(),
        record.data()
    )
}

fn flags(m: &Message) -> String {
    [
        (m.message_type() == MessageType::Response, "qr"),
        (m.authoritative(), "aa"),
        (m.truncated(), "tc"),
        (m.recursion_desired(), "rd"),
        (m.recursion_available(), "ra"),
        (m.authentic_data(), "ad"),
        (m.checking_disabled(), "cd"),
    ]
    .iter()
    .filter(|(set, _)| *set)
    .map(|(_, name)| format!(" {}", name))
    .collect()
}

fn opcode_name(m: &Message) -> String {
    match u8::from(m.op_code()) {
        0 => "QUERY".to_string(),
        2 => "STATUS".to_string(),
        4 => "NOTIFY".to_string(),
        5 => "UPDATE".to_string(),
        other => format!("OPCODE{}", other),
    }
}

fn rcode_name(m: &Message) -> String {
    match u16::from(m.response_code()) {
        0 => "NOERROR".to_string(),
        1 => "FORMERR".to_string(),
        2 => "SERVFAIL".to_string(),
        3 => "NXDOMAIN".to_string(),
        4 => "NOTIMP".to_string(),
        5 => "REFUSED".to_string(),
        other => format!("RCODE{}", other),
    }
}
