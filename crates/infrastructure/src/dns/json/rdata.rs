//! Text renderings of record data used by the JSON resolution API.
//!
//! Only A, AAAA, CNAME, NS, PTR, MX, SRV, SOA and TXT are supported. Records
//! of any other type are left out of JSON documents and skipped when a
//! document is turned back into a message.

use dohgate_domain::DomainError;
use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, NS, PTR, SOA, SRV, TXT};
use hickory_proto::rr::{Name, RData, RecordType};
use std::net::{Ipv4Addr, Ipv6Addr};

pub fn is_supported(record_type: RecordType) -> bool {
    matches!(
        record_type,
        RecordType::A
            | RecordType::AAAA
            | RecordType::CNAME
            | RecordType::NS
            | RecordType::PTR
            | RecordType::MX
            | RecordType::SRV
            | RecordType::SOA
            | RecordType::TXT
    )
}

pub fn render(rdata: &RData) -> Option<String> {
    let text = match rdata {
        RData::A(a) => a.0.to_string(),
        RData::AAAA(aaaa) => aaaa.0.to_string(),
        RData::CNAME(name) => name.0.to_string(),
        RData::NS(name) => name.0.to_string(),
        RData::PTR(name) => name.0.to_string(),
        RData::MX(mx) => format!("{} {}", mx.preference(), mx.exchange()),
        RData::SRV(srv) => format!(
            "{} {} {} {}",
            srv.priority(),
            srv.weight(),
            srv.port(),
            srv.target()
        ),
        RData::SOA(soa) => format!(
            "{} {} {} {} {} {} {}",
            soa.mname(),
            soa.rname(),
            soa.serial(),
            soa.refresh(),
            soa.retry(),
            soa.expire(),
            soa.minimum()
        ),
        RData::TXT(txt) => txt
            .txt_data()
            .iter()
            .map(|chunk| quote(&String::from_utf8_lossy(chunk)))
            .collect::<Vec<_>>()
            .join(" "),
        _ => return None,
    };
    Some(text)
}

/// Parses `data` as record data of `record_type`.
///
/// `None` for unsupported types; `Some(Err)` when a supported type has
/// malformed data.
pub fn parse(record_type: RecordType, data: &str) -> Option<Result<RData, DomainError>> {
    if !is_supported(record_type) {
        return None;
    }
    Some(parse_supported(record_type, data.trim()))
}

fn parse_supported(record_type: RecordType, data: &str) -> Result<RData, DomainError> {
    let rdata = match record_type {
        RecordType::A => RData::A(A(data.parse::<Ipv4Addr>().map_err(|e| bad(data, e))?)),
        RecordType::AAAA => RData::AAAA(AAAA(data.parse::<Ipv6Addr>().map_err(|e| bad(data, e))?)),
        RecordType::CNAME => RData::CNAME(CNAME(parse_name(data)?)),
        RecordType::NS => RData::NS(NS(parse_name(data)?)),
        RecordType::PTR => RData::PTR(PTR(parse_name(data)?)),
        RecordType::MX => {
            let [preference, exchange] = fields::<2>(data)?;
            RData::MX(MX::new(number(preference)?, parse_name(exchange)?))
        }
        RecordType::SRV => {
            let [priority, weight, port, target] = fields::<4>(data)?;
            RData::SRV(SRV::new(
                number(priority)?,
                number(weight)?,
                number(port)?,
                parse_name(target)?,
            ))
        }
        RecordType::SOA => {
            let [mname, rname, serial, refresh, retry, expire, minimum] = fields::<7>(data)?;
            RData::SOA(SOA::new(
                parse_name(mname)?,
                parse_name(rname)?,
                number(serial)?,
                number(refresh)?,
                number(retry)?,
                number(expire)?,
                number(minimum)?,
            ))
        }
        RecordType::TXT => RData::TXT(TXT::new(unquote_all(data))),
        other => {
            return Err(DomainError::InvalidJson(format!(
                "record type {} has no text form",
                other
            )))
        }
    };
    Ok(rdata)
}

fn bad(data: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::InvalidJson(format!("bad record data '{}': {}", data, err))
}

fn parse_name(text: &str) -> Result<Name, DomainError> {
    let mut name = Name::from_utf8(text).map_err(|e| bad(text, e))?;
    name.set_fqdn(true);
    Ok(name)
}

fn number<T: std::str::FromStr>(text: &str) -> Result<T, DomainError>
where
    T::Err: std::fmt::Display,
{
    text.parse::<T>().map_err(|e| bad(text, e))
}

fn fields<const N: usize>(data: &str) -> Result<[&str; N], DomainError> {
    let parts: Vec<&str> = data.split_whitespace().collect();
    parts
        .try_into()
        .map_err(|_| bad(data, format!("expected {} fields", N)))
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Splits `"a" "b c"` into its character-strings. Text without any quotes is
/// taken as a single string.
fn unquote_all(data: &str) -> Vec<String> {
    if !data.starts_with('"') {
        return vec![data.to_string()];
    }

    let mut strings = Vec::new();
    let mut chars = data.chars();
    while let Some(c) = chars.next() {
        if c != '"' {
            continue;
        }
        let mut current = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                }
                '"' => break,
                c => current.push(c),
            }
        }
        strings.push(current);
    }
    strings
}
