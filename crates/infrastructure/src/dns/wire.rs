//! DNS wire format helpers shared by the wire and RFC 8484 drivers.

use dohgate_domain::DomainError;
use hickory_proto::op::Message;
use hickory_proto::serialize::binary::BinEncodable;

pub const DNS_HEADER_LEN: usize = 12;

/// Payload limit assumed for requesters that send no OPT record (RFC 1035 §4.2.1).
pub const MAX_UDP_PAYLOAD_NO_EDNS: usize = 512;

pub const MAX_TCP_MESSAGE_SIZE: usize = 65535;

const RCODE_FORMERR: u8 = 1;

pub fn encode(message: &Message) -> Result<Vec<u8>, DomainError> {
    message
        .to_vec()
        .map_err(|e| DomainError::InvalidDnsMessage(format!("Failed to encode message: {}", e)))
}

pub fn decode(bytes: &[u8]) -> Result<Message, DomainError> {
    Message::from_vec(bytes)
        .map_err(|e| DomainError::InvalidDnsMessage(format!("Failed to parse message: {}", e)))
}

pub fn header_id(bytes: &[u8]) -> Option<u16> {
    (bytes.len() >= 2).then(|| u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Rejects a response whose transaction id differs from the query's.
pub fn validate_response_id(query: &[u8], response: &[u8], server: &str) -> Result<(), DomainError> {
    let (Some(query_id), Some(response_id)) = (header_id(query), header_id(response)) else {
        return Err(DomainError::InvalidDnsMessage(format!(
            "Message from {} too short to carry an id",
            server
        )));
    };

    if query_id != response_id {
        return Err(DomainError::InvalidDnsMessage(format!(
            "DNS id mismatch from {}: sent {:#06x}, got {:#06x}",
            server, query_id, response_id
        )));
    }

    Ok(())
}

/// FORMERR reply built from the raw header of an undecodable query.
///
/// Returns `None` when the datagram is too short to carry a header; such
/// packets are dropped without reply.
pub fn formerr_for_raw(query: &[u8]) -> Option<Vec<u8>> {
    if query.len() < DNS_HEADER_LEN {
        return None;
    }

    let mut reply = vec![0u8; DNS_HEADER_LEN];
    reply[0] = query[0];
    reply[1] = query[1];
    // QR set, opcode and RD copied from the query.
    reply[2] = 0x80 | (query[2] & 0x79);
    reply[3] = RCODE_FORMERR;
    Some(reply)
}

/// Largest UDP reply the requester accepts, from its OPT record or the classic 512.
pub fn requester_payload_limit(query: &Message) -> usize {
    query
        .extensions()
        .as_ref()
        .map(|edns| usize::from(edns.max_payload()).max(MAX_UDP_PAYLOAD_NO_EDNS))
        .unwrap_or(MAX_UDP_PAYLOAD_NO_EDNS)
}

/// Encodes `response` for a UDP reply of at most `limit` bytes. Oversized
/// responses lose their record sections and get the TC bit instead.
pub fn encode_for_udp(response: &Message, limit: usize) -> Result<Vec<u8>, DomainError> {
    let bytes = encode(response)?;
    if bytes.len() <= limit {
        return Ok(bytes);
    }

    let mut truncated = response.clone();
    truncated.take_answers();
    truncated.take_name_servers();
    truncated.take_additionals();
    truncated.set_truncated(true);
    encode(&truncated)
}
