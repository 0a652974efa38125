//! Encoding of ICMP echo requests and decoding of whatever comes back.
//!
//! Requests are written exactly as RFC 792 (ICMPv4) and RFC 4443 (ICMPv6)
//! describe them. Responses read from an IPv4 raw socket still carry their
//! IP header, those from an IPv6 raw socket start at the ICMPv6 header.

use std::io::{Cursor};

use byteorder::{

    WriteBytesExt,
    ReadBytesExt,
    BigEndian,
};

use super::{

    target::{AddressFamily},
    error::{TraceError},
};

pub const ICMP_HEADER_SIZE: usize = 8;
pub const IPV4_MIN_HEADER_SIZE: usize = 20;
pub const IPV6_HEADER_SIZE: usize = 40;

pub const ICMPV4_ECHO_REPLY: u8 = 0;
pub const ICMPV4_ECHO_REQUEST: u8 = 8;
pub const ICMPV4_TIME_EXCEEDED: u8 = 11;

pub const ICMPV6_TIME_EXCEEDED: u8 = 3;
pub const ICMPV6_ECHO_REQUEST: u8 = 128;
pub const ICMPV6_ECHO_REPLY: u8 = 129;

const PROTOCOL_ICMPV4: u8 = 1;
const PROTOCOL_ICMPV6: u8 = 58;

/// Identifier and sequence of an echo message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Echo {
    pub identifier: u16,
    pub sequence: u16,
}

/// What a Time-Exceeded message says about the packet it discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quote {
    /// The discarded packet was one of our echo requests.
    Echo(Echo),
    /// The discarded packet was something else entirely.
    Foreign,
    /// The router quoted too little of the packet to tell.
    Truncated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    EchoRequest(Echo),
    EchoReply(Echo),
    TimeExceeded(Quote),
    Other(u8, u8),
}

/// Internet checksum (RFC 1071) over `data`.
///
/// Run over a message that already carries its checksum, the result is 0.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = data.chunks(2).map(|chunk| match chunk {

        &[a, b] => u16::from_be_bytes([a, b]) as u32,
        &[a] => (a as u32) << 8,
        _ => 0,

    }).sum();

    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }

    !(sum as u16)
}

/// Build an echo request for `family`.
///
/// The ICMPv6 checksum covers a pseudo header with the source address the
/// kernel picks, raw ICMPv6 sockets fill it in on send, so it stays 0 here.
pub fn encode_echo_request(family: AddressFamily, identifier: u16, sequence: u16, payload: &[u8]) -> Result<Vec<u8>, TraceError> {
    let mut cursor = Cursor::new(Vec::with_capacity(ICMP_HEADER_SIZE + payload.len()));

    let kind = match family {

        AddressFamily::V4 => ICMPV4_ECHO_REQUEST,
        AddressFamily::V6 => ICMPV6_ECHO_REQUEST,
    };

    cursor.write_u8(kind).map_err(|e| {
        TraceError::RequestWriteField("type", e.to_string())
    })?;

    cursor.write_u8(0).map_err(|e| {
        TraceError::RequestWriteField("code", e.to_string())
    })?;

    cursor.write_u16::<BigEndian>(0).map_err(|e| {
        TraceError::RequestWriteField("checksum placeholder", e.to_string())
    })?;

    cursor.write_u16::<BigEndian>(identifier).map_err(|e| {
        TraceError::RequestWriteField("identifier", e.to_string())
    })?;

    cursor.write_u16::<BigEndian>(sequence).map_err(|e| {
        TraceError::RequestWriteField("sequence", e.to_string())
    })?;

    for octet in payload {
        cursor.write_u8(*octet).map_err(|e| {
            TraceError::RequestWriteField("payload", e.to_string())
        })?;
    }

    if let AddressFamily::V4 = family {
        let sum = checksum(cursor.get_ref());

        cursor.set_position(2);
        cursor.write_u16::<BigEndian>(sum).map_err(|e| {
            TraceError::RequestWriteField("checksum", e.to_string())
        })?;
    }

    Ok(cursor.into_inner())
}

/// Decode one datagram as read from a raw socket of `family`.
pub fn decode(buffer: &[u8], family: AddressFamily) -> Result<Message, TraceError> {
    match family {

        AddressFamily::V4 => {

            let message = strip_ipv4_header(buffer)?;
            if message.len() < ICMP_HEADER_SIZE {
                return Err(TraceError::ResponseReadField("header", {
                    format!("expected {} octets, got {}", ICMP_HEADER_SIZE, message.len())
                }))
            }

            if checksum(message) != 0 {
                return Err(TraceError::ResponseReadField("checksum", {
                    "checksum mismatch".to_string()
                }))
            }

            match (read_u8(message, 0, "type")?, read_u8(message, 1, "code")?) {

                (ICMPV4_ECHO_REQUEST, 0) => Ok(Message::EchoRequest(read_echo(message)?)),
                (ICMPV4_ECHO_REPLY, 0) => Ok(Message::EchoReply(read_echo(message)?)),
                (ICMPV4_TIME_EXCEEDED, 0) => Ok(Message::TimeExceeded(quote_v4(&(message[ICMP_HEADER_SIZE..])))),
                (kind, code) => Ok(Message::Other(kind, code)),
            }
        }

        AddressFamily::V6 => {

            if buffer.len() < ICMP_HEADER_SIZE {
                return Err(TraceError::ResponseReadField("header", {
                    format!("expected {} octets, got {}", ICMP_HEADER_SIZE, buffer.len())
                }))
            }

            match (read_u8(buffer, 0, "type")?, read_u8(buffer, 1, "code")?) {

                (ICMPV6_ECHO_REQUEST, 0) => Ok(Message::EchoRequest(read_echo(buffer)?)),
                (ICMPV6_ECHO_REPLY, 0) => Ok(Message::EchoReply(read_echo(buffer)?)),
                (ICMPV6_TIME_EXCEEDED, 0) => Ok(Message::TimeExceeded(quote_v6(&(buffer[ICMP_HEADER_SIZE..])))),
                (kind, code) => Ok(Message::Other(kind, code)),
            }
        }
    }
}

fn strip_ipv4_header(buffer: &[u8]) -> Result<&[u8], TraceError> {
    let first = read_u8(buffer, 0, "internet protocol header size")?;

    if first >> 4 != 4 {
        return Err(TraceError::ResponseReadField("internet protocol version", {
            format!("expected 4, got {}", first >> 4)
        }))
    }

    let header_octets = ((first & 0x0F) as usize) * 4;
    if header_octets < IPV4_MIN_HEADER_SIZE || header_octets > buffer.len() {
        return Err(TraceError::ResponseReadField("internet protocol header size", {
            format!("header of {} octets in datagram of {}", header_octets, buffer.len())
        }))
    }

    Ok(&(buffer[header_octets..]))
}

fn quote_v4(quoted: &[u8]) -> Quote {
    let inner = match strip_ipv4_header(quoted) {

        Ok(inner) => inner,
        Err(_) => return Quote::Truncated,
    };

    if quoted[9] != PROTOCOL_ICMPV4 {
        return Quote::Foreign
    }

    quote_echo(inner, ICMPV4_ECHO_REQUEST)
}

fn quote_v6(quoted: &[u8]) -> Quote {
    if quoted.len() < IPV6_HEADER_SIZE {
        return Quote::Truncated
    }

    // Extension headers in front of the quoted ICMPv6 header are not followed.
    if quoted[6] != PROTOCOL_ICMPV6 {
        return Quote::Foreign
    }

    quote_echo(&(quoted[IPV6_HEADER_SIZE..]), ICMPV6_ECHO_REQUEST)
}

fn quote_echo(inner: &[u8], request: u8) -> Quote {
    if inner.len() < ICMP_HEADER_SIZE {
        return Quote::Truncated
    }

    if inner[0] != request {
        return Quote::Foreign
    }

    match read_echo(inner) {

        Ok(echo) => Quote::Echo(echo),
        Err(_) => Quote::Truncated,
    }
}

fn read_echo(message: &[u8]) -> Result<Echo, TraceError> {
    let mut cursor = Cursor::new(message);
    cursor.set_position(4);

    let identifier = cursor.read_u16::<BigEndian>().map_err(|e| {
        TraceError::ResponseReadField("identifier", e.to_string())
    })?;

    let sequence = cursor.read_u16::<BigEndian>().map_err(|e| {
        TraceError::ResponseReadField("sequence number", e.to_string())
    })?;

    Ok(Echo { identifier, sequence })
}

fn read_u8(buffer: &[u8], position: u64, field: &'static str) -> Result<u8, TraceError> {
    let mut cursor = Cursor::new(buffer);
    cursor.set_position(position);
    cursor.read_u8().map_err(|e| {
        TraceError::ResponseReadField(field, e.to_string())
    })
}
