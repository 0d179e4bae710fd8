//! BER encoding helpers
//!
//! Minimal DER-style writers used to build test vectors and to check the
//! header reader against its inverse.

use super::header::{universal, TagClass};
use crate::errors::{DissectError, Result};
use bytes::{BufMut, BytesMut};

/// Encode identifier octets
pub fn encode_identifier(buf: &mut BytesMut, class: TagClass, constructed: bool, tag: u32) {
    let first = class.bits() | if constructed { 0x20 } else { 0 };
    if tag < 0x1F {
        buf.put_u8(first | tag as u8);
        return;
    }
    buf.put_u8(first | 0x1F);
    encode_base128(buf, tag as u64);
}

/// Encode length in BER definite form
pub fn encode_length(buf: &mut BytesMut, len: usize) {
    if len < 128 {
        buf.put_u8(len as u8);
        return;
    }
    let bytes = (len as u64).to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    buf.put_u8(0x80 | (8 - skip) as u8);
    buf.put_slice(&bytes[skip..]);
}

/// Encode a complete element
pub fn encode_tlv(class: TagClass, constructed: bool, tag: u32, content: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(content.len() + 6);
    encode_identifier(&mut buf, class, constructed, tag);
    encode_length(&mut buf, content.len());
    buf.put_slice(content);
    buf.to_vec()
}

fn encode_base128(buf: &mut BytesMut, value: u64) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    let mut v = value;
    loop {
        groups[n] = (v & 0x7F) as u8;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let more = if i > 0 { 0x80 } else { 0 };
        buf.put_u8(groups[i] | more);
    }
}

/// Minimal two's-complement representation
fn integer_to_bytes(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

pub fn integer(value: i64) -> Vec<u8> {
    encode_tlv(TagClass::Universal, false, universal::INTEGER, &integer_to_bytes(value))
}

pub fn enumerated(value: i64) -> Vec<u8> {
    encode_tlv(TagClass::Universal, false, universal::ENUMERATED, &integer_to_bytes(value))
}

pub fn boolean(value: bool) -> Vec<u8> {
    encode_tlv(TagClass::Universal, false, universal::BOOLEAN, &[if value { 0xFF } else { 0x00 }])
}

pub fn null() -> Vec<u8> {
    encode_tlv(TagClass::Universal, false, universal::NULL, &[])
}

pub fn octet_string(value: &[u8]) -> Vec<u8> {
    encode_tlv(TagClass::Universal, false, universal::OCTET_STRING, value)
}

pub fn bit_string(unused_bits: u8, data: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(data.len() + 1);
    content.push(unused_bits);
    content.extend_from_slice(data);
    encode_tlv(TagClass::Universal, false, universal::BIT_STRING, &content)
}

pub fn utf8_string(value: &str) -> Vec<u8> {
    encode_tlv(TagClass::Universal, false, universal::UTF8_STRING, value.as_bytes())
}

pub fn printable_string(value: &str) -> Vec<u8> {
    encode_tlv(TagClass::Universal, false, universal::PRINTABLE_STRING, value.as_bytes())
}

pub fn ia5_string(value: &str) -> Vec<u8> {
    encode_tlv(TagClass::Universal, false, universal::IA5_STRING, value.as_bytes())
}

pub fn generalized_time(value: &str) -> Vec<u8> {
    encode_tlv(TagClass::Universal, false, universal::GENERALIZED_TIME, value.as_bytes())
}

pub fn utc_time(value: &str) -> Vec<u8> {
    encode_tlv(TagClass::Universal, false, universal::UTC_TIME, value.as_bytes())
}

/// Content octets of a dotted OID
pub fn oid_content(dotted: &str) -> Result<Vec<u8>> {
    let arcs = dotted
        .split('.')
        .map(|arc| arc.parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| DissectError::InvalidOid(dotted.to_string()))?;
    if arcs.len() < 2 || arcs[0] > 2 || (arcs[0] < 2 && arcs[1] >= 40) {
        return Err(DissectError::InvalidOid(dotted.to_string()));
    }
    let first = arcs[0]
        .checked_mul(40)
        .and_then(|v| v.checked_add(arcs[1]))
        .ok_or_else(|| DissectError::InvalidOid(dotted.to_string()))?;

    let mut buf = BytesMut::new();
    encode_base128(&mut buf, first);
    for &arc in &arcs[2..] {
        encode_base128(&mut buf, arc);
    }
    Ok(buf.to_vec())
}

pub fn oid(dotted: &str) -> Result<Vec<u8>> {
    Ok(encode_tlv(TagClass::Universal, false, universal::OBJECT_IDENTIFIER, &oid_content(dotted)?))
}

fn concat(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.iter().flat_map(|p| p.iter().copied()).collect()
}

pub fn sequence(parts: &[Vec<u8>]) -> Vec<u8> {
    encode_tlv(TagClass::Universal, true, universal::SEQUENCE, &concat(parts))
}

pub fn set(parts: &[Vec<u8>]) -> Vec<u8> {
    encode_tlv(TagClass::Universal, true, universal::SET, &concat(parts))
}

/// `[tag] EXPLICIT` wrapper around an encoded element
pub fn explicit(tag: u32, inner: &[u8]) -> Vec<u8> {
    encode_tlv(TagClass::Context, true, tag, inner)
}

/// Re-tag an encoded element as `[tag] IMPLICIT`, keeping its content
/// and constructed bit
pub fn implicit(tag: u32, element: &[u8]) -> Vec<u8> {
    let Some(&identifier) = element.first() else {
        return Vec::new();
    };
    let constructed = identifier & 0x20 != 0;
    let content = content_of(element);
    encode_tlv(TagClass::Context, constructed, tag, content)
}

/// Content octets of a definite-length element built by this module
fn content_of(element: &[u8]) -> &[u8] {
    let mut pos = 1;
    if element[0] & 0x1F == 0x1F {
        while pos < element.len() && element[pos] & 0x80 != 0 {
            pos += 1;
        }
        pos += 1;
    }
    match element.get(pos) {
        Some(&len) if len & 0x80 == 0 => &element[pos + 1..],
        Some(&len) => &element[pos + 1 + (len & 0x7F) as usize..],
        None => &[],
    }
}
