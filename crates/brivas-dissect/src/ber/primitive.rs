//! Primitive type decoders
//!
//! Every decoder here has the [`DecodeFn`](super::schema::DecodeFn) shape
//! (or that shape plus a trailing table argument) and returns the offset
//! after the complete element together with its field node.

use super::context::DecodeContext;
use super::header::{read_header, universal, Header, Length};
use crate::cursor::ByteCursor;
use crate::errors::{DissectError, Result};
use crate::tree::{ExpertInfo, ExpertKind, FieldNode, Value};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use tracing::debug;

/// Value-name table for INTEGER and ENUMERATED fields
pub type ValueNames = &'static [(i64, &'static str)];

/// Bit names for BIT STRING fields; index 0 is the most significant bit
/// of the first data octet
pub type BitNames = &'static [&'static str];

pub fn value_name(names: ValueNames, value: i64) -> Option<&'static str> {
    names.iter().find(|(v, _)| *v == value).map(|(_, n)| *n)
}

/// Read and validate a primitive header; returns (header, content offset)
fn primitive_header(
    implicit: bool,
    tvb: &ByteCursor,
    offset: usize,
    expected: u32,
    name: &'static str,
) -> Result<(Header, usize, usize)> {
    let header = read_header(tvb, offset)?;
    if !implicit && !header.is_universal(expected) {
        return Err(DissectError::UnknownTag {
            field: name,
            class: header.class,
            tag: header.tag,
        });
    }
    if header.constructed {
        return Err(DissectError::malformed(
            tvb.absolute(offset),
            format!("{} must use the primitive encoding", name),
        ));
    }
    let len = match header.length {
        Length::Definite(n) => n,
        Length::Indefinite => {
            return Err(DissectError::malformed(tvb.absolute(offset), "indefinite primitive"));
        }
    };
    let start = offset + header.header_len;
    tvb.ensure(start, len)?;
    Ok((header, start, len))
}

/// Content of a string type, joining the segments of a constructed encoding
fn string_content(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    expected: u32,
    name: &'static str,
) -> Result<(usize, Bytes)> {
    let header = read_header(tvb, offset)?;
    if !implicit && !header.is_universal(expected) {
        return Err(DissectError::UnknownTag {
            field: name,
            class: header.class,
            tag: header.tag,
        });
    }
    let start = offset + header.header_len;
    if !header.constructed {
        let len = header.definite_len().unwrap_or(0);
        return Ok((start + len, tvb.slice(start, len)?));
    }

    let (body, indefinite) = match header.length {
        Length::Definite(n) => (tvb.subset(start, n)?, false),
        Length::Indefinite => (tvb.subset_clamped(start, tvb.remaining(start)), true),
    };
    let mut joined = BytesMut::new();
    let end = ctx.nested(|ctx| {
        let mut pos = 0;
        loop {
            if !indefinite && pos >= body.len() {
                return Ok(start + pos);
            }
            let segment = read_header(&body, pos)?;
            if indefinite && segment.is_eoc() {
                return Ok(start + pos + segment.header_len);
            }
            // segments repeat the string's own tag, or OCTET STRING for restricted strings
            if !segment.is_universal(expected) && !segment.is_universal(universal::OCTET_STRING) {
                return Err(DissectError::malformed(
                    body.absolute(pos),
                    format!("{}: segment tagged {:?} {}", name, segment.class, segment.tag),
                ));
            }
            let (next, bytes) = string_content(true, ctx, &body, pos, expected, name)?;
            joined.extend_from_slice(&bytes);
            pos = next;
        }
    })?;
    Ok((end, joined.freeze()))
}

fn be_signed(bytes: &[u8]) -> i64 {
    let init: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    bytes.iter().fold(init, |acc, &b| (acc << 8) | b as i64)
}

fn integer_value(
    implicit: bool,
    tvb: &ByteCursor,
    offset: usize,
    expected: u32,
    name: &'static str,
    max_len: usize,
) -> Result<(usize, i64)> {
    let (_, start, len) = primitive_header(implicit, tvb, offset, expected, name)?;
    if len == 0 {
        return Err(DissectError::malformed(tvb.absolute(offset), format!("{}: zero-length integer", name)));
    }
    if len > max_len {
        return Err(DissectError::malformed(
            tvb.absolute(offset),
            format!("{}: {}-byte integer exceeds {} bytes", name, len, max_len),
        ));
    }
    Ok((start + len, be_signed(tvb.bytes(start, len)?)))
}

/// INTEGER in the 32-bit range
pub fn dissect_integer(
    implicit: bool,
    _ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    let (end, value) = integer_value(implicit, tvb, offset, universal::INTEGER, name, 4)?;
    Ok((end, FieldNode::new(name, tvb.absolute(offset), end - offset, Value::Integer(value))))
}

/// INTEGER in the 64-bit range
pub fn dissect_integer64(
    implicit: bool,
    _ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    let (end, value) = integer_value(implicit, tvb, offset, universal::INTEGER, name, 8)?;
    Ok((end, FieldNode::new(name, tvb.absolute(offset), end - offset, Value::Integer(value))))
}

/// INTEGER of any size (serial numbers); values wider than 64 bits are
/// kept as their content octets
pub fn dissect_big_integer(
    implicit: bool,
    _ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    let (_, start, len) = primitive_header(implicit, tvb, offset, universal::INTEGER, name)?;
    if len == 0 {
        return Err(DissectError::malformed(tvb.absolute(offset), format!("{}: zero-length integer", name)));
    }
    let end = start + len;
    let value = if len <= 8 {
        Value::Integer(be_signed(tvb.bytes(start, len)?))
    } else {
        Value::Bytes(tvb.slice(start, len)?)
    };
    Ok((end, FieldNode::new(name, tvb.absolute(offset), end - offset, value)))
}

/// INTEGER with a value-name suffix
pub fn dissect_integer_named(
    implicit: bool,
    _ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
    names: ValueNames,
) -> Result<(usize, FieldNode)> {
    let (end, value) = integer_value(implicit, tvb, offset, universal::INTEGER, name, 4)?;
    Ok((end, named_integer(tvb, offset, end, name, value, names)))
}

pub fn dissect_enumerated(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    dissect_enumerated_named(implicit, ctx, tvb, offset, name, &[])
}

pub fn dissect_enumerated_named(
    implicit: bool,
    _ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
    names: ValueNames,
) -> Result<(usize, FieldNode)> {
    let (end, value) = integer_value(implicit, tvb, offset, universal::ENUMERATED, name, 4)?;
    Ok((end, named_integer(tvb, offset, end, name, value, names)))
}

fn named_integer(
    tvb: &ByteCursor,
    offset: usize,
    end: usize,
    name: &'static str,
    value: i64,
    names: ValueNames,
) -> FieldNode {
    let node = FieldNode::new(name, tvb.absolute(offset), end - offset, Value::Integer(value));
    match value_name(names, value) {
        Some(label) => node.with_suffix(format!("({})", label)),
        None if !names.is_empty() => node.with_suffix("(unknown)"),
        None => node,
    }
}

/// BOOLEAN; any nonzero octet is true
pub fn dissect_boolean(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    let (_, start, len) = primitive_header(implicit, tvb, offset, universal::BOOLEAN, name)?;
    if len != 1 {
        return Err(DissectError::malformed(
            tvb.absolute(offset),
            format!("{}: BOOLEAN of {} bytes", name, len),
        ));
    }
    let raw = tvb.read_u8(start)?;
    let mut node = FieldNode::new(name, tvb.absolute(offset), start + 1 - offset, Value::Boolean(raw != 0));
    if ctx.options().strict_boolean && raw != 0x00 && raw != 0xFF {
        node.annotate(ExpertInfo::note(
            ExpertKind::NonCanonical,
            format!("BOOLEAN encoded as 0x{:02x}", raw),
        ));
    }
    Ok((start + 1, node))
}

pub fn dissect_null(
    implicit: bool,
    _ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    let (_, start, len) = primitive_header(implicit, tvb, offset, universal::NULL, name)?;
    if len != 0 {
        return Err(DissectError::malformed(tvb.absolute(offset), format!("{}: NULL with content", name)));
    }
    Ok((start, FieldNode::new(name, tvb.absolute(offset), start - offset, Value::Null)))
}

pub fn dissect_octet_string(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    let (end, data) = string_content(implicit, ctx, tvb, offset, universal::OCTET_STRING, name)?;
    Ok((end, FieldNode::new(name, tvb.absolute(offset), end - offset, Value::Bytes(data))))
}

pub fn dissect_bit_string(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    dissect_bit_string_named(implicit, ctx, tvb, offset, name, &[])
}

/// BIT STRING with a flag table; set bits are listed by name
pub fn dissect_bit_string_named(
    implicit: bool,
    _ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
    names: BitNames,
) -> Result<(usize, FieldNode)> {
    let (_, start, len) = primitive_header(implicit, tvb, offset, universal::BIT_STRING, name)?;
    if len == 0 {
        return Err(DissectError::malformed(tvb.absolute(offset), format!("{}: missing unused-bits octet", name)));
    }
    let unused_bits = tvb.read_u8(start)?;
    if unused_bits > 7 {
        return Err(DissectError::malformed(
            tvb.absolute(start),
            format!("{}: {} unused bits", name, unused_bits),
        ));
    }
    if unused_bits > 0 && len == 1 {
        return Err(DissectError::malformed(
            tvb.absolute(start),
            format!("{}: unused bits without data", name),
        ));
    }
    let data = tvb.slice(start + 1, len - 1)?;
    let significant = data.len() * 8 - unused_bits as usize;
    let named = names
        .iter()
        .enumerate()
        .filter(|(bit, _)| *bit < significant && data[bit / 8] & (0x80 >> (bit % 8)) != 0)
        .map(|(_, n)| *n)
        .collect();

    let end = start + len;
    Ok((
        end,
        FieldNode::new(
            name,
            tvb.absolute(offset),
            end - offset,
            Value::BitString {
                data,
                unused_bits,
                named,
            },
        ),
    ))
}

/// Dotted form of OBJECT IDENTIFIER content octets
pub fn decode_oid(content: &[u8]) -> std::result::Result<String, &'static str> {
    if content.is_empty() {
        return Err("empty object identifier");
    }
    let mut arcs: Vec<u64> = Vec::new();
    let mut value: u64 = 0;
    let mut pending = false;
    for &octet in content {
        if value > (u64::MAX >> 7) {
            return Err("object identifier arc overflows 64 bits");
        }
        value = (value << 7) | (octet & 0x7F) as u64;
        pending = octet & 0x80 != 0;
        if !pending {
            if arcs.is_empty() {
                let (first, second) = match value {
                    0..=39 => (0, value),
                    40..=79 => (1, value - 40),
                    _ => (2, value - 80),
                };
                arcs.push(first);
                arcs.push(second);
            } else {
                arcs.push(value);
            }
            value = 0;
        }
    }
    if pending {
        return Err("truncated object identifier arc");
    }
    Ok(arcs.iter().map(u64::to_string).collect::<Vec<_>>().join("."))
}

fn oid_node(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
    remember: bool,
) -> Result<(usize, FieldNode)> {
    let (_, start, len) = primitive_header(implicit, tvb, offset, universal::OBJECT_IDENTIFIER, name)?;
    let oid = decode_oid(tvb.bytes(start, len)?)
        .map_err(|reason| DissectError::malformed(tvb.absolute(start), reason))?;
    let end = start + len;
    let mut node = FieldNode::new(name, tvb.absolute(offset), end - offset, Value::Oid(oid.clone()));
    if let Some(label) = ctx.registry().name_of(&oid) {
        node.suffix = Some(format!("({})", label));
    }
    if remember {
        ctx.set_type_oid(oid);
    }
    Ok((end, node))
}

pub fn dissect_object_identifier(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    oid_node(implicit, ctx, tvb, offset, name, false)
}

/// OBJECT IDENTIFIER that selects the type of a sibling value; the dotted
/// form is kept in the context for the rest of the enclosing SEQUENCE
pub fn dissect_object_identifier_str(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    oid_node(implicit, ctx, tvb, offset, name, true)
}

/// Restricted character string types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    Utf8,
    Numeric,
    Printable,
    Teletex,
    Videotex,
    Ia5,
    Graphic,
    Visible,
    General,
    Universal,
    Bmp,
}

impl StringKind {
    pub fn tag(self) -> u32 {
        match self {
            Self::Utf8 => universal::UTF8_STRING,
            Self::Numeric => universal::NUMERIC_STRING,
            Self::Printable => universal::PRINTABLE_STRING,
            Self::Teletex => universal::TELETEX_STRING,
            Self::Videotex => universal::VIDEOTEX_STRING,
            Self::Ia5 => universal::IA5_STRING,
            Self::Graphic => universal::GRAPHIC_STRING,
            Self::Visible => universal::VISIBLE_STRING,
            Self::General => universal::GENERAL_STRING,
            Self::Universal => universal::UNIVERSAL_STRING,
            Self::Bmp => universal::BMP_STRING,
        }
    }

    /// Lossy conversion; content is never rejected
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Bmp => encoding_rs::UTF_16BE.decode_without_bom_handling(bytes).0.into_owned(),
            Self::Teletex | Self::Videotex => {
                encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned()
            }
            Self::Universal => bytes
                .chunks(4)
                .map(|c| {
                    let mut raw = [0u8; 4];
                    raw[4 - c.len()..].copy_from_slice(c);
                    char::from_u32(u32::from_be_bytes(raw)).unwrap_or(char::REPLACEMENT_CHARACTER)
                })
                .collect(),
            _ => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

pub fn dissect_restricted_string(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
    kind: StringKind,
) -> Result<(usize, FieldNode)> {
    let (end, data) = string_content(implicit, ctx, tvb, offset, kind.tag(), name)?;
    Ok((end, FieldNode::new(name, tvb.absolute(offset), end - offset, Value::Str(kind.decode(&data)))))
}

macro_rules! string_decoders {
    ($($func:ident => $kind:ident),* $(,)?) => {
        $(
            pub fn $func(
                implicit: bool,
                ctx: &mut DecodeContext<'_>,
                tvb: &ByteCursor,
                offset: usize,
                name: &'static str,
            ) -> Result<(usize, FieldNode)> {
                dissect_restricted_string(implicit, ctx, tvb, offset, name, StringKind::$kind)
            }
        )*
    };
}

string_decoders! {
    dissect_utf8_string => Utf8,
    dissect_numeric_string => Numeric,
    dissect_printable_string => Printable,
    dissect_teletex_string => Teletex,
    dissect_videotex_string => Videotex,
    dissect_ia5_string => Ia5,
    dissect_graphic_string => Graphic,
    dissect_visible_string => Visible,
    dissect_general_string => General,
    dissect_universal_string => Universal,
    dissect_bmp_string => Bmp,
}

fn digits(s: &str, start: usize, len: usize) -> Option<u32> {
    let part = s.get(start..start + len)?;
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// `Z`, `+HHMM` or `-HHMM`
fn parse_zone(zone: &str) -> Option<FixedOffset> {
    if zone == "Z" {
        return FixedOffset::east_opt(0);
    }
    let sign = match zone.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    if zone.len() != 5 {
        return None;
    }
    let hours = digits(zone, 1, 2)? as i32;
    let minutes = digits(zone, 3, 2)? as i32;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// `YYYYMMDDHHMMSS[.fff][Z|±HHMM]`; the flag reports whether a zone was present
pub fn parse_generalized_time(s: &str) -> Option<(DateTime<FixedOffset>, bool)> {
    let year = digits(s, 0, 4)? as i32;
    let month = digits(s, 4, 2)?;
    let day = digits(s, 6, 2)?;
    let hour = digits(s, 8, 2)?;
    let minute = digits(s, 10, 2)?;
    let second = digits(s, 12, 2)?;

    let mut rest = s.get(14..)?;
    let mut nanos = 0u32;
    if let Some(fraction) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(',')) {
        let len = fraction.bytes().take_while(u8::is_ascii_digit).count();
        if len == 0 {
            return None;
        }
        let mut scaled: String = fraction[..len.min(9)].to_string();
        while scaled.len() < 9 {
            scaled.push('0');
        }
        nanos = scaled.parse().ok()?;
        rest = &fraction[len..];
    }

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_nano_opt(hour, minute, second, nanos)?;
    let (zone, explicit) = if rest.is_empty() {
        (FixedOffset::east_opt(0)?, false)
    } else {
        (parse_zone(rest)?, true)
    };
    Some((zone.from_local_datetime(&naive).single()?, explicit))
}

/// `YYMMDDHHMM[SS](Z|±HHMM)`; two-digit years below 50 are 20xx
pub fn parse_utc_time(s: &str) -> Option<DateTime<FixedOffset>> {
    let yy = digits(s, 0, 2)? as i32;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
    let month = digits(s, 2, 2)?;
    let day = digits(s, 4, 2)?;
    let hour = digits(s, 6, 2)?;
    let minute = digits(s, 8, 2)?;

    let mut rest = s.get(10..)?;
    let mut second = 0;
    if let Some(ss) = digits(rest, 0, 2) {
        second = ss;
        rest = &rest[2..];
    }
    let zone = parse_zone(rest)?;
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    zone.from_local_datetime(&naive).single()
}

fn time_node(
    tvb: &ByteCursor,
    offset: usize,
    end: usize,
    name: &'static str,
    raw: &[u8],
    parsed: Option<(DateTime<FixedOffset>, bool)>,
) -> FieldNode {
    let text = String::from_utf8_lossy(raw).into_owned();
    match parsed {
        Some((time, true)) => FieldNode::new(name, tvb.absolute(offset), end - offset, Value::Time(time)),
        Some((time, false)) => FieldNode::new(name, tvb.absolute(offset), end - offset, Value::Time(time))
            .with_suffix("(local time)"),
        None => {
            debug!(field = name, value = %text, "unparseable time value");
            FieldNode::new(name, tvb.absolute(offset), end - offset, Value::Str(text.clone())).with_expert(
                ExpertInfo::error(ExpertKind::Malformed, format!("{}: invalid time \"{}\"", name, text)),
            )
        }
    }
}

pub fn dissect_generalized_time(
    implicit: bool,
    _ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    let (_, start, len) = primitive_header(implicit, tvb, offset, universal::GENERALIZED_TIME, name)?;
    let raw = tvb.bytes(start, len)?;
    let parsed = std::str::from_utf8(raw).ok().and_then(parse_generalized_time);
    Ok((start + len, time_node(tvb, offset, start + len, name, raw, parsed)))
}

pub fn dissect_utc_time(
    implicit: bool,
    _ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    let (_, start, len) = primitive_header(implicit, tvb, offset, universal::UTC_TIME, name)?;
    let raw = tvb.bytes(start, len)?;
    let parsed = std::str::from_utf8(raw)
        .ok()
        .and_then(parse_utc_time)
        .map(|t| (t, true));
    Ok((start + len, time_node(tvb, offset, start + len, name, raw, parsed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::encode;
    use crate::config::BerOptions;
    use crate::registry::OidRegistry;
    use chrono::{Datelike, Timelike};

    fn run(decoder: crate::ber::schema::DecodeFn, bytes: &[u8]) -> Result<(usize, FieldNode)> {
        let registry = OidRegistry::new();
        let mut ctx = DecodeContext::new(&registry, BerOptions::default());
        decoder(false, &mut ctx, &ByteCursor::from_slice(bytes), 0, "f")
    }

    #[test]
    fn test_integer_sign_extension() {
        assert_eq!(run(dissect_integer, &[0x02, 0x01, 0xFF]).unwrap().1.value, Value::Integer(-1));
        assert_eq!(run(dissect_integer, &[0x02, 0x02, 0x00, 0x80]).unwrap().1.value, Value::Integer(128));
        assert_eq!(
            run(dissect_integer64, &[0x02, 0x05, 0x01, 0x00, 0x00, 0x00, 0x00]).unwrap().1.value,
            Value::Integer(0x1_0000_0000)
        );
    }

    #[test]
    fn test_integer_length_rules() {
        assert!(matches!(run(dissect_integer, &[0x02, 0x00]), Err(DissectError::Malformed { .. })));
        assert!(matches!(
            run(dissect_integer, &[0x02, 0x05, 1, 2, 3, 4, 5]),
            Err(DissectError::Malformed { .. })
        ));
        assert!(matches!(run(dissect_integer, &[0x02, 0x02, 0x01]), Err(DissectError::Truncated { .. })));
        assert!(matches!(run(dissect_integer, &[0x04, 0x01, 0x01]), Err(DissectError::UnknownTag { .. })));
    }

    #[test]
    fn test_big_integer() {
        let mut serial = vec![0x02, 0x10];
        serial.extend_from_slice(&[0x7F; 16]);
        let (end, node) = run(dissect_big_integer, &serial).unwrap();
        assert_eq!(end, 18);
        assert!(matches!(node.value, Value::Bytes(ref b) if b.len() == 16));
    }

    #[test]
    fn test_boolean() {
        assert_eq!(run(dissect_boolean, &[0x01, 0x01, 0xFF]).unwrap().1.value, Value::Boolean(true));
        assert_eq!(run(dissect_boolean, &[0x01, 0x01, 0x00]).unwrap().1.value, Value::Boolean(false));
        let (_, lenient) = run(dissect_boolean, &[0x01, 0x01, 0x01]).unwrap();
        assert_eq!(lenient.value, Value::Boolean(true));
        assert!(lenient.expert.is_empty());

        let registry = OidRegistry::new();
        let mut strict = DecodeContext::new(&registry, BerOptions { max_depth: 64, strict_boolean: true });
        let tvb = ByteCursor::from_slice(&[0x01, 0x01, 0x01]);
        let (_, node) = dissect_boolean(false, &mut strict, &tvb, 0, "b").unwrap();
        assert!(node.has_expert(ExpertKind::NonCanonical));
        assert!(matches!(run(dissect_boolean, &[0x01, 0x02, 0, 0]), Err(DissectError::Malformed { .. })));
    }

    #[test]
    fn test_null() {
        assert_eq!(run(dissect_null, &[0x05, 0x00]).unwrap().0, 2);
        assert!(run(dissect_null, &[0x05, 0x01, 0x00]).is_err());
    }

    #[test]
    fn test_bit_string_unused_bits() {
        let (_, node) = run(dissect_bit_string, &[0x03, 0x02, 0x07, 0x80]).unwrap();
        match node.value {
            Value::BitString { data, unused_bits, .. } => {
                assert_eq!(unused_bits, 7);
                assert_eq!(&data[..], &[0x80]);
            }
            other => panic!("unexpected value {:?}", other),
        }
        assert!(matches!(run(dissect_bit_string, &[0x03, 0x02, 0x08, 0x00]), Err(DissectError::Malformed { .. })));
        assert!(matches!(run(dissect_bit_string, &[0x03, 0x01, 0x03]), Err(DissectError::Malformed { .. })));
        assert!(run(dissect_bit_string, &[0x03, 0x01, 0x00]).is_ok());
    }

    #[test]
    fn test_named_bits_respect_unused() {
        static NAMES: BitNames = &["a", "b", "c", "d", "e", "f", "g", "h", "i"];
        let registry = OidRegistry::new();
        let mut ctx = DecodeContext::new(&registry, BerOptions::default());
        // 0xA0 = a, c
        let tvb = ByteCursor::from_slice(&[0x03, 0x03, 0x07, 0xA0, 0x00]);
        let (_, node) = dissect_bit_string_named(false, &mut ctx, &tvb, 0, "flags", NAMES).unwrap();
        assert!(matches!(node.value, Value::BitString { ref named, .. } if named == &vec!["a", "c"]));

        let tvb = ByteCursor::from_slice(&[0x03, 0x03, 0x07, 0x00, 0x80]);
        let (_, node) = dissect_bit_string_named(false, &mut ctx, &tvb, 0, "flags", NAMES).unwrap();
        assert!(matches!(node.value, Value::BitString { ref named, .. } if named == &vec!["i"]));

        // 'h' is set but falls in the unused bit
        let tvb = ByteCursor::from_slice(&[0x03, 0x02, 0x01, 0x01]);
        let (_, node) = dissect_bit_string_named(false, &mut ctx, &tvb, 0, "flags", NAMES).unwrap();
        assert!(matches!(node.value, Value::BitString { ref named, .. } if named.is_empty()));
    }

    #[test]
    fn test_oid_round_trip() {
        for oid in [
            "1.2.840.113549.1.1.11",
            "2.5.29.15",
            "2.999.3",
            "0.9.2342.19200300.100.1.25",
            "1.3.6.1.4.1.311.21.20",
        ] {
            let content = encode::oid_content(oid).unwrap();
            assert_eq!(decode_oid(&content).unwrap(), oid);
        }
        assert!(decode_oid(&[0x2A, 0x86]).is_err());
        assert!(decode_oid(&[]).is_err());
    }

    #[test]
    fn test_oid_str_sets_context_and_name() {
        let mut registry = OidRegistry::new();
        registry.register_name("2.5.4.3", "id-at-commonName").unwrap();
        let mut ctx = DecodeContext::new(&registry, BerOptions::default());
        let tvb = ByteCursor::from_slice(&encode::oid("2.5.4.3").unwrap());
        let (_, node) = dissect_object_identifier_str(false, &mut ctx, &tvb, 0, "type").unwrap();
        assert_eq!(node.suffix.as_deref(), Some("(id-at-commonName)"));
        assert_eq!(ctx.type_oid(), Some("2.5.4.3"));
    }

    #[test]
    fn test_strings() {
        let (_, node) = run(dissect_utf8_string, &encode::utf8_string("grüß")).unwrap();
        assert_eq!(node.value, Value::Str("grüß".into()));
        let (_, node) = run(dissect_bmp_string, &[0x1E, 0x04, 0x00, 0x41, 0x04, 0x10]).unwrap();
        assert_eq!(node.value, Value::Str("A\u{410}".into()));
        let (_, node) = run(dissect_teletex_string, &[0x14, 0x02, 0x41, 0xE9]).unwrap();
        assert_eq!(node.value, Value::Str("Aé".into()));
        // invalid UTF-8 is shown, not rejected
        assert!(run(dissect_utf8_string, &[0x0C, 0x01, 0xFF]).is_ok());
    }

    #[test]
    fn test_constructed_octet_string() {
        let bytes = [0x24, 0x80, 0x04, 0x01, 0xAA, 0x04, 0x02, 0xBB, 0xCC, 0x00, 0x00];
        let (end, node) = run(dissect_octet_string, &bytes).unwrap();
        assert_eq!(end, bytes.len());
        assert_eq!(node.value, Value::Bytes(Bytes::from_static(&[0xAA, 0xBB, 0xCC])));
    }

    #[test]
    fn test_constructed_string_segment_tags() {
        // UTF8String split into OCTET STRING segments
        let bytes = [0x2C, 0x06, 0x04, 0x01, 0x41, 0x04, 0x01, 0x42];
        assert_eq!(run(dissect_utf8_string, &bytes).unwrap().1.value, Value::Str("AB".into()));
        let bytes = [0x2C, 0x06, 0x0C, 0x01, 0x41, 0x0C, 0x01, 0x42];
        assert_eq!(run(dissect_utf8_string, &bytes).unwrap().1.value, Value::Str("AB".into()));

        // an INTEGER inside a constructed OCTET STRING
        let bytes = [0x24, 0x06, 0x04, 0x01, 0xAA, 0x02, 0x01, 0x05];
        assert!(matches!(run(dissect_octet_string, &bytes), Err(DissectError::Malformed { .. })));
        // a PrintableString segment inside a UTF8String
        let bytes = [0x2C, 0x03, 0x13, 0x01, 0x41];
        assert!(matches!(run(dissect_utf8_string, &bytes), Err(DissectError::Malformed { .. })));
    }

    #[test]
    fn test_generalized_time() {
        let (t, zoned) = parse_generalized_time("20240229235959.5Z").unwrap();
        assert!(zoned);
        assert_eq!((t.year(), t.month(), t.day()), (2024, 2, 29));
        assert_eq!(t.nanosecond(), 500_000_000);
        let (t, _) = parse_generalized_time("20240101120000+0130").unwrap();
        assert_eq!(t.offset().local_minus_utc(), 5400);
        assert!(!parse_generalized_time("20240101120000").unwrap().1);
        assert!(parse_generalized_time("2024013112000Z").is_none());
        assert!(parse_generalized_time("20241301120000Z").is_none());
    }

    #[test]
    fn test_utc_time_pivot() {
        assert_eq!(parse_utc_time("491231235959Z").unwrap().year(), 2049);
        assert_eq!(parse_utc_time("500101000000Z").unwrap().year(), 1950);
        assert_eq!(parse_utc_time("2401011200Z").unwrap().minute(), 0);
        assert!(parse_utc_time("240101120000").is_none());
    }

    #[test]
    fn test_bad_time_is_flagged_not_failed() {
        let (end, node) = run(dissect_generalized_time, &encode::generalized_time("yesterday")).unwrap();
        assert_eq!(end, 11);
        assert!(node.has_expert(ExpertKind::Malformed));
        assert_eq!(node.value, Value::Str("yesterday".into()));
    }
}
