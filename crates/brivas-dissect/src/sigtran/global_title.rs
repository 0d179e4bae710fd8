//! Global title digits and the SUA global title layouts

use crate::cursor::ByteCursor;
use crate::errors::Result;
use crate::tree::{ExpertInfo, ExpertKind, FieldNode, Value};
use crate::types::{nature_of_address_name, numbering_plan_name};

const FILLER: u8 = 0x0F;

/// Digits decoded from packed BCD, with the positions that were not
/// valid digits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BcdDigits {
    pub digits: String,
    /// (digit index, nibble)
    pub invalid: Vec<(usize, u8)>,
    /// Nibbles after the counted digits and their filler
    pub surplus: usize,
}

impl BcdDigits {
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Decode packed BCD, low nibble first. `count` limits the number of
/// digits when the encoding carries it; otherwise every nibble is read
/// and a filler is only accepted as the very last one.
pub fn decode_bcd(data: &[u8], count: Option<usize>) -> BcdDigits {
    let nibbles: Vec<u8> = data.iter().flat_map(|&b| [b & 0x0F, b >> 4]).collect();
    let total = count.map_or(nibbles.len(), |c| c.min(nibbles.len()));

    let mut out = BcdDigits::default();
    for (idx, &nibble) in nibbles.iter().enumerate().take(total) {
        match nibble {
            0..=9 => out.digits.push(char::from(b'0' + nibble)),
            0x0B => out.digits.push('*'),
            0x0C => out.digits.push('#'),
            FILLER if idx + 1 == nibbles.len() && count.is_none() => {}
            _ => out.invalid.push((idx, nibble)),
        }
    }
    // with an explicit count the odd filler sits just past the digits
    if let Some(c) = count {
        let mut tail = c;
        if c % 2 == 1 && c < nibbles.len() {
            if nibbles[c] != FILLER {
                out.invalid.push((c, nibbles[c]));
            }
            tail += 1;
        }
        out.surplus = nibbles.len().saturating_sub(tail);
    }
    out
}

/// Digits node with one Malformed annotation per invalid nibble
pub fn digits_node(tvb: &ByteCursor, offset: usize, len: usize, bcd: &BcdDigits) -> FieldNode {
    let mut node = FieldNode::new("Global title digits", tvb.absolute(offset), len, Value::Str(bcd.digits.clone()));
    for &(idx, nibble) in &bcd.invalid {
        node.annotate(ExpertInfo::error(
            ExpertKind::Malformed,
            format!("invalid BCD nibble 0x{:x} at digit {}", nibble, idx + 1),
        ));
    }
    if bcd.surplus > 0 {
        node.annotate(ExpertInfo::note(
            ExpertKind::TrailingData,
            format!("{} digit nibbles beyond the announced count", bcd.surplus),
        ));
    }
    node
}

/// Decoded global title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalTitle {
    pub indicator: u8,
    pub translation_type: u8,
    pub numbering_plan: u8,
    pub nature_of_address: u8,
    pub digits: BcdDigits,
}

fn gti_node(tvb: &ByteCursor, offset: usize, gti: u8) -> FieldNode {
    FieldNode::new(
        "Global title indicator",
        tvb.absolute(offset),
        1,
        Value::Unsigned(gti as u64),
    )
}

fn np_node(tvb: &ByteCursor, offset: usize, np: u8) -> FieldNode {
    FieldNode::new("Numbering plan", tvb.absolute(offset), 1, Value::Unsigned(np as u64))
        .with_suffix(format!("({})", numbering_plan_name(np)))
}

fn na_node(tvb: &ByteCursor, offset: usize, na: u8) -> FieldNode {
    FieldNode::new("Nature of address", tvb.absolute(offset), 1, Value::Unsigned(na as u64))
        .with_suffix(format!("({})", nature_of_address_name(na)))
}

/// RFC 3868 layout:
/// reserved(3) GTI(1) | #digits(1) TT(1) NP(1) NA(1) | digits
pub fn dissect_rfc3868(tvb: &ByteCursor, node: &mut FieldNode) -> Result<GlobalTitle> {
    let indicator = tvb.read_u8(3)? & 0x0F;
    let count = tvb.read_u8(4)? as usize;
    let translation_type = tvb.read_u8(5)?;
    let numbering_plan = tvb.read_u8(6)?;
    let nature_of_address = tvb.read_u8(7)? & 0x7F;
    let packed = tvb.bytes(8, tvb.remaining(8))?;
    let digits = decode_bcd(packed, Some(count));

    node.push(gti_node(tvb, 3, indicator));
    node.push(FieldNode::new("Number of digits", tvb.absolute(4), 1, Value::Unsigned(count as u64)));
    node.push(FieldNode::new("Translation type", tvb.absolute(5), 1, Value::Unsigned(translation_type as u64)));
    node.push(np_node(tvb, 6, numbering_plan));
    node.push(na_node(tvb, 7, nature_of_address));
    let mut digits_field = digits_node(tvb, 8, packed.len(), &digits);
    if count > packed.len() * 2 {
        digits_field.annotate(ExpertInfo::error(
            ExpertKind::Malformed,
            format!("{} digits announced, {} present", count, packed.len() * 2),
        ));
    }
    node.push(digits_field);

    Ok(GlobalTitle {
        indicator,
        translation_type,
        numbering_plan,
        nature_of_address,
        digits,
    })
}

/// Draft-08 layout: GTI(1) TT(1) NP|ES(1) NA(1) | digits. Encoding
/// scheme 1 means an odd number of digits.
pub fn dissect_draft08(tvb: &ByteCursor, node: &mut FieldNode) -> Result<GlobalTitle> {
    let indicator = tvb.read_u8(0)? & 0x0F;
    let translation_type = tvb.read_u8(1)?;
    let np_es = tvb.read_u8(2)?;
    let nature_of_address = tvb.read_u8(3)? & 0x7F;
    let numbering_plan = np_es >> 4;
    let encoding = np_es & 0x0F;
    let packed = tvb.bytes(4, tvb.remaining(4))?;
    let count = match encoding {
        1 => Some((packed.len() * 2).saturating_sub(1)),
        2 => Some(packed.len() * 2),
        _ => None,
    };
    let digits = decode_bcd(packed, count);

    node.push(gti_node(tvb, 0, indicator));
    node.push(FieldNode::new("Translation type", tvb.absolute(1), 1, Value::Unsigned(translation_type as u64)));
    node.push(np_node(tvb, 2, numbering_plan));
    node.push(
        FieldNode::new("Encoding scheme", tvb.absolute(2), 1, Value::Unsigned(encoding as u64)).with_suffix(
            match encoding {
                1 => "(BCD, odd number of digits)",
                2 => "(BCD, even number of digits)",
                _ => "(Unknown)",
            },
        ),
    );
    node.push(na_node(tvb, 3, nature_of_address));
    node.push(digits_node(tvb, 4, packed.len(), &digits));

    Ok(GlobalTitle {
        indicator,
        translation_type,
        numbering_plan,
        nature_of_address,
        digits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_nibble_first() {
        let bcd = decode_bcd(&[0x21, 0x43, 0xF5], None);
        assert_eq!(bcd.digits, "12345");
        assert!(bcd.is_valid());
    }

    #[test]
    fn test_star_and_hash() {
        let bcd = decode_bcd(&[0xCB], None);
        assert_eq!(bcd.digits, "*#");
        assert!(bcd.is_valid());
    }

    #[test]
    fn test_mid_string_filler_is_invalid() {
        let bcd = decode_bcd(&[0xF1, 0x32], None);
        assert_eq!(bcd.digits, "123");
        assert_eq!(bcd.invalid, vec![(1, 0x0F)]);

        let bcd = decode_bcd(&[0x1A, 0xE2], None);
        assert_eq!(bcd.digits, "12");
        assert_eq!(bcd.invalid, vec![(0, 0x0A), (3, 0x0E)]);
    }

    #[test]
    fn test_counted_digits() {
        let bcd = decode_bcd(&[0x21, 0xF3], Some(3));
        assert_eq!(bcd.digits, "123");
        assert!(bcd.is_valid());

        let bcd = decode_bcd(&[0x21, 0x43], Some(3));
        assert_eq!(bcd.digits, "123");
        assert_eq!(bcd.invalid, vec![(3, 0x04)]);
        assert_eq!(bcd.surplus, 0);
    }

    #[test]
    fn test_nibbles_beyond_count_are_noted() {
        let bcd = decode_bcd(&[0x21, 0xF3, 0x65], Some(3));
        assert_eq!(bcd.digits, "123");
        assert!(bcd.is_valid());
        assert_eq!(bcd.surplus, 2);

        let bcd = decode_bcd(&[0x21, 0x43], Some(2));
        assert_eq!(bcd.digits, "12");
        assert_eq!(bcd.surplus, 2);

        let tvb = ByteCursor::from_slice(&[0, 0, 0, 4, 3, 0, 1, 4, 0x21, 0xF3, 0x65]);
        let mut node = FieldNode::new("Global title", 0, tvb.len(), Value::None);
        dissect_rfc3868(&tvb, &mut node).unwrap();
        let digits = node.child("Global title digits").unwrap();
        assert_eq!(digits.value, Value::Str("123".into()));
        assert!(digits.has_expert(ExpertKind::TrailingData));
        assert!(!node.has_errors());
    }

    #[test]
    fn test_rfc3868_layout() {
        let tvb = ByteCursor::from_slice(&[0, 0, 0, 4, 5, 0, 1, 4, 0x21, 0x43, 0xF5]);
        let mut node = FieldNode::new("Global title", 0, tvb.len(), Value::None);
        let gt = dissect_rfc3868(&tvb, &mut node).unwrap();
        assert_eq!(gt.indicator, 4);
        assert_eq!(gt.digits.digits, "12345");
        assert_eq!(
            node.child("Nature of address").and_then(|n| n.suffix.as_deref()),
            Some("(International number)")
        );
        assert!(!node.has_errors());
    }

    #[test]
    fn test_draft08_layout() {
        let tvb = ByteCursor::from_slice(&[4, 0, 0x11, 4, 0x21, 0xF3]);
        let mut node = FieldNode::new("Global title", 0, tvb.len(), Value::None);
        let gt = dissect_draft08(&tvb, &mut node).unwrap();
        assert_eq!(gt.numbering_plan, 1);
        assert_eq!(gt.digits.digits, "123");
        assert!(!node.has_errors());

        let bad = ByteCursor::from_slice(&[4, 0, 0x12, 4, 0x21, 0x3D]);
        let mut node = FieldNode::new("Global title", 0, bad.len(), Value::None);
        dissect_draft08(&bad, &mut node).unwrap();
        assert!(node.has_expert(ExpertKind::Malformed));
    }
}
