//! BER identifier and length octets

use crate::cursor::ByteCursor;
use crate::errors::{DissectError, Result};
use serde::Serialize;

/// Universal tag numbers
pub mod universal {
    pub const EOC: u32 = 0;
    pub const BOOLEAN: u32 = 1;
    pub const INTEGER: u32 = 2;
    pub const BIT_STRING: u32 = 3;
    pub const OCTET_STRING: u32 = 4;
    pub const NULL: u32 = 5;
    pub const OBJECT_IDENTIFIER: u32 = 6;
    pub const ENUMERATED: u32 = 10;
    pub const UTF8_STRING: u32 = 12;
    pub const SEQUENCE: u32 = 16;
    pub const SET: u32 = 17;
    pub const NUMERIC_STRING: u32 = 18;
    pub const PRINTABLE_STRING: u32 = 19;
    pub const TELETEX_STRING: u32 = 20;
    pub const VIDEOTEX_STRING: u32 = 21;
    pub const IA5_STRING: u32 = 22;
    pub const UTC_TIME: u32 = 23;
    pub const GENERALIZED_TIME: u32 = 24;
    pub const GRAPHIC_STRING: u32 = 25;
    pub const VISIBLE_STRING: u32 = 26;
    pub const GENERAL_STRING: u32 = 27;
    pub const UNIVERSAL_STRING: u32 = 28;
    pub const BMP_STRING: u32 = 30;
}

/// Length octets beyond this count are rejected
const MAX_LENGTH_OCTETS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TagClass {
    Universal,
    Application,
    Context,
    Private,
}

impl TagClass {
    pub fn from_identifier(octet: u8) -> Self {
        match octet >> 6 {
            0 => Self::Universal,
            1 => Self::Application,
            2 => Self::Context,
            _ => Self::Private,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::Universal => 0x00,
            Self::Application => 0x40,
            Self::Context => 0x80,
            Self::Private => 0xC0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Definite(usize),
    /// Content runs until an end-of-contents marker
    Indefinite,
}

/// Decoded identifier and length octets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub class: TagClass,
    pub constructed: bool,
    pub tag: u32,
    pub length: Length,
    /// Bytes taken by identifier and length octets
    pub header_len: usize,
}

impl Header {
    /// The `00 00` end-of-contents marker
    pub fn is_eoc(&self) -> bool {
        self.class == TagClass::Universal
            && !self.constructed
            && self.tag == universal::EOC
            && self.length == Length::Definite(0)
    }

    pub fn is_universal(&self, tag: u32) -> bool {
        self.class == TagClass::Universal && self.tag == tag
    }

    pub fn definite_len(&self) -> Option<usize> {
        match self.length {
            Length::Definite(n) => Some(n),
            Length::Indefinite => None,
        }
    }
}

/// Read the identifier and length octets at `offset`.
///
/// Does not check that the content itself is present; callers do that
/// against the view they decode from.
pub fn read_header(tvb: &ByteCursor, offset: usize) -> Result<Header> {
    let identifier = tvb.read_u8(offset)?;
    let class = TagClass::from_identifier(identifier);
    let constructed = identifier & 0x20 != 0;
    let mut pos = offset + 1;

    let mut tag = (identifier & 0x1F) as u32;
    if tag == 0x1F {
        tag = 0;
        loop {
            let octet = tvb.read_u8(pos)?;
            pos += 1;
            if tag > (u32::MAX >> 7) {
                return Err(DissectError::malformed(
                    tvb.absolute(offset),
                    "tag number overflows 32 bits",
                ));
            }
            tag = (tag << 7) | (octet & 0x7F) as u32;
            if octet & 0x80 == 0 {
                break;
            }
        }
    }

    let first = tvb.read_u8(pos)?;
    pos += 1;
    let length = match first {
        0x00..=0x7F => Length::Definite(first as usize),
        0x80 => {
            if !constructed {
                return Err(DissectError::malformed(
                    tvb.absolute(offset),
                    "indefinite length on a primitive encoding",
                ));
            }
            Length::Indefinite
        }
        0xFF => {
            return Err(DissectError::malformed(
                tvb.absolute(pos - 1),
                "reserved length octet 0xFF",
            ));
        }
        _ => {
            let count = (first & 0x7F) as usize;
            if count > MAX_LENGTH_OCTETS {
                return Err(DissectError::malformed(
                    tvb.absolute(pos - 1),
                    format!("{} length octets", count),
                ));
            }
            if tvb.remaining(pos) < count {
                return Err(DissectError::malformed(
                    tvb.absolute(pos - 1),
                    format!(
                        "length encoding claims {} octets, {} remain",
                        count,
                        tvb.remaining(pos)
                    ),
                ));
            }
            let raw = tvb.bytes(pos, count)?;
            let value = raw.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
            pos += count;
            let value = usize::try_from(value).map_err(|_| {
                DissectError::malformed(tvb.absolute(offset), "length does not fit in memory")
            })?;
            Length::Definite(value)
        }
    };

    Ok(Header {
        class,
        constructed,
        tag,
        length,
        header_len: pos - offset,
    })
}
