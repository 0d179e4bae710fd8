//! Common signalling types shared by the MTP3, M3UA and SUA decoders

use serde::{Deserialize, Serialize};
use std::fmt;

/// MTP3 variant; decides point code width and routing label layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mtp3Standard {
    #[default]
    Itu,
    Ansi,
    ChineseItu,
    Japan,
}

impl Mtp3Standard {
    /// Significant bits in a point code
    pub fn point_code_bits(self) -> u32 {
        match self {
            Self::Itu => 14,
            Self::Ansi | Self::ChineseItu => 24,
            Self::Japan => 16,
        }
    }

    /// Bytes a point code occupies in the routing label
    pub fn point_code_len(self) -> usize {
        match self {
            Self::Itu | Self::Japan => 2,
            Self::Ansi | Self::ChineseItu => 3,
        }
    }

    pub fn point_code_mask(self) -> u32 {
        (1u32 << self.point_code_bits()) - 1
    }
}

/// How point codes are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PointCodeFormat {
    #[default]
    Decimal,
    /// Dotted fields: ITU 3-8-3, ANSI/China 8-8-8, Japan 5-4-7
    Structured,
}

/// Signalling point code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointCode(pub u32);

impl PointCode {
    /// Create ITU format point code (14-bit, 3-8-3)
    pub fn itu(zone: u8, area: u8, sp: u8) -> Self {
        let pc = ((zone as u32 & 0x07) << 11) | ((area as u32) << 3) | (sp as u32 & 0x07);
        Self(pc)
    }

    /// Create ANSI format point code (24-bit, 8-8-8)
    pub fn ansi(network: u8, cluster: u8, member: u8) -> Self {
        let pc = ((network as u32) << 16) | ((cluster as u32) << 8) | (member as u32);
        Self(pc)
    }

    /// Create Japan format point code (16-bit, 5-4-7)
    pub fn japan(zone: u8, area: u8, unit: u8) -> Self {
        let pc = ((zone as u32 & 0x1F) << 11) | ((area as u32 & 0x0F) << 7) | (unit as u32 & 0x7F);
        Self(pc)
    }

    /// Keep only the bits the standard defines
    pub fn masked(raw: u32, standard: Mtp3Standard) -> Self {
        Self(raw & standard.point_code_mask())
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn display(self, standard: Mtp3Standard, format: PointCodeFormat) -> PointCodeDisplay {
        PointCodeDisplay {
            pc: self,
            standard,
            format,
        }
    }

    pub fn format(self, standard: Mtp3Standard, format: PointCodeFormat) -> String {
        self.display(standard, format).to_string()
    }
}

impl From<u32> for PointCode {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

pub struct PointCodeDisplay {
    pc: PointCode,
    standard: Mtp3Standard,
    format: PointCodeFormat,
}

impl fmt::Display for PointCodeDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pc = self.pc.0;
        match (self.format, self.standard) {
            (PointCodeFormat::Decimal, _) => write!(f, "{}", pc),
            (PointCodeFormat::Structured, Mtp3Standard::Itu) => {
                write!(f, "{}-{}-{}", (pc >> 11) & 0x07, (pc >> 3) & 0xFF, pc & 0x07)
            }
            (PointCodeFormat::Structured, Mtp3Standard::Ansi | Mtp3Standard::ChineseItu) => {
                write!(f, "{}-{}-{}", (pc >> 16) & 0xFF, (pc >> 8) & 0xFF, pc & 0xFF)
            }
            (PointCodeFormat::Structured, Mtp3Standard::Japan) => {
                write!(f, "{}-{}-{}", (pc >> 11) & 0x1F, (pc >> 7) & 0x0F, pc & 0x7F)
            }
        }
    }
}

/// Network Indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum NetworkIndicator {
    International = 0,
    InternationalSpare = 1,
    National = 2,
    NationalSpare = 3,
}

impl NetworkIndicator {
    pub fn name(self) -> &'static str {
        match self {
            Self::International => "International network",
            Self::InternationalSpare => "Spare (for international use only)",
            Self::National => "National network",
            Self::NationalSpare => "Reserved for national use",
        }
    }
}

impl From<u8> for NetworkIndicator {
    fn from(v: u8) -> Self {
        match v & 0x03 {
            0 => Self::International,
            1 => Self::InternationalSpare,
            2 => Self::National,
            _ => Self::NationalSpare,
        }
    }
}

/// SCCP protocol class octet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolClass {
    pub class: u8,
    pub return_on_error: bool,
}

impl ProtocolClass {
    pub fn decode(v: u8) -> Self {
        Self {
            class: v & 0x03,
            return_on_error: (v & 0x80) != 0,
        }
    }

    pub fn is_connection_oriented(&self) -> bool {
        self.class >= 2
    }
}

/// Name of a global title numbering plan
pub fn numbering_plan_name(np: u8) -> &'static str {
    match np {
        0 => "Unknown",
        1 => "ISDN/Telephony (E.164)",
        2 => "Generic",
        3 => "Data (X.121)",
        4 => "Telex (F.69)",
        5 => "Maritime mobile (E.210/211)",
        6 => "Land mobile (E.212)",
        7 => "ISDN/Mobile (E.214)",
        14 => "Private",
        _ => "Reserved",
    }
}

/// Name of a global title nature of address
pub fn nature_of_address_name(na: u8) -> &'static str {
    match na {
        0 => "Unknown",
        1 => "Subscriber number",
        2 => "Reserved for national use",
        3 => "National significant number",
        4 => "International number",
        _ => "Spare",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_code_widths() {
        assert_eq!(Mtp3Standard::Itu.point_code_mask(), 0x3FFF);
        assert_eq!(Mtp3Standard::Ansi.point_code_mask(), 0xFF_FFFF);
        assert_eq!(Mtp3Standard::Japan.point_code_mask(), 0xFFFF);
        assert_eq!(PointCode::masked(0xFFFF_FFFF, Mtp3Standard::Itu).0, 0x3FFF);
    }

    #[test]
    fn test_structured_formats() {
        let itu = PointCode::itu(2, 100, 5);
        assert_eq!(itu.format(Mtp3Standard::Itu, PointCodeFormat::Structured), "2-100-5");
        assert_eq!(itu.format(Mtp3Standard::Itu, PointCodeFormat::Decimal), itu.0.to_string());

        let ansi = PointCode::ansi(10, 20, 30);
        assert_eq!(ansi.format(Mtp3Standard::Ansi, PointCodeFormat::Structured), "10-20-30");

        let japan = PointCode::japan(3, 9, 100);
        assert_eq!(japan.format(Mtp3Standard::Japan, PointCodeFormat::Structured), "3-9-100");
    }

    #[test]
    fn test_protocol_class_decode() {
        let pc = ProtocolClass::decode(0x82);
        assert_eq!(pc.class, 2);
        assert!(pc.return_on_error);
        assert!(pc.is_connection_oriented());
    }
}
