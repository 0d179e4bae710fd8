//! MTP3 service information octet and routing label
//!
//! Used for the MSU carried in M3UA draft Protocol Data 1/2 parameters and
//! for bare MTP3 frames. Payloads are handed to whatever is registered in
//! the `mtp3.service_indicator` table.

use super::tlv::SigtranContext;
use crate::config::DissectConfig;
use crate::cursor::ByteCursor;
use crate::errors::{DissectError, Result};
use crate::registry::OidRegistry;
use crate::tree::{Dissection, FieldNode, Value};
use crate::types::{Mtp3Standard, NetworkIndicator, PointCode};
use tracing::{instrument, warn};

pub const SERVICE_INDICATOR_TABLE: &str = "mtp3.service_indicator";

/// Service indicator values (Q.704 14.2.1)
pub mod si {
    pub const SNM: u8 = 0;
    pub const MTN: u8 = 1;
    pub const MTNS: u8 = 2;
    pub const SCCP: u8 = 3;
    pub const TUP: u8 = 4;
    pub const ISUP: u8 = 5;
    pub const DUP_CALL: u8 = 6;
    pub const DUP_FACILITY: u8 = 7;
    pub const MTP_TESTING: u8 = 8;
    pub const BISUP: u8 = 9;
    pub const SISUP: u8 = 10;
    pub const AAL2: u8 = 12;
    pub const BICC: u8 = 13;
    pub const GCP: u8 = 14;
}

pub fn service_indicator_name(value: u8) -> &'static str {
    match value {
        si::SNM => "SNM",
        si::MTN => "MTN",
        si::MTNS => "MTNS",
        si::SCCP => "SCCP",
        si::TUP => "TUP",
        si::ISUP => "ISUP",
        si::DUP_CALL => "DUP (call and circuit related messages)",
        si::DUP_FACILITY => "DUP (facility registration and cancellation message)",
        si::MTP_TESTING => "MTP testing user part",
        si::BISUP => "Broadband ISUP",
        si::SISUP => "Satellite ISUP",
        si::AAL2 => "AAL type2 Signalling",
        si::BICC => "Bearer Independent Call Control",
        si::GCP => "Gateway Control Protocol",
        _ => "Spare",
    }
}

/// Decoded service information octet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceInfo {
    pub network_indicator: NetworkIndicator,
    /// Message priority (ANSI and Japan only, spare elsewhere)
    pub priority: u8,
    pub service_indicator: u8,
}

impl ServiceInfo {
    pub fn decode(octet: u8) -> Self {
        Self {
            network_indicator: NetworkIndicator::from(octet >> 6),
            priority: (octet >> 4) & 0x03,
            service_indicator: octet & 0x0F,
        }
    }

    pub fn to_node(&self, offset: usize, octet: u8, standard: Mtp3Standard) -> FieldNode {
        let mut node = FieldNode::new("Service information octet", offset, 1, Value::Unsigned(octet as u64));
        node.push(
            FieldNode::new(
                "Network indicator",
                offset,
                1,
                Value::Unsigned(self.network_indicator as u64),
            )
            .with_suffix(format!("({})", self.network_indicator.name())),
        );
        if matches!(standard, Mtp3Standard::Ansi | Mtp3Standard::Japan) {
            node.push(FieldNode::new("Message priority", offset, 1, Value::Unsigned(self.priority as u64)));
        }
        node.push(
            FieldNode::new(
                "Service indicator",
                offset,
                1,
                Value::Unsigned(self.service_indicator as u64),
            )
            .with_suffix(format!("({})", service_indicator_name(self.service_indicator))),
        );
        node
    }
}

/// Routing label: destination, origin, signalling link selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingLabel {
    pub dpc: PointCode,
    pub opc: PointCode,
    pub sls: u8,
}

impl RoutingLabel {
    /// Wire size of the label for a standard
    pub fn wire_len(standard: Mtp3Standard) -> usize {
        match standard {
            Mtp3Standard::Itu => 4,
            Mtp3Standard::Ansi | Mtp3Standard::ChineseItu => 7,
            Mtp3Standard::Japan => 5,
        }
    }

    /// Read a label at `offset`. All fields are little-endian.
    pub fn read(tvb: &ByteCursor, offset: usize, standard: Mtp3Standard) -> Result<Self> {
        let b = tvb.bytes(offset, Self::wire_len(standard))?;
        let label = match standard {
            Mtp3Standard::Itu => {
                let word = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                Self {
                    dpc: PointCode(word & 0x3FFF),
                    opc: PointCode((word >> 14) & 0x3FFF),
                    sls: (word >> 28) as u8,
                }
            }
            Mtp3Standard::Ansi | Mtp3Standard::ChineseItu => {
                let sls_mask = if standard == Mtp3Standard::Ansi { 0xFF } else { 0x0F };
                Self {
                    dpc: PointCode(u32::from_le_bytes([b[0], b[1], b[2], 0])),
                    opc: PointCode(u32::from_le_bytes([b[3], b[4], b[5], 0])),
                    sls: b[6] & sls_mask,
                }
            }
            Mtp3Standard::Japan => Self {
                dpc: PointCode(u16::from_le_bytes([b[0], b[1]]) as u32),
                opc: PointCode(u16::from_le_bytes([b[2], b[3]]) as u32),
                sls: b[4] & 0x0F,
            },
        };
        Ok(label)
    }

    pub fn to_node(&self, ctx: &SigtranContext<'_>, tvb: &ByteCursor, offset: usize) -> FieldNode {
        let len = Self::wire_len(ctx.mtp3().standard);
        let mut node = FieldNode::new("Routing label", tvb.absolute(offset), len, Value::None);
        node.push(
            FieldNode::new("DPC", tvb.absolute(offset), len, Value::Unsigned(self.dpc.0 as u64))
                .with_suffix(format!("({})", ctx.format_point_code(self.dpc.0))),
        );
        node.push(
            FieldNode::new("OPC", tvb.absolute(offset), len, Value::Unsigned(self.opc.0 as u64))
                .with_suffix(format!("({})", ctx.format_point_code(self.opc.0))),
        );
        node.push(FieldNode::new(
            "Signalling link selector",
            tvb.absolute(offset + len - 1),
            1,
            Value::Unsigned(self.sls as u64),
        ));
        node
    }
}

/// What the caller needs for its summary columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsuSummary {
    pub service: ServiceInfo,
    pub label: RoutingLabel,
}

/// Decode SIO, routing label and payload starting at `offset`, pushing
/// the fields onto `parent`
pub fn dissect_msu(
    ctx: &SigtranContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    parent: &mut FieldNode,
) -> Result<MsuSummary> {
    let standard = ctx.mtp3().standard;
    let octet = tvb.read_u8(offset)?;
    let service = ServiceInfo::decode(octet);
    parent.push(service.to_node(tvb.absolute(offset), octet, standard));

    let label = RoutingLabel::read(tvb, offset + 1, standard)?;
    parent.push(label.to_node(ctx, tvb, offset + 1));

    let data_offset = offset + 1 + RoutingLabel::wire_len(standard);
    let payload = tvb.subset_clamped(data_offset, tvb.remaining(data_offset));
    if !payload.is_empty() {
        parent.push(dissect_payload(ctx, service.service_indicator as u32, &payload));
    }
    Ok(MsuSummary { service, label })
}

/// Payload by service indicator, raw bytes when nobody is registered
pub fn dissect_payload(ctx: &SigtranContext<'_>, service_indicator: u32, payload: &ByteCursor) -> FieldNode {
    ctx.dispatch(SERVICE_INDICATOR_TABLE, service_indicator, payload)
        .unwrap_or_else(|| FieldNode::new("Data", payload.absolute(0), payload.len(), Value::Bytes(payload.tail(0))))
}

/// Decode a bare MTP3 MSU (SIO first)
#[instrument(level = "debug", skip_all, fields(len = tvb.len()))]
pub fn dissect(registry: &OidRegistry, config: &DissectConfig, tvb: &ByteCursor) -> Dissection {
    let ctx = SigtranContext::new(registry, config);
    let mut root = FieldNode::new("Message Transfer Part Level 3", tvb.absolute(0), tvb.len(), Value::None);
    match dissect_msu(&ctx, tvb, 0, &mut root) {
        Ok(summary) => Dissection {
            protocol: "MTP3",
            info: service_indicator_name(summary.service.service_indicator).to_string(),
            source: Some(ctx.format_point_code(summary.label.opc.0)),
            destination: Some(ctx.format_point_code(summary.label.dpc.0)),
            malformed: false,
            root,
        },
        Err(err) => malformed(root, tvb, err),
    }
}

fn malformed(mut root: FieldNode, tvb: &ByteCursor, err: DissectError) -> Dissection {
    warn!(error = %err, "malformed MTP3 frame");
    let decoded: usize = root.children.iter().map(|c| c.length).sum();
    root.push(FieldNode::flagged("MSU", tvb.absolute(decoded), tvb.tail(decoded), &err));
    Dissection {
        protocol: "MTP3",
        info: "[Malformed Packet]".to_string(),
        source: None,
        destination: None,
        malformed: true,
        root,
    }
}
