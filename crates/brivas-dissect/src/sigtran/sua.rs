//! SUA (SCCP User Adaptation) decoder
//!
//! Supports draft-ietf-sigtran-sua-08 and RFC 3868. Besides the parameter
//! tree the decoder works out the address columns from the Source and
//! Destination Address parameters, hands the Data payload to the
//! subsystem registered for the called SSN, and correlates
//! connection-oriented messages through the session's
//! [`AssociationTable`].

use super::association::{Association, AssociationKey, AssociationTable};
use super::global_title;
use super::tlv::{
    expect_len, expect_multiple, read_point_code, string_node, u32_node, walk_nested, walk_parameters, CommonHeader,
    Parameter, ParameterDecoder, SigtranContext, COMMON_HEADER_LEN,
};
use crate::config::DissectConfig;
use crate::cursor::ByteCursor;
use crate::errors::Result;
use crate::registry::OidRegistry;
use crate::tree::{Dissection, ExpertInfo, ExpertKind, FieldNode, Value};
use crate::types::ProtocolClass;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument, warn};

pub const PROTOCOL_VERSION: u8 = 1;
pub const SSN_TABLE: &str = "sua.ssn";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuaVersion {
    #[serde(rename = "draft-08")]
    Draft08,
    #[default]
    #[serde(rename = "rfc3868")]
    Rfc3868,
}

impl SuaVersion {
    pub const ALL: [SuaVersion; 2] = [Self::Draft08, Self::Rfc3868];

    fn keyword(self) -> &'static str {
        match self {
            Self::Draft08 => "draft-08",
            Self::Rfc3868 => "rfc3868",
        }
    }

    fn tags(self) -> TagTable {
        match self {
            Self::Draft08 => DRAFT08_TAGS,
            Self::Rfc3868 => RFC3868_TAGS,
        }
    }
}

impl fmt::Display for SuaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for SuaVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.keyword().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown SUA version: {}", s))
    }
}

pub mod class {
    pub const MGMT: u8 = 0;
    pub const SSNM: u8 = 2;
    pub const ASPSM: u8 = 3;
    pub const ASPTM: u8 = 4;
    pub const CL: u8 = 7;
    pub const CO: u8 = 8;
    pub const RKM: u8 = 9;
}

/// Connection-oriented message types
pub mod co {
    pub const CORE: u8 = 1;
    pub const COAK: u8 = 2;
}

pub fn message_class_name(msg_class: u8) -> Option<&'static str> {
    match msg_class {
        class::MGMT => Some("Management messages"),
        class::SSNM => Some("SS7 signalling network management messages"),
        class::ASPSM => Some("ASP state maintenance messages"),
        class::ASPTM => Some("ASP traffic maintenance messages"),
        class::CL => Some("Connectionless messages"),
        class::CO => Some("Connection-oriented messages"),
        class::RKM => Some("Routing key management messages"),
        _ => None,
    }
}

pub fn message_type_name(msg_class: u8, msg_type: u8) -> Option<&'static str> {
    let names: &[&str] = match msg_class {
        class::MGMT => &["ERR", "NTFY"],
        class::SSNM => &["", "DUNA", "DAVA", "DAUD", "SCON", "DUPU", "DRST"],
        class::ASPSM => &["", "ASPUP", "ASPDN", "BEAT", "ASPUP_ACK", "ASPDN_ACK", "BEAT_ACK"],
        class::ASPTM => &["", "ASPAC", "ASPIA", "ASPAC_ACK", "ASPIA_ACK"],
        class::CL => &["", "CLDT", "CLDR"],
        class::CO => &[
            "", "CORE", "COAK", "COREF", "RELRE", "RELCO", "RESCO", "RESRE", "CODT", "CODA", "COERR", "COIT",
        ],
        class::RKM => &["", "REG_REQ", "REG_RSP", "DEREG_REQ", "DEREG_RSP"],
        _ => return None,
    };
    names.get(msg_type as usize).copied().filter(|n| !n.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Param {
    InfoString,
    RoutingContext,
    DiagnosticInfo,
    HeartbeatData,
    Reason,
    TrafficModeType,
    ErrorCode,
    Status,
    AspIdentifier,
    AffectedPointCode,
    CorrelationId,
    RegistrationResult,
    DeregistrationResult,
    RegistrationStatus,
    DeregistrationStatus,
    LocalRoutingKeyIdentifier,
    HopCounter,
    SourceAddress,
    DestinationAddress,
    SourceReference,
    DestinationReference,
    SccpCause,
    SequenceNumber,
    ReceiveSequenceNumber,
    AspCapabilities,
    Credit,
    Data,
    UserCause,
    NetworkAppearance,
    RoutingKey,
    DrnLabel,
    TidLabel,
    AddressRange,
    Smi,
    Importance,
    MessagePriority,
    ProtocolClass,
    SequenceControl,
    Segmentation,
    CongestionLevel,
    GlobalTitle,
    PointCode,
    SubsystemNumber,
    Ipv4Address,
    Hostname,
    Ipv6Address,
}

type TagTable = &'static [(u16, Param, &'static str)];

static RFC3868_TAGS: TagTable = &[
    (0x0004, Param::InfoString, "Info string"),
    (0x0006, Param::RoutingContext, "Routing context"),
    (0x0007, Param::DiagnosticInfo, "Diagnostic information"),
    (0x0009, Param::HeartbeatData, "Heartbeat data"),
    (0x000b, Param::TrafficModeType, "Traffic mode type"),
    (0x000c, Param::ErrorCode, "Error code"),
    (0x000d, Param::Status, "Status"),
    (0x0011, Param::AspIdentifier, "ASP identifier"),
    (0x0012, Param::AffectedPointCode, "Affected point code"),
    (0x0013, Param::CorrelationId, "Correlation ID"),
    (0x0014, Param::RegistrationResult, "Registration result"),
    (0x0015, Param::DeregistrationResult, "Deregistration result"),
    (0x0016, Param::RegistrationStatus, "Registration status"),
    (0x0017, Param::DeregistrationStatus, "Deregistration status"),
    (0x0018, Param::LocalRoutingKeyIdentifier, "Local routing key identifier"),
    (0x0101, Param::HopCounter, "SS7 hop counter"),
    (0x0102, Param::SourceAddress, "Source address"),
    (0x0103, Param::DestinationAddress, "Destination address"),
    (0x0104, Param::SourceReference, "Source reference number"),
    (0x0105, Param::DestinationReference, "Destination reference number"),
    (0x0106, Param::SccpCause, "SCCP cause"),
    (0x0107, Param::SequenceNumber, "Sequence number"),
    (0x0108, Param::ReceiveSequenceNumber, "Receive sequence number"),
    (0x0109, Param::AspCapabilities, "ASP capabilities"),
    (0x010a, Param::Credit, "Credit"),
    (0x010b, Param::Data, "Data"),
    (0x010c, Param::UserCause, "User / Cause"),
    (0x010d, Param::NetworkAppearance, "Network appearance"),
    (0x010e, Param::RoutingKey, "Routing key"),
    (0x010f, Param::DrnLabel, "DRN label"),
    (0x0110, Param::TidLabel, "TID label"),
    (0x0111, Param::AddressRange, "Address range"),
    (0x0112, Param::Smi, "SMI"),
    (0x0113, Param::Importance, "Importance"),
    (0x0114, Param::MessagePriority, "Message priority"),
    (0x0115, Param::ProtocolClass, "Protocol class"),
    (0x0116, Param::SequenceControl, "Sequence control"),
    (0x0117, Param::Segmentation, "Segmentation"),
    (0x0118, Param::CongestionLevel, "Congestion level"),
    (0x8001, Param::GlobalTitle, "Global title"),
    (0x8002, Param::PointCode, "Point code"),
    (0x8003, Param::SubsystemNumber, "Subsystem number"),
    (0x8004, Param::Ipv4Address, "IPv4 address"),
    (0x8005, Param::Hostname, "Hostname"),
    (0x8006, Param::Ipv6Address, "IPv6 address"),
];

static DRAFT08_TAGS: TagTable = &[
    (0x0001, Param::Data, "Data"),
    (0x0002, Param::InfoString, "Info string"),
    (0x0003, Param::RoutingContext, "Routing context"),
    (0x0004, Param::DiagnosticInfo, "Diagnostic information"),
    (0x0005, Param::HeartbeatData, "Heartbeat data"),
    (0x0006, Param::Reason, "Reason"),
    (0x0007, Param::TrafficModeType, "Traffic mode type"),
    (0x0008, Param::ErrorCode, "Error code"),
    (0x0009, Param::Status, "Status type / information"),
    (0x000a, Param::CongestionLevel, "Congestion level"),
    (0x000b, Param::AspIdentifier, "ASP identifier"),
    (0x000c, Param::RoutingKey, "Routing key"),
    (0x000d, Param::RegistrationResult, "Registration result"),
    (0x000e, Param::DeregistrationResult, "Deregistration result"),
    (0x000f, Param::AddressRange, "Address range"),
    (0x0101, Param::SourceAddress, "Source address"),
    (0x0102, Param::DestinationAddress, "Destination address"),
    (0x0103, Param::SourceReference, "Source reference number"),
    (0x0104, Param::DestinationReference, "Destination reference number"),
    (0x0105, Param::SccpCause, "SCCP cause"),
    (0x0106, Param::SequenceNumber, "Sequence number"),
    (0x0107, Param::ReceiveSequenceNumber, "Receive sequence number"),
    (0x0108, Param::AspCapabilities, "ASP capabilities"),
    (0x0109, Param::Credit, "Credit"),
    (0x010a, Param::UserCause, "User / Cause"),
    (0x010b, Param::NetworkAppearance, "Network appearance"),
    (0x010c, Param::AffectedPointCode, "Affected point code"),
    (0x010d, Param::HopCounter, "SS7 hop counter"),
    (0x010e, Param::ProtocolClass, "Protocol class"),
    (0x010f, Param::SequenceControl, "Sequence control"),
    (0x0110, Param::Segmentation, "Segmentation"),
    (0x0111, Param::Smi, "SMI"),
    (0x0112, Param::TidLabel, "TID label"),
    (0x0113, Param::DrnLabel, "DRN label"),
    (0x0114, Param::CorrelationId, "Correlation ID"),
    (0x8001, Param::GlobalTitle, "Global title"),
    (0x8002, Param::PointCode, "Point code"),
    (0x8003, Param::SubsystemNumber, "Subsystem number"),
    (0x8004, Param::Ipv4Address, "IPv4 address"),
    (0x8005, Param::Hostname, "Hostname"),
    (0x8006, Param::Ipv6Address, "IPv6 address"),
];

const TRAFFIC_MODES: &[(u32, &str)] = &[(1, "Override"), (2, "Loadshare"), (3, "Broadcast")];

const ERROR_CODES: &[(u32, &str)] = &[
    (0x01, "Invalid version"),
    (0x03, "Unsupported message class"),
    (0x04, "Unsupported message type"),
    (0x05, "Unsupported traffic handling mode"),
    (0x06, "Unexpected message"),
    (0x07, "Protocol error"),
    (0x09, "Invalid stream identifier"),
    (0x0d, "Refused - management blocking"),
    (0x0e, "ASP identifier required"),
    (0x0f, "Invalid ASP identifier"),
    (0x11, "Invalid parameter value"),
    (0x12, "Parameter field error"),
    (0x13, "Unexpected parameter"),
    (0x14, "Destination status unknown"),
    (0x15, "Invalid network appearance"),
    (0x16, "Missing parameter"),
    (0x19, "Invalid routing context"),
    (0x1a, "No configured AS for ASP"),
    (0x1b, "Subsystem status unknown"),
    (0x1c, "Invalid loadsharing label"),
];

const ROUTING_INDICATORS: &[(u32, &str)] = &[
    (1, "Route on Global Title"),
    (2, "Route on SSN + PC"),
    (3, "Route on Hostname"),
    (4, "Route on SSN + IP address"),
];

pub mod routing_indicator {
    pub const GLOBAL_TITLE: u16 = 1;
    pub const SSN_PC: u16 = 2;
}

fn sccp_cause_type_name(cause_type: u8) -> &'static str {
    match cause_type {
        1 => "Return cause",
        2 => "Refusal cause",
        3 => "Release cause",
        4 => "Reset cause",
        5 => "Error cause",
        _ => "Unknown",
    }
}

/// Address elements seen inside one Source/Destination Address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AddressCapture {
    gt_digits: Option<String>,
    point_code: Option<u32>,
    ssn: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Address {
    routing_indicator: u16,
    capture: AddressCapture,
}

impl Address {
    /// Column text chosen by the routing indicator
    fn column(&self, ctx: &SigtranContext<'_>) -> Option<String> {
        match self.routing_indicator {
            routing_indicator::GLOBAL_TITLE => self.capture.gt_digits.clone(),
            routing_indicator::SSN_PC => self.capture.point_code.map(|pc| ctx.format_point_code(pc)),
            _ => self.capture.ssn.map(|ssn| format!("SSN {}", ssn)),
        }
    }
}

struct SuaDecoder {
    version: SuaVersion,
    /// Address whose sub-parameters are being walked
    current: Option<AddressCapture>,
    source: Option<Address>,
    destination: Option<Address>,
    source_reference: Option<u32>,
    destination_reference: Option<u32>,
    /// Data value and the offset of its parameter, dispatched after the walk
    data: Option<(usize, ByteCursor)>,
}

impl SuaDecoder {
    fn new(version: SuaVersion) -> Self {
        Self {
            version,
            current: None,
            source: None,
            destination: None,
            source_reference: None,
            destination_reference: None,
            data: None,
        }
    }

    fn lookup(&self, tag: u16) -> Option<(Param, &'static str)> {
        self.version
            .tags()
            .iter()
            .find(|(t, _, _)| *t == tag)
            .map(|&(_, param, name)| (param, name))
    }

    fn capture(&mut self) -> Option<&mut AddressCapture> {
        self.current.as_mut()
    }

    fn dissect_address(
        &mut self,
        ctx: &mut SigtranContext<'_>,
        kind: Param,
        param: &Parameter,
        node: &mut FieldNode,
    ) -> Result<()> {
        let v = &param.value;
        let ri = v.read_u16(0)?;
        let ai = v.read_u16(2)?;
        node.push(
            FieldNode::new("Routing indicator", v.absolute(0), 2, Value::Unsigned(ri as u64)).with_suffix(format!(
                "({})",
                ROUTING_INDICATORS
                    .iter()
                    .find(|(r, _)| *r == ri as u32)
                    .map_or("Unknown", |(_, name)| name)
            )),
        );
        node.push(FieldNode::new("Address indicator", v.absolute(2), 2, Value::Unsigned(ai as u64)));

        let saved = self.current.replace(AddressCapture::default());
        let nested = v.subset_clamped(4, v.remaining(4));
        let walked = walk_nested(ctx, self, &nested, node);
        let capture = std::mem::replace(&mut self.current, saved).unwrap_or_default();
        walked?;

        let address = Address {
            routing_indicator: ri,
            capture,
        };
        if let Some(column) = address.column(ctx) {
            node.suffix = Some(format!("({})", column));
        }
        match kind {
            Param::SourceAddress => self.source = Some(address),
            _ => self.destination = Some(address),
        }
        Ok(())
    }

    fn point_code(&self, address: &Option<Address>) -> u32 {
        address.as_ref().and_then(|a| a.capture.point_code).unwrap_or(0)
    }

    /// Called SSN, falling back to the calling one
    fn dispatch_ssn(&self) -> Option<u8> {
        self.destination
            .as_ref()
            .and_then(|a| a.capture.ssn)
            .or_else(|| self.source.as_ref().and_then(|a| a.capture.ssn))
    }
}

/// Value in the last byte of a 4 byte field
fn last_byte(param: &Parameter, name: &'static str) -> Result<FieldNode> {
    expect_len(param, 4)?;
    let v = &param.value;
    Ok(FieldNode::new(name, v.absolute(3), 1, Value::Unsigned(v.read_u8(3)? as u64)))
}

/// Start, end, value label (DRN and TID)
fn label_nodes(param: &Parameter, node: &mut FieldNode) -> Result<()> {
    expect_len(param, 4)?;
    let v = &param.value;
    node.push(FieldNode::new("Start", v.absolute(0), 1, Value::Unsigned(v.read_u8(0)? as u64)));
    node.push(FieldNode::new("End", v.absolute(1), 1, Value::Unsigned(v.read_u8(1)? as u64)));
    node.push(FieldNode::new("Label value", v.absolute(2), 2, Value::Unsigned(v.read_u16(2)? as u64)));
    Ok(())
}

impl ParameterDecoder for SuaDecoder {
    fn parameter_name(&self, tag: u16) -> Option<&'static str> {
        self.lookup(tag).map(|(_, name)| name)
    }

    fn decode_value(&mut self, ctx: &mut SigtranContext<'_>, param: &Parameter, node: &mut FieldNode) -> Result<()> {
        let Some((kind, _)) = self.lookup(param.tag) else {
            return Ok(());
        };
        let v = &param.value;
        match kind {
            Param::InfoString => node.push(string_node(v, "Info string")),
            Param::Hostname => node.push(string_node(v, "Hostname")),
            Param::DiagnosticInfo | Param::HeartbeatData => {
                node.push(FieldNode::new("Value", v.absolute(0), v.len(), Value::Bytes(v.tail(0))))
            }
            Param::RoutingContext => {
                let count = expect_multiple(param, 4)?;
                for i in 0..count {
                    node.push(u32_node(v, i * 4, "Routing context", &[])?);
                }
                node.suffix = Some(match count {
                    1 => "(1 context)".to_string(),
                    n => format!("({} contexts)", n),
                });
            }
            Param::TrafficModeType => {
                expect_len(param, 4)?;
                node.push(u32_node(v, 0, "Traffic mode type", TRAFFIC_MODES)?);
            }
            Param::ErrorCode => {
                expect_len(param, 4)?;
                node.push(u32_node(v, 0, "Error code", ERROR_CODES)?);
            }
            Param::Status => {
                expect_len(param, 4)?;
                node.push(FieldNode::new("Status type", v.absolute(0), 2, Value::Unsigned(v.read_u16(0)? as u64)));
                node.push(FieldNode::new(
                    "Status information",
                    v.absolute(2),
                    2,
                    Value::Unsigned(v.read_u16(2)? as u64),
                ));
            }
            Param::Reason
            | Param::AspIdentifier
            | Param::CorrelationId
            | Param::RegistrationStatus
            | Param::DeregistrationStatus
            | Param::LocalRoutingKeyIdentifier
            | Param::NetworkAppearance
            | Param::Credit
            | Param::SequenceControl
            | Param::CongestionLevel => {
                expect_len(param, 4)?;
                node.push(u32_node(v, 0, "Value", &[])?);
            }
            Param::AffectedPointCode => {
                let count = expect_multiple(param, 4)?;
                for i in 0..count {
                    let pc = v.read_u24(i * 4 + 1)?;
                    node.push(
                        FieldNode::new("Affected point code", v.absolute(i * 4), 4, Value::Unsigned(pc as u64))
                            .with_suffix(format!("({})", ctx.format_point_code(pc)))
                            .with_child(FieldNode::new(
                                "Mask",
                                v.absolute(i * 4),
                                1,
                                Value::Unsigned(v.read_u8(i * 4)? as u64),
                            )),
                    );
                }
            }
            Param::HopCounter => node.push(last_byte(param, "Hop counter")?),
            Param::Smi => node.push(last_byte(param, "Subsystem multiplicity indicator")?),
            Param::Importance => node.push(last_byte(param, "Importance")?),
            Param::MessagePriority => node.push(last_byte(param, "Message priority")?),
            Param::SequenceNumber => node.push(last_byte(param, "Sequence number")?),
            Param::ReceiveSequenceNumber => node.push(last_byte(param, "Receive sequence number")?),
            Param::SourceReference => {
                expect_len(param, 4)?;
                self.source_reference = Some(v.read_u32(0)?);
                node.push(u32_node(v, 0, "Source reference number", &[])?);
            }
            Param::DestinationReference => {
                expect_len(param, 4)?;
                self.destination_reference = Some(v.read_u32(0)?);
                node.push(u32_node(v, 0, "Destination reference number", &[])?);
            }
            Param::SccpCause => {
                expect_len(param, 4)?;
                let cause_type = v.read_u8(2)?;
                node.push(
                    FieldNode::new("Cause type", v.absolute(2), 1, Value::Unsigned(cause_type as u64))
                        .with_suffix(format!("({})", sccp_cause_type_name(cause_type))),
                );
                node.push(FieldNode::new("Cause value", v.absolute(3), 1, Value::Unsigned(v.read_u8(3)? as u64)));
            }
            Param::AspCapabilities => {
                expect_len(param, 4)?;
                node.push(FieldNode::new(
                    "Protocol classes",
                    v.absolute(2),
                    1,
                    Value::Unsigned((v.read_u8(2)? & 0x0F) as u64),
                ));
                node.push(FieldNode::new("Interworking", v.absolute(3), 1, Value::Unsigned(v.read_u8(3)? as u64)));
            }
            Param::UserCause => {
                expect_len(param, 4)?;
                node.push(FieldNode::new("Cause", v.absolute(0), 2, Value::Unsigned(v.read_u16(0)? as u64)));
                node.push(FieldNode::new("User", v.absolute(2), 2, Value::Unsigned(v.read_u16(2)? as u64)));
            }
            Param::DrnLabel | Param::TidLabel => label_nodes(param, node)?,
            Param::ProtocolClass => {
                expect_len(param, 4)?;
                let class = ProtocolClass::decode(v.read_u8(3)?);
                node.push(FieldNode::new("Protocol class", v.absolute(3), 1, Value::Unsigned(class.class as u64)));
                node.push(FieldNode::new("Return on error", v.absolute(3), 1, Value::Boolean(class.return_on_error)));
            }
            Param::Segmentation => {
                expect_len(param, 4)?;
                let first = v.read_u8(0)?;
                node.push(FieldNode::new("First segment", v.absolute(0), 1, Value::Boolean(first & 0x80 != 0)));
                node.push(FieldNode::new(
                    "Remaining segments",
                    v.absolute(0),
                    1,
                    Value::Unsigned((first & 0x0F) as u64),
                ));
                node.push(FieldNode::new(
                    "Segmentation reference",
                    v.absolute(1),
                    3,
                    Value::Unsigned(v.read_u24(1)? as u64),
                ));
            }
            Param::Data => {
                self.data = Some((param.value.absolute(0), param.value.clone()));
            }
            Param::SourceAddress | Param::DestinationAddress => self.dissect_address(ctx, kind, param, node)?,
            Param::RoutingKey | Param::AddressRange | Param::RegistrationResult | Param::DeregistrationResult => {
                walk_nested(ctx, self, v, node)?
            }
            Param::GlobalTitle => {
                let gt = match self.version {
                    SuaVersion::Rfc3868 => global_title::dissect_rfc3868(v, node)?,
                    SuaVersion::Draft08 => global_title::dissect_draft08(v, node)?,
                };
                if let Some(capture) = self.capture() {
                    capture.gt_digits = Some(gt.digits.digits);
                }
            }
            Param::PointCode => {
                let pc = read_point_code(ctx, param)?;
                node.push(
                    FieldNode::new("Point code", v.absolute(0), v.len(), Value::Unsigned(pc as u64))
                        .with_suffix(format!("({})", ctx.format_point_code(pc))),
                );
                if let Some(capture) = self.capture() {
                    capture.point_code = Some(pc);
                }
            }
            Param::SubsystemNumber => {
                let ssn_node = last_byte(param, "Subsystem number")?;
                let ssn = v.read_u8(3)?;
                node.push(ssn_node);
                if let Some(capture) = self.capture() {
                    capture.ssn = Some(ssn);
                }
            }
            Param::Ipv4Address => {
                expect_len(param, 4)?;
                let b = v.bytes(0, 4)?;
                let addr = Ipv4Addr::new(b[0], b[1], b[2], b[3]);
                node.push(FieldNode::new("IPv4 address", v.absolute(0), 4, Value::Str(addr.to_string())));
            }
            Param::Ipv6Address => {
                expect_len(param, 16)?;
                let mut raw = [0u8; 16];
                raw.copy_from_slice(v.bytes(0, 16)?);
                let addr = Ipv6Addr::from(raw);
                node.push(FieldNode::new("IPv6 address", v.absolute(0), 16, Value::Str(addr.to_string())));
            }
        }
        Ok(())
    }
}

/// Decode state that outlives a single message
#[derive(Debug, Default)]
pub struct SuaSession {
    associations: AssociationTable,
    frames: AtomicU64,
}

impl SuaSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn associations(&self) -> &AssociationTable {
        &self.associations
    }

    /// Decode one SUA message with the configured version
    #[instrument(level = "debug", skip_all, fields(version = %config.sua.version, len = tvb.len()))]
    pub fn dissect(&self, registry: &OidRegistry, config: &DissectConfig, tvb: &ByteCursor) -> Dissection {
        let frame = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        let mut root = FieldNode::new("SS7 SCCP-User Adaptation Layer", tvb.absolute(0), tvb.len(), Value::None);

        let header = match CommonHeader::read(tvb) {
            Ok(header) => header,
            Err(err) => {
                warn!(error = %err, "SUA common header truncated");
                root.push(FieldNode::flagged("Common header", tvb.absolute(0), tvb.tail(0), &err));
                return Dissection {
                    protocol: "SUA",
                    info: "[Malformed Packet]".to_string(),
                    source: None,
                    destination: None,
                    malformed: true,
                    root,
                };
            }
        };

        let type_name = message_type_name(header.class, header.msg_type);
        let mut header_node = header.to_node(tvb, message_class_name(header.class), type_name);
        if header.version != PROTOCOL_VERSION {
            header_node.annotate(ExpertInfo::warn(
                ExpertKind::Malformed,
                format!("unsupported protocol version {}", header.version),
            ));
        }
        root.push(header_node);

        let body = tvb.subset_clamped(COMMON_HEADER_LEN, header.body_len(tvb.len()));
        let mut ctx = SigtranContext::new(registry, config);
        let mut decoder = SuaDecoder::new(config.sua.version);
        let mut malformed = false;
        if let Err(err) = walk_parameters(&mut ctx, &mut decoder, &body, &mut root) {
            warn!(error = %err, "SUA message aborted");
            root.push(FieldNode::flagged("Parameters", body.absolute(0), body.tail(0), &err));
            malformed = true;
        }

        if let Some((offset, data)) = decoder.data.take() {
            let payload = decoder
                .dispatch_ssn()
                .and_then(|ssn| ctx.dispatch(SSN_TABLE, ssn as u32, &data))
                .unwrap_or_else(|| FieldNode::new("Data", data.absolute(0), data.len(), Value::Bytes(data.tail(0))));
            if let Some(param) = root.children.iter_mut().find(|n| n.name == "Data" && n.offset + 4 == offset) {
                param.push(payload);
            }
        }

        let association = if header.class == class::CO {
            self.correlate(&decoder, header.msg_type, frame)
        } else {
            None
        };

        let mut info = match type_name {
            Some(name) => name.to_string(),
            None => format!("Unknown message (class {}, type {})", header.class, header.msg_type),
        };
        if let Some(assoc) = association {
            info.push_str(&format!(" (assoc {})", assoc.id));
            root.push(FieldNode::new("Association", tvb.absolute(0), 0, Value::Unsigned(assoc.id as u64)));
        }
        if malformed {
            info.push_str(" [Malformed Packet]");
        }
        Dissection {
            protocol: "SUA",
            info,
            source: decoder.source.as_ref().and_then(|a| a.column(&ctx)),
            destination: decoder.destination.as_ref().and_then(|a| a.column(&ctx)),
            malformed,
            root,
        }
    }

    /// CORE opens an association; COAK binds the responder's reference;
    /// everything else looks up by the destination reference
    fn correlate(&self, decoder: &SuaDecoder, msg_type: u8, frame: u64) -> Option<Association> {
        let opc = decoder.point_code(&decoder.source);
        let dpc = decoder.point_code(&decoder.destination);
        let found = match msg_type {
            co::CORE => {
                let reference = decoder.source_reference?;
                Some(self.associations.insert_if_absent(AssociationKey::new(opc, dpc, reference), frame))
            }
            co::COAK => {
                let assoc = self
                    .associations
                    .lookup(&AssociationKey::new(dpc, opc, decoder.destination_reference?))?;
                if let Some(reference) = decoder.source_reference {
                    self.associations.insert_alias(AssociationKey::new(opc, dpc, reference), assoc);
                }
                Some(assoc)
            }
            _ => self
                .associations
                .lookup(&AssociationKey::new(dpc, opc, decoder.destination_reference?)),
        };
        if found.is_none() {
            debug!(msg_type, "no association for connection-oriented message");
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::DecodeContext;
    use crate::config::SuaConfig;
    use crate::registry::HandlerFn;
    use crate::sigtran::tlv::padding;

    fn config(version: SuaVersion) -> DissectConfig {
        DissectConfig {
            sua: SuaConfig { version },
            ..Default::default()
        }
    }

    fn parameter(tag: u16, value: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&tag.to_be_bytes());
        out.extend_from_slice(&((value.len() + 4) as u16).to_be_bytes());
        out.extend_from_slice(value);
        out.resize(out.len() + padding(value.len()), 0);
        out
    }

    fn message(msg_class: u8, msg_type: u8, params: &[Vec<u8>]) -> ByteCursor {
        let body: Vec<u8> = params.concat();
        let mut out = vec![1, 0, msg_class, msg_type];
        out.extend_from_slice(&((body.len() + 8) as u32).to_be_bytes());
        out.extend(body);
        ByteCursor::from(out)
    }

    fn address(tag: u16, ri: u16, pc: u32, ssn: u8, gt: Option<&[u8]>) -> Vec<u8> {
        let mut value = Vec::new();
        value.extend_from_slice(&ri.to_be_bytes());
        value.extend_from_slice(&7u16.to_be_bytes());
        if let Some(gt) = gt {
            value.extend(parameter(0x8001, gt));
        }
        value.extend(parameter(0x8002, &pc.to_be_bytes()));
        value.extend(parameter(0x8003, &[0, 0, 0, ssn]));
        parameter(tag, &value)
    }

    fn tcap_stub(_ctx: &mut DecodeContext<'_>, tvb: &ByteCursor, offset: usize) -> Result<(usize, FieldNode)> {
        let len = tvb.remaining(offset);
        Ok((offset + len, FieldNode::new("TCAP", tvb.absolute(offset), len, Value::None)))
    }

    #[test]
    fn test_route_on_gt_uses_digits() {
        let gt = [0, 0, 0, 4, 5, 0, 1, 4, 0x21, 0x43, 0xF5];
        let tvb = message(
            class::CL,
            1,
            &[
                parameter(0x0115, &[0, 0, 0, 0x80]),
                address(0x0102, 1, 10, 8, Some(&gt)),
                address(0x0103, 2, 20, 6, None),
                parameter(0x010b, &[0x62, 0x00]),
            ],
        );
        let mut registry = OidRegistry::new();
        registry.table_mut(SSN_TABLE).add_uint(6, "TCAP", tcap_stub as HandlerFn);

        let session = SuaSession::new();
        let dissection = session.dissect(&registry, &config(SuaVersion::Rfc3868), &tvb);
        assert!(!dissection.malformed);
        assert_eq!(dissection.info, "CLDT");
        assert_eq!(dissection.source.as_deref(), Some("12345"));
        assert_eq!(dissection.destination.as_deref(), Some("20"));
        let data = dissection.root.child("Data").unwrap();
        assert_eq!(data.child("TCAP").map(|n| n.length), Some(2));
        let class = dissection.root.child("Protocol class").unwrap();
        assert_eq!(class.child("Return on error").map(|n| &n.value), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_ssn_routing_and_source_fallback() {
        let tvb = message(
            class::CL,
            1,
            &[address(0x0102, 4, 10, 8, None), parameter(0x010b, &[0xAB])],
        );
        let mut registry = OidRegistry::new();
        registry.table_mut(SSN_TABLE).add_uint(8, "TCAP", tcap_stub as HandlerFn);
        let dissection = SuaSession::new().dissect(&registry, &config(SuaVersion::Rfc3868), &tvb);
        assert_eq!(dissection.source.as_deref(), Some("SSN 8"));
        assert!(dissection.root.find(&["Data", "TCAP"]).is_some());
    }

    #[test]
    fn test_connection_association() {
        let registry = OidRegistry::new();
        let cfg = config(SuaVersion::Rfc3868);
        let session = SuaSession::new();

        let core = message(
            class::CO,
            co::CORE,
            &[
                address(0x0102, 2, 1, 8, None),
                address(0x0103, 2, 2, 8, None),
                parameter(0x0104, &0x100u32.to_be_bytes()),
            ],
        );
        assert_eq!(session.dissect(&registry, &cfg, &core).info, "CORE (assoc 1)");

        let coak = message(
            class::CO,
            co::COAK,
            &[
                address(0x0102, 2, 2, 8, None),
                address(0x0103, 2, 1, 8, None),
                parameter(0x0104, &0x200u32.to_be_bytes()),
                parameter(0x0105, &0x100u32.to_be_bytes()),
            ],
        );
        assert_eq!(session.dissect(&registry, &cfg, &coak).info, "COAK (assoc 1)");

        // data from the caller carries the responder's reference
        let codt = message(
            class::CO,
            8,
            &[
                address(0x0102, 2, 1, 8, None),
                address(0x0103, 2, 2, 8, None),
                parameter(0x0105, &0x200u32.to_be_bytes()),
            ],
        );
        let dissection = session.dissect(&registry, &cfg, &codt);
        assert_eq!(dissection.info, "CODT (assoc 1)");
        assert_eq!(dissection.root.child("Association").map(|n| &n.value), Some(&Value::Unsigned(1)));

        let stray = message(class::CO, 8, &[parameter(0x0105, &0x999u32.to_be_bytes())]);
        assert_eq!(session.dissect(&registry, &cfg, &stray).info, "CODT");
        assert_eq!(session.associations().len(), 2);
    }

    #[test]
    fn test_draft08_tags() {
        let tvb = message(class::CL, 1, &[parameter(0x0001, &[0xAB, 0xCD]), parameter(0x010b, &[0, 0, 0, 1])]);
        let dissection = SuaSession::new().dissect(&OidRegistry::new(), &config(SuaVersion::Draft08), &tvb);
        assert_eq!(dissection.root.find(&["Data", "Data"]).map(|n| n.length), Some(2));
        assert!(dissection.root.child("Network appearance").is_some());
    }

    #[test]
    fn test_bad_point_code_length_degrades() {
        let mut value = vec![0, 2, 0, 2];
        value.extend(parameter(0x8002, &[1, 2, 3, 4, 5]));
        let tvb = message(class::CL, 1, &[parameter(0x0102, &value)]);
        let dissection = SuaSession::new().dissect(&OidRegistry::new(), &config(SuaVersion::Rfc3868), &tvb);
        assert!(!dissection.malformed);
        let pc = dissection.root.find(&["Source address", "Point code"]).unwrap();
        assert!(pc.child("Parameter value").unwrap().has_expert(ExpertKind::Malformed));
        assert!(dissection.source.is_none());
    }
}
