//! M3UA (MTP3 User Adaptation Layer) decoder
//!
//! Supports draft-ietf-sigtran-m3ua-05, -06, -07 and RFC 3332/4666. The
//! drafts number parameters differently, so every message is decoded with
//! the tag table of the configured version only.

use super::mtp3::{self, service_indicator_name};
use super::tlv::{
    expect_len, expect_multiple, string_node, u32_node, walk_nested, walk_parameters, CommonHeader, Parameter,
    ParameterDecoder, SigtranContext, COMMON_HEADER_LEN,
};
use crate::config::DissectConfig;
use crate::cursor::ByteCursor;
use crate::errors::Result;
use crate::registry::OidRegistry;
use crate::tree::{Dissection, ExpertInfo, ExpertKind, FieldNode, Value};
use crate::types::NetworkIndicator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument, warn};

pub const PROTOCOL_VERSION: u8 = 1;

/// Protocol revision used to interpret parameter tags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum M3uaVersion {
    #[serde(rename = "draft-5")]
    Draft5,
    #[serde(rename = "draft-6")]
    Draft6,
    #[serde(rename = "draft-7")]
    Draft7,
    #[default]
    #[serde(rename = "rfc")]
    Rfc,
}

impl M3uaVersion {
    pub const ALL: [M3uaVersion; 4] = [Self::Draft5, Self::Draft6, Self::Draft7, Self::Rfc];

    fn keyword(self) -> &'static str {
        match self {
            Self::Draft5 => "draft-5",
            Self::Draft6 => "draft-6",
            Self::Draft7 => "draft-7",
            Self::Rfc => "rfc",
        }
    }

    fn tags(self) -> TagTable {
        match self {
            Self::Draft5 => DRAFT5_TAGS,
            Self::Draft6 => DRAFT6_TAGS,
            Self::Draft7 => DRAFT7_TAGS,
            Self::Rfc => RFC_TAGS,
        }
    }

    /// Routing key management moved from class 10 to class 9 in the RFC
    fn rkm_class(self) -> u8 {
        match self {
            Self::Rfc => 9,
            _ => 10,
        }
    }
}

impl fmt::Display for M3uaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for M3uaVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.keyword().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown M3UA version: {}", s))
    }
}

/// Message classes
pub mod class {
    pub const MGMT: u8 = 0;
    pub const TRANSFER: u8 = 1;
    pub const SSNM: u8 = 2;
    pub const ASPSM: u8 = 3;
    pub const ASPTM: u8 = 4;
}

pub fn message_class_name(version: M3uaVersion, msg_class: u8) -> Option<&'static str> {
    match msg_class {
        class::MGMT => Some("Management messages"),
        class::TRANSFER => Some("Transfer messages"),
        class::SSNM => Some("SS7 signalling network management messages"),
        class::ASPSM => Some("ASP state maintenance messages"),
        class::ASPTM => Some("ASP traffic maintenance messages"),
        c if c == version.rkm_class() => Some("Routing key management messages"),
        _ => None,
    }
}

/// Mnemonic shown in the info column
pub fn message_type_name(version: M3uaVersion, msg_class: u8, msg_type: u8) -> Option<&'static str> {
    let name = match (msg_class, msg_type) {
        (class::MGMT, 0) => "ERR",
        (class::MGMT, 1) => "NTFY",
        (class::TRANSFER, 1) => "DATA",
        (class::SSNM, 1) => "DUNA",
        (class::SSNM, 2) => "DAVA",
        (class::SSNM, 3) => "DAUD",
        (class::SSNM, 4) => "SCON",
        (class::SSNM, 5) => "DUPU",
        (class::SSNM, 6) => "DRST",
        (class::ASPSM, 1) => "ASPUP",
        (class::ASPSM, 2) => "ASPDN",
        (class::ASPSM, 3) => "BEAT",
        (class::ASPSM, 4) => "ASPUP_ACK",
        (class::ASPSM, 5) => "ASPDN_ACK",
        (class::ASPSM, 6) => "BEAT_ACK",
        (class::ASPTM, 1) => "ASPAC",
        (class::ASPTM, 2) => "ASPIA",
        (class::ASPTM, 3) => "ASPAC_ACK",
        (class::ASPTM, 4) => "ASPIA_ACK",
        (c, t) if c == version.rkm_class() => match t {
            1 => "REG_REQ",
            2 => "REG_RSP",
            3 => "DEREG_REQ",
            4 => "DEREG_RSP",
            _ => return None,
        },
        _ => return None,
    };
    Some(name)
}

/// What a parameter carries, independent of its tag in a given version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Param {
    InfoString,
    RoutingContext,
    DiagnosticInfo,
    HeartbeatData,
    TrafficModeType,
    ErrorCode,
    Status,
    AspIdentifier,
    AffectedPointCode,
    CorrelationId,
    NetworkAppearance,
    ProtocolData,
    ProtocolData1,
    ProtocolData2,
    UserCause,
    Reason,
    CongestionIndication,
    ConcernedDestination,
    RoutingKey,
    RegistrationResult,
    DeregistrationResult,
    RegistrationResults,
    DeregistrationResults,
    LocalRoutingKeyIdentifier,
    DestinationPointCode,
    ServiceIndicators,
    SubsystemNumbers,
    OriginatingPointCodeList,
    CircuitRange,
    RegistrationStatus,
    DeregistrationStatus,
}

type TagTable = &'static [(u16, Param, &'static str)];

static DRAFT5_TAGS: TagTable = &[
    (1, Param::NetworkAppearance, "Network appearance"),
    (2, Param::ProtocolData1, "Protocol data 1"),
    (3, Param::ProtocolData2, "Protocol data 2"),
    (4, Param::InfoString, "Info string"),
    (5, Param::AffectedPointCode, "Affected destinations"),
    (6, Param::RoutingContext, "Routing context"),
    (7, Param::DiagnosticInfo, "Diagnostic information"),
    (8, Param::HeartbeatData, "Heartbeat data"),
    (9, Param::UserCause, "User / Cause"),
    (10, Param::Reason, "Reason"),
    (11, Param::TrafficModeType, "Traffic mode type"),
    (12, Param::ErrorCode, "Error code"),
    (13, Param::Status, "Status type / identification"),
    (14, Param::CongestionIndication, "Congestion indications"),
    (15, Param::ConcernedDestination, "Concerned destination"),
    (16, Param::RoutingKey, "Routing key"),
    (17, Param::RegistrationResult, "Registration result"),
    (18, Param::DeregistrationResult, "Deregistration result"),
];

static DRAFT6_TAGS: TagTable = &[
    (1, Param::NetworkAppearance, "Network appearance"),
    (2, Param::ProtocolData1, "Protocol data 1"),
    (3, Param::ProtocolData2, "Protocol data 2"),
    (4, Param::InfoString, "Info string"),
    (5, Param::AffectedPointCode, "Affected destinations"),
    (6, Param::RoutingContext, "Routing context"),
    (7, Param::DiagnosticInfo, "Diagnostic information"),
    (8, Param::HeartbeatData, "Heartbeat data"),
    (9, Param::UserCause, "User / Cause"),
    (10, Param::Reason, "Reason"),
    (11, Param::TrafficModeType, "Traffic mode type"),
    (12, Param::ErrorCode, "Error code"),
    (13, Param::Status, "Status type / identification"),
    (14, Param::CongestionIndication, "Congestion indications"),
    (15, Param::ConcernedDestination, "Concerned destination"),
    (16, Param::RoutingKey, "Routing key"),
    (17, Param::RegistrationResult, "Registration result"),
    (18, Param::DeregistrationResult, "Deregistration result"),
    (19, Param::LocalRoutingKeyIdentifier, "Local routing key identifier"),
    (20, Param::DestinationPointCode, "Destination point code"),
    (21, Param::ServiceIndicators, "Service indicators"),
    (22, Param::SubsystemNumbers, "Subsystem numbers"),
    (23, Param::OriginatingPointCodeList, "Originating point code list"),
    (24, Param::CircuitRange, "Circuit range"),
    (25, Param::RegistrationResults, "Registration results"),
    (26, Param::DeregistrationResults, "Deregistration results"),
];

static DRAFT7_TAGS: TagTable = &[
    (0x0004, Param::InfoString, "Info string"),
    (0x0006, Param::RoutingContext, "Routing context"),
    (0x0007, Param::DiagnosticInfo, "Diagnostic information"),
    (0x0009, Param::HeartbeatData, "Heartbeat data"),
    (0x000a, Param::Reason, "Reason"),
    (0x000b, Param::TrafficModeType, "Traffic mode type"),
    (0x000c, Param::ErrorCode, "Error code"),
    (0x000d, Param::Status, "Status type / identification"),
    (0x0011, Param::AspIdentifier, "ASP identifier"),
    (0x0012, Param::AffectedPointCode, "Affected point code"),
    (0x8001, Param::NetworkAppearance, "Network appearance"),
    (0x8002, Param::ProtocolData1, "Protocol data 1"),
    (0x8003, Param::ProtocolData2, "Protocol data 2"),
    (0x8004, Param::UserCause, "User / Cause"),
    (0x8005, Param::CongestionIndication, "Congestion indications"),
    (0x8006, Param::ConcernedDestination, "Concerned destination"),
    (0x8007, Param::RoutingKey, "Routing key"),
    (0x8008, Param::RegistrationResult, "Registration result"),
    (0x8009, Param::DeregistrationResult, "Deregistration result"),
    (0x800a, Param::LocalRoutingKeyIdentifier, "Local routing key identifier"),
    (0x800b, Param::DestinationPointCode, "Destination point code"),
    (0x800c, Param::ServiceIndicators, "Service indicators"),
    (0x800d, Param::SubsystemNumbers, "Subsystem numbers"),
    (0x800e, Param::OriginatingPointCodeList, "Originating point code list"),
    (0x800f, Param::CircuitRange, "Circuit range"),
    (0x8010, Param::RegistrationStatus, "Registration status"),
    (0x8011, Param::DeregistrationStatus, "Deregistration status"),
    (0x8012, Param::CorrelationId, "Correlation identifier"),
];

static RFC_TAGS: TagTable = &[
    (0x0004, Param::InfoString, "Info string"),
    (0x0006, Param::RoutingContext, "Routing context"),
    (0x0007, Param::DiagnosticInfo, "Diagnostic information"),
    (0x0009, Param::HeartbeatData, "Heartbeat data"),
    (0x000b, Param::TrafficModeType, "Traffic mode type"),
    (0x000c, Param::ErrorCode, "Error code"),
    (0x000d, Param::Status, "Status"),
    (0x0011, Param::AspIdentifier, "ASP identifier"),
    (0x0012, Param::AffectedPointCode, "Affected point code"),
    (0x0013, Param::CorrelationId, "Correlation identifier"),
    (0x0200, Param::NetworkAppearance, "Network appearance"),
    (0x0204, Param::UserCause, "User / Cause"),
    (0x0205, Param::CongestionIndication, "Congestion indications"),
    (0x0206, Param::ConcernedDestination, "Concerned destination"),
    (0x0207, Param::RoutingKey, "Routing key"),
    (0x0208, Param::RegistrationResult, "Registration result"),
    (0x0209, Param::DeregistrationResult, "Deregistration result"),
    (0x020a, Param::LocalRoutingKeyIdentifier, "Local routing key identifier"),
    (0x020b, Param::DestinationPointCode, "Destination point code"),
    (0x020c, Param::ServiceIndicators, "Service indicators"),
    (0x020e, Param::OriginatingPointCodeList, "Originating point code list"),
    (0x0210, Param::ProtocolData, "Protocol data"),
    (0x0212, Param::RegistrationStatus, "Registration status"),
    (0x0213, Param::DeregistrationStatus, "Deregistration status"),
];

const TRAFFIC_MODES: &[(u32, &str)] = &[(1, "Override"), (2, "Loadshare"), (3, "Broadcast")];

const ERROR_CODES: &[(u32, &str)] = &[
    (0x01, "Invalid version"),
    (0x03, "Unsupported message class"),
    (0x04, "Unsupported message type"),
    (0x05, "Unsupported traffic mode type"),
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
];

const REGISTRATION_STATUS: &[(u32, &str)] = &[
    (0, "Successfully registered"),
    (1, "Error - unknown"),
    (2, "Error - invalid DPC"),
    (3, "Error - invalid network appearance"),
    (4, "Error - invalid routing key"),
    (5, "Error - permission denied"),
    (6, "Error - cannot support unique routing"),
    (7, "Error - routing key not currently provisioned"),
    (8, "Error - insufficient resources"),
    (9, "Error - unsupported RK parameter field"),
    (10, "Error - unsupported/invalid traffic handling mode"),
    (11, "Error - routing key change refused"),
    (12, "Error - routing key already registered"),
];

const DEREGISTRATION_STATUS: &[(u32, &str)] = &[
    (0, "Successfully deregistered"),
    (1, "Error - unknown"),
    (2, "Error - invalid routing context"),
    (3, "Error - permission denied"),
    (4, "Error - not registered"),
    (5, "Error - ASP currently active for routing context"),
];

const REASONS: &[(u32, &str)] = &[(1, "ASP failure")];

fn status_name(status_type: u16, info: u16) -> &'static str {
    match (status_type, info) {
        (1, 2) => "AS-INACTIVE",
        (1, 3) => "AS-ACTIVE",
        (1, 4) => "AS-PENDING",
        (2, 1) => "Insufficient ASP resources active in AS",
        (2, 2) => "Alternate ASP active",
        (2, 3) => "ASP failure",
        _ => "Unknown",
    }
}

fn unavailability_cause_name(cause: u16) -> &'static str {
    match cause {
        0 => "Unknown",
        1 => "Unequipped remote user",
        2 => "Inaccessible remote user",
        _ => "Reserved",
    }
}

/// Parameter half of the M3UA decoder; also collects the address columns
struct M3uaDecoder {
    version: M3uaVersion,
    source: Option<String>,
    destination: Option<String>,
}

impl M3uaDecoder {
    fn new(version: M3uaVersion) -> Self {
        Self {
            version,
            source: None,
            destination: None,
        }
    }

    fn lookup(&self, tag: u16) -> Option<(Param, &'static str)> {
        self.version
            .tags()
            .iter()
            .find(|(t, _, _)| *t == tag)
            .map(|&(_, param, name)| (param, name))
    }

    fn set_columns(&mut self, ctx: &SigtranContext<'_>, opc: u32, dpc: u32) {
        if self.source.is_none() {
            self.source = Some(ctx.format_point_code(opc));
            self.destination = Some(ctx.format_point_code(dpc));
        }
    }
}

impl ParameterDecoder for M3uaDecoder {
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
            Param::DiagnosticInfo => node.push(bytes_node(v, "Diagnostic information")),
            Param::HeartbeatData => node.push(bytes_node(v, "Heartbeat data")),
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
                let status_type = v.read_u16(0)?;
                let info = v.read_u16(2)?;
                node.push(
                    FieldNode::new("Status type", v.absolute(0), 2, Value::Unsigned(status_type as u64)).with_suffix(
                        match status_type {
                            1 => "(Application server state change)",
                            2 => "(Other)",
                            _ => "(Unknown)",
                        },
                    ),
                );
                node.push(
                    FieldNode::new("Status information", v.absolute(2), 2, Value::Unsigned(info as u64))
                        .with_suffix(format!("({})", status_name(status_type, info))),
                );
            }
            Param::AspIdentifier => {
                expect_len(param, 4)?;
                node.push(u32_node(v, 0, "ASP identifier", &[])?);
            }
            Param::CorrelationId => {
                expect_len(param, 4)?;
                node.push(u32_node(v, 0, "Correlation identifier", &[])?);
            }
            Param::NetworkAppearance => {
                expect_len(param, 4)?;
                node.push(u32_node(v, 0, "Network appearance", &[])?);
            }
            Param::LocalRoutingKeyIdentifier => {
                expect_len(param, 4)?;
                node.push(u32_node(v, 0, "Local routing key identifier", &[])?);
            }
            Param::Reason => {
                expect_len(param, 4)?;
                node.push(u32_node(v, 0, "Reason", REASONS)?);
            }
            Param::RegistrationStatus => {
                expect_len(param, 4)?;
                node.push(u32_node(v, 0, "Registration status", REGISTRATION_STATUS)?);
            }
            Param::DeregistrationStatus => {
                expect_len(param, 4)?;
                node.push(u32_node(v, 0, "Deregistration status", DEREGISTRATION_STATUS)?);
            }
            Param::AffectedPointCode => point_code_list(ctx, param, node, "Affected point code")?,
            Param::OriginatingPointCodeList => point_code_list(ctx, param, node, "Originating point code")?,
            Param::DestinationPointCode => {
                expect_len(param, 4)?;
                point_code_list(ctx, param, node, "Destination point code")?;
            }
            Param::ConcernedDestination => {
                expect_len(param, 4)?;
                node.push(FieldNode::new("Reserved", v.absolute(0), 1, Value::Unsigned(v.read_u8(0)? as u64)));
                let pc = v.read_u24(1)?;
                node.push(
                    FieldNode::new("Concerned DPC", v.absolute(1), 3, Value::Unsigned(pc as u64))
                        .with_suffix(format!("({})", ctx.format_point_code(pc))),
                );
            }
            Param::UserCause => {
                expect_len(param, 4)?;
                let cause = v.read_u16(0)?;
                let user = v.read_u16(2)?;
                node.push(
                    FieldNode::new("Unavailability cause", v.absolute(0), 2, Value::Unsigned(cause as u64))
                        .with_suffix(format!("({})", unavailability_cause_name(cause))),
                );
                node.push(
                    FieldNode::new("User identity", v.absolute(2), 2, Value::Unsigned(user as u64))
                        .with_suffix(format!("({})", service_indicator_name((user & 0x0F) as u8))),
                );
            }
            Param::CongestionIndication => {
                expect_len(param, 4)?;
                let level = v.read_u8(3)?;
                node.push(
                    FieldNode::new("Congestion level", v.absolute(3), 1, Value::Unsigned(level as u64)).with_suffix(
                        match level {
                            0 => "(No congestion or undefined)",
                            1 => "(Congestion level 1)",
                            2 => "(Congestion level 2)",
                            3 => "(Congestion level 3)",
                            _ => "(Unknown)",
                        },
                    ),
                );
            }
            Param::ServiceIndicators => {
                for (i, &si) in v.as_bytes().iter().enumerate() {
                    node.push(
                        FieldNode::new("Service indicator", v.absolute(i), 1, Value::Unsigned(si as u64))
                            .with_suffix(format!("({})", service_indicator_name(si))),
                    );
                }
            }
            Param::SubsystemNumbers => {
                for (i, &ssn) in v.as_bytes().iter().enumerate() {
                    node.push(FieldNode::new("Subsystem number", v.absolute(i), 1, Value::Unsigned(ssn as u64)));
                }
            }
            Param::CircuitRange => {
                let count = expect_multiple(param, 8)?;
                for i in 0..count {
                    let base = i * 8;
                    let pc = v.read_u24(base + 1)?;
                    let mut range = FieldNode::new("Circuit range", v.absolute(base), 8, Value::None)
                        .with_suffix(format!("({})", ctx.format_point_code(pc)));
                    range.push(FieldNode::new("OPC", v.absolute(base + 1), 3, Value::Unsigned(pc as u64)));
                    range.push(FieldNode::new(
                        "Lower CIC value",
                        v.absolute(base + 4),
                        2,
                        Value::Unsigned(v.read_u16(base + 4)? as u64),
                    ));
                    range.push(FieldNode::new(
                        "Upper CIC value",
                        v.absolute(base + 6),
                        2,
                        Value::Unsigned(v.read_u16(base + 6)? as u64),
                    ));
                    node.push(range);
                }
            }
            Param::ProtocolData => {
                let (opc, dpc) = protocol_data(ctx, param, node)?;
                self.set_columns(ctx, opc, dpc);
            }
            Param::ProtocolData1 => {
                let summary = mtp3::dissect_msu(ctx, v, 0, node)?;
                self.set_columns(ctx, summary.label.opc.0, summary.label.dpc.0);
            }
            Param::ProtocolData2 => {
                node.push(FieldNode::new("Length indicator", v.absolute(0), 1, Value::Unsigned(v.read_u8(0)? as u64)));
                let summary = mtp3::dissect_msu(ctx, v, 1, node)?;
                self.set_columns(ctx, summary.label.opc.0, summary.label.dpc.0);
            }
            Param::RoutingKey
            | Param::RegistrationResult
            | Param::DeregistrationResult
            | Param::RegistrationResults
            | Param::DeregistrationResults => walk_nested(ctx, self, v, node)?,
        }
        Ok(())
    }
}

fn bytes_node(value: &ByteCursor, name: &'static str) -> FieldNode {
    FieldNode::new(name, value.absolute(0), value.len(), Value::Bytes(value.tail(0)))
}

/// Entries of mask (1 byte) and point code (3 bytes)
fn point_code_list(
    ctx: &SigtranContext<'_>,
    param: &Parameter,
    node: &mut FieldNode,
    name: &'static str,
) -> Result<()> {
    let v = &param.value;
    let count = expect_multiple(param, 4)?;
    for i in 0..count {
        let base = i * 4;
        let mask = v.read_u8(base)?;
        let pc = v.read_u24(base + 1)?;
        node.push(
            FieldNode::new(name, v.absolute(base), 4, Value::Unsigned(pc as u64))
                .with_suffix(format!("({})", ctx.format_point_code(pc)))
                .with_child(FieldNode::new("Mask", v.absolute(base), 1, Value::Unsigned(mask as u64))),
        );
    }
    Ok(())
}

/// RFC protocol data: OPC, DPC, SI, NI, MP, SLS, then the user part
fn protocol_data(ctx: &SigtranContext<'_>, param: &Parameter, node: &mut FieldNode) -> Result<(u32, u32)> {
    let v = &param.value;
    v.ensure(0, 12)?;
    let opc = v.read_u32(0)?;
    let dpc = v.read_u32(4)?;
    let si = v.read_u8(8)?;
    let ni = v.read_u8(9)?;
    node.push(
        FieldNode::new("OPC", v.absolute(0), 4, Value::Unsigned(opc as u64))
            .with_suffix(format!("({})", ctx.format_point_code(opc))),
    );
    node.push(
        FieldNode::new("DPC", v.absolute(4), 4, Value::Unsigned(dpc as u64))
            .with_suffix(format!("({})", ctx.format_point_code(dpc))),
    );
    node.push(
        FieldNode::new("SI", v.absolute(8), 1, Value::Unsigned(si as u64))
            .with_suffix(format!("({})", service_indicator_name(si))),
    );
    node.push(
        FieldNode::new("NI", v.absolute(9), 1, Value::Unsigned(ni as u64))
            .with_suffix(format!("({})", NetworkIndicator::from(ni).name())),
    );
    node.push(FieldNode::new("MP", v.absolute(10), 1, Value::Unsigned(v.read_u8(10)? as u64)));
    node.push(FieldNode::new("SLS", v.absolute(11), 1, Value::Unsigned(v.read_u8(11)? as u64)));
    let data = v.subset_clamped(12, v.remaining(12));
    if !data.is_empty() {
        node.push(mtp3::dissect_payload(ctx, si as u32, &data));
    }
    Ok((opc, dpc))
}

/// Decode one M3UA message with the configured version
#[instrument(level = "debug", skip_all, fields(version = %config.m3ua.version, len = tvb.len()))]
pub fn dissect(registry: &OidRegistry, config: &DissectConfig, tvb: &ByteCursor) -> Dissection {
    let version = config.m3ua.version;
    let mut root = FieldNode::new("MTP 3 User Adaptation Layer", tvb.absolute(0), tvb.len(), Value::None);

    let header = match CommonHeader::read(tvb) {
        Ok(header) => header,
        Err(err) => {
            warn!(error = %err, "M3UA common header truncated");
            root.push(FieldNode::flagged("Common header", tvb.absolute(0), tvb.tail(0), &err));
            return Dissection {
                protocol: "M3UA",
                info: "[Malformed Packet]".to_string(),
                source: None,
                destination: None,
                malformed: true,
                root,
            };
        }
    };

    let class_name = message_class_name(version, header.class);
    let type_name = message_type_name(version, header.class, header.msg_type);
    let mut header_node = header.to_node(tvb, class_name, type_name);
    if header.version != PROTOCOL_VERSION {
        header_node.annotate(ExpertInfo::warn(
            ExpertKind::Malformed,
            format!("unsupported protocol version {}", header.version),
        ));
    }
    root.push(header_node);

    let body_len = header.body_len(tvb.len());
    let body = tvb.subset_clamped(COMMON_HEADER_LEN, body_len);
    let mut ctx = SigtranContext::new(registry, config);
    let mut decoder = M3uaDecoder::new(version);
    let mut malformed = false;
    if let Err(err) = walk_parameters(&mut ctx, &mut decoder, &body, &mut root) {
        warn!(error = %err, "M3UA message aborted");
        root.push(FieldNode::flagged("Parameters", body.absolute(0), body.tail(0), &err));
        malformed = true;
    }

    let end = COMMON_HEADER_LEN + body_len;
    if end < tvb.len() {
        debug!(trailing = tvb.len() - end, "bytes after M3UA message");
        root.push(
            FieldNode::new("Trailing data", tvb.absolute(end), tvb.len() - end, Value::Bytes(tvb.tail(end)))
                .with_expert(ExpertInfo::warn(ExpertKind::TrailingData, "data after message length")),
        );
    }

    let mut info = match type_name {
        Some(name) => name.to_string(),
        None => format!("Unknown message (class {}, type {})", header.class, header.msg_type),
    };
    if malformed {
        info.push_str(" [Malformed Packet]");
    }
    Dissection {
        protocol: "M3UA",
        info,
        source: decoder.source,
        destination: decoder.destination,
        malformed,
        root,
    }
}
