//! SIGTRAN common header and parameter loop
//!
//! M3UA and SUA share the wire layout: an 8 byte common header followed by
//! tag/length/value parameters padded to 4 bytes. The length field counts
//! the 4 byte parameter header but not the padding.

use crate::ber::DecodeContext;
use crate::config::{BerOptions, DissectConfig, Mtp3Config, TlvOptions};
use crate::cursor::ByteCursor;
use crate::errors::{DissectError, Result};
use crate::registry::OidRegistry;
use crate::tree::{ExpertInfo, ExpertKind, FieldNode, Value};
use crate::types::PointCode;
use tracing::{debug, warn};

pub const COMMON_HEADER_LEN: usize = 8;
pub const PARAMETER_HEADER_LEN: usize = 4;

/// Padding after a parameter of `len` bytes
pub fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Version, reserved, message class, message type, message length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonHeader {
    pub version: u8,
    pub reserved: u8,
    pub class: u8,
    pub msg_type: u8,
    pub length: u32,
}

impl CommonHeader {
    pub fn read(tvb: &ByteCursor) -> Result<Self> {
        Ok(Self {
            version: tvb.read_u8(0)?,
            reserved: tvb.read_u8(1)?,
            class: tvb.read_u8(2)?,
            msg_type: tvb.read_u8(3)?,
            length: tvb.read_u32(4)?,
        })
    }

    /// Bytes the parameters may occupy: the declared length clamped to
    /// the captured data
    pub fn body_len(&self, captured: usize) -> usize {
        (self.length as usize)
            .clamp(COMMON_HEADER_LEN, captured.max(COMMON_HEADER_LEN))
            .saturating_sub(COMMON_HEADER_LEN)
    }

    pub fn to_node(
        &self,
        tvb: &ByteCursor,
        class_name: Option<&str>,
        type_name: Option<&str>,
    ) -> FieldNode {
        let mut node = FieldNode::new("Common header", tvb.absolute(0), COMMON_HEADER_LEN, Value::None);
        node.push(FieldNode::new("Version", tvb.absolute(0), 1, Value::Unsigned(self.version as u64)));
        node.push(FieldNode::new("Reserved", tvb.absolute(1), 1, Value::Unsigned(self.reserved as u64)));
        node.push(
            FieldNode::new("Message class", tvb.absolute(2), 1, Value::Unsigned(self.class as u64))
                .with_suffix(format!("({})", class_name.unwrap_or("Unknown"))),
        );
        node.push(
            FieldNode::new("Message type", tvb.absolute(3), 1, Value::Unsigned(self.msg_type as u64))
                .with_suffix(format!("({})", type_name.unwrap_or("Unknown"))),
        );
        let mut length = FieldNode::new("Message length", tvb.absolute(4), 4, Value::Unsigned(self.length as u64));
        if self.length as usize != tvb.len() {
            length.annotate(ExpertInfo::warn(
                ExpertKind::LengthClamped,
                format!("message length {} but {} bytes captured", self.length, tvb.len()),
            ));
        }
        node.push(length);
        node
    }
}

/// One parameter as found on the wire
#[derive(Debug, Clone)]
pub struct Parameter {
    pub tag: u16,
    /// Declared length, header included
    pub length: u16,
    /// Offset of the parameter header within the walked view
    pub offset: usize,
    pub value: ByteCursor,
    pub padding: usize,
    /// Declared length ran past the end of the data
    pub clamped: bool,
}

impl Parameter {
    /// Bytes consumed in the walked view, padding included
    pub fn total_len(&self) -> usize {
        PARAMETER_HEADER_LEN + self.value.len() + self.padding
    }
}

/// Iterator over a flat parameter list.
///
/// A declared length beyond the data is clamped. A declared length below
/// the header size, or a header cut off at the end, yields one error and
/// stops the walk.
pub struct ParameterWalker<'a> {
    tvb: &'a ByteCursor,
    pos: usize,
    done: bool,
}

impl<'a> ParameterWalker<'a> {
    pub fn new(tvb: &'a ByteCursor) -> Self {
        Self { tvb, pos: 0, done: false }
    }

    /// Offset of the next parameter header
    pub fn position(&self) -> usize {
        self.pos
    }

    fn next_parameter(&mut self) -> Result<Parameter> {
        let offset = self.pos;
        let tag = self.tvb.read_u16(offset)?;
        let length = self.tvb.read_u16(offset + 2)?;
        if (length as usize) < PARAMETER_HEADER_LEN {
            return Err(DissectError::malformed(
                self.tvb.absolute(offset),
                format!("parameter 0x{:04x} declares length {}", tag, length),
            ));
        }
        let declared = length as usize - PARAMETER_HEADER_LEN;
        let available = self.tvb.remaining(offset + PARAMETER_HEADER_LEN);
        let value_len = declared.min(available);
        let value = self.tvb.subset(offset + PARAMETER_HEADER_LEN, value_len)?;
        let end = offset + PARAMETER_HEADER_LEN + value_len;
        // trailing padding may be missing on the last parameter
        let pad = padding(length as usize).min(self.tvb.remaining(end));
        self.pos = end + pad;
        Ok(Parameter {
            tag,
            length,
            offset,
            value,
            padding: pad,
            clamped: value_len < declared,
        })
    }
}

impl Iterator for ParameterWalker<'_> {
    type Item = Result<Parameter>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.tvb.len() {
            return None;
        }
        let item = self.next_parameter();
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

/// Per-message state shared by the signalling decoders
pub struct SigtranContext<'r> {
    registry: &'r OidRegistry,
    mtp3: Mtp3Config,
    options: TlvOptions,
    ber: BerOptions,
    depth: usize,
}

impl<'r> SigtranContext<'r> {
    pub fn new(registry: &'r OidRegistry, config: &DissectConfig) -> Self {
        Self {
            registry,
            mtp3: config.mtp3,
            options: config.tlv,
            ber: config.ber,
            depth: 0,
        }
    }

    pub fn registry(&self) -> &'r OidRegistry {
        self.registry
    }

    pub fn mtp3(&self) -> Mtp3Config {
        self.mtp3
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Run `f` one composite level deeper
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.options.max_depth {
            warn!(limit = self.options.max_depth, "parameter nesting budget exceeded");
            return Err(DissectError::RecursionBudgetExceeded {
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Point code shown per the configured MTP3 standard
    pub fn format_point_code(&self, raw: u32) -> String {
        PointCode::masked(raw, self.mtp3.standard).format(self.mtp3.standard, self.mtp3.pc_format)
    }

    /// Hand a payload to the handler registered under `key` in `table`.
    /// Returns `None` when nothing is registered.
    pub fn dispatch(&self, table: &str, key: u32, payload: &ByteCursor) -> Option<FieldNode> {
        let (name, handler) = self.registry.table(table)?.lookup_uint(key)?;
        let mut ctx = DecodeContext::new(self.registry, self.ber);
        Some(match handler.dissect(&mut ctx, payload, 0) {
            Ok((_, node)) => node,
            Err(err) => {
                debug!(table, key, error = %err, "payload handler failed");
                FieldNode::flagged(name, payload.absolute(0), payload.tail(0), &err)
            }
        })
    }
}

/// Protocol-specific half of the parameter loop
pub trait ParameterDecoder {
    /// Display name for `tag` in the active version, `None` when unknown
    fn parameter_name(&self, tag: u16) -> Option<&'static str>;

    /// Decode the value of a known parameter into `node`. Composite
    /// parameters call [`walk_nested`] on their value.
    fn decode_value(&mut self, ctx: &mut SigtranContext<'_>, param: &Parameter, node: &mut FieldNode) -> Result<()>;
}

/// Walk a parameter list, pushing one node per parameter onto `parent`.
/// Only `RecursionBudgetExceeded` escapes; every other failure is kept
/// inline.
pub fn walk_parameters<D: ParameterDecoder + ?Sized>(
    ctx: &mut SigtranContext<'_>,
    decoder: &mut D,
    tvb: &ByteCursor,
    parent: &mut FieldNode,
) -> Result<()> {
    let mut walker = ParameterWalker::new(tvb);
    while let Some(item) = walker.next() {
        let param = match item {
            Ok(param) => param,
            Err(err) => {
                let pos = walker.position();
                debug!(error = %err, "parameter list ended early");
                parent.push(FieldNode::flagged(
                    "Malformed parameter",
                    tvb.absolute(pos),
                    tvb.tail(pos),
                    &err,
                ));
                break;
            }
        };
        parent.push(dissect_parameter(ctx, decoder, tvb, &param)?);
    }
    Ok(())
}

/// Walk the parameters nested in a composite parameter's value
pub fn walk_nested<D: ParameterDecoder + ?Sized>(
    ctx: &mut SigtranContext<'_>,
    decoder: &mut D,
    value: &ByteCursor,
    node: &mut FieldNode,
) -> Result<()> {
    ctx.nested(|ctx| walk_parameters(ctx, decoder, value, node))
}

fn dissect_parameter<D: ParameterDecoder + ?Sized>(
    ctx: &mut SigtranContext<'_>,
    decoder: &mut D,
    tvb: &ByteCursor,
    param: &Parameter,
) -> Result<FieldNode> {
    let offset = tvb.absolute(param.offset);
    let Some(name) = decoder.parameter_name(param.tag) else {
        debug!(tag = param.tag, "unknown parameter");
        let mut node = FieldNode::new(
            "Unknown parameter",
            offset,
            param.total_len(),
            Value::Opaque(param.value.tail(0)),
        )
        .with_suffix(format!("(tag 0x{:04x})", param.tag))
        .with_expert(ExpertInfo::warn(
            ExpertKind::UnknownParameter,
            format!("unknown parameter tag 0x{:04x}", param.tag),
        ));
        annotate_clamp(param, &mut node);
        return Ok(node);
    };

    let mut node = FieldNode::new(name, offset, param.total_len(), Value::None);
    node.push(
        FieldNode::new("Parameter tag", offset, 2, Value::Unsigned(param.tag as u64))
            .with_suffix(format!("(0x{:04x})", param.tag)),
    );
    node.push(FieldNode::new("Parameter length", offset + 2, 2, Value::Unsigned(param.length as u64)));
    annotate_clamp(param, &mut node);

    match decoder.decode_value(ctx, param, &mut node) {
        Ok(()) => {}
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            debug!(parameter = name, error = %err, "parameter value degraded to raw bytes");
            node.push(FieldNode::flagged(
                "Parameter value",
                param.value.absolute(0),
                param.value.tail(0),
                &err,
            ));
        }
    }
    if param.padding > 0 {
        let start = param.offset + PARAMETER_HEADER_LEN + param.value.len();
        if let Ok(pad) = tvb.slice(start, param.padding) {
            node.push(FieldNode::new("Padding", tvb.absolute(start), param.padding, Value::Bytes(pad)));
        }
    }
    Ok(node)
}

fn annotate_clamp(param: &Parameter, node: &mut FieldNode) {
    if param.clamped {
        node.annotate(ExpertInfo::warn(
            ExpertKind::LengthClamped,
            format!(
                "declared length {} exceeds the {} bytes available",
                param.length,
                param.value.len() + PARAMETER_HEADER_LEN
            ),
        ));
    }
}

/// Value length must be exactly `expected`
pub fn expect_len(param: &Parameter, expected: usize) -> Result<()> {
    if param.value.len() != expected {
        return Err(DissectError::malformed(
            param.value.absolute(0),
            format!("{} byte value where {} expected", param.value.len(), expected),
        ));
    }
    Ok(())
}

/// Value length must be a nonzero multiple of `unit`
pub fn expect_multiple(param: &Parameter, unit: usize) -> Result<usize> {
    let len = param.value.len();
    if len == 0 || len % unit != 0 {
        return Err(DissectError::malformed(
            param.value.absolute(0),
            format!("{} byte value is not a multiple of {}", len, unit),
        ));
    }
    Ok(len / unit)
}

/// Plain u32 value with an optional name table
pub fn u32_node(
    value: &ByteCursor,
    offset: usize,
    name: &'static str,
    names: &[(u32, &'static str)],
) -> Result<FieldNode> {
    let raw = value.read_u32(offset)?;
    let node = FieldNode::new(name, value.absolute(offset), 4, Value::Unsigned(raw as u64));
    Ok(match names.iter().find(|(v, _)| *v == raw) {
        Some((_, label)) => node.with_suffix(format!("({})", label)),
        None if !names.is_empty() => node.with_suffix("(Unknown)"),
        None => node,
    })
}

/// Point code carried either in the standard's own width or right-aligned
/// in 4 bytes; any other value length is malformed
pub fn read_point_code(ctx: &SigtranContext<'_>, param: &Parameter) -> Result<u32> {
    let width = ctx.mtp3().standard.point_code_len();
    let v = &param.value;
    let raw = match v.len() {
        4 => v.read_u32(0)?,
        n if n == width => v.bytes(0, n)?.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32),
        n => {
            return Err(DissectError::malformed(
                v.absolute(0),
                format!("{} byte point code where {} or 4 expected", n, width),
            ))
        }
    };
    Ok(PointCode::masked(raw, ctx.mtp3().standard).0)
}

/// Whole value as a lossy UTF-8 string (INFO strings, hostnames)
pub fn string_node(value: &ByteCursor, name: &'static str) -> FieldNode {
    let text = String::from_utf8_lossy(value.as_bytes()).into_owned();
    FieldNode::new(name, value.absolute(0), value.len(), Value::Str(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameter(tag: u16, value: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&tag.to_be_bytes());
        out.extend_from_slice(&((value.len() + 4) as u16).to_be_bytes());
        out.extend_from_slice(value);
        out.resize(out.len() + padding(value.len()), 0);
        out
    }

    #[test]
    fn test_padding() {
        assert_eq!(padding(4), 0);
        assert_eq!(padding(5), 3);
        assert_eq!(padding(6), 2);
        assert_eq!(padding(7), 1);
    }

    #[test]
    fn test_walker_clamps_overlong_parameter() {
        let mut data = parameter(1, &[0xAA, 0xBB]);
        data.extend_from_slice(&[0x00, 0x02, 0x00, 0x20, 0x01, 0x02]);
        let tvb = ByteCursor::from(data);
        let params: Vec<_> = ParameterWalker::new(&tvb).collect::<Result<_>>().unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].value.as_bytes().as_ref(), &[0xAA, 0xBB]);
        assert_eq!(params[0].padding, 2);
        assert!(params[1].clamped);
        assert_eq!(params[1].value.len(), 2);
    }

    #[test]
    fn test_walker_stops_on_short_length() {
        let mut data = vec![0x00, 0x01, 0x00, 0x02];
        data.extend(parameter(2, &[1, 2, 3, 4]));
        let tvb = ByteCursor::from(data);
        let items: Vec<_> = ParameterWalker::new(&tvb).collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(DissectError::Malformed { .. })));
    }

    #[test]
    fn test_common_header_body_len() {
        let header = CommonHeader {
            version: 1,
            reserved: 0,
            class: 3,
            msg_type: 1,
            length: 100,
        };
        assert_eq!(header.body_len(24), 16);
        assert_eq!(header.body_len(200), 92);
        let short = CommonHeader { length: 2, ..header };
        assert_eq!(short.body_len(24), 0);
    }
}
