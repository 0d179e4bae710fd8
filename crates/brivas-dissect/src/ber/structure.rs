//! Constructed type decoders: SEQUENCE, SET, SEQUENCE OF, SET OF, CHOICE,
//! tagging wrappers and OID-resolved open types
//!
//! Children are decoded against a sub-view bounded by the parent's content
//! length, so a child can never read past its parent. A failed child whose
//! extent is known is kept as a flagged raw node and its siblings continue;
//! a child whose extent is unknown ends the structure with one flagged node
//! covering the rest. A structure missing a mandatory member keeps the
//! members decoded so far and carries the error itself.
//! `RecursionBudgetExceeded` is never contained.

use super::context::DecodeContext;
use super::header::{read_header, universal, Header, Length, TagClass};
use super::primitive::{
    dissect_big_integer, dissect_bit_string, dissect_boolean, dissect_enumerated,
    dissect_generalized_time, dissect_null, dissect_object_identifier, dissect_octet_string,
    dissect_restricted_string, dissect_utc_time, StringKind,
};
use super::schema::{DecodeFn, FieldSpec};
use crate::cursor::ByteCursor;
use crate::errors::{DissectError, Result};
use crate::registry::OidHandler;
use crate::tree::{ExpertInfo, ExpertKind, FieldNode, Value};
use tracing::debug;

/// Header of a constructed element, checking the universal tag unless
/// the caller applied an implicit tag
fn constructed_header(
    implicit: bool,
    tvb: &ByteCursor,
    offset: usize,
    expected: u32,
    name: &'static str,
) -> Result<Header> {
    let header = read_header(tvb, offset)?;
    if !implicit && !header.is_universal(expected) {
        return Err(DissectError::UnknownTag {
            field: name,
            class: header.class,
            tag: header.tag,
        });
    }
    if !header.constructed {
        return Err(DissectError::malformed(
            tvb.absolute(offset),
            format!("{} must use the constructed encoding", name),
        ));
    }
    Ok(header)
}

/// Content view of a constructed element; the flag is set for
/// indefinite length
fn open_body(tvb: &ByteCursor, offset: usize, header: &Header) -> Result<(ByteCursor, bool)> {
    let start = offset + header.header_len;
    match header.length {
        Length::Definite(n) => Ok((tvb.subset(start, n)?, false)),
        Length::Indefinite => Ok((tvb.subset_clamped(start, tvb.remaining(start)), true)),
    }
}

enum Step {
    End(usize),
    Element(Header),
}

fn next_element(body: &ByteCursor, pos: usize, indefinite: bool) -> Result<Step> {
    if !indefinite && pos >= body.len() {
        return Ok(Step::End(pos));
    }
    let header = read_header(body, pos)?;
    if indefinite && header.is_eoc() {
        return Ok(Step::End(pos + header.header_len));
    }
    Ok(Step::Element(header))
}

/// Offset after the element at `offset`, following indefinite lengths
pub fn skip_element(ctx: &mut DecodeContext<'_>, tvb: &ByteCursor, offset: usize) -> Result<usize> {
    let header = read_header(tvb, offset)?;
    let start = offset + header.header_len;
    match header.length {
        Length::Definite(n) => {
            tvb.ensure(start, n)?;
            Ok(start + n)
        }
        Length::Indefinite => ctx.nested(|ctx| {
            let mut pos = start;
            loop {
                let child = read_header(tvb, pos)?;
                if child.is_eoc() {
                    return Ok(pos + child.header_len);
                }
                pos = skip_element(ctx, tvb, pos)?;
            }
        }),
    }
}

/// Flagged node covering everything from `pos` to the end of the view
fn push_rest(body: &ByteCursor, pos: usize, name: &'static str, err: &DissectError, node: &mut FieldNode) {
    debug!(field = name, error = %err, "structure ended early");
    node.push(FieldNode::flagged(name, body.absolute(pos), body.tail(pos), err));
}

/// Keep a failed child as a flagged node. Returns where to continue, or
/// `None` when the child's extent is unknown and the structure must end.
fn contain(
    ctx: &mut DecodeContext<'_>,
    body: &ByteCursor,
    pos: usize,
    name: &'static str,
    err: DissectError,
    node: &mut FieldNode,
) -> Result<Option<usize>> {
    if err.is_fatal() {
        return Err(err);
    }
    match skip_element(ctx, body, pos) {
        Ok(end) => {
            debug!(field = name, error = %err, "element decode failed");
            node.push(FieldNode::flagged(name, body.absolute(pos), body.slice(pos, end - pos)?, &err));
            Ok(Some(end))
        }
        Err(skip_err) if skip_err.is_fatal() => Err(skip_err),
        Err(_) => {
            push_rest(body, pos, name, &err, node);
            Ok(None)
        }
    }
}

/// Element after the end of the schema: skipped and noted, not rejected
fn skip_extension(
    ctx: &mut DecodeContext<'_>,
    body: &ByteCursor,
    pos: usize,
    header: &Header,
    structure: &'static str,
    node: &mut FieldNode,
) -> Result<Option<usize>> {
    match skip_element(ctx, body, pos) {
        Ok(end) => {
            debug!(structure, tag = header.tag, "unknown extension skipped");
            let raw = body.slice(pos, end - pos)?;
            node.push(
                FieldNode::new("unknown", body.absolute(pos), end - pos, Value::Opaque(raw))
                    .with_suffix(tag_label(header))
                    .with_expert(ExpertInfo::note(
                        ExpertKind::UnknownExtension,
                        format!("unknown extension in {}", structure),
                    )),
            );
            Ok(Some(end))
        }
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            push_rest(body, pos, structure, &err, node);
            Ok(None)
        }
    }
}

/// End a structure that cannot continue at `pos`. The node keeps the
/// children decoded so far and takes the error; the remaining content is
/// shown raw. Returns the offset after the structure's content.
fn abort_structure(
    ctx: &mut DecodeContext<'_>,
    body: &ByteCursor,
    pos: usize,
    indefinite: bool,
    err: DissectError,
    node: &mut FieldNode,
) -> Result<usize> {
    debug!(structure = node.name, error = %err, "structure aborted");
    node.annotate(ExpertInfo::from(&err));
    let (raw_end, end) = if indefinite {
        let mut cur = pos;
        loop {
            match next_element(body, cur, true) {
                Ok(Step::End(end)) => break (cur, end),
                Ok(Step::Element(_)) => match skip_element(ctx, body, cur) {
                    Ok(next) => cur = next,
                    Err(skip_err) if skip_err.is_fatal() => return Err(skip_err),
                    Err(_) => break (body.len(), body.len()),
                },
                Err(_) => break (body.len(), body.len()),
            }
        }
    } else {
        (body.len(), body.len())
    };
    if raw_end > pos {
        let raw = body.slice(pos, raw_end - pos)?;
        node.push(FieldNode::new("unparsed", body.absolute(pos), raw_end - pos, Value::Opaque(raw)));
    }
    Ok(end)
}

/// `[1]`, `[APPLICATION 3]`, `[UNIVERSAL 16]`
pub fn tag_label(header: &Header) -> String {
    match header.class {
        TagClass::Context => format!("[{}]", header.tag),
        TagClass::Application => format!("[APPLICATION {}]", header.tag),
        TagClass::Universal => format!("[UNIVERSAL {}]", header.tag),
        TagClass::Private => format!("[PRIVATE {}]", header.tag),
    }
}

/// Decode one schema entry at `offset`, applying its tagging mode
pub fn decode_field(
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    field: &FieldSpec,
) -> Result<(usize, FieldNode)> {
    ctx.nested(|ctx| {
        if field.is_untagged() || field.class == TagClass::Universal {
            (field.decoder)(false, ctx, tvb, offset, field.name)
        } else if field.is_implicit() {
            (field.decoder)(true, ctx, tvb, offset, field.name)
        } else {
            dissect_explicit(ctx, tvb, offset, field.name, field.decoder)
        }
    })
}

/// EXPLICIT tag: consume the outer constructed tag, decode the single
/// element inside it
fn dissect_explicit(
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
    inner: DecodeFn,
) -> Result<(usize, FieldNode)> {
    let outer = read_header(tvb, offset)?;
    if !outer.constructed {
        return Err(DissectError::malformed(
            tvb.absolute(offset),
            format!("{}: explicit tag must be constructed", name),
        ));
    }
    let (body, indefinite) = open_body(tvb, offset, &outer)?;
    let (inner_end, mut node) = inner(false, ctx, &body, 0, name)?;
    let consumed = if indefinite {
        let eoc = read_header(&body, inner_end)?;
        if !eoc.is_eoc() {
            return Err(DissectError::malformed(
                body.absolute(inner_end),
                format!("{}: missing end-of-contents", name),
            ));
        }
        inner_end + eoc.header_len
    } else {
        if inner_end < body.len() {
            node.annotate(ExpertInfo::warn(
                ExpertKind::TrailingData,
                format!("{} trailing bytes after {}", body.len() - inner_end, name),
            ));
        }
        body.len()
    };
    let end = offset + outer.header_len + consumed;
    node.offset = tvb.absolute(offset);
    node.length = end - offset;
    Ok((end, node))
}

/// Context-specific tag around any decoder
#[allow(clippy::too_many_arguments)]
pub fn dissect_tagged(
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
    class: TagClass,
    tag: u32,
    explicit: bool,
    inner: DecodeFn,
) -> Result<(usize, FieldNode)> {
    let header = read_header(tvb, offset)?;
    if header.class != class || header.tag != tag {
        return Err(DissectError::UnknownTag {
            field: name,
            class: header.class,
            tag: header.tag,
        });
    }
    ctx.nested(|ctx| {
        if explicit {
            dissect_explicit(ctx, tvb, offset, name, inner)
        } else {
            inner(true, ctx, tvb, offset, name)
        }
    })
}

fn constructed_node(tvb: &ByteCursor, offset: usize, name: &'static str) -> FieldNode {
    FieldNode::new(name, tvb.absolute(offset), 0, Value::Constructed)
}

pub fn dissect_sequence(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
    fields: &[FieldSpec],
) -> Result<(usize, FieldNode)> {
    let header = constructed_header(implicit, tvb, offset, universal::SEQUENCE, name)?;
    let (body, indefinite) = open_body(tvb, offset, &header)?;
    let mut node = constructed_node(tvb, offset, name);

    let saved = ctx.replace_type_oid(None);
    let walked = walk_sequence(ctx, &body, indefinite, name, fields, &mut node);
    ctx.replace_type_oid(saved);

    let end = offset + header.header_len + walked?;
    node.length = end - offset;
    Ok((end, node))
}

fn walk_sequence(
    ctx: &mut DecodeContext<'_>,
    body: &ByteCursor,
    indefinite: bool,
    structure: &'static str,
    fields: &[FieldSpec],
    node: &mut FieldNode,
) -> Result<usize> {
    let mut pos = 0;
    let mut idx = 0;
    loop {
        let header = match next_element(body, pos, indefinite) {
            Ok(Step::End(end)) => {
                pos = end;
                break;
            }
            Ok(Step::Element(header)) => header,
            Err(err) => {
                push_rest(body, pos, structure, &err, node);
                return Ok(body.len());
            }
        };

        while idx < fields.len() && fields[idx].is_optional() && !fields[idx].matches(&header) {
            idx += 1;
        }
        let Some(field) = fields.get(idx) else {
            match skip_extension(ctx, body, pos, &header, structure, node)? {
                Some(next) => {
                    pos = next;
                    continue;
                }
                None => return Ok(body.len()),
            }
        };
        if !field.matches(&header) {
            let err = DissectError::MissingMandatoryField {
                structure,
                field: field.name,
            };
            return abort_structure(ctx, body, pos, indefinite, err, node);
        }

        match decode_field(ctx, body, pos, field) {
            Ok((next, child)) => {
                node.push(child);
                pos = next;
                idx += 1;
            }
            // an absent optional CHOICE; offer the element to the next entry
            Err(DissectError::UnknownChoice { .. }) if field.is_untagged() && field.is_optional() => {
                idx += 1;
            }
            Err(err) => match contain(ctx, body, pos, field.name, err, node)? {
                Some(next) => {
                    pos = next;
                    idx += 1;
                }
                None => return Ok(body.len()),
            },
        }
    }

    if let Some(missing) = fields[idx.min(fields.len())..].iter().find(|f| !f.is_optional()) {
        node.annotate(ExpertInfo::from(&DissectError::MissingMandatoryField {
            structure,
            field: missing.name,
        }));
    }
    Ok(pos)
}

/// SET: like SEQUENCE but members may arrive in any order
pub fn dissect_set(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
    fields: &[FieldSpec],
) -> Result<(usize, FieldNode)> {
    let header = constructed_header(implicit, tvb, offset, universal::SET, name)?;
    let (body, indefinite) = open_body(tvb, offset, &header)?;
    let mut node = constructed_node(tvb, offset, name);

    let saved = ctx.replace_type_oid(None);
    let walked = walk_set(ctx, &body, indefinite, name, fields, &mut node);
    ctx.replace_type_oid(saved);

    let end = offset + header.header_len + walked?;
    node.length = end - offset;
    Ok((end, node))
}

fn walk_set(
    ctx: &mut DecodeContext<'_>,
    body: &ByteCursor,
    indefinite: bool,
    structure: &'static str,
    fields: &[FieldSpec],
    node: &mut FieldNode,
) -> Result<usize> {
    let mut seen = vec![false; fields.len()];
    let mut pos = 0;
    loop {
        let header = match next_element(body, pos, indefinite) {
            Ok(Step::End(end)) => {
                pos = end;
                break;
            }
            Ok(Step::Element(header)) => header,
            Err(err) => {
                push_rest(body, pos, structure, &err, node);
                return Ok(body.len());
            }
        };

        // wildcard members only get elements no tagged member claims
        let idx = (0..fields.len())
            .find(|&i| !seen[i] && fields[i].matches_tag(&header))
            .or_else(|| (0..fields.len()).find(|&i| !seen[i] && fields[i].matches(&header)));
        let Some(idx) = idx else {
            match skip_extension(ctx, body, pos, &header, structure, node)? {
                Some(next) => {
                    pos = next;
                    continue;
                }
                None => return Ok(body.len()),
            }
        };
        seen[idx] = true;
        match decode_field(ctx, body, pos, &fields[idx]) {
            Ok((next, child)) => {
                node.push(child);
                pos = next;
            }
            Err(err) => match contain(ctx, body, pos, fields[idx].name, err, node)? {
                Some(next) => pos = next,
                None => return Ok(body.len()),
            },
        }
    }

    if let Some(missing) = fields
        .iter()
        .zip(&seen)
        .find(|(f, seen)| !**seen && !f.is_optional())
        .map(|(f, _)| f)
    {
        node.annotate(ExpertInfo::from(&DissectError::MissingMandatoryField {
            structure,
            field: missing.name,
        }));
    }
    Ok(pos)
}

/// SEQUENCE OF; `min` is the lower SIZE bound (1 for `SIZE (1..MAX)`)
pub fn dissect_sequence_of(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
    item: &FieldSpec,
    min: usize,
) -> Result<(usize, FieldNode)> {
    dissect_repeated(implicit, ctx, tvb, offset, name, universal::SEQUENCE, item, min)
}

/// SET OF; `min` is the lower SIZE bound
pub fn dissect_set_of(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
    item: &FieldSpec,
    min: usize,
) -> Result<(usize, FieldNode)> {
    dissect_repeated(implicit, ctx, tvb, offset, name, universal::SET, item, min)
}

#[allow(clippy::too_many_arguments)]
fn dissect_repeated(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
    expected: u32,
    item: &FieldSpec,
    min: usize,
) -> Result<(usize, FieldNode)> {
    let header = constructed_header(implicit, tvb, offset, expected, name)?;
    let (body, indefinite) = open_body(tvb, offset, &header)?;
    let mut node = constructed_node(tvb, offset, name);

    let mut count = 0;
    let mut pos = 0;
    loop {
        let element = match next_element(&body, pos, indefinite) {
            Ok(Step::End(end)) => {
                pos = end;
                break;
            }
            Ok(Step::Element(element)) => element,
            Err(err) => {
                push_rest(&body, pos, name, &err, &mut node);
                pos = body.len();
                break;
            }
        };

        let decoded = if item.matches(&element) {
            decode_field(ctx, &body, pos, item)
        } else {
            Err(DissectError::UnknownTag {
                field: item.name,
                class: element.class,
                tag: element.tag,
            })
        };
        match decoded {
            Ok((next, child)) => {
                node.push(child);
                count += 1;
                pos = next;
            }
            Err(err) => match contain(ctx, &body, pos, item.name, err, &mut node)? {
                Some(next) => pos = next,
                None => {
                    pos = body.len();
                    break;
                }
            },
        }
    }

    if count < min {
        node.annotate(ExpertInfo::from(&DissectError::EmptySequence(name)));
    }
    let end = offset + header.header_len + pos;
    node.length = end - offset;
    node.suffix = Some(format!("({} item{})", count, if count == 1 { "" } else { "s" }));
    Ok((end, node))
}

/// CHOICE: pick the alternative whose tag matches the next header.
/// Untagged and any-tag alternatives are tried in order when no tagged
/// alternative matches.
pub fn dissect_choice(
    _implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
    alternatives: &[FieldSpec],
) -> Result<(usize, FieldNode)> {
    let header = read_header(tvb, offset)?;
    let tagged = alternatives
        .iter()
        .find(|alt| alt.matches_tag(&header));

    let (alt, (end, child)) = match tagged {
        Some(alt) => (alt, decode_field(ctx, tvb, offset, alt)?),
        None => {
            let mut found = None;
            for alt in alternatives.iter().filter(|a| a.tag.is_none() || a.accepts_any_tag()) {
                match decode_field(ctx, tvb, offset, alt) {
                    Ok(decoded) => {
                        found = Some((alt, decoded));
                        break;
                    }
                    Err(DissectError::UnknownChoice { .. } | DissectError::UnknownTag { .. }) => continue,
                    Err(err) => return Err(err),
                }
            }
            found.ok_or(DissectError::UnknownChoice {
                choice: name,
                class: header.class,
                tag: header.tag,
            })?
        }
    };

    Ok((
        end,
        FieldNode::new(name, tvb.absolute(offset), end - offset, Value::Choice(alt.name)).with_child(child),
    ))
}

/// Open type whose syntax is selected by the type OID decoded earlier in
/// the enclosing SEQUENCE. Without a registered handler the element is
/// shown raw with an unresolved-OID annotation.
pub fn dissect_oid_dependent(
    _implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    let oid = ctx.type_oid().map(str::to_owned);
    let registry = ctx.registry();
    match oid.as_deref().and_then(|o| registry.resolve(o)) {
        Some(handler) => {
            let (end, mut node) = ctx.nested(|ctx| handler.dissect(ctx, tvb, offset))?;
            let type_name = node.name;
            node.name = name;
            if node.suffix.is_none() {
                node.suffix = Some(format!("({})", type_name));
            }
            Ok((end, node))
        }
        None => {
            let end = skip_element(ctx, tvb, offset)?;
            let raw = tvb.slice(offset, end - offset)?;
            let oid = oid.unwrap_or_else(|| "<none>".to_string());
            debug!(field = name, %oid, "no handler for open type");
            Ok((
                end,
                FieldNode::new(name, tvb.absolute(offset), end - offset, Value::Opaque(raw))
                    .with_expert(ExpertInfo::from(&DissectError::UnresolvedOid(oid))),
            ))
        }
    }
}

/// OCTET STRING whose content is itself a BER value typed by the type OID
/// (extension values, OCSP response bytes)
pub fn dissect_encapsulated(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    let header = read_header(tvb, offset)?;
    if !implicit && !header.is_universal(universal::OCTET_STRING) {
        return Err(DissectError::UnknownTag {
            field: name,
            class: header.class,
            tag: header.tag,
        });
    }
    if header.constructed {
        return dissect_octet_string(true, ctx, tvb, offset, name);
    }
    let len = header.definite_len().unwrap_or(0);
    let start = offset + header.header_len;
    let inner = tvb.subset(start, len)?;
    let end = start + len;
    let mut node = FieldNode::new(name, tvb.absolute(offset), end - offset, Value::None);

    let oid = ctx.type_oid().map(str::to_owned);
    let registry = ctx.registry();
    match oid.as_deref().and_then(|o| registry.resolve(o)) {
        Some(handler) => match ctx.nested(|ctx| handler.dissect(ctx, &inner, 0)) {
            Ok((inner_end, child)) => {
                node.push(child);
                if inner_end < inner.len() {
                    node.annotate(ExpertInfo::warn(
                        ExpertKind::TrailingData,
                        format!("{} trailing bytes in {}", inner.len() - inner_end, name),
                    ));
                }
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                debug!(field = name, error = %err, "encapsulated value failed");
                node.push(FieldNode::flagged(name, inner.absolute(0), inner.tail(0), &err));
            }
        },
        None => {
            let oid = oid.unwrap_or_else(|| "<none>".to_string());
            debug!(field = name, %oid, "no handler for encapsulated value");
            node.value = Value::Bytes(inner.tail(0));
            node.annotate(ExpertInfo::from(&DissectError::UnresolvedOid(oid)));
        }
    }
    Ok((end, node))
}

/// Schema-less decode of any element: universal primitives by type,
/// constructed elements recursively, everything else as raw bytes
pub fn dissect_unknown(
    _implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    let header = read_header(tvb, offset)?;
    if header.constructed {
        let (body, indefinite) = open_body(tvb, offset, &header)?;
        let mut node = constructed_node(tvb, offset, name).with_suffix(tag_label(&header));
        let consumed = ctx.nested(|ctx| {
            let mut pos = 0;
            loop {
                match next_element(&body, pos, indefinite) {
                    Ok(Step::End(end)) => return Ok(end),
                    Ok(Step::Element(_)) => {}
                    Err(err) => {
                        push_rest(&body, pos, name, &err, &mut node);
                        return Ok(body.len());
                    }
                }
                match dissect_unknown(false, ctx, &body, pos, "element") {
                    Ok((next, child)) => {
                        node.push(child);
                        pos = next;
                    }
                    Err(err) => match contain(ctx, &body, pos, "element", err, &mut node)? {
                        Some(next) => pos = next,
                        None => return Ok(body.len()),
                    },
                }
            }
        })?;
        let end = offset + header.header_len + consumed;
        node.length = end - offset;
        return Ok((end, node));
    }

    if header.class == TagClass::Universal {
        let decoder: Option<DecodeFn> = match header.tag {
            universal::BOOLEAN => Some(dissect_boolean),
            universal::INTEGER => Some(dissect_big_integer),
            universal::BIT_STRING => Some(dissect_bit_string),
            universal::OCTET_STRING => Some(dissect_octet_string),
            universal::NULL => Some(dissect_null),
            universal::OBJECT_IDENTIFIER => Some(dissect_object_identifier),
            universal::ENUMERATED => Some(dissect_enumerated),
            universal::UTC_TIME => Some(dissect_utc_time),
            universal::GENERALIZED_TIME => Some(dissect_generalized_time),
            _ => None,
        };
        if let Some(decoder) = decoder {
            return decoder(false, ctx, tvb, offset, name);
        }
        let kind = match header.tag {
            universal::UTF8_STRING => Some(StringKind::Utf8),
            universal::NUMERIC_STRING => Some(StringKind::Numeric),
            universal::PRINTABLE_STRING => Some(StringKind::Printable),
            universal::TELETEX_STRING => Some(StringKind::Teletex),
            universal::VIDEOTEX_STRING => Some(StringKind::Videotex),
            universal::IA5_STRING => Some(StringKind::Ia5),
            universal::GRAPHIC_STRING => Some(StringKind::Graphic),
            universal::VISIBLE_STRING => Some(StringKind::Visible),
            universal::GENERAL_STRING => Some(StringKind::General),
            universal::UNIVERSAL_STRING => Some(StringKind::Universal),
            universal::BMP_STRING => Some(StringKind::Bmp),
            _ => None,
        };
        if let Some(kind) = kind {
            return dissect_restricted_string(false, ctx, tvb, offset, name, kind);
        }
    }

    let len = header.definite_len().unwrap_or(0);
    let start = offset + header.header_len;
    let raw = tvb.slice(start, len)?;
    let end = start + len;
    Ok((
        end,
        FieldNode::new(name, tvb.absolute(offset), end - offset, Value::Bytes(raw)).with_suffix(tag_label(&header)),
    ))
}

/// Top-level entry: decode one PDU. A failure of the PDU itself yields a
/// single flagged root covering the whole buffer. The returned malformed
/// flag is set for that and for any error annotation inside the tree.
pub fn dissect_pdu(
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    name: &'static str,
    handler: &dyn OidHandler,
) -> (FieldNode, bool) {
    match handler.dissect(ctx, tvb, 0) {
        Ok((end, mut node)) => {
            if end < tvb.len() {
                node.annotate(ExpertInfo::warn(
                    ExpertKind::TrailingData,
                    format!("{} bytes after {}", tvb.len() - end, name),
                ));
            }
            let malformed = node.has_errors();
            if malformed {
                tracing::warn!(pdu = name, "PDU decoded with errors");
            }
            (node, malformed)
        }
        Err(err) => {
            tracing::warn!(pdu = name, error = %err, "malformed PDU");
            (FieldNode::flagged(name, tvb.absolute(0), tvb.tail(0), &err), true)
        }
    }
}
