//! Decoded field records and the output tree contract
//!
//! Decoders never render anything themselves. They return [`FieldNode`]
//! records (name, frame-absolute range, typed value, optional suffix,
//! children, expert annotations) and the caller replays them into any
//! [`TreeBuilder`]. [`ProtoTree`] is the in-memory builder used by tests
//! and by the inspector binary.

use crate::errors::DissectError;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use serde::{Serialize, Serializer};
use std::fmt;

/// Expert annotation severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Note,
    Warn,
    Error,
}

/// What an expert annotation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertKind {
    Truncated,
    Malformed,
    MissingMandatoryField,
    EmptySequence,
    UnknownChoice,
    UnknownTag,
    UnresolvedOid,
    RecursionBudgetExceeded,
    UnknownExtension,
    UnknownParameter,
    LengthClamped,
    NonCanonical,
    TrailingData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpertInfo {
    pub severity: Severity,
    pub kind: ExpertKind,
    pub message: String,
}

impl ExpertInfo {
    pub fn new(severity: Severity, kind: ExpertKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
        }
    }

    pub fn note(kind: ExpertKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Note, kind, message)
    }

    pub fn warn(kind: ExpertKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warn, kind, message)
    }

    pub fn error(kind: ExpertKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, message)
    }
}

impl From<&DissectError> for ExpertInfo {
    fn from(err: &DissectError) -> Self {
        let (severity, kind) = match err {
            DissectError::Truncated { .. } => (Severity::Error, ExpertKind::Truncated),
            DissectError::Malformed { .. } => (Severity::Error, ExpertKind::Malformed),
            DissectError::MissingMandatoryField { .. } => {
                (Severity::Error, ExpertKind::MissingMandatoryField)
            }
            DissectError::EmptySequence(_) => (Severity::Error, ExpertKind::EmptySequence),
            DissectError::UnknownChoice { .. } => (Severity::Error, ExpertKind::UnknownChoice),
            DissectError::UnknownTag { .. } => (Severity::Error, ExpertKind::UnknownTag),
            DissectError::UnresolvedOid(_) => (Severity::Warn, ExpertKind::UnresolvedOid),
            DissectError::RecursionBudgetExceeded { .. } => {
                (Severity::Error, ExpertKind::RecursionBudgetExceeded)
            }
            DissectError::InvalidOid(_) => (Severity::Error, ExpertKind::Malformed),
        };
        Self::new(severity, kind, err.to_string())
    }
}

/// Typed value of a decoded field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Label-only node (headers, parameter groups)
    None,
    Integer(i64),
    Unsigned(u64),
    Boolean(bool),
    Bytes(#[serde(serialize_with = "serialize_hex")] Bytes),
    BitString {
        #[serde(serialize_with = "serialize_hex")]
        data: Bytes,
        unused_bits: u8,
        named: Vec<&'static str>,
    },
    Oid(String),
    Str(String),
    Time(DateTime<FixedOffset>),
    Null,
    /// Name of the CHOICE alternative that was taken
    Choice(&'static str),
    Constructed,
    /// Content that could not be (or was not) interpreted
    Opaque(#[serde(serialize_with = "serialize_hex")] Bytes),
}

impl Value {
    /// Significant bits of a BIT STRING as `0`/`1`, first bit first. The
    /// unused trailing bits are dropped whatever their content.
    pub fn bits(&self) -> Option<String> {
        let Value::BitString { data, unused_bits, .. } = self else {
            return None;
        };
        let significant = (data.len() * 8).saturating_sub(*unused_bits as usize);
        Some(
            (0..significant)
                .map(|bit| if data[bit / 8] & (0x80 >> (bit % 8)) != 0 { '1' } else { '0' })
                .collect(),
        )
    }
}

fn serialize_hex<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(data))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None | Value::Constructed => Ok(()),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Unsigned(v) => write!(f, "{}", v),
            Value::Boolean(v) => f.write_str(if *v { "True" } else { "False" }),
            Value::Bytes(b) | Value::Opaque(b) => f.write_str(&hex::encode(b)),
            Value::BitString { data, named, .. } => {
                f.write_str(&hex::encode(data))?;
                if !named.is_empty() {
                    write!(f, " ({})", named.join(", "))?;
                }
                Ok(())
            }
            Value::Oid(s) | Value::Str(s) => f.write_str(s),
            Value::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S%.f %:z")),
            Value::Null => f.write_str("NULL"),
            Value::Choice(alt) => f.write_str(alt),
        }
    }
}

/// One decoded field, with its children
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldNode {
    pub name: &'static str,
    pub offset: usize,
    pub length: usize,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expert: Vec<ExpertInfo>,
}

impl FieldNode {
    pub fn new(name: &'static str, offset: usize, length: usize, value: Value) -> Self {
        Self {
            name,
            offset,
            length,
            value,
            suffix: None,
            children: Vec::new(),
            expert: Vec::new(),
        }
    }

    /// Raw node standing in for an element that failed to decode
    pub fn flagged(name: &'static str, offset: usize, raw: Bytes, err: &DissectError) -> Self {
        let mut node = Self::new(name, offset, raw.len(), Value::Opaque(raw));
        node.expert.push(ExpertInfo::from(err));
        node
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_child(mut self, child: FieldNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_expert(mut self, info: ExpertInfo) -> Self {
        self.expert.push(info);
        self
    }

    pub fn push(&mut self, child: FieldNode) {
        self.children.push(child);
    }

    pub fn annotate(&mut self, info: ExpertInfo) {
        self.expert.push(info);
    }

    /// First direct child with the given name
    pub fn child(&self, name: &str) -> Option<&FieldNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Follow a path of child names
    pub fn find(&self, path: &[&str]) -> Option<&FieldNode> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    /// Depth-first search for the first node with the given name
    pub fn find_any(&self, name: &str) -> Option<&FieldNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_any(name))
    }

    /// Depth-first iteration over this node and all descendants
    pub fn iter(&self) -> impl Iterator<Item = &FieldNode> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    pub fn has_expert(&self, kind: ExpertKind) -> bool {
        self.iter().any(|n| n.expert.iter().any(|e| e.kind == kind))
    }

    /// True when any node in this subtree carries an error annotation
    pub fn has_errors(&self) -> bool {
        self.iter()
            .any(|n| n.expert.iter().any(|e| e.severity == Severity::Error))
    }

    /// Single-line rendering: `name: value suffix`
    pub fn label(&self) -> String {
        let value = self.value.to_string();
        let mut label = String::from(self.name);
        if !value.is_empty() {
            label.push_str(": ");
            label.push_str(&value);
        }
        if let Some(suffix) = &self.suffix {
            label.push(' ');
            label.push_str(suffix);
        }
        label
    }
}

/// Consumer of decoded fields (the GUI tree, a JSON writer, a test probe)
pub trait TreeBuilder {
    type Handle: Copy;

    fn add_subtree(&mut self, parent: Option<Self::Handle>, field: &FieldNode) -> Self::Handle;

    fn add_field(&mut self, parent: Option<Self::Handle>, field: &FieldNode);
}

/// Replay a node and its descendants into a builder
pub fn emit<B: TreeBuilder>(builder: &mut B, parent: Option<B::Handle>, node: &FieldNode) {
    if node.children.is_empty() {
        builder.add_field(parent, node);
        return;
    }
    let handle = builder.add_subtree(parent, node);
    for child in &node.children {
        emit(builder, Some(handle), child);
    }
}

/// Flat tree item; `parent` indexes into [`ProtoTree::items`]
#[derive(Debug, Clone, Serialize)]
pub struct TreeItem {
    pub parent: Option<usize>,
    pub depth: usize,
    pub label: String,
    pub offset: usize,
    pub length: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expert: Vec<ExpertInfo>,
}

/// Arena-backed tree builder
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProtoTree {
    items: Vec<TreeItem>,
}

impl ProtoTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_node(node: &FieldNode) -> Self {
        let mut tree = Self::new();
        emit(&mut tree, None, node);
        tree
    }

    pub fn items(&self) -> &[TreeItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn push(&mut self, parent: Option<usize>, field: &FieldNode) -> usize {
        let depth = parent.map_or(0, |p| self.items[p].depth + 1);
        self.items.push(TreeItem {
            parent,
            depth,
            label: field.label(),
            offset: field.offset,
            length: field.length,
            expert: field.expert.clone(),
        });
        self.items.len() - 1
    }

    /// Indented text rendering, one item per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            for _ in 0..item.depth {
                out.push_str("    ");
            }
            out.push_str(&item.label);
            out.push('\n');
            for info in &item.expert {
                for _ in 0..=item.depth {
                    out.push_str("    ");
                }
                out.push_str(&format!("[Expert Info ({:?}): {}]\n", info.severity, info.message));
            }
        }
        out
    }
}

impl TreeBuilder for ProtoTree {
    type Handle = usize;

    fn add_subtree(&mut self, parent: Option<usize>, field: &FieldNode) -> usize {
        self.push(parent, field)
    }

    fn add_field(&mut self, parent: Option<usize>, field: &FieldNode) {
        self.push(parent, field);
    }
}

/// Result of dissecting one frame: summary columns plus the field tree
#[derive(Debug, Clone, Serialize)]
pub struct Dissection {
    pub protocol: &'static str,
    pub info: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Top-level "malformed packet" indicator
    pub malformed: bool,
    pub root: FieldNode,
}

impl Dissection {
    pub fn render(&self) -> String {
        ProtoTree::from_node(&self.root).render()
    }
}
