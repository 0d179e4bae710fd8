//! OID and dissector-table dispatch
//!
//! Populated once at setup (`&mut self`) and read-only while decoding
//! (`&self`), so nothing can be registered in the middle of a packet.

use crate::ber::context::DecodeContext;
use crate::ber::schema::DecodeFn;
use crate::cursor::ByteCursor;
use crate::errors::{DissectError, Result};
use crate::tree::FieldNode;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Decoder bound to an OID, media type or table key.
///
/// Receives the view and the offset of the element it owns and returns
/// the offset after it, like every other decoder in the crate.
pub trait OidHandler: Send + Sync {
    fn dissect(
        &self,
        ctx: &mut DecodeContext<'_>,
        tvb: &ByteCursor,
        offset: usize,
    ) -> Result<(usize, FieldNode)>;
}

/// Plain function handler signature
pub type HandlerFn = fn(&mut DecodeContext<'_>, &ByteCursor, usize) -> Result<(usize, FieldNode)>;

impl OidHandler for HandlerFn {
    fn dissect(
        &self,
        ctx: &mut DecodeContext<'_>,
        tvb: &ByteCursor,
        offset: usize,
    ) -> Result<(usize, FieldNode)> {
        (*self)(ctx, tvb, offset)
    }
}

/// Schema decoder registered under a field name
pub struct TypeHandler {
    name: &'static str,
    decoder: DecodeFn,
}

impl TypeHandler {
    pub fn new(name: &'static str, decoder: DecodeFn) -> Self {
        Self { name, decoder }
    }
}

impl OidHandler for TypeHandler {
    fn dissect(
        &self,
        ctx: &mut DecodeContext<'_>,
        tvb: &ByteCursor,
        offset: usize,
    ) -> Result<(usize, FieldNode)> {
        (self.decoder)(false, ctx, tvb, offset, self.name)
    }
}

#[derive(Clone)]
struct OidEntry {
    name: &'static str,
    handler: Option<Arc<dyn OidHandler>>,
}

#[derive(Clone)]
struct Registered {
    name: &'static str,
    handler: Arc<dyn OidHandler>,
}

/// Secondary dispatch keyed by integer or string
/// (service indicator, SSN, media type, syntax name)
#[derive(Clone, Default)]
pub struct DissectorTable {
    by_uint: BTreeMap<u32, Registered>,
    by_str: BTreeMap<String, Registered>,
}

impl DissectorTable {
    pub fn add_uint(&mut self, key: u32, name: &'static str, handler: impl OidHandler + 'static) {
        self.by_uint.insert(
            key,
            Registered {
                name,
                handler: Arc::new(handler),
            },
        );
    }

    /// String keys are matched case-insensitively
    pub fn add_string(&mut self, key: &str, name: &'static str, handler: impl OidHandler + 'static) {
        self.by_str.insert(
            key.to_ascii_lowercase(),
            Registered {
                name,
                handler: Arc::new(handler),
            },
        );
    }

    pub fn lookup_uint(&self, key: u32) -> Option<(&'static str, &dyn OidHandler)> {
        self.by_uint.get(&key).map(|r| (r.name, r.handler.as_ref()))
    }

    pub fn lookup_str(&self, key: &str) -> Option<(&'static str, &dyn OidHandler)> {
        self.by_str
            .get(&key.to_ascii_lowercase())
            .map(|r| (r.name, r.handler.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.by_uint.len() + self.by_str.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// OID → (symbolic name, optional decoder) plus named dissector tables
#[derive(Clone, Default)]
pub struct OidRegistry {
    oids: BTreeMap<String, OidEntry>,
    tables: BTreeMap<&'static str, DissectorTable>,
}

impl OidRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an OID with a name and an optional decoder.
    /// A later registration for the same OID replaces the earlier one.
    pub fn register_oid(
        &mut self,
        oid: &str,
        name: &'static str,
        handler: Option<Arc<dyn OidHandler>>,
    ) -> Result<()> {
        let key = normalize_oid(oid)?;
        self.oids.insert(key, OidEntry { name, handler });
        Ok(())
    }

    /// Name-only registration; keeps any handler already present
    pub fn register_name(&mut self, oid: &str, name: &'static str) -> Result<()> {
        let key = normalize_oid(oid)?;
        self.oids
            .entry(key)
            .and_modify(|e| e.name = name)
            .or_insert(OidEntry { name, handler: None });
        Ok(())
    }

    /// Register a schema decoder for values identified by `oid`
    pub fn register_type(&mut self, oid: &str, name: &'static str, decoder: DecodeFn) -> Result<()> {
        self.register_oid(oid, name, Some(Arc::new(TypeHandler::new(name, decoder))))
    }

    pub fn table_mut(&mut self, namespace: &'static str) -> &mut DissectorTable {
        self.tables.entry(namespace).or_default()
    }

    pub fn resolve(&self, oid: &str) -> Option<&dyn OidHandler> {
        self.oids.get(oid)?.handler.as_deref()
    }

    pub fn name_of(&self, oid: &str) -> Option<&'static str> {
        self.oids.get(oid).map(|e| e.name)
    }

    pub fn table(&self, namespace: &str) -> Option<&DissectorTable> {
        self.tables.get(namespace)
    }

    pub fn len(&self) -> usize {
        self.oids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oids.is_empty()
    }
}

/// Canonical dotted form: no leading dot, no leading zeros, at least two
/// arcs, first arc 0..=2
pub fn normalize_oid(oid: &str) -> Result<String> {
    let trimmed = oid.trim();
    let trimmed = trimmed.strip_prefix("oid:").unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix('.').unwrap_or(trimmed);
    let invalid = || DissectError::InvalidOid(oid.to_string());

    let arcs = trimmed
        .split('.')
        .map(|arc| {
            if arc.is_empty() || !arc.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            arc.parse::<u64>().map_err(|_| invalid())
        })
        .collect::<Result<Vec<_>>>()?;

    if arcs.len() < 2 || arcs[0] > 2 {
        return Err(invalid());
    }
    Ok(arcs
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join("."))
}
