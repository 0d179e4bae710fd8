//! SCCP connection tracking for SUA
//!
//! A connection is keyed by (originating PC, destination PC, reference
//! number of the side that sent the message). Entries are never replaced
//! or removed: [`AssociationTable::insert_if_absent`] and
//! [`AssociationTable::insert_alias`] keep whatever is already there, and
//! [`AssociationTable::lookup`] reads.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AssociationKey {
    pub opc: u32,
    pub dpc: u32,
    pub reference: u32,
}

impl AssociationKey {
    pub fn new(opc: u32, dpc: u32, reference: u32) -> Self {
        Self { opc, dpc, reference }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Association {
    pub id: u32,
    /// Frame number of the CORE that opened it
    pub frame: u64,
}

/// Shared connection table; clones see the same entries
#[derive(Debug, Clone, Default)]
pub struct AssociationTable {
    entries: Arc<DashMap<AssociationKey, Association>>,
    next_id: Arc<AtomicU32>,
}

impl AssociationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the association under `key`, creating one with a fresh id
    /// if there is none
    pub fn insert_if_absent(&self, key: AssociationKey, frame: u64) -> Association {
        *self.entries.entry(key).or_insert_with(|| Association {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            frame,
        })
    }

    /// Bind an existing association under a second key (the responder's
    /// reference)
    pub fn insert_alias(&self, key: AssociationKey, association: Association) -> Association {
        *self.entries.entry(key).or_insert(association)
    }

    pub fn lookup(&self, key: &AssociationKey) -> Option<Association> {
        self.entries.get(key).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
