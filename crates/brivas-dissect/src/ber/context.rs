//! Per-message BER decode state

use crate::config::BerOptions;
use crate::errors::{DissectError, Result};
use crate::registry::OidRegistry;
use tracing::warn;

/// Decode state threaded through every BER decoder.
///
/// Holds the read-only registry, the options, the current nesting depth
/// and the type OID most recently decoded in the enclosing SEQUENCE. The
/// type OID is saved and cleared when a SEQUENCE starts and restored when
/// it ends, so an `AttributeTypeAndValue` never sees its parent's OID.
pub struct DecodeContext<'r> {
    registry: &'r OidRegistry,
    options: BerOptions,
    depth: usize,
    type_oid: Option<String>,
}

impl<'r> DecodeContext<'r> {
    pub fn new(registry: &'r OidRegistry, options: BerOptions) -> Self {
        Self {
            registry,
            options,
            depth: 0,
            type_oid: None,
        }
    }

    pub fn registry(&self) -> &'r OidRegistry {
        self.registry
    }

    pub fn options(&self) -> &BerOptions {
        &self.options
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Run `f` one nesting level deeper
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.options.max_depth {
            warn!(limit = self.options.max_depth, "BER nesting budget exceeded");
            return Err(DissectError::RecursionBudgetExceeded {
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub fn type_oid(&self) -> Option<&str> {
        self.type_oid.as_deref()
    }

    pub fn set_type_oid(&mut self, oid: String) {
        self.type_oid = Some(oid);
    }

    /// Swap the type OID, returning the previous one
    pub(crate) fn replace_type_oid(&mut self, oid: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.type_oid, oid)
    }
}
