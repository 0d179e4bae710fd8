//! # Brivas Dissection Core
//!
//! Decoders behind the traffic analyzer:
//!
//! - **BER** - generic ASN.1 BER engine driven by static schema tables
//! - **PKIX** - CRMF, PKCS #10, OCSP, X.509 and attribute certificate schemas
//! - **SIGTRAN** - MTP3, M3UA and SUA parameter decoders
//!
//! Decoders return [`tree::FieldNode`] records; nothing is rendered until a
//! [`tree::TreeBuilder`] replays them.
//!
//! ## Example
//! ```rust,ignore
//! use brivas_dissect::{pkix, ByteCursor, DissectConfig, OidRegistry};
//!
//! let mut registry = OidRegistry::new();
//! pkix::register(&mut registry)?;
//!
//! let config = DissectConfig::default();
//! let frame = ByteCursor::from(bytes);
//! let dissection = pkix::dissect(pkix::PkixPdu::OcspResponse, &registry, config.ber, &frame);
//! println!("{}", dissection.render());
//! ```

pub mod ber;
pub mod config;
pub mod cursor;
pub mod errors;
pub mod pkix;
pub mod registry;
pub mod sigtran;
pub mod tree;
pub mod types;

// Re-exports
pub use config::{BerOptions, DissectConfig, TlvOptions};
pub use cursor::ByteCursor;
pub use errors::{ConfigError, DissectError, Result};
pub use registry::{OidHandler, OidRegistry, TypeHandler};
pub use tree::{Dissection, ExpertInfo, ExpertKind, FieldNode, ProtoTree, Severity, TreeBuilder, Value};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
