//! ASN.1 BER decoding engine
//!
//! Header reader, primitive and structure decoders, the static schema
//! table shape and the per-message decode context. Schema content for
//! concrete protocols lives in [`crate::pkix`].

pub mod context;
pub mod encode;
pub mod header;
pub mod primitive;
pub mod schema;
pub mod structure;

pub use context::DecodeContext;
pub use header::{read_header, universal, Header, Length, TagClass};
pub use schema::{DecodeFn, FieldFlags, FieldSpec};
pub use structure::{
    decode_field, dissect_choice, dissect_encapsulated, dissect_oid_dependent, dissect_pdu,
    dissect_sequence, dissect_sequence_of, dissect_set, dissect_set_of, dissect_tagged,
    dissect_unknown, skip_element,
};

use crate::config::BerOptions;
use crate::cursor::ByteCursor;
use crate::registry::{OidHandler, OidRegistry, TypeHandler};
use crate::tree::Dissection;
use tracing::instrument;

/// Decode a complete BER message into a [`Dissection`]
#[instrument(level = "debug", skip_all, fields(protocol = protocol, pdu = name, len = tvb.len()))]
pub fn dissect_message(
    protocol: &'static str,
    registry: &OidRegistry,
    options: BerOptions,
    tvb: &ByteCursor,
    name: &'static str,
    decoder: DecodeFn,
) -> Dissection {
    dissect_message_with(protocol, registry, options, tvb, name, &TypeHandler::new(name, decoder))
}

/// Decode a complete BER message with a registered handler
pub fn dissect_message_with(
    protocol: &'static str,
    registry: &OidRegistry,
    options: BerOptions,
    tvb: &ByteCursor,
    name: &'static str,
    handler: &dyn OidHandler,
) -> Dissection {
    let mut ctx = DecodeContext::new(registry, options);
    let (root, malformed) = dissect_pdu(&mut ctx, tvb, name, handler);
    let info = if malformed {
        format!("{} [Malformed Packet]", name)
    } else {
        name.to_string()
    };
    Dissection {
        protocol,
        info,
        source: None,
        destination: None,
        malformed,
        root,
    }
}
