//! PKCS #10 certification request (RFC 2986)

use super::common::{
    dissect_algorithm_identifier, dissect_attribute, dissect_directory_string, dissect_extensions, dissect_name,
    dissect_subject_public_key_info,
};
use crate::ber::primitive::{dissect_bit_string, dissect_ia5_string, dissect_integer_named, ValueNames};
use crate::ber::structure::{dissect_choice, dissect_sequence, dissect_set_of};
use crate::ber::{universal as u, DecodeContext, DecodeFn, FieldFlags as F, FieldSpec};
use crate::cursor::ByteCursor;
use crate::errors::Result;
use crate::registry::OidRegistry;
use crate::tree::FieldNode;

type Decoded = Result<(usize, FieldNode)>;

const VERSION: ValueNames = &[(0, "v1")];

fn dissect_version(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_integer_named(implicit, ctx, tvb, offset, name, VERSION)
}

static ATTRIBUTE: FieldSpec = FieldSpec::universal("Attribute", u::SEQUENCE, F::NONE, dissect_attribute);

fn dissect_attributes(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_set_of(implicit, ctx, tvb, offset, name, &ATTRIBUTE, 0)
}

static CERTIFICATION_REQUEST_INFO: &[FieldSpec] = &[
    FieldSpec::universal("version", u::INTEGER, F::NONE, dissect_version),
    FieldSpec::untagged("subject", F::NONE, dissect_name),
    FieldSpec::universal("subjectPKInfo", u::SEQUENCE, F::NONE, dissect_subject_public_key_info),
    FieldSpec::context("attributes", 0, F::IMPLICIT, dissect_attributes),
];

fn dissect_certification_request_info(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, CERTIFICATION_REQUEST_INFO)
}

static CERTIFICATION_REQUEST: &[FieldSpec] = &[
    FieldSpec::universal(
        "certificationRequestInfo",
        u::SEQUENCE,
        F::NONE,
        dissect_certification_request_info,
    ),
    FieldSpec::universal("signatureAlgorithm", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::universal("signature", u::BIT_STRING, F::NONE, dissect_bit_string),
];

pub fn dissect_certification_request(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, CERTIFICATION_REQUEST)
}

// PKCS #9 strings may also be IA5String
static PKCS9_STRING: &[FieldSpec] = &[
    FieldSpec::universal("ia5String", u::IA5_STRING, F::NONE, dissect_ia5_string),
    FieldSpec::untagged("directoryString", F::NONE, dissect_directory_string),
];

fn dissect_pkcs9_string(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_choice(implicit, ctx, tvb, offset, name, PKCS9_STRING)
}

static TYPES: &[(&str, &str, DecodeFn)] = &[
    ("1.2.840.113549.1.9.2", "pkcs-9-at-unstructuredName", dissect_pkcs9_string),
    ("1.2.840.113549.1.9.7", "pkcs-9-at-challengePassword", dissect_directory_string),
    ("1.2.840.113549.1.9.8", "pkcs-9-at-unstructuredAddress", dissect_directory_string),
    ("1.2.840.113549.1.9.14", "pkcs-9-at-extensionRequest", dissect_extensions),
    ("1.3.6.1.4.1.311.13.2.3", "ms-os-version", dissect_ia5_string),
];

pub fn register(registry: &mut OidRegistry) -> Result<()> {
    for &(oid, name, decoder) in TYPES {
        registry.register_type(oid, name, decoder)?;
    }
    Ok(())
}
