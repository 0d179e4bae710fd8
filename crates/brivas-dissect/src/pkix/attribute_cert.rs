//! Attribute certificates (RFC 5755) and the TCG attestation attributes
//! carried by platform and endorsement-key certificates

use super::common::{
    dissect_algorithm_identifier, dissect_attribute, dissect_extensions, dissect_general_name,
    dissect_general_names,
};
use crate::ber::primitive::{
    dissect_big_integer, dissect_bit_string, dissect_enumerated_named, dissect_generalized_time, dissect_integer,
    dissect_integer_named, dissect_object_identifier, dissect_octet_string, dissect_utf8_string, ValueNames,
};
use crate::ber::structure::{dissect_choice, dissect_sequence, dissect_sequence_of, dissect_unknown};
use crate::ber::{universal as u, DecodeContext, DecodeFn, FieldFlags as F, FieldSpec};
use crate::cursor::ByteCursor;
use crate::errors::Result;
use crate::registry::OidRegistry;
use crate::tree::FieldNode;

type Decoded = Result<(usize, FieldNode)>;

const ATT_CERT_VERSION: ValueNames = &[(1, "v2")];
const DIGESTED_OBJECT_TYPE: ValueNames = &[(0, "publicKey"), (1, "publicKeyCert"), (2, "otherObjectTypes")];

fn dissect_version(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_integer_named(implicit, ctx, tvb, offset, name, ATT_CERT_VERSION)
}

fn dissect_digested_object_type(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_enumerated_named(implicit, ctx, tvb, offset, name, DIGESTED_OBJECT_TYPE)
}

static ISSUER_SERIAL: &[FieldSpec] = &[
    FieldSpec::universal("issuer", u::SEQUENCE, F::NONE, dissect_general_names),
    FieldSpec::universal("serial", u::INTEGER, F::NONE, dissect_big_integer),
    FieldSpec::universal("issuerUID", u::BIT_STRING, F::OPTIONAL, dissect_bit_string),
];

fn dissect_issuer_serial(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, ISSUER_SERIAL)
}

static OBJECT_DIGEST_INFO: &[FieldSpec] = &[
    FieldSpec::universal("digestedObjectType", u::ENUMERATED, F::NONE, dissect_digested_object_type),
    FieldSpec::universal("otherObjectTypeID", u::OBJECT_IDENTIFIER, F::OPTIONAL, dissect_object_identifier),
    FieldSpec::universal("digestAlgorithm", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::universal("objectDigest", u::BIT_STRING, F::NONE, dissect_bit_string),
];

fn dissect_object_digest_info(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, OBJECT_DIGEST_INFO)
}

static HOLDER: &[FieldSpec] = &[
    FieldSpec::context("baseCertificateID", 0, F::OPTIONAL_IMPLICIT, dissect_issuer_serial),
    FieldSpec::context("entityName", 1, F::OPTIONAL_IMPLICIT, dissect_general_names),
    FieldSpec::context("objectDigestInfo", 2, F::OPTIONAL_IMPLICIT, dissect_object_digest_info),
];

fn dissect_holder(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, HOLDER)
}

static V2_FORM: &[FieldSpec] = &[
    FieldSpec::universal("issuerName", u::SEQUENCE, F::OPTIONAL, dissect_general_names),
    FieldSpec::context("baseCertificateID", 0, F::OPTIONAL_IMPLICIT, dissect_issuer_serial),
    FieldSpec::context("objectDigestInfo", 1, F::OPTIONAL_IMPLICIT, dissect_object_digest_info),
];

fn dissect_v2_form(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, V2_FORM)
}

static ATT_CERT_ISSUER: &[FieldSpec] = &[
    FieldSpec::universal("v1Form", u::SEQUENCE, F::NONE, dissect_general_names),
    FieldSpec::context("v2Form", 0, F::IMPLICIT, dissect_v2_form),
];

fn dissect_att_cert_issuer(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_choice(implicit, ctx, tvb, offset, name, ATT_CERT_ISSUER)
}

static VALIDITY_PERIOD: &[FieldSpec] = &[
    FieldSpec::universal("notBeforeTime", u::GENERALIZED_TIME, F::NONE, dissect_generalized_time),
    FieldSpec::universal("notAfterTime", u::GENERALIZED_TIME, F::NONE, dissect_generalized_time),
];

fn dissect_validity_period(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, VALIDITY_PERIOD)
}

static ATTRIBUTE: FieldSpec = FieldSpec::universal("Attribute", u::SEQUENCE, F::NONE, dissect_attribute);

fn dissect_attributes(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &ATTRIBUTE, 0)
}

static ATTRIBUTE_CERTIFICATE_INFO: &[FieldSpec] = &[
    FieldSpec::universal("version", u::INTEGER, F::NONE, dissect_version),
    FieldSpec::universal("holder", u::SEQUENCE, F::NONE, dissect_holder),
    FieldSpec::untagged("issuer", F::NONE, dissect_att_cert_issuer),
    FieldSpec::universal("signature", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::universal("serialNumber", u::INTEGER, F::NONE, dissect_big_integer),
    FieldSpec::universal("attrCertValidityPeriod", u::SEQUENCE, F::NONE, dissect_validity_period),
    FieldSpec::universal("attributes", u::SEQUENCE, F::NONE, dissect_attributes),
    FieldSpec::universal("issuerUniqueID", u::BIT_STRING, F::OPTIONAL, dissect_bit_string),
    FieldSpec::universal("extensions", u::SEQUENCE, F::OPTIONAL, dissect_extensions),
];

fn dissect_attribute_certificate_info(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, ATTRIBUTE_CERTIFICATE_INFO)
}

static ATTRIBUTE_CERTIFICATE: &[FieldSpec] = &[
    FieldSpec::universal("acinfo", u::SEQUENCE, F::NONE, dissect_attribute_certificate_info),
    FieldSpec::universal("signatureAlgorithm", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::universal("signatureValue", u::BIT_STRING, F::NONE, dissect_bit_string),
];

pub fn dissect_attribute_certificate(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, ATTRIBUTE_CERTIFICATE)
}

// RFC 5755 attribute syntaxes

static ROLE_SYNTAX: &[FieldSpec] = &[
    FieldSpec::context("roleAuthority", 0, F::OPTIONAL_IMPLICIT, dissect_general_names),
    FieldSpec::context("roleName", 1, F::NONE, dissect_general_name),
];

fn dissect_role_syntax(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, ROLE_SYNTAX)
}

// TCG attestation attributes

static TPM_SPECIFICATION: &[FieldSpec] = &[
    FieldSpec::universal("family", u::UTF8_STRING, F::NONE, dissect_utf8_string),
    FieldSpec::universal("level", u::INTEGER, F::NONE, dissect_integer),
    FieldSpec::universal("revision", u::INTEGER, F::NONE, dissect_integer),
];

fn dissect_tpm_specification(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, TPM_SPECIFICATION)
}

static TCG_SPECIFICATION_VERSION: &[FieldSpec] = &[
    FieldSpec::universal("majorVersion", u::INTEGER, F::NONE, dissect_integer),
    FieldSpec::universal("minorVersion", u::INTEGER, F::NONE, dissect_integer),
    FieldSpec::universal("revision", u::INTEGER, F::NONE, dissect_integer),
];

fn dissect_tcg_specification_version(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, TCG_SPECIFICATION_VERSION)
}

static TCG_PLATFORM_SPECIFICATION: &[FieldSpec] = &[
    FieldSpec::universal("version", u::SEQUENCE, F::NONE, dissect_tcg_specification_version),
    FieldSpec::universal("platformClass", u::OCTET_STRING, F::NONE, dissect_octet_string),
];

fn dissect_tcg_platform_specification(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, TCG_PLATFORM_SPECIFICATION)
}

static TYPES: &[(&str, &str, DecodeFn)] = &[
    ("2.5.4.72", "id-at-role", dissect_role_syntax),
    ("2.23.133.2.1", "tcg-at-tpmManufacturer", dissect_utf8_string),
    ("2.23.133.2.2", "tcg-at-tpmModel", dissect_utf8_string),
    ("2.23.133.2.3", "tcg-at-tpmVersion", dissect_utf8_string),
    ("2.23.133.2.4", "tcg-at-platformManufacturer", dissect_utf8_string),
    ("2.23.133.2.5", "tcg-at-platformModel", dissect_utf8_string),
    ("2.23.133.2.6", "tcg-at-platformVersion", dissect_utf8_string),
    ("2.23.133.2.10", "tcg-at-securityQualities", dissect_unknown),
    ("2.23.133.2.15", "tcg-at-tpmIdLabel", dissect_utf8_string),
    ("2.23.133.2.16", "tcg-at-tpmSpecification", dissect_tpm_specification),
    ("2.23.133.2.17", "tcg-at-tcgPlatformSpecification", dissect_tcg_platform_specification),
    ("2.23.133.2.18", "tcg-at-tpmSecurityAssertions", dissect_unknown),
    ("2.23.133.2.19", "tcg-at-tbbSecurityAssertions", dissect_unknown),
];

static NAMES: &[(&str, &str)] = &[
    ("2.23.133", "tcg"),
    ("2.23.133.8.1", "tcg-kp-EKCertificate"),
    ("2.23.133.8.2", "tcg-kp-PlatformAttributeCertificate"),
    ("2.23.133.8.3", "tcg-kp-AIKCertificate"),
    ("2.23.133.8.4", "tcg-kp-PlatformKeyCertificate"),
    ("2.23.133.5.1", "tcg-ce-relevantCredentials"),
    ("2.23.133.5.2", "tcg-ce-relevantManifests"),
    ("2.23.133.5.3", "tcg-ce-virtualPlatform"),
    ("2.23.133.5.4", "tcg-ce-multiTenant"),
    ("2.23.133.1.2", "tcg-common"),
];

pub fn register(registry: &mut OidRegistry) -> Result<()> {
    for &(oid, name, decoder) in TYPES {
        registry.register_type(oid, name, decoder)?;
    }
    for &(oid, name) in NAMES {
        registry.register_name(oid, name)?;
    }
    Ok(())
}
