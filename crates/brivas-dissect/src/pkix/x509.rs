//! X.509 certificate and the standard certificate extensions

use super::common::{
    dissect_algorithm_identifier, dissect_attribute, dissect_extensions, dissect_general_name,
    dissect_general_names, dissect_name, dissect_relative_distinguished_name, dissect_subject_public_key_info,
    dissect_validity,
};
use crate::ber::primitive::{
    dissect_big_integer, dissect_bit_string, dissect_bit_string_named, dissect_bmp_string, dissect_boolean,
    dissect_enumerated_named, dissect_generalized_time, dissect_ia5_string, dissect_integer, dissect_integer_named,
    dissect_object_identifier, dissect_object_identifier_str, dissect_octet_string, dissect_utf8_string,
    dissect_visible_string, BitNames, ValueNames,
};
use crate::ber::structure::{dissect_choice, dissect_oid_dependent, dissect_sequence, dissect_sequence_of};
use crate::ber::{universal as u, DecodeContext, DecodeFn, FieldFlags as F, FieldSpec};
use crate::cursor::ByteCursor;
use crate::errors::Result;
use crate::registry::OidRegistry;
use crate::tree::FieldNode;

type Decoded = Result<(usize, FieldNode)>;

pub const VERSION_NAMES: ValueNames = &[(0, "v1"), (1, "v2"), (2, "v3")];

pub const KEY_USAGE_BITS: BitNames = &[
    "digitalSignature",
    "contentCommitment",
    "keyEncipherment",
    "dataEncipherment",
    "keyAgreement",
    "keyCertSign",
    "cRLSign",
    "encipherOnly",
    "decipherOnly",
];

pub const REASON_FLAG_BITS: BitNames = &[
    "unused",
    "keyCompromise",
    "cACompromise",
    "affiliationChanged",
    "superseded",
    "cessationOfOperation",
    "certificateHold",
    "privilegeWithdrawn",
    "aACompromise",
];

pub const CRL_REASONS: ValueNames = &[
    (0, "unspecified"),
    (1, "keyCompromise"),
    (2, "cACompromise"),
    (3, "affiliationChanged"),
    (4, "superseded"),
    (5, "cessationOfOperation"),
    (6, "certificateHold"),
    (8, "removeFromCRL"),
    (9, "privilegeWithdrawn"),
    (10, "aACompromise"),
];

pub const NETSCAPE_CERT_TYPE_BITS: BitNames = &[
    "sslClient",
    "sslServer",
    "smime",
    "objectSigning",
    "reserved",
    "sslCA",
    "smimeCA",
    "objectSigningCA",
];

fn dissect_version(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_integer_named(implicit, ctx, tvb, offset, name, VERSION_NAMES)
}

fn dissect_key_usage(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_bit_string_named(implicit, ctx, tvb, offset, name, KEY_USAGE_BITS)
}

fn dissect_reason_flags(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_bit_string_named(implicit, ctx, tvb, offset, name, REASON_FLAG_BITS)
}

pub fn dissect_crl_reason(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_enumerated_named(implicit, ctx, tvb, offset, name, CRL_REASONS)
}

fn dissect_netscape_cert_type(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_bit_string_named(implicit, ctx, tvb, offset, name, NETSCAPE_CERT_TYPE_BITS)
}

static TBS_CERTIFICATE: &[FieldSpec] = &[
    FieldSpec::context("version", 0, F::OPTIONAL, dissect_version),
    FieldSpec::universal("serialNumber", u::INTEGER, F::NONE, dissect_big_integer),
    FieldSpec::universal("signature", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::untagged("issuer", F::NONE, dissect_name),
    FieldSpec::universal("validity", u::SEQUENCE, F::NONE, dissect_validity),
    FieldSpec::untagged("subject", F::NONE, dissect_name),
    FieldSpec::universal("subjectPublicKeyInfo", u::SEQUENCE, F::NONE, dissect_subject_public_key_info),
    FieldSpec::context("issuerUniqueID", 1, F::OPTIONAL_IMPLICIT, dissect_bit_string),
    FieldSpec::context("subjectUniqueID", 2, F::OPTIONAL_IMPLICIT, dissect_bit_string),
    FieldSpec::context("extensions", 3, F::OPTIONAL, dissect_extensions),
];

pub fn dissect_tbs_certificate(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, TBS_CERTIFICATE)
}

static CERTIFICATE: &[FieldSpec] = &[
    FieldSpec::universal("tbsCertificate", u::SEQUENCE, F::NONE, dissect_tbs_certificate),
    FieldSpec::universal("signatureAlgorithm", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::universal("signatureValue", u::BIT_STRING, F::NONE, dissect_bit_string),
];

/// `Certificate ::= SEQUENCE { tbsCertificate, signatureAlgorithm, signatureValue }`
pub fn dissect_certificate(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, CERTIFICATE)
}

static BASIC_CONSTRAINTS: &[FieldSpec] = &[
    FieldSpec::universal("cA", u::BOOLEAN, F::OPTIONAL, dissect_boolean),
    FieldSpec::universal("pathLenConstraint", u::INTEGER, F::OPTIONAL, dissect_integer),
];

fn dissect_basic_constraints(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, BASIC_CONSTRAINTS)
}

static AUTHORITY_KEY_IDENTIFIER: &[FieldSpec] = &[
    FieldSpec::context("keyIdentifier", 0, F::OPTIONAL_IMPLICIT, dissect_octet_string),
    FieldSpec::context("authorityCertIssuer", 1, F::OPTIONAL_IMPLICIT, dissect_general_names),
    FieldSpec::context("authorityCertSerialNumber", 2, F::OPTIONAL_IMPLICIT, dissect_big_integer),
];

fn dissect_authority_key_identifier(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, AUTHORITY_KEY_IDENTIFIER)
}

static KEY_PURPOSE: FieldSpec =
    FieldSpec::universal("KeyPurposeId", u::OBJECT_IDENTIFIER, F::NONE, dissect_object_identifier);

fn dissect_ext_key_usage(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &KEY_PURPOSE, 1)
}

static DISTRIBUTION_POINT_NAME: &[FieldSpec] = &[
    FieldSpec::context("fullName", 0, F::IMPLICIT, dissect_general_names),
    FieldSpec::context("nameRelativeToCRLIssuer", 1, F::IMPLICIT, dissect_relative_distinguished_name),
];

pub fn dissect_distribution_point_name(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_choice(implicit, ctx, tvb, offset, name, DISTRIBUTION_POINT_NAME)
}

static DISTRIBUTION_POINT: &[FieldSpec] = &[
    FieldSpec::context("distributionPoint", 0, F::OPTIONAL, dissect_distribution_point_name),
    FieldSpec::context("reasons", 1, F::OPTIONAL_IMPLICIT, dissect_reason_flags),
    FieldSpec::context("cRLIssuer", 2, F::OPTIONAL_IMPLICIT, dissect_general_names),
];

fn dissect_distribution_point(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, DISTRIBUTION_POINT)
}

static CRL_DISTRIBUTION_POINTS_ITEM: FieldSpec =
    FieldSpec::universal("DistributionPoint", u::SEQUENCE, F::NONE, dissect_distribution_point);

fn dissect_crl_distribution_points(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &CRL_DISTRIBUTION_POINTS_ITEM, 1)
}

static DISPLAY_TEXT: &[FieldSpec] = &[
    FieldSpec::universal("ia5String", u::IA5_STRING, F::NONE, dissect_ia5_string),
    FieldSpec::universal("visibleString", u::VISIBLE_STRING, F::NONE, dissect_visible_string),
    FieldSpec::universal("bmpString", u::BMP_STRING, F::NONE, dissect_bmp_string),
    FieldSpec::universal("utf8String", u::UTF8_STRING, F::NONE, dissect_utf8_string),
];

fn dissect_display_text(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_choice(implicit, ctx, tvb, offset, name, DISPLAY_TEXT)
}

static NOTICE_NUMBER: FieldSpec = FieldSpec::universal("noticeNumber", u::INTEGER, F::NONE, dissect_big_integer);

fn dissect_notice_numbers(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &NOTICE_NUMBER, 0)
}

static NOTICE_REFERENCE: &[FieldSpec] = &[
    FieldSpec::untagged("organization", F::NONE, dissect_display_text),
    FieldSpec::universal("noticeNumbers", u::SEQUENCE, F::NONE, dissect_notice_numbers),
];

fn dissect_notice_reference(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, NOTICE_REFERENCE)
}

static USER_NOTICE: &[FieldSpec] = &[
    FieldSpec::universal("noticeRef", u::SEQUENCE, F::OPTIONAL, dissect_notice_reference),
    FieldSpec::untagged("explicitText", F::OPTIONAL, dissect_display_text),
];

fn dissect_user_notice(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, USER_NOTICE)
}

static POLICY_QUALIFIER_INFO: &[FieldSpec] = &[
    FieldSpec::universal("policyQualifierId", u::OBJECT_IDENTIFIER, F::NONE, dissect_object_identifier_str),
    FieldSpec::untagged("qualifier", F::NOT_CHECK_TAG, dissect_oid_dependent),
];

fn dissect_policy_qualifier_info(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, POLICY_QUALIFIER_INFO)
}

static POLICY_QUALIFIERS_ITEM: FieldSpec =
    FieldSpec::universal("PolicyQualifierInfo", u::SEQUENCE, F::NONE, dissect_policy_qualifier_info);

fn dissect_policy_qualifiers(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &POLICY_QUALIFIERS_ITEM, 1)
}

static POLICY_INFORMATION: &[FieldSpec] = &[
    FieldSpec::universal("policyIdentifier", u::OBJECT_IDENTIFIER, F::NONE, dissect_object_identifier_str),
    FieldSpec::universal("policyQualifiers", u::SEQUENCE, F::OPTIONAL, dissect_policy_qualifiers),
];

fn dissect_policy_information(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, POLICY_INFORMATION)
}

static CERTIFICATE_POLICIES_ITEM: FieldSpec =
    FieldSpec::universal("PolicyInformation", u::SEQUENCE, F::NONE, dissect_policy_information);

fn dissect_certificate_policies(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &CERTIFICATE_POLICIES_ITEM, 1)
}

static ACCESS_DESCRIPTION: &[FieldSpec] = &[
    FieldSpec::universal("accessMethod", u::OBJECT_IDENTIFIER, F::NONE, dissect_object_identifier_str),
    FieldSpec::untagged("accessLocation", F::NONE, dissect_general_name),
];

fn dissect_access_description(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, ACCESS_DESCRIPTION)
}

static AUTHORITY_INFO_ACCESS_ITEM: FieldSpec =
    FieldSpec::universal("AccessDescription", u::SEQUENCE, F::NONE, dissect_access_description);

pub fn dissect_authority_info_access(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &AUTHORITY_INFO_ACCESS_ITEM, 1)
}

static SUBJECT_DIRECTORY_ATTRIBUTES_ITEM: FieldSpec =
    FieldSpec::universal("Attribute", u::SEQUENCE, F::NONE, dissect_attribute);

fn dissect_subject_directory_attributes(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &SUBJECT_DIRECTORY_ATTRIBUTES_ITEM, 1)
}

static EXTENSIONS: &[(&str, &str, DecodeFn)] = &[
    ("2.5.29.9", "id-ce-subjectDirectoryAttributes", dissect_subject_directory_attributes),
    ("2.5.29.14", "id-ce-subjectKeyIdentifier", dissect_octet_string),
    ("2.5.29.15", "id-ce-keyUsage", dissect_key_usage),
    ("2.5.29.17", "id-ce-subjectAltName", dissect_general_names),
    ("2.5.29.18", "id-ce-issuerAltName", dissect_general_names),
    ("2.5.29.19", "id-ce-basicConstraints", dissect_basic_constraints),
    ("2.5.29.20", "id-ce-cRLNumber", dissect_big_integer),
    ("2.5.29.21", "id-ce-cRLReasons", dissect_crl_reason),
    ("2.5.29.24", "id-ce-invalidityDate", dissect_generalized_time),
    ("2.5.29.29", "id-ce-certificateIssuer", dissect_general_names),
    ("2.5.29.31", "id-ce-cRLDistributionPoints", dissect_crl_distribution_points),
    ("2.5.29.32", "id-ce-certificatePolicies", dissect_certificate_policies),
    ("2.5.29.35", "id-ce-authorityKeyIdentifier", dissect_authority_key_identifier),
    ("2.5.29.37", "id-ce-extKeyUsage", dissect_ext_key_usage),
    ("1.3.6.1.5.5.7.1.1", "id-pe-authorityInfoAccess", dissect_authority_info_access),
    ("1.3.6.1.5.5.7.1.11", "id-pe-subjectInfoAccess", dissect_authority_info_access),
    ("1.3.6.1.5.5.7.2.1", "id-qt-cps", dissect_ia5_string),
    ("1.3.6.1.5.5.7.2.2", "id-qt-unotice", dissect_user_notice),
    ("2.16.840.1.113730.1.1", "netscape-cert-type", dissect_netscape_cert_type),
    ("2.16.840.1.113730.1.13", "netscape-comment", dissect_ia5_string),
];

static NAMES: &[(&str, &str)] = &[
    ("2.5.29.32.0", "anyPolicy"),
    ("2.5.29.37.0", "anyExtendedKeyUsage"),
    ("1.3.6.1.5.5.7.3.1", "id-kp-serverAuth"),
    ("1.3.6.1.5.5.7.3.2", "id-kp-clientAuth"),
    ("1.3.6.1.5.5.7.3.3", "id-kp-codeSigning"),
    ("1.3.6.1.5.5.7.3.4", "id-kp-emailProtection"),
    ("1.3.6.1.5.5.7.3.8", "id-kp-timeStamping"),
    ("1.3.6.1.5.5.7.3.9", "id-kp-OCSPSigning"),
    ("1.3.6.1.5.5.7.48.1", "id-ad-ocsp"),
    ("1.3.6.1.5.5.7.48.2", "id-ad-caIssuers"),
    ("1.3.6.1.5.5.7.48.3", "id-ad-timeStamping"),
    ("1.3.6.1.5.5.7.48.5", "id-ad-caRepository"),
];

pub fn register(registry: &mut OidRegistry) -> Result<()> {
    for &(oid, name, decoder) in EXTENSIONS {
        registry.register_type(oid, name, decoder)?;
    }
    for &(oid, name) in NAMES {
        registry.register_name(oid, name)?;
    }
    Ok(())
}
