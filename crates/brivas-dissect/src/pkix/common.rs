//! Types shared by the PKI schemas (RFC 5280 explicit/implicit modules)

use crate::ber::primitive::{
    dissect_bit_string, dissect_boolean, dissect_bmp_string, dissect_generalized_time, dissect_ia5_string,
    dissect_object_identifier, dissect_object_identifier_str, dissect_octet_string, dissect_printable_string,
    dissect_teletex_string, dissect_universal_string, dissect_utc_time, dissect_utf8_string,
};
use crate::ber::structure::{
    dissect_choice, dissect_encapsulated, dissect_oid_dependent, dissect_sequence, dissect_sequence_of,
    dissect_set_of, dissect_unknown,
};
use crate::ber::{universal as u, DecodeContext, DecodeFn, FieldFlags as F, FieldSpec};
use crate::cursor::ByteCursor;
use crate::errors::Result;
use crate::registry::OidRegistry;
use crate::tree::FieldNode;

type Decoded = Result<(usize, FieldNode)>;

static ALGORITHM_IDENTIFIER: &[FieldSpec] = &[
    FieldSpec::universal("algorithm", u::OBJECT_IDENTIFIER, F::NONE, dissect_object_identifier_str),
    FieldSpec::untagged("parameters", F::OPTIONAL.union(F::NOT_CHECK_TAG), dissect_algorithm_parameters),
];

pub fn dissect_algorithm_identifier(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, ALGORITHM_IDENTIFIER)
}

/// Algorithm parameters: typed when the algorithm OID has a handler,
/// otherwise decoded without a schema (NULL, curve OIDs, PSS params)
fn dissect_algorithm_parameters(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    let resolved = ctx
        .type_oid()
        .is_some_and(|oid| ctx.registry().resolve(oid).is_some());
    if resolved {
        dissect_oid_dependent(implicit, ctx, tvb, offset, name)
    } else {
        dissect_unknown(implicit, ctx, tvb, offset, name)
    }
}

static DIRECTORY_STRING: &[FieldSpec] = &[
    FieldSpec::universal("teletexString", u::TELETEX_STRING, F::NONE, dissect_teletex_string),
    FieldSpec::universal("printableString", u::PRINTABLE_STRING, F::NONE, dissect_printable_string),
    FieldSpec::universal("universalString", u::UNIVERSAL_STRING, F::NONE, dissect_universal_string),
    FieldSpec::universal("uTF8String", u::UTF8_STRING, F::NONE, dissect_utf8_string),
    FieldSpec::universal("bmpString", u::BMP_STRING, F::NONE, dissect_bmp_string),
];

pub fn dissect_directory_string(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_choice(implicit, ctx, tvb, offset, name, DIRECTORY_STRING)
}

static ATTRIBUTE_TYPE_AND_VALUE: &[FieldSpec] = &[
    FieldSpec::universal("type", u::OBJECT_IDENTIFIER, F::NONE, dissect_object_identifier_str),
    FieldSpec::untagged("value", F::NOT_CHECK_TAG, dissect_oid_dependent),
];

pub fn dissect_attribute_type_and_value(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, ATTRIBUTE_TYPE_AND_VALUE)
}

static RDN_MEMBER: FieldSpec = FieldSpec::universal(
    "AttributeTypeAndValue",
    u::SEQUENCE,
    F::NONE,
    dissect_attribute_type_and_value,
);

pub fn dissect_relative_distinguished_name(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_set_of(implicit, ctx, tvb, offset, name, &RDN_MEMBER, 1)
}

static RDN_SEQUENCE_ITEM: FieldSpec = FieldSpec::universal(
    "RelativeDistinguishedName",
    u::SET,
    F::NONE,
    dissect_relative_distinguished_name,
);

fn dissect_rdn_sequence(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &RDN_SEQUENCE_ITEM, 0)
}

static NAME: &[FieldSpec] = &[FieldSpec::universal("rdnSequence", u::SEQUENCE, F::NONE, dissect_rdn_sequence)];

pub fn dissect_name(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_choice(implicit, ctx, tvb, offset, name, NAME)
}

static TIME: &[FieldSpec] = &[
    FieldSpec::universal("utcTime", u::UTC_TIME, F::NONE, dissect_utc_time),
    FieldSpec::universal("generalTime", u::GENERALIZED_TIME, F::NONE, dissect_generalized_time),
];

pub fn dissect_time(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_choice(implicit, ctx, tvb, offset, name, TIME)
}

static VALIDITY: &[FieldSpec] = &[
    FieldSpec::untagged("notBefore", F::NONE, dissect_time),
    FieldSpec::untagged("notAfter", F::NONE, dissect_time),
];

pub fn dissect_validity(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, VALIDITY)
}

static SUBJECT_PUBLIC_KEY_INFO: &[FieldSpec] = &[
    FieldSpec::universal("algorithm", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::universal("subjectPublicKey", u::BIT_STRING, F::NONE, dissect_bit_string),
];

pub fn dissect_subject_public_key_info(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, SUBJECT_PUBLIC_KEY_INFO)
}

static EXTENSION: &[FieldSpec] = &[
    FieldSpec::universal("extnID", u::OBJECT_IDENTIFIER, F::NONE, dissect_object_identifier_str),
    FieldSpec::universal("critical", u::BOOLEAN, F::OPTIONAL, dissect_boolean),
    FieldSpec::universal("extnValue", u::OCTET_STRING, F::NONE, dissect_encapsulated),
];

pub fn dissect_extension(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, EXTENSION)
}

static EXTENSIONS_ITEM: FieldSpec = FieldSpec::universal("Extension", u::SEQUENCE, F::NONE, dissect_extension);

pub fn dissect_extensions(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &EXTENSIONS_ITEM, 1)
}

static OTHER_NAME: &[FieldSpec] = &[
    FieldSpec::universal("type-id", u::OBJECT_IDENTIFIER, F::NONE, dissect_object_identifier_str),
    FieldSpec::context("value", 0, F::NONE, dissect_oid_dependent),
];

fn dissect_other_name(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, OTHER_NAME)
}

static EDI_PARTY_NAME: &[FieldSpec] = &[
    FieldSpec::context("nameAssigner", 0, F::OPTIONAL, dissect_directory_string),
    FieldSpec::context("partyName", 1, F::NONE, dissect_directory_string),
];

fn dissect_edi_party_name(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, EDI_PARTY_NAME)
}

static GENERAL_NAME: &[FieldSpec] = &[
    FieldSpec::context("otherName", 0, F::IMPLICIT, dissect_other_name),
    FieldSpec::context("rfc822Name", 1, F::IMPLICIT, dissect_ia5_string),
    FieldSpec::context("dNSName", 2, F::IMPLICIT, dissect_ia5_string),
    FieldSpec::context("x400Address", 3, F::IMPLICIT, dissect_unknown),
    FieldSpec::context("directoryName", 4, F::NONE, dissect_name),
    FieldSpec::context("ediPartyName", 5, F::IMPLICIT, dissect_edi_party_name),
    FieldSpec::context("uniformResourceIdentifier", 6, F::IMPLICIT, dissect_ia5_string),
    FieldSpec::context("iPAddress", 7, F::IMPLICIT, dissect_octet_string),
    FieldSpec::context("registeredID", 8, F::IMPLICIT, dissect_object_identifier),
];

pub fn dissect_general_name(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_choice(implicit, ctx, tvb, offset, name, GENERAL_NAME)
}

static GENERAL_NAMES_ITEM: FieldSpec = FieldSpec::untagged("GeneralName", F::NONE, dissect_general_name);

pub fn dissect_general_names(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &GENERAL_NAMES_ITEM, 1)
}

static ATTRIBUTE_VALUE: FieldSpec = FieldSpec::untagged("value", F::NOT_CHECK_TAG, dissect_oid_dependent);

fn dissect_attribute_values(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_set_of(implicit, ctx, tvb, offset, name, &ATTRIBUTE_VALUE, 1)
}

static ATTRIBUTE: &[FieldSpec] = &[
    FieldSpec::universal("type", u::OBJECT_IDENTIFIER, F::NONE, dissect_object_identifier_str),
    FieldSpec::universal("values", u::SET, F::NONE, dissect_attribute_values),
];

/// `Attribute ::= SEQUENCE { type, values SET OF ANY DEFINED BY type }`
pub fn dissect_attribute(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, ATTRIBUTE)
}

static NAMING_ATTRIBUTES: &[(&str, &str, DecodeFn)] = &[
    ("2.5.4.3", "id-at-commonName", dissect_directory_string),
    ("2.5.4.4", "id-at-surname", dissect_directory_string),
    ("2.5.4.5", "id-at-serialNumber", dissect_printable_string),
    ("2.5.4.6", "id-at-countryName", dissect_printable_string),
    ("2.5.4.7", "id-at-localityName", dissect_directory_string),
    ("2.5.4.8", "id-at-stateOrProvinceName", dissect_directory_string),
    ("2.5.4.9", "id-at-streetAddress", dissect_directory_string),
    ("2.5.4.10", "id-at-organizationName", dissect_directory_string),
    ("2.5.4.11", "id-at-organizationalUnitName", dissect_directory_string),
    ("2.5.4.12", "id-at-title", dissect_directory_string),
    ("2.5.4.42", "id-at-givenName", dissect_directory_string),
    ("2.5.4.43", "id-at-initials", dissect_directory_string),
    ("2.5.4.46", "id-at-dnQualifier", dissect_printable_string),
    ("2.5.4.65", "id-at-pseudonym", dissect_directory_string),
    ("1.2.840.113549.1.9.1", "id-emailAddress", dissect_ia5_string),
    ("0.9.2342.19200300.100.1.1", "id-userid", dissect_directory_string),
    ("0.9.2342.19200300.100.1.25", "id-domainComponent", dissect_ia5_string),
];

static ALGORITHMS: &[(&str, &str)] = &[
    ("1.2.840.113549.1.1.1", "rsaEncryption"),
    ("1.2.840.113549.1.1.5", "sha1WithRSAEncryption"),
    ("1.2.840.113549.1.1.10", "id-RSASSA-PSS"),
    ("1.2.840.113549.1.1.11", "sha256WithRSAEncryption"),
    ("1.2.840.113549.1.1.12", "sha384WithRSAEncryption"),
    ("1.2.840.113549.1.1.13", "sha512WithRSAEncryption"),
    ("1.2.840.113549.2.7", "hmacWithSHA1"),
    ("1.2.840.113549.2.9", "hmacWithSHA256"),
    ("1.2.840.10045.2.1", "id-ecPublicKey"),
    ("1.2.840.10045.3.1.7", "prime256v1"),
    ("1.3.132.0.34", "secp384r1"),
    ("1.2.840.10045.4.3.2", "ecdsa-with-SHA256"),
    ("1.2.840.10045.4.3.3", "ecdsa-with-SHA384"),
    ("1.3.14.3.2.26", "id-sha1"),
    ("2.16.840.1.101.3.4.2.1", "id-sha256"),
    ("2.16.840.1.101.3.4.2.2", "id-sha384"),
    ("2.16.840.1.101.3.4.2.3", "id-sha512"),
    ("1.3.101.112", "id-Ed25519"),
];

pub fn register(registry: &mut OidRegistry) -> Result<()> {
    for &(oid, name, decoder) in NAMING_ATTRIBUTES {
        registry.register_type(oid, name, decoder)?;
    }
    for &(oid, name) in ALGORITHMS {
        registry.register_name(oid, name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::encode;
    use crate::config::BerOptions;
    use crate::tree::{ExpertKind, Value};

    fn registry() -> OidRegistry {
        let mut registry = OidRegistry::new();
        register(&mut registry).unwrap();
        registry
    }

    fn atv(oid: &str, value: Vec<u8>) -> Vec<u8> {
        encode::sequence(&[encode::oid(oid).unwrap(), value])
    }

    #[test]
    fn test_name_resolves_attribute_values() {
        let name = encode::sequence(&[
            encode::set(&[atv("2.5.4.6", encode::printable_string("DE"))]),
            encode::set(&[atv("2.5.4.3", encode::utf8_string("Alice"))]),
        ]);
        let registry = registry();
        let mut ctx = DecodeContext::new(&registry, BerOptions::default());
        let (end, node) = dissect_name(false, &mut ctx, &ByteCursor::from(name.clone()), 0, "subject").unwrap();
        assert_eq!(end, name.len());

        let rdns = &node.children[0];
        assert_eq!(rdns.suffix.as_deref(), Some("(2 items)"));
        let cn = rdns.children[1].find(&["AttributeTypeAndValue", "value"]).unwrap();
        assert_eq!(cn.suffix.as_deref(), Some("(id-at-commonName)"));
        assert_eq!(cn.children[0].value, Value::Str("Alice".into()));
        let country = rdns.children[0].find(&["AttributeTypeAndValue", "value"]).unwrap();
        assert_eq!(country.value, Value::Str("DE".into()));
        assert!(!node.has_errors());
    }

    #[test]
    fn test_unknown_attribute_is_opaque() {
        let name = encode::sequence(&[encode::set(&[atv("1.2.3.4.5", encode::utf8_string("x"))])]);
        let registry = registry();
        let mut ctx = DecodeContext::new(&registry, BerOptions::default());
        let (_, node) = dissect_name(false, &mut ctx, &ByteCursor::from(name), 0, "subject").unwrap();
        let value = node.find_any("value").unwrap();
        assert!(matches!(value.value, Value::Opaque(_)));
        assert!(value.has_expert(ExpertKind::UnresolvedOid));
        assert!(!node.has_errors());
    }

    #[test]
    fn test_algorithm_identifier_parameters() {
        let alg = encode::sequence(&[encode::oid("1.2.840.113549.1.1.11").unwrap(), encode::null()]);
        let registry = registry();
        let mut ctx = DecodeContext::new(&registry, BerOptions::default());
        let (_, node) =
            dissect_algorithm_identifier(false, &mut ctx, &ByteCursor::from(alg), 0, "signature").unwrap();
        assert_eq!(
            node.child("algorithm").and_then(|n| n.suffix.as_deref()),
            Some("(sha256WithRSAEncryption)")
        );
        assert_eq!(node.child("parameters").map(|n| &n.value), Some(&Value::Null));
    }

    #[test]
    fn test_general_name_alternatives() {
        let registry = registry();
        let mut ctx = DecodeContext::new(&registry, BerOptions::default());
        let dns = encode::implicit(2, &encode::ia5_string("example.com"));
        let (_, node) = dissect_general_name(false, &mut ctx, &ByteCursor::from(dns), 0, "GeneralName").unwrap();
        assert_eq!(node.value, Value::Choice("dNSName"));
        assert_eq!(node.children[0].value, Value::Str("example.com".into()));

        let dir = encode::explicit(4, &encode::sequence(&[]));
        let (_, node) = dissect_general_name(false, &mut ctx, &ByteCursor::from(dir), 0, "GeneralName").unwrap();
        assert_eq!(node.value, Value::Choice("directoryName"));
    }
}
