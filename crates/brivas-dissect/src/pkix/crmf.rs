//! Certificate Request Message Format (RFC 4211)
//!
//! The module is defined with IMPLICIT TAGS, so every context tag below is
//! implicit except those wrapping a CHOICE (`Name`, `Time`, `GeneralName`,
//! `POPOPrivKey`), which are always explicit.

use super::common::{
    dissect_algorithm_identifier, dissect_attribute_type_and_value, dissect_extensions, dissect_general_name,
    dissect_name, dissect_subject_public_key_info, dissect_time,
};
use crate::ber::primitive::{
    dissect_big_integer, dissect_bit_string, dissect_integer, dissect_integer_named, dissect_null,
    dissect_octet_string, dissect_utf8_string, ValueNames,
};
use crate::ber::structure::{dissect_choice, dissect_sequence, dissect_sequence_of, dissect_unknown};
use crate::ber::{universal as u, DecodeContext, DecodeFn, FieldFlags as F, FieldSpec};
use crate::cursor::ByteCursor;
use crate::errors::Result;
use crate::registry::OidRegistry;
use crate::tree::FieldNode;

type Decoded = Result<(usize, FieldNode)>;

const SUBSEQUENT_MESSAGE: ValueNames = &[(0, "encrCert"), (1, "challengeResp")];
const PUBLICATION_ACTION: ValueNames = &[(0, "dontPublish"), (1, "pleasePublish")];
const PUBLICATION_METHOD: ValueNames = &[(0, "dontCare"), (1, "x500"), (2, "web"), (3, "ldap")];

static ATTRIBUTE_TYPE_AND_VALUE: FieldSpec =
    FieldSpec::universal("AttributeTypeAndValue", u::SEQUENCE, F::NONE, dissect_attribute_type_and_value);

static CERT_REQ_MESSAGES_ITEM: FieldSpec =
    FieldSpec::universal("CertReqMsg", u::SEQUENCE, F::NONE, dissect_cert_req_msg);

/// `CertReqMessages ::= SEQUENCE SIZE (1..MAX) OF CertReqMsg`
pub fn dissect_cert_req_messages(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &CERT_REQ_MESSAGES_ITEM, 1)
}

static CERT_REQ_MSG: &[FieldSpec] = &[
    FieldSpec::universal("certReq", u::SEQUENCE, F::NONE, dissect_cert_request),
    FieldSpec::untagged("popo", F::OPTIONAL, dissect_proof_of_possession),
    FieldSpec::universal("regInfo", u::SEQUENCE, F::OPTIONAL, dissect_reg_info),
];

pub fn dissect_cert_req_msg(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, CERT_REQ_MSG)
}

fn dissect_reg_info(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &ATTRIBUTE_TYPE_AND_VALUE, 1)
}

static CERT_REQUEST: &[FieldSpec] = &[
    FieldSpec::universal("certReqId", u::INTEGER, F::NONE, dissect_integer),
    FieldSpec::universal("certTemplate", u::SEQUENCE, F::NONE, dissect_cert_template),
    FieldSpec::universal("controls", u::SEQUENCE, F::OPTIONAL, dissect_controls),
];

pub fn dissect_cert_request(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, CERT_REQUEST)
}

static CERT_TEMPLATE: &[FieldSpec] = &[
    FieldSpec::context("version", 0, F::OPTIONAL_IMPLICIT, dissect_integer),
    FieldSpec::context("serialNumber", 1, F::OPTIONAL_IMPLICIT, dissect_big_integer),
    FieldSpec::context("signingAlg", 2, F::OPTIONAL_IMPLICIT, dissect_algorithm_identifier),
    FieldSpec::context("issuer", 3, F::OPTIONAL, dissect_name),
    FieldSpec::context("validity", 4, F::OPTIONAL_IMPLICIT, dissect_optional_validity),
    FieldSpec::context("subject", 5, F::OPTIONAL, dissect_name),
    FieldSpec::context("publicKey", 6, F::OPTIONAL_IMPLICIT, dissect_subject_public_key_info),
    FieldSpec::context("issuerUID", 7, F::OPTIONAL_IMPLICIT, dissect_bit_string),
    FieldSpec::context("subjectUID", 8, F::OPTIONAL_IMPLICIT, dissect_bit_string),
    FieldSpec::context("extensions", 9, F::OPTIONAL_IMPLICIT, dissect_extensions),
];

/// Every field of the template is optional; an empty SEQUENCE is valid
pub fn dissect_cert_template(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, CERT_TEMPLATE)
}

static OPTIONAL_VALIDITY: &[FieldSpec] = &[
    FieldSpec::context("notBefore", 0, F::OPTIONAL, dissect_time),
    FieldSpec::context("notAfter", 1, F::OPTIONAL, dissect_time),
];

fn dissect_optional_validity(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, OPTIONAL_VALIDITY)
}

fn dissect_controls(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &ATTRIBUTE_TYPE_AND_VALUE, 1)
}

static PROOF_OF_POSSESSION: &[FieldSpec] = &[
    FieldSpec::context("raVerified", 0, F::IMPLICIT, dissect_null),
    FieldSpec::context("signature", 1, F::IMPLICIT, dissect_popo_signing_key),
    FieldSpec::context("keyEncipherment", 2, F::NONE, dissect_popo_priv_key),
    FieldSpec::context("keyAgreement", 3, F::NONE, dissect_popo_priv_key),
];

pub fn dissect_proof_of_possession(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_choice(implicit, ctx, tvb, offset, name, PROOF_OF_POSSESSION)
}

static POPO_SIGNING_KEY: &[FieldSpec] = &[
    FieldSpec::context("poposkInput", 0, F::OPTIONAL_IMPLICIT, dissect_popo_signing_key_input),
    FieldSpec::universal("algorithmIdentifier", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::universal("signature", u::BIT_STRING, F::NONE, dissect_bit_string),
];

fn dissect_popo_signing_key(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, POPO_SIGNING_KEY)
}

static AUTH_INFO: &[FieldSpec] = &[
    FieldSpec::context("sender", 0, F::NONE, dissect_general_name),
    FieldSpec::universal("publicKeyMAC", u::SEQUENCE, F::NONE, dissect_pkmac_value),
];

fn dissect_auth_info(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_choice(implicit, ctx, tvb, offset, name, AUTH_INFO)
}

static POPO_SIGNING_KEY_INPUT: &[FieldSpec] = &[
    FieldSpec::untagged("authInfo", F::NONE, dissect_auth_info),
    FieldSpec::universal("publicKey", u::SEQUENCE, F::NONE, dissect_subject_public_key_info),
];

fn dissect_popo_signing_key_input(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, POPO_SIGNING_KEY_INPUT)
}

static PKMAC_VALUE: &[FieldSpec] = &[
    FieldSpec::universal("algId", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::universal("value", u::BIT_STRING, F::NONE, dissect_bit_string),
];

fn dissect_pkmac_value(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, PKMAC_VALUE)
}

fn dissect_subsequent_message(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_integer_named(implicit, ctx, tvb, offset, name, SUBSEQUENT_MESSAGE)
}

static POPO_PRIV_KEY: &[FieldSpec] = &[
    FieldSpec::context("thisMessage", 0, F::IMPLICIT, dissect_bit_string),
    FieldSpec::context("subsequentMessage", 1, F::IMPLICIT, dissect_subsequent_message),
    FieldSpec::context("dhMAC", 2, F::IMPLICIT, dissect_bit_string),
    FieldSpec::context("agreeMAC", 3, F::IMPLICIT, dissect_pkmac_value),
    FieldSpec::context("encryptedKey", 4, F::IMPLICIT, dissect_unknown),
];

fn dissect_popo_priv_key(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_choice(implicit, ctx, tvb, offset, name, POPO_PRIV_KEY)
}

static PBM_PARAMETER: &[FieldSpec] = &[
    FieldSpec::universal("salt", u::OCTET_STRING, F::NONE, dissect_octet_string),
    FieldSpec::universal("owf", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::universal("iterationCount", u::INTEGER, F::NONE, dissect_integer),
    FieldSpec::universal("mac", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
];

fn dissect_pbm_parameter(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, PBM_PARAMETER)
}

static DHBM_PARAMETER: &[FieldSpec] = &[
    FieldSpec::universal("owf", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::universal("mac", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
];

fn dissect_dhbm_parameter(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, DHBM_PARAMETER)
}

fn dissect_publication_action(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_integer_named(implicit, ctx, tvb, offset, name, PUBLICATION_ACTION)
}

fn dissect_publication_method(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_integer_named(implicit, ctx, tvb, offset, name, PUBLICATION_METHOD)
}

static SINGLE_PUB_INFO: &[FieldSpec] = &[
    FieldSpec::universal("pubMethod", u::INTEGER, F::NONE, dissect_publication_method),
    FieldSpec::untagged("pubLocation", F::OPTIONAL, dissect_general_name),
];

fn dissect_single_pub_info(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, SINGLE_PUB_INFO)
}

static PUB_INFOS_ITEM: FieldSpec = FieldSpec::universal("SinglePubInfo", u::SEQUENCE, F::NONE, dissect_single_pub_info);

fn dissect_pub_infos(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &PUB_INFOS_ITEM, 1)
}

static PKI_PUBLICATION_INFO: &[FieldSpec] = &[
    FieldSpec::universal("action", u::INTEGER, F::NONE, dissect_publication_action),
    FieldSpec::universal("pubInfos", u::SEQUENCE, F::OPTIONAL, dissect_pub_infos),
];

fn dissect_pki_publication_info(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, PKI_PUBLICATION_INFO)
}

static OLD_CERT_ID: &[FieldSpec] = &[
    FieldSpec::untagged("issuer", F::NONE, dissect_general_name),
    FieldSpec::universal("serialNumber", u::INTEGER, F::NONE, dissect_big_integer),
];

fn dissect_old_cert_id(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, OLD_CERT_ID)
}

static TYPES: &[(&str, &str, DecodeFn)] = &[
    ("1.3.6.1.5.5.7.5.1.1", "id-regCtrl-regToken", dissect_utf8_string),
    ("1.3.6.1.5.5.7.5.1.2", "id-regCtrl-authenticator", dissect_utf8_string),
    ("1.3.6.1.5.5.7.5.1.3", "id-regCtrl-pkiPublicationInfo", dissect_pki_publication_info),
    ("1.3.6.1.5.5.7.5.1.4", "id-regCtrl-pkiArchiveOptions", dissect_unknown),
    ("1.3.6.1.5.5.7.5.1.5", "id-regCtrl-oldCertID", dissect_old_cert_id),
    ("1.3.6.1.5.5.7.5.1.6", "id-regCtrl-protocolEncrKey", dissect_subject_public_key_info),
    ("1.3.6.1.5.5.7.5.2.1", "id-regInfo-utf8Pairs", dissect_utf8_string),
    ("1.3.6.1.5.5.7.5.2.2", "id-regInfo-certReq", dissect_cert_request),
    ("1.2.840.113533.7.66.13", "password based MAC", dissect_pbm_parameter),
    ("1.2.840.113533.7.66.30", "Diffie-Hellman based MAC", dissect_dhbm_parameter),
];

pub fn register(registry: &mut OidRegistry) -> Result<()> {
    for &(oid, name, decoder) in TYPES {
        registry.register_type(oid, name, decoder)?;
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
        super::super::common::register(&mut registry).unwrap();
        register(&mut registry).unwrap();
        registry
    }

    fn decode(data: &[u8]) -> Result<(usize, FieldNode)> {
        let registry = registry();
        let mut ctx = DecodeContext::new(&registry, BerOptions::default());
        dissect_cert_req_messages(false, &mut ctx, &ByteCursor::from_slice(data), 0, "CertReqMessages")
    }

    #[test]
    fn test_template_fields_and_controls() {
        let subject = encode::sequence(&[encode::set(&[encode::sequence(&[
            encode::oid("2.5.4.3").unwrap(),
            encode::utf8_string("device-7"),
        ])])]);
        let template = encode::sequence(&[encode::implicit(1, &encode::integer(99)), encode::explicit(5, &subject)]);
        let controls = encode::sequence(&[encode::sequence(&[
            encode::oid("1.3.6.1.5.5.7.5.1.1").unwrap(),
            encode::utf8_string("token"),
        ])]);
        let msg = encode::sequence(&[encode::sequence(&[
            encode::sequence(&[encode::integer(5), template, controls]),
            encode::implicit(0, &encode::null()),
        ])]);

        let (end, node) = decode(&msg).unwrap();
        assert_eq!(end, msg.len());
        assert!(!node.has_errors());

        let req = node.find(&["CertReqMsg", "certReq"]).unwrap();
        assert_eq!(req.child("certReqId").map(|n| &n.value), Some(&Value::Integer(5)));
        let template = req.child("certTemplate").unwrap();
        assert_eq!(template.child("serialNumber").map(|n| &n.value), Some(&Value::Integer(99)));
        assert!(template.child("subject").is_some());
        assert!(template.child("issuer").is_none());

        let token = req.child("controls").and_then(|c| c.find_any("value")).unwrap();
        assert_eq!(token.suffix.as_deref(), Some("(id-regCtrl-regToken)"));
        assert_eq!(token.value, Value::Str("token".into()));

        let popo = node.find(&["CertReqMsg", "popo"]).unwrap();
        assert_eq!(popo.value, Value::Choice("raVerified"));
    }

    #[test]
    fn test_signature_popo() {
        let alg = encode::sequence(&[encode::oid("1.2.840.10045.4.3.2").unwrap()]);
        let popo = encode::implicit(
            1,
            &encode::sequence(&[alg, encode::bit_string(0, &[0x30, 0x00])]),
        );
        let msg = encode::sequence(&[encode::sequence(&[
            encode::sequence(&[encode::integer(1), encode::sequence(&[])]),
            popo,
        ])]);
        let (_, node) = decode(&msg).unwrap();
        let popo = node.find(&["CertReqMsg", "popo"]).unwrap();
        assert_eq!(popo.value, Value::Choice("signature"));
        assert!(popo.find(&["signature", "algorithmIdentifier"]).is_some());
        assert!(!node.has_errors());
    }

    #[test]
    fn test_empty_messages_rejected() {
        let (end, node) = decode(&encode::sequence(&[])).unwrap();
        assert_eq!(end, 2);
        assert!(node.children.is_empty());
        assert_eq!(node.expert[0].kind, ExpertKind::EmptySequence);
    }

    #[test]
    fn test_missing_cert_req_id() {
        let msg = encode::sequence(&[encode::sequence(&[encode::sequence(&[encode::sequence(&[])])])]);
        let (_, node) = decode(&msg).unwrap();
        // the broken certReq is kept as a flagged node inside its message
        assert_eq!(node.children.len(), 1);
        assert!(node.children[0].has_errors());
    }
}
