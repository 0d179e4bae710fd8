//! Online Certificate Status Protocol (RFC 6960)

use super::common::{
    dissect_algorithm_identifier, dissect_extensions, dissect_general_name, dissect_name,
};
use super::x509::{dissect_authority_info_access, dissect_certificate, dissect_crl_reason};
use crate::ber::primitive::{
    dissect_big_integer, dissect_bit_string, dissect_enumerated_named, dissect_generalized_time,
    dissect_ia5_string, dissect_integer_named, dissect_null, dissect_object_identifier,
    dissect_object_identifier_str, dissect_octet_string, ValueNames,
};
use crate::ber::structure::{dissect_choice, dissect_encapsulated, dissect_sequence, dissect_sequence_of};
use crate::ber::{universal as u, DecodeContext, DecodeFn, FieldFlags as F, FieldSpec};
use crate::cursor::ByteCursor;
use crate::errors::Result;
use crate::registry::OidRegistry;
use crate::tree::FieldNode;

type Decoded = Result<(usize, FieldNode)>;

pub const ID_PKIX_OCSP_BASIC: &str = "1.3.6.1.5.5.7.48.1.1";

pub const RESPONSE_STATUS: ValueNames = &[
    (0, "successful"),
    (1, "malformedRequest"),
    (2, "internalError"),
    (3, "tryLater"),
    (5, "sigRequired"),
    (6, "unauthorized"),
];

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

fn dissect_response_status(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_enumerated_named(implicit, ctx, tvb, offset, name, RESPONSE_STATUS)
}

static CERT_ID: &[FieldSpec] = &[
    FieldSpec::universal("hashAlgorithm", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::universal("issuerNameHash", u::OCTET_STRING, F::NONE, dissect_octet_string),
    FieldSpec::universal("issuerKeyHash", u::OCTET_STRING, F::NONE, dissect_octet_string),
    FieldSpec::universal("serialNumber", u::INTEGER, F::NONE, dissect_big_integer),
];

pub fn dissect_cert_id(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, CERT_ID)
}

static CERTIFICATE: FieldSpec = FieldSpec::universal("Certificate", u::SEQUENCE, F::NONE, dissect_certificate);

fn dissect_certs(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &CERTIFICATE, 0)
}

// Request side

static REQUEST: &[FieldSpec] = &[
    FieldSpec::universal("reqCert", u::SEQUENCE, F::NONE, dissect_cert_id),
    FieldSpec::context("singleRequestExtensions", 0, F::OPTIONAL, dissect_extensions),
];

fn dissect_request(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, REQUEST)
}

static REQUEST_LIST_ITEM: FieldSpec = FieldSpec::universal("Request", u::SEQUENCE, F::NONE, dissect_request);

fn dissect_request_list(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &REQUEST_LIST_ITEM, 0)
}

static TBS_REQUEST: &[FieldSpec] = &[
    FieldSpec::context("version", 0, F::OPTIONAL, dissect_version),
    FieldSpec::context("requestorName", 1, F::OPTIONAL, dissect_general_name),
    FieldSpec::universal("requestList", u::SEQUENCE, F::NONE, dissect_request_list),
    FieldSpec::context("requestExtensions", 2, F::OPTIONAL, dissect_extensions),
];

fn dissect_tbs_request(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, TBS_REQUEST)
}

static SIGNATURE: &[FieldSpec] = &[
    FieldSpec::universal("signatureAlgorithm", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::universal("signature", u::BIT_STRING, F::NONE, dissect_bit_string),
    FieldSpec::context("certs", 0, F::OPTIONAL, dissect_certs),
];

fn dissect_signature(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, SIGNATURE)
}

static OCSP_REQUEST: &[FieldSpec] = &[
    FieldSpec::universal("tbsRequest", u::SEQUENCE, F::NONE, dissect_tbs_request),
    FieldSpec::context("optionalSignature", 0, F::OPTIONAL, dissect_signature),
];

pub fn dissect_ocsp_request(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, OCSP_REQUEST)
}

// Response side

static RESPONSE_BYTES: &[FieldSpec] = &[
    FieldSpec::universal("responseType", u::OBJECT_IDENTIFIER, F::NONE, dissect_object_identifier_str),
    FieldSpec::universal("response", u::OCTET_STRING, F::NONE, dissect_encapsulated),
];

fn dissect_response_bytes(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, RESPONSE_BYTES)
}

static OCSP_RESPONSE: &[FieldSpec] = &[
    FieldSpec::universal("responseStatus", u::ENUMERATED, F::NONE, dissect_response_status),
    FieldSpec::context("responseBytes", 0, F::OPTIONAL, dissect_response_bytes),
];

/// `OCSPResponse ::= SEQUENCE { responseStatus, responseBytes [0] EXPLICIT OPTIONAL }`
pub fn dissect_ocsp_response(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, OCSP_RESPONSE)
}

static RESPONDER_ID: &[FieldSpec] = &[
    FieldSpec::context("byName", 1, F::NONE, dissect_name),
    FieldSpec::context("byKey", 2, F::NONE, dissect_octet_string),
];

fn dissect_responder_id(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_choice(implicit, ctx, tvb, offset, name, RESPONDER_ID)
}

static REVOKED_INFO: &[FieldSpec] = &[
    FieldSpec::universal("revocationTime", u::GENERALIZED_TIME, F::NONE, dissect_generalized_time),
    FieldSpec::context("revocationReason", 0, F::OPTIONAL, dissect_crl_reason),
];

fn dissect_revoked_info(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, REVOKED_INFO)
}

static CERT_STATUS: &[FieldSpec] = &[
    FieldSpec::context("good", 0, F::IMPLICIT, dissect_null),
    FieldSpec::context("revoked", 1, F::IMPLICIT, dissect_revoked_info),
    FieldSpec::context("unknown", 2, F::IMPLICIT, dissect_null),
];

fn dissect_cert_status(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_choice(implicit, ctx, tvb, offset, name, CERT_STATUS)
}

static SINGLE_RESPONSE: &[FieldSpec] = &[
    FieldSpec::universal("certID", u::SEQUENCE, F::NONE, dissect_cert_id),
    FieldSpec::untagged("certStatus", F::NONE, dissect_cert_status),
    FieldSpec::universal("thisUpdate", u::GENERALIZED_TIME, F::NONE, dissect_generalized_time),
    FieldSpec::context("nextUpdate", 0, F::OPTIONAL, dissect_generalized_time),
    FieldSpec::context("singleExtensions", 1, F::OPTIONAL, dissect_extensions),
];

fn dissect_single_response(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, SINGLE_RESPONSE)
}

static RESPONSES_ITEM: FieldSpec =
    FieldSpec::universal("SingleResponse", u::SEQUENCE, F::NONE, dissect_single_response);

fn dissect_responses(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &RESPONSES_ITEM, 0)
}

static RESPONSE_DATA: &[FieldSpec] = &[
    FieldSpec::context("version", 0, F::OPTIONAL, dissect_version),
    FieldSpec::untagged("responderID", F::NONE, dissect_responder_id),
    FieldSpec::universal("producedAt", u::GENERALIZED_TIME, F::NONE, dissect_generalized_time),
    FieldSpec::universal("responses", u::SEQUENCE, F::NONE, dissect_responses),
    FieldSpec::context("responseExtensions", 1, F::OPTIONAL, dissect_extensions),
];

fn dissect_response_data(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, RESPONSE_DATA)
}

static BASIC_OCSP_RESPONSE: &[FieldSpec] = &[
    FieldSpec::universal("tbsResponseData", u::SEQUENCE, F::NONE, dissect_response_data),
    FieldSpec::universal("signatureAlgorithm", u::SEQUENCE, F::NONE, dissect_algorithm_identifier),
    FieldSpec::universal("signature", u::BIT_STRING, F::NONE, dissect_bit_string),
    FieldSpec::context("certs", 0, F::OPTIONAL, dissect_certs),
];

pub fn dissect_basic_ocsp_response(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, BASIC_OCSP_RESPONSE)
}

// Extensions

static CRL_ID: &[FieldSpec] = &[
    FieldSpec::context("crlUrl", 0, F::OPTIONAL, dissect_ia5_string),
    FieldSpec::context("crlNum", 1, F::OPTIONAL, dissect_big_integer),
    FieldSpec::context("crlTime", 2, F::OPTIONAL, dissect_generalized_time),
];

fn dissect_crl_id(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, CRL_ID)
}

static RESPONSE_TYPE: FieldSpec =
    FieldSpec::universal("responseType", u::OBJECT_IDENTIFIER, F::NONE, dissect_object_identifier);

fn dissect_acceptable_responses(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &RESPONSE_TYPE, 0)
}

static SERVICE_LOCATOR: &[FieldSpec] = &[
    FieldSpec::untagged("issuer", F::NONE, dissect_name),
    FieldSpec::universal("locator", u::SEQUENCE, F::NONE, dissect_authority_info_access),
];

fn dissect_service_locator(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Decoded {
    dissect_sequence(implicit, ctx, tvb, offset, name, SERVICE_LOCATOR)
}

static TYPES: &[(&str, &str, DecodeFn)] = &[
    (ID_PKIX_OCSP_BASIC, "id-pkix-ocsp-basic", dissect_basic_ocsp_response),
    ("1.3.6.1.5.5.7.48.1.2", "id-pkix-ocsp-nonce", dissect_octet_string),
    ("1.3.6.1.5.5.7.48.1.3", "id-pkix-ocsp-crl", dissect_crl_id),
    ("1.3.6.1.5.5.7.48.1.4", "id-pkix-ocsp-response", dissect_acceptable_responses),
    ("1.3.6.1.5.5.7.48.1.5", "id-pkix-ocsp-nocheck", dissect_null),
    ("1.3.6.1.5.5.7.48.1.6", "id-pkix-ocsp-archive-cutoff", dissect_generalized_time),
    ("1.3.6.1.5.5.7.48.1.7", "id-pkix-ocsp-service-locator", dissect_service_locator),
    ("1.3.6.1.5.5.7.48.1.9", "id-pkix-ocsp-extended-revoke", dissect_null),
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
    use crate::tree::Value;

    fn registry() -> OidRegistry {
        let mut registry = OidRegistry::new();
        super::super::common::register(&mut registry).unwrap();
        super::super::x509::register(&mut registry).unwrap();
        register(&mut registry).unwrap();
        registry
    }

    fn cert_id(serial: i64) -> Vec<u8> {
        encode::sequence(&[
            encode::sequence(&[encode::oid("1.3.14.3.2.26").unwrap(), encode::null()]),
            encode::octet_string(&[0x11; 20]),
            encode::octet_string(&[0x22; 20]),
            encode::integer(serial),
        ])
    }

    #[test]
    fn test_status_only_response() {
        let data = encode::sequence(&[encode::enumerated(3)]);
        let registry = registry();
        let mut ctx = DecodeContext::new(&registry, BerOptions::default());
        let (_, node) = dissect_ocsp_response(false, &mut ctx, &ByteCursor::from(data), 0, "OCSPResponse").unwrap();
        let status = node.child("responseStatus").unwrap();
        assert_eq!(status.value, Value::Integer(3));
        assert_eq!(status.suffix.as_deref(), Some("(tryLater)"));
        assert!(node.child("responseBytes").is_none());
    }

    #[test]
    fn test_basic_response_through_response_bytes() {
        let single = encode::sequence(&[
            cert_id(7),
            encode::implicit(
                1,
                &encode::sequence(&[
                    encode::generalized_time("20240301120000Z"),
                    encode::explicit(0, &encode::enumerated(1)),
                ]),
            ),
            encode::generalized_time("20240301120000Z"),
        ]);
        let tbs = encode::sequence(&[
            encode::explicit(2, &encode::octet_string(&[0xAB; 20])),
            encode::generalized_time("20240301120500Z"),
            encode::sequence(&[single]),
            encode::explicit(
                1,
                &encode::sequence(&[encode::sequence(&[
                    encode::oid("1.3.6.1.5.5.7.48.1.2").unwrap(),
                    encode::octet_string(&encode::octet_string(&[1, 2, 3, 4])),
                ])]),
            ),
        ]);
        let basic = encode::sequence(&[
            tbs,
            encode::sequence(&[encode::oid("1.2.840.10045.4.3.2").unwrap()]),
            encode::bit_string(0, &[0x55; 16]),
        ]);
        let data = encode::sequence(&[
            encode::enumerated(0),
            encode::explicit(
                0,
                &encode::sequence(&[encode::oid(ID_PKIX_OCSP_BASIC).unwrap(), encode::octet_string(&basic)]),
            ),
        ]);

        let registry = registry();
        let mut ctx = DecodeContext::new(&registry, BerOptions::default());
        let (end, node) =
            dissect_ocsp_response(false, &mut ctx, &ByteCursor::from(data.clone()), 0, "OCSPResponse").unwrap();
        assert_eq!(end, data.len());
        assert!(!node.has_errors());

        let basic = node.find(&["responseBytes", "response", "id-pkix-ocsp-basic"]).unwrap();
        let data = basic.child("tbsResponseData").unwrap();
        assert_eq!(data.find(&["responderID"]).map(|n| &n.value), Some(&Value::Choice("byKey")));

        let status = data.find(&["responses", "SingleResponse", "certStatus"]).unwrap();
        assert_eq!(status.value, Value::Choice("revoked"));
        let reason = status.find_any("revocationReason").unwrap();
        assert_eq!(reason.suffix.as_deref(), Some("(keyCompromise)"));

        let nonce = data.find_any("extnValue").unwrap();
        assert_eq!(nonce.children[0].name, "id-pkix-ocsp-nonce");
    }

    #[test]
    fn test_request_with_requestor_name() {
        let data = encode::sequence(&[encode::sequence(&[
            encode::explicit(1, &encode::implicit(2, &encode::ia5_string("ocsp.example"))),
            encode::sequence(&[encode::sequence(&[cert_id(1)]), encode::sequence(&[cert_id(2)])]),
        ])]);
        let registry = registry();
        let mut ctx = DecodeContext::new(&registry, BerOptions::default());
        let (_, node) = dissect_ocsp_request(false, &mut ctx, &ByteCursor::from(data), 0, "OCSPRequest").unwrap();
        let list = node.find(&["tbsRequest", "requestList"]).unwrap();
        assert_eq!(list.suffix.as_deref(), Some("(2 items)"));
        let requestor = node.find(&["tbsRequest", "requestorName"]).unwrap();
        assert_eq!(requestor.value, Value::Choice("dNSName"));
        assert!(node.child("optionalSignature").is_none());
    }
}
