//! PKI Message Integration Tests
//!
//! Whole-message decoding through the registered schemas

use brivas_dissect::ber::encode;
use brivas_dissect::pkix::{self, PkixPdu};
use brivas_dissect::{BerOptions, ByteCursor, ExpertKind, OidRegistry, Value};

fn registry() -> OidRegistry {
    let mut registry = OidRegistry::new();
    pkix::register(&mut registry).unwrap();
    registry
}

fn minimal_cert_req() -> Vec<u8> {
    let cert_request = encode::sequence(&[encode::integer(0), encode::sequence(&[])]);
    encode::sequence(&[encode::sequence(&[cert_request])])
}

#[test]
fn test_minimal_crmf_request() {
    let registry = registry();
    let data = minimal_cert_req();
    let dissection = pkix::dissect(PkixPdu::CertReqMessages, &registry, BerOptions::default(), &ByteCursor::from(data));

    assert_eq!(dissection.protocol, "CRMF");
    assert_eq!(dissection.info, "CertReqMessages");
    assert!(!dissection.malformed);
    assert!(!dissection.root.has_errors());
    assert_eq!(dissection.root.suffix.as_deref(), Some("(1 item)"));

    let msg = dissection.root.child("CertReqMsg").unwrap();
    let req = msg.child("certReq").unwrap();
    assert_eq!(req.child("certReqId").map(|n| &n.value), Some(&Value::Integer(0)));
    assert!(req.child("certTemplate").unwrap().children.is_empty());
    assert!(msg.child("popo").is_none());
    assert!(msg.child("regInfo").is_none());
}

#[test]
fn test_crmf_without_messages_is_malformed() {
    let registry = registry();
    let data = encode::sequence(&[]);
    let dissection = pkix::dissect(PkixPdu::CertReqMessages, &registry, BerOptions::default(), &ByteCursor::from(data));
    assert!(dissection.malformed);
    assert_eq!(dissection.info, "CertReqMessages [Malformed Packet]");
    assert!(dissection.root.has_expert(ExpertKind::EmptySequence));
}

#[test]
fn test_crmf_prefixes_are_contained() {
    let registry = registry();
    let data = minimal_cert_req();
    for cut in 0..data.len() {
        let tvb = ByteCursor::from_slice(&data[..cut]);
        let dissection = pkix::dissect(PkixPdu::CertReqMessages, &registry, BerOptions::default(), &tvb);
        assert!(dissection.malformed, "prefix of {} bytes", cut);
        assert_eq!(dissection.root.length, cut);
    }
}

#[test]
fn test_status_only_ocsp_response() {
    let registry = registry();
    let data = encode::sequence(&[encode::enumerated(0)]);
    let dissection = pkix::dissect(PkixPdu::OcspResponse, &registry, BerOptions::default(), &ByteCursor::from(data));

    assert_eq!(dissection.protocol, "OCSP");
    assert_eq!(dissection.info, "OCSPResponse");
    assert!(!dissection.malformed);
    let status = dissection.root.child("responseStatus").unwrap();
    assert_eq!(status.value, Value::Integer(0));
    assert_eq!(status.suffix.as_deref(), Some("(successful)"));
    assert!(dissection.root.child("responseBytes").is_none());
    assert!(dissection.render().contains("responseStatus: 0 (successful)"));
}

#[test]
fn test_media_type_dispatch() {
    let registry = registry();
    let data = encode::sequence(&[encode::enumerated(6)]);
    let tvb = ByteCursor::from(data);

    let dissection = pkix::dissect_media_type("application/ocsp-response", &registry, BerOptions::default(), &tvb)
        .unwrap();
    assert_eq!(dissection.info, "OCSPResponse");
    assert_eq!(
        dissection.root.child("responseStatus").and_then(|n| n.suffix.as_deref()),
        Some("(unauthorized)")
    );
    assert!(pkix::dissect_media_type("application/json", &registry, BerOptions::default(), &tvb).is_none());
}

#[test]
fn test_keywords_round_trip() {
    for pdu in PkixPdu::ALL {
        assert_eq!(pdu.to_string().parse::<PkixPdu>(), Ok(pdu));
    }
    assert!("x509".parse::<PkixPdu>().is_err());
}
