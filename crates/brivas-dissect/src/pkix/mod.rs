//! PKI schema tables
//!
//! Each submodule holds the static `FieldSpec` tables for one ASN.1 module
//! plus a `register` function that binds its OIDs in the registry. The
//! top-level PDUs are also reachable by media type (`ber.media_type`) and
//! by syntax name (`ber.syntax`).

pub mod attribute_cert;
pub mod common;
pub mod crmf;
pub mod ocsp;
pub mod pkcs10;
pub mod x509;

use crate::ber::{dissect_message, dissect_message_with, DecodeFn};
use crate::config::BerOptions;
use crate::cursor::ByteCursor;
use crate::errors::Result;
use crate::registry::{OidRegistry, TypeHandler};
use crate::tree::Dissection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Top-level PKI message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PkixPdu {
    CertReqMessages,
    CertificationRequest,
    OcspRequest,
    OcspResponse,
    Certificate,
    AttributeCertificate,
}

impl PkixPdu {
    pub const ALL: [PkixPdu; 6] = [
        PkixPdu::CertReqMessages,
        PkixPdu::CertificationRequest,
        PkixPdu::OcspRequest,
        PkixPdu::OcspResponse,
        PkixPdu::Certificate,
        PkixPdu::AttributeCertificate,
    ];

    /// ASN.1 type name, used as the root field name
    pub fn name(self) -> &'static str {
        match self {
            PkixPdu::CertReqMessages => "CertReqMessages",
            PkixPdu::CertificationRequest => "CertificationRequest",
            PkixPdu::OcspRequest => "OCSPRequest",
            PkixPdu::OcspResponse => "OCSPResponse",
            PkixPdu::Certificate => "Certificate",
            PkixPdu::AttributeCertificate => "AttributeCertificate",
        }
    }

    /// Protocol column
    pub fn protocol(self) -> &'static str {
        match self {
            PkixPdu::CertReqMessages => "CRMF",
            PkixPdu::CertificationRequest => "PKCS-10",
            PkixPdu::OcspRequest | PkixPdu::OcspResponse => "OCSP",
            PkixPdu::Certificate | PkixPdu::AttributeCertificate => "X509",
        }
    }

    pub fn decoder(self) -> DecodeFn {
        match self {
            PkixPdu::CertReqMessages => crmf::dissect_cert_req_messages,
            PkixPdu::CertificationRequest => pkcs10::dissect_certification_request,
            PkixPdu::OcspRequest => ocsp::dissect_ocsp_request,
            PkixPdu::OcspResponse => ocsp::dissect_ocsp_response,
            PkixPdu::Certificate => x509::dissect_certificate,
            PkixPdu::AttributeCertificate => attribute_cert::dissect_attribute_certificate,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            PkixPdu::CertReqMessages => "crmf",
            PkixPdu::CertificationRequest => "pkcs10",
            PkixPdu::OcspRequest => "ocsp-request",
            PkixPdu::OcspResponse => "ocsp-response",
            PkixPdu::Certificate => "certificate",
            PkixPdu::AttributeCertificate => "attribute-certificate",
        }
    }
}

impl fmt::Display for PkixPdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for PkixPdu {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PkixPdu::ALL
            .into_iter()
            .find(|pdu| pdu.keyword().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown PKI message type: {}", s))
    }
}

const MEDIA_TYPES: &[(&str, PkixPdu)] = &[
    ("application/pkcs10", PkixPdu::CertificationRequest),
    ("application/ocsp-request", PkixPdu::OcspRequest),
    ("application/ocsp-response", PkixPdu::OcspResponse),
    ("application/pkix-cert", PkixPdu::Certificate),
    ("application/pkix-attr-cert", PkixPdu::AttributeCertificate),
];

const SYNTAX_NAMES: &[(&str, PkixPdu)] = &[
    ("CertReqMessages", PkixPdu::CertReqMessages),
    ("CertificationRequest", PkixPdu::CertificationRequest),
    ("OCSPRequest", PkixPdu::OcspRequest),
    ("OCSPResponse", PkixPdu::OcspResponse),
    ("Certificate", PkixPdu::Certificate),
    ("AttributeCertificate", PkixPdu::AttributeCertificate),
];

/// Register every PKI schema: OIDs, media types and syntax names
pub fn register(registry: &mut OidRegistry) -> Result<()> {
    common::register(registry)?;
    x509::register(registry)?;
    crmf::register(registry)?;
    ocsp::register(registry)?;
    pkcs10::register(registry)?;
    attribute_cert::register(registry)?;

    let media = registry.table_mut("ber.media_type");
    for &(media_type, pdu) in MEDIA_TYPES {
        media.add_string(media_type, pdu.name(), TypeHandler::new(pdu.name(), pdu.decoder()));
    }
    let syntax = registry.table_mut("ber.syntax");
    for &(syntax_name, pdu) in SYNTAX_NAMES {
        syntax.add_string(syntax_name, pdu.name(), TypeHandler::new(pdu.name(), pdu.decoder()));
    }
    debug!(oids = registry.len(), "pkix schemas registered");
    Ok(())
}

/// Decode one PKI message
pub fn dissect(pdu: PkixPdu, registry: &OidRegistry, options: BerOptions, tvb: &ByteCursor) -> Dissection {
    dissect_message(pdu.protocol(), registry, options, tvb, pdu.name(), pdu.decoder())
}

/// Decode a body by its HTTP media type; `None` when the type is not
/// registered
pub fn dissect_media_type(
    media_type: &str,
    registry: &OidRegistry,
    options: BerOptions,
    tvb: &ByteCursor,
) -> Option<Dissection> {
    let essence = media_type.split(';').next().unwrap_or(media_type).trim();
    let (name, handler) = registry.table("ber.media_type")?.lookup_str(essence)?;
    Some(dissect_message_with("PKIX", registry, options, tvb, name, handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::encode;

    fn registry() -> OidRegistry {
        let mut registry = OidRegistry::new();
        register(&mut registry).unwrap();
        registry
    }

    #[test]
    fn test_pdu_keywords() {
        for pdu in PkixPdu::ALL {
            assert_eq!(pdu.to_string().parse::<PkixPdu>().unwrap(), pdu);
        }
        assert!("x400".parse::<PkixPdu>().is_err());
    }

    #[test]
    fn test_media_type_dispatch() {
        let registry = registry();
        let body = ByteCursor::from(encode::sequence(&[encode::enumerated(0)]));
        let dissection =
            dissect_media_type("application/ocsp-response; charset=binary", &registry, BerOptions::default(), &body)
                .unwrap();
        assert!(!dissection.malformed);
        assert_eq!(dissection.root.name, "OCSPResponse");
        assert!(dissect_media_type("text/plain", &registry, BerOptions::default(), &body).is_none());
    }

    #[test]
    fn test_malformed_top_level() {
        let registry = registry();
        let tvb = ByteCursor::from_slice(&[0x30, 0x10, 0x02]);
        let dissection = dissect(PkixPdu::OcspResponse, &registry, BerOptions::default(), &tvb);
        assert!(dissection.malformed);
        assert_eq!(dissection.info, "OCSPResponse [Malformed Packet]");
        assert_eq!(dissection.root.length, 3);
    }
}
