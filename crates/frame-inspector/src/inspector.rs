//! Frame dispatch and per-run counters

use anyhow::Result;
use brivas_dissect::pkix::{self, PkixPdu};
use brivas_dissect::sigtran::{m3ua, mtp3, SuaSession};
use brivas_dissect::{ByteCursor, DissectConfig, Dissection, OidRegistry};
use brivas_telemetry::{Counter, Gauge, Histogram, MetricsSnapshot};
use clap::ValueEnum;
use std::time::Instant;
use tracing::{debug, warn};

/// What the frames on the input carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FrameProtocol {
    Mtp3,
    M3ua,
    Sua,
    Crmf,
    Pkcs10,
    OcspRequest,
    OcspResponse,
    Certificate,
    AttributeCertificate,
}

impl FrameProtocol {
    fn pkix(self) -> Option<PkixPdu> {
        match self {
            Self::Crmf => Some(PkixPdu::CertReqMessages),
            Self::Pkcs10 => Some(PkixPdu::CertificationRequest),
            Self::OcspRequest => Some(PkixPdu::OcspRequest),
            Self::OcspResponse => Some(PkixPdu::OcspResponse),
            Self::Certificate => Some(PkixPdu::Certificate),
            Self::AttributeCertificate => Some(PkixPdu::AttributeCertificate),
            Self::Mtp3 | Self::M3ua | Self::Sua => None,
        }
    }
}

/// Decodes frames of one protocol; SUA connection state persists across
/// frames of a run
pub struct Inspector {
    protocol: FrameProtocol,
    config: DissectConfig,
    registry: OidRegistry,
    sua: SuaSession,
    decoded: Counter,
    malformed: Counter,
    rejected: Counter,
    associations: Gauge,
    decode_time: Histogram,
}

impl Inspector {
    pub fn new(protocol: FrameProtocol, config: DissectConfig) -> Result<Self> {
        let mut registry = OidRegistry::new();
        pkix::register(&mut registry)?;
        debug!(?protocol, oids = registry.len(), "inspector ready");
        Ok(Self {
            protocol,
            config,
            registry,
            sua: SuaSession::new(),
            decoded: Counter::new("frames_decoded"),
            malformed: Counter::new("frames_malformed"),
            rejected: Counter::new("frames_rejected"),
            associations: Gauge::new("associations"),
            decode_time: Histogram::new("decode_us"),
        })
    }

    pub fn dissect(&self, frame: &[u8]) -> Dissection {
        let started = Instant::now();
        let tvb = ByteCursor::from_slice(frame);
        let dissection = match (self.protocol, self.protocol.pkix()) {
            (_, Some(pdu)) => pkix::dissect(pdu, &self.registry, self.config.ber, &tvb),
            (FrameProtocol::Mtp3, None) => mtp3::dissect(&self.registry, &self.config, &tvb),
            (FrameProtocol::M3ua, None) => m3ua::dissect(&self.registry, &self.config, &tvb),
            (_, None) => self.sua.dissect(&self.registry, &self.config, &tvb),
        };
        self.decode_time.record(started.elapsed().as_secs_f64() * 1e6);

        self.decoded.inc();
        if dissection.malformed {
            self.malformed.inc();
        }
        self.associations.set(self.sua.associations().len() as u64);
        dissection
    }

    /// Count an input line that was not a frame
    pub fn reject(&self, line: usize, err: &anyhow::Error) {
        warn!(line, error = %err, "skipping input line");
        self.rejected.inc();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::new()
            .counter(&self.decoded)
            .counter(&self.malformed)
            .counter(&self.rejected)
            .gauge(&self.associations)
            .histogram(&self.decode_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_malformed_frames() {
        let inspector = Inspector::new(FrameProtocol::OcspResponse, DissectConfig::default()).unwrap();
        let ok = inspector.dissect(&[0x30, 0x03, 0x0a, 0x01, 0x00]);
        assert_eq!(ok.info, "OCSPResponse");
        let bad = inspector.dissect(&[0x30, 0x03, 0x0a]);
        assert!(bad.malformed);

        let snapshot = inspector.snapshot();
        assert_eq!(snapshot.counters["frames_decoded"], 2);
        assert_eq!(snapshot.counters["frames_malformed"], 1);
        assert_eq!(snapshot.histograms["decode_us"].count, 2);
    }

    #[test]
    fn test_m3ua_frame() {
        let inspector = Inspector::new(FrameProtocol::M3ua, DissectConfig::default()).unwrap();
        let frame = [1, 0, 3, 1, 0, 0, 0, 16, 0, 0x11, 0, 8, 0, 0, 0, 7];
        let dissection = inspector.dissect(&frame);
        assert_eq!(dissection.protocol, "M3UA");
        assert_eq!(dissection.info, "ASPUP");
        assert!(!dissection.malformed);
    }

    #[test]
    fn test_sua_state_persists() {
        let inspector = Inspector::new(FrameProtocol::Sua, DissectConfig::default()).unwrap();
        // CORE from reference 0x10, then a CODT for a reference never opened
        let core = [1, 0, 8, 1, 0, 0, 0, 16, 0x01, 0x04, 0, 8, 0, 0, 0, 0x10];
        let codt_unknown = [1, 0, 8, 8, 0, 0, 0, 16, 0x01, 0x05, 0, 8, 0, 0, 0, 0x99];
        assert_eq!(inspector.dissect(&core).info, "CORE (assoc 1)");
        assert_eq!(inspector.dissect(&codt_unknown).info, "CODT");
        assert_eq!(inspector.snapshot().gauges["associations"], 1);
    }
}
