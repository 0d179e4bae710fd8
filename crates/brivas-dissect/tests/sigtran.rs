//! SIGTRAN Integration Tests
//!
//! Parameter alignment, version isolation, nesting budget and truncation
//! containment across MTP3, M3UA and SUA

use brivas_dissect::config::{M3uaConfig, SuaConfig};
use brivas_dissect::sigtran::{m3ua, mtp3, padding, M3uaVersion, ParameterWalker, SuaSession, SuaVersion};
use brivas_dissect::{ByteCursor, DissectConfig, ExpertKind, OidRegistry, TlvOptions, Value};

fn parameter(tag: u16, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&tag.to_be_bytes());
    out.extend_from_slice(&((value.len() + 4) as u16).to_be_bytes());
    out.extend_from_slice(value);
    out.resize(out.len() + padding(value.len()), 0);
    out
}

fn message(msg_class: u8, msg_type: u8, params: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = params.concat();
    let mut out = vec![1, 0, msg_class, msg_type];
    out.extend_from_slice(&((body.len() + 8) as u32).to_be_bytes());
    out.extend(body);
    out
}

fn m3ua_config(version: M3uaVersion) -> DissectConfig {
    DissectConfig {
        m3ua: M3uaConfig { version },
        ..Default::default()
    }
}

fn sua_config(version: SuaVersion) -> DissectConfig {
    DissectConfig {
        sua: SuaConfig { version },
        ..Default::default()
    }
}

fn protocol_data() -> Vec<u8> {
    let mut value = Vec::new();
    value.extend_from_slice(&0x0102u32.to_be_bytes());
    value.extend_from_slice(&0x0304u32.to_be_bytes());
    value.extend_from_slice(&[3, 2, 0, 5]);
    value.extend_from_slice(&[0x09, 0x81, 0x03, 0x0e, 0x19]);
    value
}

#[test]
fn test_parameters_stay_aligned_for_every_length() {
    let registry = OidRegistry::new();
    let config = m3ua_config(M3uaVersion::Rfc);
    for len in 1..=256usize {
        let info = vec![b'a'; len];
        let data = message(3, 1, &[parameter(0x0004, &info), parameter(0x0011, &[0, 0, 0, 7])]);
        assert_eq!(data.len() % 4, 0);

        let tvb = ByteCursor::from(data);
        let dissection = m3ua::dissect(&registry, &config, &tvb);
        assert!(!dissection.malformed, "length {}", len);
        assert!(!dissection.root.has_errors(), "length {}", len);

        let info_node = dissection.root.child("Info string").unwrap();
        assert_eq!(info_node.length, 4 + len + padding(len));
        assert_eq!(info_node.child("Padding").map(|n| n.length), Some(padding(len)).filter(|&p| p > 0));
        let asp_id = dissection.root.find(&["ASP identifier", "ASP identifier"]).unwrap();
        assert_eq!(asp_id.value, Value::Unsigned(7));
    }
}

#[test]
fn test_walker_positions_are_aligned() {
    let body = [
        parameter(1, &[1]),
        parameter(2, &[1, 2, 3, 4, 5, 6]),
        parameter(3, &[]),
        parameter(4, &[9; 13]),
    ]
    .concat();
    let tvb = ByteCursor::from(body);
    let params: Vec<_> = ParameterWalker::new(&tvb).collect::<Result<_, _>>().unwrap();
    assert_eq!(params.iter().map(|p| p.tag).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert!(params.iter().all(|p| p.offset % 4 == 0));
    assert_eq!(params.iter().map(|p| p.padding).collect::<Vec<_>>(), vec![3, 2, 0, 3]);
}

#[test]
fn test_final_parameter_without_padding() {
    let mut data = message(3, 1, &[parameter(0x0011, &[0, 0, 0, 1])]);
    data.extend_from_slice(&[0x00, 0x04, 0x00, 0x07, b'a', b'b', b'c']);
    let len = data.len() as u32;
    data[4..8].copy_from_slice(&len.to_be_bytes());

    let registry = OidRegistry::new();
    let dissection = m3ua::dissect(&registry, &m3ua_config(M3uaVersion::Rfc), &ByteCursor::from(data));
    assert!(!dissection.malformed);
    let info = dissection.root.child("Info string").unwrap();
    assert!(info.child("Padding").is_none());
    assert!(!dissection.root.has_errors());
}

#[test]
fn test_versions_are_isolated() {
    let data = message(1, 1, &[parameter(0x0006, &[0, 0, 0, 1]), parameter(0x0210, &protocol_data())]);
    let tvb = ByteCursor::from(data);
    let registry = OidRegistry::new();

    let rfc = m3ua::dissect(&registry, &m3ua_config(M3uaVersion::Rfc), &tvb);
    assert!(rfc.root.child("Protocol data").is_some());
    assert!(rfc.root.child("Unknown parameter").is_none());
    assert_eq!(rfc.source.as_deref(), Some("258"));

    for version in [M3uaVersion::Draft5, M3uaVersion::Draft6, M3uaVersion::Draft7] {
        let draft = m3ua::dissect(&registry, &m3ua_config(version), &tvb);
        assert!(draft.root.child("Protocol data").is_none(), "{}", version);
        let unknown = draft.root.child("Unknown parameter").unwrap();
        assert_eq!(unknown.suffix.as_deref(), Some("(tag 0x0210)"));
        assert!(draft.root.child("Routing context").is_some());
        assert!(draft.source.is_none());
    }

    let again = m3ua::dissect(&registry, &m3ua_config(M3uaVersion::Rfc), &tvb);
    assert_eq!(again.render(), rfc.render());
    assert_eq!(again.info, rfc.info);
}

fn nested_routing_keys(levels: usize) -> Vec<u8> {
    let mut key = parameter(0x020a, &[0, 0, 0, 1]);
    for _ in 0..levels {
        key = parameter(0x0207, &key);
    }
    message(9, 1, &[key])
}

#[test]
fn test_nesting_budget() {
    let registry = OidRegistry::new();
    let config = m3ua_config(M3uaVersion::Rfc);

    let within = m3ua::dissect(&registry, &config, &ByteCursor::from(nested_routing_keys(4)));
    assert!(!within.malformed);
    assert_eq!(within.info, "REG_REQ");
    let innermost = within
        .root
        .find(&["Routing key", "Routing key", "Routing key", "Routing key", "Local routing key identifier"]);
    assert!(innermost.is_some());

    let beyond = m3ua::dissect(&registry, &config, &ByteCursor::from(nested_routing_keys(5)));
    assert!(beyond.malformed);
    assert_eq!(beyond.info, "REG_REQ [Malformed Packet]");
    assert!(beyond.root.has_expert(ExpertKind::RecursionBudgetExceeded));

    let widened = DissectConfig {
        tlv: TlvOptions { max_depth: 8 },
        ..config
    };
    let relaxed = m3ua::dissect(&registry, &widened, &ByteCursor::from(nested_routing_keys(5)));
    assert!(!relaxed.malformed);
}

#[test]
fn test_aspup_with_routing_contexts() {
    let mut contexts = Vec::new();
    contexts.extend_from_slice(&1u32.to_be_bytes());
    contexts.extend_from_slice(&2u32.to_be_bytes());
    let tvb = ByteCursor::from(message(3, 1, &[parameter(0x0006, &contexts)]));

    let registry = OidRegistry::new();
    let dissection = m3ua::dissect(&registry, &m3ua_config(M3uaVersion::Rfc), &tvb);
    assert_eq!(dissection.protocol, "M3UA");
    assert_eq!(dissection.info, "ASPUP");
    assert!(!dissection.malformed);

    let rc = dissection.root.child("Routing context").unwrap();
    assert_eq!(rc.suffix.as_deref(), Some("(2 contexts)"));
    let values: Vec<_> = rc
        .children
        .iter()
        .filter(|n| n.name == "Routing context")
        .map(|n| n.value.clone())
        .collect();
    assert_eq!(values, vec![Value::Unsigned(1), Value::Unsigned(2)]);
    assert!(dissection.render().contains("Message type: 1 (ASPUP)"));
}

#[test]
fn test_m3ua_prefixes_never_panic() {
    let data = message(1, 1, &[parameter(0x0006, &[0, 0, 0, 1]), parameter(0x0210, &protocol_data())]);
    let registry = OidRegistry::new();
    for version in M3uaVersion::ALL {
        let config = m3ua_config(version);
        for cut in 0..data.len() {
            let dissection = m3ua::dissect(&registry, &config, &ByteCursor::from_slice(&data[..cut]));
            if cut < 8 {
                assert!(dissection.malformed);
                assert!(dissection.root.has_expert(ExpertKind::Truncated));
            } else {
                assert!(dissection.root.has_expert(ExpertKind::LengthClamped), "cut {}", cut);
            }
            let _ = dissection.render();
        }
    }
}

#[test]
fn test_mtp3_prefixes_never_panic() {
    let mut msu = vec![0x83];
    msu.extend_from_slice(&(5u32 | (6 << 14) | (3 << 28)).to_le_bytes());
    msu.extend_from_slice(&[0x09, 0x81, 0x03]);
    let registry = OidRegistry::new();
    let config = DissectConfig::default();

    let full = mtp3::dissect(&registry, &config, &ByteCursor::from_slice(&msu));
    assert!(!full.malformed);
    assert_eq!(full.info, "SCCP");

    for cut in 0..5 {
        let dissection = mtp3::dissect(&registry, &config, &ByteCursor::from_slice(&msu[..cut]));
        assert!(dissection.malformed, "cut {}", cut);
        assert_eq!(dissection.info, "[Malformed Packet]");
    }
}

fn sua_address(tag: u16, routing_indicator: u16, pc: u32, ssn: u8) -> Vec<u8> {
    let mut value = Vec::new();
    value.extend_from_slice(&routing_indicator.to_be_bytes());
    value.extend_from_slice(&3u16.to_be_bytes());
    value.extend(parameter(0x8002, &pc.to_be_bytes()));
    value.extend(parameter(0x8003, &[0, 0, 0, ssn]));
    parameter(tag, &value)
}

#[test]
fn test_sua_prefixes_never_panic() {
    let data = message(
        7,
        1,
        &[
            parameter(0x0006, &[0, 0, 0, 1]),
            parameter(0x0115, &[0, 0, 0, 0x80]),
            sua_address(0x0102, 2, 10, 8),
            sua_address(0x0103, 2, 20, 6),
            parameter(0x010b, &[0x62, 0x03, 0x48, 0x01, 0x01]),
        ],
    );
    let registry = OidRegistry::new();
    let session = SuaSession::new();
    let config = sua_config(SuaVersion::Rfc3868);

    let full = session.dissect(&registry, &config, &ByteCursor::from_slice(&data));
    assert!(!full.malformed);
    assert_eq!(full.info, "CLDT");
    assert_eq!(full.source.as_deref(), Some("10"));
    assert_eq!(full.destination.as_deref(), Some("20"));
    assert!(full.root.find(&["Data", "Data"]).is_some());

    for cut in 0..data.len() {
        let dissection = session.dissect(&registry, &config, &ByteCursor::from_slice(&data[..cut]));
        if cut < 8 {
            assert!(dissection.malformed);
        }
        let _ = dissection.render();
    }
    assert!(session.associations().is_empty());
}
