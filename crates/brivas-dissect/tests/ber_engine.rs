//! BER Engine Integration Tests
//!
//! Header codec, schema walking, cardinality and containment through the
//! public decoding entry points

use brivas_dissect::ber::encode;
use brivas_dissect::ber::primitive::{
    decode_oid, dissect_bit_string, dissect_boolean, dissect_integer, dissect_octet_string,
};
use brivas_dissect::ber::{
    dissect_message, dissect_sequence, dissect_sequence_of, dissect_set, dissect_unknown, read_header, universal as u,
    DecodeContext, DecodeFn, FieldFlags as F, FieldSpec, TagClass,
};
use brivas_dissect::{BerOptions, ByteCursor, Dissection, ExpertKind, FieldNode, OidRegistry, Result, Value};
use bytes::BytesMut;

static RECORD_FIELDS: &[FieldSpec] = &[
    FieldSpec::universal("id", u::INTEGER, F::NONE, dissect_integer),
    FieldSpec::context("priority", 0, F::OPTIONAL_IMPLICIT, dissect_integer),
    FieldSpec::universal("enabled", u::BOOLEAN, F::OPTIONAL, dissect_boolean),
    FieldSpec::universal("payload", u::OCTET_STRING, F::NONE, dissect_octet_string),
];

fn dissect_record(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    dissect_sequence(implicit, ctx, tvb, offset, name, RECORD_FIELDS)
}

static RECORD: FieldSpec = FieldSpec::universal("Record", u::SEQUENCE, F::NONE, dissect_record);

fn dissect_records(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &RECORD, 1)
}

fn dissect_any_records(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    dissect_sequence_of(implicit, ctx, tvb, offset, name, &RECORD, 0)
}

static NEST_FIELDS: &[FieldSpec] = &[FieldSpec::universal("inner", u::SEQUENCE, F::OPTIONAL, dissect_nest)];

fn dissect_nest(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    dissect_sequence(implicit, ctx, tvb, offset, name, NEST_FIELDS)
}

fn record(priority: Option<i64>, enabled: Option<bool>) -> Vec<u8> {
    let mut parts = vec![encode::integer(42)];
    if let Some(p) = priority {
        parts.push(encode::implicit(0, &encode::integer(p)));
    }
    if let Some(e) = enabled {
        parts.push(encode::boolean(e));
    }
    parts.push(encode::octet_string(b"abc"));
    encode::sequence(&parts)
}

fn decode_with(options: BerOptions, name: &'static str, decoder: DecodeFn, data: &[u8]) -> Dissection {
    let registry = OidRegistry::new();
    dissect_message("TEST", &registry, options, &ByteCursor::from_slice(data), name, decoder)
}

fn decode(name: &'static str, decoder: DecodeFn, data: &[u8]) -> Dissection {
    decode_with(BerOptions::default(), name, decoder, data)
}

#[test]
fn test_header_round_trip() {
    let classes = [TagClass::Universal, TagClass::Application, TagClass::Context, TagClass::Private];
    let tags = [0u32, 1, 30, 31, 127, 128, 16_383, 16_384, 0x1F_FFFF, u32::MAX];
    let lengths = [0usize, 1, 127, 128, 255, 256, 65_535, 65_536, 1 << 24];

    for class in classes {
        for &tag in &tags {
            for &len in &lengths {
                for constructed in [false, true] {
                    let mut buf = BytesMut::new();
                    encode::encode_identifier(&mut buf, class, constructed, tag);
                    encode::encode_length(&mut buf, len);
                    let header_len = buf.len();
                    let header = read_header(&ByteCursor::from(buf.freeze()), 0).unwrap();
                    assert_eq!(header.class, class);
                    assert_eq!(header.constructed, constructed);
                    assert_eq!(header.tag, tag, "tag {} class {:?}", tag, class);
                    assert_eq!(header.definite_len(), Some(len));
                    assert_eq!(header.header_len, header_len);
                }
            }
        }
    }
}

#[test]
fn test_sequence_optionality() {
    for (priority, enabled) in [(None, None), (Some(3), None), (None, Some(true)), (Some(-1), Some(false))] {
        let data = record(priority, enabled);
        let dissection = decode("Record", dissect_record, &data);
        assert!(!dissection.malformed, "{:?} {:?}", priority, enabled);
        assert!(!dissection.root.has_errors());

        let root = &dissection.root;
        assert_eq!(root.length, data.len());
        assert_eq!(root.child("id").map(|n| &n.value), Some(&Value::Integer(42)));
        assert_eq!(root.child("priority").map(|n| n.value.clone()), priority.map(Value::Integer));
        assert_eq!(root.child("enabled").map(|n| n.value.clone()), enabled.map(Value::Boolean));
        assert!(root.child("payload").is_some());
    }
}

#[test]
fn test_missing_mandatory_field() {
    let data = encode::sequence(&[encode::integer(42), encode::boolean(true)]);
    let dissection = decode("Record", dissect_record, &data);
    assert!(dissection.malformed);
    assert_eq!(dissection.info, "Record [Malformed Packet]");
    assert!(dissection.root.has_expert(ExpertKind::MissingMandatoryField));

    let data = encode::sequence(&[encode::implicit(0, &encode::integer(1)), encode::octet_string(b"abc")]);
    let dissection = decode("Record", dissect_record, &data);
    assert!(dissection.malformed);
    assert!(dissection.root.has_expert(ExpertKind::MissingMandatoryField));
}

#[test]
fn test_unknown_trailing_element_is_an_extension() {
    let data = encode::sequence(&[encode::integer(42), encode::octet_string(b"x"), encode::null()]);
    let dissection = decode("Record", dissect_record, &data);
    assert!(!dissection.malformed);
    let unknown = dissection.root.child("unknown").unwrap();
    assert!(unknown.has_expert(ExpertKind::UnknownExtension));
    assert!(!dissection.root.has_errors());
}

#[test]
fn test_sequence_of_cardinality() {
    let empty = encode::sequence(&[]);
    let dissection = decode("Records", dissect_records, &empty);
    assert!(dissection.malformed);
    assert!(dissection.root.has_expert(ExpertKind::EmptySequence));

    let dissection = decode("Records", dissect_any_records, &empty);
    assert!(!dissection.malformed);
    assert!(dissection.root.children.is_empty());
    assert_eq!(dissection.root.suffix.as_deref(), Some("(0 items)"));

    let one = encode::sequence(&[record(None, None)]);
    let dissection = decode("Records", dissect_records, &one);
    assert!(!dissection.malformed);
    assert_eq!(dissection.root.suffix.as_deref(), Some("(1 item)"));

    let three = encode::sequence(&[record(None, None), record(Some(1), None), record(None, Some(true))]);
    let dissection = decode("Records", dissect_records, &three);
    assert_eq!(dissection.root.suffix.as_deref(), Some("(3 items)"));
    assert_eq!(dissection.root.children.iter().filter(|n| n.name == "Record").count(), 3);
}

#[test]
fn test_partial_item_keeps_decoded_fields() {
    let partial = encode::sequence(&[encode::integer(42)]);
    let data = encode::sequence(&[record(None, None), partial, record(None, None)]);
    let dissection = decode("Records", dissect_records, &data);
    assert!(dissection.malformed);
    assert_eq!(dissection.root.children.len(), 3);
    assert_eq!(dissection.root.suffix.as_deref(), Some("(3 items)"));

    let partial = &dissection.root.children[1];
    assert_eq!(partial.value, Value::Constructed);
    assert_eq!(partial.child("id").map(|n| &n.value), Some(&Value::Integer(42)));
    assert_eq!(partial.expert[0].kind, ExpertKind::MissingMandatoryField);
    assert!(!dissection.root.children[2].has_errors());
}

static ENVELOPE_FIELDS: &[FieldSpec] = &[
    FieldSpec::universal("inner", u::SEQUENCE, F::NONE, dissect_record),
    FieldSpec::universal("after", u::INTEGER, F::NONE, dissect_integer),
];

fn dissect_envelope(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    dissect_sequence(implicit, ctx, tvb, offset, name, ENVELOPE_FIELDS)
}

#[test]
fn test_nested_missing_field_keeps_partial_result() {
    let inner = encode::sequence(&[encode::integer(42)]);
    let data = encode::sequence(&[inner.clone(), encode::integer(7)]);
    let dissection = decode("Envelope", dissect_envelope, &data);
    assert!(dissection.malformed);
    assert_eq!(dissection.info, "Envelope [Malformed Packet]");

    let inner_node = dissection.root.child("inner").unwrap();
    assert_eq!(inner_node.length, inner.len());
    assert_eq!(inner_node.child("id").map(|n| &n.value), Some(&Value::Integer(42)));
    assert!(inner_node.child("payload").is_none());
    assert!(inner_node.expert.iter().any(|e| e.kind == ExpertKind::MissingMandatoryField));
    assert_eq!(dissection.root.child("after").map(|n| &n.value), Some(&Value::Integer(7)));
}

#[test]
fn test_out_of_order_element_is_kept_raw() {
    // payload where id belongs: the record stops there, the rest stays visible
    let inner = encode::sequence(&[encode::octet_string(b"abc"), encode::integer(42)]);
    let data = encode::sequence(&[inner, encode::integer(7)]);
    let dissection = decode("Envelope", dissect_envelope, &data);
    assert!(dissection.malformed);

    let inner_node = dissection.root.child("inner").unwrap();
    assert!(inner_node.child("id").is_none());
    assert_eq!(inner_node.child("unparsed").map(|n| n.length), Some(8));
    assert_eq!(dissection.root.child("after").map(|n| &n.value), Some(&Value::Integer(7)));
}

static OPTIONS_FIELDS: &[FieldSpec] = &[
    FieldSpec::untagged("any", F::OPTIONAL, dissect_unknown),
    FieldSpec::context("flags", 1, F::IMPLICIT, dissect_integer),
];

fn dissect_options(
    implicit: bool,
    ctx: &mut DecodeContext<'_>,
    tvb: &ByteCursor,
    offset: usize,
    name: &'static str,
) -> Result<(usize, FieldNode)> {
    dissect_set(implicit, ctx, tvb, offset, name, OPTIONS_FIELDS)
}

#[test]
fn test_set_prefers_tagged_members() {
    let data = encode::set(&[encode::implicit(1, &encode::integer(5)), encode::integer(9)]);
    let dissection = decode("Options", dissect_options, &data);
    assert!(!dissection.malformed);
    assert_eq!(dissection.root.child("flags").map(|n| &n.value), Some(&Value::Integer(5)));
    assert_eq!(dissection.root.child("any").map(|n| &n.value), Some(&Value::Integer(9)));

    let data = encode::set(&[encode::integer(9)]);
    let dissection = decode("Options", dissect_options, &data);
    assert!(dissection.malformed);
    assert!(dissection.root.child("any").is_some());
    assert!(dissection.root.has_expert(ExpertKind::MissingMandatoryField));
}

#[test]
fn test_oid_round_trip() {
    for dotted in [
        "0.0",
        "0.39",
        "1.3.6.1.5.5.7.48.1.1",
        "2.16.840.1.101.3.4.2.1",
        "1.2.840.113549.1.1.11",
        "2.5.4.3",
        "2.999.3",
        "1.3.6.1.4.1.311.21.7",
        "1.3.6.1.4.1.18446744073709551615",
    ] {
        let content = encode::oid_content(dotted).unwrap();
        assert_eq!(decode_oid(&content).as_deref(), Ok(dotted));
    }
    assert!(encode::oid_content("1.40").is_err());
    assert!(encode::oid_content("3.1").is_err());
    assert!(decode_oid(&[0x2A, 0x86]).is_err());
}

#[test]
fn test_bit_string_unused_bits() {
    for unused in 0u8..=7 {
        let data = encode::bit_string(unused, &[0xFF, 0xFF << unused]);
        let dissection = decode("bits", dissect_bit_string, &data);
        assert!(!dissection.malformed);
        match &dissection.root.value {
            Value::BitString { data, unused_bits, .. } => {
                assert_eq!(*unused_bits, unused);
                assert_eq!(data.len(), 2);
            }
            other => panic!("unexpected value {:?}", other),
        }
    }
    let dissection = decode("bits", dissect_bit_string, &encode::bit_string(3, &[0xA0]));
    let bits = dissection.root.value.bits().unwrap();
    assert_eq!(bits, "10100");
    assert_eq!(bits.trim_end_matches('0'), "101");

    let dissection = decode("bits", dissect_bit_string, &encode::bit_string(5, &[0x81, 0xFF]));
    assert_eq!(dissection.root.value.bits().as_deref(), Some("10000001111"));

    let dissection = decode("bits", dissect_bit_string, &encode::bit_string(8, &[0x00]));
    assert!(dissection.malformed);
    let dissection = decode("bits", dissect_bit_string, &encode::bit_string(1, &[]));
    assert!(dissection.malformed);
}

#[test]
fn test_truncated_prefixes_are_flagged() {
    let data = encode::sequence(&[record(Some(7), Some(true)), record(None, None)]);
    for cut in 0..data.len() {
        let dissection = decode("Records", dissect_records, &data[..cut]);
        assert!(dissection.malformed, "prefix of {} bytes", cut);
        assert!(dissection.root.has_errors());
        assert_eq!(dissection.root.length, cut);
        let _ = dissection.render();
    }
    assert!(!decode("Records", dissect_records, &data).malformed);
}

#[test]
fn test_trailing_data_is_noted() {
    let mut data = record(None, None);
    data.extend_from_slice(&[0, 0, 0]);
    let dissection = decode("Record", dissect_record, &data);
    assert!(!dissection.malformed);
    assert!(dissection.root.has_expert(ExpertKind::TrailingData));
}

#[test]
fn test_recursion_budget() {
    let nested = |levels: usize| {
        let mut data = encode::sequence(&[]);
        for _ in 0..levels {
            data = encode::sequence(&[data]);
        }
        data
    };
    let options = BerOptions {
        max_depth: 8,
        strict_boolean: false,
    };

    let shallow = decode_with(options, "Nest", dissect_nest, &nested(5));
    assert!(!shallow.malformed);

    let deep = decode_with(options, "Nest", dissect_nest, &nested(40));
    assert!(deep.malformed);
    assert!(deep.root.has_expert(ExpertKind::RecursionBudgetExceeded));

    let default_budget = decode("Nest", dissect_nest, &nested(200));
    assert!(default_budget.root.has_expert(ExpertKind::RecursionBudgetExceeded));
}
