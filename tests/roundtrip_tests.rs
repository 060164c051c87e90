//! Round-trip and invariant tests: decode(encode(record)) preserves the
//! record, lengths agree with buffers, and raw and decoded views of the
//! "001" field coincide.

mod common;

use common::{minimal_record, summerland, RECORD_TERMINATOR};
use permarc::{
    DataField, ErrorHandler, Field, Leader, MarcWriter, PermissiveMarcReader, RawRecord, Record,
    ReaderConfig,
};
use std::io::Cursor;

fn write_to_bytes(record: &Record) -> Vec<u8> {
    let mut buffer = Vec::new();
    MarcWriter::new(&mut buffer).write_record(record).unwrap();
    buffer
}

fn read_one(bytes: Vec<u8>) -> Record {
    PermissiveMarcReader::new(Cursor::new(bytes))
        .next_record()
        .unwrap()
}

#[test]
fn decode_encode_decode_is_stable() {
    let original = read_one(summerland());
    let rewritten = write_to_bytes(&original);
    let restored = read_one(rewritten);

    assert_eq!(original.control_number(), restored.control_number());
    assert_eq!(
        original.all_fields().count(),
        restored.all_fields().count()
    );
    for (a, b) in original.all_fields().zip(restored.all_fields()) {
        assert_eq!(a, b);
    }
    assert_eq!(original.to_string(), restored.to_string());
}

#[test]
fn built_record_roundtrips() {
    let mut record = Record::new(Leader::default());
    record.add_field(Field::control("001", "ocm123"));
    record.add_field(Field::control("008", "020805s2002"));
    let mut field = DataField::new("650", ' ', '1');
    field.add_subfield('a', "Baseball");
    field.add_subfield('v', "Fiction.");
    record.add_field(Field::Data(field));

    let restored = read_one(write_to_bytes(&record));
    assert_eq!(restored.control_number(), Some("ocm123"));
    let f650 = restored.get_field("650").unwrap().as_data().unwrap();
    assert_eq!(f650.get_subfield('v'), Some("Fiction."));
    assert_eq!(restored.to_string().lines().count(), 4);
}

#[test]
fn written_length_and_terminator_invariants() {
    let record = read_one(summerland());
    let bytes = write_to_bytes(&record);

    // Leader length equals buffer length; buffer ends with the terminator.
    let leader = Leader::from_bytes(&bytes[0..24]).unwrap();
    assert_eq!(leader.record_length as usize, bytes.len());
    assert_eq!(*bytes.last().unwrap(), RECORD_TERMINATOR);

    // Reading the buffer back preserves the length invariant in the model.
    let reread = read_one(bytes.clone());
    assert_eq!(reread.leader.record_length as usize, bytes.len());
}

#[test]
fn raw_and_decoded_identifiers_agree() {
    let raw = RawRecord::new(summerland());
    let mut handler = ErrorHandler::new(false);
    let record = raw.to_record(&ReaderConfig::default(), &mut handler).unwrap();

    assert_eq!(raw.id(), record.control_number());
    assert_eq!(raw.id(), Some("12883376"));
}

#[test]
fn identifier_empty_without_control_number() {
    let bytes = PermissiveMarcReader::new(Cursor::new(minimal_record("77")))
        .next_record()
        .map(|record| {
            let mut without = Record::new(record.leader.clone());
            for field in record.all_fields() {
                if field.tag() != "001" {
                    without.add_field(field.clone());
                }
            }
            write_to_bytes(&without)
        })
        .unwrap();

    let raw = RawRecord::new(bytes);
    assert_eq!(raw.id(), None);
}

#[test]
fn high_byte_indicator_and_code_roundtrip() {
    // An indicator byte and a subfield code in 0x80..=0xFF are preserved
    // verbatim, occupy exactly one byte on the wire, and survive
    // decode -> encode -> decode byte for byte.
    let mut body = vec![0xB5, b'0', 0x1F, 0xE9];
    body.extend_from_slice(b"abc");
    body.push(0x1E);

    let mut directory = Vec::new();
    directory.extend_from_slice(b"886");
    directory.extend_from_slice(format!("{:04}", body.len()).as_bytes());
    directory.extend_from_slice(b"00000");
    directory.push(0x1E);

    let base = 24 + directory.len();
    let record_length = base + body.len() + 1;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(format!("{record_length:05}").as_bytes());
    bytes.extend_from_slice(b"cam a22");
    bytes.extend_from_slice(format!("{base:05}").as_bytes());
    bytes.extend_from_slice(b" a 4500");
    bytes.extend_from_slice(&directory);
    bytes.extend_from_slice(&body);
    bytes.push(RECORD_TERMINATOR);

    let mut handler = ErrorHandler::new(true);
    let record = RawRecord::new(bytes.clone())
        .to_record(&ReaderConfig::default(), &mut handler)
        .unwrap();

    let field = record.get_field("886").unwrap().as_data().unwrap();
    assert_eq!(field.indicator1, '\u{B5}');
    assert_eq!(field.indicator2, '0');
    assert_eq!(field.subfields[0].code, '\u{E9}');
    assert_eq!(field.subfields[0].value, "abc");

    let rewritten = write_to_bytes(&record);
    assert_eq!(rewritten, bytes);

    let restored = read_one(rewritten);
    assert_eq!(record, restored);
}

#[test]
fn combine_preserves_bytes_and_first_id() {
    let a = RawRecord::new(summerland());
    let b = RawRecord::new(minimal_record("999"));

    let combined = RawRecord::combine(&a, &b);
    let mut expected = a.bytes().to_vec();
    expected.extend_from_slice(b.bytes());
    assert_eq!(combined.bytes(), expected.as_slice());
    assert_eq!(combined.id(), a.id());
}

#[test]
fn control_number_uniqueness_survives_roundtrip() {
    let mut record = Record::new(Leader::default());
    record.add_field(Field::control("001", "first"));
    record.add_field(Field::control("001", "second"));

    let restored = read_one(write_to_bytes(&record));
    assert_eq!(restored.get_fields("001").len(), 1);
    assert_eq!(restored.control_number(), Some("second"));
    assert_eq!(restored.all_fields().next().unwrap().tag(), "001");
}
