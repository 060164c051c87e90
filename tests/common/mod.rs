//! Common test helpers shared across the test suites.
//!
//! Records are assembled byte by byte so the suites control exactly what the
//! reader sees, including deliberately broken structure.
#![allow(dead_code)] // each suite uses a different subset of the helpers

pub const FIELD_TERMINATOR: u8 = 0x1E;
pub const SUBFIELD_DELIMITER: u8 = 0x1F;
pub const RECORD_TERMINATOR: u8 = 0x1D;

/// A control field as (tag, value).
pub type ControlSpec<'a> = (&'a str, &'a str);

/// A data field as (tag, indicators, subfields).
pub type DataSpec<'a> = (&'a str, &'a str, &'a [(char, &'a str)]);

/// Assemble one well-formed ISO 2709 record.
///
/// The leader declares UTF-8 ('a' at position 9) and the computed record
/// length and base address.
#[must_use]
pub fn build_record(control: &[ControlSpec<'_>], data: &[DataSpec<'_>]) -> Vec<u8> {
    let mut directory = Vec::new();
    let mut data_area = Vec::new();

    let mut push_field = |tag: &str, body: &[u8]| {
        let length = body.len() + 1;
        directory.extend_from_slice(tag.as_bytes());
        directory.extend_from_slice(format!("{length:04}").as_bytes());
        directory.extend_from_slice(format!("{:05}", data_area.len()).as_bytes());
        data_area.extend_from_slice(body);
        data_area.push(FIELD_TERMINATOR);
    };

    for (tag, value) in control {
        push_field(tag, value.as_bytes());
    }
    for (tag, indicators, subfields) in data {
        let mut body = indicators.as_bytes().to_vec();
        for (code, value) in *subfields {
            body.push(SUBFIELD_DELIMITER);
            body.push(*code as u8);
            body.extend_from_slice(value.as_bytes());
        }
        push_field(tag, &body);
    }
    directory.push(FIELD_TERMINATOR);

    let base = 24 + directory.len();
    let record_length = base + data_area.len() + 1;
    assert!(record_length <= 99_999, "test record too large");

    let mut bytes = Vec::new();
    bytes.extend_from_slice(format!("{record_length:05}").as_bytes());
    bytes.extend_from_slice(b"cam a22");
    bytes.extend_from_slice(format!("{base:05}").as_bytes());
    bytes.extend_from_slice(b" a 4500");
    assert_eq!(bytes.len(), 24);
    bytes.extend_from_slice(&directory);
    bytes.extend_from_slice(&data_area);
    bytes.push(RECORD_TERMINATOR);
    bytes
}

/// The Summerland record used throughout the suites.
#[must_use]
pub fn summerland() -> Vec<u8> {
    build_record(
        &[
            ("001", "12883376"),
            ("005", "20030616111422.0"),
            ("008", "020805s2002    nyu    j      000 1 eng"),
        ],
        &[
            ("020", "  ", &[('a', "0786808772")]),
            ("100", "1 ", &[('a', "Chabon, Michael.")]),
            (
                "245",
                "10",
                &[('a', "Summerland /"), ('c', "Michael Chabon.")],
            ),
            ("650", " 1", &[('a', "Fantasy.")]),
            ("650", " 1", &[('a', "Baseball"), ('v', "Fiction.")]),
        ],
    )
}

/// A tiny record holding just a control number.
#[must_use]
pub fn minimal_record(control_number: &str) -> Vec<u8> {
    build_record(&[("001", control_number)], &[])
}
