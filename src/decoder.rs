//! Decoding a framed record's bytes into the in-memory model.
//!
//! The decoder walks the directory of a [`RawRecord`](crate::raw_record::RawRecord)
//! buffer, slices the data area into control and data fields, splits data
//! fields into indicators and subfields, and converts field bytes to Unicode.
//! Every structural decision point consults the
//! [`ErrorHandler`](crate::error_handler::ErrorHandler): in permissive mode
//! anomalies are repaired and recorded, in strict mode the first major
//! anomaly aborts the record.
//!
//! Repairs applied in permissive mode:
//! - base address not pointing at the directory terminator → realigned to
//!   the first field terminator found
//! - directory region not a whole number of 12-byte entries → trailing
//!   partial entry dropped
//! - field length disagreeing with the field terminator position → the
//!   terminator wins
//! - non-digit tags, odd indicators, stray bytes before the first subfield
//!   delimiter → preserved or discarded with a diagnostic

use crate::encoding::{self, MarcEncoding};
use crate::error::{MarcError, Result};
use crate::error_handler::{ErrorHandler, Severity, NO_CONTEXT};
use crate::leader::Leader;
use crate::reader::ReaderConfig;
use crate::record::{DataField, Field, Record};

const RECORD_TERMINATOR: u8 = 0x1D;
const FIELD_TERMINATOR: u8 = 0x1E;
const SUBFIELD_DELIMITER: u8 = 0x1F;

/// Decode one record's bytes (leader through record terminator) into a
/// [`Record`].
///
/// # Errors
///
/// Returns an error when the leader is malformed, or when a `MajorError`
/// anomaly is reported in strict mode. Permissive mode only fails on
/// unusable structure (no directory terminator anywhere in the record).
pub(crate) fn decode_record(
    data: &[u8],
    config: &ReaderConfig,
    handler: &mut ErrorHandler,
) -> Result<Record> {
    if data.len() < 24 {
        return Err(MarcError::MalformedLeader(format!(
            "record of {} bytes is shorter than a leader",
            data.len()
        )));
    }
    let mut leader = Leader::from_bytes(&data[0..24])?;

    // After framing, the buffer length is the true record length.
    leader.record_length = u32::try_from(data.len()).unwrap_or(u32::MAX);

    // The data area ends before the record terminator when one is present.
    let data_end = data.len() - usize::from(data.last() == Some(&RECORD_TERMINATOR));

    let base = resolve_base_address(data, data_end, &leader, handler)?;
    leader.data_base_address = u32::try_from(base).unwrap_or(u32::MAX);

    let encoding = resolve_encoding(&data[base.min(data_end)..data_end], &leader, config, handler)?;

    if config.to_utf8 {
        leader.character_coding = 'a';
    }
    let mut record = Record::new(leader);

    let dir_end = base - 1;
    let mut entry = 24;
    while entry + 12 <= dir_end {
        let chunk = &data[entry..entry + 12];
        if chunk[0] == FIELD_TERMINATOR {
            break;
        }
        entry += 12;

        let tag = String::from_utf8_lossy(&chunk[0..3]).to_string();
        if !chunk[0..3].iter().all(u8::is_ascii_digit) {
            handler.report(
                Severity::MajorError,
                &tag,
                NO_CONTEXT,
                "Field tag is not three ASCII digits, preserving it literally",
            )?;
        }

        let Some(field_length) = ascii_number(&chunk[3..7]) else {
            handler.report(
                Severity::MajorError,
                &tag,
                NO_CONTEXT,
                "Field length in directory entry is not ASCII decimal, skipping field",
            )?;
            continue;
        };
        let Some(offset) = ascii_number(&chunk[7..12]) else {
            handler.report(
                Severity::MajorError,
                &tag,
                NO_CONTEXT,
                "Starting character position in directory entry is not ASCII decimal, skipping field",
            )?;
            continue;
        };

        let start = base + offset;
        let mut end = start + field_length;
        if start >= data_end {
            handler.report(
                Severity::MajorError,
                &tag,
                NO_CONTEXT,
                "Field data lies entirely outside the record, skipping field",
            )?;
            continue;
        }
        if end > data_end {
            handler.report(
                Severity::MinorError,
                &tag,
                NO_CONTEXT,
                "Field length in directory runs past the data area, truncating",
            )?;
            end = data_end;
        }

        let slice = &data[start..end];
        let field_data = match memchr::memchr(FIELD_TERMINATOR, slice) {
            Some(pos) if pos == slice.len() - 1 => &slice[..pos],
            Some(pos) => {
                // Directory length disagreement: the terminator wins.
                handler.report(
                    Severity::MinorError,
                    &tag,
                    NO_CONTEXT,
                    "Field length found in record different from length stated in the directory",
                )?;
                &slice[..pos]
            },
            None => {
                handler.report(
                    Severity::MajorError,
                    &tag,
                    NO_CONTEXT,
                    "Field terminator not found at end of field, using data as-is",
                )?;
                slice
            },
        };

        let field = if is_control_tag(&tag) {
            let value = convert_checked(field_data, encoding, &tag, NO_CONTEXT, handler)?;
            Field::control(tag, value)
        } else {
            Field::Data(decode_data_field(tag, field_data, encoding, handler)?)
        };
        record.add_field(field);
    }

    Ok(record)
}

/// Control fields are tags 001-009; everything else, including non-digit
/// tags preserved in permissive mode, decodes as a data field.
fn is_control_tag(tag: &str) -> bool {
    tag.parse::<u16>().is_ok_and(|n| (1..10).contains(&n))
}

/// Validate the stated base address of data, realigning it to the actual
/// directory terminator in permissive mode.
fn resolve_base_address(
    data: &[u8],
    data_end: usize,
    leader: &Leader,
    handler: &mut ErrorHandler,
) -> Result<usize> {
    let stated = leader.data_base_address as usize;

    // A minimum-size record (leader + record terminator) has an empty
    // directory with no terminator of its own; the record terminator sits
    // where the directory terminator would.
    let stated_ok = stated >= 25
        && stated <= data.len()
        && (data[stated - 1] == FIELD_TERMINATOR
            || (stated == data.len() && data[stated - 1] == RECORD_TERMINATOR));
    if stated_ok {
        if (stated - 25) % 12 != 0 {
            handler.report(
                Severity::MinorError,
                NO_CONTEXT,
                NO_CONTEXT,
                "Directory is not a whole number of 12-byte entries, dropping the partial entry",
            )?;
        }
        return Ok(stated);
    }

    handler.report(
        Severity::MajorError,
        NO_CONTEXT,
        NO_CONTEXT,
        "Base address of data does not point past a directory terminator",
    )?;

    // Permissive: realign to the first field terminator in the record.
    let Some(pos) = memchr::memchr(FIELD_TERMINATOR, &data[24..data_end]) else {
        return Err(MarcError::InvalidRecord(
            "no directory terminator found anywhere in the record".to_string(),
        ));
    };
    let corrected = 24 + pos + 1;
    handler.report(
        Severity::MinorError,
        NO_CONTEXT,
        NO_CONTEXT,
        format!("Base address of data corrected from {stated} to {corrected}"),
    )?;
    if (corrected - 25) % 12 != 0 {
        handler.report(
            Severity::MinorError,
            NO_CONTEXT,
            NO_CONTEXT,
            "Directory is not a whole number of 12-byte entries, dropping the partial entry",
        )?;
    }
    Ok(corrected)
}

/// Pick the encoding used for field data in this record.
///
/// The leader's coding scheme declares UTF-8 with `'a'` and MARC-8 with a
/// space; the configured default stands in for the space case. In
/// `BESTGUESS` mode the data area is decoded both ways and the cleaner
/// result wins, with a diagnostic when that contradicts the leader.
fn resolve_encoding(
    data_area: &[u8],
    leader: &Leader,
    config: &ReaderConfig,
    handler: &mut ErrorHandler,
) -> Result<MarcEncoding> {
    let declared = if leader.character_coding == 'a' {
        MarcEncoding::Utf8
    } else {
        config.default_encoding
    };

    if config.default_encoding != MarcEncoding::BestGuess {
        return Ok(declared);
    }

    let (guessed, _) = encoding::best_guess(data_area);
    let declared_leader = if leader.character_coding == 'a' {
        MarcEncoding::Utf8
    } else {
        MarcEncoding::Marc8
    };
    if guessed != declared_leader {
        handler.report(
            Severity::Info,
            NO_CONTEXT,
            NO_CONTEXT,
            format!("Leader declares {declared_leader} but content decodes as {guessed}, using {guessed}"),
        )?;
    }
    Ok(guessed)
}

/// Convert field bytes, reporting bytes that failed conversion.
fn convert_checked(
    bytes: &[u8],
    encoding: MarcEncoding,
    tag: &str,
    subfield: &str,
    handler: &mut ErrorHandler,
) -> Result<String> {
    let conversion = encoding::convert(bytes, encoding);
    if conversion.failed > 0 {
        handler.report(
            Severity::MajorError,
            tag,
            subfield,
            format!(
                "{} byte(s) could not be converted from {encoding}, replaced with U+FFFD",
                conversion.failed
            ),
        )?;
    }
    Ok(conversion.text)
}

/// Split a data field's bytes into indicators and subfields.
fn decode_data_field(
    tag: String,
    field_data: &[u8],
    encoding: MarcEncoding,
    handler: &mut ErrorHandler,
) -> Result<DataField> {
    // Zero-length fields are valid: blank indicators, no subfields.
    let (indicator1, indicator2) = match field_data.len() {
        0 => (' ', ' '),
        1 => {
            handler.report(
                Severity::MinorError,
                &tag,
                NO_CONTEXT,
                "Data field shorter than two indicator bytes",
            )?;
            (field_data[0] as char, ' ')
        },
        _ => (field_data[0] as char, field_data[1] as char),
    };

    for (position, indicator) in [(1, indicator1), (2, indicator2)] {
        if !(indicator == ' ' || indicator.is_ascii_digit()) {
            handler.report(
                Severity::MinorError,
                &tag,
                NO_CONTEXT,
                format!("Non-standard indicator {position} value {indicator:?}, preserved as-is"),
            )?;
        }
    }

    let mut field = DataField::new(tag.clone(), indicator1, indicator2);
    let rest: &[u8] = if field_data.len() > 2 {
        &field_data[2..]
    } else {
        &[]
    };

    let mut parts = rest.split(|&b| b == SUBFIELD_DELIMITER);
    if let Some(head) = parts.next() {
        if !head.is_empty() {
            handler.report(
                Severity::MinorError,
                &tag,
                NO_CONTEXT,
                "Data found between indicators and first subfield delimiter, discarding",
            )?;
        }
    }

    for part in parts {
        if part.is_empty() {
            handler.report(
                Severity::MinorError,
                &tag,
                NO_CONTEXT,
                "Subfield delimiter with no subfield code",
            )?;
            continue;
        }
        let code = part[0] as char;
        let value = convert_checked(&part[1..], encoding, &tag, &code.to_string(), handler)?;
        field.add_subfield(code, value);
    }

    Ok(field)
}

/// Parse an ASCII decimal run, `None` on any non-digit.
fn ascii_number(bytes: &[u8]) -> Option<usize> {
    let mut value = 0usize;
    for &byte in bytes {
        if byte.is_ascii_digit() {
            value = value * 10 + (byte - b'0') as usize;
        } else {
            return None;
        }
    }
    Some(value)
}
