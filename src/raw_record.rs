//! Record framing: extracting one record's bytes from a stream.
//!
//! ISO 2709 records declare their own length in the first five leader bytes,
//! and real-world files routinely get it wrong: the record terminator shows
//! up early, late, or not at all, and streams truncate mid-record. A
//! [`RawRecord`] is the result of framing one record despite all of that:
//! an opaque byte buffer running from the leader through the record
//! terminator, plus the record's control number pulled straight out of the
//! raw bytes.
//!
//! Framing trusts the terminator over the stated length. When the two
//! disagree in permissive mode the buffer is truncated or extended to the
//! terminator and a diagnostic is recorded; in strict mode the disagreement
//! is an error and the caller decides whether to resynchronize.

use crate::byte_stream::ByteStream;
use crate::decoder;
use crate::error::{MarcError, Result};
use crate::error_handler::{ErrorHandler, Severity, NO_CONTEXT};
use crate::reader::ReaderConfig;
use crate::record::Record;

const RECORD_TERMINATOR: u8 = 0x1D;
const FIELD_TERMINATOR: u8 = 0x1E;

/// One record's bytes, leader through record terminator, plus its cached id.
///
/// The buffer is immutable after extraction. The id is the trimmed data of
/// the "001" field, located by walking the directory structurally without
/// decoding the rest of the record.
#[derive(Debug, Clone)]
pub struct RawRecord {
    data: Vec<u8>,
    id: Option<String>,
}

impl RawRecord {
    /// Wrap an already-framed record buffer, computing its id.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        let id = field_value_from_bytes(&data, "001");
        RawRecord { data, id }
    }

    /// Extract the next record's bytes from `stream`.
    ///
    /// Returns `Ok(None)` on a clean end of stream (no bytes before EOF).
    /// In permissive mode, length/terminator disagreements are repaired and
    /// reported to `handler`; in strict mode they surface as errors. Either
    /// way the stream is left positioned at the byte after the last one
    /// consumed, so a caller can resynchronize by scanning to the next
    /// record terminator.
    ///
    /// # Errors
    ///
    /// - [`MarcError::TruncatedLeader`] — stream ended inside the leader
    /// - [`MarcError::MalformedLeader`] — non-digit record length
    /// - [`MarcError::StatedLengthTooLong`] — terminator before the stated
    ///   length, strict mode only
    /// - [`MarcError::MissingTerminator`] — no terminator within the stated
    ///   length (strict mode) or before the stream ended (either mode)
    /// - [`MarcError::UnexpectedEof`] — stream ended mid-record with no
    ///   recoverable frame
    pub fn from_stream<S: ByteStream + ?Sized>(
        stream: &mut S,
        handler: &mut ErrorHandler,
    ) -> Result<Option<RawRecord>> {
        stream.mark(24);

        let mut leader = [0u8; 24];
        let mut got = 0;
        while got < 24 {
            match stream.read_byte()? {
                Some(b) => {
                    leader[got] = b;
                    got += 1;
                },
                None => break,
            }
        }
        if got == 0 {
            return Ok(None);
        }
        if got < 24 {
            return Err(MarcError::TruncatedLeader(format!(
                "stream ended after {got} of 24 leader bytes"
            )));
        }

        let length = match parse_record_length(&leader) {
            Ok(length) => length,
            Err(e) => {
                // Rewind so the caller's resynchronization scan starts at
                // this record's first byte, not 24 bytes in.
                stream.reset()?;
                return Err(e);
            },
        };

        stream.reset()?;
        stream.mark(length * 2);
        let mut buf = vec![0u8; length];

        match stream.read_exact(&mut buf) {
            Ok(()) => {},
            Err(MarcError::UnexpectedEof(_)) => {
                return Self::recover_truncated(stream, handler, length);
            },
            Err(e) => return Err(e),
        }

        if buf[length - 1] == RECORD_TERMINATOR {
            return Ok(Some(RawRecord::new(buf)));
        }

        match memchr::memchr(RECORD_TERMINATOR, &buf) {
            Some(pos) => {
                // Terminator before the stated length: the length overshoots.
                if !handler.is_permissive() {
                    return Err(MarcError::StatedLengthTooLong(format!(
                        "record terminator at offset {pos}, stated length {length}"
                    )));
                }
                handler.report(
                    Severity::Typo,
                    NO_CONTEXT,
                    NO_CONTEXT,
                    "Record terminator appears before stated record length, truncating",
                )?;
                stream.reset()?;
                let mut shorter = vec![0u8; pos + 1];
                stream.read_exact(&mut shorter)?;
                Ok(Some(RawRecord::new(shorter)))
            },
            None => {
                // No terminator within the stated length: read on until one
                // shows up or the stream ends.
                if !handler.is_permissive() {
                    return Err(MarcError::MissingTerminator(format!(
                        "no record terminator within stated length {length}"
                    )));
                }
                loop {
                    match stream.read_byte()? {
                        Some(b) => {
                            buf.push(b);
                            if b == RECORD_TERMINATOR {
                                break;
                            }
                        },
                        None => {
                            return Err(MarcError::MissingTerminator(format!(
                                "stream ended after {} bytes with no record terminator",
                                buf.len()
                            )));
                        },
                    }
                }
                handler.report(
                    Severity::Typo,
                    NO_CONTEXT,
                    NO_CONTEXT,
                    "Record terminator appears after stated record length, reading extra bytes",
                )?;
                Ok(Some(RawRecord::new(buf)))
            },
        }
    }

    /// The stream ended before the stated length. Re-read what is actually
    /// there; a record terminator inside it means the stated length simply
    /// overshot the end of the stream.
    fn recover_truncated<S: ByteStream + ?Sized>(
        stream: &mut S,
        handler: &mut ErrorHandler,
        length: usize,
    ) -> Result<Option<RawRecord>> {
        if !handler.is_permissive() {
            return Err(MarcError::UnexpectedEof(format!(
                "stream ended before stated record length {length}"
            )));
        }

        stream.reset()?;
        let mut partial = Vec::with_capacity(length);
        while let Some(b) = stream.read_byte()? {
            partial.push(b);
            if partial.len() == length {
                break;
            }
        }

        match memchr::memchr(RECORD_TERMINATOR, &partial) {
            Some(pos) => {
                partial.truncate(pos + 1);
                handler.report(
                    Severity::MinorError,
                    NO_CONTEXT,
                    NO_CONTEXT,
                    "Stream ended before stated record length, truncating at record terminator",
                )?;
                Ok(Some(RawRecord::new(partial)))
            },
            None => Err(MarcError::UnexpectedEof(format!(
                "stream ended after {} of {length} stated bytes, no record terminator",
                partial.len()
            ))),
        }
    }

    /// Combine two raw records into one buffer, `first` then `second`.
    ///
    /// The id of the combined record is the id of `first` (its leader and
    /// directory open the combined buffer).
    #[must_use]
    pub fn combine(first: &RawRecord, second: &RawRecord) -> RawRecord {
        let mut data = Vec::with_capacity(first.data.len() + second.data.len());
        data.extend_from_slice(&first.data);
        data.extend_from_slice(&second.data);
        RawRecord::new(data)
    }

    /// The record bytes, leader through record terminator.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the record, returning its byte buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// The record id: trimmed data of the "001" field, or `None` if absent.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The trimmed value of the first field with `tag`, located by walking
    /// the directory over the raw bytes.
    #[must_use]
    pub fn field_value(&self, tag: &str) -> Option<String> {
        field_value_from_bytes(&self.data, tag)
    }

    /// Decode this raw record into a [`Record`].
    ///
    /// # Errors
    ///
    /// Propagates decoding failures: a malformed leader, or a major
    /// structural anomaly when `handler` is strict.
    pub fn to_record(&self, config: &ReaderConfig, handler: &mut ErrorHandler) -> Result<Record> {
        decoder::decode_record(&self.data, config, handler)
    }
}

/// Parse the stated record length from the first five leader bytes.
fn parse_record_length(leader: &[u8; 24]) -> Result<usize> {
    let mut length = 0usize;
    for &byte in &leader[0..5] {
        if byte.is_ascii_digit() {
            length = length * 10 + (byte - b'0') as usize;
        } else {
            return Err(MarcError::MalformedLeader(format!(
                "Non-digit byte 0x{byte:02X} in record length"
            )));
        }
    }
    if length < 24 {
        return Err(MarcError::MalformedLeader(format!(
            "Record length must be at least 24, got {length}"
        )));
    }
    Ok(length)
}

/// Structural walk for a field's value over raw record bytes.
///
/// The leader's base address and the directory are pure ASCII digits, so no
/// string materialization is needed: read the base address, step 12-byte
/// directory entries until the directory terminator, and slice the data area
/// directly. Returns `None` on any structural inconsistency.
fn field_value_from_bytes(data: &[u8], tag: &str) -> Option<String> {
    let tag = tag.as_bytes();
    if tag.len() != 3 || data.len() < 24 {
        return None;
    }

    let base = ascii_number(&data[12..17])?;
    if base < 25 || base > data.len() {
        return None;
    }

    let mut entry = 24;
    while entry + 12 <= base - 1 {
        let chunk = &data[entry..entry + 12];
        if chunk[0] == FIELD_TERMINATOR {
            break;
        }
        if &chunk[0..3] == tag {
            let length = ascii_number(&chunk[3..7])?;
            let offset = ascii_number(&chunk[7..12])?;
            let start = base.checked_add(offset)?;
            // The stated field length includes the field terminator.
            let end = start.checked_add(length.checked_sub(1)?)?;
            if end > data.len() || start > end {
                return None;
            }
            let text = String::from_utf8_lossy(&data[start..end]);
            return Some(text.trim().to_string());
        }
        entry += 12;
    }
    None
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_stream::BufferedByteStream;
    use std::io::Cursor;

    /// Assemble a minimal one-control-field record, 50 bytes total:
    /// leader + `001` directory entry + space-padded data `12345`.
    fn simple_record() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"00050cam a2200037 a 4500");
        bytes.extend_from_slice(b"001001200000");
        bytes.push(FIELD_TERMINATOR);
        bytes.extend_from_slice(b"12345      ");
        bytes.push(FIELD_TERMINATOR);
        bytes.push(RECORD_TERMINATOR);
        assert_eq!(bytes.len(), 50);
        bytes
    }

    fn extract(
        bytes: &[u8],
        permissive: bool,
    ) -> (Result<Option<RawRecord>>, ErrorHandler) {
        let mut stream = BufferedByteStream::new(Cursor::new(bytes.to_vec()));
        let mut handler = ErrorHandler::new(permissive);
        let result = RawRecord::from_stream(&mut stream, &mut handler);
        (result, handler)
    }

    #[test]
    fn test_clean_record() {
        let (result, handler) = extract(&simple_record(), false);
        let raw = result.unwrap().unwrap();
        assert_eq!(raw.bytes().len(), 50);
        assert_eq!(raw.id(), Some("12345"));
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_empty_stream_is_clean_end() {
        let (result, _) = extract(&[], true);
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_truncated_leader() {
        let (result, _) = extract(b"00050cam", true);
        assert!(matches!(result, Err(MarcError::TruncatedLeader(_))));
    }

    #[test]
    fn test_non_digit_length_is_malformed_leader() {
        let mut bytes = simple_record();
        bytes[2] = b'x';
        let (result, _) = extract(&bytes, true);
        assert!(matches!(result, Err(MarcError::MalformedLeader(_))));
    }

    #[test]
    fn test_stated_length_too_long() {
        // Stated length 51, actual record still 50 bytes with an extra byte
        // after the terminator.
        let mut bytes = simple_record();
        bytes[4] = b'1';
        bytes.push(b'X');

        let (result, handler) = extract(&bytes, true);
        let raw = result.unwrap().unwrap();
        assert_eq!(raw.bytes().len(), 50);
        assert_eq!(raw.id(), Some("12345"));
        assert_eq!(handler.errors().len(), 1);
        assert_eq!(handler.errors()[0].severity, Severity::Typo);

        let (result, _) = extract(&bytes, false);
        assert!(matches!(result, Err(MarcError::StatedLengthTooLong(_))));
    }

    #[test]
    fn test_stated_length_too_short() {
        // Stated length 48: terminator lies beyond it.
        let mut bytes = simple_record();
        bytes[3] = b'4';
        bytes[4] = b'8';

        let (result, handler) = extract(&bytes, true);
        let raw = result.unwrap().unwrap();
        assert_eq!(raw.bytes().len(), 50);
        assert!(raw.bytes().ends_with(&[RECORD_TERMINATOR]));
        assert_eq!(handler.errors().len(), 1);

        let (result, _) = extract(&bytes, false);
        assert!(matches!(result, Err(MarcError::MissingTerminator(_))));
    }

    #[test]
    fn test_missing_terminator_at_eof() {
        let mut bytes = simple_record();
        *bytes.last_mut().unwrap() = FIELD_TERMINATOR;

        let (result, _) = extract(&bytes, true);
        assert!(matches!(result, Err(MarcError::MissingTerminator(_))));

        let (result, _) = extract(&bytes, false);
        assert!(matches!(result, Err(MarcError::MissingTerminator(_))));
    }

    #[test]
    fn test_truncated_stream_with_recoverable_frame() {
        // Stated length 500, actual complete record is 50 bytes, then EOF.
        let mut bytes = simple_record();
        bytes[0..5].copy_from_slice(b"00500");

        let (result, handler) = extract(&bytes, true);
        let raw = result.unwrap().unwrap();
        assert_eq!(raw.bytes().len(), 50);
        assert!(handler.has_errors());

        // Strict mode refuses to salvage.
        let (result, _) = extract(&bytes, false);
        assert!(matches!(result, Err(MarcError::UnexpectedEof(_))));
    }

    #[test]
    fn test_truncated_stream_without_terminator() {
        // Cut the record off mid-data, before any record terminator.
        let mut bytes = simple_record();
        bytes.truncate(40);

        let (result, _) = extract(&bytes, true);
        assert!(matches!(result, Err(MarcError::UnexpectedEof(_))));
    }

    #[test]
    fn test_minimum_size_record() {
        // Leader plus record terminator only: stated length 25, base 25.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"00025cam a2200025 a 4500");
        bytes.push(RECORD_TERMINATOR);

        let (result, handler) = extract(&bytes, false);
        let raw = result.unwrap().unwrap();
        assert_eq!(raw.bytes().len(), 25);
        assert_eq!(raw.id(), None);
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_field_value_walk() {
        let raw = RawRecord::new(simple_record());
        assert_eq!(raw.field_value("001"), Some("12345".to_string()));
        assert_eq!(raw.field_value("245"), None);
    }

    #[test]
    fn test_combine_concatenates_and_keeps_first_id() {
        let a = RawRecord::new(simple_record());
        let mut second = simple_record();
        // Change the second record's control number in place; the data area
        // starts at the base address, byte 37.
        second[37..42].copy_from_slice(b"99999");
        let b = RawRecord::new(second);
        assert_eq!(b.id(), Some("99999"));

        let combined = RawRecord::combine(&a, &b);
        assert_eq!(combined.bytes().len(), a.bytes().len() + b.bytes().len());
        assert!(combined.bytes().starts_with(a.bytes()));
        assert!(combined.bytes().ends_with(b.bytes()));
        assert_eq!(combined.id(), Some("12345"));
    }

    #[test]
    fn test_stream_position_after_record() {
        // Two records back to back: after extracting the first, the second
        // must start exactly at the stream position.
        let mut bytes = simple_record();
        bytes.extend_from_slice(&simple_record());

        let mut stream = BufferedByteStream::new(Cursor::new(bytes));
        let mut handler = ErrorHandler::new(false);

        let first = RawRecord::from_stream(&mut stream, &mut handler)
            .unwrap()
            .unwrap();
        let second = RawRecord::from_stream(&mut stream, &mut handler)
            .unwrap()
            .unwrap();
        assert_eq!(first.bytes(), second.bytes());
        assert!(RawRecord::from_stream(&mut stream, &mut handler)
            .unwrap()
            .is_none());
    }
}
