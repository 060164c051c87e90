//! Writing MARC records to binary format.
//!
//! This module provides [`MarcWriter`] for serializing [`Record`] instances
//! to ISO 2709 binary format that can be written to any destination
//! implementing [`std::io::Write`]. Field data is written as UTF-8; the
//! record length and base address in the leader are recomputed from the
//! actual field lists, so a record read permissively (with a repaired
//! length) serializes with a consistent leader.
//!
//! # Examples
//!
//! ```
//! use permarc::{Field, Leader, MarcWriter, Record};
//!
//! let mut record = Record::new(Leader::default());
//! record.add_field(Field::control("001", "12345"));
//!
//! let mut buffer = Vec::new();
//! {
//!     let mut writer = MarcWriter::new(&mut buffer);
//!     writer.write_record(&record)?;
//! }
//! assert_eq!(*buffer.last().unwrap(), 0x1D);
//! # Ok::<(), permarc::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::record::{Field, Record};
use std::io::Write;

const FIELD_TERMINATOR: u8 = 0x1E;
const SUBFIELD_DELIMITER: u8 = 0x1F;
const RECORD_TERMINATOR: u8 = 0x1D;

/// Writer for ISO 2709 binary MARC format.
///
/// Records are written one at a time to any destination implementing
/// [`std::io::Write`], control fields first and data fields after, each in
/// record order.
#[derive(Debug)]
pub struct MarcWriter<W: Write> {
    writer: W,
    records_written: usize,
}

impl<W: Write> MarcWriter<W> {
    /// Create a new MARC writer.
    pub fn new(writer: W) -> Self {
        MarcWriter {
            writer,
            records_written: 0,
        }
    }

    /// Serialize one record.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is too large for its 4-digit directory
    /// length, the record exceeds the 5-digit record length, or an I/O error
    /// occurs.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let mut directory = Vec::new();
        let mut data_area = Vec::new();

        for field in record.all_fields() {
            let body = field_body(field);
            push_entry(&mut directory, field.tag(), &body, data_area.len())?;
            data_area.extend_from_slice(&body);
        }
        directory.push(FIELD_TERMINATOR);

        let base_address = 24 + directory.len();
        let record_length = base_address + data_area.len() + 1;
        if record_length > 99_999 {
            return Err(MarcError::InvalidRecord(format!(
                "record length {record_length} exceeds the 5-digit ISO 2709 limit"
            )));
        }

        let mut leader = record.leader.clone();
        leader.record_length = u32::try_from(record_length)
            .map_err(|_| MarcError::InvalidRecord("record length overflow".to_string()))?;
        leader.data_base_address = u32::try_from(base_address)
            .map_err(|_| MarcError::InvalidRecord("base address overflow".to_string()))?;

        self.writer.write_all(&leader.as_bytes()?)?;
        self.writer.write_all(&directory)?;
        self.writer.write_all(&data_area)?;
        self.writer.write_all(&[RECORD_TERMINATOR])?;

        self.records_written += 1;
        Ok(())
    }

    /// Number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// A field's data-area bytes, including its field terminator.
///
/// Indicators and subfield codes occupy exactly one byte on the wire; the
/// decoder widens them with `byte as char`, so the cast back to `u8` here is
/// the exact inverse, including for preserved non-standard bytes above 0x7F.
fn field_body(field: &Field) -> Vec<u8> {
    let mut body = Vec::new();
    match field {
        Field::Control(f) => {
            body.extend_from_slice(f.data.as_bytes());
        },
        Field::Data(f) => {
            body.push(f.indicator1 as u8);
            body.push(f.indicator2 as u8);
            for sf in &f.subfields {
                body.push(SUBFIELD_DELIMITER);
                body.push(sf.code as u8);
                body.extend_from_slice(sf.value.as_bytes());
            }
        },
    }
    body.push(FIELD_TERMINATOR);
    body
}

fn push_entry(directory: &mut Vec<u8>, tag: &str, body: &[u8], position: usize) -> Result<()> {
    if tag.len() != 3 {
        return Err(MarcError::InvalidField(format!(
            "tag {tag:?} is not 3 characters"
        )));
    }
    if body.len() > 9_999 {
        return Err(MarcError::InvalidField(format!(
            "field {tag} is {} bytes, over the 4-digit directory limit",
            body.len()
        )));
    }
    if position > 99_999 {
        return Err(MarcError::InvalidRecord(format!(
            "field {tag} starts at {position}, over the 5-digit directory limit"
        )));
    }
    directory.extend_from_slice(tag.as_bytes());
    directory.extend_from_slice(format!("{:04}", body.len()).as_bytes());
    directory.extend_from_slice(format!("{position:05}").as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::Leader;
    use crate::record::DataField;

    fn sample_record() -> Record {
        let mut record = Record::new(Leader::default());
        record.add_field(Field::control("001", "12883376"));
        let mut title = DataField::new("245", '1', '0');
        title.add_subfield('a', "Summerland /");
        title.add_subfield('c', "Michael Chabon.");
        record.add_field(Field::Data(title));
        record
    }

    #[test]
    fn test_written_record_structure() {
        let mut buffer = Vec::new();
        MarcWriter::new(&mut buffer)
            .write_record(&sample_record())
            .unwrap();

        // Leader states the actual byte length and base address.
        let leader = Leader::from_bytes(&buffer[0..24]).unwrap();
        assert_eq!(leader.record_length as usize, buffer.len());
        assert_eq!(buffer[leader.data_base_address as usize - 1], FIELD_TERMINATOR);
        assert_eq!(*buffer.last().unwrap(), RECORD_TERMINATOR);
    }

    #[test]
    fn test_control_fields_precede_data_fields() {
        let mut buffer = Vec::new();
        MarcWriter::new(&mut buffer)
            .write_record(&sample_record())
            .unwrap();

        // First directory entry is the 001.
        assert_eq!(&buffer[24..27], b"001");
        assert_eq!(&buffer[36..39], b"245");
    }

    #[test]
    fn test_oversized_field_is_rejected() {
        let mut record = Record::new(Leader::default());
        let mut field = DataField::new("520", ' ', ' ');
        field.add_subfield('a', "x".repeat(10_000));
        record.add_field(Field::Data(field));

        let mut buffer = Vec::new();
        let result = MarcWriter::new(&mut buffer).write_record(&record);
        assert!(matches!(result, Err(MarcError::InvalidField(_))));
    }

    #[test]
    fn test_high_byte_indicators_and_codes_stay_single_bytes() {
        // Non-standard indicator and subfield-code bytes above 0x7F are
        // preserved verbatim at decode time and must serialize back to
        // exactly one byte each, not their UTF-8 encoding.
        let mut record = Record::new(Leader::default());
        let mut field = DataField::new("886", '\u{B5}', '0');
        field.add_subfield('\u{E9}', "x");
        record.add_field(Field::Data(field));

        let mut buffer = Vec::new();
        MarcWriter::new(&mut buffer).write_record(&record).unwrap();

        let leader = Leader::from_bytes(&buffer[0..24]).unwrap();
        assert_eq!(leader.record_length as usize, buffer.len());

        let base = leader.data_base_address as usize;
        assert_eq!(
            &buffer[base..base + 6],
            &[0xB5, b'0', SUBFIELD_DELIMITER, 0xE9, b'x', FIELD_TERMINATOR]
        );
    }

    #[test]
    fn test_records_written_counter() {
        let mut buffer = Vec::new();
        let mut writer = MarcWriter::new(&mut buffer);
        writer.write_record(&sample_record()).unwrap();
        writer.write_record(&sample_record()).unwrap();
        assert_eq!(writer.records_written(), 2);
    }
}
