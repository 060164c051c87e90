//! MARC record leader parsing and manipulation.
//!
//! The MARC leader is a 24-byte fixed-length field at the start of every MARC
//! record. It contains metadata describing the record's structure, content
//! type, and encoding.
//!
//! # Structure
//!
//! - Positions 0-4: Record length (5 ASCII digits)
//! - Position 5: Record status
//! - Position 6: Record type (a = language material, c = music, etc.)
//! - Position 7: Bibliographic level (m = monograph, s = serial, etc.)
//! - Position 8: Control record type
//! - Position 9: Character coding (space = MARC-8, a = UCS/Unicode)
//! - Position 10: Indicator count (usually 2)
//! - Position 11: Subfield code count (usually 2)
//! - Positions 12-16: Base address of data (5 ASCII digits)
//! - Positions 17-19: Encoding level, cataloging form, multipart level
//! - Positions 20-23: Entry map (usually "4500")

use crate::error::{MarcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// MARC Leader - 24 bytes at the start of every MARC record.
///
/// Contains metadata about the record structure and content.
/// All MARC records must begin with exactly 24 bytes of leader information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leader {
    /// Record length (5 digits) - positions 0-4
    pub record_length: u32,
    /// Record status (1 char) - position 5
    pub record_status: char,
    /// Type of record (1 char) - position 6
    pub record_type: char,
    /// Bibliographic level (1 char) - position 7
    pub bibliographic_level: char,
    /// Type of control record (1 char) - position 8
    pub control_record_type: char,
    /// Character coding scheme (1 char) - position 9
    pub character_coding: char,
    /// Indicator count (1 digit) - position 10 (usually 2)
    pub indicator_count: u8,
    /// Subfield code count (1 digit) - position 11 (usually 2)
    pub subfield_code_count: u8,
    /// Base address of data (5 digits) - positions 12-16
    pub data_base_address: u32,
    /// Encoding level (1 char) - position 17
    pub encoding_level: char,
    /// Cataloging form (1 char) - position 18
    pub cataloging_form: char,
    /// Multipart resource record level (1 char) - position 19
    pub multipart_level: char,
    /// Entry map (4 chars) - positions 20-23
    pub entry_map: String,
}

impl Leader {
    /// Parse a leader from 24 bytes.
    ///
    /// The fixed single-character positions accept any byte; only the numeric
    /// fields (record length, indicator and subfield counts, base address)
    /// are validated here.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::MalformedLeader`] if the buffer is shorter than
    /// 24 bytes or a numeric field contains a non-ASCII-digit byte.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 24 {
            return Err(MarcError::MalformedLeader(format!(
                "Leader must be at least 24 bytes, got {}",
                bytes.len()
            )));
        }

        let record_length = parse_ascii_decimal(&bytes[0..5], "record length")?;
        let record_status = bytes[5] as char;
        let record_type = bytes[6] as char;
        let bibliographic_level = bytes[7] as char;
        let control_record_type = bytes[8] as char;
        let character_coding = bytes[9] as char;

        let indicator_count = parse_count_digit(bytes[10], "indicator count at position 10")?;
        let subfield_code_count =
            parse_count_digit(bytes[11], "subfield code count at position 11")?;

        let data_base_address = parse_ascii_decimal(&bytes[12..17], "base address of data")?;
        let encoding_level = bytes[17] as char;
        let cataloging_form = bytes[18] as char;
        let multipart_level = bytes[19] as char;
        let entry_map = String::from_utf8_lossy(&bytes[20..24]).to_string();

        Ok(Leader {
            record_length,
            record_status,
            record_type,
            bibliographic_level,
            control_record_type,
            character_coding,
            indicator_count,
            subfield_code_count,
            data_base_address,
            encoding_level,
            cataloging_form,
            multipart_level,
            entry_map,
        })
    }

    /// Validate that the leader is suitable for binary record reading.
    ///
    /// Checks that `record_length` and `data_base_address` are large enough
    /// to do offset arithmetic against: a record is at least the leader plus
    /// the record terminator, and the data area starts after the leader and
    /// the directory terminator.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::MalformedLeader`] if either bound is violated.
    pub fn validate_for_reading(&self) -> Result<()> {
        if self.record_length < 24 {
            return Err(MarcError::MalformedLeader(format!(
                "Record length must be at least 24, got {}",
                self.record_length
            )));
        }
        if self.data_base_address < 25 {
            return Err(MarcError::MalformedLeader(format!(
                "Base address of data must be at least 25, got {}",
                self.data_base_address
            )));
        }
        Ok(())
    }

    /// Serialize the leader to its 24-byte form.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::MalformedLeader`] if the entry map is not exactly
    /// 4 bytes.
    pub fn as_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(24);

        bytes.extend_from_slice(format!("{:05}", self.record_length).as_bytes());
        bytes.push(self.record_status as u8);
        bytes.push(self.record_type as u8);
        bytes.push(self.bibliographic_level as u8);
        bytes.push(self.control_record_type as u8);
        bytes.push(self.character_coding as u8);
        bytes.push(b'0' + self.indicator_count);
        bytes.push(b'0' + self.subfield_code_count);
        bytes.extend_from_slice(format!("{:05}", self.data_base_address).as_bytes());
        bytes.push(self.encoding_level as u8);
        bytes.push(self.cataloging_form as u8);
        bytes.push(self.multipart_level as u8);

        let entry_map = self.entry_map.as_bytes();
        if entry_map.len() != 4 {
            return Err(MarcError::MalformedLeader(format!(
                "Entry map must be 4 characters, got {}",
                entry_map.len()
            )));
        }
        bytes.extend_from_slice(entry_map);

        Ok(bytes)
    }
}

impl fmt::Display for Leader {
    /// The canonical 24-character form, e.g. `00714cam a2200205 a 4500`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:05}{}{}{}{}{}{}{}{:05}{}{}{}{}",
            self.record_length.min(99_999),
            self.record_status,
            self.record_type,
            self.bibliographic_level,
            self.control_record_type,
            self.character_coding,
            self.indicator_count,
            self.subfield_code_count,
            self.data_base_address.min(99_999),
            self.encoding_level,
            self.cataloging_form,
            self.multipart_level,
            self.entry_map
        )
    }
}

impl Default for Leader {
    /// A blank monograph leader with zeroed lengths, suitable as a starting
    /// point for records that will be serialized (the writer recomputes
    /// record length and base address).
    fn default() -> Self {
        Leader {
            record_length: 0,
            record_status: 'n',
            record_type: 'a',
            bibliographic_level: 'm',
            control_record_type: ' ',
            character_coding: 'a',
            indicator_count: 2,
            subfield_code_count: 2,
            data_base_address: 0,
            encoding_level: ' ',
            cataloging_form: ' ',
            multipart_level: ' ',
            entry_map: "4500".to_string(),
        }
    }
}

/// Parse an ASCII decimal field without allocating.
fn parse_ascii_decimal(bytes: &[u8], what: &str) -> Result<u32> {
    let mut result = 0u32;
    for &byte in bytes {
        if byte.is_ascii_digit() {
            result = result * 10 + u32::from(byte - b'0');
        } else {
            return Err(MarcError::MalformedLeader(format!(
                "Non-digit byte 0x{byte:02X} in {what}"
            )));
        }
    }
    Ok(result)
}

fn parse_count_digit(byte: u8, what: &str) -> Result<u8> {
    if byte.is_ascii_digit() {
        Ok(byte - b'0')
    } else {
        Err(MarcError::MalformedLeader(format!(
            "Invalid {what}: {}",
            byte as char
        )))
    }
}
