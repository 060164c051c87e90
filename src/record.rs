//! MARC bibliographic record structures and operations.
//!
//! This module provides the core record types:
//! - [`Record`] — leader plus ordered control and data field lists
//! - [`Field`] — a variable field, either [`ControlField`] or [`DataField`]
//! - [`Subfield`] — a coded data element within a data field
//!
//! Control fields (tags 001–009) carry bare data; data fields (tags 010–999)
//! carry two indicator characters and one or more subfields. A record keeps
//! both kinds in insertion order, with one exception: the control number
//! field "001" always sits at position 0 of the control field list, and
//! adding a second "001" replaces the first.
//!
//! # Examples
//!
//! ```
//! use permarc::record::{DataField, Field, Record};
//! use permarc::leader::Leader;
//!
//! let mut record = Record::new(Leader::default());
//! record.add_field(Field::control("001", "12883376"));
//!
//! let mut title = DataField::new("245", '1', '0');
//! title.add_subfield('a', "Summerland /");
//! title.add_subfield('c', "Michael Chabon.");
//! record.add_field(Field::Data(title));
//!
//! assert_eq!(record.control_number(), Some("12883376"));
//! assert_eq!(
//!     record.get_field("245").unwrap().to_string(),
//!     "245 10$aSummerland /$cMichael Chabon."
//! );
//! ```

use crate::leader::Leader;
use regex::Regex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Tag of the control number field.
pub const CONTROL_NUMBER_TAG: &str = "001";

/// A subfield within a data field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield value; may be empty
    pub value: String,
}

/// A control field (tags 001-009): bare data, no indicators or subfields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlField {
    /// Field tag (3 characters)
    pub tag: String,
    /// Field data
    pub data: String,
}

/// A data field (tags 010-999): two indicators plus subfields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    /// Field tag (3 characters)
    pub tag: String,
    /// First indicator
    pub indicator1: char,
    /// Second indicator
    pub indicator2: char,
    /// Subfields, in field order. `SmallVec` avoids allocation for typical
    /// fields with 4 or fewer subfields.
    pub subfields: SmallVec<[Subfield; 4]>,
}

impl DataField {
    /// Create a data field with no subfields.
    #[must_use]
    pub fn new(tag: impl Into<String>, indicator1: char, indicator2: char) -> Self {
        DataField {
            tag: tag.into(),
            indicator1,
            indicator2,
            subfields: SmallVec::new(),
        }
    }

    /// Append a subfield.
    pub fn add_subfield(&mut self, code: char, value: impl Into<String>) {
        self.subfields.push(Subfield {
            code,
            value: value.into(),
        });
    }

    /// First value for a subfield code.
    #[must_use]
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// All values for a subfield code, in field order.
    pub fn subfields_by_code(&self, code: char) -> impl Iterator<Item = &str> {
        self.subfields
            .iter()
            .filter(move |sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }
}

impl fmt::Display for ControlField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tag, self.data)
    }
}

impl fmt::Display for DataField {
    /// Canonical form: tag, indicators, then `$` + code + value per subfield,
    /// e.g. `245 10$aSummerland /$cMichael Chabon.`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.tag, self.indicator1, self.indicator2)?;
        for sf in &self.subfields {
            write!(f, "${}{}", sf.code, sf.value)?;
        }
        Ok(())
    }
}

/// A variable field: either a control field or a data field.
///
/// Replaces the source format's field class hierarchy with a tagged variant;
/// the capability set (`tag`, `matches`, `Display`) dispatches over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    /// A control field (tags 001-009)
    Control(ControlField),
    /// A data field (tags 010-999)
    Data(DataField),
}

impl Field {
    /// Convenience constructor for a control field.
    #[must_use]
    pub fn control(tag: impl Into<String>, data: impl Into<String>) -> Self {
        Field::Control(ControlField {
            tag: tag.into(),
            data: data.into(),
        })
    }

    /// The field's tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Field::Control(f) => &f.tag,
            Field::Data(f) => &f.tag,
        }
    }

    /// Whether this is a control field.
    #[must_use]
    pub fn is_control(&self) -> bool {
        matches!(self, Field::Control(_))
    }

    /// Whether the field's stringified form matches the pattern.
    #[must_use]
    pub fn matches(&self, pattern: &Regex) -> bool {
        pattern.is_match(&self.to_string())
    }

    /// The contained control field, if any.
    #[must_use]
    pub fn as_control(&self) -> Option<&ControlField> {
        match self {
            Field::Control(f) => Some(f),
            Field::Data(_) => None,
        }
    }

    /// The contained data field, if any.
    #[must_use]
    pub fn as_data(&self) -> Option<&DataField> {
        match self {
            Field::Control(_) => None,
            Field::Data(f) => Some(f),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Control(field) => field.fmt(f),
            Field::Data(field) => field.fmt(f),
        }
    }
}

/// Which field list a tag addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Control,
    Data,
}

/// Dispatch rule: a 3-character tag that parses to 1-9 addresses the control
/// list, 10-999 the data list. Anything else (wrong length, non-digits, 000)
/// addresses neither and lookups yield no matches.
fn tag_kind(tag: &str) -> Option<TagKind> {
    if tag.len() != 3 {
        return None;
    }
    match tag.parse::<u16>() {
        Ok(n) if (1..10).contains(&n) => Some(TagKind::Control),
        Ok(n) if (10..1000).contains(&n) => Some(TagKind::Data),
        _ => None,
    }
}

/// A MARC bibliographic record.
///
/// Invariants maintained by [`Record::add_field`]:
/// - at most one field with tag "001", always first in the control list
/// - control and data fields keep their insertion order otherwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record leader (24 bytes)
    pub leader: Leader,
    control_fields: Vec<Field>,
    data_fields: Vec<Field>,
}

impl Record {
    /// Create an empty record with the given leader.
    #[must_use]
    pub fn new(leader: Leader) -> Self {
        Record {
            leader,
            control_fields: Vec::new(),
            data_fields: Vec::new(),
        }
    }

    /// Add a field to the record.
    ///
    /// A control field with tag "001" replaces any existing control number
    /// field and is placed at position 0 of the control list; every other
    /// field is appended to the list matching its variant.
    pub fn add_field(&mut self, field: Field) {
        match field {
            Field::Control(ref f) if f.tag == CONTROL_NUMBER_TAG => {
                if self
                    .control_fields
                    .first()
                    .is_some_and(|existing| existing.tag() == CONTROL_NUMBER_TAG)
                {
                    self.control_fields[0] = field;
                } else {
                    self.control_fields.insert(0, field);
                }
            },
            Field::Control(_) => self.control_fields.push(field),
            Field::Data(_) => self.data_fields.push(field),
        }
    }

    /// Remove the first field equal to `field` from the matching list.
    /// No-op if the field is not present.
    pub fn remove_field(&mut self, field: &Field) {
        let list = match field {
            Field::Control(_) => &mut self.control_fields,
            Field::Data(_) => &mut self.data_fields,
        };
        if let Some(pos) = list.iter().position(|f| f == field) {
            list.remove(pos);
        }
    }

    /// The control number field ("001"), if present.
    #[must_use]
    pub fn control_number_field(&self) -> Option<&Field> {
        self.control_fields
            .first()
            .filter(|f| f.tag() == CONTROL_NUMBER_TAG)
    }

    /// The data of the "001" field, if present.
    #[must_use]
    pub fn control_number(&self) -> Option<&str> {
        self.control_number_field()
            .and_then(Field::as_control)
            .map(|f| f.data.as_str())
    }

    /// First field with the given tag, or `None`.
    #[must_use]
    pub fn get_field(&self, tag: &str) -> Option<&Field> {
        self.list_for(tag)?.iter().find(|f| f.tag() == tag)
    }

    /// All fields with the given tag, in record order.
    #[must_use]
    pub fn get_fields(&self, tag: &str) -> Vec<&Field> {
        match self.list_for(tag) {
            Some(list) => list.iter().filter(|f| f.tag() == tag).collect(),
            None => Vec::new(),
        }
    }

    /// Fields for each of `tags`, concatenated in the given tag order.
    #[must_use]
    pub fn get_fields_for(&self, tags: &[&str]) -> Vec<&Field> {
        tags.iter().flat_map(|tag| self.get_fields(tag)).collect()
    }

    /// All fields: control fields first, then data fields, each in insertion
    /// order (with "001" leading the control fields).
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.control_fields.iter().chain(self.data_fields.iter())
    }

    /// The control fields, in order.
    pub fn control_fields(&self) -> impl Iterator<Item = &ControlField> {
        self.control_fields.iter().filter_map(Field::as_control)
    }

    /// The data fields, in order.
    pub fn data_fields(&self) -> impl Iterator<Item = &DataField> {
        self.data_fields.iter().filter_map(Field::as_data)
    }

    /// All fields whose stringified form matches `pattern`, control fields
    /// first.
    #[must_use]
    pub fn find(&self, pattern: &Regex) -> Vec<&Field> {
        self.all_fields().filter(|f| f.matches(pattern)).collect()
    }

    /// Fields with the given tag whose stringified form matches `pattern`.
    #[must_use]
    pub fn find_by_tag(&self, tag: &str, pattern: &Regex) -> Vec<&Field> {
        self.get_fields(tag)
            .into_iter()
            .filter(|f| f.matches(pattern))
            .collect()
    }

    fn list_for(&self, tag: &str) -> Option<&Vec<Field>> {
        match tag_kind(tag)? {
            TagKind::Control => Some(&self.control_fields),
            TagKind::Data => Some(&self.data_fields),
        }
    }
}

impl fmt::Display for Record {
    /// Human-readable dump:
    ///
    /// ```text
    /// LEADER 00714cam a2200205 a 4500
    /// 001 12883376
    /// 245 10$aSummerland /$cMichael Chabon.
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LEADER {}", self.leader)?;
        for field in self.all_fields() {
            writeln!(f, "{field}")?;
        }
        Ok(())
    }
}
