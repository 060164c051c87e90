#![warn(missing_docs)]

//! # permarc: permissive MARC21 / ISO 2709 reading
//!
//! A Rust library for reading MARC bibliographic records in the ISO 2709
//! binary format, built around the reality that MARC files in the wild are
//! frequently broken: stated record lengths disagree with the actual record
//! terminator, directories drift out of alignment, leaders declare the wrong
//! character encoding. In permissive mode the reader repairs what it can,
//! reports every repair as a structured diagnostic, and skips past records
//! it cannot salvage without losing the rest of the stream.
//!
//! ## Quick Start
//!
//! ### Reading MARC Records
//!
//! ```no_run
//! use permarc::PermissiveMarcReader;
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = BufReader::new(File::open("records.mrc")?);
//! let mut reader = PermissiveMarcReader::new(file)
//!     .with_permissive(true)
//!     .with_utf8_output(true);
//!
//! while reader.has_next() {
//!     let record = reader.next_record()?;
//!     println!("{:?}", record.control_number());
//!     for diagnostic in reader.errors() {
//!         eprintln!("{diagnostic}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Working with records
//!
//! ```
//! use permarc::{DataField, Field, Leader, Record};
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
//!
//! ## Modules
//!
//! - [`reader`] — the permissive stream reader and its configuration
//! - [`record`] — in-memory model (`Record`, `Field`, `Subfield`)
//! - [`raw_record`] — record framing and the byte-preserving raw handle
//! - [`byte_stream`] — mark/reset byte source abstraction
//! - [`leader`] — the 24-byte record leader
//! - [`error_handler`] — per-record diagnostics with severities
//! - [`encoding`] — MARC-8 / UTF-8 / ISO-8859-1 conversion
//! - [`writer`] — serializing records back to ISO 2709
//! - [`error`] — error types and result type

pub mod byte_stream;
mod decoder;
pub mod encoding;
pub mod error;
pub mod error_handler;
pub mod leader;
pub mod raw_record;
pub mod reader;
/// Core MARC record structures (`Record`, `Field`, `Subfield`)
pub mod record;
pub mod writer;

pub use byte_stream::{BufferedByteStream, ByteStream};
pub use encoding::{Conversion, MarcEncoding};
pub use error::{MarcError, Result};
pub use error_handler::{ErrorHandler, MarcDiagnostic, Severity};
pub use leader::Leader;
pub use raw_record::RawRecord;
pub use reader::{PermissiveMarcReader, ReaderConfig};
pub use record::{ControlField, DataField, Field, Record, Subfield};
pub use writer::MarcWriter;
