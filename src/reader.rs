//! Reading MARC records from binary streams.
//!
//! This module provides [`PermissiveMarcReader`] for reading ISO 2709
//! formatted MARC records from any source that implements [`std::io::Read`].
//! The reader frames one record at a time and decodes it. In permissive mode
//! it repairs structural anomalies instead of failing, collecting a
//! diagnostic per repair. A record that cannot be salvaged is skipped by
//! scanning forward to the next record terminator, so one bad record never
//! takes down the rest of the file.
//!
//! # Examples
//!
//! Reading records from a file:
//!
//! ```no_run
//! use permarc::PermissiveMarcReader;
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let file = BufReader::new(File::open("records.mrc")?);
//! let mut reader = PermissiveMarcReader::new(file).with_permissive(true);
//!
//! while reader.has_next() {
//!     let record = reader.next_record()?;
//!     for diagnostic in reader.errors() {
//!         eprintln!("{diagnostic}");
//!     }
//!     println!("{record}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Iterating over a buffer:
//!
//! ```
//! use permarc::PermissiveMarcReader;
//! use std::io::Cursor;
//!
//! let data: Vec<u8> = vec![]; // binary MARC data
//! let reader = PermissiveMarcReader::new(Cursor::new(data));
//! for result in reader {
//!     let record = result?;
//!     println!("{:?}", record.control_number());
//! }
//! # Ok::<(), permarc::MarcError>(())
//! ```

use crate::byte_stream::{BufferedByteStream, ByteStream};
use crate::encoding::MarcEncoding;
use crate::error::{MarcError, Result};
use crate::error_handler::{ErrorHandler, MarcDiagnostic, Severity, NO_CONTEXT};
use crate::raw_record::RawRecord;
use crate::record::Record;
use std::io::Read;

const RECORD_TERMINATOR: u8 = 0x1D;

/// Reader configuration.
///
/// `permissive` enables structural repairs; `to_utf8` forces the decoded
/// record to UTF-8 regardless of the leader's coding scheme;
/// `default_encoding` is used when the leader does not declare Unicode;
/// `combine_partials` lists the tags harvested from continuation records.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Repair and report structural anomalies instead of failing the record.
    pub permissive: bool,
    /// Force conversion to UTF-8 and mark the result's leader accordingly.
    pub to_utf8: bool,
    /// Encoding assumed when the leader does not declare UCS/Unicode.
    pub default_encoding: MarcEncoding,
    /// When set, records that continue the previous record (same "001"
    /// value) are folded into it: their fields with these tags are appended
    /// and the continuation is suppressed from iteration.
    pub combine_partials: Option<Vec<String>>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            permissive: false,
            to_utf8: false,
            default_encoding: MarcEncoding::Marc8,
            combine_partials: None,
        }
    }
}

/// Reader for ISO 2709 binary MARC format with permissive recovery.
///
/// `PermissiveMarcReader` reads one record at a time from any source
/// implementing [`std::io::Read`]. Records are fully parsed and returned as
/// [`Record`] instances; the diagnostics gathered while decoding the most
/// recent record are available from [`PermissiveMarcReader::errors`].
#[derive(Debug)]
pub struct PermissiveMarcReader<R: Read> {
    stream: BufferedByteStream<R>,
    config: ReaderConfig,
    handler: ErrorHandler,
    peeked: Option<Result<Record>>,
    pending_raw: Option<RawRecord>,
    pending_err: Option<MarcError>,
    done: bool,
    records_read: usize,
}

impl<R: Read> PermissiveMarcReader<R> {
    /// Create a strict reader with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, ReaderConfig::default())
    }

    /// Create a reader with the given configuration.
    pub fn with_config(inner: R, config: ReaderConfig) -> Self {
        let handler = ErrorHandler::new(config.permissive);
        PermissiveMarcReader {
            stream: BufferedByteStream::new(inner),
            config,
            handler,
            peeked: None,
            pending_raw: None,
            pending_err: None,
            done: false,
            records_read: 0,
        }
    }

    /// Enable or disable permissive repairs.
    #[must_use]
    pub fn with_permissive(mut self, permissive: bool) -> Self {
        self.config.permissive = permissive;
        self.handler = ErrorHandler::new(permissive);
        self
    }

    /// Force decoded records to UTF-8.
    #[must_use]
    pub fn with_utf8_output(mut self, to_utf8: bool) -> Self {
        self.config.to_utf8 = to_utf8;
        self
    }

    /// Set the encoding assumed when the leader does not declare Unicode.
    #[must_use]
    pub fn with_default_encoding(mut self, encoding: MarcEncoding) -> Self {
        self.config.default_encoding = encoding;
        self
    }

    /// Fold continuation records' fields with these tags into the record
    /// they continue.
    #[must_use]
    pub fn with_combine_partials(mut self, tags: &[&str]) -> Self {
        self.config.combine_partials = Some(tags.iter().map(ToString::to_string).collect());
        self
    }

    /// Whether another record (or per-record error) is available.
    ///
    /// Peeking decodes one record ahead, so after `has_next` returns `true`
    /// the following [`PermissiveMarcReader::next_record`] does no further
    /// I/O. The diagnostics from the peeked record are already visible via
    /// [`PermissiveMarcReader::errors`].
    pub fn has_next(&mut self) -> bool {
        if self.peeked.is_none() {
            self.peeked = self.advance();
        }
        self.peeked.is_some()
    }

    /// The next record.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::NoSuchRecord`] when the stream is exhausted, or
    /// the per-record error for a record that could not be read in strict
    /// mode.
    pub fn next_record(&mut self) -> Result<Record> {
        if self.peeked.is_none() {
            self.peeked = self.advance();
        }
        match self.peeked.take() {
            Some(result) => result,
            None => Err(MarcError::NoSuchRecord),
        }
    }

    /// Convenience form of [`PermissiveMarcReader::next_record`]:
    /// `Ok(None)` at end of stream instead of an error.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        match self.next_record() {
            Ok(record) => Ok(Some(record)),
            Err(MarcError::NoSuchRecord) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Diagnostics for the most recently decoded record, in order.
    ///
    /// Cleared each time the reader starts on a new record.
    #[must_use]
    pub fn errors(&self) -> &[MarcDiagnostic] {
        self.handler.errors()
    }

    /// Number of records emitted so far.
    #[must_use]
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Produce the next record, repairing or skipping as configured.
    ///
    /// Returns `None` when the stream is cleanly exhausted. Per-record
    /// failures in permissive mode are recorded as diagnostics and skipped;
    /// in strict mode they surface as `Some(Err(..))` after the stream has
    /// been resynchronized, so the following call can continue. Stream-level
    /// failures surface once and then end iteration.
    fn advance(&mut self) -> Option<Result<Record>> {
        if self.done {
            return None;
        }
        self.handler.clear();

        if let Some(e) = self.pending_err.take() {
            if e.is_stream_fatal() {
                self.done = true;
            }
            return Some(Err(e));
        }

        loop {
            let raw = match self.take_raw() {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    self.done = true;
                    return None;
                },
                Err(e) => {
                    if e.is_stream_fatal() {
                        self.done = true;
                        return Some(Err(e));
                    }
                    if let Err(skip) = self.skip_to_next_record() {
                        self.done = true;
                        return Some(Err(skip));
                    }
                    if self.config.permissive {
                        // Record the loss and move on to the next record.
                        if self
                            .handler
                            .report(
                                Severity::MajorError,
                                NO_CONTEXT,
                                NO_CONTEXT,
                                format!("Unreadable record skipped: {e}"),
                            )
                            .is_err()
                        {
                            return Some(Err(e));
                        }
                        continue;
                    }
                    return Some(Err(e));
                },
            };

            match raw.to_record(&self.config, &mut self.handler) {
                Ok(mut record) => {
                    if self.config.combine_partials.is_some() {
                        if let Err(e) = self.combine_following(&raw, &mut record) {
                            self.pending_err = Some(e);
                        }
                    }
                    self.records_read += 1;
                    return Some(Ok(record));
                },
                Err(e) => {
                    // The frame was complete, so the stream is already
                    // positioned at the next record.
                    if self.config.permissive {
                        continue;
                    }
                    return Some(Err(e));
                },
            }
        }
    }

    /// Next raw record, honoring one record of combine-lookahead pushback.
    fn take_raw(&mut self) -> Result<Option<RawRecord>> {
        if let Some(raw) = self.pending_raw.take() {
            return Ok(Some(raw));
        }
        RawRecord::from_stream(&mut self.stream, &mut self.handler)
    }

    /// Consume bytes up to and including the next record terminator.
    fn skip_to_next_record(&mut self) -> Result<()> {
        while let Some(b) = self.stream.read_byte()? {
            if b == RECORD_TERMINATOR {
                break;
            }
        }
        Ok(())
    }

    /// Fold continuation records into `record`.
    ///
    /// A following record continues `base` when both carry the same "001"
    /// value. Fields of continuation records whose tags are in the
    /// `combine_partials` set are appended; the continuations themselves
    /// are suppressed from iteration. The first non-continuation is pushed
    /// back and becomes the next record.
    fn combine_following(&mut self, base: &RawRecord, record: &mut Record) -> Result<()> {
        let Some(tags) = self.config.combine_partials.clone() else {
            return Ok(());
        };
        let Some(base_id) = base.id().map(ToString::to_string) else {
            return Ok(());
        };

        loop {
            let next = match RawRecord::from_stream(&mut self.stream, &mut self.handler) {
                Ok(Some(next)) => next,
                Ok(None) => return Ok(()),
                Err(e) => return Err(e),
            };
            if next.id() != Some(base_id.as_str()) {
                self.pending_raw = Some(next);
                return Ok(());
            }

            let partial = next.to_record(&self.config, &mut self.handler)?;
            for field in partial.all_fields() {
                if tags.iter().any(|t| t == field.tag()) {
                    record.add_field(field.clone());
                }
            }
        }
    }
}

impl<R: Read> Iterator for PermissiveMarcReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.peeked.is_none() {
            self.peeked = self.advance();
        }
        self.peeked.take()
    }
}
