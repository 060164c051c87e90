//! Structural diagnostics for permissive reading.
//!
//! The permissive reader repairs what it can and records what it saw. Each
//! repair or anomaly becomes a [`MarcDiagnostic`] with a severity, the field
//! tag and subfield code it concerns (or `n/a`), and a message. The
//! [`ErrorHandler`] collects diagnostics per record and enforces the abort
//! policy: in strict mode the first `MajorError` aborts the current record,
//! and `Fatal` aborts in every mode.

use crate::error::{MarcError, Result};
use std::fmt;

/// Placeholder for diagnostics not tied to a specific field or subfield.
pub const NO_CONTEXT: &str = "n/a";

/// How bad a structural anomaly is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational note, e.g. an encoding was guessed.
    Info,
    /// An obvious keying slip that was repaired with high confidence.
    Typo,
    /// A repairable structural problem.
    MinorError,
    /// A problem that loses data; aborts the record when not permissive.
    MajorError,
    /// Unrecoverable; always aborts the record.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "Info",
            Severity::Typo => "Typo",
            Severity::MinorError => "Minor Error",
            Severity::MajorError => "Major Error",
            Severity::Fatal => "Fatal",
        };
        write!(f, "{label}")
    }
}

/// One recorded structural anomaly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarcDiagnostic {
    /// Severity of the anomaly.
    pub severity: Severity,
    /// Tag of the field concerned, or [`NO_CONTEXT`].
    pub tag: String,
    /// Subfield code concerned, or [`NO_CONTEXT`].
    pub subfield: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for MarcDiagnostic {
    /// Renders as `Severity : message --- [ tag : subfield ]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<13}: {} --- [ {} : {} ]",
            self.severity.to_string(),
            self.message,
            self.tag,
            self.subfield
        )
    }
}

/// Ordered collector of per-record diagnostics.
///
/// Created once per reader and cleared at the start of each record, so the
/// diagnostic list always describes the most recently decoded record.
///
/// # Examples
///
/// ```
/// use permarc::error_handler::{ErrorHandler, Severity, NO_CONTEXT};
///
/// let mut handler = ErrorHandler::new(true);
/// handler
///     .report(Severity::Typo, NO_CONTEXT, NO_CONTEXT, "record terminator not found")
///     .unwrap();
/// assert!(handler.has_errors());
/// assert_eq!(handler.errors().len(), 1);
/// ```
#[derive(Debug)]
pub struct ErrorHandler {
    permissive: bool,
    diagnostics: Vec<MarcDiagnostic>,
}

impl ErrorHandler {
    /// Create a handler. When `permissive` is false, `MajorError` reports
    /// abort the current record.
    #[must_use]
    pub fn new(permissive: bool) -> Self {
        ErrorHandler {
            permissive,
            diagnostics: Vec::new(),
        }
    }

    /// Whether repairs are allowed.
    #[must_use]
    pub fn is_permissive(&self) -> bool {
        self.permissive
    }

    /// Record a diagnostic and apply the abort policy.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidRecord`] when the severity is `Fatal`, or
    /// `MajorError` in strict mode.
    pub fn report(
        &mut self,
        severity: Severity,
        tag: &str,
        subfield: &str,
        message: impl Into<String>,
    ) -> Result<()> {
        let message = message.into();
        self.diagnostics.push(MarcDiagnostic {
            severity,
            tag: tag.to_string(),
            subfield: subfield.to_string(),
            message: message.clone(),
        });

        if severity == Severity::Fatal || (!self.permissive && severity == Severity::MajorError) {
            return Err(MarcError::InvalidRecord(message));
        }
        Ok(())
    }

    /// Diagnostics recorded since the last [`ErrorHandler::clear`], in order.
    #[must_use]
    pub fn errors(&self) -> &[MarcDiagnostic] {
        &self.diagnostics
    }

    /// Whether any diagnostic has been recorded since the last clear.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Drop all recorded diagnostics. Called at the start of each record.
    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_errors_never_abort() {
        let mut strict = ErrorHandler::new(false);
        assert!(strict
            .report(Severity::MinorError, "245", "a", "odd subfield")
            .is_ok());
        assert!(strict
            .report(Severity::Typo, NO_CONTEXT, NO_CONTEXT, "short length")
            .is_ok());
        assert_eq!(strict.errors().len(), 2);
    }

    #[test]
    fn test_major_error_aborts_only_in_strict_mode() {
        let mut strict = ErrorHandler::new(false);
        assert!(strict
            .report(Severity::MajorError, "245", NO_CONTEXT, "bad directory entry")
            .is_err());

        let mut permissive = ErrorHandler::new(true);
        assert!(permissive
            .report(Severity::MajorError, "245", NO_CONTEXT, "bad directory entry")
            .is_ok());
        assert!(permissive.has_errors());
    }

    #[test]
    fn test_fatal_always_aborts() {
        let mut permissive = ErrorHandler::new(true);
        let err = permissive
            .report(Severity::Fatal, NO_CONTEXT, NO_CONTEXT, "unusable record")
            .unwrap_err();
        assert!(matches!(err, MarcError::InvalidRecord(_)));
        // The diagnostic is still recorded even though the record aborts.
        assert_eq!(permissive.errors().len(), 1);
    }

    #[test]
    fn test_display_format() {
        let diag = MarcDiagnostic {
            severity: Severity::Typo,
            tag: NO_CONTEXT.to_string(),
            subfield: NO_CONTEXT.to_string(),
            message: "Record terminator character not found at end of record length".to_string(),
        };
        assert_eq!(
            diag.to_string(),
            "Typo         : Record terminator character not found at end of record length --- [ n/a : n/a ]"
        );
    }

    #[test]
    fn test_clear_resets_per_record_state() {
        let mut handler = ErrorHandler::new(true);
        handler
            .report(Severity::Info, NO_CONTEXT, NO_CONTEXT, "guessed UTF-8")
            .unwrap();
        handler.clear();
        assert!(!handler.has_errors());
    }
}
