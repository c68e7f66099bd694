//! Structured diagnostic messages keyed by record.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use cairn_common::RecordId;
use serde::{Deserialize, Serialize};

/// A structured diagnostic raised against a record.
///
/// Each diagnostic includes a severity, an optional code, the record it was
/// raised against (or `None` for session-wide problems such as the total
/// cache size), the message, and optional notes and help lines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The code identifying the kind of problem, if one was assigned.
    pub code: Option<DiagnosticCode>,
    /// The record the diagnostic was raised against.
    pub record: Option<RecordId>,
    /// The main diagnostic message.
    pub message: String,
    /// Explanatory footnotes (e.g., "note: ...").
    pub notes: Vec<String>,
    /// Actionable suggestions (e.g., "help: ...").
    pub help: Vec<String>,
}

impl Diagnostic {
    /// Creates a diagnostic with no code.
    pub fn new(severity: Severity, record: Option<RecordId>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            record,
            message: message.into(),
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates a new error diagnostic with the given code, message, and record.
    pub fn error(
        code: DiagnosticCode,
        message: impl Into<String>,
        record: Option<RecordId>,
    ) -> Self {
        Self::new(Severity::Error, record, message).with_code(code)
    }

    /// Creates a new warning diagnostic with the given code, message, and record.
    pub fn warning(
        code: DiagnosticCode,
        message: impl Into<String>,
        record: Option<RecordId>,
    ) -> Self {
        Self::new(Severity::Warning, record, message).with_code(code)
    }

    /// Sets the code of this diagnostic.
    pub fn with_code(mut self, code: DiagnosticCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    #[test]
    fn create_error() {
        let code = DiagnosticCode::new(Category::Error, 401);
        let diag = Diagnostic::error(code, "cache too large", None);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "cache too large");
        assert_eq!(diag.code.map(|c| c.to_string()).as_deref(), Some("E401"));
    }

    #[test]
    fn create_warning_for_record() {
        let code = DiagnosticCode::new(Category::Warning, 410);
        let diag = Diagnostic::warning(code, "no zoom crosshairs", Some(RecordId::from_raw(2)));
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.record, Some(RecordId::from_raw(2)));
    }

    #[test]
    fn builder_methods() {
        let diag = Diagnostic::new(Severity::Error, None, "bad index")
            .with_note("the bitmap has 2 sequences")
            .with_help("use a sequence index below 2");
        assert!(diag.code.is_none());
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.help.len(), 1);
    }
}
