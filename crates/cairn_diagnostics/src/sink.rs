//! Thread-safe diagnostic accumulator shared by every compilation phase.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use cairn_common::RecordId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A thread-safe accumulator for diagnostics emitted during compilation.
///
/// Diagnostics are kept in emission order and never deduplicated. Error and
/// warning counts are tracked atomically so [`has_fatal`](Self::has_fatal)
/// can be checked without locking the diagnostic vector.
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    error_count: AtomicUsize,
    warning_count: AtomicUsize,
    deny_warnings: bool,
}

impl DiagnosticSink {
    /// Creates a new empty diagnostic sink.
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            error_count: AtomicUsize::new(0),
            warning_count: AtomicUsize::new(0),
            deny_warnings: false,
        }
    }

    /// Creates a sink that treats any warning as fatal.
    pub fn deny_warnings() -> Self {
        Self {
            deny_warnings: true,
            ..Self::new()
        }
    }

    /// Records a diagnostic without a code against `record`.
    pub fn report(&self, severity: Severity, record: Option<RecordId>, message: impl Into<String>) {
        self.emit(Diagnostic::new(severity, record, message));
    }

    /// Emits a diagnostic into the sink.
    pub fn emit(&self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => self.error_count.fetch_add(1, Ordering::Relaxed),
            Severity::Warning => self.warning_count.fetch_add(1, Ordering::Relaxed),
        };
        self.lock().push(diag);
    }

    /// Returns `true` if the diagnostics emitted so far fail the compilation.
    pub fn has_fatal(&self) -> bool {
        self.error_count() > 0 || (self.deny_warnings && self.warning_count() > 0)
    }

    /// Returns the number of error-severity diagnostics emitted so far.
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Returns the number of warning-severity diagnostics emitted so far.
    pub fn warning_count(&self) -> usize {
        self.warning_count.load(Ordering::Relaxed)
    }

    /// Takes all accumulated diagnostics in emission order, leaving the sink empty.
    ///
    /// The counters are not reset, so a drained sink still reports whether
    /// the compilation failed.
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    /// Returns a snapshot of all accumulated diagnostics without draining.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        // A panic while holding the lock cannot leave the Vec half-pushed.
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}
