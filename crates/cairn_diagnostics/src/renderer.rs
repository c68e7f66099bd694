//! Diagnostic rendering backends for human-readable and machine-readable output.

use crate::diagnostic::Diagnostic;
use cairn_common::RecordId;
use serde_json::json;

/// Resolves record ids to human-readable names, usually the owning tag path.
pub trait RecordNames {
    /// Returns a display name for `record`, or `None` if it has none.
    fn record_name(&self, record: RecordId) -> Option<String>;
}

/// A [`RecordNames`] that knows no names; locations render as bare ids.
impl RecordNames for () {
    fn record_name(&self, _record: RecordId) -> Option<String> {
        None
    }
}

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic, names: &dyn RecordNames) -> String;

    /// Renders every diagnostic in order, concatenated.
    fn render_all(&self, diags: &[Diagnostic], names: &dyn RecordNames) -> String {
        diags.iter().map(|d| self.render(d, names)).collect()
    }
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// error[E410]: sequence index 3 is out of bounds (2 sequences)
///   --> ui\hud\pistol.weapon_hud_interface (record#4)
///    = note: ...
///    = help: ...
/// ```
#[derive(Default)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new() -> Self {
        Self
    }
}

fn location(record: RecordId, names: &dyn RecordNames) -> String {
    match names.record_name(record) {
        Some(name) => format!("{name} ({record})"),
        None => record.to_string(),
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic, names: &dyn RecordNames) -> String {
        let mut out = match diag.code {
            Some(code) => format!("{}[{}]: {}\n", diag.severity, code, diag.message),
            None => format!("{}: {}\n", diag.severity, diag.message),
        };

        if let Some(record) = diag.record {
            out.push_str(&format!("  --> {}\n", location(record, names)));
        }

        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }

        out
    }
}

/// Renders each diagnostic as one line of JSON.
#[derive(Default)]
pub struct JsonRenderer;

impl DiagnosticRenderer for JsonRenderer {
    fn render(&self, diag: &Diagnostic, names: &dyn RecordNames) -> String {
        let value = json!({
            "severity": diag.severity.to_string(),
            "code": diag.code.map(|c| c.to_string()),
            "record": diag.record.map(|r| r.as_raw()),
            "location": diag.record.and_then(|r| names.record_name(r)),
            "message": diag.message,
            "notes": diag.notes,
            "help": diag.help,
        });
        format!("{value}\n")
    }
}
