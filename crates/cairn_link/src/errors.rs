//! Diagnostic codes raised while linking and by the built-in class hooks.
//!
//! Error codes `E401`--`E408` cover layout and reference problems found by
//! the linker itself. `E410`--`E414` and warnings `W410`--`W411` are raised by
//! the built-in class hooks.

use cairn_diagnostics::{Category, DiagnosticCode};

/// The linked cache does not fit the 32-bit size field.
pub const E401: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 401,
};

/// The linked cache exceeds the engine's (or configured) maximum size.
pub const E402: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 402,
};

/// A record's alignment is not a power of two.
pub const E403: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 403,
};

/// A resource reference names a missing map or path.
pub const E404: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 404,
};

/// A size-adjusting reference has no room for its size field.
pub const E405: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 405,
};

/// A reference field lies outside its record.
pub const E406: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 406,
};

/// A tag id reference targets a record that is not a tag root.
pub const E407: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 407,
};

/// An address reference does not fit the engine's 32-bit address space.
pub const E408: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 408,
};

/// A bitmap sequence index is out of bounds.
pub const E410: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 410,
};

/// A sequence used as bitmaps has no bitmaps.
pub const E411: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 411,
};

/// A sequence used as sprites has no sprites.
pub const E412: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 412,
};

/// A sequence has neither sprites nor bitmaps.
pub const E413: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 413,
};

/// A record does not match its class's field layout.
pub const E414: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 414,
};

/// Overlays change on zoom but no zoom crosshair exists.
pub const W410: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 410,
};

/// A sequence has both sprites and bitmaps, so which one is drawn is unclear.
pub const W411: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 411,
};
