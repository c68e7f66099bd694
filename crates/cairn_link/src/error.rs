//! Structural errors raised by the linker.

use cairn_common::{InternalError, RecordId};
use std::path::PathBuf;

/// Structural errors that abort a link immediately.
///
/// Problems with tag contents are diagnostics, not `LinkError`s.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A reference names a record that does not exist, or a pointer field
    /// was never registered as a reference.
    #[error(
        "dangling reference at offset 0x{offset:X} of {record}{}",
        .target.map(|t| format!(" to {t}")).unwrap_or_default()
    )]
    DanglingReference {
        /// The record holding the field.
        record: RecordId,
        /// Byte offset of the field within the record.
        offset: usize,
        /// The missing target, if the field is registered at all.
        target: Option<RecordId>,
    },

    /// A phase was requested out of order.
    #[error("cannot {operation} while the session is {state}")]
    InvalidPhase {
        /// The requested operation.
        operation: &'static str,
        /// The session state at the time.
        state: &'static str,
    },

    /// A resource map could not be loaded.
    #[error(transparent)]
    Map(#[from] cairn_map::MapError),

    /// The linked cache could not be compressed for output.
    #[error(transparent)]
    Compress(#[from] cairn_compress::CompressError),

    /// An I/O error occurred while writing the output file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A linker invariant was violated.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
