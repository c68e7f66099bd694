//! Error types for the compression pipeline.

use cairn_map::MapError;
use std::path::PathBuf;

/// Errors raised while compressing or decompressing a cache file.
///
/// Every failure is terminal for the operation; no partial output is kept.
#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    /// The header could not be transcoded.
    #[error(transparent)]
    Map(#[from] MapError),

    /// The zstd encoder rejected the body.
    #[error("compression failed: {reason}")]
    CompressionFailure {
        /// The encoder's error message.
        reason: String,
    },

    /// The zstd decoder rejected the body.
    #[error("decompression failed: {reason}")]
    DecompressionFailure {
        /// The decoder's error message.
        reason: String,
    },

    /// The decoded cache does not have the size its header declared.
    #[error("decompressed size mismatch: header declares {expected} bytes, got {actual}")]
    SizeMismatch {
        /// The size declared in the compressed header.
        expected: u64,
        /// The size actually produced, capped at one byte past `expected`.
        actual: u64,
    },

    /// The input ended before the zstd frame was complete.
    #[error("{path} is truncated: frame incomplete after {len} bytes")]
    TruncatedInput {
        /// The input file.
        path: PathBuf,
        /// The input file length.
        len: u64,
    },

    /// An I/O error occurred while reading the input or writing the output.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl CompressError {
    pub(crate) fn io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| CompressError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn decompression(err: impl std::fmt::Display) -> Self {
        CompressError::DecompressionFailure {
            reason: err.to_string(),
        }
    }
}
