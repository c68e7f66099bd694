//! Error types for cache header and resource map handling.

use std::path::PathBuf;

/// Structural errors raised while reading or transcoding cache structures.
///
/// These abort the current operation immediately; semantic problems with tag
/// data are reported as diagnostics instead.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// The header is too short, has the wrong literals, or declares an
    /// impossible size.
    #[error("invalid cache header: {reason}")]
    InvalidHeader {
        /// Description of the header problem.
        reason: String,
    },

    /// The engine enumeration is not one of the known dialects.
    #[error("unsupported engine enumeration 0x{raw:08X}")]
    UnsupportedEngine {
        /// The raw enumeration found in the header.
        raw: u32,
    },

    /// The header is already in the form the transform would produce.
    #[error("cache file is already {form}")]
    AlreadyTransformed {
        /// The form the header is already in.
        form: &'static str,
    },

    /// A Dark Circlet cache must be decompressed before it can be compressed.
    #[error("Dark Circlet cache file is compressed; decompress it first")]
    NeedsDecompressedForm,

    /// A Dark Circlet cache with no decompressed size is not compressed.
    #[error("Dark Circlet cache file is not compressed")]
    NeedsCompressedForm,

    /// The decompressed size cannot be represented in the 32-bit header field.
    #[error("decompressed size {size} exceeds the 32-bit header field")]
    SizeOverflow {
        /// The size that did not fit.
        size: u64,
    },

    /// A resource map is truncated or points outside itself.
    #[error("invalid resource map: {reason}")]
    InvalidResourceMap {
        /// Description of the problem.
        reason: String,
    },

    /// An I/O error occurred while reading a resource map from disk.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl MapError {
    pub(crate) fn invalid_header(reason: impl Into<String>) -> Self {
        MapError::InvalidHeader {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unsupported_engine() {
        let err = MapError::UnsupportedEngine { raw: 0x1234 };
        assert_eq!(err.to_string(), "unsupported engine enumeration 0x00001234");
    }

    #[test]
    fn display_already_transformed() {
        let err = MapError::AlreadyTransformed { form: "compressed" };
        assert_eq!(err.to_string(), "cache file is already compressed");
    }
}
