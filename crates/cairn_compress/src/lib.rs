//! Compressed transport encoding for linked cache files.
//!
//! A compressed cache keeps its 0x800-byte header (rewritten into the
//! compressed form by the header transcoder) and replaces the body with one
//! or more zstd frames. [`buffer`] works on whole in-memory caches and
//! [`stream`] decompresses a file to a file in bounded memory.

#![warn(missing_docs)]

pub mod buffer;
pub mod error;
pub mod stream;

pub use buffer::{compress, decompress};
pub use error::CompressError;
pub use stream::decompress_file;
