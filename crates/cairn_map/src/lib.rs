//! Cache file structures shared by the linker and the compressor.
//!
//! This crate knows the on-disk shape of a cache file: the [`Engine`] dialects
//! and their enumerations, the fixed 0x800-byte [`CacheHeader`] in both its
//! standard and demo shapes, the header transcoder that moves a header between
//! its uncompressed and compressed forms, and the external [`ResourceMap`]
//! side-tables that some references resolve against.

#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod header;
pub mod resource_map;
pub mod transcode;

pub use engine::{Engine, EngineForm, MapType};
pub use error::MapError;
pub use header::{CacheHeader, HeaderShape, HEADER_SIZE};
pub use resource_map::{ResourceEntry, ResourceMap, ResourceMapKind};
pub use transcode::{to_source, to_target};
