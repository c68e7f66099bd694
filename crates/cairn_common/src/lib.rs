//! Shared foundational types used across the cairn tag compiler.
//!
//! This crate provides the dense [`Arena`] that backs the record store, the
//! opaque record and tag ids, content hashing used for deduplication,
//! interned tag paths, little-endian field accessors, and the common
//! internal-error result type.

#![warn(missing_docs)]

pub mod arena;
pub mod bytes;
pub mod hash;
pub mod ident;
pub mod ids;
pub mod result;

pub use arena::{Arena, ArenaId};
pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use ids::{RecordId, TagId};
pub use result::{CairnResult, InternalError};
