//! Opaque ID newtypes for records and tags.
//!
//! Each ID is a thin `u32` wrapper that is `Copy`, `Hash`, `Ord` and
//! `Serialize`/`Deserialize`. IDs are handed out by
//! [`Arena::alloc`](crate::arena::Arena::alloc) in insertion order, so
//! comparing two IDs compares their insertion order.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the raw index widened for slice indexing.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for one record (a tag root or a sub-structure).
    RecordId,
    "record"
);

define_id!(
    /// Opaque, copyable ID for one entry of the tag index.
    TagId,
    "tag"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip() {
        let id = RecordId::from_raw(7);
        assert_eq!(id.as_raw(), 7);
        assert_eq!(id.index(), 7);
    }

    #[test]
    fn ordering_follows_insertion() {
        assert!(TagId::from_raw(1) < TagId::from_raw(2));
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", RecordId::from_raw(3)), "record#3");
        assert_eq!(format!("{}", TagId::from_raw(0)), "tag#0");
    }

    #[test]
    fn serde_roundtrip() {
        let id = TagId::from_raw(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: TagId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
