//! Records, class ids and references.

use cairn_common::RecordId;
use cairn_map::ResourceMapKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A four-character class code, stored big-endian so `b"bitm"` reads as
/// `0x6269_746D`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(u32);

impl ClassId {
    /// `bitm`
    pub const BITMAP: ClassId = ClassId::new(*b"bitm");
    /// `mod2`
    pub const GBXMODEL: ClassId = ClassId::new(*b"mod2");
    /// `shdr`
    pub const SHADER: ClassId = ClassId::new(*b"shdr");
    /// `lens`
    pub const LENS_FLARE: ClassId = ClassId::new(*b"lens");
    /// `jpt!`
    pub const DAMAGE_EFFECT: ClassId = ClassId::new(*b"jpt!");
    /// `wphi`
    pub const WEAPON_HUD_INTERFACE: ClassId = ClassId::new(*b"wphi");
    /// `snd!`
    pub const SOUND: ClassId = ClassId::new(*b"snd!");

    /// Creates a class id from its four characters.
    pub const fn new(fourcc: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(fourcc))
    }

    /// Creates a class id from its raw value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw value.
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// The tag file extension for tag classes, if this is one.
    pub fn extension(self) -> Option<&'static str> {
        Some(match self {
            ClassId::BITMAP => "bitmap",
            ClassId::GBXMODEL => "gbxmodel",
            ClassId::SHADER => "shader",
            ClassId::LENS_FLARE => "lens_flare",
            ClassId::DAMAGE_EFFECT => "damage_effect",
            ClassId::WEAPON_HUD_INTERFACE => "weapon_hud_interface",
            ClassId::SOUND => "sound",
            _ => return None,
        })
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.to_be_bytes() {
            let c = if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '?'
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({self})")
    }
}

/// What a reference points at.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum RefTarget {
    /// Another record in the same store.
    Record(RecordId),
    /// Nothing; the field receives the null sentinel of its kind.
    Null,
    /// An entry in an external resource map, looked up by path.
    Resource {
        /// Which resource map.
        map: ResourceMapKind,
        /// The resource path.
        path: String,
    },
}

/// How a resolved reference is written into its field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum RefKind {
    /// The target's offset in the cache file (or a resource's data offset).
    Pointer,
    /// The target's address once tag data is loaded by the engine.
    Address,
    /// The engine tag id of the tag rooted at the target (or a resource's
    /// index).
    TagId,
}

impl RefKind {
    /// The value written for a null target.
    pub fn null_value(self) -> u32 {
        match self {
            RefKind::Pointer | RefKind::Address => 0,
            RefKind::TagId => u32::MAX,
        }
    }
}

/// A 32-bit field within a record that is patched at link time.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Reference {
    /// Byte offset of the field within the record.
    pub offset: usize,
    /// What the field points at.
    pub target: RefTarget,
    /// How the resolved value is written.
    pub kind: RefKind,
    /// Also write the referent's byte length into the 32-bit field
    /// immediately before this one.
    pub adjust_size: bool,
}

impl Reference {
    /// A reference of `kind` at `offset`.
    pub fn new(offset: usize, target: RefTarget, kind: RefKind) -> Self {
        Self {
            offset,
            target,
            kind,
            adjust_size: false,
        }
    }

    /// A file-offset reference to `target`.
    pub fn pointer(offset: usize, target: RecordId) -> Self {
        Self::new(offset, RefTarget::Record(target), RefKind::Pointer)
    }

    /// An engine-address reference to `target`, as used by reflexive arrays.
    pub fn address(offset: usize, target: RecordId) -> Self {
        Self::new(offset, RefTarget::Record(target), RefKind::Address)
    }

    /// A tag id reference to the tag rooted at `target`, as used by tag
    /// dependencies.
    pub fn tag(offset: usize, target: RecordId) -> Self {
        Self::new(offset, RefTarget::Record(target), RefKind::TagId)
    }

    /// A reference of `kind` that resolves to the null sentinel.
    pub fn null(offset: usize, kind: RefKind) -> Self {
        Self::new(offset, RefTarget::Null, kind)
    }

    /// A reference into a resource map.
    pub fn resource(
        offset: usize,
        map: ResourceMapKind,
        path: impl Into<String>,
        kind: RefKind,
    ) -> Self {
        Self::new(
            offset,
            RefTarget::Resource {
                map,
                path: path.into(),
            },
            kind,
        )
    }

    /// Marks the reference as size-adjusting.
    pub fn with_adjust_size(mut self) -> Self {
        self.adjust_size = true;
        self
    }

    /// The target record, if the reference points into the store.
    pub fn target_record(&self) -> Option<RecordId> {
        match self.target {
            RefTarget::Record(id) => Some(id),
            RefTarget::Null | RefTarget::Resource { .. } => None,
        }
    }
}

/// One compiled unit: a tag's root structure or one of its arrays.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Record {
    /// The class code hooks are dispatched on.
    pub class: ClassId,
    /// Raw field data in engine byte order.
    pub bytes: Vec<u8>,
    /// Fields patched at link time, in declaration order.
    pub references: Vec<Reference>,
    /// Minimum placement alignment; `0` is treated as `1`.
    pub alignment: u64,
}

impl Record {
    /// Creates a record with no references and byte alignment.
    pub fn new(class: ClassId, bytes: Vec<u8>) -> Self {
        Self {
            class,
            bytes,
            references: Vec::new(),
            alignment: 1,
        }
    }

    /// Adds a reference.
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    /// Sets the placement alignment.
    pub fn with_alignment(mut self, alignment: u64) -> Self {
        self.alignment = alignment;
        self
    }

    /// The reference registered at `offset`, if any.
    pub fn reference_at(&self, offset: usize) -> Option<&Reference> {
        self.references.iter().find(|r| r.offset == offset)
    }

    /// Removes the reference registered at `offset`, returning it.
    pub fn remove_reference(&mut self, offset: usize) -> Option<Reference> {
        let index = self.references.iter().position(|r| r.offset == offset)?;
        Some(self.references.remove(index))
    }

    /// The effective alignment; `0` becomes `1`.
    pub fn effective_alignment(&self) -> u64 {
        self.alignment.max(1)
    }
}
