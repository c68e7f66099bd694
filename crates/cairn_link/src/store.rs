//! The record store: every record of a map plus the tag index.

use crate::error::LinkError;
use crate::record::{ClassId, Record};
use cairn_common::{Arena, Ident, Interner, RecordId, TagId};
use cairn_diagnostics::RecordNames;

/// One entry of the tag index.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TagIndexEntry {
    /// The interned tag path, without extension.
    pub path: Ident,
    /// The tag's class.
    pub class: ClassId,
    /// The tag's root record.
    pub root: RecordId,
}

/// Holds every record and the tag index for one compilation.
///
/// Records are addressed by [`RecordId`] in insertion order. References are
/// not checked on insertion; the session validates them when layout begins.
#[derive(Default)]
pub struct RecordStore {
    records: Arena<RecordId, Record>,
    tags: Arena<TagId, TagIndexEntry>,
    paths: Interner,
}

impl RecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record, returning its id.
    pub fn add(&mut self, record: Record) -> RecordId {
        self.records.alloc(record)
    }

    /// Returns the record with the given id.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this store.
    pub fn get(&self, id: RecordId) -> &Record {
        &self.records[id]
    }

    /// Returns the record with the given id mutably.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this store.
    pub fn get_mut(&mut self, id: RecordId) -> &mut Record {
        &mut self.records[id]
    }

    /// Returns the record with the given id, or `None` if there is none.
    pub fn try_get(&self, id: RecordId) -> Option<&Record> {
        self.records.try_get(id)
    }

    /// Returns `true` if `id` names a record in this store.
    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains(id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over every record in insertion order.
    pub fn records(&self) -> impl Iterator<Item = (RecordId, &Record)> {
        self.records.iter()
    }

    /// Registers a tag rooted at `root`.
    pub fn add_tag(&mut self, path: &str, class: ClassId, root: RecordId) -> TagId {
        let path = self.paths.get_or_intern(path);
        self.tags.alloc(TagIndexEntry { path, class, root })
    }

    /// Returns the tag index entry for `id`.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this store.
    pub fn tag(&self, id: TagId) -> &TagIndexEntry {
        &self.tags[id]
    }

    /// Iterates over the tag index in insertion order.
    pub fn tags(&self) -> impl Iterator<Item = (TagId, &TagIndexEntry)> {
        self.tags.iter()
    }

    /// Number of tags.
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// The path of a tag, without extension.
    pub fn tag_path(&self, id: TagId) -> &str {
        self.paths.resolve(self.tags[id].path)
    }

    /// The path of a tag with its class extension, e.g. `ui\hud\a.bitmap`.
    pub fn tag_display_path(&self, id: TagId) -> String {
        let entry = &self.tags[id];
        match entry.class.extension() {
            Some(ext) => format!("{}.{ext}", self.tag_path(id)),
            None => format!("{}.{}", self.tag_path(id), entry.class),
        }
    }

    /// The first tag whose root is `record`.
    pub fn tag_rooted_at(&self, record: RecordId) -> Option<TagId> {
        self.tags
            .iter()
            .find(|(_, entry)| entry.root == record)
            .map(|(id, _)| id)
    }

    /// Follows the reference registered at `field_offset` of `base`.
    ///
    /// Returns `None` if the reference targets the null marker or a resource
    /// outside the store, and fails with [`LinkError::DanglingReference`] if
    /// no reference is registered at that field or `base` is unknown.
    pub fn resolve_pointer(
        &self,
        base: RecordId,
        field_offset: usize,
    ) -> Result<Option<RecordId>, LinkError> {
        self.try_get(base)
            .and_then(|record| record.reference_at(field_offset))
            .map(|reference| reference.target_record())
            .ok_or(LinkError::DanglingReference {
                record: base,
                offset: field_offset,
                target: None,
            })
    }

    /// The tag that owns `record`: the first tag, in insertion order, whose
    /// root reaches `record` through references.
    pub fn owning_tag(&self, record: RecordId) -> Option<TagId> {
        if let Some(tag) = self.tag_rooted_at(record) {
            return Some(tag);
        }
        let mut seen = vec![false; self.len()];
        for (tag, entry) in self.tags.iter() {
            let mut stack = vec![entry.root];
            while let Some(id) = stack.pop() {
                if id == record {
                    return Some(tag);
                }
                let Some(current) = self.try_get(id) else {
                    continue;
                };
                if std::mem::replace(&mut seen[id.index()], true) {
                    continue;
                }
                stack.extend(current.references.iter().filter_map(|r| r.target_record()));
            }
        }
        None
    }
}

impl RecordNames for RecordStore {
    fn record_name(&self, record: RecordId) -> Option<String> {
        self.owning_tag(record).map(|tag| self.tag_display_path(tag))
    }
}
