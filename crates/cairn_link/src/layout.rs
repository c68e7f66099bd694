//! Deduplication and offset assignment.
//!
//! Records with the same class, bytes and reference shape collapse onto the
//! lowest-numbered one. Because two parents are only equal once their
//! children have been merged, merging repeats until no new pair collapses.
//! Survivors are then placed in tag order, depth-first through references,
//! followed by any survivor no tag reaches.

use crate::errors::{E401, E402, E403};
use crate::error::LinkError;
use crate::record::{RefTarget, Reference};
use crate::store::RecordStore;
use cairn_common::{bytes, ContentHash, RecordId, TagId};
use cairn_diagnostics::{Diagnostic, DiagnosticSink};
use cairn_map::HEADER_SIZE;
use std::collections::HashMap;
use tracing::debug;

/// Placement of every surviving record in the linked cache.
#[derive(Clone, Debug)]
pub struct Layout {
    canonical: Vec<RecordId>,
    offsets: Vec<Option<u64>>,
    order: Vec<RecordId>,
    tag_roots: Vec<RecordId>,
    root_tags: HashMap<RecordId, TagId>,
    total_size: u64,
}

impl Layout {
    /// Lays out every record of `store`.
    ///
    /// Fails with [`LinkError::DanglingReference`] if any reference names a
    /// record that does not exist. Bad alignments and a total size above
    /// `u32::MAX` or `max_size` are reported to `sink`.
    pub fn compute(
        store: &RecordStore,
        sink: &DiagnosticSink,
        max_size: u64,
    ) -> Result<Layout, LinkError> {
        validate_targets(store)?;
        let canonical = deduplicate(store);
        let alignments = group_alignments(store, &canonical, sink);
        let tag_roots: Vec<RecordId> = store
            .tags()
            .map(|(_, entry)| canonical[entry.root.index()])
            .collect();
        let mut root_tags = HashMap::with_capacity(tag_roots.len());
        for (index, &root) in tag_roots.iter().enumerate() {
            root_tags.entry(root).or_insert(TagId::from_raw(index as u32));
        }
        let order = traversal_order(store, &canonical, &tag_roots);

        let mut offsets = vec![None; store.len()];
        let mut cursor = HEADER_SIZE as u64;
        for &id in &order {
            let start = bytes::align_up(cursor, alignments[id.index()]).unwrap_or(u64::MAX);
            offsets[id.index()] = Some(start);
            cursor = start.saturating_add(store.get(id).bytes.len() as u64);
        }

        if cursor > u64::from(u32::MAX) {
            sink.emit(
                Diagnostic::error(
                    E401,
                    format!(
                        "linked cache is {cursor} bytes, which does not fit the 32-bit size field"
                    ),
                    None,
                )
                .with_note(format!("the limit is {} bytes", u32::MAX)),
            );
        } else if cursor > max_size {
            sink.emit(Diagnostic::error(
                E402,
                format!(
                    "linked cache is {cursor} bytes, exceeding the maximum of {max_size} bytes"
                ),
                None,
            ));
        }

        let survivors = order.len();
        debug!(
            records = store.len(),
            survivors,
            merged = store.len() - survivors,
            total_size = cursor,
            "laid out records"
        );
        Ok(Layout {
            canonical,
            offsets,
            order,
            tag_roots,
            root_tags,
            total_size: cursor,
        })
    }

    /// The surviving record `id` was merged into (itself if it survived).
    pub fn canonical(&self, id: RecordId) -> RecordId {
        self.canonical.get(id.index()).copied().unwrap_or(id)
    }

    /// Returns `true` if `id` survived deduplication.
    pub fn is_survivor(&self, id: RecordId) -> bool {
        self.canonical(id) == id
    }

    /// The file offset of `id` (or of the record it was merged into).
    pub fn offset(&self, id: RecordId) -> Option<u64> {
        self.offsets
            .get(self.canonical(id).index())
            .copied()
            .flatten()
    }

    /// Surviving records in placement order.
    pub fn order(&self) -> &[RecordId] {
        &self.order
    }

    /// The root record of `tag` after deduplication.
    pub fn tag_root(&self, tag: TagId) -> Option<RecordId> {
        self.tag_roots.get(tag.index()).copied()
    }

    /// The tag whose root is `record` after deduplication, lowest tag first.
    pub fn tag_of(&self, record: RecordId) -> Option<TagId> {
        self.root_tags.get(&self.canonical(record)).copied()
    }

    /// Total size of the linked cache including the header.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}

fn validate_targets(store: &RecordStore) -> Result<(), LinkError> {
    for (id, record) in store.records() {
        for reference in &record.references {
            if let Some(target) = reference.target_record() {
                if !store.contains(target) {
                    return Err(LinkError::DanglingReference {
                        record: id,
                        offset: reference.offset,
                        target: Some(target),
                    });
                }
            }
        }
    }
    for (_, entry) in store.tags() {
        if !store.contains(entry.root) {
            return Err(LinkError::DanglingReference {
                record: entry.root,
                offset: 0,
                target: Some(entry.root),
            });
        }
    }
    Ok(())
}

/// Encodes the reference list of a record with targets replaced by their
/// current canonical ids.
fn reference_shape(references: &[Reference], canonical: &[RecordId]) -> Vec<u8> {
    let mut shape = Vec::with_capacity(references.len() * 16);
    for reference in references {
        shape.extend_from_slice(&(reference.offset as u64).to_le_bytes());
        shape.push(reference.kind as u8);
        shape.push(u8::from(reference.adjust_size));
        match &reference.target {
            RefTarget::Record(id) => {
                shape.push(0);
                shape.extend_from_slice(&canonical[id.index()].as_raw().to_le_bytes());
            }
            RefTarget::Null => shape.push(1),
            RefTarget::Resource { map, path } => {
                shape.push(2);
                shape.extend_from_slice(&map.raw().to_le_bytes());
                shape.extend_from_slice(&(path.len() as u64).to_le_bytes());
                shape.extend_from_slice(path.as_bytes());
            }
        }
    }
    shape
}

/// Maps every record to the lowest-numbered record it is equal to.
pub fn deduplicate(store: &RecordStore) -> Vec<RecordId> {
    let mut canonical: Vec<RecordId> = store.records().map(|(id, _)| id).collect();
    let mut rounds = 0;
    loop {
        rounds += 1;
        let shapes: Vec<Vec<u8>> = store
            .records()
            .map(|(_, record)| reference_shape(&record.references, &canonical))
            .collect();

        let mut buckets: HashMap<ContentHash, Vec<RecordId>> = HashMap::new();
        let mut next = canonical.clone();
        for (id, record) in store.records() {
            let shape = &shapes[id.index()];
            let class = record.class.as_raw().to_be_bytes();
            let hash = ContentHash::from_parts([&class[..], &record.bytes[..], &shape[..]]);
            let bucket = buckets.entry(hash).or_default();
            let equal = bucket.iter().copied().find(|&other| {
                let candidate = store.get(other);
                candidate.class == record.class
                    && candidate.bytes == record.bytes
                    && shapes[other.index()] == *shape
            });
            match equal {
                Some(survivor) => next[id.index()] = survivor,
                None => {
                    bucket.push(id);
                    next[id.index()] = id;
                }
            }
        }

        if next == canonical {
            break;
        }
        canonical = next;
    }
    debug!(rounds, "deduplication reached a fixed point");
    canonical
}

/// The alignment each survivor is placed with: the largest valid alignment
/// of the records merged into it.
fn group_alignments(
    store: &RecordStore,
    canonical: &[RecordId],
    sink: &DiagnosticSink,
) -> Vec<u64> {
    let mut alignments = vec![1u64; store.len()];
    for (id, record) in store.records() {
        let align = record.effective_alignment();
        if !align.is_power_of_two() {
            sink.emit(Diagnostic::error(
                E403,
                format!("alignment {align} of {} is not a power of two", record.class),
                Some(id),
            ));
            continue;
        }
        let slot = &mut alignments[canonical[id.index()].index()];
        *slot = (*slot).max(align);
    }
    alignments
}

/// Survivors in placement order: every tag root in tag order, depth-first
/// pre-order through references, then every unreached survivor in
/// insertion order.
fn traversal_order(
    store: &RecordStore,
    canonical: &[RecordId],
    tag_roots: &[RecordId],
) -> Vec<RecordId> {
    let mut placed = vec![false; store.len()];
    let mut order = Vec::new();
    let mut stack = Vec::new();

    for &root in tag_roots {
        stack.push(root);
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut placed[id.index()], true) {
                continue;
            }
            order.push(id);
            let children = store.get(id).references.iter().rev();
            stack.extend(
                children
                    .filter_map(Reference::target_record)
                    .map(|target| canonical[target.index()]),
            );
        }
    }

    for (id, _) in store.records() {
        if canonical[id.index()] == id && !placed[id.index()] {
            placed[id.index()] = true;
            order.push(id);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ClassId, RefKind, Record};
    use cairn_diagnostics::Severity;

    const LEAF: ClassId = ClassId::new(*b"leaf");
    const NODE: ClassId = ClassId::new(*b"node");

    fn lay_out(store: &RecordStore) -> (Layout, DiagnosticSink) {
        let sink = DiagnosticSink::new();
        let layout = Layout::compute(store, &sink, u64::from(u32::MAX)).unwrap();
        (layout, sink)
    }

    #[test]
    fn identical_leaves_collapse_to_lowest() {
        let mut store = RecordStore::new();
        let a = store.add(Record::new(LEAF, vec![1, 2, 3, 4]));
        let b = store.add(Record::new(LEAF, vec![1, 2, 3, 4]));
        let c = store.add(Record::new(LEAF, vec![9, 9, 9, 9]));
        let (layout, _) = lay_out(&store);
        assert_eq!(layout.canonical(b), a);
        assert_eq!(layout.canonical(c), c);
        assert!(!layout.is_survivor(b));
        assert_eq!(layout.offset(b), layout.offset(a));
        assert_eq!(layout.order(), &[a, c]);
    }

    #[test]
    fn class_distinguishes() {
        let mut store = RecordStore::new();
        let a = store.add(Record::new(LEAF, vec![0; 4]));
        let b = store.add(Record::new(NODE, vec![0; 4]));
        let (layout, _) = lay_out(&store);
        assert_ne!(layout.canonical(b), a);
    }

    #[test]
    fn reference_shape_distinguishes() {
        let mut store = RecordStore::new();
        let mut add = |offset, kind| {
            store.add(Record::new(LEAF, vec![0; 8]).with_reference(Reference::null(offset, kind)))
        };
        let a = add(0, RefKind::Pointer);
        let b = add(4, RefKind::Pointer);
        let c = add(0, RefKind::TagId);
        let (layout, _) = lay_out(&store);
        assert_eq!(layout.order(), &[a, b, c]);
    }

    #[test]
    fn parents_merge_after_children_merge() {
        let mut store = RecordStore::new();
        let leaf_a = store.add(Record::new(LEAF, vec![5; 4]));
        let leaf_b = store.add(Record::new(LEAF, vec![5; 4]));
        let mut add = |fill, offset, target| {
            store.add(
                Record::new(NODE, vec![fill; 8]).with_reference(Reference::pointer(offset, target)),
            )
        };
        let parent_a = add(0, 4, leaf_a);
        let parent_b = add(0, 4, leaf_b);
        let grand_a = add(1, 0, parent_b);
        let grand_b = add(1, 0, parent_a);
        let canonical = deduplicate(&store);
        assert_eq!(canonical[leaf_b.index()], leaf_a);
        assert_eq!(canonical[parent_b.index()], parent_a);
        assert_eq!(canonical[grand_b.index()], grand_a);
    }

    #[test]
    fn depth_first_preorder_by_tag() {
        let mut store = RecordStore::new();
        let c = store.add(Record::new(LEAF, vec![3; 4]));
        let b = store.add(Record::new(LEAF, vec![2; 4]));
        let a = store.add(
            Record::new(NODE, vec![0; 8])
                .with_reference(Reference::pointer(0, b))
                .with_reference(Reference::pointer(4, c)),
        );
        let orphan = store.add(Record::new(LEAF, vec![4; 4]));
        let second_root =
            store.add(Record::new(NODE, vec![7; 4]).with_reference(Reference::pointer(0, c)));
        store.add_tag("a", NODE, a);
        store.add_tag("second", NODE, second_root);

        let (layout, _) = lay_out(&store);
        assert_eq!(layout.order(), &[a, b, c, second_root, orphan]);
        assert_eq!(layout.offset(a), Some(0x800));
        assert_eq!(layout.offset(b), Some(0x808));
        assert_eq!(layout.offset(c), Some(0x80C));
        assert_eq!(layout.offset(second_root), Some(0x810));
        assert_eq!(layout.offset(orphan), Some(0x814));
        assert_eq!(layout.total_size(), 0x818);
    }

    #[test]
    fn cycles_terminate() {
        let mut store = RecordStore::new();
        let a = store.add(Record::new(NODE, vec![0; 4]));
        let b = store.add(Record::new(NODE, vec![1; 4]).with_reference(Reference::pointer(0, a)));
        store.get_mut(a).references.push(Reference::pointer(0, b));
        store.add_tag("loop", NODE, a);
        let (layout, _) = lay_out(&store);
        assert_eq!(layout.order(), &[a, b]);
    }

    #[test]
    fn alignment_pads() {
        let mut store = RecordStore::new();
        let a = store.add(Record::new(LEAF, vec![1; 3]));
        let b = store.add(Record::new(LEAF, vec![2; 4]).with_alignment(16));
        let (layout, sink) = lay_out(&store);
        assert_eq!(layout.offset(a), Some(0x800));
        assert_eq!(layout.offset(b), Some(0x810));
        assert!(!sink.has_fatal());
    }

    #[test]
    fn merged_records_keep_strictest_alignment() {
        let mut store = RecordStore::new();
        let _pad = store.add(Record::new(NODE, vec![0; 1]));
        let a = store.add(Record::new(LEAF, vec![2; 4]));
        let _b = store.add(Record::new(LEAF, vec![2; 4]).with_alignment(32));
        let (layout, _) = lay_out(&store);
        assert_eq!(layout.offset(a), Some(0x820));
    }

    #[test]
    fn bad_alignment_is_an_error() {
        let mut store = RecordStore::new();
        let a = store.add(Record::new(LEAF, vec![1; 4]).with_alignment(12));
        let (_, sink) = lay_out(&store);
        let diags = sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(E403));
        assert_eq!(diags[0].record, Some(a));
    }

    #[test]
    fn size_over_u32_is_an_error() {
        let mut store = RecordStore::new();
        for i in 0..3u8 {
            store.add(Record::new(LEAF, vec![i; 4]).with_alignment(1 << 31));
        }
        let (layout, sink) = lay_out(&store);
        assert!(layout.total_size() > u64::from(u32::MAX));
        let diags = sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].code, Some(E401));
    }

    #[test]
    fn size_over_limit_is_an_error() {
        let mut store = RecordStore::new();
        store.add(Record::new(LEAF, vec![0; 0x100]));
        let sink = DiagnosticSink::new();
        Layout::compute(&store, &sink, 0x880).unwrap();
        assert_eq!(sink.diagnostics()[0].code, Some(E402));
    }

    #[test]
    fn dangling_target() {
        let mut store = RecordStore::new();
        let missing = RecordId::from_raw(8);
        let a =
            store.add(Record::new(NODE, vec![0; 4]).with_reference(Reference::pointer(0, missing)));
        let err = Layout::compute(&store, &DiagnosticSink::new(), u64::MAX).unwrap_err();
        assert!(matches!(
            err,
            LinkError::DanglingReference { record, target: Some(t), .. }
                if record == a && t == missing
        ));
    }

    #[test]
    fn tag_roots_follow_merges() {
        let mut store = RecordStore::new();
        let a = store.add(Record::new(LEAF, vec![1; 4]));
        let b = store.add(Record::new(LEAF, vec![1; 4]));
        let first = store.add_tag("first", LEAF, a);
        let second = store.add_tag("second", LEAF, b);
        let (layout, _) = lay_out(&store);
        assert_eq!(layout.tag_root(second), Some(a));
        assert_eq!(layout.tag_of(b), Some(first));
    }

    #[test]
    fn tag_of_across_many_tags() {
        let mut store = RecordStore::new();
        let roots: Vec<_> = (0..64u32)
            .map(|i| store.add(Record::new(LEAF, i.to_le_bytes().to_vec())))
            .collect();
        let inner = store.add(Record::new(NODE, vec![0xEE; 4]));
        let tags: Vec<_> = roots
            .iter()
            .enumerate()
            .map(|(i, &root)| store.add_tag(&format!("tag{i}"), LEAF, root))
            .collect();
        let alias = store.add_tag("alias", LEAF, roots[10]);
        let (layout, _) = lay_out(&store);
        for (root, tag) in roots.iter().zip(&tags) {
            assert_eq!(layout.tag_of(*root), Some(*tag));
        }
        assert_eq!(layout.tag_root(alias), Some(roots[10]));
        assert_eq!(layout.tag_of(roots[10]), Some(tags[10]));
        assert_eq!(layout.tag_of(inner), None);
    }
}
