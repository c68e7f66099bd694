//! Reference resolution and final buffer assembly.

use crate::errors::{E404, E405, E406, E407, E408};
use crate::layout::Layout;
use crate::record::{RefKind, RefTarget, Reference};
use crate::resources::ResourceMaps;
use crate::session::SessionOptions;
use crate::store::RecordStore;
use cairn_common::{bytes, CairnResult, InternalError, RecordId, TagId};
use cairn_compress::CompressError;
use cairn_diagnostics::{Diagnostic, DiagnosticSink};
use cairn_map::{CacheHeader, Engine, HEADER_SIZE};
use tracing::debug;

const TAG_ID_SALT: u32 = 0xE174;

/// The engine tag id of the tag at index `tag`.
pub fn tag_id_value(tag: TagId) -> u32 {
    let index = tag.as_raw();
    ((TAG_ID_SALT.wrapping_add(index) & 0xFFFF) << 16) | (index & 0xFFFF)
}

/// The value written into a reference field and the referent's length.
struct Resolved {
    value: u32,
    size: u32,
}

struct Resolver<'a> {
    store: &'a RecordStore,
    layout: &'a Layout,
    resources: &'a ResourceMaps,
    engine: Engine,
}

impl Resolver<'_> {
    fn resolve(&self, holder: RecordId, reference: &Reference) -> Result<Resolved, Diagnostic> {
        match &reference.target {
            RefTarget::Null => Ok(Resolved {
                value: reference.kind.null_value(),
                size: 0,
            }),
            RefTarget::Resource { map, path } => {
                let Some((index, entry)) = self.resources.find(*map, path) else {
                    let why = if self.resources.get(*map).is_some() {
                        format!("'{path}' is not in the {map:?} resource map")
                    } else {
                        format!("no {map:?} resource map is loaded for '{path}'")
                    };
                    return Err(Diagnostic::error(E404, why, Some(holder)));
                };
                let value = match reference.kind {
                    RefKind::Pointer | RefKind::Address => entry.data_offset,
                    RefKind::TagId => index,
                };
                Ok(Resolved {
                    value,
                    size: entry.size,
                })
            }
            RefTarget::Record(target) => {
                let target = self.layout.canonical(*target);
                let size = self.store.get(target).bytes.len() as u32;
                let offset = self.layout.offset(target).ok_or_else(|| {
                    Diagnostic::error(E406, format!("{target} was never placed"), Some(holder))
                })?;
                // An empty record occupies no bytes, so its offset may be the end of the cache.
                if size == 0 && reference.kind != RefKind::TagId {
                    return Ok(Resolved {
                        value: reference.kind.null_value(),
                        size: 0,
                    });
                }
                let value = match reference.kind {
                    RefKind::Pointer => u32::try_from(offset).ok(),
                    RefKind::Address => (offset - HEADER_SIZE as u64)
                        .checked_add(u64::from(self.engine.tag_data_address()))
                        .and_then(|address| u32::try_from(address).ok()),
                    RefKind::TagId => {
                        let tag = self.layout.tag_of(target).ok_or_else(|| {
                            let why = format!(
                                "tag id reference at offset 0x{:X} targets {target}, \
                                 which is not a tag",
                                reference.offset
                            );
                            Diagnostic::error(E407, why, Some(holder))
                        })?;
                        Some(tag_id_value(tag))
                    }
                };
                let value = value.ok_or_else(|| {
                    Diagnostic::error(
                        E408,
                        format!(
                            "{target} at offset 0x{offset:X} does not fit a 32-bit {:?} field",
                            reference.kind
                        ),
                        Some(holder),
                    )
                })?;
                Ok(Resolved { value, size })
            }
        }
    }

    /// Checks a reference's field placement within its record.
    fn check_field(&self, holder: RecordId, reference: &Reference) -> Result<(), Diagnostic> {
        let len = self.store.get(holder).bytes.len();
        if reference.offset.checked_add(4).map_or(true, |end| end > len) {
            return Err(Diagnostic::error(
                E406,
                format!(
                    "reference at offset 0x{:X} lies outside the {len}-byte record",
                    reference.offset
                ),
                Some(holder),
            ));
        }
        if reference.adjust_size && reference.offset < 4 {
            return Err(Diagnostic::error(
                E405,
                format!(
                    "size-adjusting reference at offset 0x{:X} has no room for its size field",
                    reference.offset
                ),
                Some(holder),
            ));
        }
        Ok(())
    }
}

/// Finds two references of one record whose fields or size slots share bytes.
fn check_overlaps(holder: RecordId, references: &[Reference], len: usize) -> Option<Diagnostic> {
    let mut spans = Vec::with_capacity(references.len() * 2);
    for reference in references {
        let offset = reference.offset;
        if offset.checked_add(4).map_or(true, |end| end > len) {
            continue;
        }
        spans.push((offset, offset + 4));
        if reference.adjust_size && offset >= 4 {
            spans.push((offset - 4, offset));
        }
    }
    spans.sort_unstable();
    let (first, second) = spans
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .find(|(first, second)| second.0 < first.1)?;
    Some(Diagnostic::error(
        E406,
        format!(
            "fields at 0x{:X}..0x{:X} and 0x{:X}..0x{:X} overlap",
            first.0, first.1, second.0, second.1
        ),
        Some(holder),
    ))
}

/// Reports every reference of a surviving record that cannot be patched.
pub fn check_references(
    store: &RecordStore,
    layout: &Layout,
    resources: &ResourceMaps,
    engine: Engine,
    sink: &DiagnosticSink,
) {
    let resolver = Resolver {
        store,
        layout,
        resources,
        engine,
    };
    for &id in layout.order() {
        let record = store.get(id);
        if let Some(diag) = check_overlaps(id, &record.references, record.bytes.len()) {
            sink.emit(diag);
        }
        for reference in &record.references {
            let result = resolver
                .check_field(id, reference)
                .and_then(|()| resolver.resolve(id, reference).map(|_| ()));
            if let Err(diag) = result {
                // An oversized cache is already reported by layout.
                if diag.code == Some(E408) && layout.total_size() > u64::from(u32::MAX) {
                    continue;
                }
                sink.emit(diag);
            }
        }
    }
}

/// A linked cache file.
#[derive(Clone, Debug)]
pub struct LinkedBuffer {
    data: Vec<u8>,
    header: CacheHeader,
    layout: Layout,
}

impl LinkedBuffer {
    /// The whole cache, header first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the buffer, returning the cache bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`; a cache holds at least its header.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The file offset of `record` (or of the record it was merged into).
    pub fn offset_of(&self, record: RecordId) -> Option<u64> {
        self.layout.offset(record)
    }

    /// The layout the buffer was assembled from.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The cache header.
    pub fn header(&self) -> &CacheHeader {
        &self.header
    }

    /// Compresses the cache for transport.
    pub fn compress(&self, level: i32) -> Result<Vec<u8>, CompressError> {
        cairn_compress::compress(&self.data, level)
    }
}

/// Assembles the linked cache: header, then every survivor at its offset
/// with every reference patched.
///
/// Reference problems must already have been reported by
/// [`check_references`]; finding one here is an internal error.
pub fn link(
    store: &RecordStore,
    layout: &Layout,
    resources: &ResourceMaps,
    options: &SessionOptions,
) -> CairnResult<LinkedBuffer> {
    let total = u32::try_from(layout.total_size())
        .map_err(|_| InternalError::new("linking a cache larger than 4 GiB"))?;
    let mut data = vec![0u8; total as usize];
    let resolver = Resolver {
        store,
        layout,
        resources,
        engine: options.engine,
    };

    for &id in layout.order() {
        let record = store.get(id);
        let start = layout
            .offset(id)
            .ok_or_else(|| InternalError::new(format!("{id} has no offset")))? as usize;
        let slot = data
            .get_mut(start..start + record.bytes.len())
            .ok_or_else(|| InternalError::new(format!("{id} does not fit the buffer")))?;
        slot.copy_from_slice(&record.bytes);

        for reference in &record.references {
            let resolved = resolver
                .resolve(id, reference)
                .map_err(|diag| InternalError::new(diag.message))?;
            let patched = bytes::write_u32(slot, reference.offset, resolved.value)
                && (!reference.adjust_size
                    || bytes::write_u32(slot, reference.offset - 4, resolved.size));
            if !patched {
                return Err(InternalError::new(format!(
                    "reference at 0x{:X} of {id} is out of bounds",
                    reference.offset
                )));
            }
        }
    }

    let mut header = CacheHeader::for_engine(options.engine);
    header.set_name(&options.map_name);
    header.set_build(&options.build_string);
    header.set_map_type_raw(options.map_type.raw());
    header.set_tag_data_offset(HEADER_SIZE as u32);
    header.set_tag_data_size(total - HEADER_SIZE as u32);
    header.set_crc32(crc32fast::hash(&data[HEADER_SIZE..]));
    data[..HEADER_SIZE].copy_from_slice(header.as_bytes());

    debug!(
        engine = %options.engine,
        size = total,
        crc32 = header.crc32(),
        "assembled linked cache"
    );
    Ok(LinkedBuffer {
        data,
        header,
        layout: layout.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ClassId, Record};
    use cairn_map::{ResourceMap, ResourceMapKind};

    const NODE: ClassId = ClassId::new(*b"node");

    fn options(engine: Engine) -> SessionOptions {
        SessionOptions::new(engine, "test")
    }

    fn build(
        store: &RecordStore,
        resources: &ResourceMaps,
        engine: Engine,
    ) -> (Option<LinkedBuffer>, DiagnosticSink) {
        let sink = DiagnosticSink::new();
        let layout = Layout::compute(store, &sink, u64::from(u32::MAX)).unwrap();
        check_references(store, &layout, resources, engine, &sink);
        if sink.has_fatal() {
            return (None, sink);
        }
        (Some(link(store, &layout, resources, &options(engine)).unwrap()), sink)
    }

    fn read(buffer: &LinkedBuffer, at: u64) -> u32 {
        bytes::read_u32(buffer.as_bytes(), at as usize).unwrap()
    }

    #[test]
    fn tag_id_values() {
        assert_eq!(tag_id_value(TagId::from_raw(0)), 0xE174_0000);
        assert_eq!(tag_id_value(TagId::from_raw(3)), 0xE177_0003);
    }

    #[test]
    fn patches_every_kind() {
        let mut store = RecordStore::new();
        let leaf = store.add(Record::new(NODE, vec![0xAB; 12]));
        let root = store.add(
            Record::new(NODE, vec![0; 24])
                .with_reference(Reference::pointer(0, leaf))
                .with_reference(Reference::address(8, leaf).with_adjust_size())
                .with_reference(Reference::tag(12, leaf))
                .with_reference(Reference::null(16, RefKind::TagId))
                .with_reference(Reference::null(20, RefKind::Pointer)),
        );
        store.add_tag("root", NODE, root);
        let leaf_tag = store.add_tag("leaf", NODE, leaf);

        let (buffer, _) = build(&store, &ResourceMaps::new(), Engine::CustomEdition);
        let buffer = buffer.unwrap();
        let base = buffer.offset_of(root).unwrap();
        let leaf_offset = buffer.offset_of(leaf).unwrap();
        assert_eq!(base, 0x800);
        assert_eq!(leaf_offset, 0x818);
        assert_eq!(u64::from(read(&buffer, base)), leaf_offset);
        assert_eq!(read(&buffer, base + 4), 12);
        assert_eq!(read(&buffer, base + 8), 0x4044_0000 + 0x18);
        assert_eq!(read(&buffer, base + 12), tag_id_value(leaf_tag));
        assert_eq!(read(&buffer, base + 16), 0xFFFF_FFFF);
        assert_eq!(read(&buffer, base + 20), 0);
        assert_eq!(&buffer.as_bytes()[0x818..0x824], &[0xAB; 12]);
    }

    #[test]
    fn header_fields_and_crc() {
        let mut store = RecordStore::new();
        let root = store.add(Record::new(NODE, vec![1, 2, 3, 4]));
        store.add_tag("root", NODE, root);
        let (buffer, _) = build(&store, &ResourceMaps::new(), Engine::Retail);
        let buffer = buffer.unwrap();
        let header = buffer.header();
        assert!(header.valid());
        assert_eq!(header.engine_raw(), Engine::Retail.raw());
        assert_eq!(header.name(), "test");
        assert_eq!(header.tag_data_offset(), 0x800);
        assert_eq!(header.tag_data_size(), 4);
        assert_eq!(header.crc32(), crc32fast::hash(&[1, 2, 3, 4]));
        assert_eq!(header.decompressed_size(), 0);
        assert_eq!(&CacheHeader::from_bytes(buffer.as_bytes()).unwrap(), header);
    }

    #[test]
    fn demo_uses_demo_header_and_address_base() {
        let mut store = RecordStore::new();
        let leaf = store.add(Record::new(NODE, vec![0; 4]));
        let root =
            store.add(Record::new(NODE, vec![0; 4]).with_reference(Reference::address(0, leaf)));
        store.add_tag("root", NODE, root);
        let (buffer, _) = build(&store, &ResourceMaps::new(), Engine::Demo);
        let buffer = buffer.unwrap();
        assert_eq!(buffer.header().shape(), cairn_map::HeaderShape::Demo);
        assert_eq!(read(&buffer, 0x800), 0x4BF1_0000 + 4);
    }

    #[test]
    fn resource_references() {
        let data: &[u8] = &[0; 6];
        let mut maps = ResourceMaps::new();
        maps.insert(
            ResourceMap::from_bytes(&ResourceMap::build(
                ResourceMapKind::Sounds,
                &[("sound\\a", data), ("sound\\b", data)],
            ))
            .unwrap(),
        );
        let mut store = RecordStore::new();
        let root = store.add(
            Record::new(NODE, vec![0; 12])
                .with_reference(
                    Reference::resource(4, ResourceMapKind::Sounds, "sound\\b", RefKind::TagId)
                        .with_adjust_size(),
                )
                .with_reference(Reference::resource(
                    8,
                    ResourceMapKind::Sounds,
                    "sound\\b",
                    RefKind::Pointer,
                )),
        );
        store.add_tag("root", NODE, root);
        let (buffer, _) = build(&store, &maps, Engine::CustomEdition);
        let buffer = buffer.unwrap();
        assert_eq!(read(&buffer, 0x800), 6);
        assert_eq!(read(&buffer, 0x804), 1);
        assert_eq!(read(&buffer, 0x808), 0x10 + 6);
    }

    #[test]
    fn unresolved_resource_is_an_error() {
        let mut store = RecordStore::new();
        let root = store.add(
            Record::new(NODE, vec![0; 4])
                .with_reference(Reference::resource(
                    0,
                    ResourceMapKind::Bitmaps,
                    "x",
                    RefKind::TagId,
                )),
        );
        store.add_tag("root", NODE, root);
        let (buffer, sink) = build(&store, &ResourceMaps::new(), Engine::CustomEdition);
        assert!(buffer.is_none());
        assert_eq!(sink.diagnostics()[0].code, Some(E404));
    }

    #[test]
    fn field_checks() {
        let mut store = RecordStore::new();
        let leaf = store.add(Record::new(NODE, vec![9; 4]));
        let root = store.add(
            Record::new(NODE, vec![0; 8])
                .with_reference(Reference::pointer(6, leaf))
                .with_reference(Reference::pointer(0, leaf).with_adjust_size())
                .with_reference(Reference::tag(4, leaf)),
        );
        store.add_tag("root", NODE, root);
        let (buffer, sink) = build(&store, &ResourceMaps::new(), Engine::Retail);
        assert!(buffer.is_none());
        let codes: Vec<_> = sink.diagnostics().iter().filter_map(|d| d.code).collect();
        assert_eq!(codes, [E406, E405, E407]);
    }

    #[test]
    fn overlapping_fields_are_rejected() {
        let mut store = RecordStore::new();
        let leaf = store.add(Record::new(NODE, vec![5; 0x30]));
        let other = store.add(Record::new(NODE, vec![6; 4]));
        let root = store.add(
            Record::new(NODE, vec![0; 0x10])
                .with_reference(Reference::pointer(0, other))
                .with_reference(Reference::pointer(4, leaf).with_adjust_size()),
        );
        store.add_tag("root", NODE, root);
        let (buffer, sink) = build(&store, &ResourceMaps::new(), Engine::Retail);
        assert!(buffer.is_none());
        let codes: Vec<_> = sink.diagnostics().iter().filter_map(|d| d.code).collect();
        assert_eq!(codes, [E406]);

        let mut store = RecordStore::new();
        let leaf = store.add(Record::new(NODE, vec![5; 0x30]));
        let root = store.add(
            Record::new(NODE, vec![0; 0x10])
                .with_reference(Reference::tag(2, leaf))
                .with_reference(Reference::pointer(4, leaf)),
        );
        store.add_tag("root", NODE, root);
        store.add_tag("leaf", NODE, leaf);
        let (buffer, sink) = build(&store, &ResourceMaps::new(), Engine::Retail);
        assert!(buffer.is_none());
        let codes: Vec<_> = sink.diagnostics().iter().filter_map(|d| d.code).collect();
        assert_eq!(codes, [E406]);
    }

    #[test]
    fn empty_target_is_null() {
        let mut store = RecordStore::new();
        let empty = store.add(Record::new(NODE, Vec::new()));
        let root = store.add(
            Record::new(NODE, vec![0xCC; 12])
                .with_reference(Reference::pointer(0, empty))
                .with_reference(Reference::address(8, empty).with_adjust_size()),
        );
        store.add_tag("root", NODE, root);
        let (buffer, sink) = build(&store, &ResourceMaps::new(), Engine::CustomEdition);
        assert!(sink.diagnostics().is_empty(), "{:?}", sink.diagnostics());
        let buffer = buffer.unwrap();
        assert_eq!(buffer.len(), 0x80C);
        assert_eq!(read(&buffer, 0x800), 0);
        assert_eq!(read(&buffer, 0x804), 0);
        assert_eq!(read(&buffer, 0x808), 0);

        for &id in buffer.layout().order() {
            let base = buffer.offset_of(id).unwrap();
            for reference in &store.get(id).references {
                if reference.kind != RefKind::Pointer {
                    continue;
                }
                let value = read(&buffer, base + reference.offset as u64);
                assert!(value == 0 || (value as usize) < buffer.len(), "{value:#X}");
            }
        }
    }
}
