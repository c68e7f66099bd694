//! Built-in hooks for the engine's tag classes.
//!
//! Field offsets are little-endian positions inside a record's bytes. A
//! block array ("reflexive") is a `u32` element count followed by a
//! reference to the record holding the elements back to back.

use crate::hooks::HookTable;
use crate::record::ClassId;
use crate::store::RecordStore;
use cairn_common::{bytes, RecordId};

pub mod bitmap;
pub mod lens_flare;
pub mod weapon_hud;

/// Sequences of a `bitm` tag.
pub const BITMAP_SEQUENCES: ClassId = ClassId::new(*b"sqnc");
/// Reflections of a `lens` tag.
pub const LENS_REFLECTIONS: ClassId = ClassId::new(*b"lnsr");
/// Crosshairs of a `wphi` tag.
pub const HUD_CROSSHAIRS: ClassId = ClassId::new(*b"wphc");
/// Overlays of one crosshair.
pub const HUD_CROSSHAIR_OVERLAYS: ClassId = ClassId::new(*b"wpco");
/// Meters of a `wphi` tag.
pub const HUD_METERS: ClassId = ClassId::new(*b"wphm");
/// Static elements of a `wphi` tag.
pub const HUD_STATIC_ELEMENTS: ClassId = ClassId::new(*b"wphs");
/// Overlay elements of a `wphi` tag.
pub const HUD_OVERLAY_ELEMENTS: ClassId = ClassId::new(*b"wpho");
/// Overlays of one overlay element.
pub const HUD_OVERLAYS: ClassId = ClassId::new(*b"wpoo");

/// Registers every built-in hook.
pub fn register(table: &mut HookTable) {
    table.register(ClassId::LENS_FLARE, Some(lens_flare::pre_compile), None);
    table.register(
        ClassId::WEAPON_HUD_INTERFACE,
        Some(weapon_hud::pre_compile),
        Some(weapon_hud::post_compile),
    );
}

/// A block array inside a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Reflexive {
    pub count: usize,
    pub array: Option<RecordId>,
    pub stride: usize,
}

impl Reflexive {
    /// Reads the reflexive at `offset` of `record`, checking that the array
    /// record holds every element it claims.
    pub fn read(
        store: &RecordStore,
        record: RecordId,
        offset: usize,
        stride: usize,
    ) -> Result<Self, String> {
        let count = bytes::read_u32(&store.get(record).bytes, offset)
            .ok_or_else(|| format!("block count at 0x{offset:X} lies outside the record"))?
            as usize;
        if count == 0 {
            return Ok(Self {
                count,
                array: None,
                stride,
            });
        }
        let array = store
            .resolve_pointer(record, offset + 4)
            .ok()
            .flatten()
            .ok_or_else(|| format!("block at 0x{offset:X} has {count} element(s) but no array"))?;
        let held = store.get(array).bytes.len() / stride;
        if held < count {
            return Err(format!(
                "block at 0x{offset:X} has {count} element(s) but its array holds {held}"
            ));
        }
        Ok(Self {
            count,
            array: Some(array),
            stride,
        })
    }

    /// The array record and the base offset of every element.
    pub fn elements(&self) -> impl Iterator<Item = (RecordId, usize)> + '_ {
        self.array
            .into_iter()
            .flat_map(move |array| (0..self.count).map(move |i| (array, i * self.stride)))
    }
}

/// Checks that `record` is at least `len` bytes long.
pub(crate) fn require_len(store: &RecordStore, record: RecordId, len: usize) -> Result<(), String> {
    let record = store.get(record);
    if record.bytes.len() < len {
        return Err(format!(
            "{} record is {} bytes, shorter than its 0x{len:X}-byte layout",
            record.class,
            record.bytes.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::record::{Record, Reference};

    /// Writes a `u32` count at `offset` of `owner` and points it at `array`.
    pub(crate) fn attach(
        store: &mut RecordStore,
        owner: RecordId,
        offset: usize,
        count: u32,
        array: RecordId,
    ) {
        let record = store.get_mut(owner);
        assert!(bytes::write_u32(&mut record.bytes, offset, count));
        record.references.push(Reference::address(offset + 4, array));
    }

    #[test]
    fn empty_reflexive_needs_no_array() {
        let mut store = RecordStore::new();
        let id = store.add(Record::new(ClassId::new(*b"test"), vec![0; 8]));
        let reflexive = Reflexive::read(&store, id, 0, 4).unwrap();
        assert_eq!(reflexive.count, 0);
        assert_eq!(reflexive.elements().count(), 0);
    }

    #[test]
    fn elements_step_by_stride() {
        let mut store = RecordStore::new();
        let array = store.add(Record::new(ClassId::new(*b"arry"), vec![0; 12]));
        let id = store.add(Record::new(ClassId::new(*b"test"), vec![0; 8]));
        attach(&mut store, id, 0, 3, array);
        let reflexive = Reflexive::read(&store, id, 0, 4).unwrap();
        let offsets: Vec<usize> = reflexive.elements().map(|(_, at)| at).collect();
        assert_eq!(offsets, [0, 4, 8]);
    }

    #[test]
    fn short_array_is_rejected() {
        let mut store = RecordStore::new();
        let array = store.add(Record::new(ClassId::new(*b"arry"), vec![0; 7]));
        let id = store.add(Record::new(ClassId::new(*b"test"), vec![0; 8]));
        attach(&mut store, id, 0, 2, array);
        let err = Reflexive::read(&store, id, 0, 4).unwrap_err();
        assert!(err.contains("holds 1"), "{err}");
    }

    #[test]
    fn count_without_array_is_rejected() {
        let mut store = RecordStore::new();
        let mut record = Record::new(ClassId::new(*b"test"), vec![0; 8]);
        bytes::write_u32(&mut record.bytes, 0, 1);
        let id = store.add(record);
        assert!(Reflexive::read(&store, id, 0, 4).is_err());
    }

    #[test]
    fn short_record() {
        let mut store = RecordStore::new();
        let id = store.add(Record::new(ClassId::LENS_FLARE, vec![0; 4]));
        assert!(require_len(&store, id, 4).is_ok());
        let err = require_len(&store, id, 0xF0).unwrap_err();
        assert_eq!(err, "lens record is 4 bytes, shorter than its 0xF0-byte layout");
    }
}
