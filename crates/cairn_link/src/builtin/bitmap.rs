//! Reading the sequence table of a `bitm` tag.

use super::Reflexive;
use crate::store::RecordStore;
use cairn_common::{bytes, RecordId};

/// Offset of the sequences block in a bitmap record.
pub const SEQUENCES: usize = 0x54;
/// Size of a bitmap record.
pub const BITMAP_SIZE: usize = 0x6C;
/// Size of one sequence element.
pub const SEQUENCE_SIZE: usize = 0x40;
/// Offset of `bitmap_count` within a sequence.
pub const SEQUENCE_BITMAP_COUNT: usize = 0x22;
/// Offset of the sprites block count within a sequence.
pub const SEQUENCE_SPRITES: usize = 0x34;

/// What a HUD element can draw from one bitmap sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sequence {
    /// Number of whole bitmaps.
    pub bitmap_count: u16,
    /// Number of sprites.
    pub sprite_count: u32,
}

/// Reads every sequence of the bitmap rooted at `bitmap`.
pub fn sequences(store: &RecordStore, bitmap: RecordId) -> Result<Vec<Sequence>, String> {
    super::require_len(store, bitmap, BITMAP_SIZE)?;
    let block = Reflexive::read(store, bitmap, SEQUENCES, SEQUENCE_SIZE)?;
    Ok(block
        .elements()
        .map(|(array, base)| {
            let data = &store.get(array).bytes;
            Sequence {
                bitmap_count: bytes::read_u16(data, base + SEQUENCE_BITMAP_COUNT).unwrap_or(0),
                sprite_count: bytes::read_u32(data, base + SEQUENCE_SPRITES).unwrap_or(0),
            }
        })
        .collect())
}
