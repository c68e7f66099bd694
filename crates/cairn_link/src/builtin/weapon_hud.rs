//! `wphi` hooks: crosshair type flags and bitmap sequence checks.

use super::bitmap::{self, Sequence};
use super::{require_len, Reflexive};
use crate::errors::{E410, E411, E412, E413, E414, W410, W411};
use crate::hooks::{PostHookContext, PreHookContext};
use crate::store::RecordStore;
use cairn_common::{bytes, RecordId};
use cairn_map::Engine;

/// Size of a weapon HUD interface record.
pub const WEAPON_HUD_SIZE: usize = 0x17C;
/// Offset of the static elements block.
pub const STATIC_ELEMENTS: usize = 0x60;
/// Offset of the meters block.
pub const METERS: usize = 0x6C;
/// Offset of the crosshairs block.
pub const CROSSHAIRS: usize = 0x88;
/// Offset of the overlay elements block.
pub const OVERLAY_ELEMENTS: usize = 0x94;
/// Offset of the aggregated `crosshair_types` flags.
pub const CROSSHAIR_TYPES: usize = 0xA0;

/// Size of one crosshair.
pub const CROSSHAIR_SIZE: usize = 0x68;
/// Offset of `crosshair_type` within a crosshair.
pub const CROSSHAIR_TYPE: usize = 0x0;
/// Offset of the bitmap tag id within a crosshair.
pub const CROSSHAIR_BITMAP: usize = 0x30;
/// Offset of the overlays block within a crosshair.
pub const CROSSHAIR_OVERLAYS: usize = 0x58;

/// Size of one crosshair overlay.
pub const CROSSHAIR_OVERLAY_SIZE: usize = 0x6C;
/// Offset of `sequence_index` within a crosshair overlay.
pub const CROSSHAIR_OVERLAY_SEQUENCE: usize = 0x46;
/// Offset of the flags within a crosshair overlay.
pub const CROSSHAIR_OVERLAY_FLAGS: usize = 0x48;

/// Size of one meter.
pub const METER_SIZE: usize = 0xB4;
/// Offset of the bitmap tag id within a meter.
pub const METER_BITMAP: usize = 0x30;
/// Offset of `sequence_index` within a meter.
pub const METER_SEQUENCE: usize = 0x60;

/// Size of one static element.
pub const STATIC_ELEMENT_SIZE: usize = 0xB4;
/// Offset of the bitmap tag id within a static element.
pub const STATIC_ELEMENT_BITMAP: usize = 0x54;
/// Offset of `sequence_index` within a static element.
pub const STATIC_ELEMENT_SEQUENCE: usize = 0x66;

/// Size of one overlay element.
pub const OVERLAY_ELEMENT_SIZE: usize = 0x68;
/// Offset of the bitmap tag id within an overlay element.
pub const OVERLAY_ELEMENT_BITMAP: usize = 0x30;
/// Offset of the overlays block within an overlay element.
pub const OVERLAY_ELEMENT_OVERLAYS: usize = 0x58;

/// Size of one overlay.
pub const OVERLAY_SIZE: usize = 0x88;
/// Offset of `sequence_index` within an overlay.
pub const OVERLAY_SEQUENCE: usize = 0x46;

/// `crosshair_type` of a zoom-level crosshair.
pub const ZOOM_CROSSHAIR_TYPE: u16 = 1;
/// Overlay flag: the sequence is drawn as whole bitmaps.
pub const OVERLAY_NOT_A_SPRITE: u32 = 1 << 1;
/// Overlay flag: only drawn while zoomed.
pub const OVERLAY_SHOW_ONLY_WHEN_ZOOMED: u32 = 1 << 2;
/// Overlay flag: hidden while zoomed.
pub const OVERLAY_DONT_SHOW_WHEN_ZOOMED: u32 = 1 << 6;
/// A sequence index that selects nothing.
pub const NULL_SEQUENCE: u16 = 0xFFFF;

fn crosshairs(store: &RecordStore, root: RecordId) -> Result<Reflexive, String> {
    Reflexive::read(store, root, CROSSHAIRS, CROSSHAIR_SIZE)
        .map_err(|message| format!("crosshairs: {message}"))
}

/// Aggregates crosshair types into `crosshair_types` and warns about zoom
/// overlays that can never change.
pub fn pre_compile(ctx: &mut PreHookContext<'_>) {
    if let Err(message) = require_len(ctx.store, ctx.record, WEAPON_HUD_SIZE) {
        ctx.error(E414, message);
        return;
    }
    let crosshairs = match crosshairs(ctx.store, ctx.record) {
        Ok(block) => block,
        Err(message) => {
            ctx.error(E414, message);
            return;
        }
    };

    let mut types = 0u32;
    let mut zoom_overlays = 0usize;
    for (array, base) in crosshairs.elements() {
        let data = &ctx.store.get(array).bytes;
        let kind = bytes::read_u16(data, base + CROSSHAIR_TYPE).unwrap_or(0);
        types |= 1u32.checked_shl(u32::from(kind)).unwrap_or(0);

        let overlays = Reflexive::read(
            ctx.store,
            array,
            base + CROSSHAIR_OVERLAYS,
            CROSSHAIR_OVERLAY_SIZE,
        );
        let overlays = match overlays {
            Ok(block) => block,
            Err(message) => {
                ctx.error(E414, format!("crosshair overlays: {message}"));
                continue;
            }
        };
        zoom_overlays += overlays
            .elements()
            .filter(|&(overlays, at)| {
                let raw = &ctx.store.get(overlays).bytes;
                let flags = bytes::read_u32(raw, at + CROSSHAIR_OVERLAY_FLAGS).unwrap_or(0);
                flags & (OVERLAY_SHOW_ONLY_WHEN_ZOOMED | OVERLAY_DONT_SHOW_WHEN_ZOOMED) != 0
            })
            .count();
    }

    bytes::write_u32(&mut ctx.record_mut().bytes, CROSSHAIR_TYPES, types);

    let has_zoom = types & (1 << ZOOM_CROSSHAIR_TYPE) != 0;
    if ctx.engine != Engine::DarkCirclet && !has_zoom && zoom_overlays > 0 {
        let verb = if zoom_overlays == 1 { " is" } else { "s are" };
        ctx.warning(
            W410,
            format!(
                "{zoom_overlays} overlay{verb} set to change on zoom, but no zoom crosshairs exist."
            ),
        );
    }
}

/// How an element draws its sequence.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Draws {
    Bitmaps,
    Sprites,
    Either,
}

/// Checks one element's sequence index against its bitmap.
fn check_sequence(
    ctx: &PostHookContext<'_>,
    holder: RecordId,
    bitmap_field: usize,
    index: u16,
    draws: Draws,
    element: &str,
) {
    if index == NULL_SEQUENCE {
        return;
    }
    let bitmap = ctx.resolve_pointer(holder, bitmap_field).ok().flatten();
    let (path, sequences) = match bitmap {
        None => ("NULL".to_string(), Vec::new()),
        Some(bitmap) => {
            let path = match ctx.layout.tag_of(bitmap) {
                Some(tag) => ctx.store.tag_display_path(tag),
                None => bitmap.to_string(),
            };
            match bitmap::sequences(ctx.store, bitmap) {
                Ok(sequences) => (path, sequences),
                Err(message) => {
                    ctx.error(E414, format!("{path}: {message}"));
                    return;
                }
            }
        }
    };

    let prefix = format!("Sequence #{index} in {path} referenced in {element}");
    let Some(&Sequence {
        bitmap_count,
        sprite_count,
    }) = sequences.get(usize::from(index))
    else {
        ctx.error(
            E410,
            format!("{prefix} is out of bounds (>= {})", sequences.len()),
        );
        return;
    };
    match draws {
        Draws::Bitmaps if bitmap_count == 0 => ctx.error(E411, format!("{prefix} has 0 bitmaps")),
        Draws::Sprites if sprite_count == 0 => ctx.error(E412, format!("{prefix} has 0 sprites")),
        Draws::Either if bitmap_count == 0 && sprite_count == 0 => {
            ctx.error(E413, format!("{prefix} has 0 sprites/bitmaps"))
        }
        Draws::Either if bitmap_count != 0 && sprite_count != 0 => ctx.warning(
            W411,
            format!("{prefix} has both sprites and bitmaps, so which one is drawn is ambiguous"),
        ),
        _ => {}
    }
}

fn sequence_at(ctx: &PostHookContext<'_>, array: RecordId, field: usize) -> u16 {
    bytes::read_u16(&ctx.store.get(array).bytes, field).unwrap_or(NULL_SEQUENCE)
}

fn block(
    ctx: &PostHookContext<'_>,
    record: RecordId,
    offset: usize,
    stride: usize,
    name: &str,
) -> Option<Reflexive> {
    match Reflexive::read(ctx.store, record, offset, stride) {
        Ok(block) => Some(block),
        Err(message) => {
            ctx.error(E414, format!("{name}: {message}"));
            None
        }
    }
}

/// Validates every sequence index against the referenced bitmaps.
pub fn post_compile(ctx: &PostHookContext<'_>) {
    let root = ctx.record;
    if require_len(ctx.store, root, WEAPON_HUD_SIZE).is_err() {
        // Already reported before layout.
        return;
    }

    if let Some(crosshairs) = block(ctx, root, CROSSHAIRS, CROSSHAIR_SIZE, "crosshairs") {
        for (j, (array, base)) in crosshairs.elements().enumerate() {
            let Some(overlays) = block(
                ctx,
                array,
                base + CROSSHAIR_OVERLAYS,
                CROSSHAIR_OVERLAY_SIZE,
                "crosshair overlays",
            ) else {
                continue;
            };
            for (i, (overlay_array, at)) in overlays.elements().enumerate() {
                let raw = &ctx.store.get(overlay_array).bytes;
                let flags = bytes::read_u32(raw, at + CROSSHAIR_OVERLAY_FLAGS).unwrap_or(0);
                let draws = if flags & OVERLAY_NOT_A_SPRITE != 0 {
                    Draws::Bitmaps
                } else {
                    Draws::Sprites
                };
                check_sequence(
                    ctx,
                    array,
                    base + CROSSHAIR_BITMAP,
                    sequence_at(ctx, overlay_array, at + CROSSHAIR_OVERLAY_SEQUENCE),
                    draws,
                    &format!("overlay #{i} of crosshair #{j}"),
                );
            }
        }
    }

    if let Some(meters) = block(ctx, root, METERS, METER_SIZE, "meters") {
        for (i, (array, base)) in meters.elements().enumerate() {
            check_sequence(
                ctx,
                array,
                base + METER_BITMAP,
                sequence_at(ctx, array, base + METER_SEQUENCE),
                Draws::Sprites,
                &format!("meter #{i}"),
            );
        }
    }

    let statics = block(ctx, root, STATIC_ELEMENTS, STATIC_ELEMENT_SIZE, "static elements");
    if let Some(statics) = statics {
        for (i, (array, base)) in statics.elements().enumerate() {
            check_sequence(
                ctx,
                array,
                base + STATIC_ELEMENT_BITMAP,
                sequence_at(ctx, array, base + STATIC_ELEMENT_SEQUENCE),
                Draws::Either,
                &format!("static element #{i}"),
            );
        }
    }

    let elements = block(ctx, root, OVERLAY_ELEMENTS, OVERLAY_ELEMENT_SIZE, "overlay elements");
    if let Some(elements) = elements {
        for (j, (array, base)) in elements.elements().enumerate() {
            let Some(overlays) = block(
                ctx,
                array,
                base + OVERLAY_ELEMENT_OVERLAYS,
                OVERLAY_SIZE,
                "overlays",
            ) else {
                continue;
            };
            for (i, (overlay_array, at)) in overlays.elements().enumerate() {
                check_sequence(
                    ctx,
                    array,
                    base + OVERLAY_ELEMENT_BITMAP,
                    sequence_at(ctx, overlay_array, at + OVERLAY_SEQUENCE),
                    Draws::Bitmaps,
                    &format!("overlay #{i} of element #{j}"),
                );
            }
        }
    }
}
