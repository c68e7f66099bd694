//! `lens` pre-hook: default scales and precomputed cosines.

use super::{require_len, Reflexive};
use crate::errors::E414;
use crate::hooks::PreHookContext;
use cairn_common::bytes;

/// Offset of `falloff_angle` (radians).
pub const FALLOFF_ANGLE: usize = 0x0;
/// Offset of `cutoff_angle` (radians).
pub const CUTOFF_ANGLE: usize = 0x4;
/// Offset of `cos_falloff_angle`.
pub const COS_FALLOFF_ANGLE: usize = 0x8;
/// Offset of `cos_cutoff_angle`.
pub const COS_CUTOFF_ANGLE: usize = 0xC;
/// Offset of the bitmap dependency.
pub const BITMAP: usize = 0x20;
/// Offset of `horizontal_scale`.
pub const HORIZONTAL_SCALE: usize = 0x70;
/// Offset of `vertical_scale`.
pub const VERTICAL_SCALE: usize = 0x74;
/// Offset of `rotation_function_scale`.
pub const ROTATION_FUNCTION_SCALE: usize = 0x7C;
/// Offset of the reflections block.
pub const REFLECTIONS: usize = 0xD0;
/// Size of a lens flare record.
pub const LENS_FLARE_SIZE: usize = 0xF0;
/// Size of one reflection.
pub const REFLECTION_SIZE: usize = 0x80;
/// Offset of `animation_period` within a reflection.
pub const REFLECTION_ANIMATION_PERIOD: usize = 0x60;

fn default_f32(data: &mut [u8], offset: usize, value: f32) {
    if bytes::read_f32(data, offset) == Some(0.0) {
        bytes::write_f32(data, offset, value);
    }
}

/// Fills zeroed scales and animation periods and stores the cosines of the
/// falloff and cutoff angles.
pub fn pre_compile(ctx: &mut PreHookContext<'_>) {
    if let Err(message) = require_len(ctx.store, ctx.record, LENS_FLARE_SIZE) {
        ctx.error(E414, message);
        return;
    }
    let reflections = match Reflexive::read(ctx.store, ctx.record, REFLECTIONS, REFLECTION_SIZE) {
        Ok(block) => block,
        Err(message) => {
            ctx.error(E414, format!("reflections: {message}"));
            return;
        }
    };

    let data = &mut ctx.record_mut().bytes;
    default_f32(data, VERTICAL_SCALE, 1.0);
    default_f32(data, HORIZONTAL_SCALE, 1.0);
    default_f32(data, ROTATION_FUNCTION_SCALE, 360.0);
    for (field, cos) in [(FALLOFF_ANGLE, COS_FALLOFF_ANGLE), (CUTOFF_ANGLE, COS_CUTOFF_ANGLE)] {
        let angle = bytes::read_f32(data, field).unwrap_or(0.0);
        bytes::write_f32(data, cos, angle.cos());
    }

    for (array, base) in reflections.elements() {
        default_f32(
            &mut ctx.store.get_mut(array).bytes,
            base + REFLECTION_ANIMATION_PERIOD,
            1.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::tests::attach;
    use crate::builtin::LENS_REFLECTIONS;
    use crate::record::{ClassId, Record};
    use crate::store::RecordStore;
    use cairn_common::RecordId;
    use cairn_diagnostics::DiagnosticSink;
    use cairn_map::Engine;

    fn run(store: &mut RecordStore, record: RecordId) -> DiagnosticSink {
        let sink = DiagnosticSink::new();
        let mut ctx = PreHookContext {
            record,
            store,
            sink: &sink,
            engine: Engine::CustomEdition,
        };
        pre_compile(&mut ctx);
        sink
    }

    fn f32_at(store: &RecordStore, record: RecordId, offset: usize) -> f32 {
        bytes::read_f32(&store.get(record).bytes, offset).unwrap()
    }

    #[test]
    fn fills_defaults_and_cosines() {
        let mut store = RecordStore::new();
        let mut lens = Record::new(ClassId::LENS_FLARE, vec![0; LENS_FLARE_SIZE]);
        bytes::write_f32(&mut lens.bytes, CUTOFF_ANGLE, std::f32::consts::PI);
        bytes::write_f32(&mut lens.bytes, HORIZONTAL_SCALE, 2.5);
        let lens = store.add(lens);
        let mut reflections = vec![0; 2 * REFLECTION_SIZE];
        bytes::write_f32(&mut reflections, REFLECTION_SIZE + REFLECTION_ANIMATION_PERIOD, 3.0);
        let reflections = store.add(Record::new(LENS_REFLECTIONS, reflections));
        attach(&mut store, lens, REFLECTIONS, 2, reflections);

        let sink = run(&mut store, lens);
        assert_eq!(sink.error_count(), 0);
        assert_eq!(f32_at(&store, lens, VERTICAL_SCALE), 1.0);
        assert_eq!(f32_at(&store, lens, HORIZONTAL_SCALE), 2.5);
        assert_eq!(f32_at(&store, lens, ROTATION_FUNCTION_SCALE), 360.0);
        assert_eq!(f32_at(&store, lens, COS_FALLOFF_ANGLE), 1.0);
        assert!((f32_at(&store, lens, COS_CUTOFF_ANGLE) + 1.0).abs() < 1e-6);
        assert_eq!(f32_at(&store, reflections, REFLECTION_ANIMATION_PERIOD), 1.0);
        assert_eq!(
            f32_at(&store, reflections, REFLECTION_SIZE + REFLECTION_ANIMATION_PERIOD),
            3.0
        );
    }

    #[test]
    fn short_lens_is_reported() {
        let mut store = RecordStore::new();
        let lens = store.add(Record::new(ClassId::LENS_FLARE, vec![0; 0x10]));
        let sink = run(&mut store, lens);
        assert_eq!(sink.diagnostics()[0].code, Some(E414));
        assert_eq!(store.get(lens).bytes, vec![0; 0x10]);
    }
}
