//! Moves a header between its uncompressed and compressed forms.
//!
//! [`to_target`] runs in the compress direction and [`to_source`] in the
//! decompress direction. They are inverses: a header taken to its target
//! form and back is byte-identical to the original as long as the original
//! is in the shape its engine uses and demo padding is zero.

use crate::engine::{Engine, EngineForm};
use crate::error::MapError;
use crate::header::{CacheHeader, HeaderShape, HEADER_SIZE};
use tracing::debug;

fn identify(header: &CacheHeader) -> Result<(Engine, EngineForm), MapError> {
    let raw = header.engine_raw();
    Engine::identify(raw).ok_or(MapError::UnsupportedEngine { raw })
}

/// Rewrites an uncompressed header into its compressed form.
///
/// The result always uses the standard shape, carries the compressed engine
/// enumeration, and records `decompressed_size`.
pub fn to_target(header: &CacheHeader, decompressed_size: u64) -> Result<CacheHeader, MapError> {
    let (engine, form) = identify(header)?;
    if form == EngineForm::Compressed {
        return Err(MapError::AlreadyTransformed { form: "compressed" });
    }
    if engine == Engine::DarkCirclet && header.decompressed_size() > 0 {
        return Err(MapError::NeedsDecompressedForm);
    }
    let size = u32::try_from(decompressed_size).map_err(|_| MapError::SizeOverflow {
        size: decompressed_size,
    })?;

    let mut out = header.reshaped(HeaderShape::Standard);
    out.set_engine_raw(engine.compressed_raw());
    out.set_decompressed_size(size);
    debug!(%engine, size, "header transcoded to compressed form");
    Ok(out)
}

/// Rewrites a compressed header into its uncompressed form.
///
/// Returns the new header together with the decompressed size the input
/// declared. The returned header has its size field reset to zero and uses
/// the demo shape when the engine is the legacy demo.
pub fn to_source(header: &CacheHeader) -> Result<(CacheHeader, u32), MapError> {
    if header.shape() == HeaderShape::Demo {
        return Err(MapError::AlreadyTransformed {
            form: "uncompressed",
        });
    }
    let (engine, form) = identify(header)?;
    if engine == Engine::DarkCirclet {
        if header.decompressed_size() == 0 {
            return Err(MapError::NeedsCompressedForm);
        }
    } else if form == EngineForm::Uncompressed {
        return Err(MapError::AlreadyTransformed {
            form: "uncompressed",
        });
    }

    let declared = header.decompressed_size();
    if (declared as usize) < HEADER_SIZE || !header.valid() {
        return Err(MapError::invalid_header(format!(
            "declared decompressed size {declared} is smaller than the header"
        )));
    }

    let mut out = header.clone();
    out.set_engine_raw(engine.raw());
    out.set_decompressed_size(0);
    if engine.uses_demo_header() {
        out = out.reshaped(HeaderShape::Demo);
    }
    debug!(%engine, declared, "header transcoded to uncompressed form");
    Ok((out, declared))
}
