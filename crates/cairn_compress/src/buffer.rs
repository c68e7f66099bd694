//! Whole-buffer compression and decompression.

use crate::error::CompressError;
use cairn_map::{to_source, to_target, CacheHeader, HEADER_SIZE};
use std::io::Read;
use tracing::debug;

/// Compresses a linked cache.
///
/// The header is rewritten into its compressed form recording the input
/// length as the decompressed size; the body is encoded as one zstd frame at
/// `level`.
pub fn compress(buffer: &[u8], level: i32) -> Result<Vec<u8>, CompressError> {
    let header = CacheHeader::from_bytes(buffer)?;
    let header = to_target(&header, buffer.len() as u64)?;

    let body = zstd::bulk::compress(&buffer[HEADER_SIZE..], level).map_err(|e| {
        CompressError::CompressionFailure {
            reason: e.to_string(),
        }
    })?;

    let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&body);
    debug!(
        input = buffer.len(),
        output = out.len(),
        level,
        "compressed cache"
    );
    Ok(out)
}

/// Decompresses a compressed cache.
///
/// Decoding stops one byte past the declared size so a corrupt header cannot
/// cause unbounded allocation.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CompressError> {
    let header = CacheHeader::from_bytes(data)?;
    let (header, declared) = to_source(&header)?;
    let expected = u64::from(declared);
    let body_len = expected - HEADER_SIZE as u64;

    let mut out = Vec::with_capacity(HEADER_SIZE + data.len());
    out.extend_from_slice(header.as_bytes());
    let decoder = zstd::stream::read::Decoder::new(&data[HEADER_SIZE..])
        .map_err(CompressError::decompression)?;
    decoder
        .take(body_len + 1)
        .read_to_end(&mut out)
        .map_err(CompressError::decompression)?;

    let actual = out.len() as u64;
    if actual != expected {
        return Err(CompressError::SizeMismatch { expected, actual });
    }
    debug!(input = data.len(), output = out.len(), "decompressed cache");
    Ok(out)
}
