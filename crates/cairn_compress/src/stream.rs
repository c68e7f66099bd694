//! File-to-file streaming decompression in bounded memory.

use crate::error::CompressError;
use cairn_map::{to_source, CacheHeader, HEADER_SIZE};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;
use zstd::stream::raw::{Decoder, InBuffer, Operation, OutBuffer};
use zstd::zstd_safe::DCtx;

/// Decompresses the cache at `input` into `output`.
///
/// Output is staged in a temporary file next to `output` and persisted only
/// once the whole frame has been decoded and its size matches the header.
/// On any error the temporary file is removed and `output` is untouched.
/// Returns the number of bytes written.
pub fn decompress_file(input: &Path, output: &Path) -> Result<u64, CompressError> {
    let mut file = File::open(input).map_err(CompressError::io(input))?;
    let len = file.metadata().map_err(CompressError::io(input))?.len();

    let mut raw_header = Vec::with_capacity(HEADER_SIZE);
    (&mut file)
        .take(HEADER_SIZE as u64)
        .read_to_end(&mut raw_header)
        .map_err(CompressError::io(input))?;
    let (header, declared) = to_source(&CacheHeader::from_bytes(&raw_header)?)?;

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir).map_err(CompressError::io(output))?;

    let written = {
        let mut writer = BufWriter::new(staged.as_file_mut());
        writer
            .write_all(header.as_bytes())
            .map_err(CompressError::io(output))?;
        let limit = u64::from(declared) - HEADER_SIZE as u64;
        let body = decode_body(&mut file, input, len, &mut writer, output, limit)?;
        writer.flush().map_err(CompressError::io(output))?;
        HEADER_SIZE as u64 + body
    };

    let expected = u64::from(declared);
    if written != expected {
        return Err(CompressError::SizeMismatch {
            expected,
            actual: written,
        });
    }

    staged
        .persist(output)
        .map_err(|e| CompressError::io(output)(e.error))?;
    debug!(
        input = %input.display(),
        output = %output.display(),
        compressed = len,
        decompressed = written,
        "decompressed cache file"
    );
    Ok(written)
}

/// Feeds the remainder of `file` through a streaming decoder.
///
/// Each read requests exactly as many bytes as the decoder hinted it needs
/// next, clamped to the input buffer and to what is left of the file.
/// Decoding stops as soon as more than `limit` bytes have been produced.
fn decode_body(
    file: &mut File,
    input: &Path,
    len: u64,
    writer: &mut impl Write,
    output: &Path,
    limit: u64,
) -> Result<u64, CompressError> {
    let mut decoder = Decoder::new().map_err(CompressError::decompression)?;
    let mut in_buf = vec![0u8; DCtx::in_size()];
    let mut out_buf = vec![0u8; DCtx::out_size()];

    let mut consumed = HEADER_SIZE as u64;
    let mut written = 0u64;
    let mut hint = in_buf.len();
    let mut frame_complete = false;

    while consumed < len {
        let want = hint.clamp(1, in_buf.len()).min((len - consumed) as usize);
        let chunk = &mut in_buf[..want];
        file.read_exact(chunk).map_err(CompressError::io(input))?;
        consumed += want as u64;

        let mut src = InBuffer::around(chunk);
        loop {
            let produced = {
                let mut dst = OutBuffer::around(&mut out_buf[..]);
                hint = decoder
                    .run(&mut src, &mut dst)
                    .map_err(CompressError::decompression)?;
                dst.pos()
            };
            writer
                .write_all(&out_buf[..produced])
                .map_err(CompressError::io(output))?;
            written += produced as u64;
            if written > limit {
                return Err(CompressError::SizeMismatch {
                    expected: HEADER_SIZE as u64 + limit,
                    actual: HEADER_SIZE as u64 + written,
                });
            }
            if src.pos() == src.src.len() && produced < out_buf.len() {
                break;
            }
        }
        frame_complete = hint == 0;
    }

    if !frame_complete {
        return Err(CompressError::TruncatedInput {
            path: input.to_path_buf(),
            len,
        });
    }
    debug!(read = consumed, written, "streamed cache body");
    Ok(written)
}
