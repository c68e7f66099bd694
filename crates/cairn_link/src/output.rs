//! Writing a linked cache to disk.

use crate::error::LinkError;
use crate::link::LinkedBuffer;
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

fn io(path: &Path) -> impl FnOnce(std::io::Error) -> LinkError + '_ {
    move |source| LinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes `buffer` to `path`, compressed at `compression` if given, and
/// returns the number of bytes written.
///
/// The file is staged next to `path` and only replaces it once fully
/// written; on failure `path` is left as it was.
pub fn write_cache_file(
    path: &Path,
    buffer: &LinkedBuffer,
    compression: Option<i32>,
) -> Result<u64, LinkError> {
    let data = match compression {
        Some(level) => Cow::Owned(buffer.compress(level)?),
        None => Cow::Borrowed(buffer.as_bytes()),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir).map_err(io(path))?;
    staged.write_all(&data).map_err(io(path))?;
    staged.flush().map_err(io(path))?;
    staged.persist(path).map_err(|e| io(path)(e.error))?;

    debug!(
        path = %path.display(),
        linked = buffer.len(),
        written = data.len(),
        compressed = compression.is_some(),
        "wrote cache file"
    );
    Ok(data.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookTable;
    use crate::record::{ClassId, Record};
    use crate::session::{CompileSession, SessionOptions};
    use crate::store::RecordStore;
    use cairn_map::Engine;

    fn linked() -> LinkedBuffer {
        let mut store = RecordStore::new();
        let root = store.add(Record::new(ClassId::SHADER, vec![7; 64]));
        store.add_tag("shaders\\plain", ClassId::SHADER, root);
        let options = SessionOptions::new(Engine::CustomEdition, "out");
        CompileSession::new(store, HookTable::new(), options)
            .compile()
            .unwrap()
            .buffer
            .unwrap()
    }

    #[test]
    fn writes_uncompressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.map");
        let buffer = linked();
        let written = write_cache_file(&path, &buffer, None).unwrap();
        assert_eq!(written, buffer.len() as u64);
        assert_eq!(std::fs::read(&path).unwrap(), buffer.as_bytes());
    }

    #[test]
    fn writes_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.map");
        let buffer = linked();
        write_cache_file(&path, &buffer, Some(3)).unwrap();
        let data = std::fs::read(&path).unwrap();
        assert_eq!(cairn_compress::decompress(&data).unwrap(), buffer.as_bytes());
    }

    #[test]
    fn missing_directory_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.map");
        let err = write_cache_file(&path, &linked(), None).unwrap_err();
        assert!(matches!(err, LinkError::Io { .. }));
        assert!(!path.exists());
    }
}
