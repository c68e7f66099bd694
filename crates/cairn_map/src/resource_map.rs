//! External resource map side-tables (bitmaps, sounds, localization).
//!
//! A resource map starts with a 16-byte header (`type`, `paths`,
//! `resources`, `resource_count`), followed somewhere by `resource_count`
//! 12-byte entries (`path_offset`, `size`, `data_offset`). Each path is a
//! NUL-terminated string at `paths + path_offset`.

use crate::error::MapError;
use cairn_common::bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const MAP_HEADER_SIZE: usize = 0x10;
const ENTRY_SIZE: usize = 0xC;

/// Which kind of data a resource map holds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceMapKind {
    /// `bitmaps.map`
    Bitmaps,
    /// `sounds.map`
    Sounds,
    /// `loc.map`
    Loc,
}

impl ResourceMapKind {
    /// The value of the header's `type` field.
    pub fn raw(self) -> u32 {
        match self {
            ResourceMapKind::Bitmaps => 1,
            ResourceMapKind::Sounds => 2,
            ResourceMapKind::Loc => 3,
        }
    }

    fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(ResourceMapKind::Bitmaps),
            2 => Some(ResourceMapKind::Sounds),
            3 => Some(ResourceMapKind::Loc),
            _ => None,
        }
    }
}

/// One resource in a resource map.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ResourceEntry {
    /// The resource path.
    pub path: String,
    /// Size in bytes of the resource data.
    pub size: u32,
    /// Offset of the resource data within the resource map.
    pub data_offset: u32,
}

/// A parsed resource map.
#[derive(Clone, Debug)]
pub struct ResourceMap {
    kind: ResourceMapKind,
    entries: Vec<ResourceEntry>,
    by_path: HashMap<String, u32>,
}

fn invalid(reason: impl Into<String>) -> MapError {
    MapError::InvalidResourceMap {
        reason: reason.into(),
    }
}

impl ResourceMap {
    /// Parses a resource map, bounds-checking every table and path.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MapError> {
        let field = |offset| {
            bytes::read_u32(data, offset)
                .ok_or_else(|| invalid(format!("truncated header ({} bytes)", data.len())))
        };
        let kind_raw = field(0x0)?;
        let paths = field(0x4)? as usize;
        let resources = field(0x8)? as usize;
        let count = field(0xC)? as usize;

        let kind = ResourceMapKind::from_raw(kind_raw)
            .ok_or_else(|| invalid(format!("unknown type {kind_raw}")))?;

        let table_fits = count
            .checked_mul(ENTRY_SIZE)
            .and_then(|len| len.checked_add(resources))
            .is_some_and(|end| end <= data.len());
        if !table_fits {
            return Err(invalid(format!(
                "{count} entries at 0x{resources:X} exceed the file"
            )));
        }

        let mut entries = Vec::with_capacity(count);
        let mut by_path = HashMap::with_capacity(count);
        for index in 0..count {
            let base = resources + index * ENTRY_SIZE;
            let path_offset = field(base)? as usize;
            let size = field(base + 4)?;
            let data_offset = field(base + 8)?;

            let path_start = paths
                .checked_add(path_offset)
                .filter(|&start| start < data.len())
                .ok_or_else(|| invalid(format!("path of entry {index} is out of bounds")))?;
            let tail = &data[path_start..];
            let path_len = tail
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| invalid(format!("path of entry {index} is not terminated")))?;
            let path = String::from_utf8_lossy(&tail[..path_len]).into_owned();

            let data_end = u64::from(data_offset) + u64::from(size);
            if data_end > data.len() as u64 {
                return Err(invalid(format!("data of '{path}' is out of bounds")));
            }

            // First occurrence wins for duplicate paths.
            by_path.entry(path.clone()).or_insert(index as u32);
            entries.push(ResourceEntry {
                path,
                size,
                data_offset,
            });
        }

        Ok(Self {
            kind,
            entries,
            by_path,
        })
    }

    /// Reads and parses a resource map file.
    pub fn load(path: &Path) -> Result<Self, MapError> {
        let data = std::fs::read(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::from_bytes(&data)?;
        tracing::debug!(
            path = %path.display(),
            kind = ?map.kind,
            entries = map.len(),
            "loaded resource map"
        );
        Ok(map)
    }

    /// Which kind of data this map holds.
    pub fn kind(&self) -> ResourceMapKind {
        self.kind
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no resources.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the resource at `index`.
    pub fn get(&self, index: u32) -> Option<&ResourceEntry> {
        self.entries.get(index as usize)
    }

    /// Finds a resource by path, returning its index and entry.
    pub fn find(&self, path: &str) -> Option<(u32, &ResourceEntry)> {
        let index = *self.by_path.get(path)?;
        Some((index, &self.entries[index as usize]))
    }

    /// Iterates over every resource in index order.
    pub fn entries(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.entries.iter()
    }

    /// Serializes a resource map holding `resources` as `(path, data)` pairs.
    ///
    /// Layout is header, resource data, path table, entry table.
    pub fn build(kind: ResourceMapKind, resources: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = vec![0u8; MAP_HEADER_SIZE];
        let mut records = Vec::with_capacity(resources.len());
        for (_, data) in resources {
            records.push((out.len() as u32, data.len() as u32));
            out.extend_from_slice(data);
        }

        let paths = out.len();
        let mut path_offsets = Vec::with_capacity(resources.len());
        for (path, _) in resources {
            path_offsets.push((out.len() - paths) as u32);
            out.extend_from_slice(path.as_bytes());
            out.push(0);
        }

        let table = out.len();
        for (path_offset, (data_offset, size)) in path_offsets.into_iter().zip(records) {
            out.extend_from_slice(&path_offset.to_le_bytes());
            out.extend_from_slice(&size.to_le_bytes());
            out.extend_from_slice(&data_offset.to_le_bytes());
        }

        bytes::write_u32(&mut out, 0x0, kind.raw());
        bytes::write_u32(&mut out, 0x4, paths as u32);
        bytes::write_u32(&mut out, 0x8, table as u32);
        bytes::write_u32(&mut out, 0xC, resources.len() as u32);
        out
    }
}
