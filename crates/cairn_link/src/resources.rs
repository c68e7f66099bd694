//! The resource maps resource references resolve against.

use cairn_config::ResourceConfig;
use cairn_map::{MapError, ResourceEntry, ResourceMap, ResourceMapKind};
use std::path::Path;

/// The bitmaps, sounds and loc resource maps available to a link.
#[derive(Clone, Debug, Default)]
pub struct ResourceMaps {
    bitmaps: Option<ResourceMap>,
    sounds: Option<ResourceMap>,
    loc: Option<ResourceMap>,
}

impl ResourceMaps {
    /// No resource maps; every resource reference is unresolved.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every map named in `config`.
    ///
    /// A file whose `type` field disagrees with the slot it is configured in
    /// is rejected.
    pub fn load(config: &ResourceConfig) -> Result<Self, MapError> {
        let mut maps = Self::new();
        let slots = [
            (ResourceMapKind::Bitmaps, &config.bitmaps),
            (ResourceMapKind::Sounds, &config.sounds),
            (ResourceMapKind::Loc, &config.loc),
        ];
        for (kind, path) in slots {
            if let Some(path) = path {
                maps.insert(load_kind(path, kind)?);
            }
        }
        Ok(maps)
    }

    /// Installs `map` in the slot for its kind, replacing any previous map.
    pub fn insert(&mut self, map: ResourceMap) {
        let slot = match map.kind() {
            ResourceMapKind::Bitmaps => &mut self.bitmaps,
            ResourceMapKind::Sounds => &mut self.sounds,
            ResourceMapKind::Loc => &mut self.loc,
        };
        *slot = Some(map);
    }

    /// The map of `kind`, if one is loaded.
    pub fn get(&self, kind: ResourceMapKind) -> Option<&ResourceMap> {
        match kind {
            ResourceMapKind::Bitmaps => self.bitmaps.as_ref(),
            ResourceMapKind::Sounds => self.sounds.as_ref(),
            ResourceMapKind::Loc => self.loc.as_ref(),
        }
    }

    /// Looks up `path` in the map of `kind`.
    pub fn find(&self, kind: ResourceMapKind, path: &str) -> Option<(u32, &ResourceEntry)> {
        self.get(kind)?.find(path)
    }
}

fn load_kind(path: &Path, kind: ResourceMapKind) -> Result<ResourceMap, MapError> {
    let map = ResourceMap::load(path)?;
    if map.kind() != kind {
        return Err(MapError::InvalidResourceMap {
            reason: format!(
                "{} is a {:?} map, expected {kind:?}",
                path.display(),
                map.kind()
            ),
        });
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_map(dir: &Path, name: &str, kind: ResourceMapKind) -> std::path::PathBuf {
        let data: &[u8] = &[7; 4];
        let path = dir.join(name);
        std::fs::write(&path, ResourceMap::build(kind, &[("a\\b", data)])).unwrap();
        path
    }

    #[test]
    fn load_configured_maps() {
        let dir = tempfile::tempdir().unwrap();
        let config = ResourceConfig {
            bitmaps: Some(write_map(dir.path(), "bitmaps.map", ResourceMapKind::Bitmaps)),
            sounds: None,
            loc: Some(write_map(dir.path(), "loc.map", ResourceMapKind::Loc)),
        };
        let maps = ResourceMaps::load(&config).unwrap();
        assert!(maps.get(ResourceMapKind::Bitmaps).is_some());
        assert!(maps.get(ResourceMapKind::Sounds).is_none());
        assert_eq!(maps.find(ResourceMapKind::Loc, "a\\b").map(|(i, _)| i), Some(0));
        assert!(maps.find(ResourceMapKind::Sounds, "a\\b").is_none());
    }

    #[test]
    fn wrong_kind_in_slot() {
        let dir = tempfile::tempdir().unwrap();
        let config = ResourceConfig {
            sounds: Some(write_map(dir.path(), "sounds.map", ResourceMapKind::Bitmaps)),
            ..ResourceConfig::default()
        };
        let err = ResourceMaps::load(&config).unwrap_err();
        assert!(matches!(err, MapError::InvalidResourceMap { .. }));
    }
}
