//! Target engine dialects and their header enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A target engine variant.
///
/// Each variant has one uncompressed header enumeration and one compressed
/// counterpart. Dark Circlet keeps the same enumeration in both forms and
/// signals compression with a nonzero decompressed size instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    /// The original retail release.
    Retail,
    /// Custom Edition.
    CustomEdition,
    /// The legacy demo, whose uncompressed header uses the demo shape.
    Demo,
    /// Dark Circlet.
    DarkCirclet,
}

/// Whether a header enumeration names the uncompressed or compressed form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EngineForm {
    /// The form produced by the linker.
    Uncompressed,
    /// The transport form produced by the compressor.
    Compressed,
}

impl Engine {
    /// Every supported engine.
    pub const ALL: [Engine; 4] = [
        Engine::Retail,
        Engine::CustomEdition,
        Engine::Demo,
        Engine::DarkCirclet,
    ];

    /// The enumeration written to an uncompressed header.
    pub fn raw(self) -> u32 {
        match self {
            Engine::Retail => 0x7,
            Engine::CustomEdition => 0x261,
            Engine::Demo => 0x6,
            Engine::DarkCirclet => 0x1A86,
        }
    }

    /// The enumeration written to a compressed header.
    pub fn compressed_raw(self) -> u32 {
        match self {
            Engine::Retail => 0x861A_0007,
            Engine::CustomEdition => 0x861A_0261,
            Engine::Demo => 0x861A_0006,
            Engine::DarkCirclet => 0x1A86,
        }
    }

    /// Looks up a raw header enumeration.
    ///
    /// Dark Circlet always identifies as [`EngineForm::Uncompressed`]; the
    /// caller decides its form from the decompressed size field.
    pub fn identify(raw: u32) -> Option<(Engine, EngineForm)> {
        Engine::ALL.into_iter().find_map(|engine| {
            if engine.raw() == raw {
                Some((engine, EngineForm::Uncompressed))
            } else if engine.compressed_raw() == raw {
                Some((engine, EngineForm::Compressed))
            } else {
                None
            }
        })
    }

    /// The largest cache file the engine will load.
    pub fn max_cache_size(self) -> u64 {
        match self {
            Engine::CustomEdition => 0x1800_0000,
            Engine::Retail | Engine::Demo => 0x800_0000,
            Engine::DarkCirclet => u64::from(u32::MAX),
        }
    }

    /// The memory address tag data is loaded at.
    pub fn tag_data_address(self) -> u32 {
        match self {
            Engine::Demo => 0x4BF1_0000,
            Engine::Retail | Engine::CustomEdition | Engine::DarkCirclet => 0x4044_0000,
        }
    }

    /// Returns `true` if the uncompressed header uses the demo shape.
    pub fn uses_demo_header(self) -> bool {
        self == Engine::Demo
    }

    /// The kebab-case name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Engine::Retail => "retail",
            Engine::CustomEdition => "custom-edition",
            Engine::Demo => "demo",
            Engine::DarkCirclet => "dark-circlet",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Engine::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| format!("unknown engine '{s}'"))
    }
}

/// The kind of scenario a cache file holds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapType {
    /// A campaign map.
    Singleplayer,
    /// A multiplayer map.
    #[default]
    Multiplayer,
    /// The main menu.
    UserInterface,
}

impl MapType {
    /// The value stored in the header's map type field.
    pub fn raw(self) -> u16 {
        match self {
            MapType::Singleplayer => 0,
            MapType::Multiplayer => 1,
            MapType::UserInterface => 2,
        }
    }

    /// Looks up a raw map type field.
    pub fn from_raw(raw: u16) -> Option<MapType> {
        match raw {
            0 => Some(MapType::Singleplayer),
            1 => Some(MapType::Multiplayer),
            2 => Some(MapType::UserInterface),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerations_are_bijective() {
        for engine in Engine::ALL {
            assert_eq!(
                Engine::identify(engine.raw()),
                Some((engine, EngineForm::Uncompressed))
            );
            if engine != Engine::DarkCirclet {
                assert_eq!(
                    Engine::identify(engine.compressed_raw()),
                    Some((engine, EngineForm::Compressed))
                );
            }
        }
    }

    #[test]
    fn dark_circlet_maps_to_itself() {
        assert_eq!(Engine::DarkCirclet.raw(), Engine::DarkCirclet.compressed_raw());
    }

    #[test]
    fn unknown_enumeration() {
        assert_eq!(Engine::identify(0x1234), None);
        assert_eq!(Engine::identify(0x861A_1A86), None);
    }

    #[test]
    fn size_limits() {
        assert_eq!(Engine::CustomEdition.max_cache_size(), 0x1800_0000);
        assert_eq!(Engine::Retail.max_cache_size(), 0x800_0000);
        assert_eq!(Engine::Demo.max_cache_size(), 0x800_0000);
        assert_eq!(Engine::DarkCirclet.max_cache_size(), 0xFFFF_FFFF);
    }

    #[test]
    fn names_roundtrip() {
        for engine in Engine::ALL {
            assert_eq!(engine.name().parse::<Engine>(), Ok(engine));
        }
        assert!("xbox".parse::<Engine>().is_err());
    }

    #[test]
    fn serde_names_match_config_names() {
        let json = serde_json::to_string(&Engine::CustomEdition).unwrap();
        assert_eq!(json, "\"custom-edition\"");
    }

    #[test]
    fn map_type_raw() {
        assert_eq!(MapType::UserInterface.raw(), 2);
        assert_eq!(MapType::from_raw(0), Some(MapType::Singleplayer));
        assert_eq!(MapType::from_raw(3), None);
    }
}
