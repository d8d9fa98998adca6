use crate::diagnostics::Diagnostics;
use quartz_nbt::{NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// The id every vanilla world uses for empty space.
pub const AIR_ID: &str = "minecraft:air";

/// Placeholder id for block states the decoder could not resolve.
pub const MISSING_ID: &str = "lithograph:missing";

/// An immutable block state: namespaced id plus normalized properties.
///
/// Properties are lower-cased at parse time and kept sorted by key, so
/// equality and hashing are stable regardless of the order the save file
/// listed them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    pub name: SmolStr,
    pub properties: Vec<(SmolStr, SmolStr)>,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.properties.is_empty() {
            write!(f, "[")?;
            for (i, (key, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl Hash for BlockState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        for (k, v) in &self.properties {
            k.hash(state);
            v.hash(state);
        }
    }
}

static AIR: OnceLock<BlockState> = OnceLock::new();
static MISSING: OnceLock<BlockState> = OnceLock::new();

impl BlockState {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        BlockState {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// The shared `minecraft:air` sentinel.
    pub fn air() -> &'static BlockState {
        AIR.get_or_init(|| BlockState::new(AIR_ID))
    }

    /// The shared decode-failure sentinel.
    pub fn missing() -> &'static BlockState {
        MISSING.get_or_init(|| BlockState::new(MISSING_ID))
    }

    pub fn get_name(&self) -> &str {
        self.name.as_str()
    }

    pub fn is_air(&self) -> bool {
        self.name == AIR_ID
    }

    pub fn is_missing(&self) -> bool {
        self.name == MISSING_ID
    }

    pub fn with_property(mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) {
        let key = key.into();
        let value = value.into();
        match self.properties.binary_search_by(|(k, _)| k.cmp(&key)) {
            Ok(i) => self.properties[i].1 = value,
            Err(i) => self.properties.insert(i, (key, value)),
        }
    }

    pub fn get_property(&self, key: &str) -> Option<&SmolStr> {
        self.properties
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|i| &self.properties[i].1)
    }

    /// Decode one palette entry.
    ///
    /// Air is returned as a clone of the shared sentinel without touching the
    /// property compound (air never has any, and palettes are air-heavy). An
    /// entry with no id decodes to `MISSING` instead of failing the section.
    /// Property keys and values are lower-cased here, once, so every later
    /// comparison can be exact.
    pub fn from_palette_nbt(compound: &NbtCompound, diagnostics: &Diagnostics) -> Self {
        let name = match compound.get::<_, &String>("Name") {
            Ok(name) => name,
            Err(_) => {
                diagnostics.warn_once(
                    "palette-entry-name",
                    "Palette entry without a Name tag, substituting the missing-block placeholder",
                );
                return BlockState::missing().clone();
            }
        };

        if name == AIR_ID {
            return BlockState::air().clone();
        }

        let mut state = BlockState::new(lowercase(name));
        if let Ok(props) = compound.get::<_, &NbtCompound>("Properties") {
            // NbtCompound iteration order is a hash-map order; set_property
            // keeps the vector sorted so equality stays deterministic.
            for (key, value) in props.inner() {
                if let NbtTag::String(value_str) = value {
                    state.set_property(lowercase(key), lowercase(value_str));
                }
            }
        }
        state
    }
}

fn lowercase(s: &str) -> SmolStr {
    if s.chars().any(|c| c.is_uppercase()) {
        SmolStr::new(s.to_lowercase())
    } else {
        SmolStr::new(s)
    }
}
