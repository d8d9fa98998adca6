use std::fmt;

/// A sky-light / block-light pair, each 0..=15.
///
/// Decoded from the two nibble arrays of a chunk section. The two sentinels
/// cover every position outside stored data: `SKY` above generated terrain
/// (full outdoor light) and `ZERO` below it (unlit cave darkness).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightData {
    sky: u8,
    block: u8,
}

impl LightData {
    /// Fully dark: no sky light, no block light.
    pub const ZERO: LightData = LightData { sky: 0, block: 0 };

    /// Full outdoor light: maximum sky light, no block light.
    pub const SKY: LightData = LightData { sky: 15, block: 0 };

    pub fn new(sky: u8, block: u8) -> Self {
        LightData {
            sky: sky & 0xF,
            block: block & 0xF,
        }
    }

    pub fn sky(&self) -> u8 {
        self.sky
    }

    pub fn block(&self) -> u8 {
        self.block
    }
}

impl fmt::Display for LightData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(sky: {}, block: {})", self.sky, self.block)
    }
}
