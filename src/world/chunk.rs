//! Chunk decoding across save-format generations.
//!
//! A chunk arrives as an already-parsed NBT tree. Two schema generations are
//! handled by the same decode path: newer saves pack block indices
//! word-aligned under a `block_states` compound, older saves pack them
//! spanning under a `Level`-wrapped `Sections` list. The generation is
//! detected from `DataVersion`; every other difference is tolerated
//! field-by-field.
//!
//! Decoding never fails. Absent or short data resolves to documented
//! defaults (air, darkness below the terrain, full sky light above it) and
//! anomalies are reported through [`Diagnostics`] instead of errors, so one
//! damaged section cannot take down a whole tile render.

use std::sync::Arc;

use quartz_nbt::{NbtCompound, NbtList, NbtTag};

use crate::block_state::BlockState;
use crate::diagnostics::Diagnostics;
use crate::light::LightData;
use crate::world::packed::{block_bits_per_entry, read_nibble, read_value, read_value_spanning};

/// Canonical word count of a block-index array at the 4-bit minimum width.
const BLOCK_WORDS: usize = 256;
/// Canonical byte count of a light array (4096 nibbles).
const LIGHT_BYTES: usize = 2048;

/// First data version whose packed arrays are word-aligned.
const WORD_ALIGNED_DATA_VERSION: i32 = 2500;

// ─── Schema detection ───────────────────────────────────────────────────────

/// Which packed-array addressing mode a chunk was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSchema {
    /// Entries packed back to back, possibly spanning two words.
    Legacy,
    /// Entries word-aligned, never spanning.
    Modern,
}

impl ChunkSchema {
    pub fn detect(data_version: i32) -> Self {
        if data_version >= WORD_ALIGNED_DATA_VERSION {
            ChunkSchema::Modern
        } else {
            ChunkSchema::Legacy
        }
    }
}

// ─── Sections ───────────────────────────────────────────────────────────────

/// One 16x16x16 cube of blocks, palette-indexed, with its light nibbles.
#[derive(Debug, Clone)]
pub struct Section {
    y: i32,
    palette: Vec<BlockState>,
    blocks: Vec<i64>,
    bits_per_block: u32,
    schema: ChunkSchema,
    block_light: Vec<u8>,
    sky_light: Vec<u8>,
}

impl Section {
    fn decode(nbt: &NbtCompound, schema: ChunkSchema, diagnostics: &Diagnostics) -> Option<Section> {
        let y = nbt.get::<_, i8>("Y").ok()? as i32;

        let mut palette: Vec<BlockState> = Vec::new();
        let mut blocks: Vec<i64> = Vec::new();
        if let Ok(block_states) = nbt.get::<_, &NbtCompound>("block_states") {
            if let Ok(list) = block_states.get::<_, &NbtList>("palette") {
                palette = decode_palette(list, diagnostics);
            }
            if let Ok(data) = block_states.get::<_, &[i64]>("data") {
                blocks = data.to_vec();
            }
        } else {
            if let Ok(list) = nbt.get::<_, &NbtList>("Palette") {
                palette = decode_palette(list, diagnostics);
            }
            if let Ok(data) = nbt.get::<_, &[i64]>("BlockStates") {
                blocks = data.to_vec();
            }
        }

        // Palette-less sections are vanilla's light-only padding above and
        // below the stored terrain. They must not extend the section range
        // or put their zeroed light arrays in the path of queries.
        if palette.is_empty() {
            return None;
        }

        // A short but non-empty array is zero-padded to canonical length;
        // zero-length means absent and stays that way.
        if !blocks.is_empty() && blocks.len() < BLOCK_WORDS {
            blocks.resize(BLOCK_WORDS, 0);
        }
        let bits_per_block = block_bits_per_entry(blocks.len());

        Some(Section {
            y,
            palette,
            blocks,
            bits_per_block,
            schema,
            block_light: light_bytes(nbt, "BlockLight"),
            sky_light: light_bytes(nbt, "SkyLight"),
        })
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    /// The block state at a world position inside this section.
    ///
    /// A packed index past the end of the palette answers the missing-block
    /// placeholder and is reported once.
    pub fn block_state(&self, x: i32, y: i32, z: i32, diagnostics: &Diagnostics) -> &BlockState {
        let first = match self.palette.first() {
            // decode never keeps a palette-less section
            Some(state) => state,
            None => return BlockState::air(),
        };
        if self.palette.len() == 1 || self.blocks.is_empty() {
            return first;
        }

        let index = (((y & 0xF) << 8) | ((z & 0xF) << 4) | (x & 0xF)) as usize;
        let value = match self.schema {
            ChunkSchema::Modern => read_value(&self.blocks, index, self.bits_per_block),
            ChunkSchema::Legacy => read_value_spanning(&self.blocks, index, self.bits_per_block),
        } as usize;

        match self.palette.get(value) {
            Some(state) => state,
            None => {
                diagnostics.warn_once(
                    "section-palette-range",
                    format_args!(
                        "Packed block index {} is out of range for a palette of {} entries, \
                         substituting the missing-block placeholder",
                        value,
                        self.palette.len()
                    ),
                );
                BlockState::missing()
            }
        }
    }

    /// The decoded light nibble pair at a world position inside this section.
    /// Absent arrays read as 0 on the corresponding channel.
    pub fn light_data(&self, x: i32, y: i32, z: i32) -> LightData {
        let index = (((y & 0xF) << 8) | ((z & 0xF) << 4) | (x & 0xF)) as usize;
        LightData::new(
            read_nibble(&self.sky_light, index),
            read_nibble(&self.block_light, index),
        )
    }
}

fn decode_palette(list: &NbtList, diagnostics: &Diagnostics) -> Vec<BlockState> {
    let mut palette = Vec::new();
    for tag in list.iter() {
        if let NbtTag::Compound(compound) = tag {
            palette.push(BlockState::from_palette_nbt(compound, diagnostics));
        }
    }
    palette
}

fn light_bytes(nbt: &NbtCompound, name: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = match nbt.get::<_, &[i8]>(name) {
        Ok(raw) => raw.iter().map(|&b| b as u8).collect(),
        Err(_) => Vec::new(),
    };
    if !bytes.is_empty() && bytes.len() < LIGHT_BYTES {
        bytes.resize(LIGHT_BYTES, 0);
    }
    bytes
}

// ─── Biomes ─────────────────────────────────────────────────────────────────

/// Biome storage, detected from the shape of the stored array.
#[derive(Debug, Clone)]
pub enum BiomeData {
    None,
    /// One id per 16x16 column, broadcast vertically.
    Column(Vec<i32>),
    /// One id per 4x4x4 cell.
    Coarse(Vec<i32>),
}

impl BiomeData {
    fn decode(level: &NbtCompound) -> BiomeData {
        match level.inner().get("Biomes") {
            Some(NbtTag::ByteArray(bytes)) => {
                BiomeData::Column(bytes.iter().map(|&b| (b as u8) as i32).collect())
            }
            Some(NbtTag::IntArray(ints)) => {
                if ints.len() <= 256 {
                    BiomeData::Column(ints.clone())
                } else {
                    BiomeData::Coarse(ints.clone())
                }
            }
            _ => BiomeData::None,
        }
    }

    /// The biome id at a world position, 0 when nothing usable is stored.
    pub fn biome_id(&self, x: i32, y: i32, z: i32) -> i32 {
        match self {
            BiomeData::None => 0,
            BiomeData::Column(ids) => {
                let index = (((z & 0xF) << 4) | (x & 0xF)) as usize;
                ids.get(index).copied().unwrap_or(0)
            }
            BiomeData::Coarse(ids) => {
                if ids.len() < 16 {
                    return 0;
                }
                let len = ids.len() as i32;
                let cx = (x & 0xF) / 4;
                let cz = (z & 0xF) / 4;
                let cy = y / 4;
                let mut index = cy * 16 + cz * 4 + cx;
                // Chunks written under a different world-height configuration
                // store a shorter or longer array than the current height
                // implies. Reflect the index back into range in 16-entry
                // steps instead of failing the query.
                if index >= len {
                    index -= (((index - len) >> 4) + 1) * 16;
                }
                if index < 0 {
                    index -= (index >> 4) * 16;
                }
                ids.get(index as usize).copied().unwrap_or(0)
            }
        }
    }
}

// ─── Chunks ─────────────────────────────────────────────────────────────────

/// A decoded vertical column of sections plus biome data.
///
/// Immutable after decode and shared as `Arc<Chunk>` across concurrently
/// rendering tiles.
#[derive(Debug)]
pub struct Chunk {
    x: i32,
    z: i32,
    generated: bool,
    has_light: bool,
    section_min: i32,
    section_max: i32,
    sections: Vec<Option<Section>>,
    biomes: BiomeData,
    diagnostics: Arc<Diagnostics>,
}

impl Chunk {
    /// Decode a chunk from its NBT tree.
    ///
    /// `ignore_missing_light` relaxes the generated-status check: any status
    /// other than "empty" counts as generated, without light. Such chunks
    /// render under full sky light everywhere.
    pub fn decode(
        x: i32,
        z: i32,
        nbt: &NbtCompound,
        ignore_missing_light: bool,
        diagnostics: Arc<Diagnostics>,
    ) -> Chunk {
        let data_version = nbt.get::<_, i32>("DataVersion").unwrap_or(0);
        let schema = ChunkSchema::detect(data_version);
        let level = nbt.get::<_, &NbtCompound>("Level").unwrap_or(nbt);

        // Only an explicit "full" marks finished generation; a chunk with no
        // Status tag is treated like any other unfinished one.
        let status = level.get::<_, &str>("Status").unwrap_or("");
        let status = status.strip_prefix("minecraft:").unwrap_or(status);
        let mut generated = status == "full";
        let has_light = generated;
        if !generated && ignore_missing_light && status != "empty" {
            generated = true;
        }

        let mut decoded: Vec<Section> = Vec::new();
        let section_list = level
            .get::<_, &NbtList>("sections")
            .or_else(|_| level.get::<_, &NbtList>("Sections"));
        if let Ok(list) = section_list {
            for tag in list.iter() {
                if let NbtTag::Compound(section_nbt) = tag {
                    if let Some(section) = Section::decode(section_nbt, schema, &diagnostics) {
                        decoded.push(section);
                    }
                }
            }
        }

        let (section_min, section_max) = match (
            decoded.iter().map(Section::y).min(),
            decoded.iter().map(Section::y).max(),
        ) {
            (Some(min), Some(max)) => (min, max),
            _ => (0, -1),
        };
        let mut sections: Vec<Option<Section>> = Vec::new();
        sections.resize_with((section_max - section_min + 1).max(0) as usize, || None);
        for section in decoded {
            let slot = (section.y - section_min) as usize;
            sections[slot] = Some(section);
        }

        Chunk {
            x,
            z,
            generated,
            has_light,
            section_min,
            section_max,
            sections,
            biomes: BiomeData::decode(level),
            diagnostics,
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    /// Whether terrain generation finished for this chunk. Ungenerated
    /// chunks render nothing.
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Whether light data can be trusted. Without it every query answers
    /// full outdoor light.
    pub fn has_light(&self) -> bool {
        self.has_light
    }

    /// Lowest block Y covered by a stored section.
    pub fn min_y(&self) -> i32 {
        self.section_min * 16
    }

    /// Highest block Y covered by a stored section.
    pub fn max_y(&self) -> i32 {
        self.section_max * 16 + 15
    }

    /// The block state at a world position; air anywhere no section exists.
    pub fn block_state(&self, x: i32, y: i32, z: i32) -> &BlockState {
        match self.section_at(y >> 4) {
            Some(section) => section.block_state(x, y, z, &self.diagnostics),
            None => BlockState::air(),
        }
    }

    /// The light pair at a world position. Below the lowest stored section
    /// is darkness, above the highest (and in any gap) is full sky light.
    pub fn light_data(&self, x: i32, y: i32, z: i32) -> LightData {
        if !self.has_light {
            return LightData::SKY;
        }
        let section_y = y >> 4;
        match self.section_at(section_y) {
            Some(section) => section.light_data(x, y, z),
            None => {
                if section_y < self.section_min {
                    LightData::ZERO
                } else {
                    LightData::SKY
                }
            }
        }
    }

    /// The biome id at a world position, 0 when unknown.
    pub fn biome_id(&self, x: i32, y: i32, z: i32) -> i32 {
        self.biomes.biome_id(x, y, z)
    }

    fn section_at(&self, section_y: i32) -> Option<&Section> {
        if section_y < self.section_min || section_y > self.section_max {
            return None;
        }
        self.sections
            .get((section_y - self.section_min) as usize)
            .and_then(|slot| slot.as_ref())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::packed::{pack_values, pack_values_spanning};

    fn palette_entry(name: &str) -> NbtTag {
        let mut compound = NbtCompound::new();
        compound.insert("Name", NbtTag::String(name.to_string()));
        NbtTag::Compound(compound)
    }

    fn make_modern_section(y: i8, names: &[&str], data: Option<Vec<i64>>) -> NbtCompound {
        let mut block_states = NbtCompound::new();
        let palette: Vec<NbtTag> = names.iter().map(|n| palette_entry(n)).collect();
        block_states.insert("palette", NbtTag::List(NbtList::from(palette)));
        if let Some(words) = data {
            block_states.insert("data", NbtTag::LongArray(words));
        }

        let mut section = NbtCompound::new();
        section.insert("Y", NbtTag::Byte(y));
        section.insert("block_states", NbtTag::Compound(block_states));
        section
    }

    fn make_legacy_section(y: i8, names: &[&str], data: Option<Vec<i64>>) -> NbtCompound {
        let mut section = NbtCompound::new();
        section.insert("Y", NbtTag::Byte(y));
        let palette: Vec<NbtTag> = names.iter().map(|n| palette_entry(n)).collect();
        section.insert("Palette", NbtTag::List(NbtList::from(palette)));
        if let Some(words) = data {
            section.insert("BlockStates", NbtTag::LongArray(words));
        }
        section
    }

    fn make_chunk_nbt(data_version: i32, status: &str, sections: Vec<NbtCompound>) -> NbtCompound {
        let mut root = NbtCompound::new();
        root.insert("DataVersion", NbtTag::Int(data_version));
        root.insert("Status", NbtTag::String(status.to_string()));
        let list: Vec<NbtTag> = sections.into_iter().map(NbtTag::Compound).collect();
        root.insert("sections", NbtTag::List(NbtList::from(list)));
        root
    }

    fn decode(nbt: &NbtCompound) -> Chunk {
        Chunk::decode(0, 0, nbt, false, Arc::new(Diagnostics::new()))
    }

    /// 3D index order is y*256 + z*16 + x within a section.
    fn checker_values() -> Vec<u16> {
        (0..4096u16).map(|i| i % 2).collect()
    }

    #[test]
    fn test_single_entry_palette_needs_no_data() {
        let section = make_modern_section(0, &["minecraft:stone"], None);
        let chunk = decode(&make_chunk_nbt(3700, "full", vec![section]));
        for &(x, y, z) in &[(0, 0, 0), (15, 15, 15), (7, 3, 12)] {
            assert_eq!(chunk.block_state(x, y, z).get_name(), "minecraft:stone");
        }
    }

    #[test]
    fn test_modern_word_aligned_decode() {
        let data = pack_values(&checker_values(), 4);
        let section = make_modern_section(0, &["minecraft:air", "minecraft:stone"], Some(data));
        let chunk = decode(&make_chunk_nbt(3700, "full", vec![section]));

        assert_eq!(chunk.block_state(0, 0, 0).get_name(), "minecraft:air");
        assert_eq!(chunk.block_state(1, 0, 0).get_name(), "minecraft:stone");
        assert_eq!(chunk.block_state(2, 5, 9).get_name(), "minecraft:air");
        assert_eq!(chunk.block_state(3, 5, 9).get_name(), "minecraft:stone");
    }

    #[test]
    fn test_legacy_spanning_decode_with_level_wrapper() {
        // 33 palette entries force 6-bit entries, which span word boundaries
        // in the old layout.
        let names: Vec<String> = (0..33).map(|i| format!("minecraft:block_{}", i)).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let values: Vec<u16> = (0..4096).map(|i| (i % 33) as u16).collect();
        let data = pack_values_spanning(&values, 6);

        let section = make_legacy_section(0, &name_refs, Some(data));
        let mut level = NbtCompound::new();
        level.insert("Status", NbtTag::String("full".to_string()));
        let list: Vec<NbtTag> = vec![NbtTag::Compound(section)];
        level.insert("Sections", NbtTag::List(NbtList::from(list)));
        let mut root = NbtCompound::new();
        root.insert("DataVersion", NbtTag::Int(2200));
        root.insert("Level", NbtTag::Compound(level));

        let chunk = decode(&root);
        assert_eq!(chunk.block_state(0, 0, 0).get_name(), "minecraft:block_0");
        // index 12 spans words at 6 bits (72 bits in)
        assert_eq!(chunk.block_state(12, 0, 0).get_name(), "minecraft:block_12");
        assert_eq!(chunk.block_state(0, 1, 0).get_name(), "minecraft:block_25");
    }

    #[test]
    fn test_out_of_range_palette_index_answers_missing() {
        // Two palette entries but 4-bit values up to 9 in the data.
        let values: Vec<u16> = (0..4096).map(|i| if i == 100 { 9 } else { 0 }).collect();
        let data = pack_values(&values, 4);
        let section = make_modern_section(0, &["minecraft:air", "minecraft:stone"], Some(data));
        let chunk = decode(&make_chunk_nbt(3700, "full", vec![section]));

        // linear index 100 = y 0, z 6, x 4
        let state = chunk.block_state(4, 0, 6);
        assert!(state.is_missing());
        assert_eq!(chunk.block_state(0, 0, 0).get_name(), "minecraft:air");
    }

    #[test]
    fn test_short_block_array_is_padded_not_rejected() {
        let mut data = pack_values(&checker_values(), 4);
        data.truncate(10);
        let section = make_modern_section(0, &["minecraft:air", "minecraft:stone"], Some(data));
        let chunk = decode(&make_chunk_nbt(3700, "full", vec![section]));

        // Indices inside the surviving words still decode, the rest is air.
        assert_eq!(chunk.block_state(1, 0, 0).get_name(), "minecraft:stone");
        assert_eq!(chunk.block_state(0, 15, 0).get_name(), "minecraft:air");
    }

    #[test]
    fn test_absent_section_is_air_with_height_dependent_light() {
        let section = make_modern_section(0, &["minecraft:stone"], None);
        let chunk = decode(&make_chunk_nbt(3700, "full", vec![section]));

        assert_eq!(chunk.min_y(), 0);
        assert_eq!(chunk.max_y(), 15);
        assert!(chunk.block_state(0, 200, 0).is_air());
        assert!(chunk.block_state(0, -50, 0).is_air());
        assert_eq!(chunk.light_data(0, 200, 0), LightData::SKY);
        assert_eq!(chunk.light_data(0, -50, 0), LightData::ZERO);
    }

    fn make_light_only_section(y: i8) -> NbtCompound {
        let mut section = NbtCompound::new();
        section.insert("Y", NbtTag::Byte(y));
        section.insert("SkyLight", NbtTag::ByteArray(vec![0i8; 2048]));
        section.insert("BlockLight", NbtTag::ByteArray(vec![0i8; 2048]));
        section
    }

    #[test]
    fn test_light_only_border_sections_are_absent() {
        // Vanilla pads the stored range with palette-less sections holding
        // only light arrays. They must not widen the section range, and
        // their zeroed sky nibbles must not shadow the above-terrain
        // default.
        let sections = vec![
            make_light_only_section(-1),
            make_modern_section(0, &["minecraft:stone"], None),
            make_light_only_section(16),
            make_modern_section(17, &[], None),
        ];
        let chunk = decode(&make_chunk_nbt(3700, "full", sections));

        assert_eq!(chunk.min_y(), 0);
        assert_eq!(chunk.max_y(), 15);
        assert_eq!(chunk.light_data(0, 260, 0), LightData::SKY);
        assert_eq!(chunk.light_data(0, -5, 0), LightData::ZERO);
        assert!(chunk.block_state(0, 260, 0).is_air());
    }

    #[test]
    fn test_gap_between_stored_sections_reads_as_sky() {
        let low = make_modern_section(-2, &["minecraft:stone"], None);
        let high = make_modern_section(3, &["minecraft:stone"], None);
        let chunk = decode(&make_chunk_nbt(3700, "full", vec![low, high]));

        assert_eq!(chunk.min_y(), -32);
        assert_eq!(chunk.max_y(), 63);
        // y 16 falls in the absent middle, at or above the lowest section
        assert_eq!(chunk.light_data(0, 16, 0), LightData::SKY);
        assert!(chunk.block_state(0, 16, 0).is_air());
    }

    #[test]
    fn test_light_nibbles_decode_in_present_section() {
        let mut section = make_modern_section(0, &["minecraft:stone"], None);
        let mut sky = vec![0i8; 2048];
        let mut block = vec![0i8; 2048];
        // linear index 1 = x 1: high nibble of byte 0
        sky[0] = 0x70u8 as i8;
        block[0] = 0x03;
        section.insert("SkyLight", NbtTag::ByteArray(sky));
        section.insert("BlockLight", NbtTag::ByteArray(block));
        let chunk = decode(&make_chunk_nbt(3700, "full", vec![section]));

        assert_eq!(chunk.light_data(0, 0, 0), LightData::new(0, 3));
        assert_eq!(chunk.light_data(1, 0, 0), LightData::new(7, 0));
    }

    #[test]
    fn test_present_section_without_light_arrays_is_dark() {
        let section = make_modern_section(0, &["minecraft:stone"], None);
        let chunk = decode(&make_chunk_nbt(3700, "full", vec![section]));
        assert_eq!(chunk.light_data(5, 5, 5), LightData::ZERO);
    }

    #[test]
    fn test_status_controls_generated_and_light_flags() {
        let nbt = make_chunk_nbt(3700, "minecraft:full", vec![]);
        let chunk = decode(&nbt);
        assert!(chunk.is_generated());
        assert!(chunk.has_light());

        let nbt = make_chunk_nbt(3700, "features", vec![]);
        let strict = Chunk::decode(0, 0, &nbt, false, Arc::new(Diagnostics::new()));
        assert!(!strict.is_generated());
        let relaxed = Chunk::decode(0, 0, &nbt, true, Arc::new(Diagnostics::new()));
        assert!(relaxed.is_generated());
        assert!(!relaxed.has_light());

        let nbt = make_chunk_nbt(3700, "empty", vec![]);
        let relaxed = Chunk::decode(0, 0, &nbt, true, Arc::new(Diagnostics::new()));
        assert!(!relaxed.is_generated());
    }

    #[test]
    fn test_missing_status_is_not_generated() {
        let mut root = NbtCompound::new();
        root.insert("DataVersion", NbtTag::Int(3700));
        let strict = decode(&root);
        assert!(!strict.is_generated());
        assert!(!strict.has_light());

        // the relaxed mode admits it, like any other non-empty status
        let relaxed = Chunk::decode(0, 0, &root, true, Arc::new(Diagnostics::new()));
        assert!(relaxed.is_generated());
    }

    #[test]
    fn test_chunk_without_light_answers_sky_everywhere() {
        let section = make_modern_section(0, &["minecraft:stone"], None);
        let nbt = make_chunk_nbt(3700, "features", vec![section]);
        let chunk = Chunk::decode(0, 0, &nbt, true, Arc::new(Diagnostics::new()));
        assert_eq!(chunk.light_data(0, 5, 0), LightData::SKY);
        assert_eq!(chunk.light_data(0, -100, 0), LightData::SKY);
    }

    #[test]
    fn test_empty_chunk_has_normalized_bounds() {
        let chunk = decode(&make_chunk_nbt(3700, "full", vec![]));
        assert_eq!(chunk.min_y(), 0);
        assert_eq!(chunk.max_y(), -1);
        assert!(chunk.block_state(0, 0, 0).is_air());
    }

    // ─── Biomes ─────────────────────────────────────────────────────────────

    #[test]
    fn test_column_biomes_from_byte_array() {
        let mut bytes = vec![1i8; 256];
        bytes[(3 << 4) | 2] = 7; // z 3, x 2
        let mut root = make_chunk_nbt(3700, "full", vec![]);
        root.insert("Biomes", NbtTag::ByteArray(bytes));

        let chunk = decode(&root);
        assert_eq!(chunk.biome_id(2, 64, 3), 7);
        assert_eq!(chunk.biome_id(2, -40, 3), 7, "column ids broadcast vertically");
        assert_eq!(chunk.biome_id(0, 64, 0), 1);
    }

    #[test]
    fn test_column_biomes_from_256_int_array() {
        let mut ints = vec![4i32; 256];
        ints[0] = 9;
        let mut root = make_chunk_nbt(3700, "full", vec![]);
        root.insert("Biomes", NbtTag::IntArray(ints));

        let chunk = decode(&root);
        assert_eq!(chunk.biome_id(0, 0, 0), 9);
        assert_eq!(chunk.biome_id(15, 0, 15), 4);
    }

    #[test]
    fn test_coarse_biomes_indexed_by_4x4x4_cell() {
        // 4 vertical sections of 4x4x4 cells = 1024 entries
        let mut ints = vec![0i32; 1024];
        // y 20 -> cell y 5, z 9 -> cell 2, x 6 -> cell 1
        ints[(5 * 16 + 2 * 4 + 1) as usize] = 42;
        let mut root = make_chunk_nbt(3700, "full", vec![]);
        root.insert("Biomes", NbtTag::IntArray(ints));

        let chunk = decode(&root);
        assert_eq!(chunk.biome_id(6, 20, 9), 42);
    }

    #[test]
    fn test_coarse_biome_index_reflects_into_bounds() {
        // Entry values 100..164 so the in-bounds default 0 cannot pass.
        let biomes = BiomeData::Coarse((0..64).map(|i| i + 100).collect());
        // Any queried height must land inside the 64-entry array.
        for y in [-256, -64, -1, 0, 63, 255, 1024] {
            for (x, z) in [(0, 0), (15, 15), (7, 9)] {
                let id = biomes.biome_id(x, y, z);
                assert!((100..164).contains(&id), "y {} gave id {}", y, id);
            }
        }
    }

    #[test]
    fn test_coarse_biome_array_too_short_to_reflect() {
        let biomes = BiomeData::Coarse(vec![5; 8]);
        assert_eq!(biomes.biome_id(0, 0, 0), 0);
    }

    #[test]
    fn test_missing_biomes_answer_default() {
        let chunk = decode(&make_chunk_nbt(3700, "full", vec![]));
        assert_eq!(chunk.biome_id(8, 64, 8), 0);
    }
}
