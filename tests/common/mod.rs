//! Builders for on-disk test worlds.
#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use quartz_nbt::io::Flavor;
use quartz_nbt::{NbtCompound, NbtList, NbtTag};

use lithograph::{TileRenderer, World};

/// A fresh world directory under the system temp dir, with an empty
/// `region/` folder. Removed and recreated on every call.
pub fn temp_world(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lithograph-it-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("region")).unwrap();
    dir
}

pub fn write_level_dat(dir: &Path, spawn: (i32, i32)) {
    let mut data = NbtCompound::new();
    data.insert("SpawnX", NbtTag::Int(spawn.0));
    data.insert("SpawnY", NbtTag::Int(64));
    data.insert("SpawnZ", NbtTag::Int(spawn.1));
    let mut root = NbtCompound::new();
    root.insert("Data", NbtTag::Compound(data));

    let mut file = fs::File::create(dir.join("level.dat")).unwrap();
    quartz_nbt::io::write_nbt(&mut file, None, &root, Flavor::GzCompressed).unwrap();
}

/// Serialized NBT of a fully generated chunk whose section 0 is filled with
/// one block, written in the current save schema.
pub fn full_chunk_nbt(chunk_x: i32, chunk_z: i32, block: &str) -> Vec<u8> {
    chunk_nbt_with_status(chunk_x, chunk_z, block, "minecraft:full")
}

/// Like [`full_chunk_nbt`] with an arbitrary generation status.
pub fn chunk_nbt_with_status(chunk_x: i32, chunk_z: i32, block: &str, status: &str) -> Vec<u8> {
    let mut palette_entry = NbtCompound::new();
    palette_entry.insert("Name", NbtTag::String(block.to_string()));
    let mut palette = NbtList::new();
    palette.push(NbtTag::Compound(palette_entry));

    let mut block_states = NbtCompound::new();
    block_states.insert("palette", NbtTag::List(palette));

    let mut section = NbtCompound::new();
    section.insert("Y", NbtTag::Byte(0));
    section.insert("block_states", NbtTag::Compound(block_states));
    let mut sections = NbtList::new();
    sections.push(NbtTag::Compound(section));

    let mut root = NbtCompound::new();
    root.insert("DataVersion", NbtTag::Int(3700));
    root.insert("xPos", NbtTag::Int(chunk_x));
    root.insert("zPos", NbtTag::Int(chunk_z));
    root.insert("Status", NbtTag::String(status.to_string()));
    root.insert("sections", NbtTag::List(sections));

    let mut bytes = Vec::new();
    quartz_nbt::io::write_nbt(&mut bytes, None, &root, Flavor::Uncompressed).unwrap();
    bytes
}

fn zlib(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// One chunk of a region under construction: local coordinates, header
/// timestamp in epoch seconds and uncompressed NBT bytes.
pub struct ChunkEntry {
    pub local_x: i32,
    pub local_z: i32,
    pub timestamp_secs: u32,
    pub nbt: Vec<u8>,
}

/// Write `region/r.<x>.<z>.mca` holding the given chunks, zlib-compressed.
pub fn write_region(dir: &Path, region_x: i32, region_z: i32, chunks: &[ChunkEntry]) {
    let mut data = vec![0u8; 8192];
    let mut current_sector = 2u32;
    for chunk in chunks {
        let payload = zlib(&chunk.nbt);
        let index = (chunk.local_x + chunk.local_z * 32) as usize;
        let length = payload.len() as u32 + 1;
        let sector_count = (5 + payload.len() + 4095) / 4096;

        let loc = index * 4;
        data[loc] = ((current_sector >> 16) & 0xFF) as u8;
        data[loc + 1] = ((current_sector >> 8) & 0xFF) as u8;
        data[loc + 2] = (current_sector & 0xFF) as u8;
        data[loc + 3] = sector_count as u8;
        let ts = 4096 + index * 4;
        data[ts..ts + 4].copy_from_slice(&chunk.timestamp_secs.to_be_bytes());

        let mut sector = Vec::with_capacity(sector_count * 4096);
        sector.extend_from_slice(&length.to_be_bytes());
        sector.push(2);
        sector.extend_from_slice(&payload);
        sector.resize(sector_count * 4096, 0);
        data.extend_from_slice(&sector);
        current_sector += sector_count as u32;
    }

    let name = format!("r.{}.{}.mca", region_x, region_z);
    fs::write(dir.join("region").join(name), data).unwrap();
}

/// Call-order log shared between a test and the renderer its map owns.
pub type TileLog = Arc<Mutex<Vec<(i32, i32)>>>;

pub fn tile_log() -> TileLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Records every tile it is asked to render, in call order, and can be
/// told to fail specific tiles.
pub struct RecordingRenderer {
    log: TileLog,
    fail: Vec<(i32, i32)>,
}

impl RecordingRenderer {
    pub fn new(log: &TileLog) -> RecordingRenderer {
        RecordingRenderer {
            log: Arc::clone(log),
            fail: Vec::new(),
        }
    }

    pub fn failing_on(log: &TileLog, fail: Vec<(i32, i32)>) -> RecordingRenderer {
        RecordingRenderer {
            log: Arc::clone(log),
            fail,
        }
    }
}

impl TileRenderer for RecordingRenderer {
    fn render_tile(
        &self,
        _world: &World,
        tile: (i32, i32),
        _min: (i32, i32),
        _max: (i32, i32),
    ) -> std::io::Result<Vec<u8>> {
        self.log.lock().unwrap().push(tile);
        if self.fail.contains(&tile) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "told to fail this tile",
            ));
        }
        Ok(format!("tile {} {}", tile.0, tile.1).into_bytes())
    }
}
