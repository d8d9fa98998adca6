//! Region file access.
//!
//! A region file groups 32x32 chunks. The first 4096 bytes are a location
//! table (one big-endian entry per chunk: a 3-byte sector offset plus a
//! 1-byte sector count), the next 4096 bytes are per-chunk modification
//! timestamps in epoch seconds. Chunk payloads start at sector boundaries
//! and carry a 4-byte big-endian length followed by a 1-byte compression id
//! and the compressed NBT document.
//!
//! The reader is generic over any seekable stream so tests can run against
//! in-memory buffers. The header is parsed eagerly on open; chunk payloads
//! are read on demand.

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use flate2::read::{GzDecoder, ZlibDecoder};
use quartz_nbt::io::Flavor;
use quartz_nbt::NbtCompound;
use rayon::prelude::*;

use crate::diagnostics::Diagnostics;
use crate::world::chunk::Chunk;
use crate::world::{Result, WorldError};

/// Chunks along one axis of a region.
pub const REGION_CHUNK_SPAN: i32 = 32;

const SECTOR_BYTES: u64 = 4096;
const CHUNKS_PER_REGION: usize = 1024;
const HEADER_BYTES: usize = 8192;

// ─── Payload compression ────────────────────────────────────────────────────

/// Compression id carried in a chunk payload header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    Gzip,
    Zlib,
    Uncompressed,
    Lz4,
}

impl CompressionType {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(CompressionType::Gzip),
            2 => Ok(CompressionType::Zlib),
            3 => Ok(CompressionType::Uncompressed),
            4 => Ok(CompressionType::Lz4),
            other => Err(WorldError::UnsupportedCompression(other)),
        }
    }
}

fn decompress(data: &[u8], compression: CompressionType) -> Result<Vec<u8>> {
    let mut decompressed = Vec::new();
    match compression {
        CompressionType::Zlib => {
            let mut decoder = ZlibDecoder::new(data);
            decoder.read_to_end(&mut decompressed)?;
        }
        CompressionType::Gzip => {
            let mut decoder = GzDecoder::new(data);
            decoder.read_to_end(&mut decompressed)?;
        }
        CompressionType::Uncompressed => {
            decompressed.extend_from_slice(data);
        }
        CompressionType::Lz4 => {
            return Err(WorldError::UnsupportedCompression(4));
        }
    }
    Ok(decompressed)
}

fn parse_chunk_nbt(compression: CompressionType, payload: &[u8]) -> Result<NbtCompound> {
    let decompressed = decompress(payload, compression)?;
    let (nbt, _) = quartz_nbt::io::read_nbt(&mut Cursor::new(&decompressed), Flavor::Uncompressed)?;
    Ok(nbt)
}

// ─── File names ─────────────────────────────────────────────────────────────

pub fn region_file_name(region_x: i32, region_z: i32) -> String {
    format!("r.{}.{}.mca", region_x, region_z)
}

/// Parse region coordinates out of an `r.X.Z.mca` file name.
pub fn parse_region_file_name(name: &str) -> Option<(i32, i32)> {
    let rest = name.strip_prefix("r.")?.strip_suffix(".mca")?;
    let (raw_x, raw_z) = rest.split_once('.')?;
    Some((raw_x.parse().ok()?, raw_z.parse().ok()?))
}

// ─── Region reader ──────────────────────────────────────────────────────────

pub struct RegionFile<S> {
    region_x: i32,
    region_z: i32,
    // location entry per chunk, offset << 8 | sector count
    locations: Vec<u32>,
    // modification time per chunk, epoch seconds
    timestamps: Vec<u32>,
    stream: S,
}

impl RegionFile<File> {
    pub fn open(path: &Path, region_x: i32, region_z: i32) -> Result<Self> {
        Self::from_stream(File::open(path)?, region_x, region_z)
    }
}

impl<S: Read + Seek> RegionFile<S> {
    pub fn from_stream(mut stream: S, region_x: i32, region_z: i32) -> Result<Self> {
        stream.seek(SeekFrom::Start(0))?;
        let mut header = vec![0u8; HEADER_BYTES];
        stream.read_exact(&mut header)?;

        let mut locations = Vec::with_capacity(CHUNKS_PER_REGION);
        let mut timestamps = Vec::with_capacity(CHUNKS_PER_REGION);
        for i in 0..CHUNKS_PER_REGION {
            let offset = i * 4;
            locations.push(
                ((header[offset] as u32) << 24)
                    | ((header[offset + 1] as u32) << 16)
                    | ((header[offset + 2] as u32) << 8)
                    | (header[offset + 3] as u32),
            );
            let offset = 4096 + i * 4;
            timestamps.push(
                ((header[offset] as u32) << 24)
                    | ((header[offset + 1] as u32) << 16)
                    | ((header[offset + 2] as u32) << 8)
                    | (header[offset + 3] as u32),
            );
        }

        Ok(RegionFile {
            region_x,
            region_z,
            locations,
            timestamps,
            stream,
        })
    }

    pub fn region_x(&self) -> i32 {
        self.region_x
    }

    pub fn region_z(&self) -> i32 {
        self.region_z
    }

    fn index(local_x: i32, local_z: i32) -> usize {
        (local_x + local_z * REGION_CHUNK_SPAN) as usize
    }

    fn sector_offset(&self, index: usize) -> u32 {
        self.locations[index] >> 8
    }

    fn sector_count(&self, index: usize) -> u32 {
        self.locations[index] & 0xFF
    }

    /// Whether the location table carries data for a chunk. Offsets 0 and 1
    /// would point into the header itself and mean "absent".
    pub fn has_chunk(&self, local_x: i32, local_z: i32) -> bool {
        let index = Self::index(local_x, local_z);
        self.sector_offset(index) >= 2 && self.sector_count(index) > 0
    }

    /// Modification time of a chunk in epoch seconds, 0 when absent.
    pub fn chunk_timestamp(&self, local_x: i32, local_z: i32) -> u32 {
        self.timestamps[Self::index(local_x, local_z)]
    }

    /// Absolute coordinates of every stored chunk modified at or after the
    /// cutoff. The cutoff is in milliseconds but region timestamps only
    /// carry seconds, so the comparison truncates.
    pub fn list_chunks(&self, modified_since_ms: i64) -> Vec<(i32, i32)> {
        let cutoff_secs = modified_since_ms / 1000;
        let mut chunks = Vec::new();
        for i in 0..CHUNKS_PER_REGION {
            if self.sector_offset(i) < 2 || self.sector_count(i) == 0 {
                continue;
            }
            if (self.timestamps[i] as i64) < cutoff_secs {
                continue;
            }
            chunks.push((
                self.region_x * REGION_CHUNK_SPAN + (i as i32 % REGION_CHUNK_SPAN),
                self.region_z * REGION_CHUNK_SPAN + (i as i32 / REGION_CHUNK_SPAN),
            ));
        }
        chunks
    }

    fn read_chunk_payload(&mut self, local_x: i32, local_z: i32) -> Result<Option<(CompressionType, Vec<u8>)>> {
        let index = Self::index(local_x, local_z);
        let sector_offset = self.sector_offset(index);
        let sector_count = self.sector_count(index);
        if sector_offset < 2 || sector_count == 0 {
            return Ok(None);
        }

        self.stream
            .seek(SeekFrom::Start(sector_offset as u64 * SECTOR_BYTES))?;
        let mut head = [0u8; 5];
        self.stream.read_exact(&mut head)?;
        let length = u32::from_be_bytes([head[0], head[1], head[2], head[3]]) as u64;
        if length <= 1 {
            return Ok(None);
        }
        // length counts the compression byte plus the payload and cannot
        // exceed the sectors reserved in the location table
        let payload_len = length - 1;
        if payload_len > sector_count as u64 * SECTOR_BYTES {
            return Ok(None);
        }

        let compression = CompressionType::from_byte(head[4])?;
        let mut payload = vec![0u8; payload_len as usize];
        self.stream.read_exact(&mut payload)?;
        Ok(Some((compression, payload)))
    }

    /// Read and parse one chunk's NBT document. Absent chunks are `None`.
    pub fn read_chunk_nbt(&mut self, local_x: i32, local_z: i32) -> Result<Option<NbtCompound>> {
        match self.read_chunk_payload(local_x, local_z)? {
            Some((compression, payload)) => Ok(Some(parse_chunk_nbt(compression, &payload)?)),
            None => Ok(None),
        }
    }

    /// Read and decode one chunk.
    pub fn load_chunk(
        &mut self,
        local_x: i32,
        local_z: i32,
        ignore_missing_light: bool,
        diagnostics: &Arc<Diagnostics>,
    ) -> Result<Option<Chunk>> {
        let nbt = match self.read_chunk_nbt(local_x, local_z)? {
            Some(nbt) => nbt,
            None => return Ok(None),
        };
        let chunk_x = self.region_x * REGION_CHUNK_SPAN + local_x;
        let chunk_z = self.region_z * REGION_CHUNK_SPAN + local_z;
        Ok(Some(Chunk::decode(
            chunk_x,
            chunk_z,
            &nbt,
            ignore_missing_light,
            Arc::clone(diagnostics),
        )))
    }

    /// Read and decode every stored chunk of this region.
    ///
    /// Payloads are read sequentially, then decompressed and decoded in
    /// parallel. A chunk whose payload fails to parse is skipped with a
    /// deduplicated warning; one damaged chunk does not lose the region.
    pub fn load_chunks(
        &mut self,
        ignore_missing_light: bool,
        diagnostics: &Arc<Diagnostics>,
    ) -> Result<Vec<((i32, i32), Chunk)>> {
        let mut raw = Vec::new();
        for local_z in 0..REGION_CHUNK_SPAN {
            for local_x in 0..REGION_CHUNK_SPAN {
                match self.read_chunk_payload(local_x, local_z) {
                    Ok(Some((compression, payload))) => {
                        raw.push((local_x, local_z, compression, payload));
                    }
                    Ok(None) => {}
                    Err(error) => {
                        diagnostics.warn_once(
                            "region-chunk-read",
                            format_args!(
                                "Failed to read chunk ({}, {}) of region ({}, {}): {}",
                                local_x, local_z, self.region_x, self.region_z, error
                            ),
                        );
                    }
                }
            }
        }

        let region_x = self.region_x;
        let region_z = self.region_z;
        let chunks = raw
            .into_par_iter()
            .filter_map(|(local_x, local_z, compression, payload)| {
                let chunk_x = region_x * REGION_CHUNK_SPAN + local_x;
                let chunk_z = region_z * REGION_CHUNK_SPAN + local_z;
                match parse_chunk_nbt(compression, &payload) {
                    Ok(nbt) => {
                        let chunk = Chunk::decode(
                            chunk_x,
                            chunk_z,
                            &nbt,
                            ignore_missing_light,
                            Arc::clone(diagnostics),
                        );
                        Some(((chunk_x, chunk_z), chunk))
                    }
                    Err(error) => {
                        diagnostics.warn_once(
                            "region-chunk-parse",
                            format_args!(
                                "Failed to parse chunk ({}, {}): {}",
                                chunk_x, chunk_z, error
                            ),
                        );
                        None
                    }
                }
            })
            .collect();
        Ok(chunks)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
