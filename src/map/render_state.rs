//! Persistent per-region render timestamps.
//!
//! One small file per map records, for every region, when the last
//! successful render of that region started. Dirty-set computation compares
//! region chunk timestamps against these values, so the file is exactly what
//! survives a process restart to make renders incremental.
//!
//! Layout: 4 magic bytes, a little-endian format version, then a gzip
//! stream of fixed-width records (big-endian region x, region z, and the
//! render time in epoch milliseconds). A missing or unreadable file loads
//! as an empty table, which simply re-renders everything.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rustc_hash::FxHashMap;

use crate::util::write_atomic;

const MAGIC: &[u8; 4] = b"LGRS";
const VERSION: u32 = 1;
const RECORD_BYTES: usize = 16;

/// Render time meaning "never rendered".
pub const NEVER_RENDERED: i64 = -1;

/// The per-region render-time table of one map.
///
/// Shared between worker threads; every access takes the internal lock for
/// the duration of the call only.
pub struct RenderState {
    path: PathBuf,
    times: Mutex<FxHashMap<(i32, i32), i64>>,
    // serializes writers of the state file; timestamp updates stay free
    save_lock: Mutex<()>,
}

impl RenderState {
    /// Load the table at `path`, falling back to an empty table when the
    /// file is missing or damaged.
    pub fn load(path: &Path) -> RenderState {
        let times = match std::fs::read(path) {
            Ok(data) => match parse(&data) {
                Some(times) => times,
                None => {
                    log::warn!(
                        "Render state file {} is not usable, starting from a full render",
                        path.display()
                    );
                    FxHashMap::default()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => FxHashMap::default(),
            Err(error) => {
                log::warn!(
                    "Could not read render state file {}: {}, starting from a full render",
                    path.display(),
                    error
                );
                FxHashMap::default()
            }
        };
        RenderState {
            path: path.to_path_buf(),
            times: Mutex::new(times),
            save_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the last successful render of a region started, in epoch
    /// milliseconds. [`NEVER_RENDERED`] when the region has none.
    pub fn render_time(&self, region: (i32, i32)) -> i64 {
        self.lock().get(&region).copied().unwrap_or(NEVER_RENDERED)
    }

    pub fn set_render_time(&self, region: (i32, i32), time_ms: i64) {
        self.lock().insert(region, time_ms);
    }

    /// Write the table to its file, atomically.
    pub fn save(&self) -> std::io::Result<()> {
        let _saving = match self.save_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut records: Vec<((i32, i32), i64)> =
            self.lock().iter().map(|(&region, &time)| (region, time)).collect();
        // deterministic file contents
        records.sort_unstable_by_key(|&(region, _)| region);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        for ((region_x, region_z), time) in records {
            encoder.write_all(&region_x.to_be_bytes())?;
            encoder.write_all(&region_z.to_be_bytes())?;
            encoder.write_all(&time.to_be_bytes())?;
        }
        let payload = encoder.finish()?;

        let mut data = Vec::with_capacity(8 + payload.len());
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&VERSION.to_le_bytes());
        data.extend_from_slice(&payload);
        write_atomic(&self.path, &data)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<(i32, i32), i64>> {
        match self.times.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn parse(data: &[u8]) -> Option<FxHashMap<(i32, i32), i64>> {
    if data.len() < 8 || &data[0..4] != MAGIC {
        return None;
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != VERSION {
        return None;
    }

    let mut payload = Vec::new();
    let mut decoder = GzDecoder::new(&data[8..]);
    decoder.read_to_end(&mut payload).ok()?;

    let mut times = FxHashMap::default();
    for record in payload.chunks_exact(RECORD_BYTES) {
        let region_x = i32::from_be_bytes([record[0], record[1], record[2], record[3]]);
        let region_z = i32::from_be_bytes([record[4], record[5], record[6], record[7]]);
        let time = i64::from_be_bytes([
            record[8], record[9], record[10], record[11], record[12], record[13], record[14],
            record[15],
        ]);
        times.insert((region_x, region_z), time);
    }
    Some(times)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
