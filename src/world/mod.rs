//! World storage access and the block-level query surface.
//!
//! A world is a directory holding `level.dat` and a `region/` folder of
//! `r.X.Z.mca` files. [`World`] aggregates decoded chunks behind one
//! coordinate-addressable surface with documented defaults wherever data is
//! absent, so render code never branches on missing files or damaged chunks.

pub mod chunk;
pub mod grid;
pub mod packed;
pub mod region;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use quartz_nbt::io::Flavor;
use quartz_nbt::NbtCompound;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::block_state::BlockState;
use crate::diagnostics::Diagnostics;
use crate::light::LightData;
use crate::util::floor_div;
use crate::world::chunk::Chunk;
use crate::world::grid::Grid;
use crate::world::region::{region_file_name, parse_region_file_name, RegionFile, REGION_CHUNK_SPAN};

/// Error type for world storage access.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("NBT error: {0}")]
    Nbt(#[from] quartz_nbt::io::NbtIoError),
    #[error("Unsupported chunk compression id {0}")]
    UnsupportedCompression(u8),
    #[error("Not a world directory (no region folder): {0}")]
    NotAWorld(PathBuf),
}

pub type Result<T> = std::result::Result<T, WorldError>;

/// Height defaults for positions outside any decoded chunk.
const DEFAULT_MIN_Y: i32 = 0;
const DEFAULT_MAX_Y: i32 = 255;

/// One game world on disk.
///
/// Chunks are cached per region: the first query touching a region decodes
/// every stored chunk of that region in one pass (payload reads are
/// sequential, decoding is parallel) and later queries hit the cache. The
/// cache only grows; [`invalidate`](Self::invalidate) resets it between
/// render passes so a long-running process sees world updates.
pub struct World {
    path: PathBuf,
    region_dir: PathBuf,
    spawn: (i32, i32),
    ignore_missing_light: AtomicBool,
    diagnostics: Arc<Diagnostics>,
    chunks: RwLock<FxHashMap<(i32, i32), Arc<Chunk>>>,
    loaded_regions: RwLock<FxHashSet<(i32, i32)>>,
}

impl World {
    /// Open a world directory.
    ///
    /// Only the `region/` folder is required. A missing or unreadable
    /// `level.dat` costs the spawn point (it defaults to the origin), not
    /// the world.
    pub fn open(path: &Path, ignore_missing_light: bool) -> Result<World> {
        let region_dir = path.join("region");
        if !region_dir.is_dir() {
            return Err(WorldError::NotAWorld(path.to_path_buf()));
        }

        let diagnostics = Arc::new(Diagnostics::new());
        let spawn = match read_spawn(&path.join("level.dat")) {
            Ok(spawn) => spawn,
            Err(error) => {
                diagnostics.warn_once(
                    "level-dat",
                    format_args!(
                        "Could not read the spawn point from {}: {}, using the origin",
                        path.join("level.dat").display(),
                        error
                    ),
                );
                (0, 0)
            }
        };

        Ok(World {
            path: path.to_path_buf(),
            region_dir,
            spawn,
            ignore_missing_light: AtomicBool::new(ignore_missing_light),
            diagnostics,
            chunks: RwLock::new(FxHashMap::default()),
            loaded_regions: RwLock::new(FxHashSet::default()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// World spawn point in block coordinates.
    pub fn spawn(&self) -> (i32, i32) {
        self.spawn
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// Whether chunks decode under the relaxed missing-light policy.
    pub fn ignore_missing_light(&self) -> bool {
        self.ignore_missing_light.load(Ordering::Relaxed)
    }

    /// Switch the missing-light policy for chunks decoded after this call.
    /// Chunks already cached keep the policy they were decoded under;
    /// [`invalidate`](Self::invalidate) re-decodes them.
    pub fn set_ignore_missing_light(&self, ignore: bool) {
        self.ignore_missing_light.store(ignore, Ordering::Relaxed);
    }

    /// The 16-block chunk lattice.
    pub fn chunk_grid(&self) -> Grid {
        Grid::new(16)
    }

    /// The 512-block region lattice (32 chunks per axis).
    pub fn region_grid(&self) -> Grid {
        Grid::new(REGION_CHUNK_SPAN).multiply(&self.chunk_grid())
    }

    /// Coordinates of every region file present on disk.
    pub fn list_regions(&self) -> Result<Vec<(i32, i32)>> {
        let mut regions = Vec::new();
        for entry in std::fs::read_dir(&self.region_dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if let Some(coords) = parse_region_file_name(name) {
                    regions.push(coords);
                }
            }
        }
        Ok(regions)
    }

    /// Absolute coordinates of a region's chunks modified at or after the
    /// cutoff. Reads only the region header; a region with no file answers
    /// an empty list.
    pub fn list_changed_chunks(
        &self,
        region: (i32, i32),
        modified_since_ms: i64,
    ) -> Result<Vec<(i32, i32)>> {
        let path = self.region_dir.join(region_file_name(region.0, region.1));
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(error) => return Err(error.into()),
        };
        let region_file = RegionFile::from_stream(file, region.0, region.1)?;
        Ok(region_file.list_chunks(modified_since_ms))
    }

    /// The decoded chunk at chunk coordinates, `None` where no chunk is
    /// stored. The first miss in a region pulls the whole region into the
    /// cache.
    pub fn chunk(&self, chunk_x: i32, chunk_z: i32) -> Option<Arc<Chunk>> {
        if let Some(chunk) = read_lock(&self.chunks).get(&(chunk_x, chunk_z)) {
            return Some(Arc::clone(chunk));
        }
        self.ensure_region_loaded((
            floor_div(chunk_x, REGION_CHUNK_SPAN),
            floor_div(chunk_z, REGION_CHUNK_SPAN),
        ));
        read_lock(&self.chunks).get(&(chunk_x, chunk_z)).map(Arc::clone)
    }

    /// Whether a fully generated chunk is stored at chunk coordinates.
    /// Absent chunks are not generated.
    pub fn is_generated(&self, chunk_x: i32, chunk_z: i32) -> bool {
        self.chunk(chunk_x, chunk_z)
            .map(|chunk| chunk.is_generated())
            .unwrap_or(false)
    }

    /// The block state at block coordinates, air outside stored terrain.
    pub fn block_state(&self, x: i32, y: i32, z: i32) -> BlockState {
        match self.chunk(x >> 4, z >> 4) {
            Some(chunk) => chunk.block_state(x, y, z).clone(),
            None => BlockState::air().clone(),
        }
    }

    /// The light pair at block coordinates. Outside stored terrain this is
    /// full sky light, matching the treatment of unlit chunks.
    pub fn light_data(&self, x: i32, y: i32, z: i32) -> LightData {
        match self.chunk(x >> 4, z >> 4) {
            Some(chunk) => chunk.light_data(x, y, z),
            None => LightData::SKY,
        }
    }

    /// The biome id at block coordinates, 0 outside stored terrain.
    pub fn biome_id(&self, x: i32, y: i32, z: i32) -> i32 {
        match self.chunk(x >> 4, z >> 4) {
            Some(chunk) => chunk.biome_id(x, y, z),
            None => 0,
        }
    }

    /// Lowest stored block height in the column at block coordinates.
    pub fn min_y(&self, x: i32, z: i32) -> i32 {
        self.chunk(x >> 4, z >> 4)
            .map(|chunk| chunk.min_y())
            .unwrap_or(DEFAULT_MIN_Y)
    }

    /// Highest stored block height in the column at block coordinates.
    pub fn max_y(&self, x: i32, z: i32) -> i32 {
        self.chunk(x >> 4, z >> 4)
            .map(|chunk| chunk.max_y())
            .unwrap_or(DEFAULT_MAX_Y)
    }

    /// Drop every cached chunk so the next queries re-read the save. Called
    /// between render passes; never during one.
    pub fn invalidate(&self) {
        write_lock(&self.loaded_regions).clear();
        write_lock(&self.chunks).clear();
    }

    fn ensure_region_loaded(&self, region: (i32, i32)) {
        if read_lock(&self.loaded_regions).contains(&region) {
            return;
        }
        let mut loaded = write_lock(&self.loaded_regions);
        if loaded.contains(&region) {
            return;
        }

        let path = self.region_dir.join(region_file_name(region.0, region.1));
        match RegionFile::open(&path, region.0, region.1) {
            Ok(mut file) => {
                match file.load_chunks(self.ignore_missing_light(), &self.diagnostics) {
                    Ok(decoded) => {
                        let mut chunks = write_lock(&self.chunks);
                        for (coord, chunk) in decoded {
                            chunks.insert(coord, Arc::new(chunk));
                        }
                    }
                    Err(error) => {
                        self.diagnostics.warn_once(
                            "region-load",
                            format_args!("Failed to load region {}: {}", path.display(), error),
                        );
                    }
                }
            }
            Err(WorldError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                self.diagnostics.warn_once(
                    "region-open",
                    format_args!("Failed to open region {}: {}", path.display(), error),
                );
            }
        }
        loaded.insert(region);
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("path", &self.path)
            .field("spawn", &self.spawn)
            .finish()
    }
}

fn read_lock<'a, T>(lock: &'a RwLock<T>) -> std::sync::RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_lock<'a, T>(lock: &'a RwLock<T>) -> std::sync::RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Read the spawn point from a `level.dat`.
fn read_spawn(path: &Path) -> Result<(i32, i32)> {
    let mut file = File::open(path)?;
    let (nbt, _) = quartz_nbt::io::read_nbt(&mut file, Flavor::GzCompressed)?;
    Ok(spawn_from_level_nbt(&nbt).unwrap_or((0, 0)))
}

fn spawn_from_level_nbt(nbt: &NbtCompound) -> Option<(i32, i32)> {
    let data = nbt.get::<_, &NbtCompound>("Data").ok()?;
    if let (Ok(x), Ok(z)) = (data.get::<_, i32>("SpawnX"), data.get::<_, i32>("SpawnZ")) {
        return Some((x, z));
    }
    // newer saves store the spawn as a position record
    let spawn = data.get::<_, &NbtCompound>("spawn").ok()?;
    let pos = spawn.get::<_, &[i32]>("pos").ok()?;
    if pos.len() >= 3 {
        Some((pos[0], pos[2]))
    } else {
        None
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
