//! Incremental region render tasks.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::map::Map;
use crate::render::RenderTask;
use crate::util::now_millis;

/// Renders the out-of-date tiles of one world region of one map.
///
/// The set of tiles is resolved lazily inside the first `do_work` call:
/// the region's chunks are filtered against the map's stored render time
/// (or against the beginning of time when `force` is set), and every tile
/// whose block footprint intersects a changed chunk's footprint is queued.
/// When the last tile has rendered without failures or cancellation, the
/// task writes its own start time back as the region's render time, so
/// chunks modified while the task ran stay dirty for the next pass.
pub struct RegionRenderTask {
    map: Arc<Map>,
    region: (i32, i32),
    force: bool,
    state: Mutex<TaskState>,
}

struct TaskState {
    // None until the first do_work call resolved the tile set
    tiles: Option<BTreeSet<(i32, i32)>>,
    total: usize,
    start_time: i64,
    in_flight: usize,
    failed: usize,
    cancelled: bool,
    finalized: bool,
}

impl RegionRenderTask {
    pub fn new(map: Arc<Map>, region: (i32, i32), force: bool) -> RegionRenderTask {
        RegionRenderTask {
            map,
            region,
            force,
            state: Mutex::new(TaskState {
                tiles: None,
                total: 0,
                start_time: 0,
                in_flight: 0,
                failed: 0,
                cancelled: false,
                finalized: false,
            }),
        }
    }

    pub fn map(&self) -> &Arc<Map> {
        &self.map
    }

    pub fn region(&self) -> (i32, i32) {
        self.region
    }

    pub fn is_forced(&self) -> bool {
        self.force
    }

    /// Queue order: tasks of the same map first by squared region distance
    /// from the world spawn, then by relative position, with forced rebuilds
    /// sorting after incremental ones. `Equal` means the tasks target the
    /// same region of the same map and one of them is redundant.
    pub fn compare(&self, other: &RegionRenderTask) -> Ordering {
        self.map
            .id()
            .cmp(other.map.id())
            .then_with(|| {
                let spawn_region = self
                    .map
                    .world()
                    .region_grid()
                    .cell(self.map.world().spawn());
                let a = relative(self.region, spawn_region);
                let b = relative(other.region, spawn_region);
                distance_squared(a)
                    .cmp(&distance_squared(b))
                    .then(a.0.cmp(&b.0))
                    .then(a.1.cmp(&b.1))
            })
            .then(self.force.cmp(&other.force))
    }

    /// Resolves the pending tile set. Runs at most once; later calls are
    /// no-ops. An enumeration failure counts as a failed unit so the task
    /// drains without finalizing and the region is retried on a later pass.
    fn initialize(&self, state: &mut TaskState) {
        if state.tiles.is_some() {
            return;
        }
        state.start_time = now_millis();

        let since = if self.force {
            0
        } else {
            self.map.render_state().render_time(self.region)
        };

        let mut tiles = BTreeSet::new();
        match self.map.world().list_changed_chunks(self.region, since) {
            Ok(chunks) => {
                let chunk_grid = self.map.world().chunk_grid();
                let tile_grid = self.map.tile_grid();
                for chunk in chunks {
                    let min = chunk_grid.cell_min_in(chunk, &tile_grid);
                    let max = chunk_grid.cell_max_in(chunk, &tile_grid);
                    for tile_x in min.0..=max.0 {
                        for tile_z in min.1..=max.1 {
                            tiles.insert((tile_x, tile_z));
                        }
                    }
                }
            }
            Err(error) => {
                log::error!(
                    "Failed to list changed chunks of region ({}, {}) for map \"{}\": {}",
                    self.region.0,
                    self.region.1,
                    self.map.id(),
                    error
                );
                state.failed += 1;
            }
        }
        state.total = tiles.len();
        state.tiles = Some(tiles);
    }

    /// Marks the task complete and records its start time as the region's
    /// render time, once, after the last tile rendered cleanly. Returns
    /// whether this call did the finalizing; persisting the render state is
    /// the caller's job, outside the task lock.
    fn try_finalize(&self, state: &mut TaskState) -> bool {
        if state.finalized || state.cancelled || state.failed > 0 || state.in_flight > 0 {
            return false;
        }
        let drained = match &state.tiles {
            Some(tiles) => tiles.is_empty(),
            None => false,
        };
        if !drained {
            return false;
        }
        state.finalized = true;
        self.map
            .render_state()
            .set_render_time(self.region, state.start_time);
        true
    }

    fn persist_render_state(&self) {
        if let Err(error) = self.map.save_render_state() {
            log::error!(
                "Failed to save render state of map \"{}\": {}",
                self.map.id(),
                error
            );
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, TaskState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl RenderTask for RegionRenderTask {
    fn has_more_work(&self) -> bool {
        let state = self.lock_state();
        if state.cancelled {
            return false;
        }
        match &state.tiles {
            Some(tiles) => !tiles.is_empty(),
            None => true,
        }
    }

    fn do_work(&self) {
        let tile = {
            let mut state = self.lock_state();
            if state.cancelled {
                return;
            }
            self.initialize(&mut state);
            let next = match &mut state.tiles {
                Some(tiles) => tiles.pop_first(),
                None => None,
            };
            match next {
                Some(tile) => {
                    state.in_flight += 1;
                    tile
                }
                None => {
                    let finalized = self.try_finalize(&mut state);
                    drop(state);
                    if finalized {
                        self.persist_render_state();
                    }
                    return;
                }
            }
        };

        // rendering happens without the task lock held
        let ok = self.map.render_tile(tile);

        let mut state = self.lock_state();
        state.in_flight -= 1;
        if !ok {
            state.failed += 1;
        }
        let finalized = self.try_finalize(&mut state);
        drop(state);
        if finalized {
            self.persist_render_state();
        }
    }

    fn estimate_progress(&self) -> f64 {
        let state = self.lock_state();
        match &state.tiles {
            None => 0.0,
            Some(tiles) => {
                if state.total == 0 {
                    1.0
                } else {
                    1.0 - tiles.len() as f64 / state.total as f64
                }
            }
        }
    }

    fn cancel(&self) {
        let mut state = self.lock_state();
        state.cancelled = true;
        if let Some(tiles) = &mut state.tiles {
            tiles.clear();
        }
    }

    fn description(&self) -> String {
        format!(
            "{} region ({}, {}) of map \"{}\"",
            if self.force { "Re-render" } else { "Update" },
            self.region.0,
            self.region.1,
            self.map.id()
        )
    }
}

fn relative(region: (i32, i32), spawn_region: (i32, i32)) -> (i32, i32) {
    (region.0 - spawn_region.0, region.1 - spawn_region.1)
}

fn distance_squared(relative: (i32, i32)) -> i64 {
    let x = relative.0 as i64;
    let z = relative.1 as i64;
    x * x + z * z
}

// ─── Tests ──────────────────────────────────────────────────────────────────
