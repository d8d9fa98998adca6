//! Map configuration and the per-tile render surface.
//!
//! A map binds a world to a tile lattice, an output directory and a
//! [`TileRenderer`] collaborator that turns world data into tile artifact
//! bytes. What a tile artifact contains is entirely the renderer's business;
//! this module owns where it goes, how it is compressed, and the per-region
//! render-state bookkeeping that makes renders incremental.

pub mod render_state;
pub mod storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::map::render_state::RenderState;
use crate::map::storage::Compression;
use crate::world::grid::Grid;
use crate::world::World;

/// Error type for map configuration and persistence.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Invalid map settings: {0}")]
    Settings(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;

// ─── Settings ───────────────────────────────────────────────────────────────

/// Per-map configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSettings {
    /// Identifier used in storage paths. Letters, digits and underscores.
    pub id: String,
    /// Display name, defaults to the id.
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_tile_size")]
    pub tile_size: i32,
    #[serde(default = "default_tile_offset")]
    pub tile_offset: (i32, i32),
    /// Tile output compression: "none", "gzip" or "brotli".
    #[serde(default = "default_compression")]
    pub compression: String,
    /// Render still-generating chunks without trusting their light data.
    #[serde(default)]
    pub ignore_missing_light_data: bool,
}

fn default_tile_size() -> i32 {
    32
}
fn default_tile_offset() -> (i32, i32) {
    (2, 2)
}
fn default_compression() -> String {
    "gzip".to_string()
}

impl MapSettings {
    pub fn new(id: impl Into<String>) -> Self {
        MapSettings {
            id: id.into(),
            name: String::new(),
            tile_size: default_tile_size(),
            tile_offset: default_tile_offset(),
            compression: default_compression(),
            ignore_missing_light_data: false,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(MapError::Settings("map id must not be empty".to_string()));
        }
        if !self.id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(MapError::Settings(format!(
                "map id \"{}\" may only contain letters, digits and underscores",
                self.id
            )));
        }
        if self.tile_size <= 0 {
            return Err(MapError::Settings(format!(
                "tile size must be positive, got {}",
                self.tile_size
            )));
        }
        Compression::from_config(&self.compression)?;
        Ok(())
    }
}

// ─── Rendering seam ─────────────────────────────────────────────────────────

/// Produces the artifact bytes of one tile.
///
/// Implementations get the tile's block bounds (inclusive) and query the
/// world freely; decoded chunks are immutable and safe to read from many
/// tiles at once. Returning an error marks the tile as not rendered, its
/// region's render state does not advance and the tile is retried on the
/// next pass.
pub trait TileRenderer: Send + Sync {
    /// File extension of produced artifacts, with the leading dot.
    fn extension(&self) -> &'static str {
        ".bin"
    }

    fn render_tile(
        &self,
        world: &World,
        tile: (i32, i32),
        min: (i32, i32),
        max: (i32, i32),
    ) -> std::io::Result<Vec<u8>>;
}

// ─── Map ────────────────────────────────────────────────────────────────────

/// One configured map over one world.
pub struct Map {
    settings: MapSettings,
    world: Arc<World>,
    tile_grid: Grid,
    compression: Compression,
    tile_root: PathBuf,
    render_state: RenderState,
    renderer: Box<dyn TileRenderer>,
}

impl Map {
    /// Validate settings and assemble a map. Loads the render state from
    /// `<storage_root>/<id>.rstate`; tiles go below `<storage_root>/<id>/`.
    /// The settings' missing-light policy is applied to the bound world.
    pub fn new(
        settings: MapSettings,
        world: Arc<World>,
        storage_root: &Path,
        renderer: Box<dyn TileRenderer>,
    ) -> Result<Map> {
        settings.validate()?;
        let compression = Compression::from_config(&settings.compression)?;
        if world.ignore_missing_light() != settings.ignore_missing_light_data {
            world.set_ignore_missing_light(settings.ignore_missing_light_data);
            // drop chunks decoded under the old policy
            world.invalidate();
        }
        let tile_grid = Grid::with_offset(
            (settings.tile_size, settings.tile_size),
            settings.tile_offset,
        );
        let render_state = RenderState::load(&storage_root.join(format!("{}.rstate", settings.id)));
        let tile_root = storage_root.join(&settings.id).join("tiles");

        Ok(Map {
            settings,
            world,
            tile_grid,
            compression,
            tile_root,
            render_state,
            renderer,
        })
    }

    pub fn id(&self) -> &str {
        &self.settings.id
    }

    pub fn name(&self) -> &str {
        self.settings.display_name()
    }

    pub fn settings(&self) -> &MapSettings {
        &self.settings
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn tile_grid(&self) -> Grid {
        self.tile_grid
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    pub fn tile_root(&self) -> &Path {
        &self.tile_root
    }

    /// Render one tile and write its artifact.
    ///
    /// This is the work-unit body of the scheduler: any failure is logged
    /// with map and tile context and reported as `false`, never raised.
    pub fn render_tile(&self, tile: (i32, i32)) -> bool {
        let min = self.tile_grid.cell_min(tile);
        let max = self.tile_grid.cell_max(tile);
        let result = self
            .renderer
            .render_tile(&self.world, tile, min, max)
            .and_then(|bytes| {
                storage::write_tile(
                    &self.tile_root,
                    tile,
                    self.renderer.extension(),
                    self.compression,
                    &bytes,
                )
            });
        match result {
            Ok(()) => true,
            Err(error) => {
                log::error!(
                    "Failed to render tile ({}, {}) of map \"{}\": {}",
                    tile.0,
                    tile.1,
                    self.settings.id,
                    error
                );
                false
            }
        }
    }

    /// Persist the render state. Called after finalizing region tasks.
    pub fn save_render_state(&self) -> Result<()> {
        self.render_state.save()?;
        Ok(())
    }
}

impl std::fmt::Debug for Map {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map")
            .field("id", &self.settings.id)
            .field("tile_grid", &self.tile_grid)
            .finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
