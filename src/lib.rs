//! Lithograph reads Minecraft worlds in the Anvil save format and keeps
//! map tiles rendered from them up to date incrementally.
//!
//! The [`world`] module decodes region files into chunks, sections, block
//! states, light and biome data. The [`map`] module ties a world to a tile
//! grid, a storage layout and a persisted per-region render state. The
//! [`render`] module schedules dirty-region tasks over a worker pool so
//! that only tiles touched by modified chunks are re-rendered.

pub mod block_state;
pub mod diagnostics;
pub mod light;
pub mod map;
pub mod render;
pub mod util;
pub mod world;

pub use block_state::{BlockState, AIR_ID, MISSING_ID};
pub use diagnostics::Diagnostics;
pub use light::LightData;
pub use map::render_state::{RenderState, NEVER_RENDERED};
pub use map::storage::Compression;
pub use map::{Map, MapError, MapSettings, TileRenderer};
pub use render::task::RegionRenderTask;
pub use render::{RenderManager, RenderTask};
pub use world::chunk::Chunk;
pub use world::grid::Grid;
pub use world::region::RegionFile;
pub use world::{World, WorldError};
