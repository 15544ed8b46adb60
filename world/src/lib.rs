#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Streaming tile world for the horde survival engine.
//!
//! The world is an unbounded grid of fixed-size chunks. Each chunk is a tile
//! layout drawn from a shared tileset. [`ChunkManager`] keeps the chunks
//! around the tracked viewpoint resident: it loads new chunks on background
//! threads through a [`ChunkLoader`], activates them on the main thread, and
//! evicts chunks that fall out of range.

mod loader;
mod streaming;
mod tiles;

pub use loader::{BlueprintConfig, BlueprintLoader, ChunkLoadError, ChunkLoader};
pub use streaming::{ChunkManager, StreamingConfig};
pub use tiles::{Chunk, LayoutError, TileLayout, Tileset, TilesetError, DEFAULT_TILE_EDGE};
