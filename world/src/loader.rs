//! Sources of chunk data consumed by background loader threads.

use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use horde_core::ChunkCoord;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::tiles::{Chunk, LayoutError, TileLayout, Tileset, TilesetError, DEFAULT_TILE_EDGE};

/// Failure raised while constructing a chunk.
#[derive(Debug, Error)]
pub enum ChunkLoadError {
    /// The tileset image could not be opened or decoded.
    #[error("failed to decode tileset {path:?}")]
    TilesetImage {
        /// Path of the tileset image.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: image::ImageError,
    },
    /// The decoded tileset cannot be sliced into tiles.
    #[error("tileset {path:?} is unusable")]
    Tileset {
        /// Path of the tileset image.
        path: PathBuf,
        /// Slicing failure.
        #[source]
        source: TilesetError,
    },
    /// The layout file could not be read.
    #[error("failed to read layout {path:?}")]
    LayoutRead {
        /// Path of the layout file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The layout file contents were malformed.
    #[error("malformed layout {path:?}")]
    Layout {
        /// Path of the layout file.
        path: PathBuf,
        /// Parse failure.
        #[source]
        source: LayoutError,
    },
    /// The loader has no data for the requested coordinate.
    #[error("no chunk data available for {coord:?}")]
    Unavailable {
        /// Coordinate that was requested.
        coord: ChunkCoord,
    },
}

/// Produces chunks on background threads.
///
/// Implementations must not touch state shared with the main thread; the
/// streaming manager hands the finished chunk over on their behalf.
pub trait ChunkLoader: Send + Sync + 'static {
    /// Builds the chunk that belongs at `coord`.
    fn load(&self, coord: ChunkCoord) -> Result<Chunk, ChunkLoadError>;
}

/// File locations and tile geometry for blueprint chunks.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BlueprintConfig {
    /// Path of the tileset image.
    pub tileset_path: PathBuf,
    /// Path of the CSV tile layout.
    pub layout_path: PathBuf,
    /// Tile width in pixels.
    pub tile_width: u32,
    /// Tile height in pixels.
    pub tile_height: u32,
}

impl Default for BlueprintConfig {
    fn default() -> Self {
        Self {
            tileset_path: PathBuf::from("assets/tileset.png"),
            layout_path: PathBuf::from("assets/map.csv"),
            tile_width: DEFAULT_TILE_EDGE,
            tile_height: DEFAULT_TILE_EDGE,
        }
    }
}

/// Loader that stamps every coordinate with the same blueprint files.
///
/// The tileset is decoded once and shared by every chunk built afterwards.
#[derive(Debug)]
pub struct BlueprintLoader {
    config: BlueprintConfig,
    tileset: Mutex<Option<Arc<Tileset>>>,
}

impl BlueprintLoader {
    /// Creates a loader reading the configured blueprint files.
    #[must_use]
    pub fn new(config: BlueprintConfig) -> Self {
        Self {
            config,
            tileset: Mutex::new(None),
        }
    }

    /// Configuration the loader was created with.
    #[must_use]
    pub fn config(&self) -> &BlueprintConfig {
        &self.config
    }

    fn shared_tileset(&self) -> Result<Arc<Tileset>, ChunkLoadError> {
        if let Some(tileset) = self.cached_tileset() {
            return Ok(tileset);
        }

        let path = &self.config.tileset_path;
        let image = image::open(path)
            .map_err(|source| ChunkLoadError::TilesetImage {
                path: path.clone(),
                source,
            })?
            .into_rgba8();
        let tileset = Tileset::new(image, self.config.tile_width, self.config.tile_height)
            .map_err(|source| ChunkLoadError::Tileset {
                path: path.clone(),
                source,
            })?;
        let tileset = Arc::new(tileset);
        debug!(path = %path.display(), columns = tileset.columns(), "decoded tileset");

        let mut cache = self.tileset.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.get_or_insert(tileset)))
    }

    fn cached_tileset(&self) -> Option<Arc<Tileset>> {
        self.tileset
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }
}

impl ChunkLoader for BlueprintLoader {
    fn load(&self, _coord: ChunkCoord) -> Result<Chunk, ChunkLoadError> {
        let tileset = self.shared_tileset()?;
        let path = &self.config.layout_path;
        let contents = fs::read_to_string(path).map_err(|source| ChunkLoadError::LayoutRead {
            path: path.clone(),
            source,
        })?;
        let layout = TileLayout::parse(&contents).map_err(|source| ChunkLoadError::Layout {
            path: path.clone(),
            source,
        })?;
        Ok(Chunk::new(layout, tileset))
    }
}
