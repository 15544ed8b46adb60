//! Tile layouts, tilesets, and the chunk that binds them together.

use std::sync::Arc;

use horde_core::{ChunkCoord, ChunkSize, PixelRect, TileDraw, Vec2, Viewport, WorldRect};
use image::RgbaImage;
use thiserror::Error;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_EDGE: u32 = 32;

/// Failure raised while parsing a CSV tile layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The layout did not contain a single non-empty row.
    #[error("layout contains no tiles")]
    Empty,
    /// A cell could not be parsed as an integer tile index.
    #[error("cell {column} on row {row} is not an integer tile index: {value:?}")]
    InvalidCell {
        /// Zero-based row of the offending cell.
        row: usize,
        /// Zero-based column of the offending cell.
        column: usize,
        /// Raw cell contents.
        value: String,
    },
    /// A row did not have the same width as the first row.
    #[error("row {row} has {found} cells but the layout is {expected} cells wide")]
    InconsistentWidth {
        /// Zero-based row index.
        row: usize,
        /// Width established by the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
}

/// Failure raised while building a tileset from a decoded image.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TilesetError {
    /// Tiles must have a non-zero width and height.
    #[error("tile dimensions must be non-zero, got {width}x{height}")]
    ZeroTileSize {
        /// Requested tile width.
        width: u32,
        /// Requested tile height.
        height: u32,
    },
    /// The image cannot hold a single tile.
    #[error("tileset image {image_width}x{image_height} is smaller than one {tile_width}x{tile_height} tile")]
    TooSmall {
        /// Width of the decoded image.
        image_width: u32,
        /// Height of the decoded image.
        image_height: u32,
        /// Requested tile width.
        tile_width: u32,
        /// Requested tile height.
        tile_height: u32,
    },
}

/// Grid of tile indices parsed from comma separated rows.
///
/// Negative indices mark empty cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileLayout {
    columns: usize,
    rows: usize,
    tiles: Vec<i32>,
}

impl TileLayout {
    /// Parses a layout where every line is a comma separated row of tile indices.
    ///
    /// Blank lines are ignored and a single trailing comma per row is tolerated.
    pub fn parse(source: &str) -> Result<Self, LayoutError> {
        let mut columns = 0;
        let mut rows = 0;
        let mut tiles = Vec::new();

        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let line = line.strip_suffix(',').unwrap_or(line);
            let row_start = tiles.len();
            for (column, cell) in line.split(',').enumerate() {
                let cell = cell.trim();
                let tile = cell.parse::<i32>().map_err(|_| LayoutError::InvalidCell {
                    row: rows,
                    column,
                    value: cell.to_owned(),
                })?;
                tiles.push(tile);
            }

            let width = tiles.len() - row_start;
            if rows == 0 {
                columns = width;
            } else if width != columns {
                return Err(LayoutError::InconsistentWidth {
                    row: rows,
                    expected: columns,
                    found: width,
                });
            }
            rows += 1;
        }

        if rows == 0 {
            return Err(LayoutError::Empty);
        }

        Ok(Self {
            columns,
            rows,
            tiles,
        })
    }

    /// Number of tiles per row.
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Tile index stored at the provided cell, if it lies inside the layout.
    #[must_use]
    pub fn tile(&self, column: usize, row: usize) -> Option<i32> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.tiles.get(row * self.columns + column).copied()
    }
}

/// Decoded tileset image sliced into fixed-size tiles.
#[derive(Debug)]
pub struct Tileset {
    image: RgbaImage,
    tile_width: u32,
    tile_height: u32,
    columns: u32,
}

impl Tileset {
    /// Wraps a decoded image, slicing it into `tile_width` x `tile_height` tiles.
    pub fn new(image: RgbaImage, tile_width: u32, tile_height: u32) -> Result<Self, TilesetError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(TilesetError::ZeroTileSize {
                width: tile_width,
                height: tile_height,
            });
        }

        let columns = image.width() / tile_width;
        if columns == 0 || image.height() < tile_height {
            return Err(TilesetError::TooSmall {
                image_width: image.width(),
                image_height: image.height(),
                tile_width,
                tile_height,
            });
        }

        Ok(Self {
            image,
            tile_width,
            tile_height,
            columns,
        })
    }

    /// Width of a single tile in pixels.
    #[must_use]
    pub const fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Height of a single tile in pixels.
    #[must_use]
    pub const fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Number of tiles per tileset row.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Decoded pixels, exposed so adapters can upload them to a texture.
    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Source rectangle of the provided tile, or `None` when it lies outside the image.
    #[must_use]
    pub fn source(&self, tile: u32) -> Option<PixelRect> {
        let x = (tile % self.columns) * self.tile_width;
        let y = (tile / self.columns).checked_mul(self.tile_height)?;
        if y.checked_add(self.tile_height)? > self.image.height() {
            return None;
        }

        Some(PixelRect {
            x,
            y,
            width: self.tile_width,
            height: self.tile_height,
        })
    }
}

/// Loaded tile grid bound to one chunk coordinate.
#[derive(Debug)]
pub struct Chunk {
    layout: TileLayout,
    tileset: Arc<Tileset>,
}

impl Chunk {
    /// Binds a layout to the tileset its indices refer to.
    #[must_use]
    pub fn new(layout: TileLayout, tileset: Arc<Tileset>) -> Self {
        Self { layout, tileset }
    }

    /// Tile layout of the chunk.
    #[must_use]
    pub fn layout(&self) -> &TileLayout {
        &self.layout
    }

    /// Shared tileset the layout indexes into.
    #[must_use]
    pub fn tileset(&self) -> &Arc<Tileset> {
        &self.tileset
    }

    /// Pixel dimensions covered by the chunk.
    #[must_use]
    pub fn pixel_size(&self) -> ChunkSize {
        let width = u32::try_from(self.layout.columns())
            .unwrap_or(u32::MAX)
            .saturating_mul(self.tileset.tile_width());
        let height = u32::try_from(self.layout.rows())
            .unwrap_or(u32::MAX)
            .saturating_mul(self.tileset.tile_height());
        ChunkSize::new(width, height)
    }

    /// Appends draw commands for every visible tile.
    ///
    /// `offset` is the world position of the chunk's upper-left corner. Only
    /// tiles that overlap the viewport are emitted.
    pub fn render(
        &self,
        coord: ChunkCoord,
        offset: Vec2,
        viewport: &Viewport,
        out: &mut Vec<TileDraw>,
    ) {
        let tile_width = self.tileset.tile_width() as f32;
        let tile_height = self.tileset.tile_height() as f32;
        let local = viewport.origin() - offset;
        let view = viewport.size();

        let (start_column, end_column) =
            visible_span(local.x, view.x, tile_width, self.layout.columns());
        let (start_row, end_row) = visible_span(local.y, view.y, tile_height, self.layout.rows());
        let tile_size = Vec2::new(tile_width, tile_height);

        for row in start_row..end_row {
            for column in start_column..end_column {
                let Some(tile) = self.layout.tile(column, row) else {
                    continue;
                };
                let Ok(tile) = u32::try_from(tile) else {
                    continue;
                };
                let Some(source) = self.tileset.source(tile) else {
                    continue;
                };

                let world =
                    offset + Vec2::new(column as f32 * tile_width, row as f32 * tile_height);
                out.push(TileDraw {
                    chunk: coord,
                    tile,
                    source,
                    dest: WorldRect::new(viewport.world_to_screen(world), tile_size),
                });
            }
        }
    }
}

fn visible_span(start: f32, extent: f32, tile: f32, count: usize) -> (usize, usize) {
    let first = (start / tile).floor().max(0.0);
    let last = ((start + extent) / tile).floor() + 1.0;
    let last = last.clamp(0.0, count as f32);
    let first = first.min(last);
    (first as usize, last as usize)
}
