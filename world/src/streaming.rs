//! Background chunk streaming around a tracked viewpoint.

use std::{
    any::Any,
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt, mem,
    sync::{Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
};

use horde_core::{ChunkCoord, ChunkSize, TileDraw, Vec2, Viewport, WorldRect};
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::{loader::ChunkLoader, tiles::Chunk};

/// Tuning parameters of the chunk streamer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Chebyshev radius, in chunks, kept loaded around the viewpoint.
    pub view_distance: u32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self { view_distance: 1 }
    }
}

/// Mailbox between loader threads and the main thread.
///
/// Producers append one finished chunk at a time; the consumer swaps the whole
/// batch out in a single critical section.
#[derive(Clone, Debug, Default)]
struct ReadyBuffer {
    inner: Arc<Mutex<Vec<(ChunkCoord, Chunk)>>>,
}

impl ReadyBuffer {
    fn push(&self, coord: ChunkCoord, chunk: Chunk) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((coord, chunk));
    }

    fn drain(&self) -> Vec<(ChunkCoord, Chunk)> {
        mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Keeps the chunks around a moving viewpoint loaded.
///
/// Loads run on short-lived background threads, one per coordinate. Finished
/// chunks only become active on the thread that calls [`ChunkManager::update`],
/// and a coordinate is never active and loading at the same time.
pub struct ChunkManager<L: ChunkLoader> {
    loader: Arc<L>,
    chunk_size: Option<ChunkSize>,
    view_distance: u32,
    active: BTreeMap<ChunkCoord, Chunk>,
    pending: HashMap<ChunkCoord, JoinHandle<()>>,
    ready: ReadyBuffer,
    required: BTreeSet<ChunkCoord>,
    current: Option<ChunkCoord>,
}

impl<L: ChunkLoader> ChunkManager<L> {
    /// Creates a streamer, loading the blueprint chunk once to learn chunk dimensions.
    ///
    /// When the blueprint cannot be loaded the manager stays inert: coordinates
    /// resolve to the origin and no loads are issued.
    pub fn new(loader: L, config: StreamingConfig) -> Self {
        let chunk_size = match loader.load(ChunkCoord::ORIGIN) {
            Ok(chunk) if !chunk.pixel_size().is_empty() => Some(chunk.pixel_size()),
            Ok(_) => {
                error!("blueprint chunk has no area, streaming disabled");
                None
            }
            Err(error) => {
                error!(error = %error, "failed to load blueprint chunk, streaming disabled");
                None
            }
        };

        Self {
            loader: Arc::new(loader),
            chunk_size,
            view_distance: config.view_distance,
            active: BTreeMap::new(),
            pending: HashMap::new(),
            ready: ReadyBuffer::default(),
            required: BTreeSet::new(),
            current: None,
        }
    }

    /// Pixel dimensions of every chunk, if the blueprint loaded.
    #[must_use]
    pub fn chunk_size(&self) -> Option<ChunkSize> {
        self.chunk_size
    }

    /// Chebyshev radius kept loaded around the viewpoint.
    #[must_use]
    pub fn view_distance(&self) -> u32 {
        self.view_distance
    }

    /// Chunk the viewpoint occupied during the last recomputation.
    #[must_use]
    pub fn current_coord(&self) -> Option<ChunkCoord> {
        self.current
    }

    /// Resolves the chunk containing a world position.
    #[must_use]
    pub fn compute_chunk_coordinate(&self, point: Vec2) -> ChunkCoord {
        match self.chunk_size {
            Some(size) => ChunkCoord::from_world(point, size),
            None => ChunkCoord::ORIGIN,
        }
    }

    /// Starts loading `coord` unless it is already active or loading.
    pub fn request_load(&mut self, coord: ChunkCoord) {
        if self.chunk_size.is_none()
            || self.active.contains_key(&coord)
            || self.pending.contains_key(&coord)
        {
            return;
        }

        let loader = Arc::clone(&self.loader);
        let ready = self.ready.clone();
        let spawned = thread::Builder::new()
            .name(format!("chunk-loader-{}-{}", coord.x(), coord.y()))
            .spawn(move || match loader.load(coord) {
                Ok(chunk) => ready.push(coord, chunk),
                Err(error) => {
                    warn!(x = coord.x(), y = coord.y(), error = %error, "chunk load failed");
                }
            });

        match spawned {
            Ok(handle) => {
                debug!(x = coord.x(), y = coord.y(), "chunk load started");
                let _ = self.pending.insert(coord, handle);
            }
            Err(error) => {
                error!(
                    x = coord.x(),
                    y = coord.y(),
                    error = %error,
                    "failed to spawn chunk loader"
                );
            }
        }
    }

    /// Activates chunks whose loads finished since the previous frame.
    ///
    /// Chunks that are no longer required, or that arrive for an already
    /// active coordinate, are dropped.
    pub fn drain_ready(&mut self) {
        self.reap_finished_loads();

        for (coord, chunk) in self.ready.drain() {
            if let Some(handle) = self.pending.remove(&coord) {
                join_loader(coord, handle);
            }

            if self.required.contains(&coord) && !self.active.contains_key(&coord) {
                debug!(x = coord.x(), y = coord.y(), "chunk activated");
                let _ = self.active.insert(coord, chunk);
            } else {
                debug!(x = coord.x(), y = coord.y(), "discarded chunk that is no longer required");
            }
        }
    }

    /// Rebuilds the required set around `viewpoint`, evicting and requesting chunks.
    ///
    /// Nothing happens while the viewpoint stays inside the same chunk and at
    /// least one chunk is active.
    pub fn recompute(&mut self, viewpoint: Vec2) {
        if self.chunk_size.is_none() {
            return;
        }

        let center = self.compute_chunk_coordinate(viewpoint);
        if self.current == Some(center) && !self.active.is_empty() {
            return;
        }
        self.current = Some(center);

        let required: BTreeSet<ChunkCoord> = center.square(self.view_distance).collect();
        self.active.retain(|coord, _| {
            let keep = required.contains(coord);
            if !keep {
                debug!(x = coord.x(), y = coord.y(), "chunk evicted");
            }
            keep
        });

        for &coord in &required {
            self.request_load(coord);
        }
        self.required = required;
    }

    /// Per-frame entry point: activates finished loads, then follows the viewpoint.
    ///
    /// An absent viewpoint only drains finished loads.
    pub fn update(&mut self, viewpoint: Option<Vec2>) {
        self.drain_ready();
        match viewpoint {
            Some(point) => self.recompute(point),
            None => debug!("no viewpoint to stream around"),
        }
    }

    /// Appends draw commands for the visible tiles of every active chunk.
    pub fn render(&self, viewport: &Viewport, out: &mut Vec<TileDraw>) {
        let Some(size) = self.chunk_size else {
            return;
        };

        let view = viewport.world_rect();
        for (coord, chunk) in &self.active {
            let offset = coord.world_origin(size);
            let bounds = WorldRect::new(
                offset,
                Vec2::new(size.width() as f32, size.height() as f32),
            );
            if !bounds.intersects(&view) {
                continue;
            }
            chunk.render(*coord, offset, viewport, out);
        }
    }

    /// Blocks until every in-flight load has finished, then activates the
    /// chunks that are still required.
    pub fn finish_pending_loads(&mut self) {
        for (coord, handle) in self.pending.drain() {
            join_loader(coord, handle);
        }
        self.drain_ready();
    }

    /// Coordinates of the active chunks in ascending order.
    pub fn active_coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.active.keys().copied()
    }

    /// Number of active chunks.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Reports whether `coord` is active.
    #[must_use]
    pub fn is_active(&self, coord: ChunkCoord) -> bool {
        self.active.contains_key(&coord)
    }

    /// Reports whether a load for `coord` is in flight.
    #[must_use]
    pub fn is_loading(&self, coord: ChunkCoord) -> bool {
        self.pending.contains_key(&coord)
    }

    /// Number of in-flight loads.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Active chunk stored at `coord`.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.active.get(&coord)
    }

    fn reap_finished_loads(&mut self) {
        let finished: Vec<ChunkCoord> = self
            .pending
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(coord, _)| *coord)
            .collect();

        for coord in finished {
            if let Some(handle) = self.pending.remove(&coord) {
                join_loader(coord, handle);
            }
        }
    }
}

impl<L: ChunkLoader> Drop for ChunkManager<L> {
    fn drop(&mut self) {
        self.finish_pending_loads();
    }
}

impl<L: ChunkLoader> fmt::Debug for ChunkManager<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkManager")
            .field("chunk_size", &self.chunk_size)
            .field("view_distance", &self.view_distance)
            .field("current", &self.current)
            .field("active", &self.active.keys().collect::<Vec<_>>())
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn join_loader(coord: ChunkCoord, handle: JoinHandle<()>) {
    if let Err(payload) = handle.join() {
        error!(
            x = coord.x(),
            y = coord.y(),
            panic = panic_message(payload.as_ref()),
            "chunk loader thread panicked"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
