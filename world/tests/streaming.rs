use std::{
    collections::BTreeSet,
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use horde_core::{ChunkCoord, ChunkSize, Vec2, Viewport};
use horde_world::{
    BlueprintConfig, BlueprintLoader, Chunk, ChunkLoadError, ChunkLoader, ChunkManager,
    StreamingConfig, TileLayout, Tileset,
};
use image::RgbaImage;

const TILES_PER_SIDE: usize = 16;

fn square_chunk() -> Chunk {
    let row = vec!["0"; TILES_PER_SIDE].join(",");
    let layout = TileLayout::parse(&vec![row; TILES_PER_SIDE].join("\n")).expect("layout");
    let tileset = Tileset::new(RgbaImage::new(32, 32), 32, 32).expect("tileset");
    Chunk::new(layout, Arc::new(tileset))
}

#[derive(Default)]
struct CountingLoader {
    loads: Arc<AtomicUsize>,
}

impl ChunkLoader for CountingLoader {
    fn load(&self, _coord: ChunkCoord) -> Result<Chunk, ChunkLoadError> {
        let _ = self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(square_chunk())
    }
}

struct FlakyLoader {
    failing: ChunkCoord,
    remaining_failures: AtomicUsize,
}

impl ChunkLoader for FlakyLoader {
    fn load(&self, coord: ChunkCoord) -> Result<Chunk, ChunkLoadError> {
        if coord == self.failing
            && self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok()
        {
            return Err(ChunkLoadError::Unavailable { coord });
        }
        Ok(square_chunk())
    }
}

struct BrokenLoader;

impl ChunkLoader for BrokenLoader {
    fn load(&self, coord: ChunkCoord) -> Result<Chunk, ChunkLoadError> {
        Err(ChunkLoadError::Unavailable { coord })
    }
}

fn settle<L: ChunkLoader>(manager: &mut ChunkManager<L>, viewpoint: Vec2) {
    manager.update(Some(viewpoint));
    assert_exclusive(manager);
    manager.finish_pending_loads();
    manager.update(Some(viewpoint));
    assert_exclusive(manager);
}

fn assert_exclusive<L: ChunkLoader>(manager: &ChunkManager<L>) {
    for coord in manager.active_coords() {
        assert!(
            !manager.is_loading(coord),
            "{coord:?} is both active and loading"
        );
    }
}

fn grid(
    xs: std::ops::RangeInclusive<i32>,
    ys: std::ops::RangeInclusive<i32>,
) -> BTreeSet<ChunkCoord> {
    ys.flat_map(|y| xs.clone().map(move |x| ChunkCoord::new(x, y)))
        .collect()
}

#[test]
fn blueprint_determines_chunk_size() {
    let manager = ChunkManager::new(CountingLoader::default(), StreamingConfig::default());
    assert_eq!(manager.chunk_size(), Some(ChunkSize::new(512, 512)));
    assert_eq!(
        manager.compute_chunk_coordinate(Vec2::new(-1.0, 1023.0)),
        ChunkCoord::new(-1, 1)
    );
}

#[test]
fn converges_on_three_by_three_grid() {
    let mut manager = ChunkManager::new(CountingLoader::default(), StreamingConfig::default());
    settle(&mut manager, Vec2::ZERO);

    let active: BTreeSet<_> = manager.active_coords().collect();
    assert_eq!(active, grid(-1..=1, -1..=1));
    assert_eq!(manager.pending_count(), 0);
    assert_eq!(manager.current_coord(), Some(ChunkCoord::ORIGIN));
}

#[test]
fn crossing_a_chunk_border_shifts_the_window() {
    let mut manager = ChunkManager::new(CountingLoader::default(), StreamingConfig::default());
    settle(&mut manager, Vec2::ZERO);

    manager.update(Some(Vec2::new(600.0, 0.0)));
    assert_exclusive(&manager);
    for y in -1..=1 {
        assert!(!manager.is_active(ChunkCoord::new(-1, y)), "x=-1 must be evicted");
        assert!(manager.is_loading(ChunkCoord::new(2, y)), "x=2 must be requested");
    }
    assert_eq!(manager.pending_count(), 3);
    assert_eq!(manager.active_count(), 6);

    manager.finish_pending_loads();
    manager.update(Some(Vec2::new(600.0, 0.0)));
    let active: BTreeSet<_> = manager.active_coords().collect();
    assert_eq!(active, grid(0..=2, -1..=1));
}

#[test]
fn load_requests_are_idempotent() {
    let loader = CountingLoader::default();
    let loads = Arc::clone(&loader.loads);
    let mut manager = ChunkManager::new(loader, StreamingConfig::default());
    let blueprint_loads = loads.load(Ordering::SeqCst);

    manager.update(Some(Vec2::ZERO));
    manager.request_load(ChunkCoord::ORIGIN);
    manager.request_load(ChunkCoord::ORIGIN);
    assert_eq!(manager.pending_count(), 9);

    manager.finish_pending_loads();
    manager.update(Some(Vec2::ZERO));
    manager.request_load(ChunkCoord::ORIGIN);
    assert_eq!(manager.pending_count(), 0);
    assert_eq!(manager.active_count(), 9);
    assert_eq!(loads.load(Ordering::SeqCst) - blueprint_loads, 9);
}

#[test]
fn finished_loads_are_not_requested_again() {
    let loader = CountingLoader::default();
    let loads = Arc::clone(&loader.loads);
    let mut manager = ChunkManager::new(loader, StreamingConfig::default());
    let blueprint_loads = loads.load(Ordering::SeqCst);

    manager.update(Some(Vec2::ZERO));
    manager.finish_pending_loads();
    assert_eq!(manager.active_count(), 9);

    manager.recompute(Vec2::ZERO);
    assert_eq!(manager.pending_count(), 0);
    assert_eq!(loads.load(Ordering::SeqCst) - blueprint_loads, 9);
    assert_exclusive(&manager);
}

#[test]
fn stationary_viewpoint_does_not_reissue_loads() {
    let loader = CountingLoader::default();
    let loads = Arc::clone(&loader.loads);
    let mut manager = ChunkManager::new(loader, StreamingConfig::default());
    settle(&mut manager, Vec2::new(10.0, 10.0));
    let settled = loads.load(Ordering::SeqCst);

    for step in 0..10 {
        manager.update(Some(Vec2::new(10.0 + step as f32, 10.0)));
    }
    assert_eq!(loads.load(Ordering::SeqCst), settled);
    assert_eq!(manager.pending_count(), 0);
}

#[test]
fn late_chunks_for_abandoned_coordinates_are_discarded() {
    let mut manager = ChunkManager::new(CountingLoader::default(), StreamingConfig::default());
    manager.update(Some(Vec2::ZERO));

    // Jump far away before any load is drained.
    let far = Vec2::new(512.0 * 10.0, 0.0);
    manager.update(Some(far));
    manager.finish_pending_loads();
    manager.update(Some(far));

    let active: BTreeSet<_> = manager.active_coords().collect();
    assert_eq!(active, grid(9..=11, -1..=1));
}

#[test]
fn failed_loads_are_retried_when_still_required() {
    let failing = ChunkCoord::new(1, 1);
    let loader = FlakyLoader {
        failing,
        remaining_failures: AtomicUsize::new(1),
    };
    let mut manager = ChunkManager::new(loader, StreamingConfig::default());
    settle(&mut manager, Vec2::ZERO);
    assert!(!manager.is_active(failing));
    assert!(!manager.is_loading(failing));
    assert_eq!(manager.active_count(), 8);

    settle(&mut manager, Vec2::new(600.0, 0.0));
    assert!(manager.is_active(failing));
}

#[test]
fn broken_blueprint_leaves_manager_inert() {
    let mut manager = ChunkManager::new(BrokenLoader, StreamingConfig::default());
    assert_eq!(manager.chunk_size(), None);
    assert_eq!(
        manager.compute_chunk_coordinate(Vec2::new(4_000.0, -4_000.0)),
        ChunkCoord::ORIGIN
    );

    manager.update(Some(Vec2::ZERO));
    assert_eq!(manager.pending_count(), 0);
    assert_eq!(manager.active_count(), 0);
}

#[test]
fn renders_seamlessly_across_chunks() {
    let mut manager = ChunkManager::new(CountingLoader::default(), StreamingConfig::default());
    settle(&mut manager, Vec2::ZERO);

    // A 64x64 view straddling the corner shared by four chunks.
    let viewport = Viewport::centered_on(Vec2::ZERO, Vec2::new(64.0, 64.0));
    let mut draws = Vec::new();
    manager.render(&viewport, &mut draws);

    let chunks: BTreeSet<_> = draws.iter().map(|draw| draw.chunk).collect();
    assert_eq!(chunks, grid(-1..=0, -1..=0));
    assert!(draws
        .iter()
        .all(|draw| draw.dest.min().x >= 0.0 && draw.dest.min().x <= 64.0));
}

fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("horde-world-{}-{name}", std::process::id()));
    fs::create_dir_all(&dir).expect("create fixture dir");
    dir
}

#[test]
fn blueprint_loader_reads_tileset_and_layout() {
    let dir = fixture_dir("blueprint");
    let tileset_path = dir.join("tileset.png");
    let layout_path = dir.join("map.csv");
    RgbaImage::new(64, 32).save(&tileset_path).expect("write tileset");
    fs::write(&layout_path, "0,1,-1\n1,0,1\n").expect("write layout");

    let loader = BlueprintLoader::new(BlueprintConfig {
        tileset_path,
        layout_path,
        ..BlueprintConfig::default()
    });
    let chunk = loader.load(ChunkCoord::new(3, -4)).expect("chunk");
    assert_eq!(chunk.pixel_size(), ChunkSize::new(96, 64));
    assert_eq!(chunk.tileset().columns(), 2);

    let again = loader.load(ChunkCoord::ORIGIN).expect("chunk");
    assert!(Arc::ptr_eq(chunk.tileset(), again.tileset()));

    let manager = ChunkManager::new(loader, StreamingConfig::default());
    assert_eq!(manager.chunk_size(), Some(ChunkSize::new(96, 64)));

    fs::remove_dir_all(&dir).expect("remove fixture dir");
}

#[test]
fn blueprint_loader_reports_missing_and_malformed_files() {
    let dir = fixture_dir("broken");
    let tileset_path = dir.join("tileset.png");
    RgbaImage::new(32, 32).save(&tileset_path).expect("write tileset");

    let missing = BlueprintLoader::new(BlueprintConfig {
        tileset_path: dir.join("absent.png"),
        layout_path: dir.join("absent.csv"),
        ..BlueprintConfig::default()
    });
    assert!(matches!(
        missing.load(ChunkCoord::ORIGIN),
        Err(ChunkLoadError::TilesetImage { .. })
    ));

    let layout_path = dir.join("ragged.csv");
    fs::write(&layout_path, "0,0\n0\n").expect("write layout");
    let ragged = BlueprintLoader::new(BlueprintConfig {
        tileset_path,
        layout_path,
        ..BlueprintConfig::default()
    });
    assert!(matches!(
        ragged.load(ChunkCoord::ORIGIN),
        Err(ChunkLoadError::Layout { .. })
    ));

    fs::remove_dir_all(&dir).expect("remove fixture dir");
}
