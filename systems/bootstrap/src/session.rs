use std::time::Duration;

use anyhow::Context;
use horde_core::{EnemyDraw, SpawnStats, Target, TileDraw, Vec2, Viewport, WeaponKind};
use horde_system_pool::EnemyPool;
use horde_system_waves::{SpawnOutcome, SpawnPlanner, WaveDirector};
use horde_world::{BlueprintLoader, ChunkLoader, ChunkManager};
use tracing::{debug, info};

use crate::config::HordeConfig;

/// Summary of what happened during one [`Session::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Wave number after the frame.
    pub wave: u32,
    /// Enemies that entered the world this frame.
    pub spawned: u32,
    /// Spawn attempts skipped because the pool was exhausted.
    pub dropped: u32,
    /// Weapon unlocked by a wave that started this frame.
    pub unlocked: Option<WeaponKind>,
}

/// Draw commands for one frame, in screen space.
#[derive(Clone, Debug, Default)]
pub struct RenderFrame {
    /// Tiles of every visible chunk.
    pub tiles: Vec<TileDraw>,
    /// Living enemies inside the view.
    pub enemies: Vec<EnemyDraw>,
}

impl RenderFrame {
    /// Drops the previous frame's commands, keeping the allocations.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.enemies.clear();
    }
}

/// Running game core: terrain streaming, enemies, and wave progression.
#[derive(Debug)]
pub struct Session<L: ChunkLoader> {
    chunks: ChunkManager<L>,
    pool: EnemyPool,
    waves: WaveDirector,
    planner: SpawnPlanner,
}

impl Session<BlueprintLoader> {
    /// Builds a session streaming the configured blueprint files.
    pub fn from_config(config: &HordeConfig) -> anyhow::Result<Self> {
        Self::new(config, BlueprintLoader::new(config.blueprint.clone()))
    }
}

impl<L: ChunkLoader> Session<L> {
    /// Builds a session whose chunks come from `loader`.
    pub fn new(config: &HordeConfig, loader: L) -> anyhow::Result<Self> {
        config.validate().context("refusing to start with an invalid configuration")?;
        let pool = EnemyPool::new(config.pool, config.enemy, config.flocking)
            .context("failed to allocate the enemy pool")?;
        let chunks = ChunkManager::new(loader, config.streaming);
        info!(
            chunk_size = ?chunks.chunk_size(),
            capacity = pool.capacity(),
            "session ready"
        );

        Ok(Self {
            chunks,
            pool,
            waves: WaveDirector::new(config.waves),
            planner: SpawnPlanner::new(config.spawn),
        })
    }

    /// Advances the whole core by `dt`.
    ///
    /// Waves advance first, then the due group is spawned around the player,
    /// then enemies move and attack, and finally the chunk set follows the
    /// player. Without a player, groups are held back until one appears.
    pub fn tick<P>(&mut self, dt: Duration, mut player: Option<&mut P>) -> FrameReport
    where
        P: Target + ?Sized,
    {
        let mut report = FrameReport::default();
        self.waves.update(dt);
        report.unlocked = self.waves.take_weapon_unlock();

        let focus = player.as_deref().map(|player| player.position());
        if self.waves.should_spawn_zombie() {
            match focus {
                Some(focus) => self.spawn_group(focus, &mut report),
                None => debug!(
                    wave = self.waves.current_wave(),
                    "spawn held back without a player"
                ),
            }
        }

        self.pool.update(dt, player.as_deref_mut());
        self.chunks.update(focus);

        report.wave = self.waves.current_wave();
        report
    }

    fn spawn_group(&mut self, focus: Vec2, report: &mut FrameReport) {
        for _ in 0..self.waves.current_group_size() {
            let position = self.planner.next_position(focus);
            let stats = SpawnStats {
                health_multiplier: self.waves.health_multiplier(),
                speed_multiplier: self.waves.speed_multiplier()
                    * self.planner.sample_speed_variation(),
                damage_multiplier: self.waves.damage_multiplier(),
            };
            let outcome = match self.pool.spawn(position, stats) {
                Some(_) => {
                    report.spawned += 1;
                    SpawnOutcome::Spawned
                }
                None => {
                    report.dropped += 1;
                    SpawnOutcome::Skipped
                }
            };
            self.waves.on_zombie_spawned(outcome);
        }
    }

    /// Fills `frame` with the draw commands for `viewport`.
    pub fn render(&self, viewport: &Viewport, frame: &mut RenderFrame) {
        frame.clear();
        self.chunks.render(viewport, &mut frame.tiles);
        self.pool.render(viewport, &mut frame.enemies);
    }

    /// Terrain streamer.
    #[must_use]
    pub const fn chunks(&self) -> &ChunkManager<L> {
        &self.chunks
    }

    /// Mutable terrain streamer, e.g. to block on pending loads.
    pub fn chunks_mut(&mut self) -> &mut ChunkManager<L> {
        &mut self.chunks
    }

    /// Enemy pool.
    #[must_use]
    pub const fn pool(&self) -> &EnemyPool {
        &self.pool
    }

    /// Mutable enemy pool, used to resolve projectile hits.
    pub fn pool_mut(&mut self) -> &mut EnemyPool {
        &mut self.pool
    }

    /// Wave director.
    #[must_use]
    pub const fn waves(&self) -> &WaveDirector {
        &self.waves
    }
}
