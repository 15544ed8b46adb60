use std::f32::consts::TAU;

use horde_core::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, UnitCircle};
use serde::Deserialize;

/// Geometry of spawn positions around the tracked viewpoint.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Spawn points evenly distributed around the viewpoint per batch.
    pub spawn_points: u32,
    /// Closest distance of a spawn point from the viewpoint.
    pub min_distance: f32,
    /// Farthest distance of a spawn point from the viewpoint.
    pub max_distance: f32,
    /// Radius around a spawn point within which zombies appear.
    pub group_radius: f32,
    /// Relative per-zombie speed variation.
    pub speed_variation: f32,
    /// Seed of the placement random stream.
    pub seed: u64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            spawn_points: 4,
            min_distance: 400.0,
            max_distance: 800.0,
            group_radius: 100.0,
            speed_variation: 0.2,
            seed: 0x51a7_ed5e_ed00_c0de,
        }
    }
}

/// Chooses where new zombies appear.
///
/// A batch of spawn points is laid out around the viewpoint; consecutive
/// requests walk the batch with a cursor and scatter around each point. The
/// batch is discarded once every point has been used, so the next request
/// lays out a fresh batch around the viewpoint's new position.
#[derive(Debug)]
pub struct SpawnPlanner {
    config: SpawnConfig,
    points: Vec<Vec2>,
    cursor: usize,
    rng: ChaCha8Rng,
}

impl SpawnPlanner {
    /// Creates a planner with an empty batch.
    #[must_use]
    pub fn new(config: SpawnConfig) -> Self {
        Self {
            config,
            points: Vec::with_capacity(config.spawn_points as usize),
            cursor: 0,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        }
    }

    /// Picks the position of the next zombie around `focus`.
    pub fn next_position(&mut self, focus: Vec2) -> Vec2 {
        if self.points.is_empty() {
            self.lay_out_batch(focus);
        }
        let Some(&base) = self.points.get(self.cursor) else {
            return focus;
        };

        let [x, y]: [f32; 2] = UnitCircle.sample(&mut self.rng);
        let radius = self.rng.gen_range(0.0..=self.config.group_radius.max(0.0));

        self.cursor += 1;
        if self.cursor >= self.points.len() {
            self.cursor = 0;
            self.points.clear();
        }
        base + Vec2::new(x, y) * radius
    }

    /// Samples a per-zombie speed factor around 1.
    pub fn sample_speed_variation(&mut self) -> f32 {
        let variation = self.config.speed_variation.clamp(0.0, 1.0);
        if variation == 0.0 {
            return 1.0;
        }
        self.rng.gen_range(1.0 - variation..=1.0 + variation)
    }

    /// Spawn points of the current batch that have not been used yet.
    #[must_use]
    pub fn pending_points(&self) -> &[Vec2] {
        self.points.get(self.cursor..).unwrap_or(&[])
    }

    fn lay_out_batch(&mut self, focus: Vec2) {
        let count = self.config.spawn_points;
        let near = self.config.min_distance.min(self.config.max_distance).max(0.0);
        let far = self.config.max_distance.max(near);
        self.cursor = 0;
        for index in 0..count {
            let angle = TAU * index as f32 / count as f32;
            let distance = self.rng.gen_range(near..=far);
            self.points.push(focus + Vec2::from_angle(angle) * distance);
        }
    }
}
