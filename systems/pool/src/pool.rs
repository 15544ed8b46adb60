use std::{collections::VecDeque, mem, time::Duration};

use horde_core::{EnemyDraw, EnemyId, Hit, SpawnStats, Target, Vec2, Viewport, WorldRect};
use horde_system_flocking::{Boid, FlockingConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, UnitCircle};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::enemy::{Enemy, EnemyConfig};

/// Largest pool the engine accepts.
pub const MAX_POOL_CAPACITY: usize = 1_000;

const REPOSITION_MIN_FACTOR: f32 = 0.8;
const REPOSITION_MAX_FACTOR: f32 = 1.2;

/// Failure raised while constructing an enemy pool.
#[derive(Debug, Error, PartialEq)]
pub enum PoolError {
    /// Capacity outside `1..=MAX_POOL_CAPACITY`.
    #[error("enemy pool capacity must be between 1 and {max}, got {capacity}")]
    InvalidCapacity {
        /// Requested capacity.
        capacity: usize,
        /// Largest accepted capacity.
        max: usize,
    },
    /// Repositioned enemies could land beyond a release threshold.
    #[error(
        "enemy pool distances must satisfy optimal ({optimal}) x 1.2 <= \
         min recycle ({min_recycle}) <= recycle ({recycle})"
    )]
    InvalidDistances {
        /// Configured optimal distance.
        optimal: f32,
        /// Configured release threshold under high utilization.
        min_recycle: f32,
        /// Configured release threshold.
        recycle: f32,
    },
}

/// Capacity and recycling thresholds of the enemy pool.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of enemy slots allocated up front.
    pub capacity: usize,
    /// Enemies farther than this from the target are released every frame.
    pub recycle_distance: f32,
    /// Tighter release threshold applied while the pool is highly utilised.
    pub min_recycle_distance: f32,
    /// Enemies farther than this are moved back towards the target.
    pub optimal_distance: f32,
    /// Period of the distribution pass, in milliseconds.
    pub distribution_interval_ms: u64,
    /// Fraction of the capacity above which the pool counts as highly utilised.
    pub high_utilization: f32,
    /// Seed of the repositioning random stream.
    pub seed: u64,
}

impl PoolConfig {
    /// Period of the distribution pass.
    #[must_use]
    pub const fn distribution_interval(&self) -> Duration {
        Duration::from_millis(self.distribution_interval_ms)
    }

    /// Farthest point the distribution pass may move an enemy to.
    #[must_use]
    pub fn max_reposition_distance(&self) -> f32 {
        self.optimal_distance * REPOSITION_MAX_FACTOR
    }

    fn check_distances(&self) -> Result<(), PoolError> {
        let ordered = self.optimal_distance >= 0.0
            && self.max_reposition_distance() <= self.min_recycle_distance
            && self.min_recycle_distance <= self.recycle_distance;
        if ordered {
            return Ok(());
        }
        Err(PoolError::InvalidDistances {
            optimal: self.optimal_distance,
            min_recycle: self.min_recycle_distance,
            recycle: self.recycle_distance,
        })
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            recycle_distance: 2_000.0,
            min_recycle_distance: 1_400.0,
            optimal_distance: 1_000.0,
            distribution_interval_ms: 1_000,
            high_utilization: 0.8,
            seed: 0x5eed_0f_7a5c_a11e,
        }
    }
}

/// Fixed-capacity arena of enemies addressed by [`EnemyId`].
///
/// Slots are allocated once; spawning and releasing only flip bookkeeping and
/// re-initialise the slot in place.
#[derive(Debug)]
pub struct EnemyPool {
    config: PoolConfig,
    flocking: FlockingConfig,
    slots: Vec<Enemy>,
    in_use: Vec<bool>,
    active: Vec<EnemyId>,
    recycled: VecDeque<EnemyId>,
    clock: Duration,
    since_distribution: Duration,
    rng: ChaCha8Rng,
    flock: Vec<Boid>,
    pass: Vec<EnemyId>,
}

impl EnemyPool {
    /// Allocates every slot of the pool.
    pub fn new(
        config: PoolConfig,
        enemy: EnemyConfig,
        flocking: FlockingConfig,
    ) -> Result<Self, PoolError> {
        if config.capacity == 0 || config.capacity > MAX_POOL_CAPACITY {
            return Err(PoolError::InvalidCapacity {
                capacity: config.capacity,
                max: MAX_POOL_CAPACITY,
            });
        }
        config.check_distances()?;

        let slots = (0..config.capacity)
            .map(|index| Enemy::new(EnemyId::new(index as u32), enemy))
            .collect();
        info!(capacity = config.capacity, "enemy pool allocated");

        Ok(Self {
            config,
            flocking,
            slots,
            in_use: vec![false; config.capacity],
            active: Vec::with_capacity(config.capacity),
            recycled: VecDeque::new(),
            clock: Duration::ZERO,
            since_distribution: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            flock: Vec::with_capacity(config.capacity),
            pass: Vec::with_capacity(config.capacity),
        })
    }

    /// Claims a free slot, preferring explicitly recycled enemies.
    ///
    /// Returns `None` when every slot is in use; callers skip the spawn.
    pub fn acquire(&mut self) -> Option<EnemyId> {
        let Some(id) = self.pop_recycled().or_else(|| self.first_free()) else {
            warn!(capacity = self.config.capacity, "enemy pool exhausted");
            return None;
        };

        self.in_use[id.index()] = true;
        self.active.push(id);
        if self.is_highly_utilized() {
            warn!(
                active = self.active.len(),
                capacity = self.config.capacity,
                "enemy pool utilization high"
            );
        }
        Some(id)
    }

    /// Claims a slot and spawns an enemy at `position`.
    pub fn spawn(&mut self, position: Vec2, stats: SpawnStats) -> Option<EnemyId> {
        let id = self.acquire()?;
        self.slots[id.index()].reset(position, stats);
        Some(id)
    }

    /// Returns an enemy's slot to the pool.
    ///
    /// Foreign or already released handles are logged and ignored.
    pub fn release(&mut self, id: EnemyId) {
        let Some(in_use) = self.in_use.get_mut(id.index()) else {
            warn!(enemy = id.get(), "release of an enemy this pool does not own");
            return;
        };
        if !*in_use {
            warn!(enemy = id.get(), "release of an enemy that is already released");
            return;
        }

        *in_use = false;
        self.active.retain(|active| *active != id);
        self.slots[id.index()].deactivate();
    }

    /// Advances every living enemy and reclaims dead or stray ones.
    ///
    /// Without a target the pool only advances its clock.
    pub fn update<T>(&mut self, dt: Duration, target: Option<&mut T>)
    where
        T: Target + ?Sized,
    {
        self.clock = self.clock.saturating_add(dt);
        let Some(target) = target else {
            debug!("no target for the enemy pool");
            return;
        };

        self.flock.clear();
        self.flock.extend(
            self.active
                .iter()
                .map(|id| &self.slots[id.index()])
                .filter(|enemy| enemy.is_alive())
                .map(Enemy::boid),
        );

        let recycle_squared = self.config.recycle_distance * self.config.recycle_distance;
        let mut pass = mem::take(&mut self.pass);
        pass.clear();
        pass.extend_from_slice(&self.active);
        for &id in &pass {
            let enemy = &mut self.slots[id.index()];
            enemy.update(dt, self.clock, &mut *target, &self.flock, &self.flocking);
            let stray = enemy.position().distance_squared(target.position()) > recycle_squared;
            if enemy.is_dead() || stray {
                self.release(id);
            }
        }
        self.pass = pass;

        self.since_distribution = self.since_distribution.saturating_add(dt);
        let interval = self.config.distribution_interval();
        if !interval.is_zero() && self.since_distribution >= interval {
            self.since_distribution = Duration::ZERO;
            self.distribute(target.position());
        }
    }

    /// Appends draw commands for every living enemy overlapping the view.
    pub fn render(&self, viewport: &Viewport, out: &mut Vec<EnemyDraw>) {
        let view = viewport.world_rect();
        out.extend(
            self.enemies()
                .filter(|enemy| enemy.is_alive() && enemy.hitbox().intersects(&view))
                .map(|enemy| enemy.draw(viewport)),
        );
    }

    /// First living enemy whose hitbox overlaps `rect`.
    #[must_use]
    pub fn first_hit(&self, rect: &WorldRect) -> Option<EnemyId> {
        self.enemies()
            .find(|enemy| enemy.hit_test(rect))
            .map(Enemy::id)
    }

    /// Applies a hit to an active enemy, returning `true` when it died.
    pub fn strike(&mut self, id: EnemyId, hit: &Hit) -> bool {
        if !self.is_in_use(id) {
            return false;
        }
        self.slots[id.index()].take_damage(hit)
    }

    /// Handles of the active enemies in activation order.
    #[must_use]
    pub fn active(&self) -> &[EnemyId] {
        &self.active
    }

    /// Active enemies in activation order.
    pub fn enemies(&self) -> impl Iterator<Item = &Enemy> + '_ {
        self.active.iter().map(|id| &self.slots[id.index()])
    }

    /// Active enemy addressed by `id`.
    #[must_use]
    pub fn enemy(&self, id: EnemyId) -> Option<&Enemy> {
        if !self.is_in_use(id) {
            return None;
        }
        self.slots.get(id.index())
    }

    /// Mutable access to an active enemy, for example to re-spawn an acquired slot.
    pub fn enemy_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        if !self.is_in_use(id) {
            return None;
        }
        self.slots.get_mut(id.index())
    }

    /// Reports whether `id` addresses a slot currently handed out.
    #[must_use]
    pub fn is_in_use(&self, id: EnemyId) -> bool {
        self.in_use.get(id.index()).copied().unwrap_or(false)
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of slots handed out.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of free slots.
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.config.capacity - self.active.len()
    }

    /// Reports whether the pool is above its high-utilization threshold.
    #[must_use]
    pub fn is_highly_utilized(&self) -> bool {
        self.active.len() as f32 > self.config.capacity as f32 * self.config.high_utilization
    }

    /// Time accumulated by [`EnemyPool::update`].
    #[must_use]
    pub fn clock(&self) -> Duration {
        self.clock
    }

    fn pop_recycled(&mut self) -> Option<EnemyId> {
        while let Some(id) = self.recycled.pop_front() {
            if !self.in_use[id.index()] {
                return Some(id);
            }
        }
        None
    }

    fn first_free(&self) -> Option<EnemyId> {
        self.in_use
            .iter()
            .position(|in_use| !in_use)
            .map(|index| EnemyId::new(index as u32))
    }

    fn distribute(&mut self, target: Vec2) {
        let mut pass = mem::take(&mut self.pass);
        let mut recycled = 0_usize;

        if self.is_highly_utilized() {
            let threshold = self.config.min_recycle_distance * self.config.min_recycle_distance;
            pass.clear();
            pass.extend_from_slice(&self.active);
            for &id in &pass {
                if self.slots[id.index()].position().distance_squared(target) > threshold {
                    self.release(id);
                    self.recycled.push_back(id);
                    recycled += 1;
                }
            }
        }

        let optimal = self.config.optimal_distance;
        let threshold = optimal * optimal;
        let mut repositioned = 0_usize;
        for &id in &self.active {
            let enemy = &mut self.slots[id.index()];
            if !enemy.is_alive() || enemy.position().distance_squared(target) <= threshold {
                continue;
            }

            let [x, y]: [f32; 2] = UnitCircle.sample(&mut self.rng);
            let distance =
                optimal * self.rng.gen_range(REPOSITION_MIN_FACTOR..=REPOSITION_MAX_FACTOR);
            let stats = enemy.stats();
            enemy.reset(target + Vec2::new(x, y) * distance, stats);
            repositioned += 1;
        }

        self.pass = pass;
        debug!(
            recycled,
            repositioned,
            active = self.active.len(),
            "enemy distribution pass"
        );
    }
}
