#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave director that paces zombie spawns and escalates difficulty.
//!
//! [`WaveDirector`] is a timer and counter state machine: it never touches
//! enemies or the world. The orchestrating loop polls
//! [`WaveDirector::should_spawn_zombie`], spawns the current group through the
//! enemy pool at positions chosen by a [`SpawnPlanner`], and reports every
//! attempt back with [`WaveDirector::on_zombie_spawned`].

mod planner;

use std::time::Duration;

use horde_core::WeaponKind;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

pub use planner::{SpawnConfig, SpawnPlanner};

/// Pacing, scaling, and unlock milestones of the wave progression.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Zombies in the first wave.
    pub base_zombies: u32,
    /// Additional zombies per subsequent wave.
    pub zombies_per_wave: u32,
    /// Upper bound on zombies per wave before the boss reduction.
    pub max_zombies: u32,
    /// Delay between groups during the first wave, in milliseconds.
    pub initial_spawn_delay_ms: u64,
    /// Reduction of the group delay per wave, in milliseconds.
    pub spawn_delay_decrease_ms: u64,
    /// Smallest group delay, in milliseconds.
    pub min_spawn_delay_ms: u64,
    /// Lull between two waves, in milliseconds.
    pub wave_delay_ms: u64,
    /// Smallest spawn group.
    pub min_group_size: u32,
    /// Largest spawn group.
    pub max_group_size: u32,
    /// Wave that unlocks the rifle.
    pub rifle_unlock_wave: u32,
    /// Wave that unlocks the shotgun.
    pub shotgun_unlock_wave: u32,
    /// Health multiplier gained per wave.
    pub health_increase_per_wave: f32,
    /// Cap on the health multiplier, boss bonus included.
    pub max_health_multiplier: f32,
    /// Speed multiplier gained per wave.
    pub speed_increase_per_wave: f32,
    /// Cap on the speed multiplier.
    pub max_speed_multiplier: f32,
    /// Every wave divisible by this number is a boss wave; zero disables bosses.
    pub boss_interval: u32,
    /// Health bonus applied on boss waves.
    pub boss_health_multiplier: f32,
    /// Damage multiplier applied on boss waves.
    pub boss_damage_multiplier: f32,
    /// Seed from which every wave derives its group-size stream.
    pub seed: u64,
}

impl WaveConfig {
    /// Lull between two waves.
    #[must_use]
    pub const fn wave_delay(&self) -> Duration {
        Duration::from_millis(self.wave_delay_ms)
    }
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            base_zombies: 5,
            zombies_per_wave: 2,
            max_zombies: 50,
            initial_spawn_delay_ms: 2_000,
            spawn_delay_decrease_ms: 100,
            min_spawn_delay_ms: 500,
            wave_delay_ms: 10_000,
            min_group_size: 5,
            max_group_size: 8,
            rifle_unlock_wave: 3,
            shotgun_unlock_wave: 5,
            health_increase_per_wave: 0.2,
            max_health_multiplier: 5.0,
            speed_increase_per_wave: 0.1,
            max_speed_multiplier: 2.0,
            boss_interval: 5,
            boss_health_multiplier: 5.0,
            boss_damage_multiplier: 2.0,
            seed: 0x7a3e_51c0_de9b_0b11,
        }
    }
}

/// Progress through the current spawn group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnGroup {
    /// Zombies the group consists of.
    pub size: u32,
    /// Zombies already reported for the group.
    pub spawned: u32,
}

impl SpawnGroup {
    /// Reports whether every member of the group has been reported.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.spawned >= self.size
    }
}

/// State of the wave progression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WavePhase {
    /// Lull before the next wave starts.
    WaitingForNextWave {
        /// Time left before the next wave.
        delay: Duration,
    },
    /// Zombies of the current wave are being released group by group.
    Spawning {
        /// Zombies of the wave that have not been spawned yet.
        remaining: u32,
        /// Group currently being released.
        group: SpawnGroup,
        /// Time left before the group is released.
        timer: Duration,
    },
}

/// Result of a spawn attempt reported back to the director.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnOutcome {
    /// An enemy entered the world.
    Spawned,
    /// No enemy could be produced, typically because the pool was exhausted.
    Skipped,
}

/// Wave progression state machine.
#[derive(Debug)]
pub struct WaveDirector {
    config: WaveConfig,
    wave: u32,
    spawn_delay: Duration,
    phase: WavePhase,
    pending_unlock: Option<WeaponKind>,
    dropped_spawns: u64,
    rng: ChaCha8Rng,
}

impl WaveDirector {
    /// Creates a director waiting to start wave 1 on its first update.
    #[must_use]
    pub fn new(config: WaveConfig) -> Self {
        Self {
            config,
            wave: 0,
            spawn_delay: Duration::from_millis(config.initial_spawn_delay_ms),
            phase: WavePhase::WaitingForNextWave {
                delay: Duration::ZERO,
            },
            pending_unlock: None,
            dropped_spawns: 0,
            rng: ChaCha8Rng::seed_from_u64(derive_wave_seed(config.seed, 0)),
        }
    }

    /// Advances to the next wave and starts releasing its zombies.
    pub fn start_next_wave(&mut self) {
        self.wave = self.wave.saturating_add(1);
        self.rng = ChaCha8Rng::seed_from_u64(derive_wave_seed(self.config.seed, self.wave));

        let elapsed_waves = self.wave - 1;
        let mut zombies = self
            .config
            .zombies_per_wave
            .saturating_mul(elapsed_waves)
            .saturating_add(self.config.base_zombies)
            .min(self.config.max_zombies);
        if self.is_boss_wave() {
            zombies = (zombies / 3).max(1);
        }

        let decrease = Duration::from_millis(self.config.spawn_delay_decrease_ms)
            .checked_mul(elapsed_waves)
            .unwrap_or(Duration::MAX);
        self.spawn_delay = Duration::from_millis(self.config.initial_spawn_delay_ms)
            .saturating_sub(decrease)
            .max(Duration::from_millis(self.config.min_spawn_delay_ms));

        if let Some(weapon) = self.weapon_unlocked_at(self.wave) {
            info!(wave = self.wave, weapon = ?weapon, "weapon unlocked");
            self.pending_unlock = Some(weapon);
        }

        let group = SpawnGroup {
            size: random_group_size(&mut self.rng, &self.config, zombies),
            spawned: 0,
        };
        self.phase = WavePhase::Spawning {
            remaining: zombies,
            group,
            timer: self.spawn_delay,
        };
        info!(
            wave = self.wave,
            zombies,
            boss = self.is_boss_wave(),
            spawn_delay_ms = self.spawn_delay.as_millis() as u64,
            "wave started"
        );
    }

    /// Advances timers by `dt`.
    pub fn update(&mut self, dt: Duration) {
        match &mut self.phase {
            WavePhase::WaitingForNextWave { delay } => {
                *delay = delay.saturating_sub(dt);
                if delay.is_zero() {
                    self.start_next_wave();
                }
            }
            WavePhase::Spawning {
                remaining,
                group,
                timer,
            } => {
                if *remaining > 0 {
                    if group.is_complete() {
                        *group = SpawnGroup {
                            size: random_group_size(&mut self.rng, &self.config, *remaining),
                            spawned: 0,
                        };
                        *timer = self.spawn_delay;
                    }
                    *timer = timer.saturating_sub(dt);
                }

                if *remaining == 0 {
                    info!(wave = self.wave, "wave complete");
                    self.phase = WavePhase::WaitingForNextWave {
                        delay: self.config.wave_delay(),
                    };
                }
            }
        }
    }

    /// Reports whether the current group is due.
    ///
    /// The signal fires once per group: it stays false after the first
    /// [`WaveDirector::on_zombie_spawned`] until the next group is due.
    #[must_use]
    pub fn should_spawn_zombie(&self) -> bool {
        matches!(
            self.phase,
            WavePhase::Spawning { remaining, group, timer }
                if remaining > 0 && timer.is_zero() && group.spawned == 0
        )
    }

    /// Records one spawn attempt of the current group.
    ///
    /// Skipped attempts still consume a zombie of the wave; they are counted in
    /// [`WaveDirector::dropped_spawns`] rather than retried.
    pub fn on_zombie_spawned(&mut self, outcome: SpawnOutcome) {
        let WavePhase::Spawning {
            remaining, group, ..
        } = &mut self.phase
        else {
            debug!("spawn reported while no wave is spawning");
            return;
        };
        if *remaining == 0 {
            return;
        }

        *remaining -= 1;
        group.spawned += 1;
        if outcome == SpawnOutcome::Skipped {
            self.dropped_spawns += 1;
            warn!(wave = self.wave, remaining = *remaining, "zombie spawn dropped");
        }
    }

    /// Current wave number; zero before the first wave.
    #[must_use]
    pub const fn current_wave(&self) -> u32 {
        self.wave
    }

    /// Current state of the progression.
    #[must_use]
    pub const fn phase(&self) -> &WavePhase {
        &self.phase
    }

    /// Zombies of the current wave still to be spawned.
    #[must_use]
    pub const fn zombies_remaining(&self) -> u32 {
        match self.phase {
            WavePhase::Spawning { remaining, .. } => remaining,
            WavePhase::WaitingForNextWave { .. } => 0,
        }
    }

    /// Size of the group currently being released; zero between waves.
    #[must_use]
    pub const fn current_group_size(&self) -> u32 {
        match self.phase {
            WavePhase::Spawning { group, .. } => group.size,
            WavePhase::WaitingForNextWave { .. } => 0,
        }
    }

    /// Delay between groups of the current wave.
    #[must_use]
    pub const fn spawn_delay(&self) -> Duration {
        self.spawn_delay
    }

    /// Time left before the current group is due.
    #[must_use]
    pub const fn spawn_delay_remaining(&self) -> Duration {
        match self.phase {
            WavePhase::Spawning { timer, .. } => timer,
            WavePhase::WaitingForNextWave { .. } => Duration::ZERO,
        }
    }

    /// Time left in the lull before the next wave.
    #[must_use]
    pub const fn wave_delay_remaining(&self) -> Duration {
        match self.phase {
            WavePhase::WaitingForNextWave { delay } => delay,
            WavePhase::Spawning { .. } => Duration::ZERO,
        }
    }

    /// Reports whether the director is in the lull between waves.
    #[must_use]
    pub const fn is_waiting_for_next_wave(&self) -> bool {
        matches!(self.phase, WavePhase::WaitingForNextWave { .. })
    }

    /// Reports whether every zombie of the current wave has been spawned.
    #[must_use]
    pub const fn is_wave_complete(&self) -> bool {
        self.wave > 0 && self.is_waiting_for_next_wave()
    }

    /// Reports whether the current wave is a boss wave.
    #[must_use]
    pub const fn is_boss_wave(&self) -> bool {
        self.wave > 0 && self.config.boss_interval > 0 && self.wave % self.config.boss_interval == 0
    }

    /// Health multiplier applied to zombies of the current wave.
    #[must_use]
    pub fn health_multiplier(&self) -> f32 {
        let mut multiplier =
            1.0 + self.wave.saturating_sub(1) as f32 * self.config.health_increase_per_wave;
        if self.is_boss_wave() {
            multiplier *= self.config.boss_health_multiplier;
        }
        multiplier.min(self.config.max_health_multiplier)
    }

    /// Speed multiplier applied to zombies of the current wave.
    #[must_use]
    pub fn speed_multiplier(&self) -> f32 {
        let multiplier =
            1.0 + self.wave.saturating_sub(1) as f32 * self.config.speed_increase_per_wave;
        multiplier.min(self.config.max_speed_multiplier)
    }

    /// Damage multiplier applied to zombies of the current wave.
    #[must_use]
    pub fn damage_multiplier(&self) -> f32 {
        if self.is_boss_wave() {
            self.config.boss_damage_multiplier
        } else {
            1.0
        }
    }

    /// Reports whether a weapon unlock awaits acknowledgement.
    #[must_use]
    pub const fn has_new_weapon_unlock(&self) -> bool {
        self.pending_unlock.is_some()
    }

    /// Weapon unlocked at the start of the current wave, if not yet acknowledged.
    #[must_use]
    pub const fn new_weapon_unlock(&self) -> Option<WeaponKind> {
        self.pending_unlock
    }

    /// Clears the pending weapon unlock.
    pub fn acknowledge_weapon_unlock(&mut self) {
        self.pending_unlock = None;
    }

    /// Returns and clears the pending weapon unlock.
    pub fn take_weapon_unlock(&mut self) -> Option<WeaponKind> {
        self.pending_unlock.take()
    }

    /// Reports whether `weapon` is available at the current wave.
    #[must_use]
    pub fn is_unlocked(&self, weapon: WeaponKind) -> bool {
        match weapon {
            WeaponKind::Pistol => true,
            WeaponKind::Rifle => self.wave >= self.config.rifle_unlock_wave,
            WeaponKind::Shotgun => self.wave >= self.config.shotgun_unlock_wave,
        }
    }

    /// Spawn attempts reported as skipped since the director was created.
    #[must_use]
    pub const fn dropped_spawns(&self) -> u64 {
        self.dropped_spawns
    }

    fn weapon_unlocked_at(&self, wave: u32) -> Option<WeaponKind> {
        if wave == self.config.rifle_unlock_wave {
            Some(WeaponKind::Rifle)
        } else if wave == self.config.shotgun_unlock_wave {
            Some(WeaponKind::Shotgun)
        } else {
            None
        }
    }
}

fn random_group_size(rng: &mut ChaCha8Rng, config: &WaveConfig, remaining: u32) -> u32 {
    if remaining == 0 {
        return 0;
    }

    let max_possible = config.max_group_size.min(remaining).max(1);
    let min_possible = config.min_group_size.min(remaining).clamp(1, max_possible);
    if remaining <= min_possible {
        return remaining;
    }
    rng.gen_range(min_possible..=max_possible)
}

fn derive_wave_seed(global_seed: u64, wave: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(wave.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_size_never_exceeds_remaining() {
        let config = WaveConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(random_group_size(&mut rng, &config, 0), 0);
        assert_eq!(random_group_size(&mut rng, &config, 3), 3);
        assert_eq!(random_group_size(&mut rng, &config, 5), 5);
        for _ in 0..100 {
            let size = random_group_size(&mut rng, &config, 7);
            assert!((5..=7).contains(&size));
            let size = random_group_size(&mut rng, &config, 40);
            assert!((5..=8).contains(&size));
        }
    }

    #[test]
    fn wave_seeds_differ_per_wave() {
        assert_ne!(derive_wave_seed(1, 1), derive_wave_seed(1, 2));
        assert_ne!(derive_wave_seed(1, 1), derive_wave_seed(2, 1));
        assert_eq!(derive_wave_seed(9, 4), derive_wave_seed(9, 4));
    }
}
