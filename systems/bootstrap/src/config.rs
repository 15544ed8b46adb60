use std::{fs, path::Path};

use anyhow::Context;
use horde_system_flocking::FlockingConfig;
use horde_system_pool::{EnemyConfig, PoolConfig};
use horde_system_waves::{SpawnConfig, WaveConfig};
use horde_world::{BlueprintConfig, StreamingConfig};
use serde::Deserialize;
use thiserror::Error;

/// Failure raised while reading a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML or does not match the schema.
    #[error("failed to parse configuration")]
    Parse(#[from] toml::de::Error),
    /// A value is outside the range the systems can work with.
    #[error("invalid configuration value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Constraint that was violated.
        reason: &'static str,
    },
}

/// Tuning of every subsystem, one table per system.
///
/// Missing tables and keys fall back to their defaults, so an empty document
/// describes the stock game.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HordeConfig {
    /// Chunk streaming radius.
    pub streaming: StreamingConfig,
    /// Blueprint files stamped onto every chunk.
    pub blueprint: BlueprintConfig,
    /// Enemy pool capacity and recycling thresholds.
    pub pool: PoolConfig,
    /// Per-enemy stats and animation timing.
    pub enemy: EnemyConfig,
    /// Steering weights and distance bands.
    pub flocking: FlockingConfig,
    /// Wave pacing and difficulty scaling.
    pub waves: WaveConfig,
    /// Spawn point geometry.
    pub spawn: SpawnConfig,
}

impl HordeConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates the TOML document at `path`.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration at {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("failed to load configuration from {}", path.display()))
    }

    /// Checks the cross-field constraints the systems rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blueprint.tile_width == 0 || self.blueprint.tile_height == 0 {
            return Err(invalid("blueprint.tile_width", "tile edges must be positive"));
        }
        if self.spawn.spawn_points == 0 {
            return Err(invalid("spawn.spawn_points", "at least one spawn point is required"));
        }
        if !(self.spawn.min_distance >= 0.0 && self.spawn.min_distance <= self.spawn.max_distance) {
            return Err(invalid(
                "spawn.min_distance",
                "must be non-negative and not exceed spawn.max_distance",
            ));
        }
        if self.spawn.group_radius < 0.0 {
            return Err(invalid("spawn.group_radius", "must be non-negative"));
        }
        if self.waves.min_group_size == 0 || self.waves.min_group_size > self.waves.max_group_size {
            return Err(invalid(
                "waves.min_group_size",
                "must be positive and not exceed waves.max_group_size",
            ));
        }
        if self.waves.min_spawn_delay_ms > self.waves.initial_spawn_delay_ms {
            return Err(invalid(
                "waves.min_spawn_delay_ms",
                "must not exceed waves.initial_spawn_delay_ms",
            ));
        }
        let pool = &self.pool;
        if !(pool.optimal_distance >= 0.0
            && pool.max_reposition_distance() <= pool.min_recycle_distance
            && pool.min_recycle_distance <= pool.recycle_distance)
        {
            return Err(invalid(
                "pool.min_recycle_distance",
                "expected 1.2 x optimal_distance <= min_recycle_distance <= recycle_distance",
            ));
        }
        if !(0.0..=1.0).contains(&pool.high_utilization) {
            return Err(invalid("pool.high_utilization", "must be a fraction between 0 and 1"));
        }
        Ok(())
    }
}

const fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
