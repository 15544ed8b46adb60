#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line driver that runs the horde core without a renderer.

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use horde_core::{Target, Vec2, WorldRect};
use horde_system_bootstrap::{HordeConfig, Session};
use horde_world::ChunkLoader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Runs the horde simulation headlessly and reports wave progress.
#[derive(Debug, Parser)]
#[command(name = "horde", version, about)]
struct Cli {
    /// TOML configuration file; built-in defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 3_600)]
    frames: u32,
    /// Length of one frame in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
    /// Walking speed of the survivor along the x axis, in units per second.
    #[arg(long, default_value_t = 120.0)]
    walk_speed: f32,
    /// Hit points of the survivor.
    #[arg(long, default_value_t = 500)]
    health: u32,
}

#[derive(Debug)]
struct Survivor {
    position: Vec2,
    health: u32,
}

impl Target for Survivor {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn hitbox(&self) -> WorldRect {
        WorldRect::centered(self.position, Vec2::new(40.0, 40.0))
    }

    fn take_damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    frames: u32,
    wave: u32,
    spawned: u64,
    dropped: u64,
    health: u32,
    active_enemies: usize,
    active_chunks: usize,
}

fn simulate<L>(session: &mut Session<L>, cli: &Cli) -> Summary
where
    L: ChunkLoader,
{
    let dt = Duration::from_millis(cli.frame_ms);
    let stride = Vec2::new(cli.walk_speed * dt.as_secs_f32(), 0.0);
    let mut survivor = Survivor {
        position: Vec2::ZERO,
        health: cli.health,
    };
    let mut summary = Summary::default();

    for frame in 0..cli.frames {
        survivor.position += stride;
        let report = session.tick(dt, Some(&mut survivor));
        summary.frames = frame + 1;
        summary.spawned += u64::from(report.spawned);
        summary.dropped += u64::from(report.dropped);
        if let Some(weapon) = report.unlocked {
            info!(frame, wave = report.wave, ?weapon, "new weapon available");
        }
        if survivor.health == 0 {
            warn!(frame, wave = report.wave, "survivor overrun");
            break;
        }
    }

    summary.wave = session.waves().current_wave();
    summary.health = survivor.health;
    summary.active_enemies = session.pool().active_count();
    summary.active_chunks = session.chunks().active_count();
    summary
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Entry point for the headless horde driver.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => HordeConfig::load(path)?,
        None => HordeConfig::default(),
    };
    let mut session = Session::from_config(&config)?;
    let summary = simulate(&mut session, &cli);

    println!(
        "{} frames, reached wave {}, {} spawned, {} dropped, survivor health {}, \
         {} enemies and {} chunks active",
        summary.frames,
        summary.wave,
        summary.spawned,
        summary.dropped,
        summary.health,
        summary.active_enemies,
        summary.active_chunks,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("horde").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn parses_defaults_and_overrides() {
        let defaults = cli(&[]);
        assert_eq!(defaults.frames, 3_600);
        assert_eq!(defaults.frame_ms, 16);
        assert!(defaults.config.is_none());

        let custom = cli(&["--frames", "10", "--frame-ms", "33", "--config", "horde.toml"]);
        assert_eq!(custom.frames, 10);
        assert_eq!(custom.frame_ms, 33);
        assert_eq!(custom.config, Some(PathBuf::from("horde.toml")));
    }

    #[test]
    fn headless_run_reaches_the_first_group() {
        let options = cli(&["--frames", "30", "--frame-ms", "100", "--walk-speed", "0"]);
        let mut session = Session::from_config(&HordeConfig::default()).expect("session");
        let summary = simulate(&mut session, &options);

        assert_eq!(summary.frames, 30);
        assert_eq!(summary.wave, 1);
        assert_eq!(summary.spawned, 5);
        assert_eq!(summary.dropped, 0);
        assert_eq!(summary.health, 500);
        assert_eq!(summary.active_enemies, 5);
    }
}
