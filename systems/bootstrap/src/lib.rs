#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Assembly layer that wires the horde systems into a playable session.
//!
//! [`HordeConfig`] gathers the tuning of every subsystem into one TOML
//! document. [`Session`] owns the chunk streamer, the enemy pool, the wave
//! director and the spawn planner, and advances them in a fixed order once per
//! frame. Rendering is left to an adapter that consumes the [`RenderFrame`]
//! draw commands.

mod config;
mod session;

pub use config::{ConfigError, HordeConfig};
pub use session::{FrameReport, RenderFrame, Session};
