#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy pool system: fixed-capacity zombie storage with flocking movement.
//!
//! [`EnemyPool`] owns every [`Enemy`] for the lifetime of a session. Each
//! frame it snapshots the living enemies, steers them with the flocking
//! rules, reclaims the ones that died or wandered off, and periodically pulls
//! distant enemies back towards the target.

mod enemy;
mod pool;

pub use enemy::{Enemy, EnemyConfig, EnemyState};
pub use pool::{EnemyPool, PoolConfig, PoolError, MAX_POOL_CAPACITY};
