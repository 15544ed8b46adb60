#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure flocking math that steers enemies around a shared target.
//!
//! Every function reads an immutable snapshot of the flock and returns a
//! direction; nothing here mutates enemies. Neighbour scans are linear in the
//! flock size, so a full steering pass over the pool is quadratic.

use std::f32::consts::TAU;

use horde_core::{EnemyId, Vec2};
use serde::Deserialize;

/// Weights and ranges that shape group movement.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlockingConfig {
    /// Radius within which neighbours contribute alignment and cohesion.
    pub neighbor_radius: f32,
    /// Distance below which neighbours push each other apart.
    pub min_separation: f32,
    /// Weight of the separation term.
    pub separation_weight: f32,
    /// Weight of the alignment term.
    pub alignment_weight: f32,
    /// Weight of the cohesion term.
    pub cohesion_weight: f32,
    /// Weight of the base direction towards the target or formation slot.
    pub attraction_weight: f32,
    /// Distance below which enemies rush the target.
    pub close_range: f32,
    /// Distance below which enemies try to encircle the target.
    pub formation_range: f32,
    /// Radius of the ring enemies form around the target.
    pub formation_radius: f32,
}

impl Default for FlockingConfig {
    fn default() -> Self {
        Self {
            neighbor_radius: 90.0,
            min_separation: 100.0,
            separation_weight: 1.5,
            alignment_weight: 1.0,
            cohesion_weight: 1.0,
            attraction_weight: 1.2,
            close_range: 200.0,
            formation_range: 400.0,
            formation_radius: 300.0,
        }
    }
}

/// Snapshot of a single flock member taken at the start of a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Boid {
    /// Pool slot of the member, used to skip itself during neighbour scans.
    pub id: EnemyId,
    /// World-space position.
    pub position: Vec2,
    /// Normalised movement direction from the previous frame, zero when idle.
    pub heading: Vec2,
}

/// Distance band that selects the base steering behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DistanceBand {
    /// Rush straight at the target.
    Close,
    /// Move towards a slot on the ring around the target.
    Formation,
    /// Chase the target from afar.
    Pursuit,
}

impl DistanceBand {
    /// Classifies a distance to the target.
    #[must_use]
    pub fn classify(distance: f32, config: &FlockingConfig) -> Self {
        if distance < config.close_range {
            Self::Close
        } else if distance < config.formation_range {
            Self::Formation
        } else {
            Self::Pursuit
        }
    }
}

/// Computes the normalised movement direction of `own` for this frame.
#[must_use]
pub fn steer(own: &Boid, target: Vec2, flock: &[Boid], config: &FlockingConfig) -> Vec2 {
    let to_target = target - own.position;
    let base = match DistanceBand::classify(to_target.length(), config) {
        DistanceBand::Close | DistanceBand::Pursuit => to_target.normalize_or_zero(),
        DistanceBand::Formation => {
            let slot = formation_point(own, target, flock, config.formation_radius);
            (slot - own.position).normalize_or_zero()
        }
    };

    blend(
        base,
        separation(own, flock, config.min_separation),
        alignment(own, flock, config.neighbor_radius),
        cohesion(own, flock, config.neighbor_radius),
        config,
    )
}

/// Weighted sum of the steering terms, re-normalised.
#[must_use]
pub fn blend(
    base: Vec2,
    separation: Vec2,
    alignment: Vec2,
    cohesion: Vec2,
    config: &FlockingConfig,
) -> Vec2 {
    (base * config.attraction_weight
        + separation * config.separation_weight
        + alignment * config.alignment_weight
        + cohesion * config.cohesion_weight)
        .normalize_or_zero()
}

/// Pushes away from members closer than `min_separation`, harder the closer they are.
#[must_use]
pub fn separation(own: &Boid, flock: &[Boid], min_separation: f32) -> Vec2 {
    others_within(own, flock, min_separation)
        .map(|other| {
            let away = own.position - other.position;
            away / (away.length() + 1.0)
        })
        .sum::<Vec2>()
        .normalize_or_zero()
}

/// Average heading of the members within `radius`.
#[must_use]
pub fn alignment(own: &Boid, flock: &[Boid], radius: f32) -> Vec2 {
    others_within(own, flock, radius)
        .map(|other| other.heading)
        .sum::<Vec2>()
        .normalize_or_zero()
}

/// Direction towards the centroid of the members within `radius`.
#[must_use]
pub fn cohesion(own: &Boid, flock: &[Boid], radius: f32) -> Vec2 {
    let (sum, count) = others_within(own, flock, radius)
        .fold((Vec2::ZERO, 0_u32), |(sum, count), other| {
            (sum + other.position, count + 1)
        });
    if count == 0 {
        return Vec2::ZERO;
    }

    (sum / count as f32 - own.position).normalize_or_zero()
}

/// Angle around `target` at which `own` should stand in the ring.
///
/// Every other member, ranked by its angular offset from `own`, votes for the
/// angle `own` would take if the ring were evenly spaced with `2π / (n + 1)`
/// between neighbours. The slot is the average of those votes, so a ring that
/// is already evenly spaced keeps every member in place.
#[must_use]
pub fn formation_angle(own: &Boid, target: Vec2, flock: &[Boid]) -> f32 {
    let own_angle = angle_around(target, own.position);
    let mut offsets: Vec<f32> = flock
        .iter()
        .filter(|other| other.id != own.id)
        .map(|other| (angle_around(target, other.position) - own_angle).rem_euclid(TAU))
        .collect();
    if offsets.is_empty() {
        return own_angle;
    }

    offsets.sort_by(f32::total_cmp);
    let step = TAU / (offsets.len() + 1) as f32;
    let correction: f32 = offsets
        .iter()
        .enumerate()
        .map(|(rank, offset)| offset - (rank + 1) as f32 * step)
        .sum();
    own_angle + correction / offsets.len() as f32
}

/// Point on the ring of radius `radius` around `target` claimed by `own`.
#[must_use]
pub fn formation_point(own: &Boid, target: Vec2, flock: &[Boid], radius: f32) -> Vec2 {
    let angle = formation_angle(own, target, flock);
    target + Vec2::from_angle(angle) * radius
}

fn angle_around(center: Vec2, point: Vec2) -> f32 {
    let offset = point - center;
    offset.y.atan2(offset.x)
}

fn others_within<'a>(
    own: &'a Boid,
    flock: &'a [Boid],
    radius: f32,
) -> impl Iterator<Item = &'a Boid> {
    let radius_squared = radius * radius;
    flock.iter().filter(move |other| {
        other.id != own.id && other.position.distance_squared(own.position) < radius_squared
    })
}
