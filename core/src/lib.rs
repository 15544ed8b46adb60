#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the horde survival engine.
//!
//! This crate defines the vocabulary that connects the streaming world, the
//! enemy pool, the wave director, and whatever adapter drives them. Nothing in
//! here owns simulation state: the types are plain values (coordinates,
//! rectangles, damage descriptors, draw commands) plus the [`Target`] trait the
//! simulation uses to talk to the tracked player without knowing its concrete
//! type. Rendering operations across the workspace append [`TileDraw`] and
//! [`EnemyDraw`] commands into caller-owned buffers rather than touching a
//! graphics context directly.

use std::time::Duration;

pub use glam::Vec2;
use serde::{Deserialize, Serialize};

const SHOTGUN_KNOCKBACK_FORCE: f32 = 400.0;
const SHOTGUN_KNOCKBACK_MULTIPLIER: f32 = 0.5;
const SHOTGUN_KNOCKBACK_DURATION: Duration = Duration::from_millis(200);

/// Integer address of a chunk in chunk space.
///
/// Ordering is lexicographic on `x` first and `y` second, which keeps map
/// iteration over active chunks deterministic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    x: i32,
    y: i32,
}

impl ChunkCoord {
    /// Chunk containing the world origin.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal chunk index.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical chunk index.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Resolves the chunk containing the provided world position.
    ///
    /// World coordinates are floor-divided by the chunk pixel dimensions, so
    /// negative positions map to negative chunks. An empty `size` (dimensions
    /// not known yet) yields [`ChunkCoord::ORIGIN`].
    #[must_use]
    pub fn from_world(point: Vec2, size: ChunkSize) -> Self {
        if size.is_empty() {
            return Self::ORIGIN;
        }

        let x = (point.x / size.width() as f32).floor() as i32;
        let y = (point.y / size.height() as f32).floor() as i32;
        Self::new(x, y)
    }

    /// World position of the chunk's upper-left corner.
    #[must_use]
    pub fn world_origin(self, size: ChunkSize) -> Vec2 {
        Vec2::new(
            self.x as f32 * size.width() as f32,
            self.y as f32 * size.height() as f32,
        )
    }

    /// Chebyshev (chessboard) distance between two chunk coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: ChunkCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Enumerates the square of side `2 * radius + 1` centred on this chunk.
    ///
    /// Coordinates are produced row by row, top to bottom.
    pub fn square(self, radius: u32) -> impl Iterator<Item = ChunkCoord> {
        let radius = i32::try_from(radius).unwrap_or(i32::MAX);
        (-radius..=radius).flat_map(move |dy| {
            (-radius..=radius).map(move |dx| {
                ChunkCoord::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
            })
        })
    }
}

/// Pixel dimensions shared by every chunk of the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkSize {
    width: u32,
    height: u32,
}

impl ChunkSize {
    /// Creates a new chunk size from pixel dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of a chunk in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of a chunk in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether either dimension is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle expressed in floating point world (or screen) units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WorldRect {
    min: Vec2,
    size: Vec2,
}

impl WorldRect {
    /// Creates a rectangle from its upper-left corner and size.
    #[must_use]
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    /// Creates a rectangle of the provided size centred on `center`.
    #[must_use]
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self {
            min: center - size * 0.5,
            size,
        }
    }

    /// Upper-left corner.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Lower-right corner.
    #[must_use]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    /// Width and height of the rectangle.
    #[must_use]
    pub const fn size(&self) -> Vec2 {
        self.size
    }

    /// Centre point of the rectangle.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    /// Returns the rectangle shifted by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            size: self.size,
        }
    }

    /// Reports whether the two rectangles overlap with a positive area.
    ///
    /// Rectangles that merely share an edge do not intersect, and degenerate
    /// rectangles never intersect anything.
    #[must_use]
    pub fn intersects(&self, other: &WorldRect) -> bool {
        if self.is_degenerate() || other.is_degenerate() {
            return false;
        }

        let a_max = self.max();
        let b_max = other.max();
        self.min.x < b_max.x
            && other.min.x < a_max.x
            && self.min.y < b_max.y
            && other.min.y < a_max.y
    }

    /// Reports whether the point lies inside the rectangle (max edges excluded).
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.max();
        point.x >= self.min.x && point.x < max.x && point.y >= self.min.y && point.y < max.y
    }

    fn is_degenerate(&self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }
}

/// Camera view consumed for world-to-screen transforms and culling.
///
/// The simulation never owns or moves the camera; adapters hand a fresh
/// viewport to each render call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    origin: Vec2,
    size: Vec2,
}

impl Viewport {
    /// Creates a viewport whose upper-left corner sits at `origin`.
    #[must_use]
    pub fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    /// Creates a viewport of the provided size centred on `center`.
    #[must_use]
    pub fn centered_on(center: Vec2, size: Vec2) -> Self {
        Self::new(center - size * 0.5, size)
    }

    /// World position of the upper-left corner of the view.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Dimensions of the view in world units.
    #[must_use]
    pub const fn size(&self) -> Vec2 {
        self.size
    }

    /// World-space rectangle covered by the view.
    #[must_use]
    pub fn world_rect(&self) -> WorldRect {
        WorldRect::new(self.origin, self.size)
    }

    /// Converts a world position into screen coordinates.
    #[must_use]
    pub fn world_to_screen(&self, point: Vec2) -> Vec2 {
        point - self.origin
    }

    /// Converts a screen position (for example the cursor) into world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, point: Vec2) -> Vec2 {
        point + self.origin
    }
}

/// Weapons whose projectiles can damage enemies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeaponKind {
    /// Starting sidearm.
    Pistol,
    /// Automatic rifle unlocked in an early wave.
    Rifle,
    /// Spread weapon firing several knockback pellets per shot.
    Shotgun,
}

impl WeaponKind {
    /// Every weapon in unlock order.
    pub const ALL: [WeaponKind; 3] = [Self::Pistol, Self::Rifle, Self::Shotgun];

    /// Damage applied by a single projectile of this weapon.
    #[must_use]
    pub const fn damage(self) -> i32 {
        match self {
            Self::Pistol => 3,
            Self::Rifle => 2,
            Self::Shotgun => 1,
        }
    }

    /// Reports whether the weapon fires area-effect pellets.
    #[must_use]
    pub const fn is_area(self) -> bool {
        matches!(self, Self::Shotgun)
    }

    /// Knockback impulse applied on hit, if the weapon has one.
    #[must_use]
    pub fn knockback(self) -> Option<KnockbackImpulse> {
        if !self.is_area() {
            return None;
        }

        Some(KnockbackImpulse {
            speed: SHOTGUN_KNOCKBACK_FORCE * SHOTGUN_KNOCKBACK_MULTIPLIER,
            duration: SHOTGUN_KNOCKBACK_DURATION,
        })
    }
}

/// Timed forced displacement applied to an enemy after certain hits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KnockbackImpulse {
    /// Displacement speed in world units per second.
    pub speed: f32,
    /// How long the displacement lasts.
    pub duration: Duration,
}

/// Damage descriptor delivered to an enemy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Vector pointing from the damage source towards the enemy.
    pub impact: Vec2,
    /// Weapon that produced the hit.
    pub weapon: WeaponKind,
}

impl Hit {
    /// Creates a new hit descriptor.
    #[must_use]
    pub const fn new(impact: Vec2, weapon: WeaponKind) -> Self {
        Self { impact, weapon }
    }

    /// Builds a hit for a projectile at `projectile` striking an enemy at `enemy`.
    #[must_use]
    pub fn from_projectile(enemy: Vec2, projectile: Vec2, weapon: WeaponKind) -> Self {
        Self::new(enemy - projectile, weapon)
    }
}

/// Handle addressing a slot of the enemy pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Slot index addressed by the handle.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Wave-dependent scaling applied to an enemy when it spawns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnStats {
    /// Multiplier applied to the base health.
    pub health_multiplier: f32,
    /// Multiplier applied to the base movement speed, per-enemy variation included.
    pub speed_multiplier: f32,
    /// Multiplier applied to the base melee damage.
    pub damage_multiplier: f32,
}

impl SpawnStats {
    /// Unscaled statistics.
    pub const BASELINE: Self = Self {
        health_multiplier: 1.0,
        speed_multiplier: 1.0,
        damage_multiplier: 1.0,
    };
}

impl Default for SpawnStats {
    fn default() -> Self {
        Self::BASELINE
    }
}

/// Tracked viewpoint the simulation chases, streams around, and damages.
pub trait Target {
    /// World-space position of the target's centre.
    fn position(&self) -> Vec2;

    /// World-space collision rectangle.
    fn hitbox(&self) -> WorldRect;

    /// Applies melee damage to the target.
    fn take_damage(&mut self, amount: u32);
}

/// Pixel rectangle inside a tileset image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Request to draw a single tile of an active chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileDraw {
    /// Chunk owning the tileset the tile is cut from.
    pub chunk: ChunkCoord,
    /// Tile index inside the tileset.
    pub tile: u32,
    /// Source rectangle inside the tileset image.
    pub source: PixelRect,
    /// Destination rectangle in screen coordinates.
    pub dest: WorldRect,
}

/// Animation set an enemy is currently playing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnemyAnimation {
    /// Unified idle/walk cycle.
    Move,
    /// Melee swing.
    Attack,
}

/// Request to draw a living enemy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyDraw {
    /// Pool slot of the enemy.
    pub enemy: EnemyId,
    /// Centre of the sprite in screen coordinates.
    pub screen_position: Vec2,
    /// Facing in degrees, zero pointing along +x.
    pub rotation_degrees: f32,
    /// Animation set to sample.
    pub animation: EnemyAnimation,
    /// Frame index within the animation set.
    pub frame: u32,
    /// Hitbox in screen coordinates.
    pub hitbox: WorldRect,
    /// Remaining health as a fraction of the spawn health.
    pub health_fraction: f32,
}
