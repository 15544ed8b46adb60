use std::time::Duration;

use horde_core::{
    EnemyAnimation, EnemyDraw, EnemyId, Hit, SpawnStats, Target, Vec2, Viewport, WorldRect,
};
use horde_system_flocking::{steer, Boid, FlockingConfig};
use serde::Deserialize;

const OFF_WORLD: Vec2 = Vec2::new(-100_000.0, -100_000.0);

/// Base statistics and presentation timing shared by every enemy.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    /// Health at spawn before wave scaling.
    pub base_health: u32,
    /// Movement speed in world units per second before scaling.
    pub base_speed: f32,
    /// Melee damage per attack before scaling.
    pub base_damage: u32,
    /// Minimum time between two attacks, in milliseconds.
    pub attack_cooldown_ms: u64,
    /// Hitbox width in world units.
    pub hitbox_width: f32,
    /// Hitbox height in world units.
    pub hitbox_height: f32,
    /// Frames in the movement animation.
    pub move_frames: u32,
    /// Frames in the attack animation.
    pub attack_frames: u32,
    /// Time each animation frame is shown, in milliseconds.
    pub frame_duration_ms: u64,
}

impl EnemyConfig {
    /// Minimum time between two attacks.
    #[must_use]
    pub const fn attack_cooldown(&self) -> Duration {
        Duration::from_millis(self.attack_cooldown_ms)
    }

    /// Time each animation frame is shown.
    #[must_use]
    pub const fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_duration_ms)
    }

    /// Hitbox dimensions.
    #[must_use]
    pub fn hitbox_size(&self) -> Vec2 {
        Vec2::new(self.hitbox_width, self.hitbox_height)
    }
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            base_health: 5,
            base_speed: 100.0,
            base_damage: 10,
            attack_cooldown_ms: 1_000,
            hitbox_width: 40.0,
            hitbox_height: 40.0,
            move_frames: 17,
            attack_frames: 9,
            frame_duration_ms: 50,
        }
    }
}

/// Lifecycle state of a pool slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnemyState {
    /// Parked off-world, waiting to be spawned.
    Inert,
    /// Walking towards the target or its formation slot.
    Moving,
    /// Touching the target and swinging at it.
    Attacking,
    /// Health dropped to zero; the pool reclaims the slot on its next update.
    Dead,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Knockback {
    velocity: Vec2,
    remaining: Duration,
}

/// Single zombie living in a pool slot.
#[derive(Clone, Debug)]
pub struct Enemy {
    id: EnemyId,
    config: EnemyConfig,
    state: EnemyState,
    position: Vec2,
    heading: Vec2,
    rotation_degrees: f32,
    health: i32,
    max_health: i32,
    speed: f32,
    damage: u32,
    stats: SpawnStats,
    last_attack_at: Option<Duration>,
    knockback: Option<Knockback>,
    frame: u32,
    frame_elapsed: Duration,
}

impl Enemy {
    pub(crate) fn new(id: EnemyId, config: EnemyConfig) -> Self {
        Self {
            id,
            config,
            state: EnemyState::Inert,
            position: OFF_WORLD,
            heading: Vec2::ZERO,
            rotation_degrees: 0.0,
            health: 0,
            max_health: 0,
            speed: 0.0,
            damage: 0,
            stats: SpawnStats::BASELINE,
            last_attack_at: None,
            knockback: None,
            frame: 0,
            frame_elapsed: Duration::ZERO,
        }
    }

    /// Re-initialises the enemy at `position` with freshly scaled statistics.
    pub fn reset(&mut self, position: Vec2, stats: SpawnStats) {
        let health = (self.config.base_health as f32 * stats.health_multiplier).round();
        let damage = (self.config.base_damage as f32 * stats.damage_multiplier).round();

        self.state = EnemyState::Moving;
        self.position = position;
        self.heading = Vec2::ZERO;
        self.rotation_degrees = 0.0;
        self.health = (health as i32).max(1);
        self.max_health = self.health;
        self.speed = self.config.base_speed * stats.speed_multiplier.max(0.0);
        self.damage = damage.max(0.0) as u32;
        self.stats = stats;
        self.last_attack_at = None;
        self.knockback = None;
        self.frame = 0;
        self.frame_elapsed = Duration::ZERO;
    }

    pub(crate) fn deactivate(&mut self) {
        self.state = EnemyState::Inert;
        self.position = OFF_WORLD;
        self.heading = Vec2::ZERO;
        self.knockback = None;
    }

    /// Advances the enemy by one frame.
    ///
    /// `now` is the pool clock used for attack cooldowns and `flock` is the
    /// snapshot of living enemies taken at the start of the frame.
    pub fn update<T>(
        &mut self,
        dt: Duration,
        now: Duration,
        target: &mut T,
        flock: &[Boid],
        flocking: &FlockingConfig,
    ) where
        T: Target + ?Sized,
    {
        if !self.is_alive() {
            return;
        }

        let seconds = dt.as_secs_f32();
        if let Some(knockback) = self.knockback.as_mut() {
            self.position += knockback.velocity * seconds;
            knockback.remaining = knockback.remaining.saturating_sub(dt);
            if knockback.remaining.is_zero() {
                self.knockback = None;
            }
            self.advance_animation(dt);
            return;
        }

        let target_position = target.position();
        let to_target = target_position - self.position;
        if to_target != Vec2::ZERO {
            self.rotation_degrees = to_target.y.atan2(to_target.x).to_degrees();
        }

        let direction = steer(&self.boid(), target_position, flock, flocking);
        self.position += direction * self.speed * seconds;
        self.heading = direction;

        let was_attacking = self.state == EnemyState::Attacking;
        if self.hitbox().intersects(&target.hitbox()) {
            let cooled_down = self
                .last_attack_at
                .map_or(true, |last| now.saturating_sub(last) >= self.config.attack_cooldown());
            if cooled_down {
                self.state = EnemyState::Attacking;
                self.last_attack_at = Some(now);
                target.take_damage(self.damage);
                if !was_attacking {
                    self.restart_animation();
                }
            }
        } else if was_attacking {
            self.state = EnemyState::Moving;
            self.restart_animation();
        }

        self.advance_animation(dt);
    }

    /// Applies a hit, returning `true` when it killed the enemy.
    ///
    /// Area weapons also push the enemy along the impact vector for a short time.
    pub fn take_damage(&mut self, hit: &Hit) -> bool {
        if !self.is_alive() {
            return false;
        }

        if let Some(impulse) = hit.weapon.knockback() {
            let direction = hit.impact.normalize_or_zero();
            let velocity = if direction == Vec2::ZERO {
                self.knockback.map_or(Vec2::ZERO, |knockback| knockback.velocity)
            } else {
                direction * impulse.speed
            };
            self.knockback = Some(Knockback {
                velocity,
                remaining: impulse.duration,
            });
        }

        self.health -= hit.weapon.damage();
        if self.health <= 0 {
            self.state = EnemyState::Dead;
            self.knockback = None;
            return true;
        }
        false
    }

    /// Reports whether the enemy is alive and its hitbox overlaps `rect`.
    #[must_use]
    pub fn hit_test(&self, rect: &WorldRect) -> bool {
        self.is_alive() && self.hitbox().intersects(rect)
    }

    /// Pool slot of the enemy.
    #[must_use]
    pub const fn id(&self) -> EnemyId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> EnemyState {
        self.state
    }

    /// Reports whether the enemy is moving or attacking.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        matches!(self.state, EnemyState::Moving | EnemyState::Attacking)
    }

    /// Reports whether the enemy has been killed.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == EnemyState::Dead
    }

    /// World position of the enemy's centre.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Direction moved during the last frame.
    #[must_use]
    pub const fn heading(&self) -> Vec2 {
        self.heading
    }

    /// Facing towards the target in degrees.
    #[must_use]
    pub const fn rotation_degrees(&self) -> f32 {
        self.rotation_degrees
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health
    }

    /// Health at spawn.
    #[must_use]
    pub const fn max_health(&self) -> i32 {
        self.max_health
    }

    /// Movement speed in world units per second.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Melee damage per attack.
    #[must_use]
    pub const fn damage(&self) -> u32 {
        self.damage
    }

    /// Scaling applied at the last spawn.
    #[must_use]
    pub const fn stats(&self) -> SpawnStats {
        self.stats
    }

    /// Reports whether a knockback is displacing the enemy.
    #[must_use]
    pub const fn is_knocked_back(&self) -> bool {
        self.knockback.is_some()
    }

    /// Animation set currently playing.
    #[must_use]
    pub fn animation(&self) -> EnemyAnimation {
        if self.state == EnemyState::Attacking {
            EnemyAnimation::Attack
        } else {
            EnemyAnimation::Move
        }
    }

    /// Frame index within the current animation.
    #[must_use]
    pub const fn frame(&self) -> u32 {
        self.frame
    }

    /// World-space collision rectangle centred on the enemy.
    #[must_use]
    pub fn hitbox(&self) -> WorldRect {
        WorldRect::centered(self.position, self.config.hitbox_size())
    }

    /// Snapshot of the enemy used by neighbour scans.
    #[must_use]
    pub const fn boid(&self) -> Boid {
        Boid {
            id: self.id,
            position: self.position,
            heading: self.heading,
        }
    }

    /// Draw command for the enemy as seen through `viewport`.
    #[must_use]
    pub fn draw(&self, viewport: &Viewport) -> EnemyDraw {
        let hitbox = self.hitbox();
        let health_fraction = if self.max_health > 0 {
            (self.health.max(0) as f32 / self.max_health as f32).min(1.0)
        } else {
            0.0
        };

        EnemyDraw {
            enemy: self.id,
            screen_position: viewport.world_to_screen(self.position),
            rotation_degrees: self.rotation_degrees,
            animation: self.animation(),
            frame: self.frame,
            hitbox: hitbox.translated(-viewport.origin()),
            health_fraction,
        }
    }

    fn frame_count(&self) -> u32 {
        match self.animation() {
            EnemyAnimation::Move => self.config.move_frames,
            EnemyAnimation::Attack => self.config.attack_frames,
        }
    }

    fn restart_animation(&mut self) {
        self.frame = 0;
        self.frame_elapsed = Duration::ZERO;
    }

    fn advance_animation(&mut self, dt: Duration) {
        let frame_duration = self.config.frame_duration();
        if frame_duration.is_zero() {
            return;
        }

        self.frame_elapsed = self.frame_elapsed.saturating_add(dt);
        if self.frame_elapsed >= frame_duration {
            self.frame_elapsed = Duration::ZERO;
            self.frame += 1;
            if self.frame >= self.frame_count() {
                self.frame = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use horde_core::WeaponKind;

    use super::*;

    struct Dummy {
        position: Vec2,
        damage_taken: u32,
    }

    impl Target for Dummy {
        fn position(&self) -> Vec2 {
            self.position
        }

        fn hitbox(&self) -> WorldRect {
            WorldRect::centered(self.position, Vec2::new(40.0, 40.0))
        }

        fn take_damage(&mut self, amount: u32) {
            self.damage_taken += amount;
        }
    }

    fn spawned(position: Vec2, stats: SpawnStats) -> Enemy {
        let mut enemy = Enemy::new(EnemyId::new(0), EnemyConfig::default());
        enemy.reset(position, stats);
        enemy
    }

    const FRAME: Duration = Duration::from_millis(16);

    #[test]
    fn reset_scales_statistics() {
        let enemy = spawned(
            Vec2::ZERO,
            SpawnStats {
                health_multiplier: 1.4,
                speed_multiplier: 1.5,
                damage_multiplier: 2.0,
            },
        );
        assert_eq!(enemy.health(), 7);
        assert_eq!(enemy.damage(), 20);
        assert!((enemy.speed() - 150.0).abs() < 1e-4);
        assert_eq!(enemy.state(), EnemyState::Moving);
    }

    #[test]
    fn chases_and_faces_a_distant_target() {
        let mut enemy = spawned(Vec2::new(1_000.0, 0.0), SpawnStats::BASELINE);
        let mut target = Dummy {
            position: Vec2::ZERO,
            damage_taken: 0,
        };
        let flock = [enemy.boid()];
        let config = FlockingConfig::default();
        enemy.update(Duration::from_secs(1), Duration::ZERO, &mut target, &flock, &config);
        assert!((enemy.position() - Vec2::new(900.0, 0.0)).length() < 1e-3);
        assert!((enemy.rotation_degrees().abs() - 180.0).abs() < 1e-3);
    }

    #[test]
    fn attacks_respect_the_cooldown() {
        let mut enemy = spawned(Vec2::new(10.0, 0.0), SpawnStats::BASELINE);
        let mut target = Dummy {
            position: Vec2::ZERO,
            damage_taken: 0,
        };
        let config = FlockingConfig::default();

        enemy.update(FRAME, Duration::from_millis(100), &mut target, &[], &config);
        assert_eq!(target.damage_taken, 10);
        assert_eq!(enemy.state(), EnemyState::Attacking);
        assert_eq!(enemy.animation(), EnemyAnimation::Attack);

        enemy.update(FRAME, Duration::from_millis(600), &mut target, &[], &config);
        assert_eq!(target.damage_taken, 10);

        enemy.update(FRAME, Duration::from_millis(1_100), &mut target, &[], &config);
        assert_eq!(target.damage_taken, 20);
    }

    #[test]
    fn leaving_the_target_stops_the_attack() {
        let mut enemy = spawned(Vec2::new(10.0, 0.0), SpawnStats::BASELINE);
        let mut target = Dummy {
            position: Vec2::ZERO,
            damage_taken: 0,
        };
        let config = FlockingConfig::default();
        enemy.update(FRAME, Duration::ZERO, &mut target, &[], &config);
        assert_eq!(enemy.state(), EnemyState::Attacking);

        target.position = Vec2::new(5_000.0, 0.0);
        enemy.update(FRAME, Duration::from_millis(16), &mut target, &[], &config);
        assert_eq!(enemy.state(), EnemyState::Moving);
        assert_eq!(enemy.frame(), 0);
    }

    #[test]
    fn area_hits_knock_back_and_suspend_steering() {
        let mut enemy = spawned(Vec2::new(300.0, 0.0), SpawnStats::BASELINE);
        let hit =
            Hit::from_projectile(enemy.position(), Vec2::new(290.0, 0.0), WeaponKind::Shotgun);
        assert!(!enemy.take_damage(&hit));
        assert_eq!(enemy.health(), 4);
        assert!(enemy.is_knocked_back());

        let mut target = Dummy {
            position: Vec2::ZERO,
            damage_taken: 0,
        };
        let config = FlockingConfig::default();
        enemy.update(Duration::from_millis(100), Duration::ZERO, &mut target, &[], &config);
        assert!((enemy.position() - Vec2::new(320.0, 0.0)).length() < 1e-3);
        assert_eq!(enemy.frame(), 1);

        enemy.update(Duration::from_millis(100), Duration::ZERO, &mut target, &[], &config);
        assert!(!enemy.is_knocked_back());
        enemy.update(Duration::from_millis(100), Duration::ZERO, &mut target, &[], &config);
        assert!(enemy.position().x < 340.0);
    }

    #[test]
    fn lethal_hits_mark_the_enemy_dead() {
        let mut enemy = spawned(Vec2::ZERO, SpawnStats::BASELINE);
        let hit = Hit::new(Vec2::X, WeaponKind::Pistol);
        assert!(!enemy.take_damage(&hit));
        assert!(enemy.take_damage(&hit));
        assert!(enemy.is_dead());
        assert!(!enemy.take_damage(&hit));
        assert!(!enemy.hit_test(&enemy.hitbox()));
    }

    #[test]
    fn animation_wraps_around() {
        let mut enemy = spawned(Vec2::new(5_000.0, 0.0), SpawnStats::BASELINE);
        let mut target = Dummy {
            position: Vec2::ZERO,
            damage_taken: 0,
        };
        let config = FlockingConfig::default();
        for _ in 0..17 {
            enemy.update(Duration::from_millis(50), Duration::ZERO, &mut target, &[], &config);
        }
        assert_eq!(enemy.frame(), 0);
        enemy.update(Duration::from_millis(50), Duration::ZERO, &mut target, &[], &config);
        assert_eq!(enemy.frame(), 1);
    }
}
