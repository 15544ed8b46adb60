use std::{f32::consts::TAU, time::Duration};

use horde_core::{SpawnStats, Target, Vec2, WorldRect};
use horde_system_flocking::FlockingConfig;
use horde_system_pool::{EnemyConfig, EnemyPool, PoolConfig};

struct Statue {
    damage_taken: u32,
}

impl Target for Statue {
    fn position(&self) -> Vec2 {
        Vec2::ZERO
    }

    fn hitbox(&self) -> WorldRect {
        WorldRect::centered(Vec2::ZERO, Vec2::new(40.0, 40.0))
    }

    fn take_damage(&mut self, amount: u32) {
        self.damage_taken += amount;
    }
}

#[test]
fn enemies_in_formation_range_spread_into_an_even_ring() {
    let flocking = FlockingConfig::default();
    let mut pool = EnemyPool::new(
        PoolConfig::default(),
        EnemyConfig::default(),
        flocking,
    )
    .expect("valid pool");
    for angle in [0.0_f32, 1.0, 2.0, 3.0, 4.0] {
        let _ = pool
            .spawn(Vec2::from_angle(angle) * 350.0, SpawnStats::BASELINE)
            .expect("spawn");
    }

    let mut statue = Statue { damage_taken: 0 };
    let frame = Duration::from_nanos(16_666_667);
    for _ in 0..600 {
        pool.update(frame, Some(&mut statue));
    }

    assert_eq!(pool.active_count(), 5);
    assert_eq!(statue.damage_taken, 0, "a ring keeps its distance");

    let mut angles: Vec<f32> = pool
        .enemies()
        .map(|enemy| enemy.position().y.atan2(enemy.position().x))
        .collect();
    angles.sort_by(f32::total_cmp);
    let expected_gap = TAU / 5.0;
    for (index, angle) in angles.iter().enumerate() {
        let next = angles[(index + 1) % angles.len()];
        let gap = (next - angle).rem_euclid(TAU);
        assert!(
            (gap - expected_gap).abs() < 0.1,
            "gap {gap} deviates from {expected_gap}"
        );
    }

    for enemy in pool.enemies() {
        let radius = enemy.position().length();
        assert!(
            (radius - flocking.formation_radius).abs() < 20.0,
            "radius {radius} far from the formation ring"
        );
    }
}
