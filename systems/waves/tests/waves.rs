use std::time::Duration;

use horde_core::WeaponKind;
use horde_system_waves::{SpawnOutcome, WaveConfig, WaveDirector, WavePhase};

const FRAME: Duration = Duration::from_millis(100);

fn director() -> WaveDirector {
    WaveDirector::new(WaveConfig::default())
}

/// Drives the director like the game loop: spawn whole groups whenever due.
fn run_wave(director: &mut WaveDirector, outcome: SpawnOutcome) -> Vec<u32> {
    let mut groups = Vec::new();
    let mut previous = director.zombies_remaining();
    for _ in 0..10_000 {
        if director.should_spawn_zombie() {
            let size = director.current_group_size();
            groups.push(size);
            for _ in 0..size {
                director.on_zombie_spawned(outcome);
            }
            assert!(!director.should_spawn_zombie(), "signal must fire once per group");
        }
        director.update(FRAME);

        if let WavePhase::Spawning { remaining, .. } = *director.phase() {
            assert!(remaining <= previous, "remaining zombies must not increase");
            previous = remaining;
        } else {
            return groups;
        }
    }
    panic!("wave never completed");
}

#[test]
fn starts_waiting_for_wave_one() {
    let mut director = director();
    assert_eq!(director.current_wave(), 0);
    assert!(director.is_waiting_for_next_wave());
    assert!(!director.is_wave_complete());
    assert!(!director.should_spawn_zombie());

    director.update(FRAME);
    assert_eq!(director.current_wave(), 1);
    assert_eq!(director.zombies_remaining(), 5);
    assert_eq!(director.spawn_delay(), Duration::from_secs(2));
}

#[test]
fn wave_three_targets_nine_zombies() {
    let mut director = director();
    director.start_next_wave();
    director.start_next_wave();
    director.start_next_wave();
    assert_eq!(director.current_wave(), 3);
    assert_eq!(director.zombies_remaining(), 9);
    assert_eq!(director.spawn_delay(), Duration::from_millis(1_800));
}

#[test]
fn boss_waves_trade_numbers_for_strength() {
    let mut director = director();
    for _ in 0..5 {
        director.start_next_wave();
    }
    assert!(director.is_boss_wave());
    assert_eq!(director.zombies_remaining(), 13 / 3);
    assert!((director.health_multiplier() - 5.0).abs() < 1e-5);
    assert!((director.damage_multiplier() - 2.0).abs() < 1e-5);

    director.start_next_wave();
    assert!(!director.is_boss_wave());
    assert!((director.damage_multiplier() - 1.0).abs() < 1e-5);
    assert!((director.health_multiplier() - 2.0).abs() < 1e-5);
}

#[test]
fn group_signal_waits_for_the_spawn_delay() {
    let mut director = director();
    director.start_next_wave();
    assert!(!director.should_spawn_zombie());

    let mut elapsed = Duration::ZERO;
    while !director.should_spawn_zombie() {
        director.update(FRAME);
        elapsed += FRAME;
        assert!(elapsed <= Duration::from_secs(3), "group never became due");
    }
    assert_eq!(elapsed, Duration::from_secs(2));
}

#[test]
fn waves_drain_to_zero_then_rest() {
    let mut director = director();
    director.start_next_wave();
    let groups = run_wave(&mut director, SpawnOutcome::Spawned);

    assert_eq!(groups.iter().sum::<u32>(), 5);
    assert!(director.is_wave_complete());
    assert_eq!(director.zombies_remaining(), 0);
    assert_eq!(director.wave_delay_remaining(), Duration::from_secs(10));

    for _ in 0..99 {
        director.update(FRAME);
    }
    assert_eq!(director.current_wave(), 1);
    director.update(FRAME);
    assert_eq!(director.current_wave(), 2);
    assert_eq!(director.zombies_remaining(), 7);
}

#[test]
fn large_waves_split_into_bounded_groups() {
    let mut director = director();
    for _ in 0..9 {
        director.start_next_wave();
    }
    assert_eq!(director.zombies_remaining(), 21);
    let groups = run_wave(&mut director, SpawnOutcome::Spawned);
    assert_eq!(groups.iter().sum::<u32>(), 21);
    let (last, full) = groups.split_last().expect("at least one group");
    assert!(full.iter().all(|size| (5..=8).contains(size)));
    assert!(*last >= 1 && *last <= 8);
}

#[test]
fn skipped_spawns_still_advance_the_wave() {
    let mut director = director();
    director.start_next_wave();
    let groups = run_wave(&mut director, SpawnOutcome::Skipped);
    assert_eq!(groups.iter().sum::<u32>(), 5);
    assert_eq!(director.dropped_spawns(), 5);
    assert!(director.is_wave_complete());
}

#[test]
fn difficulty_is_capped_for_any_wave() {
    let config = WaveConfig::default();
    let mut director = WaveDirector::new(config);
    for _ in 0..500 {
        director.start_next_wave();
        assert!(director.health_multiplier() <= config.max_health_multiplier);
        assert!(director.speed_multiplier() <= config.max_speed_multiplier);
        assert!(director.zombies_remaining() <= config.max_zombies);
        assert!(director.zombies_remaining() >= 1);
        assert!(director.spawn_delay() >= Duration::from_millis(config.min_spawn_delay_ms));
    }
}

#[test]
fn weapon_unlocks_fire_once_at_their_waves() {
    let mut director = director();
    let mut unlocks = Vec::new();
    for _ in 0..6 {
        director.start_next_wave();
        if let Some(weapon) = director.take_weapon_unlock() {
            unlocks.push((director.current_wave(), weapon));
        }
        assert!(!director.has_new_weapon_unlock());
    }
    assert_eq!(unlocks, vec![(3, WeaponKind::Rifle), (5, WeaponKind::Shotgun)]);
    assert!(WeaponKind::ALL.into_iter().all(|weapon| director.is_unlocked(weapon)));
}

#[test]
fn unlock_flag_persists_until_acknowledged() {
    let mut director = director();
    for _ in 0..3 {
        director.start_next_wave();
    }
    assert!(!director.is_unlocked(WeaponKind::Shotgun));
    assert!(director.is_unlocked(WeaponKind::Rifle));
    assert_eq!(director.new_weapon_unlock(), Some(WeaponKind::Rifle));
    director.update(FRAME);
    assert!(director.has_new_weapon_unlock());
    director.acknowledge_weapon_unlock();
    assert!(!director.has_new_weapon_unlock());
}

#[test]
fn equal_seeds_replay_identical_group_sequences() {
    let mut a = director();
    let mut b = director();
    for _ in 0..8 {
        a.start_next_wave();
        b.start_next_wave();
    }
    assert_eq!(
        run_wave(&mut a, SpawnOutcome::Spawned),
        run_wave(&mut b, SpawnOutcome::Spawned)
    );
}
