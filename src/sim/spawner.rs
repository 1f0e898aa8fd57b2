//! Enemy spawning, difficulty scaling and kill rewards
//!
//! The periodic spawner drops one enemy just outside an arena edge each time
//! its timer runs out. The timer shortens with every loop and with the
//! accumulated difficulty multiplier, and the enemy mix gets richer as the
//! difficulty value rises. While a boss is alive the spawner stays silent.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::events::GameEvent;
use super::state::{Enemy, EnemyKind, GameState, Particle, Pickup, PickupKind};
use crate::audio::SoundEffect;
use crate::polar_to_cartesian;

/// Seconds between ordinary spawns for the current loop and difficulty
pub fn spawn_interval(state: &GameState) -> f32 {
    let tuning = &state.tuning;
    let loop_scale = 1.0 + state.loop_count.saturating_sub(1) as f32 * tuning.spawn_loop_scaling;
    (tuning.spawn_interval / loop_scale / state.difficulty.max(0.01)).max(tuning.min_spawn_interval)
}

/// Difficulty value gating the enemy mix
pub fn difficulty_value(state: &GameState) -> f32 {
    state.loop_count as f32 * state.difficulty
}

/// Pick an enemy type for a difficulty value and a uniform roll in [0, 1)
///
/// Drones stay possible at every difficulty.
pub fn choose_enemy_kind(difficulty: f32, roll: f32) -> EnemyKind {
    if difficulty >= 5.0 && roll < 0.12 {
        EnemyKind::Brute
    } else if difficulty >= 3.0 && roll < 0.22 {
        EnemyKind::Sentry
    } else if difficulty >= 3.0 && roll < 0.34 {
        EnemyKind::Lancer
    } else if difficulty >= 1.5 && roll < 0.55 {
        EnemyKind::Swarmer
    } else {
        EnemyKind::Drone
    }
}

/// Random point just outside one of the four arena edges
pub fn edge_position(state: &mut GameState) -> Vec2 {
    let (w, h, m) = (
        state.tuning.arena_width,
        state.tuning.arena_height,
        state.tuning.spawn_margin,
    );
    let rng = &mut state.rng;
    match rng.random_range(0..4) {
        0 => Vec2::new(rng.random_range(0.0..w), -m),
        1 => Vec2::new(w + m, rng.random_range(0.0..h)),
        2 => Vec2::new(rng.random_range(0.0..w), h + m),
        _ => Vec2::new(-m, rng.random_range(0.0..h)),
    }
}

pub fn spawn_enemy(state: &mut GameState, kind: EnemyKind, pos: Vec2) -> u32 {
    let archetype = *state.tuning.enemies.get(kind);
    let id = state.next_entity_id();
    state.enemies.push(Enemy::new(id, kind, pos, &archetype));
    id
}

/// Count the spawn timer down and release enemies
pub fn update_spawner(state: &mut GameState, dt: f32) {
    if state.boss_alive() {
        return;
    }
    state.spawn_timer -= dt;
    while state.spawn_timer <= 0.0 {
        state.spawn_timer += spawn_interval(state);
        let roll = state.rng.random::<f32>();
        let kind = choose_enemy_kind(difficulty_value(state), roll);
        let pos = edge_position(state);
        spawn_enemy(state, kind, pos);
    }
}

/// Replace every enemy in the arena with the loop's boss
pub fn spawn_boss(state: &mut GameState) {
    state.enemies.clear();
    let hp = state.tuning.boss_hp(state.loop_count);
    let pos = Vec2::new(state.tuning.arena_width / 2.0, 120.0);
    let id = spawn_enemy(state, EnemyKind::Boss, pos);
    if let Some(boss) = state.enemies.iter_mut().find(|e| e.id == id) {
        boss.hp = hp;
        boss.max_hp = hp;
        boss.attack_timer = state.tuning.boss_attack_cooldown;
    }
    log::info!("Boss spawned for loop {} with {} hp", state.loop_count, hp);
    state.emit(GameEvent::BossSpawned { hp });
    state.emit(GameEvent::Sound(SoundEffect::BossSpawn));
}

/// Place a pickup in the arena
pub fn drop_pickup(state: &mut GameState, kind: PickupKind, pos: Vec2) {
    let id = state.next_entity_id();
    let radius = state.tuning.pickup_radius;
    state.pickups.push(Pickup { id, kind, pos, radius });
}

/// Roll the drop table for a killed enemy
pub fn roll_drops(state: &mut GameState, kind: EnemyKind, pos: Vec2) {
    let xp = state.tuning.enemies.get(kind).xp;
    let tuning = &state.tuning;
    let (xp_chance, health_chance, data_chance) = (
        tuning.xp_drop_chance,
        tuning.health_drop_chance,
        tuning.data_drop_chance,
    );

    let lore_left = state.locked_lore().next().is_some();
    if lore_left && state.rng.random::<f32>() < data_chance {
        drop_pickup(state, PickupKind::Data, pos);
    } else if state.rng.random::<f32>() < health_chance {
        drop_pickup(state, PickupKind::Health, pos);
    }
    if xp > 0 && state.rng.random::<f32>() < xp_chance {
        let jitter = polar_to_cartesian(6.0, state.rng.random_range(0.0..TAU));
        drop_pickup(state, PickupKind::Experience { amount: xp }, pos + jitter);
    }
}

/// Remove dead enemies and hand out rewards; returns true if the boss died
pub fn reap_enemies(state: &mut GameState) -> bool {
    if !state.enemies.iter().any(Enemy::is_dead) {
        return false;
    }
    let (dead, alive): (Vec<Enemy>, Vec<Enemy>) =
        std::mem::take(&mut state.enemies).into_iter().partition(Enemy::is_dead);
    state.enemies = alive;

    let mut boss_killed = false;
    for enemy in dead {
        let score = state.tuning.enemies.get(enemy.kind).score;
        state.add_score(score);
        state.emit(GameEvent::EnemyKilled {
            kind: enemy.kind,
            pos: enemy.pos,
        });

        let life = state.tuning.particle_life;
        for i in 0..8 {
            let angle = i as f32 / 8.0 * TAU + state.rng.random_range(0.0..0.5);
            let speed = state.rng.random_range(80.0..220.0);
            state.spawn_particle(Particle {
                pos: enemy.pos,
                vel: polar_to_cartesian(speed, angle),
                color: 0xff7a00,
                life,
                size: 3.0,
            });
        }

        if enemy.is_boss() {
            boss_killed = true;
            state.emit(GameEvent::BossDefeated);
            state.emit(GameEvent::Sound(SoundEffect::BossDeath));
            for i in 1..=3 {
                state
                    .scheduled
                    .schedule(i as f32 * 0.12, GameEvent::Sound(SoundEffect::Explosion));
            }
        } else {
            roll_drops(state, enemy.kind, enemy.pos);
            state.emit(GameEvent::Sound(SoundEffect::EnemyDeath));
        }
    }
    let freeze = state.tuning.hit_stop_kill;
    state.hit_stop(freeze);
    boss_killed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::tuning::Tuning;

    fn state() -> GameState {
        GameState::new(21, Tuning::default(), Catalog::default())
    }

    #[test]
    fn test_first_loop_spawns_only_drones() {
        for i in 0..100 {
            let roll = i as f32 / 100.0;
            assert_eq!(choose_enemy_kind(1.0, roll), EnemyKind::Drone);
        }
    }

    #[test]
    fn test_mix_grows_with_difficulty() {
        assert_eq!(choose_enemy_kind(2.0, 0.3), EnemyKind::Swarmer);
        assert_eq!(choose_enemy_kind(3.5, 0.1), EnemyKind::Sentry);
        assert_eq!(choose_enemy_kind(3.5, 0.3), EnemyKind::Lancer);
        assert_eq!(choose_enemy_kind(6.0, 0.05), EnemyKind::Brute);
        // Weak types remain possible late
        assert_eq!(choose_enemy_kind(50.0, 0.9), EnemyKind::Drone);
    }

    #[test]
    fn test_interval_shrinks_with_loops_and_difficulty() {
        let mut state = state();
        let first = spawn_interval(&state);
        state.loop_count = 4;
        state.difficulty = 1.3;
        let later = spawn_interval(&state);
        assert!(later < first);
        state.loop_count = 1000;
        assert_eq!(spawn_interval(&state), state.tuning.min_spawn_interval);
    }

    #[test]
    fn test_spawner_emits_outside_arena() {
        let mut state = state();
        update_spawner(&mut state, 10.0);
        assert!(!state.enemies.is_empty());
        let (w, h) = (state.tuning.arena_width, state.tuning.arena_height);
        for enemy in &state.enemies {
            let p = enemy.pos;
            assert!(p.x < 0.0 || p.y < 0.0 || p.x > w || p.y > h);
        }
    }

    #[test]
    fn test_spawner_silent_while_boss_alive() {
        let mut state = state();
        state.loop_count = 5;
        spawn_boss(&mut state);
        update_spawner(&mut state, 60.0);
        assert_eq!(state.enemies.len(), 1);

        state.enemies.clear();
        update_spawner(&mut state, 60.0);
        assert!(!state.enemies.is_empty());
    }

    #[test]
    fn test_boss_replaces_enemies_with_scaled_hp() {
        let mut state = state();
        spawn_enemy(&mut state, EnemyKind::Drone, Vec2::ZERO);
        spawn_enemy(&mut state, EnemyKind::Brute, Vec2::ZERO);
        state.loop_count = 5;
        spawn_boss(&mut state);
        assert_eq!(state.enemies.len(), 1);
        assert!(state.enemies[0].is_boss());
        assert_eq!(state.enemies[0].hp, 800.0 * (1.0 + 5.0 * 0.5));
    }

    #[test]
    fn test_reap_awards_score_and_reports_boss() {
        let mut state = state();
        spawn_enemy(&mut state, EnemyKind::Drone, Vec2::new(50.0, 50.0));
        spawn_enemy(&mut state, EnemyKind::Drone, Vec2::new(80.0, 50.0));
        state.enemies[0].hp = 0.0;
        assert!(!reap_enemies(&mut state));
        assert_eq!(state.enemies.len(), 1);
        assert_eq!(state.score, 10);
        assert!(state.hit_stop > 0.0);

        state.loop_count = 5;
        spawn_boss(&mut state);
        state.enemies[0].hp = -3.0;
        assert!(reap_enemies(&mut state));
        assert!(state.events.contains(&GameEvent::BossDefeated));
        assert_eq!(state.scheduled.len(), 3);
    }

    #[test]
    fn test_kill_bursts_particles_outward() {
        let mut state = state();
        let pos = Vec2::new(200.0, 200.0);
        spawn_enemy(&mut state, EnemyKind::Drone, pos);
        state.enemies[0].hp = 0.0;
        reap_enemies(&mut state);
        assert_eq!(state.particles.len(), 8);
        for particle in &state.particles {
            assert_eq!(particle.pos, pos);
            let speed = particle.vel.length();
            assert!((79.9..=220.1).contains(&speed), "speed {speed}");
        }
    }
}
