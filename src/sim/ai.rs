//! Enemy behaviour
//!
//! Chasers steer toward the player. Lancers wind up and charge, sentries
//! hold range and shoot, and the boss picks one of three attacks each time
//! its cooldown elapses.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::events::GameEvent;
use super::state::{Bullet, BulletOwner, ENEMY_BULLET_COLOR, Enemy, EnemyBehavior, EnemyKind, GameState};
use crate::audio::SoundEffect;
use crate::polar_to_cartesian;

/// Boss attack patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossAttack {
    /// Bullets in every direction
    Ring,
    /// Fan of bullets aimed at the player
    Burst,
    /// Calls in minions
    Summon,
}

impl BossAttack {
    pub fn roll(rng: &mut impl Rng) -> Self {
        match rng.random_range(0..3) {
            0 => BossAttack::Ring,
            1 => BossAttack::Burst,
            _ => BossAttack::Summon,
        }
    }
}

/// Side effects an enemy wants applied after the behaviour pass
#[derive(Debug, Clone, Copy)]
enum EnemyAction {
    Shoot { origin: Vec2, dir: Vec2 },
    Boss { origin: Vec2, aim: Vec2 },
}

/// Accelerate toward `target`, letting speed above the cap bleed off
/// gradually so knockback is not erased in a single step
fn steer(enemy: &mut Enemy, target: Vec2, dt: f32) {
    let dir = (target - enemy.pos).normalize_or_zero();
    enemy.vel += dir * enemy.accel * dt;
    limit_speed(enemy, dt);
}

fn limit_speed(enemy: &mut Enemy, dt: f32) {
    let speed = enemy.vel.length();
    if speed > enemy.max_speed {
        let decay = 0.9f32.powf(dt * 60.0);
        enemy.vel *= (enemy.max_speed / speed).max(decay);
    }
}

fn brake(enemy: &mut Enemy, factor: f32, dt: f32) {
    enemy.vel *= factor.powf(dt * 60.0);
}

/// Run every enemy's behaviour for one step
pub fn update_enemies(state: &mut GameState, dt: f32) {
    let target = state.player.pos;
    let tuning = &state.tuning;
    let mut actions = Vec::new();

    for enemy in state.enemies.iter_mut() {
        let to_player = target - enemy.pos;
        let dist = to_player.length();
        enemy.attack_timer -= dt;

        match enemy.kind {
            EnemyKind::Drone | EnemyKind::Swarmer | EnemyKind::Brute => steer(enemy, target, dt),

            EnemyKind::Lancer => match enemy.behavior {
                EnemyBehavior::Idle => {
                    steer(enemy, target, dt);
                    if dist < tuning.lancer_range && enemy.attack_timer <= 0.0 {
                        enemy.behavior = EnemyBehavior::Charging {
                            timer: tuning.lancer_windup,
                        };
                    }
                }
                EnemyBehavior::Charging { timer } => {
                    brake(enemy, 0.8, dt);
                    let timer = timer - dt;
                    enemy.behavior = if timer <= 0.0 {
                        EnemyBehavior::Dashing {
                            timer: tuning.lancer_dash_time,
                            dir: to_player.normalize_or_zero(),
                        }
                    } else {
                        EnemyBehavior::Charging { timer }
                    };
                }
                EnemyBehavior::Dashing { timer, dir } => {
                    enemy.vel = dir * tuning.lancer_dash_speed;
                    let timer = timer - dt;
                    if timer <= 0.0 {
                        enemy.behavior = EnemyBehavior::Idle;
                        enemy.attack_timer = tuning.lancer_cooldown;
                        enemy.vel = dir * enemy.max_speed;
                    } else {
                        enemy.behavior = EnemyBehavior::Dashing { timer, dir };
                    }
                }
            },

            EnemyKind::Sentry => {
                if dist > tuning.sentry_range {
                    steer(enemy, target, dt);
                } else {
                    brake(enemy, 0.85, dt);
                }
                if dist < tuning.sentry_range * 1.2 && enemy.attack_timer <= 0.0 {
                    enemy.attack_timer = tuning.sentry_fire_interval;
                    actions.push(EnemyAction::Shoot {
                        origin: enemy.pos,
                        dir: to_player.normalize_or_zero(),
                    });
                }
            }

            EnemyKind::Boss => {
                if dist > tuning.boss_seek_distance {
                    enemy.vel += to_player.normalize_or_zero() * enemy.accel * dt;
                }
                brake(enemy, tuning.boss_damping, dt);
                enemy.vel = enemy.vel.clamp_length_max(enemy.max_speed);
                if enemy.attack_timer <= 0.0 {
                    enemy.attack_timer = tuning.boss_attack_cooldown;
                    actions.push(EnemyAction::Boss {
                        origin: enemy.pos,
                        aim: to_player.normalize_or_zero(),
                    });
                }
            }
        }
    }

    for action in actions {
        match action {
            EnemyAction::Shoot { origin, dir } => {
                spawn_enemy_bullet(state, origin, dir);
                state.emit(GameEvent::Sound(SoundEffect::EnemyShoot));
            }
            EnemyAction::Boss { origin, aim } => {
                let attack = BossAttack::roll(&mut state.rng);
                boss_attack(state, origin, aim, attack);
            }
        }
    }
}

/// Fire a single enemy bullet
pub fn spawn_enemy_bullet(state: &mut GameState, origin: Vec2, dir: Vec2) {
    let tuning = &state.tuning;
    let bullet = Bullet {
        id: 0,
        pos: origin,
        vel: dir * tuning.enemy_bullet_speed,
        radius: tuning.enemy_bullet_radius,
        life: tuning.enemy_bullet_lifetime,
        damage: tuning.enemy_bullet_damage,
        owner: BulletOwner::Enemy,
        color: ENEMY_BULLET_COLOR,
        piercing: false,
        homing: false,
        hits: Vec::new(),
    };
    let id = state.next_entity_id();
    state.bullets.push(Bullet { id, ..bullet });
}

/// Execute one boss attack from `origin`
pub fn boss_attack(state: &mut GameState, origin: Vec2, aim: Vec2, attack: BossAttack) {
    log::debug!("Boss attack: {:?}", attack);
    match attack {
        BossAttack::Ring => {
            let count = state.tuning.boss_ring_bullets.max(1);
            for i in 0..count {
                let angle = i as f32 / count as f32 * TAU;
                spawn_enemy_bullet(state, origin, polar_to_cartesian(1.0, angle));
            }
        }
        BossAttack::Burst => {
            let count = state.tuning.boss_burst_bullets.max(1);
            let base = crate::heading(aim);
            for i in 0..count {
                let offset = (i as f32 - (count - 1) as f32 / 2.0) * 0.12;
                spawn_enemy_bullet(state, origin, polar_to_cartesian(1.0, base + offset));
            }
        }
        BossAttack::Summon => {
            let archetype = state.tuning.enemies.drone;
            let count = state.tuning.boss_summon_count;
            for i in 0..count {
                let angle = i as f32 / count.max(1) as f32 * TAU;
                let pos = origin + polar_to_cartesian(80.0, angle);
                let id = state.next_entity_id();
                state.enemies.push(Enemy::new(id, EnemyKind::Drone, pos, &archetype));
            }
        }
    }
    state.emit(GameEvent::Sound(SoundEffect::EnemyShoot));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::tuning::Tuning;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn state_with(kind: EnemyKind, offset: Vec2) -> GameState {
        let mut state = GameState::new(11, Tuning::default(), Catalog::default());
        let archetype = *state.tuning.enemies.get(kind);
        let pos = state.player.pos + offset;
        let id = state.next_entity_id();
        state.enemies.push(Enemy::new(id, kind, pos, &archetype));
        state
    }

    #[test]
    fn test_chaser_moves_toward_player_within_cap() {
        let mut state = state_with(EnemyKind::Drone, Vec2::new(300.0, 0.0));
        for _ in 0..240 {
            update_enemies(&mut state, 1.0 / 120.0);
        }
        let drone = &state.enemies[0];
        assert!(drone.vel.x < 0.0);
        assert!(drone.vel.length() <= drone.max_speed + 1e-3);
    }

    #[test]
    fn test_lancer_cycle() {
        let mut state = state_with(EnemyKind::Lancer, Vec2::new(100.0, 0.0));
        state.enemies[0].attack_timer = 0.0;
        update_enemies(&mut state, 0.01);
        assert!(matches!(state.enemies[0].behavior, EnemyBehavior::Charging { .. }));

        update_enemies(&mut state, 0.7);
        match state.enemies[0].behavior {
            EnemyBehavior::Dashing { dir, .. } => assert!(dir.x < 0.0),
            other => panic!("expected dash, got {other:?}"),
        }

        update_enemies(&mut state, 0.6);
        assert_eq!(state.enemies[0].behavior, EnemyBehavior::Idle);
        assert!(state.enemies[0].attack_timer > 0.0);
    }

    #[test]
    fn test_sentry_shoots_when_in_range() {
        let mut state = state_with(EnemyKind::Sentry, Vec2::new(0.0, 200.0));
        state.enemies[0].attack_timer = 0.0;
        update_enemies(&mut state, 0.01);
        assert_eq!(state.bullets.len(), 1);
        assert_eq!(state.bullets[0].owner, BulletOwner::Enemy);
        assert!(state.bullets[0].vel.y < 0.0);
    }

    #[test]
    fn test_boss_speed_bounded() {
        let mut state = state_with(EnemyKind::Boss, Vec2::new(500.0, 0.0));
        state.enemies[0].attack_timer = 100.0;
        for _ in 0..1200 {
            update_enemies(&mut state, 1.0 / 120.0);
            state.enemies[0].pos = state.player.pos + Vec2::new(500.0, 0.0);
        }
        assert!(state.enemies[0].vel.length() <= state.enemies[0].max_speed + 1e-3);
    }

    #[test]
    fn test_boss_attacks() {
        let mut state = state_with(EnemyKind::Boss, Vec2::new(300.0, 0.0));
        let origin = state.enemies[0].pos;

        boss_attack(&mut state, origin, Vec2::NEG_X, BossAttack::Ring);
        assert_eq!(state.bullets.len(), 16);

        state.bullets.clear();
        boss_attack(&mut state, origin, Vec2::NEG_X, BossAttack::Burst);
        assert_eq!(state.bullets.len(), 5);
        assert!(state.bullets.iter().all(|b| b.vel.x < 0.0));

        boss_attack(&mut state, origin, Vec2::NEG_X, BossAttack::Summon);
        assert_eq!(state.enemies.len(), 4);
    }

    #[test]
    fn test_boss_attack_roll_covers_all_branches() {
        let mut rng = Pcg32::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(format!("{:?}", BossAttack::roll(&mut rng)));
        }
        assert_eq!(seen.len(), 3);
    }
}
