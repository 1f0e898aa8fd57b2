//! Integration of positions and velocities
//!
//! Player movement (acceleration, friction, dash override, arena clamp),
//! bullet flight with homing, enemy drift, gravity wells and the ephemeral
//! visual records.

use glam::Vec2;

use super::state::{BulletOwner, DashGhost, GameState, Player};
use super::tick::TickInput;
use crate::{heading, normalize_angle};

/// Move `vel` toward `target` by at most `max_delta`
#[inline]
fn approach(vel: Vec2, target: Vec2, max_delta: f32) -> Vec2 {
    let delta = target - vel;
    let len = delta.length();
    if len <= max_delta || len == 0.0 {
        target
    } else {
        vel + delta / len * max_delta
    }
}

/// Current speed cap of the player
pub fn player_speed_cap(state: &GameState) -> f32 {
    let tuning = &state.tuning;
    let overdrive = if state.player.in_overdrive() {
        tuning.overdrive_speed_mult
    } else {
        1.0
    };
    tuning.player_max_speed * state.player.stats.speed_mult * overdrive
}

/// Integrate the player for one step
pub fn move_player(state: &mut GameState, input: &TickInput, dt: f32) {
    let cap = player_speed_cap(state);
    let tuning = &state.tuning;
    let (width, height) = (tuning.arena_width, tuning.arena_height);
    let friction = tuning.player_friction.powf(dt * 60.0);
    let accel = tuning.player_accel;
    let dash_speed = tuning.dash_speed;
    let ghost_life = tuning.dash_ghost_life;

    let player = &mut state.player;
    if player.dash.cooldown > 0.0 {
        player.dash.cooldown = (player.dash.cooldown - dt).max(0.0);
    }

    if player.dash.active {
        // Dash overrides acceleration and friction
        player.vel = player.dash.dir * dash_speed;
        player.dash.timer -= dt;
        if player.dash.timer <= 0.0 {
            player.dash.active = false;
            player.dash.timer = 0.0;
            player.vel = player.dash.dir * cap;
        }
        state.dash_ghosts.push(DashGhost {
            pos: player.pos,
            facing: player.facing,
            life: ghost_life,
        });
    } else {
        let dir = input.move_dir.normalize_or_zero();
        if dir != Vec2::ZERO {
            player.vel = approach(player.vel, dir * cap, accel * dt);
        } else {
            player.vel *= friction;
            if player.vel.length_squared() < 1.0 {
                player.vel = Vec2::ZERO;
            }
        }
    }

    player.pos += player.vel * dt;

    clamp_to_arena(player, Vec2::new(width, height));

    let aim = input.aim - player.pos;
    if aim.length_squared() > 0.0 {
        player.facing = heading(aim);
    }
}

/// Keep the player inside the arena, killing velocity into the wall
pub fn clamp_to_arena(player: &mut Player, size: Vec2) {
    let r = player.radius;
    let clamped = player.pos.clamp(Vec2::splat(r), size - Vec2::splat(r));
    if clamped.x != player.pos.x {
        player.vel.x = 0.0;
    }
    if clamped.y != player.pos.y {
        player.vel.y = 0.0;
    }
    player.pos = clamped;
}

/// Fly bullets, steer homing ones, expire dead or out-of-bounds ones
pub fn move_bullets(state: &mut GameState, dt: f32) {
    let tuning = &state.tuning;
    let (width, height) = (tuning.arena_width, tuning.arena_height);
    let homing_radius_sq = tuning.homing_radius * tuning.homing_radius;
    let max_turn = tuning.homing_turn_rate * dt;
    let enemies = &state.enemies;

    for bullet in state.bullets.iter_mut() {
        if bullet.homing && bullet.owner == BulletOwner::Player {
            let target = enemies
                .iter()
                .filter(|e| !e.is_dead())
                .map(|e| (e.pos, e.pos.distance_squared(bullet.pos)))
                .filter(|(_, d)| *d < homing_radius_sq)
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            if let Some((target, _)) = target {
                let speed = bullet.vel.length();
                let current = heading(bullet.vel);
                let desired = heading(target - bullet.pos);
                let turn = normalize_angle(desired - current).clamp(-max_turn, max_turn);
                bullet.vel = crate::polar_to_cartesian(speed, current + turn);
            }
        }
        bullet.pos += bullet.vel * dt;
        bullet.life -= dt;
    }

    state.bullets.retain(|b| {
        b.life > 0.0
            && b.pos.x >= -b.radius
            && b.pos.y >= -b.radius
            && b.pos.x <= width + b.radius
            && b.pos.y <= height + b.radius
    });
}

/// Apply enemy velocities
pub fn move_enemies(state: &mut GameState, dt: f32) {
    for enemy in state.enemies.iter_mut() {
        enemy.pos += enemy.vel * dt;
    }
}

/// Pull non-boss enemies into gravity wells and expire them
pub fn update_gravity_wells(state: &mut GameState, dt: f32) {
    for well in state.gravity_wells.iter_mut() {
        well.life -= dt;
        let radius_sq = well.radius * well.radius;
        for enemy in state.enemies.iter_mut().filter(|e| !e.is_boss()) {
            let to_center = well.pos - enemy.pos;
            if to_center.length_squared() < radius_sq {
                enemy.vel += to_center.normalize_or_zero() * well.pull * dt;
            }
        }
    }
    state.gravity_wells.retain(|w| w.life > 0.0);
}

/// Age particles, damage numbers and dash ghosts
pub fn update_ephemera(state: &mut GameState, dt: f32) {
    for particle in state.particles.iter_mut() {
        particle.pos += particle.vel * dt;
        particle.vel *= 0.92;
        particle.life -= dt;
    }
    state.particles.retain(|p| p.life > 0.0);

    for number in state.damage_numbers.iter_mut() {
        number.pos.y -= 30.0 * dt;
        number.life -= dt;
    }
    state.damage_numbers.retain(|n| n.life > 0.0);

    for ghost in state.dash_ghosts.iter_mut() {
        ghost.life -= dt;
    }
    state.dash_ghosts.retain(|g| g.life > 0.0);
}
