//! Collision detection and response
//!
//! Every body is a circle, so every check is a distance-squared test against
//! the sum of radii. Entity counts stay in the low hundreds and the pairwise
//! loops below are cheap enough without spatial partitioning.

use glam::Vec2;
use rand::Rng;

use super::events::GameEvent;
use super::physics::clamp_to_arena;
use super::state::{BulletOwner, DamageNumber, GameState, Particle, PickupKind};
use crate::audio::SoundEffect;

/// Circle-circle overlap test
#[inline]
pub fn circles_overlap(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a.distance_squared(b) < reach * reach
}

/// Unit vector from `from` toward `to`; falls back to +X for coincident points
#[inline]
pub fn contact_normal(from: Vec2, to: Vec2) -> Vec2 {
    let n = (to - from).normalize_or_zero();
    if n == Vec2::ZERO { Vec2::X } else { n }
}

/// Push two bodies apart along `normal` (pointing from `a` to `b`)
#[inline]
pub fn apply_knockback(a_vel: &mut Vec2, b_vel: &mut Vec2, normal: Vec2, impulse: f32, b_scale: f32) {
    *a_vel -= normal * impulse;
    *b_vel += normal * impulse * b_scale;
}

/// Damage an enemy and leave a damage number behind
pub fn hit_enemy(state: &mut GameState, enemy_idx: usize, amount: f32) {
    let Some(enemy) = state.enemies.get_mut(enemy_idx) else {
        return;
    };
    enemy.hp -= amount;
    let pos = enemy.pos;
    let life = state.tuning.damage_number_life;
    state.damage_numbers.push(DamageNumber { pos, amount, life });
}

/// Player body against enemy bodies
///
/// A dashing player rams (each enemy once per dash); otherwise both bodies
/// take a knockback impulse and the player takes contact damage.
pub fn resolve_player_enemies(state: &mut GameState) {
    let tuning = &state.tuning;
    let player = &state.player;

    let mut contacts = Vec::new();
    for (idx, enemy) in state.enemies.iter().enumerate() {
        if circles_overlap(player.pos, player.radius, enemy.pos, enemy.radius) {
            contacts.push(idx);
        }
    }

    let (ram, ram_boss) = (tuning.ram_damage, tuning.ram_damage_boss);
    let (contact, contact_boss) = (tuning.contact_damage, tuning.contact_damage_boss);
    let impulse = tuning.contact_knockback;
    let arena = Vec2::new(tuning.arena_width, tuning.arena_height);

    for idx in contacts {
        let enemy = &mut state.enemies[idx];
        let normal = contact_normal(state.player.pos, enemy.pos);
        let boss_scale = if enemy.is_boss() { 0.2 } else { 1.0 };

        if state.player.is_dashing() {
            if state.player.dash.rammed.contains(&enemy.id) {
                continue;
            }
            state.player.dash.rammed.push(enemy.id);
            enemy.vel += normal * impulse * boss_scale;
            let damage = if enemy.is_boss() { ram_boss } else { ram };
            hit_enemy(state, idx, damage);
            state.emit(GameEvent::Sound(SoundEffect::Hit));
        } else {
            let damage = if enemy.is_boss() { contact_boss } else { contact };
            apply_knockback(&mut state.player.vel, &mut enemy.vel, normal, impulse, boss_scale);
            // Separate so the same overlap does not hit again next step
            let reach = state.player.radius + enemy.radius;
            state.player.pos = enemy.pos - normal * reach;
            clamp_to_arena(&mut state.player, arena);
            state.damage_player(damage);
        }
    }
}

/// Player bullets against enemies
pub fn resolve_bullets_enemies(state: &mut GameState) {
    let GameState {
        bullets,
        enemies,
        player,
        rng,
        ..
    } = state;

    // (enemy idx, damage)
    let mut hits: Vec<(usize, f32)> = Vec::new();
    let mut heal = 0.0;

    for bullet in bullets.iter_mut().filter(|b| b.owner == BulletOwner::Player) {
        if bullet.life <= 0.0 {
            continue;
        }
        for (idx, enemy) in enemies.iter().enumerate() {
            if enemy.is_dead() || bullet.hits.contains(&enemy.id) {
                continue;
            }
            if !circles_overlap(bullet.pos, bullet.radius, enemy.pos, enemy.radius) {
                continue;
            }
            hits.push((idx, bullet.damage));
            bullet.hits.push(enemy.id);
            if player.stats.lifesteal_chance > 0.0 && rng.random::<f32>() < player.stats.lifesteal_chance {
                heal += 1.0;
            }
            if !bullet.piercing {
                bullet.life = 0.0;
                break;
            }
        }
    }

    bullets.retain(|b| b.life > 0.0);

    for (idx, damage) in &hits {
        hit_enemy(state, *idx, *damage);
        let pos = state.enemies[*idx].pos;
        let life = state.tuning.particle_life;
        let angle = state.rng.random_range(0.0..std::f32::consts::TAU);
        state.spawn_particle(Particle {
            pos,
            vel: crate::polar_to_cartesian(120.0, angle),
            color: 0xffffff,
            life,
            size: 2.0,
        });
    }
    if !hits.is_empty() {
        state.emit(GameEvent::Sound(SoundEffect::Hit));
    }
    if heal > 0.0 && state.player.heal(heal) > 0.0 {
        state.emit_health();
    }
}

/// Enemy bullets against the player; dashing passes straight through
pub fn resolve_enemy_bullets_player(state: &mut GameState) {
    if state.player.is_dashing() {
        return;
    }
    let player = &state.player;
    let mut damage = 0.0;
    for bullet in state.bullets.iter_mut().filter(|b| b.owner == BulletOwner::Enemy) {
        if circles_overlap(bullet.pos, bullet.radius, player.pos, player.radius) {
            damage += bullet.damage;
            bullet.life = 0.0;
        }
    }
    if damage > 0.0 {
        state.bullets.retain(|b| b.life > 0.0);
        state.damage_player(damage);
    }
}

/// Orbitals deal continuous damage to overlapping enemies
pub fn resolve_orbitals(state: &mut GameState, dt: f32) {
    if state.orbitals.is_empty() {
        return;
    }
    let radius = state.tuning.orbital_radius;
    let damage = state.tuning.orbital_dps * dt;
    let touched: Vec<usize> = state
        .enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| {
            state
                .orbitals
                .iter()
                .any(|o| circles_overlap(o.pos, radius, e.pos, e.radius))
        })
        .map(|(idx, _)| idx)
        .collect();
    for idx in touched {
        state.enemies[idx].hp -= damage;
    }
}

/// Magnet pickups toward the player and collect overlapping ones
pub fn resolve_pickups(state: &mut GameState, dt: f32) -> Vec<PickupKind> {
    let player_pos = state.player.pos;
    let player_radius = state.player.radius;
    let range = state.tuning.magnet_range;
    let speed = state.tuning.magnet_speed;

    let mut collected = Vec::new();
    state.pickups.retain_mut(|pickup| {
        let to_player = player_pos - pickup.pos;
        if to_player.length_squared() < range * range {
            let step = (speed * dt).min(to_player.length());
            pickup.pos += to_player.normalize_or_zero() * step;
        }
        if circles_overlap(pickup.pos, pickup.radius, player_pos, player_radius) {
            collected.push(pickup.kind);
            false
        } else {
            true
        }
    });
    collected
}
