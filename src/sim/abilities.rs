//! Player abilities
//!
//! Primary fire, dash (and its gravity-well variant), the nova burst,
//! overdrive, orbitals and pickup effects.

use std::f32::consts::TAU;

use glam::Vec2;

use super::collision::{circles_overlap, contact_normal, hit_enemy};
use super::events::GameEvent;
use super::state::{
    Bullet, BulletOwner, GamePhase, GameState, GravityWell, OVERDRIVE_BULLET_COLOR, Orbital,
    PLAYER_BULLET_COLOR, Particle, PauseReason, PickupKind,
};
use super::tick::TickInput;
use crate::audio::SoundEffect;
use crate::polar_to_cartesian;

/// Damage a player bullet fired right now would carry
pub fn player_bullet_damage(state: &GameState) -> f32 {
    let tuning = &state.tuning;
    let overdrive = if state.player.in_overdrive() {
        tuning.overdrive_damage_mult
    } else {
        1.0
    };
    tuning.bullet_damage * state.player.stats.damage_mult * overdrive
}

/// Seconds between volleys right now
pub fn fire_interval(state: &GameState) -> f32 {
    let tuning = &state.tuning;
    let overdrive = if state.player.in_overdrive() {
        tuning.overdrive_fire_rate_mult
    } else {
        1.0
    };
    tuning.fire_interval / (state.player.stats.fire_rate_mult * overdrive).max(0.01)
}

/// Count down the fire timer and fire while the trigger is held
pub fn update_fire(state: &mut GameState, input: &TickInput, dt: f32) {
    state.player.fire_timer = (state.player.fire_timer - dt).max(0.0);
    if input.fire && state.player.fire_timer <= 0.0 {
        state.player.fire_timer = fire_interval(state);
        fire_volley(state);
    }
}

/// Fire one volley along the facing angle, fanned by projectile count
pub fn fire_volley(state: &mut GameState) {
    let damage = player_bullet_damage(state);
    let color = if state.player.in_overdrive() {
        OVERDRIVE_BULLET_COLOR
    } else {
        PLAYER_BULLET_COLOR
    };
    let tuning = &state.tuning;
    let (speed, radius, life, spread) = (
        tuning.bullet_speed,
        tuning.bullet_radius,
        tuning.bullet_lifetime,
        tuning.spread_angle,
    );
    let stats = state.player.stats;
    let count = stats.projectile_count.max(1);
    let origin = state.player.pos;
    let facing = state.player.facing;

    for i in 0..count {
        let offset = (i as f32 - (count - 1) as f32 / 2.0) * spread;
        let id = state.next_entity_id();
        state.bullets.push(Bullet {
            id,
            pos: origin,
            vel: polar_to_cartesian(speed, facing + offset),
            radius,
            life,
            damage,
            owner: BulletOwner::Player,
            color,
            piercing: stats.piercing,
            homing: stats.homing,
            hits: Vec::new(),
        });
    }
    state.emit(GameEvent::Sound(SoundEffect::Shoot));
}

/// Start a dash if it is off cooldown
pub fn try_dash(state: &mut GameState, input: &TickInput) -> bool {
    let player = &state.player;
    if player.dash.active || player.dash.cooldown > 0.0 {
        return false;
    }
    let dir = input.move_dir.normalize_or_zero();
    let dir = if dir == Vec2::ZERO {
        polar_to_cartesian(1.0, player.facing)
    } else {
        dir
    };

    let tuning = &state.tuning;
    let cooldown = tuning.dash_cooldown * player.stats.dash_cooldown_mult;
    let duration = tuning.dash_duration;
    let well = player.stats.has_gravity_dash.then(|| GravityWell {
        pos: player.pos,
        radius: tuning.gravity_well_radius,
        life: tuning.gravity_well_life,
        pull: tuning.gravity_well_pull,
    });

    let dash = &mut state.player.dash;
    dash.active = true;
    dash.timer = duration;
    dash.cooldown = cooldown;
    dash.dir = dir;
    dash.rammed.clear();

    if let Some(well) = well {
        state.gravity_wells.push(well);
    }
    state.emit(GameEvent::Sound(SoundEffect::Dash));
    true
}

/// Count the nova cooldown down, reporting it while it runs
pub fn update_nova_cooldown(state: &mut GameState, dt: f32) {
    if state.player.nova_cooldown > 0.0 {
        state.player.nova_cooldown = (state.player.nova_cooldown - dt).max(0.0);
        state.emit(GameEvent::AbilityCooldownChanged {
            current: state.player.nova_cooldown,
            max: state.tuning.nova_cooldown,
        });
    }
}

/// Area burst around the player
///
/// Clears enemy bullets in range, damages and throws back enemies in range.
pub fn try_nova(state: &mut GameState) -> bool {
    if state.player.nova_cooldown > 0.0 {
        return false;
    }
    let tuning = &state.tuning;
    let (radius, damage, knockback) = (tuning.nova_radius, tuning.nova_damage, tuning.nova_knockback);
    let (cooldown, freeze) = (tuning.nova_cooldown, tuning.hit_stop_nova);
    let center = state.player.pos;

    state.bullets.retain(|b| {
        b.owner != BulletOwner::Enemy || !circles_overlap(b.pos, b.radius, center, radius)
    });

    let in_range: Vec<usize> = state
        .enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| circles_overlap(e.pos, e.radius, center, radius))
        .map(|(idx, _)| idx)
        .collect();
    for idx in in_range {
        let enemy = &mut state.enemies[idx];
        let scale = if enemy.is_boss() { 0.2 } else { 1.0 };
        enemy.vel += contact_normal(center, enemy.pos) * knockback * scale;
        hit_enemy(state, idx, damage);
    }

    for i in 0..16 {
        let angle = i as f32 / 16.0 * TAU;
        state.spawn_particle(Particle {
            pos: center,
            vel: polar_to_cartesian(radius * 2.0, angle),
            color: 0x8a5cff,
            life: 0.4,
            size: 4.0,
        });
    }

    state.player.nova_cooldown = cooldown;
    state.hit_stop(freeze);
    state.emit(GameEvent::AbilityCooldownChanged {
        current: cooldown,
        max: cooldown,
    });
    state.emit(GameEvent::Sound(SoundEffect::Nova));
    true
}

/// Add experience, entering overdrive once the meter fills
pub fn gain_xp(state: &mut GameState, amount: u32) {
    let threshold = state.tuning.overdrive_threshold;
    state.player.xp = (state.player.xp + amount).min(threshold);
    if state.player.xp >= threshold && !state.player.in_overdrive() {
        activate_overdrive(state);
    } else {
        let xp = state.player.xp;
        state.emit_xp(xp);
    }
}

fn activate_overdrive(state: &mut GameState) {
    let threshold = state.tuning.overdrive_threshold;
    state.player.xp = 0;
    state.player.overdrive_timer = state.tuning.overdrive_duration;
    // Full bar at the moment of activation
    state.emit_xp(threshold);
    state.emit(GameEvent::Sound(SoundEffect::OverdriveStart));
    state.scheduled.schedule(0.15, GameEvent::Sound(SoundEffect::Dash));
    state.scheduled.schedule(0.3, GameEvent::Sound(SoundEffect::Dash));
    log::debug!("Overdrive engaged");
}

/// Tick overdrive: passive healing and expiry
pub fn update_overdrive(state: &mut GameState, dt: f32) {
    if !state.player.in_overdrive() {
        return;
    }
    state.player.overdrive_timer = (state.player.overdrive_timer - dt).max(0.0);
    let heal = state.tuning.overdrive_heal_rate * dt;
    if state.player.heal(heal) > 0.0 {
        state.emit_health();
    }
    if !state.player.in_overdrive() {
        // Meter filled again while overdrive was running
        if state.player.xp >= state.tuning.overdrive_threshold {
            activate_overdrive(state);
        } else {
            let xp = state.player.xp;
            state.emit_xp(xp);
        }
    }
}

/// Keep the orbital ring in sync with the stat bundle and spin it
pub fn update_orbitals(state: &mut GameState) {
    let count = state.player.stats.orbital_count as usize;
    if state.orbitals.len() != count {
        state.orbitals = (0..count)
            .map(|i| Orbital {
                offset: i as f32 / count as f32 * TAU,
                pos: state.player.pos,
            })
            .collect();
    }
    let spin = state.time * state.tuning.orbital_speed;
    let distance = state.tuning.orbital_distance;
    let center = state.player.pos;
    for orbital in state.orbitals.iter_mut() {
        orbital.pos = center + polar_to_cartesian(distance, spin + orbital.offset);
    }
}

/// Apply the effect of a collected pickup
pub fn collect_pickup(state: &mut GameState, kind: PickupKind) {
    match kind {
        PickupKind::Health => {
            let amount = state.tuning.health_pickup_amount;
            if state.player.heal(amount) > 0.0 {
                state.emit_health();
            }
            state.emit(GameEvent::Sound(SoundEffect::PickupHealth));
        }
        PickupKind::Experience { amount } => {
            gain_xp(state, amount);
            state.emit(GameEvent::Sound(SoundEffect::PickupXp));
        }
        PickupKind::Data => {
            state.emit(GameEvent::Sound(SoundEffect::PickupData));
            let next = state.locked_lore().next();
            match next {
                Some(id) => {
                    state.unlocked_lore.insert(id);
                    log::info!("Lore fragment {} unlocked", id);
                    state.phase = GamePhase::Paused(PauseReason::Lore(id));
                    state.emit(GameEvent::LoreUnlocked(id));
                }
                None => {
                    let bonus = state.tuning.data_score_bonus;
                    state.add_score(bonus);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::sim::state::{Enemy, EnemyKind};
    use crate::tuning::Tuning;

    fn state() -> GameState {
        let mut state = GameState::new(5, Tuning::default(), Catalog::default());
        state.phase = GamePhase::Playing;
        state
    }

    #[test]
    fn test_volley_fans_projectiles() {
        let mut state = state();
        state.player.stats.projectile_count = 3;
        fire_volley(&mut state);
        assert_eq!(state.bullets.len(), 3);
        let angles: Vec<f32> = state.bullets.iter().map(|b| crate::heading(b.vel)).collect();
        assert!((angles[0] + angles[2]).abs() < 1e-4);
        assert!(angles[1].abs() < 1e-6);
    }

    #[test]
    fn test_fire_respects_interval() {
        let mut state = state();
        let input = TickInput {
            fire: true,
            ..Default::default()
        };
        update_fire(&mut state, &input, 0.01);
        update_fire(&mut state, &input, 0.01);
        assert_eq!(state.bullets.len(), 1);
        update_fire(&mut state, &input, 0.2);
        assert_eq!(state.bullets.len(), 2);
    }

    #[test]
    fn test_overdrive_boosts_bullet_damage() {
        let mut state = state();
        let base = player_bullet_damage(&state);
        state.player.overdrive_timer = 1.0;
        assert_eq!(player_bullet_damage(&state), base * 1.5);
    }

    #[test]
    fn test_xp_threshold_triggers_overdrive() {
        let mut state = state();
        for _ in 0..9 {
            gain_xp(&mut state, 5);
        }
        assert!(!state.player.in_overdrive());
        assert_eq!(state.player.xp, 45);
        state.events.clear();

        gain_xp(&mut state, 5);
        assert!(state.player.in_overdrive());
        assert_eq!(state.player.xp, 0);
        assert_eq!(
            state.events[0],
            GameEvent::XpChanged { current: 50, max: 50, level: 0 }
        );
    }

    #[test]
    fn test_overdrive_heals_and_expires() {
        let mut state = state();
        state.player.hp = 50.0;
        state.player.overdrive_timer = 1.0;
        for _ in 0..6 {
            update_overdrive(&mut state, 0.25);
        }
        assert!(!state.player.in_overdrive());
        assert!((state.player.hp - 55.0).abs() < 1e-3);
        assert!(state.player.hp <= state.player.max_hp);
    }

    #[test]
    fn test_dash_cooldown_and_gravity_well() {
        let mut state = state();
        state.player.stats.has_gravity_dash = true;
        state.player.stats.dash_cooldown_mult = 0.5;
        assert!(try_dash(&mut state, &TickInput::default()));
        assert!(state.player.is_dashing());
        assert_eq!(state.player.dash.cooldown, 0.5);
        assert_eq!(state.gravity_wells.len(), 1);
        assert!(!try_dash(&mut state, &TickInput::default()));
    }

    #[test]
    fn test_nova_clears_bullets_and_pushes_enemies() {
        let mut state = state();
        let center = state.player.pos;
        let archetype = state.tuning.enemies.brute;
        state
            .enemies
            .push(Enemy::new(1, EnemyKind::Brute, center + Vec2::new(50.0, 0.0), &archetype));
        state
            .enemies
            .push(Enemy::new(2, EnemyKind::Brute, center + Vec2::new(500.0, 0.0), &archetype));
        state.bullets.push(Bullet {
            id: 3,
            pos: center + Vec2::new(0.0, 40.0),
            vel: Vec2::ZERO,
            radius: 5.0,
            life: 2.0,
            damage: 10.0,
            owner: BulletOwner::Enemy,
            color: 0,
            piercing: false,
            homing: false,
            hits: Vec::new(),
        });

        assert!(try_nova(&mut state));
        assert!(state.bullets.is_empty());
        assert!(state.enemies[0].vel.x > 0.0);
        assert_eq!(state.enemies[0].hp, archetype.hp - 30.0);
        assert_eq!(state.enemies[1].hp, archetype.hp);
        assert!(state.hit_stop > 0.0);
        assert!(!try_nova(&mut state));
    }

    #[test]
    fn test_orbitals_follow_stat_count() {
        let mut state = state();
        state.player.stats.orbital_count = 2;
        update_orbitals(&mut state);
        assert_eq!(state.orbitals.len(), 2);
        let d = state.orbitals[0].pos.distance(state.player.pos);
        assert!((d - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_data_pickup_unlocks_and_pauses() {
        let mut state = state();
        collect_pickup(&mut state, PickupKind::Data);
        assert!(state.unlocked_lore.contains(&1));
        assert_eq!(state.phase, GamePhase::Paused(PauseReason::Lore(1)));
        assert!(state.events.contains(&GameEvent::LoreUnlocked(1)));
    }

    #[test]
    fn test_data_pickup_with_everything_unlocked_scores() {
        let mut state = state();
        let ids: Vec<u32> = state.catalog.lore.iter().map(|f| f.id).collect();
        state.unlocked_lore.extend(ids);
        collect_pickup(&mut state, PickupKind::Data);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.score, 100);
    }
}
