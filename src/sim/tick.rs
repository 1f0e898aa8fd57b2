//! Fixed timestep simulation tick
//!
//! Core game loop that advances one step of the arena.

use glam::Vec2;

use super::abilities::{
    collect_pickup, try_dash, try_nova, update_fire, update_nova_cooldown, update_orbitals,
    update_overdrive,
};
use super::ai::update_enemies;
use super::collision::{
    resolve_bullets_enemies, resolve_enemy_bullets_player, resolve_orbitals, resolve_pickups,
    resolve_player_enemies,
};
use super::events::GameEvent;
use super::physics::{move_bullets, move_enemies, move_player, update_ephemera, update_gravity_wells};
use super::progression::{complete_boss_loop, update_loop_clock};
use super::spawner::{reap_enemies, update_spawner};
use super::state::{GamePhase, GameState};
use crate::audio::SoundEffect;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Desired movement direction (any length, normalized internally)
    pub move_dir: Vec2,
    /// Pointer position in arena coordinates
    pub aim: Vec2,
    /// Primary fire held
    pub fire: bool,
    /// Dash requested
    pub dash: bool,
    /// Nova requested
    pub nova: bool,
}

/// Advance the game state by one fixed timestep
///
/// Does nothing outside the playing phase.
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if state.phase != GamePhase::Playing {
        return;
    }
    state.time += dt;

    for event in state.scheduled.advance(dt) {
        state.emit(event);
    }

    // === Abilities triggered this step ===
    if input.dash {
        try_dash(state, input);
    }
    if input.nova {
        try_nova(state);
    }

    // === Movement ===
    move_player(state, input, dt);
    update_fire(state, input, dt);
    update_overdrive(state, dt);
    update_nova_cooldown(state, dt);

    update_enemies(state, dt);
    update_gravity_wells(state, dt);
    move_enemies(state, dt);
    move_bullets(state, dt);
    update_orbitals(state);

    // === Collisions ===
    resolve_player_enemies(state);
    resolve_bullets_enemies(state);
    resolve_enemy_bullets_player(state);
    resolve_orbitals(state, dt);
    for kind in resolve_pickups(state, dt) {
        collect_pickup(state, kind);
    }

    update_spawner(state, dt);
    let boss_killed = reap_enemies(state);

    // Death wins over a boss clear landing on the same step
    if check_game_over(state) {
        return;
    }
    if boss_killed {
        complete_boss_loop(state);
    }

    // A lore pickup may have paused the run
    if state.phase == GamePhase::Playing {
        update_loop_clock(state, dt);
        if check_game_over(state) {
            return;
        }
    }

    update_ephemera(state, dt);
}

fn check_game_over(state: &mut GameState) -> bool {
    if !state.player.is_dead() {
        return false;
    }
    log::info!(
        "Game over on loop {} with score {}",
        state.loop_count,
        state.score
    );
    state.phase = GamePhase::GameOver;
    state.emit(GameEvent::GameOver {
        score: state.score,
        loop_count: state.loop_count,
    });
    state.emit(GameEvent::Sound(SoundEffect::GameOver));
    true
}
