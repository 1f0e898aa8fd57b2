//! Loop clock and progression transitions
//!
//! A loop counts down from `loop_duration`. Ordinary loops end in the
//! upgrade screen; boss loops only end when the boss dies, and the clock
//! runs into negative overtime with chip damage until then. Every transition
//! goes through `advance_loop`.

use glam::Vec2;

use super::events::GameEvent;
use super::spawner::{drop_pickup, spawn_boss, spawn_interval};
use super::state::{GamePhase, GameState, PickupKind, ResumeTarget};
use super::upgrades::{apply_upgrade, draw_choices};
use crate::audio::SoundEffect;
use crate::catalog::StoryBeatId;

/// Run the loop clock for one step
pub fn update_loop_clock(state: &mut GameState, dt: f32) {
    let before = state.loop_timer;
    state.loop_timer -= dt;

    if !state.danger_fired && state.loop_timer <= state.tuning.danger_threshold {
        state.danger_fired = true;
        state.emit(GameEvent::DangerWarning);
        state.emit(GameEvent::Sound(SoundEffect::DangerWarning));
    }

    if state.loop_timer > 0.0 {
        // Report once per displayed second
        if before.ceil() != state.loop_timer.ceil() {
            state.emit_loop();
        }
        return;
    }

    if state.boss_loop && state.boss_alive() {
        update_overtime(state, dt);
        if before.ceil() != state.loop_timer.ceil() {
            state.emit_loop();
        }
    } else if state.boss_loop {
        complete_boss_loop(state);
    } else {
        end_loop(state);
    }
}

/// Boss still standing after the clock ran out
fn update_overtime(state: &mut GameState, dt: f32) {
    let floor = state.tuning.overtime_floor;
    state.loop_timer = state.loop_timer.max(floor);
    state.overtime_chip_timer += dt;
    let interval = state.tuning.overtime_chip_interval.max(0.01);
    while state.overtime_chip_timer >= interval {
        state.overtime_chip_timer -= interval;
        let chip = state.tuning.overtime_chip_damage;
        state.damage_player(chip);
    }
}

/// Show a story beat unless it was already seen this session
///
/// Returns true if the cutscene phase was entered.
pub fn trigger_beat(state: &mut GameState, beat: StoryBeatId, resume_to: ResumeTarget) -> bool {
    if state.seen_beats.contains(&beat) || state.catalog.beat(beat).is_none() {
        return false;
    }
    state.seen_beats.insert(beat);
    log::info!("Story beat {:?}", beat);
    state.phase = GamePhase::Cutscene { beat, resume_to };
    state.emit(GameEvent::StoryTriggered(beat));
    true
}

/// Non-boss loop ran out: offer upgrades
fn end_loop(state: &mut GameState) {
    state.loop_timer = 0.0;
    log::info!("Loop {} complete", state.loop_count);
    state.emit(GameEvent::Sound(SoundEffect::LoopClear));
    if state.loop_count == 1 && trigger_beat(state, StoryBeatId::FirstLoopEnd, ResumeTarget::LevelUp) {
        return;
    }
    enter_level_up(state);
}

/// Draw upgrade choices and wait for the player to pick one
pub fn enter_level_up(state: &mut GameState) {
    let count = state.tuning.upgrade_choices;
    let weighted = state.tuning.rarity_weighted_draw;
    let stats = state.player.stats;
    let pool = state.catalog.upgrades;
    state.upgrade_choices = draw_choices(&mut state.rng, pool, &stats, count, weighted);
    state.phase = GamePhase::LevelUp;
    state.emit(GameEvent::LevelUp);
    state.emit(GameEvent::Sound(SoundEffect::LevelUp));
}

/// Apply the upgrade at `pool_index` and move on to the next loop
pub fn choose_upgrade(state: &mut GameState, pool_index: usize) {
    let Some(upgrade) = state.catalog.upgrades.get(pool_index).copied() else {
        return;
    };
    log::info!("Upgrade taken: {}", upgrade.name);
    apply_upgrade(&mut state.player, &upgrade.effect);
    state.upgrades_taken += 1;
    state.upgrade_choices.clear();
    state.phase = GamePhase::Playing;
    let xp = state.player.xp;
    state.emit_xp(xp);
    advance_loop(state);
}

/// Boss died: next loop without an upgrade, plus a reward drop
pub fn complete_boss_loop(state: &mut GameState) {
    log::info!("Boss loop {} cleared", state.loop_count);
    state.emit(GameEvent::Sound(SoundEffect::LoopClear));
    state
        .scheduled
        .schedule(0.25, GameEvent::Sound(SoundEffect::LevelUp));
    advance_loop(state);

    let center = Vec2::new(state.tuning.arena_width / 2.0, state.tuning.arena_height / 2.0);
    let lore_left = state.locked_lore().next().is_some();
    if lore_left {
        drop_pickup(state, PickupKind::Data, center + Vec2::new(-40.0, 0.0));
    }
    drop_pickup(state, PickupKind::Health, center + Vec2::new(40.0, 0.0));
}

/// Loop transition shared by upgrade selection and boss clears
///
/// Clears transient entities, restores part of the player's health and bumps
/// the loop counter and difficulty. Player stats and position carry over.
pub fn advance_loop(state: &mut GameState) {
    state.clear_transients();
    let heal = state.player.max_hp * state.tuning.loop_heal_fraction;
    state.player.heal(heal);
    state.emit_health();

    state.loop_count += 1;
    state.difficulty += state.tuning.difficulty_step;
    begin_loop(state);
}

/// Start the clock for the current loop, bringing in the boss on boss loops
pub fn begin_loop(state: &mut GameState) {
    state.loop_timer = state.tuning.loop_duration;
    state.danger_fired = false;
    state.overtime_chip_timer = 0.0;
    state.boss_loop = false;
    state.spawn_timer = spawn_interval(state);
    log::info!(
        "Loop {} begins (difficulty {:.2})",
        state.loop_count,
        state.difficulty
    );
    state.emit_loop();

    if state.tuning.is_boss_loop(state.loop_count) {
        state.boss_loop = true;
        spawn_boss(state);
        trigger_beat(state, StoryBeatId::BossApproach, ResumeTarget::Playing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::sim::state::{Enemy, EnemyKind, Particle};
    use crate::tuning::Tuning;

    fn playing() -> GameState {
        let mut state = GameState::new(17, Tuning::default(), Catalog::default());
        state.phase = GamePhase::Playing;
        state
    }

    fn count(state: &GameState, event: &GameEvent) -> usize {
        state.events.iter().filter(|e| *e == event).count()
    }

    #[test]
    fn test_danger_fires_once() {
        let mut state = playing();
        for _ in 0..(27 * 10) {
            update_loop_clock(&mut state, 0.1);
        }
        assert_eq!(count(&state, &GameEvent::DangerWarning), 1);
        assert!(state.danger_fired);
    }

    #[test]
    fn test_first_loop_end_shows_beat_then_level_up() {
        let mut state = playing();
        state.loop_timer = 0.05;
        update_loop_clock(&mut state, 0.1);
        assert_eq!(
            state.phase,
            GamePhase::Cutscene {
                beat: StoryBeatId::FirstLoopEnd,
                resume_to: ResumeTarget::LevelUp
            }
        );

        // Second session loop end goes straight to upgrades
        let mut state2 = playing();
        state2.seen_beats = state.seen_beats.clone();
        state2.loop_timer = 0.05;
        update_loop_clock(&mut state2, 0.1);
        assert_eq!(state2.phase, GamePhase::LevelUp);
        assert_eq!(state2.upgrade_choices.len(), 3);
        assert!(state2.events.contains(&GameEvent::LevelUp));
    }

    #[test]
    fn test_choose_upgrade_advances_once() {
        let mut state = playing();
        state.loop_count = 2;
        state.loop_timer = 0.01;
        update_loop_clock(&mut state, 0.1);
        assert_eq!(state.phase, GamePhase::LevelUp);
        let choice = state.upgrade_choices[0];
        choose_upgrade(&mut state, choice);
        assert_eq!(state.loop_count, 3);
        assert_eq!(state.upgrades_taken, 1);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.loop_timer, state.tuning.loop_duration);
        assert!(state.upgrade_choices.is_empty());
    }

    #[test]
    fn test_transition_clears_and_heals() {
        let mut state = playing();
        let archetype = state.tuning.enemies.drone;
        state.enemies.push(Enemy::new(1, EnemyKind::Drone, Vec2::ZERO, &archetype));
        state.spawn_particle(Particle {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            color: 0,
            life: 1.0,
            size: 1.0,
        });
        state.player.stats.damage_mult = 1.5;
        state.player.hp = 20.0;
        let pos = state.player.pos;

        advance_loop(&mut state);
        assert!(state.enemies.is_empty());
        assert!(state.particles.is_empty());
        assert_eq!(state.player.hp, 70.0);
        assert_eq!(state.player.stats.damage_mult, 1.5);
        assert_eq!(state.player.pos, pos);
        assert!((state.difficulty - 1.1).abs() < 1e-6);

        state.player.hp = 90.0;
        advance_loop(&mut state);
        assert_eq!(state.player.hp, 100.0);
    }

    #[test]
    fn test_entering_boss_loop_spawns_boss() {
        let mut state = playing();
        state.loop_count = 4;
        advance_loop(&mut state);
        assert!(state.boss_loop);
        assert_eq!(state.enemies.len(), 1);
        assert!(state.enemies[0].is_boss());
        assert!(matches!(
            state.phase,
            GamePhase::Cutscene {
                beat: StoryBeatId::BossApproach,
                ..
            }
        ));
    }

    #[test]
    fn test_overtime_chips_until_floor() {
        let mut state = playing();
        state.loop_count = 4;
        advance_loop(&mut state);
        state.phase = GamePhase::Playing;
        state.loop_timer = 0.0;
        let hp = state.player.hp;
        update_loop_clock(&mut state, 1.0);
        assert!(state.loop_timer < 0.0);
        assert_eq!(state.player.hp, hp - 5.0);
        assert_eq!(state.phase, GamePhase::Playing);

        state.loop_timer = -5000.0;
        update_loop_clock(&mut state, 0.1);
        assert_eq!(state.loop_timer, state.tuning.overtime_floor);
    }

    #[test]
    fn test_boss_clear_skips_upgrade_and_drops_rewards() {
        let mut state = playing();
        state.loop_count = 4;
        advance_loop(&mut state);
        state.phase = GamePhase::Playing;
        state.enemies.clear();
        complete_boss_loop(&mut state);
        assert_eq!(state.loop_count, 6);
        assert!(!state.boss_loop);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.pickups.len(), 2);
        assert!(state.pickups.iter().any(|p| p.kind == PickupKind::Data));
    }
}
