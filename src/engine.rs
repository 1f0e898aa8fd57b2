//! Engine facade
//!
//! Owns the game state, the frame driver and the meta state machine. The
//! host feeds it wall-clock time, sampled input and user intents; the engine
//! reports changes back through `EngineCallbacks` and plays sounds through a
//! `SoundSink`. Checkpoints are written only between simulation steps.

use thiserror::Error;

use crate::audio::SoundSink;
use crate::catalog::{Catalog, LoreFragment, StoryBeat, StoryBeatId};
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::persistence::{CheckpointData, SessionProgress};
use crate::platform::{InputState, Storage};
use crate::settings::Settings;
use crate::sim::progression::{begin_loop, choose_upgrade, enter_level_up, trigger_beat};
use crate::sim::{GameEvent, GamePhase, GameState, PauseReason, ResumeTarget, Upgrade, tick};
use crate::tuning::Tuning;

/// Final numbers reported with game over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalStats {
    pub score: u64,
    pub loop_count: u32,
}

/// Presentation-layer hooks
///
/// Every method defaults to doing nothing so a host only implements what it
/// displays.
pub trait EngineCallbacks {
    fn on_health_changed(&mut self, _current: f32, _max: f32) {}
    fn on_score_changed(&mut self, _score: u64) {}
    fn on_loop_changed(&mut self, _loop_count: u32, _time_remaining: f32, _max_time: f32) {}
    fn on_xp_changed(&mut self, _current: u32, _max: u32, _level: u32) {}
    fn on_ability_cooldown_changed(&mut self, _current: f32, _max: f32) {}
    fn on_danger_warning(&mut self) {}
    fn on_game_over(&mut self, _stats: FinalStats) {}
    /// Upgrade selection opened; choices are on `Engine::upgrade_choices`
    fn on_level_up(&mut self) {}
    fn on_pause_toggled(&mut self, _paused: bool) {}
    fn on_lore_unlocked(&mut self, _fragment: &LoreFragment) {}
    fn on_story_triggered(&mut self, _beat: &StoryBeat) {}
}

/// Callbacks that ignore everything
#[derive(Debug, Default)]
pub struct NoCallbacks;

impl EngineCallbacks for NoCallbacks {}

/// Rejected intent
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("intent requires phase {expected:?} but engine is in {actual:?}")]
    WrongPhase { expected: GamePhase, actual: GamePhase },
    #[error("upgrade choice {index} out of range ({available} offered)")]
    InvalidChoice { index: usize, available: usize },
}

/// The game engine
pub struct Engine {
    state: GameState,
    seed: u64,
    runs: u64,
    storage: Box<dyn Storage>,
    sound: Box<dyn SoundSink>,
    callbacks: Box<dyn EngineCallbacks>,
    session: SessionProgress,
    accumulator: f32,
    pause_held: bool,
    teardown: Vec<Box<dyn FnOnce()>>,
    stopped: bool,
}

impl Engine {
    pub fn new(
        seed: u64,
        tuning: Tuning,
        catalog: Catalog,
        storage: Box<dyn Storage>,
        sound: Box<dyn SoundSink>,
        callbacks: Box<dyn EngineCallbacks>,
    ) -> Self {
        log::info!("Engine created with seed {}", seed);
        let state = GameState::new(seed, tuning, catalog);
        Self::with_state(state, seed, storage, sound, callbacks)
    }

    /// Wrap an existing simulation state (scripted setups, resumed sessions)
    ///
    /// `seed` seeds the runs started by later restarts.
    pub fn with_state(
        state: GameState,
        seed: u64,
        storage: Box<dyn Storage>,
        sound: Box<dyn SoundSink>,
        callbacks: Box<dyn EngineCallbacks>,
    ) -> Self {
        let session = SessionProgress::load(storage.as_ref());
        Self {
            state,
            seed,
            runs: 0,
            storage,
            sound,
            callbacks,
            session,
            accumulator: 0.0,
            pause_held: false,
            teardown: Vec::new(),
            stopped: false,
        }
    }

    /// Read-only view of the simulation
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    /// Upgrades on offer while in the level-up phase
    pub fn upgrade_choices(&self) -> Vec<&'static Upgrade> {
        let pool = self.state.catalog.upgrades;
        self.state
            .upgrade_choices
            .iter()
            .filter_map(|&i| pool.get(i))
            .collect()
    }

    pub fn has_checkpoint(&self) -> bool {
        CheckpointData::exists(self.storage.as_ref())
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.state.max_particles = settings.max_particles();
        self.state.particles.truncate(self.state.max_particles);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    // === Intents ===

    /// Leave the menu and begin a run
    pub fn start(&mut self) {
        if self.state.phase != GamePhase::Menu {
            log::debug!("start ignored in {:?}", self.state.phase);
            return;
        }
        log::info!("Run started");
        self.state.phase = GamePhase::Playing;
        self.emit_snapshot();

        if !self.session.has_seen_intro {
            self.session.has_seen_intro = true;
            if let Err(err) = self.session.save(self.storage.as_mut()) {
                log::warn!("Failed to save session progress: {}", err);
            }
            trigger_beat(&mut self.state, StoryBeatId::Intro, ResumeTarget::Playing);
        }
        // A new run replaces whatever an earlier run left behind
        self.write_checkpoint();
        self.reset_clock();
        self.dispatch();
    }

    pub fn pause(&mut self) {
        if self.state.phase != GamePhase::Playing {
            log::debug!("pause ignored in {:?}", self.state.phase);
            return;
        }
        self.state.phase = GamePhase::Paused(PauseReason::User);
        self.state.emit(GameEvent::PauseToggled(true));
        self.dispatch();
    }

    pub fn resume(&mut self) {
        if self.state.phase != GamePhase::Paused(PauseReason::User) {
            log::debug!("resume ignored in {:?}", self.state.phase);
            return;
        }
        self.state.phase = GamePhase::Playing;
        self.state.emit(GameEvent::PauseToggled(false));
        self.reset_clock();
        self.dispatch();
    }

    /// Pick one of the offered upgrades by its position in the offer
    pub fn select_upgrade(&mut self, choice: usize) -> Result<(), EngineError> {
        if self.state.phase != GamePhase::LevelUp {
            return Err(EngineError::WrongPhase {
                expected: GamePhase::LevelUp,
                actual: self.state.phase,
            });
        }
        let available = self.state.upgrade_choices.len();
        let pool_index = *self
            .state
            .upgrade_choices
            .get(choice)
            .ok_or(EngineError::InvalidChoice {
                index: choice,
                available,
            })?;

        choose_upgrade(&mut self.state, pool_index);
        self.write_checkpoint();
        self.reset_clock();
        self.dispatch();
        Ok(())
    }

    /// Throw the run away and start over from loop 1
    pub fn restart_fresh(&mut self) {
        if !self.can_restart() {
            log::debug!("restart ignored in {:?}", self.state.phase);
            return;
        }
        self.fresh_run();
    }

    /// Restart from the stored checkpoint, or fresh if there is none
    pub fn restart_from_checkpoint(&mut self) {
        if !self.can_restart() && self.state.phase != GamePhase::Menu {
            log::debug!("checkpoint restart ignored in {:?}", self.state.phase);
            return;
        }
        let Some(checkpoint) = CheckpointData::load(self.storage.as_ref()) else {
            log::warn!("No usable checkpoint, starting fresh");
            self.fresh_run();
            return;
        };

        self.reset_state();
        checkpoint.restore(&mut self.state);
        self.state.phase = GamePhase::Playing;
        begin_loop(&mut self.state);
        self.emit_snapshot();
        self.reset_clock();
        self.dispatch();
    }

    pub fn dismiss_lore(&mut self) {
        if !matches!(self.state.phase, GamePhase::Paused(PauseReason::Lore(_))) {
            log::debug!("dismiss_lore ignored in {:?}", self.state.phase);
            return;
        }
        self.state.phase = GamePhase::Playing;
        self.reset_clock();
        self.dispatch();
    }

    pub fn dismiss_cutscene(&mut self) {
        let GamePhase::Cutscene { resume_to, .. } = self.state.phase else {
            log::debug!("dismiss_cutscene ignored in {:?}", self.state.phase);
            return;
        };
        match resume_to {
            ResumeTarget::Playing => self.state.phase = GamePhase::Playing,
            ResumeTarget::LevelUp => enter_level_up(&mut self.state),
        }
        self.reset_clock();
        self.dispatch();
    }

    // === Frame driver ===

    /// Advance by `elapsed` seconds of wall time with this frame's input
    pub fn frame(&mut self, elapsed: f32, input: &InputState) {
        if self.stopped {
            return;
        }
        let dt = elapsed.clamp(0.0, self.state.tuning.max_frame_dt);

        // Pause key toggles on press only
        let pause_pressed = input.keys.pause && !self.pause_held;
        self.pause_held = input.keys.pause;
        if pause_pressed {
            match self.state.phase {
                GamePhase::Playing => self.pause(),
                GamePhase::Paused(PauseReason::User) => self.resume(),
                _ => {}
            }
        }

        if self.state.phase != GamePhase::Playing {
            self.accumulator = 0.0;
            return;
        }

        if self.state.hit_stop > 0.0 {
            self.state.hit_stop = (self.state.hit_stop - dt).max(0.0);
            return;
        }

        let tick_input = input.to_tick_input();
        self.accumulator += dt;
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let loop_before = self.state.loop_count;
            tick(&mut self.state, &tick_input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            if self.state.loop_count != loop_before && self.state.phase != GamePhase::GameOver {
                self.write_checkpoint();
            }
            if self.state.phase != GamePhase::Playing || self.state.hit_stop > 0.0 {
                self.accumulator = 0.0;
                break;
            }
        }
        if substeps == MAX_SUBSTEPS {
            // Drop whatever is left rather than spiral
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        self.dispatch();
    }

    // === Teardown ===

    /// Register a hook (listener removal) to run when the engine stops
    pub fn register_teardown(&mut self, hook: impl FnOnce() + 'static) {
        if self.stopped {
            hook();
            return;
        }
        self.teardown.push(Box::new(hook));
    }

    /// Run teardown hooks once, in reverse registration order, and release audio
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        while let Some(hook) = self.teardown.pop() {
            hook();
        }
        self.sound.release();
        log::info!("Engine stopped");
    }

    // === Internals ===

    fn can_restart(&self) -> bool {
        matches!(
            self.state.phase,
            GamePhase::GameOver | GamePhase::Paused(PauseReason::User)
        )
    }

    fn fresh_run(&mut self) {
        log::info!("Fresh restart");
        self.reset_state();
        self.state.phase = GamePhase::Playing;
        self.emit_snapshot();
        self.write_checkpoint();
        self.reset_clock();
        self.dispatch();
    }

    /// Fresh state for a new run; session-scoped story flags carry over
    fn reset_state(&mut self) {
        self.runs += 1;
        let tuning = self.state.tuning.clone();
        let catalog = self.state.catalog;
        let mut state = GameState::new(self.seed.wrapping_add(self.runs), tuning, catalog);
        state.seen_beats = std::mem::take(&mut self.state.seen_beats);
        state.max_particles = self.state.max_particles;
        self.state = state;
    }

    fn reset_clock(&mut self) {
        self.accumulator = 0.0;
    }

    fn write_checkpoint(&mut self) {
        let checkpoint = CheckpointData::capture(&self.state);
        if let Err(err) = checkpoint.save(self.storage.as_mut()) {
            log::warn!("Checkpoint not saved: {}", err);
        }
    }

    /// Queue the full HUD state so a fresh display starts in sync
    fn emit_snapshot(&mut self) {
        let state = &mut self.state;
        state.emit_health();
        state.emit(GameEvent::ScoreChanged(state.score));
        state.emit_loop();
        let xp = state.player.xp;
        state.emit_xp(xp);
        state.emit(GameEvent::AbilityCooldownChanged {
            current: state.player.nova_cooldown,
            max: state.tuning.nova_cooldown,
        });
    }

    /// Hand queued events to the callbacks and the sound sink
    fn dispatch(&mut self) {
        let catalog = self.state.catalog;
        for event in self.state.drain_events() {
            let cb = self.callbacks.as_mut();
            match event {
                GameEvent::HealthChanged { current, max } => cb.on_health_changed(current, max),
                GameEvent::ScoreChanged(score) => cb.on_score_changed(score),
                GameEvent::LoopChanged {
                    loop_count,
                    time_remaining,
                    max_time,
                } => cb.on_loop_changed(loop_count, time_remaining, max_time),
                GameEvent::XpChanged { current, max, level } => cb.on_xp_changed(current, max, level),
                GameEvent::AbilityCooldownChanged { current, max } => {
                    cb.on_ability_cooldown_changed(current, max)
                }
                GameEvent::DangerWarning => cb.on_danger_warning(),
                GameEvent::GameOver { score, loop_count } => {
                    cb.on_game_over(FinalStats { score, loop_count })
                }
                GameEvent::LevelUp => cb.on_level_up(),
                GameEvent::PauseToggled(paused) => cb.on_pause_toggled(paused),
                GameEvent::LoreUnlocked(id) => match catalog.lore_fragment(id) {
                    Some(fragment) => cb.on_lore_unlocked(fragment),
                    None => log::warn!("Unknown lore fragment {}", id),
                },
                GameEvent::StoryTriggered(id) => match catalog.beat(id) {
                    Some(beat) => cb.on_story_triggered(beat),
                    None => log::warn!("Unknown story beat {:?}", id),
                },
                GameEvent::Sound(effect) => self.sound.play(effect),
                GameEvent::EnemyKilled { kind, .. } => log::trace!("{:?} killed", kind),
                GameEvent::BossSpawned { .. } | GameEvent::BossDefeated => {}
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}
