//! Game state and core simulation types
//!
//! Plain data records for every entity category plus the `GameState` that
//! owns them. All behaviour lives in the sibling systems.

use std::collections::{BTreeSet, HashSet};

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::events::{DelayQueue, GameEvent};
use crate::catalog::{Catalog, StoryBeatId};
use crate::tuning::{EnemyArchetype, Tuning};

/// Why the simulation is paused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// Player asked for it
    User,
    /// A lore fragment is on screen
    Lore(u32),
}

/// Meta state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Menu,
    Playing,
    Paused(PauseReason),
    /// Waiting for an upgrade choice
    LevelUp,
    GameOver,
    /// Dialogue on screen; `resume_to` is entered on dismissal
    Cutscene {
        beat: StoryBeatId,
        resume_to: ResumeTarget,
    },
}

/// Where a cutscene hands control back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeTarget {
    Playing,
    LevelUp,
}

/// Stat bundle mutated only by upgrades
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub speed_mult: f32,
    pub damage_mult: f32,
    pub fire_rate_mult: f32,
    pub projectile_count: u32,
    pub piercing: bool,
    pub dash_cooldown_mult: f32,
    pub homing: bool,
    pub orbital_count: u32,
    pub lifesteal_chance: f32,
    pub has_gravity_dash: bool,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            speed_mult: 1.0,
            damage_mult: 1.0,
            fire_rate_mult: 1.0,
            projectile_count: 1,
            piercing: false,
            dash_cooldown_mult: 1.0,
            homing: false,
            orbital_count: 0,
            lifesteal_chance: 0.0,
            has_gravity_dash: false,
        }
    }
}

/// Dash state
#[derive(Debug, Clone, Default)]
pub struct Dash {
    pub active: bool,
    /// Time left in the current dash
    pub timer: f32,
    /// Time until the next dash may start
    pub cooldown: f32,
    pub dir: Vec2,
    /// Enemies already rammed by the current dash
    pub rammed: Vec<u32>,
}

/// The player unit
#[derive(Debug, Clone)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub xp: u32,
    /// Seconds of overdrive left (0 = inactive)
    pub overdrive_timer: f32,
    /// Facing angle toward the pointer (radians)
    pub facing: f32,
    pub dash: Dash,
    pub nova_cooldown: f32,
    pub fire_timer: f32,
    pub stats: PlayerStats,
}

impl Player {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            pos: Vec2::new(tuning.arena_width / 2.0, tuning.arena_height / 2.0),
            vel: Vec2::ZERO,
            radius: tuning.player_radius,
            hp: tuning.player_max_hp,
            max_hp: tuning.player_max_hp,
            xp: 0,
            overdrive_timer: 0.0,
            facing: 0.0,
            dash: Dash::default(),
            nova_cooldown: 0.0,
            fire_timer: 0.0,
            stats: PlayerStats::default(),
        }
    }

    pub fn is_dashing(&self) -> bool {
        self.dash.active
    }

    pub fn in_overdrive(&self) -> bool {
        self.overdrive_timer > 0.0
    }

    /// Subtract hp, clamped at zero; returns the hp actually lost
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        let before = self.hp;
        self.hp = (self.hp - amount.max(0.0)).clamp(0.0, self.max_hp);
        before - self.hp
    }

    /// Add hp, clamped at max; returns the hp actually gained
    pub fn heal(&mut self, amount: f32) -> f32 {
        let before = self.hp;
        self.hp = (self.hp + amount.max(0.0)).clamp(0.0, self.max_hp);
        self.hp - before
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }
}

/// Who fired a bullet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulletOwner {
    Player,
    Enemy,
}

/// A projectile
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Seconds until expiry
    pub life: f32,
    pub damage: f32,
    pub owner: BulletOwner,
    /// 0xRRGGBB
    pub color: u32,
    pub piercing: bool,
    pub homing: bool,
    /// Enemies already hit (piercing bullets hit each enemy once)
    pub hits: Vec<u32>,
}

pub const PLAYER_BULLET_COLOR: u32 = 0x00e5ff;
pub const OVERDRIVE_BULLET_COLOR: u32 = 0xffd400;
pub const ENEMY_BULLET_COLOR: u32 = 0xff3860;

/// Enemy archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyKind {
    /// Basic melee chaser
    Drone,
    /// Fast, fragile chaser
    Swarmer,
    /// Slow, heavy chaser
    Brute,
    /// Winds up then charges in a straight line
    Lancer,
    /// Holds position and fires aimed shots
    Sentry,
    Boss,
}

/// Enemy behaviour state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnemyBehavior {
    Idle,
    Charging { timer: f32 },
    Dashing { timer: f32, dir: Vec2 },
}

/// An enemy entity
#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub behavior: EnemyBehavior,
    /// Seconds until the next attack may start
    pub attack_timer: f32,
    pub accel: f32,
    pub max_speed: f32,
}

impl Enemy {
    pub fn new(id: u32, kind: EnemyKind, pos: Vec2, archetype: &EnemyArchetype) -> Self {
        Self {
            id,
            kind,
            pos,
            vel: Vec2::ZERO,
            radius: archetype.radius,
            hp: archetype.hp,
            max_hp: archetype.hp,
            behavior: EnemyBehavior::Idle,
            attack_timer: 1.0,
            accel: archetype.accel,
            max_speed: archetype.max_speed,
        }
    }

    pub fn is_boss(&self) -> bool {
        self.kind == EnemyKind::Boss
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }
}

/// Pickup types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupKind {
    Health,
    Experience { amount: u32 },
    /// Unlocks the next lore fragment
    Data,
}

/// A pickup entity
#[derive(Debug, Clone)]
pub struct Pickup {
    pub id: u32,
    pub kind: PickupKind,
    pub pos: Vec2,
    pub radius: f32,
}

/// A particle for visual effects
#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub color: u32,
    pub life: f32,
    pub size: f32,
}

/// Floating damage readout
#[derive(Debug, Clone)]
pub struct DamageNumber {
    pub pos: Vec2,
    pub amount: f32,
    pub life: f32,
}

/// Afterimage left behind while dashing
#[derive(Debug, Clone)]
pub struct DashGhost {
    pub pos: Vec2,
    pub facing: f32,
    pub life: f32,
}

/// Blade circling the player
#[derive(Debug, Clone)]
pub struct Orbital {
    /// Angular offset around the player (radians)
    pub offset: f32,
    pub pos: Vec2,
}

/// Area that pulls enemies toward its centre
#[derive(Debug, Clone)]
pub struct GravityWell {
    pub pos: Vec2,
    pub radius: f32,
    pub life: f32,
    pub pull: f32,
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    pub tuning: Tuning,
    pub catalog: Catalog,
    pub rng: Pcg32,
    pub phase: GamePhase,

    // === Loop progression ===
    /// Current loop number (1-based)
    pub loop_count: u32,
    /// Seconds left in this loop (negative during boss overtime)
    pub loop_timer: f32,
    pub danger_fired: bool,
    pub boss_loop: bool,
    pub overtime_chip_timer: f32,
    /// Accumulated difficulty multiplier
    pub difficulty: f32,
    pub spawn_timer: f32,

    pub score: u64,
    /// Upgrades applied this run
    pub upgrades_taken: u32,
    /// Simulated seconds this run
    pub time: f32,
    /// Remaining simulation freeze (seconds of wall time)
    pub hit_stop: f32,

    // === Entities ===
    pub player: Player,
    pub bullets: Vec<Bullet>,
    pub enemies: Vec<Enemy>,
    pub pickups: Vec<Pickup>,
    pub particles: Vec<Particle>,
    pub damage_numbers: Vec<DamageNumber>,
    pub dash_ghosts: Vec<DashGhost>,
    pub orbitals: Vec<Orbital>,
    pub gravity_wells: Vec<GravityWell>,

    pub unlocked_lore: BTreeSet<u32>,
    /// Story beats already shown this session (survives restarts)
    pub seen_beats: HashSet<StoryBeatId>,
    /// Indices into `catalog.upgrades` offered on the upgrade screen
    pub upgrade_choices: Vec<usize>,
    pub max_particles: usize,

    /// Events produced since the last drain
    pub events: Vec<GameEvent>,
    /// Deferred one-shot events
    pub scheduled: DelayQueue<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// Create a new game state with the given seed
    pub fn new(seed: u64, tuning: Tuning, catalog: Catalog) -> Self {
        let player = Player::new(&tuning);
        Self {
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Menu,
            loop_count: 1,
            loop_timer: tuning.loop_duration,
            danger_fired: false,
            boss_loop: false,
            overtime_chip_timer: 0.0,
            difficulty: 1.0,
            spawn_timer: tuning.spawn_interval,
            score: 0,
            upgrades_taken: 0,
            time: 0.0,
            hit_stop: 0.0,
            player,
            bullets: Vec::new(),
            enemies: Vec::new(),
            pickups: Vec::new(),
            particles: Vec::new(),
            damage_numbers: Vec::new(),
            dash_ghosts: Vec::new(),
            orbitals: Vec::new(),
            gravity_wells: Vec::new(),
            unlocked_lore: BTreeSet::new(),
            seen_beats: HashSet::new(),
            upgrade_choices: Vec::new(),
            max_particles: 500,
            events: Vec::new(),
            scheduled: DelayQueue::new(),
            next_id: 1,
            tuning,
            catalog,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn boss_alive(&self) -> bool {
        self.enemies.iter().any(Enemy::is_boss)
    }

    /// Raise the hit-stop window to at least `duration`
    pub fn hit_stop(&mut self, duration: f32) {
        self.hit_stop = self.hit_stop.max(duration);
    }

    /// Ids of catalog lore not yet unlocked, in catalog order
    pub fn locked_lore(&self) -> impl Iterator<Item = u32> + '_ {
        self.catalog
            .lore
            .iter()
            .map(|f| f.id)
            .filter(|id| !self.unlocked_lore.contains(id))
    }

    /// Apply damage to the player and report it
    pub fn damage_player(&mut self, amount: f32) -> f32 {
        let amount = if self.player.in_overdrive() {
            amount * self.tuning.overdrive_damage_taken
        } else {
            amount
        };
        let lost = self.player.take_damage(amount);
        if lost > 0.0 {
            self.emit_health();
            self.emit(GameEvent::Sound(crate::audio::SoundEffect::PlayerHurt));
            self.hit_stop(self.tuning.hit_stop_damage);
        }
        lost
    }

    pub fn add_score(&mut self, amount: u64) {
        self.score += amount;
        self.emit(GameEvent::ScoreChanged(self.score));
    }

    pub fn emit_health(&mut self) {
        self.emit(GameEvent::HealthChanged {
            current: self.player.hp,
            max: self.player.max_hp,
        });
    }

    pub fn emit_xp(&mut self, current: u32) {
        self.emit(GameEvent::XpChanged {
            current,
            max: self.tuning.overdrive_threshold,
            level: self.upgrades_taken,
        });
    }

    pub fn emit_loop(&mut self) {
        self.emit(GameEvent::LoopChanged {
            loop_count: self.loop_count,
            time_remaining: self.loop_timer,
            max_time: self.tuning.loop_duration,
        });
    }

    /// Push a particle, respecting the quality cap
    pub fn spawn_particle(&mut self, particle: Particle) {
        if self.particles.len() < self.max_particles {
            self.particles.push(particle);
        }
    }

    /// Clear transient entities (loop transitions)
    pub fn clear_transients(&mut self) {
        self.bullets.clear();
        self.enemies.clear();
        self.pickups.clear();
        self.particles.clear();
        self.damage_numbers.clear();
        self.dash_ghosts.clear();
        self.gravity_wells.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameState {
        GameState::new(7, Tuning::default(), Catalog::default())
    }

    #[test]
    fn test_take_damage_clamps_at_zero() {
        let mut player = Player::new(&Tuning::default());
        assert_eq!(player.take_damage(30.0), 30.0);
        assert_eq!(player.hp, 70.0);
        assert_eq!(player.take_damage(80.0), 70.0);
        assert_eq!(player.hp, 0.0);
        assert!(player.is_dead());
    }

    #[test]
    fn test_heal_clamps_at_max() {
        let mut player = Player::new(&Tuning::default());
        player.hp = 90.0;
        assert_eq!(player.heal(25.0), 10.0);
        assert_eq!(player.hp, player.max_hp);
    }

    #[test]
    fn test_negative_amounts_ignored() {
        let mut player = Player::new(&Tuning::default());
        player.take_damage(-5.0);
        player.heal(-5.0);
        assert_eq!(player.hp, 100.0);
    }

    #[test]
    fn test_overdrive_reduces_damage_taken() {
        let mut state = state();
        state.player.overdrive_timer = 3.0;
        let lost = state.damage_player(20.0);
        assert_eq!(lost, 10.0);
        assert!(state.hit_stop > 0.0);
    }

    #[test]
    fn test_entity_ids_increase() {
        let mut state = state();
        let a = state.next_entity_id();
        let b = state.next_entity_id();
        assert!(b > a);
    }

    #[test]
    fn test_particle_cap() {
        let mut state = state();
        state.max_particles = 2;
        for _ in 0..5 {
            state.spawn_particle(Particle {
                pos: Vec2::ZERO,
                vel: Vec2::ZERO,
                color: 0,
                life: 1.0,
                size: 1.0,
            });
        }
        assert_eq!(state.particles.len(), 2);
    }

    #[test]
    fn test_locked_lore_follows_catalog_order() {
        let mut state = state();
        state.unlocked_lore.insert(1);
        assert_eq!(state.locked_lore().next(), Some(2));
    }
}
