//! Data-driven game balance
//!
//! Every balance constant lives here so a run can be retuned from a JSON
//! file without recompiling. Missing fields fall back to the shipped values.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::state::EnemyKind;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("tuning file is not valid: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Per-archetype enemy stats
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyArchetype {
    pub hp: f32,
    pub radius: f32,
    pub accel: f32,
    pub max_speed: f32,
    pub score: u64,
    /// Experience carried by the shard it drops
    pub xp: u32,
}

/// Enemy archetype table, one row per kind including the boss
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTable {
    pub drone: EnemyArchetype,
    pub swarmer: EnemyArchetype,
    pub brute: EnemyArchetype,
    pub lancer: EnemyArchetype,
    pub sentry: EnemyArchetype,
    pub boss: EnemyArchetype,
}

impl Default for EnemyTable {
    fn default() -> Self {
        Self {
            drone: EnemyArchetype { hp: 30.0, radius: 14.0, accel: 500.0, max_speed: 120.0, score: 10, xp: 5 },
            swarmer: EnemyArchetype { hp: 15.0, radius: 10.0, accel: 900.0, max_speed: 210.0, score: 15, xp: 5 },
            brute: EnemyArchetype { hp: 140.0, radius: 24.0, accel: 250.0, max_speed: 60.0, score: 40, xp: 15 },
            lancer: EnemyArchetype { hp: 40.0, radius: 13.0, accel: 400.0, max_speed: 110.0, score: 25, xp: 10 },
            sentry: EnemyArchetype { hp: 35.0, radius: 15.0, accel: 300.0, max_speed: 80.0, score: 30, xp: 10 },
            boss: EnemyArchetype { hp: 800.0, radius: 48.0, accel: 260.0, max_speed: 140.0, score: 500, xp: 0 },
        }
    }
}

impl EnemyTable {
    pub fn get(&self, kind: EnemyKind) -> &EnemyArchetype {
        match kind {
            EnemyKind::Drone => &self.drone,
            EnemyKind::Swarmer => &self.swarmer,
            EnemyKind::Brute => &self.brute,
            EnemyKind::Lancer => &self.lancer,
            EnemyKind::Sentry => &self.sentry,
            EnemyKind::Boss => &self.boss,
        }
    }
}

/// Game balance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Arena / frame driver ===
    pub arena_width: f32,
    pub arena_height: f32,
    /// Upper bound on wall-clock seconds simulated per frame
    pub max_frame_dt: f32,

    // === Player kinematics ===
    pub player_radius: f32,
    pub player_max_hp: f32,
    pub player_accel: f32,
    pub player_max_speed: f32,
    /// Velocity retained per 1/60 s with no input held
    pub player_friction: f32,

    // === Dash ===
    pub dash_speed: f32,
    pub dash_duration: f32,
    pub dash_cooldown: f32,
    pub ram_damage: f32,
    pub ram_damage_boss: f32,

    // === Primary fire ===
    pub fire_interval: f32,
    pub bullet_speed: f32,
    pub bullet_radius: f32,
    pub bullet_lifetime: f32,
    pub bullet_damage: f32,
    /// Angle between adjacent projectiles of a multi-shot volley (radians)
    pub spread_angle: f32,
    pub homing_radius: f32,
    /// Maximum homing turn rate (radians/s)
    pub homing_turn_rate: f32,

    // === Contact ===
    pub contact_damage: f32,
    pub contact_damage_boss: f32,
    pub contact_knockback: f32,

    // === Nova ===
    pub nova_radius: f32,
    pub nova_damage: f32,
    pub nova_knockback: f32,
    pub nova_cooldown: f32,

    // === Overdrive ===
    pub overdrive_threshold: u32,
    pub overdrive_duration: f32,
    pub overdrive_damage_mult: f32,
    pub overdrive_speed_mult: f32,
    pub overdrive_fire_rate_mult: f32,
    /// Passive healing per second while overdrive is active
    pub overdrive_heal_rate: f32,
    /// Multiplier on incoming damage while overdrive is active
    pub overdrive_damage_taken: f32,

    // === Orbitals / gravity wells ===
    pub orbital_distance: f32,
    pub orbital_radius: f32,
    pub orbital_speed: f32,
    pub orbital_dps: f32,
    pub gravity_well_radius: f32,
    pub gravity_well_life: f32,
    pub gravity_well_pull: f32,

    // === Enemies ===
    pub enemies: EnemyTable,
    pub enemy_bullet_speed: f32,
    pub enemy_bullet_radius: f32,
    pub enemy_bullet_damage: f32,
    pub enemy_bullet_lifetime: f32,
    pub lancer_windup: f32,
    pub lancer_dash_time: f32,
    pub lancer_dash_speed: f32,
    pub lancer_cooldown: f32,
    pub lancer_range: f32,
    pub sentry_range: f32,
    pub sentry_fire_interval: f32,

    // === Spawner ===
    pub spawn_interval: f32,
    pub min_spawn_interval: f32,
    /// Spawn-rate growth per completed loop
    pub spawn_loop_scaling: f32,
    /// Distance outside the arena edge where enemies appear
    pub spawn_margin: f32,
    pub difficulty_step: f32,

    // === Boss ===
    pub boss_interval: u32,
    pub boss_hp_per_loop: f32,
    pub boss_attack_cooldown: f32,
    pub boss_ring_bullets: u32,
    pub boss_burst_bullets: u32,
    pub boss_summon_count: u32,
    pub boss_seek_distance: f32,
    /// Velocity retained per 1/60 s (keeps boss acceleration bounded)
    pub boss_damping: f32,

    // === Loop ===
    pub loop_duration: f32,
    pub danger_threshold: f32,
    pub overtime_chip_damage: f32,
    pub overtime_chip_interval: f32,
    /// Lowest value the overtime clock is allowed to reach
    pub overtime_floor: f32,
    /// Fraction of max hp restored on every loop transition
    pub loop_heal_fraction: f32,
    pub upgrade_choices: usize,
    pub rarity_weighted_draw: bool,

    // === Pickups ===
    pub pickup_radius: f32,
    pub magnet_range: f32,
    pub magnet_speed: f32,
    pub xp_drop_chance: f32,
    pub health_drop_chance: f32,
    pub data_drop_chance: f32,
    pub health_pickup_amount: f32,
    pub data_score_bonus: u64,

    // === Hit-stop (seconds of frozen simulation) ===
    pub hit_stop_kill: f32,
    pub hit_stop_nova: f32,
    pub hit_stop_damage: f32,

    // === Cosmetic ===
    pub damage_number_life: f32,
    pub particle_life: f32,
    pub dash_ghost_life: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            arena_width: 1200.0,
            arena_height: 800.0,
            max_frame_dt: 0.1,

            player_radius: 12.0,
            player_max_hp: 100.0,
            player_accel: 2400.0,
            player_max_speed: 260.0,
            player_friction: 0.85,

            dash_speed: 900.0,
            dash_duration: 0.15,
            dash_cooldown: 1.0,
            ram_damage: 40.0,
            ram_damage_boss: 10.0,

            fire_interval: 0.18,
            bullet_speed: 700.0,
            bullet_radius: 4.0,
            bullet_lifetime: 1.2,
            bullet_damage: 10.0,
            spread_angle: 0.15,
            homing_radius: 300.0,
            homing_turn_rate: 6.0,

            contact_damage: 10.0,
            contact_damage_boss: 20.0,
            contact_knockback: 400.0,

            nova_radius: 180.0,
            nova_damage: 30.0,
            nova_knockback: 600.0,
            nova_cooldown: 6.0,

            overdrive_threshold: 50,
            overdrive_duration: 8.0,
            overdrive_damage_mult: 1.5,
            overdrive_speed_mult: 1.4,
            overdrive_fire_rate_mult: 1.5,
            overdrive_heal_rate: 5.0,
            overdrive_damage_taken: 0.5,

            orbital_distance: 60.0,
            orbital_radius: 8.0,
            orbital_speed: 3.0,
            orbital_dps: 40.0,
            gravity_well_radius: 160.0,
            gravity_well_life: 2.0,
            gravity_well_pull: 300.0,

            enemies: EnemyTable::default(),
            enemy_bullet_speed: 300.0,
            enemy_bullet_radius: 5.0,
            enemy_bullet_damage: 10.0,
            enemy_bullet_lifetime: 4.0,
            lancer_windup: 0.6,
            lancer_dash_time: 0.5,
            lancer_dash_speed: 520.0,
            lancer_cooldown: 2.5,
            lancer_range: 260.0,
            sentry_range: 350.0,
            sentry_fire_interval: 2.0,

            spawn_interval: 1.6,
            min_spawn_interval: 0.25,
            spawn_loop_scaling: 0.25,
            spawn_margin: 30.0,
            difficulty_step: 0.1,

            boss_interval: 5,
            boss_hp_per_loop: 0.5,
            boss_attack_cooldown: 2.5,
            boss_ring_bullets: 16,
            boss_burst_bullets: 5,
            boss_summon_count: 3,
            boss_seek_distance: 250.0,
            boss_damping: 0.9,

            loop_duration: 30.0,
            danger_threshold: 5.0,
            overtime_chip_damage: 5.0,
            overtime_chip_interval: 1.0,
            overtime_floor: -999.0,
            loop_heal_fraction: 0.5,
            upgrade_choices: 3,
            rarity_weighted_draw: false,

            pickup_radius: 8.0,
            magnet_range: 120.0,
            magnet_speed: 400.0,
            xp_drop_chance: 0.6,
            health_drop_chance: 0.05,
            data_drop_chance: 0.03,
            health_pickup_amount: 15.0,
            data_score_bonus: 100,

            hit_stop_kill: 0.03,
            hit_stop_nova: 0.08,
            hit_stop_damage: 0.05,

            damage_number_life: 0.6,
            particle_life: 0.5,
            dash_ghost_life: 0.2,
        }
    }
}

impl Tuning {
    /// Parse a tuning override; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a tuning file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Boss hp for a given loop: `base × (1 + loop × per_loop)`
    pub fn boss_hp(&self, loop_count: u32) -> f32 {
        self.enemies.boss.hp * (1.0 + loop_count as f32 * self.boss_hp_per_loop)
    }

    /// Whether the given loop is a boss loop
    pub fn is_boss_loop(&self, loop_count: u32) -> bool {
        self.boss_interval > 0 && loop_count > 0 && loop_count % self.boss_interval == 0
    }

    /// Difficulty multiplier a run has accumulated on reaching `loop_count`
    pub fn difficulty_for_loop(&self, loop_count: u32) -> f32 {
        1.0 + loop_count.saturating_sub(1) as f32 * self.difficulty_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "loop_duration": 12.5, "boss_interval": 3 }"#).unwrap();
        assert_eq!(tuning.loop_duration, 12.5);
        assert_eq!(tuning.boss_interval, 3);
        assert_eq!(tuning.overdrive_threshold, 50);
        assert_eq!(tuning.enemies.drone.hp, 30.0);
    }

    #[test]
    fn test_malformed_override_is_error() {
        assert!(matches!(
            Tuning::from_json("{ not json"),
            Err(TuningError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Tuning::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, TuningError::Io { .. }));
    }

    #[test]
    fn test_enemy_table_covers_boss_row() {
        let tuning = Tuning::from_json(r#"{ "enemies": { "boss": { "hp": 1200.0, "radius": 50.0, "accel": 200.0, "max_speed": 100.0, "score": 900, "xp": 0 } } }"#).unwrap();
        assert_eq!(tuning.enemies.get(EnemyKind::Boss).hp, 1200.0);
        assert_eq!(tuning.enemies.get(EnemyKind::Boss).score, 900);
        assert_eq!(tuning.enemies.get(EnemyKind::Drone).hp, 30.0);
    }

    #[test]
    fn test_boss_cadence_and_hp() {
        let tuning = Tuning::default();
        assert!(!tuning.is_boss_loop(4));
        assert!(tuning.is_boss_loop(5));
        assert!(tuning.is_boss_loop(10));
        assert_eq!(tuning.boss_hp(5), 800.0 * 3.5);
    }

    #[test]
    fn test_difficulty_grows_per_loop() {
        let tuning = Tuning::default();
        assert_eq!(tuning.difficulty_for_loop(1), 1.0);
        assert!((tuning.difficulty_for_loop(4) - 1.3).abs() < 1e-6);
    }
}
