//! Checkpoint and session persistence
//!
//! Two independent JSON records behind the storage port:
//! - Checkpoint: loop, score, stat bundle and unlocked lore
//! - Session progress: whether the intro has been shown
//!
//! A record that fails to parse is treated as absent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{CHECKPOINT_KEY, SESSION_KEY};
use crate::platform::Storage;
use crate::sim::{GameState, PlayerStats};

/// Failure reading or writing a persisted record
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("no record stored under {0}")]
    Missing(String),
    #[error("record under {key} is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Read and decode a record
pub fn load_record<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Result<T, PersistenceError> {
    let json = storage
        .get(key)
        .ok_or_else(|| PersistenceError::Missing(key.to_string()))?;
    serde_json::from_str(&json).map_err(|source| PersistenceError::Malformed {
        key: key.to_string(),
        source,
    })
}

/// Encode and write a record
pub fn save_record<T: Serialize>(storage: &mut dyn Storage, key: &str, value: &T) -> Result<(), PersistenceError> {
    let json = serde_json::to_string(value)?;
    storage.set(key, &json);
    Ok(())
}

fn default_max_hp() -> f32 {
    100.0
}

/// Snapshot of run progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointData {
    pub loop_count: u32,
    pub score: u64,
    pub stats: PlayerStats,
    #[serde(default = "default_max_hp")]
    pub max_hp: f32,
    pub unlocked_lore: Vec<u32>,
}

impl CheckpointData {
    /// Capture the persistent parts of a run
    pub fn capture(state: &GameState) -> Self {
        Self {
            loop_count: state.loop_count,
            score: state.score,
            stats: state.player.stats,
            max_hp: state.player.max_hp,
            unlocked_lore: state.unlocked_lore.iter().copied().collect(),
        }
    }

    /// Write the snapshot back onto a freshly reset state
    ///
    /// Health is restored to full and the difficulty multiplier is derived
    /// from the loop number.
    pub fn restore(&self, state: &mut GameState) {
        state.loop_count = self.loop_count.max(1);
        state.score = self.score;
        state.difficulty = state.tuning.difficulty_for_loop(state.loop_count);
        state.player.stats = self.stats;
        state.player.max_hp = self.max_hp.max(1.0);
        state.player.hp = state.player.max_hp;
        state.unlocked_lore = self.unlocked_lore.iter().copied().collect();
    }

    pub fn save(&self, storage: &mut dyn Storage) -> Result<(), PersistenceError> {
        save_record(storage, CHECKPOINT_KEY, self)?;
        log::info!(
            "Checkpoint saved (loop {}, score {})",
            self.loop_count,
            self.score
        );
        Ok(())
    }

    /// Load the stored checkpoint; missing or malformed means none
    pub fn load(storage: &dyn Storage) -> Option<Self> {
        match load_record::<Self>(storage, CHECKPOINT_KEY) {
            Ok(checkpoint) => {
                log::info!("Loaded checkpoint at loop {}", checkpoint.loop_count);
                Some(checkpoint)
            }
            Err(PersistenceError::Missing(_)) => None,
            Err(err) => {
                log::warn!("Ignoring checkpoint: {}", err);
                None
            }
        }
    }

    pub fn exists(storage: &dyn Storage) -> bool {
        storage.get(CHECKPOINT_KEY).is_some()
    }
}

/// Per-profile session flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub has_seen_intro: bool,
}

impl SessionProgress {
    pub fn load(storage: &dyn Storage) -> Self {
        match load_record(storage, SESSION_KEY) {
            Ok(progress) => progress,
            Err(PersistenceError::Missing(_)) => Self::default(),
            Err(err) => {
                log::warn!("Ignoring session record: {}", err);
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &mut dyn Storage) -> Result<(), PersistenceError> {
        save_record(storage, SESSION_KEY, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::platform::MemoryStorage;
    use crate::tuning::Tuning;

    fn state() -> GameState {
        GameState::new(1, Tuning::default(), Catalog::default())
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let mut storage = MemoryStorage::new();
        let mut source = state();
        source.loop_count = 7;
        source.score = 4200;
        source.player.stats.damage_mult = 2.0;
        source.player.stats.homing = true;
        source.player.max_hp = 50.0;
        source.unlocked_lore.extend([1, 3]);

        CheckpointData::capture(&source).save(&mut storage).unwrap();
        let loaded = CheckpointData::load(&storage).unwrap();

        let mut target = state();
        loaded.restore(&mut target);
        assert_eq!(target.loop_count, 7);
        assert_eq!(target.score, 4200);
        assert_eq!(target.player.stats, source.player.stats);
        assert_eq!(target.player.max_hp, 50.0);
        assert_eq!(target.player.hp, 50.0);
        assert_eq!(target.unlocked_lore, source.unlocked_lore);
        assert!((target.difficulty - 1.6).abs() < 1e-5);
    }

    #[test]
    fn test_missing_checkpoint_is_none() {
        let storage = MemoryStorage::new();
        assert!(CheckpointData::load(&storage).is_none());
        assert!(matches!(
            load_record::<CheckpointData>(&storage, CHECKPOINT_KEY),
            Err(PersistenceError::Missing(_))
        ));
    }

    #[test]
    fn test_malformed_checkpoint_is_none() {
        let mut storage = MemoryStorage::new();
        storage.set(CHECKPOINT_KEY, "{\"loop_count\": 3, \"score\":");
        assert!(CheckpointData::load(&storage).is_none());
        assert!(matches!(
            load_record::<CheckpointData>(&storage, CHECKPOINT_KEY),
            Err(PersistenceError::Malformed { .. })
        ));
    }

    #[test]
    fn test_old_checkpoint_without_max_hp() {
        let mut storage = MemoryStorage::new();
        let stats = serde_json::to_string(&PlayerStats::default()).unwrap();
        let json = format!(
            "{{\"loop_count\":2,\"score\":10,\"stats\":{},\"unlocked_lore\":[]}}",
            stats
        );
        storage.set(CHECKPOINT_KEY, &json);
        let loaded = CheckpointData::load(&storage).unwrap();
        assert_eq!(loaded.max_hp, 100.0);
    }

    #[test]
    fn test_session_progress_defaults() {
        let mut storage = MemoryStorage::new();
        assert!(!SessionProgress::load(&storage).has_seen_intro);
        storage.set(SESSION_KEY, "garbage");
        assert!(!SessionProgress::load(&storage).has_seen_intro);
        SessionProgress {
            has_seen_intro: true,
        }
        .save(&mut storage)
        .unwrap();
        assert!(SessionProgress::load(&storage).has_seen_intro);
    }
}
