//! Static lore, story and upgrade tables
//!
//! The tables are immutable. The engine only tracks which lore ids it has
//! unlocked; nothing here is ever mutated at runtime.

use serde::{Deserialize, Serialize};

use crate::sim::upgrades::{UPGRADE_POOL, Upgrade};

/// A collectible piece of narrative text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoreFragment {
    pub id: u32,
    pub title: &'static str,
    pub content: &'static str,
}

/// Fixed narrative points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoryBeatId {
    /// First run of a fresh profile
    Intro,
    /// End of the first loop of a session
    FirstLoopEnd,
    /// A boss loop begins
    BossApproach,
}

/// A scripted dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryBeat {
    pub id: StoryBeatId,
    pub speaker: &'static str,
    pub lines: &'static [&'static str],
}

pub static LORE: &[LoreFragment] = &[
    LoreFragment {
        id: 1,
        title: "Boot Log 0001",
        content: "Containment lattice online. Subject instance count: 1. Loop governor armed.",
    },
    LoreFragment {
        id: 2,
        title: "Maintenance Note",
        content: "The arena resets every thirty seconds. The subject does not. Nobody has asked why.",
    },
    LoreFragment {
        id: 3,
        title: "Warden Schematics",
        content: "Warden units are deployed only when the loop counter reaches a multiple of five.",
    },
    LoreFragment {
        id: 4,
        title: "Corrupted Memo",
        content: "Upgrades marked unstable were never meant to ship. They ship anyway.",
    },
    LoreFragment {
        id: 5,
        title: "Final Entry",
        content: "If you are reading this, the lattice is failing. Keep the loop turning.",
    },
];

pub static STORY_BEATS: &[StoryBeat] = &[
    StoryBeat {
        id: StoryBeatId::Intro,
        speaker: "SYSTEM",
        lines: &[
            "Instance awake.",
            "You are inside the loop. Survive until it closes.",
            "Every closure makes you stronger. It also makes them angrier.",
        ],
    },
    StoryBeat {
        id: StoryBeatId::FirstLoopEnd,
        speaker: "ECHO",
        lines: &[
            "You made it through one.",
            "The governor will offer you something. Take it.",
        ],
    },
    StoryBeat {
        id: StoryBeatId::BossApproach,
        speaker: "SYSTEM",
        lines: &[
            "Anomaly threshold exceeded.",
            "Deploying Warden. The loop will not close while it stands.",
        ],
    },
];

/// Tables handed to the engine at construction
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    pub lore: &'static [LoreFragment],
    pub beats: &'static [StoryBeat],
    pub upgrades: &'static [Upgrade],
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            lore: LORE,
            beats: STORY_BEATS,
            upgrades: UPGRADE_POOL,
        }
    }
}

impl Catalog {
    pub fn lore_fragment(&self, id: u32) -> Option<&'static LoreFragment> {
        self.lore.iter().find(|f| f.id == id)
    }

    pub fn beat(&self, id: StoryBeatId) -> Option<&'static StoryBeat> {
        self.beats.iter().find(|b| b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lore_ids_unique() {
        let ids: HashSet<u32> = LORE.iter().map(|f| f.id).collect();
        assert_eq!(ids.len(), LORE.len());
    }

    #[test]
    fn test_every_beat_present() {
        let catalog = Catalog::default();
        for id in [StoryBeatId::Intro, StoryBeatId::FirstLoopEnd, StoryBeatId::BossApproach] {
            let beat = catalog.beat(id).unwrap();
            assert!(!beat.lines.is_empty());
        }
    }

    #[test]
    fn test_lookup_unknown_fragment() {
        assert!(Catalog::default().lore_fragment(999).is_none());
        assert_eq!(Catalog::default().lore_fragment(3).unwrap().title, "Warden Schematics");
    }
}
