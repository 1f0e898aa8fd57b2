//! Arena simulation
//!
//! All gameplay logic lives here. This module stays free of platform code:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Outbound changes are recorded as events, never pushed to callbacks

pub mod abilities;
pub mod ai;
pub mod collision;
pub mod events;
pub mod physics;
pub mod progression;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod upgrades;

pub use events::{DelayQueue, GameEvent};
pub use state::{
    Bullet, BulletOwner, Enemy, EnemyBehavior, EnemyKind, GamePhase, GameState, PauseReason,
    Pickup, PickupKind, Player, PlayerStats, ResumeTarget,
};
pub use tick::{TickInput, tick};
pub use upgrades::{Rarity, UPGRADE_POOL, Upgrade, UpgradeEffect};
