//! Loopfall - a top-down time-loop arena survival game
//!
//! Core modules:
//! - `sim`: Simulation (physics, collisions, spawning, abilities, loop progression)
//! - `engine`: Facade owning the frame driver, meta state machine and callbacks
//! - `catalog`: Static lore, story and upgrade tables
//! - `persistence`: Checkpoint and session records over a storage port
//! - `platform`: Input contract and storage backends
//! - `tuning`: Data-driven game balance

pub mod audio;
pub mod catalog;
pub mod engine;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use catalog::Catalog;
pub use engine::{Engine, EngineCallbacks, EngineError, FinalStats, NoCallbacks};
pub use sim::GamePhase;
pub use platform::{InputState, KeyState, MemoryStorage, Storage};
pub use settings::{QualityPreset, Settings};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz for smooth physics)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 12;

    /// Storage keys
    pub const CHECKPOINT_KEY: &str = "loopfall_checkpoint";
    pub const SESSION_KEY: &str = "loopfall_session";
    pub const SETTINGS_KEY: &str = "loopfall_settings";
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Angle of a direction vector
#[inline]
pub fn heading(dir: Vec2) -> f32 {
    dir.y.atan2(dir.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    /// Same direction, whichever side of the ±π seam each lands on
    fn same_angle(a: f32, b: f32) -> bool {
        (a.cos() - b.cos()).abs() < 1e-5 && (a.sin() - b.sin()).abs() < 1e-5
    }

    #[test]
    fn test_normalize_angle_wraps() {
        for angle in [3.0 * PI, -3.0 * PI, 7.5 * PI, -2.5 * PI, PI, -PI, 0.25] {
            let wrapped = normalize_angle(angle);
            assert!((-PI..PI).contains(&wrapped), "{angle} -> {wrapped}");
            assert!(same_angle(wrapped, angle), "{angle} -> {wrapped}");
        }
        assert!((normalize_angle(-2.5 * PI) - (-0.5 * PI)).abs() < 1e-5);
        assert!((normalize_angle(0.25) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_polar_roundtrip_heading() {
        let v = polar_to_cartesian(10.0, 1.2);
        assert!((v.length() - 10.0).abs() < 1e-4);
        assert!((heading(v) - 1.2).abs() < 1e-5);
    }
}
