//! Input contract
//!
//! The host samples its key and pointer listeners into an `InputState`
//! once per frame. The engine never sees raw events.

use glam::Vec2;

use crate::sim::TickInput;

/// Digital keys the game reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub dash: bool,
    pub ability: bool,
    pub pause: bool,
}

impl KeyState {
    /// Update from a `KeyboardEvent.code`; returns false for unbound keys
    pub fn set_key(&mut self, code: &str, down: bool) -> bool {
        let slot = match code {
            "KeyW" | "ArrowUp" => &mut self.up,
            "KeyS" | "ArrowDown" => &mut self.down,
            "KeyA" | "ArrowLeft" => &mut self.left,
            "KeyD" | "ArrowRight" => &mut self.right,
            "Space" | "ShiftLeft" | "ShiftRight" => &mut self.dash,
            "KeyE" | "KeyQ" => &mut self.ability,
            "Escape" | "KeyP" => &mut self.pause,
            _ => return false,
        };
        *slot = down;
        true
    }

    /// Eight-way movement direction (not normalized)
    pub fn move_dir(&self) -> Vec2 {
        let x = (self.right as i32 - self.left as i32) as f32;
        // Screen coordinates: y grows downward
        let y = (self.down as i32 - self.up as i32) as f32;
        Vec2::new(x, y)
    }
}

/// Everything the engine samples for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    pub keys: KeyState,
    /// Pointer position in arena coordinates
    pub pointer: Vec2,
    /// Primary button held (fire)
    pub fire: bool,
    /// Secondary button held (nova)
    pub secondary: bool,
}

impl InputState {
    /// Map the sampled state onto simulation commands
    pub fn to_tick_input(&self) -> TickInput {
        TickInput {
            move_dir: self.keys.move_dir(),
            aim: self.pointer,
            fire: self.fire,
            dash: self.keys.dash,
            nova: self.keys.ability || self.secondary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        let mut keys = KeyState::default();
        assert!(keys.set_key("KeyW", true));
        assert!(keys.set_key("ArrowLeft", true));
        assert!(!keys.set_key("KeyZ", true));
        assert_eq!(keys.move_dir(), Vec2::new(-1.0, -1.0));
        keys.set_key("KeyW", false);
        assert_eq!(keys.move_dir(), Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let keys = KeyState {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(keys.move_dir(), Vec2::ZERO);
    }

    #[test]
    fn test_ability_from_key_or_button() {
        let mut input = InputState::default();
        assert!(!input.to_tick_input().nova);
        input.secondary = true;
        assert!(input.to_tick_input().nova);
        input.secondary = false;
        input.keys.ability = true;
        assert!(input.to_tick_input().nova);
    }
}
