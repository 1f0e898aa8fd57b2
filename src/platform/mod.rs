//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Input state sampled once per frame
//! - Storage (LocalStorage on web, in-memory elsewhere)

pub mod input;
pub mod storage;

pub use input::{InputState, KeyState};
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
pub use storage::{MemoryStorage, Storage};
