//! Outbound simulation events and the scheduled one-shot event queue
//!
//! The tick never calls into the presentation layer directly. It records
//! what changed as `GameEvent`s, and the engine turns them into callbacks and
//! sound playback once the step is complete.

use glam::Vec2;

use super::state::EnemyKind;
use crate::audio::SoundEffect;
use crate::catalog::StoryBeatId;

/// Something the presentation layer may want to know about
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    HealthChanged { current: f32, max: f32 },
    ScoreChanged(u64),
    LoopChanged { loop_count: u32, time_remaining: f32, max_time: f32 },
    XpChanged { current: u32, max: u32, level: u32 },
    AbilityCooldownChanged { current: f32, max: f32 },
    DangerWarning,
    GameOver { score: u64, loop_count: u32 },
    /// Entered upgrade selection
    LevelUp,
    PauseToggled(bool),
    LoreUnlocked(u32),
    StoryTriggered(StoryBeatId),
    EnemyKilled { kind: EnemyKind, pos: Vec2 },
    BossSpawned { hp: f32 },
    BossDefeated,
    Sound(SoundEffect),
}

#[derive(Debug, Clone)]
struct Scheduled<T> {
    due: f32,
    seq: u64,
    item: T,
}

/// One-shot items released once their delay has elapsed
///
/// Items due at the same instant come out in the order they were scheduled.
#[derive(Debug, Clone)]
pub struct DelayQueue<T> {
    now: f32,
    seq: u64,
    pending: Vec<Scheduled<T>>,
}

impl<T> Default for DelayQueue<T> {
    fn default() -> Self {
        Self {
            now: 0.0,
            seq: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> DelayQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `item` to be released `delay` seconds from now
    pub fn schedule(&mut self, delay: f32, item: T) {
        let due = self.now + delay.max(0.0);
        let seq = self.seq;
        self.seq += 1;
        // Keep pending sorted by (due, seq)
        let idx = self
            .pending
            .partition_point(|s| s.due < due || (s.due == due && s.seq < seq));
        self.pending.insert(idx, Scheduled { due, seq, item });
    }

    /// Advance the queue clock and release everything that has come due
    pub fn advance(&mut self, dt: f32) -> Vec<T> {
        self.now += dt;
        let ready = self.pending.partition_point(|s| s.due <= self.now);
        self.pending.drain(..ready).map(|s| s.item).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_releases_in_due_order() {
        let mut queue = DelayQueue::new();
        queue.schedule(0.3, "c");
        queue.schedule(0.1, "a");
        queue.schedule(0.2, "b");

        assert!(queue.advance(0.05).is_empty());
        assert_eq!(queue.advance(0.1), vec!["a"]);
        assert_eq!(queue.advance(0.5), vec!["b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_same_due_time_keeps_schedule_order() {
        let mut queue = DelayQueue::new();
        queue.schedule(0.1, 1);
        queue.schedule(0.1, 2);
        queue.schedule(0.1, 3);
        assert_eq!(queue.advance(0.1), vec![1, 2, 3]);
    }

    #[test]
    fn test_delay_is_relative_to_queue_clock() {
        let mut queue = DelayQueue::new();
        let _ = queue.advance(5.0);
        queue.schedule(0.5, 'x');
        assert!(queue.advance(0.25).is_empty());
        assert_eq!(queue.advance(0.25), vec!['x']);
    }

    #[test]
    fn test_clear_drops_pending() {
        let mut queue = DelayQueue::new();
        queue.schedule(0.1, 1);
        queue.clear();
        assert_eq!(queue.len(), 0);
        assert!(queue.advance(1.0).is_empty());
    }
}
