//! Sound output
//!
//! The simulation only names the sound it wants; a `SoundSink` decides what
//! to do with it. On the web the sink synthesizes tones with the Web Audio
//! API, everywhere else (and when no audio context can be created) sound is
//! silently dropped.

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Player fires a volley
    Shoot,
    /// Enemy fires
    EnemyShoot,
    /// Bullet lands on an enemy without killing it
    Hit,
    /// Enemy destroyed
    EnemyDeath,
    /// Player takes damage
    PlayerHurt,
    Dash,
    Nova,
    OverdriveStart,
    PickupXp,
    PickupHealth,
    PickupData,
    /// Upgrade screen opens
    LevelUp,
    /// Loop closed, next one begins
    LoopClear,
    BossSpawn,
    BossDeath,
    /// Boss death sequence follow-up blasts
    Explosion,
    DangerWarning,
    GameOver,
}

/// Fire-and-forget sound output
pub trait SoundSink {
    fn play(&mut self, effect: SoundEffect);
    /// Release any held audio resources; later `play` calls are ignored
    fn release(&mut self) {}
}

/// Sink that discards every sound
#[derive(Debug, Default)]
pub struct NullSink;

impl SoundSink for NullSink {
    fn play(&mut self, _effect: SoundEffect) {}
}

/// Sink that keeps a log of played sounds
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub played: Vec<SoundEffect>,
    pub released: bool,
}

impl SoundSink for RecordingSink {
    fn play(&mut self, effect: SoundEffect) {
        if !self.released {
            self.played.push(effect);
        }
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// Tone recipe: (frequency Hz, duration s, gain, start offset s)
type Tone = (f32, f64, f32, f64);

/// Tones for each effect, shared by every synthesizing sink
pub fn tones(effect: SoundEffect) -> &'static [Tone] {
    match effect {
        SoundEffect::Shoot => &[(880.0, 0.05, 0.15, 0.0)],
        SoundEffect::EnemyShoot => &[(330.0, 0.08, 0.15, 0.0)],
        SoundEffect::Hit => &[(300.0, 0.05, 0.2, 0.0)],
        SoundEffect::EnemyDeath => &[(220.0, 0.12, 0.3, 0.0), (110.0, 0.15, 0.2, 0.05)],
        SoundEffect::PlayerHurt => &[(150.0, 0.2, 0.5, 0.0)],
        SoundEffect::Dash => &[(600.0, 0.08, 0.2, 0.0), (900.0, 0.06, 0.15, 0.04)],
        SoundEffect::Nova => &[(120.0, 0.4, 0.6, 0.0), (60.0, 0.5, 0.4, 0.1)],
        SoundEffect::OverdriveStart => &[
            (400.0, 0.1, 0.3, 0.0),
            (600.0, 0.1, 0.3, 0.08),
            (900.0, 0.2, 0.3, 0.16),
        ],
        SoundEffect::PickupXp => &[(1000.0, 0.05, 0.15, 0.0)],
        SoundEffect::PickupHealth => &[(500.0, 0.1, 0.25, 0.0), (750.0, 0.1, 0.25, 0.08)],
        SoundEffect::PickupData => &[
            (1200.0, 0.08, 0.2, 0.0),
            (1800.0, 0.08, 0.2, 0.06),
            (2400.0, 0.12, 0.2, 0.12),
        ],
        SoundEffect::LevelUp => &[
            (500.0, 0.1, 0.3, 0.0),
            (600.0, 0.1, 0.3, 0.1),
            (800.0, 0.2, 0.3, 0.2),
        ],
        SoundEffect::LoopClear => &[(400.0, 0.15, 0.3, 0.0), (800.0, 0.25, 0.3, 0.12)],
        SoundEffect::BossSpawn => &[(80.0, 0.8, 0.6, 0.0), (95.0, 0.8, 0.4, 0.2)],
        SoundEffect::BossDeath => &[(200.0, 0.6, 0.6, 0.0)],
        SoundEffect::Explosion => &[(70.0, 0.3, 0.5, 0.0)],
        SoundEffect::DangerWarning => &[(700.0, 0.15, 0.3, 0.0), (700.0, 0.15, 0.3, 0.25)],
        SoundEffect::GameOver => &[
            (400.0, 0.2, 0.3, 0.0),
            (350.0, 0.2, 0.3, 0.2),
            (300.0, 0.2, 0.3, 0.4),
            (200.0, 0.4, 0.3, 0.6),
        ],
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudioSink;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, OscillatorType};

    use super::{SoundEffect, SoundSink, tones};

    /// Procedural tones through the Web Audio API
    pub struct WebAudioSink {
        ctx: Option<AudioContext>,
        volume: f32,
    }

    impl WebAudioSink {
        pub fn new(volume: f32) -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                volume: volume.clamp(0.0, 1.0),
            }
        }

        fn play_tone(ctx: &AudioContext, freq: f32, duration: f64, gain_level: f32, offset: f64) -> Option<()> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;
            osc.set_type(OscillatorType::Square);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            let t = ctx.current_time() + offset;
            gain.gain().set_value_at_time(gain_level, t).ok()?;
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + duration)
                .ok()?;
            osc.start_with_when(t).ok()?;
            osc.stop_with_when(t + duration + 0.05).ok()?;
            Some(())
        }
    }

    impl SoundSink for WebAudioSink {
        fn play(&mut self, effect: SoundEffect) {
            if self.volume <= 0.0 {
                return;
            }
            let Some(ctx) = &self.ctx else { return };

            // Browsers keep the context suspended until a user gesture
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            for &(freq, duration, gain, offset) in tones(effect) {
                let _ = Self::play_tone(ctx, freq, duration, gain * self.volume, offset);
            }
        }

        fn release(&mut self) {
            if let Some(ctx) = self.ctx.take() {
                let _ = ctx.close();
                log::info!("Audio context closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_ignores_after_release() {
        let mut sink = RecordingSink::default();
        sink.play(SoundEffect::Shoot);
        sink.release();
        sink.play(SoundEffect::Nova);
        assert_eq!(sink.played, vec![SoundEffect::Shoot]);
    }

    #[test]
    fn test_every_effect_has_tones() {
        for effect in [
            SoundEffect::Shoot,
            SoundEffect::Nova,
            SoundEffect::BossDeath,
            SoundEffect::GameOver,
        ] {
            assert!(!tones(effect).is_empty());
        }
    }
}
