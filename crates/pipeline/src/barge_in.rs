//! Barge-in detection
//!
//! While reply audio plays, each inbound frame's amplitude feeds a
//! fractional counter: loud frames add one, quiet frames decay it. The
//! interrupt fires when the counter reaches the trigger count. Frames in the
//! warm-up window after playback starts (mostly echo of our own audio) and
//! in the cooldown after an interrupt are ignored.

use std::time::Duration;
use tokio::time::Instant;
use voice_gateway_config::{BargeInConfig, DecayMode};

/// Counter values below this snap to zero
const COUNTER_FLOOR: f32 = 0.01;

#[derive(Debug, Clone)]
pub struct BargeInDetector {
    config: BargeInConfig,
    counter: f32,
    playback_started: Option<Instant>,
    last_interrupt: Option<Instant>,
}

impl BargeInDetector {
    pub fn new(config: BargeInConfig) -> Self {
        Self {
            config,
            counter: 0.0,
            playback_started: None,
            last_interrupt: None,
        }
    }

    pub fn counter(&self) -> f32 {
        self.counter
    }

    pub fn start_playback(&mut self, now: Instant) {
        self.playback_started = Some(now);
        self.counter = 0.0;
    }

    pub fn stop_playback(&mut self) {
        self.playback_started = None;
        self.counter = 0.0;
    }

    fn decay(&mut self) {
        self.counter = match self.config.decay {
            DecayMode::Exponential { factor } => self.counter * factor,
            DecayMode::Linear { step } => self.counter - step,
        };
        if self.counter < COUNTER_FLOOR {
            self.counter = 0.0;
        }
    }

    /// Feed one frame's mean amplitude; true when an interrupt fires
    pub fn observe(&mut self, amplitude: f32, now: Instant) -> bool {
        if !self.config.enabled {
            return false;
        }
        let Some(started) = self.playback_started else {
            return false;
        };
        if now.saturating_duration_since(started) < Duration::from_millis(self.config.warmup_ms) {
            return false;
        }
        if let Some(last) = self.last_interrupt {
            if now.saturating_duration_since(last) < Duration::from_millis(self.config.cooldown_ms) {
                return false;
            }
        }

        if amplitude >= self.config.amplitude_threshold {
            self.counter += 1.0;
        } else {
            self.decay();
        }

        if self.counter >= self.config.trigger_count {
            tracing::debug!(counter = self.counter, amplitude, "Barge-in triggered");
            self.counter = 0.0;
            self.last_interrupt = Some(now);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOUD: f32 = 0.3;
    const QUIET: f32 = 0.001;

    fn started(config: BargeInConfig) -> (BargeInDetector, Instant) {
        let mut detector = BargeInDetector::new(config);
        let t0 = Instant::now();
        detector.start_playback(t0);
        (detector, t0 + Duration::from_millis(500))
    }

    #[test]
    fn test_consecutive_loud_frames_fire_once() {
        let (mut d, now) = started(BargeInConfig::default());
        assert!(!d.observe(LOUD, now));
        assert!(d.observe(LOUD, now + Duration::from_millis(20)));
        // Cooldown swallows the rest of the burst
        for i in 2..10 {
            assert!(!d.observe(LOUD, now + Duration::from_millis(20 * i)));
        }
    }

    #[test]
    fn test_isolated_blips_decay_away() {
        let (mut d, now) = started(BargeInConfig::default());
        for i in 0..20u64 {
            let t = now + Duration::from_millis(20 * i);
            let amplitude = if i % 2 == 0 { LOUD } else { QUIET };
            assert!(!d.observe(amplitude, t), "fired at frame {}", i);
        }
        assert!(d.counter() < 2.0);
    }

    #[test]
    fn test_linear_decay_clears_counter() {
        let config = BargeInConfig {
            decay: DecayMode::Linear { step: 1.0 },
            ..BargeInConfig::default()
        };
        let (mut d, now) = started(config);
        for i in 0..10u64 {
            let t = now + Duration::from_millis(20 * i);
            let amplitude = if i % 2 == 0 { LOUD } else { QUIET };
            assert!(!d.observe(amplitude, t));
        }
        assert_eq!(d.counter(), 0.0);
    }

    #[test]
    fn test_warmup_ignored() {
        let mut d = BargeInDetector::new(BargeInConfig::default());
        let t0 = Instant::now();
        d.start_playback(t0);
        for i in 0..10 {
            assert!(!d.observe(LOUD, t0 + Duration::from_millis(20 * i)));
        }
        assert_eq!(d.counter(), 0.0);
    }

    #[test]
    fn test_inactive_without_playback() {
        let mut d = BargeInDetector::new(BargeInConfig::default());
        assert!(!d.observe(LOUD, Instant::now()));
        assert!(!d.observe(LOUD, Instant::now()));
    }

    #[test]
    fn test_fires_again_after_cooldown() {
        let (mut d, now) = started(BargeInConfig::default());
        d.observe(LOUD, now);
        assert!(d.observe(LOUD, now));
        let later = now + Duration::from_millis(1500);
        d.observe(LOUD, later);
        assert!(d.observe(LOUD, later));
    }
}
