//! Voice Activity Detection
//!
//! A feature-weighted classifier over a single frame. Each feature is
//! scaled into [0, 1], combined with fixed weights, and squashed through a
//! logistic centred on the configured midpoint to give a confidence.
//!
//! The detector never fails from the caller's point of view: when feature
//! extraction produces something unusable it falls back to a plain
//! amplitude threshold with reduced confidence.

mod features;

pub use features::{extract, AudioFeatures};

use serde::{Deserialize, Serialize};
use voice_gateway_config::VadConfig;
use voice_gateway_core::AudioFrame;

use crate::codec;
use crate::PipelineError;

/// Per-frame judgment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VadResult {
    pub is_speech: bool,
    /// Speech confidence in [0, 1]
    pub confidence: f32,
    /// The frame is quiet enough to end an utterance
    pub should_finalize: bool,
    /// Mean absolute amplitude in [0, 1]
    pub amplitude: f32,
    pub features: AudioFeatures,
}

impl VadResult {
    /// Confidence that the frame is silence
    pub fn silence_confidence(&self) -> f32 {
        1.0 - self.confidence
    }
}

/// VAD engine trait for pluggable implementations
pub trait VadEngine: Send + Sync {
    /// Classify one frame
    fn classify(&self, frame: &AudioFrame) -> VadResult;
}

/// Feature-weighted VAD over time-domain features
#[derive(Debug, Clone)]
pub struct FeatureVad {
    config: VadConfig,
}

impl FeatureVad {
    pub fn new(config: VadConfig) -> Self {
        Self { config }
    }

    fn logistic(&self, score: f32) -> f32 {
        let c = &self.config;
        1.0 / (1.0 + (-c.logistic_steepness * (score - c.logistic_midpoint)).exp())
    }

    fn score(&self, f: &AudioFeatures) -> f32 {
        let c = &self.config;
        let scaled = |value: f32, scale: f32| (value / scale).clamp(0.0, 1.0);

        c.energy_weight * scaled(f.energy, c.energy_scale)
            + c.centroid_weight * scaled(f.spectral_centroid, c.centroid_scale)
            + c.zcr_weight * scaled(f.zero_crossing_rate, c.zcr_scale)
            + c.rolloff_weight * f.spectral_rolloff.clamp(0.0, 1.0)
    }

    fn try_classify(&self, samples: &[f32]) -> Result<VadResult, PipelineError> {
        if samples.is_empty() {
            return Err(PipelineError::Vad("empty frame".to_string()));
        }

        let (features, amplitude) = extract(samples, self.config.rolloff_fraction);
        let confidence = self.logistic(self.score(&features));
        if !confidence.is_finite() || !amplitude.is_finite() {
            return Err(PipelineError::Vad(format!(
                "non-finite features: confidence={} amplitude={}",
                confidence, amplitude
            )));
        }

        let c = &self.config;
        Ok(VadResult {
            is_speech: confidence > c.speech_threshold && amplitude > c.min_speech_amplitude,
            confidence,
            should_finalize: confidence < c.finalize_confidence
                && features.energy < c.finalize_energy_floor
                && amplitude < c.finalize_amplitude_floor,
            amplitude,
            features,
        })
    }

    /// Amplitude-only judgment used when feature analysis fails
    fn fallback(&self, samples: &[f32]) -> VadResult {
        let amplitude = if samples.is_empty() {
            0.0
        } else {
            let mean = samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32;
            if mean.is_finite() {
                mean
            } else {
                0.0
            }
        };
        let c = &self.config;
        let is_speech = amplitude > c.fallback_amplitude_threshold;
        let confidence = if is_speech {
            c.fallback_confidence
        } else {
            (amplitude / c.fallback_amplitude_threshold).min(1.0) * c.fallback_confidence
        };
        VadResult {
            is_speech,
            confidence,
            should_finalize: !is_speech && amplitude < c.finalize_amplitude_floor,
            amplitude,
            features: AudioFeatures::default(),
        }
    }
}

impl VadEngine for FeatureVad {
    fn classify(&self, frame: &AudioFrame) -> VadResult {
        let samples = codec::decode_normalized(&frame.data, frame.encoding);
        match self.try_classify(&samples) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(error = %e, sequence = frame.sequence, "VAD falling back to amplitude threshold");
                self.fallback(&samples)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{mulaw, pcm16_to_bytes};
    use voice_gateway_core::AudioFormat;

    fn vad() -> FeatureVad {
        FeatureVad::new(VadConfig::default())
    }

    fn mulaw_frame(bytes: Vec<u8>) -> AudioFrame {
        AudioFrame::new(bytes, AudioFormat::telephony(), 0)
    }

    #[test]
    fn test_mulaw_silence_is_not_speech() {
        let result = vad().classify(&mulaw_frame(vec![0x7F; 160]));
        assert!(!result.is_speech);
        assert!(result.confidence < 0.15);
        assert!(result.should_finalize);
    }

    #[test]
    fn test_full_scale_alternating_is_speech() {
        let samples: Vec<i16> = (0..320)
            .map(|i| if i % 2 == 0 { i16::MAX } else { i16::MIN })
            .collect();
        let frame = AudioFrame::new(pcm16_to_bytes(&samples), AudioFormat::default(), 0);
        let result = vad().classify(&frame);
        assert!(result.is_speech);
        assert!(result.confidence > 0.9);
        assert!(!result.should_finalize);
    }

    #[test]
    fn test_voiced_tone_is_speech() {
        // 1 kHz at 8 kHz, half scale
        let samples: Vec<i16> = (0..160)
            .map(|i| ((i as f32 * std::f32::consts::TAU / 8.0).sin() * 16000.0) as i16)
            .collect();
        let result = vad().classify(&mulaw_frame(mulaw::encode(&samples)));
        assert!(result.is_speech, "confidence {}", result.confidence);
    }

    #[test]
    fn test_empty_frame_falls_back() {
        let result = vad().classify(&mulaw_frame(Vec::new()));
        assert!(!result.is_speech);
        assert!(result.should_finalize);
        assert!(result.confidence <= 0.5);
    }

    #[test]
    fn test_logistic_centre() {
        assert!((vad().logistic(0.5) - 0.5).abs() < 1e-6);
    }
}
