//! Pipeline tunables
//!
//! One section per engine component. Every section deserializes with
//! defaults so a config file only needs to name what it overrides.

use serde::{Deserialize, Serialize};
use voice_gateway_core::{AudioEncoding, AudioFormat};

use crate::constants::{audio, barge_in, streamer, transcription, turn_taking, vad};
use crate::ConfigError;

/// Codec and format settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Encoding assumed when a chunk carries no metadata and detection is off
    pub default_encoding: AudioEncoding,
    pub default_sample_rate: u32,
    /// Inbound rates outside this range are rejected
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
    /// Guess the encoding of chunks that arrive without metadata
    pub auto_detect_format: bool,
    pub detect_window_bytes: usize,
    pub recognition_sample_rate: u32,
    pub playback_sample_rate: u32,
    pub playback_gain: f32,
    pub normalization_target: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            default_encoding: AudioEncoding::Pcm16,
            default_sample_rate: audio::DEFAULT_SAMPLE_RATE,
            min_sample_rate: audio::MIN_SAMPLE_RATE,
            max_sample_rate: audio::MAX_SAMPLE_RATE,
            auto_detect_format: true,
            detect_window_bytes: audio::DETECT_WINDOW_BYTES,
            recognition_sample_rate: audio::RECOGNITION_SAMPLE_RATE,
            playback_sample_rate: audio::PLAYBACK_SAMPLE_RATE,
            playback_gain: audio::PLAYBACK_GAIN,
            normalization_target: audio::NORMALIZATION_TARGET,
        }
    }
}

impl AudioConfig {
    pub fn default_format(&self) -> AudioFormat {
        AudioFormat::new(self.default_encoding, self.default_sample_rate)
    }

    pub fn recognition_format(&self) -> AudioFormat {
        AudioFormat::new(AudioEncoding::Mulaw, self.recognition_sample_rate)
    }

    pub fn playback_format(&self) -> AudioFormat {
        AudioFormat::new(AudioEncoding::Pcm16, self.playback_sample_rate)
    }

    pub fn accepts_sample_rate(&self, rate: u32) -> bool {
        (self.min_sample_rate..=self.max_sample_rate).contains(&rate)
    }
}

/// Voice activity detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    pub energy_weight: f32,
    pub centroid_weight: f32,
    pub zcr_weight: f32,
    pub rolloff_weight: f32,
    pub energy_scale: f32,
    pub centroid_scale: f32,
    pub zcr_scale: f32,
    pub rolloff_fraction: f32,
    pub logistic_midpoint: f32,
    pub logistic_steepness: f32,
    pub speech_threshold: f32,
    pub min_speech_amplitude: f32,
    pub finalize_confidence: f32,
    pub finalize_energy_floor: f32,
    pub finalize_amplitude_floor: f32,
    pub fallback_amplitude_threshold: f32,
    pub fallback_confidence: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_weight: vad::ENERGY_WEIGHT,
            centroid_weight: vad::CENTROID_WEIGHT,
            zcr_weight: vad::ZCR_WEIGHT,
            rolloff_weight: vad::ROLLOFF_WEIGHT,
            energy_scale: vad::ENERGY_SCALE,
            centroid_scale: vad::CENTROID_SCALE,
            zcr_scale: vad::ZCR_SCALE,
            rolloff_fraction: vad::ROLLOFF_FRACTION,
            logistic_midpoint: vad::LOGISTIC_MIDPOINT,
            logistic_steepness: vad::LOGISTIC_STEEPNESS,
            speech_threshold: vad::SPEECH_THRESHOLD,
            min_speech_amplitude: vad::MIN_SPEECH_AMPLITUDE,
            finalize_confidence: vad::FINALIZE_CONFIDENCE,
            finalize_energy_floor: vad::FINALIZE_ENERGY_FLOOR,
            finalize_amplitude_floor: vad::FINALIZE_AMPLITUDE_FLOOR,
            fallback_amplitude_threshold: vad::FALLBACK_AMPLITUDE_THRESHOLD,
            fallback_confidence: vad::FALLBACK_CONFIDENCE,
        }
    }
}

impl VadConfig {
    fn weight_sum(&self) -> f32 {
        self.energy_weight + self.centroid_weight + self.zcr_weight + self.rolloff_weight
    }
}

/// End-of-utterance and playback timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnTakingConfig {
    pub min_speech_confidence: f32,
    pub finalize_delay_ms: u64,
    pub low_confidence_multiplier: f32,
    pub confident_silence: f32,
    pub fallback_finalize_delay_ms: u64,
    pub hint_min_active_frames: u32,
    pub min_active_frames: u32,
    pub min_silence_frames: u32,
    pub max_buffered_frames: usize,
    pub settle_delay_ms: u64,
    pub playback_margin_ms: u64,
    pub history_limit: usize,
}

impl Default for TurnTakingConfig {
    fn default() -> Self {
        Self {
            min_speech_confidence: turn_taking::MIN_SPEECH_CONFIDENCE,
            finalize_delay_ms: turn_taking::FINALIZE_DELAY_MS,
            low_confidence_multiplier: turn_taking::LOW_CONFIDENCE_MULTIPLIER,
            confident_silence: turn_taking::CONFIDENT_SILENCE,
            fallback_finalize_delay_ms: turn_taking::FALLBACK_FINALIZE_DELAY_MS,
            hint_min_active_frames: turn_taking::HINT_MIN_ACTIVE_FRAMES,
            min_active_frames: turn_taking::MIN_ACTIVE_FRAMES,
            min_silence_frames: turn_taking::MIN_SILENCE_FRAMES,
            max_buffered_frames: turn_taking::MAX_BUFFERED_FRAMES,
            settle_delay_ms: turn_taking::SETTLE_DELAY_MS,
            playback_margin_ms: turn_taking::PLAYBACK_MARGIN_MS,
            history_limit: turn_taking::HISTORY_LIMIT,
        }
    }
}

/// How the barge-in counter decays on quiet frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DecayMode {
    /// Multiply the counter by `factor`
    Exponential { factor: f32 },
    /// Subtract `step` from the counter
    Linear { step: f32 },
}

impl Default for DecayMode {
    fn default() -> Self {
        DecayMode::Exponential {
            factor: barge_in::DECAY_FACTOR,
        }
    }
}

/// Barge-in detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BargeInConfig {
    pub enabled: bool,
    pub amplitude_threshold: f32,
    pub warmup_ms: u64,
    pub cooldown_ms: u64,
    pub trigger_count: f32,
    pub decay: DecayMode,
}

impl Default for BargeInConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            amplitude_threshold: barge_in::AMPLITUDE_THRESHOLD,
            warmup_ms: barge_in::WARMUP_MS,
            cooldown_ms: barge_in::COOLDOWN_MS,
            trigger_count: barge_in::TRIGGER_COUNT,
            decay: DecayMode::default(),
        }
    }
}

/// Streaming transcription buffer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Emit partial transcripts while the caller is still talking
    pub partials_enabled: bool,
    pub partial_interval_ms: u64,
    pub trailing_context_ms: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            partials_enabled: true,
            partial_interval_ms: transcription::PARTIAL_INTERVAL_MS,
            trailing_context_ms: transcription::TRAILING_CONTEXT_MS,
        }
    }
}

/// Outbound frame pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    pub slice_ms: u64,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            slice_ms: streamer::SLICE_MS,
        }
    }
}

fn unit_interval(field: &str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("must be within [0, 1], got {}", value),
        });
    }
    Ok(())
}

fn positive(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

/// Validate the pipeline sections together
pub(crate) fn validate_pipeline(
    audio: &AudioConfig,
    vad: &VadConfig,
    turn: &TurnTakingConfig,
    barge: &BargeInConfig,
    stt: &TranscriptionConfig,
    streamer: &StreamerConfig,
) -> Result<(), ConfigError> {
    positive("audio.min_sample_rate", audio.min_sample_rate as u64)?;
    if audio.min_sample_rate > audio.max_sample_rate {
        return Err(ConfigError::InvalidValue {
            field: "audio.max_sample_rate".to_string(),
            message: "must not be below audio.min_sample_rate".to_string(),
        });
    }
    for (field, rate) in [
        ("audio.default_sample_rate", audio.default_sample_rate),
        ("audio.recognition_sample_rate", audio.recognition_sample_rate),
        ("audio.playback_sample_rate", audio.playback_sample_rate),
    ] {
        if !audio.accepts_sample_rate(rate) {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: format!(
                    "must be within [{}, {}] Hz, got {}",
                    audio.min_sample_rate, audio.max_sample_rate, rate
                ),
            });
        }
    }
    unit_interval("audio.normalization_target", audio.normalization_target)?;
    if audio.playback_gain <= 0.0 {
        return Err(ConfigError::InvalidValue {
            field: "audio.playback_gain".to_string(),
            message: "must be positive".to_string(),
        });
    }

    if (vad.weight_sum() - 1.0).abs() > 0.01 {
        return Err(ConfigError::InvalidValue {
            field: "vad.*_weight".to_string(),
            message: format!("weights must sum to 1.0, got {:.3}", vad.weight_sum()),
        });
    }
    unit_interval("vad.speech_threshold", vad.speech_threshold)?;
    unit_interval("vad.finalize_confidence", vad.finalize_confidence)?;
    unit_interval("vad.rolloff_fraction", vad.rolloff_fraction)?;
    if vad.finalize_confidence >= vad.speech_threshold {
        return Err(ConfigError::InvalidValue {
            field: "vad.finalize_confidence".to_string(),
            message: "must be below vad.speech_threshold".to_string(),
        });
    }

    unit_interval("turn_taking.min_speech_confidence", turn.min_speech_confidence)?;
    unit_interval("turn_taking.confident_silence", turn.confident_silence)?;
    positive("turn_taking.finalize_delay_ms", turn.finalize_delay_ms)?;
    if !turn.low_confidence_multiplier.is_finite() || turn.low_confidence_multiplier < 1.0 {
        return Err(ConfigError::InvalidValue {
            field: "turn_taking.low_confidence_multiplier".to_string(),
            message: format!("must be a finite value >= 1.0, got {}", turn.low_confidence_multiplier),
        });
    }
    positive("turn_taking.max_buffered_frames", turn.max_buffered_frames as u64)?;

    if barge.trigger_count <= 0.0 {
        return Err(ConfigError::InvalidValue {
            field: "barge_in.trigger_count".to_string(),
            message: "must be positive".to_string(),
        });
    }
    match barge.decay {
        DecayMode::Exponential { factor } => unit_interval("barge_in.decay.factor", factor)?,
        DecayMode::Linear { step } if step <= 0.0 => {
            return Err(ConfigError::InvalidValue {
                field: "barge_in.decay.step".to_string(),
                message: "must be positive".to_string(),
            })
        },
        DecayMode::Linear { .. } => {},
    }

    positive("transcription.partial_interval_ms", stt.partial_interval_ms)?;
    if stt.trailing_context_ms >= stt.partial_interval_ms {
        return Err(ConfigError::InvalidValue {
            field: "transcription.trailing_context_ms".to_string(),
            message: "must be shorter than transcription.partial_interval_ms".to_string(),
        });
    }

    positive("streamer.slice_ms", streamer.slice_ms)?;
    Ok(())
}
