//! Centralized constants for the voice gateway
//!
//! Single source of truth for default tunables. Config structs pull their
//! `Default` values from here, so changing a default happens in one place.

/// Audio format and codec defaults
pub mod audio {
    /// Rate the engine assumes until a chunk says otherwise (Hz)
    pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

    /// Rate audio is normalized to before recognition (Hz)
    pub const RECOGNITION_SAMPLE_RATE: u32 = 8000;

    /// Rate reply audio is normalized to before playback (Hz)
    pub const PLAYBACK_SAMPLE_RATE: u32 = 16000;

    /// Requested gain applied to playback audio
    pub const PLAYBACK_GAIN: f32 = 0.75;

    /// Fraction of full scale the normalized peak may reach (before gain)
    pub const NORMALIZATION_TARGET: f32 = 0.8;

    /// Accepted range for caller-declared sample rates (Hz)
    pub const MIN_SAMPLE_RATE: u32 = 8000;
    pub const MAX_SAMPLE_RATE: u32 = 48000;
    /// Bytes inspected by the format heuristic
    pub const DETECT_WINDOW_BYTES: usize = 100;

    /// PCM16 normalization divisor (for converting PCM16 to f32)
    pub const PCM16_NORMALIZE: f32 = 32768.0;

    /// PCM16 scaling multiplier (for converting f32 to PCM16)
    pub const PCM16_SCALE: f32 = 32767.0;
}

/// Voice activity detector weights and thresholds
pub mod vad {
    pub const ENERGY_WEIGHT: f32 = 0.4;
    pub const CENTROID_WEIGHT: f32 = 0.3;
    pub const ZCR_WEIGHT: f32 = 0.2;
    pub const ROLLOFF_WEIGHT: f32 = 0.1;

    /// RMS at which the energy feature saturates
    pub const ENERGY_SCALE: f32 = 0.05;

    /// Centroid proxy value at which the feature saturates
    pub const CENTROID_SCALE: f32 = 0.1;

    /// Zero-crossing rate at which the feature saturates
    pub const ZCR_SCALE: f32 = 0.25;

    /// Share of cumulative amplitude used by the rolloff proxy
    pub const ROLLOFF_FRACTION: f32 = 0.85;

    pub const LOGISTIC_MIDPOINT: f32 = 0.5;
    pub const LOGISTIC_STEEPNESS: f32 = 10.0;

    /// Confidence above which a frame counts as speech
    pub const SPEECH_THRESHOLD: f32 = 0.7;

    /// Mean absolute amplitude a speech frame must exceed
    pub const MIN_SPEECH_AMPLITUDE: f32 = 0.01;

    /// End-of-speech hint thresholds
    pub const FINALIZE_CONFIDENCE: f32 = 0.15;
    pub const FINALIZE_ENERGY_FLOOR: f32 = 0.01;
    pub const FINALIZE_AMPLITUDE_FLOOR: f32 = 0.005;

    /// Amplitude threshold used when feature extraction fails
    pub const FALLBACK_AMPLITUDE_THRESHOLD: f32 = 0.02;

    /// Confidence reported by the fallback path
    pub const FALLBACK_CONFIDENCE: f32 = 0.5;
}

/// Turn-taking timing constants
pub mod turn_taking {
    /// Debounce before finalizing on a VAD end-of-speech hint (ms)
    pub const FINALIZE_DELAY_MS: u64 = 300;

    /// Multiplier applied to the debounce when silence confidence is low
    pub const LOW_CONFIDENCE_MULTIPLIER: f32 = 1.5;

    /// Silence confidence below which the debounce is extended
    pub const CONFIDENT_SILENCE: f32 = 0.9;

    /// Debounce used by the frame-count rule (ms)
    pub const FALLBACK_FINALIZE_DELAY_MS: u64 = 500;

    /// Speech frames required before a VAD hint can finalize
    pub const HINT_MIN_ACTIVE_FRAMES: u32 = 2;

    /// Frame-count rule thresholds
    pub const MIN_ACTIVE_FRAMES: u32 = 3;
    pub const MIN_SILENCE_FRAMES: u32 = 10;

    /// Minimum VAD confidence for a speech frame to count
    pub const MIN_SPEECH_CONFIDENCE: f32 = 0.7;

    /// Frame ring capacity (1500 x 20 ms = 30 s)
    pub const MAX_BUFFERED_FRAMES: usize = 1500;

    /// Quiet period after a barge-in before listening resumes (ms)
    pub const SETTLE_DELAY_MS: u64 = 400;

    /// Added to the estimated playback duration (ms)
    pub const PLAYBACK_MARGIN_MS: u64 = 250;

    /// Conversation turns passed to the reply backend
    pub const HISTORY_LIMIT: usize = 10;
}

/// Barge-in detection defaults
pub mod barge_in {
    /// Mean absolute amplitude treated as caller speech during playback
    pub const AMPLITUDE_THRESHOLD: f32 = 0.05;

    /// Ignore caller audio this long after playback starts (ms)
    pub const WARMUP_MS: u64 = 300;

    /// Ignore caller audio this long after an interrupt (ms)
    pub const COOLDOWN_MS: u64 = 1000;

    /// Counter value that fires an interrupt
    pub const TRIGGER_COUNT: f32 = 2.0;

    pub const DECAY_FACTOR: f32 = 0.5;
    pub const LINEAR_DECAY_STEP: f32 = 0.5;
}

/// Streaming transcription defaults
pub mod transcription {
    /// Accumulated audio that triggers a partial pass (ms)
    pub const PARTIAL_INTERVAL_MS: u64 = 500;

    /// Audio kept after a partial pass for continuity (ms)
    pub const TRAILING_CONTEXT_MS: u64 = 200;
}

/// Playback streaming defaults
pub mod streamer {
    /// Duration of one outbound slice, also the pacing interval (ms)
    pub const SLICE_MS: u64 = 10;
}

/// Server defaults
pub mod server {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 8080;
}

/// Provider endpoints and timeouts
pub mod endpoints {
    /// OpenAI-compatible API endpoint
    pub const OPENAI_DEFAULT: &str = "https://api.openai.com/v1";

    pub const OPENAI_MODEL: &str = "gpt-4o-mini";
}

/// Timeouts (in milliseconds)
pub mod timeouts {
    pub const STT_TIMEOUT_MS: u64 = 10_000;
    pub const LLM_REQUEST_MS: u64 = 30_000;
    pub const TTS_TIMEOUT_MS: u64 = 15_000;
    pub const KNOWLEDGE_TIMEOUT_MS: u64 = 3_000;
}
