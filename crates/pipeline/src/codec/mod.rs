//! Audio codec and resampling layer
//!
//! Stateless conversions between the wire formats the engine accepts
//! (μ-law and PCM16 at arbitrary rates) and the two formats it works in:
//! μ-law at 8 kHz for recognition, PCM16 at the playback rate for output.

pub mod detect;
pub mod mulaw;
pub mod resample;
pub mod volume;
pub mod wav;

pub use detect::detect_encoding;
pub use resample::resample_linear;
pub use volume::normalize_volume;
pub use wav::to_wav;

use voice_gateway_config::constants::audio::PCM16_NORMALIZE;
use voice_gateway_config::AudioConfig;
use voice_gateway_core::{AudioEncoding, AudioError, AudioFormat};

/// Interpret little-endian bytes as PCM16; a trailing odd byte is dropped
pub fn pcm16_from_bytes(data: &[u8]) -> Vec<i16> {
    data.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// Decode any supported encoding to PCM16 samples
pub fn decode_pcm(data: &[u8], encoding: AudioEncoding) -> Vec<i16> {
    match encoding {
        AudioEncoding::Pcm16 => pcm16_from_bytes(data),
        AudioEncoding::Mulaw => mulaw::decode(data),
    }
}

/// Decode to floats in [-1, 1]
pub fn decode_normalized(data: &[u8], encoding: AudioEncoding) -> Vec<f32> {
    decode_pcm(data, encoding)
        .into_iter()
        .map(|s| s as f32 / PCM16_NORMALIZE)
        .collect()
}

/// Mean absolute amplitude in [0, 1]
pub fn mean_amplitude(data: &[u8], encoding: AudioEncoding) -> f32 {
    let samples = decode_pcm(data, encoding);
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64).abs()).sum();
    (sum / samples.len() as f64 / PCM16_NORMALIZE as f64) as f32
}

/// Format conversions parameterized by configuration
#[derive(Debug, Clone)]
pub struct AudioCodec {
    config: AudioConfig,
}

impl AudioCodec {
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn recognition_format(&self) -> AudioFormat {
        self.config.recognition_format()
    }

    pub fn playback_format(&self) -> AudioFormat {
        self.config.playback_format()
    }

    /// Reject a caller-declared rate outside the configured range
    pub fn check_sample_rate(&self, rate: u32) -> Result<u32, AudioError> {
        if self.config.accepts_sample_rate(rate) {
            Ok(rate)
        } else {
            Err(AudioError::UnsupportedSampleRate(rate))
        }
    }

    /// Decide the format of an inbound chunk
    ///
    /// Explicit metadata always wins. Without it, a session that already
    /// knows its format keeps it; otherwise the encoding is guessed from the
    /// bytes when detection is enabled, else the configured default applies.
    pub fn resolve_format(
        &self,
        data: &[u8],
        encoding: Option<AudioEncoding>,
        sample_rate: Option<u32>,
        known: Option<AudioFormat>,
    ) -> AudioFormat {
        let fallback = known.unwrap_or_else(|| self.config.default_format());
        let encoding = encoding.unwrap_or_else(|| {
            if known.is_some() || !self.config.auto_detect_format {
                return fallback.encoding;
            }
            detect_encoding(data, self.config.detect_window_bytes).unwrap_or(fallback.encoding)
        });
        let sample_rate = sample_rate.unwrap_or(match (known, encoding) {
            (Some(format), _) => format.sample_rate,
            // Unlabelled μ-law is almost always telephony
            (None, AudioEncoding::Mulaw) => self.config.recognition_sample_rate,
            (None, AudioEncoding::Pcm16) => self.config.default_sample_rate,
        });
        AudioFormat::new(encoding, sample_rate)
    }

    /// Convert to μ-law at the recognition rate
    pub fn normalize_for_recognition(&self, data: &[u8], format: AudioFormat) -> Vec<u8> {
        let target = self.recognition_format();
        if format == target {
            return data.to_vec();
        }
        let pcm = decode_pcm(data, format.encoding);
        let resampled = resample_linear(&pcm, format.sample_rate, target.sample_rate);
        mulaw::encode(&resampled)
    }

    /// Convert to volume-normalized PCM16 at the playback rate
    pub fn normalize_for_playback(&self, data: &[u8], format: AudioFormat) -> Vec<u8> {
        let target = self.playback_format();
        let pcm = decode_pcm(data, format.encoding);
        let resampled = resample_linear(&pcm, format.sample_rate, target.sample_rate);
        let leveled = normalize_volume(
            &resampled,
            self.config.normalization_target,
            self.config.playback_gain,
        );
        pcm16_to_bytes(&leveled)
    }
}
