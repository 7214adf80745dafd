//! Audio frame types and utilities

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AudioError;

/// Telephony sample rate used for recognition input
pub const TELEPHONY_SAMPLE_RATE: u32 = 8_000;

/// Wideband sample rate assumed until a session learns its real format
pub const WIDEBAND_SAMPLE_RATE: u32 = 16_000;

/// Audio encoding formats accepted on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    /// 16-bit signed PCM (little-endian)
    #[default]
    Pcm16,
    /// G.711 μ-law (telephony)
    Mulaw,
}

impl AudioEncoding {
    /// Bytes occupied by one mono sample
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            AudioEncoding::Pcm16 => 2,
            AudioEncoding::Mulaw => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Pcm16 => "pcm16",
            AudioEncoding::Mulaw => "mulaw",
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioEncoding {
    type Err = AudioError;

    /// Accepts the spellings transports commonly use for the two encodings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pcm16" | "pcm" | "linear16" | "l16" | "s16le" => Ok(AudioEncoding::Pcm16),
            "mulaw" | "ulaw" | "mu-law" | "pcmu" | "audio/x-mulaw" | "g711_ulaw" => {
                Ok(AudioEncoding::Mulaw)
            },
            other => Err(AudioError::InvalidFormat(other.to_string())),
        }
    }
}

/// Encoding plus sample rate, the format "in effect" for a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub encoding: AudioEncoding,
    pub sample_rate: u32,
}

impl AudioFormat {
    pub const fn new(encoding: AudioEncoding, sample_rate: u32) -> Self {
        Self {
            encoding,
            sample_rate,
        }
    }

    /// μ-law at 8 kHz
    pub const fn telephony() -> Self {
        Self::new(AudioEncoding::Mulaw, TELEPHONY_SAMPLE_RATE)
    }

    /// Bytes per second of mono audio in this format
    pub fn byte_rate(&self) -> usize {
        self.sample_rate as usize * self.encoding.bytes_per_sample()
    }

    /// Playback duration of `len` bytes in this format
    pub fn duration_of(&self, len: usize) -> Duration {
        let rate = self.byte_rate();
        if rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(len as f64 / rate as f64)
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(AudioEncoding::Pcm16, WIDEBAND_SAMPLE_RATE)
    }
}

/// An immutable chunk of mono audio with its format tag
#[derive(Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Raw encoded bytes
    pub data: Bytes,
    pub encoding: AudioEncoding,
    pub sample_rate: u32,
    /// Frame sequence number for ordering
    pub sequence: u64,
}

impl fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFrame")
            .field("bytes", &self.data.len())
            .field("encoding", &self.encoding)
            .field("sample_rate", &self.sample_rate)
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl AudioFrame {
    pub fn new(data: impl Into<Bytes>, format: AudioFormat, sequence: u64) -> Self {
        Self {
            data: data.into(),
            encoding: format.encoding,
            sample_rate: format.sample_rate,
            sequence,
        }
    }

    pub fn format(&self) -> AudioFormat {
        AudioFormat::new(self.encoding, self.sample_rate)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of whole samples carried by the frame
    pub fn sample_count(&self) -> usize {
        self.data.len() / self.encoding.bytes_per_sample()
    }

    pub fn duration(&self) -> Duration {
        self.format().duration_of(self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_aliases() {
        assert_eq!("ulaw".parse::<AudioEncoding>().unwrap(), AudioEncoding::Mulaw);
        assert_eq!("PCMU".parse::<AudioEncoding>().unwrap(), AudioEncoding::Mulaw);
        assert_eq!("linear16".parse::<AudioEncoding>().unwrap(), AudioEncoding::Pcm16);
        assert!("opus".parse::<AudioEncoding>().is_err());
    }

    #[test]
    fn test_frame_duration() {
        let frame = AudioFrame::new(vec![0xFFu8; 160], AudioFormat::telephony(), 0);
        assert_eq!(frame.sample_count(), 160);
        assert_eq!(frame.duration(), Duration::from_millis(20));

        let pcm = AudioFrame::new(vec![0u8; 640], AudioFormat::default(), 1);
        assert_eq!(pcm.sample_count(), 320);
        assert_eq!(pcm.duration(), Duration::from_millis(20));
    }
}
