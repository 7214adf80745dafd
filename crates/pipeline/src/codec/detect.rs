//! Heuristic encoding detection for chunks without metadata
//!
//! Little-endian PCM16 speech has high bytes clustered around 0x00/0xFF
//! (sign extension of small values) while its low bytes look uniform.
//! μ-law spreads information evenly over every byte, so even and odd
//! positions share one distribution.

use voice_gateway_core::AudioEncoding;

/// Share of odd-position bytes near zero above which PCM16 is likely
const HIGH_BYTE_CLUSTER: f32 = 0.6;

/// Share of zero bytes above which the buffer cannot be μ-law
/// (0x00 is the loudest negative μ-law code)
const ZERO_BYTE_SHARE: f32 = 0.5;

fn near_zero(byte: u8) -> bool {
    byte <= 0x0F || byte >= 0xF0
}

/// Guess the encoding from the first `window` bytes
///
/// Returns `None` when the buffer is too short to judge.
pub fn detect_encoding(data: &[u8], window: usize) -> Option<AudioEncoding> {
    let sample = &data[..data.len().min(window)];
    if sample.len() < 4 {
        return None;
    }

    let zeros = sample.iter().filter(|&&b| b == 0).count();
    if zeros as f32 / sample.len() as f32 >= ZERO_BYTE_SHARE {
        return Some(AudioEncoding::Pcm16);
    }

    let (mut even_near, mut odd_near, mut even_total, mut odd_total) = (0usize, 0usize, 0usize, 0usize);
    for (i, &b) in sample.iter().enumerate() {
        if i % 2 == 0 {
            even_total += 1;
            even_near += near_zero(b) as usize;
        } else {
            odd_total += 1;
            odd_near += near_zero(b) as usize;
        }
    }

    let even_share = even_near as f32 / even_total as f32;
    let odd_share = odd_near as f32 / odd_total as f32;

    if odd_share >= HIGH_BYTE_CLUSTER && even_share < HIGH_BYTE_CLUSTER {
        Some(AudioEncoding::Pcm16)
    } else {
        Some(AudioEncoding::Mulaw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{mulaw, pcm16_to_bytes};

    fn sine(len: usize, amplitude: f32, period: f32) -> Vec<i16> {
        (0..len)
            .map(|i| ((i as f32 * std::f32::consts::TAU / period).sin() * amplitude) as i16)
            .collect()
    }

    #[test]
    fn test_detects_pcm16_speech_level_audio() {
        let bytes = pcm16_to_bytes(&sine(200, 1500.0, 37.0));
        assert_eq!(detect_encoding(&bytes, 100), Some(AudioEncoding::Pcm16));
    }

    #[test]
    fn test_detects_mulaw() {
        let bytes = mulaw::encode(&sine(200, 6000.0, 23.0));
        assert_eq!(detect_encoding(&bytes, 100), Some(AudioEncoding::Mulaw));
    }

    #[test]
    fn test_mulaw_silence_is_mulaw() {
        assert_eq!(detect_encoding(&[0xFF; 160], 100), Some(AudioEncoding::Mulaw));
    }

    #[test]
    fn test_pcm_silence_is_pcm() {
        assert_eq!(detect_encoding(&[0u8; 320], 100), Some(AudioEncoding::Pcm16));
    }

    #[test]
    fn test_too_short() {
        assert_eq!(detect_encoding(&[1, 2], 100), None);
    }
}
