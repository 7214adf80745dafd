//! G.711 μ-law companding
//!
//! Decoding goes through a 256-entry table built at compile time. Encoding
//! works on the 14-bit magnitude scale with a bias of 33, as in the ITU
//! reference coder, so `encode(decode(b))` reproduces every code except the
//! redundant negative zero (0x7F), which re-encodes as 0xFF.

/// Bias added to the 14-bit magnitude before segment search
const BIAS: i32 = 33;

/// Largest 14-bit magnitude before clipping
const CLIP_14: i32 = 8159;

/// Input magnitudes are clamped to this before scaling down
const CLIP_16: i32 = 32767;

/// Upper bound of each segment on the biased 14-bit scale
const SEGMENT_END: [i32; 8] = [0x3F, 0x7F, 0xFF, 0x1FF, 0x3FF, 0x7FF, 0xFFF, 0x1FFF];

const DECODE_TABLE: [i16; 256] = build_decode_table();

const fn build_decode_table() -> [i16; 256] {
    let mut table = [0i16; 256];
    let mut i = 0;
    while i < 256 {
        let code = !(i as u8);
        let exponent = ((code >> 4) & 0x07) as i32;
        let mantissa = (code & 0x0F) as i32;
        // 16-bit scale: bias 33 << 2
        let magnitude = (((mantissa << 3) + (BIAS << 2)) << exponent) - (BIAS << 2);
        table[i] = if code & 0x80 != 0 {
            (-magnitude) as i16
        } else {
            magnitude as i16
        };
        i += 1;
    }
    table
}

#[inline]
pub fn decode_sample(byte: u8) -> i16 {
    DECODE_TABLE[byte as usize]
}

#[inline]
pub fn encode_sample(sample: i16) -> u8 {
    let sample = sample as i32;
    let (mask, magnitude) = if sample < 0 {
        (0x7Fu8, -sample)
    } else {
        (0xFFu8, sample)
    };

    let biased = ((magnitude.min(CLIP_16) >> 2).min(CLIP_14)) + BIAS;
    let segment = SEGMENT_END
        .iter()
        .position(|&end| biased <= end)
        .unwrap_or(SEGMENT_END.len());

    let code = if segment >= SEGMENT_END.len() {
        0x7F
    } else {
        ((segment as i32) << 4 | ((biased >> (segment + 1)) & 0x0F)) as u8
    };
    code ^ mask
}

/// Decode μ-law bytes to PCM16 samples
pub fn decode(bytes: &[u8]) -> Vec<i16> {
    bytes.iter().map(|&b| decode_sample(b)).collect()
}

/// Encode PCM16 samples to μ-law bytes
pub fn encode(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| encode_sample(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_codes_decode_to_zero() {
        assert_eq!(decode_sample(0xFF), 0);
        assert_eq!(decode_sample(0x7F), 0);
        assert_eq!(encode_sample(0), 0xFF);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(decode_sample(0x80), 32124);
        assert_eq!(decode_sample(0x00), -32124);
        assert_eq!(encode_sample(i16::MAX), 0x80);
        assert_eq!(encode_sample(i16::MIN), 0x00);
    }

    #[test]
    fn test_decode_table_is_monotonic_per_sign() {
        // 0x80..=0xFF run from loudest positive down to zero
        for b in 0x80u8..0xFF {
            assert!(decode_sample(b) > decode_sample(b + 1));
        }
        for b in 0x00u8..0x7F {
            assert!(decode_sample(b) < decode_sample(b + 1));
        }
    }

    #[test]
    fn test_round_trip_preserves_decoded_amplitude() {
        for b in 0..=255u8 {
            let pcm = decode_sample(b);
            assert_eq!(decode_sample(encode_sample(pcm)), pcm, "code {:#04x}", b);
        }
    }

    #[test]
    fn test_encode_within_one_step() {
        // Arbitrary PCM values land on the nearest-below quantization level
        for &s in &[-30000i16, -1234, -5, 7, 100, 999, 16000, 31000] {
            let back = decode_sample(encode_sample(s)) as i32;
            let s = s as i32;
            assert_eq!(back.signum(), s.signum());
            let step = (s.abs() / 16).max(8);
            assert!((back - s).abs() <= step * 2, "{} -> {}", s, back);
        }
    }
}
