//! Time-domain audio features
//!
//! Cheap stand-ins for spectral measurements, computed in one or two passes
//! over normalized samples. Each is bounded and roughly in [0, 1] for
//! normalized input.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    /// RMS energy
    pub energy: f32,
    /// Position-weighted mean of sample-to-sample difference magnitude
    pub spectral_centroid: f32,
    /// Sign changes per sample
    pub zero_crossing_rate: f32,
    /// Fraction of the frame needed to reach the rolloff share of amplitude
    pub spectral_rolloff: f32,
}

/// Extract features plus the mean absolute amplitude
pub fn extract(samples: &[f32], rolloff_fraction: f32) -> (AudioFeatures, f32) {
    let n = samples.len();
    if n == 0 {
        return (AudioFeatures::default(), 0.0);
    }
    let len = n as f32;

    let mut sum_sq = 0.0f32;
    let mut sum_abs = 0.0f32;
    let mut weighted_diff = 0.0f32;
    let mut crossings = 0usize;

    for (i, &x) in samples.iter().enumerate() {
        sum_sq += x * x;
        sum_abs += x.abs();
        if i > 0 {
            let prev = samples[i - 1];
            weighted_diff += (x - prev).abs() * (i as f32 / len);
            if (x >= 0.0) != (prev >= 0.0) {
                crossings += 1;
            }
        }
    }

    let spectral_rolloff = if sum_abs > 0.0 {
        let threshold = sum_abs * rolloff_fraction;
        let mut running = 0.0f32;
        let mut reached = n;
        for (i, &x) in samples.iter().enumerate() {
            running += x.abs();
            if running >= threshold {
                reached = i + 1;
                break;
            }
        }
        reached as f32 / len
    } else {
        0.0
    };

    let features = AudioFeatures {
        energy: (sum_sq / len).sqrt(),
        spectral_centroid: weighted_diff / len,
        zero_crossing_rate: crossings as f32 / len,
        spectral_rolloff,
    };
    (features, sum_abs / len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_has_no_features() {
        let (f, amp) = extract(&[0.0; 160], 0.85);
        assert_eq!(f, AudioFeatures::default());
        assert_eq!(amp, 0.0);
    }

    #[test]
    fn test_alternating_full_scale() {
        let samples: Vec<f32> = (0..160).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let (f, amp) = extract(&samples, 0.85);
        assert!((f.energy - 1.0).abs() < 1e-4);
        assert!((amp - 1.0).abs() < 1e-4);
        assert!(f.zero_crossing_rate > 0.99);
        assert!(f.spectral_centroid > 0.95);
        assert!((f.spectral_rolloff - 0.85).abs() < 0.01);
    }

    #[test]
    fn test_empty_frame() {
        let (f, amp) = extract(&[], 0.85);
        assert_eq!(f, AudioFeatures::default());
        assert_eq!(amp, 0.0);
    }
}
