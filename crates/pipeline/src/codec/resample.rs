//! Linear-interpolation resampling
//!
//! Telephony audio only needs to move between a handful of rates (8, 16,
//! 22.05, 24 kHz), where linear interpolation is adequate for both speech
//! recognition and playback.

/// Resample mono PCM16 from `from_rate` to `to_rate`
///
/// Output length is `round(len * to / from)`. Samples past the end of the
/// input hold the last value.
pub fn resample_linear(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let step = from_rate as f64 / to_rate as f64;
    let new_len = (samples.len() as f64 * to_rate as f64 / from_rate as f64).round() as usize;
    let last = samples.len() - 1;

    let mut resampled = Vec::with_capacity(new_len);
    for i in 0..new_len {
        let src_idx = i as f64 * step;
        let idx_floor = src_idx.floor() as usize;
        if idx_floor >= last {
            resampled.push(samples[last]);
            continue;
        }
        let frac = src_idx - idx_floor as f64;
        let a = samples[idx_floor] as f64;
        let b = samples[idx_floor + 1] as f64;
        resampled.push((a + (b - a) * frac).round() as i16);
    }
    resampled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<i16> {
        (0..len).map(|i| (i as i16) * 100 - 8000).collect()
    }

    #[test]
    fn test_identity_rate() {
        let input = ramp(50);
        assert_eq!(resample_linear(&input, 8000, 8000), input);
    }

    #[test]
    fn test_upsample_interpolates_midpoints() {
        let out = resample_linear(&[0, 100, 200], 8000, 16000);
        assert_eq!(out, vec![0, 50, 100, 150, 200, 200]);
    }

    #[test]
    fn test_there_and_back_keeps_length_and_trend() {
        let input = ramp(160);
        let up = resample_linear(&input, 8000, 16000);
        assert_eq!(up.len(), 320);
        let down = resample_linear(&up, 16000, 8000);
        assert_eq!(down.len(), input.len());
        for (a, b) in input.iter().zip(down.iter()) {
            assert!((*a as i32 - *b as i32).abs() <= 1);
        }
    }

    #[test]
    fn test_odd_ratio_length_rounds() {
        let input = vec![1000i16; 441];
        let out = resample_linear(&input, 22050, 16000);
        assert_eq!(out.len(), 320);
        assert!(out.iter().all(|&s| s == 1000));
    }
}
