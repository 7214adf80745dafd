//! Peak-based volume normalization

use voice_gateway_config::constants::audio::PCM16_SCALE;

/// Scale `samples` so the peak lands at `target × gain` of full scale
///
/// The applied factor is the smaller of `gain` and the factor that hits the
/// target peak, and is never above 1.0, so quiet audio is left alone rather
/// than amplified. Silent input is returned unchanged.
pub fn normalize_volume(samples: &[i16], target: f32, gain: f32) -> Vec<i16> {
    let peak = samples
        .iter()
        .map(|&s| (s as i32).unsigned_abs())
        .max()
        .unwrap_or(0);
    if peak == 0 {
        return samples.to_vec();
    }

    let target_peak = PCM16_SCALE * target * gain;
    let scale = gain.min(target_peak / peak as f32).min(1.0);

    samples
        .iter()
        .map(|&s| (s as f32 * scale).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(samples: &[i16]) -> i32 {
        samples.iter().map(|&s| (s as i32).abs()).max().unwrap_or(0)
    }

    #[test]
    fn test_loud_audio_capped_at_target() {
        let input = vec![i16::MIN, i16::MAX, -20000, 20000];
        let out = normalize_volume(&input, 0.8, 0.75);
        let target = (32767.0f32 * 0.8 * 0.75).round() as i32;
        assert!(peak(&out) <= target + 1);
        assert!(peak(&out) >= target - 1);
    }

    #[test]
    fn test_quiet_audio_never_amplified() {
        let input = vec![100i16, -200, 300];
        let out = normalize_volume(&input, 0.8, 0.75);
        // gain 0.75 still applies, but no boost toward the target
        assert_eq!(out, vec![75, -150, 225]);
        let unity = normalize_volume(&input, 0.8, 4.0);
        assert_eq!(unity, input);
    }

    #[test]
    fn test_silence_unchanged() {
        assert_eq!(normalize_volume(&[0, 0, 0], 0.8, 0.75), vec![0, 0, 0]);
        assert!(normalize_volume(&[], 0.8, 0.75).is_empty());
    }
}
