use crate::filtering::domain::intensity::Intensity;
use crate::shared::constants::{BLUR_TAP_COUNT, BLUR_TAP_RADIUS};

/// Blur radius for a given intensity: `floor(max_radius * intensity)`.
///
/// A result of 0 means the blur is a pass-through.
pub fn radius_for(max_radius: u32, intensity: Intensity) -> u32 {
    (max_radius as f32 * intensity.value()).floor() as u32
}

/// Normalized weights for the fixed 41-tap window (offsets -20..=20).
///
/// Tap `i` gets `exp(-i² / (2·radius²))`. The window width never changes
/// with radius, so per-pixel cost is constant; radii whose true Gaussian
/// support exceeds the window are approximated. `radius` must be > 0.
pub fn tap_weights(radius: u32) -> [f32; BLUR_TAP_COUNT] {
    debug_assert!(radius > 0, "blur radius must be positive");
    let sigma = radius as f64;
    let mut weights_f64 = [0.0f64; BLUR_TAP_COUNT];
    for (k, w) in weights_f64.iter_mut().enumerate() {
        let x = k as f64 - BLUR_TAP_RADIUS as f64;
        *w = (-x * x / (2.0 * sigma * sigma)).exp();
    }
    let sum: f64 = weights_f64.iter().sum();
    let mut weights = [0.0f32; BLUR_TAP_COUNT];
    for (w, &v) in weights.iter_mut().zip(weights_f64.iter()) {
        *w = (v / sum) as f32;
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::off(3, 0.0, 0)]
    #[case::below_one_tap(3, 0.3, 0)]
    #[case::one(3, 0.34, 1)]
    #[case::full(3, 1.0, 3)]
    #[case::large(40, 0.5, 20)]
    #[case::zero_max(0, 1.0, 0)]
    fn test_radius_for(#[case] max: u32, #[case] intensity: f32, #[case] expected: u32) {
        assert_eq!(radius_for(max, Intensity::new(intensity)), expected);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(20)]
    #[case(100)]
    fn test_weights_sum_to_one(#[case] radius: u32) {
        let sum: f32 = tap_weights(radius).iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_weights_are_symmetric() {
        let w = tap_weights(5);
        for i in 0..w.len() / 2 {
            assert_relative_eq!(w[i], w[w.len() - 1 - i], epsilon = 1e-7);
        }
    }

    #[test]
    fn test_center_is_largest() {
        let w = tap_weights(4);
        let center = w[BLUR_TAP_RADIUS as usize];
        assert!(w.iter().all(|&v| v <= center));
    }

    #[test]
    fn test_window_is_fixed_width() {
        assert_eq!(tap_weights(1).len(), 41);
        assert_eq!(tap_weights(500).len(), 41);
    }

    #[test]
    fn test_huge_radius_flattens_toward_box() {
        let w = tap_weights(10_000);
        let expected = 1.0 / 41.0;
        for v in w {
            assert_relative_eq!(v, expected, epsilon = 1e-4);
        }
    }
}
