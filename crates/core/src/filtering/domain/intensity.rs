use serde::{Deserialize, Serialize};

/// Blend factor between an original pixel (0.0) and the fully filtered one (1.0).
///
/// Always within `[0, 1]`: out-of-range inputs are clamped and NaN becomes 0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Intensity(f32);

impl Intensity {
    pub const OFF: Intensity = Intensity(0.0);
    pub const FULL: Intensity = Intensity(1.0);

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::OFF;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn is_active(self) -> bool {
        self.0 > 0.0
    }

    pub fn is_full(self) -> bool {
        self.0 >= 1.0
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self::FULL
    }
}

impl From<f32> for Intensity {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Intensity> for f32 {
    fn from(intensity: Intensity) -> Self {
        intensity.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::below_zero(-0.5, 0.0)]
    #[case::zero(0.0, 0.0)]
    #[case::mid(0.25, 0.25)]
    #[case::one(1.0, 1.0)]
    #[case::above_one(3.0, 1.0)]
    #[case::infinite(f32::INFINITY, 1.0)]
    #[case::nan(f32::NAN, 0.0)]
    fn test_clamping(#[case] input: f32, #[case] expected: f32) {
        assert_relative_eq!(Intensity::new(input).value(), expected);
    }

    #[test]
    fn test_active_and_full() {
        assert!(!Intensity::OFF.is_active());
        assert!(Intensity::new(0.01).is_active());
        assert!(Intensity::FULL.is_full());
        assert!(!Intensity::new(0.99).is_full());
    }

    #[test]
    fn test_default_is_full() {
        assert_eq!(Intensity::default(), Intensity::FULL);
    }

    #[test]
    fn test_deserialize_clamps() {
        let intensity: Intensity = serde_json::from_str("1.5").unwrap();
        assert_relative_eq!(intensity.value(), 1.0);
    }
}
