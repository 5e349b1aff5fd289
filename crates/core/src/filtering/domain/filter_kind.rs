use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of filters the compositor knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Grayscale,
    Sepia,
    Blur,
    Invert,
}

impl FilterKind {
    /// Registration order. Later filters see the output of earlier ones.
    pub const ALL: [FilterKind; 4] = [
        FilterKind::Grayscale,
        FilterKind::Sepia,
        FilterKind::Blur,
        FilterKind::Invert,
    ];

    /// Position of this kind in [`FilterKind::ALL`].
    pub fn slot(self) -> usize {
        match self {
            FilterKind::Grayscale => 0,
            FilterKind::Sepia => 1,
            FilterKind::Blur => 2,
            FilterKind::Invert => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Grayscale => "grayscale",
            FilterKind::Sepia => "sepia",
            FilterKind::Blur => "blur",
            FilterKind::Invert => "invert",
        }
    }

    /// Whether this filter needs the GPU backend.
    pub fn is_gpu(self) -> bool {
        matches!(self, FilterKind::Blur)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown filter '{s}', expected one of: grayscale, sepia, blur, invert")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_registration_order() {
        assert_eq!(
            FilterKind::ALL,
            [
                FilterKind::Grayscale,
                FilterKind::Sepia,
                FilterKind::Blur,
                FilterKind::Invert
            ]
        );
    }

    #[test]
    fn test_slots_match_registration_order() {
        for (i, kind) in FilterKind::ALL.iter().enumerate() {
            assert_eq!(kind.slot(), i);
        }
    }

    #[rstest]
    #[case("grayscale", FilterKind::Grayscale)]
    #[case("Sepia", FilterKind::Sepia)]
    #[case(" blur ", FilterKind::Blur)]
    #[case("INVERT", FilterKind::Invert)]
    fn test_parse(#[case] input: &str, #[case] expected: FilterKind) {
        assert_eq!(input.parse::<FilterKind>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_fails() {
        let err = "vignette".parse::<FilterKind>().unwrap_err();
        assert!(err.contains("vignette"));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for kind in FilterKind::ALL {
            assert_eq!(kind.to_string().parse::<FilterKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_only_blur_needs_gpu() {
        let gpu: Vec<_> = FilterKind::ALL.into_iter().filter(|k| k.is_gpu()).collect();
        assert_eq!(gpu, vec![FilterKind::Blur]);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&FilterKind::Grayscale).unwrap();
        assert_eq!(json, "\"grayscale\"");
    }
}
