use serde::{Deserialize, Serialize};

use super::filter_kind::FilterKind;
use super::intensity::Intensity;

/// Configuration of one filter: which effect, how strong, and for blur the
/// maximum radius that `intensity` scales within.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterKind,
    #[serde(default)]
    pub intensity: Intensity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur_radius: Option<u32>,
}

impl FilterSpec {
    pub fn new(kind: FilterKind, intensity: impl Into<Intensity>) -> Self {
        Self {
            kind,
            intensity: intensity.into(),
            blur_radius: None,
        }
    }

    pub fn blur(intensity: impl Into<Intensity>, max_radius: u32) -> Self {
        Self {
            kind: FilterKind::Blur,
            intensity: intensity.into(),
            blur_radius: Some(max_radius),
        }
    }

    /// An inert spec leaves every frame byte-identical.
    pub fn is_inert(&self) -> bool {
        !self.intensity.is_active()
    }
}
