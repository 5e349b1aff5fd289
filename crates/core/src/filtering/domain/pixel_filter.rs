use crate::shared::frame::{FrameBuffer, CHANNELS};

use super::filter_kind::FilterKind;
use super::intensity::Intensity;

/// Stateless per-pixel filters that run directly on an RGBA frame.
///
/// Each variant computes a fully-filtered color per pixel and blends it
/// with the original by `intensity`, independently per color channel.
/// Alpha is never touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFilter {
    Grayscale,
    Sepia,
    Invert,
}

impl PixelFilter {
    /// The CPU filter for `kind`, or `None` for GPU-only kinds.
    pub fn for_kind(kind: FilterKind) -> Option<Self> {
        match kind {
            FilterKind::Grayscale => Some(PixelFilter::Grayscale),
            FilterKind::Sepia => Some(PixelFilter::Sepia),
            FilterKind::Invert => Some(PixelFilter::Invert),
            FilterKind::Blur => None,
        }
    }

    pub fn kind(self) -> FilterKind {
        match self {
            PixelFilter::Grayscale => FilterKind::Grayscale,
            PixelFilter::Sepia => FilterKind::Sepia,
            PixelFilter::Invert => FilterKind::Invert,
        }
    }

    /// Applies the filter in place. Intensity 0 returns without writing.
    pub fn apply(self, frame: &mut FrameBuffer, intensity: Intensity) {
        if !intensity.is_active() {
            return;
        }
        let t = intensity.value();
        for px in frame.data_mut().chunks_exact_mut(CHANNELS) {
            let r = px[0] as f32;
            let g = px[1] as f32;
            let b = px[2] as f32;
            let full = self.transform(r, g, b);
            px[0] = blend(r, full[0], t);
            px[1] = blend(g, full[1], t);
            px[2] = blend(b, full[2], t);
        }
    }

    /// Fully-filtered color for one pixel, before blending.
    pub fn transform(self, r: f32, g: f32, b: f32) -> [f32; 3] {
        match self {
            PixelFilter::Grayscale => {
                let luma = (r + g + b) / 3.0;
                [luma, luma, luma]
            }
            PixelFilter::Sepia => [
                (0.393 * r + 0.769 * g + 0.189 * b).min(255.0),
                (0.349 * r + 0.686 * g + 0.168 * b).min(255.0),
                (0.272 * r + 0.534 * g + 0.131 * b).min(255.0),
            ],
            PixelFilter::Invert => [255.0 - r, 255.0 - g, 255.0 - b],
        }
    }
}

/// `original * (1 - t) + filtered * t`, rounded to the nearest byte.
fn blend(original: f32, filtered: f32, t: f32) -> u8 {
    (original * (1.0 - t) + filtered * t).round().clamp(0.0, 255.0) as u8
}
