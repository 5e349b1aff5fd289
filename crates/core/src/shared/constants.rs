/// Default upper bound for the blur radius; `intensity` scales within it.
pub const DEFAULT_MAX_BLUR_RADIUS: u32 = 3;

/// Half-width of the blur shader's sampling window (41 taps: -20..=20).
pub const BLUR_TAP_RADIUS: i32 = 20;

pub const BLUR_TAP_COUNT: usize = (BLUR_TAP_RADIUS as usize) * 2 + 1;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
