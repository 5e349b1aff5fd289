//! Real-time filter compositing: per-pixel color filters and a GPU
//! separable blur, composited in a fixed order onto RGBA frames.

pub mod blurring;
pub mod compositing;
pub mod filtering;
pub mod pipeline;
pub mod shared;
pub mod video;
