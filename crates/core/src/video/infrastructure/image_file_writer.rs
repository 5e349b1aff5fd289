use std::path::{Path, PathBuf};

use crate::shared::frame::FrameBuffer;
use crate::video::domain::frame_sink::FrameSink;
use crate::video::infrastructure::image_sequence_reader::has_image_extension;

/// Writes filtered frames as image files using the `image` crate.
///
/// If the target has an image extension every frame is written to that one
/// path (a still photo); otherwise the target is a directory and frame `n`
/// lands in `frame_0000n.png`.
pub struct ImageFileWriter {
    target: PathBuf,
    written: usize,
}

impl ImageFileWriter {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            written: 0,
        }
    }

    /// Path frame `index` is written to.
    pub fn path_for(&self, index: usize) -> PathBuf {
        if has_image_extension(&self.target) {
            self.target.clone()
        } else {
            self.target.join(format!("frame_{index:05}.png"))
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

fn save_rgba(path: &Path, frame: &FrameBuffer) -> Result<(), Box<dyn std::error::Error>> {
    // Ensure parent directory exists (infrastructure concern)
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let img = image::RgbaImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or("Failed to create image from frame data")?;
    let img = image::DynamicImage::ImageRgba8(img);

    // JPEG has no alpha channel.
    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false);
    if is_jpeg {
        img.to_rgb8().save(path)?;
    } else {
        img.save(path)?;
    }
    Ok(())
}

impl FrameSink for ImageFileWriter {
    fn write(&mut self, frame: &FrameBuffer) -> Result<(), Box<dyn std::error::Error>> {
        let path = self.path_for(frame.index());
        save_rgba(&path, frame)?;
        self.written += 1;
        log::debug!("Wrote frame {} to {}", frame.index(), path.display());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        log::info!("Wrote {} frame(s) to {}", self.written, self.target.display());
        Ok(())
    }
}
