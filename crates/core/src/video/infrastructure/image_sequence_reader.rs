use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::FrameBuffer;
use crate::video::domain::frame_source::FrameSource;

/// Returns true if `path` ends in one of the supported image extensions.
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reads a single image, or every image in a directory in file-name order,
/// as a sequence of RGBA frames.
///
/// A directory of numbered frames stands in for a live stream. Frames are
/// decoded lazily, one per [`next_frame`](FrameSource::next_frame) call.
pub struct ImageSequenceReader {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequenceReader {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let paths = if path.is_dir() {
            let mut paths = Vec::new();
            for entry in std::fs::read_dir(path)? {
                let entry = entry.map_err(|e| {
                    format!("Failed to list {}: {e}", path.display())
                })?;
                let candidate = entry.path();
                if candidate.is_file() && has_image_extension(&candidate) {
                    paths.push(candidate);
                }
            }
            paths.sort();
            if paths.is_empty() {
                return Err(format!("No image files found in {}", path.display()).into());
            }
            paths
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(format!("Input not found: {}", path.display()).into());
        };
        log::info!("Opened {} with {} frame(s)", path.display(), paths.len());
        Ok(Self { paths, next: 0 })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Dimensions of the first frame, read from its header without decoding.
    pub fn first_dimensions(&self) -> Result<(u32, u32), Box<dyn std::error::Error>> {
        let first = self.paths.first().ok_or("Image sequence is empty")?;
        Ok(image::image_dimensions(first)?)
    }
}

impl FrameSource for ImageSequenceReader {
    fn next_frame(&mut self) -> Option<Result<FrameBuffer, Box<dyn std::error::Error>>> {
        let index = self.next;
        let path = self.paths.get(index)?;
        self.next += 1;
        let result: Result<FrameBuffer, Box<dyn std::error::Error>> = image::open(path)
            .map(|img| {
                let rgba = img.to_rgba8();
                let (width, height) = rgba.dimensions();
                FrameBuffer::new(rgba.into_raw(), width, height, index)
            })
            .map_err(|e| format!("Failed to read {}: {e}", path.display()).into());
        Some(result)
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.paths.len())
    }
}
