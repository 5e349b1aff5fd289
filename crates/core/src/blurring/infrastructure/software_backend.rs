use std::collections::{HashMap, HashSet};

use crate::blurring::domain::blur_kernel::tap_weights;
use crate::blurring::domain::gpu_backend::{
    BufferId, DrawCall, FramebufferId, GpuBackend, GpuError, ProgramId, RenderTarget,
    ShaderSource, TextureId,
};
use crate::shared::constants::{BLUR_TAP_COUNT, BLUR_TAP_RADIUS};
use crate::shared::frame::{byte_len, CHANNELS};

/// Largest texture edge the software rasterizer accepts.
const MAX_TEXTURE_DIMENSION: u32 = 16_384;

const REQUIRED_ENTRY_POINTS: [&str; 2] = ["fn vs_main", "fn fs_main"];

struct SoftTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// CPU rasterizer for the blur program.
///
/// Executes draw calls with the same 41-tap math, clamp-to-edge addressing
/// and 8-bit intermediate storage as the WGSL shader, so the blur filter can
/// run where no GPU adapter exists. Handle bookkeeping follows the same
/// create/delete contract as the wgpu backend.
pub struct SoftwareBackend {
    next_id: u32,
    surface: SoftTexture,
    programs: HashSet<u32>,
    textures: HashMap<u32, SoftTexture>,
    framebuffers: HashMap<u32, TextureId>,
    buffers: HashMap<u32, Vec<f32>>,
    weights: Option<(u32, [f32; BLUR_TAP_COUNT])>,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            surface: SoftTexture {
                width: 0,
                height: 0,
                pixels: Vec::new(),
            },
            programs: HashSet::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            buffers: HashMap::new(),
            weights: None,
        }
    }

    /// Number of programs, textures, framebuffers and buffers not yet deleted.
    pub fn live_handle_count(&self) -> usize {
        self.programs.len() + self.textures.len() + self.framebuffers.len() + self.buffers.len()
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn weights_for(&mut self, radius: u32) -> [f32; BLUR_TAP_COUNT] {
        match self.weights {
            Some((cached, weights)) if cached == radius => weights,
            _ => {
                let weights = tap_weights(radius.max(1));
                self.weights = Some((radius, weights));
                weights
            }
        }
    }

    fn check_size(width: u32, height: u32) -> Result<(), GpuError> {
        if width == 0
            || height == 0
            || width > MAX_TEXTURE_DIMENSION
            || height > MAX_TEXTURE_DIMENSION
        {
            return Err(GpuError::UnsupportedSize {
                width,
                height,
                max: MAX_TEXTURE_DIMENSION,
            });
        }
        Ok(())
    }

    fn target_texture(&mut self, target: RenderTarget) -> Result<&mut SoftTexture, GpuError> {
        match target {
            RenderTarget::Surface => Ok(&mut self.surface),
            RenderTarget::Framebuffer(fb) => {
                let texture = *self.framebuffers.get(&fb.0).ok_or(GpuError::UnknownHandle {
                    kind: "framebuffer",
                    id: fb.0,
                })?;
                self.textures
                    .get_mut(&texture.0)
                    .ok_or_else(|| {
                        GpuError::IncompleteFramebuffer(format!(
                            "color texture {} of framebuffer {} was deleted",
                            texture.0, fb.0
                        ))
                    })
            }
        }
    }
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for SoftwareBackend {
    fn describe(&self) -> String {
        "software rasterizer".to_string()
    }

    fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        Self::check_size(width, height)?;
        if (self.surface.width, self.surface.height) != (width, height) {
            self.surface = SoftTexture {
                width,
                height,
                pixels: vec![0; byte_len(width, height)],
            };
        }
        Ok(())
    }

    fn compile_program(&mut self, source: &ShaderSource<'_>) -> Result<ProgramId, GpuError> {
        if let Some(missing) = REQUIRED_ENTRY_POINTS
            .iter()
            .find(|entry| !source.wgsl.contains(*entry))
        {
            return Err(GpuError::ShaderCompile {
                label: source.label.to_string(),
                message: format!(
                    "missing entry point `{}`",
                    missing.trim_start_matches("fn ")
                ),
            });
        }
        let id = self.allocate_id();
        self.programs.insert(id);
        Ok(ProgramId(id))
    }

    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, GpuError> {
        Self::check_size(width, height)?;
        let id = self.allocate_id();
        self.textures.insert(
            id,
            SoftTexture {
                width,
                height,
                pixels: vec![0; byte_len(width, height)],
            },
        );
        Ok(TextureId(id))
    }

    fn create_framebuffer(&mut self, color: TextureId) -> Result<FramebufferId, GpuError> {
        let texture = self.textures.get(&color.0).ok_or(GpuError::UnknownHandle {
            kind: "texture",
            id: color.0,
        })?;
        if (texture.width, texture.height) != (self.surface.width, self.surface.height) {
            return Err(GpuError::IncompleteFramebuffer(format!(
                "attachment is {}x{} but surface is {}x{}",
                texture.width, texture.height, self.surface.width, self.surface.height
            )));
        }
        let id = self.allocate_id();
        self.framebuffers.insert(id, color);
        Ok(FramebufferId(id))
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<BufferId, GpuError> {
        let id = self.allocate_id();
        self.buffers.insert(id, data.to_vec());
        Ok(BufferId(id))
    }

    fn upload_texture(&mut self, texture: TextureId, pixels: &[u8]) -> Result<(), GpuError> {
        let tex = self
            .textures
            .get_mut(&texture.0)
            .ok_or(GpuError::UnknownHandle {
                kind: "texture",
                id: texture.0,
            })?;
        if pixels.len() != tex.pixels.len() {
            return Err(GpuError::SizeMismatch {
                expected: tex.pixels.len(),
                actual: pixels.len(),
            });
        }
        tex.pixels.copy_from_slice(pixels);
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), GpuError> {
        if !self.programs.contains(&call.program.0) {
            return Err(GpuError::UnknownHandle {
                kind: "program",
                id: call.program.0,
            });
        }
        for buffer in [call.positions, call.texcoords] {
            if !self.buffers.contains_key(&buffer.0) {
                return Err(GpuError::UnknownHandle {
                    kind: "buffer",
                    id: buffer.0,
                });
            }
        }

        let weights = self.weights_for(call.uniforms.radius as u32);
        let horizontal = call.uniforms.is_horizontal();

        // The source is copied out so the target can be borrowed mutably.
        let (src_width, src_height, src_pixels) = {
            let src = self.textures.get(&call.source.0).ok_or(GpuError::UnknownHandle {
                kind: "texture",
                id: call.source.0,
            })?;
            (src.width, src.height, src.pixels.clone())
        };

        let target = self.target_texture(call.target)?;
        if (target.width, target.height) != (src_width, src_height) {
            return Err(GpuError::SizeMismatch {
                expected: target.pixels.len(),
                actual: src_pixels.len(),
            });
        }

        convolve_axis(
            &src_pixels,
            &mut target.pixels,
            src_width as usize,
            src_height as usize,
            horizontal,
            &weights,
        );
        Ok(())
    }

    fn read_surface(&mut self, out: &mut [u8]) -> Result<(), GpuError> {
        if out.len() != self.surface.pixels.len() {
            return Err(GpuError::SizeMismatch {
                expected: self.surface.pixels.len(),
                actual: out.len(),
            });
        }
        out.copy_from_slice(&self.surface.pixels);
        Ok(())
    }

    fn delete_program(&mut self, id: ProgramId) {
        self.programs.remove(&id.0);
    }

    fn delete_texture(&mut self, id: TextureId) {
        self.textures.remove(&id.0);
    }

    fn delete_framebuffer(&mut self, id: FramebufferId) {
        self.framebuffers.remove(&id.0);
    }

    fn delete_buffer(&mut self, id: BufferId) {
        self.buffers.remove(&id.0);
    }
}

/// One blur axis over RGBA8 data with clamp-to-edge sampling.
///
/// Color channels are convolved; alpha is copied from the center tap.
fn convolve_axis(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
    horizontal: bool,
    weights: &[f32; BLUR_TAP_COUNT],
) {
    let max_x = width as isize - 1;
    let max_y = height as isize - 1;
    for y in 0..height {
        for x in 0..width {
            let mut sum = [0.0f32; 3];
            for (k, &w) in weights.iter().enumerate() {
                let offset = k as isize - BLUR_TAP_RADIUS as isize;
                let (sx, sy) = if horizontal {
                    ((x as isize + offset).clamp(0, max_x), y as isize)
                } else {
                    (x as isize, (y as isize + offset).clamp(0, max_y))
                };
                let i = (sy as usize * width + sx as usize) * CHANNELS;
                for (c, acc) in sum.iter_mut().enumerate() {
                    *acc += src[i + c] as f32 * w;
                }
            }
            let o = (y * width + x) * CHANNELS;
            for (c, acc) in sum.iter().enumerate() {
                dst[o + c] = acc.round().clamp(0.0, 255.0) as u8;
            }
            dst[o + 3] = src[o + 3];
        }
    }
}
