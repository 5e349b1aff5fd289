use thiserror::Error;

use crate::blurring::domain::blur_kernel::radius_for;
use crate::blurring::domain::gpu_backend::{
    BlurUniforms, BufferId, DrawCall, FramebufferId, GpuBackend, GpuError, ProgramId,
    RenderTarget, ShaderSource, TextureId,
};
use crate::filtering::domain::intensity::Intensity;
use crate::shared::frame::FrameBuffer;

pub const BLUR_SHADER: ShaderSource<'static> = ShaderSource {
    label: "separable-blur",
    wgsl: include_str!("shaders/separable_blur.wgsl"),
};

/// Full-viewport quad as a triangle strip.
pub const QUAD_POSITIONS: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

/// Texture coordinates for [`QUAD_POSITIONS`]; v grows downward so row 0
/// of the texture lands on the top row of the target.
pub const QUAD_TEXCOORDS: [f32; 8] = [0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];

#[derive(Error, Debug)]
#[error("blur setup failed while {step}: {source}")]
pub struct BlurSetupError {
    pub step: &'static str,
    #[source]
    pub source: GpuError,
}

#[derive(Error, Debug)]
pub enum BlurError {
    #[error("apply called before any source frame was uploaded")]
    NoSource,
    #[error("output requested before a blur pass was rendered")]
    NothingRendered,
    #[error("blur resources already released")]
    Released,
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Result of [`GpuBlurFilter::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurPass {
    /// Radius rounded down to 0; the source passes through unmodified.
    Skipped,
    Rendered { radius: u32 },
}

/// GPU handles owned by one blur filter.
struct GpuBlurState {
    program: ProgramId,
    source_texture: TextureId,
    target_texture: TextureId,
    framebuffer: FramebufferId,
    positions: BufferId,
    texcoords: BufferId,
}

/// Handles created so far during setup, released if a later step fails.
#[derive(Default)]
struct PartialState {
    program: Option<ProgramId>,
    source_texture: Option<TextureId>,
    target_texture: Option<TextureId>,
    framebuffer: Option<FramebufferId>,
    positions: Option<BufferId>,
    texcoords: Option<BufferId>,
}

impl PartialState {
    fn release(self, backend: &mut dyn GpuBackend) {
        if let Some(id) = self.framebuffer {
            backend.delete_framebuffer(id);
        }
        if let Some(id) = self.target_texture {
            backend.delete_texture(id);
        }
        if let Some(id) = self.source_texture {
            backend.delete_texture(id);
        }
        if let Some(id) = self.positions {
            backend.delete_buffer(id);
        }
        if let Some(id) = self.texcoords {
            backend.delete_buffer(id);
        }
        if let Some(id) = self.program {
            backend.delete_program(id);
        }
    }
}

impl GpuBlurState {
    fn create(
        backend: &mut dyn GpuBackend,
        width: u32,
        height: u32,
    ) -> Result<Self, BlurSetupError> {
        let mut partial = PartialState::default();
        match Self::build(&mut partial, backend, width, height) {
            Ok(state) => Ok(state),
            Err(e) => {
                partial.release(backend);
                Err(e)
            }
        }
    }

    fn build(
        partial: &mut PartialState,
        backend: &mut dyn GpuBackend,
        width: u32,
        height: u32,
    ) -> Result<Self, BlurSetupError> {
        let step = |step: &'static str| move |source: GpuError| BlurSetupError { step, source };

        backend
            .resize_surface(width, height)
            .map_err(step("sizing the output surface"))?;
        let program = *partial.program.insert(
            backend
                .compile_program(&BLUR_SHADER)
                .map_err(step("compiling the blur program"))?,
        );
        let source_texture = *partial.source_texture.insert(
            backend
                .create_texture(width, height)
                .map_err(step("creating the source texture"))?,
        );
        let target_texture = *partial.target_texture.insert(
            backend
                .create_texture(width, height)
                .map_err(step("creating the ping-pong texture"))?,
        );
        let framebuffer = *partial.framebuffer.insert(
            backend
                .create_framebuffer(target_texture)
                .map_err(step("creating the framebuffer"))?,
        );
        let positions = *partial.positions.insert(
            backend
                .create_vertex_buffer(&QUAD_POSITIONS)
                .map_err(step("creating the quad buffer"))?,
        );
        let texcoords = *partial.texcoords.insert(
            backend
                .create_vertex_buffer(&QUAD_TEXCOORDS)
                .map_err(step("creating the texcoord buffer"))?,
        );

        Ok(Self {
            program,
            source_texture,
            target_texture,
            framebuffer,
            positions,
            texcoords,
        })
    }

    fn release(self, backend: &mut dyn GpuBackend) {
        backend.delete_framebuffer(self.framebuffer);
        backend.delete_texture(self.target_texture);
        backend.delete_texture(self.source_texture);
        backend.delete_buffer(self.positions);
        backend.delete_buffer(self.texcoords);
        backend.delete_program(self.program);
    }
}

struct LiveBlur {
    backend: Box<dyn GpuBackend>,
    state: GpuBlurState,
}

/// Two-pass separable Gaussian blur rendered through a [`GpuBackend`].
///
/// The filter does not fetch frames itself: call [`update_source`] whenever
/// the frame changed, then [`apply`], then read the result with [`output`].
/// Every GPU handle is released exactly once, by [`dispose`] or on drop.
/// The maximum radius is fixed for the filter's lifetime; a new radius or
/// resolution means disposing and constructing a new filter.
///
/// [`update_source`]: GpuBlurFilter::update_source
/// [`apply`]: GpuBlurFilter::apply
/// [`output`]: GpuBlurFilter::output
/// [`dispose`]: GpuBlurFilter::dispose
pub struct GpuBlurFilter {
    live: Option<LiveBlur>,
    width: u32,
    height: u32,
    max_radius: u32,
    source_uploaded: bool,
    rendered: bool,
}

impl GpuBlurFilter {
    pub fn new(
        mut backend: Box<dyn GpuBackend>,
        width: u32,
        height: u32,
        max_radius: u32,
    ) -> Result<Self, BlurSetupError> {
        let state = GpuBlurState::create(backend.as_mut(), width, height)?;
        log::debug!(
            "Blur filter ready on {} ({width}x{height}, max radius {max_radius})",
            backend.describe()
        );
        Ok(Self {
            live: Some(LiveBlur { backend, state }),
            width,
            height,
            max_radius,
            source_uploaded: false,
            rendered: false,
        })
    }

    pub fn max_radius(&self) -> u32 {
        self.max_radius
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn backend_name(&self) -> String {
        self.live
            .as_ref()
            .map(|live| live.backend.describe())
            .unwrap_or_default()
    }

    /// Uploads `frame` as the blur source.
    ///
    /// Panics if `frame` does not match the filter's dimensions.
    pub fn update_source(&mut self, frame: &FrameBuffer) -> Result<(), BlurError> {
        assert_eq!(
            frame.dimensions(),
            (self.width, self.height),
            "blur source must match the filter's dimensions"
        );
        let live = self.live.as_mut().ok_or(BlurError::Released)?;
        live.backend
            .upload_texture(live.state.source_texture, frame.data())?;
        self.source_uploaded = true;
        self.rendered = false;
        Ok(())
    }

    /// Renders the horizontal pass into the framebuffer, then the vertical
    /// pass into the output surface.
    pub fn apply(&mut self, intensity: Intensity) -> Result<BlurPass, BlurError> {
        let radius = radius_for(self.max_radius, intensity);
        if radius == 0 {
            return Ok(BlurPass::Skipped);
        }
        if !self.source_uploaded {
            return Err(BlurError::NoSource);
        }
        let live = self.live.as_mut().ok_or(BlurError::Released)?;
        let state = &live.state;

        live.backend.draw(&DrawCall {
            program: state.program,
            positions: state.positions,
            texcoords: state.texcoords,
            source: state.source_texture,
            target: RenderTarget::Framebuffer(state.framebuffer),
            uniforms: BlurUniforms::horizontal(self.width, self.height, radius),
        })?;
        live.backend.draw(&DrawCall {
            program: state.program,
            positions: state.positions,
            texcoords: state.texcoords,
            source: state.target_texture,
            target: RenderTarget::Surface,
            uniforms: BlurUniforms::vertical(self.width, self.height, radius),
        })?;

        self.rendered = true;
        Ok(BlurPass::Rendered { radius })
    }

    /// Copies the last rendered result into `out`.
    ///
    /// Panics if `out` does not match the filter's dimensions.
    pub fn output(&mut self, out: &mut FrameBuffer) -> Result<(), BlurError> {
        assert_eq!(
            out.dimensions(),
            (self.width, self.height),
            "blur output must match the filter's dimensions"
        );
        if !self.rendered {
            return Err(BlurError::NothingRendered);
        }
        let live = self.live.as_mut().ok_or(BlurError::Released)?;
        live.backend.read_surface(out.data_mut())?;
        Ok(())
    }

    /// Releases every GPU handle and hands the backend back for reuse.
    pub fn dispose(mut self) -> Option<Box<dyn GpuBackend>> {
        self.release()
    }

    fn release(&mut self) -> Option<Box<dyn GpuBackend>> {
        let LiveBlur { mut backend, state } = self.live.take()?;
        state.release(backend.as_mut());
        log::debug!("Blur filter released on {}", backend.describe());
        Some(backend)
    }
}

impl Drop for GpuBlurFilter {
    fn drop(&mut self) {
        self.release();
    }
}
