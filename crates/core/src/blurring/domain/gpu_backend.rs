use thiserror::Error;

#[derive(Error, Debug)]
pub enum GpuError {
    #[error("no suitable GPU adapter available")]
    NoAdapter,
    #[error("failed to create GPU device: {0}")]
    DeviceRequest(String),
    #[error("shader program '{label}' failed to compile: {message}")]
    ShaderCompile { label: String, message: String },
    #[error("framebuffer is incomplete: {0}")]
    IncompleteFramebuffer(String),
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },
    #[error("unsupported texture size {width}x{height} (max {max})")]
    UnsupportedSize { width: u32, height: u32, max: u32 },
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("failed to read back rendered pixels: {0}")]
    Readback(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Source for a vertex/fragment program pair.
///
/// Vertex inputs are `@location(0)` position and `@location(1)` texcoord,
/// both `vec2<f32>`; entry points are `vs_main` and `fs_main`. The fragment
/// stage reads binding 0 (uniforms) and binding 1 (source texture).
#[derive(Debug, Clone, Copy)]
pub struct ShaderSource<'a> {
    pub label: &'a str,
    pub wgsl: &'a str,
}

/// Where a draw call writes: an off-screen framebuffer or the output surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Framebuffer(FramebufferId),
    Surface,
}

/// Uniform block of the blur program (32 bytes, std140-compatible).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurUniforms {
    pub resolution: [f32; 2],
    pub direction: [f32; 2],
    pub radius: f32,
    pub _pad: [f32; 3],
}

impl BlurUniforms {
    pub fn horizontal(width: u32, height: u32, radius: u32) -> Self {
        Self::new(width, height, [1.0, 0.0], radius)
    }

    pub fn vertical(width: u32, height: u32, radius: u32) -> Self {
        Self::new(width, height, [0.0, 1.0], radius)
    }

    fn new(width: u32, height: u32, direction: [f32; 2], radius: u32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            direction,
            radius: radius as f32,
            _pad: [0.0; 3],
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.direction[0] != 0.0
    }
}

/// One full-viewport draw of `program` sampling `source` into `target`.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall {
    pub program: ProgramId,
    pub positions: BufferId,
    pub texcoords: BufferId,
    pub source: TextureId,
    pub target: RenderTarget,
    pub uniforms: BlurUniforms,
}

/// Handle-based GPU operations the blur filter is written against.
///
/// Every `create_*`/`compile_*` hands out a handle the caller owns and must
/// release with the matching `delete_*`; the backend never frees them on its
/// own. Deleting an unknown handle is a no-op. All textures are RGBA8 and
/// framebuffers must match the surface size.
pub trait GpuBackend: Send {
    /// Human-readable adapter/backend name for logs.
    fn describe(&self) -> String;

    /// Resizes the output surface that `RenderTarget::Surface` draws into.
    fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), GpuError>;

    fn compile_program(&mut self, source: &ShaderSource<'_>) -> Result<ProgramId, GpuError>;

    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, GpuError>;

    fn create_framebuffer(&mut self, color: TextureId) -> Result<FramebufferId, GpuError>;

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<BufferId, GpuError>;

    /// Replaces the full contents of `texture` with tightly packed RGBA8 rows.
    fn upload_texture(&mut self, texture: TextureId, pixels: &[u8]) -> Result<(), GpuError>;

    fn draw(&mut self, call: &DrawCall) -> Result<(), GpuError>;

    /// Copies the output surface into `out` (tightly packed RGBA8). Blocks
    /// until every previously submitted draw has finished.
    fn read_surface(&mut self, out: &mut [u8]) -> Result<(), GpuError>;

    fn delete_program(&mut self, id: ProgramId);

    fn delete_texture(&mut self, id: TextureId);

    fn delete_framebuffer(&mut self, id: FramebufferId);

    fn delete_buffer(&mut self, id: BufferId);
}
