//! Recording [`GpuBackend`] wrapper used by tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::blurring::domain::gpu_backend::{
    BufferId, DrawCall, FramebufferId, GpuBackend, GpuError, ProgramId, RenderTarget,
    ShaderSource, TextureId,
};
use crate::blurring::infrastructure::software_backend::SoftwareBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Handle {
    Program(u32),
    Texture(u32),
    Framebuffer(u32),
    Buffer(u32),
}

/// Everything a [`CountingBackend`] has been asked to do.
#[derive(Debug, Default)]
pub struct BackendCounts {
    pub surface_resizes: usize,
    pub programs_created: usize,
    pub textures_created: usize,
    pub framebuffers_created: usize,
    pub buffers_created: usize,
    pub uploads: usize,
    /// One entry per draw: (horizontal, targets the surface).
    pub draws: Vec<(bool, bool)>,
    pub reads: usize,
    pub deletes: usize,
    pub double_deletes: usize,
    live: HashSet<Handle>,
}

impl BackendCounts {
    /// Handles created and not yet deleted.
    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Every call that touches GPU state beyond setup.
    pub fn frame_calls(&self) -> usize {
        self.uploads + self.draws.len() + self.reads
    }

    fn created(&mut self, handle: Handle) {
        self.live.insert(handle);
    }

    fn deleted(&mut self, handle: Handle) {
        self.deletes += 1;
        if !self.live.remove(&handle) {
            self.double_deletes += 1;
        }
    }
}

/// Software backend that records every call into shared counters.
pub struct CountingBackend {
    inner: SoftwareBackend,
    counts: Arc<Mutex<BackendCounts>>,
    fail_compile: bool,
    fail_framebuffers: bool,
    fail_draws: bool,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self {
            inner: SoftwareBackend::new(),
            counts: Arc::new(Mutex::new(BackendCounts::default())),
            fail_compile: false,
            fail_framebuffers: false,
            fail_draws: false,
        }
    }

    pub fn counts(&self) -> Arc<Mutex<BackendCounts>> {
        Arc::clone(&self.counts)
    }

    pub fn fail_compile(mut self) -> Self {
        self.fail_compile = true;
        self
    }

    pub fn fail_framebuffers(mut self) -> Self {
        self.fail_framebuffers = true;
        self
    }

    pub fn fail_draws(mut self) -> Self {
        self.fail_draws = true;
        self
    }

    fn record<T>(&self, f: impl FnOnce(&mut BackendCounts) -> T) -> T {
        let mut counts = self.counts.lock().unwrap();
        f(&mut counts)
    }
}

impl GpuBackend for CountingBackend {
    fn describe(&self) -> String {
        "counting backend".to_string()
    }

    fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        self.record(|c| c.surface_resizes += 1);
        self.inner.resize_surface(width, height)
    }

    fn compile_program(&mut self, source: &ShaderSource<'_>) -> Result<ProgramId, GpuError> {
        if self.fail_compile {
            return Err(GpuError::ShaderCompile {
                label: source.label.to_string(),
                message: "forced failure".to_string(),
            });
        }
        let id = self.inner.compile_program(source)?;
        self.record(|c| {
            c.programs_created += 1;
            c.created(Handle::Program(id.0));
        });
        Ok(id)
    }

    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, GpuError> {
        let id = self.inner.create_texture(width, height)?;
        self.record(|c| {
            c.textures_created += 1;
            c.created(Handle::Texture(id.0));
        });
        Ok(id)
    }

    fn create_framebuffer(&mut self, color: TextureId) -> Result<FramebufferId, GpuError> {
        if self.fail_framebuffers {
            return Err(GpuError::IncompleteFramebuffer("forced failure".to_string()));
        }
        let id = self.inner.create_framebuffer(color)?;
        self.record(|c| {
            c.framebuffers_created += 1;
            c.created(Handle::Framebuffer(id.0));
        });
        Ok(id)
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<BufferId, GpuError> {
        let id = self.inner.create_vertex_buffer(data)?;
        self.record(|c| {
            c.buffers_created += 1;
            c.created(Handle::Buffer(id.0));
        });
        Ok(id)
    }

    fn upload_texture(&mut self, texture: TextureId, pixels: &[u8]) -> Result<(), GpuError> {
        self.record(|c| c.uploads += 1);
        self.inner.upload_texture(texture, pixels)
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), GpuError> {
        self.record(|c| {
            c.draws.push((
                call.uniforms.is_horizontal(),
                call.target == RenderTarget::Surface,
            ))
        });
        if self.fail_draws {
            return Err(GpuError::IncompleteFramebuffer("forced failure".to_string()));
        }
        self.inner.draw(call)
    }

    fn read_surface(&mut self, out: &mut [u8]) -> Result<(), GpuError> {
        self.record(|c| c.reads += 1);
        self.inner.read_surface(out)
    }

    fn delete_program(&mut self, id: ProgramId) {
        self.record(|c| c.deleted(Handle::Program(id.0)));
        self.inner.delete_program(id);
    }

    fn delete_texture(&mut self, id: TextureId) {
        self.record(|c| c.deleted(Handle::Texture(id.0)));
        self.inner.delete_texture(id);
    }

    fn delete_framebuffer(&mut self, id: FramebufferId) {
        self.record(|c| c.deleted(Handle::Framebuffer(id.0)));
        self.inner.delete_framebuffer(id);
    }

    fn delete_buffer(&mut self, id: BufferId) {
        self.record(|c| c.deleted(Handle::Buffer(id.0)));
        self.inner.delete_buffer(id);
    }
}
