use std::collections::HashMap;
use std::sync::mpsc;

use wgpu::util::DeviceExt;

use crate::blurring::domain::gpu_backend::{
    BlurUniforms, BufferId, DrawCall, FramebufferId, GpuBackend, GpuError, ProgramId,
    RenderTarget, ShaderSource, TextureId,
};
use crate::shared::frame::CHANNELS;

const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Two `vec2<f32>` vertex streams: position at location 0, texcoord at 1.
const VERTEX_STRIDE: wgpu::BufferAddress = (2 * std::mem::size_of::<f32>()) as u64;

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const TEXCOORD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// Output surface plus the staging buffer it is read back through.
struct Surface {
    color: GpuTexture,
    readback: wgpu::Buffer,
    padded_bytes_per_row: u32,
}

/// [`GpuBackend`] on a headless wgpu device.
///
/// Programs become render pipelines, framebuffers are render attachments
/// wrapping an existing texture, and the surface is an off-screen texture
/// read back through a row-padded staging buffer.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    surface: Option<Surface>,
    next_id: u32,
    programs: HashMap<u32, wgpu::RenderPipeline>,
    textures: HashMap<u32, GpuTexture>,
    framebuffers: HashMap<u32, TextureId>,
    buffers: HashMap<u32, wgpu::Buffer>,
}

impl WgpuBackend {
    /// Opens the first high-performance adapter.
    pub fn new() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("camfilter-device"),
                required_features: wgpu::Features::empty(),
                // Full-frame textures need whatever the hardware allows.
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| GpuError::DeviceRequest(e.to_string()))?;

        let info = adapter.get_info();
        let adapter_name = format!("{} ({:?})", info.name, info.backend);
        log::info!("GPU adapter: {adapter_name}");

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blur-bind-group-layout"),
            entries: &[
                // params uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // source texture
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blur-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        Ok(Self {
            device,
            queue,
            adapter_name,
            bind_group_layout,
            pipeline_layout,
            surface: None,
            next_id: 1,
            programs: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            buffers: HashMap::new(),
        })
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Largest surface or texture edge the device accepts.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn check_size(&self, width: u32, height: u32) -> Result<(), GpuError> {
        let max = self.max_texture_dimension();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(GpuError::UnsupportedSize { width, height, max });
        }
        Ok(())
    }

    fn make_texture(&self, label: &str, width: u32, height: u32) -> GpuTexture {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        GpuTexture {
            texture,
            view,
            width,
            height,
        }
    }

    fn surface(&self) -> Result<&Surface, GpuError> {
        self.surface
            .as_ref()
            .ok_or_else(|| GpuError::IncompleteFramebuffer("output surface not sized".into()))
    }

    fn texture(&self, id: TextureId) -> Result<&GpuTexture, GpuError> {
        self.textures.get(&id.0).ok_or(GpuError::UnknownHandle {
            kind: "texture",
            id: id.0,
        })
    }

    fn buffer(&self, id: BufferId) -> Result<&wgpu::Buffer, GpuError> {
        self.buffers.get(&id.0).ok_or(GpuError::UnknownHandle {
            kind: "buffer",
            id: id.0,
        })
    }

    fn target_view(&self, target: RenderTarget) -> Result<&GpuTexture, GpuError> {
        match target {
            RenderTarget::Surface => Ok(&self.surface()?.color),
            RenderTarget::Framebuffer(fb) => {
                let texture = self.framebuffers.get(&fb.0).ok_or(GpuError::UnknownHandle {
                    kind: "framebuffer",
                    id: fb.0,
                })?;
                self.textures.get(&texture.0).ok_or_else(|| {
                    GpuError::IncompleteFramebuffer(format!(
                        "color texture {} of framebuffer {} was deleted",
                        texture.0, fb.0
                    ))
                })
            }
        }
    }

    fn uniform_buffer(&self, uniforms: &BlurUniforms) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("blur-params"),
                contents: bytemuck::bytes_of(uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            })
    }
}

impl GpuBackend for WgpuBackend {
    fn describe(&self) -> String {
        self.adapter_name.clone()
    }

    fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        self.check_size(width, height)?;
        if let Some(surface) = &self.surface {
            if (surface.color.width, surface.color.height) == (width, height) {
                return Ok(());
            }
        }
        if let Some(old) = self.surface.take() {
            old.color.texture.destroy();
            old.readback.destroy();
        }

        let color = self.make_texture("output-surface", width, height);
        let padded_bytes_per_row = align_to(width * CHANNELS as u32, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("surface-readback"),
            size: u64::from(padded_bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        self.surface = Some(Surface {
            color,
            readback,
            padded_bytes_per_row,
        });
        Ok(())
    }

    fn compile_program(&mut self, source: &ShaderSource<'_>) -> Result<ProgramId, GpuError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(source.label),
                source: wgpu::ShaderSource::Wgsl(source.wgsl.into()),
            });
        let vertex_buffers = [
            wgpu::VertexBufferLayout {
                array_stride: VERTEX_STRIDE,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &POSITION_ATTRIBUTES,
            },
            wgpu::VertexBufferLayout {
                array_stride: VERTEX_STRIDE,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &TEXCOORD_ATTRIBUTES,
            },
        ];
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(source.label),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &vertex_buffers,
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TEXTURE_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GpuError::ShaderCompile {
                label: source.label.to_string(),
                message: error.to_string(),
            });
        }

        let id = self.allocate_id();
        self.programs.insert(id, pipeline);
        Ok(ProgramId(id))
    }

    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, GpuError> {
        self.check_size(width, height)?;
        let texture = self.make_texture("blur-texture", width, height);
        let id = self.allocate_id();
        self.textures.insert(id, texture);
        Ok(TextureId(id))
    }

    fn create_framebuffer(&mut self, color: TextureId) -> Result<FramebufferId, GpuError> {
        let texture = self.texture(color)?;
        let surface = self.surface()?;
        if (texture.width, texture.height) != (surface.color.width, surface.color.height) {
            return Err(GpuError::IncompleteFramebuffer(format!(
                "attachment is {}x{} but surface is {}x{}",
                texture.width, texture.height, surface.color.width, surface.color.height
            )));
        }
        let id = self.allocate_id();
        self.framebuffers.insert(id, color);
        Ok(FramebufferId(id))
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<BufferId, GpuError> {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quad-vertices"),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let id = self.allocate_id();
        self.buffers.insert(id, buffer);
        Ok(BufferId(id))
    }

    fn upload_texture(&mut self, texture: TextureId, pixels: &[u8]) -> Result<(), GpuError> {
        let tex = self.texture(texture)?;
        let expected = tex.width as usize * tex.height as usize * CHANNELS;
        if pixels.len() != expected {
            return Err(GpuError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(tex.width * CHANNELS as u32),
                rows_per_image: Some(tex.height),
            },
            extent(tex.width, tex.height),
        );
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), GpuError> {
        let pipeline = self.programs.get(&call.program.0).ok_or(GpuError::UnknownHandle {
            kind: "program",
            id: call.program.0,
        })?;
        let positions = self.buffer(call.positions)?;
        let texcoords = self.buffer(call.texcoords)?;
        let source = self.texture(call.source)?;
        let target = self.target_view(call.target)?;
        if (source.width, source.height) != (target.width, target.height) {
            return Err(GpuError::SizeMismatch {
                expected: target.width as usize * target.height as usize * CHANNELS,
                actual: source.width as usize * source.height as usize * CHANNELS,
            });
        }

        let params = self.uniform_buffer(&call.uniforms);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blur-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&source.view),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("blur-pass"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(if call.uniforms.is_horizontal() {
                    "horizontal"
                } else {
                    "vertical"
                }),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, positions.slice(..));
            pass.set_vertex_buffer(1, texcoords.slice(..));
            pass.draw(0..4, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn read_surface(&mut self, out: &mut [u8]) -> Result<(), GpuError> {
        let surface = self.surface()?;
        let (width, height) = (surface.color.width, surface.color.height);
        let unpadded_bytes_per_row = width * CHANNELS as u32;
        let expected = unpadded_bytes_per_row as usize * height as usize;
        if out.len() != expected {
            return Err(GpuError::SizeMismatch {
                expected,
                actual: out.len(),
            });
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("surface-readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &surface.color.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &surface.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(surface.padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            extent(width, height),
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = surface.readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| GpuError::Readback(e.to_string()))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;

        {
            let mapped = slice.get_mapped_range();
            copy_tight_rows(
                &mapped,
                out,
                unpadded_bytes_per_row as usize,
                surface.padded_bytes_per_row as usize,
            );
        }
        surface.readback.unmap();
        Ok(())
    }

    fn delete_program(&mut self, id: ProgramId) {
        self.programs.remove(&id.0);
    }

    fn delete_texture(&mut self, id: TextureId) {
        if let Some(texture) = self.textures.remove(&id.0) {
            texture.texture.destroy();
        }
    }

    fn delete_framebuffer(&mut self, id: FramebufferId) {
        self.framebuffers.remove(&id.0);
    }

    fn delete_buffer(&mut self, id: BufferId) {
        if let Some(buffer) = self.buffers.remove(&id.0) {
            buffer.destroy();
        }
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

/// Strips the row padding wgpu requires on texture-to-buffer copies.
fn copy_tight_rows(mapped: &[u8], out: &mut [u8], unpadded: usize, padded: usize) {
    for (dst, src) in out.chunks_exact_mut(unpadded).zip(mapped.chunks(padded)) {
        dst.copy_from_slice(&src[..unpadded]);
    }
}
