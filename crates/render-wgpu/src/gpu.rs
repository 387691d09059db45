use cinder_render::graphics::{
    AddressMode, CONSTANT_SLOTS_PER_STAGE, FilterMode, TEXTURE_SLOTS, VertexFormat,
    check_constant_size, check_texture_size,
};
use cinder_render::{
    Binding, BufferId, Graphics, GraphicsError, MAX_CONSTANT_BUFFER_SIZE, PrimitiveTopology,
    ProjectionSettings, SamplerDesc, SamplerId, ShaderId, ShaderStage, TextureId, VertexLayout,
};
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU64;
use std::sync::{Arc, Mutex};
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const UNIFORM_SLOT: u64 = MAX_CONSTANT_BUFFER_SIZE as u64;
const CONSTANT_BINDINGS: usize = 2 * CONSTANT_SLOTS_PER_STAGE as usize;

/// Group 0 binding of a constant slot: vertex slots first, then pixel slots.
fn constant_binding(stage: ShaderStage, slot: u32) -> u32 {
    match stage {
        ShaderStage::Vertex => slot,
        ShaderStage::Pixel => CONSTANT_SLOTS_PER_STAGE + slot,
    }
}

fn vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
    }
}

fn primitive_topology(topology: PrimitiveTopology) -> wgpu::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
        PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
        PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

fn sampler_descriptor(desc: &SamplerDesc) -> wgpu::SamplerDescriptor<'static> {
    let address = match desc.address {
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
        AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    };
    let filter = match desc.filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    };
    wgpu::SamplerDescriptor {
        label: Some("sampler"),
        address_mode_u: address,
        address_mode_v: address,
        address_mode_w: address,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: filter,
        ..Default::default()
    }
}

/// Append `bytes` to the arena in a fresh uniform slot and return its offset.
fn push_uniform_slot(arena: &mut Vec<u8>, bytes: &[u8]) -> u32 {
    let offset = arena.len();
    arena.extend_from_slice(bytes);
    arena.resize(offset + UNIFORM_SLOT as usize, 0);
    offset as u32
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    vertex: (ShaderId, String),
    pixel: (ShaderId, String),
    layout: VertexLayout,
    topology: PrimitiveTopology,
}

enum GpuBuffer {
    Vertex(wgpu::Buffer),
    Index { buffer: wgpu::Buffer, count: u32 },
    /// Constants live on the CPU and are copied into the frame arena per draw.
    Constant(Vec<u8>),
}

struct QueuedDraw {
    pipeline: usize,
    material: usize,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    index_count: u32,
    offsets: [u32; CONSTANT_BINDINGS],
}

#[derive(Default)]
struct BoundState {
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
    vertex_shader: Option<(ShaderId, String)>,
    pixel_shader: Option<(ShaderId, String)>,
    layout: Option<VertexLayout>,
    topology: PrimitiveTopology,
    constants: BTreeMap<(ShaderStage, u32), BufferId>,
    texture: Option<TextureId>,
    sampler: Option<SamplerId>,
}

/// Borrowed frame state handed to an overlay renderer after the scene pass.
pub struct OverlayTarget<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub view: &'a wgpu::TextureView,
    pub size: [u32; 2],
}

/// [`Graphics`] device on top of wgpu.
///
/// Binds and draws are queued as in an immediate context and replayed in one
/// render pass when the frame ends. Constant buffer contents are snapshotted
/// per draw into a dynamic-offset uniform arena.
pub struct WgpuGraphics {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    paused: bool,

    constants_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_group: wgpu::BindGroup,
    arena: Vec<u8>,

    buffers: Vec<GpuBuffer>,
    shaders: Vec<wgpu::ShaderModule>,
    textures: Vec<wgpu::TextureView>,
    samplers: Vec<wgpu::Sampler>,
    default_texture: wgpu::TextureView,
    default_sampler: wgpu::Sampler,

    pipelines: Vec<wgpu::RenderPipeline>,
    pipeline_lookup: HashMap<PipelineKey, usize>,
    material_groups: Vec<wgpu::BindGroup>,
    material_lookup: HashMap<(Option<TextureId>, Option<SamplerId>), usize>,

    bound: BoundState,
    draws: Vec<QueuedDraw>,
    clear_color: wgpu::Color,
    projection: ProjectionSettings,
    device_error: Arc<Mutex<Option<String>>>,
}

impl WgpuGraphics {
    /// Create a device presenting to `target`, e.g. an `Arc<winit::window::Window>`.
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, GraphicsError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(target)
            .map_err(|e| GraphicsError::Surface(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(GraphicsError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("cinder_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| GraphicsError::DeviceCreation(e.to_string()))?;

        let device_error = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&device_error);
        device.on_uncaptured_error(Box::new(move |error| {
            tracing::error!("graphics device error: {error}");
            record_device_error(&sink, error.to_string());
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .ok_or_else(|| GraphicsError::Surface("surface reports no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let uniform_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(UNIFORM_SLOT),
            },
            count: None,
        };
        let constants_entries: Vec<_> = (0..CONSTANT_BINDINGS as u32).map(uniform_entry).collect();
        let constants_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("constants_layout"),
            entries: &constants_entries,
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh_pipeline_layout"),
            bind_group_layouts: &[&constants_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let capacity = UNIFORM_SLOT * 64;
        let uniform_buffer = Self::create_uniform_buffer(&device, capacity);
        let uniform_group = Self::create_uniform_group(&device, &constants_layout, &uniform_buffer);

        let default_texture = device
            .create_texture_with_data(
                &queue,
                &Self::texture_descriptor("default_texture", 1, 1),
                wgpu::util::TextureDataOrder::LayerMajor,
                &[255; 4],
            )
            .create_view(&Default::default());
        let default_sampler = device.create_sampler(&sampler_descriptor(&SamplerDesc::default()));
        let depth_view = Self::create_depth_texture(&device, config.width, config.height);

        tracing::info!(
            "graphics device ready: {} ({}), surface {:?}",
            adapter.get_info().name,
            adapter.get_info().backend.to_str(),
            surface_format
        );

        let mut graphics = Self {
            surface,
            device,
            queue,
            config,
            depth_view,
            paused: width == 0 || height == 0,
            constants_layout,
            material_layout,
            pipeline_layout,
            uniform_buffer,
            uniform_group,
            arena: Vec::new(),
            buffers: Vec::new(),
            shaders: Vec::new(),
            textures: Vec::new(),
            samplers: Vec::new(),
            default_texture,
            default_sampler,
            pipelines: Vec::new(),
            pipeline_lookup: HashMap::new(),
            material_groups: Vec::new(),
            material_lookup: HashMap::new(),
            bound: BoundState::default(),
            draws: Vec::new(),
            clear_color: wgpu::Color::BLACK,
            projection: ProjectionSettings::default(),
            device_error,
        };
        graphics.reset_arena();
        graphics.projection = graphics.projection.merged(
            0.0,
            graphics.config.width as f32,
            graphics.config.height as f32,
            0.0,
            0.0,
        );
        Ok(graphics)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> [u32; 2] {
        [self.config.width, self.config.height]
    }

    /// Submit the queued draws, let `overlay` record into the same encoder,
    /// then present.
    ///
    /// A lost or outdated surface is reconfigured and the frame dropped.
    pub fn end_frame_with(
        &mut self,
        overlay: impl FnOnce(OverlayTarget<'_>),
    ) -> Result<(), GraphicsError> {
        self.check_device()?;
        if self.paused {
            self.finish_frame();
            return Ok(());
        }

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                self.finish_frame();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timed out, skipping frame");
                self.finish_frame();
                return Ok(());
            }
            Err(e) => return Err(GraphicsError::Surface(e.to_string())),
        };

        self.upload_arena();
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for draw in &self.draws {
                let (
                    Some(GpuBuffer::Vertex(vertices)),
                    Some(GpuBuffer::Index { buffer: indices, .. }),
                ) = (
                    self.buffers.get(draw.vertex_buffer.0 as usize),
                    self.buffers.get(draw.index_buffer.0 as usize),
                )
                else {
                    continue;
                };
                pass.set_pipeline(&self.pipelines[draw.pipeline]);
                pass.set_bind_group(0, &self.uniform_group, &draw.offsets);
                pass.set_bind_group(1, &self.material_groups[draw.material], &[]);
                pass.set_vertex_buffer(0, vertices.slice(..));
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        overlay(OverlayTarget {
            device: &self.device,
            queue: &self.queue,
            encoder: &mut encoder,
            view: &view,
            size: [self.config.width, self.config.height],
        });

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.finish_frame();
        Ok(())
    }

    fn finish_frame(&mut self) {
        self.draws.clear();
        self.reset_arena();
    }

    /// Slot 0 of the arena stays zeroed for constant slots nothing is bound to.
    fn reset_arena(&mut self) {
        self.arena.clear();
        self.arena.resize(UNIFORM_SLOT as usize, 0);
    }

    fn upload_arena(&mut self) {
        let needed = self.arena.len() as u64;
        if needed > self.uniform_buffer.size() {
            let capacity = needed.next_power_of_two();
            tracing::debug!(capacity, "growing uniform arena");
            self.uniform_buffer = Self::create_uniform_buffer(&self.device, capacity);
            self.uniform_group =
                Self::create_uniform_group(&self.device, &self.constants_layout, &self.uniform_buffer);
        }
        self.queue.write_buffer(&self.uniform_buffer, 0, &self.arena);
    }

    fn check_device(&self) -> Result<(), GraphicsError> {
        take_device_error(&self.device_error)
    }

    fn buffer(&self, id: BufferId) -> Result<&GpuBuffer, GraphicsError> {
        self.buffers
            .get(id.0 as usize)
            .ok_or_else(|| GraphicsError::UnknownResource(id.to_string()))
    }

    fn pipeline(&mut self, key: PipelineKey) -> Result<usize, GraphicsError> {
        if let Some(&index) = self.pipeline_lookup.get(&key) {
            return Ok(index);
        }
        let module = |id: ShaderId| {
            self.shaders
                .get(id.0 as usize)
                .ok_or_else(|| GraphicsError::UnknownResource(id.to_string()))
        };
        let vertex_module = module(key.vertex.0)?;
        let pixel_module = module(key.pixel.0)?;

        let attributes: Vec<wgpu::VertexAttribute> = key
            .layout
            .attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: vertex_format(a.format),
                offset: a.offset as u64,
                shader_location: a.location,
            })
            .collect();
        let strip_index_format = match key.topology {
            PrimitiveTopology::LineStrip | PrimitiveTopology::TriangleStrip => {
                Some(wgpu::IndexFormat::Uint16)
            }
            _ => None,
        };
        let cull_mode = matches!(
            key.topology,
            PrimitiveTopology::TriangleList | PrimitiveTopology::TriangleStrip
        )
        .then_some(wgpu::Face::Back);

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("mesh_pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vertex_module,
                    entry_point: Some(&key.vertex.1),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: key.layout.stride as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &attributes,
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: pixel_module,
                    entry_point: Some(&key.pixel.1),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: primitive_topology(key.topology),
                    strip_index_format,
                    front_face: wgpu::FrontFace::Cw,
                    cull_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GraphicsError::Device(format!("pipeline creation failed: {error}")));
        }

        tracing::debug!(
            vertex = %key.vertex.0,
            pixel = %key.pixel.0,
            topology = ?key.topology,
            "created pipeline"
        );
        let index = self.pipelines.len();
        self.pipelines.push(pipeline);
        self.pipeline_lookup.insert(key, index);
        Ok(index)
    }

    fn material_group(
        &mut self,
        texture: Option<TextureId>,
        sampler: Option<SamplerId>,
    ) -> Result<usize, GraphicsError> {
        if let Some(&index) = self.material_lookup.get(&(texture, sampler)) {
            return Ok(index);
        }
        let view = match texture {
            Some(id) => self
                .textures
                .get(id.0 as usize)
                .ok_or_else(|| GraphicsError::UnknownResource(id.to_string()))?,
            None => &self.default_texture,
        };
        let sampler_ref = match sampler {
            Some(id) => self
                .samplers
                .get(id.0 as usize)
                .ok_or_else(|| GraphicsError::UnknownResource(id.to_string()))?,
            None => &self.default_sampler,
        };
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material_group"),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler_ref),
                },
            ],
        });
        let index = self.material_groups.len();
        self.material_groups.push(group);
        self.material_lookup.insert((texture, sampler), index);
        Ok(index)
    }

    fn create_uniform_buffer(device: &wgpu::Device, capacity: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform_arena"),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_uniform_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        let entries: Vec<wgpu::BindGroupEntry<'_>> = (0..CONSTANT_BINDINGS as u32)
            .map(|binding| wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: NonZeroU64::new(UNIFORM_SLOT),
                }),
            })
            .collect();
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_group"),
            layout,
            entries: &entries,
        })
    }

    fn texture_descriptor(label: &str, width: u32, height: u32) -> wgpu::TextureDescriptor<'_> {
        wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        }
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

impl Graphics for WgpuGraphics {
    fn create_vertex_buffer(&mut self, label: &str, data: &[u8]) -> Result<BufferId, GraphicsError> {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: data,
                usage: wgpu::BufferUsages::VERTEX,
            });
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(GpuBuffer::Vertex(buffer));
        Ok(id)
    }

    fn create_index_buffer(&mut self, label: &str, indices: &[u16]) -> Result<BufferId, GraphicsError> {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(GpuBuffer::Index {
            buffer,
            count: indices.len() as u32,
        });
        Ok(id)
    }

    fn create_constant_buffer(&mut self, _label: &str, data: &[u8]) -> Result<BufferId, GraphicsError> {
        check_constant_size(data.len())?;
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(GpuBuffer::Constant(data.to_vec()));
        Ok(id)
    }

    fn update_constant_buffer(&mut self, buffer: BufferId, data: &[u8]) -> Result<(), GraphicsError> {
        match self.buffers.get_mut(buffer.0 as usize) {
            Some(GpuBuffer::Constant(bytes)) if bytes.len() == data.len() => {
                bytes.copy_from_slice(data);
                Ok(())
            }
            Some(GpuBuffer::Constant(bytes)) => Err(GraphicsError::ConstantSizeMismatch {
                buffer,
                expected: bytes.len(),
                actual: data.len(),
            }),
            _ => Err(GraphicsError::UnknownResource(format!("constant buffer {buffer}"))),
        }
    }

    fn create_shader(&mut self, label: &str, source: &str) -> Result<ShaderId, GraphicsError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GraphicsError::ShaderCompilation {
                label: label.to_string(),
                message: error.to_string(),
            });
        }
        let id = ShaderId(self.shaders.len() as u32);
        self.shaders.push(module);
        tracing::debug!(%id, label, "compiled shader");
        Ok(id)
    }

    fn create_texture(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureId, GraphicsError> {
        check_texture_size(width, height, rgba)?;
        let texture = self.device.create_texture_with_data(
            &self.queue,
            &Self::texture_descriptor(label, width, height),
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        );
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(texture.create_view(&Default::default()));
        Ok(id)
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerId, GraphicsError> {
        let id = SamplerId(self.samplers.len() as u32);
        self.samplers
            .push(self.device.create_sampler(&sampler_descriptor(desc)));
        Ok(id)
    }

    fn bind(&mut self, binding: Binding<'_>) -> Result<(), GraphicsError> {
        match binding {
            Binding::VertexBuffer { buffer, .. } => {
                if !matches!(self.buffer(buffer)?, GpuBuffer::Vertex(_)) {
                    return Err(GraphicsError::UnknownResource(format!("vertex buffer {buffer}")));
                }
                self.bound.vertex_buffer = Some(buffer);
            }
            Binding::IndexBuffer(buffer) => {
                if !matches!(self.buffer(buffer)?, GpuBuffer::Index { .. }) {
                    return Err(GraphicsError::UnknownResource(format!("index buffer {buffer}")));
                }
                self.bound.index_buffer = Some(buffer);
            }
            Binding::VertexShader { shader, entry } => {
                self.bound.vertex_shader = Some((shader, entry.to_string()));
            }
            Binding::PixelShader { shader, entry } => {
                self.bound.pixel_shader = Some((shader, entry.to_string()));
            }
            Binding::InputLayout(layout) => self.bound.layout = Some(layout.clone()),
            Binding::Topology(topology) => self.bound.topology = topology,
            Binding::ConstantBuffer {
                stage,
                slot,
                buffer,
            } => {
                if slot >= CONSTANT_SLOTS_PER_STAGE {
                    return Err(GraphicsError::ConstantSlotOutOfRange { stage, slot });
                }
                if !matches!(self.buffer(buffer)?, GpuBuffer::Constant(_)) {
                    return Err(GraphicsError::UnknownResource(format!("constant buffer {buffer}")));
                }
                self.bound.constants.insert((stage, slot), buffer);
            }
            Binding::Sampler { slot, sampler } => {
                if slot >= TEXTURE_SLOTS {
                    return Err(GraphicsError::TextureSlotOutOfRange(slot));
                }
                self.bound.sampler = Some(sampler);
            }
            Binding::Texture { slot, texture } => {
                if slot >= TEXTURE_SLOTS {
                    return Err(GraphicsError::TextureSlotOutOfRange(slot));
                }
                self.bound.texture = Some(texture);
            }
        }
        Ok(())
    }

    fn clear_render_buffer(&mut self, red: f32, green: f32, blue: f32) -> Result<(), GraphicsError> {
        self.clear_color = wgpu::Color {
            r: red as f64,
            g: green as f64,
            b: blue as f64,
            a: 1.0,
        };
        self.finish_frame();
        Ok(())
    }

    fn draw(&mut self, index_count: u32) -> Result<(), GraphicsError> {
        let vertex = self
            .bound
            .vertex_shader
            .clone()
            .ok_or(GraphicsError::MissingBinding("vertex shader"))?;
        let pixel = self
            .bound
            .pixel_shader
            .clone()
            .ok_or(GraphicsError::MissingBinding("pixel shader"))?;
        let layout = self
            .bound
            .layout
            .clone()
            .ok_or(GraphicsError::MissingBinding("input layout"))?;
        let vertex_buffer = self
            .bound
            .vertex_buffer
            .ok_or(GraphicsError::MissingBinding("vertex buffer"))?;
        let index_buffer = self
            .bound
            .index_buffer
            .ok_or(GraphicsError::MissingBinding("index buffer"))?;
        if let GpuBuffer::Index { count, .. } = self.buffer(index_buffer)? {
            if index_count > *count {
                return Err(GraphicsError::IndexRange {
                    requested: index_count,
                    available: *count,
                });
            }
        }

        let pipeline = self.pipeline(PipelineKey {
            vertex,
            pixel,
            layout,
            topology: self.bound.topology,
        })?;
        let material = self.material_group(self.bound.texture, self.bound.sampler)?;

        let mut offsets = [0u32; CONSTANT_BINDINGS];
        for (&(stage, slot), &buffer) in &self.bound.constants {
            if let Some(GpuBuffer::Constant(bytes)) = self.buffers.get(buffer.0 as usize) {
                offsets[constant_binding(stage, slot) as usize] =
                    push_uniform_slot(&mut self.arena, bytes);
            }
        }

        self.draws.push(QueuedDraw {
            pipeline,
            material,
            vertex_buffer,
            index_buffer,
            index_count,
            offsets,
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), GraphicsError> {
        self.end_frame_with(|_| {})
    }

    fn resize_render_targets(&mut self, width: u32, height: u32) -> Result<(), GraphicsError> {
        if width == 0 || height == 0 {
            tracing::debug!("window minimised, pausing presentation");
            self.paused = true;
            return Ok(());
        }
        self.paused = false;
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = Self::create_depth_texture(&self.device, width, height);
        self.projection = self
            .projection
            .merged(0.0, width as f32, height as f32, 0.0, 0.0);
        tracing::debug!(width, height, "resized render targets");
        Ok(())
    }

    fn set_projection_settings(&mut self, settings: ProjectionSettings) {
        self.projection = settings;
    }

    fn projection_settings(&self) -> ProjectionSettings {
        self.projection
    }
}

/// Keep the first uncaptured device error until the next frame end.
fn record_device_error(slot: &Mutex<Option<String>>, message: String) {
    if let Ok(mut slot) = slot.lock() {
        slot.get_or_insert(message);
    }
}

fn take_device_error(slot: &Mutex<Option<String>>) -> Result<(), GraphicsError> {
    let error = slot.lock().ok().and_then(|mut slot| slot.take());
    match error {
        Some(message) => Err(GraphicsError::Device(message)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_errors_surface_once_at_frame_end() {
        let slot = Mutex::new(None);
        assert!(take_device_error(&slot).is_ok());

        record_device_error(&slot, "validation failed".to_string());
        record_device_error(&slot, "second".to_string());
        match take_device_error(&slot) {
            Err(GraphicsError::Device(message)) => assert_eq!(message, "validation failed"),
            other => panic!("expected a device error, got {other:?}"),
        }
        assert!(take_device_error(&slot).is_ok());
    }

    #[test]
    fn constant_bindings_follow_stage_order() {
        assert_eq!(constant_binding(ShaderStage::Vertex, 0), 0);
        assert_eq!(constant_binding(ShaderStage::Vertex, 1), 1);
        assert_eq!(constant_binding(ShaderStage::Pixel, 0), 2);
        assert_eq!(constant_binding(ShaderStage::Pixel, 1), 3);
    }

    #[test]
    fn uniform_slots_are_aligned() {
        let mut arena = vec![0u8; UNIFORM_SLOT as usize];
        let a = push_uniform_slot(&mut arena, &[1; 128]);
        let b = push_uniform_slot(&mut arena, &[2; 64]);
        assert_eq!(a, 256);
        assert_eq!(b, 512);
        assert_eq!(arena.len(), 768);
        assert_eq!(arena[256], 1);
        assert_eq!(arena[256 + 128], 0);
    }

    #[test]
    fn formats_map_one_to_one() {
        assert_eq!(
            vertex_format(VertexFormat::Float32x2),
            wgpu::VertexFormat::Float32x2
        );
        assert_eq!(
            primitive_topology(PrimitiveTopology::LineStrip),
            wgpu::PrimitiveTopology::LineStrip
        );
        let desc = sampler_descriptor(&SamplerDesc {
            filter: FilterMode::Nearest,
            address: AddressMode::ClampToEdge,
        });
        assert_eq!(desc.mag_filter, wgpu::FilterMode::Nearest);
        assert_eq!(desc.address_mode_v, wgpu::AddressMode::ClampToEdge);
    }
}
