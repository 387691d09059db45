use crate::graphics::{
    Binding, BufferId, CONSTANT_SLOTS_PER_STAGE, Graphics, GraphicsError, PrimitiveTopology,
    ProjectionSettings, SamplerDesc, SamplerId, ShaderId, ShaderStage, TEXTURE_SLOTS, TextureId,
    VertexLayout, check_constant_size, check_texture_size,
};
use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferKind {
    Vertex,
    Index,
    Constant,
}

#[derive(Debug, Clone)]
struct BufferEntry {
    kind: BufferKind,
    label: String,
    bytes: Vec<u8>,
    index_count: u32,
}

/// One call made against the device, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create(String),
    Update(BufferId),
    Bind(String),
    Clear([f32; 3]),
    Draw { index_count: u32 },
    Present,
    Resize { width: u32, height: u32 },
}

/// State captured at the moment of a draw.
#[derive(Debug, Clone)]
pub struct DrawRecord {
    pub index_count: u32,
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub vertex_shader: (ShaderId, String),
    pub pixel_shader: (ShaderId, String),
    pub topology: PrimitiveTopology,
    pub texture: Option<TextureId>,
    pub sampler: Option<SamplerId>,
    constants: BTreeMap<(ShaderStage, u32), Vec<u8>>,
}

impl DrawRecord {
    /// Contents of the constant buffer bound at draw time.
    pub fn constants(&self, stage: ShaderStage, slot: u32) -> Option<&[u8]> {
        self.constants.get(&(stage, slot)).map(Vec::as_slice)
    }
}

#[derive(Debug, Default)]
struct BoundState {
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
    vertex_shader: Option<(ShaderId, String)>,
    pixel_shader: Option<(ShaderId, String)>,
    layout: Option<VertexLayout>,
    topology: PrimitiveTopology,
    constants: BTreeMap<(ShaderStage, u32), BufferId>,
    textures: BTreeMap<u32, TextureId>,
    samplers: BTreeMap<u32, SamplerId>,
}

/// Headless [`Graphics`] device that validates and records every call.
///
/// Buffers keep their bytes so uploads can be inspected. Bound state behaves
/// like an immediate context: it persists until rebound.
#[derive(Debug, Default)]
pub struct RecordingGraphics {
    buffers: Vec<BufferEntry>,
    shaders: Vec<String>,
    textures: Vec<(u32, u32)>,
    samplers: Vec<SamplerDesc>,
    bound: BoundState,
    draws: Vec<DrawRecord>,
    commands: Vec<Command>,
    frames: u64,
    projection: ProjectionSettings,
}

impl RecordingGraphics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Draws issued since the last clear.
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(buffer.0 as usize).map(|b| b.bytes.as_slice())
    }

    pub fn bound_constants(&self, stage: ShaderStage, slot: u32) -> Option<BufferId> {
        self.bound.constants.get(&(stage, slot)).copied()
    }

    pub fn vertex_buffer_count(&self) -> usize {
        self.count(BufferKind::Vertex)
    }

    pub fn index_buffer_count(&self) -> usize {
        self.count(BufferKind::Index)
    }

    pub fn constant_buffer_count(&self) -> usize {
        self.count(BufferKind::Constant)
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn sampler_count(&self) -> usize {
        self.samplers.len()
    }

    fn count(&self, kind: BufferKind) -> usize {
        self.buffers.iter().filter(|b| b.kind == kind).count()
    }

    /// Human-readable summary of resources and the current frame's draws.
    pub fn report(&self) -> String {
        let p = self.projection;
        let mut out = String::new();
        let _ = writeln!(out, "=== Frame {} ===", self.frames);
        let _ = writeln!(
            out,
            "Resources: vertex={} index={} constant={} shaders={} textures={} samplers={}",
            self.vertex_buffer_count(),
            self.index_buffer_count(),
            self.constant_buffer_count(),
            self.shader_count(),
            self.texture_count(),
            self.sampler_count()
        );
        let _ = writeln!(
            out,
            "Projection: fov={:.0} size={}x{} near={:.2} far={:.0}",
            p.fov_degrees, p.width, p.height, p.near, p.far
        );
        let _ = writeln!(out, "Draws: {}", self.draws.len());
        for (i, draw) in self.draws.iter().enumerate() {
            let label = self
                .buffers
                .get(draw.vertex_buffer.0 as usize)
                .map(|b| b.label.as_str())
                .unwrap_or("?");
            let _ = writeln!(
                out,
                "  [{i}] {label}: {} indices, {:?}, shader={}{}",
                draw.index_count,
                draw.topology,
                self.shaders
                    .get(draw.pixel_shader.0.0 as usize)
                    .map(String::as_str)
                    .unwrap_or("?"),
                draw.texture
                    .map(|t| format!(", texture={t}"))
                    .unwrap_or_default()
            );
        }
        out
    }

    fn add_buffer(&mut self, kind: BufferKind, label: &str, bytes: Vec<u8>, index_count: u32) -> BufferId {
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(BufferEntry {
            kind,
            label: label.to_string(),
            bytes,
            index_count,
        });
        self.commands.push(Command::Create(format!("{kind:?} buffer {label} as {id}")));
        id
    }

    fn buffer(&self, id: BufferId, kind: BufferKind) -> Result<&BufferEntry, GraphicsError> {
        self.buffers
            .get(id.0 as usize)
            .filter(|b| b.kind == kind)
            .ok_or_else(|| GraphicsError::UnknownResource(format!("{kind:?} buffer {id}")))
    }

    fn check_shader(&self, id: ShaderId) -> Result<(), GraphicsError> {
        if (id.0 as usize) < self.shaders.len() {
            Ok(())
        } else {
            Err(GraphicsError::UnknownResource(id.to_string()))
        }
    }
}

impl Graphics for RecordingGraphics {
    fn create_vertex_buffer(&mut self, label: &str, data: &[u8]) -> Result<BufferId, GraphicsError> {
        Ok(self.add_buffer(BufferKind::Vertex, label, data.to_vec(), 0))
    }

    fn create_index_buffer(&mut self, label: &str, indices: &[u16]) -> Result<BufferId, GraphicsError> {
        let bytes = bytemuck::cast_slice(indices).to_vec();
        Ok(self.add_buffer(BufferKind::Index, label, bytes, indices.len() as u32))
    }

    fn create_constant_buffer(&mut self, label: &str, data: &[u8]) -> Result<BufferId, GraphicsError> {
        check_constant_size(data.len())?;
        Ok(self.add_buffer(BufferKind::Constant, label, data.to_vec(), 0))
    }

    fn update_constant_buffer(&mut self, buffer: BufferId, data: &[u8]) -> Result<(), GraphicsError> {
        let expected = self.buffer(buffer, BufferKind::Constant)?.bytes.len();
        if data.len() != expected {
            return Err(GraphicsError::ConstantSizeMismatch {
                buffer,
                expected,
                actual: data.len(),
            });
        }
        self.buffers[buffer.0 as usize].bytes.copy_from_slice(data);
        self.commands.push(Command::Update(buffer));
        Ok(())
    }

    fn create_shader(&mut self, label: &str, source: &str) -> Result<ShaderId, GraphicsError> {
        if source.trim().is_empty() {
            return Err(GraphicsError::ShaderCompilation {
                label: label.to_string(),
                message: "empty source".to_string(),
            });
        }
        let id = ShaderId(self.shaders.len() as u32);
        self.shaders.push(label.to_string());
        self.commands.push(Command::Create(format!("shader {label} as {id}")));
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
        let id = TextureId(self.textures.len() as u32);
        self.textures.push((width, height));
        self.commands
            .push(Command::Create(format!("texture {label} {width}x{height} as {id}")));
        Ok(id)
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerId, GraphicsError> {
        let id = SamplerId(self.samplers.len() as u32);
        self.samplers.push(*desc);
        self.commands.push(Command::Create(format!("sampler {desc:?} as {id}")));
        Ok(id)
    }

    fn bind(&mut self, binding: Binding<'_>) -> Result<(), GraphicsError> {
        let text = match binding {
            Binding::VertexBuffer { buffer, stride } => {
                self.buffer(buffer, BufferKind::Vertex)?;
                self.bound.vertex_buffer = Some(buffer);
                format!("VertexBuffer {buffer} stride {stride}")
            }
            Binding::IndexBuffer(buffer) => {
                self.buffer(buffer, BufferKind::Index)?;
                self.bound.index_buffer = Some(buffer);
                format!("IndexBuffer {buffer}")
            }
            Binding::VertexShader { shader, entry } => {
                self.check_shader(shader)?;
                self.bound.vertex_shader = Some((shader, entry.to_string()));
                format!("VertexShader {shader} {entry}")
            }
            Binding::PixelShader { shader, entry } => {
                self.check_shader(shader)?;
                self.bound.pixel_shader = Some((shader, entry.to_string()));
                format!("PixelShader {shader} {entry}")
            }
            Binding::InputLayout(layout) => {
                self.bound.layout = Some(layout.clone());
                format!("InputLayout stride {}", layout.stride)
            }
            Binding::Topology(topology) => {
                self.bound.topology = topology;
                format!("Topology {topology:?}")
            }
            Binding::ConstantBuffer {
                stage,
                slot,
                buffer,
            } => {
                if slot >= CONSTANT_SLOTS_PER_STAGE {
                    return Err(GraphicsError::ConstantSlotOutOfRange { stage, slot });
                }
                self.buffer(buffer, BufferKind::Constant)?;
                self.bound.constants.insert((stage, slot), buffer);
                format!("ConstantBuffer {stage:?} slot {slot} {buffer}")
            }
            Binding::Sampler { slot, sampler } => {
                if slot >= TEXTURE_SLOTS {
                    return Err(GraphicsError::TextureSlotOutOfRange(slot));
                }
                if sampler.0 as usize >= self.samplers.len() {
                    return Err(GraphicsError::UnknownResource(sampler.to_string()));
                }
                self.bound.samplers.insert(slot, sampler);
                format!("Sampler slot {slot} {sampler}")
            }
            Binding::Texture { slot, texture } => {
                if slot >= TEXTURE_SLOTS {
                    return Err(GraphicsError::TextureSlotOutOfRange(slot));
                }
                if texture.0 as usize >= self.textures.len() {
                    return Err(GraphicsError::UnknownResource(texture.to_string()));
                }
                self.bound.textures.insert(slot, texture);
                format!("Texture slot {slot} {texture}")
            }
        };
        self.commands.push(Command::Bind(text));
        Ok(())
    }

    fn clear_render_buffer(&mut self, red: f32, green: f32, blue: f32) -> Result<(), GraphicsError> {
        self.draws.clear();
        self.commands.push(Command::Clear([red, green, blue]));
        Ok(())
    }

    fn draw(&mut self, index_count: u32) -> Result<(), GraphicsError> {
        let bound = &self.bound;
        let vertex_shader = bound
            .vertex_shader
            .clone()
            .ok_or(GraphicsError::MissingBinding("vertex shader"))?;
        let pixel_shader = bound
            .pixel_shader
            .clone()
            .ok_or(GraphicsError::MissingBinding("pixel shader"))?;
        if bound.layout.is_none() {
            return Err(GraphicsError::MissingBinding("input layout"));
        }
        let vertex_buffer = bound
            .vertex_buffer
            .ok_or(GraphicsError::MissingBinding("vertex buffer"))?;
        let index_buffer = bound
            .index_buffer
            .ok_or(GraphicsError::MissingBinding("index buffer"))?;
        let available = self.buffer(index_buffer, BufferKind::Index)?.index_count;
        if index_count > available {
            return Err(GraphicsError::IndexRange {
                requested: index_count,
                available,
            });
        }

        let constants = bound
            .constants
            .iter()
            .map(|(&key, &buffer)| (key, self.buffers[buffer.0 as usize].bytes.clone()))
            .collect();
        let record = DrawRecord {
            index_count,
            vertex_buffer,
            index_buffer,
            vertex_shader,
            pixel_shader,
            topology: bound.topology,
            texture: bound.textures.get(&0).copied(),
            sampler: bound.samplers.get(&0).copied(),
            constants,
        };
        self.draws.push(record);
        self.commands.push(Command::Draw { index_count });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), GraphicsError> {
        self.frames += 1;
        self.commands.push(Command::Present);
        Ok(())
    }

    fn resize_render_targets(&mut self, width: u32, height: u32) -> Result<(), GraphicsError> {
        if width > 0 && height > 0 {
            self.projection = self
                .projection
                .merged(0.0, width as f32, height as f32, 0.0, 0.0);
        }
        self.commands.push(Command::Resize { width, height });
        Ok(())
    }

    fn set_projection_settings(&mut self, settings: ProjectionSettings) {
        self.projection = settings;
    }

    fn projection_settings(&self) -> ProjectionSettings {
        self.projection
    }
}
