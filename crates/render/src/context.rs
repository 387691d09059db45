use crate::graphics::{
    Binding, BufferId, Graphics, GraphicsError, PrimitiveTopology, SamplerDesc, SamplerId,
    ShaderId, ShaderStage, TextureId, VertexLayout, check_constant_size,
};
use crate::RenderError;
use bytemuck::{Pod, Zeroable};
use cinder_assets::ImageData;
use glam::Mat4;

/// Vertex constant slot that receives [`MeshTransform`].
pub const TRANSFORM_SLOT: u32 = 0;

/// Matrices available while binding one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawContext {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

/// Per-draw vertex constants: model-view, model-view-projection and the
/// matrix that carries normals into view space.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MeshTransform {
    pub model_view: [[f32; 4]; 4],
    pub model_view_proj: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl MeshTransform {
    pub fn new(draw: &DrawContext) -> Self {
        let model_view = draw.view * draw.model;
        Self {
            model_view: model_view.to_cols_array_2d(),
            model_view_proj: (draw.projection * model_view).to_cols_array_2d(),
            normal: normal_matrix(model_view).to_cols_array_2d(),
        }
    }
}

/// Inverse transpose of `model_view`, so normals stay perpendicular under
/// non-uniform scale. A singular matrix (a zero scale axis) is used as is.
fn normal_matrix(model_view: Mat4) -> Mat4 {
    if model_view.determinant().abs() <= f32::EPSILON {
        return model_view;
    }
    model_view.inverse().transpose()
}

/// A bindable pipeline resource.
///
/// Each variant owns backend handles created through a [`Graphics`] device and
/// knows which pipeline slot it binds to.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextData {
    VertexData {
        buffer: BufferId,
        stride: u32,
        vertex_count: u32,
    },
    IndexData {
        buffer: BufferId,
        count: u32,
    },
    VertexShader {
        shader: ShaderId,
        entry: String,
    },
    PixelShader {
        shader: ShaderId,
        entry: String,
    },
    InputLayout(VertexLayout),
    Topology(PrimitiveTopology),
    ConstantBuffer {
        stage: ShaderStage,
        slot: u32,
        buffer: BufferId,
        size: usize,
    },
    SampleState {
        slot: u32,
        sampler: SamplerId,
    },
    Texture {
        slot: u32,
        texture: TextureId,
    },
    /// Vertex constants rebuilt from the camera and object matrices on every bind.
    TransformData {
        buffer: BufferId,
    },
}

impl ContextData {
    pub fn vertex_data<V: Pod>(
        gfx: &mut dyn Graphics,
        label: &str,
        vertices: &[V],
    ) -> Result<Self, GraphicsError> {
        let buffer = gfx.create_vertex_buffer(label, bytemuck::cast_slice(vertices))?;
        Ok(Self::VertexData {
            buffer,
            stride: std::mem::size_of::<V>() as u32,
            vertex_count: vertices.len() as u32,
        })
    }

    pub fn index_data(
        gfx: &mut dyn Graphics,
        label: &str,
        indices: &[u16],
    ) -> Result<Self, GraphicsError> {
        let buffer = gfx.create_index_buffer(label, indices)?;
        Ok(Self::IndexData {
            buffer,
            count: indices.len() as u32,
        })
    }

    pub fn vertex_shader(shader: ShaderId, entry: impl Into<String>) -> Self {
        Self::VertexShader {
            shader,
            entry: entry.into(),
        }
    }

    pub fn pixel_shader(shader: ShaderId, entry: impl Into<String>) -> Self {
        Self::PixelShader {
            shader,
            entry: entry.into(),
        }
    }

    pub fn input_layout(layout: VertexLayout) -> Self {
        Self::InputLayout(layout)
    }

    pub fn topology(topology: PrimitiveTopology) -> Self {
        Self::Topology(topology)
    }

    /// Constant buffer visible to the vertex stage at `slot`.
    pub fn vertex_constants<T: Pod>(
        gfx: &mut dyn Graphics,
        slot: u32,
        value: &T,
    ) -> Result<Self, GraphicsError> {
        Self::constants(gfx, ShaderStage::Vertex, slot, bytemuck::bytes_of(value))
    }

    /// Constant buffer visible to the pixel stage at `slot`.
    pub fn pixel_constants<T: Pod>(
        gfx: &mut dyn Graphics,
        slot: u32,
        value: &T,
    ) -> Result<Self, GraphicsError> {
        Self::constants(gfx, ShaderStage::Pixel, slot, bytemuck::bytes_of(value))
    }

    fn constants(
        gfx: &mut dyn Graphics,
        stage: ShaderStage,
        slot: u32,
        bytes: &[u8],
    ) -> Result<Self, GraphicsError> {
        check_constant_size(bytes.len())?;
        let label = format!("{stage:?}_constants_{slot}");
        let buffer = gfx.create_constant_buffer(&label, bytes)?;
        Ok(Self::ConstantBuffer {
            stage,
            slot,
            buffer,
            size: bytes.len(),
        })
    }

    pub fn sample_state(
        gfx: &mut dyn Graphics,
        slot: u32,
        desc: &SamplerDesc,
    ) -> Result<Self, GraphicsError> {
        let sampler = gfx.create_sampler(desc)?;
        Ok(Self::SampleState { slot, sampler })
    }

    pub fn texture(
        gfx: &mut dyn Graphics,
        label: &str,
        slot: u32,
        image: &ImageData,
    ) -> Result<Self, GraphicsError> {
        let texture = gfx.create_texture(label, image.width, image.height, &image.pixels)?;
        Ok(Self::Texture { slot, texture })
    }

    pub fn transform_data(gfx: &mut dyn Graphics) -> Result<Self, GraphicsError> {
        let initial = MeshTransform::zeroed();
        let buffer = gfx.create_constant_buffer("mesh_transform", bytemuck::bytes_of(&initial))?;
        Ok(Self::TransformData { buffer })
    }

    /// Overwrite the contents of a constant buffer.
    pub fn update_constants<T: Pod>(
        &self,
        gfx: &mut dyn Graphics,
        value: &T,
    ) -> Result<(), RenderError> {
        match self {
            Self::ConstantBuffer { buffer, .. } => {
                gfx.update_constant_buffer(*buffer, bytemuck::bytes_of(value))?;
                Ok(())
            }
            other => Err(RenderError::NotConstantData(other.kind())),
        }
    }

    /// Bind this resource into its pipeline slot.
    pub fn add(&self, gfx: &mut dyn Graphics, draw: &DrawContext) -> Result<(), GraphicsError> {
        match self {
            Self::VertexData { buffer, stride, .. } => gfx.bind(Binding::VertexBuffer {
                buffer: *buffer,
                stride: *stride,
            }),
            Self::IndexData { buffer, .. } => gfx.bind(Binding::IndexBuffer(*buffer)),
            Self::VertexShader { shader, entry } => gfx.bind(Binding::VertexShader {
                shader: *shader,
                entry,
            }),
            Self::PixelShader { shader, entry } => gfx.bind(Binding::PixelShader {
                shader: *shader,
                entry,
            }),
            Self::InputLayout(layout) => gfx.bind(Binding::InputLayout(layout)),
            Self::Topology(topology) => gfx.bind(Binding::Topology(*topology)),
            Self::ConstantBuffer {
                stage,
                slot,
                buffer,
                ..
            } => gfx.bind(Binding::ConstantBuffer {
                stage: *stage,
                slot: *slot,
                buffer: *buffer,
            }),
            Self::SampleState { slot, sampler } => gfx.bind(Binding::Sampler {
                slot: *slot,
                sampler: *sampler,
            }),
            Self::Texture { slot, texture } => gfx.bind(Binding::Texture {
                slot: *slot,
                texture: *texture,
            }),
            Self::TransformData { buffer } => {
                let transform = MeshTransform::new(draw);
                gfx.update_constant_buffer(*buffer, bytemuck::bytes_of(&transform))?;
                gfx.bind(Binding::ConstantBuffer {
                    stage: ShaderStage::Vertex,
                    slot: TRANSFORM_SLOT,
                    buffer: *buffer,
                })
            }
        }
    }

    /// Bind order: pipeline state first, then geometry, then resources, then
    /// constants.
    pub fn bind_rank(&self) -> u8 {
        match self {
            Self::InputLayout(_)
            | Self::VertexShader { .. }
            | Self::PixelShader { .. }
            | Self::Topology(_) => 0,
            Self::VertexData { .. } | Self::IndexData { .. } => 1,
            Self::Texture { .. } | Self::SampleState { .. } => 2,
            Self::ConstantBuffer { .. } | Self::TransformData { .. } => 3,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::VertexData { .. } => "VertexData",
            Self::IndexData { .. } => "IndexData",
            Self::VertexShader { .. } => "VertexShader",
            Self::PixelShader { .. } => "PixelShader",
            Self::InputLayout(_) => "InputLayout",
            Self::Topology(_) => "Topology",
            Self::ConstantBuffer { .. } => "ConstantBuffer",
            Self::SampleState { .. } => "SampleState",
            Self::Texture { .. } => "Texture",
            Self::TransformData { .. } => "TransformData",
        }
    }

    pub fn index_count(&self) -> Option<u32> {
        match self {
            Self::IndexData { count, .. } => Some(*count),
            _ => None,
        }
    }
}

/// Ordered context data with the position of its index data recorded at
/// insertion time.
#[derive(Debug, Clone, Default)]
pub struct ContextDataList {
    items: Vec<ContextData>,
    index_slot: Option<usize>,
}

impl ContextDataList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. A second [`ContextData::IndexData`] is rejected.
    pub fn push(&mut self, data: ContextData) -> Result<(), RenderError> {
        if data.index_count().is_some() {
            if self.index_slot.is_some() {
                return Err(RenderError::DuplicateIndexData);
            }
            self.index_slot = Some(self.items.len());
        }
        self.items.push(data);
        Ok(())
    }

    pub fn index_data(&self) -> Option<&ContextData> {
        self.index_slot.map(|i| &self.items[i])
    }

    pub fn index_count(&self) -> Option<u32> {
        self.index_data().and_then(ContextData::index_count)
    }

    pub fn has_index_data(&self) -> bool {
        self.index_slot.is_some()
    }

    /// First constant buffer bound to `stage` at `slot`.
    pub fn constants(&self, stage: ShaderStage, slot: u32) -> Option<&ContextData> {
        self.items.iter().find(|d| {
            matches!(d, ContextData::ConstantBuffer { stage: s, slot: n, .. } if *s == stage && *n == slot)
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContextData> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a ContextDataList {
    type Item = &'a ContextData;
    type IntoIter = std::slice::Iter<'a, ContextData>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
