use glam::Mat4;

/// Largest constant buffer a backend must accept, in bytes.
pub const MAX_CONSTANT_BUFFER_SIZE: usize = 256;

/// Constant buffer slots available per shader stage.
pub const CONSTANT_SLOTS_PER_STAGE: u32 = 2;

/// Texture and sampler slots available to the pixel stage.
pub const TEXTURE_SLOTS: u32 = 1;

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

resource_id!(
    /// Vertex, index or constant buffer owned by a [`Graphics`] backend.
    BufferId
);
resource_id!(ShaderId);
resource_id!(TextureId);
resource_id!(SamplerId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub fn size(self) -> u32 {
        match self {
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
        }
    }
}

/// One element of a vertex: shader location, format and byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub semantic: &'static str,
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

/// Describes how vertex buffer bytes map onto vertex shader inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Pack attributes tightly in declaration order.
    pub fn packed(attributes: &[(&'static str, VertexFormat)]) -> Self {
        let mut offset = 0;
        let attributes = attributes
            .iter()
            .enumerate()
            .map(|(location, &(semantic, format))| {
                let attribute = VertexAttribute {
                    semantic,
                    location: location as u32,
                    format,
                    offset,
                };
                offset += format.size();
                attribute
            })
            .collect();
        Self {
            stride: offset,
            attributes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    Repeat,
    MirrorRepeat,
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerDesc {
    pub filter: FilterMode,
    pub address: AddressMode,
}

/// Perspective projection parameters. Field of view is vertical, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionSettings {
    pub fov_degrees: f32,
    pub width: f32,
    pub height: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            width: 1280.0,
            height: 720.0,
            near: 0.5,
            far: 2000.0,
        }
    }
}

impl ProjectionSettings {
    /// Replace fields with the non-zero arguments; zero keeps the current value.
    pub fn merged(self, fov_degrees: f32, width: f32, height: f32, near: f32, far: f32) -> Self {
        let pick = |new: f32, old: f32| if new == 0.0 { old } else { new };
        Self {
            fov_degrees: pick(fov_degrees, self.fov_degrees),
            width: pick(width, self.width),
            height: pick(height, self.height),
            near: pick(near, self.near),
            far: pick(far, self.far),
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0.0 {
            1.0
        } else {
            self.width / self.height
        }
    }

    /// Left-handed perspective matrix with a `[0, 1]` depth range.
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_lh(
            self.fov_degrees.to_radians(),
            self.aspect_ratio(),
            self.near,
            self.far,
        )
    }
}

/// A single pipeline slot assignment on the active device context.
#[derive(Debug, Clone, Copy)]
pub enum Binding<'a> {
    VertexBuffer { buffer: BufferId, stride: u32 },
    IndexBuffer(BufferId),
    VertexShader { shader: ShaderId, entry: &'a str },
    PixelShader { shader: ShaderId, entry: &'a str },
    InputLayout(&'a VertexLayout),
    Topology(PrimitiveTopology),
    ConstantBuffer {
        stage: ShaderStage,
        slot: u32,
        buffer: BufferId,
    },
    Sampler { slot: u32, sampler: SamplerId },
    Texture { slot: u32, texture: TextureId },
}

/// Device and resource errors. Any of these is fatal to the frame loop.
#[derive(Debug, thiserror::Error)]
pub enum GraphicsError {
    #[error("no compatible graphics adapter found")]
    NoAdapter,
    #[error("failed to create graphics device: {0}")]
    DeviceCreation(String),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("shader {label} failed to compile: {message}")]
    ShaderCompilation { label: String, message: String },
    #[error("{0} does not exist")]
    UnknownResource(String),
    #[error("constant buffer of {0} bytes exceeds the 256 byte limit")]
    ConstantBufferTooLarge(usize),
    #[error("constant buffer {buffer} holds {expected} bytes, update has {actual}")]
    ConstantSizeMismatch {
        buffer: BufferId,
        expected: usize,
        actual: usize,
    },
    #[error("{stage:?} constant slot {slot} is out of range")]
    ConstantSlotOutOfRange { stage: ShaderStage, slot: u32 },
    #[error("texture slot {0} is out of range")]
    TextureSlotOutOfRange(u32),
    #[error("texture data is {actual} bytes, expected {expected}")]
    TextureSize { expected: usize, actual: usize },
    #[error("draw issued without a bound {0}")]
    MissingBinding(&'static str),
    #[error("draw of {requested} indices exceeds the {available} in the bound index buffer")]
    IndexRange { requested: u32, available: u32 },
    #[error("graphics device error: {0}")]
    Device(String),
}

/// The graphics device boundary: resource creation, slot binding and frame control.
///
/// Bound state persists across draws until rebound, like an immediate device
/// context. Every call reports backend failure as a [`GraphicsError`].
pub trait Graphics {
    fn create_vertex_buffer(&mut self, label: &str, data: &[u8]) -> Result<BufferId, GraphicsError>;

    fn create_index_buffer(&mut self, label: &str, indices: &[u16]) -> Result<BufferId, GraphicsError>;

    /// Create a constant buffer holding `data`. Its size is fixed at creation.
    fn create_constant_buffer(&mut self, label: &str, data: &[u8]) -> Result<BufferId, GraphicsError>;

    fn update_constant_buffer(&mut self, buffer: BufferId, data: &[u8]) -> Result<(), GraphicsError>;

    /// Compile a WGSL module. Entry points are chosen at bind time.
    fn create_shader(&mut self, label: &str, source: &str) -> Result<ShaderId, GraphicsError>;

    /// Create a 2D texture from tightly packed RGBA8 rows.
    fn create_texture(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureId, GraphicsError>;

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerId, GraphicsError>;

    fn bind(&mut self, binding: Binding<'_>) -> Result<(), GraphicsError>;

    /// Start a frame by clearing colour and depth. Draws recorded before the
    /// clear are discarded.
    fn clear_render_buffer(&mut self, red: f32, green: f32, blue: f32) -> Result<(), GraphicsError>;

    /// Indexed draw of `index_count` indices with the currently bound state.
    fn draw(&mut self, index_count: u32) -> Result<(), GraphicsError>;

    /// Submit the frame and present it.
    fn end_frame(&mut self) -> Result<(), GraphicsError>;

    /// Rebuild size-dependent targets. A zero size pauses presentation.
    fn resize_render_targets(&mut self, width: u32, height: u32) -> Result<(), GraphicsError>;

    fn set_projection_settings(&mut self, settings: ProjectionSettings);

    fn projection_settings(&self) -> ProjectionSettings;

    fn projection_matrix(&self) -> Mat4 {
        self.projection_settings().matrix()
    }
}

/// Reject constant data larger than a backend slot.
pub fn check_constant_size(len: usize) -> Result<(), GraphicsError> {
    if len > MAX_CONSTANT_BUFFER_SIZE {
        return Err(GraphicsError::ConstantBufferTooLarge(len));
    }
    Ok(())
}

/// Reject a texture whose byte length disagrees with its dimensions.
pub fn check_texture_size(width: u32, height: u32, rgba: &[u8]) -> Result<(), GraphicsError> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(GraphicsError::TextureSize {
            expected,
            actual: rgba.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn packed_layout_offsets() {
        let layout = VertexLayout::packed(&[
            ("POSITION", VertexFormat::Float32x3),
            ("NORMAL", VertexFormat::Float32x3),
            ("TEXCOORD", VertexFormat::Float32x2),
        ]);
        assert_eq!(layout.stride, 32);
        let offsets: Vec<u32> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
        assert_eq!(layout.attributes[2].location, 2);
    }

    #[test]
    fn projection_defaults() {
        let p = ProjectionSettings::default();
        assert_eq!(p.fov_degrees, 60.0);
        assert_eq!((p.width, p.height), (1280.0, 720.0));
        assert_eq!((p.near, p.far), (0.5, 2000.0));
    }

    #[test]
    fn zero_arguments_keep_current_values() {
        let p = ProjectionSettings::default().merged(90.0, 0.0, 0.0, 0.0, 500.0);
        assert_eq!(p.fov_degrees, 90.0);
        assert_eq!(p.width, 1280.0);
        assert_eq!(p.near, 0.5);
        assert_eq!(p.far, 500.0);
    }

    #[test]
    fn projection_is_left_handed() {
        let m = ProjectionSettings::default().matrix();
        // A point in front of the camera (+Z) lands inside the depth range.
        let clip = m * Vec4::new(0.0, 0.0, 10.0, 1.0);
        let depth = clip.z / clip.w;
        assert!(clip.w > 0.0);
        assert!((0.0..=1.0).contains(&depth));
    }

    #[test]
    fn size_checks() {
        assert!(check_constant_size(256).is_ok());
        assert!(matches!(
            check_constant_size(257),
            Err(GraphicsError::ConstantBufferTooLarge(257))
        ));
        assert!(check_texture_size(2, 2, &[0; 16]).is_ok());
        assert!(check_texture_size(2, 2, &[0; 15]).is_err());
    }

    #[test]
    fn ids_display_with_kind() {
        assert_eq!(BufferId(3).to_string(), "BufferId#3");
        assert_eq!(ShaderId(0).to_string(), "ShaderId#0");
    }
}
