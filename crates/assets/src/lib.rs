//! Asset loading: OBJ meshes and PNG textures with content-addressed ids.
//!
//! Loaders hand back decoded vertex/index arrays and RGBA8 pixel buffers.
//! The renderer keys shared GPU data by [`AssetId`], never by file path.
//!
//! # Layout
//! A static mesh is addressed by a path stem relative to the store root:
//! `<stem>.obj` holds the geometry and an optional `<stem>.png` its texture.

mod mesh;
mod texture;

pub use mesh::{MeshData, Vertex, parse_obj};
pub use texture::ImageData;

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Content-addressed asset id: the first 8 bytes of a SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

impl AssetId {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = ContentHasher::new();
        hasher.update(bytes);
        hasher.finish()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Incremental builder for an [`AssetId`].
pub(crate) struct ContentHasher(Sha256);

impl ContentHasher {
    pub(crate) fn new() -> Self {
        Self(Sha256::new())
    }

    pub(crate) fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    pub(crate) fn finish(self) -> AssetId {
        let digest = self.0.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        AssetId(u64::from_le_bytes(bytes))
    }
}

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("mesh needs {0} vertices but 16-bit indices address at most 65536")]
    TooManyVertices(usize),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Loaded static mesh: geometry plus its texture if one was found.
#[derive(Debug, Clone)]
pub struct StaticMeshAsset {
    pub mesh: Rc<MeshData>,
    pub texture: Option<Rc<ImageData>>,
}

/// Loads assets relative to a root directory and caches them by path.
///
/// Repeated loads of the same file return the same shared value.
#[derive(Debug, Default)]
pub struct AssetStore {
    root: PathBuf,
    meshes: BTreeMap<(PathBuf, u32), Rc<MeshData>>,
    images: BTreeMap<PathBuf, Rc<ImageData>>,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path against the store root. Absolute paths pass through.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Load and cache an OBJ mesh.
    pub fn load_mesh(
        &mut self,
        path: impl AsRef<Path>,
        import_scale: f32,
    ) -> Result<Rc<MeshData>, AssetError> {
        let path = self.resolve(path);
        let key = (path.clone(), import_scale.to_bits());
        if let Some(mesh) = self.meshes.get(&key) {
            return Ok(Rc::clone(mesh));
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let reader = BufReader::new(File::open(&path)?);
        let mesh = Rc::new(parse_obj(&name, reader, import_scale)?);
        tracing::info!(
            "loaded mesh {} ({} vertices, {} indices) from {}",
            mesh.name,
            mesh.vertex_count(),
            mesh.index_count(),
            path.display()
        );
        self.meshes.insert(key, Rc::clone(&mesh));
        Ok(mesh)
    }

    /// Load and cache a PNG image.
    pub fn load_image(&mut self, path: impl AsRef<Path>) -> Result<Rc<ImageData>, AssetError> {
        let path = self.resolve(path);
        if let Some(image) = self.images.get(&path) {
            return Ok(Rc::clone(image));
        }
        let image = Rc::new(ImageData::from_file(&path)?);
        self.images.insert(path, Rc::clone(&image));
        Ok(image)
    }

    /// Load `<stem>.obj` and, if present, `<stem>.png`.
    ///
    /// A texture that is missing or fails to decode is logged and skipped.
    pub fn load_static_mesh(
        &mut self,
        stem: impl AsRef<Path>,
        import_scale: f32,
    ) -> Result<StaticMeshAsset, AssetError> {
        let stem = stem.as_ref();
        let mesh = self.load_mesh(stem.with_extension("obj"), import_scale)?;
        let texture = match self.load_image(stem.with_extension("png")) {
            Ok(image) => Some(image),
            Err(e) => {
                tracing::warn!(
                    "no texture for mesh {}: {e}; continuing without one",
                    stem.display()
                );
                None
            }
        };
        Ok(StaticMeshAsset { mesh, texture })
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}
