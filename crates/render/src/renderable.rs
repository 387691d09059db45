use crate::context::{ContextData, ContextDataList, DrawContext};
use crate::graphics::{Graphics, ShaderStage};
use crate::shapes::ShapeKind;
use crate::RenderError;
use bytemuck::Pod;
use cinder_assets::AssetId;
use cinder_common::Transform;
use glam::Mat4;
use std::collections::HashMap;
use std::rc::Rc;

/// Identity of a mesh type. Renderables with equal keys share static data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshKey {
    Shape(ShapeKind),
    Asset {
        mesh: AssetId,
        texture: Option<AssetId>,
    },
}

impl std::fmt::Display for MeshKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shape(kind) => write!(f, "shape:{}", kind.name()),
            Self::Asset {
                mesh,
                texture: Some(texture),
            } => write!(f, "asset:{mesh}+{texture}"),
            Self::Asset {
                mesh,
                texture: None,
            } => write!(f, "asset:{mesh}"),
        }
    }
}

/// Context data built once per mesh type and shared by all its instances.
#[derive(Debug)]
pub struct StaticData {
    key: MeshKey,
    data: ContextDataList,
}

impl StaticData {
    pub fn key(&self) -> MeshKey {
        self.key
    }

    pub fn data(&self) -> &ContextDataList {
        &self.data
    }
}

/// Per-type static data, built on first use.
///
/// A miss runs the builder and stores the result. Every later request for the
/// same key returns the stored value without touching the device.
#[derive(Debug, Default)]
pub struct StaticDataCache {
    entries: HashMap<MeshKey, Rc<StaticData>>,
}

impl StaticDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with(
        &mut self,
        key: MeshKey,
        build: impl FnOnce() -> Result<ContextDataList, RenderError>,
    ) -> Result<Rc<StaticData>, RenderError> {
        if let Some(shared) = self.entries.get(&key) {
            tracing::trace!(%key, "static data cache hit");
            return Ok(Rc::clone(shared));
        }
        let data = build()?;
        tracing::debug!(%key, entries = data.len(), "built static data");
        let shared = Rc::new(StaticData { key, data });
        self.entries.insert(key, Rc::clone(&shared));
        Ok(shared)
    }

    pub fn get(&self, key: &MeshKey) -> Option<&Rc<StaticData>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &MeshKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A drawable mesh: shared static data plus data owned by this instance.
///
/// Exactly one of the two lists holds the index data.
#[derive(Debug)]
pub struct RenderableMesh {
    transform: Transform,
    instance: ContextDataList,
    shared: Rc<StaticData>,
}

impl RenderableMesh {
    pub fn new(shared: Rc<StaticData>, instance: ContextDataList) -> Result<Self, RenderError> {
        if shared.data.has_index_data() && instance.has_index_data() {
            return Err(RenderError::DuplicateIndexData);
        }
        Ok(Self {
            transform: Transform::default(),
            instance,
            shared,
        })
    }

    pub fn add_instance_data(&mut self, data: ContextData) -> Result<(), RenderError> {
        if data.index_count().is_some() && self.shared.data.has_index_data() {
            return Err(RenderError::DuplicateIndexData);
        }
        self.instance.push(data)
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn shared(&self) -> &Rc<StaticData> {
        &self.shared
    }

    pub fn instance_data(&self) -> &ContextDataList {
        &self.instance
    }

    /// Index count from whichever list holds the index data.
    pub fn index_count(&self) -> Option<u32> {
        self.instance
            .index_count()
            .or_else(|| self.shared.data.index_count())
    }

    /// Overwrite instance-owned constants in `slot` of `stage`.
    pub fn set_instance_constants<T: Pod>(
        &self,
        gfx: &mut dyn Graphics,
        stage: ShaderStage,
        slot: u32,
        value: &T,
    ) -> Result<(), RenderError> {
        self.instance
            .constants(stage, slot)
            .ok_or(RenderError::NoConstantSlot { stage, slot })?
            .update_constants(gfx, value)
    }

    /// Bind instance and static data, then issue one indexed draw.
    ///
    /// Entries bind in rank order; within a rank instance data goes first.
    pub fn render(
        &self,
        gfx: &mut dyn Graphics,
        view: Mat4,
        projection: Mat4,
    ) -> Result<(), RenderError> {
        let index_count = self.index_count().ok_or(RenderError::MissingIndexData)?;
        let draw = DrawContext {
            model: self.transform.model_matrix(),
            view,
            projection,
        };

        let mut bindings: Vec<&ContextData> =
            self.instance.iter().chain(self.shared.data.iter()).collect();
        bindings.sort_by_key(|data| data.bind_rank());
        for data in bindings {
            data.add(gfx, &draw)?;
        }
        gfx.draw(index_count)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingGraphics;
    use crate::graphics::PrimitiveTopology;
    use crate::recording::Command;
    use glam::Vec3;

    fn static_list(gfx: &mut RecordingGraphics, with_index: bool) -> ContextDataList {
        let mut list = ContextDataList::new();
        list.push(ContextData::vertex_data(gfx, "v", &[[0.0f32; 3]; 3]).unwrap())
            .unwrap();
        if with_index {
            list.push(ContextData::index_data(gfx, "i", &[0, 1, 2]).unwrap())
                .unwrap();
        }
        list.push(ContextData::topology(PrimitiveTopology::TriangleList))
            .unwrap();
        list
    }

    #[test]
    fn cache_builds_once_per_key() {
        let mut gfx = RecordingGraphics::new();
        let mut cache = StaticDataCache::new();
        let mut builds = 0;
        let key = MeshKey::Shape(ShapeKind::Box);

        let a = cache
            .get_or_insert_with(key, || {
                builds += 1;
                Ok(static_list(&mut gfx, true))
            })
            .unwrap();
        let b = cache
            .get_or_insert_with(key, || {
                builds += 1;
                Ok(static_list(&mut gfx, true))
            })
            .unwrap();

        assert_eq!(builds, 1);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&key));
    }

    #[test]
    fn failed_build_is_not_cached() {
        let mut cache = StaticDataCache::new();
        let key = MeshKey::Shape(ShapeKind::Plane);
        let result = cache.get_or_insert_with(key, || Err(RenderError::MissingIndexData));
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn index_data_in_both_lists_is_rejected() {
        let mut gfx = RecordingGraphics::new();
        let mut cache = StaticDataCache::new();
        let shared = cache
            .get_or_insert_with(MeshKey::Shape(ShapeKind::Box), || Ok(static_list(&mut gfx, true)))
            .unwrap();

        let mut instance = ContextDataList::new();
        instance
            .push(ContextData::index_data(&mut gfx, "dup", &[0, 1, 2]).unwrap())
            .unwrap();
        assert!(matches!(
            RenderableMesh::new(Rc::clone(&shared), instance),
            Err(RenderError::DuplicateIndexData)
        ));

        let mut mesh = RenderableMesh::new(shared, ContextDataList::new()).unwrap();
        let index = ContextData::index_data(&mut gfx, "dup", &[0]).unwrap();
        assert!(matches!(
            mesh.add_instance_data(index),
            Err(RenderError::DuplicateIndexData)
        ));
    }

    #[test]
    fn render_without_index_data_fails_before_binding() {
        let mut gfx = RecordingGraphics::new();
        let mut cache = StaticDataCache::new();
        let shared = cache
            .get_or_insert_with(MeshKey::Shape(ShapeKind::Box), || Ok(static_list(&mut gfx, false)))
            .unwrap();
        let mesh = RenderableMesh::new(shared, ContextDataList::new()).unwrap();
        let binds_before = gfx.commands().len();

        let err = mesh.render(&mut gfx, Mat4::IDENTITY, Mat4::IDENTITY).unwrap_err();
        assert!(matches!(err, RenderError::MissingIndexData));
        assert_eq!(gfx.commands().len(), binds_before);
        assert!(gfx.draws().is_empty());
    }

    #[test]
    fn instance_index_data_is_used() {
        let mut gfx = RecordingGraphics::new();
        let mut cache = StaticDataCache::new();
        let shared = cache
            .get_or_insert_with(MeshKey::Shape(ShapeKind::Sphere), || Ok(static_list(&mut gfx, false)))
            .unwrap();
        let mut mesh = RenderableMesh::new(shared, ContextDataList::new()).unwrap();
        mesh.add_instance_data(ContextData::index_data(&mut gfx, "own", &[0, 1, 2, 2, 1, 0]).unwrap())
            .unwrap();
        assert_eq!(mesh.index_count(), Some(6));
    }

    #[test]
    fn set_instance_constants_requires_slot() {
        let mut gfx = RecordingGraphics::new();
        let mut cache = StaticDataCache::new();
        let shared = cache
            .get_or_insert_with(MeshKey::Shape(ShapeKind::Box), || Ok(static_list(&mut gfx, true)))
            .unwrap();
        let mut instance = ContextDataList::new();
        instance
            .push(ContextData::pixel_constants(&mut gfx, 1, &[1.0f32; 4]).unwrap())
            .unwrap();
        let mesh = RenderableMesh::new(shared, instance).unwrap();

        mesh.set_instance_constants(&mut gfx, ShaderStage::Pixel, 1, &[0.5f32; 4])
            .unwrap();
        assert!(matches!(
            mesh.set_instance_constants(&mut gfx, ShaderStage::Vertex, 1, &[0.5f32; 4]),
            Err(RenderError::NoConstantSlot { slot: 1, .. })
        ));
    }

    #[test]
    fn set_transform_moves_model_matrix() {
        let mut gfx = RecordingGraphics::new();
        let mut cache = StaticDataCache::new();
        let shared = cache
            .get_or_insert_with(MeshKey::Shape(ShapeKind::Box), || Ok(static_list(&mut gfx, true)))
            .unwrap();
        let mut mesh = RenderableMesh::new(shared, ContextDataList::new()).unwrap();
        mesh.set_transform(Transform::from_location(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(
            mesh.transform().model_matrix().w_axis.truncate(),
            Vec3::new(1.0, 2.0, 3.0)
        );
        assert!(gfx.commands().iter().all(|c| !matches!(c, Command::Draw { .. })));
    }
}
