//! Per-frame draw list and the GPU resources it refers to
//!
//! Every pass draws from the same [`DrawList`] and binds per-draw state
//! through [`GpuResources::bind_draw`], so skinning is applied identically in
//! the shadow passes and in the main pass.

use crate::foundation::math::{Mat3, Mat4, Mat4Ext, Vec4};
use crate::render::backend::{texture_units, GpuBackend, GpuVertex, MeshHandle, TextureHandle, Topology, UniformValue};
use crate::render::{uniforms, RenderResult};
use crate::scene::{MeshPrimitive, ObjectId, Scene, SceneResult};
use std::collections::{HashMap, HashSet};

/// Everything needed to issue one primitive draw
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    /// Owning object
    pub object: ObjectId,
    /// Mesh index within the object
    pub mesh: usize,
    /// Primitive index within the mesh
    pub primitive: usize,
    /// Global model matrix of the mesh
    pub model: Mat4,
    /// Inverse-transpose of the model matrix
    pub normal: Mat3,
    /// Skin index within the object
    pub skin: Option<usize>,
    /// Base color factor
    pub base_color: Vec4,
    /// Drawn by the main pass
    pub visible: bool,
    /// Drawn by the shadow passes
    pub casts_shadow: bool,
    /// The owning object carries a point light
    pub carries_light: bool,
}

impl DrawItem {
    /// Whether the shadow passes draw this item
    ///
    /// Geometry of light-carrying objects is skipped so a lamp does not
    /// shadow its own light.
    pub fn in_shadow_pass(&self) -> bool {
        self.casts_shadow && !self.carries_light
    }
}

/// Draws collected from a scene after its update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    items: Vec<DrawItem>,
}

impl DrawList {
    /// Collect one item per primitive, in object order
    pub fn collect(scene: &Scene) -> SceneResult<Self> {
        let mut items = Vec::new();
        for (object_id, object) in scene.objects() {
            let carries_light = object.light().is_some();
            for (mesh_index, mesh) in object.meshes().iter().enumerate() {
                let model = scene.transforms().global_matrix(mesh.transform())?;
                let normal = model.normal_matrix();
                let skin = mesh
                    .skin()
                    .filter(|&index| object.skins().get(index).is_some_and(|skin| skin.joint_count() > 0));
                for (primitive_index, primitive) in mesh.primitives().iter().enumerate() {
                    items.push(DrawItem {
                        object: object_id,
                        mesh: mesh_index,
                        primitive: primitive_index,
                        model,
                        normal,
                        skin,
                        base_color: primitive.base_color,
                        visible: mesh.is_visible(),
                        casts_shadow: mesh.casts_shadow(),
                        carries_light,
                    });
                }
            }
        }
        Ok(Self { items })
    }

    /// All items
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    /// Items the main pass draws
    pub fn main_pass(&self) -> impl Iterator<Item = &DrawItem> {
        self.items.iter().filter(|item| item.visible)
    }

    /// Items the shadow passes draw
    pub fn shadow_casters(&self) -> impl Iterator<Item = &DrawItem> {
        self.items.iter().filter(|item| item.in_shadow_pass())
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct BoneSlot {
    texture: TextureHandle,
    joints: u32,
    recomputes: u64,
}

/// Uploads performed by [`GpuResources::sync`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Primitive buffers created
    pub mesh_uploads: usize,
    /// Bone textures created or updated
    pub bone_uploads: usize,
    /// Resources released for removed objects
    pub released: usize,
}

/// Mesh buffers and bone textures keyed by scene location
#[derive(Debug, Default)]
pub struct GpuResources {
    meshes: HashMap<(ObjectId, usize, usize), (MeshHandle, u32)>,
    bones: HashMap<(ObjectId, usize), BoneSlot>,
}

impl GpuResources {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload missing geometry, refresh bone textures whose skin recomputed
    /// and release resources of removed objects
    pub fn sync<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        scene: &Scene,
        draws: &DrawList,
    ) -> RenderResult<SyncStats> {
        let mut stats = SyncStats::default();

        for item in draws.items() {
            let key = (item.object, item.mesh, item.primitive);
            if self.meshes.contains_key(&key) {
                continue;
            }
            let object = scene.object(item.object)?;
            let primitive = &object.meshes()[item.mesh].primitives()[item.primitive];
            let (vertices, indices) = gpu_geometry(primitive);
            let handle = backend.create_mesh_buffers(&vertices, &indices)?;
            self.meshes.insert(key, (handle, u32::try_from(indices.len()).unwrap_or(u32::MAX)));
            stats.mesh_uploads += 1;
        }

        let skinned: HashSet<(ObjectId, usize)> =
            draws.items().iter().filter_map(|item| item.skin.map(|skin| (item.object, skin))).collect();
        for (object_id, skin_index) in skinned {
            let skin = &scene.object(object_id)?.skins()[skin_index];
            let texture = skin.bone_texture();
            match self.bones.get_mut(&(object_id, skin_index)) {
                Some(slot) if slot.recomputes == skin.recomputes() => {}
                Some(slot) => {
                    backend.update_texture_rgba32f(slot.texture, texture.width, texture.height, &texture.data)?;
                    slot.recomputes = skin.recomputes();
                    slot.joints = texture.height;
                    stats.bone_uploads += 1;
                }
                None => {
                    let handle = backend.create_texture_rgba32f(texture.width, texture.height, &texture.data)?;
                    self.bones.insert(
                        (object_id, skin_index),
                        BoneSlot { texture: handle, joints: texture.height, recomputes: skin.recomputes() },
                    );
                    stats.bone_uploads += 1;
                }
            }
        }

        let live: HashSet<ObjectId> = scene.objects().map(|(id, _)| id).collect();
        let before = self.meshes.len() + self.bones.len();
        self.meshes.retain(|(object, _, _), (handle, _)| {
            let keep = live.contains(object);
            if !keep {
                backend.delete_mesh_buffers(*handle);
            }
            keep
        });
        self.bones.retain(|(object, _), slot| {
            let keep = live.contains(object);
            if !keep {
                backend.delete_texture(slot.texture);
            }
            keep
        });
        stats.released = before - self.meshes.len() - self.bones.len();

        if stats != SyncStats::default() {
            log::debug!("GPU resources synced: {stats:?}");
        }
        Ok(stats)
    }

    /// Set model, normal and skinning uniforms for one item
    ///
    /// Returns the buffers to draw, or `None` if the item was never uploaded.
    pub fn bind_draw<B: GpuBackend + ?Sized>(&self, backend: &mut B, item: &DrawItem) -> Option<(MeshHandle, u32)> {
        let buffers = self.meshes.get(&(item.object, item.mesh, item.primitive)).copied()?;

        backend.set_uniform(uniforms::MODEL, UniformValue::Mat4(item.model.to_cols_array()));
        let mut normal = [0.0; 9];
        normal.copy_from_slice(item.normal.as_slice());
        backend.set_uniform(uniforms::NORMAL_MATRIX, UniformValue::Mat3(normal));

        match item.skin.and_then(|skin| self.bones.get(&(item.object, skin))) {
            Some(slot) => {
                backend.set_uniform(uniforms::SKINNED, UniformValue::Int(1));
                backend.set_uniform(uniforms::JOINT_COUNT, UniformValue::Int(i32::try_from(slot.joints).unwrap_or(0)));
                backend.bind_texture(texture_units::BONES, slot.texture);
                backend.set_uniform(uniforms::BONE_TEXTURE, UniformValue::Sampler(texture_units::BONES));
            }
            None => backend.set_uniform(uniforms::SKINNED, UniformValue::Int(0)),
        }
        Some(buffers)
    }

    /// Bind and draw one item; returns whether a draw was issued
    pub fn draw<B: GpuBackend + ?Sized>(&self, backend: &mut B, item: &DrawItem) -> RenderResult<bool> {
        let Some((mesh, count)) = self.bind_draw(backend, item) else {
            return Ok(false);
        };
        if count == 0 {
            return Ok(false);
        }
        backend.draw_indexed(mesh, Topology::Triangles, count)?;
        Ok(true)
    }

    /// Release every buffer and bone texture; returns how many were released
    ///
    /// Keys are only meaningful within one scene, so this must run before a
    /// different scene is rendered.
    pub fn clear<B: GpuBackend + ?Sized>(&mut self, backend: &mut B) -> usize {
        let released = self.meshes.len() + self.bones.len();
        for (_, (handle, _)) in self.meshes.drain() {
            backend.delete_mesh_buffers(handle);
        }
        for (_, slot) in self.bones.drain() {
            backend.delete_texture(slot.texture);
        }
        if released > 0 {
            log::debug!("Released {released} GPU resources");
        }
        released
    }

    /// Number of uploaded primitive buffers
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of bone textures
    pub fn bone_texture_count(&self) -> usize {
        self.bones.len()
    }
}

/// Interleave a primitive into GPU vertices; non-indexed geometry gets a
/// sequential index list
pub fn gpu_geometry(primitive: &MeshPrimitive) -> (Vec<GpuVertex>, Vec<u32>) {
    let vertices = primitive
        .positions
        .iter()
        .enumerate()
        .map(|(i, position)| {
            let normal = primitive.normals.get(i).copied().unwrap_or_default();
            let uv = primitive.uvs.get(i).copied().unwrap_or_default();
            let joints = primitive.joints.get(i).map_or([0.0; 4], |j| j.map(f32::from));
            let weights = primitive.weights.get(i).copied().unwrap_or([0.0; 4]);
            GpuVertex {
                position: [position.x, position.y, position.z],
                normal: [normal.x, normal.y, normal.z],
                uv: [uv.x, uv.y],
                joints,
                weights,
            }
        })
        .collect();

    let indices = if primitive.indices.is_empty() {
        (0..u32::try_from(primitive.positions.len()).unwrap_or(u32::MAX)).collect()
    } else {
        primitive.indices.clone()
    };
    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{ProgramKind, RecordingBackend};
    use crate::scene::description::{LightDesc, MeshDesc, ObjectDesc, PrimitiveDesc};

    fn triangle_object(light: bool) -> ObjectDesc {
        ObjectDesc {
            meshes: vec![MeshDesc {
                primitives: vec![PrimitiveDesc {
                    positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                    ..PrimitiveDesc::default()
                }],
                ..MeshDesc::default()
            }],
            light: light.then(LightDesc::default),
            ..ObjectDesc::default()
        }
    }

    #[test]
    fn test_light_carriers_are_not_shadow_casters() {
        let mut scene = Scene::new();
        scene.add_object(&triangle_object(false)).unwrap();
        scene.add_object(&triangle_object(true)).unwrap();
        let draws = DrawList::collect(&scene).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws.main_pass().count(), 2);
        assert_eq!(draws.shadow_casters().count(), 1);
    }

    #[test]
    fn test_non_indexed_geometry_gets_sequential_indices() {
        let primitive = MeshPrimitive::from_desc("tri", &triangle_object(false).meshes[0].primitives[0], None).unwrap();
        let (vertices, indices) = gpu_geometry(&primitive);
        assert_eq!(vertices.len(), 3);
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(vertices[0].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_sync_uploads_once_and_releases_removed_objects() {
        let mut scene = Scene::new();
        let id = scene.add_object(&triangle_object(false)).unwrap();
        let mut backend = RecordingBackend::new();
        let mut resources = GpuResources::new();

        let draws = DrawList::collect(&scene).unwrap();
        assert_eq!(resources.sync(&mut backend, &scene, &draws).unwrap().mesh_uploads, 1);
        assert_eq!(resources.sync(&mut backend, &scene, &draws).unwrap().mesh_uploads, 0);

        let program = backend.create_program(ProgramKind::Main).unwrap();
        backend.use_program(program);
        assert!(resources.draw(&mut backend, &draws.items()[0]).unwrap());
        assert_eq!(backend.last_uniform(uniforms::SKINNED), Some(UniformValue::Int(0)));

        scene.remove_object(id).unwrap();
        let draws = DrawList::collect(&scene).unwrap();
        assert_eq!(resources.sync(&mut backend, &scene, &draws).unwrap().released, 1);
        assert_eq!(backend.mesh_count(), 0);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut scene = Scene::new();
        scene.add_object(&triangle_object(false)).unwrap();
        scene.add_object(&triangle_object(false)).unwrap();
        let mut backend = RecordingBackend::new();
        let mut resources = GpuResources::new();
        let draws = DrawList::collect(&scene).unwrap();
        resources.sync(&mut backend, &scene, &draws).unwrap();
        assert_eq!(backend.mesh_count(), 2);

        assert_eq!(resources.clear(&mut backend), 2);
        assert_eq!(resources.mesh_count(), 0);
        assert_eq!(backend.mesh_count(), 0);
        assert_eq!(resources.sync(&mut backend, &scene, &draws).unwrap().mesh_uploads, 2);
    }
}
