//! Debug line overlay: world bounding boxes and skeleton bones

use crate::core::DebugConfig;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::backend::{GpuBackend, GpuVertex, MeshHandle, ProgramHandle, ProgramKind, Topology, UniformValue};
use crate::render::{uniforms, RenderResult};
use crate::scene::{Scene, SceneResult};

const BOUNDS_COLOR: [f32; 4] = [1.0, 1.0, 0.0, 1.0];
const BONE_COLOR: [f32; 4] = [0.0, 1.0, 1.0, 1.0];

/// Line-list geometry in world space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineBatch {
    /// Vertices (only positions are meaningful)
    pub vertices: Vec<GpuVertex>,
    /// Pairs of vertex indices
    pub indices: Vec<u32>,
}

impl LineBatch {
    fn push_vertex(&mut self, point: Vec3) -> u32 {
        let index = u32::try_from(self.vertices.len()).unwrap_or(u32::MAX);
        self.vertices.push(GpuVertex { position: point.into(), ..GpuVertex::default() });
        index
    }

    /// Append one segment
    pub fn push_segment(&mut self, a: Vec3, b: Vec3) {
        let a = self.push_vertex(a);
        let b = self.push_vertex(b);
        self.indices.extend([a, b]);
    }

    /// Number of segments
    pub fn segment_count(&self) -> usize {
        self.indices.len() / 2
    }

    /// Whether the batch holds no segment
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Wireframe of every mesh's world bounding box
pub fn bounds_lines(scene: &Scene) -> LineBatch {
    let mut batch = LineBatch::default();
    for (_, object) in scene.objects() {
        for aabb in object.meshes().iter().filter_map(|mesh| mesh.world_bounds()) {
            let geometry = aabb.debug_geometry();
            let base = u32::try_from(batch.vertices.len()).unwrap_or(u32::MAX);
            for corner in geometry.vertices {
                batch.push_vertex(corner);
            }
            batch.indices.extend(geometry.indices.iter().map(|&i| base + u32::from(i)));
        }
    }
    batch
}

/// Parent-to-child bone segments of every skeleton, in world space
pub fn skeleton_lines(scene: &Scene) -> SceneResult<LineBatch> {
    let mut batch = LineBatch::default();
    for (_, object) in scene.objects() {
        let Some(skeleton) = object.skeleton() else {
            continue;
        };
        let global = scene.transforms().global_matrix(object.transform())?;
        for (a, b) in skeleton.debug_lines() {
            batch.push_segment(global.transform_point3(&a), global.transform_point3(&b));
        }
    }
    Ok(batch)
}

/// Uploads and draws the overlay batches with the line program
#[derive(Debug)]
pub struct DebugLineRenderer {
    program: ProgramHandle,
    bounds: Option<MeshHandle>,
    bones: Option<MeshHandle>,
}

impl DebugLineRenderer {
    /// Create the line program
    pub fn new<B: GpuBackend + ?Sized>(backend: &mut B) -> RenderResult<Self> {
        Ok(Self { program: backend.create_program(ProgramKind::DebugLines)?, bounds: None, bones: None })
    }

    /// Draw the enabled overlays on the bound target; returns the number of draws
    pub fn render<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        scene: &Scene,
        view_projection: &Mat4,
        config: &DebugConfig,
    ) -> RenderResult<usize> {
        if !config.any() {
            return Ok(0);
        }
        backend.use_program(self.program);
        backend.set_uniform(uniforms::VIEW_PROJECTION, UniformValue::Mat4(view_projection.to_cols_array()));

        let mut draws = 0;
        if config.draw_bounds {
            let batch = bounds_lines(scene);
            draws += Self::draw_batch(backend, &mut self.bounds, &batch, BOUNDS_COLOR)?;
        }
        if config.draw_skeletons {
            let batch = skeleton_lines(scene)?;
            draws += Self::draw_batch(backend, &mut self.bones, &batch, BONE_COLOR)?;
        }
        Ok(draws)
    }

    fn draw_batch<B: GpuBackend + ?Sized>(
        backend: &mut B,
        slot: &mut Option<MeshHandle>,
        batch: &LineBatch,
        color: [f32; 4],
    ) -> RenderResult<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        let mesh = match *slot {
            Some(mesh) => {
                backend.update_mesh_buffers(mesh, &batch.vertices, &batch.indices)?;
                mesh
            }
            None => {
                let mesh = backend.create_mesh_buffers(&batch.vertices, &batch.indices)?;
                *slot = Some(mesh);
                mesh
            }
        };
        backend.set_uniform(uniforms::MODEL, UniformValue::Mat4(Mat4::identity().to_cols_array()));
        backend.set_uniform(uniforms::BASE_COLOR, UniformValue::Vec4(color));
        backend.draw_indexed(mesh, Topology::Lines, u32::try_from(batch.indices.len()).unwrap_or(u32::MAX))?;
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::description::{MeshDesc, NodeDesc, ObjectDesc, PrimitiveDesc};

    fn boxed_object() -> ObjectDesc {
        ObjectDesc {
            position: [0.0, 0.0, 5.0],
            meshes: vec![MeshDesc {
                primitives: vec![PrimitiveDesc {
                    positions: vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [1.0, 0.0, 0.0]],
                    ..PrimitiveDesc::default()
                }],
                ..MeshDesc::default()
            }],
            nodes: vec![
                NodeDesc { children: vec![1], ..NodeDesc::default() },
                NodeDesc { translation: [0.0, 2.0, 0.0], ..NodeDesc::default() },
            ],
            ..ObjectDesc::default()
        }
    }

    #[test]
    fn test_bounds_wireframe_has_twelve_edges() {
        let mut scene = Scene::new();
        scene.add_object(&boxed_object()).unwrap();
        scene.update(0.0).unwrap();
        let batch = bounds_lines(&scene);
        assert_eq!(batch.vertices.len(), 8);
        assert_eq!(batch.segment_count(), 12);
    }

    #[test]
    fn test_bone_segments_are_in_world_space() {
        let mut scene = Scene::new();
        scene.add_object(&boxed_object()).unwrap();
        scene.update(0.0).unwrap();
        let batch = skeleton_lines(&scene).unwrap();
        assert_eq!(batch.segment_count(), 1);
        assert_eq!(batch.vertices[0].position, [0.0, 0.0, 5.0]);
        assert_eq!(batch.vertices[1].position, [0.0, 2.0, 5.0]);
    }
}
