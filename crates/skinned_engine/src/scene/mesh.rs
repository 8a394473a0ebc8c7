//! Meshes and their primitives

use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};
use crate::scene::description::{MeshDesc, PrimitiveDesc};
use crate::scene::{Aabb, SceneError, SceneResult, Skin, TransformId};
use bitflags::bitflags;

bitflags! {
    /// Per-mesh render switches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MeshFlags: u32 {
        /// Drawn by the main pass
        const VISIBLE = 1 << 0;
        /// Drawn by the shadow passes
        const CASTS_SHADOW = 1 << 1;
        /// Vertices are blended by a skin
        const SKINNED = 1 << 2;
    }
}

/// Geometry and material of one draw call
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPrimitive {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Vertex normals, one per position
    pub normals: Vec<Vec3>,
    /// Texture coordinates, one per position
    pub uvs: Vec<Vec2>,
    /// Triangle list indices
    pub indices: Vec<u32>,
    /// Joint indices per vertex (empty for rigid geometry)
    pub joints: Vec<[u16; 4]>,
    /// Joint weights per vertex (empty for rigid geometry)
    pub weights: Vec<[f32; 4]>,
    /// Base color factor
    pub base_color: Vec4,
    /// Base color texture reference
    pub texture: Option<String>,
    /// Authoring-time bounds, when the asset supplied them
    pub bounds: Option<(Vec3, Vec3)>,
}

impl MeshPrimitive {
    /// Validate and convert a primitive description
    ///
    /// Missing normals default to +Y and missing UVs to zero. Skinned
    /// primitives need one joint/weight set per vertex, each joint inside
    /// the skin.
    pub fn from_desc(mesh: &str, desc: &PrimitiveDesc, skin_joints: Option<usize>) -> SceneResult<Self> {
        let count = desc.positions.len();
        let invalid = |reason: String| SceneError::InvalidPrimitive { mesh: mesh.to_string(), reason };

        for (attribute, len) in [("normals", desc.normals.len()), ("uvs", desc.uvs.len())] {
            if len != 0 && len != count {
                return Err(invalid(format!("{len} {attribute} for {count} positions")));
            }
        }
        if let Some(&index) = desc.indices.iter().find(|&&i| i as usize >= count) {
            return Err(invalid(format!("index {index} past {count} positions")));
        }

        if let Some(joint_count) = skin_joints {
            if desc.joints.len() != count || desc.weights.len() != count {
                return Err(invalid(format!(
                    "{} joint sets and {} weight sets for {count} skinned positions",
                    desc.joints.len(),
                    desc.weights.len()
                )));
            }
            let out_of_range = desc
                .joints
                .iter()
                .flatten()
                .find(|&&joint| usize::from(joint) >= joint_count);
            if let Some(joint) = out_of_range {
                return Err(invalid(format!("joint {joint} past the skin's {joint_count} joints")));
            }
        }

        let bounds = desc.min.zip(desc.max).map(|(min, max)| (Vec3::from(min), Vec3::from(max)));
        let normals = if desc.normals.is_empty() {
            vec![Vec3::y(); count]
        } else {
            desc.normals.iter().copied().map(Vec3::from).collect()
        };
        let uvs = if desc.uvs.is_empty() {
            vec![Vec2::zeros(); count]
        } else {
            desc.uvs.iter().copied().map(Vec2::from).collect()
        };

        Ok(Self {
            positions: desc.positions.iter().copied().map(Vec3::from).collect(),
            normals,
            uvs,
            indices: desc.indices.clone(),
            joints: if skin_joints.is_some() { desc.joints.clone() } else { Vec::new() },
            weights: if skin_joints.is_some() { desc.weights.clone() } else { Vec::new() },
            base_color: Vec4::from(desc.material.base_color),
            texture: desc.material.texture.clone(),
            bounds,
        })
    }

    /// Bounds from authoring min/max, else folded over the positions
    pub fn static_bounds(&self) -> Option<Aabb> {
        match self.bounds {
            Some((min, max)) => Some(Aabb::new(min, max)),
            None => Aabb::from_points(self.positions.iter().copied()),
        }
    }

    /// Number of indices, or vertices for non-indexed geometry
    pub fn element_count(&self) -> usize {
        if self.indices.is_empty() {
            self.positions.len()
        } else {
            self.indices.len()
        }
    }
}

/// A set of primitives sharing one transform and (optionally) one skin
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    name: String,
    transform: TransformId,
    primitives: Vec<MeshPrimitive>,
    skin: Option<usize>,
    flags: MeshFlags,
    local_bounds: Option<Aabb>,
    bounds_dirty: bool,
    world_bounds: Option<(u64, Aabb)>,
}

impl Mesh {
    /// Build a mesh; `skin_joints` is the joint count of the referenced skin
    pub fn new(desc: &MeshDesc, transform: TransformId, skin_joints: Option<usize>) -> SceneResult<Self> {
        let primitives = desc
            .primitives
            .iter()
            .map(|primitive| MeshPrimitive::from_desc(&desc.name, primitive, skin_joints))
            .collect::<SceneResult<Vec<_>>>()?;

        let mut flags = MeshFlags::VISIBLE;
        flags.set(MeshFlags::CASTS_SHADOW, desc.casts_shadow);
        flags.set(MeshFlags::SKINNED, desc.skin.is_some());

        let local_bounds = Self::fold_bounds(primitives.iter().filter_map(MeshPrimitive::static_bounds));
        Ok(Self {
            name: desc.name.clone(),
            transform,
            primitives,
            skin: desc.skin,
            flags,
            local_bounds,
            bounds_dirty: desc.skin.is_some(),
            world_bounds: None,
        })
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transform handle (parented to the owning object)
    pub fn transform(&self) -> TransformId {
        self.transform
    }

    pub(crate) fn set_transform(&mut self, transform: TransformId) {
        self.transform = transform;
        self.world_bounds = None;
    }

    /// Primitives
    pub fn primitives(&self) -> &[MeshPrimitive] {
        &self.primitives
    }

    /// Index of the skin blending this mesh
    pub fn skin(&self) -> Option<usize> {
        self.skin
    }

    /// Render switches
    pub fn flags(&self) -> MeshFlags {
        self.flags
    }

    /// Whether the mesh is blended by a skin
    pub fn is_skinned(&self) -> bool {
        self.flags.contains(MeshFlags::SKINNED)
    }

    /// Whether the main pass draws this mesh
    pub fn is_visible(&self) -> bool {
        self.flags.contains(MeshFlags::VISIBLE)
    }

    /// Whether the shadow passes draw this mesh
    pub fn casts_shadow(&self) -> bool {
        self.flags.contains(MeshFlags::CASTS_SHADOW)
    }

    /// Show or hide the mesh
    pub fn set_visible(&mut self, visible: bool) {
        self.flags.set(MeshFlags::VISIBLE, visible);
    }

    /// Toggle shadow casting
    pub fn set_casts_shadow(&mut self, casts: bool) {
        self.flags.set(MeshFlags::CASTS_SHADOW, casts);
    }

    /// Bounds in the mesh's local space
    pub fn local_bounds(&self) -> Option<&Aabb> {
        self.local_bounds.as_ref()
    }

    /// World-space bounds as of the last scene update
    pub fn world_bounds(&self) -> Option<&Aabb> {
        self.world_bounds.as_ref().map(|(_, aabb)| aabb)
    }

    /// Mark the local bounds for rebuild on the next update
    pub fn invalidate_bounds(&mut self) {
        self.bounds_dirty = true;
        self.world_bounds = None;
    }

    /// Whether the local bounds wait for a rebuild
    pub fn bounds_dirty(&self) -> bool {
        self.bounds_dirty
    }

    /// Rebuild dirty local bounds, from skinned vertices when a skin is given
    ///
    /// Returns `true` when a rebuild happened.
    pub fn rebuild_bounds(&mut self, skin: Option<&Skin>) -> bool {
        if !self.bounds_dirty {
            return false;
        }
        self.local_bounds = match skin {
            Some(skin) => Self::fold_bounds(self.primitives.iter().filter_map(|primitive| {
                Aabb::from_skinned(&primitive.positions, &primitive.joints, &primitive.weights, skin.matrices())
            })),
            None => Self::fold_bounds(self.primitives.iter().filter_map(MeshPrimitive::static_bounds)),
        };
        self.bounds_dirty = false;
        true
    }

    /// Re-fit the world bounds if the transform revision moved
    pub fn refresh_world_bounds(&mut self, global: &Mat4, revision: u64) -> bool {
        if matches!(self.world_bounds, Some((seen, _)) if seen == revision) {
            return false;
        }
        self.world_bounds = self.local_bounds.map(|aabb| (revision, aabb.transformed(global)));
        true
    }

    fn fold_bounds(boxes: impl Iterator<Item = Aabb>) -> Option<Aabb> {
        boxes.reduce(|a, b| a.union(&b))
    }
}
