//! Bone hierarchy and forward kinematics
//!
//! Bones live in a flat array and reference each other by index; the
//! hierarchy is a forest (several roots are allowed). Pose changes only mark
//! the skeleton dirty. The world matrices are brought up to date by a single
//! depth-first walk in [`Skeleton::update`], so any number of per-frame pose
//! writes cost one traversal.

use crate::foundation::math::{utils, Mat4, Mat4Ext, RawQuat, Vec3};
use crate::scene::description::NodeDesc;
use crate::scene::{SceneError, SceneResult};

/// Local translation/rotation/scale of a bone
///
/// The rotation is kept raw because keyframe lerping can leave it slightly
/// unnormalized; it is normalized when the local matrix is composed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonePose {
    /// Translation
    pub translation: Vec3,
    /// Rotation
    pub rotation: RawQuat,
    /// Scale
    pub scale: Vec3,
}

impl Default for BonePose {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: RawQuat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl BonePose {
    /// `translation × rotation × scale`
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.translation)
            * utils::normalize_or_identity(&self.rotation).to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// One joint of the skeleton
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    name: String,
    index: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    mesh: Option<usize>,
    pose: BonePose,
    bind_matrix: Mat4,
    local: Mat4,
    world: Mat4,
}

impl Bone {
    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of this bone in the skeleton
    pub fn index(&self) -> usize {
        self.index
    }

    /// Parent bone index, `None` for a root
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Child bone indices
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Mesh driven rigidly by this bone
    pub fn mesh(&self) -> Option<usize> {
        self.mesh
    }

    /// Current local pose
    pub fn pose(&self) -> &BonePose {
        &self.pose
    }

    /// Static bind matrix from the node description
    pub fn bind_matrix(&self) -> &Mat4 {
        &self.bind_matrix
    }

    /// Local matrix as of the last update
    pub fn local_matrix(&self) -> &Mat4 {
        &self.local
    }

    /// World (skeleton-space) matrix as of the last update
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }

    fn compose_local(&self) -> Mat4 {
        self.bind_matrix * self.pose.to_matrix()
    }
}

/// Flat bone array plus dirty tracking
///
/// `Clone` is a deep copy that preserves every index reference, which is how
/// an object duplicates its skeleton without sharing mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    bones: Vec<Bone>,
    roots: Vec<usize>,
    rest_pose: Vec<BonePose>,
    dirty: bool,
    revision: u64,
    fk_passes: u64,
}

impl Skeleton {
    /// Build a skeleton from node descriptions
    ///
    /// Parent indices are derived from the children lists. A node claimed by
    /// two parents, a child index out of range or a cycle is rejected.
    pub fn from_nodes(nodes: &[NodeDesc]) -> SceneResult<Self> {
        let count = nodes.len();
        let mut parents: Vec<Option<usize>> = vec![None; count];
        for (index, node) in nodes.iter().enumerate() {
            for &child in &node.children {
                if child >= count {
                    return Err(SceneError::BoneOutOfRange { index: child, count });
                }
                if child == index {
                    return Err(SceneError::InvalidHierarchy(format!("node {index} lists itself as a child")));
                }
                if let Some(previous) = parents[child].replace(index) {
                    return Err(SceneError::InvalidHierarchy(format!(
                        "node {child} has two parents ({previous} and {index})"
                    )));
                }
            }
        }

        let bones: Vec<Bone> = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let pose = BonePose {
                    translation: Vec3::from(node.translation),
                    rotation: utils::raw_quat_from_xyzw(node.rotation),
                    scale: Vec3::from(node.scale),
                };
                Bone {
                    name: node.name.clone(),
                    index,
                    parent: parents[index],
                    children: node.children.clone(),
                    mesh: node.mesh,
                    pose,
                    bind_matrix: node.matrix.as_ref().map_or_else(Mat4::identity, Mat4::from_cols_array),
                    local: Mat4::identity(),
                    world: Mat4::identity(),
                }
            })
            .collect();

        let roots: Vec<usize> = (0..count).filter(|&i| parents[i].is_none()).collect();

        // With single parents guaranteed, every node unreachable from a root sits on a cycle
        let mut reached = 0;
        let mut stack = roots.clone();
        while let Some(index) = stack.pop() {
            reached += 1;
            stack.extend_from_slice(&bones[index].children);
        }
        if reached != count {
            return Err(SceneError::InvalidHierarchy(format!(
                "{} of {count} nodes are not reachable from a root",
                count - reached
            )));
        }

        let rest_pose = bones.iter().map(|bone| bone.pose).collect();
        let mut skeleton = Self {
            bones,
            roots,
            rest_pose,
            dirty: true,
            revision: 0,
            fk_passes: 0,
        };
        skeleton.update();
        log::debug!("Skeleton built: {} bones, {} roots", count, skeleton.roots.len());
        Ok(skeleton)
    }

    /// Number of bones
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    /// Whether the skeleton has no bones
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// All bones, indexed by bone index
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Borrow one bone
    pub fn bone(&self, index: usize) -> SceneResult<&Bone> {
        self.bones.get(index).ok_or(SceneError::BoneOutOfRange { index, count: self.bones.len() })
    }

    /// Root bone indices
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// World matrix of one bone as of the last update
    pub fn world_matrix(&self, index: usize) -> SceneResult<Mat4> {
        self.bone(index).map(|bone| bone.world)
    }

    /// Set a bone's local translation
    pub fn set_translation(&mut self, index: usize, translation: Vec3) -> SceneResult<()> {
        self.bone_mut(index)?.pose.translation = translation;
        Ok(())
    }

    /// Set a bone's local rotation
    pub fn set_rotation(&mut self, index: usize, rotation: RawQuat) -> SceneResult<()> {
        self.bone_mut(index)?.pose.rotation = rotation;
        Ok(())
    }

    /// Set a bone's local scale
    pub fn set_scale(&mut self, index: usize, scale: Vec3) -> SceneResult<()> {
        self.bone_mut(index)?.pose.scale = scale;
        Ok(())
    }

    /// Replace a bone's whole local pose
    pub fn set_pose(&mut self, index: usize, pose: BonePose) -> SceneResult<()> {
        self.bone_mut(index)?.pose = pose;
        Ok(())
    }

    /// Restore the pose every bone had at construction
    pub fn reset_to_rest_pose(&mut self) {
        for (bone, rest) in self.bones.iter_mut().zip(&self.rest_pose) {
            bone.pose = *rest;
        }
        self.dirty = true;
        log::debug!("Skeleton reset to rest pose");
    }

    /// Whether world matrices are stale
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Incremented every time world matrices are recomputed
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of forward-kinematics walks performed so far
    pub fn fk_passes(&self) -> u64 {
        self.fk_passes
    }

    /// Recompute local and world matrices if any pose changed
    ///
    /// Returns `true` when a walk was performed.
    pub fn update(&mut self) -> bool {
        if !self.dirty {
            return false;
        }

        let mut stack: Vec<(usize, Mat4)> = self.roots.iter().map(|&root| (root, Mat4::identity())).collect();
        while let Some((index, parent_world)) = stack.pop() {
            let bone = &mut self.bones[index];
            bone.local = bone.compose_local();
            bone.world = parent_world * bone.local;
            let world = bone.world;
            stack.extend(bone.children.iter().map(|&child| (child, world)));
        }

        self.dirty = false;
        self.revision += 1;
        self.fk_passes += 1;
        log::trace!("Skeleton FK pass {} over {} bones", self.fk_passes, self.bones.len());
        true
    }

    /// `(mesh index, bone world matrix)` for every bone that drives a mesh
    pub fn mesh_attachments(&self) -> impl Iterator<Item = (usize, Mat4)> + '_ {
        self.bones
            .iter()
            .filter_map(|bone| bone.mesh.map(|mesh| (mesh, bone.world)))
    }

    /// Line segments from each bone to its parent, in skeleton space
    pub fn debug_lines(&self) -> Vec<(Vec3, Vec3)> {
        self.bones
            .iter()
            .filter_map(|bone| {
                let parent = &self.bones[bone.parent?];
                Some((
                    parent.world.transform_point3(&Vec3::zeros()),
                    bone.world.transform_point3(&Vec3::zeros()),
                ))
            })
            .collect()
    }

    fn bone_mut(&mut self, index: usize) -> SceneResult<&mut Bone> {
        let count = self.bones.len();
        let bone = self.bones.get_mut(index).ok_or(SceneError::BoneOutOfRange { index, count })?;
        self.dirty = true;
        Ok(bone)
    }
}
