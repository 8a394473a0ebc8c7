//! Joint bindings and skinning-matrix buffers

use crate::foundation::math::{Mat4, Mat4Ext};
use crate::scene::description::SkinDesc;
use crate::scene::{SceneError, SceneResult, Skeleton};

/// Texels per matrix in the bone texture (one per column)
pub const TEXELS_PER_MATRIX: u32 = 4;

/// Skinning matrices laid out as an RGBA32F texture
///
/// Row `j` holds joint `j`; texel `c` of a row is column `c` of the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneTexture {
    /// Always [`TEXELS_PER_MATRIX`]
    pub width: u32,
    /// Joint count
    pub height: u32,
    /// `width * height * 4` floats
    pub data: Vec<f32>,
}

/// Binding of a joint subset to one mesh
///
/// Matrices are recomputed only when the skeleton revision or the mesh's
/// local transform revision differs from the one last consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    name: String,
    joints: Vec<usize>,
    inverse_bind: Vec<Mat4>,
    matrices: Vec<Mat4>,
    buffer: Vec<f32>,
    seen: Option<(u64, u64)>,
    recomputes: u64,
}

impl Skin {
    /// Validate a skin against a skeleton of `bone_count` bones
    pub fn new(desc: &SkinDesc, bone_count: usize) -> SceneResult<Self> {
        if let Some(&joint) = desc.joints.iter().find(|&&joint| joint >= bone_count) {
            return Err(SceneError::BoneOutOfRange { index: joint, count: bone_count });
        }

        let inverse_bind = if desc.inverse_bind_matrices.is_empty() {
            vec![Mat4::identity(); desc.joints.len()]
        } else if desc.inverse_bind_matrices.len() == desc.joints.len() {
            desc.inverse_bind_matrices.iter().map(Mat4::from_cols_array).collect()
        } else {
            return Err(SceneError::InvalidSkin {
                skin: desc.name.clone(),
                reason: format!(
                    "{} inverse bind matrices for {} joints",
                    desc.inverse_bind_matrices.len(),
                    desc.joints.len()
                ),
            });
        };

        let count = desc.joints.len();
        Ok(Self {
            name: desc.name.clone(),
            joints: desc.joints.clone(),
            inverse_bind,
            matrices: vec![Mat4::identity(); count],
            buffer: Mat4::identity().to_cols_array().repeat(count),
            seen: None,
            recomputes: 0,
        })
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bone indices, in vertex-attribute joint order
    pub fn joints(&self) -> &[usize] {
        &self.joints
    }

    /// Number of joints
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Current skinning matrices, one per joint
    pub fn matrices(&self) -> &[Mat4] {
        &self.matrices
    }

    /// Column-major flattening of [`Skin::matrices`], `16 * joint_count` floats
    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    /// Number of times the matrices were recomputed
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }

    /// Whether `update` would recompute for these revisions
    pub fn is_stale(&self, skeleton_revision: u64, mesh_revision: u64) -> bool {
        self.seen != Some((skeleton_revision, mesh_revision))
    }

    /// Refresh `meshLocalInverse × boneWorld × inverseBind` for every joint
    ///
    /// Returns `true` when the matrices were recomputed.
    pub fn update(&mut self, skeleton: &Skeleton, mesh_local: &Mat4, mesh_revision: u64) -> SceneResult<bool> {
        if !self.is_stale(skeleton.revision(), mesh_revision) {
            return Ok(false);
        }

        let mesh_inverse = mesh_local.inverse_or_zero();
        for (i, (&joint, inverse_bind)) in self.joints.iter().zip(&self.inverse_bind).enumerate() {
            let matrix = mesh_inverse * skeleton.world_matrix(joint)? * inverse_bind;
            self.matrices[i] = matrix;
            self.buffer[i * 16..(i + 1) * 16].copy_from_slice(matrix.as_slice());
        }

        self.seen = Some((skeleton.revision(), mesh_revision));
        self.recomputes += 1;
        log::trace!("Skin '{}' recomputed {} matrices", self.name, self.joints.len());
        Ok(true)
    }

    /// Pack the buffer as a `4 × joint_count` RGBA32F texture
    pub fn bone_texture(&self) -> BoneTexture {
        BoneTexture {
            width: TEXELS_PER_MATRIX,
            height: u32::try_from(self.joints.len()).unwrap_or(u32::MAX),
            data: self.buffer.clone(),
        }
    }
}
