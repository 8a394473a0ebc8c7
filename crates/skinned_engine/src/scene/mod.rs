//! Scene graph: transforms, skeletons, skins, bounds and scene objects
//!
//! Change propagation is pull-based. Every mutation stamps a revision, and
//! dependents (skins, bounding boxes, shadow passes) compare the revision they
//! last consumed during the explicit per-frame update pass
//! (transforms, then bones, then skins, then bounds).

pub mod aabb;
pub mod context;
pub mod description;
pub mod light;
pub mod mesh;
pub mod object;
pub mod skeleton;
pub mod skin;
pub mod transform;

pub use aabb::{Aabb, DebugGeometry};
pub use context::{ObjectId, PickHit, Scene};
pub use description::{
    AnimationDesc, ChannelDesc, LightDesc, MaterialDesc, MeshDesc, NodeDesc, ObjectDesc,
    PrimitiveDesc, SamplerDesc, SceneDesc, SkinDesc,
};
pub use light::{DirectionalLight, LightId, Lights, PointLight};
pub use mesh::{Mesh, MeshFlags, MeshPrimitive};
pub use object::{SceneObject, UpdateStats};
pub use skeleton::{Bone, BonePose, Skeleton};
pub use skin::{BoneTexture, Skin};
pub use transform::{Transform, TransformId, Transforms};

use crate::animation::AnimationError;
use thiserror::Error;

/// Errors raised for programmer-contract violations in scene data
///
/// Degraded-but-valid data (zero-length animations, unnormalized weights,
/// dangling parent links) never produces an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// A light handle does not refer to a live point light
    #[error("Unknown light: {0:?}")]
    UnknownLight(LightId),

    /// A transform handle does not refer to a live transform
    #[error("Unknown transform: {0:?}")]
    UnknownTransform(TransformId),

    /// An object handle does not refer to a live object
    #[error("Unknown object: {0:?}")]
    UnknownObject(ObjectId),

    /// Re-parenting would make a transform its own ancestor
    #[error("Parenting {child:?} under {parent:?} would create a cycle")]
    TransformCycle {
        /// Transform being re-parented
        child: TransformId,
        /// Requested parent
        parent: TransformId,
    },

    /// A bone index is outside the skeleton
    #[error("Bone index {index} out of range (skeleton has {count} bones)")]
    BoneOutOfRange {
        /// Offending index
        index: usize,
        /// Number of bones in the skeleton
        count: usize,
    },

    /// The node hierarchy is not a forest
    #[error("Invalid bone hierarchy: {0}")]
    InvalidHierarchy(String),

    /// A mesh index is outside the object's mesh list
    #[error("Mesh index {index} out of range (object has {count} meshes)")]
    MeshOutOfRange {
        /// Offending index
        index: usize,
        /// Number of meshes
        count: usize,
    },

    /// A skin index is outside the object's skin list
    #[error("Skin index {index} out of range (object has {count} skins)")]
    SkinOutOfRange {
        /// Offending index
        index: usize,
        /// Number of skins
        count: usize,
    },

    /// Skin binding data is inconsistent
    #[error("Invalid skin '{skin}': {reason}")]
    InvalidSkin {
        /// Skin name
        skin: String,
        /// What is wrong with it
        reason: String,
    },

    /// Vertex attribute arrays disagree in length
    #[error("Invalid primitive in mesh '{mesh}': {reason}")]
    InvalidPrimitive {
        /// Mesh name
        mesh: String,
        /// What is wrong with it
        reason: String,
    },

    /// An animation index is outside the object's animation list
    #[error("Animation index {index} out of range (object has {count} animations)")]
    AnimationOutOfRange {
        /// Offending index
        index: usize,
        /// Number of animations
        count: usize,
    },

    /// Animation data is invalid
    #[error(transparent)]
    Animation(#[from] AnimationError),
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
