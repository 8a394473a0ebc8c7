//! Plain-data scene descriptions handed over by the asset layer
//!
//! These structs are the boundary between asset parsing (out of scope) and the
//! engine core. Every optional field resolves to an explicit default at
//! deserialization time, so consumers never have to guess.

use crate::animation::{ChannelPath, Interpolation};
use crate::core::Config;
use serde::{Deserialize, Serialize};

fn zero3() -> [f32; 3] {
    [0.0; 3]
}

fn one3() -> [f32; 3] {
    [1.0; 3]
}

fn identity_xyzw() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn white() -> [f32; 4] {
    [1.0; 4]
}

fn yes() -> bool {
    true
}

/// One node of a skeleton hierarchy
///
/// Parent links are derived from `children`. `matrix` is the static bind
/// matrix (column-major), composed outside the TRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDesc {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Local translation
    #[serde(default = "zero3")]
    pub translation: [f32; 3],
    /// Local rotation as `[x, y, z, w]`
    #[serde(default = "identity_xyzw")]
    pub rotation: [f32; 4],
    /// Local scale
    #[serde(default = "one3")]
    pub scale: [f32; 3],
    /// Static bind matrix, column-major
    #[serde(default)]
    pub matrix: Option<[f32; 16]>,
    /// Indices of child nodes
    #[serde(default)]
    pub children: Vec<usize>,
    /// Mesh rigidly driven by this node
    #[serde(default)]
    pub mesh: Option<usize>,
}

impl Default for NodeDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            translation: zero3(),
            rotation: identity_xyzw(),
            scale: one3(),
            matrix: None,
            children: Vec::new(),
            mesh: None,
        }
    }
}

/// Joint binding for one skinned mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkinDesc {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Node indices, in the order referenced by vertex joint attributes
    pub joints: Vec<usize>,
    /// One column-major inverse-bind matrix per joint; empty means identity
    #[serde(default)]
    pub inverse_bind_matrices: Vec<[f32; 16]>,
}

/// Keyframe sampler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplerDesc {
    /// Keyframe times in seconds, non-decreasing
    pub input: Vec<f32>,
    /// Flattened output values
    pub output: Vec<f32>,
    /// Interpolation mode
    #[serde(default)]
    pub interpolation: Interpolation,
}

/// Binding of a sampler to one bone property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDesc {
    /// Sampler index within the animation
    pub sampler: usize,
    /// Target bone (node) index
    pub bone: usize,
    /// Animated property
    pub path: ChannelPath,
}

/// Keyframed bone animation clip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationDesc {
    /// Clip name
    #[serde(default)]
    pub name: String,
    /// Samplers
    pub samplers: Vec<SamplerDesc>,
    /// Channels
    pub channels: Vec<ChannelDesc>,
}

/// Material factors reaching the shading pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    /// Base color factor (RGBA)
    #[serde(default = "white")]
    pub base_color: [f32; 4],
    /// Base color texture reference, resolved by the asset layer
    #[serde(default)]
    pub texture: Option<String>,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            base_color: white(),
            texture: None,
        }
    }
}

/// Geometry of one draw call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveDesc {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals (empty or one per position)
    #[serde(default)]
    pub normals: Vec<[f32; 3]>,
    /// Texture coordinates (empty or one per position)
    #[serde(default)]
    pub uvs: Vec<[f32; 2]>,
    /// Triangle list indices
    #[serde(default)]
    pub indices: Vec<u32>,
    /// Up to four joint indices per vertex (indices into the skin's joint list)
    #[serde(default)]
    pub joints: Vec<[u16; 4]>,
    /// Matching joint weights per vertex
    #[serde(default)]
    pub weights: Vec<[f32; 4]>,
    /// Authoring-time minimum corner
    #[serde(default)]
    pub min: Option<[f32; 3]>,
    /// Authoring-time maximum corner
    #[serde(default)]
    pub max: Option<[f32; 3]>,
    /// Material
    #[serde(default)]
    pub material: MaterialDesc,
}

/// Mesh: a set of primitives sharing one transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDesc {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Local position relative to the object
    #[serde(default = "zero3")]
    pub position: [f32; 3],
    /// Local scale relative to the object
    #[serde(default = "one3")]
    pub scale: [f32; 3],
    /// Primitives
    pub primitives: Vec<PrimitiveDesc>,
    /// Skin index within the object
    #[serde(default)]
    pub skin: Option<usize>,
    /// Whether the mesh renders into shadow maps
    #[serde(default = "yes")]
    pub casts_shadow: bool,
}

impl Default for MeshDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: zero3(),
            scale: one3(),
            primitives: Vec::new(),
            skin: None,
            casts_shadow: true,
        }
    }
}

/// Point light carried by an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightDesc {
    /// Light color
    #[serde(default = "one3")]
    pub color: [f32; 3],
    /// Brightness multiplier
    #[serde(default = "one")]
    pub brightness: f32,
    /// Whether the light renders a cube shadow
    #[serde(default = "yes")]
    pub cast_shadows: bool,
}

fn one() -> f32 {
    1.0
}

impl Default for LightDesc {
    fn default() -> Self {
        Self {
            color: one3(),
            brightness: 1.0,
            cast_shadows: true,
        }
    }
}

/// A complete scene object: meshes, skeleton, skins and animations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDesc {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// World position
    #[serde(default = "zero3")]
    pub position: [f32; 3],
    /// World scale
    #[serde(default = "one3")]
    pub scale: [f32; 3],
    /// Yaw in degrees
    #[serde(default)]
    pub yaw: f32,
    /// Pitch in degrees
    #[serde(default)]
    pub pitch: f32,
    /// Meshes
    #[serde(default)]
    pub meshes: Vec<MeshDesc>,
    /// Skeleton nodes (empty for unskinned objects)
    #[serde(default)]
    pub nodes: Vec<NodeDesc>,
    /// Skins referencing `nodes`
    #[serde(default)]
    pub skins: Vec<SkinDesc>,
    /// Animation clips targeting `nodes`
    #[serde(default)]
    pub animations: Vec<AnimationDesc>,
    /// Point light carried by this object
    #[serde(default)]
    pub light: Option<LightDesc>,
}

impl Default for ObjectDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: zero3(),
            scale: one3(),
            yaw: 0.0,
            pitch: 0.0,
            meshes: Vec::new(),
            nodes: Vec::new(),
            skins: Vec::new(),
            animations: Vec::new(),
            light: None,
        }
    }
}

/// Top-level scene file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDesc {
    /// Objects, in insertion order
    #[serde(default)]
    pub objects: Vec<ObjectDesc>,
    /// Direction the sun shines towards
    #[serde(default)]
    pub sun_direction: Option<[f32; 3]>,
}

/// Scene files load and save through the same TOML/RON paths as configuration
impl Config for SceneDesc {}
