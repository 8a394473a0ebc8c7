//! Built-in demo scene: a floor, a skinned two-bone arm and two lamps

use skinned_engine::animation::{ChannelPath, Interpolation};
use skinned_engine::scene::{
    AnimationDesc, ChannelDesc, LightDesc, MaterialDesc, MeshDesc, NodeDesc, ObjectDesc, PrimitiveDesc, SamplerDesc,
    SceneDesc, SkinDesc,
};

const IDENTITY: [f32; 16] = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];

/// Axis-aligned box as a triangle list
fn box_primitive(min: [f32; 3], max: [f32; 3], color: [f32; 4]) -> PrimitiveDesc {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    let positions = vec![
        [x0, y0, z0],
        [x1, y0, z0],
        [x1, y0, z1],
        [x0, y0, z1],
        [x0, y1, z0],
        [x1, y1, z0],
        [x1, y1, z1],
        [x0, y1, z1],
    ];
    let mut indices = vec![0, 2, 1, 0, 3, 2, 4, 5, 6, 4, 6, 7];
    for a in 0..4 {
        let b = (a + 1) % 4;
        indices.extend([a, b, b + 4, a, b + 4, a + 4]);
    }
    PrimitiveDesc {
        positions,
        indices,
        min: Some(min),
        max: Some(max),
        material: MaterialDesc { base_color: color, texture: None },
        ..PrimitiveDesc::default()
    }
}

fn floor() -> ObjectDesc {
    ObjectDesc {
        name: "floor".into(),
        meshes: vec![MeshDesc {
            name: "floor".into(),
            primitives: vec![box_primitive([-8.0, -0.1, -8.0], [8.0, 0.0, 8.0], [0.6, 0.6, 0.6, 1.0])],
            ..MeshDesc::default()
        }],
        ..ObjectDesc::default()
    }
}

/// Column of height 2 bound to a root bone (lower half) and an elbow bone
/// at y = 1 (upper half); the elbow swings 45 degrees around Z and back.
fn arm() -> ObjectDesc {
    let mut column = box_primitive([-0.2, 0.0, -0.2], [0.2, 2.0, 0.2], [0.8, 0.3, 0.2, 1.0]);
    column.joints = (0..8).map(|i| if i < 4 { [0, 0, 0, 0] } else { [1, 0, 0, 0] }).collect();
    column.weights = vec![[1.0, 0.0, 0.0, 0.0]; 8];

    let mut elbow_inverse_bind = IDENTITY;
    elbow_inverse_bind[13] = -1.0;

    let (sin, cos) = (std::f32::consts::PI / 8.0).sin_cos();
    ObjectDesc {
        name: "arm".into(),
        meshes: vec![MeshDesc {
            name: "arm".into(),
            primitives: vec![column],
            skin: Some(0),
            ..MeshDesc::default()
        }],
        nodes: vec![
            NodeDesc { name: "shoulder".into(), children: vec![1], ..NodeDesc::default() },
            NodeDesc { name: "elbow".into(), translation: [0.0, 1.0, 0.0], ..NodeDesc::default() },
        ],
        skins: vec![SkinDesc {
            name: "arm".into(),
            joints: vec![0, 1],
            inverse_bind_matrices: vec![IDENTITY, elbow_inverse_bind],
        }],
        animations: vec![AnimationDesc {
            name: "wave".into(),
            samplers: vec![SamplerDesc {
                input: vec![0.0, 1.0, 2.0],
                output: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, sin, cos, 0.0, 0.0, 0.0, 1.0],
                interpolation: Interpolation::Linear,
            }],
            channels: vec![ChannelDesc { sampler: 0, bone: 1, path: ChannelPath::Rotation }],
        }],
        ..ObjectDesc::default()
    }
}

fn lamp(name: &str, position: [f32; 3], color: [f32; 3]) -> ObjectDesc {
    ObjectDesc {
        name: name.into(),
        position,
        meshes: vec![MeshDesc {
            name: format!("{name} bulb"),
            primitives: vec![box_primitive([-0.1; 3], [0.1; 3], [color[0], color[1], color[2], 1.0])],
            ..MeshDesc::default()
        }],
        light: Some(LightDesc { color, brightness: 4.0, cast_shadows: true }),
        ..ObjectDesc::default()
    }
}

/// The demo scene description
pub fn build() -> SceneDesc {
    SceneDesc {
        objects: vec![
            floor(),
            arm(),
            lamp("warm lamp", [2.0, 3.0, 0.0], [1.0, 0.8, 0.6]),
            lamp("cold lamp", [-2.0, 2.5, 1.0], [0.6, 0.7, 1.0]),
        ],
        sun_direction: Some([-0.4, -1.0, -0.3]),
    }
}
