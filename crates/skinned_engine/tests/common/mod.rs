//! Scene fixtures shared by the integration tests

#![allow(dead_code)]

use skinned_engine::animation::{ChannelPath, Interpolation};
use skinned_engine::core::EngineConfig;
use skinned_engine::foundation::time::ManualClock;
use skinned_engine::render::{RecordingBackend, Viewport};
use skinned_engine::scene::{
    AnimationDesc, ChannelDesc, LightDesc, MeshDesc, NodeDesc, ObjectDesc, PrimitiveDesc, SamplerDesc, SkinDesc,
};
use skinned_engine::Engine;
use std::rc::Rc;

const IDENTITY: [f32; 16] = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];

/// Quad strip of height 2 skinned to a root bone and an elbow at y = 1
pub fn skinned_column(animations: Vec<AnimationDesc>) -> ObjectDesc {
    let mut elbow_inverse_bind = IDENTITY;
    elbow_inverse_bind[13] = -1.0;
    ObjectDesc {
        name: "column".into(),
        meshes: vec![MeshDesc {
            primitives: vec![PrimitiveDesc {
                positions: vec![[-0.5, 0.0, 0.0], [0.5, 0.0, 0.0], [0.5, 2.0, 0.0], [-0.5, 2.0, 0.0]],
                indices: vec![0, 1, 2, 0, 2, 3],
                joints: vec![[0, 0, 0, 0], [0, 0, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0]],
                weights: vec![[1.0, 0.0, 0.0, 0.0]; 4],
                ..PrimitiveDesc::default()
            }],
            skin: Some(0),
            ..MeshDesc::default()
        }],
        nodes: vec![
            NodeDesc { name: "root".into(), children: vec![1], ..NodeDesc::default() },
            NodeDesc { name: "elbow".into(), translation: [0.0, 1.0, 0.0], ..NodeDesc::default() },
        ],
        skins: vec![SkinDesc { name: "column".into(), joints: vec![0, 1], inverse_bind_matrices: vec![IDENTITY, elbow_inverse_bind] }],
        animations,
        ..ObjectDesc::default()
    }
}

/// Elbow translation y: 1 at t=0, 2 at t=1, 1 at t=2
pub fn elbow_bounce(interpolation: Interpolation) -> AnimationDesc {
    AnimationDesc {
        name: "bounce".into(),
        samplers: vec![SamplerDesc {
            input: vec![0.0, 1.0, 2.0],
            output: vec![0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 1.0, 0.0],
            interpolation,
        }],
        channels: vec![ChannelDesc { sampler: 0, bone: 1, path: ChannelPath::Translation }],
    }
}

/// Ground box that casts and receives shadows
pub fn floor() -> ObjectDesc {
    ObjectDesc {
        name: "floor".into(),
        meshes: vec![MeshDesc {
            primitives: vec![PrimitiveDesc {
                positions: vec![[-5.0, 0.0, -5.0], [5.0, 0.0, -5.0], [5.0, 0.0, 5.0], [-5.0, 0.0, 5.0]],
                indices: vec![0, 2, 1, 0, 3, 2],
                ..PrimitiveDesc::default()
            }],
            ..MeshDesc::default()
        }],
        ..ObjectDesc::default()
    }
}

/// Small object carrying a shadow-casting point light
pub fn lamp(name: &str, position: [f32; 3]) -> ObjectDesc {
    ObjectDesc {
        name: name.into(),
        position,
        meshes: vec![MeshDesc {
            primitives: vec![PrimitiveDesc {
                positions: vec![[-0.1, -0.1, 0.0], [0.1, -0.1, 0.0], [0.0, 0.1, 0.0]],
                indices: vec![0, 1, 2],
                ..PrimitiveDesc::default()
            }],
            ..MeshDesc::default()
        }],
        light: Some(LightDesc::default()),
        ..ObjectDesc::default()
    }
}

/// Engine over a recording backend driven by a manual clock
pub fn engine(config: EngineConfig) -> (Engine<RecordingBackend>, Rc<ManualClock>) {
    let clock = Rc::new(ManualClock::new(0.0));
    let engine = Engine::new(RecordingBackend::new(), config, Box::new(Rc::clone(&clock)), Viewport::full(320, 240))
        .expect("engine initializes over the recording backend");
    (engine, clock)
}
