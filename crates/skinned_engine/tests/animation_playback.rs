//! Looped clip playback driven by the engine clock

mod common;

use approx::assert_relative_eq;
use skinned_engine::animation::Interpolation;
use skinned_engine::core::{EngineConfig, Config};
use skinned_engine::scene::SceneDesc;
use skinned_engine::Engine;
use skinned_engine::render::RecordingBackend;

fn elbow_height(engine: &Engine<RecordingBackend>) -> f32 {
    let (_, object) = engine.scene.objects().next().unwrap();
    object.skeleton().unwrap().world_matrix(1).unwrap()[(1, 3)]
}

fn load(engine: &mut Engine<RecordingBackend>, interpolation: Interpolation) {
    let scene = SceneDesc { objects: vec![common::skinned_column(vec![common::elbow_bounce(interpolation)])], ..SceneDesc::default() };
    engine.load_scene(&scene).unwrap();
}

#[test]
fn linear_clip_interpolates_and_wraps() {
    let (mut engine, clock) = common::engine(EngineConfig::default());
    load(&mut engine, Interpolation::Linear);

    clock.set(0.5);
    engine.tick().unwrap();
    assert_relative_eq!(elbow_height(&engine), 1.5, epsilon = 1e-5);

    clock.set(1.0);
    engine.tick().unwrap();
    assert_relative_eq!(elbow_height(&engine), 2.0, epsilon = 1e-5);

    // Length is 2 s, so 2.5 s plays the same pose as 0.5 s
    clock.set(2.5);
    engine.tick().unwrap();
    assert_relative_eq!(elbow_height(&engine), 1.5, epsilon = 1e-5);

    clock.set(5.75);
    engine.tick().unwrap();
    assert_relative_eq!(elbow_height(&engine), 1.25, epsilon = 1e-5);
}

#[test]
fn step_clip_holds_previous_key() {
    let (mut engine, clock) = common::engine(EngineConfig::default());
    load(&mut engine, Interpolation::Step);

    clock.set(0.9);
    engine.tick().unwrap();
    assert_relative_eq!(elbow_height(&engine), 1.0, epsilon = 1e-5);

    clock.set(1.1);
    engine.tick().unwrap();
    assert_relative_eq!(elbow_height(&engine), 2.0, epsilon = 1e-5);
}

#[test]
fn stopping_restores_rest_pose() {
    let (mut engine, clock) = common::engine(EngineConfig::default());
    load(&mut engine, Interpolation::Linear);
    clock.set(1.0);
    engine.tick().unwrap();
    assert_relative_eq!(elbow_height(&engine), 2.0, epsilon = 1e-5);

    let id = engine.scene.objects().next().map(|(id, _)| id).unwrap();
    engine.scene.object_mut(id).unwrap().stop_animation();
    clock.set(1.5);
    engine.tick().unwrap();
    assert_relative_eq!(elbow_height(&engine), 1.0, epsilon = 1e-5);
    assert_eq!(engine.scene.object(id).unwrap().current_animation(), None);
}

#[test]
fn autoplay_can_be_disabled() {
    let config = EngineConfig::from_str_for("engine.toml", "[animation]\nautoplay = false\n").unwrap();
    let (mut engine, clock) = common::engine(config);
    load(&mut engine, Interpolation::Linear);

    clock.set(1.0);
    engine.tick().unwrap();
    assert_relative_eq!(elbow_height(&engine), 1.0, epsilon = 1e-5);

    let id = engine.scene.objects().next().map(|(id, _)| id).unwrap();
    engine.play_animation(id, 0).unwrap();
    clock.set(1.5);
    engine.tick().unwrap();
    assert_relative_eq!(elbow_height(&engine), 1.5, epsilon = 1e-5);
}
