//! Point shadow atlas layout through full frames

mod common;

use skinned_engine::core::{EngineConfig, ShadowConfig};
use skinned_engine::foundation::math::Vec2;
use skinned_engine::render::{ProgramKind, TextureFormat, Viewport};
use skinned_engine::scene::SceneDesc;

fn config() -> EngineConfig {
    EngineConfig { shadows: ShadowConfig { point_tile_resolution: 32, ..ShadowConfig::default() }, ..EngineConfig::default() }
}

fn three_lamps() -> SceneDesc {
    SceneDesc {
        objects: vec![
            common::floor(),
            common::lamp("a", [2.0, 3.0, 0.0]),
            common::lamp("b", [-2.0, 3.0, 0.0]),
            common::lamp("c", [0.0, 3.0, 2.0]),
        ],
        ..SceneDesc::default()
    }
}

fn overlaps((a_offset, a_scale): (Vec2, Vec2), (b_offset, b_scale): (Vec2, Vec2)) -> bool {
    let a_max = a_offset + a_scale;
    let b_max = b_offset + b_scale;
    a_offset.x < b_max.x && b_offset.x < a_max.x && a_offset.y < b_max.y && b_offset.y < a_max.y
}

#[test]
fn three_casting_lights_get_three_rows_of_six_tiles() {
    let (mut engine, _clock) = common::engine(config());
    engine.load_scene(&three_lamps()).unwrap();
    let report = engine.tick().unwrap();

    let atlas = engine.renderer().point_atlas();
    assert_eq!(atlas.layout().rows, 3);
    assert_eq!(atlas.layout().columns(), 6);
    assert_eq!(report.render.atlas_rows, 3);
    assert_eq!(
        engine.backend().texture_info(atlas.texture()),
        Some((TextureFormat::Depth32F, 6 * 32, 3 * 32))
    );

    let regions: Vec<(Vec2, Vec2)> = engine
        .scene
        .lights()
        .points()
        .map(|(_, light)| (light.atlas_offset(), light.atlas_scale()))
        .collect();
    assert_eq!(regions.len(), 3);
    for (i, &(offset, scale)) in regions.iter().enumerate() {
        assert!(scale.x > 0.0 && scale.y > 0.0);
        assert!(offset.x >= 0.0 && offset.y >= 0.0);
        assert!(offset.x + scale.x <= 1.0 + 1e-6 && offset.y + scale.y <= 1.0 + 1e-6);
        for &other in &regions[i + 1..] {
            assert!(!overlaps((offset, scale), other));
        }
    }
}

#[test]
fn every_face_tile_is_rendered_once() {
    let (mut engine, _clock) = common::engine(config());
    engine.load_scene(&three_lamps()).unwrap();
    let report = engine.tick().unwrap();

    // Only the floor is drawn into the atlas: lamp geometry carries the light
    assert_eq!(report.render.point_draws, 3 * 6);
    let viewports = engine.backend().viewports_for(ProgramKind::PointDepth);
    assert_eq!(viewports.len(), 18);
    for row in 0..3 {
        for face in 0..6 {
            assert!(viewports.contains(&Viewport { x: face * 32, y: row * 32, width: 32, height: 32 }));
        }
    }
}

#[test]
fn toggling_a_shadow_relays_out_the_atlas() {
    let (mut engine, _clock) = common::engine(config());
    engine.load_scene(&three_lamps()).unwrap();
    engine.tick().unwrap();

    let light = engine.scene.lights().casting_points()[1];
    engine.scene.lights_mut().set_point_cast_shadows(light, false).unwrap();
    let report = engine.tick().unwrap();
    assert!(report.render.atlas_relayout);
    assert_eq!(report.render.atlas_rows, 2);
    assert_eq!(report.render.point_draws, 2 * 6);
    assert_eq!(engine.scene.lights().point(light).unwrap().atlas_scale(), Vec2::zeros());

    let report = engine.tick().unwrap();
    assert!(!report.render.atlas_relayout);
}

#[test]
fn removing_a_lamp_object_removes_its_row() {
    let (mut engine, _clock) = common::engine(config());
    engine.load_scene(&three_lamps()).unwrap();
    engine.tick().unwrap();

    let lamp = engine.scene.objects().find(|(_, object)| object.name() == "a").map(|(id, _)| id).unwrap();
    engine.scene.remove_object(lamp).unwrap();
    let report = engine.tick().unwrap();
    assert_eq!(report.render.atlas_rows, 2);
    assert_eq!(engine.scene.lights().point_count(), 2);
}
