//! Headless viewer
//!
//! Loads a scene (the built-in demo or a TOML/RON file), animates it on a
//! manually advanced clock and renders every frame through the recording
//! backend, logging per-pass statistics.
//!
//! ```text
//! skinned_viewer [--scene FILE] [--config FILE] [--frames N] [--save-scene FILE]
//! ```

mod demo_scene;

use clap::Parser;
use skinned_engine::foundation::logging;
use skinned_engine::prelude::*;
use std::path::PathBuf;
use std::rc::Rc;

const FRAME_SECONDS: f64 = 1.0 / 60.0;

/// Animate and render a scene headlessly, logging per-pass statistics
#[derive(Parser, Debug)]
#[command(name = "skinned_viewer", version, about)]
struct ViewerArgs {
    /// Scene description (.toml or .ron); the built-in demo when omitted
    #[arg(long, value_name = "FILE")]
    scene: Option<PathBuf>,

    /// Engine configuration (.toml or .ron)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the loaded scene description to this file
    #[arg(long, value_name = "FILE")]
    save_scene: Option<PathBuf>,

    /// Number of frames to run at 60 Hz
    #[arg(long, default_value_t = 240)]
    frames: u32,
}

fn run(args: &ViewerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };
    logging::init_with_level(&config.log_level);
    log::info!("Starting skinned viewer");

    let scene = match &args.scene {
        Some(path) => SceneDesc::load_from_file(path)?,
        None => demo_scene::build(),
    };
    if let Some(path) = &args.save_scene {
        scene.save_to_file(path)?;
        log::info!("Scene description written to {}", path.display());
    }

    let clock = Rc::new(ManualClock::new(0.0));
    let mut engine = Engine::new(RecordingBackend::new(), config, Box::new(Rc::clone(&clock)), Viewport::full(1280, 720))?;
    engine.load_scene(&scene)?;
    engine.camera.set_position(Vec3::new(0.0, 4.0, 9.0));
    engine.camera.look_at(Vec3::new(0.0, 1.0, 0.0), Vec3::y());

    let mut totals = FrameStats::default();
    for frame in 0..args.frames {
        let report = engine.tick()?;
        totals.directional_draws += report.render.directional_draws;
        totals.point_draws += report.render.point_draws;
        totals.main_draws += report.render.main_draws;
        totals.bone_uploads += report.render.bone_uploads;

        if frame == args.frames / 2 {
            toggle_first_lamp_shadow(&mut engine)?;
        }
        if frame % 60 == 0 {
            log::info!(
                "t={:.2}s fk={} skins={} draws={} atlas rows={}",
                report.time,
                report.update.fk_passes,
                report.update.skin_recomputes,
                report.render.total_draws(),
                report.render.atlas_rows
            );
        }
        clock.advance(FRAME_SECONDS);
    }

    if let Some(hit) = engine.pick(0.0, 0.0)? {
        log::info!("Center of view hits '{}' at {:.2}", engine.scene.object(hit.object)?.name(), hit.distance);
    }

    log::info!(
        "{} frames: {} sun draws, {} atlas draws, {} main draws, {} bone uploads",
        engine.timer().frame_count(),
        totals.directional_draws,
        totals.point_draws,
        totals.main_draws,
        totals.bone_uploads
    );
    let backend = engine.shutdown();
    log::info!("Recorded {} backend calls", backend.commands().len());
    Ok(())
}

/// Flip the shadow of the first light-carrying object, forcing an atlas re-layout
fn toggle_first_lamp_shadow(engine: &mut Engine<RecordingBackend>) -> Result<(), SceneError> {
    let Some(light) = engine.scene.objects().find_map(|(_, object)| object.light()) else {
        return Ok(());
    };
    let casting = engine.scene.lights().point(light).is_some_and(|light| light.cast_shadows());
    engine.scene.lights_mut().set_point_cast_shadows(light, !casting)?;
    log::info!("Point light shadow toggled to {}", !casting);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ViewerArgs::parse();
    let result = run(&args);
    if let Err(error) = &result {
        log::error!("Viewer failed: {error}");
    }
    result
}
