//! Core engine implementation
//!
//! [`Engine`] ties a [`Scene`] to a [`Renderer`] and a time source, and runs
//! one frame per [`Engine::tick`]: scene update at the current clock time,
//! then the render passes.

use crate::core::{ConfigError, EngineConfig};
use crate::foundation::time::{Clock, Timer};
use crate::render::{Camera, FrameStats, GpuBackend, RenderError, Renderer, Viewport};
use crate::scene::{ObjectId, PickHit, Scene, SceneDesc, SceneError, UpdateStats};
use thiserror::Error;

/// Statistics of one [`Engine::tick`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    /// Clock time the frame was evaluated at
    pub time: f64,
    /// Seconds since the previous frame
    pub delta_time: f32,
    /// Scene update counters
    pub update: UpdateStats,
    /// Render pass counters
    pub render: FrameStats,
}

/// Main engine struct
///
/// Generic over the GPU backend so the same frame loop drives a real API
/// wrapper or the headless [`RecordingBackend`](crate::render::RecordingBackend).
pub struct Engine<B: GpuBackend> {
    /// Scene graph with objects and lights
    pub scene: Scene,

    /// Camera of the main pass
    pub camera: Camera,

    renderer: Renderer,
    backend: B,
    clock: Box<dyn Clock>,
    timer: Timer,
    config: EngineConfig,
}

impl<B: GpuBackend> Engine<B> {
    /// Create a new engine instance
    ///
    /// Invalid configuration and the renderer's fatal initialization errors
    /// (no context, shader failure, incomplete framebuffer) are returned here.
    pub fn new(mut backend: B, config: EngineConfig, clock: Box<dyn Clock>, viewport: Viewport) -> EngineResult<Self> {
        log::info!("Initializing engine...");
        config.validate()?;
        let renderer = Renderer::new(&mut backend, &config, viewport).map_err(|error| {
            log::error!("Renderer initialization failed: {error}");
            error
        })?;
        let mut camera = Camera::default();
        camera.set_aspect_ratio(viewport.aspect());

        Ok(Self {
            scene: Scene::new(),
            camera,
            renderer,
            backend,
            clock,
            timer: Timer::new(),
            config,
        })
    }

    /// Replace the scene with one built from a description
    ///
    /// With animation autoplay enabled the first clip of every object starts
    /// at the current clock time.
    pub fn load_scene(&mut self, desc: &SceneDesc) -> EngineResult<()> {
        let mut scene = Scene::from_desc(desc)?;
        if self.config.animation.autoplay {
            let now = self.clock.now_seconds();
            let animated: Vec<ObjectId> = scene
                .objects()
                .filter(|(_, object)| !object.animations().is_empty())
                .map(|(id, _)| id)
                .collect();
            for id in animated {
                scene.object_mut(id)?.play_animation(0, now)?;
            }
        }
        self.renderer.reset_scene_state(&mut self.backend);
        self.scene = scene;
        Ok(())
    }

    /// Start clip `index` of an object at the current clock time
    pub fn play_animation(&mut self, object: ObjectId, index: usize) -> EngineResult<()> {
        let now = self.clock.now_seconds();
        self.scene.object_mut(object)?.play_animation(index, now)?;
        Ok(())
    }

    /// Update the scene and render one frame
    pub fn tick(&mut self) -> EngineResult<FrameReport> {
        let time = self.clock.now_seconds();
        self.timer.tick(time);
        let update = self.scene.update(time)?;
        let render = self.renderer.render_frame(&mut self.backend, &mut self.scene, &self.camera)?;
        Ok(FrameReport { time, delta_time: self.timer.delta_time(), update, render })
    }

    /// Select the nearest object under a point given in NDC; clears the
    /// selection on a miss
    pub fn pick(&mut self, ndc_x: f32, ndc_y: f32) -> EngineResult<Option<PickHit>> {
        let hit = self
            .camera
            .screen_to_world_ray(ndc_x, ndc_y)
            .and_then(|(origin, direction)| self.scene.pick(origin, direction));
        self.scene.select(hit.map(|hit| hit.object))?;
        Ok(hit)
    }

    /// Resize the main target and the camera's aspect ratio
    pub fn resize(&mut self, viewport: Viewport) {
        self.renderer.set_viewport(viewport);
        self.camera.set_aspect_ratio(viewport.aspect());
    }

    /// Renderer state
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// GPU backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable GPU backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Frame timing
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Release GPU resources and hand the backend back
    pub fn shutdown(self) -> B {
        let mut backend = self.backend;
        self.renderer.destroy(&mut backend);
        log::info!("Engine shutdown complete");
        backend
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scene data error
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Renderer error, including the fatal initialization failures
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::time::ManualClock;
    use crate::render::{ProgramKind, RecordingBackend};
    use crate::scene::description::{MeshDesc, ObjectDesc, PrimitiveDesc};
    use std::rc::Rc;

    fn engine_with_clock() -> (Engine<RecordingBackend>, Rc<ManualClock>) {
        let clock = Rc::new(ManualClock::new(0.0));
        let engine = Engine::new(
            RecordingBackend::new(),
            EngineConfig::default(),
            Box::new(Rc::clone(&clock)),
            Viewport::full(640, 480),
        )
        .unwrap();
        (engine, clock)
    }

    #[test]
    fn test_tick_reads_the_clock() {
        let (mut engine, clock) = engine_with_clock();
        engine.tick().unwrap();
        clock.advance(0.5);
        let report = engine.tick().unwrap();
        assert_eq!(report.time, 0.5);
        assert!((report.delta_time - 0.5).abs() < 1e-6);
        assert_eq!(engine.renderer().frame_count(), 2);
    }

    #[test]
    fn test_pick_selects_object() {
        let (mut engine, _clock) = engine_with_clock();
        let scene = SceneDesc {
            objects: vec![ObjectDesc {
                name: "crate".into(),
                meshes: vec![MeshDesc {
                    primitives: vec![PrimitiveDesc {
                        positions: vec![[-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]],
                        ..PrimitiveDesc::default()
                    }],
                    ..MeshDesc::default()
                }],
                ..ObjectDesc::default()
            }],
            ..SceneDesc::default()
        };
        engine.load_scene(&scene).unwrap();
        engine.camera.set_position(crate::foundation::math::Vec3::new(0.0, 0.0, 6.0));
        engine.tick().unwrap();

        let hit = engine.pick(0.0, 0.0).unwrap().unwrap();
        assert_eq!(engine.scene.selected(), Some(hit.object));
        assert!(engine.pick(0.99, 0.99).unwrap().is_none());
        assert_eq!(engine.scene.selected(), None);
    }

    #[test]
    fn test_invalid_config_and_fatal_backend() {
        let config = EngineConfig::default().with_log_level("chatty");
        let result = Engine::new(RecordingBackend::new(), config, Box::new(ManualClock::new(0.0)), Viewport::full(1, 1));
        assert!(matches!(result, Err(EngineError::Config(ConfigError::Invalid(_)))));

        let result = Engine::new(
            RecordingBackend::new().failing_program(ProgramKind::DirectionalDepth),
            EngineConfig::default(),
            Box::new(ManualClock::new(0.0)),
            Viewport::full(1, 1),
        );
        assert!(matches!(result, Err(EngineError::Render(RenderError::ShaderCompilation { .. }))));
    }
}
