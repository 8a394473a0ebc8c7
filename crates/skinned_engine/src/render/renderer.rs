//! Frame renderer
//!
//! Owns the programs, shadow targets and GPU resource caches, and runs the
//! passes of one frame in order:
//!
//! 1. atlas layout and sun matrix sync
//! 2. draw list collection and resource upload
//! 3. directional shadow pass
//! 4. point shadow atlas pass
//! 5. main pass
//! 6. debug lines

use crate::core::{DebugConfig, EngineConfig};
use crate::foundation::math::Mat4Ext;
use crate::render::backend::{texture_units, GpuBackend, ProgramHandle, ProgramKind, UniformValue, Viewport};
use crate::render::debug_lines::DebugLineRenderer;
use crate::render::draw::{DrawList, GpuResources};
use crate::render::lighting::upload_lights;
use crate::render::shadow::{DirectionalShadowMap, PointShadowAtlas};
use crate::render::{uniforms, Camera, RenderResult};
use crate::scene::Scene;

/// What one frame did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draws into the directional shadow map
    pub directional_draws: usize,
    /// Draws into the point shadow atlas (all faces of all lights)
    pub point_draws: usize,
    /// Draws of the main pass
    pub main_draws: usize,
    /// Debug line draws
    pub debug_draws: usize,
    /// Rows of the point shadow atlas
    pub atlas_rows: u32,
    /// Whether the atlas was re-laid out this frame
    pub atlas_relayout: bool,
    /// Primitive buffers uploaded
    pub mesh_uploads: usize,
    /// Bone textures uploaded
    pub bone_uploads: usize,
}

impl FrameStats {
    /// Draws over all passes
    pub fn total_draws(&self) -> usize {
        self.directional_draws + self.point_draws + self.main_draws + self.debug_draws
    }
}

/// Multi-pass renderer over a [`GpuBackend`]
#[derive(Debug)]
pub struct Renderer {
    main_program: ProgramHandle,
    directional: DirectionalShadowMap,
    atlas: PointShadowAtlas,
    debug_lines: DebugLineRenderer,
    resources: GpuResources,
    viewport: Viewport,
    depth_bias: f32,
    debug: DebugConfig,
    frames: u64,
}

impl Renderer {
    /// Create programs and shadow targets
    ///
    /// Fails with the fatal initialization errors: no GPU context, a program
    /// that does not compile or link, or an incomplete shadow framebuffer.
    pub fn new<B: GpuBackend + ?Sized>(backend: &mut B, config: &EngineConfig, viewport: Viewport) -> RenderResult<Self> {
        backend.check_context()?;
        let main_program = backend.create_program(ProgramKind::Main)?;
        let directional = DirectionalShadowMap::new(backend, &config.shadows)?;
        let atlas = PointShadowAtlas::new(backend, &config.shadows)?;
        let debug_lines = DebugLineRenderer::new(backend)?;
        log::info!("Renderer initialized ({}x{})", viewport.width, viewport.height);
        Ok(Self {
            main_program,
            directional,
            atlas,
            debug_lines,
            resources: GpuResources::new(),
            viewport,
            depth_bias: config.shadows.depth_bias,
            debug: config.debug.clone(),
            frames: 0,
        })
    }

    /// Resize the main target
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            log::info!("Viewport resized to {}x{}", viewport.width, viewport.height);
        }
        self.viewport = viewport;
    }

    /// Toggle debug overlays
    pub fn set_debug(&mut self, debug: DebugConfig) {
        self.debug = debug;
    }

    /// Render one frame of an already updated scene
    ///
    /// Takes the scene mutably because the atlas writes each casting light's
    /// UV region back onto the light.
    pub fn render_frame<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        scene: &mut Scene,
        camera: &Camera,
    ) -> RenderResult<FrameStats> {
        let mut stats = FrameStats {
            atlas_relayout: self.atlas.sync(backend, scene.lights_mut())?,
            ..FrameStats::default()
        };
        stats.atlas_rows = self.atlas.layout().rows;
        self.directional.sync_light(scene.lights().directional());

        let scene = &*scene;
        let draws = DrawList::collect(scene)?;
        let sync = self.resources.sync(backend, scene, &draws)?;
        stats.mesh_uploads = sync.mesh_uploads;
        stats.bone_uploads = sync.bone_uploads;

        let sun_shadows = scene.lights().directional().cast_shadows();
        if sun_shadows {
            stats.directional_draws = self.directional.render(backend, &self.resources, &draws)?;
        }
        stats.point_draws = self.atlas.render(backend, scene.lights(), &self.resources, &draws)?;

        let view_projection = camera.view_projection_matrix();
        backend.bind_framebuffer(None);
        backend.set_viewport(self.viewport);
        backend.clear_depth();
        backend.use_program(self.main_program);
        backend.set_uniform(uniforms::VIEW_PROJECTION, UniformValue::Mat4(view_projection.to_cols_array()));
        backend.set_uniform(uniforms::CAMERA_POSITION, UniformValue::Vec3(camera.position.into()));
        backend.set_uniform(
            uniforms::LIGHT_VIEW_PROJECTION,
            UniformValue::Mat4(self.directional.light_view_projection().to_cols_array()),
        );
        backend.set_uniform(uniforms::SUN_SHADOWS, UniformValue::Int(i32::from(sun_shadows)));
        backend.set_uniform(uniforms::DEPTH_BIAS, UniformValue::Float(self.depth_bias));
        backend.bind_texture(texture_units::SHADOW_MAP, self.directional.texture());
        backend.set_uniform(uniforms::SHADOW_MAP, UniformValue::Sampler(texture_units::SHADOW_MAP));
        backend.bind_texture(texture_units::POINT_ATLAS, self.atlas.texture());
        backend.set_uniform(uniforms::POINT_SHADOW_ATLAS, UniformValue::Sampler(texture_units::POINT_ATLAS));
        upload_lights(backend, scene.lights());

        for item in draws.main_pass() {
            backend.set_uniform(uniforms::BASE_COLOR, UniformValue::Vec4(item.base_color.into()));
            if self.resources.draw(backend, item)? {
                stats.main_draws += 1;
            }
        }

        stats.debug_draws = self.debug_lines.render(backend, scene, &view_projection, &self.debug)?;

        self.frames += 1;
        log::trace!("Frame {} rendered: {stats:?}", self.frames);
        Ok(stats)
    }

    /// Drop everything cached against the current scene
    ///
    /// Object and light keys restart in a new scene, so uploads and light
    /// revisions from the previous one cannot be trusted.
    pub fn reset_scene_state<B: GpuBackend + ?Sized>(&mut self, backend: &mut B) {
        let released = self.resources.clear(backend);
        self.atlas.invalidate();
        self.directional.invalidate();
        log::debug!("Renderer scene state reset ({released} resources released)");
    }

    /// Frames rendered so far
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Directional shadow map
    pub fn directional_shadow(&self) -> &DirectionalShadowMap {
        &self.directional
    }

    /// Point shadow atlas
    pub fn point_atlas(&self) -> &PointShadowAtlas {
        &self.atlas
    }

    /// Uploaded GPU resources
    pub fn resources(&self) -> &GpuResources {
        &self.resources
    }

    /// Release shadow targets
    pub fn destroy<B: GpuBackend + ?Sized>(self, backend: &mut B) {
        self.directional.destroy(backend);
        self.atlas.destroy(backend);
        log::info!("Renderer destroyed after {} frames", self.frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RecordingBackend, RenderError, Topology};
    use crate::scene::description::{LightDesc, MeshDesc, ObjectDesc, PrimitiveDesc};

    fn triangle(light: Option<LightDesc>) -> ObjectDesc {
        ObjectDesc {
            meshes: vec![MeshDesc {
                primitives: vec![PrimitiveDesc {
                    positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                    indices: vec![0, 1, 2],
                    ..PrimitiveDesc::default()
                }],
                ..MeshDesc::default()
            }],
            light,
            ..ObjectDesc::default()
        }
    }

    #[test]
    fn test_pass_order_and_draw_counts() {
        let mut backend = RecordingBackend::new();
        let mut renderer = Renderer::new(&mut backend, &EngineConfig::default(), Viewport::full(800, 600)).unwrap();
        let mut scene = Scene::new();
        scene.add_object(&triangle(None)).unwrap();
        scene.add_object(&triangle(Some(LightDesc::default()))).unwrap();
        scene.update(0.0).unwrap();

        let stats = renderer.render_frame(&mut backend, &mut scene, &Camera::default()).unwrap();
        assert_eq!(stats.directional_draws, 1);
        assert_eq!(stats.point_draws, 6);
        assert_eq!(stats.main_draws, 2);
        assert_eq!(stats.atlas_rows, 1);
        assert!(stats.atlas_relayout);

        let order: Vec<ProgramKind> = backend.draws_by_program().iter().map(|(kind, _, _)| *kind).collect();
        assert_eq!(order.first(), Some(&ProgramKind::DirectionalDepth));
        assert_eq!(order.last(), Some(&ProgramKind::Main));
        assert!(backend.draws_by_program().iter().all(|(_, topology, count)| *topology == Topology::Triangles && *count == 3));

        backend.clear_commands();
        let stats = renderer.render_frame(&mut backend, &mut scene, &Camera::default()).unwrap();
        assert!(!stats.atlas_relayout);
        assert_eq!(stats.mesh_uploads, 0);
    }

    #[test]
    fn test_debug_overlay_draws_lines() {
        let mut backend = RecordingBackend::new();
        let config = EngineConfig::default().with_debug(DebugConfig { draw_bounds: true, draw_skeletons: true });
        let mut renderer = Renderer::new(&mut backend, &config, Viewport::full(64, 64)).unwrap();
        let mut scene = Scene::new();
        scene.add_object(&triangle(None)).unwrap();
        scene.update(0.0).unwrap();

        let stats = renderer.render_frame(&mut backend, &mut scene, &Camera::default()).unwrap();
        assert_eq!(stats.debug_draws, 1);
        assert_eq!(backend.draw_count(ProgramKind::DebugLines), 1);
        assert!(backend
            .draws_by_program()
            .contains(&(ProgramKind::DebugLines, Topology::Lines, 24)));
    }

    #[test]
    fn test_initialization_failures() {
        let mut backend = RecordingBackend::new().without_context();
        assert!(matches!(
            Renderer::new(&mut backend, &EngineConfig::default(), Viewport::full(1, 1)),
            Err(RenderError::ContextUnavailable(_))
        ));

        let mut backend = RecordingBackend::new().failing_program(ProgramKind::Main);
        assert!(matches!(
            Renderer::new(&mut backend, &EngineConfig::default(), Viewport::full(1, 1)),
            Err(RenderError::ShaderCompilation { .. })
        ));

        let mut backend = RecordingBackend::new().with_incomplete_framebuffers();
        assert!(matches!(
            Renderer::new(&mut backend, &EngineConfig::default(), Viewport::full(1, 1)),
            Err(RenderError::FramebufferIncomplete(_))
        ));
    }
}
