//! Directional (sun) shadow map

use crate::core::ShadowConfig;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::backend::{
    FramebufferHandle, GpuBackend, ProgramHandle, ProgramKind, TextureHandle, UniformValue, Viewport,
};
use crate::render::draw::{DrawList, GpuResources};
use crate::render::shadow::depth_target;
use crate::render::{uniforms, RenderResult};
use crate::scene::DirectionalLight;

/// Orthographic depth map rendered from the sun
///
/// The light view-projection is recomputed only when the light's direction
/// revision changes.
#[derive(Debug)]
pub struct DirectionalShadowMap {
    program: ProgramHandle,
    depth: TextureHandle,
    framebuffer: FramebufferHandle,
    resolution: u32,
    extent: f32,
    near: f32,
    far: f32,
    distance: f32,
    light_view_projection: Mat4,
    light_revision: Option<u64>,
    matrix_updates: usize,
}

impl DirectionalShadowMap {
    /// Create the depth program, texture and framebuffer
    ///
    /// An incomplete framebuffer is reported as
    /// [`RenderError::FramebufferIncomplete`](crate::render::RenderError).
    pub fn new<B: GpuBackend + ?Sized>(backend: &mut B, config: &ShadowConfig) -> RenderResult<Self> {
        let program = backend.create_program(ProgramKind::DirectionalDepth)?;
        let resolution = config.directional_resolution;
        let (depth, framebuffer) = depth_target(backend, "directional shadow", resolution, resolution)?;
        log::info!("Directional shadow map created ({resolution}x{resolution})");
        Ok(Self {
            program,
            depth,
            framebuffer,
            resolution,
            extent: config.directional_extent,
            near: config.directional_near,
            far: config.directional_far,
            distance: config.directional_distance,
            light_view_projection: Mat4::identity(),
            light_revision: None,
            matrix_updates: 0,
        })
    }

    /// Recompute the light matrix if the sun changed; returns whether it did
    pub fn sync_light(&mut self, light: &DirectionalLight) -> bool {
        if self.light_revision == Some(light.revision()) {
            return false;
        }
        let direction = light.direction();
        let eye = -direction * self.distance;
        let up = if direction.cross(&Vec3::y()).norm_squared() < 1e-6 { Vec3::z() } else { Vec3::y() };
        let view = Mat4::look_at(eye, Vec3::zeros(), up);
        let projection =
            Mat4::orthographic(-self.extent, self.extent, -self.extent, self.extent, self.near, self.far);
        self.light_view_projection = projection * view;
        self.light_revision = Some(light.revision());
        self.matrix_updates += 1;
        log::debug!("Sun shadow matrix recomputed for direction {direction:?}");
        true
    }

    /// Force the light matrix to be recomputed on the next `sync_light`
    pub fn invalidate(&mut self) {
        self.light_revision = None;
    }

    /// Render every shadow caster; returns the number of draws
    pub fn render<B: GpuBackend + ?Sized>(
        &self,
        backend: &mut B,
        resources: &GpuResources,
        draws: &DrawList,
    ) -> RenderResult<usize> {
        backend.bind_framebuffer(Some(self.framebuffer));
        backend.set_viewport(Viewport::full(self.resolution, self.resolution));
        backend.clear_depth();
        backend.use_program(self.program);
        backend.set_uniform(
            uniforms::LIGHT_VIEW_PROJECTION,
            UniformValue::Mat4(self.light_view_projection.to_cols_array()),
        );

        let mut count = 0;
        for item in draws.shadow_casters() {
            if resources.draw(backend, item)? {
                count += 1;
            }
        }
        log::trace!("Directional shadow pass: {count} draws");
        Ok(count)
    }

    /// Light view-projection used by the pass and the main shader
    pub fn light_view_projection(&self) -> &Mat4 {
        &self.light_view_projection
    }

    /// Depth texture sampled by the main pass
    pub fn texture(&self) -> TextureHandle {
        self.depth
    }

    /// Side of the square map in texels
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Times the light matrix was recomputed
    pub fn matrix_updates(&self) -> usize {
        self.matrix_updates
    }

    /// Release GPU objects
    pub fn destroy<B: GpuBackend + ?Sized>(self, backend: &mut B) {
        backend.delete_framebuffer(self.framebuffer);
        backend.delete_texture(self.depth);
    }
}
