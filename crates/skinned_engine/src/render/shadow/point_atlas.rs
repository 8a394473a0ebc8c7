//! Point-light cube shadow atlas
//!
//! Every shadow-casting point light owns one row of the atlas; the six
//! columns of a row hold its cube faces. The row count follows the casting
//! set, so the atlas is re-laid out (and reallocated when its height changes)
//! whenever a light is added, removed or has its shadow toggled.

use crate::core::ShadowConfig;
use crate::foundation::math::{constants, Mat4, Mat4Ext, Vec2, Vec3};
use crate::render::backend::{
    FramebufferHandle, GpuBackend, ProgramHandle, ProgramKind, TextureHandle, UniformValue, Viewport,
};
use crate::render::draw::{DrawList, GpuResources};
use crate::render::shadow::depth_target;
use crate::render::{uniforms, RenderResult};
use crate::scene::{LightId, Lights};

/// Faces per cube, and columns of the atlas
pub const CUBE_FACES: u32 = 6;

/// Look direction and up vector of each cube face (+X, -X, +Y, -Y, +Z, -Z)
const FACE_BASES: [([f32; 3], [f32; 3]); CUBE_FACES as usize] = [
    ([1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, -1.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
    ([0.0, 0.0, -1.0], [0.0, -1.0, 0.0]),
];

/// Tile grid of the atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasLayout {
    /// Side of one square tile in texels
    pub tile: u32,
    /// One row per casting light
    pub rows: u32,
}

impl AtlasLayout {
    /// Number of columns
    pub const fn columns(&self) -> u32 {
        CUBE_FACES
    }

    /// Atlas width in texels
    pub const fn width(&self) -> u32 {
        self.tile * CUBE_FACES
    }

    /// Atlas height in texels
    pub const fn height(&self) -> u32 {
        self.tile * self.rows
    }

    /// Pixel rectangle of one face tile
    pub const fn tile_viewport(&self, row: u32, face: u32) -> Viewport {
        Viewport { x: face * self.tile, y: row * self.tile, width: self.tile, height: self.tile }
    }

    /// UV offset and scale of a light's row
    pub fn region(&self, row: u32) -> (Vec2, Vec2) {
        if self.rows == 0 {
            return (Vec2::zeros(), Vec2::zeros());
        }
        let rows = self.rows as f32;
        (Vec2::new(0.0, row as f32 / rows), Vec2::new(1.0, 1.0 / rows))
    }
}

/// View matrix of one cube face seen from `position`
pub fn face_view(position: Vec3, face: usize) -> Mat4 {
    let (direction, up) = FACE_BASES[face % FACE_BASES.len()];
    Mat4::look_at(position, position + Vec3::from(direction), Vec3::from(up))
}

/// Atlas texture plus the casting lights assigned to its rows
#[derive(Debug)]
pub struct PointShadowAtlas {
    program: ProgramHandle,
    layout: AtlasLayout,
    depth: TextureHandle,
    framebuffer: FramebufferHandle,
    allocated_rows: u32,
    projection: Mat4,
    far: f32,
    rows: Vec<LightId>,
    casting_revision: Option<u64>,
    reallocations: usize,
}

impl PointShadowAtlas {
    /// Create the depth program and a one-row atlas
    ///
    /// The framebuffer completeness check happens here; later reallocations
    /// reuse the same texture format and attachment.
    pub fn new<B: GpuBackend + ?Sized>(backend: &mut B, config: &ShadowConfig) -> RenderResult<Self> {
        let program = backend.create_program(ProgramKind::PointDepth)?;
        let layout = AtlasLayout { tile: config.point_tile_resolution, rows: 0 };
        let (depth, framebuffer) = depth_target(backend, "point shadow atlas", layout.width(), layout.tile)?;
        let projection = Mat4::perspective(constants::HALF_PI, 1.0, config.point_near, config.point_far);
        log::info!("Point shadow atlas created ({} px tiles)", layout.tile);
        Ok(Self {
            program,
            layout,
            depth,
            framebuffer,
            allocated_rows: 1,
            projection,
            far: config.point_far,
            rows: Vec::new(),
            casting_revision: None,
            reallocations: 0,
        })
    }

    /// Re-lay out the atlas if the casting set changed and write each light's
    /// UV region back onto it; returns whether the layout was recomputed
    pub fn sync<B: GpuBackend + ?Sized>(&mut self, backend: &mut B, lights: &mut Lights) -> RenderResult<bool> {
        if self.casting_revision == Some(lights.casting_revision()) {
            return Ok(false);
        }
        let rows = lights.casting_points();
        let layout = AtlasLayout { rows: u32::try_from(rows.len()).unwrap_or(u32::MAX), ..self.layout };

        // The current target stays valid until its replacement is complete
        let needed = layout.rows.max(1);
        if needed != self.allocated_rows {
            let (depth, framebuffer) =
                depth_target(backend, "point shadow atlas", layout.width(), layout.tile * needed)?;
            backend.delete_framebuffer(self.framebuffer);
            backend.delete_texture(self.depth);
            self.depth = depth;
            self.framebuffer = framebuffer;
            self.allocated_rows = needed;
            self.reallocations += 1;
        }
        self.rows = rows;
        self.layout = layout;

        for (row, &light) in (0u32..).zip(&self.rows) {
            let (offset, scale) = self.layout.region(row);
            lights.set_atlas_region(light, offset, scale)?;
        }
        self.casting_revision = Some(lights.casting_revision());
        log::debug!(
            "Point shadow atlas laid out: {} rows x {} columns",
            self.layout.rows,
            self.layout.columns()
        );
        Ok(true)
    }

    /// Forget the laid-out casting set so the next `sync` lays out again
    pub fn invalidate(&mut self) {
        self.casting_revision = None;
        self.rows.clear();
    }

    /// Render all cube faces of every assigned light; returns the number of draws
    pub fn render<B: GpuBackend + ?Sized>(
        &self,
        backend: &mut B,
        lights: &Lights,
        resources: &GpuResources,
        draws: &DrawList,
    ) -> RenderResult<usize> {
        backend.bind_framebuffer(Some(self.framebuffer));
        backend.set_viewport(Viewport::full(self.layout.width(), self.layout.tile * self.allocated_rows));
        backend.clear_depth();
        if self.rows.is_empty() {
            return Ok(0);
        }

        backend.use_program(self.program);
        backend.set_uniform(uniforms::FAR_PLANE, UniformValue::Float(self.far));

        let mut count = 0;
        for (row, &id) in (0u32..).zip(&self.rows) {
            let Some(light) = lights.point(id) else {
                continue;
            };
            let position = light.position();
            backend.set_uniform(uniforms::LIGHT_POSITION, UniformValue::Vec3(position.into()));
            for face in 0..CUBE_FACES {
                backend.set_viewport(self.layout.tile_viewport(row, face));
                let view_projection = self.projection * face_view(position, face as usize);
                backend.set_uniform(
                    uniforms::LIGHT_VIEW_PROJECTION,
                    UniformValue::Mat4(view_projection.to_cols_array()),
                );
                for item in draws.shadow_casters() {
                    if resources.draw(backend, item)? {
                        count += 1;
                    }
                }
            }
        }
        log::trace!("Point shadow pass: {} lights, {count} draws", self.rows.len());
        Ok(count)
    }

    /// Current tile grid
    pub fn layout(&self) -> AtlasLayout {
        self.layout
    }

    /// Lights in row order
    pub fn rows(&self) -> &[LightId] {
        &self.rows
    }

    /// Atlas depth texture sampled by the main pass
    pub fn texture(&self) -> TextureHandle {
        self.depth
    }

    /// Times the texture was reallocated
    pub fn reallocations(&self) -> usize {
        self.reallocations
    }

    /// Release GPU objects
    pub fn destroy<B: GpuBackend + ?Sized>(self, backend: &mut B) {
        backend.delete_framebuffer(self.framebuffer);
        backend.delete_texture(self.depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use crate::render::{RecordingBackend, TextureFormat};
    use crate::scene::description::LightDesc;
    use crate::scene::PointLight;
    use approx::assert_relative_eq;

    fn casting_lights(count: usize) -> (Lights, Vec<LightId>) {
        let mut lights = Lights::new();
        let ids = (0..count).map(|_| lights.insert_point(PointLight::from_desc(&LightDesc::default()))).collect();
        (lights, ids)
    }

    #[test]
    fn test_rows_follow_casting_set() {
        let mut backend = RecordingBackend::new();
        let config = ShadowConfig { point_tile_resolution: 64, ..ShadowConfig::default() };
        let mut atlas = PointShadowAtlas::new(&mut backend, &config).unwrap();
        let (mut lights, ids) = casting_lights(3);

        assert!(atlas.sync(&mut backend, &mut lights).unwrap());
        assert_eq!(atlas.layout(), AtlasLayout { tile: 64, rows: 3 });
        assert_eq!(backend.texture_info(atlas.texture()), Some((TextureFormat::Depth32F, 384, 192)));
        assert!(!atlas.sync(&mut backend, &mut lights).unwrap());

        lights.set_point_cast_shadows(ids[1], false).unwrap();
        assert!(atlas.sync(&mut backend, &mut lights).unwrap());
        assert_eq!(atlas.layout().rows, 2);
        assert_eq!(atlas.rows(), &[ids[0], ids[2]]);
        assert_eq!(lights.point(ids[1]).unwrap().atlas_scale(), Vec2::zeros());
        assert_relative_eq!(lights.point(ids[2]).unwrap().atlas_offset(), Vec2::new(0.0, 0.5));
        assert_eq!(atlas.reallocations(), 2);
    }

    #[test]
    fn test_failed_reallocation_keeps_previous_target() {
        let mut backend = RecordingBackend::new();
        let config = ShadowConfig { point_tile_resolution: 16, ..ShadowConfig::default() };
        let mut atlas = PointShadowAtlas::new(&mut backend, &config).unwrap();
        let (mut lights, _) = casting_lights(2);
        let texture = atlas.texture();

        backend.set_incomplete_framebuffers(true);
        assert!(atlas.sync(&mut backend, &mut lights).is_err());
        assert_eq!(atlas.texture(), texture);
        assert_eq!(atlas.layout().rows, 0);
        assert!(atlas.rows().is_empty());
        assert_eq!(backend.texture_info(texture), Some((TextureFormat::Depth32F, 96, 16)));

        backend.set_incomplete_framebuffers(false);
        assert!(atlas.sync(&mut backend, &mut lights).unwrap());
        assert_eq!(backend.texture_info(texture), None);
        assert_eq!(backend.texture_info(atlas.texture()), Some((TextureFormat::Depth32F, 96, 32)));
    }

    #[test]
    fn test_invalidate_lays_out_again() {
        let mut backend = RecordingBackend::new();
        let mut atlas = PointShadowAtlas::new(&mut backend, &ShadowConfig::default()).unwrap();
        let (mut lights, _) = casting_lights(1);
        assert!(atlas.sync(&mut backend, &mut lights).unwrap());
        assert!(!atlas.sync(&mut backend, &mut lights).unwrap());
        atlas.invalidate();
        assert!(atlas.rows().is_empty());
        assert!(atlas.sync(&mut backend, &mut lights).unwrap());
        assert_eq!(atlas.rows().len(), 1);
    }

    #[test]
    fn test_tile_viewports() {
        let layout = AtlasLayout { tile: 128, rows: 2 };
        assert_eq!(layout.tile_viewport(1, 4), Viewport { x: 512, y: 128, width: 128, height: 128 });
        assert_eq!((layout.width(), layout.height()), (768, 256));
    }

    #[test]
    fn test_face_views_look_along_axes() {
        let position = Vec3::new(1.0, 2.0, 3.0);
        let projection = Mat4::perspective(constants::HALF_PI, 1.0, 0.1, 10.0);
        for (face, (direction, _)) in FACE_BASES.iter().enumerate() {
            let target = position + Vec3::from(*direction) * 2.0;
            let clip = projection * face_view(position, face) * Vec4::new(target.x, target.y, target.z, 1.0);
            assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
            assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
            assert!(clip.w > 0.0);
        }
    }
}
