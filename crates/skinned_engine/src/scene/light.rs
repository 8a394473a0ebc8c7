//! Scene lights
//!
//! One directional sun plus any number of point lights. Point lights are
//! carried by objects; their positions are synced from the owning object's
//! transform during the scene update. The shadow atlas writes each casting
//! light's UV sub-rectangle back onto the light.

use crate::foundation::math::{Vec2, Vec3};
use crate::scene::description::LightDesc;
use crate::scene::{SceneError, SceneResult};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a point light
    pub struct LightId;
}

/// Directional light (sun)
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    direction: Vec3,
    color: Vec3,
    brightness: f32,
    cast_shadows: bool,
    revision: u64,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.3, -1.0, -0.4).normalize(),
            color: Vec3::new(1.0, 1.0, 1.0),
            brightness: 1.0,
            cast_shadows: true,
            revision: 1,
        }
    }
}

impl DirectionalLight {
    /// Direction the light travels in (normalized)
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Light color
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Brightness multiplier
    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    /// Whether the directional shadow pass runs
    pub fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }

    /// Bumped whenever the direction changes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Point the light along `direction`; a zero vector is ignored
    pub fn set_direction(&mut self, direction: Vec3) {
        if let Some(direction) = direction.try_normalize(f32::EPSILON) {
            self.direction = direction;
            self.revision += 1;
        } else {
            log::warn!("Ignoring zero-length sun direction");
        }
    }

    /// Set color and brightness
    pub fn set_color(&mut self, color: Vec3, brightness: f32) {
        self.color = color;
        self.brightness = brightness;
    }

    /// Toggle the directional shadow pass
    pub fn set_cast_shadows(&mut self, cast: bool) {
        self.cast_shadows = cast;
    }
}

/// Omnidirectional light with an optional cube shadow
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    position: Vec3,
    color: Vec3,
    brightness: f32,
    cast_shadows: bool,
    atlas_offset: Vec2,
    atlas_scale: Vec2,
}

impl PointLight {
    /// Create a light from its description
    pub fn from_desc(desc: &LightDesc) -> Self {
        Self {
            position: Vec3::zeros(),
            color: Vec3::from(desc.color),
            brightness: desc.brightness,
            cast_shadows: desc.cast_shadows,
            atlas_offset: Vec2::zeros(),
            atlas_scale: Vec2::zeros(),
        }
    }

    /// World position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Light color
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Brightness multiplier
    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    /// Whether the light owns a row in the shadow atlas
    pub fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }

    /// UV offset of this light's atlas row
    pub fn atlas_offset(&self) -> Vec2 {
        self.atlas_offset
    }

    /// UV size of this light's atlas row
    pub fn atlas_scale(&self) -> Vec2 {
        self.atlas_scale
    }
}

/// All lights of a scene
#[derive(Debug, Clone, Default)]
pub struct Lights {
    directional: DirectionalLight,
    points: SlotMap<LightId, PointLight>,
    order: Vec<LightId>,
    casting_revision: u64,
}

impl Lights {
    /// Create a light set with the default sun and no point lights
    pub fn new() -> Self {
        Self::default()
    }

    /// The sun
    pub fn directional(&self) -> &DirectionalLight {
        &self.directional
    }

    /// Mutable access to the sun
    pub fn directional_mut(&mut self) -> &mut DirectionalLight {
        &mut self.directional
    }

    /// Add a point light
    pub fn insert_point(&mut self, light: PointLight) -> LightId {
        if light.cast_shadows {
            self.casting_revision += 1;
        }
        let id = self.points.insert(light);
        self.order.push(id);
        id
    }

    /// Remove a point light
    pub fn remove_point(&mut self, id: LightId) -> Option<PointLight> {
        let removed = self.points.remove(id)?;
        self.order.retain(|&other| other != id);
        if removed.cast_shadows {
            self.casting_revision += 1;
        }
        Some(removed)
    }

    /// Borrow a point light
    pub fn point(&self, id: LightId) -> Option<&PointLight> {
        self.points.get(id)
    }

    /// All point lights in insertion order
    pub fn points(&self) -> impl Iterator<Item = (LightId, &PointLight)> {
        self.order.iter().filter_map(|&id| self.points.get(id).map(|light| (id, light)))
    }

    /// Number of point lights
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Point lights that cast shadows, in insertion order
    pub fn casting_points(&self) -> Vec<LightId> {
        self.points()
            .filter(|(_, light)| light.cast_shadows)
            .map(|(id, _)| id)
            .collect()
    }

    /// Bumped whenever the set of shadow-casting point lights changes
    pub fn casting_revision(&self) -> u64 {
        self.casting_revision
    }

    /// Set a point light's color
    pub fn set_point_color(&mut self, id: LightId, color: Vec3) -> SceneResult<()> {
        self.point_mut(id)?.color = color;
        Ok(())
    }

    /// Set a point light's brightness
    pub fn set_point_brightness(&mut self, id: LightId, brightness: f32) -> SceneResult<()> {
        self.point_mut(id)?.brightness = brightness;
        Ok(())
    }

    /// Toggle a point light's cube shadow
    pub fn set_point_cast_shadows(&mut self, id: LightId, cast: bool) -> SceneResult<()> {
        let light = self.point_mut(id)?;
        if light.cast_shadows == cast {
            return Ok(());
        }
        light.cast_shadows = cast;
        if !cast {
            light.atlas_offset = Vec2::zeros();
            light.atlas_scale = Vec2::zeros();
        }
        self.casting_revision += 1;
        log::debug!("Point light {id:?} shadow casting set to {cast}");
        Ok(())
    }

    pub(crate) fn set_point_position(&mut self, id: LightId, position: Vec3) -> SceneResult<()> {
        self.point_mut(id)?.position = position;
        Ok(())
    }

    pub(crate) fn set_atlas_region(&mut self, id: LightId, offset: Vec2, scale: Vec2) -> SceneResult<()> {
        let light = self.point_mut(id)?;
        light.atlas_offset = offset;
        light.atlas_scale = scale;
        Ok(())
    }

    fn point_mut(&mut self, id: LightId) -> SceneResult<&mut PointLight> {
        self.points.get_mut(id).ok_or(SceneError::UnknownLight(id))
    }
}
