//! GPU-facing light data
//!
//! std140-friendly structs (every member a vec4) and the per-frame upload of
//! light uniforms to the main program.

use crate::render::backend::{GpuBackend, UniformValue};
use crate::render::uniforms;
use crate::scene::{DirectionalLight, Lights, PointLight};
use bytemuck::{Pod, Zeroable};

/// Point lights the main program declares
pub const MAX_POINT_LIGHTS: usize = 16;

/// Directional light data for GPU uniform buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct DirectionalLightUniform {
    /// Light direction and casts-shadow flag [x, y, z, casts]
    pub direction: [f32; 4],
    /// Light color and brightness [r, g, b, brightness]
    pub color: [f32; 4],
}

impl DirectionalLightUniform {
    /// Pack a directional light
    pub fn from_light(light: &DirectionalLight) -> Self {
        let d = light.direction();
        let c = light.color();
        Self {
            direction: [d.x, d.y, d.z, if light.cast_shadows() { 1.0 } else { 0.0 }],
            color: [c.x, c.y, c.z, light.brightness()],
        }
    }
}

/// Point light data for GPU uniform buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PointLightUniform {
    /// Light position and casts-shadow flag [x, y, z, casts]
    pub position: [f32; 4],
    /// Light color and brightness [r, g, b, brightness]
    pub color: [f32; 4],
    /// Atlas sub-rectangle [offset.x, offset.y, scale.x, scale.y]
    pub atlas: [f32; 4],
}

impl PointLightUniform {
    /// Pack a point light, including the atlas region the shadow pass wrote
    pub fn from_light(light: &PointLight) -> Self {
        let p = light.position();
        let c = light.color();
        let offset = light.atlas_offset();
        let scale = light.atlas_scale();
        Self {
            position: [p.x, p.y, p.z, if light.cast_shadows() { 1.0 } else { 0.0 }],
            color: [c.x, c.y, c.z, light.brightness()],
            atlas: [offset.x, offset.y, scale.x, scale.y],
        }
    }
}

/// Pack up to [`MAX_POINT_LIGHTS`] point lights in scene order
pub fn point_light_uniforms(lights: &Lights) -> Vec<PointLightUniform> {
    if lights.point_count() > MAX_POINT_LIGHTS {
        log::warn!(
            "{} point lights exceed the limit of {MAX_POINT_LIGHTS}; extra lights are not shaded",
            lights.point_count()
        );
    }
    lights
        .points()
        .take(MAX_POINT_LIGHTS)
        .map(|(_, light)| PointLightUniform::from_light(light))
        .collect()
}

/// Set the sun and point-light uniforms on the current program
pub fn upload_lights<B: GpuBackend + ?Sized>(backend: &mut B, lights: &Lights) {
    let sun = DirectionalLightUniform::from_light(lights.directional());
    let [x, y, z, _] = sun.direction;
    let [r, g, b, brightness] = sun.color;
    backend.set_uniform(uniforms::SUN_DIRECTION, UniformValue::Vec3([x, y, z]));
    backend.set_uniform(uniforms::SUN_COLOR, UniformValue::Vec3([r * brightness, g * brightness, b * brightness]));

    let points = point_light_uniforms(lights);
    backend.set_uniform(uniforms::POINT_LIGHT_COUNT, UniformValue::Int(i32::try_from(points.len()).unwrap_or(0)));
    for (i, light) in points.iter().enumerate() {
        backend.set_uniform(&format!("u_point_lights[{i}].position"), UniformValue::Vec4(light.position));
        backend.set_uniform(&format!("u_point_lights[{i}].color"), UniformValue::Vec4(light.color));
        backend.set_uniform(&format!("u_point_lights[{i}].atlas"), UniformValue::Vec4(light.atlas));
    }
}
