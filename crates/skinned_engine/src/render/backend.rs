//! Backend abstraction for the rendering system
//!
//! This module defines the capability set a GPU API wrapper must provide:
//! programs, depth and float textures, framebuffers, uniforms, vertex/index
//! buffers and indexed draws. Handles are opaque integers owned by the
//! backend.

use crate::render::RenderError;
use bytemuck::{Pod, Zeroable};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Handle to a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferHandle(pub u64);

/// Handle to a vertex/index buffer pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Programs the renderer needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Lit, shadowed, optionally skinned color pass
    Main,
    /// Depth-only pass from the sun
    DirectionalDepth,
    /// Distance-to-light pass into the cube atlas
    PointDepth,
    /// Unlit line list
    DebugLines,
}

impl ProgramKind {
    /// Name used in logs and errors
    pub const fn name(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::DirectionalDepth => "directional_depth",
            Self::PointDepth => "point_depth",
            Self::DebugLines => "debug_lines",
        }
    }
}

/// Texture storage formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 32-bit float depth
    Depth32F,
    /// Four 32-bit float channels
    Rgba32F,
}

/// Result of a framebuffer completeness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramebufferStatus {
    /// Usable as a render target
    Complete,
    /// Not usable, with the backend's reason
    Incomplete(String),
}

/// Pixel rectangle of the bound render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    /// Left edge
    pub x: u32,
    /// Bottom edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Viewport covering a whole `width × height` target
    pub const fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    /// Width over height
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Primitive topology of a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Triangle list
    Triangles,
    /// Line list
    Lines,
}

/// Uniform payloads; matrices are column-major
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Scalar float
    Float(f32),
    /// Scalar int (also used for booleans)
    Int(i32),
    /// vec2
    Vec2([f32; 2]),
    /// vec3
    Vec3([f32; 3]),
    /// vec4
    Vec4([f32; 4]),
    /// mat3
    Mat3([f32; 9]),
    /// mat4
    Mat4([f32; 16]),
    /// Texture unit
    Sampler(u32),
}

/// Vertex layout shared by every program
///
/// Joint indices are stored as floats so that a single float attribute
/// stream covers rigid and skinned geometry.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    /// Position
    pub position: [f32; 3],
    /// Normal
    pub normal: [f32; 3],
    /// Texture coordinates
    pub uv: [f32; 2],
    /// Joint indices
    pub joints: [f32; 4],
    /// Joint weights
    pub weights: [f32; 4],
}

/// Uniform and sampler names the programs declare
pub mod uniforms {
    /// Model matrix (mat4)
    pub const MODEL: &str = "u_model";
    /// Normal matrix (mat3)
    pub const NORMAL_MATRIX: &str = "u_normal_matrix";
    /// Camera view-projection (mat4)
    pub const VIEW_PROJECTION: &str = "u_view_projection";
    /// Camera position (vec3)
    pub const CAMERA_POSITION: &str = "u_camera_position";
    /// Whether the draw is skinned (int)
    pub const SKINNED: &str = "u_skinned";
    /// Joint count of the bound bone texture (int)
    pub const JOINT_COUNT: &str = "u_joint_count";
    /// Bone texture sampler
    pub const BONE_TEXTURE: &str = "u_bone_texture";
    /// Base color factor (vec4)
    pub const BASE_COLOR: &str = "u_base_color";
    /// Sun or cube-face view-projection (mat4)
    pub const LIGHT_VIEW_PROJECTION: &str = "u_light_view_projection";
    /// Sun direction (vec3)
    pub const SUN_DIRECTION: &str = "u_sun_direction";
    /// Sun color times brightness (vec3)
    pub const SUN_COLOR: &str = "u_sun_color";
    /// Whether the sun shadow map is valid (int)
    pub const SUN_SHADOWS: &str = "u_sun_shadows";
    /// Directional shadow map sampler
    pub const SHADOW_MAP: &str = "u_shadow_map";
    /// Point shadow atlas sampler
    pub const POINT_SHADOW_ATLAS: &str = "u_point_shadow_atlas";
    /// Number of point lights (int)
    pub const POINT_LIGHT_COUNT: &str = "u_point_light_count";
    /// Light position for the point depth pass (vec3)
    pub const LIGHT_POSITION: &str = "u_light_position";
    /// Far plane for the point depth pass (float)
    pub const FAR_PLANE: &str = "u_far_plane";
    /// Depth bias (float)
    pub const DEPTH_BIAS: &str = "u_depth_bias";
}

/// Texture units the renderer binds
pub mod texture_units {
    /// Bone texture of the current draw
    pub const BONES: u32 = 0;
    /// Directional shadow map
    pub const SHADOW_MAP: u32 = 1;
    /// Point shadow atlas
    pub const POINT_ATLAS: u32 = 2;
}

/// Opaque GPU capability used by the renderer
pub trait GpuBackend {
    /// Fail with [`RenderError::ContextUnavailable`] when no context exists
    fn check_context(&self) -> BackendResult<()>;

    /// Compile and link one of the renderer's programs
    fn create_program(&mut self, kind: ProgramKind) -> BackendResult<ProgramHandle>;

    /// Make a program current
    fn use_program(&mut self, program: ProgramHandle);

    /// Set a uniform on the current program
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    /// Allocate a depth texture
    fn create_depth_texture(&mut self, width: u32, height: u32) -> BackendResult<TextureHandle>;

    /// Allocate an RGBA32F texture holding `width * height * 4` floats
    fn create_texture_rgba32f(&mut self, width: u32, height: u32, data: &[f32]) -> BackendResult<TextureHandle>;

    /// Replace the contents (and size) of an RGBA32F texture
    fn update_texture_rgba32f(
        &mut self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        data: &[f32],
    ) -> BackendResult<()>;

    /// Release a texture
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Bind a texture to a unit
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Create a depth-only framebuffer around `depth`
    fn create_framebuffer(&mut self, depth: TextureHandle) -> BackendResult<FramebufferHandle>;

    /// Completeness of a framebuffer
    fn framebuffer_status(&self, framebuffer: FramebufferHandle) -> FramebufferStatus;

    /// Release a framebuffer
    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle);

    /// Bind a framebuffer, or the default target with `None`
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>);

    /// Set the viewport rectangle
    fn set_viewport(&mut self, viewport: Viewport);

    /// Clear the depth of the bound target
    fn clear_depth(&mut self);

    /// Upload vertex and index buffers
    fn create_mesh_buffers(&mut self, vertices: &[GpuVertex], indices: &[u32]) -> BackendResult<MeshHandle>;

    /// Replace the contents of existing buffers
    fn update_mesh_buffers(&mut self, mesh: MeshHandle, vertices: &[GpuVertex], indices: &[u32]) -> BackendResult<()>;

    /// Release buffers
    fn delete_mesh_buffers(&mut self, mesh: MeshHandle);

    /// Indexed draw of `count` indices
    fn draw_indexed(&mut self, mesh: MeshHandle, topology: Topology, count: u32) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<GpuVertex>(), 16 * 4);
        let vertex = GpuVertex { position: [1.0, 2.0, 3.0], ..GpuVertex::zeroed() };
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&vertex));
        assert_eq!(&floats[..3], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_viewport_aspect() {
        assert_eq!(Viewport::full(1600, 800).aspect(), 2.0);
        assert_eq!(Viewport::full(10, 0).aspect(), 1.0);
    }
}
