//! Shadow passes
//!
//! Two depth passes run before the main pass each frame:
//!
//! - [`DirectionalShadowMap`]: one orthographic depth map for the sun
//! - [`PointShadowAtlas`]: the six cube faces of every shadow-casting point
//!   light packed into one texture, one row per light

pub mod directional;
pub mod point_atlas;

pub use directional::DirectionalShadowMap;
pub use point_atlas::{AtlasLayout, PointShadowAtlas, CUBE_FACES};

use crate::render::backend::{FramebufferHandle, FramebufferStatus, GpuBackend, TextureHandle};
use crate::render::{RenderError, RenderResult};

/// Create a depth texture and a framebuffer around it, failing if the
/// backend reports the framebuffer incomplete
fn depth_target<B: GpuBackend + ?Sized>(
    backend: &mut B,
    label: &str,
    width: u32,
    height: u32,
) -> RenderResult<(TextureHandle, FramebufferHandle)> {
    let depth = backend.create_depth_texture(width, height)?;
    let framebuffer = match backend.create_framebuffer(depth) {
        Ok(framebuffer) => framebuffer,
        Err(error) => {
            backend.delete_texture(depth);
            return Err(error);
        }
    };
    if let FramebufferStatus::Incomplete(reason) = backend.framebuffer_status(framebuffer) {
        backend.delete_framebuffer(framebuffer);
        backend.delete_texture(depth);
        log::error!("{label} framebuffer incomplete: {reason}");
        return Err(RenderError::FramebufferIncomplete(format!("{label}: {reason}")));
    }
    log::debug!("{label} depth target created ({width}x{height})");
    Ok((depth, framebuffer))
}
