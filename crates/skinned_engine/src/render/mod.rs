//! Rendering: GPU backend abstraction, shadow passes and the frame renderer
//!
//! The renderer decides *what* reaches the shader for each draw (matrices,
//! skinning data, light and shadow parameters). Turning that into API calls
//! is the job of a [`GpuBackend`] implementation; [`RecordingBackend`] is a
//! headless one that records every call.

pub mod backend;
pub mod camera;
pub mod debug_lines;
pub mod draw;
pub mod lighting;
pub mod recording;
pub mod renderer;
pub mod shadow;

pub use backend::{
    texture_units, uniforms, BackendResult, FramebufferHandle, FramebufferStatus, GpuBackend, GpuVertex, MeshHandle,
    ProgramHandle, ProgramKind, TextureFormat, TextureHandle, Topology, UniformValue, Viewport,
};
pub use camera::Camera;
pub use debug_lines::{DebugLineRenderer, LineBatch};
pub use draw::{DrawItem, DrawList, GpuResources, SyncStats};
pub use lighting::{DirectionalLightUniform, PointLightUniform, MAX_POINT_LIGHTS};
pub use recording::{Command, RecordingBackend};
pub use renderer::{FrameStats, Renderer};
pub use shadow::{AtlasLayout, DirectionalShadowMap, PointShadowAtlas, CUBE_FACES};

use crate::scene::SceneError;
use thiserror::Error;

/// Rendering errors
///
/// The first three variants are fatal at initialization; the engine context
/// constructor surfaces them and startup aborts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// No usable GPU context
    #[error("GPU context unavailable: {0}")]
    ContextUnavailable(String),

    /// A shader program failed to compile or link
    #[error("Shader compilation failed for {program}: {log}")]
    ShaderCompilation {
        /// Program that failed
        program: String,
        /// Compiler or linker output
        log: String,
    },

    /// A render target is not usable
    #[error("Framebuffer incomplete: {0}")]
    FramebufferIncomplete(String),

    /// Resource creation or management failed
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Scene data could not be read
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;
