//! # Skinned Engine
//!
//! Scene graph, skeletal animation and shadow-mapping core of a real-time 3D
//! renderer.
//!
//! ## Features
//!
//! - **Transform Hierarchy**: parent-linked transforms with revision stamps
//!   so dependents recompute only when something upstream changed
//! - **Skeletal Animation**: looped keyframe clips (linear, step and cubic
//!   spline) driving bone poses, forward kinematics and per-skin matrices
//! - **Skinned Bounds**: bounding boxes rebuilt from skinned vertices
//! - **Shadows**: a directional shadow map and a point-light cube atlas with
//!   one row per shadow-casting light
//! - **Backend Agnostic**: the renderer talks to a [`GpuBackend`] trait; the
//!   headless [`RecordingBackend`] records every call
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skinned_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let mut engine = Engine::new(
//!         RecordingBackend::new(),
//!         EngineConfig::default(),
//!         Box::new(SystemClock::new()),
//!         Viewport::full(1280, 720),
//!     )?;
//!     engine.load_scene(&SceneDesc::default())?;
//!     let report = engine.tick()?;
//!     println!("{} draws", report.render.total_draws());
//!     Ok(())
//! }
//! ```
//!
//! [`GpuBackend`]: render::GpuBackend
//! [`RecordingBackend`]: render::RecordingBackend

pub mod animation;
pub mod core;
pub mod engine;
pub mod foundation;
pub mod render;
pub mod scene;

pub use engine::{Engine, EngineError, EngineResult, FrameReport};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        animation::{BoneAnimation, ChannelPath, Interpolation, PlaybackState},
        core::{Config, ConfigError, DebugConfig, EngineConfig, ShadowConfig},
        foundation::{
            math::{Mat4, Quat, Vec3},
            time::{Clock, ManualClock, SystemClock, Timer},
        },
        render::{Camera, FrameStats, GpuBackend, RecordingBackend, RenderError, Renderer, Viewport},
        scene::{ObjectId, ObjectDesc, Scene, SceneDesc, SceneError, SceneObject, UpdateStats},
        Engine, EngineError, EngineResult, FrameReport,
    };
}
