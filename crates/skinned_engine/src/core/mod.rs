//! Core engine systems
//!
//! Configuration shared by the scene, renderer and engine context.

pub mod config;

pub use config::{AnimationConfig, Config, ConfigError, DebugConfig, EngineConfig, ShadowConfig};
