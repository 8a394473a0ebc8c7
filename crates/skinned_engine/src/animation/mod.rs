//! Keyframed skeletal animation
//!
//! A [`BoneAnimation`] owns validated samplers and channels. Each tick it
//! writes TRS overrides into a [`Skeleton`](crate::scene::Skeleton); the
//! skeleton itself recomputes world matrices once per frame during the scene
//! update, no matter how many channels fired.

pub mod bone_animation;
pub mod sampler;

pub use bone_animation::{BoneAnimation, Channel, PlaybackState, StopListener};
pub use sampler::{ChannelPath, Interpolation, Sampler};

use thiserror::Error;

/// Errors raised while building an animation from its description
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// A sampler has no keyframes
    #[error("Sampler {sampler} has no keyframes")]
    EmptySampler {
        /// Sampler index
        sampler: usize,
    },

    /// Keyframe times go backwards or are not finite
    #[error("Sampler {sampler} has a non-monotonic or non-finite time at key {key}")]
    NonMonotonicInput {
        /// Sampler index
        sampler: usize,
        /// First offending key
        key: usize,
    },

    /// Output array does not match keyframe count and channel width
    #[error("Sampler {sampler} has {actual} output values, expected {expected}")]
    OutputLengthMismatch {
        /// Sampler index
        sampler: usize,
        /// Required length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// A channel references a sampler that does not exist
    #[error("Channel {channel} references sampler {sampler} (animation has {count})")]
    SamplerOutOfRange {
        /// Channel index
        channel: usize,
        /// Referenced sampler
        sampler: usize,
        /// Number of samplers
        count: usize,
    },

    /// A channel targets a bone that does not exist
    #[error("Channel {channel} targets bone {bone} (skeleton has {count} bones)")]
    BoneOutOfRange {
        /// Channel index
        channel: usize,
        /// Referenced bone
        bone: usize,
        /// Number of bones
        count: usize,
    },
}

/// Result type for animation construction
pub type AnimationResult<T> = Result<T, AnimationError>;
