//! Keyframe samplers

use super::{AnimationError, AnimationResult};
use crate::scene::description::SamplerDesc;
use serde::{Deserialize, Serialize};

/// How values between two keyframes are produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interpolation {
    /// Component-wise linear blend (also used for rotations)
    #[default]
    Linear,
    /// Hold the previous keyframe value
    Step,
    /// Hermite spline over `[in_tangent, value, out_tangent]` triples
    CubicSpline,
}

/// Bone property a channel writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelPath {
    /// Local translation (3 components)
    Translation,
    /// Local rotation quaternion `[x, y, z, w]` (4 components)
    Rotation,
    /// Local scale (3 components)
    Scale,
}

impl ChannelPath {
    /// Number of floats per keyframe value
    pub const fn components(self) -> usize {
        match self {
            Self::Translation | Self::Scale => 3,
            Self::Rotation => 4,
        }
    }
}

/// Validated keyframe track
#[derive(Debug, Clone, PartialEq)]
pub struct Sampler {
    input: Vec<f32>,
    output: Vec<f32>,
    interpolation: Interpolation,
}

impl Sampler {
    /// Validate a sampler description
    ///
    /// Times must be finite and non-decreasing. Output length is checked
    /// later against the channel width, see [`Sampler::check_output`].
    pub fn new(index: usize, desc: &SamplerDesc) -> AnimationResult<Self> {
        if desc.input.is_empty() {
            return Err(AnimationError::EmptySampler { sampler: index });
        }
        let mut previous = f32::NEG_INFINITY;
        for (key, &time) in desc.input.iter().enumerate() {
            if !time.is_finite() || time < previous {
                return Err(AnimationError::NonMonotonicInput { sampler: index, key });
            }
            previous = time;
        }

        Ok(Self {
            input: desc.input.clone(),
            output: desc.output.clone(),
            interpolation: desc.interpolation,
        })
    }

    /// Make sure the output array can feed values of `components` floats
    pub fn check_output(&self, index: usize, components: usize) -> AnimationResult<()> {
        let per_key = match self.interpolation {
            Interpolation::CubicSpline => components * 3,
            Interpolation::Linear | Interpolation::Step => components,
        };
        let expected = self.input.len() * per_key;
        if self.output.len() == expected {
            Ok(())
        } else {
            Err(AnimationError::OutputLengthMismatch {
                sampler: index,
                expected,
                actual: self.output.len(),
            })
        }
    }

    /// Interpolation mode
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Keyframe times
    pub fn input(&self) -> &[f32] {
        &self.input
    }

    /// Time of the first keyframe
    pub fn start_time(&self) -> f32 {
        self.input.first().copied().unwrap_or(0.0)
    }

    /// Time of the last keyframe
    pub fn end_time(&self) -> f32 {
        self.input.last().copied().unwrap_or(0.0)
    }

    /// Locate the keyframes surrounding `time`
    ///
    /// Returns `(previous, next, fraction)`. `previous` is the greatest key
    /// whose time is `<= time` (or 0 before the first key), `next` is clamped
    /// to the last key and the fraction is clamped to `[0, 1]`, so sampling
    /// outside the track holds the first or last value.
    pub fn keyframes(&self, time: f32) -> (usize, usize, f32) {
        let last = self.input.len().saturating_sub(1);
        let previous = self.input.partition_point(|&key| key <= time).saturating_sub(1);
        let next = (previous + 1).min(last);

        let span = self.input[next] - self.input[previous];
        let fraction = if span > 0.0 {
            ((time - self.input[previous]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (previous, next, fraction)
    }

    /// Sample the track at `time`
    ///
    /// Only the first `components` entries of the result are meaningful.
    pub fn sample(&self, time: f32, components: usize) -> [f32; 4] {
        let (previous, next, fraction) = self.keyframes(time);
        let mut out = [0.0; 4];

        match self.interpolation {
            Interpolation::Step => {
                out[..components].copy_from_slice(self.value(previous, components));
            }
            Interpolation::Linear => {
                let a = self.value(previous, components);
                let b = self.value(next, components);
                for (i, slot) in out.iter_mut().take(components).enumerate() {
                    *slot = a[i] + (b[i] - a[i]) * fraction;
                }
            }
            Interpolation::CubicSpline => {
                let stride = components * 3;
                let start = previous * stride;
                let end = next * stride;
                let dt = self.input[next] - self.input[previous];

                let s = fraction;
                let s2 = s * s;
                let s3 = s2 * s;
                let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
                let h10 = s3 - 2.0 * s2 + s;
                let h01 = -2.0 * s3 + 3.0 * s2;
                let h11 = s3 - s2;

                for (i, slot) in out.iter_mut().take(components).enumerate() {
                    let v0 = self.output[start + components + i];
                    let out_tangent = self.output[start + 2 * components + i];
                    let in_tangent = self.output[end + i];
                    let v1 = self.output[end + components + i];
                    *slot = h00 * v0 + h10 * dt * out_tangent + h01 * v1 + h11 * dt * in_tangent;
                }
            }
        }
        out
    }

    fn value(&self, key: usize, components: usize) -> &[f32] {
        let start = key * components;
        &self.output[start..start + components]
    }
}
