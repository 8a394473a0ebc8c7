//! Looped single-clip playback over a skeleton

use super::sampler::{ChannelPath, Sampler};
use super::{AnimationError, AnimationResult};
use crate::foundation::math::{RawQuat, Vec3};
use crate::scene::description::AnimationDesc;
use crate::scene::{SceneResult, Skeleton};
use std::fmt;

/// One-shot callback run when playback stops
pub type StopListener = Box<dyn FnOnce(&mut Skeleton)>;

/// Binding of a sampler to one bone property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    /// Sampler index
    pub sampler: usize,
    /// Target bone index
    pub bone: usize,
    /// Animated property
    pub path: ChannelPath,
}

/// Playback state of a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Updates are ignored
    #[default]
    Stopped,
    /// Updates sample the clip
    Playing,
}

/// A keyframed clip driving bone TRS values
pub struct BoneAnimation {
    name: String,
    samplers: Vec<Sampler>,
    channels: Vec<Channel>,
    start_time: f32,
    length: f32,
    state: PlaybackState,
    started_at: f64,
    stop_listeners: Vec<StopListener>,
}

impl fmt::Debug for BoneAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoneAnimation")
            .field("name", &self.name)
            .field("channels", &self.channels.len())
            .field("length", &self.length)
            .field("state", &self.state)
            .field("stop_listeners", &self.stop_listeners.len())
            .finish_non_exhaustive()
    }
}

impl Clone for BoneAnimation {
    /// Copies the clip data and playback state; pending stop listeners belong
    /// to the original owner and are not carried over.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            samplers: self.samplers.clone(),
            channels: self.channels.clone(),
            start_time: self.start_time,
            length: self.length,
            state: self.state,
            started_at: self.started_at,
            stop_listeners: Vec::new(),
        }
    }
}

impl BoneAnimation {
    /// Validate a description against a skeleton of `bone_count` bones
    pub fn new(desc: &AnimationDesc, bone_count: usize) -> AnimationResult<Self> {
        let samplers = desc
            .samplers
            .iter()
            .enumerate()
            .map(|(index, sampler)| Sampler::new(index, sampler))
            .collect::<AnimationResult<Vec<_>>>()?;

        let mut channels = Vec::with_capacity(desc.channels.len());
        for (index, channel) in desc.channels.iter().enumerate() {
            let sampler = samplers.get(channel.sampler).ok_or(AnimationError::SamplerOutOfRange {
                channel: index,
                sampler: channel.sampler,
                count: samplers.len(),
            })?;
            if channel.bone >= bone_count {
                return Err(AnimationError::BoneOutOfRange {
                    channel: index,
                    bone: channel.bone,
                    count: bone_count,
                });
            }
            sampler.check_output(channel.sampler, channel.path.components())?;
            channels.push(Channel {
                sampler: channel.sampler,
                bone: channel.bone,
                path: channel.path,
            });
        }

        let start_time = samplers.iter().map(Sampler::start_time).fold(f32::INFINITY, f32::min);
        let end_time = samplers.iter().map(Sampler::end_time).fold(f32::NEG_INFINITY, f32::max);
        let (start_time, length) = if samplers.is_empty() {
            (0.0, 0.0)
        } else {
            (start_time, end_time - start_time)
        };

        if length <= 0.0 {
            log::warn!(
                "Animation '{}' has zero length; its {} channels will be skipped",
                desc.name,
                channels.len()
            );
        }

        Ok(Self {
            name: desc.name.clone(),
            samplers,
            channels,
            start_time,
            length,
            state: PlaybackState::Stopped,
            started_at: 0.0,
            stop_listeners: Vec::new(),
        })
    }

    /// Clip name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validated channels
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Clip length in seconds (last key minus first key across all samplers)
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Current playback state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether the clip is playing
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Begin looped playback, with clip time 0 at clock time `now`
    pub fn start(&mut self, now: f64) {
        self.state = PlaybackState::Playing;
        self.started_at = now;
        log::debug!("Animation '{}' started at {now:.3}s", self.name);
    }

    /// Register a callback to run on the next [`BoneAnimation::stop`]
    pub fn on_stop(&mut self, listener: StopListener) {
        self.stop_listeners.push(listener);
    }

    /// Stop playback and run (then drop) the registered stop listeners
    pub fn stop(&mut self, skeleton: &mut Skeleton) {
        self.state = PlaybackState::Stopped;
        for listener in self.stop_listeners.drain(..) {
            listener(skeleton);
        }
        log::debug!("Animation '{}' stopped", self.name);
    }

    /// Stop playback, dropping the stop listeners without running them
    pub fn cancel(&mut self) {
        self.state = PlaybackState::Stopped;
        let dropped = self.stop_listeners.len();
        self.stop_listeners.clear();
        log::debug!("Animation '{}' cancelled ({dropped} listeners dropped)", self.name);
    }

    /// Stop listeners waiting for the next stop
    pub fn pending_stop_listeners(&self) -> usize {
        self.stop_listeners.len()
    }

    /// Clip-local time for clock time `now`, wrapped into `[start, start + length)`
    pub fn clip_time(&self, now: f64) -> f32 {
        if self.length <= 0.0 {
            return self.start_time;
        }
        let elapsed = (now - self.started_at).rem_euclid(f64::from(self.length));
        self.start_time + elapsed as f32
    }

    /// Write sampled TRS values into the skeleton
    ///
    /// Does nothing while stopped or when the clip has zero length. The
    /// skeleton is only marked dirty; world matrices are recomputed by the
    /// skeleton's own update.
    pub fn update(&self, skeleton: &mut Skeleton, now: f64) -> SceneResult<()> {
        if !self.is_playing() || self.length <= 0.0 {
            return Ok(());
        }

        let time = self.clip_time(now);
        for channel in &self.channels {
            let sampler = &self.samplers[channel.sampler];
            let v = sampler.sample(time, channel.path.components());
            match channel.path {
                ChannelPath::Translation => skeleton.set_translation(channel.bone, Vec3::new(v[0], v[1], v[2]))?,
                ChannelPath::Scale => skeleton.set_scale(channel.bone, Vec3::new(v[0], v[1], v[2]))?,
                // Lerped component-wise; normalized when the bone matrix is composed
                ChannelPath::Rotation => skeleton.set_rotation(channel.bone, RawQuat::new(v[3], v[0], v[1], v[2]))?,
            }
        }
        log::trace!("Animation '{}' applied {} channels at t={time:.3}", self.name, self.channels.len());
        Ok(())
    }
}
