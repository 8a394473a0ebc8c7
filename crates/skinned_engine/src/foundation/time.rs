//! Time management utilities
//!
//! Animation playback reads a monotonic wall clock in seconds. The clock is
//! injected through the [`Clock`] trait so frames can be driven either by
//! real time or deterministically.

use std::cell::Cell;
use std::time::Instant;

/// Monotonic time source in seconds
pub trait Clock {
    /// Seconds elapsed since an arbitrary fixed origin
    fn now_seconds(&self) -> f64;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_seconds(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually advanced clock for headless runs and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    /// Create a clock reading `start` seconds
    pub fn new(start: f64) -> Self {
        Self { now: Cell::new(start) }
    }

    /// Move the clock forward by `seconds`
    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }

    /// Jump to an absolute time
    pub fn set(&self, seconds: f64) {
        self.now.set(seconds);
    }
}

impl Clock for ManualClock {
    fn now_seconds(&self) -> f64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now_seconds(&self) -> f64 {
        (**self).now_seconds()
    }
}

/// Frame timer tracking delta time and frame rate
#[derive(Debug)]
pub struct Timer {
    last_frame: Option<f64>,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: None,
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Record a frame at clock time `now` (should be called once per frame)
    pub fn tick(&mut self, now: f64) {
        if let Some(last) = self.last_frame {
            self.delta_time = (now - last).max(0.0) as f32;
            self.total_time += self.delta_time;
        }
        self.last_frame = Some(now);
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time between the first and latest frame
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the current FPS (based on last frame time)
    pub fn current_fps(&self) -> f32 {
        if self.delta_time > 0.0 {
            1.0 / self.delta_time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(1.0);
        clock.advance(0.5);
        assert!((clock.now_seconds() - 1.5).abs() < f64::EPSILON);
        clock.set(10.0);
        assert!((clock.now_seconds() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_timer_delta_and_fps() {
        let mut timer = Timer::new();
        timer.tick(0.0);
        assert_eq!(timer.delta_time(), 0.0);
        timer.tick(0.25);
        assert!((timer.delta_time() - 0.25).abs() < 1e-6);
        assert!((timer.current_fps() - 4.0).abs() < 1e-4);
        assert_eq!(timer.frame_count(), 2);
    }
}
