//! Time management for the simulation loop.

use std::time::{Duration, Instant};

/// Fixed-rate accumulator decoupling a subsystem's update rate from the
/// caller's frame rate. The thermal simulator runs one of these at 30 Hz,
/// the rigid-body integrator at 60 Hz, fire spread at 2 Hz.
#[derive(Debug, Clone, Copy)]
pub struct FixedStep {
    step: f32,
    accumulator: f32,
}

impl FixedStep {
    /// Create an accumulator stepping at `hz` updates per second.
    pub fn from_hz(hz: f32) -> Self {
        Self {
            step: 1.0 / hz,
            accumulator: 0.0,
        }
    }

    /// Create an accumulator with an explicit period in seconds.
    pub fn from_period(seconds: f32) -> Self {
        Self {
            step: seconds,
            accumulator: 0.0,
        }
    }

    pub fn step_seconds(&self) -> f32 {
        self.step
    }

    /// Bank frame time.
    pub fn accumulate(&mut self, dt: f32) {
        self.accumulator += dt;
    }

    /// Consume one step if enough time is banked.
    pub fn tick(&mut self) -> bool {
        if self.accumulator >= self.step {
            self.accumulator -= self.step;
            true
        } else {
            false
        }
    }
}

/// Manages frame timing and delta time calculation.
#[derive(Debug)]
pub struct Time {
    /// Time when the simulation started.
    start_time: Instant,
    /// Time of the last frame.
    last_frame: Instant,
    /// Duration of the last frame.
    delta: Duration,
    /// Total elapsed time since start.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a new time manager.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_frame: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Update timing at the start of a new frame.
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta = now - self.last_frame;
        self.last_frame = now;
        self.elapsed = now - self.start_time;
        self.frame_count += 1;
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accumulating exactly N periods yields exactly N ticks.
    #[test]
    fn fixed_step_ticks_match_accumulated_periods() {
        let mut fs = FixedStep::from_hz(30.0);
        fs.accumulate(5.0 / 30.0 + 1e-6);
        let mut ticks = 0;
        while fs.tick() {
            ticks += 1;
        }
        assert_eq!(ticks, 5);
    }

    #[test]
    fn fixed_step_holds_remainder_across_frames() {
        let mut fs = FixedStep::from_period(0.5);
        fs.accumulate(0.3);
        assert!(!fs.tick());
        fs.accumulate(0.3);
        assert!(fs.tick());
        assert!(!fs.tick());
    }
}
