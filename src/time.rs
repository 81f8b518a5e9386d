//! Simulation clock and frame statistics.
//!
//! The simulation does not follow the wall clock: every tick advances
//! `time` by a fixed step, so the swarm moves the same amount per frame on
//! any machine. Wall-clock timing is only used for the FPS readout.
//!
//! # Example
//!
//! ```ignore
//! use shapeswarm::time::{FrameStats, SimClock};
//!
//! let mut clock = SimClock::new(0.005);
//! let mut stats = FrameStats::new();
//!
//! // In the frame loop:
//! let t = clock.tick();
//! if let Some(fps) = stats.frame() {
//!     println!("t = {:.3}, {:.1} fps", t, fps);
//! }
//! ```

use std::time::{Duration, Instant};

/// Default simulation time added per frame.
pub const DEFAULT_TIME_STEP: f32 = 0.005;

/// Fixed-step simulation time.
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Accumulated simulation time.
    time: f32,
    /// Amount added per tick.
    step: f32,
    /// Ticks since creation.
    ticks: u64,
}

impl SimClock {
    /// Create a clock at `time = 0` with the given step.
    pub fn new(step: f32) -> Self {
        Self {
            time: 0.0,
            step,
            ticks: 0,
        }
    }

    /// Advance by one step and return the new time.
    pub fn tick(&mut self) -> f32 {
        self.time += self.step;
        self.ticks += 1;
        self.time
    }

    /// Current simulation time.
    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Step added per tick.
    #[inline]
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Change the step for future ticks.
    pub fn set_step(&mut self, step: f32) {
        self.step = step;
    }

    /// Number of ticks so far.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_STEP)
    }
}

/// Wall-clock frame counter with a periodically refreshed FPS value.
#[derive(Debug)]
pub struct FrameStats {
    /// Total frames recorded.
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    /// Frame count at last FPS update.
    fps_frame_count: u64,
    /// Time of last FPS calculation.
    fps_update_time: Instant,
    /// How often to update FPS calculation.
    fps_update_interval: Duration,
}

impl FrameStats {
    /// Create a counter that refreshes FPS every 500ms.
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: Instant::now(),
            fps_update_interval: Duration::from_millis(500),
        }
    }

    /// Record a frame. Returns the new FPS when it was just recalculated.
    pub fn frame(&mut self) -> Option<f32> {
        self.frame_at(Instant::now())
    }

    fn frame_at(&mut self, now: Instant) -> Option<f32> {
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
            Some(self.fps)
        } else {
            None
        }
    }

    /// Most recent FPS value.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Frames recorded so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_fixed_step() {
        let mut clock = SimClock::new(0.005);
        assert_eq!(clock.time(), 0.0);
        let t = clock.tick();
        assert!((t - 0.005).abs() < 1e-7);
        for _ in 0..99 {
            clock.tick();
        }
        assert_eq!(clock.ticks(), 100);
        assert!((clock.time() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut clock = SimClock::default();
        let mut last = clock.time();
        for _ in 0..1000 {
            let t = clock.tick();
            assert!(t > last);
            last = t;
        }
    }

    #[test]
    fn test_set_step() {
        let mut clock = SimClock::new(1.0);
        clock.tick();
        clock.set_step(0.5);
        clock.tick();
        assert_eq!(clock.time(), 1.5);
        assert_eq!(clock.step(), 0.5);
    }

    #[test]
    fn test_frame_stats_interval() {
        let mut stats = FrameStats::new();
        stats.fps_update_interval = Duration::from_millis(100);
        let start = stats.fps_update_time;

        assert_eq!(stats.frame_at(start + Duration::from_millis(10)), None);
        assert_eq!(stats.frame_at(start + Duration::from_millis(50)), None);
        let fps = stats.frame_at(start + Duration::from_millis(200)).unwrap();
        assert!((fps - 15.0).abs() < 1e-3);
        assert_eq!(stats.fps(), fps);
        assert_eq!(stats.frames(), 3);
    }
}
