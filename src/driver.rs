//! Per-frame state machine.
//!
//! ```text
//! Uninitialized --window available--> Initializing --targets ready--> Running
//! ```
//!
//! While `Running`, every tick performs the same stages in a fixed order:
//! advance the simulation, update the renderer's uniforms, update the
//! camera, render, request the next frame. Ticks in any other state are
//! skipped. The driver never blocks; the host calls [`FrameDriver::tick`]
//! once per redraw and the last stage asks for the next one.

/// Lifecycle of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Initializing,
    Running,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The driver is not running; nothing happened.
    Skipped,
    /// All stages ran.
    Rendered,
}

/// The work of one frame, split into the stages the driver sequences.
pub trait FrameStages {
    type Error;

    fn advance_simulation(&mut self);
    fn update_uniforms(&mut self);
    fn update_camera(&mut self);
    fn render(&mut self) -> Result<(), Self::Error>;
    fn request_next_frame(&mut self);
}

/// Sequences [`FrameStages`] and tracks the lifecycle.
#[derive(Debug)]
pub struct FrameDriver {
    state: DriverState,
    frames: u64,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self {
            state: DriverState::Uninitialized,
            frames: 0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Ticks that reached the render stage.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_running(&self) -> bool {
        self.state == DriverState::Running
    }

    /// The host window exists; start building resources. Returns false if
    /// initialisation already started.
    pub fn begin_init(&mut self) -> bool {
        if self.state != DriverState::Uninitialized {
            return false;
        }
        log::debug!("Frame driver: initializing");
        self.state = DriverState::Initializing;
        true
    }

    /// Every target is ready; start running.
    pub fn finish_init(&mut self) {
        if self.state == DriverState::Initializing {
            log::debug!("Frame driver: running");
            self.state = DriverState::Running;
        }
    }

    /// Initialisation failed; drop back so a later attempt can retry.
    pub fn abort_init(&mut self) {
        if self.state == DriverState::Initializing {
            self.state = DriverState::Uninitialized;
        }
    }

    /// Run one frame. The next frame is requested even when rendering fails,
    /// so the host can recover (e.g. after reconfiguring a lost surface).
    pub fn tick<S: FrameStages>(&mut self, stages: &mut S) -> Result<TickOutcome, S::Error> {
        if self.state != DriverState::Running {
            return Ok(TickOutcome::Skipped);
        }
        stages.advance_simulation();
        stages.update_uniforms();
        stages.update_camera();
        let rendered = stages.render();
        self.frames += 1;
        stages.request_next_frame();
        rendered.map(|_| TickOutcome::Rendered)
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail_render: bool,
    }

    impl FrameStages for Recorder {
        type Error = &'static str;

        fn advance_simulation(&mut self) {
            self.calls.push("simulate");
        }
        fn update_uniforms(&mut self) {
            self.calls.push("uniforms");
        }
        fn update_camera(&mut self) {
            self.calls.push("camera");
        }
        fn render(&mut self) -> Result<(), &'static str> {
            self.calls.push("render");
            if self.fail_render {
                Err("lost")
            } else {
                Ok(())
            }
        }
        fn request_next_frame(&mut self) {
            self.calls.push("reschedule");
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut driver = FrameDriver::new();
        assert_eq!(driver.state(), DriverState::Uninitialized);

        driver.finish_init();
        assert_eq!(driver.state(), DriverState::Uninitialized);

        assert!(driver.begin_init());
        assert!(!driver.begin_init());
        assert_eq!(driver.state(), DriverState::Initializing);

        driver.finish_init();
        assert!(driver.is_running());
    }

    #[test]
    fn test_ticks_skipped_until_running() {
        let mut driver = FrameDriver::new();
        let mut stages = Recorder::default();

        assert_eq!(driver.tick(&mut stages), Ok(TickOutcome::Skipped));
        driver.begin_init();
        assert_eq!(driver.tick(&mut stages), Ok(TickOutcome::Skipped));
        assert!(stages.calls.is_empty());
        assert_eq!(driver.frames(), 0);
    }

    #[test]
    fn test_stage_order() {
        let mut driver = FrameDriver::new();
        driver.begin_init();
        driver.finish_init();
        let mut stages = Recorder::default();

        assert_eq!(driver.tick(&mut stages), Ok(TickOutcome::Rendered));
        assert_eq!(driver.tick(&mut stages), Ok(TickOutcome::Rendered));
        assert_eq!(
            stages.calls,
            [
                "simulate", "uniforms", "camera", "render", "reschedule",
                "simulate", "uniforms", "camera", "render", "reschedule",
            ]
        );
        assert_eq!(driver.frames(), 2);
    }

    #[test]
    fn test_render_error_still_reschedules() {
        let mut driver = FrameDriver::new();
        driver.begin_init();
        driver.finish_init();
        let mut stages = Recorder {
            fail_render: true,
            ..Default::default()
        };

        assert_eq!(driver.tick(&mut stages), Err("lost"));
        assert_eq!(stages.calls.last(), Some(&"reschedule"));
    }

    #[test]
    fn test_abort_init() {
        let mut driver = FrameDriver::new();
        driver.begin_init();
        driver.abort_init();
        assert_eq!(driver.state(), DriverState::Uninitialized);
        assert!(driver.begin_init());
    }
}
