//! Input handling for the swarm window.
//!
//! Raw `winit` events are folded into two kinds of output:
//!
//! - [`Command`]s fired by key presses (advance, select, quit), handled
//!   immediately by the application.
//! - Camera deltas (drag and scroll) accumulated between frames and drained
//!   once per tick by the camera stage.
//!
//! The cursor position is also tracked in normalized window coordinates
//! for the trigger zones.

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::config::{Nudge, Tunable};

/// An action requested from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Move to the next target shape.
    Advance,
    /// Jump to a target index.
    Select(usize),
    /// Nudge one of the field parameters.
    Adjust(Tunable, Nudge),
    /// Speed up or slow down simulated time.
    TimeStep(Nudge),
    /// Spin the camera once around the swarm.
    Spin,
    /// Raise or lower the point the camera orbits.
    Lift(Nudge),
    /// Close the window.
    Quit,
}

/// Map a key to its command.
///
/// `Q`/`A` pull, `W`/`S` swirl, `E`/`D` damping, `=`/`-` time step,
/// arrows up/down lift the view, `R` spins it.
pub fn key_command(key: KeyCode) -> Option<Command> {
    let command = match key {
        KeyCode::Space => Command::Advance,
        KeyCode::Escape => Command::Quit,
        KeyCode::KeyQ => Command::Adjust(Tunable::Pull, Nudge::Up),
        KeyCode::KeyA => Command::Adjust(Tunable::Pull, Nudge::Down),
        KeyCode::KeyW => Command::Adjust(Tunable::Swirl, Nudge::Up),
        KeyCode::KeyS => Command::Adjust(Tunable::Swirl, Nudge::Down),
        KeyCode::KeyE => Command::Adjust(Tunable::Damping, Nudge::Up),
        KeyCode::KeyD => Command::Adjust(Tunable::Damping, Nudge::Down),
        KeyCode::Equal | KeyCode::NumpadAdd => Command::TimeStep(Nudge::Up),
        KeyCode::Minus | KeyCode::NumpadSubtract => Command::TimeStep(Nudge::Down),
        KeyCode::ArrowUp => Command::Lift(Nudge::Up),
        KeyCode::ArrowDown => Command::Lift(Nudge::Down),
        KeyCode::KeyR => Command::Spin,
        KeyCode::Digit0 | KeyCode::Numpad0 => Command::Select(0),
        KeyCode::Digit1 | KeyCode::Numpad1 => Command::Select(1),
        KeyCode::Digit2 | KeyCode::Numpad2 => Command::Select(2),
        KeyCode::Digit3 | KeyCode::Numpad3 => Command::Select(3),
        KeyCode::Digit4 | KeyCode::Numpad4 => Command::Select(4),
        KeyCode::Digit5 | KeyCode::Numpad5 => Command::Select(5),
        KeyCode::Digit6 | KeyCode::Numpad6 => Command::Select(6),
        KeyCode::Digit7 | KeyCode::Numpad7 => Command::Select(7),
        KeyCode::Digit8 | KeyCode::Numpad8 => Command::Select(8),
        KeyCode::Digit9 | KeyCode::Numpad9 => Command::Select(9),
        _ => return None,
    };
    Some(command)
}

/// What an event changed, for the caller to act on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Command(Command),
    /// Cursor moved to this normalized position (`0..1`, y down).
    Cursor(Vec2),
    /// Cursor left the window.
    CursorLeft,
}

/// Mouse and keyboard state between frames.
#[derive(Debug, Default)]
pub struct Input {
    dragging: bool,
    cursor: Option<Vec2>,
    orbit: Vec2,
    scroll: f32,
    window_size: (u32, u32),
}

impl Input {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            window_size: (width, height),
            ..Default::default()
        }
    }

    /// Update window size for normalized coordinates.
    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
    }

    /// Drag distance in pixels since the last call.
    pub fn take_orbit(&mut self) -> Vec2 {
        std::mem::take(&mut self.orbit)
    }

    /// Scroll lines since the last call. Positive is forward.
    pub fn take_scroll(&mut self) -> f32 {
        std::mem::take(&mut self.scroll)
    }

    /// Process a winit window event.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return None;
                }
                match event.physical_key {
                    PhysicalKey::Code(code) => key_command(code).map(InputEvent::Command),
                    PhysicalKey::Unidentified(_) => None,
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if *button == MouseButton::Left {
                    self.dragging = *state == ElementState::Pressed;
                }
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                let pos = Vec2::new(position.x as f32, position.y as f32);
                Some(InputEvent::Cursor(self.cursor_moved(pos)))
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                Some(InputEvent::CursorLeft)
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                None
            }
            _ => None,
        }
    }

    fn cursor_moved(&mut self, pos: Vec2) -> Vec2 {
        if self.dragging {
            if let Some(last) = self.cursor {
                self.orbit += pos - last;
            }
        }
        self.cursor = Some(pos);
        self.normalized(pos)
    }

    fn normalized(&self, pos: Vec2) -> Vec2 {
        let (w, h) = self.window_size;
        if w == 0 || h == 0 {
            return Vec2::ZERO;
        }
        Vec2::new(pos.x / w as f32, pos.y / h as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_commands() {
        assert_eq!(key_command(KeyCode::Space), Some(Command::Advance));
        assert_eq!(key_command(KeyCode::Escape), Some(Command::Quit));
        assert_eq!(key_command(KeyCode::Digit3), Some(Command::Select(3)));
        assert_eq!(key_command(KeyCode::Numpad0), Some(Command::Select(0)));
        assert_eq!(key_command(KeyCode::KeyR), Some(Command::Spin));
        assert_eq!(
            key_command(KeyCode::KeyA),
            Some(Command::Adjust(Tunable::Pull, Nudge::Down))
        );
        assert_eq!(key_command(KeyCode::Minus), Some(Command::TimeStep(Nudge::Down)));
        assert_eq!(key_command(KeyCode::KeyZ), None);
    }

    #[test]
    fn test_drag_accumulates_orbit() {
        let mut input = Input::new(800, 600);
        input.cursor_moved(Vec2::new(100.0, 100.0));
        input.dragging = true;
        input.cursor_moved(Vec2::new(110.0, 95.0));
        input.cursor_moved(Vec2::new(120.0, 90.0));
        assert_eq!(input.take_orbit(), Vec2::new(20.0, -10.0));
        assert_eq!(input.take_orbit(), Vec2::ZERO);
    }

    #[test]
    fn test_no_orbit_without_drag() {
        let mut input = Input::new(800, 600);
        input.cursor_moved(Vec2::new(100.0, 100.0));
        input.cursor_moved(Vec2::new(300.0, 100.0));
        assert_eq!(input.take_orbit(), Vec2::ZERO);
    }

    #[test]
    fn test_normalized_cursor() {
        let mut input = Input::new(800, 600);
        assert_eq!(input.cursor_moved(Vec2::new(400.0, 150.0)), Vec2::new(0.5, 0.25));
        input.set_window_size(0, 0);
        assert_eq!(input.cursor_moved(Vec2::new(400.0, 150.0)), Vec2::ZERO);
    }
}
