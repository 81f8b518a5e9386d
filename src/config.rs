//! Swarm configuration.
//!
//! [`SwarmConfig`] collects every tunable of the swarm: field size, seeding,
//! simulation step, the target shapes and the look of the particles. It can
//! be built in code with the `with_*` setters or loaded from JSON, where
//! missing keys take their default.
//!
//! ```ignore
//! let config = SwarmConfig::load("swarm.json")?
//!     .with_side(256)
//!     .with_seed(7);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::shapes::Shape;
use crate::time::DEFAULT_TIME_STEP;

/// Largest accepted `side`: the 2D texture limit of `wgpu`'s default
/// device limits.
pub const MAX_SIDE: u32 = 8192;

/// A [`FieldParams`] value that can be nudged at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tunable {
    Pull,
    Swirl,
    Damping,
}

/// Direction of a runtime adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    Up,
    Down,
}

impl Nudge {
    /// Multiplier for scale-like values.
    pub fn factor(self) -> f32 {
        match self {
            Nudge::Up => 1.25,
            Nudge::Down => 0.8,
        }
    }
}

/// Parameters read by the velocity update program.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldParams {
    /// Fraction of the distance to the target added to velocity each tick.
    pub pull: f32,
    /// Velocity multiplier applied each tick.
    pub damping: f32,
    /// Strength of the time-varying drift.
    pub swirl: f32,
    /// Speed cap per tick.
    pub max_speed: f32,
}

impl FieldParams {
    /// Upper bound for `damping` when nudged at runtime.
    pub const MAX_DAMPING: f32 = 0.995;

    /// Copy with one value moved a step in `nudge`'s direction. Pull and
    /// swirl scale by [`Nudge::factor`]; damping moves by 0.01 within
    /// `[0, MAX_DAMPING]`.
    pub fn nudged(mut self, tunable: Tunable, nudge: Nudge) -> Self {
        match tunable {
            Tunable::Pull => self.pull *= nudge.factor(),
            Tunable::Swirl => self.swirl *= nudge.factor(),
            Tunable::Damping => {
                let step = match nudge {
                    Nudge::Up => 0.01,
                    Nudge::Down => -0.01,
                };
                self.damping = (self.damping + step).clamp(0.0, Self::MAX_DAMPING);
            }
        }
        self
    }
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            pull: 0.0025,
            damping: 0.95,
            swirl: 0.0006,
            max_speed: 0.08,
        }
    }
}

/// Complete swarm configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Particles per texture row; the swarm has `side²` particles.
    pub side: u32,
    /// Seed for initial fields and shape samples. `None` draws from entropy.
    pub seed: Option<u64>,
    /// Initial positions span `[-spread / 2, spread / 2]` on each axis.
    pub position_spread: f32,
    /// Initial velocities span `[-jitter / 2, jitter / 2]` per component.
    pub velocity_jitter: f32,
    /// Simulation time added per frame.
    pub time_step: f32,
    /// Update program parameters.
    pub params: FieldParams,
    /// Target shapes, in selection order after the base snapshot.
    pub shapes: Vec<Shape>,
    /// Uniform scale applied to shape samples.
    pub shape_scale: f32,
    /// Screen-space size of a particle sprite.
    pub point_size: f32,
    /// Background colour (linear RGB).
    pub background: [f32; 3],
    /// Particle colour (linear RGB).
    pub particle_color: [f32; 3],
    /// Initial window size.
    pub window_size: [u32; 2],
    /// Show the shape trigger zones.
    pub show_triggers: bool,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            side: 128,
            seed: None,
            position_spread: 5.0,
            velocity_jitter: 0.01,
            time_step: DEFAULT_TIME_STEP,
            params: FieldParams::default(),
            shapes: vec![Shape::Sphere, Shape::Dodecahedron, Shape::Capsule],
            shape_scale: 1.0,
            point_size: 0.008,
            background: [1.0, 1.0, 1.0],
            particle_color: [0.08, 0.09, 0.16],
            window_size: [1280, 720],
            show_triggers: true,
        }
    }
}

impl SwarmConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set particles per texture row.
    pub fn with_side(mut self, side: u32) -> Self {
        self.side = side;
        self
    }

    /// Fix the random seed for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the simulation time step.
    pub fn with_time_step(mut self, step: f32) -> Self {
        self.time_step = step;
        self
    }

    /// Set the update program parameters.
    pub fn with_params(mut self, params: FieldParams) -> Self {
        self.params = params;
        self
    }

    /// Replace the target shapes.
    pub fn with_shapes(mut self, shapes: Vec<Shape>) -> Self {
        self.shapes = shapes;
        self
    }

    /// Number of selectable targets, including the base snapshot.
    pub fn target_count(&self) -> usize {
        self.shapes.len() + 1
    }

    /// Total particle count.
    pub fn particle_count(&self) -> u64 {
        self.side as u64 * self.side as u64
    }

    /// Check that every value can drive a simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.side == 0 {
            return Err(ConfigError::Invalid("side must be at least 1".into()));
        }
        if self.side > MAX_SIDE {
            return Err(ConfigError::Invalid(format!(
                "side must be at most {}, got {}",
                MAX_SIDE, self.side
            )));
        }
        if !self.time_step.is_finite() || self.time_step < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "time_step must be a finite non-negative number, got {}",
                self.time_step
            )));
        }
        let p = &self.params;
        for (name, value) in [
            ("params.pull", p.pull),
            ("params.damping", p.damping),
            ("params.swirl", p.swirl),
            ("params.max_speed", p.max_speed),
            ("position_spread", self.position_spread),
            ("velocity_jitter", self.velocity_jitter),
            ("shape_scale", self.shape_scale),
            ("point_size", self.point_size),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{} must be finite", name)));
            }
        }
        if self.window_size[0] == 0 || self.window_size[1] == 0 {
            return Err(ConfigError::Invalid("window_size must be non-zero".into()));
        }
        Ok(())
    }

    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parse and validate a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SwarmConfig::default();
        assert_eq!(config.side, 128);
        assert_eq!(config.target_count(), 4);
        assert!((config.time_step - 0.005).abs() < 1e-7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let config = SwarmConfig::from_json(r#"{ "side": 64, "params": { "pull": 0.01 } }"#).unwrap();
        assert_eq!(config.side, 64);
        assert_eq!(config.params.pull, 0.01);
        assert_eq!(config.params.damping, FieldParams::default().damping);
        assert_eq!(config.shapes.len(), 3);
    }

    #[test]
    fn test_shapes_by_name() {
        let config = SwarmConfig::from_json(r#"{ "shapes": ["cube", "capsule"] }"#).unwrap();
        assert_eq!(config.shapes, vec![Shape::Cube, Shape::Capsule]);
        assert_eq!(config.target_count(), 3);
    }

    #[test]
    fn test_json_round_trip() {
        let config = SwarmConfig::default().with_side(32).with_seed(9);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SwarmConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("shapeswarm-config-{}.json", std::process::id()));
        let config = SwarmConfig::default().with_side(16);
        config.save(&path).unwrap();
        let loaded = SwarmConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rejects_zero_side() {
        let err = SwarmConfig::default().with_side(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_oversized_side() {
        assert!(SwarmConfig::default().with_side(MAX_SIDE).validate().is_ok());
        let config = SwarmConfig::default().with_side(70_000);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert_eq!(config.particle_count(), 4_900_000_000);
    }

    #[test]
    fn test_nudged_params() {
        let params = FieldParams::default();
        let up = params.nudged(Tunable::Pull, Nudge::Up);
        assert!((up.pull - params.pull * 1.25).abs() < 1e-9);
        assert_eq!(up.swirl, params.swirl);

        let down = params.nudged(Tunable::Swirl, Nudge::Down);
        assert!((down.swirl - params.swirl * 0.8).abs() < 1e-9);

        let mut damped = params;
        for _ in 0..20 {
            damped = damped.nudged(Tunable::Damping, Nudge::Up);
        }
        assert_eq!(damped.damping, FieldParams::MAX_DAMPING);
        for _ in 0..200 {
            damped = damped.nudged(Tunable::Damping, Nudge::Down);
        }
        assert_eq!(damped.damping, 0.0);
    }

    #[test]
    fn test_rejects_bad_time_step() {
        assert!(SwarmConfig::default().with_time_step(f32::NAN).validate().is_err());
        assert!(SwarmConfig::default().with_time_step(-1.0).validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(SwarmConfig::from_json("{ side: }"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SwarmConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
