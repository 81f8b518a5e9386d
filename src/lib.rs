//! # shapeswarm
//!
//! A swarm of particles that flows between target shapes, simulated
//! entirely in floating-point textures.
//!
//! Every particle owns one texel in a square `side × side` field. Two
//! fields, position and velocity, are updated once per frame by small
//! compute programs that read the previous tick of both and write the next.
//! The velocity program pulls each particle toward the matching texel of a
//! *target* texture, so swapping the bound target reshapes the swarm.
//!
//! ## Quick Start
//!
//! ```ignore
//! use shapeswarm::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     env_logger::init();
//!     let config = SwarmConfig::default().with_side(128).with_seed(7);
//!     shapeswarm::app::run(config)
//! }
//! ```
//!
//! ## Headless
//!
//! The same programs run on [`CpuCompute`], which makes the simulation
//! testable without a GPU:
//!
//! ```ignore
//! let config = SwarmConfig::default().with_side(16).with_seed(1);
//! let mut rng = seeded_rng(config.seed);
//! let mut sim = FieldSimulator::cpu(&config, &mut rng);
//! let mut selector = ShapeSelector::build(&mut sim, &config, &mut rng);
//!
//! selector.advance(sim.backend_mut())?;
//! for _ in 0..100 {
//!     sim.step();
//! }
//! ```
//!
//! ## Layout
//!
//! - [`compute`]: the ping-pong compute contract and the CPU backend
//! - [`gpu`]: device setup, the WGSL backend, particle and overlay rendering
//! - [`programs`]: the velocity and position update programs
//! - [`shapes`] and [`sampler`]: target meshes and area-weighted sampling
//! - [`selector`]: cycling targets and the on-screen trigger zones
//! - [`simulator`]: seeding and stepping the two fields
//! - [`driver`] and [`app`]: the frame loop and the window

pub mod app;
pub mod compute;
pub mod config;
pub mod driver;
pub mod error;
pub mod field;
pub mod gpu;
pub mod input;
pub mod programs;
pub mod sampler;
pub mod selector;
pub mod shader_validate;
pub mod shapes;
pub mod simulator;
pub mod time;

pub use compute::{ComputeBackend, CpuCompute, FieldUniforms, TargetId, VariableId};
pub use config::{FieldParams, SwarmConfig};
pub use error::{AppError, ComputeError, ConfigError, GpuError};
pub use field::FieldTexture;
pub use glam::{Vec2, Vec3, Vec4};
pub use selector::{ShapeSelector, TriggerZones};
pub use shapes::Shape;
pub use simulator::{seeded_rng, FieldSimulator};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use shapeswarm::prelude::*;
/// ```
pub mod prelude {
    pub use crate::compute::{ComputeBackend, CpuCompute, TexelInput};
    pub use crate::config::{FieldParams, SwarmConfig};
    pub use crate::error::{AppError, ComputeError};
    pub use crate::gpu::GpuCompute;
    pub use crate::programs::SwarmPrograms;
    pub use crate::selector::{ShapeSelector, TriggerZones};
    pub use crate::shapes::Shape;
    pub use crate::simulator::{seeded_rng, FieldSimulator};
    pub use crate::{Vec2, Vec3, Vec4};
}
