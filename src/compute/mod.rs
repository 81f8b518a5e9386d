//! Field compute backends.
//!
//! A backend owns a set of named field variables, each an `N×N` texture
//! updated every tick by its own update program. Variables declare which
//! other variables they read; a tick evaluates every program against the
//! previous tick's buffers only and swaps all buffers at the end, so no
//! program ever sees a half-updated field, whatever the registration order.
//!
//! Two implementations exist:
//!
//! - [`CpuCompute`] runs Rust closures texel by texel. Deterministic and
//!   headless, used by tests and for inspecting field contents.
//! - [`crate::gpu::GpuCompute`] runs WGSL compute shaders on `wgpu`
//!   storage textures.
//!
//! Besides variables, a backend holds read-only *target* textures. Each
//! variable has one target slot; [`ComputeBackend::bind_target`] points it at
//! a registered target. Rebinding is the only way the shape selection
//! reaches the simulation.

mod cpu;

pub use cpu::{CpuCompute, CpuProgram, TexelInput};

use bytemuck::{Pod, Zeroable};

use crate::config::FieldParams;
use crate::error::ComputeError;
use crate::field::FieldTexture;

/// Handle to a field variable registered with a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableId(pub(crate) usize);

impl VariableId {
    /// Registration index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a read-only target texture registered with a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub(crate) usize);

impl TargetId {
    /// Registration index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Uniform block shared by every update program.
///
/// Mirrors the WGSL `FieldUniforms` struct; 32 bytes, 16-byte aligned.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FieldUniforms {
    pub time: f32,
    pub side: u32,
    pub pull: f32,
    pub damping: f32,
    pub swirl: f32,
    pub max_speed: f32,
    pub _pad: [f32; 2],
}

impl FieldUniforms {
    /// Uniforms at `time` for a field of `side` using `params`.
    pub fn new(time: f32, side: u32, params: &FieldParams) -> Self {
        Self {
            time,
            side,
            pull: params.pull,
            damping: params.damping,
            swirl: params.swirl,
            max_speed: params.max_speed,
            _pad: [0.0; 2],
        }
    }

    /// All-zero uniforms for a field of `side`.
    pub fn empty(side: u32) -> Self {
        Self {
            side,
            ..Zeroable::zeroed()
        }
    }
}

/// The capabilities the simulation needs from a compute backend.
pub trait ComputeBackend {
    /// Update program representation this backend runs.
    type Program;

    /// Side length of every texture handled by this backend.
    fn side(&self) -> u32;

    /// Register a variable with its update program and initial content.
    ///
    /// The initial texture must have side [`ComputeBackend::side`]; a
    /// mismatch is reported by [`ComputeBackend::init`].
    fn add_variable(&mut self, name: &str, program: Self::Program, initial: FieldTexture) -> VariableId;

    /// Declare the variables `variable`'s program reads, in binding order.
    fn set_dependencies(&mut self, variable: VariableId, dependencies: &[VariableId]) -> Result<(), ComputeError>;

    /// Register an immutable target texture.
    fn add_target(&mut self, texture: &FieldTexture) -> TargetId;

    /// Point `variable`'s target slot at `target`. Takes effect on the next tick.
    fn bind_target(&mut self, variable: VariableId, target: TargetId) -> Result<(), ComputeError>;

    /// Replace the uniform block read by every program.
    fn set_uniforms(&mut self, uniforms: &FieldUniforms);

    /// Validate the graph and build whatever the programs need.
    fn init(&mut self) -> Result<(), ComputeError>;

    /// Run one tick: every variable is updated from the previous buffers,
    /// then all buffers swap together.
    fn compute(&mut self);
}

/// Check a variable's dependency list against the registered count.
pub(crate) fn check_dependencies(dependencies: &[VariableId], count: usize) -> Result<(), ComputeError> {
    match dependencies.iter().find(|d| d.0 >= count) {
        Some(bad) => Err(ComputeError::UnknownVariable(bad.0)),
        None => Ok(()),
    }
}
