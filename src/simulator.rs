//! Position/velocity field simulation.
//!
//! [`FieldSimulator`] seeds the two field variables, wires their
//! dependencies and the base target, and advances them one fixed step per
//! call to [`FieldSimulator::step`].
//!
//! If the backend fails to initialise, the error is logged and kept; the
//! simulator keeps counting time but skips the compute pass, so the swarm
//! stays frozen instead of taking the application down.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::compute::{ComputeBackend, CpuCompute, FieldUniforms, TargetId, VariableId};
use crate::config::{FieldParams, SwarmConfig};
use crate::error::ComputeError;
use crate::field::{seed_positions, seed_velocities, FieldTexture};
use crate::gpu::GpuCompute;
use crate::programs::{SwarmPrograms, POSITION, VELOCITY};
use crate::time::SimClock;

/// Random generator for a run: seeded when `seed` is set, from entropy
/// otherwise.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Drives the position and velocity fields on a compute backend.
pub struct FieldSimulator<B: SwarmPrograms> {
    backend: B,
    position: VariableId,
    velocity: VariableId,
    base_target: TargetId,
    base_snapshot: FieldTexture,
    clock: SimClock,
    params: FieldParams,
    init_error: Option<ComputeError>,
}

impl<B: SwarmPrograms> FieldSimulator<B> {
    /// Seed both fields from `rng`, register them with `backend` and
    /// initialise it. The base snapshot (initial positions) is bound as the
    /// velocity target.
    pub fn new<R: Rng + ?Sized>(mut backend: B, config: &SwarmConfig, rng: &mut R) -> Self {
        let side = backend.side();
        let positions = seed_positions(side, config.position_spread, rng);
        let velocities = seed_velocities(side, config.velocity_jitter, rng);

        let velocity = backend.add_variable(VELOCITY, B::velocity_program(), velocities);
        let position = backend.add_variable(POSITION, B::position_program(), positions.clone());
        let base_target = backend.add_target(&positions);
        backend.set_uniforms(&FieldUniforms::new(0.0, side, &config.params));

        let init_error = Self::wire(&mut backend, position, velocity, base_target)
            .and_then(|_| backend.init())
            .err();
        match &init_error {
            Some(err) => log::error!("Field compute init failed, simulation frozen: {}", err),
            None => log::info!("Field simulator ready: {} particles", side as u64 * side as u64),
        }

        Self {
            backend,
            position,
            velocity,
            base_target,
            base_snapshot: positions,
            clock: SimClock::new(config.time_step),
            params: config.params,
            init_error,
        }
    }

    fn wire(backend: &mut B, position: VariableId, velocity: VariableId, base: TargetId) -> Result<(), ComputeError> {
        backend.set_dependencies(velocity, &[position, velocity])?;
        backend.set_dependencies(position, &[position, velocity])?;
        backend.bind_target(velocity, base)
    }

    /// Advance one tick: bump time, push uniforms, run the compute pass.
    pub fn step(&mut self) {
        let time = self.clock.tick();
        let uniforms = FieldUniforms::new(time, self.backend.side(), &self.params);
        self.backend.set_uniforms(&uniforms);
        if self.init_error.is_none() {
            self.backend.compute();
        }
    }

    /// Simulation time in seconds of fixed steps.
    pub fn time(&self) -> f32 {
        self.clock.time()
    }

    /// Completed ticks.
    pub fn ticks(&self) -> u64 {
        self.clock.ticks()
    }

    pub fn params(&self) -> &FieldParams {
        &self.params
    }

    /// Replace the program parameters from the next tick on.
    pub fn set_params(&mut self, params: FieldParams) {
        self.params = params;
    }

    /// Simulated seconds per tick.
    pub fn time_step(&self) -> f32 {
        self.clock.step()
    }

    pub fn set_time_step(&mut self, step: f32) {
        self.clock.set_step(step);
    }

    pub fn position(&self) -> VariableId {
        self.position
    }

    pub fn velocity(&self) -> VariableId {
        self.velocity
    }

    /// Target holding the initial positions.
    pub fn base_target(&self) -> TargetId {
        self.base_target
    }

    /// Initial position field.
    pub fn base_snapshot(&self) -> &FieldTexture {
        &self.base_snapshot
    }

    /// Why the backend failed to initialise, if it did.
    pub fn init_error(&self) -> Option<&ComputeError> {
        self.init_error.as_ref()
    }

    /// True when ticks advance time without computing.
    pub fn is_degraded(&self) -> bool {
        self.init_error.is_some()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl FieldSimulator<CpuCompute> {
    /// Simulator on the CPU reference backend.
    pub fn cpu<R: Rng + ?Sized>(config: &SwarmConfig, rng: &mut R) -> Self {
        Self::new(CpuCompute::new(config.side), config, rng)
    }

    /// Latest position field.
    pub fn positions(&self) -> Option<&FieldTexture> {
        self.backend.current(self.position)
    }

    /// Latest velocity field.
    pub fn velocities(&self) -> Option<&FieldTexture> {
        self.backend.current(self.velocity)
    }
}

impl FieldSimulator<GpuCompute> {
    /// Simulator on the WGSL backend.
    pub fn gpu<R: Rng + ?Sized>(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        config: &SwarmConfig,
        rng: &mut R,
    ) -> Self {
        Self::new(GpuCompute::new(device, queue, config.side), config, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SwarmConfig {
        SwarmConfig::default().with_side(4).with_seed(1)
    }

    #[test]
    fn test_initial_fields() {
        let mut rng = seeded_rng(Some(1));
        let sim = FieldSimulator::cpu(&config(), &mut rng);
        assert!(sim.init_error().is_none());

        let pos = sim.positions().unwrap();
        let vel = sim.velocities().unwrap();
        assert_eq!(pos.len(), 16);
        assert!(pos.max_abs_xyz() <= 2.5);
        assert!(vel.max_abs_xyz() <= 0.005);
        assert!(pos.texels().iter().all(|t| t[3] == 1.0));
        assert!(vel.texels().iter().all(|t| t[3] == 0.0));
        assert_eq!(pos, sim.base_snapshot());
    }

    #[test]
    fn test_step_advances_time() {
        let mut rng = seeded_rng(Some(2));
        let mut sim = FieldSimulator::cpu(&config(), &mut rng);
        sim.step();
        assert!((sim.time() - 0.005).abs() < 1e-7);
        assert_eq!(sim.ticks(), 1);
        assert_eq!(sim.backend().ticks(), 1);
        assert_eq!(sim.backend().uniforms().time, sim.time());
    }

    #[test]
    fn test_base_target_is_bound() {
        let mut rng = seeded_rng(Some(3));
        let sim = FieldSimulator::cpu(&config(), &mut rng);
        assert_eq!(sim.backend().bound_target(sim.velocity()), Some(sim.base_target()));
        assert_eq!(sim.backend().target(sim.base_target()), Some(sim.base_snapshot()));
    }

    #[test]
    fn test_degraded_mode_freezes_fields() {
        let mut rng = seeded_rng(Some(4));
        let mut sim = FieldSimulator::cpu(&config().with_side(0), &mut rng);
        assert!(matches!(sim.init_error(), Some(ComputeError::InvalidSide { .. })));
        assert!(sim.is_degraded());

        sim.step();
        sim.step();
        assert!((sim.time() - 0.01).abs() < 1e-7);
        assert_eq!(sim.backend().ticks(), 0);
    }

    #[test]
    fn test_set_params_reaches_uniforms() {
        let mut rng = seeded_rng(Some(5));
        let mut sim = FieldSimulator::cpu(&config(), &mut rng);
        let params = FieldParams {
            pull: 0.5,
            ..FieldParams::default()
        };
        sim.set_params(params);
        sim.step();
        assert_eq!(sim.backend().uniforms().pull, 0.5);
    }

    #[test]
    fn test_seeded_runs_match() {
        let a = FieldSimulator::cpu(&config(), &mut seeded_rng(Some(9)));
        let b = FieldSimulator::cpu(&config(), &mut seeded_rng(Some(9)));
        assert_eq!(a.positions(), b.positions());
        assert_eq!(a.velocities(), b.velocities());
    }
}
