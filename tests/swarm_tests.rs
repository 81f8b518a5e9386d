//! Integration tests for the headless swarm.
//!
//! Everything here runs on the CPU backend, which executes the same update
//! math as the WGSL programs.

use glam::Vec4;
use proptest::prelude::*;
use shapeswarm::compute::{ComputeBackend, CpuCompute, CpuProgram, TexelInput};
use shapeswarm::field::FieldTexture;
use shapeswarm::sampler::sample_shape;
use shapeswarm::selector::ShapeSelector;
use shapeswarm::shapes::{Shape, BOUNDING_RADIUS};
use shapeswarm::simulator::{seeded_rng, FieldSimulator};
use shapeswarm::{FieldParams, SwarmConfig};

fn small_config(seed: u64) -> SwarmConfig {
    SwarmConfig::default().with_side(4).with_seed(seed)
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_small_field_first_tick() {
    let config = small_config(11);
    let mut rng = seeded_rng(config.seed);
    let mut sim = FieldSimulator::cpu(&config, &mut rng);
    let selector = ShapeSelector::build(&mut sim, &config, &mut rng);

    let positions = sim.positions().unwrap().clone();
    let velocities = sim.velocities().unwrap().clone();
    assert_eq!(positions.side(), 4);
    assert_eq!(velocities.side(), 4);
    assert!(positions.max_abs_xyz() <= 2.5);
    assert!(velocities.max_abs_xyz() <= 0.005);

    let shapes_before: Vec<FieldTexture> = (0..selector.len())
        .map(|i| sim.backend().target(selector.target(i).unwrap()).unwrap().clone())
        .collect();

    sim.step();

    assert!((sim.time() - 0.005).abs() < 1e-7);
    for field in [sim.positions().unwrap(), sim.velocities().unwrap()] {
        assert_eq!(field.side(), 4);
        assert_eq!(field.len(), 16);
        // Four f32 channels per texel.
        assert_eq!(field.as_bytes().len(), 16 * 4 * 4);
    }
    assert_ne!(sim.positions().unwrap(), &positions);
    for (i, before) in shapes_before.iter().enumerate() {
        let after = sim.backend().target(selector.target(i).unwrap()).unwrap();
        assert_eq!(after, before, "target {} changed", i);
    }
}

#[test]
fn test_four_advances_return_to_base() {
    let config = small_config(12);
    assert_eq!(config.target_count(), 4);

    let mut rng = seeded_rng(config.seed);
    let mut sim = FieldSimulator::cpu(&config, &mut rng);
    let mut selector = ShapeSelector::build(&mut sim, &config, &mut rng);
    assert_eq!(selector.len(), 4);

    let velocity = sim.velocity();
    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(selector.advance(sim.backend_mut()).unwrap());
    }
    assert_eq!(seen, [1, 2, 3, 0]);
    assert_eq!(sim.backend().bound_target(velocity), Some(sim.base_target()));
}

#[test]
fn test_swarm_settles_on_selected_shape() {
    let params = FieldParams {
        swirl: 0.0,
        ..FieldParams::default()
    };
    let config = small_config(13).with_params(params);
    let mut rng = seeded_rng(config.seed);
    let mut sim = FieldSimulator::cpu(&config, &mut rng);
    let mut selector = ShapeSelector::build(&mut sim, &config, &mut rng);

    let index = selector.select(1, sim.backend_mut()).unwrap();
    assert_eq!(selector.label(index), Some("sphere"));
    let goal = sim
        .backend()
        .target(selector.target(index).unwrap())
        .unwrap()
        .clone();

    for _ in 0..2000 {
        sim.step();
    }

    let positions = sim.positions().unwrap();
    for i in 0..positions.len() {
        let distance = (positions.vec4(i) - goal.vec4(i)).truncate().length();
        assert!(distance < 0.01, "texel {} is {} from its goal", i, distance);
    }
}

#[test]
fn test_seeded_swarms_evolve_identically() {
    let config = small_config(14);
    let run = || {
        let mut rng = seeded_rng(config.seed);
        let mut sim = FieldSimulator::cpu(&config, &mut rng);
        let mut selector = ShapeSelector::build(&mut sim, &config, &mut rng);
        for tick in 0..50 {
            if tick == 20 {
                selector.advance(sim.backend_mut()).unwrap();
            }
            sim.step();
        }
        (sim.positions().unwrap().clone(), sim.velocities().unwrap().clone())
    };
    assert_eq!(run(), run());
}

// ============================================================================
// Ping-pong ordering
// ============================================================================

fn counter_program() -> CpuProgram {
    // Each variable becomes the other's previous value plus one.
    Box::new(|input: &TexelInput<'_>| input.dependency(0) + Vec4::ONE)
}

#[test]
fn test_programs_only_see_previous_tick() {
    let mut backend = CpuCompute::new(3);
    let a = backend.add_variable("a", counter_program(), FieldTexture::new(3));
    let b = backend.add_variable("b", counter_program(), FieldTexture::new(3));
    backend.set_dependencies(a, &[b]).unwrap();
    backend.set_dependencies(b, &[a]).unwrap();
    backend.init().unwrap();

    // If either program saw the other's fresh output, the two would drift apart.
    for tick in 1..=100 {
        backend.compute();
        let expected = [tick as f32; 4];
        assert!(backend.current(a).unwrap().texels().iter().all(|t| *t == expected));
        assert!(backend.current(b).unwrap().texels().iter().all(|t| *t == expected));
    }
}

// ============================================================================
// Sampling
// ============================================================================

#[test]
fn test_sphere_octants_are_balanced() {
    let mut rng = seeded_rng(Some(15));
    let side = 64;
    let texture = sample_shape(Shape::Sphere, side, 1.0, &mut rng);

    let mut octants = [0usize; 8];
    for texel in texture.texels() {
        let index = (texel[0] >= 0.0) as usize
            | ((texel[1] >= 0.0) as usize) << 1
            | ((texel[2] >= 0.0) as usize) << 2;
        octants[index] += 1;
    }

    let expected = (side * side) as f32 / 8.0;
    for (i, count) in octants.iter().enumerate() {
        assert!(*count > 0, "octant {} is empty", i);
        let ratio = *count as f32 / expected;
        assert!((0.75..1.25).contains(&ratio), "octant {} has {} samples", i, count);
    }
}

#[test]
fn test_targets_stay_inside_scaled_bound() {
    let mut rng = seeded_rng(Some(16));
    for shape in Shape::ALL {
        let texture = sample_shape(shape, 8, 1.5, &mut rng);
        assert!(texture.max_abs_xyz() <= BOUNDING_RADIUS * 1.5 + 1e-5, "{}", shape.name());
    }
}

// ============================================================================
// Selector properties
// ============================================================================

fn selector_with(k: usize) -> (CpuCompute, ShapeSelector) {
    let mut backend = CpuCompute::new(2);
    let noop: CpuProgram = Box::new(|input: &TexelInput<'_>| input.dependency(0));
    let variable = backend.add_variable("velocity", noop, FieldTexture::new(2));
    let targets = (0..k).map(|_| backend.add_target(&FieldTexture::new(2))).collect();
    (backend, ShapeSelector::new(variable, targets))
}

proptest! {
    #[test]
    fn prop_advance_is_modular(k in 1usize..8, start in 0usize..32, steps in 0usize..40) {
        let (mut backend, mut selector) = selector_with(k);
        let from = selector.select(start, &mut backend).unwrap();
        prop_assert_eq!(from, start % k);

        for _ in 0..steps {
            selector.advance(&mut backend).unwrap();
        }
        let expected = (from + steps) % k;
        prop_assert_eq!(selector.current(), expected);
        prop_assert_eq!(
            backend.bound_target(selector.variable()),
            selector.target(expected)
        );
    }

    #[test]
    fn prop_k_advances_restore_binding(k in 1usize..8, start in 0usize..8) {
        let (mut backend, mut selector) = selector_with(k);
        selector.select(start, &mut backend).unwrap();
        let before = backend.bound_target(selector.variable());
        for _ in 0..k {
            selector.advance(&mut backend).unwrap();
        }
        prop_assert_eq!(backend.bound_target(selector.variable()), before);
    }
}
