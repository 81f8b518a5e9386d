//! Integration tests for the WGSL backend.
//!
//! Each test asks for any adapter, software ones included, and returns
//! early when the machine has none.

use std::sync::Arc;

use shapeswarm::compute::ComputeBackend;
use shapeswarm::error::ComputeError;
use shapeswarm::selector::ShapeSelector;
use shapeswarm::simulator::{seeded_rng, FieldSimulator};
use shapeswarm::SwarmConfig;

fn device() -> Option<(Arc<wgpu::Device>, Arc<wgpu::Queue>)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok()?;
    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("Test Device"),
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
        memory_hints: Default::default(),
        trace: Default::default(),
        experimental_features: Default::default(),
    }))
    .ok()?;
    Some((Arc::new(device), Arc::new(queue)))
}

#[test]
fn test_gpu_fields_match_cpu_fields() {
    let Some((device, queue)) = device() else {
        eprintln!("no GPU adapter, skipping");
        return;
    };
    let config = SwarmConfig::default().with_side(16).with_seed(21);

    let mut rng = seeded_rng(config.seed);
    let mut cpu = FieldSimulator::cpu(&config, &mut rng);
    let mut cpu_selector = ShapeSelector::build(&mut cpu, &config, &mut rng);

    let mut rng = seeded_rng(config.seed);
    let mut gpu = FieldSimulator::gpu(device, queue, &config, &mut rng);
    let mut gpu_selector = ShapeSelector::build(&mut gpu, &config, &mut rng);
    assert!(!gpu.is_degraded(), "{:?}", gpu.init_error());

    let seeded = gpu.backend().read_current(gpu.position()).unwrap();
    assert_eq!(&seeded, gpu.base_snapshot());

    for tick in 0..40 {
        if tick == 20 {
            cpu_selector.advance(cpu.backend_mut()).unwrap();
            gpu_selector.advance(gpu.backend_mut()).unwrap();
        }
        cpu.step();
        gpu.step();
    }

    let expected = cpu.positions().unwrap();
    let actual = gpu.backend().read_current(gpu.position()).unwrap();
    assert_eq!(actual.side(), expected.side());
    let max_diff = expected
        .texels()
        .iter()
        .zip(actual.texels())
        .flat_map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()))
        .fold(0.0f32, f32::max);
    assert!(max_diff < 1e-5, "max difference {}", max_diff);
}

#[test]
fn test_oversized_side_degrades() {
    let Some((device, queue)) = device() else {
        eprintln!("no GPU adapter, skipping");
        return;
    };
    let max = device.limits().max_texture_dimension_2d;
    let config = SwarmConfig::default().with_side(max + 8).with_seed(22);

    let mut rng = seeded_rng(config.seed);
    let mut sim = FieldSimulator::gpu(device, queue, &config, &mut rng);
    let selector = ShapeSelector::build(&mut sim, &config, &mut rng);

    assert!(sim.is_degraded());
    assert_eq!(
        sim.init_error(),
        Some(&ComputeError::InvalidSide { side: max + 8, max })
    );
    assert_eq!(sim.backend().side(), 1);
    assert_eq!(selector.len(), config.target_count());

    sim.step();
    sim.step();
    assert_eq!(sim.ticks(), 2);
    let field = sim.backend().read_current(sim.position()).unwrap();
    assert_eq!(field.len(), 1);
}
