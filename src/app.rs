//! Windowed application.
//!
//! Owns the `winit` event loop handler. When the window appears it builds
//! the GPU scene (simulator, targets, renderer, overlay) synchronously, then
//! hands every redraw to the [`FrameDriver`].

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::config::{Nudge, SwarmConfig};
use crate::compute::ComputeBackend;
use crate::driver::{FrameDriver, FrameStages, TickOutcome};
use crate::error::AppError;
use crate::gpu::{Camera, GpuCompute, GpuContext, ParticleRenderer, RenderUniforms, TriggerOverlay};
use crate::input::{Command, Input, InputEvent};
use crate::selector::{ShapeSelector, TriggerZones};
use crate::simulator::{seeded_rng, FieldSimulator};
use crate::time::FrameStats;

/// Open a window and run the swarm until it is closed.
pub fn run(config: SwarmConfig) -> Result<(), AppError> {
    config.validate()?;
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Height change of the orbit point per lift key press.
const LIFT_STEP: f32 = 0.1;

/// Everything that exists once the window and device do.
struct Scene {
    gpu: GpuContext,
    sim: FieldSimulator<GpuCompute>,
    selector: ShapeSelector,
    renderer: ParticleRenderer,
    overlay: TriggerOverlay,
    zones: TriggerZones,
    camera: Camera,
    overlay_dirty: bool,
}

impl Scene {
    fn new(window: Arc<Window>, config: &SwarmConfig) -> Result<Self, AppError> {
        let gpu = pollster::block_on(GpuContext::new(window))?;
        let mut rng = seeded_rng(config.seed);

        let mut sim = FieldSimulator::gpu(gpu.device.clone(), gpu.queue.clone(), config, &mut rng);
        let selector = ShapeSelector::build(&mut sim, config, &mut rng);
        let renderer = ParticleRenderer::new(&gpu.device, gpu.format(), sim.backend(), sim.position())?;

        let zones = if config.show_triggers {
            TriggerZones::row(selector.len())
        } else {
            TriggerZones::new()
        };
        let mut overlay = TriggerOverlay::new(&gpu.device, gpu.format());
        overlay.update(&gpu.device, &zones, selector.current());

        log::info!(
            "Scene ready: {} particles, {} targets ({})",
            config.particle_count(),
            selector.len(),
            (0..selector.len())
                .filter_map(|i| selector.label(i))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            gpu,
            sim,
            selector,
            renderer,
            overlay,
            zones,
            camera: Camera::new(),
            overlay_dirty: false,
        })
    }

    fn apply(&mut self, command: Command) {
        let result = match command {
            Command::Advance => self.selector.advance(self.sim.backend_mut()),
            Command::Select(index) => self.selector.select(index, self.sim.backend_mut()),
            Command::Adjust(tunable, nudge) => {
                let params = self.sim.params().nudged(tunable, nudge);
                log::info!(
                    "Params: pull {:.5}, swirl {:.5}, damping {:.3}",
                    params.pull,
                    params.swirl,
                    params.damping
                );
                self.sim.set_params(params);
                return;
            }
            Command::TimeStep(nudge) => {
                let step = self.sim.time_step() * nudge.factor();
                log::info!("Time step: {:.5}", step);
                self.sim.set_time_step(step);
                return;
            }
            Command::Spin => {
                self.camera.start_spin();
                return;
            }
            Command::Lift(nudge) => {
                let dy = match nudge {
                    Nudge::Up => LIFT_STEP,
                    Nudge::Down => -LIFT_STEP,
                };
                self.camera.lift(dy);
                return;
            }
            Command::Quit => return,
        };
        match result {
            Ok(index) => {
                log::info!(
                    "Target {}: {}",
                    index,
                    self.selector.label(index).unwrap_or("unknown")
                );
                self.overlay_dirty = true;
            }
            Err(e) => log::warn!("Shape switch failed: {}", e),
        }
    }
}

/// One frame's view of the application, driven by [`FrameDriver::tick`].
struct Frame<'a> {
    scene: &'a mut Scene,
    input: &'a mut Input,
    window: &'a Window,
    config: &'a SwarmConfig,
}

impl FrameStages for Frame<'_> {
    type Error = wgpu::SurfaceError;

    fn advance_simulation(&mut self) {
        self.scene.sim.step();
    }

    fn update_uniforms(&mut self) {
        let scene = &mut *self.scene;
        let uniforms = RenderUniforms::new(
            scene.camera.view_proj(scene.gpu.aspect()),
            scene.sim.time(),
            scene.gpu.resolution(),
            scene.sim.backend().side(),
            self.config,
        );
        scene.renderer.update(&scene.gpu.queue, &uniforms);
        if scene.overlay_dirty {
            scene.overlay.update(&scene.gpu.device, &scene.zones, scene.selector.current());
            scene.overlay_dirty = false;
        }
    }

    fn update_camera(&mut self) {
        self.scene.camera.advance_spin();
        let orbit = self.input.take_orbit();
        self.scene.camera.orbit(orbit.x, orbit.y);
        let scroll = self.input.take_scroll();
        if scroll != 0.0 {
            self.scene.camera.zoom(scroll);
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let scene = &*self.scene;
        let output = scene.gpu.surface().get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = scene
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let [r, g, b] = self.config.background;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: scene.gpu.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            scene
                .renderer
                .draw(&mut render_pass, scene.sim.backend().current_index());
            scene.overlay.draw(&mut render_pass);
        }

        scene.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn request_next_frame(&mut self) {
        self.window.request_redraw();
    }
}

pub struct App {
    config: SwarmConfig,
    window: Option<Arc<Window>>,
    scene: Option<Scene>,
    driver: FrameDriver,
    input: Input,
    stats: FrameStats,
    error: Option<AppError>,
}

impl App {
    pub fn new(config: SwarmConfig) -> Self {
        let [width, height] = config.window_size;
        Self {
            config,
            window: None,
            scene: None,
            driver: FrameDriver::new(),
            input: Input::new(width, height),
            stats: FrameStats::new(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        log::error!("{}", err);
        self.error = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(scene)) = (&self.window, &mut self.scene) else {
            return;
        };
        let mut frame = Frame {
            scene: &mut *scene,
            input: &mut self.input,
            window,
            config: &self.config,
        };
        match self.driver.tick(&mut frame) {
            Ok(TickOutcome::Rendered) => {
                if let Some(fps) = self.stats.frame() {
                    window.set_title(&format!("shapeswarm - {:.0} fps", fps));
                }
            }
            Ok(TickOutcome::Skipped) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => scene.gpu.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory, exiting");
                event_loop.exit();
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.driver.begin_init() {
            return;
        }

        let [width, height] = self.config.window_size;
        let window_attrs = Window::default_attributes()
            .with_title("shapeswarm")
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.driver.abort_init();
                return self.fail(event_loop, e.into());
            }
        };
        let size = window.inner_size();
        self.input.set_window_size(size.width, size.height);

        match Scene::new(window.clone(), &self.config) {
            Ok(scene) => {
                if let Some(err) = scene.sim.init_error() {
                    log::warn!("Running without simulation: {}", err);
                }
                self.scene = Some(scene);
                self.driver.finish_init();
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                self.driver.abort_init();
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match &event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                return;
            }
            WindowEvent::Resized(physical_size) => {
                self.input.set_window_size(physical_size.width, physical_size.height);
                if let Some(scene) = &mut self.scene {
                    scene.gpu.resize(*physical_size);
                }
                return;
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                return;
            }
            _ => {}
        }

        let Some(input_event) = self.input.handle_event(&event) else {
            return;
        };
        let Some(scene) = &mut self.scene else {
            return;
        };
        match input_event {
            InputEvent::Command(Command::Quit) => event_loop.exit(),
            InputEvent::Command(command) => scene.apply(command),
            InputEvent::Cursor(point) => {
                let hovered = scene.zones.hovered();
                if let Some(target) = scene.zones.pointer_moved(point) {
                    scene.apply(Command::Select(target));
                }
                scene.overlay_dirty |= scene.zones.hovered() != hovered;
            }
            InputEvent::CursorLeft => {
                scene.overlay_dirty |= scene.zones.hovered().is_some();
                scene.zones.pointer_left();
            }
        }
    }
}
