//! Point-sprite renderer for the position field.
//!
//! One camera-facing quad per texel. The per-instance vertex attribute is
//! the texel's reference coordinate; the vertex stage fetches the particle
//! centre from the current position texture, so nothing per-particle is
//! uploaded after startup.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use super::{GpuCompute, DEPTH_FORMAT};
use crate::compute::{ComputeBackend, VariableId};
use crate::config::SwarmConfig;
use crate::error::ComputeError;
use crate::field::reference_coords;

/// Render uniform block. Mirrors `RenderUniforms` in [`PARTICLE_SHADER`].
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct RenderUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub resolution: [f32; 2],
    pub time: f32,
    pub point_size: f32,
    pub side: u32,
    pub _pad: [u32; 3],
}

impl RenderUniforms {
    /// Uniforms for a `side × side` position field.
    pub fn new(view_proj: Mat4, time: f32, resolution: [f32; 2], side: u32, config: &SwarmConfig) -> Self {
        let [r, g, b] = config.particle_color;
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            color: [r, g, b, 0.9],
            resolution,
            time,
            point_size: config.point_size,
            side,
            _pad: [0; 3],
        }
    }
}

pub const PARTICLE_SHADER: &str = r#"
struct RenderUniforms {
    view_proj: mat4x4<f32>,
    color: vec4<f32>,
    resolution: vec2<f32>,
    time: f32,
    point_size: f32,
    side: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) local: vec2<f32>,
}

@group(0) @binding(0) var<uniform> render: RenderUniforms;
@group(0) @binding(1) var position_field: texture_2d<f32>;

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) reference: vec2<f32>,
) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0)
    );
    let corner = corners[vertex_index];

    let texel = vec2<i32>(reference * f32(render.side) + vec2<f32>(0.5, 0.5));
    let pos = textureLoad(position_field, texel, 0).xyz;
    let clip = render.view_proj * vec4<f32>(pos, 1.0);

    let aspect = render.resolution.x / max(render.resolution.y, 1.0);
    let offset = corner * render.point_size * vec2<f32>(1.0 / aspect, 1.0);

    var out: VertexOutput;
    out.clip_position = clip + vec4<f32>(offset * clip.w, 0.0, 0.0);
    out.local = corner;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let d = length(input.local);
    if (d > 1.0) {
        discard;
    }
    let alpha = 1.0 - smoothstep(0.6, 1.0, d);
    return vec4<f32>(render.color.rgb, render.color.a * alpha);
}
"#;

/// Draws `side²` particles from the position variable of a [`GpuCompute`].
pub struct ParticleRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    reference_buffer: wgpu::Buffer,
    /// One bind group per compute parity.
    bind_groups: [wgpu::BindGroup; 2],
    instances: u32,
}

impl ParticleRenderer {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        compute: &GpuCompute,
        position: VariableId,
    ) -> Result<Self, ComputeError> {
        let side = compute.side();
        let views = [
            compute
                .texture_view(position, 0)
                .ok_or(ComputeError::UnknownVariable(position.index()))?,
            compute
                .texture_view(position, 1)
                .ok_or(ComputeError::UnknownVariable(position.index()))?,
        ];

        let references = reference_coords(side);
        let reference_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Reference Buffer"),
            contents: bytemuck::cast_slice(&references),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Render Uniform Buffer"),
            size: std::mem::size_of::<RenderUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let bind_groups = views.map(|view| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Particle Bind Group"),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                ],
            })
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(PARTICLE_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &[wgpu::VertexAttribute {
                        offset: 0,
                        shader_location: 0,
                        format: wgpu::VertexFormat::Float32x2,
                    }],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            pipeline,
            uniform_buffer,
            reference_buffer,
            bind_groups,
            instances: side * side,
        })
    }

    /// Write this frame's uniform block.
    pub fn update(&self, queue: &wgpu::Queue, uniforms: &RenderUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Draw every particle from the position buffer of `parity`.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, parity: usize) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_groups[parity & 1], &[]);
        pass.set_vertex_buffer(0, self.reference_buffer.slice(..));
        pass.draw(0..6, 0..self.instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader_validate::validate_render_shader;

    #[test]
    fn test_particle_shader_validates() {
        validate_render_shader(PARTICLE_SHADER).unwrap();
    }

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<RenderUniforms>(), 112);
        assert_eq!(std::mem::size_of::<RenderUniforms>() % 16, 0);
    }

    #[test]
    fn test_uniforms_from_config() {
        let config = SwarmConfig::default().with_side(8);
        let u = RenderUniforms::new(Mat4::IDENTITY, 1.5, [800.0, 600.0], 8, &config);
        assert_eq!(u.side, 8);
        assert_eq!(u.time, 1.5);
        assert_eq!(u.color[..3], config.particle_color);
    }
}
