//! Translucent overlay showing the trigger zones.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::DEPTH_FORMAT;
use crate::selector::TriggerZones;

const IDLE: [f32; 4] = [0.0, 0.0, 0.0, 0.05];
const HOVERED: [f32; 4] = [0.0, 0.0, 0.0, 0.12];
const ACTIVE: [f32; 4] = [0.08, 0.09, 0.16, 0.3];

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

pub const OVERLAY_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
}

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) color: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(position, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return input.color;
}
"#;

/// Two triangles per zone in clip space. `active` is the selected target.
pub fn overlay_vertices(zones: &TriggerZones, active: usize) -> Vec<OverlayVertex> {
    let mut vertices = Vec::with_capacity(zones.len() * 6);
    for (i, zone) in zones.zones().iter().enumerate() {
        let color = if zone.target == active {
            ACTIVE
        } else if zones.hovered() == Some(i) {
            HOVERED
        } else {
            IDLE
        };
        // Normalized window coordinates (y down) to clip space (y up).
        let x0 = zone.rect.x * 2.0 - 1.0;
        let x1 = (zone.rect.x + zone.rect.width) * 2.0 - 1.0;
        let y0 = 1.0 - zone.rect.y * 2.0;
        let y1 = 1.0 - (zone.rect.y + zone.rect.height) * 2.0;
        for position in [[x0, y0], [x0, y1], [x1, y1], [x0, y0], [x1, y1], [x1, y0]] {
            vertices.push(OverlayVertex { position, color });
        }
    }
    vertices
}

pub struct TriggerOverlay {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
}

impl TriggerOverlay {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Trigger Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(OVERLAY_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Trigger Overlay Pipeline Layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Trigger Overlay Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<OverlayVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4],
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
            primitive: wgpu::PrimitiveState::default(),
            // Drawn last, over the particles.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            vertex_buffer: None,
            vertex_count: 0,
        }
    }

    /// Rebuild the quads for the current zones and selection.
    pub fn update(&mut self, device: &wgpu::Device, zones: &TriggerZones, active: usize) {
        let vertices = overlay_vertices(zones, active);
        self.vertex_count = vertices.len() as u32;
        self.vertex_buffer = (!vertices.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Trigger Overlay Vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if let Some(buffer) = &self.vertex_buffer {
            pass.set_pipeline(&self.pipeline);
            pass.set_vertex_buffer(0, buffer.slice(..));
            pass.draw(0..self.vertex_count, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::ZoneRect;
    use crate::shader_validate::validate_render_shader;
    use glam::Vec2;

    #[test]
    fn test_overlay_shader_validates() {
        validate_render_shader(OVERLAY_SHADER).unwrap();
    }

    #[test]
    fn test_vertices_cover_zone() {
        let mut zones = TriggerZones::new();
        zones.register(ZoneRect::new(0.0, 0.0, 0.5, 0.5), 1);
        let vertices = overlay_vertices(&zones, 0);
        assert_eq!(vertices.len(), 6);

        let xs: Vec<f32> = vertices.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = vertices.iter().map(|v| v.position[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 0.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 1.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), 0.0);
    }

    #[test]
    fn test_colors_follow_state() {
        let mut zones = TriggerZones::row(3);
        zones.pointer_moved(Vec2::new(0.5, 0.95));
        let hovered = zones.hovered().unwrap();
        assert_eq!(hovered, 1);

        let vertices = overlay_vertices(&zones, 2);
        assert_eq!(vertices[0].color, IDLE);
        assert_eq!(vertices[6].color, HOVERED);
        assert_eq!(vertices[12].color, ACTIVE);
    }
}
