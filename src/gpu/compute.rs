//! WGSL compute backend.
//!
//! Every variable owns two `Rgba32Float` textures. `parity` names the slot
//! holding the latest completed tick; a tick reads every dependency from
//! that slot, writes each variable's other slot, then flips `parity` once
//! for all variables. Bind groups for both parities are built at `init`, so
//! a tick only records dispatches.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::FIELD_FORMAT;
use crate::compute::{ComputeBackend, FieldUniforms, TargetId, VariableId};
use crate::error::ComputeError;
use crate::field::{FieldTexture, BYTES_PER_TEXEL};
use crate::programs::{self, SwarmPrograms, WgslProgram, WORKGROUP_SIZE};
use crate::shader_validate::validate_compute_shader;

struct GpuVariable {
    name: String,
    program: WgslProgram,
    dependencies: Vec<VariableId>,
    target: Option<TargetId>,
    textures: [wgpu::Texture; 2],
    views: [wgpu::TextureView; 2],
}

struct GpuTarget {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Pipeline plus one bind group per parity.
struct VariablePass {
    pipeline: wgpu::ComputePipeline,
    bind_groups: [wgpu::BindGroup; 2],
}

/// Runs update programs as WGSL compute shaders.
pub struct GpuCompute {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    side: u32,
    variables: Vec<GpuVariable>,
    targets: Vec<GpuTarget>,
    target_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    passes: Vec<VariablePass>,
    parity: usize,
    setup_error: Option<ComputeError>,
}

impl GpuCompute {
    /// Create an empty backend for `side × side` fields on `device`.
    ///
    /// A side of zero or above the device's texture limit is reported by
    /// `init`; until then the backend stands in with `1 × 1` textures, so
    /// [`ComputeBackend::side`] returns 1.
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, side: u32) -> Self {
        let max = device.limits().max_texture_dimension_2d;
        let (side, setup_error) = if side == 0 || side > max {
            (1, Some(ComputeError::InvalidSide { side, max }))
        } else {
            (side, None)
        };

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Field Uniform Buffer"),
            contents: bytemuck::bytes_of(&FieldUniforms::empty(side)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let target_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Field Target Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });

        Self {
            device,
            queue,
            side,
            variables: Vec::new(),
            targets: Vec::new(),
            target_layout,
            uniform_buffer,
            passes: Vec::new(),
            parity: 0,
            setup_error,
        }
    }

    /// View of the latest completed values of `variable`.
    pub fn current_view(&self, variable: VariableId) -> Option<&wgpu::TextureView> {
        self.variables.get(variable.0).map(|v| &v.views[self.parity])
    }

    /// Slot (0 or 1) holding the latest completed values.
    pub fn current_index(&self) -> usize {
        self.parity
    }

    /// View of one of `variable`'s two buffers.
    pub fn texture_view(&self, variable: VariableId, slot: usize) -> Option<&wgpu::TextureView> {
        self.variables.get(variable.0).and_then(|v| v.views.get(slot))
    }

    /// Target currently bound to `variable`.
    pub fn bound_target(&self, variable: VariableId) -> Option<TargetId> {
        self.variables.get(variable.0).and_then(|v| v.target)
    }

    /// Whether `init` built the pipelines.
    pub fn is_ready(&self) -> bool {
        !self.passes.is_empty()
    }

    /// Copy the latest completed values of `variable` back to the host.
    ///
    /// Blocks until the device has finished every submitted tick.
    pub fn read_current(&self, variable: VariableId) -> Result<FieldTexture, ComputeError> {
        let var = self
            .variables
            .get(variable.0)
            .ok_or(ComputeError::UnknownVariable(variable.0))?;

        let unpadded_bytes_per_row = self.side * BYTES_PER_TEXEL;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Field Readback Buffer"),
            size: padded_bytes_per_row as u64 * self.side as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Field Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &var.textures[self.parity],
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.side),
                },
            },
            wgpu::Extent3d {
                width: self.side,
                height: self.side,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        loop {
            self.device
                .poll(wgpu::PollType::Poll)
                .map_err(|e| ComputeError::Readback(e.to_string()))?;
            match rx.try_recv() {
                Ok(result) => {
                    result.map_err(|e| ComputeError::Readback(e.to_string()))?;
                    break;
                }
                Err(std::sync::mpsc::TryRecvError::Empty) => std::thread::yield_now(),
                Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                    return Err(ComputeError::Readback("map callback dropped".into()));
                }
            }
        }

        let mut field = FieldTexture::new(self.side);
        {
            let data = buffer_slice.get_mapped_range();
            let side = self.side as usize;
            for row in 0..side {
                let start = row * padded_bytes_per_row as usize;
                let bytes = &data[start..start + unpadded_bytes_per_row as usize];
                let texels = &mut field.texels_mut()[row * side..(row + 1) * side];
                for (texel, chunk) in texels.iter_mut().zip(bytes.chunks_exact(BYTES_PER_TEXEL as usize)) {
                    *texel = bytemuck::pod_read_unaligned(chunk);
                }
            }
        }
        staging_buffer.unmap();

        Ok(field)
    }

    fn check_side(&mut self, texture: &FieldTexture) -> bool {
        if texture.side() == self.side {
            return true;
        }
        if self.setup_error.is_none() {
            self.setup_error = Some(ComputeError::SideMismatch {
                expected: self.side,
                found: texture.side(),
            });
        }
        false
    }

    fn create_texture(&self, label: &str, storage: bool) -> wgpu::Texture {
        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        if storage {
            usage |= wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC;
        }
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: self.side,
                height: self.side,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FIELD_FORMAT,
            usage,
            view_formats: &[],
        })
    }

    fn upload(&self, texture: &wgpu::Texture, field: &FieldTexture) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            field.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(field.bytes_per_row()),
                rows_per_image: Some(field.side()),
            },
            wgpu::Extent3d {
                width: field.side(),
                height: field.side(),
                depth_or_array_layers: 1,
            },
        );
    }

    fn build_pass(&self, var: &GpuVariable) -> Result<VariablePass, ComputeError> {
        let dep_names: Vec<&str> = var
            .dependencies
            .iter()
            .map(|d| self.variables[d.0].name.as_str())
            .collect();
        let source = var.program.assemble(&dep_names);
        validate_compute_shader(&source).map_err(|e| ComputeError::Pipeline {
            variable: var.name.clone(),
            message: e.message,
        })?;

        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Update Shader", var.name)),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for i in 0..var.dependencies.len() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: i as u32 + 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        let output_binding = var.dependencies.len() as u32 + 1;
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: output_binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: FIELD_FORMAT,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
            count: None,
        });

        let layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} Bind Group Layout", var.name)),
            entries: &entries,
        });

        let mut group_layouts = vec![&layout];
        if var.program.uses_target() {
            group_layouts.push(&self.target_layout);
        }
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", var.name)),
            bind_group_layouts: &group_layouts,
            push_constant_ranges: &[],
        });

        let pipeline = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{} Update Pipeline", var.name)),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        // Parity p reads slot p of every dependency and writes slot 1 - p.
        let bind_groups = [0, 1].map(|p| {
            let mut entries = vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniform_buffer.as_entire_binding(),
            }];
            for (i, dep) in var.dependencies.iter().enumerate() {
                entries.push(wgpu::BindGroupEntry {
                    binding: i as u32 + 1,
                    resource: wgpu::BindingResource::TextureView(&self.variables[dep.0].views[p]),
                });
            }
            entries.push(wgpu::BindGroupEntry {
                binding: output_binding,
                resource: wgpu::BindingResource::TextureView(&var.views[1 - p]),
            });
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{} Bind Group {}", var.name, p)),
                layout: &layout,
                entries: &entries,
            })
        });

        Ok(VariablePass { pipeline, bind_groups })
    }
}

impl ComputeBackend for GpuCompute {
    type Program = WgslProgram;

    fn side(&self) -> u32 {
        self.side
    }

    fn add_variable(&mut self, name: &str, program: WgslProgram, initial: FieldTexture) -> VariableId {
        let id = VariableId(self.variables.len());
        let fits = self.check_side(&initial) && self.setup_error.is_none();
        let textures = [0, 1].map(|slot| self.create_texture(&format!("{} Field {}", name, slot), true));
        if fits {
            self.upload(&textures[self.parity], &initial);
        }
        let views = [
            textures[0].create_view(&wgpu::TextureViewDescriptor::default()),
            textures[1].create_view(&wgpu::TextureViewDescriptor::default()),
        ];
        self.variables.push(GpuVariable {
            name: name.to_string(),
            program,
            dependencies: Vec::new(),
            target: None,
            textures,
            views,
        });
        self.passes.clear();
        id
    }

    fn set_dependencies(&mut self, variable: VariableId, dependencies: &[VariableId]) -> Result<(), ComputeError> {
        crate::compute::check_dependencies(dependencies, self.variables.len())?;
        let var = self
            .variables
            .get_mut(variable.0)
            .ok_or(ComputeError::UnknownVariable(variable.0))?;
        var.dependencies = dependencies.to_vec();
        self.passes.clear();
        Ok(())
    }

    fn add_target(&mut self, texture: &FieldTexture) -> TargetId {
        let id = TargetId(self.targets.len());
        let gpu_texture = self.create_texture(&format!("Target {}", id.0), false);
        if self.check_side(texture) && self.setup_error.is_none() {
            self.upload(&gpu_texture, texture);
        }
        let view = gpu_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Target {} Bind Group", id.0)),
            layout: &self.target_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            }],
        });
        self.targets.push(GpuTarget {
            _texture: gpu_texture,
            bind_group,
        });
        id
    }

    fn bind_target(&mut self, variable: VariableId, target: TargetId) -> Result<(), ComputeError> {
        if target.0 >= self.targets.len() {
            return Err(ComputeError::UnknownTarget(target.0));
        }
        let var = self
            .variables
            .get_mut(variable.0)
            .ok_or(ComputeError::UnknownVariable(variable.0))?;
        var.target = Some(target);
        Ok(())
    }

    fn set_uniforms(&mut self, uniforms: &FieldUniforms) {
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    fn init(&mut self) -> Result<(), ComputeError> {
        if let Some(err) = self.setup_error.clone() {
            return Err(err);
        }
        if self.variables.is_empty() {
            return Err(ComputeError::NoVariables);
        }
        if let Some(var) = self
            .variables
            .iter()
            .find(|v| v.program.uses_target() && v.target.is_none())
        {
            return Err(ComputeError::MissingTarget(var.name.clone()));
        }

        let passes = self
            .variables
            .iter()
            .map(|var| self.build_pass(var))
            .collect::<Result<Vec<_>, _>>()?;
        log::info!(
            "Field compute ready: {} variables, {}x{} texels, {} targets",
            passes.len(),
            self.side,
            self.side,
            self.targets.len()
        );
        self.passes = passes;
        Ok(())
    }

    fn compute(&mut self) {
        if self.passes.is_empty() {
            return;
        }
        let workgroups = self.side.div_ceil(WORKGROUP_SIZE);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Field Compute Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Field Compute Pass"),
                timestamp_writes: None,
            });
            for (var, var_pass) in self.variables.iter().zip(&self.passes) {
                pass.set_pipeline(&var_pass.pipeline);
                pass.set_bind_group(0, &var_pass.bind_groups[self.parity], &[]);
                if var.program.uses_target() {
                    if let Some(target) = var.target.and_then(|t| self.targets.get(t.0)) {
                        pass.set_bind_group(1, &target.bind_group, &[]);
                    }
                }
                pass.dispatch_workgroups(workgroups, workgroups, 1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        self.parity = 1 - self.parity;
    }
}

impl SwarmPrograms for GpuCompute {
    fn velocity_program() -> WgslProgram {
        programs::velocity_wgsl()
    }

    fn position_program() -> WgslProgram {
        programs::position_wgsl()
    }
}
