//! CPU reference backend.

use glam::{UVec2, Vec4};

use super::{check_dependencies, ComputeBackend, FieldUniforms, TargetId, VariableId};
use crate::error::ComputeError;
use crate::field::FieldTexture;

/// Update program for [`CpuCompute`]: returns the new texel for one input.
pub type CpuProgram = Box<dyn Fn(&TexelInput<'_>) -> Vec4 + Send + Sync>;

/// Everything a CPU program may look at while computing one texel.
pub struct TexelInput<'a> {
    /// Flat texel index.
    pub index: usize,
    /// Column and row of the texel.
    pub coord: UVec2,
    /// Current uniform block.
    pub uniforms: &'a FieldUniforms,
    reads: &'a [(VariableId, &'a FieldTexture)],
    target: Option<&'a FieldTexture>,
}

impl TexelInput<'_> {
    /// Previous-tick value of a declared dependency at this texel.
    ///
    /// Reading a variable that was not declared as a dependency yields zero,
    /// like sampling an unbound texture.
    pub fn read(&self, variable: VariableId) -> Vec4 {
        self.reads
            .iter()
            .find(|(id, _)| *id == variable)
            .map(|(_, tex)| tex.vec4(self.index))
            .unwrap_or(Vec4::ZERO)
    }

    /// Previous-tick value of the `slot`-th declared dependency, in the order
    /// passed to `set_dependencies`. Zero past the end of the list.
    pub fn dependency(&self, slot: usize) -> Vec4 {
        self.reads
            .get(slot)
            .map(|(_, tex)| tex.vec4(self.index))
            .unwrap_or(Vec4::ZERO)
    }

    /// Bound target texture at this texel, or zero when nothing is bound.
    pub fn target(&self) -> Vec4 {
        self.target.map(|t| t.vec4(self.index)).unwrap_or(Vec4::ZERO)
    }
}

struct CpuVariable {
    name: String,
    program: CpuProgram,
    dependencies: Vec<VariableId>,
    target: Option<TargetId>,
}

/// Runs update programs on the CPU with the same ping-pong contract as the
/// GPU backend. `front` holds the values of the last completed tick, `back`
/// receives the tick being computed.
pub struct CpuCompute {
    side: u32,
    variables: Vec<CpuVariable>,
    front: Vec<FieldTexture>,
    back: Vec<FieldTexture>,
    targets: Vec<FieldTexture>,
    uniforms: FieldUniforms,
    setup_error: Option<ComputeError>,
    ticks: u64,
}

impl CpuCompute {
    /// Create an empty backend for `side × side` fields.
    pub fn new(side: u32) -> Self {
        Self {
            side,
            variables: Vec::new(),
            front: Vec::new(),
            back: Vec::new(),
            targets: Vec::new(),
            uniforms: FieldUniforms::empty(side),
            setup_error: None,
            ticks: 0,
        }
    }

    /// Latest completed values of `variable`.
    pub fn current(&self, variable: VariableId) -> Option<&FieldTexture> {
        self.front.get(variable.0)
    }

    /// Target currently bound to `variable`.
    pub fn bound_target(&self, variable: VariableId) -> Option<TargetId> {
        self.variables.get(variable.0).and_then(|v| v.target)
    }

    /// Contents of a registered target.
    pub fn target(&self, target: TargetId) -> Option<&FieldTexture> {
        self.targets.get(target.0)
    }

    /// Name a variable was registered under.
    pub fn variable_name(&self, variable: VariableId) -> Option<&str> {
        self.variables.get(variable.0).map(|v| v.name.as_str())
    }

    /// Uniforms of the last `set_uniforms` call.
    pub fn uniforms(&self) -> &FieldUniforms {
        &self.uniforms
    }

    /// Completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn check_side(&mut self, texture: &FieldTexture) {
        if texture.side() != self.side && self.setup_error.is_none() {
            self.setup_error = Some(ComputeError::SideMismatch {
                expected: self.side,
                found: texture.side(),
            });
        }
    }
}

impl ComputeBackend for CpuCompute {
    type Program = CpuProgram;

    fn side(&self) -> u32 {
        self.side
    }

    fn add_variable(&mut self, name: &str, program: CpuProgram, initial: FieldTexture) -> VariableId {
        self.check_side(&initial);
        let id = VariableId(self.variables.len());
        self.variables.push(CpuVariable {
            name: name.to_string(),
            program,
            dependencies: Vec::new(),
            target: None,
        });
        self.back.push(FieldTexture::new(initial.side()));
        self.front.push(initial);
        id
    }

    fn set_dependencies(&mut self, variable: VariableId, dependencies: &[VariableId]) -> Result<(), ComputeError> {
        check_dependencies(dependencies, self.variables.len())?;
        let var = self
            .variables
            .get_mut(variable.0)
            .ok_or(ComputeError::UnknownVariable(variable.0))?;
        var.dependencies = dependencies.to_vec();
        Ok(())
    }

    fn add_target(&mut self, texture: &FieldTexture) -> TargetId {
        self.check_side(texture);
        self.targets.push(texture.clone());
        TargetId(self.targets.len() - 1)
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
        self.uniforms = *uniforms;
    }

    fn init(&mut self) -> Result<(), ComputeError> {
        if self.side == 0 {
            return Err(ComputeError::InvalidSide { side: 0, max: u32::MAX });
        }
        if let Some(err) = self.setup_error.clone() {
            return Err(err);
        }
        if self.variables.is_empty() {
            return Err(ComputeError::NoVariables);
        }
        Ok(())
    }

    fn compute(&mut self) {
        let side = self.side;
        let Self {
            variables,
            front,
            back,
            targets,
            uniforms,
            ..
        } = self;

        for (slot, var) in variables.iter().enumerate() {
            let reads: Vec<(VariableId, &FieldTexture)> = var
                .dependencies
                .iter()
                .map(|d| (*d, &front[d.0]))
                .collect();
            let target = var.target.and_then(|t| targets.get(t.0));

            for (index, texel) in back[slot].texels_mut().iter_mut().enumerate() {
                let input = TexelInput {
                    index,
                    coord: UVec2::new(index as u32 % side, index as u32 / side),
                    uniforms: &*uniforms,
                    reads: &reads,
                    target,
                };
                *texel = (var.program)(&input).to_array();
            }
        }

        std::mem::swap(front, back);
        self.ticks += 1;
    }
}
