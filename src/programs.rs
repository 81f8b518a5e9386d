//! Update programs for the swarm's two field variables.
//!
//! Each variable has one program per backend: a WGSL body for
//! [`GpuCompute`](crate::gpu::GpuCompute) and a closure for [`CpuCompute`].
//! Both call into the same math ([`velocity_update`], [`position_update`]),
//! written once in Rust and once in WGSL.
//!
//! # WGSL program layout
//!
//! A [`WgslProgram`] only supplies
//!
//! ```wgsl
//! fn update(coord: vec2<u32>) -> vec4<f32> { ... }
//! ```
//!
//! and [`WgslProgram::assemble`] wraps it with the bindings and entry point:
//!
//! | group | binding | resource |
//! |-------|---------|----------|
//! | 0 | 0 | `uniforms: FieldUniforms` |
//! | 0 | 1..=d | `{dependency}_field: texture_2d<f32>` |
//! | 0 | d+1 | `output_field: texture_storage_2d<rgba32float, write>` |
//! | 1 | 0 | `goal_field: texture_2d<f32>` (only when the program uses a target) |

use glam::{Vec3, Vec4};

use crate::compute::{ComputeBackend, CpuCompute, CpuProgram, FieldUniforms, TexelInput};

/// Registered name of the position variable.
pub const POSITION: &str = "position";
/// Registered name of the velocity variable.
pub const VELOCITY: &str = "velocity";

/// Threads per workgroup along each axis.
pub const WORKGROUP_SIZE: u32 = 8;

/// Name of the bound target texture inside a WGSL program.
pub const GOAL_FIELD: &str = "goal_field";

const UNIFORMS_WGSL: &str = r#"struct FieldUniforms {
    time: f32,
    side: u32,
    pull: f32,
    damping: f32,
    swirl: f32,
    max_speed: f32,
    _pad0: f32,
    _pad1: f32,
}
"#;

/// WGSL update program for [`crate::gpu::GpuCompute`].
#[derive(Debug, Clone, PartialEq)]
pub struct WgslProgram {
    body: String,
    uses_target: bool,
}

impl WgslProgram {
    /// Program from a body defining `fn update(coord: vec2<u32>) -> vec4<f32>`.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            uses_target: false,
        }
    }

    /// Declare that the body reads `goal_field`, the bound target texture.
    pub fn with_target(mut self) -> Self {
        self.uses_target = true;
        self
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn uses_target(&self) -> bool {
        self.uses_target
    }

    /// Full compute shader for a variable reading `dependencies` (variable
    /// names, in binding order).
    pub fn assemble(&self, dependencies: &[&str]) -> String {
        let mut src = String::from(UNIFORMS_WGSL);
        src.push('\n');
        src.push_str("@group(0) @binding(0) var<uniform> uniforms: FieldUniforms;\n");
        for (i, name) in dependencies.iter().enumerate() {
            src.push_str(&format!(
                "@group(0) @binding({}) var {}_field: texture_2d<f32>;\n",
                i + 1,
                name
            ));
        }
        src.push_str(&format!(
            "@group(0) @binding({}) var output_field: texture_storage_2d<rgba32float, write>;\n",
            dependencies.len() + 1
        ));
        if self.uses_target {
            src.push_str(&format!(
                "@group(1) @binding(0) var {}: texture_2d<f32>;\n",
                GOAL_FIELD
            ));
        }
        src.push('\n');
        src.push_str(&self.body);
        src.push_str(&format!(
            r#"
@compute @workgroup_size({size}, {size})
fn main(@builtin(global_invocation_id) id: vec3<u32>) {{
    if (id.x >= uniforms.side || id.y >= uniforms.side) {{
        return;
    }}
    textureStore(output_field, vec2<i32>(id.xy), update(id.xy));
}}
"#,
            size = WORKGROUP_SIZE
        ));
        src
    }
}

const VELOCITY_BODY: &str = r#"fn update(coord: vec2<u32>) -> vec4<f32> {
    let c = vec2<i32>(coord);
    let pos = textureLoad(position_field, c, 0).xyz;
    let vel = textureLoad(velocity_field, c, 0).xyz;
    let goal = textureLoad(goal_field, c, 0);
    let t = uniforms.time;

    var v = vel * uniforms.damping + (goal.xyz - pos) * uniforms.pull * goal.w;
    v += vec3<f32>(
        sin(pos.y * 2.1 + t),
        sin(pos.z * 1.7 + t * 1.3),
        sin(pos.x * 1.9 + t * 0.7)
    ) * uniforms.swirl;

    let speed = length(v);
    if (speed > uniforms.max_speed) {
        v = v * (uniforms.max_speed / speed);
    }
    return vec4<f32>(v, 0.0);
}
"#;

const POSITION_BODY: &str = r#"fn update(coord: vec2<u32>) -> vec4<f32> {
    let c = vec2<i32>(coord);
    let pos = textureLoad(position_field, c, 0).xyz;
    let vel = textureLoad(velocity_field, c, 0).xyz;
    return vec4<f32>(pos + vel, 1.0);
}
"#;

/// Velocity program: damped pull toward the bound target plus a
/// time-varying swirl, capped at `max_speed`.
pub fn velocity_wgsl() -> WgslProgram {
    WgslProgram::new(VELOCITY_BODY).with_target()
}

/// Position program: integrate one tick of velocity.
pub fn position_wgsl() -> WgslProgram {
    WgslProgram::new(POSITION_BODY)
}

/// New velocity for one particle. `goal.w` scales the pull, so a target
/// texel with `w == 0` exerts no force.
pub fn velocity_update(pos: Vec3, vel: Vec3, goal: Vec4, uniforms: &FieldUniforms) -> Vec3 {
    let t = uniforms.time;
    let mut v = vel * uniforms.damping + (goal.truncate() - pos) * uniforms.pull * goal.w;
    v += Vec3::new(
        (pos.y * 2.1 + t).sin(),
        (pos.z * 1.7 + t * 1.3).sin(),
        (pos.x * 1.9 + t * 0.7).sin(),
    ) * uniforms.swirl;

    let speed = v.length();
    if speed > uniforms.max_speed {
        v *= uniforms.max_speed / speed;
    }
    v
}

/// New position for one particle.
pub fn position_update(pos: Vec3, vel: Vec3) -> Vec3 {
    pos + vel
}

/// Backends that can run the swarm's velocity and position programs.
///
/// Both programs expect their dependencies declared as
/// `[position, velocity]`.
pub trait SwarmPrograms: ComputeBackend {
    fn velocity_program() -> Self::Program;
    fn position_program() -> Self::Program;
}

impl SwarmPrograms for CpuCompute {
    fn velocity_program() -> CpuProgram {
        Box::new(|input: &TexelInput<'_>| {
            let pos = input.dependency(0).truncate();
            let vel = input.dependency(1).truncate();
            velocity_update(pos, vel, input.target(), input.uniforms).extend(0.0)
        })
    }

    fn position_program() -> CpuProgram {
        Box::new(|input: &TexelInput<'_>| {
            let pos = input.dependency(0).truncate();
            let vel = input.dependency(1).truncate();
            position_update(pos, vel).extend(1.0)
        })
    }
}
