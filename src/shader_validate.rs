//! Shader validation using naga.
//!
//! Generated WGSL is validated before it reaches `wgpu`, so a broken
//! program surfaces as an error value with a readable message instead of a
//! device-level panic.

use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

/// Shader validation error with helpful context.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderError {
    pub message: String,
    pub stage: &'static str,
}

impl std::fmt::Display for ShaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} shader error: {}", self.stage, self.message)
    }
}

impl std::error::Error for ShaderError {}

/// Validate a WGSL compute shader.
pub fn validate_compute_shader(source: &str) -> Result<(), ShaderError> {
    validate_wgsl(source, "Compute")
}

/// Validate a WGSL render shader (vertex + fragment).
pub fn validate_render_shader(source: &str) -> Result<(), ShaderError> {
    validate_wgsl(source, "Render")
}

fn validate_wgsl(source: &str, stage: &'static str) -> Result<(), ShaderError> {
    let module = wgsl::parse_str(source).map_err(|err| ShaderError {
        message: err.emit_to_string(source),
        stage,
    })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator.validate(&module).map_err(|err| ShaderError {
        message: format!("{}", err),
        stage,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_compute_shader() {
        let src = r#"
            @group(0) @binding(0) var<storage, read_write> data: array<f32>;

            @compute @workgroup_size(64)
            fn main(@builtin(global_invocation_id) id: vec3<u32>) {
                data[id.x] = data[id.x] * 2.0;
            }
        "#;
        assert!(validate_compute_shader(src).is_ok());
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = validate_compute_shader("fn main( {").unwrap_err();
        assert_eq!(err.stage, "Compute");
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_type_error_is_reported() {
        let src = r#"
            @compute @workgroup_size(1)
            fn main() {
                let x: f32 = vec3<f32>(1.0);
            }
        "#;
        assert!(validate_compute_shader(src).is_err());
    }
}
