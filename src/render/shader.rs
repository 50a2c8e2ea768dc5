use std::borrow::Cow;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

pub const MODEL_SHADER: &str = include_str!("../../shaders/model.wgsl");
pub const MARKER_SHADER: &str = include_str!("../../shaders/marker.wgsl");

/// Returns the WGSL source at `path`, or `builtin` when no override is set.
pub fn load_source(path: Option<&Path>, builtin: &'static str) -> Result<Cow<'static, str>> {
    match path {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("unable to read shader {}", path.display()))?;
            info!("using shader override {}", path.display());
            Ok(Cow::Owned(source))
        }
        None => Ok(Cow::Borrowed(builtin)),
    }
}

/// Compiles `source`, turning validation failures into an error instead of
/// the device's uncaptured-error panic.
pub async fn compile(
    device: &wgpu::Device,
    label: &str,
    source: Cow<'static, str>,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source),
    });
    match device.pop_error_scope().await {
        Some(err) => Err(anyhow::anyhow!("shader {label} failed to compile: {err}")),
        None => Ok(module),
    }
}
