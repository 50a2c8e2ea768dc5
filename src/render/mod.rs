//! wgpu rendering of the model and the light marker.

pub mod mesh;
pub mod renderer;
pub mod shader;
pub mod texture;
pub mod uniforms;

pub use renderer::Renderer;
