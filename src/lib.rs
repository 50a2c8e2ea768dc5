//! Building blocks for the Labyrinth model viewer.
//!
//! Everything except [`render`] is platform independent: the camera, the
//! OBJ/MTL loaders, the scene configuration and the per-frame application
//! state can be driven and tested without a window or a GPU. The binary wires
//! them to winit and wgpu.

pub mod app;
pub mod camera;
pub mod error;
pub mod input;
pub mod lighting;
pub mod material;
pub mod model;
pub mod obj;
pub mod render;
pub mod scene;

pub use app::{AppContext, FrameParams, RunState};
pub use camera::{Camera, CameraMovement};
pub use error::StartupError;
pub use input::{InputEvent, InputState, KeyCode, NamedKey};
pub use lighting::{Attenuation, FlashlightCone, PointLight, SpotLight};
pub use material::Material;
pub use model::Model;
pub use obj::{load_obj_from_str, ObjMesh};
pub use render::Renderer;
pub use scene::SceneConfig;
