use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::camera::{DEFAULT_SENSITIVITY, DEFAULT_SPEED};
use crate::input::{KeyCode, NamedKey};
use crate::lighting::{Attenuation, FlashlightCone, PointLight};

pub const DEFAULT_MODEL_PATH: &str = "models/nanosuit/nanosuit.obj";

/// Everything the viewer can be configured with. Every element of the scene
/// file is optional and falls back to the built-in demo setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub model_path: PathBuf,
    pub camera: CameraConfig,
    pub light: PointLight,
    pub flashlight: FlashlightCone,
    pub marker_scale: f32,
    pub model_transform: ModelTransform,
    pub bindings: KeyBindings,
    pub shaders: ShaderPaths,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            camera: CameraConfig::default(),
            light: PointLight::default(),
            flashlight: FlashlightCone::default(),
            marker_scale: 0.2,
            model_transform: ModelTransform::default(),
            bindings: KeyBindings::default(),
            shaders: ShaderPaths::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub position: Vec3,
    pub speed: f32,
    pub sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            speed: DEFAULT_SPEED,
            sensitivity: DEFAULT_SENSITIVITY,
        }
    }
}

/// Placement of the loaded model: translate, then scale, then a spin about +Y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelTransform {
    pub translation: Vec3,
    pub scale: Vec3,
    /// Spin rate in degrees per second.
    pub spin_speed: f32,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::new(0.0, -1.75, 0.0),
            scale: Vec3::splat(0.2),
            spin_speed: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub forward: KeyCode,
    pub backward: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub quit: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::Character('W'),
            backward: KeyCode::Character('S'),
            left: KeyCode::Character('A'),
            right: KeyCode::Character('D'),
            quit: KeyCode::Named(NamedKey::Escape),
        }
    }
}

/// Optional WGSL overrides for the two shader programs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShaderPaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<PathBuf>,
}

impl SceneConfig {
    /// Reads a scene file. Relative paths inside it resolve against the
    /// directory that contains the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path)
            .with_context(|| format!("unable to read scene {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_xml(&xml, base)
            .with_context(|| format!("failed to parse scene {}", path.display()))
    }

    /// Parses scene XML, resolving relative paths against `base`.
    pub fn from_xml(xml: &str, base: &Path) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        if !root.has_tag_name("scene") {
            return Err(anyhow!("root element must be <scene>"));
        }

        let mut config = Self::default();
        if let Some(model) = optional_text(&root, "model") {
            config.model_path = base.join(model);
        }

        if let Some(node) = child(&root, "camera") {
            let camera = &mut config.camera;
            camera.position = parse_vec3(optional_text(&node, "position"), camera.position)?;
            camera.speed = parse_f32(optional_text(&node, "speed"), camera.speed)?;
            camera.sensitivity = parse_f32(optional_text(&node, "sensitivity"), camera.sensitivity)?;
        }

        if let Some(node) = child(&root, "light") {
            let light = &mut config.light;
            light.position = parse_vec3(optional_text(&node, "position"), light.position)?;
            light.colour = parse_vec3(optional_text(&node, "colour"), light.colour)?;
            light.ambient = parse_vec3(optional_text(&node, "ambient"), light.ambient)?;
            light.diffuse = parse_vec3(optional_text(&node, "diffuse"), light.diffuse)?;
            light.specular = parse_vec3(optional_text(&node, "specular"), light.specular)?;
            light.attenuation = parse_attenuation(optional_text(&node, "attenuation"), light.attenuation)?;
        }

        if let Some(node) = child(&root, "flashlight") {
            let cone = &mut config.flashlight;
            cone.inner_degrees = parse_f32(optional_text(&node, "cutoff"), cone.inner_degrees)?;
            cone.outer_degrees = parse_f32(optional_text(&node, "outer-cutoff"), cone.outer_degrees)?;
            if cone.outer_degrees < cone.inner_degrees {
                return Err(anyhow!("flashlight outer cutoff must not be smaller than cutoff"));
            }
        }

        if let Some(node) = child(&root, "marker") {
            config.marker_scale = parse_f32(optional_text(&node, "scale"), config.marker_scale)?;
        }

        if let Some(node) = child(&root, "transform") {
            let transform = &mut config.model_transform;
            transform.translation = parse_vec3(optional_text(&node, "translation"), transform.translation)?;
            transform.scale = parse_vec3(optional_text(&node, "scale"), transform.scale)?;
            transform.spin_speed = parse_f32(optional_text(&node, "spin"), transform.spin_speed)?;
        }

        if let Some(node) = child(&root, "bindings") {
            let bindings = &mut config.bindings;
            bindings.forward = parse_key(optional_text(&node, "forward"), bindings.forward)?;
            bindings.backward = parse_key(optional_text(&node, "backward"), bindings.backward)?;
            bindings.left = parse_key(optional_text(&node, "left"), bindings.left)?;
            bindings.right = parse_key(optional_text(&node, "right"), bindings.right)?;
            bindings.quit = parse_key(optional_text(&node, "quit"), bindings.quit)?;
        }

        if let Some(node) = child(&root, "shaders") {
            config.shaders.model = optional_text(&node, "model").map(|p| base.join(p));
            config.shaders.marker = optional_text(&node, "marker").map(|p| base.join(p));
        }

        Ok(config)
    }
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_components(value: &str) -> Result<Vec<f32>> {
    value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("invalid number {component:?}: {err}"))
        })
        .collect()
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    match parse_components(&value)?.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        [v] => Ok(Vec3::splat(*v)),
        _ => Err(anyhow!("expected 1 or 3 components, got {value:?}")),
    }
}

fn parse_attenuation(value: Option<String>, default: Attenuation) -> Result<Attenuation> {
    let Some(value) = value else {
        return Ok(default);
    };
    match parse_components(&value)?.as_slice() {
        [constant, linear, quadratic] => Ok(Attenuation::new(*constant, *linear, *quadratic)),
        _ => Err(anyhow!("attenuation needs constant, linear and quadratic terms")),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float {value:?}: {err}")),
        None => Ok(default),
    }
}

fn parse_key(value: Option<String>, default: KeyCode) -> Result<KeyCode> {
    match value {
        Some(name) => KeyCode::from_name(&name).ok_or_else(|| anyhow!("unknown key name {name:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    <scene>
        <model>assets/crate.obj</model>
        <camera>
            <position>1 2 10</position>
            <speed>5</speed>
        </camera>
        <light>
            <position>0 5 0</position>
            <colour>1 1 1</colour>
            <attenuation>1 0.045 0.0075</attenuation>
        </light>
        <flashlight>
            <cutoff>12.5</cutoff>
            <outer-cutoff>17.5</outer-cutoff>
        </flashlight>
        <bindings>
            <forward>Up</forward>
            <quit>Q</quit>
        </bindings>
        <shaders>
            <marker>shaders/glow.wgsl</marker>
        </shaders>
    </scene>
    "#;

    #[test]
    fn empty_scene_matches_defaults() {
        let config = SceneConfig::from_xml("<scene/>", Path::new("")).unwrap();
        assert_eq!(config, SceneConfig::default());
        assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.camera.position, Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn parse_scene_overrides_fields() {
        let config = SceneConfig::from_xml(SAMPLE, Path::new("levels")).unwrap();
        assert_eq!(config.model_path, Path::new("levels").join("assets/crate.obj"));
        assert_eq!(config.camera.position, Vec3::new(1.0, 2.0, 10.0));
        assert_eq!(config.camera.speed, 5.0);
        assert_eq!(config.camera.sensitivity, DEFAULT_SENSITIVITY);
        assert_eq!(config.light.position, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(config.light.colour, Vec3::ONE);
        assert_eq!(config.light.ambient, Vec3::splat(0.2));
        assert_eq!(config.light.attenuation, Attenuation::new(1.0, 0.045, 0.0075));
        assert_eq!(config.flashlight.inner_degrees, 12.5);
        assert_eq!(config.bindings.forward, KeyCode::Named(NamedKey::Up));
        assert_eq!(config.bindings.backward, KeyCode::Character('S'));
        assert_eq!(config.bindings.quit, KeyCode::Character('Q'));
        assert!(config.shaders.model.is_none());
        assert_eq!(
            config.shaders.marker,
            Some(Path::new("levels").join("shaders/glow.wgsl"))
        );
    }

    #[test]
    fn bad_values_are_errors() {
        let base = Path::new("");
        assert!(SceneConfig::from_xml("<scene><light><position>1 x 2</position></light></scene>", base).is_err());
        assert!(SceneConfig::from_xml("<scene><light><position>1 2</position></light></scene>", base).is_err());
        assert!(SceneConfig::from_xml("<scene><bindings><left>Meta</left></bindings></scene>", base).is_err());
        assert!(SceneConfig::from_xml(
            "<scene><flashlight><cutoff>20</cutoff><outer-cutoff>10</outer-cutoff></flashlight></scene>",
            base
        )
        .is_err());
        assert!(SceneConfig::from_xml("<level/>", base).is_err());
    }
}
