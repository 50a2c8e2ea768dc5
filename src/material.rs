use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SHININESS: f32 = 32.0;

/// Surface description read from an MTL library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub diffuse_color: Vec3,
    pub specular_color: Vec3,
    pub shininess: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffuse_map: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular_map: Option<String>,
}

impl Material {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_color: Vec3::splat(0.8),
            specular_color: Vec3::splat(0.5),
            shininess: DEFAULT_SHININESS,
            diffuse_map: None,
            specular_map: None,
        }
    }
}

/// Parses an MTL library into materials keyed by name.
///
/// Only the statements the model shader consumes are interpreted; everything
/// else (`Ka`, `illum`, `map_Bump`, ...) is skipped.
pub fn load_mtl_from_str(data: &str) -> Result<HashMap<String, Material>> {
    let mut materials = HashMap::new();
    let mut current: Option<Material> = None;

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (tag, rest) = trimmed
            .split_once(char::is_whitespace)
            .map(|(tag, rest)| (tag, rest.trim()))
            .unwrap_or((trimmed, ""));

        if tag == "newmtl" {
            if rest.is_empty() {
                return Err(anyhow!("newmtl without a name on line {}", line_no + 1));
            }
            if let Some(done) = current.replace(Material::named(rest)) {
                materials.insert(done.name.clone(), done);
            }
            continue;
        }

        let Some(material) = current.as_mut() else {
            continue;
        };
        match tag {
            "Kd" => {
                material.diffuse_color = parse_color(rest)
                    .with_context(|| format!("invalid Kd on line {}", line_no + 1))?
            }
            "Ks" => {
                material.specular_color = parse_color(rest)
                    .with_context(|| format!("invalid Ks on line {}", line_no + 1))?
            }
            "Ns" => {
                material.shininess = rest
                    .parse::<f32>()
                    .with_context(|| format!("invalid Ns on line {}", line_no + 1))?
                    .max(1.0)
            }
            "map_Kd" => material.diffuse_map = texture_path(rest),
            "map_Ks" => material.specular_map = texture_path(rest),
            _ => {}
        }
    }

    if let Some(done) = current {
        materials.insert(done.name.clone(), done);
    }
    Ok(materials)
}

fn parse_color(value: &str) -> Result<Vec3> {
    let mut numbers = value.split_whitespace().map(str::parse::<f32>);
    let r = numbers
        .next()
        .ok_or_else(|| anyhow!("missing color component"))??;
    // A single value is shorthand for a grey.
    let Some(g) = numbers.next() else {
        return Ok(Vec3::splat(r));
    };
    let b = numbers
        .next()
        .ok_or_else(|| anyhow!("missing color component"))??;
    Ok(Vec3::new(r, g?, b))
}

/// Texture statements may carry options before the file name (`-bm 1 bump.png`);
/// the file name is always the last token.
fn texture_path(value: &str) -> Option<String> {
    value
        .split_whitespace()
        .last()
        .map(|path| path.replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
# two materials
newmtl Body
Ns 96.0
Kd 0.640000 0.640000 0.640000
Ks 0.5 0.5 0.5
map_Kd body_dif.png
map_Ks body_showroom_spec.png
map_Bump body_ddn.png

newmtl Glass
Kd 0.1
illum 2
map_Kd textures\\glass_dif.png
";

    #[test]
    fn parses_colors_and_maps() {
        let materials = load_mtl_from_str(SAMPLE).unwrap();
        assert_eq!(materials.len(), 2);
        let body = &materials["Body"];
        assert_eq!(body.shininess, 96.0);
        assert_eq!(body.diffuse_color, Vec3::splat(0.64));
        assert_eq!(body.diffuse_map.as_deref(), Some("body_dif.png"));
        assert_eq!(body.specular_map.as_deref(), Some("body_showroom_spec.png"));
    }

    #[test]
    fn single_component_color_and_backslash_paths() {
        let materials = load_mtl_from_str(SAMPLE).unwrap();
        let glass = &materials["Glass"];
        assert_eq!(glass.diffuse_color, Vec3::splat(0.1));
        assert_eq!(glass.shininess, DEFAULT_SHININESS);
        assert_eq!(glass.diffuse_map.as_deref(), Some("textures/glass_dif.png"));
        assert!(glass.specular_map.is_none());
    }

    #[test]
    fn malformed_color_is_an_error() {
        assert!(load_mtl_from_str("newmtl A\nKd 1 x 1\n").is_err());
        assert!(load_mtl_from_str("newmtl\n").is_err());
    }
}
