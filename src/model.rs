use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::material::{load_mtl_from_str, Material};
use crate::obj::{load_obj_from_str, ObjMesh};

/// A model loaded from disk: geometry grouped by material plus the material
/// table. Texture paths in the materials are relative to `directory`.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub meshes: Vec<ObjMesh>,
    pub materials: HashMap<String, Material>,
    pub directory: PathBuf,
}

impl Model {
    /// Reads an OBJ file and every material library it references.
    ///
    /// A missing or malformed material library is not fatal; affected meshes
    /// render with the default material.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read model {}", path.display()))?;
        let obj = load_obj_from_str(&contents)
            .with_context(|| format!("failed to parse OBJ model {}", path.display()))?;
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut materials = HashMap::new();
        for library in &obj.material_libraries {
            let library_path = directory.join(library);
            match load_material_library(&library_path) {
                Ok(parsed) => {
                    debug!(
                        "loaded {} material(s) from {}",
                        parsed.len(),
                        library_path.display()
                    );
                    materials.extend(parsed);
                }
                Err(err) => warn!("skipping material library {}: {err:#}", library_path.display()),
            }
        }

        let model = Self {
            meshes: obj.meshes,
            materials,
            directory,
        };
        info!(
            "loaded model {} ({} meshes, {} vertices, {} triangles)",
            path.display(),
            model.meshes.len(),
            model.vertex_count(),
            model.triangle_count()
        );
        Ok(model)
    }

    /// Material for `mesh`, or the default material when the mesh names none
    /// or names one that no library defines.
    pub fn material_for(&self, mesh: &ObjMesh) -> Material {
        mesh.material
            .as_ref()
            .and_then(|name| self.materials.get(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Resolves a texture path from a material against the model directory.
    pub fn texture_path(&self, relative: &str) -> PathBuf {
        self.directory.join(relative)
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(ObjMesh::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(ObjMesh::triangle_count).sum()
    }
}

fn load_material_library(path: &Path) -> Result<HashMap<String, Material>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("unable to read {}", path.display()))?;
    load_mtl_from_str(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const OBJ: &str = "mtllib box.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
usemtl Painted
f 1 2 3
usemtl Unknown
f 1 3 4
";

    #[test]
    fn loads_geometry_and_materials() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("box.obj"), OBJ).unwrap();
        fs::write(
            dir.path().join("box.mtl"),
            "newmtl Painted\nKd 1 0 0\nmap_Kd paint.png\n",
        )
        .unwrap();

        let model = Model::load(dir.path().join("box.obj")).unwrap();
        assert_eq!(model.meshes.len(), 2);
        assert_eq!(model.triangle_count(), 2);
        assert_eq!(model.directory, dir.path());

        let painted = model.material_for(&model.meshes[0]);
        assert_eq!(painted.name, "Painted");
        assert_eq!(painted.diffuse_color, glam::Vec3::X);
        assert_eq!(
            model.texture_path(painted.diffuse_map.as_deref().unwrap()),
            dir.path().join("paint.png")
        );

        let fallback = model.material_for(&model.meshes[1]);
        assert_eq!(fallback, Material::default());
    }

    #[test]
    fn missing_material_library_is_tolerated() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("box.obj"), OBJ).unwrap();
        let model = Model::load(dir.path().join("box.obj")).unwrap();
        assert!(model.materials.is_empty());
    }

    #[test]
    fn missing_model_is_an_error() {
        let dir = tempdir().unwrap();
        let err = Model::load(dir.path().join("nope.obj")).unwrap_err();
        assert!(format!("{err:#}").contains("unable to read model"));
    }
}
