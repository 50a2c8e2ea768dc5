use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Floats per interleaved vertex: `position.xyz`, `normal.xyz`, `uv.xy`.
pub const VERTEX_STRIDE: usize = 8;

/// GPU ready mesh buffers produced from one material group of an OBJ file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjMesh {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl ObjMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Geometry of a whole OBJ file, split by `usemtl` groups.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjModel {
    pub meshes: Vec<ObjMesh>,
    pub material_libraries: Vec<String>,
}

/// Parses an OBJ file from memory and returns interleaved vertex/index arrays,
/// one mesh per material group.
///
/// Texture coordinates are flipped vertically so that `v = 0` addresses the
/// top row of the image, as wgpu samples it.
pub fn load_obj_from_str(data: &str) -> Result<ObjModel> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut texcoords = Vec::new();
    let mut groups: Vec<FaceGroup> = vec![FaceGroup::default()];
    let mut material_libraries = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "v" => positions.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid vertex on line {}", line_no + 1))?,
            ),
            "vn" => normals.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid normal on line {}", line_no + 1))?,
            ),
            "vt" => texcoords.push(
                parse_vec2(parts)
                    .with_context(|| format!("invalid texture coordinate on line {}", line_no + 1))?,
            ),
            "f" => {
                let defined = Defined {
                    positions: positions.len(),
                    texcoords: texcoords.len(),
                    normals: normals.len(),
                };
                let polygon = parse_face(parts, defined)
                    .with_context(|| format!("invalid face on line {}", line_no + 1))?;
                if let Some(group) = groups.last_mut() {
                    triangulate_face(&polygon, &mut group.faces);
                }
            }
            "usemtl" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                groups.push(FaceGroup {
                    material: (!name.is_empty()).then_some(name),
                    faces: Vec::new(),
                });
            }
            "mtllib" => material_libraries.extend(parts.map(|lib| lib.replace('\\', "/"))),
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }

    let mut meshes = Vec::new();
    for group in groups.into_iter().filter(|group| !group.faces.is_empty()) {
        let mut mesh = build_mesh(&positions, &normals, &texcoords, &group.faces)?;
        mesh.material = group.material;
        if needs_normals(&mesh.vertices) {
            compute_normals(&mut mesh);
        }
        meshes.push(mesh);
    }
    if meshes.is_empty() {
        return Err(anyhow!("OBJ file does not define any faces"));
    }

    Ok(ObjModel {
        meshes,
        material_libraries,
    })
}

#[derive(Debug, Default)]
struct FaceGroup {
    material: Option<String>,
    faces: Vec<[FaceIndex; 3]>,
}

fn next_component<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<f32> {
    Ok(parts
        .next()
        .ok_or_else(|| anyhow!("missing vector component"))?
        .parse::<f32>()?)
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let x = next_component(&mut parts)?;
    let y = next_component(&mut parts)?;
    let z = next_component(&mut parts)?;
    Ok(Vec3::new(x, y, z))
}

fn parse_vec2<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec2> {
    let u = next_component(&mut parts)?;
    // `vt u` is legal, v defaults to zero
    let v = match parts.next() {
        Some(value) => value.parse::<f32>()?,
        None => 0.0,
    };
    Ok(Vec2::new(u, v))
}

/// Element counts seen so far; negative face indices count back from these.
#[derive(Debug, Clone, Copy)]
struct Defined {
    positions: usize,
    texcoords: usize,
    normals: usize,
}

/// Converts a 1-based or negative OBJ index into a 0-based one.
fn resolve_index(index: i32, defined: usize, kind: &str) -> Result<usize> {
    if index > 0 {
        Ok(index as usize - 1)
    } else if index < 0 {
        defined
            .checked_sub(index.unsigned_abs() as usize)
            .ok_or_else(|| anyhow!("invalid {kind} index {index}"))
    } else {
        Err(anyhow!("invalid {kind} index 0"))
    }
}

fn parse_optional_index(segment: Option<&str>, defined: usize, kind: &str) -> Result<Option<usize>> {
    match segment {
        Some(s) if !s.is_empty() => Ok(Some(resolve_index(s.parse::<i32>()?, defined, kind)?)),
        _ => Ok(None),
    }
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>, defined: Defined) -> Result<Vec<FaceIndex>> {
    let mut indices = Vec::new();
    for part in parts {
        let mut segments = part.split('/');
        let v = segments
            .next()
            .ok_or_else(|| anyhow!("missing vertex index"))?
            .parse::<i32>()?;
        let v = resolve_index(v, defined.positions, "vertex")?;
        let vt = parse_optional_index(segments.next(), defined.texcoords, "texture coordinate")?;
        let vn = parse_optional_index(segments.next(), defined.normals, "normal")?;
        indices.push(FaceIndex { v, vt, vn });
    }
    if indices.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(indices)
}

fn triangulate_face(polygon: &[FaceIndex], faces: &mut Vec<[FaceIndex; 3]>) {
    if polygon.len() < 3 {
        return;
    }
    for i in 1..(polygon.len() - 1) {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key {
    position: usize,
    texcoord: Option<usize>,
    normal: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct FaceIndex {
    v: usize,
    vt: Option<usize>,
    vn: Option<usize>,
}

fn build_mesh(
    positions: &[Vec3],
    normals: &[Vec3],
    texcoords: &[Vec2],
    faces: &[[FaceIndex; 3]],
) -> Result<ObjMesh> {
    let mut lookup: HashMap<Key, u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for face in faces {
        for idx in face {
            let pos_index = check_index(idx.v, positions.len(), "vertex")?;
            let key = Key {
                position: pos_index,
                texcoord: idx
                    .vt
                    .map(|i| check_index(i, texcoords.len(), "texture coordinate"))
                    .transpose()?,
                normal: idx
                    .vn
                    .map(|i| check_index(i, normals.len(), "normal"))
                    .transpose()?,
            };
            let next_index = (vertices.len() / VERTEX_STRIDE) as u32;
            let entry = lookup.entry(key).or_insert_with(|| {
                let position = positions[pos_index];
                let normal = key.normal.map(|i| normals[i]).unwrap_or(Vec3::ZERO);
                let uv = key.texcoord.map(|i| texcoords[i]).unwrap_or(Vec2::ZERO);
                vertices.extend_from_slice(&[
                    position.x,
                    position.y,
                    position.z,
                    normal.x,
                    normal.y,
                    normal.z,
                    uv.x,
                    1.0 - uv.y,
                ]);
                next_index
            });
            indices.push(*entry);
        }
    }

    Ok(ObjMesh {
        material: None,
        vertices,
        indices,
    })
}

fn check_index(index: usize, len: usize, kind: &str) -> Result<usize> {
    if index < len {
        Ok(index)
    } else {
        Err(anyhow!("invalid {kind} index {}", index + 1))
    }
}

fn needs_normals(vertices: &[f32]) -> bool {
    vertices
        .chunks_exact(VERTEX_STRIDE)
        .any(|chunk| chunk[3] == 0.0 && chunk[4] == 0.0 && chunk[5] == 0.0)
}

fn compute_normals(mesh: &mut ObjMesh) {
    let vertex_count = mesh.vertex_count();
    let mut accum = vec![Vec3::ZERO; vertex_count];
    let position = |vertices: &[f32], i: usize| {
        Vec3::from_slice(&vertices[i * VERTEX_STRIDE..i * VERTEX_STRIDE + 3])
    };

    for triangle in mesh.indices.chunks_exact(3) {
        let i0 = triangle[0] as usize;
        let i1 = triangle[1] as usize;
        let i2 = triangle[2] as usize;
        let p0 = position(&mesh.vertices, i0);
        let p1 = position(&mesh.vertices, i1);
        let p2 = position(&mesh.vertices, i2);
        let normal = (p1 - p0).cross(p2 - p0);
        if normal.length_squared() > f32::EPSILON {
            let normal = normal.normalize();
            accum[i0] += normal;
            accum[i1] += normal;
            accum[i2] += normal;
        }
    }

    for (i, normal) in accum.into_iter().enumerate() {
        let base = i * VERTEX_STRIDE;
        // Keep normals the file supplied.
        if mesh.vertices[base + 3..base + 6].iter().any(|c| *c != 0.0) {
            continue;
        }
        let normal = normal.normalize_or_zero();
        mesh.vertices[base + 3] = normal.x;
        mesh.vertices[base + 4] = normal.y;
        mesh.vertices[base + 5] = normal.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_triangle() {
        let obj = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let model = load_obj_from_str(obj).unwrap();
        assert_eq!(model.meshes.len(), 1);
        let mesh = &model.meshes[0];
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 3 * VERTEX_STRIDE);
        assert!(mesh.material.is_none());
    }

    #[test]
    fn computes_missing_normals() {
        let obj = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let model = load_obj_from_str(obj).unwrap();
        for chunk in model.meshes[0].vertices.chunks_exact(VERTEX_STRIDE) {
            let normal = Vec3::new(chunk[3], chunk[4], chunk[5]);
            assert!((normal - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn texcoords_are_flipped_and_interleaved() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1\n";
        let mesh = &load_obj_from_str(obj).unwrap().meshes[0];
        let uv_of = |i: usize| (mesh.vertices[i * 8 + 6], mesh.vertices[i * 8 + 7]);
        assert_eq!(uv_of(0), (0.0, 1.0));
        assert_eq!(uv_of(1), (1.0, 1.0));
        assert_eq!(uv_of(2), (0.0, 0.0));
        assert_eq!(&mesh.vertices[3..6], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn usemtl_splits_meshes_and_quads_are_triangulated() {
        let obj = "mtllib suit.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
usemtl Body
f 1 2 3 4
usemtl Helmet
f -4 -3 -2
";
        let model = load_obj_from_str(obj).unwrap();
        assert_eq!(model.material_libraries, vec!["suit.mtl".to_string()]);
        assert_eq!(model.meshes.len(), 2);
        assert_eq!(model.meshes[0].material.as_deref(), Some("Body"));
        assert_eq!(model.meshes[0].triangle_count(), 2);
        assert_eq!(model.meshes[0].vertex_count(), 4);
        assert_eq!(model.meshes[1].material.as_deref(), Some("Helmet"));
        assert_eq!(model.meshes[1].triangle_count(), 1);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        assert!(load_obj_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n").is_err());
        assert!(load_obj_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 0\n").is_err());
        assert!(load_obj_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -4 -2 -1\n").is_err());
        assert!(load_obj_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\n").is_err());
        assert!(load_obj_from_str("f 1 2 3\n").is_err());
    }

    #[test]
    fn out_of_range_texcoord_and_normal_are_errors() {
        let texcoord = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nf 1/1 2/2 3/1\n";
        let err = load_obj_from_str(texcoord).unwrap_err();
        assert!(format!("{err:#}").contains("invalid texture coordinate index 2"));

        let normal = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//-2\n";
        let err = load_obj_from_str(normal).unwrap_err();
        assert!(format!("{err:#}").contains("invalid normal index -2"));
    }

    #[test]
    fn negative_indices_count_back_from_the_face_line() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\nv 5 5 5\n";
        let mesh = &load_obj_from_str(obj).unwrap().meshes[0];
        let positions: Vec<Vec3> = mesh
            .vertices
            .chunks_exact(VERTEX_STRIDE)
            .map(|chunk| Vec3::from_slice(&chunk[..3]))
            .collect();
        assert_eq!(positions, vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
    }
}
