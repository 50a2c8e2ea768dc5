use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::obj::{ObjMesh, VERTEX_STRIDE};

/// Vertex layout shared by the model and marker pipelines.
pub const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (VERTEX_STRIDE * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

pub struct MeshBuffers {
    pub vertex: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffers {
    pub fn from_mesh(device: &wgpu::Device, mesh: &ObjMesh, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex.slice(..));
        pass.set_index_buffer(self.index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Outward normal and the two in-plane axes of each cube face, ordered so
/// that `u × v = normal` and the corners wind counter-clockwise.
const CUBE_FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    (Vec3::X, Vec3::NEG_Z, Vec3::Y),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
];

/// Unit cube centred on the origin, used as the light marker.
pub fn marker_cube() -> ObjMesh {
    let mut vertices = Vec::with_capacity(CUBE_FACES.len() * 4 * VERTEX_STRIDE);
    let mut indices = Vec::with_capacity(CUBE_FACES.len() * 6);
    let corners = [(-1.0, -1.0, 0.0, 1.0), (1.0, -1.0, 1.0, 1.0), (1.0, 1.0, 1.0, 0.0), (-1.0, 1.0, 0.0, 0.0)];

    for (face, (normal, u, v)) in CUBE_FACES.iter().enumerate() {
        for (su, sv, tu, tv) in corners {
            let position = (*normal + *u * su + *v * sv) * 0.5;
            vertices.extend_from_slice(&[
                position.x, position.y, position.z, normal.x, normal.y, normal.z, tu, tv,
            ]);
        }
        let base = (face * 4) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    ObjMesh {
        material: None,
        vertices,
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(mesh: &ObjMesh, i: u32) -> Vec3 {
        let base = i as usize * VERTEX_STRIDE;
        Vec3::from_slice(&mesh.vertices[base..base + 3])
    }

    #[test]
    fn cube_has_four_vertices_per_face() {
        let cube = marker_cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);
        for chunk in cube.vertices.chunks_exact(VERTEX_STRIDE) {
            for component in &chunk[..3] {
                assert_eq!(component.abs(), 0.5);
            }
        }
    }

    #[test]
    fn cube_triangles_face_outward() {
        let cube = marker_cube();
        for triangle in cube.indices.chunks_exact(3) {
            let (a, b, c) = (
                position(&cube, triangle[0]),
                position(&cube, triangle[1]),
                position(&cube, triangle[2]),
            );
            let geometric = (b - a).cross(c - a).normalize();
            let base = triangle[0] as usize * VERTEX_STRIDE;
            let stored = Vec3::from_slice(&cube.vertices[base + 3..base + 6]);
            assert!(geometric.abs_diff_eq(stored, 1e-6));
        }
    }

    #[test]
    fn layout_stride_matches_obj_vertices() {
        assert_eq!(vertex_layout().array_stride, 32);
        assert_eq!(VERTEX_ATTRIBUTES[2].offset, 24);
    }
}
