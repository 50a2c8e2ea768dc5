//! CPU mirrors of the WGSL uniform blocks. Every vector is padded to `vec4`
//! so the Rust and WGSL layouts agree without manual offsets.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::app::FrameParams;
use crate::lighting::{PointLight, SpotLight};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_position: [f32; 4],
}

impl From<&FrameParams> for FrameUniform {
    fn from(frame: &FrameParams) -> Self {
        Self {
            view: frame.view.to_cols_array_2d(),
            projection: frame.projection.to_cols_array_2d(),
            view_position: frame.view_position.extend(1.0).into(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLightUniform {
    pub position: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub colour: [f32; 4],
    pub attenuation: [f32; 4],
}

impl From<&PointLight> for PointLightUniform {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.extend(1.0).into(),
            ambient: pad(light.ambient),
            diffuse: pad(light.diffuse),
            specular: pad(light.specular),
            colour: pad(light.colour),
            attenuation: [
                light.attenuation.constant,
                light.attenuation.linear,
                light.attenuation.quadratic,
                0.0,
            ],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpotLightUniform {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub colour: [f32; 4],
    pub attenuation: [f32; 4],
    pub cut_off: [f32; 4],
}

impl From<&SpotLight> for SpotLightUniform {
    fn from(light: &SpotLight) -> Self {
        Self {
            position: light.position.extend(1.0).into(),
            direction: pad(light.direction),
            ambient: pad(light.ambient),
            diffuse: pad(light.diffuse),
            specular: pad(light.specular),
            colour: pad(light.colour),
            attenuation: [
                light.attenuation.constant,
                light.attenuation.linear,
                light.attenuation.quadratic,
                0.0,
            ],
            cut_off: [light.cut_off, light.outer_cut_off, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightsUniform {
    pub point: PointLightUniform,
    pub spot: SpotLightUniform,
}

impl From<&FrameParams> for LightsUniform {
    fn from(frame: &FrameParams) -> Self {
        Self {
            point: (&frame.point_light).into(),
            spot: (&frame.spot_light).into(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub color: [f32; 4],
}

impl ObjectUniform {
    pub fn new(model: Mat4, color: Vec4) -> Self {
        let normal = Mat3::from_mat4(model).inverse().transpose();
        Self {
            model: model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
            color: color.into(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    pub params: [f32; 4],
}

impl MaterialUniform {
    pub fn new(shininess: f32) -> Self {
        Self {
            params: [shininess, 0.0, 0.0, 0.0],
        }
    }
}

fn pad(value: Vec3) -> [f32; 4] {
    value.extend(0.0).into()
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppContext;
    use crate::scene::SceneConfig;
    use std::mem::size_of;

    #[test]
    fn layouts_match_wgsl_sizes() {
        assert_eq!(size_of::<FrameUniform>(), 144);
        assert_eq!(size_of::<PointLightUniform>(), 96);
        assert_eq!(size_of::<SpotLightUniform>(), 128);
        assert_eq!(size_of::<LightsUniform>(), 224);
        assert_eq!(size_of::<ObjectUniform>(), 128);
        assert_eq!(size_of::<MaterialUniform>(), 16);
    }

    #[test]
    fn lights_pack_frame_parameters() {
        let frame = AppContext::new(SceneConfig::default()).frame_params();
        let lights = LightsUniform::from(&frame);
        assert_eq!(lights.point.position, [1.2, 1.0, 2.0, 1.0]);
        assert_eq!(lights.point.colour, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(lights.point.attenuation, [1.0, 0.09, 0.032, 0.0]);
        assert_eq!(lights.spot.position, [0.0, 0.0, 3.0, 1.0]);
        assert_eq!(lights.spot.direction[..3], frame.spot_light.direction.to_array());
        assert_eq!(
            lights.spot.cut_off[..2],
            [frame.spot_light.cut_off, frame.spot_light.outer_cut_off]
        );
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let object = ObjectUniform::new(model, Vec4::ONE);
        assert_eq!(object.normal[0][0], 0.5);
        assert_eq!(object.normal[1][1], 1.0);
        assert_eq!(object.normal[0][3], 0.0);
        assert_eq!(object.color, [1.0; 4]);
    }
}
