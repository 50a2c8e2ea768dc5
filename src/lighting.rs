//! Light descriptors pushed to the model shader every frame.
//!
//! Neither light is persistent scene state: the point light is rebuilt from
//! the scene configuration and the flashlight is re-keyed to the camera each
//! frame.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::Camera;

/// Constant, linear and quadratic distance falloff terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    pub const fn new(constant: f32, linear: f32, quadratic: f32) -> Self {
        Self {
            constant,
            linear,
            quadratic,
        }
    }

    /// Intensity multiplier at `distance` from the light.
    pub fn factor(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

impl Default for Attenuation {
    /// Roughly a 50 unit range.
    fn default() -> Self {
        Self::new(1.0, 0.09, 0.032)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub colour: Vec3,
    pub attenuation: Attenuation,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(1.2, 1.0, 2.0),
            ambient: Vec3::splat(0.2),
            diffuse: Vec3::splat(0.5),
            specular: Vec3::ONE,
            colour: Vec3::new(0.0, 1.0, 0.0),
            attenuation: Attenuation::default(),
        }
    }
}

/// Cone light. Cutoffs are stored as cosines so the shader compares them
/// directly against `dot(light_dir, -direction)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub colour: Vec3,
    pub attenuation: Attenuation,
    pub cut_off: f32,
    pub outer_cut_off: f32,
}

impl SpotLight {
    /// Builds a flashlight at the camera, pointing where the camera looks.
    pub fn flashlight(camera: &Camera, cone: &FlashlightCone) -> Self {
        Self {
            position: camera.position(),
            direction: camera.front(),
            ambient: Vec3::ZERO,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            colour: Vec3::ONE,
            attenuation: Attenuation::default(),
            cut_off: cone.inner_degrees.to_radians().cos(),
            outer_cut_off: cone.outer_degrees.to_radians().cos(),
        }
    }

    /// Smooth edge factor for a fragment whose direction from the light makes
    /// `cos_theta` with the spot direction.
    pub fn edge_intensity(&self, cos_theta: f32) -> f32 {
        let epsilon = self.cut_off - self.outer_cut_off;
        if epsilon <= f32::EPSILON {
            return if cos_theta >= self.cut_off { 1.0 } else { 0.0 };
        }
        ((cos_theta - self.outer_cut_off) / epsilon).clamp(0.0, 1.0)
    }
}

/// Inner and outer cone angles of the flashlight, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlashlightCone {
    pub inner_degrees: f32,
    pub outer_degrees: f32,
}

impl Default for FlashlightCone {
    fn default() -> Self {
        Self {
            inner_degrees: 10.0,
            outer_degrees: 15.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flashlight_follows_camera() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(90.0, 30.0);
        let spot = SpotLight::flashlight(&camera, &FlashlightCone::default());
        assert_eq!(spot.position, camera.position());
        assert_eq!(spot.direction, camera.front());
        assert!((spot.cut_off - 10f32.to_radians().cos()).abs() < 1e-6);
        assert!((spot.outer_cut_off - 15f32.to_radians().cos()).abs() < 1e-6);
        assert!(spot.cut_off > spot.outer_cut_off);
    }

    #[test]
    fn spot_edge_is_smooth_between_cutoffs() {
        let spot = SpotLight::flashlight(&Camera::default(), &FlashlightCone::default());
        assert_eq!(spot.edge_intensity(1.0), 1.0);
        assert_eq!(spot.edge_intensity(20f32.to_radians().cos()), 0.0);
        let halfway = (spot.cut_off + spot.outer_cut_off) * 0.5;
        assert!((spot.edge_intensity(halfway) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn attenuation_falls_off_with_distance() {
        let attenuation = Attenuation::default();
        assert_eq!(attenuation.factor(0.0), 1.0);
        assert!(attenuation.factor(10.0) < attenuation.factor(1.0));
        let expected = 1.0 / (1.0 + 0.9 + 3.2);
        assert!((attenuation.factor(10.0) - expected).abs() < 1e-6);
    }

    #[test]
    fn default_point_light_is_green() {
        let light = PointLight::default();
        assert_eq!(light.position, Vec3::new(1.2, 1.0, 2.0));
        assert_eq!(light.colour, Vec3::new(0.0, 1.0, 0.0));
    }
}
