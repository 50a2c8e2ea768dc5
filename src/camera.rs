use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_SPEED: f32 = 2.5;
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
pub const DEFAULT_ZOOM: f32 = 45.0;

pub const PITCH_LIMIT: f32 = 89.0;
pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 45.0;

pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;

/// Direction of a keyboard-driven camera move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Free-flying camera driven by yaw/pitch angles in degrees.
///
/// `front`, `right` and `up` are derived from the angles and are rebuilt every
/// time the angles change, so they always form an orthonormal basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    zoom: f32,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self::with_angles(position, Vec3::Y, DEFAULT_YAW, DEFAULT_PITCH)
    }

    pub fn with_angles(position: Vec3, world_up: Vec3, yaw: f32, pitch: f32) -> Self {
        let world_up = if world_up.length_squared() > f32::EPSILON {
            world_up.normalize()
        } else {
            Vec3::Y
        };
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: world_up,
            right: Vec3::X,
            world_up,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
            zoom: DEFAULT_ZOOM,
        };
        camera.update_vectors();
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Vertical field of view in degrees.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Moves along the front or right vector, scaled by elapsed time.
    pub fn process_keyboard(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    pub fn process_mouse_movement(&mut self, xoffset: f32, yoffset: f32) {
        if xoffset == 0.0 && yoffset == 0.0 {
            return;
        }
        self.yaw += xoffset * self.mouse_sensitivity;
        self.pitch = (self.pitch + yoffset * self.mouse_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    pub fn process_mouse_scroll(&mut self, yoffset: f32) {
        self.zoom = (self.zoom - yoffset).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection for the current zoom, with wgpu's [0, 1] depth range.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect.max(0.01), NEAR_PLANE, FAR_PLANE)
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 3.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn assert_orthonormal(camera: &Camera) {
        let (front, right, up) = (camera.front(), camera.right(), camera.up());
        assert!((front.length() - 1.0).abs() < EPSILON);
        assert!((right.length() - 1.0).abs() < EPSILON);
        assert!((up.length() - 1.0).abs() < EPSILON);
        assert!(front.dot(right).abs() < EPSILON);
        assert!(front.dot(up).abs() < EPSILON);
        assert!(right.dot(up).abs() < EPSILON);
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = Camera::default();
        assert!(camera.front().abs_diff_eq(Vec3::NEG_Z, EPSILON));
        assert!(camera.right().abs_diff_eq(Vec3::X, EPSILON));
        assert!(camera.up().abs_diff_eq(Vec3::Y, EPSILON));
        assert_eq!(camera.zoom(), 45.0);
    }

    #[test]
    fn forward_for_one_second_moves_by_speed() {
        let mut camera = Camera::default();
        camera.process_keyboard(CameraMovement::Forward, 1.0);
        assert!(camera.position().abs_diff_eq(Vec3::new(0.0, 0.0, 0.5), EPSILON));
    }

    #[test]
    fn strafing_follows_right_vector() {
        let mut camera = Camera::default();
        camera.process_keyboard(CameraMovement::Right, 2.0);
        assert!(camera.position().abs_diff_eq(Vec3::new(5.0, 0.0, 3.0), EPSILON));
        camera.process_keyboard(CameraMovement::Left, 2.0);
        camera.process_keyboard(CameraMovement::Backward, 0.4);
        assert!(camera.position().abs_diff_eq(Vec3::new(0.0, 0.0, 4.0), EPSILON));
    }

    #[test]
    fn zero_delta_time_does_not_move() {
        let mut camera = Camera::default();
        for direction in [
            CameraMovement::Forward,
            CameraMovement::Backward,
            CameraMovement::Left,
            CameraMovement::Right,
        ] {
            camera.process_keyboard(direction, 0.0);
        }
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn pitch_is_clamped_for_any_input() {
        let mut camera = Camera::default();
        let offsets = [1.0e6, -3.0e5, 890.0, -1780.0, 42.0, f32::MAX / 1.0e10, -7.5];
        for (i, y) in offsets.iter().cycle().take(200).enumerate() {
            camera.process_mouse_movement(i as f32 * 3.0, *y);
            assert!(camera.pitch() <= PITCH_LIMIT && camera.pitch() >= -PITCH_LIMIT);
            assert_orthonormal(&camera);
        }
    }

    #[test]
    fn basis_stays_orthonormal_at_pitch_limits() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(0.0, 10_000.0);
        assert_eq!(camera.pitch(), PITCH_LIMIT);
        assert_orthonormal(&camera);
        camera.process_mouse_movement(1234.0, -20_000.0);
        assert_eq!(camera.pitch(), -PITCH_LIMIT);
        assert_orthonormal(&camera);
    }

    #[test]
    fn zero_mouse_movement_is_idempotent() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(35.0, -12.0);
        let snapshot = camera.clone();
        for _ in 0..10 {
            camera.process_mouse_movement(0.0, 0.0);
        }
        assert_eq!(camera, snapshot);
    }

    #[test]
    fn mouse_movement_scales_by_sensitivity() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(100.0, 50.0);
        assert!((camera.yaw() - (-80.0)).abs() < EPSILON);
        assert!((camera.pitch() - 5.0).abs() < EPSILON);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = Camera::default();
        camera.process_mouse_scroll(-5.0);
        assert_eq!(camera.zoom(), MAX_ZOOM);
        for _ in 0..20 {
            camera.process_mouse_scroll(-1000.0);
            assert_eq!(camera.zoom(), MAX_ZOOM);
        }
        camera.process_mouse_scroll(10.0);
        assert_eq!(camera.zoom(), 35.0);
        camera.process_mouse_scroll(1000.0);
        assert_eq!(camera.zoom(), MIN_ZOOM);
    }

    #[test]
    fn view_matrix_is_orthonormal_look_at() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(250.0, 120.0);
        camera.process_keyboard(CameraMovement::Forward, 0.7);
        let view = camera.view_matrix();
        let rotation = glam::Mat3::from_mat4(view);
        let product = rotation * rotation.transpose();
        assert!(product.abs_diff_eq(glam::Mat3::IDENTITY, EPSILON));
        let eye = view.transform_point3(camera.position());
        assert!(eye.abs_diff_eq(Vec3::ZERO, EPSILON));
        let ahead = view.transform_point3(camera.position() + camera.front());
        assert!(ahead.abs_diff_eq(Vec3::NEG_Z, EPSILON));
    }

    #[test]
    fn projection_uses_zoom_as_field_of_view() {
        let camera = Camera::default();
        let projection = camera.projection_matrix(800.0 / 600.0);
        let expected = Mat4::perspective_rh(45f32.to_radians(), 800.0 / 600.0, 0.1, 100.0);
        assert!(projection.abs_diff_eq(expected, EPSILON));
    }
}
