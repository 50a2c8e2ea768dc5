//! Application context for the render loop.
//!
//! All state that changes from frame to frame (camera, timing, mouse
//! tracking, held keys, pending events) lives in [`AppContext`]. The window
//! system only ever pushes [`InputEvent`]s; the context drains them once per
//! frame, in arrival order, and then produces the [`FrameParams`] the renderer
//! draws with.

use glam::{Mat4, Vec2, Vec3};
use log::{debug, info};

use crate::camera::{Camera, CameraMovement};
use crate::input::{EventQueue, InputEvent, InputState, MouseTracker};
use crate::lighting::{PointLight, SpotLight};
use crate::scene::SceneConfig;

pub const WINDOW_WIDTH: u32 = 800;
pub const WINDOW_HEIGHT: u32 = 600;
pub const WINDOW_TITLE: &str = "Labyrinth";
pub const CLEAR_COLOR: Vec3 = Vec3::splat(0.1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Terminated,
}

/// Wall-clock bookkeeping in seconds since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameClock {
    last_frame: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a frame at `now` and returns the time since the previous one.
    /// A clock running backwards yields a zero delta.
    pub fn tick(&mut self, now: f32) -> f32 {
        let delta = (now - self.last_frame).max(0.0);
        self.last_frame = self.last_frame.max(now);
        delta
    }

    pub fn elapsed(&self) -> f32 {
        self.last_frame
    }
}

/// Per-frame matrices and light parameters handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub clear_color: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
    pub view_position: Vec3,
    pub point_light: PointLight,
    pub spot_light: SpotLight,
    pub model: Mat4,
    pub marker: Mat4,
}

#[derive(Debug)]
pub struct AppContext {
    config: SceneConfig,
    camera: Camera,
    clock: FrameClock,
    mouse: MouseTracker,
    input: InputState,
    events: EventQueue,
    viewport: (u32, u32),
    state: RunState,
}

impl AppContext {
    pub fn new(config: SceneConfig) -> Self {
        let mut camera = Camera::new(config.camera.position);
        camera.movement_speed = config.camera.speed;
        camera.mouse_sensitivity = config.camera.sensitivity;
        Self {
            config,
            camera,
            clock: FrameClock::new(),
            mouse: MouseTracker::new(Vec2::new(
                WINDOW_WIDTH as f32 / 2.0,
                WINDOW_HEIGHT as f32 / 2.0,
            )),
            input: InputState::new(),
            events: EventQueue::new(),
            viewport: (WINDOW_WIDTH, WINDOW_HEIGHT),
            state: RunState::Running,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn aspect_ratio(&self) -> f32 {
        let (width, height) = self.viewport;
        if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        }
    }

    /// Queues an event for the next frame.
    pub fn push_event(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn request_close(&mut self) {
        if self.state == RunState::Running {
            info!("close requested");
        }
        self.state = RunState::Terminated;
    }

    /// Runs the input half of a frame: timing, queued events, held keys.
    pub fn advance(&mut self, now: f32) {
        let delta = self.clock.tick(now);
        let mut events = std::mem::take(&mut self.events);
        for event in events.drain() {
            self.handle_event(event);
        }
        self.process_input(delta);
    }

    fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyPressed(key) => self.input.set_key_down(key),
            InputEvent::KeyReleased(key) => self.input.set_key_up(key),
            InputEvent::CursorMoved(position) => {
                let offset = self.mouse.offset(position);
                self.camera.process_mouse_movement(offset.x, offset.y);
            }
            InputEvent::MouseMotion(delta) => {
                // Raw motion uses screen orientation, y down.
                self.camera.process_mouse_movement(delta.x, -delta.y);
            }
            InputEvent::Scroll(yoffset) => self.camera.process_mouse_scroll(yoffset),
            InputEvent::Resized { width, height } => {
                debug!("viewport resized to {width}x{height}");
                self.viewport = (width, height);
            }
            InputEvent::FocusLost => self.input.release_all(),
            InputEvent::CloseRequested => self.request_close(),
        }
    }

    fn process_input(&mut self, delta: f32) {
        let bindings = self.config.bindings;
        if self.input.is_key_down(bindings.quit) {
            self.request_close();
        }
        let moves = [
            (bindings.forward, CameraMovement::Forward),
            (bindings.backward, CameraMovement::Backward),
            (bindings.left, CameraMovement::Left),
            (bindings.right, CameraMovement::Right),
        ];
        for (key, direction) in moves {
            if self.input.is_key_down(key) {
                self.camera.process_keyboard(direction, delta);
            }
        }
    }

    /// Builds the render half of a frame from the current state.
    pub fn frame_params(&self) -> FrameParams {
        FrameParams {
            clear_color: CLEAR_COLOR,
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(self.aspect_ratio()),
            view_position: self.camera.position(),
            point_light: self.config.light,
            spot_light: SpotLight::flashlight(&self.camera, &self.config.flashlight),
            model: self.model_matrix(),
            marker: self.marker_matrix(),
        }
    }

    /// Translate, scale, then spin about +Y by the elapsed time.
    pub fn model_matrix(&self) -> Mat4 {
        let transform = &self.config.model_transform;
        let angle = self.clock.elapsed() * transform.spin_speed.to_radians();
        Mat4::from_translation(transform.translation)
            * Mat4::from_scale(transform.scale)
            * Mat4::from_rotation_y(angle)
    }

    pub fn marker_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.config.light.position)
            * Mat4::from_scale(Vec3::splat(self.config.marker_scale))
    }
}
