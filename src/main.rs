use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use glam::Vec2;
use log::{error, info, warn};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode as WinitKey, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

use labyrinth::app::{WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH};
use labyrinth::{
    AppContext, InputEvent, KeyCode, Model, NamedKey, Renderer, SceneConfig, StartupError,
};

/// Scroll distance reported by touchpads that corresponds to one wheel notch.
const PIXELS_PER_LINE: f64 = 20.0;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(exit_status(&err));
    }
}

/// Window and graphics startup failures get their own status; everything
/// else is a generic failure.
fn exit_status(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<StartupError>().is_some() {
        StartupError::EXIT_STATUS
    } else {
        1
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let config = match &options.scene {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::default(),
    };
    let model = Model::load(&config.model_path)?;

    if options.summary_only {
        print_summary(&config, &model);
        return Ok(());
    }
    run_interactive(config, model)
}

fn print_summary(config: &SceneConfig, model: &Model) {
    println!("Model: {}", config.model_path.display());
    println!(
        "Meshes: {} ({} vertices, {} triangles)",
        model.meshes.len(),
        model.vertex_count(),
        model.triangle_count()
    );
    for (index, mesh) in model.meshes.iter().enumerate() {
        println!(
            " - mesh {index}: material={} triangles={}",
            mesh.material.as_deref().unwrap_or("<default>"),
            mesh.triangle_count()
        );
    }

    let mut names: Vec<_> = model.materials.keys().collect();
    names.sort();
    println!("Materials: {}", names.len());
    for name in names {
        let material = &model.materials[name];
        println!(
            " - {name}: diffuse={} specular={} shininess={:.1}",
            material.diffuse_map.as_deref().unwrap_or("-"),
            material.specular_map.as_deref().unwrap_or("-"),
            material.shininess
        );
    }

    let light = &config.light;
    println!(
        "Point light: pos=({:.2}, {:.2}, {:.2}) colour=({:.2}, {:.2}, {:.2})",
        light.position.x,
        light.position.y,
        light.position.z,
        light.colour.x,
        light.colour.y,
        light.colour.z
    );
    println!(
        "Flashlight: cutoff={:.1} outer={:.1}",
        config.flashlight.inner_degrees, config.flashlight.outer_degrees
    );
    let camera = &config.camera.position;
    println!("Camera: pos=({:.2}, {:.2}, {:.2})", camera.x, camera.y, camera.z);
}

fn run_interactive(config: SceneConfig, model: Model) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| StartupError::window("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, model);
    event_loop
        .run_app(&mut app)
        .map_err(|err| anyhow!("event loop terminated abnormally: {err}"))?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct App {
    context: AppContext,
    model: Model,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    start: Instant,
    raw_motion: bool,
    focused: bool,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: SceneConfig, model: Model) -> Self {
        Self {
            context: AppContext::new(config),
            model,
            window: None,
            renderer: None,
            start: Instant::now(),
            raw_motion: false,
            focused: true,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH as f64, WINDOW_HEIGHT as f64));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| StartupError::window("window", err))?,
        );

        self.raw_motion = grab_cursor(&window);
        window.set_cursor_visible(false);

        let renderer = block_on(Renderer::new(
            Arc::clone(&window),
            &self.model,
            &self.context.config().shaders,
        ))?;
        let size = window.inner_size();
        self.context.push_event(InputEvent::Resized {
            width: size.width,
            height: size.height,
        });
        info!("window ready ({}x{})", size.width, size.height);

        self.window = Some(window);
        self.renderer = Some(renderer);
        self.start = Instant::now();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.error = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.context.advance(self.start.elapsed().as_secs_f32());
        if !self.context.is_running() {
            info!("shutting down");
            event_loop.exit();
            return;
        }
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let frame = self.context.frame_params();
        match renderer.render(&frame) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => renderer.reconfigure(),
            Err(wgpu::SurfaceError::Timeout) => info!("surface timeout; retrying next frame"),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("GPU is out of memory");
                self.fail(event_loop, anyhow!("GPU is out of memory"));
            }
            Err(other) => warn!("skipping frame: {other}"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if window_id != renderer.window_id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.context.push_event(InputEvent::CloseRequested),
            WindowEvent::Resized(size) => {
                renderer.resize(size);
                self.context.push_event(InputEvent::Resized {
                    width: size.width,
                    height: size.height,
                });
            }
            WindowEvent::Focused(focused) => {
                self.focused = focused;
                if !focused {
                    self.context.push_event(InputEvent::FocusLost);
                } else if let Some(window) = self.window.as_ref() {
                    self.raw_motion = grab_cursor(window);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let Some(key) = map_keycode(code) else {
                    return;
                };
                self.context.push_event(match event.state {
                    ElementState::Pressed => InputEvent::KeyPressed(key),
                    ElementState::Released => InputEvent::KeyReleased(key),
                });
            }
            WindowEvent::CursorMoved { position, .. } if !self.raw_motion => {
                self.context
                    .push_event(InputEvent::CursorMoved(Vec2::new(position.x as f32, position.y as f32)));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_LINE) as f32,
                };
                self.context.push_event(InputEvent::Scroll(lines));
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if !self.raw_motion || !self.focused {
            return;
        }
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.context
                .push_event(InputEvent::MouseMotion(Vec2::new(dx as f32, dy as f32)));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

/// Confines the cursor to the window, falling back to locking it. Returns
/// true when either grab took hold; look control then reads raw device
/// motion, since a grabbed cursor position stops at the window edge.
fn grab_cursor(window: &Window) -> bool {
    match window.set_cursor_grab(CursorGrabMode::Confined) {
        Ok(()) => true,
        Err(confined) => match window.set_cursor_grab(CursorGrabMode::Locked) {
            Ok(()) => true,
            Err(locked) => {
                warn!("cursor grab unavailable: {confined}; {locked}");
                false
            }
        },
    }
}

fn map_keycode(code: WinitKey) -> Option<KeyCode> {
    let key = match code {
        WinitKey::Space => KeyCode::Named(NamedKey::Space),
        WinitKey::Enter => KeyCode::Named(NamedKey::Enter),
        WinitKey::Tab => KeyCode::Named(NamedKey::Tab),
        WinitKey::ArrowLeft => KeyCode::Named(NamedKey::Left),
        WinitKey::ArrowRight => KeyCode::Named(NamedKey::Right),
        WinitKey::ArrowUp => KeyCode::Named(NamedKey::Up),
        WinitKey::ArrowDown => KeyCode::Named(NamedKey::Down),
        WinitKey::Escape => KeyCode::Named(NamedKey::Escape),
        WinitKey::ShiftLeft => KeyCode::Named(NamedKey::LeftShift),
        WinitKey::ShiftRight => KeyCode::Named(NamedKey::RightShift),
        WinitKey::ControlLeft => KeyCode::Named(NamedKey::LeftCtrl),
        WinitKey::ControlRight => KeyCode::Named(NamedKey::RightCtrl),
        WinitKey::Digit0 => KeyCode::Digit(0),
        WinitKey::Digit1 => KeyCode::Digit(1),
        WinitKey::Digit2 => KeyCode::Digit(2),
        WinitKey::Digit3 => KeyCode::Digit(3),
        WinitKey::Digit4 => KeyCode::Digit(4),
        WinitKey::Digit5 => KeyCode::Digit(5),
        WinitKey::Digit6 => KeyCode::Digit(6),
        WinitKey::Digit7 => KeyCode::Digit(7),
        WinitKey::Digit8 => KeyCode::Digit(8),
        WinitKey::Digit9 => KeyCode::Digit(9),
        WinitKey::KeyA => KeyCode::Character('A'),
        WinitKey::KeyB => KeyCode::Character('B'),
        WinitKey::KeyC => KeyCode::Character('C'),
        WinitKey::KeyD => KeyCode::Character('D'),
        WinitKey::KeyE => KeyCode::Character('E'),
        WinitKey::KeyF => KeyCode::Character('F'),
        WinitKey::KeyG => KeyCode::Character('G'),
        WinitKey::KeyH => KeyCode::Character('H'),
        WinitKey::KeyI => KeyCode::Character('I'),
        WinitKey::KeyJ => KeyCode::Character('J'),
        WinitKey::KeyK => KeyCode::Character('K'),
        WinitKey::KeyL => KeyCode::Character('L'),
        WinitKey::KeyM => KeyCode::Character('M'),
        WinitKey::KeyN => KeyCode::Character('N'),
        WinitKey::KeyO => KeyCode::Character('O'),
        WinitKey::KeyP => KeyCode::Character('P'),
        WinitKey::KeyQ => KeyCode::Character('Q'),
        WinitKey::KeyR => KeyCode::Character('R'),
        WinitKey::KeyS => KeyCode::Character('S'),
        WinitKey::KeyT => KeyCode::Character('T'),
        WinitKey::KeyU => KeyCode::Character('U'),
        WinitKey::KeyV => KeyCode::Character('V'),
        WinitKey::KeyW => KeyCode::Character('W'),
        WinitKey::KeyX => KeyCode::Character('X'),
        WinitKey::KeyY => KeyCode::Character('Y'),
        WinitKey::KeyZ => KeyCode::Character('Z'),
        _ => return None,
    };
    Some(key)
}

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    scene: Option<PathBuf>,
    summary_only: bool,
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        for arg in args {
            match arg.as_str() {
                "--summary-only" => options.summary_only = true,
                flag if flag.starts_with("--") => {
                    return Err(anyhow!(
                        "Unknown argument: {flag}. Usage: labyrinth [scene.xml] [--summary-only]"
                    ));
                }
                path if options.scene.is_none() => options.scene = Some(PathBuf::from(path)),
                extra => return Err(anyhow!("Unexpected argument: {extra}")),
            }
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn no_arguments_use_the_builtin_scene() {
        assert_eq!(parse(&[]).unwrap(), CliOptions::default());
    }

    #[test]
    fn scene_and_flag_in_any_order() {
        let options = parse(&["--summary-only", "scene.xml"]).unwrap();
        assert_eq!(options.scene, Some(PathBuf::from("scene.xml")));
        assert!(options.summary_only);
    }

    #[test]
    fn rejects_unknown_flags_and_extra_paths() {
        assert!(parse(&["--run-scripts"]).is_err());
        assert!(parse(&["a.xml", "b.xml"]).is_err());
    }

    #[test]
    fn startup_failures_exit_with_reserved_status() {
        let err: anyhow::Error = StartupError::graphics("adapter", "none found").into();
        assert_eq!(exit_status(&err), -1);
        let err = err.context("renderer setup");
        assert_eq!(exit_status(&err), -1);
    }

    #[test]
    fn other_failures_exit_with_one() {
        assert_eq!(exit_status(&anyhow!("unable to read model")), 1);
    }

    #[test]
    fn maps_movement_keys() {
        assert_eq!(map_keycode(WinitKey::KeyW), Some(KeyCode::Character('W')));
        assert_eq!(map_keycode(WinitKey::Escape), Some(KeyCode::Named(NamedKey::Escape)));
        assert_eq!(map_keycode(WinitKey::F1), None);
    }
}
