use std::sync::Arc;

use glam::Vec2;
use lootchest_assets::Resources;
use lootchest_core::Sizes;
use lootchest_input::{
    logical::InputMap,
    physical::{InputState, MouseButtonId, PhysicalInputId},
};
use lootchest_renderer::{RenderError, WgpuRenderer};
use lootchest_world::{AudioBackend, Experience, ExperienceConfig};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

/// Pixels of touchpad scroll that count as one wheel line.
const PIXELS_PER_LINE: f32 = 40.0;

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Os(#[from] winit::error::OsError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Called once per frame after input is resolved and before the experience
/// ticks.
pub type FrameHook = Box<dyn FnMut(&InputState, &mut Experience<WgpuRenderer>)>;

/// Everything needed to build the experience once the OS hands us a window.
pub struct ExperienceSetup {
    pub title: String,
    pub config: ExperienceConfig,
    pub resources: Resources,
    pub audio: Box<dyn AudioBackend>,
    pub input_map: InputMap,
    pub on_frame: FrameHook,
}

struct PendingExperience {
    config: ExperienceConfig,
    resources: Resources,
    audio: Box<dyn AudioBackend>,
}

// Holds the experience while waiting for the OS
struct ExperienceRunner {
    title: String,
    pending: Option<PendingExperience>,
    window: Option<Arc<Window>>,
    experience: Option<Experience<WgpuRenderer>>,
    input: InputState,
    input_map: InputMap,
    on_frame: FrameHook,
    error: Option<WindowError>,
}

impl ExperienceRunner {
    fn new(setup: ExperienceSetup) -> Self {
        Self {
            title: setup.title,
            pending: Some(PendingExperience {
                config: setup.config,
                resources: setup.resources,
                audio: setup.audio,
            }),
            window: None,
            experience: None,
            input: InputState::default(),
            input_map: setup.input_map,
            on_frame: setup.on_frame,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), WindowError> {
        let window = Arc::new(
            event_loop.create_window(Window::default_attributes().with_title(self.title.as_str()))?,
        );
        let PhysicalSize { width, height } = window.inner_size();
        let sizes = Sizes::new(width, height, window.scale_factor() as f32);

        let renderer = WgpuRenderer::new(Arc::clone(&window), &sizes)?;
        if let Some(pending) = self.pending.take() {
            self.experience = Some(Experience::new(
                pending.config,
                sizes,
                renderer,
                pending.resources,
                pending.audio,
            ));
        }
        self.window = Some(window);
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(experience) = self.experience.as_mut() {
            experience.destroy();
        }
        event_loop.exit();
    }

    fn redraw(&mut self) {
        let Some(experience) = self.experience.as_mut() else {
            return;
        };

        self.input_map.resolve(&mut self.input);
        (self.on_frame)(&self.input, experience);
        experience.tick();
        self.input.end_frame();

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for ExperienceRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            log::error!("cannot start the experience: {err}");
            self.error = Some(err);
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::Resized(size) => {
                let scale = self.window.as_ref().map_or(1.0, |w| w.scale_factor() as f32);
                if let Some(experience) = self.experience.as_mut() {
                    experience.resize(size.width, size.height, scale);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let (Some(window), Some(experience)) = (&self.window, self.experience.as_mut()) {
                    let size = window.inner_size();
                    experience.resize(size.width, size.height, scale_factor as f32);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                self.input
                    .set_button(PhysicalInputId::key(code as u16), state == ElementState::Pressed);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.input.set_button(
                    PhysicalInputId::mouse(mouse_button_id(button)),
                    state == ElementState::Pressed,
                );
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .pointer_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => self.input.pointer_left(),
            WindowEvent::MouseWheel { delta, .. } => {
                self.input.wheel_scrolled(wheel_lines(delta));
            }
            WindowEvent::CloseRequested => {
                log::info!("close requested; stopping");
                self.shutdown(event_loop);
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => (),
        }
    }
}

fn mouse_button_id(button: MouseButton) -> MouseButtonId {
    match button {
        MouseButton::Left => MouseButtonId::Left,
        MouseButton::Right => MouseButtonId::Right,
        MouseButton::Middle => MouseButtonId::Middle,
        MouseButton::Back => MouseButtonId::Back,
        MouseButton::Forward => MouseButtonId::Forward,
        MouseButton::Other(id) => MouseButtonId::Other(id),
    }
}

fn wheel_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
    }
}

/// Opens the window and runs the experience until it is closed.
pub fn run_experience(setup: ExperienceSetup) -> Result<(), WindowError> {
    let event_loop = EventLoop::new()?;

    // Redraw continuously; animations and physics run every frame.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = ExperienceRunner::new(setup);
    event_loop.run_app(&mut runner)?;

    match runner.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use winit::dpi::PhysicalPosition;

    use super::*;

    #[test]
    fn mouse_buttons_map_one_to_one() {
        assert_eq!(mouse_button_id(MouseButton::Left), MouseButtonId::Left);
        assert_eq!(mouse_button_id(MouseButton::Other(9)), MouseButtonId::Other(9));
    }

    #[test]
    fn pixel_scroll_is_converted_to_lines() {
        assert_eq!(wheel_lines(MouseScrollDelta::LineDelta(0.0, -2.0)), -2.0);
        let pixels = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 80.0));
        assert_eq!(wheel_lines(pixels), 2.0);
    }
}
