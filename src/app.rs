//! Window host: turns winit events into viewer events and carries out viewer commands.

use crate::config::ViewerConfig;
use crate::input::InputEvent;
use crate::loader::AssetLoader;
use crate::time::FrameClock;
use crate::viewer::{Viewer, ViewerCommand};
use anyhow::{Context, Result};
use log::{debug, error, warn};
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{CursorGrabMode, Window, WindowId};

// Commands can cascade (a late capture in orbit asks for an immediate release).
const MAX_COMMAND_ROUNDS: usize = 4;

pub fn run(config: ViewerConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create winit event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = ViewerApp::new(config);
    event_loop.run_app(&mut app).context("Event loop execution failed")?;
    Ok(())
}

pub struct ViewerApp {
    config: ViewerConfig,
    viewer: Viewer,
    loader: Option<AssetLoader>,
    clock: FrameClock,
    window: Option<Arc<Window>>,
    last_title: String,
    should_close: bool,
}

impl ViewerApp {
    pub fn new(config: ViewerConfig) -> Self {
        let viewer = Viewer::new(&config);
        let clock = FrameClock::new(config.navigation.max_frame_dt);
        Self {
            config,
            viewer,
            loader: None,
            clock,
            window: None,
            last_title: String::new(),
            should_close: false,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        if self.window.is_some() {
            return Ok(());
        }
        let size = PhysicalSize::new(self.config.window.width, self.config.window.height);
        let attrs = Window::default_attributes().with_title(self.config.window.title.clone()).with_inner_size(size);
        let window = Arc::new(event_loop.create_window(attrs).context("Failed to create window")?);
        self.viewer.on_resize(window.inner_size());
        self.window = Some(window);
        Ok(())
    }

    fn frame(&mut self) {
        if let Some(loader) = self.loader.as_mut() {
            for event in loader.drain_events() {
                self.viewer.on_load_event(event);
            }
        }
        let tick = self.clock.tick();
        if let Some(raw) = tick.stalled {
            debug!("[viewer] frame stalled for {raw:.3}s; capped to {:.3}s", tick.dt);
        }
        self.viewer.tick(tick.dt);
        self.apply_commands();
        self.refresh_title();
    }

    fn apply_commands(&mut self) {
        for _ in 0..MAX_COMMAND_ROUNDS {
            let commands = self.viewer.drain_commands();
            if commands.is_empty() {
                return;
            }
            for command in commands {
                self.apply_command(command);
            }
        }
        warn!("[viewer] pointer capture commands did not settle");
    }

    fn apply_command(&mut self, command: ViewerCommand) {
        let Some(window) = self.window.clone() else {
            return;
        };
        match command {
            ViewerCommand::RequestPointerCapture => {
                let grabbed = window
                    .set_cursor_grab(CursorGrabMode::Locked)
                    .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
                match grabbed {
                    Ok(()) => {
                        window.set_cursor_visible(false);
                        self.viewer.on_pointer_lock_changed(true);
                    }
                    Err(err) => self.viewer.on_pointer_capture_denied(err.to_string()),
                }
            }
            ViewerCommand::ReleasePointerCapture => self.release_capture(&window),
        }
    }

    fn release_capture(&mut self, window: &Window) {
        if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
            warn!("[viewer] cursor release failed: {err}");
        }
        window.set_cursor_visible(true);
        self.viewer.on_pointer_lock_changed(false);
    }

    /// The window title doubles as the status line and progress display.
    fn refresh_title(&mut self) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        let mut title = format!("{} | {}", self.config.window.title, self.viewer.status());
        if let (Some(pct), true) = (self.viewer.load_percent(), self.viewer.scene().is_none()) {
            title.push_str(&format!(" {pct}%"));
        }
        if title != self.last_title {
            window.set_title(&title);
            self.last_title = title;
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.ensure_window(event_loop) {
            error!("[viewer] window initialization error: {err:?}");
            self.should_close = true;
            return;
        }
        if self.loader.is_none() {
            self.loader = Some(AssetLoader::spawn(self.config.model.path.clone()));
        }
    }

    fn window_event(&mut self, _el: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match &event {
            WindowEvent::CloseRequested => self.should_close = true,
            WindowEvent::Resized(size) => self.viewer.on_resize(*size),
            WindowEvent::RedrawRequested => self.frame(),
            // Losing focus or pressing Escape drops capture outside of any viewer request.
            WindowEvent::Focused(false) if self.viewer.pointer_locked() => {
                if let Some(window) = self.window.clone() {
                    self.release_capture(&window);
                }
            }
            WindowEvent::KeyboardInput {
                event: KeyEvent { logical_key: Key::Named(NamedKey::Escape), state: ElementState::Pressed, .. },
                ..
            } => {
                if self.viewer.pointer_locked() {
                    if let Some(window) = self.window.clone() {
                        self.release_capture(&window);
                    }
                }
            }
            _ => self.viewer.handle_input(&InputEvent::from_window_event(&event)),
        }
        self.apply_commands();
    }

    fn device_event(&mut self, _e: &ActiveEventLoop, _dev: winit::event::DeviceId, ev: DeviceEvent) {
        self.viewer.handle_input(&InputEvent::from_device_event(&ev));
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_close {
            event_loop.exit();
            return;
        }
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}
