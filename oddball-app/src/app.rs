use anyhow::{anyhow, Result};
use oddball_core::{Color, Stimulus};
use oddball_experiment::{Display, Key, TaskError, TaskResult};
use oddball_render::{FontVec, SkiaRenderer};
use oddball_timing::Timer;
use pixels::{Pixels, SurfaceTexture};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

use crate::cli::Placement;

/// Messages from the session thread to the window.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayCommand {
    Show(Stimulus),
    Close,
}

/// Session-side handle: each flip posts the drawn stimulus to the event loop.
pub struct WindowDisplay {
    proxy: EventLoopProxy<DisplayCommand>,
    pending: Option<Stimulus>,
}

impl WindowDisplay {
    pub fn new(proxy: EventLoopProxy<DisplayCommand>) -> Self {
        Self {
            proxy,
            pending: None,
        }
    }
}

impl Display for WindowDisplay {
    fn draw(&mut self, stimulus: &Stimulus) {
        self.pending = Some(stimulus.clone());
    }

    fn flip(&mut self) -> TaskResult<()> {
        let Some(stimulus) = self.pending.take() else {
            return Ok(());
        };
        self.proxy
            .send_event(DisplayCommand::Show(stimulus))
            .map_err(|_| TaskError::Display("window closed".into()))
    }
}

/// Scanner and response box both arrive as keyboard input.
pub fn key_for(key: PhysicalKey) -> Option<Key> {
    match key {
        PhysicalKey::Code(KeyCode::KeyT) => Some(Key::Pulse),
        PhysicalKey::Code(KeyCode::KeyB) => Some(Key::Response),
        PhysicalKey::Code(KeyCode::KeyQ | KeyCode::Escape) => Some(Key::Quit),
        PhysicalKey::Code(_) => Some(Key::Other),
        PhysicalKey::Unidentified(_) => None,
    }
}

/// Owns the window, the pixel surface and the renderer. Runs on the main thread.
pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    font: Option<FontVec>,
    placement: Placement,
    keys: Sender<Key>,
    stimulus: Stimulus,
    refresh_rate: Option<f64>,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(placement: Placement, font: Option<FontVec>, keys: Sender<Key>) -> Self {
        Self {
            window: None,
            pixels: None,
            renderer: None,
            font,
            placement,
            keys,
            stimulus: Stimulus::blank(Color::BLACK),
            refresh_rate: None,
            error: None,
        }
    }

    /// First window error, if the event loop stopped because of one.
    pub fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .available_monitors()
            .nth(self.placement.screen)
            .or_else(|| {
                warn!(screen = self.placement.screen, "screen not found, using primary");
                event_loop.primary_monitor()
            })
            .or_else(|| event_loop.available_monitors().next());

        self.refresh_rate = monitor
            .as_ref()
            .and_then(|m| m.refresh_rate_millihertz())
            .map(|rate| rate as f64 / 1000.0);

        let (w, h) = self.placement.size;
        let mut window_attributes = Window::default_attributes()
            .with_title("Oddball")
            .with_resizable(false);
        if self.placement.fullscreen {
            let monitor = monitor.ok_or_else(|| anyhow!("no monitor available"))?;
            window_attributes =
                window_attributes.with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
        } else {
            window_attributes = window_attributes.with_inner_size(PhysicalSize::new(w, h));
            if let Some(m) = &monitor {
                window_attributes = window_attributes.with_position(m.position());
            }
        }

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();

        info!(
            width = physical_size.width,
            height = physical_size.height,
            scale = window.scale_factor(),
            refresh_hz = self.refresh_rate,
            fullscreen = self.placement.fullscreen,
            "display ready"
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);
        self.renderer = Some(SkiaRenderer::new(
            physical_size.width,
            physical_size.height,
            self.font.take(),
        )?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pix), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };

        let stats = renderer.render(&self.stimulus, pix.frame_mut())?;
        let now = renderer.timer().now();
        pix.render()?;
        let present = renderer.timer().elapsed(now);

        trace!(
            draw_ms = stats.draw.as_secs_f64() * 1e3,
            copy_ms = stats.copy.as_secs_f64() * 1e3,
            present_ms = present.as_secs_f64() * 1e3,
            "frame"
        );
        Ok(())
    }

    fn handle_input(&mut self, key: PhysicalKey) {
        let Some(key) = key_for(key) else { return };
        debug!(?key, "key");
        if self.keys.send(key).is_err() {
            trace!("session no longer listening");
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                warn!(%e, "failed to resize surface");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                warn!(%e, "failed to resize buffer");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                warn!(%e, "failed to resize renderer");
            }
        }
        debug!(width = new_size.width, height = new_size.height, "display resized");
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!(%err, "display failed");
        self.error.get_or_insert(err);
        // Unblocks the session so it closes its log.
        let _ = self.keys.send(Key::Quit);
        self.cleanup_and_exit(event_loop);
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        if let Some(renderer) = &self.renderer {
            let stats = renderer.timer().calibration_stats();
            if stats.samples > 0 {
                info!(
                    frames = stats.samples,
                    avg_ms = stats.average_frame_time_ns / 1e6,
                    jitter_ms = stats.jitter_ns / 1e6,
                    "render timing"
                );
            }
        }
        event_loop.exit();
    }
}

impl ApplicationHandler<DisplayCommand> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.fail(event_loop, e.context("creating window and surface"));
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, command: DisplayCommand) {
        match command {
            DisplayCommand::Show(stimulus) => {
                self.stimulus = stimulus;
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            DisplayCommand::Close => self.cleanup_and_exit(event_loop),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            // The session sees a quit and answers with Close once its log is shut.
            WindowEvent::CloseRequested => self.handle_input(PhysicalKey::Code(KeyCode::Escape)),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    self.fail(event_loop, e);
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                self.handle_input(event.physical_key);
            }
            WindowEvent::Resized(sz) => self.handle_resize(sz),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }
}
