//! Stereo Video Core - top/bottom stereoscopic video player
//!
//! Shows a stereo video on a virtual screen. Each half of the packed frame is
//! mapped onto its own plane and the planes are split across per-eye camera
//! layers, so in immersive mode every eye sees only its half. Runs as an
//! Android NativeActivity or as a desktop window.

use std::sync::Arc;

use log::{error, info};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, TouchPhase, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

pub mod camera;
pub mod caption;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod frame_driver;
pub mod geometry;
pub mod layers;
pub mod renderer;
pub mod scene;
pub mod sensors;
pub mod ui;
pub mod uv;
pub mod video;
#[cfg(target_os = "android")]
mod video_ndk;

use caption::EguiTextRenderer;
use config::PlayerConfig;
use context::AppContext;
use error::AppError;
use ui::{SessionButton, SessionIntent};

/// Main application state
struct StereoApp {
    context: AppContext,
    window: Option<Arc<Window>>,
    renderer: Option<renderer::Renderer>,

    // UI State
    egui_state: Option<egui_winit::State>,
    session_button: Option<SessionButton>,

    /// First fatal error, returned once the event loop exits
    error: Option<AppError>,
}

impl StereoApp {
    fn new(config: PlayerConfig) -> Self {
        let text_renderer = EguiTextRenderer::new();
        Self {
            context: AppContext::new(config, &text_renderer),
            window: None,
            renderer: None,
            egui_state: None,
            session_button: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        error!("Fatal: {}", err);
        self.error.get_or_insert(err);
        event_loop.exit();
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let window_attrs = Window::default_attributes().with_title("Stereo Video");
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let renderer = pollster::block_on(renderer::Renderer::new(window.clone(), self.context.scene()))?;
        info!("Renderer initialized");

        let ctx = egui::Context::default();
        self.session_button = Some(SessionButton::new(&ctx, self.context.driver().immersive_supported()));
        self.egui_state = Some(egui_winit::State::new(
            ctx,
            egui::ViewportId::ROOT,
            event_loop,
            Some(window.scale_factor() as f32),
            None,
            None,
        ));

        self.renderer = Some(renderer);
        self.window = Some(window.clone());
        self.sync_size(&window);
        window.request_redraw();
        Ok(())
    }

    /// Feed the window's current size into the context (logical units)
    fn sync_size(&mut self, window: &Window) {
        let scale = window.scale_factor();
        let logical = window.inner_size().to_logical::<f64>(scale);
        self.context.handle_resize(logical.width, logical.height, scale);
    }

    fn apply_intent(&mut self, intent: SessionIntent) {
        match intent {
            SessionIntent::Enter => {
                self.context.request_immersive();
            }
            SessionIntent::Exit => {
                self.context.end_immersive();
            }
        }
    }

    fn redraw(&mut self) {
        let Some(window) = self.window.clone() else { return };

        let mut intent = None;
        let mut ui_ctx = None;
        let mut ui_output = None;
        if let (Some(state), Some(button)) = (&mut self.egui_state, &self.session_button) {
            let raw_input = state.take_egui_input(&window);
            let presentation = self.context.driver().state();
            let mut full_output = state.egui_ctx().run(raw_input, |ctx| {
                intent = button.show(ctx, presentation);
            });
            state.handle_platform_output(&window, std::mem::take(&mut full_output.platform_output));
            ui_ctx = Some(state.egui_ctx().clone());
            ui_output = Some(full_output);
        }
        if let Some(intent) = intent {
            self.apply_intent(intent);
        }

        if let (Some(plan), Some(renderer)) = (self.context.tick(), &mut self.renderer) {
            renderer.update_video(self.context.video());
            renderer.render(&plan, self.context.scene(), ui_ctx.as_ref().zip(ui_output));
        }

        window.request_redraw();
    }
}

impl ApplicationHandler for StereoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        info!("App resumed - creating window");
        if let Err(e) = self.create_window(event_loop) {
            self.fail(event_loop, e);
            return;
        }
        self.context.start();
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        info!("App suspended - releasing GPU resources");
        self.context.stop();
        self.renderer = None;
        self.egui_state = None;
        self.session_button = None;
        self.window = None;
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        // Any press counts as the activation gesture, including ones egui handles
        let gesture = matches!(
            event,
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                ..
            }
        ) || matches!(&event, WindowEvent::Touch(touch) if touch.phase == TouchPhase::Started);
        if gesture {
            self.context.activate();
        }

        // Pass event to egui
        let response = if let (Some(state), Some(window)) = (&mut self.egui_state, &self.window) {
            state.on_window_event(window, &event)
        } else {
            Default::default()
        };
        if response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                self.context.stop();
                event_loop.exit();
            }

            WindowEvent::RedrawRequested => self.redraw(),

            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size.width, size.height);
                }
                if let Some(window) = self.window.clone() {
                    self.sync_size(&window);
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = self.window.clone() {
                    self.sync_size(&window);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                if let Key::Named(NamedKey::Escape | NamedKey::GoBack | NamedKey::BrowserBack) = event.logical_key {
                    if self.context.end_immersive() {
                        info!("Immersive session ended by the platform");
                    }
                }
            }

            _ => {}
        }
    }
}

/// Desktop entry point; the caller sets up logging
#[cfg(not(target_os = "android"))]
pub fn run_desktop() -> Result<(), AppError> {
    let config = PlayerConfig::from_env();
    info!("Stereo video starting with {:?}", config);

    let event_loop = EventLoop::new()?;
    let mut app = StereoApp::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Android entry point
#[cfg(target_os = "android")]
#[no_mangle]
fn android_main(app: android_activity::AndroidApp) {
    use winit::platform::android::EventLoopBuilderExtAndroid;

    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag("StereoVideo"),
    );

    info!("Stereo video starting...");

    let event_loop = match EventLoop::builder().with_android_app(app).build() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("Failed to create event loop: {}", e);
            return;
        }
    };

    let mut stereo_app = StereoApp::new(PlayerConfig::from_env());
    if let Err(e) = event_loop.run_app(&mut stereo_app) {
        error!("Event loop failed: {}", e);
    }
    if let Some(e) = stereo_app.error.take() {
        error!("Exited with error: {}", e);
    }
}
