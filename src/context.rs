//! Application context
//!
//! Owns everything the player needs between frames: the fixed scene, the
//! viewer, the output surface, the frame driver, head tracking and the video
//! feed. The windowing layer forwards events here and asks for a
//! [`FramePlan`] on every redraw; the GPU renderer executes that plan.

use std::time::Instant;

use glam::Mat4;
use log::info;

use crate::caption::TextRenderer;
use crate::camera::Viewer;
use crate::config::{hex_to_rgb, PlayerConfig};
use crate::display::DisplaySurface;
use crate::frame_driver::{FrameDriver, PresentationState};
use crate::layers::Layers;
use crate::scene::{build_scene, Scene};
use crate::sensors::MotionSensors;
use crate::uv::Eye;
use crate::video::VideoFeed;

/// Pixel rectangle in the drawing buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// One camera's pass over the scene
#[derive(Debug, Clone)]
pub struct EyeView {
    /// `None` for the single 2D view
    pub eye: Option<Eye>,
    pub viewport: Viewport,
    pub view_projection: Mat4,
    pub layers: Layers,
    /// Scene surface indices, opaque first then transparent
    pub draws: Vec<usize>,
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone)]
pub struct FramePlan {
    pub state: PresentationState,
    /// sRGB components in 0..1 from the configured background
    pub clear_color: [f32; 3],
    pub views: Vec<EyeView>,
}

pub struct AppContext {
    config: PlayerConfig,
    scene: Scene,
    viewer: Viewer,
    display: DisplaySurface,
    driver: FrameDriver,
    sensors: MotionSensors,
    video: VideoFeed,
    activated: bool,
    last_tick: Option<Instant>,
}

impl AppContext {
    pub fn new(config: PlayerConfig, text_renderer: &dyn TextRenderer) -> Self {
        let scene = build_scene(&config, text_renderer);
        let driver = FrameDriver::new(config.immersive_supported);
        let video = VideoFeed::new(config.video.clone());
        info!("AppContext created (immersive supported: {})", config.immersive_supported);

        Self {
            config,
            scene,
            viewer: Viewer::new(),
            display: DisplaySurface::default(),
            driver,
            sensors: MotionSensors::new(),
            video,
            activated: false,
            last_tick: None,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn display(&self) -> &DisplaySurface {
        &self.display
    }

    pub fn driver(&self) -> &FrameDriver {
        &self.driver
    }

    pub fn video(&self) -> &VideoFeed {
        &self.video
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// Output surface changed size. The viewer aspect follows the logical
    /// size; a zero-sized surface is recorded but leaves the aspect alone.
    pub fn handle_resize(&mut self, width: f64, height: f64, pixel_ratio: f64) {
        self.display.set_pixel_ratio(pixel_ratio);
        self.display.set_size(width, height);

        if let Some(aspect) = self.display.aspect() {
            self.viewer.set_aspect(aspect);
            self.viewer.update_projection_matrix();
        }
        let (buffer_w, buffer_h) = self.display.drawing_buffer_size();
        info!("Resize: {}x{} @{} -> {}x{}", width, height, pixel_ratio, buffer_w, buffer_h);
    }

    /// First user tap or click. Requests motion sensor access and starts the
    /// video; later calls do nothing. Returns whether this call activated.
    pub fn activate(&mut self) -> bool {
        if self.activated {
            return false;
        }
        self.activated = true;
        info!("Activation gesture received");
        self.sensors.request_permission();
        self.video.play();
        true
    }

    pub fn start(&mut self) {
        self.driver.start();
        self.last_tick = None;
    }

    pub fn stop(&mut self) {
        self.driver.stop();
    }

    pub fn request_immersive(&mut self) -> bool {
        self.driver.request_immersive()
    }

    pub fn end_immersive(&mut self) -> bool {
        self.driver.end_immersive()
    }

    /// Advance one display refresh. Returns the frame to draw, or `None`
    /// while the driver is stopped.
    pub fn tick(&mut self) -> Option<FramePlan> {
        let state = self.driver.tick()?;

        let now = Instant::now();
        let dt = self.last_tick.map_or(0.0, |last| now.duration_since(last).as_secs_f32());
        self.last_tick = Some(now);
        self.sensors.update(dt);

        Some(self.plan_frame(state))
    }

    /// Lay out the views for `state`. Immersive frames split the drawing
    /// buffer into left and right halves, one eye camera each.
    pub fn plan_frame(&self, state: PresentationState) -> FramePlan {
        let (width, height) = self.display.drawing_buffer_size();

        let views = match state {
            PresentationState::PresentingImmersive => {
                let left_width = width / 2;
                let eye_aspect = if left_width > 0 && height > 0 { left_width as f32 / height as f32 } else { 1.0 };
                let head = self.sensors.orientation();

                Eye::BOTH
                    .into_iter()
                    .map(|eye| {
                        let camera = self.viewer.eye_camera(eye, self.config.ipd, head, eye_aspect);
                        let viewport = match eye {
                            Eye::Left => Viewport { x: 0, y: 0, width: left_width, height },
                            Eye::Right => Viewport {
                                x: left_width,
                                y: 0,
                                width: width - left_width,
                                height,
                            },
                        };
                        EyeView {
                            eye: Some(eye),
                            viewport,
                            view_projection: camera.view_projection(),
                            layers: camera.layers,
                            draws: self.scene.visible_to(&camera.layers),
                        }
                    })
                    .collect()
            }
            PresentationState::Idle | PresentationState::Presenting2d => vec![EyeView {
                eye: None,
                viewport: Viewport { x: 0, y: 0, width, height },
                view_projection: self.viewer.view_projection(),
                layers: self.viewer.layers,
                draws: self.scene.visible_to(&self.viewer.layers),
            }],
        };

        FramePlan {
            state,
            clear_color: hex_to_rgb(self.scene.background),
            views,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::{CaptionRaster, TextMetrics};
    use crate::scene::SurfaceRole;

    struct NarrowText;

    impl TextRenderer for NarrowText {
        fn measure(&self, text: &str, _font_px: f32) -> TextMetrics {
            TextMetrics {
                width: text.len() as f32 * 8.0,
                ascent: 20.0,
                descent: 4.0,
            }
        }

        fn fill_text(&self, _text: &str, _font_px: f32, _raster: &mut CaptionRaster, _baseline_y: f32) {}
    }

    fn context() -> AppContext {
        AppContext::new(PlayerConfig::default(), &NarrowText)
    }

    fn roles(ctx: &AppContext, view: &EyeView) -> Vec<SurfaceRole> {
        view.draws.iter().map(|&i| ctx.scene().surfaces()[i].role).collect()
    }

    #[test]
    fn resize_tracks_aspect_exactly() {
        let mut ctx = context();
        ctx.handle_resize(1920.0, 1080.0, 1.0);
        assert_eq!(ctx.viewer().aspect(), 1920.0 / 1080.0);
        ctx.handle_resize(800.0, 600.0, 2.0);
        assert_eq!(ctx.viewer().aspect(), 800.0 / 600.0);
        assert_eq!(ctx.display().drawing_buffer_size(), (1600, 1200));
    }

    #[test]
    fn zero_resize_is_recorded_but_keeps_aspect() {
        let mut ctx = context();
        ctx.handle_resize(800.0, 600.0, 1.0);
        ctx.handle_resize(0.0, 0.0, 1.0);
        assert_eq!(ctx.display().drawing_buffer_size(), (0, 0));
        assert_eq!(ctx.viewer().aspect(), 800.0 / 600.0);
    }

    #[test]
    fn flat_view_shows_left_plane_floor_and_caption() {
        let mut ctx = context();
        ctx.handle_resize(1280.0, 720.0, 1.0);
        let plan = ctx.plan_frame(PresentationState::Presenting2d);

        assert_eq!(plan.views.len(), 1);
        let view = &plan.views[0];
        assert_eq!(view.viewport, Viewport { x: 0, y: 0, width: 1280, height: 720 });
        assert_eq!(
            roles(&ctx, view),
            vec![SurfaceRole::Eye(Eye::Left), SurfaceRole::Floor, SurfaceRole::Caption]
        );
        assert_eq!(plan.clear_color, hex_to_rgb(0x404040));
    }

    #[test]
    fn immersive_view_splits_eyes() {
        let mut ctx = context();
        ctx.handle_resize(1001.0, 500.0, 1.0);
        let plan = ctx.plan_frame(PresentationState::PresentingImmersive);

        assert_eq!(plan.views.len(), 2);
        let (left, right) = (&plan.views[0], &plan.views[1]);
        assert_eq!(left.viewport, Viewport { x: 0, y: 0, width: 500, height: 500 });
        assert_eq!(right.viewport, Viewport { x: 500, y: 0, width: 501, height: 500 });

        assert_eq!(roles(&ctx, left)[0], SurfaceRole::Eye(Eye::Left));
        assert_eq!(roles(&ctx, right)[0], SurfaceRole::Eye(Eye::Right));
        assert!(!roles(&ctx, left).contains(&SurfaceRole::Eye(Eye::Right)));
        assert!(!roles(&ctx, right).contains(&SurfaceRole::Eye(Eye::Left)));
    }

    #[test]
    fn floor_and_caption_reach_both_eye_cameras() {
        let mut ctx = context();
        ctx.handle_resize(800.0, 400.0, 1.0);
        let plan = ctx.plan_frame(PresentationState::PresentingImmersive);
        for view in &plan.views {
            let roles = roles(&ctx, view);
            assert!(roles.contains(&SurfaceRole::Floor), "{:?} misses the floor", view.eye);
            assert_eq!(roles.last(), Some(&SurfaceRole::Caption));
        }
    }

    #[test]
    fn activation_is_one_shot() {
        let mut ctx = context();
        assert!(!ctx.is_activated());
        assert!(ctx.activate());
        assert!(ctx.video().is_playing());
        assert!(!ctx.activate());
        ctx.video.stop();
    }

    #[test]
    fn ticks_follow_driver_state() {
        let mut ctx = context();
        ctx.handle_resize(640.0, 480.0, 1.0);
        assert!(ctx.tick().is_none());

        ctx.start();
        let plan = ctx.tick().map(|p| p.state);
        assert_eq!(plan, Some(PresentationState::Presenting2d));

        assert!(ctx.request_immersive());
        let plan = ctx.tick().map(|p| p.views.len());
        assert_eq!(plan, Some(2));

        assert!(ctx.end_immersive());
        ctx.stop();
        assert!(ctx.tick().is_none());
    }
}
