use stereo_video_core::caption::EguiTextRenderer;
use stereo_video_core::config::PlayerConfig;
use stereo_video_core::context::AppContext;
use stereo_video_core::frame_driver::PresentationState;
use stereo_video_core::scene::SurfaceRole;
use stereo_video_core::ui::session_label;
use stereo_video_core::uv::Eye;

fn player(config: PlayerConfig) -> AppContext {
    AppContext::new(config, &EguiTextRenderer::new())
}

fn v_range(ctx: &AppContext, eye: Eye) -> (f32, f32) {
    let surface = ctx.scene().surface(SurfaceRole::Eye(eye)).expect("eye plane");
    let vs: Vec<f32> = surface.geometry.uvs().iter().skip(1).step_by(2).copied().collect();
    let min = vs.iter().copied().fold(f32::INFINITY, f32::min);
    let max = vs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    (min, max)
}

#[test]
fn eye_planes_sample_opposite_halves() {
    let ctx = player(PlayerConfig::default());
    assert_eq!(v_range(&ctx, Eye::Left), (0.5, 1.0));
    assert_eq!(v_range(&ctx, Eye::Right), (0.0, 0.5));
}

/// Frame rows an eye plane reads, top-down, for a frame `height` rows tall
fn row_range(ctx: &AppContext, eye: Eye, height: f32) -> (f32, f32) {
    let surface = ctx.scene().surface(SurfaceRole::Eye(eye)).expect("eye plane");
    let mapping = surface.row_mapping();
    let rows: Vec<f32> = surface.geometry.uvs().iter().skip(1).step_by(2).map(|&v| mapping.row(v) * height).collect();
    // First vertex is the plane's top-left corner
    assert_eq!(rows[0], rows.iter().copied().fold(f32::INFINITY, f32::min), "{:?} drawn upside down", eye);
    let max = rows.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    (rows[0], max)
}

#[test]
fn left_eye_shows_lower_half_of_packed_frame() {
    let ctx = player(PlayerConfig::default());
    assert_eq!(row_range(&ctx, Eye::Left, 720.0), (360.0, 720.0));
    assert_eq!(row_range(&ctx, Eye::Right, 720.0), (0.0, 360.0));
}

#[test]
fn session_lifecycle() {
    let mut ctx = player(PlayerConfig::default());
    ctx.handle_resize(1920.0, 1080.0, 1.0);
    assert_eq!(ctx.viewer().aspect(), 1920.0 / 1080.0);

    // Nothing renders before the driver starts
    assert!(ctx.tick().is_none());
    ctx.start();

    let plan = ctx.tick().expect("2d frame");
    assert_eq!(plan.state, PresentationState::Presenting2d);
    assert_eq!(plan.views.len(), 1);
    let roles: Vec<_> = plan.views[0].draws.iter().map(|&i| ctx.scene().surfaces()[i].role).collect();
    assert_eq!(
        roles,
        vec![SurfaceRole::Eye(Eye::Left), SurfaceRole::Floor, SurfaceRole::Caption]
    );
    assert_eq!(session_label(plan.state, true), "ENTER VR");

    assert!(ctx.request_immersive());
    let plan = ctx.tick().expect("immersive frame");
    assert_eq!(plan.state, PresentationState::PresentingImmersive);
    assert_eq!(session_label(plan.state, true), "EXIT VR");
    let eyes: Vec<_> = plan.views.iter().map(|v| v.eye).collect();
    assert_eq!(eyes, vec![Some(Eye::Left), Some(Eye::Right)]);
    for view in &plan.views {
        let eye = view.eye.expect("eye view");
        let first = ctx.scene().surfaces()[view.draws[0]].role;
        assert_eq!(first, SurfaceRole::Eye(eye));
        assert_eq!(view.viewport.width, 960);
        assert_eq!(view.viewport.height, 1080);
    }

    assert!(ctx.end_immersive());
    assert_eq!(ctx.tick().map(|p| p.views.len()), Some(1));

    ctx.stop();
    assert!(ctx.tick().is_none());
}

#[test]
fn resize_updates_aspect_and_buffer() {
    let mut ctx = player(PlayerConfig::default());
    ctx.handle_resize(1920.0, 1080.0, 1.0);
    ctx.handle_resize(800.0, 600.0, 1.5);
    assert_eq!(ctx.viewer().aspect(), 800.0 / 600.0);
    assert_eq!(ctx.display().drawing_buffer_size(), (1200, 900));
}

#[test]
fn immersive_can_be_disabled_from_the_environment() {
    let config = PlayerConfig::from_lookup(|key| (key == "STEREO_VIDEO_IMMERSIVE").then(|| "off".to_string()));
    let mut ctx = player(config);
    ctx.handle_resize(640.0, 480.0, 1.0);
    ctx.start();
    ctx.tick();

    assert!(!ctx.request_immersive());
    assert_eq!(ctx.driver().state(), PresentationState::Presenting2d);
    assert_eq!(session_label(ctx.driver().state(), false), "VR NOT SUPPORTED");
}

#[test]
fn caption_plane_matches_rendered_text() {
    let ctx = player(PlayerConfig::default());
    let raster = ctx.scene().caption_raster();
    assert!(raster.width > raster.height);
    assert!(!raster.is_blank());

    let caption = ctx.scene().surface(SurfaceRole::Caption).expect("caption");
    let ys: Vec<f32> = caption.geometry.positions().iter().skip(1).step_by(3).copied().collect();
    let plane_height = ys[0] - ys[2];
    let expected = raster.height as f32 / raster.width as f32;
    assert!((plane_height - expected).abs() < 1e-6);
    assert!(caption.material.transparent);
}

#[test]
fn activation_starts_playback_once() {
    let mut ctx = player(PlayerConfig::default());
    assert!(!ctx.video().is_playing());
    assert!(ctx.activate());
    assert!(ctx.video().is_playing());
    assert!(!ctx.activate());
}
