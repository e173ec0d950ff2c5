//! Scene construction
//!
//! The scene is built once at startup and never changes afterwards: two eye
//! planes sharing the video texture, a floor and a caption. Each surface
//! carries its own layer mask so cameras can pick per-eye content.

use glam::{Mat4, Quat, Vec3};
use log::info;

use crate::caption::{render_caption, CaptionRaster, TextRenderer};
use crate::config::PlayerConfig;
use crate::geometry::PlaneGeometry;
use crate::layers::Layers;
use crate::uv::{split_uvs, Eye, RowMapping};

/// Video plane size: 1m wide, 16:9
pub const VIDEO_PLANE_WIDTH: f32 = 1.0;
pub const VIDEO_PLANE_HEIGHT: f32 = 9.0 / 16.0;
/// Distance of the video planes in front of the viewer
pub const VIDEO_PLANE_DEPTH: f32 = -1.0;

const FLOOR_SIZE: f32 = 10.0;
const FLOOR_COLOR: u32 = 0x808080;
const CAPTION_SCALE: f32 = 0.5;

/// What a surface is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceRole {
    Eye(Eye),
    Floor,
    Caption,
}

/// Texture sampled by a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureBinding {
    None,
    /// The shared, continuously updated video frame
    Video,
    /// The static caption raster
    Caption,
}

/// Unlit material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// 0xRRGGBB tint, multiplied with the texture when there is one
    pub color: u32,
    pub map: TextureBinding,
    pub double_sided: bool,
    /// Alpha blended and drawn after opaque surfaces
    pub transparent: bool,
}

impl Material {
    pub fn textured(map: TextureBinding) -> Self {
        Self {
            color: 0xffffff,
            map,
            double_sided: true,
            transparent: false,
        }
    }

    pub fn solid(color: u32) -> Self {
        Self {
            color,
            map: TextureBinding::None,
            double_sided: true,
            transparent: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(position: Vec3) -> Self {
        Self { position, ..Default::default() }
    }

    /// Model matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// One renderable plane
#[derive(Debug, Clone)]
pub struct Surface {
    pub role: SurfaceRole,
    pub geometry: PlaneGeometry,
    pub material: Material,
    pub transform: Transform,
    pub layers: Layers,
}

impl Surface {
    /// How the texture's rows are read along the plane
    pub fn row_mapping(&self) -> RowMapping {
        match (self.material.map, self.role) {
            (TextureBinding::Video, SurfaceRole::Eye(eye)) => RowMapping::packed(eye),
            _ => RowMapping::UPRIGHT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    /// 0xRRGGBB clear colour
    pub background: u32,
    surfaces: Vec<Surface>,
    caption: CaptionRaster,
}

impl Scene {
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn surface(&self, role: SurfaceRole) -> Option<&Surface> {
        self.surfaces.iter().find(|s| s.role == role)
    }

    pub fn caption_raster(&self) -> &CaptionRaster {
        &self.caption
    }

    /// Indices of surfaces a camera with `layers` draws, opaque first then
    /// transparent, each group in scene order
    pub fn visible_to(&self, layers: &Layers) -> Vec<usize> {
        let visible = |transparent: bool| {
            self.surfaces
                .iter()
                .enumerate()
                .filter(move |(_, s)| s.material.transparent == transparent && s.layers.test(layers))
                .map(|(i, _)| i)
        };
        visible(false).chain(visible(true)).collect()
    }
}

/// Assemble the fixed scene. Runs once; each eye plane gets its own remapped
/// copy of the plane UVs.
pub fn build_scene<R: TextRenderer + ?Sized>(config: &PlayerConfig, text_renderer: &R) -> Scene {
    let mut surfaces = Vec::with_capacity(4);

    for eye in Eye::BOTH {
        let plane = PlaneGeometry::new(VIDEO_PLANE_WIDTH, VIDEO_PLANE_HEIGHT);
        let uvs = split_uvs(plane.uvs(), eye);
        surfaces.push(Surface {
            role: SurfaceRole::Eye(eye),
            geometry: plane.with_uvs(uvs),
            material: Material::textured(TextureBinding::Video),
            transform: Transform::from_translation(Vec3::new(0.0, 0.0, VIDEO_PLANE_DEPTH)),
            layers: Layers::only(Layers::eye_layer(eye)),
        });
    }

    surfaces.push(Surface {
        role: SurfaceRole::Floor,
        geometry: PlaneGeometry::new(FLOOR_SIZE, FLOOR_SIZE),
        material: Material::solid(FLOOR_COLOR),
        transform: Transform {
            position: Vec3::new(0.0, -2.0, -5.0),
            rotation: Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
            scale: Vec3::ONE,
        },
        layers: Layers::default(),
    });

    let caption = render_caption(text_renderer, &config.caption_text, config.caption_font_px);
    let caption_aspect = caption.aspect();
    let mut caption_layers = Layers::default();
    caption_layers.enable_all();
    surfaces.push(Surface {
        role: SurfaceRole::Caption,
        geometry: PlaneGeometry::new(1.0, caption_aspect),
        material: Material {
            transparent: true,
            ..Material::textured(TextureBinding::Caption)
        },
        transform: Transform {
            position: Vec3::new(0.0, VIDEO_PLANE_HEIGHT / 2.0 + caption_aspect, VIDEO_PLANE_DEPTH),
            rotation: Quat::IDENTITY,
            scale: Vec3::new(CAPTION_SCALE, CAPTION_SCALE, 1.0),
        },
        layers: caption_layers,
    });

    info!(
        "Scene built: {} surfaces, caption {}x{}",
        surfaces.len(),
        caption.width,
        caption.height
    );

    Scene {
        background: config.background,
        surfaces,
        caption,
    }
}
