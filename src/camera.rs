//! Viewer and per-eye cameras

use glam::{Mat4, Quat, Vec3};

use crate::layers::{Layers, LEFT_EYE_LAYER};
use crate::uv::Eye;

/// Perspective camera the scene is seen through when not presenting
/// immersively. Its layer mask decides which eye plane shows up in 2D.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub fov_y_degrees: f32,
    aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub layers: Layers,
    projection: Mat4,
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewer {
    pub fn new() -> Self {
        let mut layers = Layers::default();
        layers.enable(LEFT_EYE_LAYER);

        let mut viewer = Self {
            fov_y_degrees: 50.0,
            aspect: 1.0,
            near: 0.1,
            far: 2000.0,
            position: Vec3::ZERO,
            layers,
            projection: Mat4::IDENTITY,
        };
        viewer.update_projection_matrix();
        viewer
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Takes effect on the next [`Viewer::update_projection_matrix`]
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov_y_degrees.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// The viewer looks down -Z from its position
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(-self.position)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    /// Camera for one eye of an immersive presentation
    pub fn eye_camera(&self, eye: Eye, ipd: f32, head: Quat, aspect: f32) -> EyeCamera {
        EyeCamera::new(eye, self.position, ipd, head, aspect, self.near, self.far)
    }
}

/// One eye of an immersive presentation
#[derive(Debug, Clone, Copy)]
pub struct EyeCamera {
    pub eye: Eye,
    /// Default layer plus the eye's own layer
    pub layers: Layers,
    pub position: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
}

impl EyeCamera {
    /// Vertical field of view used for side-by-side presentation
    pub const FOV_Y_DEGREES: f32 = 90.0;

    pub fn new(eye: Eye, origin: Vec3, ipd: f32, head: Quat, aspect: f32, near: f32, far: f32) -> Self {
        let mut layers = Layers::default();
        layers.enable(Layers::eye_layer(eye));

        let half = ipd / 2.0;
        let local_offset = match eye {
            Eye::Left => Vec3::new(-half, 0.0, 0.0),
            Eye::Right => Vec3::new(half, 0.0, 0.0),
        };
        let position = origin + head * local_offset;
        let view = Mat4::from_rotation_translation(head, position).inverse();
        let projection = Mat4::perspective_rh(Self::FOV_Y_DEGREES.to_radians(), aspect, near, far);

        Self {
            eye,
            layers,
            position,
            view,
            projection,
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}
