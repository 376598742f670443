use crate::context::FrameContext;
use crate::frustum::Frustum;
use crate::transform::{Transform, Transformable};
use nalgebra::{Matrix4, Point3, Vector3};

/// Size of the surface that is rendered to, in pixels.
#[derive(Copy, Clone, Debug)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

pub struct Camera {
    /// Transformation from camera space to world space. The camera looks down -z.
    transform: Transform,

    fov: f64,
    near: f64,
    far: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Camera::new()
    }
}

impl Camera {
    pub fn new() -> Camera {
        Camera {
            transform: Transform::identity(),
            fov: 1.0,
            near: 0.1,
            far: 10000.0,
        }
    }

    pub fn set_near(&mut self, near: f64) -> &mut Self {
        self.near = near;
        self
    }

    pub fn set_far(&mut self, far: f64) -> &mut Self {
        self.far = far;
        self
    }

    pub fn set_field_of_view(&mut self, fov: f64) -> &mut Self {
        self.fov = fov;
        self
    }

    /// Places the camera at `eye` looking at `target`.
    pub fn look_at(
        &mut self,
        eye: &Point3<f64>,
        target: &Point3<f64>,
        up: &Vector3<f64>,
    ) -> &mut Self {
        self.transform = Transform::look_at_rh(eye, target, up).inverse();
        self
    }

    pub fn field_of_view(&self) -> f64 {
        self.fov
    }

    pub fn frustum(&self, aspect_ratio: f64) -> Frustum {
        Frustum::new(
            self.transform,
            Matrix4::new_perspective(aspect_ratio, self.fov, self.near, self.far),
        )
    }

    /// Builds the per-frame context for an object placed at `planet_transform` in the world.
    pub fn frame_context(
        &self,
        planet_transform: &Transform,
        viewport: Viewport,
        frame: u64,
    ) -> FrameContext {
        FrameContext {
            field_of_view: self.fov,
            aspect_ratio: viewport.aspect_ratio(),
            screen_height: viewport.height,
            near: self.near,
            far: self.far,
            frame,
            model_view: self.transform.inverse() * planet_transform,
        }
    }
}

impl Transformable for Camera {
    fn transform(&self) -> &Transform {
        &self.transform
    }
    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}
