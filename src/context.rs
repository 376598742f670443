use crate::frustum::Frustum;
use crate::transform::Transform;
use nalgebra::{Matrix4, Point3, Vector3};

/// Everything the level-of-detail structures need to know about the current frame.
#[derive(Clone, Debug)]
pub struct FrameContext {
    /// Vertical field of view in radians
    pub field_of_view: f64,
    pub aspect_ratio: f64,
    /// Height of the viewport in pixels
    pub screen_height: f64,
    pub near: f64,
    pub far: f64,
    pub frame: u64,

    /// Transformation from planet (object) space into eye space. The eye looks down -z.
    pub model_view: Transform,
}

impl FrameContext {
    /// Position of the eye in planet space
    pub fn camera_position(&self) -> Point3<f64> {
        self.model_view.inverse() * Point3::origin()
    }

    pub fn to_eye(&self, position: &Point3<f64>) -> Point3<f64> {
        self.model_view * position
    }

    /// Cosine between the eye-space normal at `position` and the direction from the eye towards
    /// it. Surfaces facing the viewer produce values close to -1.
    pub fn facing_cosine(&self, position: &Point3<f64>, normal: &Vector3<f64>) -> f64 {
        let eye_position = self.to_eye(position);
        let eye_normal = self.model_view * normal;
        let distance = eye_position.coords.norm();
        if distance <= 0.0 {
            return -1.0;
        }
        eye_normal.normalize().dot(&(eye_position.coords / distance))
    }

    pub fn eye_distance(&self, position: &Point3<f64>) -> f64 {
        self.to_eye(position).coords.norm()
    }

    /// Apparent radius in pixels of a sphere with `world_radius` at `eye_distance`.
    pub fn pixel_radius(&self, world_radius: f64, eye_distance: f64) -> f64 {
        if eye_distance <= 0.0 {
            return std::f64::INFINITY;
        }
        (world_radius / eye_distance).atan() / self.field_of_view * self.screen_height
    }

    /// Apparent size in pixels of a geometric deviation of `error` at `eye_distance`.
    pub fn pixel_error(&self, error: f64, eye_distance: f64) -> f64 {
        if eye_distance <= error {
            return std::f64::INFINITY;
        }
        (error / eye_distance).asin() / self.field_of_view * self.screen_height
    }

    pub fn projection(&self) -> Matrix4<f64> {
        Matrix4::new_perspective(self.aspect_ratio, self.field_of_view, self.near, self.far)
    }

    /// The view frustum expressed in planet space
    pub fn frustum(&self) -> Frustum {
        Frustum::new(self.model_view.inverse(), self.projection())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn context_at(distance: f64) -> FrameContext {
        FrameContext {
            field_of_view: PI / 3.0,
            aspect_ratio: 4.0 / 3.0,
            screen_height: 768.0,
            near: 0.01,
            far: 1000.0,
            frame: 0,
            model_view: Transform::translation(0.0, 0.0, -distance),
        }
    }

    #[test]
    fn facing_cosine_detects_orientation() {
        let context = context_at(3.0);
        let point = Point3::new(0.0, 0.0, 1.0);
        let towards = context.facing_cosine(&point, &Vector3::new(0.0, 0.0, 1.0));
        let away = context.facing_cosine(&point, &Vector3::new(0.0, 0.0, -1.0));
        assert!((towards + 1.0).abs() < 1e-12);
        assert!((away - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pixel_metrics_shrink_with_distance() {
        let context = context_at(3.0);
        let near = context.pixel_radius(1.0, 2.0);
        let far = context.pixel_radius(1.0, 20.0);
        assert!(near > far);
        // atan(1) is a quarter of pi, i.e. 3/4 of the 60 degree field of view
        assert!((context.pixel_radius(1.0, 1.0) - 576.0).abs() < 1e-9);

        assert!(context.pixel_error(0.5, 10.0) > context.pixel_error(0.5, 100.0));
        assert_eq!(context.pixel_error(2.0, 1.0), std::f64::INFINITY);
    }

    #[test]
    fn camera_position_is_in_planet_space() {
        let context = context_at(5.0);
        let position = context.camera_position();
        assert!((position - Point3::new(0.0, 0.0, 5.0)).norm() < 1e-12);
    }
}
