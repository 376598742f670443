use crate::culling::{self, Classify, Containment};
use nalgebra::{Point3, Vector3};
use ncollide3d::bounding_volume::AABB;

/// Implementation based on: https://cesium.com/blog/2013/04/25/horizon-culling/
///
/// Classifies points as `Inside` when they are hidden behind a sphere of `planet_radius` around
/// the origin, as seen from `origin`.
#[derive(Clone, Debug)]
pub struct Cone {
    origin: Point3<f64>,
    direction: Vector3<f64>,
    near_distance: f64,
    cos_angle: f64,
    enabled: bool,
}

impl Cone {
    /// Construct a cone to perform horizon culling
    pub fn new(camera_position: Point3<f64>, planet_radius: f64) -> Cone {
        let distance_to_center = camera_position.coords.norm();
        let radius_squared = planet_radius * planet_radius;

        // Inside the occluder nothing can be culled
        if distance_to_center <= planet_radius || planet_radius <= 0.0 {
            return Cone {
                origin: camera_position,
                direction: Vector3::zeros(),
                near_distance: 0.0,
                cos_angle: 1.0,
                enabled: false,
            };
        }

        let distance_from_center_to_plane = radius_squared / distance_to_center;
        let near_distance = distance_to_center - distance_from_center_to_plane;
        let cos_angle =
            near_distance / (distance_to_center * distance_to_center - radius_squared).sqrt();
        Cone {
            direction: -camera_position.coords / distance_to_center,
            origin: camera_position,
            near_distance,
            cos_angle,
            enabled: true,
        }
    }
}

impl Classify<Point3<f64>> for Cone {
    fn classify(&self, shape: &Point3<f64>) -> Containment {
        if !self.enabled {
            return Containment::Outside;
        }
        let position_camera = shape - self.origin;
        let point_cos_angle = self.direction.dot(&position_camera);
        if point_cos_angle > self.near_distance
            && point_cos_angle / position_camera.norm() > self.cos_angle
        {
            Containment::Inside
        } else {
            Containment::Outside
        }
    }
}

impl Classify<AABB<f64>> for Cone {
    fn classify(&self, shape: &AABB<f64>) -> Containment {
        let corners = culling::corners(shape);
        let hidden = corners.iter().filter(|corner| self.contains(*corner)).count();

        if hidden == corners.len() {
            Containment::Inside
        } else if hidden == 0 {
            Containment::Outside
        } else {
            Containment::Intersects
        }
    }
}
