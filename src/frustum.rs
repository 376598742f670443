use crate::culling::{self, Classify, Containment};
use crate::transform::Transform;
use nalgebra as na;
use ncollide3d::bounding_volume::AABB;

/// Half space `normal . p + distance >= 0`.
#[derive(Copy, Clone, Debug)]
pub struct Plane {
    pub normal: na::Vector3<f64>,
    pub distance: f64,
}

impl Plane {
    fn from_coefficients(v: na::Vector4<f64>) -> Plane {
        let normal = na::Vector3::new(v.x, v.y, v.z);
        let length = normal.norm();
        Plane {
            normal: normal / length,
            distance: v.w / length,
        }
    }

    pub fn signed_distance(&self, point: &na::Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) + self.distance
    }
}

pub struct Frustum {
    /// Transformation from the eye to the space the frustum is expressed in.
    pub transform: Transform,

    pub projection: na::Matrix4<f64>,
    pub view_projection: na::Matrix4<f64>,
    pub planes: [Plane; 6],
}

impl Frustum {
    pub fn new(transform: Transform, projection: na::Matrix4<f64>) -> Frustum {
        let view_projection = projection * transform.inverse().to_homogeneous();
        Frustum {
            transform,
            projection,
            view_projection,
            planes: extract_planes(&view_projection),
        }
    }

    pub fn eye_position(&self) -> na::Point3<f64> {
        na::Point3::from(self.transform.translation.vector)
    }
}

/// Gribb/Hartmann plane extraction: left, right, bottom, top, near, far.
fn extract_planes(m: &na::Matrix4<f64>) -> [Plane; 6] {
    let row = |i: usize| na::Vector4::new(m[(i, 0)], m[(i, 1)], m[(i, 2)], m[(i, 3)]);
    let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
    [
        Plane::from_coefficients(r3 + r0),
        Plane::from_coefficients(r3 - r0),
        Plane::from_coefficients(r3 + r1),
        Plane::from_coefficients(r3 - r1),
        Plane::from_coefficients(r3 + r2),
        Plane::from_coefficients(r3 - r2),
    ]
}

impl Classify<na::Point3<f64>> for Frustum {
    fn classify(&self, shape: &na::Point3<f64>) -> Containment {
        if self
            .planes
            .iter()
            .all(|plane| plane.signed_distance(shape) >= 0.0)
        {
            Containment::Inside
        } else {
            Containment::Outside
        }
    }
}

impl Classify<AABB<f64>> for Frustum {
    fn classify(&self, shape: &AABB<f64>) -> Containment {
        let corners = culling::corners(shape);
        let mut result = Containment::Inside;
        for plane in self.planes.iter() {
            let inside = corners
                .iter()
                .filter(|corner| plane.signed_distance(corner) >= 0.0)
                .count();
            if inside == 0 {
                return Containment::Outside;
            } else if inside != corners.len() {
                result = Containment::Intersects;
            }
        }
        result
    }
}
