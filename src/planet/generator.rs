use crate::planet::{Description, TerrainLayer};
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Turns unit surface normals into positions on the planet.
#[derive(Clone, Debug)]
pub struct Generator {
    description: Description,
    terrain: Option<TerrainLayer>,
}

impl Generator {
    pub fn new(description: Description, terrain: Option<TerrainLayer>) -> Generator {
        Generator {
            description,
            terrain,
        }
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    /// Point on the oblate spheroid whose surface normal is `normal`. The y axis is the polar
    /// axis.
    pub fn spheroid_position(&self, normal: &Vector3<f64>) -> Point3<f64> {
        let a2 = self.description.equatorial_radius * self.description.equatorial_radius;
        let b2 = self.description.polar_radius * self.description.polar_radius;
        let denominator =
            (a2 * normal.x * normal.x + b2 * normal.y * normal.y + a2 * normal.z * normal.z).sqrt();
        Point3::new(
            a2 * normal.x / denominator,
            b2 * normal.y / denominator,
            a2 * normal.z / denominator,
        )
    }

    #[inline]
    pub fn compute_vertex(&self, normal: &Vector3<f64>) -> Point3<f64> {
        let position = self.spheroid_position(normal);
        match self.terrain {
            Some(ref terrain) => {
                let dir32 = Vector3::new(normal.x as f32, normal.y as f32, normal.z as f32);
                position + normal * f64::from(terrain.compute_height(&dir32))
            }
            None => position,
        }
    }

    /// Radius of the largest sphere that is guaranteed to be inside the surface.
    pub fn occluder_radius(&self) -> f64 {
        let radius = self
            .description
            .polar_radius
            .min(self.description.equatorial_radius);
        match self.terrain {
            Some(ref terrain) => radius + f64::from(terrain.min_height().min(0.0)),
            None => radius,
        }
    }

    /// Radius of a sphere that contains the whole surface.
    pub fn bounding_radius(&self) -> f64 {
        let radius = self
            .description
            .polar_radius
            .max(self.description.equatorial_radius);
        match self.terrain {
            Some(ref terrain) => radius + f64::from(terrain.max_height().max(0.0)),
            None => radius,
        }
    }
}

/// Polar texture coordinate `(longitude / 2pi, 0.5 + latitude / pi)` for a unit normal.
pub fn polar_texcoord(normal: &Vector3<f64>) -> [f32; 2] {
    let mut longitude = normal.x.atan2(normal.z);
    if longitude < 0.0 {
        longitude += 2.0 * PI;
    }
    let latitude = normal.y.max(-1.0).min(1.0).asin();
    [
        (longitude / (2.0 * PI)) as f32,
        (0.5 + latitude / PI) as f32,
    ]
}

/// Normalized average of two unit normals.
pub fn midpoint_normal(a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
    (a + b).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn earthlike() -> Generator {
        Generator::new(
            Description {
                equatorial_radius: 10.0,
                polar_radius: 8.0,
            },
            None,
        )
    }

    #[test]
    fn poles_and_equator_hit_the_axes() {
        let generator = earthlike();
        let pole = generator.compute_vertex(&Vector3::new(0.0, 1.0, 0.0));
        let equator = generator.compute_vertex(&Vector3::new(1.0, 0.0, 0.0));
        assert!((pole - Point3::new(0.0, 8.0, 0.0)).norm() < 1e-12);
        assert!((equator - Point3::new(10.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn positions_lie_on_the_spheroid() {
        let generator = earthlike();
        let normal = Vector3::new(0.3, 0.7, -0.2).normalize();
        let p = generator.compute_vertex(&normal);
        let implicit = (p.x * p.x + p.z * p.z) / 100.0 + p.y * p.y / 64.0;
        assert!((implicit - 1.0).abs() < 1e-12);

        // The gradient of the implicit surface is parallel to the normal we started from
        let gradient = Vector3::new(p.x / 100.0, p.y / 64.0, p.z / 100.0).normalize();
        assert!((gradient - normal).norm() < 1e-12);
    }

    #[test]
    fn terrain_displaces_along_the_normal() {
        let generator = Generator::new(
            Description {
                equatorial_radius: 10.0,
                polar_radius: 10.0,
            },
            Some(TerrainLayer::Constant(0.5)),
        );
        let p = generator.compute_vertex(&Vector3::new(0.0, 0.0, 1.0));
        assert!((p - Point3::new(0.0, 0.0, 10.5)).norm() < 1e-6);
        assert!((generator.bounding_radius() - 10.5).abs() < 1e-6);
        assert!((generator.occluder_radius() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn texcoords_are_polar() {
        assert_eq!(polar_texcoord(&Vector3::new(0.0, 0.0, 1.0)), [0.0, 0.5]);
        assert_eq!(polar_texcoord(&Vector3::new(0.0, 1.0, 0.0))[1], 1.0);
        assert_eq!(polar_texcoord(&Vector3::new(0.0, -1.0, 0.0))[1], 0.0);
        let west = polar_texcoord(&Vector3::new(-1.0, 0.0, 0.0));
        assert!((west[0] - 0.75).abs() < 1e-6);
    }
}
