use crate::transform::Rotation;
use nalgebra::Vector3;
use std::f64::consts::PI;

/// One of the six faces of the cube that is projected onto the planet.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    Left,
    Right,
    Top,
    Bottom,
    Front,
    Back,
}

lazy_static! {
    static ref ORIENTATION_LEFT: Rotation = Rotation::from_euler_angles(0.0, 0.5 * PI, 0.0);
    static ref ORIENTATION_RIGHT: Rotation = Rotation::from_euler_angles(0.0, -0.5 * PI, 0.0);
    static ref ORIENTATION_TOP: Rotation = Rotation::from_euler_angles(PI * 0.5, 0.0, 0.0);
    static ref ORIENTATION_BOTTOM: Rotation = Rotation::from_euler_angles(-PI * 0.5, 0.0, 0.0);
    static ref ORIENTATION_FRONT: Rotation = Rotation::from_euler_angles(0.0, 0.0, 0.0);
    static ref ORIENTATION_BACK: Rotation = Rotation::from_euler_angles(0.0, PI, 0.0);
}

impl Face {
    pub fn orientation(self) -> Rotation {
        match self {
            Face::Left => *ORIENTATION_LEFT,
            Face::Right => *ORIENTATION_RIGHT,
            Face::Top => *ORIENTATION_TOP,
            Face::Bottom => *ORIENTATION_BOTTOM,
            Face::Front => *ORIENTATION_FRONT,
            Face::Back => *ORIENTATION_BACK,
        }
    }

    pub fn values() -> impl Iterator<Item = &'static Face> {
        static VALUES: [Face; 6] = [
            Face::Left,
            Face::Right,
            Face::Top,
            Face::Bottom,
            Face::Front,
            Face::Back,
        ];
        VALUES.iter()
    }

    /// Outward direction through the center of the face
    pub fn normal(self) -> Vector3<f64> {
        self.orientation() * Vector3::new(0.0, 0.0, 1.0)
    }

    /// Point on the surface of the [-1, 1] cube for face coordinates `u`, `v` in [0, 1]. `u` runs
    /// along the face tangent and `v` along its binormal; tangent x binormal points outwards.
    pub fn cube_point(self, u: f64, v: f64) -> Vector3<f64> {
        self.orientation() * Vector3::new(u * 2.0 - 1.0, v * 2.0 - 1.0, 1.0)
    }
}
