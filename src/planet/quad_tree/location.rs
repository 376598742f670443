use super::node::{Child, GRID_SIZE};
use crate::planet::Face;
use nalgebra::{Point2, Vector3};

/// Location of a patch in the oriented unit quad.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PatchLocation {
    pub face: Face,

    /// Offset from the top-left corner of the face
    pub offset: Point2<f64>,

    /// 1 is the entire face
    pub size: f64,

    /// The lod level of this patch, higher means more detail
    pub lod_level: usize,
}

impl PatchLocation {
    pub fn root(face: Face) -> PatchLocation {
        PatchLocation {
            face,
            offset: Point2::new(0.0, 0.0),
            size: 1.0,
            lod_level: 0,
        }
    }

    pub fn split(&self, index: Child) -> PatchLocation {
        let size = self.size * 0.5;
        let (x, y) = match index {
            Child::TopLeft => (0.0, 0.0),
            Child::TopRight => (size, 0.0),
            Child::BottomLeft => (0.0, size),
            Child::BottomRight => (size, size),
        };
        PatchLocation {
            face: self.face,
            offset: Point2::new(self.offset.x + x, self.offset.y + y),
            size,
            lod_level: self.lod_level + 1,
        }
    }

    /// Face coordinates of the grid vertex at column `x` and row `y`
    pub fn grid_coordinates(&self, x: usize, y: usize) -> Point2<f64> {
        let step = self.size / (GRID_SIZE - 1) as f64;
        Point2::new(
            self.offset.x + step * x as f64,
            self.offset.y + step * y as f64,
        )
    }

    /// Point of the grid vertex at column `x` and row `y` on the [-1, 1] cube
    pub fn cube_point(&self, x: usize, y: usize) -> Vector3<f64> {
        let uv = self.grid_coordinates(x, y);
        self.face.cube_point(uv.x, uv.y)
    }

    /// Whether the point with face coordinates `uv` lies inside this patch
    pub fn contains(&self, uv: &Point2<f64>) -> bool {
        uv.x >= self.offset.x
            && uv.x <= self.offset.x + self.size
            && uv.y >= self.offset.y
            && uv.y <= self.offset.y + self.size
    }
}

impl From<Face> for PatchLocation {
    fn from(face: Face) -> PatchLocation {
        PatchLocation::root(face)
    }
}
