use super::diamond::DiamondId;
use crate::id_arena::Id;
use crate::planet::VertexIndex;
use nalgebra::{Point3, Vector3};
use ncollide3d::bounding_volume::AABB;

pub type TriangleId = Id<Triangle>;

/// Vertex slots
pub const APEX: usize = 0;
pub const LEFT_VERTEX: usize = 1;
pub const RIGHT_VERTEX: usize = 2;

/// Neighbour slots. The base is the edge opposite the apex, the left edge runs from the apex to
/// the left vertex and the right edge from the right vertex back to the apex.
pub const BASE: usize = 0;
pub const LEFT: usize = 1;
pub const RIGHT: usize = 2;

/// A triangle of the bisection mesh, stored counter-clockwise as `[apex, left, right]`.
pub struct Triangle {
    pub(crate) vertices: [VertexIndex; 3],
    /// Neighbours across the base, left and right edge. Only maintained for leaves.
    pub(crate) neighbors: [Option<TriangleId>; 3],
    pub(crate) parent: Option<TriangleId>,
    /// `[left, right]` children, sharing the new vertex on the base as their apex
    pub(crate) children: Option<[TriangleId; 2]>,
    /// The diamond this triangle is a parent of, while it is split
    pub(crate) diamond: Option<DiamondId>,
    pub(crate) level: usize,

    /// Surface point the base would be split at
    pub(crate) midpoint: Point3<f64>,
    pub(crate) midpoint_normal: Vector3<f64>,
    /// Distance between the surface midpoint and the middle of the flat base
    pub(crate) midpoint_error: f64,
    /// Largest distance between the surface midpoint and a corner
    pub(crate) radius: f64,
    pub(crate) bounds: AABB<f64>,

    pub(crate) in_split_queue: bool,
    pub(crate) retired: bool,
}

impl Triangle {
    pub fn vertices(&self) -> &[VertexIndex; 3] {
        &self.vertices
    }

    pub fn neighbor(&self, slot: usize) -> Option<TriangleId> {
        self.neighbors[slot]
    }

    pub fn parent(&self) -> Option<TriangleId> {
        self.parent
    }

    pub fn children(&self) -> Option<[TriangleId; 2]> {
        self.children
    }

    /// The diamond this triangle is a parent of
    pub fn diamond(&self) -> Option<DiamondId> {
        self.diamond
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn midpoint_error(&self) -> f64 {
        self.midpoint_error
    }

    /// End points of the edge behind a neighbour slot, in counter-clockwise order
    pub fn edge(&self, slot: usize) -> (VertexIndex, VertexIndex) {
        let v = &self.vertices;
        match slot {
            BASE => (v[LEFT_VERTEX], v[RIGHT_VERTEX]),
            LEFT => (v[APEX], v[LEFT_VERTEX]),
            _ => (v[RIGHT_VERTEX], v[APEX]),
        }
    }

    /// The neighbour slot that refers to `other`
    pub fn slot_of(&self, other: TriangleId) -> Option<usize> {
        self.neighbors.iter().position(|n| *n == Some(other))
    }
}
