use super::location::PatchLocation;
use crate::id_arena::Id;
use crate::planet::renderer::ObjectRecord;
use crate::planet::vertex_arena::VertexIndex;
use ncollide3d::bounding_volume::AABB;

/// Number of vertices along one side of a patch
pub const GRID_SIZE: usize = 5;
pub const GRID_VERTICES: usize = GRID_SIZE * GRID_SIZE;
/// Index of the center vertex in the grid
pub const CENTER: usize = 12;

pub type NodeId<T> = Id<Node<T>>;

/// Grid slot of the vertex at column `x` and row `y`. Row 0 is the top of the patch.
#[inline]
pub const fn slot(x: usize, y: usize) -> usize {
    y * GRID_SIZE + x
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Child {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Child {
    pub fn index(self) -> usize {
        match self {
            Child::TopLeft => 0,
            Child::TopRight => 1,
            Child::BottomLeft => 2,
            Child::BottomRight => 3,
        }
    }

    pub fn values() -> impl Iterator<Item = &'static Child> {
        static DIRECTIONS: [Child; 4] = [
            Child::TopLeft,
            Child::TopRight,
            Child::BottomLeft,
            Child::BottomRight,
        ];
        DIRECTIONS.iter()
    }

    /// Column and row of the child's top-left corner in the parent grid
    pub fn grid_offset(self) -> (usize, usize) {
        match self {
            Child::TopLeft => (0, 0),
            Child::TopRight => (2, 0),
            Child::BottomLeft => (0, 2),
            Child::BottomRight => (2, 2),
        }
    }

    /// The two sides of the child that lie on the boundary of the parent
    pub fn outer_sides(self) -> [Side; 2] {
        match self {
            Child::TopLeft => [Side::Top, Side::Left],
            Child::TopRight => [Side::Top, Side::Right],
            Child::BottomLeft => [Side::Bottom, Side::Left],
            Child::BottomRight => [Side::Bottom, Side::Right],
        }
    }

    /// The sibling across `side`, if that side is inside the parent
    pub fn sibling(self, side: Side) -> Option<Child> {
        match (self, side) {
            (Child::TopLeft, Side::Right) => Some(Child::TopRight),
            (Child::TopLeft, Side::Bottom) => Some(Child::BottomLeft),
            (Child::TopRight, Side::Left) => Some(Child::TopLeft),
            (Child::TopRight, Side::Bottom) => Some(Child::BottomRight),
            (Child::BottomLeft, Side::Top) => Some(Child::TopLeft),
            (Child::BottomLeft, Side::Right) => Some(Child::BottomRight),
            (Child::BottomRight, Side::Top) => Some(Child::TopRight),
            (Child::BottomRight, Side::Left) => Some(Child::BottomLeft),
            _ => None,
        }
    }
}

/// A side of a patch. Sides are walked counter-clockwise when seen from outside the planet.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    pub fn index(self) -> usize {
        match self {
            Side::Top => 0,
            Side::Right => 1,
            Side::Bottom => 2,
            Side::Left => 3,
        }
    }

    /// Grid slots along the side, in counter-clockwise walking order
    pub fn slots(self) -> [usize; GRID_SIZE] {
        let mut slots = [0; GRID_SIZE];
        for (t, s) in slots.iter_mut().enumerate() {
            *s = match self {
                Side::Top => slot(t, 0),
                Side::Right => slot(4, t),
                Side::Bottom => slot(4 - t, 4),
                Side::Left => slot(0, 4 - t),
            };
        }
        slots
    }
}

/// Recursive unit of surface subdivision.
pub struct Node<T> {
    pub(crate) location: PatchLocation,
    pub(crate) parent: Option<NodeId<T>>,
    pub(crate) children: Option<[NodeId<T>; 4]>,
    /// Same-level neighbours, indexed by [`Side::index`]. `None` means the area across that side
    /// is covered by a coarser leaf.
    pub(crate) adjacent: [Option<NodeId<T>>; 4],
    pub(crate) vertices: [VertexIndex; GRID_VERTICES],

    /// Largest distance between the center vertex and a corner
    pub(crate) radius: f64,
    pub(crate) bounds: AABB<f64>,

    pub(crate) object: Option<ObjectRecord>,
    pub(crate) fans: [(u16, u16); 4],
    pub(crate) dirty: bool,

    pub(crate) in_split_queue: bool,
    pub(crate) in_merge_queue: bool,
    pub(crate) retired: bool,

    pub payload: T,
}

impl<T> Node<T> {
    pub fn level(&self) -> usize {
        self.location.lod_level
    }

    pub fn location(&self) -> &PatchLocation {
        &self.location
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn parent(&self) -> Option<NodeId<T>> {
        self.parent
    }

    pub fn children(&self) -> Option<[NodeId<T>; 4]> {
        self.children
    }

    pub fn adjacent(&self, side: Side) -> Option<NodeId<T>> {
        self.adjacent[side.index()]
    }

    pub fn vertex_indices(&self) -> &[VertexIndex; GRID_VERTICES] {
        &self.vertices
    }

    pub fn center(&self) -> VertexIndex {
        self.vertices[CENTER]
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// First and last vertex of a side
    pub fn side_corners(&self, side: Side) -> (VertexIndex, VertexIndex) {
        let slots = side.slots();
        (self.vertices[slots[0]], self.vertices[slots[4]])
    }

    /// The side whose endpoints are `a` and `b`, in either order
    pub fn side_with_corners(&self, a: VertexIndex, b: VertexIndex) -> Option<Side> {
        Side::ALL.iter().cloned().find(|side| {
            let (start, end) = self.side_corners(*side);
            (start == a && end == b) || (start == b && end == a)
        })
    }

    /// The side across which `neighbor` is recorded as adjacent
    pub fn side_of(&self, neighbor: NodeId<T>) -> Option<Side> {
        Side::ALL
            .iter()
            .cloned()
            .find(|side| self.adjacent[side.index()] == Some(neighbor))
    }
}
