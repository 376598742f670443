use super::triangle::TriangleId;
use crate::id_arena::Id;

pub type DiamondId = Id<Diamond>;

/// Two triangles split along their shared base, together with the four children that split
/// produced. It is the unit that gets merged again.
#[derive(Clone, Debug)]
pub struct Diamond {
    /// The base partners, `parents[0]` being the triangle whose split created the diamond
    pub(crate) parents: [TriangleId; 2],
    /// `[left, right]` children of the first parent followed by those of the second
    pub(crate) children: [TriangleId; 4],
    /// Frame in which the diamond was created
    pub(crate) frame: u64,
    pub(crate) in_merge_queue: bool,
}

impl Diamond {
    pub fn parents(&self) -> [TriangleId; 2] {
        self.parents
    }

    pub fn children(&self) -> [TriangleId; 4] {
        self.children
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Number of frames since the diamond was created, as seen from `frame`
    pub fn age(&self, frame: u64) -> u64 {
        frame.saturating_sub(self.frame)
    }
}
