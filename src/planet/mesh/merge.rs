use super::diamond::DiamondId;
use super::triangle::{TriangleId, BASE};
use super::PlanetMesh;
use crate::context::FrameContext;
use crate::error::LodError;

impl PlanetMesh {
    pub(super) fn children_are_leaves(&self, id: DiamondId) -> Result<bool, LodError> {
        let diamond = self.diamond_ref(id)?;
        for child in diamond.children.iter() {
            if !self.triangle_ref(*child)?.is_leaf() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// A diamond may merge once all its children are leaves, it has existed for at least
    /// `min_merge_age` frames and neither parent passes the split test anymore.
    pub fn is_mergeable(&self, id: DiamondId, ctx: &FrameContext) -> Result<bool, LodError> {
        if !self.children_are_leaves(id)? {
            return Ok(false);
        }
        let diamond = self.diamond_ref(id)?;
        if diamond.age(ctx.frame) < self.config.min_merge_age {
            return Ok(false);
        }
        for parent in diamond.parents.iter() {
            if self.passes_split_test(self.triangle_ref(*parent)?, ctx) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Replaces the four children of a diamond by its two parents. The children are retired and
    /// reclaimed at the end of the update.
    pub(super) fn merge_diamond(&mut self, id: DiamondId) -> Result<(), LodError> {
        let diamond = self.diamond_ref(id)?.clone();
        let [first, second] = diamond.parents;
        let [t_left, t_right, b_left, b_right] = diamond.children;
        for child in diamond.children.iter() {
            if !self.triangle_ref(*child)?.is_leaf() {
                return Err(LodError::invariant(format!(
                    "cannot merge {:?}, child {:?} is split",
                    id, child
                )));
            }
        }

        // The bases of the children are the legs of the parents
        let restored = [
            (first, second, t_left, t_right),
            (second, first, b_left, b_right),
        ];
        for &(parent, partner, left, right) in restored.iter() {
            let left_neighbor = self.outer_neighbor(left)?;
            let right_neighbor = self.outer_neighbor(right)?;
            self.replace_neighbor(left_neighbor, left, parent)?;
            self.replace_neighbor(right_neighbor, right, parent)?;

            let triangle = self.triangle_mut(parent)?;
            triangle.neighbors = [Some(partner), Some(left_neighbor), Some(right_neighbor)];
            triangle.children = None;
            triangle.diamond = None;
        }

        for &child in diamond.children.iter() {
            let vertices = {
                let triangle = self.triangle_mut(child)?;
                if triangle.retired {
                    return Err(LodError::RepeatedDeletion(format!("{:?}", child)));
                }
                triangle.retired = true;
                triangle.vertices
            };
            for index in vertices.iter() {
                self.vertices.free_vertex_index(*index)?;
            }
            self.delete_queue.push(child);
        }
        self.diamonds.remove(id);

        for &parent in diamond.parents.iter() {
            self.enqueue_split(parent);
            // The diamond the parent is a child of may have become mergeable
            if let Some(grandparent) = self.triangle_ref(parent)?.parent {
                if let Some(outer) = self.triangle_ref(grandparent)?.diamond {
                    if self.children_are_leaves(outer)? {
                        self.enqueue_merge(outer);
                    }
                }
            }
        }
        debug!("merged {:?} back into {:?} and {:?}", id, first, second);
        Ok(())
    }

    fn outer_neighbor(&self, child: TriangleId) -> Result<TriangleId, LodError> {
        self.triangle_ref(child)?.neighbors[BASE]
            .ok_or_else(|| LodError::invariant(format!("{:?} has no base neighbour", child)))
    }
}
