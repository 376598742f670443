use super::node::{Child, NodeId};
use super::SphericalQuadtree;
use crate::context::FrameContext;
use crate::error::LodError;

impl<T> SphericalQuadtree<T> {
    /// Whether all children of `id` are leaves
    pub(super) fn is_quad(&self, id: NodeId<T>) -> bool {
        match self.nodes.get(id).and_then(|node| node.children) {
            Some(children) => children
                .iter()
                .all(|child| self.nodes.get(*child).map_or(false, |child| child.is_leaf())),
            None => false,
        }
    }

    /// A quad merges once its own center fails the split test and no child borders a split
    /// neighbour.
    pub(super) fn should_merge(&self, id: NodeId<T>, ctx: &FrameContext) -> Result<bool, LodError> {
        let node = self.node_ref(id)?;
        if self.passes_split_test(node, ctx) {
            return Ok(false);
        }
        Ok(!self.has_finer_neighbors(id)?)
    }

    /// Whether a child of `id` has a split neighbour outside of `id`. Merging would leave the
    /// grandchildren of that neighbour two levels away from the merged node.
    pub(super) fn has_finer_neighbors(&self, id: NodeId<T>) -> Result<bool, LodError> {
        let children = match self.node_ref(id)?.children {
            Some(children) => children,
            None => return Ok(false),
        };
        for (child, &child_id) in Child::values().zip(children.iter()) {
            let node = self.node_ref(child_id)?;
            for side in child.outer_sides().iter() {
                if let Some(neighbor) = node.adjacent[side.index()] {
                    if !self.node_ref(neighbor)?.is_leaf() {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    /// Turns the quad `id` back into a leaf. The children are retired and reclaimed at the end of
    /// the update.
    pub(super) fn merge_node(&mut self, id: NodeId<T>) -> Result<(), LodError> {
        let children = self
            .node_ref(id)?
            .children
            .ok_or_else(|| LodError::invariant(format!("cannot merge leaf {:?}", id)))?;
        for child_id in children.iter() {
            if !self.node_ref(*child_id)?.is_leaf() {
                return Err(LodError::invariant(format!(
                    "cannot merge {:?}, child {:?} is split",
                    id, child_id
                )));
            }
        }

        // Neighbours of the children fall back to seeing the coarser parent
        for (child, &child_id) in Child::values().zip(children.iter()) {
            for side in child.outer_sides().iter() {
                let neighbor = match self.node_ref(child_id)?.adjacent[side.index()] {
                    Some(neighbor) => neighbor,
                    None => continue,
                };
                let node = self.node_mut(neighbor)?;
                let back = node.side_of(child_id).ok_or_else(|| {
                    LodError::invariant(format!(
                        "{:?} does not point back at {:?}",
                        neighbor, child_id
                    ))
                })?;
                node.adjacent[back.index()] = None;
                node.dirty = true;
            }
        }

        for &child_id in children.iter() {
            let (vertices, object) = {
                let node = self.node_mut(child_id)?;
                if node.retired {
                    return Err(LodError::RepeatedDeletion(format!("{:?}", child_id)));
                }
                node.retired = true;
                (node.vertices, node.object.take())
            };
            for index in vertices.iter() {
                self.vertices.free_vertex_index(*index)?;
            }
            if let Some(record) = object {
                self.pool.free_object(record)?;
            }
            self.delete_queue.push(child_id);
        }

        let (parent, adjacent, level) = {
            let node = self.node_mut(id)?;
            node.children = None;
            node.dirty = true;
            (node.parent, node.adjacent, node.level())
        };
        for neighbor in adjacent.iter().flatten() {
            self.node_mut(*neighbor)?.dirty = true;
        }

        self.enqueue_split(id);
        if let Some(parent) = parent {
            if self.is_quad(parent) {
                self.enqueue_merge(parent);
            }
        }
        debug!("merged {:?} at level {}", id, level);
        Ok(())
    }
}
