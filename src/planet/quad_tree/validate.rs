use super::node::{Child, NodeId, Side, GRID_SIZE};
use super::SphericalQuadtree;
use crate::error::LodError;
use crate::planet::VertexIndex;
use std::collections::HashMap;

impl<T> SphericalQuadtree<T> {
    /// Checks the structural invariants of the whole tree:
    ///
    /// * parents and children point at each other and children are one level deeper
    /// * adjacency is symmetric, between nodes of the same level, and neighbours share the
    ///   vertex indices of their common side
    /// * a side without a neighbour borders a coarser leaf, and split nodes have all neighbours
    /// * the reference count of every vertex equals the number of grid slots referring to it
    pub fn validate(&self) -> Result<(), LodError> {
        let mut references: HashMap<VertexIndex, u32> = HashMap::new();

        for (id, node) in self.nodes.iter().filter(|(_, node)| !node.retired) {
            for index in node.vertices.iter() {
                *references.entry(*index).or_insert(0) += 1;
            }

            match node.parent {
                Some(parent) => {
                    let parent = self.live(parent)?;
                    if !parent.children.map_or(false, |children| children.contains(&id)) {
                        return Err(LodError::invariant(format!(
                            "{:?} is not a child of its parent",
                            id
                        )));
                    }
                }
                None if !self.roots.contains(&id) => {
                    return Err(LodError::invariant(format!("{:?} has no parent", id)));
                }
                None => {}
            }

            if let Some(children) = node.children {
                for (child, &child_id) in Child::values().zip(children.iter()) {
                    let child_node = self.live(child_id)?;
                    if child_node.parent != Some(id) || child_node.level() != node.level() + 1 {
                        return Err(LodError::invariant(format!(
                            "{:?} is not a proper {:?} child of {:?}",
                            child_id, child, id
                        )));
                    }
                }
            }

            for side in Side::ALL.iter().cloned() {
                match node.adjacent[side.index()] {
                    Some(neighbor_id) => {
                        let neighbor = self.live(neighbor_id)?;
                        if neighbor.level() != node.level() {
                            return Err(LodError::invariant(format!(
                                "{:?} and its {:?} neighbour {:?} differ in level",
                                id, side, neighbor_id
                            )));
                        }
                        let back = neighbor.side_of(id).ok_or_else(|| {
                            LodError::invariant(format!(
                                "{:?} does not point back at {:?}",
                                neighbor_id, id
                            ))
                        })?;
                        let mine = side.slots();
                        let theirs = back.slots();
                        for t in 0..GRID_SIZE {
                            let shared = neighbor.vertices[theirs[GRID_SIZE - 1 - t]];
                            if node.vertices[mine[t]] != shared {
                                return Err(LodError::invariant(format!(
                                    "{:?} and {:?} do not share the vertices of their common side",
                                    id, neighbor_id
                                )));
                            }
                        }
                    }
                    None => {
                        if !node.is_leaf() {
                            return Err(LodError::invariant(format!(
                                "split node {:?} has no {:?} neighbour",
                                id, side
                            )));
                        }
                        let parent = node.parent.ok_or_else(|| {
                            LodError::invariant(format!(
                                "root {:?} has no {:?} neighbour",
                                id, side
                            ))
                        })?;
                        let coarser = self.live(parent)?.adjacent[side.index()].ok_or_else(|| {
                            LodError::invariant(format!(
                                "{:?} is more than one level finer across its {:?} side",
                                id, side
                            ))
                        })?;
                        if !self.live(coarser)?.is_leaf() {
                            return Err(LodError::invariant(format!(
                                "{:?} is missing its link to a child of {:?}",
                                id, coarser
                            )));
                        }
                    }
                }
            }
        }

        for (index, count) in self.vertices.live() {
            if references.get(&index).cloned().unwrap_or(0) != count {
                return Err(LodError::invariant(format!(
                    "{:?} has reference count {} but {} references",
                    index,
                    count,
                    references.get(&index).cloned().unwrap_or(0)
                )));
            }
        }
        for (index, count) in references {
            if self.vertices.ref_count(index) != count {
                return Err(LodError::invariant(format!(
                    "{:?} is referenced {} times but counts {}",
                    index,
                    count,
                    self.vertices.ref_count(index)
                )));
            }
        }
        Ok(())
    }

    fn live(&self, id: NodeId<T>) -> Result<&super::Node<T>, LodError> {
        self.node(id).ok_or_else(|| LodError::stale(id))
    }
}
