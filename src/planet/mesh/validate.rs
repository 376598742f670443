use super::triangle::{Triangle, TriangleId, BASE};
use super::PlanetMesh;
use crate::error::LodError;
use crate::planet::VertexIndex;
use std::collections::HashMap;

impl PlanetMesh {
    /// Checks the structural invariants of the mesh:
    ///
    /// * parents and children point at each other, and every split parent belongs to a diamond
    ///   that lists it
    /// * every leaf has a neighbour on all three edges, which points back and runs along the same
    ///   two vertices in the opposite direction
    /// * a base neighbour is the base partner or one level coarser, a leg neighbour is on the same
    ///   level or one level finer
    /// * the reference count of every vertex equals the number of corners referring to it
    pub fn validate(&self) -> Result<(), LodError> {
        let mut references: HashMap<VertexIndex, u32> = HashMap::new();

        for (id, triangle) in self.triangles.iter().filter(|(_, triangle)| !triangle.retired) {
            for index in triangle.vertices.iter() {
                *references.entry(*index).or_insert(0) += 1;
            }

            match triangle.parent {
                Some(parent) => {
                    let parent = self.live(parent)?;
                    if !parent.children.map_or(false, |children| children.contains(&id)) {
                        return Err(LodError::invariant(format!(
                            "{:?} is not a child of its parent",
                            id
                        )));
                    }
                }
                None if !self.base.contains(&id) => {
                    return Err(LodError::invariant(format!("{:?} has no parent", id)));
                }
                None => {}
            }

            match (triangle.children, triangle.diamond) {
                (Some(children), Some(diamond)) => {
                    for &child in children.iter() {
                        let child_triangle = self.live(child)?;
                        if child_triangle.parent != Some(id)
                            || child_triangle.level != triangle.level + 1
                        {
                            return Err(LodError::invariant(format!(
                                "{:?} is not a proper child of {:?}",
                                child, id
                            )));
                        }
                    }
                    let diamond = self.diamond_ref(diamond)?;
                    if !diamond.parents.contains(&id)
                        || !children.iter().all(|c| diamond.children.contains(c))
                    {
                        return Err(LodError::invariant(format!(
                            "{:?} is not listed by its diamond",
                            id
                        )));
                    }
                }
                (None, None) => self.validate_leaf(id, triangle)?,
                _ => {
                    return Err(LodError::invariant(format!(
                        "{:?} is split without a diamond or the other way around",
                        id
                    )));
                }
            }
        }

        for (index, count) in self.vertices.live() {
            let referenced = references.get(&index).cloned().unwrap_or(0);
            if referenced != count {
                return Err(LodError::invariant(format!(
                    "{:?} has reference count {} but {} references",
                    index, count, referenced
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

    fn validate_leaf(&self, id: TriangleId, triangle: &Triangle) -> Result<(), LodError> {
        for slot in 0..3 {
            let neighbor_id = triangle.neighbors[slot]
                .ok_or_else(|| LodError::invariant(format!("{:?} has an open edge {}", id, slot)))?;
            let neighbor = self.live(neighbor_id)?;
            if !neighbor.is_leaf() {
                return Err(LodError::invariant(format!(
                    "{:?} points at the split triangle {:?}",
                    id, neighbor_id
                )));
            }
            let back = neighbor.slot_of(id).ok_or_else(|| {
                LodError::invariant(format!("{:?} does not point back at {:?}", neighbor_id, id))
            })?;

            let (a, b) = triangle.edge(slot);
            if neighbor.edge(back) != (b, a) {
                return Err(LodError::invariant(format!(
                    "{:?} and {:?} do not share the vertices of their common edge",
                    id, neighbor_id
                )));
            }

            let allowed = if slot == BASE {
                (back == BASE && neighbor.level == triangle.level)
                    || (back != BASE && neighbor.level + 1 == triangle.level)
            } else {
                (back != BASE && neighbor.level == triangle.level)
                    || (back == BASE && neighbor.level == triangle.level + 1)
            };
            if !allowed {
                return Err(LodError::invariant(format!(
                    "{:?} at level {} and {:?} at level {} break the one level rule",
                    id, triangle.level, neighbor_id, neighbor.level
                )));
            }
        }
        Ok(())
    }

    fn live(&self, id: TriangleId) -> Result<&Triangle, LodError> {
        self.triangle(id).ok_or_else(|| LodError::stale(id))
    }
}
