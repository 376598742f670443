use super::node::{slot, Child, Node, NodeId, Side, GRID_SIZE, GRID_VERTICES};
use super::normals::fill_in_normals;
use super::SphericalQuadtree;
use crate::context::FrameContext;
use crate::error::LodError;
use crate::planet::VertexIndex;

type Grid = [Option<VertexIndex>; GRID_VERTICES];

impl<T> SphericalQuadtree<T> {
    /// Whether the leaf `id` should be subdivided from the point of view of `ctx`.
    pub(super) fn should_split(&self, id: NodeId<T>, ctx: &FrameContext) -> Result<bool, LodError> {
        let node = self.node_ref(id)?;
        if node.level() >= self.config.max_level {
            return Ok(false);
        }
        Ok(self.passes_split_test(node, ctx))
    }

    /// The back-face and screen-space radius tests, evaluated at the center vertex.
    pub(super) fn passes_split_test(&self, node: &Node<T>, ctx: &FrameContext) -> bool {
        let center = node.center();
        let position = self.vertices.position(center);
        let distance = ctx.eye_distance(position);

        // Too close to judge the orientation of the patch
        if distance < node.radius {
            return true;
        }

        let facing = ctx.facing_cosine(position, self.vertices.normal(center));
        if facing >= self.config.angle_cutoff {
            return false;
        }

        let pixels = ctx.pixel_radius(node.radius, distance);
        trace!(
            "{:?} at level {}: facing {:.3}, {:.1}px",
            node.location.face,
            node.level(),
            facing,
            pixels
        );
        pixels > self.config.pixel_cutoff
    }

    /// Splits `id`, first splitting every coarser neighbour that would otherwise end up two
    /// levels away from the new children. Returns the number of neighbours that were split.
    pub(super) fn split_with_neighbors(&mut self, id: NodeId<T>) -> Result<usize, LodError> {
        let mut stack = vec![id];
        let mut forced = 0;

        while let Some(&top) = stack.last() {
            let node = self.node_ref(top)?;
            if !node.is_leaf() {
                stack.pop();
                continue;
            }

            let parent = node.parent;
            let coarser = Side::ALL
                .iter()
                .cloned()
                .find(|side| node.adjacent[side.index()].is_none());

            match coarser {
                Some(side) => {
                    let parent = parent.ok_or_else(|| {
                        LodError::invariant(format!(
                            "root {:?} is missing its {:?} neighbour",
                            top, side
                        ))
                    })?;
                    let neighbor = self.node_ref(parent)?.adjacent[side.index()].ok_or_else(|| {
                        LodError::invariant(format!(
                            "{:?} is more than one level finer than its {:?} neighbour",
                            top, side
                        ))
                    })?;
                    if !self.node_ref(neighbor)?.is_leaf() {
                        return Err(LodError::invariant(format!(
                            "{:?} and the children of {:?} are not linked",
                            top, neighbor
                        )));
                    }
                    debug!("splitting {:?} to make room for {:?}", neighbor, top);
                    stack.push(neighbor);
                }
                None => {
                    self.do_split(top)?;
                    stack.pop();
                    if top != id {
                        forced += 1;
                    }
                }
            }
        }
        Ok(forced)
    }

    /// Creates the four children of a leaf whose sides all have same-level neighbours.
    fn do_split(&mut self, id: NodeId<T>) -> Result<(), LodError> {
        let (location, parent_vertices, parent_adjacent, object) = {
            let node = self.node_mut(id)?;
            if !node.is_leaf() {
                return Err(LodError::invariant(format!("{:?} is already split", id)));
            }
            (node.location, node.vertices, node.adjacent, node.object.take())
        };
        if let Some(record) = object {
            self.pool.free_object(record)?;
        }

        let mut created: Vec<NodeId<T>> = Vec::with_capacity(4);
        let mut links = Vec::new();
        for child in Child::values() {
            let mut grid: Grid = [None; GRID_VERTICES];
            let (ox, oy) = child.grid_offset();
            for j in 0..3 {
                for i in 0..3 {
                    grid[slot(2 * i, 2 * j)] = Some(parent_vertices[slot(ox + i, oy + j)]);
                }
            }

            for side in Side::ALL.iter().cloned() {
                match child.sibling(side) {
                    // Siblings are created in order, only earlier ones exist
                    Some(sibling) => {
                        if let Some(&other) = created.get(sibling.index()) {
                            copy_shared_side(&mut grid, side, self.node_ref(other)?)?;
                        }
                    }
                    None => {
                        if let Some(neighbor) = parent_adjacent[side.index()] {
                            if let Some((other, other_side)) =
                                self.find_adjacent_child(neighbor, &grid, side)?
                            {
                                copy_shared_side(&mut grid, side, self.node_ref(other)?)?;
                                links.push((child.index(), side, other, other_side));
                            }
                        }
                    }
                }
            }

            let vertices = self.complete_grid(&grid);
            let child_id = self.create_node(location.split(*child), Some(id), vertices);
            created.push(child_id);
        }
        let children = [created[0], created[1], created[2], created[3]];

        for child in Child::values() {
            let node = self.node_mut(children[child.index()])?;
            for side in Side::ALL.iter() {
                if let Some(sibling) = child.sibling(*side) {
                    node.adjacent[side.index()] = Some(children[sibling.index()]);
                }
            }
        }

        // The finer neighbours used to point at nothing, they now see a node of their own level
        for (child_index, side, other, other_side) in links {
            let child_id = children[child_index];
            self.node_mut(child_id)?.adjacent[side.index()] = Some(other);
            let neighbor = self.node_mut(other)?;
            neighbor.adjacent[other_side.index()] = Some(child_id);
            neighbor.dirty = true;
        }

        self.node_mut(id)?.children = Some(children);
        for neighbor in parent_adjacent.iter().flatten() {
            self.node_mut(*neighbor)?.dirty = true;
        }

        self.enqueue_merge(id);
        for child in children.iter() {
            self.enqueue_split(*child);
        }
        debug!(
            "split {:?} ({:?} level {})",
            id, location.face, location.lod_level
        );
        Ok(())
    }

    /// The child of `neighbor` that shares the given side of `grid`, together with the side of
    /// that child. `None` when `neighbor` is a leaf.
    fn find_adjacent_child(
        &self,
        neighbor: NodeId<T>,
        grid: &Grid,
        side: Side,
    ) -> Result<Option<(NodeId<T>, Side)>, LodError> {
        let children = match self.node_ref(neighbor)?.children {
            Some(children) => children,
            None => return Ok(None),
        };
        let (a, b) = side_corners(grid, side)?;
        for &child in children.iter() {
            if let Some(other_side) = self.node_ref(child)?.side_with_corners(a, b) {
                return Ok(Some((child, other_side)));
            }
        }
        Err(LodError::invariant(format!(
            "no child of {:?} shares the edge {:?}-{:?}",
            neighbor, a, b
        )))
    }

    /// Turns a partially known grid into a complete one, computing the missing vertices.
    fn complete_grid(&mut self, grid: &Grid) -> [VertexIndex; GRID_VERTICES] {
        let mut normals = [None; GRID_VERTICES];
        for (normal, index) in normals.iter_mut().zip(grid.iter()) {
            if let Some(index) = index {
                *normal = Some(*self.vertices.normal(*index));
            }
        }
        let normals = fill_in_normals(&mut normals);

        let mut vertices = [VertexIndex(0); GRID_VERTICES];
        for (i, vertex) in vertices.iter_mut().enumerate() {
            *vertex = match grid[i] {
                Some(index) => index,
                None => {
                    let index = self.vertices.get_new_vertex_index();
                    let normal = normals[i];
                    let position = self.generator.compute_vertex(&normal);
                    self.vertices.set(index, position, normal);
                    index
                }
            };
        }
        vertices
    }
}

fn side_corners(grid: &Grid, side: Side) -> Result<(VertexIndex, VertexIndex), LodError> {
    let slots = side.slots();
    match (grid[slots[0]], grid[slots[GRID_SIZE - 1]]) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(LodError::invariant(format!("corners of the {:?} side are unknown", side))),
    }
}

/// Copies the vertices of the side of `other` that matches `side` of `grid`. Shared sides run in
/// opposite directions.
fn copy_shared_side<T>(grid: &mut Grid, side: Side, other: &Node<T>) -> Result<(), LodError> {
    let (a, b) = side_corners(grid, side)?;
    let other_side = other
        .side_with_corners(a, b)
        .ok_or_else(|| LodError::invariant(format!("no side with corners {:?}-{:?}", a, b)))?;
    let theirs = other_side.slots();
    if other.vertices[theirs[0]] != b {
        return Err(LodError::invariant(format!(
            "side {:?}-{:?} is not oriented opposite to its neighbour",
            a, b
        )));
    }
    for (mine, their) in side.slots().iter().zip(theirs.iter().rev()) {
        grid[*mine] = Some(other.vertices[*their]);
    }
    Ok(())
}
