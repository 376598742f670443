use super::node::{slot, NodeId, Side};
use super::SphericalQuadtree;
use crate::context::FrameContext;
use crate::culling::{self, Classify};
use crate::error::LodError;
use crate::planet::renderer::{Cone, DrawCall, FanSink, Vertex};
use crate::planet::VertexIndex;

/// What happened during one call to [`SphericalQuadtree::draw`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct DrawStats {
    pub visible_leaves: usize,
    /// Subtrees skipped by frustum or horizon culling
    pub culled: usize,
    pub fans: usize,
    /// Leaves whose geometry was written to the buffer pool
    pub uploads: usize,
}

/// Fan indices of a leaf whose four neighbours are all split
pub const MAX_FAN_INDICES: usize = 40;

/// Origins of the four subquadrants of a leaf
const SUBQUADRANTS: [(usize, usize); 4] = [(0, 0), (2, 0), (0, 2), (2, 2)];

/// Grid slots of the four triangle fans of a leaf, and the `(start, count)` of every fan within
/// them. `split_sides` tells, per [`Side::index`], whether the neighbour across that side is
/// split; only then are the mid-edge vertices on that side part of the fans.
pub fn fan_slots(split_sides: [bool; 4]) -> (Vec<usize>, [(u16, u16); 4]) {
    let mut slots = Vec::with_capacity(MAX_FAN_INDICES);
    let mut fans = [(0, 0); 4];
    for (fan, &(ox, oy)) in fans.iter_mut().zip(SUBQUADRANTS.iter()) {
        let start = slots.len();
        slots.push(slot(ox + 1, oy + 1));

        // Counter-clockwise around the center, mid-edge vertices tagged with the side they lie on
        let ring = [
            (ox, oy, None),
            (ox + 1, oy, on_side(oy == 0, Side::Top)),
            (ox + 2, oy, None),
            (ox + 2, oy + 1, on_side(ox == 2, Side::Right)),
            (ox + 2, oy + 2, None),
            (ox + 1, oy + 2, on_side(oy == 2, Side::Bottom)),
            (ox, oy + 2, None),
            (ox, oy + 1, on_side(ox == 0, Side::Left)),
        ];
        for &(x, y, side) in ring.iter() {
            if side.map_or(true, |side: Side| split_sides[side.index()]) {
                slots.push(slot(x, y));
            }
        }
        slots.push(slot(ox, oy));
        *fan = (start as u16, (slots.len() - start) as u16);
    }
    (slots, fans)
}

fn on_side(boundary: bool, side: Side) -> Option<Side> {
    if boundary {
        Some(side)
    } else {
        None
    }
}

impl<T> SphericalQuadtree<T> {
    pub(super) fn draw_leaves<S: FanSink<T>>(
        &mut self,
        ctx: &FrameContext,
        sink: &mut S,
    ) -> Result<DrawStats, LodError> {
        let frustum = ctx.frustum();
        let occluder = self.generator.occluder_radius();
        let horizon = Cone::new(ctx.camera_position(), occluder);
        let relief = self.generator.bounding_radius() - occluder;

        let mut stats = DrawStats::default();
        let mut stack: Vec<NodeId<T>> = self.roots.iter().rev().cloned().collect();
        while let Some(id) = stack.pop() {
            let node = self.node_ref(id)?;

            // Descendants bulge outwards from the flat grid of their ancestor
            let margin =
                node.radius * node.radius / (2.0 * occluder.max(std::f64::EPSILON)) + relief;
            let bounds = culling::loosened(&node.bounds, margin);
            if (self.config.frustum_culling && !frustum.intersects(&bounds))
                || (self.config.horizon_culling && horizon.contains(&bounds))
            {
                stats.culled += 1;
                continue;
            }

            if let Some(children) = node.children {
                stack.extend(children.iter().rev());
                continue;
            }

            if node.dirty || node.object.is_none() {
                self.upload(id)?;
                stats.uploads += 1;
            }

            let node = self.node_ref(id)?;
            let record = node
                .object
                .ok_or_else(|| LodError::invariant(format!("leaf {:?} has no buffer object", id)))?;
            let base = self.pool.index_offset(record);
            stats.visible_leaves += 1;
            for &(start, count) in node.fans.iter().filter(|(_, count)| *count > 0) {
                let call = DrawCall {
                    record,
                    index_start: base + start as usize,
                    index_count: count as usize,
                };
                sink.draw(&self.pool, call, &node.payload)?;
                stats.fans += 1;
            }
        }

        trace!("frame {}: drew {:?}", ctx.frame, stats);
        Ok(stats)
    }

    /// Writes the vertices and fan indices of a leaf into its buffer object, allocating one if
    /// needed.
    fn upload(&mut self, id: NodeId<T>) -> Result<(), LodError> {
        let (vertices, split_sides, object) = {
            let node = self.node_ref(id)?;
            let mut split_sides = [false; 4];
            for side in Side::ALL.iter() {
                if let Some(neighbor) = node.adjacent[side.index()] {
                    split_sides[side.index()] = !self.node_ref(neighbor)?.is_leaf();
                }
            }
            (node.vertices, split_sides, node.object)
        };

        let record = match object {
            Some(record) => record,
            None => self.pool.allocate_object()?,
        };
        let data: Vec<Vertex> = vertices.iter().map(|index| self.vertices.vertex(*index)).collect();
        self.pool.write_vertices(record, &data)?;

        let (slots, fans) = fan_slots(split_sides);
        let base = self.pool.vertex_offset(record) as u32;
        let indices: Vec<u32> = slots.iter().map(|slot| base + *slot as u32).collect();
        self.pool.write_indices(record, &indices)?;

        let node = self.node_mut(id)?;
        node.object = Some(record);
        node.fans = fans;
        node.dirty = false;
        Ok(())
    }

    /// The fans of an uploaded leaf as vertex arena indices, read back from the buffer pool.
    /// `None` for nodes that have not been uploaded since their last change.
    pub fn fan_vertices(&self, id: NodeId<T>) -> Option<Vec<Vec<VertexIndex>>> {
        let node = self.node(id)?;
        let record = node.object.filter(|_| !node.dirty)?;
        let base = self.pool.vertex_offset(record) as u32;
        let indices = self.pool.indices(record);
        let fans = node
            .fans
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|&(start, count)| {
                indices[start as usize..(start + count) as usize]
                    .iter()
                    .map(|index| node.vertices[(index - base) as usize])
                    .collect()
            })
            .collect();
        Some(fans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planet::quad_tree::node::{CENTER, GRID_VERTICES};

    #[test]
    fn fans_skip_mid_edges_next_to_unsplit_neighbours() {
        let (slots, fans) = fan_slots([false; 4]);
        assert_eq!(slots.len(), 32);
        for &(_, count) in fans.iter() {
            assert_eq!(count, 8);
        }
        for side in Side::ALL.iter() {
            let edge = side.slots();
            assert!(!slots.contains(&edge[1]));
            assert!(!slots.contains(&edge[3]));
            // The middle of a side is a corner of two subquadrants
            assert!(slots.contains(&edge[2]));
        }
    }

    #[test]
    fn fans_include_mid_edges_next_to_split_neighbours() {
        let (slots, fans) = fan_slots([false, true, false, false]);
        assert_eq!(slots.len(), 34);
        let edge = Side::Right.slots();
        assert!(slots.contains(&edge[1]));
        assert!(slots.contains(&edge[3]));
        assert!(!slots.contains(&Side::Left.slots()[1]));

        let (slots, _) = fan_slots([true; 4]);
        assert_eq!(slots.len(), MAX_FAN_INDICES);
        let mut used = slots.clone();
        used.sort();
        used.dedup();
        assert_eq!(used.len(), GRID_VERTICES);
        assert_eq!(fans[0].0, 0);
    }

    #[test]
    fn fans_wind_counter_clockwise_around_their_center() {
        let (slots, fans) = fan_slots([true; 4]);
        for &(start, count) in fans.iter() {
            let fan = &slots[start as usize..(start + count) as usize];
            let (cx, cy) = ((fan[0] % 5) as i64, (fan[0] / 5) as i64);
            assert_ne!(fan[0], CENTER);
            assert_eq!(fan[1], fan[fan.len() - 1]);
            for pair in fan[1..].windows(2) {
                let (ax, ay) = ((pair[0] % 5) as i64 - cx, (pair[0] / 5) as i64 - cy);
                let (bx, by) = ((pair[1] % 5) as i64 - cx, (pair[1] / 5) as i64 - cy);
                assert!(ax * by - ay * bx > 0, "fan {:?} turns clockwise", fan);
            }
        }
    }
}
