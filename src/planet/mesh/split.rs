use super::diamond::Diamond;
use super::triangle::{Triangle, TriangleId, APEX, BASE, LEFT, LEFT_VERTEX, RIGHT, RIGHT_VERTEX};
use super::PlanetMesh;
use crate::context::FrameContext;
use crate::error::LodError;

impl PlanetMesh {
    pub(super) fn should_split(
        &self,
        id: TriangleId,
        ctx: &FrameContext,
    ) -> Result<bool, LodError> {
        let triangle = self.triangle_ref(id)?;
        if triangle.level >= self.config.max_level {
            return Ok(false);
        }
        Ok(self.passes_split_test(triangle, ctx))
    }

    /// Back-face and screen-space error tests. The error is measured at the point the base would
    /// be split at; a triangle faces the viewer when its corners or that point do.
    pub(super) fn passes_split_test(&self, triangle: &Triangle, ctx: &FrameContext) -> bool {
        let distance = ctx.eye_distance(&triangle.midpoint);
        if distance < triangle.radius {
            return true;
        }

        let facing = triangle
            .vertices
            .iter()
            .map(|index| {
                ctx.facing_cosine(self.vertices.position(*index), self.vertices.normal(*index))
            })
            .fold(
                ctx.facing_cosine(&triangle.midpoint, &triangle.midpoint_normal),
                f64::min,
            );
        if facing >= self.config.angle_cutoff {
            return false;
        }

        let pixels = ctx.pixel_error(triangle.midpoint_error, distance);
        trace!(
            "triangle at level {}: facing {:.3}, error {:.2}px",
            triangle.level,
            facing,
            pixels
        );
        pixels > self.config.pixel_error_cutoff
    }

    /// Splits `id` together with its base partner. A coarser base neighbour is split first, which
    /// may in turn need its own coarser neighbour split, and so on. Returns the number of those
    /// forced splits.
    pub(super) fn split_with_partners(
        &mut self,
        id: TriangleId,
        frame: u64,
    ) -> Result<usize, LodError> {
        let mut stack = vec![id];
        let mut forced = 0;

        while let Some(&top) = stack.last() {
            let triangle = self.triangle_ref(top)?;
            if !triangle.is_leaf() {
                stack.pop();
                continue;
            }

            let level = triangle.level;
            let partner = triangle.neighbors[BASE]
                .ok_or_else(|| LodError::invariant(format!("{:?} has no base neighbour", top)))?;
            let neighbor = self.triangle_ref(partner)?;
            if !neighbor.is_leaf() {
                return Err(LodError::invariant(format!(
                    "{:?} borders the split triangle {:?}",
                    top, partner
                )));
            }

            if neighbor.neighbors[BASE] == Some(top) {
                self.split_diamond(top, partner, frame)?;
                stack.pop();
                if top != id {
                    forced += 1;
                }
            } else if neighbor.level + 1 == level {
                debug!("forcing split of {:?} at level {}", partner, neighbor.level);
                stack.push(partner);
            } else {
                return Err(LodError::invariant(format!(
                    "{:?} at level {} has base neighbour {:?} at level {}",
                    top, level, partner, neighbor.level
                )));
            }
        }
        Ok(forced)
    }

    /// Bisects the common base of the leaves `first` and `second`.
    fn split_diamond(
        &mut self,
        first: TriangleId,
        second: TriangleId,
        frame: u64,
    ) -> Result<(), LodError> {
        let (t, t_neighbors, level, midpoint, normal) = {
            let triangle = self.triangle_ref(first)?;
            (
                triangle.vertices,
                triangle.neighbors,
                triangle.level,
                triangle.midpoint,
                triangle.midpoint_normal,
            )
        };
        let (b, b_neighbors) = {
            let triangle = self.triangle_ref(second)?;
            (triangle.vertices, triangle.neighbors)
        };
        if b[LEFT_VERTEX] != t[RIGHT_VERTEX] || b[RIGHT_VERTEX] != t[LEFT_VERTEX] {
            return Err(LodError::invariant(format!(
                "{:?} and {:?} do not share their base",
                first, second
            )));
        }

        let m = self.vertices.get_new_vertex_index();
        self.vertices.set(m, midpoint, normal);

        let t_left = self.create_triangle([m, t[APEX], t[LEFT_VERTEX]], Some(first), level + 1);
        let t_right = self.create_triangle([m, t[RIGHT_VERTEX], t[APEX]], Some(first), level + 1);
        let b_left = self.create_triangle([m, b[APEX], b[LEFT_VERTEX]], Some(second), level + 1);
        let b_right = self.create_triangle([m, b[RIGHT_VERTEX], b[APEX]], Some(second), level + 1);

        self.triangle_mut(t_left)?.neighbors = [t_neighbors[LEFT], Some(t_right), Some(b_right)];
        self.triangle_mut(t_right)?.neighbors = [t_neighbors[RIGHT], Some(b_left), Some(t_left)];
        self.triangle_mut(b_left)?.neighbors = [b_neighbors[LEFT], Some(b_right), Some(t_right)];
        self.triangle_mut(b_right)?.neighbors = [b_neighbors[RIGHT], Some(t_left), Some(b_left)];

        // The outer neighbours now border a child instead of its parent
        let outer = [
            (t_neighbors[LEFT], first, t_left),
            (t_neighbors[RIGHT], first, t_right),
            (b_neighbors[LEFT], second, b_left),
            (b_neighbors[RIGHT], second, b_right),
        ];
        for &(neighbor, old, new) in outer.iter() {
            let neighbor =
                neighbor.ok_or_else(|| LodError::invariant(format!("{:?} has an open edge", old)))?;
            self.replace_neighbor(neighbor, old, new)?;
        }

        let diamond = self.diamonds.insert(Diamond {
            parents: [first, second],
            children: [t_left, t_right, b_left, b_right],
            frame,
            in_merge_queue: false,
        });
        {
            let triangle = self.triangle_mut(first)?;
            triangle.children = Some([t_left, t_right]);
            triangle.diamond = Some(diamond);
        }
        {
            let triangle = self.triangle_mut(second)?;
            triangle.children = Some([b_left, b_right]);
            triangle.diamond = Some(diamond);
        }

        self.enqueue_merge(diamond);
        for &child in [t_left, t_right, b_left, b_right].iter() {
            self.enqueue_split(child);
        }
        debug!(
            "split {:?} and {:?} at level {} into {:?} in frame {}",
            first, second, level, diamond, frame
        );
        Ok(())
    }

    /// Points the edge of `id` that refers to `old` at `new`.
    pub(super) fn replace_neighbor(
        &mut self,
        id: TriangleId,
        old: TriangleId,
        new: TriangleId,
    ) -> Result<(), LodError> {
        let triangle = self.triangle_mut(id)?;
        let slot = triangle.slot_of(old).ok_or_else(|| {
            LodError::invariant(format!("{:?} does not point back at {:?}", id, old))
        })?;
        triangle.neighbors[slot] = Some(new);
        Ok(())
    }
}
