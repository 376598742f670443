use super::triangle::TriangleId;
use super::PlanetMesh;
use crate::context::FrameContext;
use crate::culling::Classify;
use crate::error::LodError;
use crate::planet::quad_tree::DrawStats;
use crate::planet::renderer::{Cone, DrawCall, FanSink, Vertex};

impl PlanetMesh {
    /// Number of triangles that fit into one buffer object
    pub fn triangles_per_object(&self) -> usize {
        let config = self.pool.config();
        config.vertices_per_object.min(config.indices_per_object) / 3
    }

    pub(super) fn draw_leaves<S: FanSink<()>>(
        &mut self,
        ctx: &FrameContext,
        sink: &mut S,
    ) -> Result<DrawStats, LodError> {
        let chunk = self.triangles_per_object();
        if chunk == 0 {
            return Err(LodError::invariant("mesh buffer objects cannot hold a single triangle"));
        }

        let frustum = ctx.frustum();
        let horizon = Cone::new(ctx.camera_position(), self.generator.occluder_radius());

        let mut stats = DrawStats::default();
        let mut visible: Vec<TriangleId> = Vec::new();
        for (id, triangle) in self.leaves() {
            // Leaves are flat, so the box around their corners is exact
            if !frustum.intersects(&triangle.bounds) || horizon.contains(&triangle.bounds) {
                stats.culled += 1;
            } else {
                visible.push(id);
            }
        }
        stats.visible_leaves = visible.len();

        let needed = (visible.len() + chunk - 1) / chunk;
        while self.objects.len() < needed {
            let record = self.pool.allocate_object()?;
            self.objects.push(record);
        }
        while self.objects.len() > needed {
            if let Some(record) = self.objects.pop() {
                self.pool.free_object(record)?;
            }
        }

        for (ids, &record) in visible.chunks(chunk).zip(self.objects.iter()) {
            let mut vertices: Vec<Vertex> = Vec::with_capacity(3 * ids.len());
            for id in ids {
                let triangle = self.triangle_ref(*id)?;
                vertices.extend(triangle.vertices.iter().map(|index| self.vertices.vertex(*index)));
            }
            let base = self.pool.vertex_offset(record) as u32;
            let indices: Vec<u32> = (0..vertices.len() as u32).map(|i| base + i).collect();
            self.pool.write_vertices(record, &vertices)?;
            self.pool.write_indices(record, &indices)?;
            stats.uploads += 1;

            let call = DrawCall {
                record,
                index_start: self.pool.index_offset(record),
                index_count: indices.len(),
            };
            sink.draw(&self.pool, call, &())?;
            stats.fans += 1;
        }

        trace!("frame {}: drew {:?}", ctx.frame, stats);
        Ok(stats)
    }
}
