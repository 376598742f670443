//! Longest-edge bisection mesh over an octahedron projected onto the planet.
//!
//! A triangle splits together with its base partner: the shared base is bisected and both
//! triangles get two children, four in total. The two parents and their children form a
//! [`Diamond`], which is also what gets merged again. A triangle whose base neighbour is coarser
//! forces that neighbour to split first, so the mesh never contains a T-junction.

use crate::config::MeshConfig;
use crate::context::FrameContext;
use crate::culling;
use crate::error::LodError;
use crate::id_arena::Arena;
use crate::planet::quad_tree::{DrawStats, UpdateStats};
use crate::planet::renderer::{BufferPool, FanSink, ObjectRecord, Primitive};
use crate::planet::{midpoint_normal, Generator, VertexArena, VertexIndex};
use glium::backend::Facade;
use nalgebra::Vector3;
use std::collections::VecDeque;

mod diamond;
mod draw;
mod merge;
mod split;
mod triangle;
mod validate;


pub use self::diamond::{Diamond, DiamondId};
pub use self::triangle::{Triangle, TriangleId, APEX, BASE, LEFT, LEFT_VERTEX, RIGHT, RIGHT_VERTEX};

pub struct PlanetMesh {
    config: MeshConfig,
    generator: Generator,
    vertices: VertexArena,
    pool: BufferPool,
    /// Buffer objects the leaves are streamed into, reused from frame to frame
    objects: Vec<ObjectRecord>,

    triangles: Arena<Triangle>,
    diamonds: Arena<Diamond>,
    base: Vec<TriangleId>,

    split_queue: VecDeque<TriangleId>,
    merge_queue: VecDeque<DiamondId>,
    delete_queue: Vec<TriangleId>,
}

impl PlanetMesh {
    /// Builds the eight base triangles of the octahedron.
    pub fn new(config: MeshConfig, generator: Generator) -> Result<PlanetMesh, LodError> {
        if config.buffers.primitive != Primitive::Triangles {
            warn!(
                "mesh buffers are configured for {:?} but are filled with plain triangles",
                config.buffers.primitive
            );
        }
        let pool = BufferPool::new(config.buffers.clone());
        let mut mesh = PlanetMesh {
            config,
            generator,
            vertices: VertexArena::new(),
            pool,
            objects: Vec::new(),
            triangles: Arena::new(),
            diamonds: Arena::new(),
            base: Vec::with_capacity(8),
            split_queue: VecDeque::new(),
            merge_queue: VecDeque::new(),
            delete_queue: Vec::new(),
        };
        mesh.create_octahedron()?;
        Ok(mesh)
    }

    fn create_octahedron(&mut self) -> Result<(), LodError> {
        let north = self.new_vertex(Vector3::y());
        let south = self.new_vertex(-Vector3::y());
        let equator = [
            self.new_vertex(Vector3::z()),
            self.new_vertex(Vector3::x()),
            self.new_vertex(-Vector3::z()),
            self.new_vertex(-Vector3::x()),
        ];

        let mut northern = Vec::with_capacity(4);
        let mut southern = Vec::with_capacity(4);
        for i in 0..4 {
            let (a, b) = (equator[i], equator[(i + 1) % 4]);
            northern.push(self.create_triangle([north, a, b], None, 0));
            southern.push(self.create_triangle([south, b, a], None, 0));
        }

        // The equator edges are the bases, so every northern triangle pairs with the southern one
        // below it.
        for i in 0..4 {
            let (previous, next) = ((i + 3) % 4, (i + 1) % 4);
            self.triangle_mut(northern[i])?.neighbors =
                [Some(southern[i]), Some(northern[previous]), Some(northern[next])];
            self.triangle_mut(southern[i])?.neighbors =
                [Some(northern[i]), Some(southern[next]), Some(southern[previous])];
        }

        self.base.extend(northern);
        self.base.extend(southern);
        for id in self.base.clone() {
            self.enqueue_split(id);
        }
        info!(
            "created octahedron with {} triangles sharing {} vertices",
            self.base.len(),
            self.vertices.live_count()
        );
        Ok(())
    }

    /// Allocates a vertex on the surface in direction `normal`. Nothing refers to it yet.
    fn new_vertex(&mut self, normal: Vector3<f64>) -> VertexIndex {
        let index = self.vertices.get_new_vertex_index();
        self.vertices.set(index, self.generator.compute_vertex(&normal), normal);
        index
    }

    /// Inserts a triangle, attaching it to its corners and measuring the error of its base.
    fn create_triangle(
        &mut self,
        vertices: [VertexIndex; 3],
        parent: Option<TriangleId>,
        level: usize,
    ) -> TriangleId {
        for index in vertices.iter() {
            self.vertices.attach_vertex_index(*index);
        }

        let left = *self.vertices.position(vertices[LEFT_VERTEX]);
        let right = *self.vertices.position(vertices[RIGHT_VERTEX]);
        let normal = midpoint_normal(
            self.vertices.normal(vertices[LEFT_VERTEX]),
            self.vertices.normal(vertices[RIGHT_VERTEX]),
        );
        let midpoint = self.generator.compute_vertex(&normal);
        let flat = left + (right - left) * 0.5;
        let radius = vertices
            .iter()
            .map(|index| (self.vertices.position(*index) - midpoint).norm())
            .fold(0.0, f64::max);
        let bounds =
            culling::aabb_from_points(vertices.iter().map(|index| self.vertices.position(*index)));

        self.triangles.insert(Triangle {
            vertices,
            neighbors: [None; 3],
            parent,
            children: None,
            diamond: None,
            level,
            midpoint,
            midpoint_normal: normal,
            midpoint_error: (midpoint - flat).norm(),
            radius,
            bounds,
            in_split_queue: false,
            retired: false,
        })
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn vertices(&self) -> &VertexArena {
        &self.vertices
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// The eight octahedron triangles, northern hemisphere first
    pub fn base_triangles(&self) -> &[TriangleId] {
        &self.base
    }

    pub fn triangle(&self, id: TriangleId) -> Option<&Triangle> {
        self.triangles.get(id).filter(|triangle| !triangle.retired)
    }

    pub fn diamond(&self, id: DiamondId) -> Option<&Diamond> {
        self.diamonds.get(id)
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.iter().filter(|(_, triangle)| !triangle.retired).count()
    }

    pub fn diamond_count(&self) -> usize {
        self.diamonds.len()
    }

    pub fn leaves(&self) -> impl Iterator<Item = (TriangleId, &Triangle)> {
        self.triangles
            .iter()
            .filter(|(_, triangle)| triangle.is_leaf() && !triangle.retired)
    }

    pub fn diamonds(&self) -> impl Iterator<Item = (DiamondId, &Diamond)> {
        self.diamonds.iter()
    }

    /// Uploads the buffer pool onto the context of `facade`.
    pub fn init<F: ?Sized + Facade>(&mut self, facade: &F) -> Result<(), LodError> {
        self.pool.load(facade)?;
        info!("planet mesh initialized with {} triangles", self.triangle_count());
        Ok(())
    }

    /// Per-frame split and merge bookkeeping. When `not_visible_hint` is set only merges are
    /// processed. Errors are logged and abort the rest of the frame.
    pub fn update(&mut self, ctx: &FrameContext, not_visible_hint: bool) -> UpdateStats {
        match self.try_update(ctx, not_visible_hint) {
            Ok(stats) => stats,
            Err(err) => {
                error!("mesh update aborted in frame {}: {}", ctx.frame, err);
                UpdateStats::default()
            }
        }
    }

    pub fn try_update(
        &mut self,
        ctx: &FrameContext,
        not_visible_hint: bool,
    ) -> Result<UpdateStats, LodError> {
        let mut stats = UpdateStats::default();

        if not_visible_hint {
            debug!("frame {}: planet not visible, only merging", ctx.frame);
        } else {
            let batch = self.config.split_batch.min(self.split_queue.len());
            for _ in 0..batch {
                let id = match self.split_queue.pop_front() {
                    Some(id) => id,
                    None => break,
                };
                match self.triangles.get_mut(id) {
                    Some(triangle) if !triangle.retired => {
                        triangle.in_split_queue = false;
                        if !triangle.is_leaf() {
                            continue;
                        }
                    }
                    _ => {
                        trace!("dropping stale split candidate {:?}", id);
                        continue;
                    }
                }

                if self.should_split(id, ctx)? {
                    let forced = self.split_with_partners(id, ctx.frame)?;
                    stats.splits += 1;
                    stats.forced_splits += forced;
                } else {
                    self.enqueue_split(id);
                    stats.requeued += 1;
                }
            }
        }

        let batch = self.config.merge_batch.min(self.merge_queue.len());
        for _ in 0..batch {
            let id = match self.merge_queue.pop_front() {
                Some(id) => id,
                None => break,
            };
            match self.diamonds.get_mut(id) {
                Some(diamond) => diamond.in_merge_queue = false,
                None => {
                    trace!("dropping stale merge candidate {:?}", id);
                    continue;
                }
            }
            // Requeued by the last child to become a leaf again
            if !self.children_are_leaves(id)? {
                continue;
            }

            if self.is_mergeable(id, ctx)? {
                self.merge_diamond(id)?;
                stats.merges += 1;
            } else {
                self.enqueue_merge(id);
                stats.requeued += 1;
            }
        }

        stats.deleted = self.reclaim_deleted();
        if stats.splits + stats.merges > 0 {
            debug!(
                "frame {}: {:?}, {} triangles, {} diamonds",
                ctx.frame,
                stats,
                self.triangles.len(),
                self.diamonds.len()
            );
        }
        Ok(stats)
    }

    /// Streams the visible leaf triangles into the buffer pool and hands them to `sink` chunk by
    /// chunk.
    pub fn draw<S: FanSink<()>>(
        &mut self,
        ctx: &FrameContext,
        sink: &mut S,
    ) -> Result<DrawStats, LodError> {
        self.draw_leaves(ctx, sink)
    }

    /// Releases the GPU buffers. The mesh is kept and can be uploaded again with
    /// [`init`](PlanetMesh::init).
    pub fn cleanup(&mut self) {
        if !self.pool.is_loaded() {
            warn!("cleanup called on a planet mesh that was never initialized");
        }
        self.pool.unload();
    }

    /// Splits a leaf and its base partner regardless of the camera, splitting coarser base
    /// neighbours first. `frame` becomes the creation frame of the new diamonds. Returns the
    /// number of forced splits.
    pub fn split(&mut self, id: TriangleId, frame: u64) -> Result<usize, LodError> {
        if !self.triangle_ref(id)?.is_leaf() {
            return Err(LodError::invariant(format!("{:?} is already split", id)));
        }
        self.split_with_partners(id, frame)
    }

    /// Merges a diamond regardless of the camera and its age. Returns `false` when one of its
    /// children is split.
    pub fn merge(&mut self, id: DiamondId) -> Result<bool, LodError> {
        if !self.children_are_leaves(id)? {
            return Ok(false);
        }
        self.merge_diamond(id)?;
        self.reclaim_deleted();
        Ok(true)
    }

    fn enqueue_split(&mut self, id: TriangleId) {
        if let Some(triangle) = self.triangles.get_mut(id) {
            if !triangle.in_split_queue {
                triangle.in_split_queue = true;
                self.split_queue.push_back(id);
            }
        }
    }

    fn enqueue_merge(&mut self, id: DiamondId) {
        if let Some(diamond) = self.diamonds.get_mut(id) {
            if !diamond.in_merge_queue {
                diamond.in_merge_queue = true;
                self.merge_queue.push_back(id);
            }
        }
    }

    fn reclaim_deleted(&mut self) -> usize {
        let mut count = 0;
        for id in self.delete_queue.drain(..) {
            if self.triangles.remove(id).is_some() {
                count += 1;
            }
        }
        count
    }

    fn triangle_ref(&self, id: TriangleId) -> Result<&Triangle, LodError> {
        self.triangles.get(id).ok_or_else(|| LodError::stale(id))
    }

    fn triangle_mut(&mut self, id: TriangleId) -> Result<&mut Triangle, LodError> {
        self.triangles.get_mut(id).ok_or_else(|| LodError::stale(id))
    }

    fn diamond_ref(&self, id: DiamondId) -> Result<&Diamond, LodError> {
        self.diamonds.get(id).ok_or_else(|| LodError::stale(id))
    }
}
