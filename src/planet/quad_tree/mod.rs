//! Adaptive quadtree over the six faces of a cube projected onto the planet.
//!
//! Every node owns a 5x5 grid of shared vertices. Leaves are drawn as four triangle fans around
//! their center vertex; a fan picks up the mid-edge vertices of a side only when the neighbour
//! across that side is split, which keeps the surface free of T-junction cracks as long as
//! neighbouring leaves never differ by more than one level.
//!
//! Splits and merges are driven by two throttled work queues. Nodes that are merged away are
//! retired and only removed from the arena at the end of the update that retired them.

use crate::config::LodConfig;
use crate::context::FrameContext;
use crate::culling;
use crate::error::LodError;
use crate::id_arena::Arena;
use crate::planet::renderer::{BufferPool, FanSink, Primitive};
use crate::planet::{Face, Generator, VertexArena, VertexIndex};
use glium::backend::Facade;
use nalgebra::Point2;
use std::collections::{HashMap, VecDeque};

mod draw;
mod location;
mod merge;
mod node;
mod normals;
mod split;
mod validate;

#[cfg(test)]
mod tests;

pub use self::draw::{fan_slots, DrawStats, MAX_FAN_INDICES};
pub use self::location::PatchLocation;
pub use self::node::{slot, Child, Node, NodeId, Side, CENTER, GRID_SIZE, GRID_VERTICES};
pub use self::normals::fill_in_normals;

/// What happened during one call to [`SphericalQuadtree::update`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct UpdateStats {
    /// Nodes split because they passed the split test
    pub splits: usize,
    /// Coarser neighbours split to keep the one level rule
    pub forced_splits: usize,
    pub merges: usize,
    /// Nodes removed from the arena at the end of the update
    pub deleted: usize,
    /// Candidates that failed their test and went back into a queue
    pub requeued: usize,
}

pub struct SphericalQuadtree<T> {
    config: LodConfig,
    generator: Generator,
    vertices: VertexArena,
    pool: BufferPool,

    nodes: Arena<Node<T>>,
    roots: Vec<NodeId<T>>,

    split_queue: VecDeque<NodeId<T>>,
    merge_queue: VecDeque<NodeId<T>>,
    delete_queue: Vec<NodeId<T>>,

    factory: Box<dyn FnMut(&PatchLocation) -> T>,
}

impl SphericalQuadtree<()> {
    /// A quadtree whose nodes carry no payload
    pub fn without_payload(config: LodConfig, generator: Generator) -> Result<Self, LodError> {
        SphericalQuadtree::new(config, generator, |_| ())
    }
}

impl<T> SphericalQuadtree<T> {
    /// Builds the six root patches. `factory` creates the payload of every node, including the
    /// roots. Fails when a buffer object cannot hold the grid and fans of a leaf.
    pub fn new<F>(config: LodConfig, generator: Generator, factory: F) -> Result<Self, LodError>
    where
        F: FnMut(&PatchLocation) -> T + 'static,
    {
        let buffers = &config.buffers;
        if buffers.vertices_per_object < GRID_VERTICES
            || buffers.indices_per_object < MAX_FAN_INDICES
        {
            return Err(LodError::invariant(format!(
                "quadtree leaves need {} vertices and {} indices per buffer object, got {} and {}",
                GRID_VERTICES,
                MAX_FAN_INDICES,
                buffers.vertices_per_object,
                buffers.indices_per_object
            )));
        }
        if buffers.primitive != Primitive::TriangleFan {
            warn!(
                "quadtree buffers are configured for {:?} but are filled with triangle fans",
                buffers.primitive
            );
        }

        let pool = BufferPool::new(config.buffers.clone());
        let mut tree = SphericalQuadtree {
            config,
            generator,
            vertices: VertexArena::new(),
            pool,
            nodes: Arena::new(),
            roots: Vec::with_capacity(6),
            split_queue: VecDeque::new(),
            merge_queue: VecDeque::new(),
            delete_queue: Vec::new(),
            factory: Box::new(factory),
        };
        tree.create_roots()?;
        Ok(tree)
    }

    fn create_roots(&mut self) -> Result<(), LodError> {
        // Grid points on shared cube edges and corners map to the same lattice point, so the
        // roots share those vertices from the start.
        let mut lattice: HashMap<[i32; 3], VertexIndex> = HashMap::new();
        for face in Face::values() {
            let location = PatchLocation::root(*face);
            let mut grid = [VertexIndex(0); GRID_VERTICES];
            for y in 0..GRID_SIZE {
                for x in 0..GRID_SIZE {
                    let point = location.cube_point(x, y);
                    let key = [
                        (point.x * 2.0).round() as i32,
                        (point.y * 2.0).round() as i32,
                        (point.z * 2.0).round() as i32,
                    ];
                    let vertices = &mut self.vertices;
                    let generator = &self.generator;
                    grid[slot(x, y)] = *lattice.entry(key).or_insert_with(|| {
                        let index = vertices.get_new_vertex_index();
                        let normal = point.normalize();
                        vertices.set(index, generator.compute_vertex(&normal), normal);
                        index
                    });
                }
            }
            let id = self.create_node(location, None, grid);
            self.roots.push(id);
        }

        let roots = self.roots.clone();
        for &root in roots.iter() {
            for side in Side::ALL.iter() {
                let (a, b) = self.node_ref(root)?.side_corners(*side);
                let neighbor = roots
                    .iter()
                    .cloned()
                    .find(|&other| {
                        other != root
                            && self
                                .nodes
                                .get(other)
                                .and_then(|node| node.side_with_corners(a, b))
                                .is_some()
                    })
                    .ok_or_else(|| {
                        LodError::invariant(format!(
                            "root {:?} has no neighbour on {:?}",
                            root, side
                        ))
                    })?;
                self.node_mut(root)?.adjacent[side.index()] = Some(neighbor);
            }
        }

        for root in roots {
            self.enqueue_split(root);
        }
        info!(
            "created {} root patches sharing {} vertices",
            self.roots.len(),
            self.vertices.live_count()
        );
        Ok(())
    }

    /// Inserts a node and attaches it to every vertex of its grid.
    fn create_node(
        &mut self,
        location: PatchLocation,
        parent: Option<NodeId<T>>,
        vertices: [VertexIndex; GRID_VERTICES],
    ) -> NodeId<T> {
        for index in vertices.iter() {
            self.vertices.attach_vertex_index(*index);
        }

        let center = *self.vertices.position(vertices[CENTER]);
        let radius = [0, GRID_SIZE - 1, GRID_VERTICES - GRID_SIZE, GRID_VERTICES - 1]
            .iter()
            .map(|&corner| (self.vertices.position(vertices[corner]) - center).norm())
            .fold(0.0, f64::max);
        let bounds =
            culling::aabb_from_points(vertices.iter().map(|index| self.vertices.position(*index)));

        let payload = (self.factory)(&location);
        self.nodes.insert(Node {
            location,
            parent,
            children: None,
            adjacent: [None; 4],
            vertices,
            radius,
            bounds,
            object: None,
            fans: [(0, 0); 4],
            dirty: true,
            in_split_queue: false,
            in_merge_queue: false,
            retired: false,
            payload,
        })
    }

    pub fn config(&self) -> &LodConfig {
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

    pub fn roots(&self) -> &[NodeId<T>] {
        &self.roots
    }

    pub fn root(&self, face: Face) -> Option<NodeId<T>> {
        self.roots
            .iter()
            .cloned()
            .find(|&id| self.nodes.get(id).map_or(false, |node| node.location.face == face))
    }

    pub fn node(&self, id: NodeId<T>) -> Option<&Node<T>> {
        self.nodes.get(id).filter(|node| !node.retired)
    }

    pub fn payload_mut(&mut self, id: NodeId<T>) -> Option<&mut T> {
        self.nodes
            .get_mut(id)
            .filter(|node| !node.retired)
            .map(|node| &mut node.payload)
    }

    /// Number of nodes in the tree, leaves and internal nodes alike
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|(_, node)| !node.retired).count()
    }

    pub fn leaves(&self) -> impl Iterator<Item = (NodeId<T>, &Node<T>)> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.is_leaf() && !node.retired)
    }

    /// The leaf covering the point `uv` of `face`
    pub fn find_leaf(&self, face: Face, uv: Point2<f64>) -> Option<NodeId<T>> {
        let mut current = self.root(face)?;
        loop {
            let node = self.nodes.get(current)?;
            match node.children {
                None => return Some(current),
                Some(children) => {
                    current = *children.iter().find(|child| {
                        self.nodes
                            .get(**child)
                            .map_or(false, |child| child.location.contains(&uv))
                    })?;
                }
            }
        }
    }

    /// Uploads the buffer pool onto the context of `facade`.
    pub fn init<F: ?Sized + Facade>(&mut self, facade: &F) -> Result<(), LodError> {
        self.pool.load(facade)?;
        info!("spherical quadtree initialized with {} nodes", self.node_count());
        Ok(())
    }

    /// Per-frame split and merge bookkeeping. When `not_visible_hint` is set the planet is not on
    /// screen and only merges are processed. Errors are logged and abort the rest of the frame.
    pub fn update(&mut self, ctx: &FrameContext, not_visible_hint: bool) -> UpdateStats {
        match self.try_update(ctx, not_visible_hint) {
            Ok(stats) => stats,
            Err(err) => {
                error!("quadtree update aborted in frame {}: {}", ctx.frame, err);
                UpdateStats::default()
            }
        }
    }

    /// Like [`update`](SphericalQuadtree::update) but hands errors to the caller.
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
                match self.nodes.get_mut(id) {
                    Some(node) if !node.retired => {
                        node.in_split_queue = false;
                        if !node.is_leaf() {
                            continue;
                        }
                    }
                    _ => {
                        trace!("dropping stale split candidate {:?}", id);
                        continue;
                    }
                }

                if self.should_split(id, ctx)? {
                    let forced = self.split_with_neighbors(id)?;
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
            match self.nodes.get_mut(id) {
                Some(node) if !node.retired => node.in_merge_queue = false,
                _ => {
                    trace!("dropping stale merge candidate {:?}", id);
                    continue;
                }
            }
            if !self.is_quad(id) {
                continue;
            }

            if self.should_merge(id, ctx)? {
                self.merge_node(id)?;
                stats.merges += 1;
            } else {
                self.enqueue_merge(id);
                stats.requeued += 1;
            }
        }

        stats.deleted = self.reclaim_deleted();
        if stats.splits + stats.merges > 0 {
            debug!("frame {}: {:?}, {} nodes", ctx.frame, stats, self.nodes.len());
        }
        Ok(stats)
    }

    /// Walks the tree and hands every visible leaf fan to `sink`.
    pub fn draw<S: FanSink<T>>(
        &mut self,
        ctx: &FrameContext,
        sink: &mut S,
    ) -> Result<DrawStats, LodError> {
        self.draw_leaves(ctx, sink)
    }

    /// Releases the GPU buffers. The tree itself is kept and can be uploaded again with
    /// [`init`](SphericalQuadtree::init).
    pub fn cleanup(&mut self) {
        if !self.pool.is_loaded() {
            warn!("cleanup called on a quadtree that was never initialized");
        }
        self.pool.unload();
    }

    /// Splits a leaf regardless of the camera, splitting coarser neighbours first. Returns the
    /// number of forced neighbour splits.
    pub fn split(&mut self, id: NodeId<T>) -> Result<usize, LodError> {
        if !self.node_ref(id)?.is_leaf() {
            return Err(LodError::invariant(format!("{:?} is already split", id)));
        }
        let forced = self.split_with_neighbors(id)?;
        self.reclaim_deleted();
        Ok(forced)
    }

    /// Merges the children of `id` back into it regardless of the camera. Returns `false` when
    /// `id` is not a quad or a finer neighbour prevents the merge.
    pub fn merge(&mut self, id: NodeId<T>) -> Result<bool, LodError> {
        if !self.is_quad(id) || self.has_finer_neighbors(id)? {
            return Ok(false);
        }
        self.merge_node(id)?;
        self.reclaim_deleted();
        Ok(true)
    }

    fn enqueue_split(&mut self, id: NodeId<T>) {
        if let Some(node) = self.nodes.get_mut(id) {
            if !node.in_split_queue {
                node.in_split_queue = true;
                self.split_queue.push_back(id);
            }
        }
    }

    fn enqueue_merge(&mut self, id: NodeId<T>) {
        if let Some(node) = self.nodes.get_mut(id) {
            if !node.in_merge_queue {
                node.in_merge_queue = true;
                self.merge_queue.push_back(id);
            }
        }
    }

    fn reclaim_deleted(&mut self) -> usize {
        let mut count = 0;
        for id in self.delete_queue.drain(..) {
            if self.nodes.remove(id).is_some() {
                count += 1;
            }
        }
        count
    }

    fn node_ref(&self, id: NodeId<T>) -> Result<&Node<T>, LodError> {
        self.nodes.get(id).ok_or_else(|| LodError::stale(id))
    }

    fn node_mut(&mut self, id: NodeId<T>) -> Result<&mut Node<T>, LodError> {
        self.nodes.get_mut(id).ok_or_else(|| LodError::stale(id))
    }
}
