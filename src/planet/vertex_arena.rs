use crate::error::LodError;
use crate::planet::generator::polar_texcoord;
use crate::planet::renderer::Vertex;
use nalgebra::{Point3, Vector3};
use std::fmt;

/// Index of a vertex in a [`VertexArena`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexIndex(pub u32);

impl VertexIndex {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for VertexIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Reference counted pool of vertices shared between patches.
///
/// Attributes live in parallel arrays indexed by [`VertexIndex`]. A slot is handed out by
/// [`get_new_vertex_index`](VertexArena::get_new_vertex_index) with a reference count of zero;
/// every patch that stores the index attaches to it and releases it again when it goes away. Once
/// the count drops back to zero the slot is recycled.
#[derive(Default)]
pub struct VertexArena {
    positions: Vec<Point3<f64>>,
    normals: Vec<Vector3<f64>>,
    texcoords: Vec<[f32; 2]>,
    ref_counts: Vec<u32>,
    free: Vec<VertexIndex>,
}

impl VertexArena {
    pub fn new() -> VertexArena {
        VertexArena::default()
    }

    /// Reserves a slot, reusing a freed one when possible. The position is reset to the origin.
    pub fn get_new_vertex_index(&mut self) -> VertexIndex {
        match self.free.pop() {
            Some(index) => {
                self.positions[index.index()] = Point3::origin();
                self.normals[index.index()] = Vector3::zeros();
                self.texcoords[index.index()] = [0.0, 0.0];
                index
            }
            None => {
                let index = VertexIndex(self.positions.len() as u32);
                self.positions.push(Point3::origin());
                self.normals.push(Vector3::zeros());
                self.texcoords.push([0.0, 0.0]);
                self.ref_counts.push(0);
                index
            }
        }
    }

    /// Adds a reference to the vertex. Like the attribute accessors this expects an index handed
    /// out by [`get_new_vertex_index`](VertexArena::get_new_vertex_index).
    ///
    /// # Panics
    ///
    /// Panics when `index` was never allocated by this arena.
    pub fn attach_vertex_index(&mut self, index: VertexIndex) -> VertexIndex {
        self.ref_counts[index.index()] += 1;
        index
    }

    /// Drops a reference to the vertex, recycling it when nothing refers to it anymore.
    pub fn free_vertex_index(&mut self, index: VertexIndex) -> Result<(), LodError> {
        let count = self
            .ref_counts
            .get_mut(index.index())
            .ok_or(LodError::UnknownVertex(index.0))?;
        if *count == 0 {
            return Err(LodError::VertexDoubleFree(index.0));
        }
        *count -= 1;
        if *count == 0 {
            trace!("vertex {:?} returned to the free list", index);
            self.free.push(index);
        }
        Ok(())
    }

    /// Stores the attributes of a vertex. The texture coordinate is derived from the normal.
    pub fn set(&mut self, index: VertexIndex, position: Point3<f64>, normal: Vector3<f64>) {
        self.positions[index.index()] = position;
        self.normals[index.index()] = normal;
        self.texcoords[index.index()] = polar_texcoord(&normal);
    }

    pub fn position(&self, index: VertexIndex) -> &Point3<f64> {
        &self.positions[index.index()]
    }

    pub fn normal(&self, index: VertexIndex) -> &Vector3<f64> {
        &self.normals[index.index()]
    }

    pub fn texcoord(&self, index: VertexIndex) -> [f32; 2] {
        self.texcoords[index.index()]
    }

    /// The attributes of a vertex in the layout that is streamed to the GPU
    pub fn vertex(&self, index: VertexIndex) -> Vertex {
        let position = &self.positions[index.index()];
        let normal = &self.normals[index.index()];
        Vertex {
            texcoord: self.texcoords[index.index()],
            normal: [normal.x as f32, normal.y as f32, normal.z as f32],
            position: [position.x as f32, position.y as f32, position.z as f32],
        }
    }

    pub fn ref_count(&self, index: VertexIndex) -> u32 {
        self.ref_counts.get(index.index()).cloned().unwrap_or(0)
    }

    /// Number of slots ever allocated, live or free
    pub fn capacity(&self) -> usize {
        self.positions.len()
    }

    /// Number of slots with at least one reference
    pub fn live_count(&self) -> usize {
        self.ref_counts.iter().filter(|&&count| count > 0).count()
    }

    /// Iterates over every vertex with a non-zero reference count
    pub fn live(&self) -> impl Iterator<Item = (VertexIndex, u32)> + '_ {
        self.ref_counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(i, &count)| (VertexIndex(i as u32), count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freed_vertices_are_reused() {
        let mut arena = VertexArena::new();
        let a = arena.get_new_vertex_index();
        arena.attach_vertex_index(a);
        let b = arena.get_new_vertex_index();
        arena.attach_vertex_index(b);
        assert_ne!(a, b);
        assert_eq!(arena.live_count(), 2);

        arena.free_vertex_index(a).unwrap();
        assert_eq!(arena.ref_count(a), 0);
        assert_eq!(arena.live_count(), 1);

        let c = arena.get_new_vertex_index();
        assert_eq!(c, a);
        assert_eq!(*arena.position(c), Point3::origin());
        assert_eq!(arena.capacity(), 2);
    }

    #[test]
    #[should_panic]
    fn attaching_an_unknown_vertex_panics() {
        let mut arena = VertexArena::new();
        arena.get_new_vertex_index();
        arena.attach_vertex_index(VertexIndex(1));
    }

    #[test]
    fn shared_vertices_survive_until_last_release() {
        let mut arena = VertexArena::new();
        let index = arena.get_new_vertex_index();
        arena.attach_vertex_index(index);
        arena.attach_vertex_index(index);
        arena.attach_vertex_index(index);
        assert_eq!(arena.ref_count(index), 3);

        arena.free_vertex_index(index).unwrap();
        arena.free_vertex_index(index).unwrap();
        assert_eq!(arena.get_new_vertex_index(), VertexIndex(1));
        arena.free_vertex_index(index).unwrap();
        assert_eq!(arena.get_new_vertex_index(), index);
    }

    #[test]
    fn double_free_is_reported() {
        let mut arena = VertexArena::new();
        let index = arena.get_new_vertex_index();
        arena.attach_vertex_index(index);
        arena.free_vertex_index(index).unwrap();
        match arena.free_vertex_index(index) {
            Err(LodError::VertexDoubleFree(0)) => {}
            other => panic!("expected a double free, got {:?}", other),
        }
        match arena.free_vertex_index(VertexIndex(42)) {
            Err(LodError::UnknownVertex(42)) => {}
            other => panic!("expected an unknown vertex, got {:?}", other),
        }
    }

    #[test]
    fn attributes_are_stored() {
        let mut arena = VertexArena::new();
        let index = arena.get_new_vertex_index();
        arena.set(index, Point3::new(0.0, 2.0, 0.0), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(*arena.position(index), Point3::new(0.0, 2.0, 0.0));
        assert_eq!(*arena.normal(index), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(arena.texcoord(index)[1], 1.0);
    }
}
