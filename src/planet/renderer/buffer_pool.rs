use super::Vertex;
use crate::error::LodError;
use glium::backend::{Context, Facade};
use glium::index::PrimitiveType;
use glium::{IndexBuffer, VertexBuffer};
use std::rc::Rc;

/// How often the contents of the buckets are expected to change.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateMode {
    Static,
    Dynamic,
}

/// Primitive the index data of a pool describes.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Primitive {
    TriangleFan,
    Triangles,
}

impl Primitive {
    fn primitive_type(self) -> PrimitiveType {
        match self {
            Primitive::TriangleFan => PrimitiveType::TriangleFan,
            Primitive::Triangles => PrimitiveType::TrianglesList,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BufferPoolConfig {
    pub update_mode: UpdateMode,
    pub primitive: Primitive,
    pub objects_per_bucket: usize,
    pub vertices_per_object: usize,
    pub indices_per_object: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        // One quadtree leaf: a 5x5 vertex grid drawn as four fans of at most ten indices.
        BufferPoolConfig {
            update_mode: UpdateMode::Dynamic,
            primitive: Primitive::TriangleFan,
            objects_per_bucket: 64,
            vertices_per_object: 25,
            indices_per_object: 40,
        }
    }
}

/// A slice of one bucket, large enough for the geometry of a single object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRecord {
    pub bucket: usize,
    pub object: usize,
}

struct GpuBucket {
    vertex_buffer: VertexBuffer<Vertex>,
    index_buffer: IndexBuffer<u32>,
}

struct Bucket {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    allocated: Vec<bool>,
    gpu: Option<GpuBucket>,
}

/// Fixed size buckets of vertex and index storage carved into per-object slices.
///
/// CPU side copies of every bucket are kept so the pool can be (re)loaded onto a context at any
/// time. Buckets are never returned; freed objects go back onto a stack and are handed out again.
pub struct BufferPool {
    config: BufferPoolConfig,
    buckets: Vec<Bucket>,
    free: Vec<ObjectRecord>,
    context: Option<Rc<Context>>,
}

impl BufferPool {
    pub fn new(config: BufferPoolConfig) -> BufferPool {
        BufferPool {
            config,
            buckets: Vec::new(),
            free: Vec::new(),
            context: None,
        }
    }

    pub fn config(&self) -> &BufferPoolConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.context.is_some()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Hands out a free object, growing the pool by one bucket if none is left.
    pub fn allocate_object(&mut self) -> Result<ObjectRecord, LodError> {
        let record = match self.free.pop() {
            Some(record) => record,
            None => {
                let bucket = self.buckets.len();
                let count = self.config.objects_per_bucket.max(1);
                let gpu = match self.context {
                    Some(ref context) => Some(create_gpu_bucket(context, &self.config)?),
                    None => None,
                };
                self.buckets.push(Bucket {
                    vertices: vec![Vertex::default(); count * self.config.vertices_per_object],
                    indices: vec![0; count * self.config.indices_per_object],
                    allocated: vec![false; count],
                    gpu,
                });

                // Pushed in reverse so the lowest objects are handed out first
                for object in (1..count).rev() {
                    self.free.push(ObjectRecord { bucket, object });
                }
                debug!("buffer pool grew to {} buckets", self.buckets.len());
                ObjectRecord { bucket, object: 0 }
            }
        };
        self.buckets[record.bucket].allocated[record.object] = true;
        trace!("allocated buffer object {:?}", record);
        Ok(record)
    }

    /// Returns the object to the pool. The storage itself is kept.
    pub fn free_object(&mut self, record: ObjectRecord) -> Result<(), LodError> {
        let slot = self
            .buckets
            .get_mut(record.bucket)
            .and_then(|bucket| bucket.allocated.get_mut(record.object))
            .ok_or_else(|| LodError::stale(record))?;
        if !*slot {
            return Err(LodError::ObjectDoubleFree {
                bucket: record.bucket,
                object: record.object,
            });
        }
        *slot = false;
        self.free.push(record);
        Ok(())
    }

    /// First vertex of the object within its bucket
    pub fn vertex_offset(&self, record: ObjectRecord) -> usize {
        record.object * self.config.vertices_per_object
    }

    /// First index of the object within its bucket
    pub fn index_offset(&self, record: ObjectRecord) -> usize {
        record.object * self.config.indices_per_object
    }

    /// Writes the vertex block of an object.
    pub fn write_vertices(
        &mut self,
        record: ObjectRecord,
        vertices: &[Vertex],
    ) -> Result<(), LodError> {
        if vertices.len() > self.config.vertices_per_object {
            return Err(LodError::invariant(format!(
                "{} vertices do not fit an object of {}",
                vertices.len(),
                self.config.vertices_per_object
            )));
        }
        let start = self.vertex_offset(record);
        let bucket = self.bucket_mut(record)?;
        bucket.vertices[start..start + vertices.len()].copy_from_slice(vertices);
        if let Some(ref gpu) = bucket.gpu {
            if let Some(slice) = gpu.vertex_buffer.slice(start..start + vertices.len()) {
                slice.write(vertices);
            }
        }
        Ok(())
    }

    /// Writes indices of an object. Indices are relative to the bucket, see
    /// [`vertex_offset`](BufferPool::vertex_offset).
    pub fn write_indices(&mut self, record: ObjectRecord, indices: &[u32]) -> Result<(), LodError> {
        if indices.len() > self.config.indices_per_object {
            return Err(LodError::invariant(format!(
                "{} indices do not fit an object of {}",
                indices.len(),
                self.config.indices_per_object
            )));
        }
        let start = self.index_offset(record);
        let bucket = self.bucket_mut(record)?;
        bucket.indices[start..start + indices.len()].copy_from_slice(indices);
        if let Some(ref gpu) = bucket.gpu {
            if let Some(slice) = gpu.index_buffer.slice(start..start + indices.len()) {
                slice.write(indices);
            }
        }
        Ok(())
    }

    /// CPU copy of the vertices of an object
    pub fn vertices(&self, record: ObjectRecord) -> &[Vertex] {
        let start = self.vertex_offset(record);
        &self.buckets[record.bucket].vertices[start..start + self.config.vertices_per_object]
    }

    /// CPU copy of the indices of an object
    pub fn indices(&self, record: ObjectRecord) -> &[u32] {
        let start = self.index_offset(record);
        &self.buckets[record.bucket].indices[start..start + self.config.indices_per_object]
    }

    /// Creates the GPU buffers of every bucket on the given context and uploads their content.
    pub fn load<F: ?Sized + Facade>(&mut self, facade: &F) -> Result<(), LodError> {
        let context = facade.get_context().clone();
        for bucket in self.buckets.iter_mut() {
            if bucket.gpu.is_none() {
                let gpu = create_gpu_bucket(&context, &self.config)?;
                gpu.vertex_buffer.write(&bucket.vertices);
                gpu.index_buffer.write(&bucket.indices);
                bucket.gpu = Some(gpu);
            }
        }
        info!("loaded {} buffer pool buckets", self.buckets.len());
        self.context = Some(context);
        Ok(())
    }

    /// Releases all GPU buffers. The CPU copies are kept.
    pub fn unload(&mut self) {
        for bucket in self.buckets.iter_mut() {
            bucket.gpu = None;
        }
        if self.context.take().is_some() {
            info!("unloaded {} buffer pool buckets", self.buckets.len());
        }
    }

    pub(crate) fn gpu_buffers(
        &self,
        bucket: usize,
    ) -> Option<(&VertexBuffer<Vertex>, &IndexBuffer<u32>)> {
        self.buckets
            .get(bucket)
            .and_then(|bucket| bucket.gpu.as_ref())
            .map(|gpu| (&gpu.vertex_buffer, &gpu.index_buffer))
    }

    fn bucket_mut(&mut self, record: ObjectRecord) -> Result<&mut Bucket, LodError> {
        match self.buckets.get_mut(record.bucket) {
            Some(bucket) if bucket.allocated.get(record.object) == Some(&true) => Ok(bucket),
            _ => Err(LodError::stale(record)),
        }
    }
}

fn create_gpu_bucket(
    context: &Rc<Context>,
    config: &BufferPoolConfig,
) -> Result<GpuBucket, LodError> {
    let objects = config.objects_per_bucket.max(1);
    let vertex_count = objects * config.vertices_per_object;
    let index_count = objects * config.indices_per_object;
    let primitive = config.primitive.primitive_type();
    Ok(match config.update_mode {
        UpdateMode::Static => GpuBucket {
            vertex_buffer: VertexBuffer::empty(context, vertex_count)?,
            index_buffer: IndexBuffer::empty(context, primitive, index_count)?,
        },
        UpdateMode::Dynamic => GpuBucket {
            vertex_buffer: VertexBuffer::empty_dynamic(context, vertex_count)?,
            index_buffer: IndexBuffer::empty_dynamic(context, primitive, index_count)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_pool() -> BufferPool {
        BufferPool::new(BufferPoolConfig {
            objects_per_bucket: 4,
            vertices_per_object: 3,
            indices_per_object: 3,
            ..Default::default()
        })
    }

    #[test]
    fn objects_are_handed_out_in_order() {
        let mut pool = small_pool();
        let records: Vec<ObjectRecord> = (0..4).map(|_| pool.allocate_object().unwrap()).collect();
        assert_eq!(
            records,
            (0..4)
                .map(|object| ObjectRecord { bucket: 0, object })
                .collect::<Vec<_>>()
        );
        assert_eq!(pool.bucket_count(), 1);
        assert_eq!(pool.free_count(), 0);

        let next = pool.allocate_object().unwrap();
        assert_eq!(next, ObjectRecord { bucket: 1, object: 0 });
        assert_eq!(pool.bucket_count(), 2);
        assert_eq!(pool.free_count(), 3);
    }

    #[test]
    fn freed_objects_are_reused_first() {
        let mut pool = small_pool();
        let a = pool.allocate_object().unwrap();
        let b = pool.allocate_object().unwrap();
        pool.free_object(a).unwrap();
        assert_eq!(pool.allocate_object().unwrap(), a);
        assert_ne!(pool.allocate_object().unwrap(), b);
    }

    #[test]
    fn double_free_is_detected() {
        let mut pool = small_pool();
        let a = pool.allocate_object().unwrap();
        pool.free_object(a).unwrap();
        match pool.free_object(a) {
            Err(LodError::ObjectDoubleFree { bucket: 0, object: 0 }) => {}
            other => panic!("expected a double free, got {:?}", other),
        }
        assert!(pool
            .free_object(ObjectRecord { bucket: 9, object: 0 })
            .is_err());
    }

    #[test]
    fn writes_land_in_the_object_slice() {
        let mut pool = small_pool();
        let _first = pool.allocate_object().unwrap();
        let second = pool.allocate_object().unwrap();
        let vertex = Vertex {
            texcoord: [0.5, 0.25],
            normal: [0.0, 1.0, 0.0],
            position: [1.0, 2.0, 3.0],
        };
        pool.write_vertices(second, &[vertex, vertex]).unwrap();
        pool.write_indices(second, &[3, 4, 5]).unwrap();

        assert_eq!(pool.vertex_offset(second), 3);
        assert_eq!(pool.vertices(second)[1], vertex);
        assert_eq!(pool.indices(second), &[3, 4, 5]);
        assert!(pool.write_indices(second, &[0; 4]).is_err());

        pool.free_object(second).unwrap();
        assert!(pool.write_vertices(second, &[vertex]).is_err());
    }

    #[test]
    fn unloaded_pool_has_no_gpu_buffers() {
        let mut pool = small_pool();
        pool.allocate_object().unwrap();
        assert!(!pool.is_loaded());
        assert!(pool.gpu_buffers(0).is_none());
        pool.unload();
        assert!(!pool.is_loaded());
    }
}
