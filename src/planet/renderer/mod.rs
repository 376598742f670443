use crate::error::LodError;
use glium::uniforms::Uniforms;
use glium::{Program, Surface};

mod buffer_pool;
mod horizon_culling;
mod vertex;

pub use self::buffer_pool::{BufferPool, BufferPoolConfig, ObjectRecord, Primitive, UpdateMode};
pub use self::horizon_culling::Cone;
pub use self::vertex::Vertex;

/// A range of indices inside one buffer pool object that forms a single draw.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub record: ObjectRecord,
    /// First index, relative to the start of the bucket
    pub index_start: usize,
    pub index_count: usize,
}

/// Receives the draws issued while walking a level-of-detail structure. `T` is the per-patch
/// payload created by the node factory.
pub trait FanSink<T> {
    fn draw(&mut self, pool: &BufferPool, call: DrawCall, payload: &T) -> Result<(), LodError>;
}

/// Issues the draws straight onto a glium surface.
pub struct GliumSink<'a, S: Surface, U: Uniforms> {
    pub surface: &'a mut S,
    pub program: &'a Program,
    pub uniforms: U,
    pub parameters: glium::DrawParameters<'a>,
}

impl<'a, S: Surface, U: Uniforms, T> FanSink<T> for GliumSink<'a, S, U> {
    fn draw(&mut self, pool: &BufferPool, call: DrawCall, _payload: &T) -> Result<(), LodError> {
        let (vertex_buffer, index_buffer) = pool
            .gpu_buffers(call.record.bucket)
            .ok_or_else(|| LodError::invariant("drawing from a buffer pool that is not loaded"))?;
        let indices = index_buffer
            .slice(call.index_start..call.index_start + call.index_count)
            .ok_or_else(|| {
                LodError::invariant(format!("index range of {:?} out of bounds", call))
            })?;
        self.surface.draw(
            vertex_buffer,
            indices,
            self.program,
            &self.uniforms,
            &self.parameters,
        )?;
        Ok(())
    }
}

/// Keeps track of the draws without touching a GPU. Useful for headless runs.
#[derive(Default, Debug)]
pub struct CountingSink {
    pub draws: usize,
    pub indices: usize,
}

impl<T> FanSink<T> for CountingSink {
    fn draw(&mut self, _pool: &BufferPool, call: DrawCall, _payload: &T) -> Result<(), LodError> {
        self.draws += 1;
        self.indices += call.index_count;
        Ok(())
    }
}
