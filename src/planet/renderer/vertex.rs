/// Interleaved vertex layout streamed to the GPU: 8 floats per vertex.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vertex {
    pub texcoord: [f32; 2],
    pub normal: [f32; 3],
    pub position: [f32; 3],
}

implement_vertex!(Vertex, texcoord, normal, position);
