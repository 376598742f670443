use thiserror::Error;

/// Errors raised by the level-of-detail structures.
///
/// Most variants describe broken bookkeeping (a programming error rather than bad input). The
/// per-frame drivers log those and skip the remainder of the frame instead of tearing down the
/// planet.
#[derive(Debug, Error)]
pub enum LodError {
    #[error("vertex {0} released while its reference count is already zero")]
    VertexDoubleFree(u32),

    #[error("vertex {0} does not exist")]
    UnknownVertex(u32),

    #[error("buffer object {object} of bucket {bucket} released twice")]
    ObjectDoubleFree { bucket: usize, object: usize },

    #[error("stale or unknown handle {0}")]
    StaleHandle(String),

    #[error("{0} is already queued for deletion")]
    RepeatedDeletion(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("could not create vertex buffer: {0}")]
    VertexBuffer(#[from] glium::vertex::BufferCreationError),

    #[error("could not create index buffer: {0}")]
    IndexBuffer(#[from] glium::index::BufferCreationError),

    #[error("draw call failed: {0}")]
    Draw(#[from] glium::DrawError),

    #[error("could not parse yaml configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("could not parse json configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl LodError {
    pub(crate) fn invariant<S: Into<String>>(message: S) -> LodError {
        LodError::Invariant(message.into())
    }

    pub(crate) fn stale<D: std::fmt::Debug>(id: D) -> LodError {
        LodError::StaleHandle(format!("{:?}", id))
    }
}
