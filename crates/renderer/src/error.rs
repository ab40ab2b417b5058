use crate::gpu::ResourceId;

/// Failure to bring up the drawing surface or the resources the pipeline
/// needs before its first frame. Fatal: the frame driver never starts.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),
    #[error("no compatible GPU adapter: {0}")]
    Adapter(String),
    #[error("failed to create GPU device: {0}")]
    Device(String),
    #[error("surface size {width}x{height} is not drawable")]
    EmptySurface { width: u32, height: u32 },
    #[error("surface {width}x{height} exceeds the GPU texture limit of {limit}")]
    TooLarge { width: u32, height: u32, limit: u32 },
    #[error("failed to create pipeline resources: {0}")]
    Resources(#[from] RenderError),
}

/// Errors raised while building resources or encoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("surface ran out of memory")]
    OutOfMemory,
    #[error("composer has no passes")]
    EmptyComposer,
    #[error("pass {index} reads an input texture but no earlier pass produced one")]
    MissingInput { index: usize },
    #[error("renderer has been disposed")]
    Disposed,
    #[error("no frame is being encoded")]
    NoActiveFrame,
    #[error("unknown GPU resource {0:?}")]
    UnknownResource(ResourceId),
    #[error("GPU resource creation failed: {0}")]
    Resource(String),
}
