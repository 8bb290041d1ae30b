use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackError {
    #[error("Image has a zero dimension ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    #[error("Image pixel buffer is empty")]
    EmptyBuffer,

    #[error("Buffer size mismatch: expected {expected}, got {actual} bytes")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Invalid target size {width}x{height}")]
    InvalidTarget { width: u32, height: u32 },

    #[error("Tensor length mismatch: expected {expected} values, got {actual}")]
    TensorLength { expected: usize, actual: usize },

    #[error("Image buffer rejected: {0}")]
    ImageBuffer(#[from] fast_image_resize::ImageBufferError),

    #[error("Resize failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),

    #[error("Tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}
