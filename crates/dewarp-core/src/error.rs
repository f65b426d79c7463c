/// Errors raised when constructing pixel containers from raw buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid buffer length (expected {expected} values, got {got})")]
    BufferLength { expected: usize, got: usize },
    #[error("invalid image dimensions (width={width}, height={height})")]
    Dimensions { width: usize, height: usize },
}
