use dewarp_core::ImageError;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TpsError {
    #[error("{sources} source points but {targets} target points")]
    LengthMismatch { sources: usize, targets: usize },
    #[error("thin-plate spline needs at least 3 control points, got {0}")]
    TooFewPoints(usize),
    #[error("{which} point {index} is not finite")]
    NonFinite { which: &'static str, index: usize },
    #[error("regularization must be finite and non-negative, got {0}")]
    InvalidRegularization(f64),
    #[error(
        "thin-plate spline system is singular (rank {rank} of {size}); \
         control points are duplicated or collinear"
    )]
    Singular { rank: usize, size: usize },
    #[error("output size {rows}x{cols} is empty")]
    EmptyOutput { rows: usize, cols: usize },
    #[error(transparent)]
    Image(#[from] ImageError),
}
