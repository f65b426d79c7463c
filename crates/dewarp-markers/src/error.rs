/// Errors from canonical layout definition and method parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error(
        "unknown canonical mode `{0}` (expected corners_4, grid_2x2, grid_3x3, auto or preserve_relative)"
    )]
    UnknownMode(String),
    #[error("unknown correspondence method `{0}` (expected spatial_order or nearest_neighbor)")]
    UnknownMethod(String),
    #[error("no markers to derive a canonical layout from")]
    NoMarkers,
    #[error("margin must be finite and non-negative, got {0}")]
    InvalidMargin(f64),
    #[error("grid spacing must be finite and positive, got {0}")]
    InvalidSpacing(f64),
    #[error("margin {margin} leaves no room in a {height}x{width} frame")]
    InvalidFrame { height: f64, width: f64, margin: f64 },
}
