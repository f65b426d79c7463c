//! White calibration marker detection and canonical registration.
//!
//! Pipeline pieces, each usable on its own:
//! - [`detect_markers`]: threshold, clean up and label white blobs, then
//!   describe each with a PCA oriented box.
//! - [`define_canonical_positions`]: idealized target positions for the
//!   markers under a [`CanonicalMode`].
//! - [`establish_correspondence`]: pair measured centroids with those
//!   positions.
//!
//! ```no_run
//! use dewarp_core::RgbImage;
//! use dewarp_markers::{
//!     define_canonical_positions, detect_markers, establish_correspondence, CanonicalMode,
//!     CanonicalParams, DetectParams, MatchMethod,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = RgbImage::new(640, 480);
//! let markers = detect_markers(&img.view(), &DetectParams::default())?;
//! let canonical =
//!     define_canonical_positions(&markers, CanonicalMode::Corners4, &CanonicalParams::default())?;
//! let pairs = establish_correspondence(&markers, &canonical, MatchMethod::SpatialOrder);
//! println!("{} pairs", pairs.len());
//! # Ok(())
//! # }
//! ```

mod canonical;
mod correspond;
mod detect;
mod error;
mod types;

pub use canonical::{define_canonical_positions, CanonicalMode, CanonicalParams};
pub use correspond::{establish_correspondence, match_points, Correspondence, MatchMethod};
pub use detect::{describe_component, detect_markers};
pub use error::LayoutError;
pub use types::{DetectParams, MarkerInfo, MarkerMask};
