//! JSON configuration and report helpers for the `dewarp` tool.

use std::fs;
use std::path::{Path, PathBuf};

use dewarp_core::RowCol;
use dewarp_markers::{Correspondence, MarkerInfo};
use serde::{Deserialize, Serialize};

use crate::{DewarpDiagnostics, DewarpError, DewarpOutput, DewarpParams};

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Buffer(#[from] dewarp_core::ImageError),
    #[cfg(feature = "image")]
    #[error(transparent)]
    Codec(#[from] ::image::ImageError),
}

/// Configuration for one dewarp run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DewarpConfig {
    pub image_path: String,
    #[serde(default)]
    pub output_path: Option<String>,
    /// Optional binary mask warped alongside the image.
    #[serde(default)]
    pub mask_path: Option<String>,
    #[serde(default)]
    pub mask_output_path: Option<String>,
    #[serde(default)]
    pub report_path: Option<String>,
    #[serde(default)]
    pub params: DewarpParams,
}

impl DewarpConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the warped image path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("dewarped.png"))
    }

    /// Resolve the report path.
    pub fn report_path(&self) -> PathBuf {
        self.report_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("dewarp_report.json"))
    }
}

/// Marker descriptor without its pixel mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSummary {
    pub centroid: RowCol,
    pub corners: [f64; 8],
    pub size: usize,
    pub angle: f64,
    pub aspect_ratio: f64,
    pub density: f64,
}

impl From<&MarkerInfo> for MarkerSummary {
    fn from(m: &MarkerInfo) -> Self {
        Self {
            centroid: m.centroid,
            corners: m.corners,
            size: m.size,
            angle: m.angle,
            aspect_ratio: m.aspect_ratio,
            density: m.density,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DewarpReport {
    pub image_path: String,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub mask_output_path: Option<String>,
    pub params: DewarpParams,
    pub num_markers: usize,
    #[serde(default)]
    pub markers: Vec<MarkerSummary>,
    #[serde(default)]
    pub canonical: Vec<RowCol>,
    #[serde(default)]
    pub correspondence: Option<Correspondence>,
    #[serde(default)]
    pub diagnostics: Option<DewarpDiagnostics>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DewarpReport {
    /// Build an empty report for `cfg`.
    pub fn new(cfg: &DewarpConfig) -> Self {
        Self {
            image_path: cfg.image_path.clone(),
            output_path: None,
            mask_output_path: None,
            params: cfg.params.clone(),
            num_markers: 0,
            markers: Vec::new(),
            canonical: Vec::new(),
            correspondence: None,
            diagnostics: None,
            error: None,
        }
    }

    /// Populate report fields from a successful run.
    pub fn set_output(&mut self, out: &DewarpOutput) {
        self.num_markers = out.markers.len();
        self.markers = out.markers.iter().map(MarkerSummary::from).collect();
        self.canonical = out.canonical.clone();
        self.correspondence = Some(out.correspondence.clone());
        self.diagnostics = out.diagnostics.clone();
        self.error = None;
    }

    /// Record a pipeline error.
    pub fn set_error(&mut self, err: &DewarpError) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dewarp_markers::{CanonicalMode, MatchMethod};

    #[test]
    fn config_fills_defaults() {
        let cfg: DewarpConfig = serde_json::from_str(
            r#"{
                "image_path": "in.png",
                "params": {
                    "canonical_mode": "grid_3x3",
                    "method": "nearest_neighbor",
                    "canonical": { "image_size": [300, 400], "margin": 25.0 },
                    "detect": { "min_area": 80 }
                }
            }"#,
        )
        .expect("valid config");
        assert_eq!(cfg.image_path, "in.png");
        assert_eq!(cfg.output_path(), PathBuf::from("dewarped.png"));
        assert_eq!(cfg.params.canonical_mode, CanonicalMode::Grid3x3);
        assert_eq!(cfg.params.method, MatchMethod::NearestNeighbor);
        assert_eq!(cfg.params.canonical.image_size, Some((300, 400)));
        assert_eq!(cfg.params.canonical.spacing, None);
        assert_eq!(cfg.params.detect.min_area, 80);
        assert_eq!(cfg.params.detect.threshold, 0.8);
        assert!(cfg.params.want_diagnostics);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let res: Result<DewarpConfig, _> = serde_json::from_str(
            r#"{ "image_path": "in.png", "params": { "canonical_mode": "grid_4x4" } }"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn report_records_error_and_survives_json() {
        let cfg = DewarpConfig {
            image_path: "black.png".to_string(),
            ..DewarpConfig::default()
        };
        let mut report = DewarpReport::new(&cfg);
        report.set_error(&DewarpError::NoMarkers);
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.json");
        report.write_json(&path).expect("write");
        let back = DewarpReport::load_json(&path).expect("read");
        assert_eq!(back, report);
        assert_eq!(back.error.as_deref(), Some("no markers detected"));
    }
}
