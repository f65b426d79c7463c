//! Pairing detected marker centroids with canonical positions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use dewarp_core::RowCol;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{LayoutError, MarkerInfo};

/// Pairing strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Sort both lists by `(row, col)` and pair by rank.
    #[default]
    SpatialOrder,
    /// Greedy: each measured point, in input order, takes the closest
    /// still-unassigned canonical point.
    NearestNeighbor,
}

impl MatchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMethod::SpatialOrder => "spatial_order",
            MatchMethod::NearestNeighbor => "nearest_neighbor",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMethod {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spatial_order" => Ok(MatchMethod::SpatialOrder),
            "nearest_neighbor" => Ok(MatchMethod::NearestNeighbor),
            other => Err(LayoutError::UnknownMethod(other.to_string())),
        }
    }
}

/// Equal-length source (measured) and target (canonical) point lists;
/// `source[k]` maps to `target[k]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub source: Vec<RowCol>,
    pub target: Vec<RowCol>,
}

impl Correspondence {
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (RowCol, RowCol)> + '_ {
        self.source.iter().copied().zip(self.target.iter().copied())
    }
}

/// Pair marker centroids with canonical positions.
///
/// Both lists are truncated to the shorter length first, keeping the
/// leading entries (markers arrive largest first).
pub fn establish_correspondence(
    markers: &[MarkerInfo],
    canonical: &[RowCol],
    method: MatchMethod,
) -> Correspondence {
    let measured: Vec<RowCol> = markers.iter().map(|m| m.centroid).collect();
    match_points(&measured, canonical, method)
}

/// Point-level variant of [`establish_correspondence`].
pub fn match_points(measured: &[RowCol], canonical: &[RowCol], method: MatchMethod) -> Correspondence {
    let n = measured.len().min(canonical.len());
    if measured.len() != canonical.len() {
        warn!(
            "{} measured vs {} canonical points; keeping the first {n} of each",
            measured.len(),
            canonical.len()
        );
    }
    let (measured, canonical) = (&measured[..n], &canonical[..n]);

    let out = match method {
        MatchMethod::SpatialOrder => Correspondence {
            source: spatially_sorted(measured),
            target: spatially_sorted(canonical),
        },
        MatchMethod::NearestNeighbor => nearest_neighbor(measured, canonical),
    };
    debug!("{} correspondences via {}", out.len(), method);
    out
}

fn row_major(a: &RowCol, b: &RowCol) -> Ordering {
    a.row.total_cmp(&b.row).then(a.col.total_cmp(&b.col))
}

/// Stable `(row, col)` sort; exact ties keep input order.
fn spatially_sorted(points: &[RowCol]) -> Vec<RowCol> {
    let mut sorted = points.to_vec();
    sorted.sort_by(row_major);
    sorted
}

fn nearest_neighbor(measured: &[RowCol], canonical: &[RowCol]) -> Correspondence {
    let mut taken = vec![false; canonical.len()];
    let mut target = Vec::with_capacity(measured.len());
    for p in measured {
        let best = canonical
            .iter()
            .enumerate()
            .filter(|(j, _)| !taken[*j])
            .min_by(|(_, a), (_, b)| p.distance_sq(a).total_cmp(&p.distance_sq(b)));
        // `min_by` keeps the first of equal elements, so ties go to the lowest index.
        if let Some((j, q)) = best {
            taken[j] = true;
            target.push(*q);
        }
    }
    Correspondence {
        source: measured.to_vec(),
        target,
    }
}
