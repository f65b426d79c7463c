//! Detect markers on a synthetic 3×3 layout and snap them to an inferred grid.

use dewarp_core::{init_with_level, RgbImage};
use dewarp_markers::{
    define_canonical_positions, detect_markers, establish_correspondence, CanonicalMode,
    CanonicalParams, DetectParams, MatchMethod,
};
use log::{info, LevelFilter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_with_level(LevelFilter::Debug)?;

    let mut img = RgbImage::filled(360, 360, [0.05, 0.05, 0.05]);
    for i in 0..3 {
        for j in 0..3 {
            let row = 60 + i * 120 + (i * j) % 3;
            let col = 60 + j * 120 + (i + 2 * j) % 4;
            img.fill_rect(row - 9, col - 9, 19, 19, [0.95, 0.95, 0.95]);
        }
    }

    let markers = detect_markers(&img.view(), &DetectParams::default())?;
    for m in &markers {
        info!(
            "centroid ({:.1}, {:.1}) size {} angle {:.2} density {:.2}",
            m.centroid.row, m.centroid.col, m.size, m.angle, m.density
        );
    }

    let canonical =
        define_canonical_positions(&markers, CanonicalMode::Auto, &CanonicalParams::default())?;
    let pairs = establish_correspondence(&markers, &canonical, MatchMethod::NearestNeighbor);
    for (src, dst) in pairs.pairs() {
        println!(
            "({:.1}, {:.1}) -> ({:.1}, {:.1})",
            src.row, src.col, dst.row, dst.col
        );
    }
    Ok(())
}
