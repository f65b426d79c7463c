//! Build a synthetic photo with four displaced corner markers, dewarp it and
//! print what the pipeline found.

use dewarp::{dewarp, CanonicalMode, DewarpParams, MatchMethod, RgbImage};

#[cfg(feature = "tracing")]
use dewarp::core::init_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    dewarp::core::init_with_level(log::LevelFilter::Info)?;

    let mut img = RgbImage::filled(400, 300, [0.1, 0.1, 0.1]);
    for &(row, col) in &[(38usize, 52usize), (30, 340), (262, 356), (250, 44)] {
        img.fill_rect(row - 8, col - 8, 17, 17, [1.0, 1.0, 1.0]);
    }

    let mut params = DewarpParams::default();
    params.canonical_mode = CanonicalMode::Corners4;
    params.method = MatchMethod::NearestNeighbor;
    params.canonical.image_size = Some((img.height, img.width));
    params.canonical.margin = 40.0;

    let out = dewarp(&img.view(), &params)?;
    for m in &out.markers {
        println!(
            "marker at ({:.1}, {:.1}) size {} aspect {:.2}",
            m.centroid.row, m.centroid.col, m.size, m.aspect_ratio
        );
    }
    if let Some(d) = &out.diagnostics {
        println!(
            "residual {:.2e} px, deformation mean {:.2} px (max {:.2})",
            d.residual.mean, d.deformation.mean, d.deformation.max
        );
    }

    if let Some(path) = std::env::args().nth(1) {
        dewarp::image_io::save_rgb(&out.image, &path)?;
        println!("wrote {path}");
    }
    Ok(())
}
