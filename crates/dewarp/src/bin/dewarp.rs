//! `dewarp` CLI: detect markers in a photo, register them to a canonical
//! layout and write the TPS-dewarped image plus a JSON report.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dewarp::image_io::{load_mask, load_rgb, save_mask, save_rgb};
use dewarp::io::{DewarpConfig, DewarpReport};
use dewarp::{dewarp, dewarp_with_mask, CanonicalMode, MatchMethod};
use log::{error, info, LevelFilter};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "dewarp")]
#[command(about = "Dewarp a photo by registering white calibration markers")]
#[command(version)]
struct Cli {
    /// JSON config; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input image.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Where to write the dewarped image.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Binary mask to warp along with the image.
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Where to write the warped mask.
    #[arg(long)]
    mask_output: Option<PathBuf>,

    /// Where to write the JSON report.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Canonical layout: corners_4, grid_2x2, grid_3x3, auto, preserve_relative.
    #[arg(long)]
    mode: Option<CanonicalMode>,

    /// Correspondence method: spatial_order or nearest_neighbor.
    #[arg(long)]
    method: Option<MatchMethod>,

    /// White threshold in [0, 1].
    #[arg(long)]
    threshold: Option<f32>,

    /// Minimum marker area in pixels.
    #[arg(long)]
    min_area: Option<usize>,

    /// TPS regularization (0 = exact interpolation).
    #[arg(long)]
    regularization: Option<f64>,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn path_string(p: &std::path::Path) -> String {
    p.to_string_lossy().into_owned()
}

fn build_config(cli: &Cli) -> CliResult<DewarpConfig> {
    let mut cfg = match &cli.config {
        Some(path) => DewarpConfig::load_json(path)?,
        None => DewarpConfig::default(),
    };
    if let Some(p) = &cli.input {
        cfg.image_path = path_string(p);
    }
    if let Some(p) = &cli.output {
        cfg.output_path = Some(path_string(p));
    }
    if let Some(p) = &cli.mask {
        cfg.mask_path = Some(path_string(p));
    }
    if let Some(p) = &cli.mask_output {
        cfg.mask_output_path = Some(path_string(p));
    }
    if let Some(p) = &cli.report {
        cfg.report_path = Some(path_string(p));
    }
    if let Some(mode) = cli.mode {
        cfg.params.canonical_mode = mode;
    }
    if let Some(method) = cli.method {
        cfg.params.method = method;
    }
    if let Some(threshold) = cli.threshold {
        cfg.params.detect.threshold = threshold;
    }
    if let Some(min_area) = cli.min_area {
        cfg.params.detect.min_area = min_area;
    }
    if let Some(lambda) = cli.regularization {
        cfg.params.regularization = lambda;
    }
    if cfg.image_path.is_empty() {
        return Err("no input image: pass --input or a --config with image_path".into());
    }
    Ok(cfg)
}

/// Returns whether the pipeline succeeded; the report is written either way.
fn run(cli: &Cli) -> CliResult<bool> {
    let cfg = build_config(cli)?;
    info!("loading image: {}", cfg.image_path);
    let image = load_rgb(&cfg.image_path)?;
    let mask = cfg.mask_path.as_ref().map(load_mask).transpose()?;

    let result = match &mask {
        Some(m) => dewarp_with_mask(&image.view(), m, &cfg.params),
        None => dewarp(&image.view(), &cfg.params),
    };

    let mut report = DewarpReport::new(&cfg);
    let ok = match result {
        Ok(out) => {
            let output_path = cfg.output_path();
            save_rgb(&out.image, &output_path)?;
            info!("dewarped image written to {}", output_path.display());
            report.output_path = Some(path_string(&output_path));

            if let (Some(warped), Some(path)) = (&out.mask, &cfg.mask_output_path) {
                save_mask(warped, path)?;
                info!("warped mask written to {path}");
                report.mask_output_path = Some(path.clone());
            }
            report.set_output(&out);
            true
        }
        Err(err) => {
            error!("dewarp failed: {err}");
            report.set_error(&err);
            false
        }
    };

    let report_path = cfg.report_path();
    report.write_json(&report_path)?;
    info!("report written to {}", report_path.display());
    Ok(ok)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "tracing")]
    dewarp::core::init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    if let Err(err) = dewarp::core::init_with_level(cli.log_level) {
        eprintln!("failed to install logger: {err}");
    }

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
