//! camscan-bench: CLI tool for document detection tuning and diagnostics.
//!
//! Stands in for the camera: decodes a still image, feeds its luminance
//! to the detection pipeline as a single-plane frame and prints detailed
//! per-stage diagnostics. Useful for:
//!
//! - Tuning closing, blur and Canny parameters against real photos
//! - Inspecting intermediate stages (`--stage edges_detected --output edges.png`)
//! - Measuring per-stage durations over repeated frames
//! - Checking how stored settings strings are coerced
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin camscan-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use camscan_pipeline::settings::{apply_setting, split_assignment};
use camscan_pipeline::{
    Color, DebugStage, FrameDiagnostics, Frame, Pipeline, PipelineConfig, SystemClock,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Document detection diagnostics for camscan.
///
/// Runs the detection pipeline on a still image with configurable
/// parameters and prints per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "camscan-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Stage to stop at and render.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_OUTPUT_STAGE)]
    stage: DebugStage,

    /// Cap on the working image height in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MAX_IMAGE_HEIGHT)]
    max_image_height: u32,

    /// Closing structuring element side.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MORPH_KERNEL_SIZE)]
    morph_kernel_size: u32,

    /// Closing iterations.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MORPH_ITERATIONS)]
    morph_iterations: u32,

    /// Gaussian kernel side (odd).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_GAUSSIAN_BLUR_KERNEL_SIZE)]
    blur_kernel_size: u32,

    /// Gaussian sigma; 0 derives it from the kernel size.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_GAUSSIAN_BLUR_SIGMA_X)]
    blur_sigma: f64,

    /// Canny low threshold.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CANNY_LOWER_HYSTERESIS_THRESHOLD)]
    canny_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CANNY_UPPER_HYSTERESIS_THRESHOLD)]
    canny_high: f32,

    /// Overlay dilation element side.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_EDGE_DILATE_KERNEL_SIZE)]
    dilate_kernel_size: u32,

    /// Number of largest contours searched for a quadrilateral.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CONTOUR_SELECTION_COUNT)]
    contour_count: usize,

    /// Overlay color: `#RRGGBB`, `#AARRGGBB` or a color name.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CONTOUR_COLOR, value_parser = parse_color)]
    color: Color,

    /// Overlay stroke width in working pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CONTOUR_THICKNESS)]
    thickness: u32,

    /// Stored setting as `key=value`, applied after the flags above.
    ///
    /// Values are coerced the way the settings store does it: trimmed,
    /// with unparsable values replaced by the field default. May be
    /// repeated.
    #[arg(long = "setting", value_name = "KEY=VALUE")]
    settings: Vec<String>,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization; missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Write the rendered stage image as PNG.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of frames to run through one pipeline instance.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,
}

fn parse_color(text: &str) -> Result<Color, String> {
    Color::parse(text).ok_or_else(|| format!("unrecognized color {text:?}"))
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags, then `--setting` pairs are
/// applied on top.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let mut config = PipelineConfig {
        output_stage: cli.stage,
        max_image_height: cli.max_image_height,
        morph_kernel_size: cli.morph_kernel_size,
        morph_iterations: cli.morph_iterations,
        gaussian_blur_kernel_size: cli.blur_kernel_size,
        gaussian_blur_sigma_x: cli.blur_sigma,
        canny_lower_hysteresis_threshold: cli.canny_low,
        canny_upper_hysteresis_threshold: cli.canny_high,
        edge_dilate_kernel_size: cli.dilate_kernel_size,
        contour_selection_count: cli.contour_count,
        contour_color: cli.color,
        contour_thickness: cli.thickness,
    };

    for setting in &cli.settings {
        let (key, value) = split_assignment(setting).map_err(|e| e.to_string())?;
        apply_setting(&mut config, key, value).map_err(|e| e.to_string())?;
    }

    Ok(config)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let luma = match image::open(&cli.image_path) {
        Ok(img) => img.to_luma8(),
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    let (width, height) = luma.dimensions();

    eprintln!("Image: {} ({width}x{height})", cli.image_path.display());
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut pipeline = match Pipeline::new(width, height, config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        working = %pipeline.geometry().working,
        stage = %pipeline.config().output_stage,
        "pipeline ready"
    );

    let frame = Frame::from_luma(width, height, luma.as_raw());
    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let output = match pipeline.process_with_clock(&frame, &SystemClock) {
            Ok(output) => output,
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        };

        if cli.json {
            match serde_json::to_string_pretty(&output.diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", output.diagnostics.report());
            if let Some(corners) = output.corners {
                let geometry = pipeline.geometry();
                println!("Corners (working):  {:?}", corners.points());
                println!(
                    "Corners (image):    {:?}",
                    corners.to_frame_space(geometry).points()
                );
            }
        }

        // Write the rendered image on the first run only.
        if run == 0
            && let Some(ref path) = cli.output
        {
            let rendered = output.image.into_rgba();
            match rendered.save(path) {
                Ok(()) => {
                    let resolution = if output.stage.is_raster_tap() {
                        "working"
                    } else {
                        "full"
                    };
                    eprintln!(
                        "{} written to {} ({}x{}, {resolution} resolution)",
                        output.stage,
                        path.display(),
                        rendered.width(),
                        rendered.height(),
                    );
                }
                Err(e) => {
                    eprintln!("Error writing {}: {e}", path.display());
                }
            }
        }

        all_diagnostics.push(output.diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&FrameDiagnostics) -> Option<std::time::Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[FrameDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    let found = all_diagnostics
        .iter()
        .filter(|d| d.summary.corners_found)
        .count();
    println!("Document found: {found}/{}", all_diagnostics.len());

    // Per-stage means.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Adapt", |d| Some(d.adapt.duration)),
        ("Content Suppression", |d| d.suppress.as_ref().map(|s| s.duration)),
        ("Edge Extraction", |d| d.edges.as_ref().map(|s| s.duration)),
        ("Contour Selection", |d| d.select.as_ref().map(|s| s.duration)),
        ("Compose", |d| d.compose.as_ref().map(|s| s.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
