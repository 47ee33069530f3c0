//! spritehull-bench: CLI tool for collision-shape experimentation and diagnostics.
//!
//! Loads a sprite sheet, runs the collision pipeline on one sprite with
//! configurable parameters, and prints detailed per-stage diagnostics.
//! Optionally runs every sprite at every requested tier and writes the
//! hitbox document and per-sprite SVG overlays. Useful for:
//!
//! - Choosing a tier or explicit tolerance for a sprite set
//! - Spotting sprites whose decomposition hits the depth cap
//! - Measuring per-stage durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin spritehull-bench -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! `RUST_LOG` controls log verbosity (default `warn`).

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use spritehull_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use spritehull_pipeline::{AccuracyTier, AlphaMask, PipelineConfig, ShapeKind, SpriteSheet};

/// Collision-shape experimentation and diagnostics for spritehull.
///
/// Runs the sprite pipeline on an image with configurable parameters
/// and prints per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "spritehull-bench", version)]
struct Cli {
    /// Path to the sprite sheet image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Sprite frame width in pixels (defaults to the image width).
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    frame_width: Option<u32>,

    /// Sprite frame height in pixels (defaults to the image height).
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    frame_height: Option<u32>,

    /// Row-major index of the sprite to diagnose.
    #[arg(long, default_value_t = 0)]
    sprite: usize,

    /// Minimum alpha for a pixel to count as solid.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_ALPHA_THRESHOLD)]
    alpha_threshold: u8,

    /// Collision shape to produce.
    #[arg(long, value_enum, default_value_t = Shape::Decomposed)]
    shape: Shape,

    /// Accuracy tier for the diagnosed sprite.
    #[arg(long, value_enum, default_value_t = Tier::Mid)]
    tier: Tier,

    /// Explicit simplification tolerance in pixels (overrides the tier).
    #[arg(long)]
    tolerance: Option<f64>,

    /// Optimizer tolerance as a fraction of the simplification tolerance.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_OPTIMIZE_RATIO)]
    optimize_ratio: f64,

    /// Lower bound on the optimizer tolerance in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_OPTIMIZE_FLOOR)]
    optimize_floor: f64,

    /// Maximum decomposition recursion depth.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MAX_DECOMPOSITION_DEPTH, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    max_depth: usize,

    /// Contour walk step budget, as a multiple of the sprite area.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_TRACE_STEP_FACTOR, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    trace_step_factor: usize,

    /// Tiers for the whole-sheet batch (repeatable; defaults to all).
    #[arg(long = "batch-tier", value_enum)]
    batch_tiers: Vec<Tier>,

    /// Write the hitbox JSON document for every sprite to this file.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write one SVG overlay per sprite and tier into this directory.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Shape kind selection.
#[derive(Clone, Copy, ValueEnum)]
enum Shape {
    /// Traced and simplified silhouette outline.
    Silhouette,
    /// Convex hull of every solid pixel.
    Hull,
    /// Convex decomposition of the silhouette.
    Decomposed,
}

/// Accuracy tier selection.
#[derive(Clone, Copy, ValueEnum)]
enum Tier {
    /// Coarsest outline, fewest points.
    Low,
    /// Balanced.
    Mid,
    /// Finest outline.
    High,
}

impl From<Tier> for AccuracyTier {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Low => Self::Low,
            Tier::Mid => Self::Mid,
            Tier::High => Self::High,
        }
    }
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        alpha_threshold: cli.alpha_threshold,
        shape: match cli.shape {
            Shape::Silhouette => ShapeKind::Silhouette,
            Shape::Hull => ShapeKind::Hull,
            Shape::Decomposed => ShapeKind::Decomposed,
        },
        tier: cli.tier.into(),
        tolerance: cli.tolerance,
        optimize_ratio: cli.optimize_ratio,
        optimize_floor: cli.optimize_floor,
        max_decomposition_depth: cli.max_depth,
        trace_step_factor: cli.trace_step_factor,
    })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let image = match spritehull_pipeline::raster::decode_rgba(&image_bytes) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error decoding {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let sheet_and_raster = AlphaMask::from_rgba(&image).and_then(|raster| {
        let (width, height) = (image.width(), image.height());
        let sheet = SpriteSheet::from_raster(
            width,
            height,
            cli.frame_width.unwrap_or(width),
            cli.frame_height.unwrap_or(height),
        )?;
        Ok((raster, sheet))
    });
    let (raster, sheet) = match sheet_and_raster {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Error slicing sprite sheet: {e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes, {}x{})",
        cli.image_path.display(),
        image_bytes.len(),
        image.width(),
        image.height(),
    );
    eprintln!(
        "Sheet: {} sprites of {}x{}",
        sheet.frame_count(),
        sheet.frame_width,
        sheet.frame_height,
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let frame = match raster.frame(&sheet, cli.sprite) {
        Ok(frame) => frame,
        Err(e) => {
            eprintln!("Error selecting sprite {}: {e}", cli.sprite);
            return ExitCode::FAILURE;
        }
    };

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match spritehull_pipeline::diagnostics::process_with_diagnostics(frame, &config, &StdClock)
        {
            Ok((_, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }
                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    if (cli.out.is_some() || cli.svg.is_some())
        && let Err(msg) = export_sheet(&cli, &config, &raster, &sheet)
    {
        eprintln!("{msg}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Run every sprite at every batch tier and write the requested outputs.
fn export_sheet(
    cli: &Cli,
    config: &PipelineConfig,
    raster: &AlphaMask<'_>,
    sheet: &SpriteSheet,
) -> Result<(), String> {
    let tiers: Vec<AccuracyTier> = if cli.batch_tiers.is_empty() {
        AccuracyTier::ALL.to_vec()
    } else {
        cli.batch_tiers.iter().map(|&t| t.into()).collect()
    };

    let started = Instant::now();
    let results = spritehull_pipeline::process_sheet(raster, sheet, config, &tiers);
    eprintln!(
        "Batch: {} tasks in {:.3}ms",
        results.len(),
        started.elapsed().as_secs_f64() * 1000.0,
    );

    if let Some(ref out) = cli.out {
        let json = spritehull_export::to_json(sheet.frame_width, sheet.frame_height, &results)
            .map_err(|e| format!("Error building hitbox document: {e}"))?;
        std::fs::write(out, &json)
            .map_err(|e| format!("Error writing hitbox JSON to {}: {e}", out.display()))?;
        eprintln!("Hitboxes written to {} ({} bytes)", out.display(), json.len());
    }

    if let Some(ref dir) = cli.svg {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Error creating {}: {e}", dir.display()))?;
        let stem = cli
            .image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sheet");
        let config_json = serde_json::to_string(config)
            .map_err(|e| format!("Error serializing config: {e}"))?;

        let mut written = 0usize;
        for sprite in &results {
            let Ok(ref result) = sprite.result else {
                continue;
            };
            let title = format!("{stem} #{}", sprite.index);
            let desc = format!(
                "tier={} shape={:?} polygons={} confidence={:?}",
                sprite.tier.name(),
                result.shape.kind(),
                result.shape.polygons().len(),
                result.confidence,
            );
            let metadata = spritehull_export::SvgMetadata {
                title: Some(&title),
                description: Some(&desc),
                config_json: Some(&config_json),
            };
            let svg = spritehull_export::to_svg(result, &metadata);
            write_overlay(dir, stem, sprite.index, sprite.tier, &svg)?;
            written += 1;
        }
        eprintln!("{written} SVG overlays written to {}", dir.display());
    }

    Ok(())
}

fn write_overlay(
    dir: &Path,
    stem: &str,
    index: usize,
    tier: AccuracyTier,
    svg: &str,
) -> Result<(), String> {
    let path = dir.join(format!("{stem}-{index:03}-{}.svg", tier.name()));
    std::fs::write(&path, svg).map_err(|e| format!("Error writing SVG to {}: {e}", path.display()))
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means, in the order the first run recorded them.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    for name in first.stages.iter().map(|s| s.name.as_str()) {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(|d| d.stages.iter().find(|s| s.name == name))
            .map(|s| s.duration.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
