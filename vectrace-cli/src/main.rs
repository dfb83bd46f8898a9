//! Command-line interface for vectrace-core
//!
//! Decodes an image file, runs the tracer or the posterizer, and writes the
//! resulting SVG document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use vectrace_core::{
    FillStrategy, ParamsPatch, Posterizer, PosterizerParamsPatch, Potrace, RangeDistribution,
    Steps, TurnPolicy,
};

#[derive(Parser)]
#[command(name = "vectrace")]
#[command(about = "Trace raster images into SVG vector graphics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Args, Default)]
struct TraceArgs {
    /// Luminance threshold (0-255); omit for automatic selection
    #[arg(long)]
    threshold: Option<u8>,

    /// Trace light shapes on a dark background instead
    #[arg(long)]
    white_on_black: bool,

    /// Turn policy at ambiguous pixel configurations
    #[arg(long, value_parser = parse_turn_policy)]
    turn_policy: Option<TurnPolicy>,

    /// Suppress regions smaller than this many pixels
    #[arg(long)]
    turd_size: Option<u32>,

    /// Corner threshold; larger values smooth more aggressively
    #[arg(long)]
    alpha_max: Option<f64>,

    /// Disable Bezier merging
    #[arg(long)]
    no_curve_optimization: bool,

    /// Maximum deviation allowed when merging Beziers
    #[arg(long)]
    opt_tolerance: Option<f64>,

    /// Fill color (CSS color, default: auto)
    #[arg(long)]
    color: Option<String>,

    /// Background color (CSS color, default: transparent)
    #[arg(long)]
    background: Option<String>,

    /// Output width in pixels (scales the trace)
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels (scales the trace)
    #[arg(long)]
    height: Option<u32>,

    /// JSON file with a parameter patch (unknown keys are rejected)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace an image into a single-color SVG path
    Trace {
        /// Input image file (PNG, JPEG or BMP)
        input: PathBuf,

        /// Output SVG file
        output: PathBuf,

        #[command(flatten)]
        trace: TraceArgs,
    },

    /// Posterize an image into stacked multi-tone SVG layers
    Posterize {
        /// Input image file (PNG, JPEG or BMP)
        input: PathBuf,

        /// Output SVG file
        output: PathBuf,

        #[command(flatten)]
        trace: TraceArgs,

        /// Number of layers, or a comma-separated threshold list
        #[arg(long)]
        steps: Option<String>,

        /// How layer fills are picked: dominant, mean, median or spread
        #[arg(long, value_parser = parse_fill_strategy)]
        fill_strategy: Option<FillStrategy>,

        /// How thresholds are distributed: auto or equal
        #[arg(long, value_parser = parse_range_distribution)]
        range_distribution: Option<RangeDistribution>,
    },
}

fn parse_turn_policy(s: &str) -> Result<TurnPolicy, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_fill_strategy(s: &str) -> Result<FillStrategy, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_range_distribution(s: &str) -> Result<RangeDistribution, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_steps(s: &str) -> Result<Steps> {
    if s.contains(',') {
        let values = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<i32>()
                    .with_context(|| format!("invalid steps entry {part:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Steps::List(values))
    } else {
        Ok(Steps::Count(s.trim().parse().context("invalid steps count")?))
    }
}

impl TraceArgs {
    fn to_patch(&self) -> Result<ParamsPatch> {
        let mut patch = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => ParamsPatch::default(),
        };

        if let Some(threshold) = self.threshold {
            patch.threshold = Some(threshold as i32);
        }
        if self.white_on_black {
            patch.black_on_white = Some(false);
        }
        if let Some(policy) = self.turn_policy {
            patch.turn_policy = Some(policy);
        }
        if let Some(turd_size) = self.turd_size {
            patch.turd_size = Some(turd_size);
        }
        if let Some(alpha_max) = self.alpha_max {
            patch.alpha_max = Some(alpha_max);
        }
        if self.no_curve_optimization {
            patch.opt_curve = Some(false);
        }
        if let Some(tolerance) = self.opt_tolerance {
            patch.opt_tolerance = Some(tolerance);
        }
        if let Some(color) = &self.color {
            patch.color = Some(color.clone());
        }
        if let Some(background) = &self.background {
            patch.background = Some(background.clone());
        }
        if let Some(width) = self.width {
            patch.width = Some(width);
        }
        if let Some(height) = self.height {
            patch.height = Some(height);
        }
        Ok(patch)
    }
}

fn run_trace(input: &PathBuf, output: &PathBuf, args: &TraceArgs) -> Result<()> {
    let start = Instant::now();
    let mut potrace = Potrace::new();
    potrace.set_parameters(&args.to_patch()?)?;
    potrace
        .load_image_from_path(input)
        .with_context(|| format!("loading {}", input.display()))?;

    let svg = potrace.get_svg()?;
    fs::write(output, &svg).with_context(|| format!("writing {}", output.display()))?;

    log::info!(
        "traced {} -> {} in {:.1?}",
        input.display(),
        output.display(),
        start.elapsed()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_posterize(
    input: &PathBuf,
    output: &PathBuf,
    args: &TraceArgs,
    steps: Option<&str>,
    fill_strategy: Option<FillStrategy>,
    range_distribution: Option<RangeDistribution>,
) -> Result<()> {
    let start = Instant::now();
    let trace = args.to_patch()?;
    let patch = PosterizerParamsPatch {
        turn_policy: trace.turn_policy,
        turd_size: trace.turd_size,
        alpha_max: trace.alpha_max,
        opt_curve: trace.opt_curve,
        opt_tolerance: trace.opt_tolerance,
        threshold: trace.threshold,
        black_on_white: trace.black_on_white,
        color: trace.color,
        background: trace.background,
        width: trace.width,
        height: trace.height,
        steps: steps.map(parse_steps).transpose()?,
        fill_strategy,
        range_distribution,
    };

    let mut posterizer = Posterizer::new();
    posterizer.set_parameters(&patch)?;
    posterizer
        .load_image_from_path(input)
        .with_context(|| format!("loading {}", input.display()))?;

    let svg = posterizer.get_svg()?;
    fs::write(output, &svg).with_context(|| format!("writing {}", output.display()))?;

    log::info!(
        "posterized {} -> {} in {:.1?}",
        input.display(),
        output.display(),
        start.elapsed()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    match &cli.command {
        Commands::Trace {
            input,
            output,
            trace,
        } => run_trace(input, output, trace),
        Commands::Posterize {
            input,
            output,
            trace,
            steps,
            fill_strategy,
            range_distribution,
        } => run_posterize(
            input,
            output,
            trace,
            steps.as_deref(),
            *fill_strategy,
            *range_distribution,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps_forms() {
        assert_eq!(parse_steps("4").unwrap(), Steps::Count(4));
        assert_eq!(
            parse_steps("40, 120, 200").unwrap(),
            Steps::List(vec![40, 120, 200])
        );
        assert!(parse_steps("four").is_err());
    }
}
