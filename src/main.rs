//! Orderscope CLI: category ranking and customer RFM over an order-line CSV
//!
//! Loads the dataset once, resolves the date window, runs one analysis pass
//! and prints the result tables.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use orderscope::config::LogFormat;
use orderscope::report::{render_text, write_json};
use orderscope::{build_report, load_orders, AnalysisConfig, Args};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` directives refine the configured level
fn init_logging(config: &AnalysisConfig) -> Result<()> {
    let log_level = config.logging.max_level()?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(log_level).into())
        .from_env_lossy();

    match config.logging.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = AnalysisConfig::load(args.load_options()).context("failed to load configuration")?;
    init_logging(&config)?;

    run_pipeline(&args, &config)
}

fn run_pipeline(args: &Args, config: &AnalysisConfig) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Load data
    info!(input = %args.input, "step 1: loading order lines");
    let data_start = Instant::now();
    let dataset =
        load_orders(&args.input).with_context(|| format!("failed to load `{}`", args.input))?;
    info!(
        lines = dataset.len(),
        elapsed_secs = data_start.elapsed().as_secs_f64(),
        "order lines loaded"
    );

    // Step 2: Resolve the date window
    let bounds = dataset
        .date_bounds()
        .context("dataset has no purchase timestamps")?;
    let window = args.date_window(bounds)?;
    info!(start = %window.start, end = %window.end, "step 2: date window resolved");

    // Step 3: Analysis pass
    let analysis_start = Instant::now();
    let report = build_report(dataset.lines(), &window, config)
        .context("analysis failed for the selected window")?;
    info!(
        elapsed_secs = analysis_start.elapsed().as_secs_f64(),
        "step 3: report computed"
    );

    // Step 4: Output
    print!("{}", render_text(&report));
    if let Some(path) = &args.json {
        write_json(&report, path).with_context(|| format!("failed to write `{path}`"))?;
        println!("\nReport saved to: {path}");
    }

    info!(
        total_secs = start_time.elapsed().as_secs_f64(),
        "pipeline complete"
    );

    Ok(())
}
