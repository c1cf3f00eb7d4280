//! Parallel Monte Carlo run for one policy
//!
//! Writes per-year percentile bands to CSV and a JSON run summary
//!
//! Usage: cargo run --release --bin monte_carlo -- --preset healthcare-reform --trials 10000

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;

use fiscal_projection::metrics::{DistributionMetrics, MetricsAggregator};
use fiscal_projection::policy::{load_policy, load_sampling_config, presets, PolicyConfiguration};
use fiscal_projection::projection::TrackedField;
use fiscal_projection::stochastic::{
    MonteCarloEngine, MonteCarloOptions, ParameterSpec, RedrawMode, SamplingConfig,
};

#[derive(Parser, Debug)]
#[command(name = "monte_carlo")]
#[command(about = "Monte Carlo uncertainty bands for a fiscal policy")]
struct Args {
    /// Policy JSON file; overrides --preset
    #[arg(short, long)]
    policy: Option<PathBuf>,

    #[arg(long, default_value = "healthcare-reform")]
    preset: String,

    /// Sampling JSON file; defaults to growth and inflation jitter
    #[arg(short, long)]
    sampling: Option<PathBuf>,

    #[arg(long)]
    horizon: Option<u32>,

    /// Trial count; overrides the sampling file
    #[arg(short, long)]
    trials: Option<usize>,

    /// Master seed; overrides the sampling file
    #[arg(long)]
    seed: Option<u64>,

    /// Run trials on one thread
    #[arg(long)]
    sequential: bool,

    #[arg(short, long, default_value = "monte_carlo_bands.csv")]
    output: PathBuf,

    #[arg(long, default_value = "monte_carlo_summary.json")]
    summary: PathBuf,
}

/// One CSV row: a tracked field's bands in one year
#[derive(Debug, Serialize)]
struct BandRow {
    year: i32,
    field: &'static str,
    p10: f64,
    p50: f64,
    p90: f64,
    mean: f64,
    std_dev: f64,
    median_std_error: f64,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    generated_at: DateTime<Utc>,
    policy: String,
    trials: usize,
    master_seed: u64,
    elapsed_ms: u128,
    metrics: DistributionMetrics,
    /// Trials needed for a ±1 point 95% interval on final debt/GDP
    trials_for_one_point_band: Option<usize>,
}

fn default_sampling() -> SamplingConfig {
    SamplingConfig {
        growth: Some(ParameterSpec::jitter(0.015)),
        inflation: Some(ParameterSpec::jitter(0.01)),
        redraw: RedrawMode::PerYear,
        ..SamplingConfig::default()
    }
}

fn select_policy(args: &Args) -> Result<PolicyConfiguration> {
    let horizon = args.horizon.unwrap_or(30);
    let mut policy = match &args.policy {
        Some(path) => load_policy(path)
            .with_context(|| format!("loading policy from {}", path.display()))?,
        None => match presets::by_name(&args.preset, horizon) {
            Some(policy) => policy,
            None => bail!("unknown preset '{}'", args.preset),
        },
    };
    if let Some(horizon) = args.horizon {
        policy.general_parameters.horizon_years = horizon;
    }
    Ok(policy)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let policy = select_policy(&args)?;
    let mut sampling = match &args.sampling {
        Some(path) => load_sampling_config(path)
            .with_context(|| format!("loading sampling config from {}", path.display()))?,
        None => default_sampling(),
    };
    if let Some(seed) = args.seed {
        sampling.master_seed = seed;
    }
    let trials = args.trials.unwrap_or(sampling.trial_count);

    println!("Policy: {}", policy.name);
    println!("Running {} trials (seed {})...", trials, sampling.master_seed);

    let engine = MonteCarloEngine::new(policy, sampling).context("invalid Monte Carlo setup")?;
    let options = MonteCarloOptions {
        parallel: !args.sequential,
        ..MonteCarloOptions::default()
    };

    let start = Instant::now();
    let reduced = engine.run_with(trials, &options)?;
    let elapsed = start.elapsed();
    println!("Trials complete in {:?}", elapsed);

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for year in &reduced.years {
        for (field, band) in &year.fields {
            writer.serialize(BandRow {
                year: year.calendar_year,
                field: field.label(),
                p10: band.p10,
                p50: band.p50,
                p90: band.p90,
                mean: band.mean,
                std_dev: band.std_dev,
                median_std_error: band.median_std_error,
            })?;
        }
    }
    writer.flush()?;
    println!("Bands written to: {}", args.output.display());

    let metrics = MetricsAggregator::compute_distribution(&reduced);
    let last_year = reduced.horizon().saturating_sub(1);
    let summary = RunSummary {
        generated_at: Utc::now(),
        policy: reduced.policy_name.clone(),
        trials: reduced.trial_count,
        master_seed: reduced.master_seed,
        elapsed_ms: elapsed.as_millis(),
        trials_for_one_point_band: reduced.required_trials(TrackedField::DebtToGdp, last_year, 0.01),
        metrics,
    };
    let file = File::create(&args.summary)
        .with_context(|| format!("creating {}", args.summary.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &summary)?;
    println!("Summary written to: {}", args.summary.display());

    println!("\nFinal-year debt/GDP:");
    if let Some(band) = &summary.metrics.debt_to_gdp_final {
        println!("  P10 {:.3}  P50 {:.3}  P90 {:.3}", band.p10, band.p50, band.p90);
        println!("  mean {:.3}  std dev {:.3}  P50 s.e. {:.5}", band.mean, band.std_dev, band.median_std_error);
    }
    println!("Solvent trials: {:.1}%", 100.0 * summary.metrics.solvency_share);
    println!(
        "Degraded: {:.1}%  Terminated early: {:.1}%",
        100.0 * summary.metrics.degraded_share,
        100.0 * summary.metrics.terminated_share
    );

    Ok(())
}
