//! Fiscal Projection CLI
//!
//! Runs one deterministic projection and writes the yearly ledger to CSV

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use fiscal_projection::metrics::MetricsAggregator;
use fiscal_projection::policy::{load_policy, presets, PolicyConfiguration};
use fiscal_projection::projection::{DeterministicSimulator, YearRow};

#[derive(Parser, Debug)]
#[command(name = "fiscal_projection")]
#[command(about = "Deterministic multi-year fiscal projection")]
struct Args {
    /// Policy JSON file; overrides --preset
    #[arg(short, long)]
    policy: Option<PathBuf>,

    /// Built-in policy (status-quo, healthcare-reform)
    #[arg(long, default_value = "status-quo")]
    preset: String,

    /// Projection horizon in years
    #[arg(long)]
    horizon: Option<u32>,

    /// CSV output path
    #[arg(short, long, default_value = "projection_output.csv")]
    output: PathBuf,
}

/// Flat CSV row
#[derive(Debug, Serialize)]
struct ExportRow {
    year: i32,
    gdp: f64,
    total_revenue: f64,
    program_spending: f64,
    interest_expense: f64,
    total_spending: f64,
    surplus: f64,
    redirected: f64,
    rebate: f64,
    cumulative_debt: f64,
    debt_to_gdp: f64,
    spending_to_gdp: f64,
    phase: String,
    recession: bool,
    degraded: bool,
    extrapolated: bool,
}

impl From<&YearRow> for ExportRow {
    fn from(row: &YearRow) -> Self {
        Self {
            year: row.calendar_year,
            gdp: row.gdp,
            total_revenue: row.total_revenue,
            program_spending: row.program_spending,
            interest_expense: row.interest_expense,
            total_spending: row.total_spending,
            surplus: row.surplus,
            redirected: row.redirect.total(),
            rebate: row.redirect.rebate,
            cumulative_debt: row.cumulative_debt,
            debt_to_gdp: row.debt_to_gdp,
            spending_to_gdp: row.spending_to_gdp,
            phase: format!("{:?}", row.phase),
            recession: row.recession,
            degraded: row.degraded,
            extrapolated: row.extrapolated,
        }
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

    println!("Fiscal Projection v{}", env!("CARGO_PKG_VERSION"));
    println!("======================\n");
    println!("Policy: {}", policy.name);
    println!("  Revenue streams: {}", policy.revenue_streams.len());
    println!("  Spending categories: {}", policy.spending_categories.len());
    println!("  Horizon: {} years", policy.general_parameters.horizon_years);
    println!();

    let simulator = DeterministicSimulator::new(policy).context("invalid policy configuration")?;
    let trajectory = simulator.run();

    println!(
        "{:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>8} {:>22}",
        "Year", "GDP", "Revenue", "Spending", "Surplus", "Debt", "Debt/GDP", "Phase"
    );
    println!("{}", "-".repeat(94));
    const TRILLION: f64 = 1.0e12;
    for row in trajectory.rows.iter().take(20) {
        println!(
            "{:>6} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>8.3} {:>22}",
            row.calendar_year,
            row.gdp / TRILLION,
            row.total_revenue / TRILLION,
            row.total_spending / TRILLION,
            row.surplus / TRILLION,
            row.cumulative_debt / TRILLION,
            row.debt_to_gdp,
            format!("{:?}", row.phase),
        );
    }
    if trajectory.len() > 20 {
        println!("... ({} more years)", trajectory.len() - 20);
    }

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for row in &trajectory.rows {
        writer.serialize(ExportRow::from(row))?;
    }
    writer.flush()?;
    println!("\nFull results written to: {}", args.output.display());

    let summary = trajectory.summary();
    println!("\nSummary (trillions):");
    println!("  Total Years: {}", summary.total_years);
    println!("  Total Revenue: {:.3}", summary.total_revenue / TRILLION);
    println!("  Total Spending: {:.3}", summary.total_spending / TRILLION);
    println!("  Total Interest: {:.3}", summary.total_interest / TRILLION);
    println!("  Final Debt: {:.3}", summary.final_debt / TRILLION);
    println!("  Final Debt/GDP: {:.3}", summary.final_debt_to_gdp);

    let metrics = MetricsAggregator::compute(&trajectory);
    println!("\nMetrics:");
    for (name, value) in metrics.named() {
        println!("  {:<28} {:.4}", name, value);
    }
    if let Some(reason) = metrics.termination_reason {
        println!("\nWARNING: projection terminated early ({:?})", reason);
    }
    if metrics.degraded {
        println!("WARNING: some years needed value substitution");
    }

    Ok(())
}
