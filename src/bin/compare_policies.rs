//! Compare a current and a proposed policy year by year
//!
//! Usage: cargo run --bin compare_policies -- --current status-quo --proposed healthcare-reform

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use fiscal_projection::policy::{load_policy, presets, PolicyConfiguration};
use fiscal_projection::scenario::ScenarioRunner;

#[derive(Parser, Debug)]
#[command(name = "compare_policies")]
#[command(about = "Side-by-side comparison of two fiscal policies")]
struct Args {
    /// Preset name or path to a policy JSON file
    #[arg(long, default_value = "status-quo")]
    current: String,

    /// Preset name or path to a policy JSON file
    #[arg(long, default_value = "healthcare-reform")]
    proposed: String,

    #[arg(long, default_value_t = 30)]
    horizon: u32,

    #[arg(short, long, default_value = "policy_comparison.csv")]
    output: PathBuf,
}

fn resolve(spec: &str, horizon: u32) -> Result<PolicyConfiguration> {
    if let Some(policy) = presets::by_name(spec, horizon) {
        return Ok(policy);
    }
    let path = PathBuf::from(spec);
    if !path.exists() {
        bail!("'{}' is neither a preset nor a policy file", spec);
    }
    load_policy(&path).with_context(|| format!("loading policy from {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let current = resolve(&args.current, args.horizon)?;
    let proposed = resolve(&args.proposed, args.horizon)?;

    let runner = ScenarioRunner::new().with_horizon(args.horizon);
    let comparison = runner.compare(&current, &proposed)?;

    println!("{} vs {}", comparison.current.policy_name, comparison.proposed.policy_name);
    println!("{}", "=".repeat(60));
    println!(
        "{:>6} {:>12} {:>12} {:>12} {:>10} {:>10}",
        "Year", "Surplus Δ", "Debt Δ", "Spending Δ", "Cur D/GDP", "Prop D/GDP"
    );
    const TRILLION: f64 = 1.0e12;
    for row in &comparison.rows {
        println!(
            "{:>6} {:>12.3} {:>12.3} {:>12.3} {:>10.3} {:>10.3}",
            row.calendar_year,
            row.surplus_delta / TRILLION,
            row.debt_delta / TRILLION,
            row.spending_delta / TRILLION,
            row.current_debt_to_gdp,
            row.proposed_debt_to_gdp,
        );
    }

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for row in &comparison.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    println!("\nComparison written to: {}", args.output.display());

    println!("\nSummary:");
    println!("  Cumulative surplus gain: {:.3}T", comparison.cumulative_surplus_delta() / TRILLION);
    println!("  Final debt change:       {:.3}T", comparison.final_debt_delta() / TRILLION);
    println!("  Final debt/GDP change:   {:.3}", comparison.final_debt_to_gdp_delta());
    match comparison.solvency_years_gained() {
        Some(years) => println!("  Solvency reached {} years sooner", years),
        None => println!(
            "  Solvency year: current {:?}, proposed {:?}",
            comparison.current.solvency_year, comparison.proposed.solvency_year
        ),
    }
    println!(
        "  Circuit breaker years (proposed): {}",
        comparison.proposed.circuit_breaker_years
    );
    println!(
        "  Surplus distributed as rebates (proposed): {:.3}T",
        comparison.proposed.total_surplus_distributed / TRILLION
    );

    Ok(())
}
