//! Named fiscal metrics derived from trajectories and distributions

use serde::{Deserialize, Serialize};

use crate::projection::{Phase, TerminationReason, TrackedField, Trajectory};
use crate::stochastic::{BandStats, ReducedDistribution};

use super::comparison::PolicyComparison;

/// Scalar and series metrics of one trajectory.
///
/// Flow totals (surplus, rebates, interest) skip extrapolated years so a
/// terminated run is not credited with repeated copies of its last year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub policy_name: String,
    pub years: usize,
    pub debt_to_gdp_final: f64,
    pub debt_to_gdp_peak: f64,
    pub final_debt: f64,
    pub peak_debt: f64,
    /// First calendar year with debt at or below zero
    pub solvency_year: Option<i32>,
    pub cumulative_surplus: f64,
    pub cumulative_primary_surplus: f64,
    /// Direct rebates paid out by the surplus redirect
    pub total_surplus_distributed: f64,
    /// Everything the redirect moved, all four destinations
    pub total_redirected: f64,
    pub total_interest: f64,
    pub circuit_breaker_years: usize,
    pub recession_years: usize,
    pub max_consecutive_deficits: u32,
    pub terminated_at: Option<i32>,
    pub termination_reason: Option<TerminationReason>,
    pub degraded: bool,
    pub debt_to_gdp_series: Vec<f64>,
}

impl Metrics {
    /// Flat `(name, value)` pairs for export. Absent years export as NaN.
    pub fn named(&self) -> Vec<(&'static str, f64)> {
        let year = |y: Option<i32>| y.map_or(f64::NAN, f64::from);
        vec![
            ("years", self.years as f64),
            ("debt_to_gdp_final", self.debt_to_gdp_final),
            ("debt_to_gdp_peak", self.debt_to_gdp_peak),
            ("final_debt", self.final_debt),
            ("peak_debt", self.peak_debt),
            ("solvency_year", year(self.solvency_year)),
            ("cumulative_surplus", self.cumulative_surplus),
            ("cumulative_primary_surplus", self.cumulative_primary_surplus),
            ("total_surplus_distributed", self.total_surplus_distributed),
            ("total_redirected", self.total_redirected),
            ("total_interest", self.total_interest),
            ("circuit_breaker_years", self.circuit_breaker_years as f64),
            ("recession_years", self.recession_years as f64),
            ("max_consecutive_deficits", f64::from(self.max_consecutive_deficits)),
            ("terminated_at", year(self.terminated_at)),
            ("degraded", if self.degraded { 1.0 } else { 0.0 }),
        ]
    }

    /// Full horizon with no substitution and no early stop
    pub fn is_clean(&self) -> bool {
        !self.degraded && self.terminated_at.is_none()
    }
}

/// Metrics of a reduced Monte Carlo distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionMetrics {
    pub policy_name: String,
    pub trial_count: usize,
    pub debt_to_gdp_final: Option<BandStats>,
    pub final_debt: Option<BandStats>,
    pub final_surplus: Option<BandStats>,
    /// Share of trials that reached zero debt
    pub solvency_share: f64,
    pub solvency_year_p50: Option<f64>,
    pub degraded_share: f64,
    pub terminated_share: f64,
    pub debt_to_gdp_p10: Vec<f64>,
    pub debt_to_gdp_p50: Vec<f64>,
    pub debt_to_gdp_p90: Vec<f64>,
}

impl DistributionMetrics {
    /// Scalar metrics as `(name, value)` pairs for export
    pub fn named(&self) -> Vec<(&'static str, f64)> {
        let p50 = |band: &Option<BandStats>| band.map_or(f64::NAN, |b| b.p50);
        vec![
            ("trial_count", self.trial_count as f64),
            ("debt_to_gdp_final_p50", p50(&self.debt_to_gdp_final)),
            ("final_debt_p50", p50(&self.final_debt)),
            ("final_surplus_p50", p50(&self.final_surplus)),
            ("solvency_share", self.solvency_share),
            ("solvency_year_p50", self.solvency_year_p50.unwrap_or(f64::NAN)),
            ("degraded_share", self.degraded_share),
            ("terminated_share", self.terminated_share),
        ]
    }
}

/// Stateless derivation of metrics
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Derive the named scalars of one trajectory
    pub fn compute(trajectory: &Trajectory) -> Metrics {
        let live = || trajectory.rows.iter().filter(|r| !r.extrapolated);
        let final_row = trajectory.final_row();

        let mut max_consecutive_deficits = 0;
        let mut run = 0;
        for row in live() {
            if row.surplus < 0.0 {
                run += 1;
                max_consecutive_deficits = max_consecutive_deficits.max(run);
            } else {
                run = 0;
            }
        }

        Metrics {
            policy_name: trajectory.policy_name.clone(),
            years: trajectory.len(),
            debt_to_gdp_final: final_row.map_or(0.0, |r| r.debt_to_gdp),
            debt_to_gdp_peak: peak(trajectory.rows.iter().map(|r| r.debt_to_gdp)),
            final_debt: final_row.map_or(0.0, |r| r.cumulative_debt),
            peak_debt: peak(trajectory.rows.iter().map(|r| r.cumulative_debt)),
            solvency_year: trajectory
                .rows
                .iter()
                .find(|r| r.cumulative_debt <= 0.0)
                .map(|r| r.calendar_year),
            cumulative_surplus: live().map(|r| r.surplus).sum(),
            cumulative_primary_surplus: live().map(|r| r.primary_surplus).sum(),
            total_surplus_distributed: live().map(|r| r.redirect.rebate).sum(),
            total_redirected: live().map(|r| r.redirect.total()).sum(),
            total_interest: live().map(|r| r.interest_expense).sum(),
            circuit_breaker_years: live()
                .filter(|r| r.phase == Phase::CircuitBreakerActive)
                .count(),
            recession_years: live().filter(|r| r.recession).count(),
            max_consecutive_deficits,
            terminated_at: trajectory
                .terminated_at()
                .map(|i| trajectory.start_year + i as i32),
            termination_reason: trajectory.termination.map(|t| t.reason),
            degraded: trajectory.degraded,
            debt_to_gdp_series: trajectory.series(TrackedField::DebtToGdp),
        }
    }

    /// Derive final-year bands and trial shares of a Monte Carlo run
    pub fn compute_distribution(distribution: &ReducedDistribution) -> DistributionMetrics {
        let series = |pick: fn(&BandStats) -> f64| -> Vec<f64> {
            distribution
                .band_series(TrackedField::DebtToGdp)
                .iter()
                .map(pick)
                .collect()
        };

        DistributionMetrics {
            policy_name: distribution.policy_name.clone(),
            trial_count: distribution.trial_count,
            debt_to_gdp_final: distribution.final_band(TrackedField::DebtToGdp).copied(),
            final_debt: distribution.final_band(TrackedField::CumulativeDebt).copied(),
            final_surplus: distribution.final_band(TrackedField::Surplus).copied(),
            solvency_share: distribution.solvency_share(),
            solvency_year_p50: distribution.solvency_year.map(|b| b.p50),
            degraded_share: distribution.degraded_share(),
            terminated_share: distribution.terminated_share(),
            debt_to_gdp_p10: series(|b| b.p10),
            debt_to_gdp_p50: series(|b| b.p50),
            debt_to_gdp_p90: series(|b| b.p90),
        }
    }

    /// Paired per-year comparison of a current and a proposed policy
    pub fn compare(current: &Trajectory, proposed: &Trajectory) -> PolicyComparison {
        PolicyComparison::new(current, proposed)
    }
}

fn peak(values: impl Iterator<Item = f64>) -> f64 {
    values.reduce(f64::max).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{
        GeneralParameters, PolicyConfiguration, RevenueStream, SpendingCategory, SurplusRedirectRule,
    };
    use crate::projection::{DeterministicSimulator, RedirectSplit, YearRow};
    use approx::assert_relative_eq;

    fn surplus_policy(horizon: u32) -> PolicyConfiguration {
        let params = GeneralParameters {
            gdp_growth_rate: 0.0,
            inflation_rate: 0.0,
            ..GeneralParameters::new(30.0e12, 1.0e12, horizon)
        };
        PolicyConfiguration::new("surplus", params)
            .with_stream(RevenueStream::percent_of_gdp("tax", 0.20).with_destination("services", 1.0))
            .with_category(SpendingCategory::percent_of_gdp("services", 0.18).funded_by("tax", 1.0))
    }

    #[test]
    fn test_solvency_year_and_final_ratio() {
        let trajectory = DeterministicSimulator::new(surplus_policy(5)).unwrap().run();
        let metrics = MetricsAggregator::compute(&trajectory);

        // 0.6T surplus a year pays off 1.0T of debt in the second year
        assert_eq!(metrics.solvency_year, Some(2026));
        assert_relative_eq!(metrics.final_debt, 1.0e12 - 5.0 * 0.6e12, max_relative = 1e-9);
        assert_relative_eq!(metrics.debt_to_gdp_final, metrics.final_debt / 30.0e12, max_relative = 1e-12);
        assert_relative_eq!(metrics.cumulative_surplus, 3.0e12, max_relative = 1e-9);
        assert_eq!(metrics.max_consecutive_deficits, 0);
        assert!(metrics.is_clean());
        assert_eq!(metrics.debt_to_gdp_series.len(), 5);
    }

    #[test]
    fn test_rebates_counted_as_distributed() {
        let mut policy = surplus_policy(3);
        policy.general_parameters.safeguards.surplus_redirect = Some(SurplusRedirectRule::default());
        let trajectory = DeterministicSimulator::new(policy).unwrap().run();
        let metrics = MetricsAggregator::compute(&trajectory);

        let excess = 6.0e12 - 1.05 * 5.4e12;
        assert_relative_eq!(metrics.total_surplus_distributed, 3.0 * 0.15 * excess, max_relative = 1e-9);
        assert_relative_eq!(metrics.total_redirected, 3.0 * excess, max_relative = 1e-9);
    }

    #[test]
    fn test_extrapolated_years_not_double_counted() {
        let mut trajectory = Trajectory::new("t", 2025);
        let mut row = YearRow::new(0, 2025);
        row.surplus = -1.0;
        row.cumulative_debt = 10.0;
        row.redirect = RedirectSplit { rebate: 2.0, ..Default::default() };
        row.termination = Some(TerminationReason::DebtExplosion);
        trajectory.add_row(row.clone());
        trajectory.add_row(row.extrapolate_to(1, 2026));
        trajectory.add_row(row.extrapolate_to(2, 2027));

        let metrics = MetricsAggregator::compute(&trajectory);
        assert_eq!(metrics.cumulative_surplus, -1.0);
        assert_eq!(metrics.total_surplus_distributed, 2.0);
        assert_eq!(metrics.max_consecutive_deficits, 1);
        assert_eq!(metrics.terminated_at, Some(2025));
        assert_eq!(metrics.termination_reason, Some(TerminationReason::DebtExplosion));
        assert_eq!(metrics.years, 3);
    }

    #[test]
    fn test_named_metrics_export_missing_years_as_nan() {
        let mut policy = surplus_policy(3);
        policy.general_parameters.initial_debt = 100.0e12;
        let metrics = MetricsAggregator::compute(&DeterministicSimulator::new(policy).unwrap().run());

        let named = metrics.named();
        let solvency = named.iter().find(|(name, _)| *name == "solvency_year").unwrap();
        assert!(solvency.1.is_nan());
        assert!(named.iter().any(|(name, _)| *name == "debt_to_gdp_final"));
    }

    #[test]
    fn test_distribution_metrics() {
        use crate::stochastic::{MonteCarloEngine, ParameterSpec, SamplingConfig};

        let sampling = SamplingConfig {
            growth: Some(ParameterSpec::jitter(0.01)),
            ..SamplingConfig::default()
        };
        let engine = MonteCarloEngine::new(surplus_policy(6), sampling).unwrap();
        let reduced = engine.run(200).unwrap();
        let metrics = MetricsAggregator::compute_distribution(&reduced);

        assert_eq!(metrics.trial_count, 200);
        assert_eq!(metrics.debt_to_gdp_p50.len(), 6);
        // Surpluses retire the 1T debt in the second year whatever the growth draw
        assert_eq!(metrics.solvency_share, 1.0);
        assert_eq!(metrics.solvency_year_p50, Some(2026.0));
        for ((lo, mid), hi) in metrics
            .debt_to_gdp_p10
            .iter()
            .zip(&metrics.debt_to_gdp_p50)
            .zip(&metrics.debt_to_gdp_p90)
        {
            assert!(lo <= mid && mid <= hi);
        }
    }
}
