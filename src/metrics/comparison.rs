//! Paired comparison of a current and a proposed policy

use serde::{Deserialize, Serialize};

use crate::projection::Trajectory;

use super::aggregator::{Metrics, MetricsAggregator};

/// One year of a side-by-side comparison. Deltas are proposed minus current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub year_index: u32,
    pub calendar_year: i32,
    pub current_revenue: f64,
    pub proposed_revenue: f64,
    pub revenue_delta: f64,
    pub current_spending: f64,
    pub proposed_spending: f64,
    pub spending_delta: f64,
    pub current_surplus: f64,
    pub proposed_surplus: f64,
    pub surplus_delta: f64,
    pub current_debt: f64,
    pub proposed_debt: f64,
    pub debt_delta: f64,
    pub current_debt_to_gdp: f64,
    pub proposed_debt_to_gdp: f64,
    pub debt_to_gdp_delta: f64,
}

/// Per-year deltas plus both policies' metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyComparison {
    pub current: Metrics,
    pub proposed: Metrics,
    pub rows: Vec<ComparisonRow>,
}

impl PolicyComparison {
    /// Pair years by index; the comparison stops at the shorter trajectory
    pub fn new(current: &Trajectory, proposed: &Trajectory) -> Self {
        let rows = current
            .rows
            .iter()
            .zip(&proposed.rows)
            .map(|(c, p)| ComparisonRow {
                year_index: c.year_index,
                calendar_year: c.calendar_year,
                current_revenue: c.total_revenue,
                proposed_revenue: p.total_revenue,
                revenue_delta: p.total_revenue - c.total_revenue,
                current_spending: c.total_spending,
                proposed_spending: p.total_spending,
                spending_delta: p.total_spending - c.total_spending,
                current_surplus: c.surplus,
                proposed_surplus: p.surplus,
                surplus_delta: p.surplus - c.surplus,
                current_debt: c.cumulative_debt,
                proposed_debt: p.cumulative_debt,
                debt_delta: p.cumulative_debt - c.cumulative_debt,
                current_debt_to_gdp: c.debt_to_gdp,
                proposed_debt_to_gdp: p.debt_to_gdp,
                debt_to_gdp_delta: p.debt_to_gdp - c.debt_to_gdp,
            })
            .collect();

        Self {
            current: MetricsAggregator::compute(current),
            proposed: MetricsAggregator::compute(proposed),
            rows,
        }
    }

    /// Sum of yearly surplus gains
    pub fn cumulative_surplus_delta(&self) -> f64 {
        self.rows.iter().map(|r| r.surplus_delta).sum()
    }

    /// Proposed minus current debt in the last year
    pub fn final_debt_delta(&self) -> f64 {
        self.rows.last().map_or(0.0, |r| r.debt_delta)
    }

    /// Proposed minus current debt/GDP in the last year
    pub fn final_debt_to_gdp_delta(&self) -> f64 {
        self.rows.last().map_or(0.0, |r| r.debt_to_gdp_delta)
    }

    /// Years earlier (positive) that the proposed policy reaches solvency.
    /// None unless both policies reach it.
    pub fn solvency_years_gained(&self) -> Option<i32> {
        match (self.current.solvency_year, self.proposed.solvency_year) {
            (Some(current), Some(proposed)) => Some(current - proposed),
            _ => None,
        }
    }

    /// First year in which the proposed policy runs a larger surplus
    pub fn first_improvement_year(&self) -> Option<i32> {
        self.rows
            .iter()
            .find(|r| r.surplus_delta > 0.0)
            .map(|r| r.calendar_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{GeneralParameters, PolicyConfiguration, RevenueStream, SpendingCategory};
    use crate::projection::DeterministicSimulator;
    use approx::assert_relative_eq;

    fn policy(name: &str, spending: f64, horizon: u32) -> PolicyConfiguration {
        let params = GeneralParameters {
            gdp_growth_rate: 0.0,
            inflation_rate: 0.0,
            ..GeneralParameters::new(30.0e12, 3.0e12, horizon)
        };
        PolicyConfiguration::new(name, params)
            .with_stream(RevenueStream::percent_of_gdp("tax", 0.20).with_destination("services", 1.0))
            .with_category(SpendingCategory::percent_of_gdp("services", spending).funded_by("tax", 1.0))
    }

    #[test]
    fn test_paired_deltas() {
        let current = DeterministicSimulator::new(policy("current", 0.19, 4)).unwrap().run();
        let proposed = DeterministicSimulator::new(policy("proposed", 0.17, 4)).unwrap().run();
        let comparison = MetricsAggregator::compare(&current, &proposed);

        assert_eq!(comparison.rows.len(), 4);
        for row in &comparison.rows {
            assert_relative_eq!(row.surplus_delta, 0.6e12, max_relative = 1e-9);
            assert_relative_eq!(row.spending_delta, -0.6e12, max_relative = 1e-9);
            assert_eq!(row.revenue_delta, 0.0);
        }
        assert_relative_eq!(comparison.cumulative_surplus_delta(), 2.4e12, max_relative = 1e-9);
        assert_relative_eq!(comparison.final_debt_delta(), -2.4e12, max_relative = 1e-9);
        assert_eq!(comparison.first_improvement_year(), Some(2025));
        assert_eq!(comparison.current.policy_name, "current");
    }

    #[test]
    fn test_solvency_years_gained() {
        // Current retires 3T at 0.3T a year, proposed at 0.9T a year
        let current = DeterministicSimulator::new(policy("current", 0.19, 12)).unwrap().run();
        let proposed = DeterministicSimulator::new(policy("proposed", 0.17, 12)).unwrap().run();
        let comparison = PolicyComparison::new(&current, &proposed);

        assert_eq!(comparison.current.solvency_year, Some(2034));
        assert_eq!(comparison.proposed.solvency_year, Some(2028));
        assert_eq!(comparison.solvency_years_gained(), Some(6));
    }

    #[test]
    fn test_shorter_trajectory_bounds_rows() {
        let current = DeterministicSimulator::new(policy("current", 0.19, 6)).unwrap().run();
        let proposed = DeterministicSimulator::new(policy("proposed", 0.17, 3)).unwrap().run();

        assert_eq!(PolicyComparison::new(&current, &proposed).rows.len(), 3);
    }
}
