//! Scenario runner for batch projections and policy comparisons
//!
//! Holds run-wide settings once (horizon override, sampling config) and
//! applies them to every policy it is handed.

use rayon::prelude::*;

use crate::error::{ConfigError, EngineError};
use crate::metrics::{MetricsAggregator, PolicyComparison};
use crate::policy::PolicyConfiguration;
use crate::projection::{DeterministicSimulator, Trajectory};
use crate::stochastic::{MonteCarloEngine, MonteCarloOptions, ReducedDistribution, SamplingConfig};

/// Runs many policies under shared settings
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::new().with_horizon(30);
/// let comparison = runner.compare(&status_quo(30), &healthcare_reform(30))?;
/// println!("{:.2}", comparison.final_debt_to_gdp_delta());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScenarioRunner {
    horizon_override: Option<u32>,
    sampling: SamplingConfig,
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project every policy over `years` instead of its own horizon
    pub fn with_horizon(mut self, years: u32) -> Self {
        self.horizon_override = Some(years);
        self
    }

    /// Sampling config used by `run_monte_carlo`
    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn sampling(&self) -> &SamplingConfig {
        &self.sampling
    }

    fn prepare(&self, policy: &PolicyConfiguration) -> PolicyConfiguration {
        let mut policy = policy.clone();
        if let Some(years) = self.horizon_override {
            policy.general_parameters.horizon_years = years;
        }
        policy
    }

    /// Run a single deterministic projection
    pub fn run(&self, policy: &PolicyConfiguration) -> Result<Trajectory, ConfigError> {
        Ok(DeterministicSimulator::new(self.prepare(policy))?.run())
    }

    /// Run projections for multiple policies in parallel, results in input order
    pub fn run_batch(&self, policies: &[PolicyConfiguration]) -> Vec<Result<Trajectory, ConfigError>> {
        policies.par_iter().map(|p| self.run(p)).collect()
    }

    /// Project both policies and pair them year by year
    pub fn compare(
        &self,
        current: &PolicyConfiguration,
        proposed: &PolicyConfiguration,
    ) -> Result<PolicyComparison, ConfigError> {
        let current = self.run(current)?;
        let proposed = self.run(proposed)?;
        Ok(MetricsAggregator::compare(&current, &proposed))
    }

    /// Monte Carlo with the runner's sampling config; `trial_count` falls
    /// back to the config's own count
    pub fn run_monte_carlo(
        &self,
        policy: &PolicyConfiguration,
        trial_count: Option<usize>,
        options: &MonteCarloOptions,
    ) -> Result<ReducedDistribution, EngineError> {
        let engine = MonteCarloEngine::new(self.prepare(policy), self.sampling.clone())?;
        engine.run_with(trial_count.unwrap_or(self.sampling.trial_count), options)
    }
}
