//! Per-trial perturbation of a base policy

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::SamplingError;
use crate::policy::PolicyConfiguration;

use super::distribution::{ParameterDistribution, ParameterSpec};

/// Trials per run when a sampling file does not say
pub const DEFAULT_TRIAL_COUNT: usize = 1_000;

/// When rates are redrawn within a trial
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedrawMode {
    /// One draw per trial, held for the whole horizon
    #[default]
    PerTrial,
    /// A fresh draw for every year
    PerYear,
}

/// Which parameters vary across Monte Carlo trials, and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default)]
    pub growth: Option<ParameterSpec>,
    #[serde(default)]
    pub inflation: Option<ParameterSpec>,
    #[serde(default)]
    pub interest_rate: Option<ParameterSpec>,
    /// Cost multipliers drawn per spending category
    #[serde(default)]
    pub cost_shocks: BTreeMap<String, ParameterDistribution>,
    #[serde(default)]
    pub redraw: RedrawMode,
    #[serde(default = "default_trial_count")]
    pub trial_count: usize,
    #[serde(default)]
    pub master_seed: u64,
}

fn default_trial_count() -> usize {
    DEFAULT_TRIAL_COUNT
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            growth: None,
            inflation: None,
            interest_rate: None,
            cost_shocks: BTreeMap::new(),
            redraw: RedrawMode::PerTrial,
            trial_count: DEFAULT_TRIAL_COUNT,
            master_seed: 0,
        }
    }
}

impl SamplingConfig {
    /// Same config under another master seed
    pub fn with_seed(mut self, master_seed: u64) -> Self {
        self.master_seed = master_seed;
        self
    }
}

/// Seed for one trial, a pure function of the master seed and trial index.
///
/// SplitMix64 finaliser, so neighbouring indices give unrelated streams.
pub fn trial_seed(master_seed: u64, trial_index: u64) -> u64 {
    let mut z = master_seed ^ trial_index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Draws one perturbed copy of a policy per trial
#[derive(Debug, Clone)]
pub struct StochasticSampler {
    config: SamplingConfig,
}

impl StochasticSampler {
    /// Check every distribution and build the sampler
    pub fn new(config: SamplingConfig) -> Result<Self, SamplingError> {
        Self::check_config(&config)?;
        Ok(Self { config })
    }

    /// Validate every configured distribution
    pub fn check_config(config: &SamplingConfig) -> Result<(), SamplingError> {
        for (parameter, spec) in [
            ("growth", &config.growth),
            ("inflation", &config.inflation),
            ("interest_rate", &config.interest_rate),
        ] {
            if let Some(spec) = spec {
                spec.distribution.check(parameter)?;
            }
        }
        for (category, dist) in &config.cost_shocks {
            dist.check(&format!("{category} cost shock"))?;
        }
        Ok(())
    }

    /// Confirm every cost shock names a category of `policy`
    pub fn check_categories(&self, policy: &PolicyConfiguration) -> Result<(), SamplingError> {
        for category in self.config.cost_shocks.keys() {
            if policy.category_index(category).is_none() {
                return Err(SamplingError::UnknownCategory(category.clone()));
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Perturbed copy of `base`. The same seed always gives the same policy.
    ///
    /// Growth and inflation are floored at -100%. Cost multipliers are
    /// floored at zero. Draws happen in a fixed order: growth, inflation,
    /// interest rate, then cost shocks by category name.
    pub fn sample(&self, base: &PolicyConfiguration, rng_seed: u64) -> PolicyConfiguration {
        let mut rng = StdRng::seed_from_u64(rng_seed);
        let mut policy = base.clone();
        let params = &mut policy.general_parameters;
        let horizon = params.horizon_years as usize;

        if let Some(spec) = &self.config.growth {
            let (rate, path) = self.draw_rate(
                spec,
                params.gdp_growth_rate,
                params.growth_path.as_deref(),
                horizon,
                &mut rng,
            );
            params.gdp_growth_rate = rate;
            params.growth_path = path;
        }

        if let Some(spec) = &self.config.inflation {
            let (rate, path) = self.draw_rate(
                spec,
                params.inflation_rate,
                params.inflation_path.as_deref(),
                horizon,
                &mut rng,
            );
            params.inflation_rate = rate;
            params.inflation_path = path;
        }

        if let Some(spec) = &self.config.interest_rate {
            let draw = spec.distribution.sample(&mut rng);
            params.interest_rate = spec.apply.apply(params.interest_rate, draw);
        }

        for (name, dist) in &self.config.cost_shocks {
            let draw = dist.sample(&mut rng).max(0.0);
            if let Some(category) = policy.spending_categories.iter_mut().find(|c| &c.name == name) {
                category.cost_multiplier *= draw;
            }
        }

        policy
    }

    fn draw_rate<R: Rng + ?Sized>(
        &self,
        spec: &ParameterSpec,
        base_rate: f64,
        base_path: Option<&[f64]>,
        horizon: usize,
        rng: &mut R,
    ) -> (f64, Option<Vec<f64>>) {
        let base_at = |t: usize| base_path.and_then(|p| p.get(t).copied()).unwrap_or(base_rate);

        match self.config.redraw {
            RedrawMode::PerTrial => {
                let draw = spec.distribution.sample(rng);
                let rate = floor_rate(spec.apply.apply(base_rate, draw));
                let path = base_path.map(|p| {
                    p.iter()
                        .map(|&r| floor_rate(spec.apply.apply(r, draw)))
                        .collect()
                });
                (rate, path)
            }
            RedrawMode::PerYear => {
                let draws = spec.distribution.sample_sequence(rng, horizon);
                let path = draws
                    .iter()
                    .enumerate()
                    .map(|(t, &draw)| floor_rate(spec.apply.apply(base_at(t), draw)))
                    .collect();
                (base_rate, Some(path))
            }
        }
    }
}

fn floor_rate(rate: f64) -> f64 {
    rate.max(-1.0)
}
