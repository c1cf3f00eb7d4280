//! Parallel Monte Carlo over perturbed policies

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use log::info;
use rayon::prelude::*;

use crate::error::EngineError;
use crate::policy::{validate_policy, PolicyConfiguration};
use crate::projection::{DeterministicSimulator, Trajectory};

use super::reduction::{ReducedDistribution, TrialSample};
use super::sampler::{trial_seed, SamplingConfig, StochasticSampler};

/// Cooperative cancellation flag, checked before every trial
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask running trials to stop; trials already started finish
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Completed-trial counter readable from another thread
#[derive(Debug, Clone, Default)]
pub struct MonteCarloProgress {
    completed: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl MonteCarloProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trials finished so far
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Trials requested by the current run
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Completed share in [0, 1]
    pub fn fraction(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.completed() as f64 / total as f64,
        }
    }

    fn start(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    fn tick(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Execution options for a Monte Carlo run
#[derive(Debug, Clone)]
pub struct MonteCarloOptions {
    /// Spread trials over the rayon thread pool
    pub parallel: bool,
    pub cancellation: Option<CancellationToken>,
    pub progress: Option<MonteCarloProgress>,
}

impl Default for MonteCarloOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            cancellation: None,
            progress: None,
        }
    }
}

impl MonteCarloOptions {
    /// Single-threaded run without cancellation or progress
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }
}

/// Runs many perturbed projections of one policy and reduces them.
///
/// Each trial is a pure function of the base policy, the sampling config,
/// and its index, so results are identical in parallel and sequential mode.
#[derive(Debug, Clone)]
pub struct MonteCarloEngine {
    policy: PolicyConfiguration,
    sampler: StochasticSampler,
}

impl MonteCarloEngine {
    /// Validate the policy and sampling config once for all trials
    pub fn new(policy: PolicyConfiguration, sampling: SamplingConfig) -> Result<Self, EngineError> {
        validate_policy(&policy)?;
        let sampler = StochasticSampler::new(sampling)?;
        sampler.check_categories(&policy)?;
        Ok(Self { policy, sampler })
    }

    pub fn policy(&self) -> &PolicyConfiguration {
        &self.policy
    }

    pub fn sampling(&self) -> &SamplingConfig {
        self.sampler.config()
    }

    /// Reproduce the full trajectory of one trial
    pub fn simulate_trial(&self, trial_index: usize) -> Trajectory {
        let seed = trial_seed(self.sampler.config().master_seed, trial_index as u64);
        let perturbed = self.sampler.sample(&self.policy, seed);
        DeterministicSimulator::from_validated(perturbed).run()
    }

    /// Run `trial_count` trials in parallel and reduce them
    pub fn run(&self, trial_count: usize) -> Result<ReducedDistribution, EngineError> {
        self.run_with(trial_count, &MonteCarloOptions::default())
    }

    pub fn run_with(
        &self,
        trial_count: usize,
        options: &MonteCarloOptions,
    ) -> Result<ReducedDistribution, EngineError> {
        if trial_count == 0 {
            return Err(EngineError::InvalidTrialCount(trial_count));
        }

        let master_seed = self.sampler.config().master_seed;
        info!(
            "{}: starting {} trials (seed {}, {})",
            self.policy.name,
            trial_count,
            master_seed,
            if options.parallel { "parallel" } else { "sequential" }
        );
        if let Some(progress) = &options.progress {
            progress.start(trial_count);
        }

        let trial = |index: usize| -> Option<TrialSample> {
            if options
                .cancellation
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                return None;
            }
            let sample = TrialSample::from_trajectory(&self.simulate_trial(index));
            if let Some(progress) = &options.progress {
                progress.tick();
            }
            Some(sample)
        };

        let results: Vec<Option<TrialSample>> = if options.parallel {
            (0..trial_count).into_par_iter().map(trial).collect()
        } else {
            (0..trial_count).map(trial).collect()
        };

        let completed = results.iter().filter(|r| r.is_some()).count();
        if completed < trial_count {
            info!("{}: cancelled after {} trials", self.policy.name, completed);
            return Err(EngineError::Cancelled { completed });
        }
        let samples: Vec<TrialSample> = results.into_iter().flatten().collect();

        let params = &self.policy.general_parameters;
        let reduced = ReducedDistribution::from_samples(
            &self.policy.name,
            params.start_year,
            params.horizon_years,
            master_seed,
            &samples,
        );

        info!(
            "{}: finished {} trials ({} degraded, {} terminated early)",
            self.policy.name, reduced.trial_count, reduced.degraded_trials, reduced.terminated_trials
        );
        Ok(reduced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{GeneralParameters, RevenueStream, SpendingCategory};
    use crate::projection::TrackedField;
    use crate::stochastic::{ParameterDistribution, ParameterSpec, RedrawMode, ShockApplication};

    fn base_policy(horizon: u32) -> PolicyConfiguration {
        let params = GeneralParameters {
            gdp_growth_rate: 0.025,
            inflation_rate: 0.025,
            interest_rate: 0.03,
            ..GeneralParameters::new(30.0e12, 10.0e12, horizon)
        };
        PolicyConfiguration::new("mc", params)
            .with_stream(RevenueStream::percent_of_gdp("tax", 0.20).with_destination("services", 1.0))
            .with_category(SpendingCategory::percent_of_gdp("services", 0.18).funded_by("tax", 1.0))
    }

    fn jitter(seed: u64) -> SamplingConfig {
        SamplingConfig {
            growth: Some(ParameterSpec::jitter(0.01)),
            inflation: Some(ParameterSpec::jitter(0.005)),
            redraw: RedrawMode::PerYear,
            ..SamplingConfig::default()
        }
        .with_seed(seed)
    }

    #[test]
    fn test_zero_trials_rejected() {
        let engine = MonteCarloEngine::new(base_policy(5), jitter(1)).unwrap();
        assert!(matches!(engine.run(0), Err(EngineError::InvalidTrialCount(0))));
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let mut policy = base_policy(5);
        policy.general_parameters.horizon_years = 0;
        assert!(matches!(
            MonteCarloEngine::new(policy, jitter(1)),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let engine = MonteCarloEngine::new(base_policy(8), jitter(2024)).unwrap();
        let parallel = engine.run(300).unwrap();
        let sequential = engine.run_with(300, &MonteCarloOptions::sequential()).unwrap();

        assert_eq!(parallel, sequential);
        assert_eq!(parallel.horizon(), 8);
        assert_eq!(parallel.trial_count, 300);
    }

    #[test]
    fn test_same_master_seed_reproduces_run() {
        let a = MonteCarloEngine::new(base_policy(5), jitter(7)).unwrap().run(200).unwrap();
        let b = MonteCarloEngine::new(base_policy(5), jitter(7)).unwrap().run(200).unwrap();
        let c = MonteCarloEngine::new(base_policy(5), jitter(8)).unwrap().run(200).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_simulate_trial_is_reproducible() {
        let engine = MonteCarloEngine::new(base_policy(5), jitter(3)).unwrap();
        assert_eq!(engine.simulate_trial(12), engine.simulate_trial(12));
        assert_ne!(engine.simulate_trial(12), engine.simulate_trial(13));
    }

    #[test]
    fn test_bands_are_ordered() {
        let engine = MonteCarloEngine::new(base_policy(10), jitter(11)).unwrap();
        let reduced = engine.run(500).unwrap();

        for band in reduced.band_series(TrackedField::Gdp) {
            assert!(band.p10 <= band.p50 && band.p50 <= band.p90);
            assert_eq!(band.n, 500);
        }
        // First-year GDP is the fixed starting point
        let first = reduced.band(TrackedField::Gdp, 0).unwrap();
        assert_eq!(first.std_dev, 0.0);
        assert_eq!(first.p50, 30.0e12);
    }

    #[test]
    fn test_terminated_trials_counted_not_dropped() {
        let sampling = SamplingConfig {
            inflation: Some(ParameterSpec::new(
                ParameterDistribution::Fixed { value: 5.0 },
                ShockApplication::Absolute,
            )),
            ..SamplingConfig::default()
        };
        let engine = MonteCarloEngine::new(base_policy(6), sampling).unwrap();
        let reduced = engine.run(20).unwrap();

        assert_eq!(reduced.terminated_trials, 20);
        assert_eq!(reduced.terminated_share(), 1.0);
        assert_eq!(reduced.band(TrackedField::CumulativeDebt, 5).unwrap().n, 20);
    }

    #[test]
    fn test_cancelled_before_start() {
        let engine = MonteCarloEngine::new(base_policy(5), jitter(1)).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let options = MonteCarloOptions {
            cancellation: Some(token),
            ..MonteCarloOptions::sequential()
        };

        assert!(matches!(
            engine.run_with(50, &options),
            Err(EngineError::Cancelled { completed: 0 })
        ));
    }

    #[test]
    fn test_progress_reaches_total() {
        let engine = MonteCarloEngine::new(base_policy(3), jitter(5)).unwrap();
        let progress = MonteCarloProgress::new();
        let options = MonteCarloOptions {
            progress: Some(progress.clone()),
            ..MonteCarloOptions::default()
        };
        engine.run_with(64, &options).unwrap();

        assert_eq!(progress.completed(), 64);
        assert_eq!(progress.total(), 64);
        assert_eq!(progress.fraction(), 1.0);
    }

    /// Spread of the final-year GDP median across independent master seeds
    fn median_spread(trials: usize, seeds: u64) -> (f64, f64) {
        let medians: Vec<f64> = (0..seeds)
            .map(|seed| {
                let engine = MonteCarloEngine::new(base_policy(3), jitter(10_000 + seed)).unwrap();
                engine.run(trials).unwrap().final_band(TrackedField::Gdp).unwrap().p50
            })
            .collect();
        let n = medians.len() as f64;
        let mean = medians.iter().sum::<f64>() / n;
        let variance = medians.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / (n - 1.0);

        let reported = MonteCarloEngine::new(base_policy(3), jitter(10_000))
            .unwrap()
            .run(trials)
            .unwrap()
            .final_band(TrackedField::Gdp)
            .unwrap()
            .median_std_error;
        (variance.sqrt(), reported)
    }

    #[test]
    fn test_median_error_shrinks_with_root_trial_count() {
        let (spread_small, reported_small) = median_spread(100, 40);
        let (spread_large, _) = median_spread(10_000, 40);

        // 100x the trials should shrink the median's spread about 10x
        let ratio = spread_small / spread_large;
        assert!((5.0..=15.0).contains(&ratio), "ratio {ratio}");

        // The per-run standard error tracks the observed spread
        let fit = reported_small / spread_small;
        assert!((0.5..=2.0).contains(&fit), "fit {fit}");
    }

    #[test]
    fn test_unknown_shock_category_rejected() {
        let mut sampling = jitter(1);
        sampling
            .cost_shocks
            .insert("defense".to_string(), ParameterDistribution::Fixed { value: 1.0 });
        assert!(matches!(
            MonteCarloEngine::new(base_policy(5), sampling),
            Err(EngineError::Sampling(_))
        ));
    }
}
