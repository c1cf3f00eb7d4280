//! Stochastic sampling and Monte Carlo reduction

mod distribution;
mod monte_carlo;
mod reduction;
mod sampler;

pub use distribution::{ParameterDistribution, ParameterSpec, ShockApplication};
pub use monte_carlo::{CancellationToken, MonteCarloEngine, MonteCarloOptions, MonteCarloProgress};
pub use reduction::{percentile, BandStats, ReducedDistribution, YearBands};
pub use sampler::{trial_seed, RedrawMode, SamplingConfig, StochasticSampler, DEFAULT_TRIAL_COUNT};
