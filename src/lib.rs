//! Fiscal Projection - multi-year fiscal projection engine with safeguards
//!
//! This library provides:
//! - Policy configurations: revenue streams, spending categories, funding allocations
//! - Single-year resolution of revenue, spending, and surplus
//! - Year-by-year projection with circuit breaker, surplus redirect, and
//!   early-termination safeguards
//! - Seeded Monte Carlo sampling reduced to per-year percentile bands
//! - Fiscal metrics and paired policy comparison

pub mod error;
pub mod policy;
pub mod economics;
pub mod projection;
pub mod stochastic;
pub mod metrics;
pub mod scenario;

// Re-export commonly used types
pub use error::{ConfigError, EngineError, SamplingError};
pub use policy::{PolicyConfiguration, RevenueStream, SpendingCategory, GeneralParameters};
pub use economics::AnnualResolver;
pub use projection::{DeterministicSimulator, InitialState, Trajectory, YearRow, YearStateStepper};
pub use stochastic::{MonteCarloEngine, ReducedDistribution, SamplingConfig, StochasticSampler};
pub use metrics::{Metrics, MetricsAggregator, PolicyComparison};
pub use scenario::ScenarioRunner;
