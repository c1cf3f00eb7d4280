//! Fiscal metrics and policy comparison

mod aggregator;
mod comparison;

pub use aggregator::{DistributionMetrics, Metrics, MetricsAggregator};
pub use comparison::{ComparisonRow, PolicyComparison};
