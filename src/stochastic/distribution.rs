//! Parameter distributions for stochastic trials

use rand::Rng;
use rand_distr::{Distribution, Normal, Triangular};
use serde::{Deserialize, Serialize};

use crate::error::SamplingError;

/// Distribution a sampled parameter is drawn from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterDistribution {
    Fixed {
        value: f64,
    },
    Normal {
        mean: f64,
        std_dev: f64,
    },
    Triangular {
        min: f64,
        mode: f64,
        max: f64,
    },
    /// Resample observed values with replacement.
    /// A `block_size` above 1 draws contiguous, wrapping runs to keep
    /// year-to-year autocorrelation.
    Bootstrap {
        history: Vec<f64>,
        #[serde(default)]
        block_size: Option<usize>,
    },
}

impl ParameterDistribution {
    /// Reject parameters no draw could be made from
    pub fn check(&self, parameter: &str) -> Result<(), SamplingError> {
        let invalid = |reason: &'static str| SamplingError::InvalidDistribution {
            parameter: parameter.to_string(),
            reason,
        };

        match self {
            ParameterDistribution::Fixed { value } => {
                if !value.is_finite() {
                    return Err(invalid("fixed value must be finite"));
                }
            }
            ParameterDistribution::Normal { mean, std_dev } => {
                if !mean.is_finite() {
                    return Err(invalid("mean must be finite"));
                }
                if !std_dev.is_finite() || *std_dev < 0.0 {
                    return Err(invalid("std_dev must be non-negative and finite"));
                }
            }
            ParameterDistribution::Triangular { min, mode, max } => {
                if !(min.is_finite() && mode.is_finite() && max.is_finite()) {
                    return Err(invalid("triangular bounds must be finite"));
                }
                if !(min <= mode && mode <= max) {
                    return Err(invalid("triangular requires min <= mode <= max"));
                }
            }
            ParameterDistribution::Bootstrap {
                history,
                block_size,
            } => {
                if history.is_empty() {
                    return Err(invalid("bootstrap history is empty"));
                }
                if history.iter().any(|v| !v.is_finite()) {
                    return Err(invalid("bootstrap history must be finite"));
                }
                if *block_size == Some(0) {
                    return Err(invalid("block size must be at least 1"));
                }
            }
        }
        Ok(())
    }

    /// Draw one value. Assumes `check` passed; degenerate parameters
    /// fall back to the distribution's centre.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            ParameterDistribution::Fixed { value } => *value,
            ParameterDistribution::Normal { mean, std_dev } => match Normal::new(*mean, *std_dev) {
                Ok(dist) => dist.sample(rng),
                Err(_) => *mean,
            },
            ParameterDistribution::Triangular { min, mode, max } => {
                if min == max {
                    return *mode;
                }
                match Triangular::new(*min, *max, *mode) {
                    Ok(dist) => dist.sample(rng),
                    Err(_) => *mode,
                }
            }
            ParameterDistribution::Bootstrap { history, .. } => {
                if history.is_empty() {
                    return 0.0;
                }
                history[rng.random_range(0..history.len())]
            }
        }
    }

    /// Draw `n` values for consecutive years
    pub fn sample_sequence<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<f64> {
        match self {
            ParameterDistribution::Bootstrap {
                history,
                block_size: Some(block),
            } if *block > 1 && !history.is_empty() => block_bootstrap(history, rng, n, *block),
            _ => (0..n).map(|_| self.sample(rng)).collect(),
        }
    }
}

fn block_bootstrap<R: Rng + ?Sized>(history: &[f64], rng: &mut R, n: usize, block: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(n);
    while result.len() < n {
        let start = rng.random_range(0..history.len());
        for i in 0..block {
            if result.len() >= n {
                break;
            }
            result.push(history[(start + i) % history.len()]);
        }
    }
    result
}

/// How a draw combines with the base parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShockApplication {
    /// Draw replaces the base value
    #[default]
    Absolute,
    /// Draw is added to the base value
    Additive,
    /// Base value is scaled by the draw
    Multiplicative,
}

impl ShockApplication {
    /// Combine a configured base value with a draw
    pub fn apply(&self, base: f64, draw: f64) -> f64 {
        match self {
            ShockApplication::Absolute => draw,
            ShockApplication::Additive => base + draw,
            ShockApplication::Multiplicative => base * draw,
        }
    }
}

/// A sampled rate: where draws come from and how they apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub distribution: ParameterDistribution,
    #[serde(default)]
    pub apply: ShockApplication,
}

impl ParameterSpec {
    pub fn new(distribution: ParameterDistribution, apply: ShockApplication) -> Self {
        Self {
            distribution,
            apply,
        }
    }

    /// Zero-mean normal jitter added to the base rate
    pub fn jitter(std_dev: f64) -> Self {
        Self::new(
            ParameterDistribution::Normal { mean: 0.0, std_dev },
            ShockApplication::Additive,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_check_rejects_bad_parameters() {
        let cases = [
            ParameterDistribution::Normal { mean: 0.0, std_dev: -0.1 },
            ParameterDistribution::Triangular { min: 0.03, mode: 0.01, max: 0.05 },
            ParameterDistribution::Bootstrap { history: vec![], block_size: None },
            ParameterDistribution::Bootstrap { history: vec![0.01], block_size: Some(0) },
            ParameterDistribution::Fixed { value: f64::NAN },
        ];
        for dist in cases {
            assert!(
                matches!(dist.check("growth"), Err(SamplingError::InvalidDistribution { .. })),
                "{dist:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_zero_spread_draws_are_exact() {
        let mut rng = StdRng::seed_from_u64(1);
        let normal = ParameterDistribution::Normal { mean: 0.025, std_dev: 0.0 };
        let triangular = ParameterDistribution::Triangular { min: 0.02, mode: 0.02, max: 0.02 };

        assert_eq!(normal.sample(&mut rng), 0.025);
        assert_eq!(triangular.sample(&mut rng), 0.02);
    }

    #[test]
    fn test_triangular_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        let dist = ParameterDistribution::Triangular { min: -0.01, mode: 0.02, max: 0.04 };
        for _ in 0..1_000 {
            let v = dist.sample(&mut rng);
            assert!((-0.01..=0.04).contains(&v));
        }
    }

    #[test]
    fn test_normal_sample_mean() {
        let mut rng = StdRng::seed_from_u64(42);
        let dist = ParameterDistribution::Normal { mean: 0.02, std_dev: 0.01 };
        let n = 20_000;
        let mean = dist.sample_sequence(&mut rng, n).iter().sum::<f64>() / n as f64;
        assert_relative_eq!(mean, 0.02, epsilon = 0.001);
    }

    #[test]
    fn test_bootstrap_draws_from_history() {
        let history = vec![0.01, 0.02, 0.03];
        let dist = ParameterDistribution::Bootstrap { history: history.clone(), block_size: None };
        let mut rng = StdRng::seed_from_u64(3);
        for v in dist.sample_sequence(&mut rng, 50) {
            assert!(history.contains(&v));
        }
    }

    #[test]
    fn test_block_bootstrap_keeps_runs_contiguous() {
        let history = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let dist = ParameterDistribution::Bootstrap { history, block_size: Some(5) };
        let mut rng = StdRng::seed_from_u64(11);
        let seq = dist.sample_sequence(&mut rng, 5);

        for pair in seq.windows(2) {
            let step = pair[1] - pair[0];
            assert!(step == 1.0 || step == -4.0, "not a circular run: {seq:?}");
        }
    }

    #[test]
    fn test_shock_application() {
        assert_eq!(ShockApplication::Absolute.apply(0.02, 0.05), 0.05);
        assert_relative_eq!(ShockApplication::Additive.apply(0.02, 0.01), 0.03);
        assert_relative_eq!(ShockApplication::Multiplicative.apply(0.02, 1.5), 0.03);
    }
}
