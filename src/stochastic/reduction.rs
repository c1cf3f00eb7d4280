//! Reduction of Monte Carlo trials into per-year percentile bands

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::projection::{TrackedField, Trajectory};

/// Asymptotic ratio of the median's standard error to the mean's, sqrt(pi/2)
const MEDIAN_SE_FACTOR: f64 = 1.253_314_137_315_500_3;

/// Two-sided 95% normal quantile
const Z_95: f64 = 1.96;

/// Percentile bands and moments of one field in one year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandStats {
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Standard error of `p50`, shrinking with 1/sqrt(n)
    pub median_std_error: f64,
    pub n: usize,
}

impl BandStats {
    /// Sorts `values` in place. The result does not depend on input order.
    pub fn from_values(values: &mut [f64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self {
                p10: 0.0,
                p50: 0.0,
                p90: 0.0,
                mean: 0.0,
                std_dev: 0.0,
                median_std_error: 0.0,
                n: 0,
            };
        }

        values.sort_by(f64::total_cmp);
        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();

        Self {
            p10: percentile(values, 0.10),
            p50: percentile(values, 0.50),
            p90: percentile(values, 0.90),
            mean,
            std_dev,
            median_std_error: MEDIAN_SE_FACTOR * std_dev / (n as f64).sqrt(),
            n,
        }
    }

    /// Trials needed for a 95% interval on the median no wider than
    /// `± target_half_width`
    pub fn required_trials(&self, target_half_width: f64) -> Option<usize> {
        if target_half_width.is_nan() || target_half_width <= 0.0 {
            return None;
        }
        if self.std_dev == 0.0 {
            return Some(1);
        }
        let n = (Z_95 * MEDIAN_SE_FACTOR * self.std_dev / target_half_width).powi(2);
        Some(n.ceil() as usize)
    }
}

/// Linear-interpolated percentile of sorted data, `p` in [0, 1]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// What one trial contributes to the reduction.
///
/// Keeps only the tracked fields so 100k trials stay cheap to hold.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrialSample {
    /// Year-major, `TrackedField::ALL` order within a year
    values: Vec<f64>,
    degraded: bool,
    terminated: bool,
    solvency_year: Option<i32>,
}

impl TrialSample {
    pub(crate) fn from_trajectory(trajectory: &Trajectory) -> Self {
        let values = trajectory
            .rows
            .iter()
            .flat_map(|row| TrackedField::ALL.iter().map(move |field| field.value(row)))
            .collect();
        let solvency_year = trajectory
            .rows
            .iter()
            .find(|row| row.cumulative_debt <= 0.0)
            .map(|row| row.calendar_year);

        Self {
            values,
            degraded: trajectory.degraded,
            terminated: trajectory.termination.is_some(),
            solvency_year,
        }
    }

    fn value(&self, year: usize, field_index: usize) -> Option<f64> {
        self.values.get(year * TrackedField::ALL.len() + field_index).copied()
    }
}

/// Bands for every tracked field in one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearBands {
    pub year_index: u32,
    pub calendar_year: i32,
    pub fields: BTreeMap<TrackedField, BandStats>,
}

/// Per-year distribution across all trials of a Monte Carlo run.
///
/// Degraded and early-terminated trials are included; their padded years
/// carry the last valid values forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedDistribution {
    pub policy_name: String,
    pub trial_count: usize,
    pub master_seed: u64,
    pub years: Vec<YearBands>,
    pub degraded_trials: usize,
    pub terminated_trials: usize,
    /// Trials whose debt reached zero within the horizon
    pub solvent_trials: usize,
    /// Calendar solvency year across solvent trials only
    pub solvency_year: Option<BandStats>,
}

impl ReducedDistribution {
    pub(crate) fn from_samples(
        policy_name: &str,
        start_year: i32,
        horizon: u32,
        master_seed: u64,
        samples: &[TrialSample],
    ) -> Self {
        let mut buffer = Vec::with_capacity(samples.len());
        let years = (0..horizon)
            .map(|year_index| {
                let fields = TrackedField::ALL
                    .iter()
                    .enumerate()
                    .map(|(f, field)| {
                        buffer.clear();
                        buffer.extend(samples.iter().filter_map(|s| s.value(year_index as usize, f)));
                        (*field, BandStats::from_values(&mut buffer))
                    })
                    .collect();
                YearBands {
                    year_index,
                    calendar_year: start_year + year_index as i32,
                    fields,
                }
            })
            .collect();

        let mut solvency: Vec<f64> = samples
            .iter()
            .filter_map(|s| s.solvency_year.map(f64::from))
            .collect();

        Self {
            policy_name: policy_name.to_string(),
            trial_count: samples.len(),
            master_seed,
            years,
            degraded_trials: samples.iter().filter(|s| s.degraded).count(),
            terminated_trials: samples.iter().filter(|s| s.terminated).count(),
            solvent_trials: solvency.len(),
            solvency_year: (!solvency.is_empty()).then(|| BandStats::from_values(&mut solvency)),
        }
    }

    /// Number of reduced years
    pub fn horizon(&self) -> usize {
        self.years.len()
    }

    /// Bands of one field in one year
    pub fn band(&self, field: TrackedField, year_index: usize) -> Option<&BandStats> {
        self.years.get(year_index).and_then(|y| y.fields.get(&field))
    }

    /// Bands of one field for every year
    pub fn band_series(&self, field: TrackedField) -> Vec<BandStats> {
        self.years
            .iter()
            .filter_map(|y| y.fields.get(&field).copied())
            .collect()
    }

    /// Bands of one field in the last year
    pub fn final_band(&self, field: TrackedField) -> Option<&BandStats> {
        self.years.last().and_then(|y| y.fields.get(&field))
    }

    /// Fraction of trials with any substituted value
    pub fn degraded_share(&self) -> f64 {
        share(self.degraded_trials, self.trial_count)
    }

    /// Fraction of trials stopped before the horizon
    pub fn terminated_share(&self) -> f64 {
        share(self.terminated_trials, self.trial_count)
    }

    /// Fraction of trials whose debt reached zero
    pub fn solvency_share(&self) -> f64 {
        share(self.solvent_trials, self.trial_count)
    }

    /// Trials needed to pin the median of `field` in `year_index` to
    /// `± target_half_width` at 95% confidence
    pub fn required_trials(
        &self,
        field: TrackedField,
        year_index: usize,
        target_half_width: f64,
    ) -> Option<usize> {
        self.band(field, year_index)
            .and_then(|band| band.required_trials(target_half_width))
    }
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}
