//! Year-indexed schedules: cost reduction curves and scheduled tax relief

use serde::{Deserialize, Serialize};

/// One milestone on a reduction curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub year_index: u32,
    /// Fraction of the category's cost removed at this milestone
    pub reduction: f64,
}

/// Phase-in reduction target, linearly interpolated between milestones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionCurve {
    /// Milestones in strictly increasing year order
    pub points: Vec<CurvePoint>,
}

impl ReductionCurve {
    /// Curve through `points`; validation requires increasing year indices
    pub fn new(points: Vec<CurvePoint>) -> Self {
        Self { points }
    }

    /// Straight line from zero reduction at year 0 to `target` at `years`
    pub fn linear(target: f64, years: u32) -> Self {
        Self::new(vec![
            CurvePoint { year_index: 0, reduction: 0.0 },
            CurvePoint { year_index: years, reduction: target },
        ])
    }

    /// Overhead share gliding from `from` to `to` over `years`.
    /// e.g. admin overhead 16% -> 3% over 9 years removes up to 13% of cost.
    pub fn overhead_glide(from: f64, to: f64, years: u32) -> Self {
        Self::linear(from - to, years)
    }

    /// Reduction at a year index. Flat before the first and after the last point.
    pub fn value_at(&self, year_index: u32) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return 0.0,
        };
        if year_index <= first.year_index {
            return first.reduction;
        }
        if year_index >= last.year_index {
            return last.reduction;
        }

        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if year_index >= a.year_index && year_index <= b.year_index {
                let span = (b.year_index - a.year_index) as f64;
                let t = (year_index - a.year_index) as f64 / span;
                return a.reduction + t * (b.reduction - a.reduction);
            }
        }
        last.reduction
    }

    /// Check ordering and bounds. Returns the reason on failure.
    pub fn check(&self) -> Result<(), &'static str> {
        if self.points.is_empty() {
            return Err("curve has no points");
        }
        if self
            .points
            .windows(2)
            .any(|w| w[1].year_index <= w[0].year_index)
        {
            return Err("milestone years must be strictly increasing");
        }
        if self
            .points
            .iter()
            .any(|p| !p.reduction.is_finite() || !(0.0..1.0).contains(&p.reduction))
        {
            return Err("reductions must lie in [0, 1)");
        }
        Ok(())
    }
}

/// Scheduled cut to a revenue stream, starting at a year index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxRelief {
    pub start_year_index: u32,
    /// Fraction of the stream removed from this year on
    pub cut: f64,
}
