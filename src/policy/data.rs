//! Policy data structures: revenue streams, spending categories, and
//! general economic parameters

use serde::{Deserialize, Serialize};

use super::curve::{ReductionCurve, TaxRelief};

/// Destination name used by presets for revenue not earmarked to a category
pub const GENERAL_FUND: &str = "general fund";

/// How an annual amount is derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AmountKind {
    /// Fixed amount in base-year currency, grown by the inflation factor
    Fixed { amount: f64 },
    /// Fraction of the current year's GDP
    PercentOfGdp { rate: f64 },
    /// Fraction of another revenue stream's resolved total
    PercentOfStream { stream: String, rate: f64 },
}

impl AmountKind {
    /// Name of the revenue stream this amount is based on, if any
    pub fn base_stream(&self) -> Option<&str> {
        match self {
            AmountKind::PercentOfStream { stream, .. } => Some(stream.as_str()),
            _ => None,
        }
    }
}

/// A named share, used both for stream destinations and category funding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub target: String,
    pub share: f64,
}

impl Allocation {
    pub fn new(target: impl Into<String>, share: f64) -> Self {
        Self {
            target: target.into(),
            share,
        }
    }
}

/// A named revenue source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueStream {
    pub name: String,

    pub amount: AmountKind,

    /// Fixed amounts also grow with the real scale factor
    #[serde(default)]
    pub gdp_indexed: bool,

    /// Where the undrawn revenue lands; must sum to exactly 100%
    pub destinations: Vec<Allocation>,

    /// Scheduled rate reductions, contingent on fiscal headroom
    #[serde(default)]
    pub relief_schedule: Vec<TaxRelief>,
}

impl RevenueStream {
    pub fn new(name: impl Into<String>, amount: AmountKind) -> Self {
        Self {
            name: name.into(),
            amount,
            gdp_indexed: false,
            destinations: Vec::new(),
            relief_schedule: Vec::new(),
        }
    }

    pub fn percent_of_gdp(name: impl Into<String>, rate: f64) -> Self {
        Self::new(name, AmountKind::PercentOfGdp { rate })
    }

    pub fn fixed(name: impl Into<String>, amount: f64) -> Self {
        Self::new(name, AmountKind::Fixed { amount })
    }

    pub fn with_destination(mut self, target: impl Into<String>, share: f64) -> Self {
        self.destinations.push(Allocation::new(target, share));
        self
    }

    pub fn gdp_indexed(mut self) -> Self {
        self.gdp_indexed = true;
        self
    }

    pub fn with_relief(mut self, start_year_index: u32, cut: f64) -> Self {
        self.relief_schedule.push(TaxRelief { start_year_index, cut });
        self
    }

    /// Total scheduled relief in force at a year index, capped at 100%
    pub fn scheduled_relief(&self, year_index: u32) -> f64 {
        self.relief_schedule
            .iter()
            .filter(|r| r.start_year_index <= year_index)
            .map(|r| r.cut)
            .sum::<f64>()
            .min(1.0)
    }
}

/// A named spending category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingCategory {
    pub name: String,

    pub amount: AmountKind,

    #[serde(default)]
    pub gdp_indexed: bool,

    /// Revenue streams that pay for this category, as shares of its cost
    #[serde(default)]
    pub funding_sources: Vec<Allocation>,

    /// Phased efficiency gains
    #[serde(default)]
    pub reduction: Option<ReductionCurve>,

    /// Cost shock applied by the stochastic sampler (1.0 = none)
    #[serde(default = "default_multiplier")]
    pub cost_multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

impl SpendingCategory {
    pub fn new(name: impl Into<String>, amount: AmountKind) -> Self {
        Self {
            name: name.into(),
            amount,
            gdp_indexed: false,
            funding_sources: Vec::new(),
            reduction: None,
            cost_multiplier: 1.0,
        }
    }

    pub fn percent_of_gdp(name: impl Into<String>, rate: f64) -> Self {
        Self::new(name, AmountKind::PercentOfGdp { rate })
    }

    pub fn fixed(name: impl Into<String>, amount: f64) -> Self {
        Self::new(name, AmountKind::Fixed { amount })
    }

    pub fn funded_by(mut self, stream: impl Into<String>, share: f64) -> Self {
        self.funding_sources.push(Allocation::new(stream, share));
        self
    }

    pub fn with_reduction(mut self, curve: ReductionCurve) -> Self {
        self.reduction = Some(curve);
        self
    }

    pub fn gdp_indexed(mut self) -> Self {
        self.gdp_indexed = true;
        self
    }

    /// Fraction of cost removed by the reduction curve at a year index
    pub fn reduction_at(&self, year_index: u32) -> f64 {
        self.reduction
            .as_ref()
            .map_or(0.0, |curve| curve.value_at(year_index))
    }
}

/// What happens to the surplus redirect while the circuit breaker is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerRedirectPolicy {
    /// Split the excess as usual
    #[default]
    Apply,
    /// No redirect; the whole surplus retires debt
    Suspend,
    /// The whole excess goes to debt paydown
    DebtPaydownOnly,
}

/// Split of excess surplus once revenue exceeds `trigger_ratio` × spending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurplusRedirectRule {
    pub trigger_ratio: f64,
    pub reserve: f64,
    pub debt_paydown: f64,
    pub reinvestment: f64,
    pub rebate: f64,
    #[serde(default)]
    pub during_breaker: BreakerRedirectPolicy,
}

impl Default for SurplusRedirectRule {
    fn default() -> Self {
        Self {
            trigger_ratio: 1.05,
            reserve: 0.10,
            debt_paydown: 0.50,
            reinvestment: 0.25,
            rebate: 0.15,
            during_breaker: BreakerRedirectPolicy::Apply,
        }
    }
}

impl SurplusRedirectRule {
    /// Sum of the four redirect shares
    pub fn share_total(&self) -> f64 {
        self.reserve + self.debt_paydown + self.reinvestment + self.rebate
    }
}

/// Per-scenario safeguard thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeguardThresholds {
    /// Program spending / GDP above which the circuit breaker trips
    pub spending_ceiling: Option<f64>,

    /// Categories counted against the ceiling (empty = all categories)
    pub ceiling_categories: Vec<String>,

    /// Breaker stays active until the ratio falls below ceiling - margin
    pub breaker_release_margin: f64,

    /// Debt / GDP multiple that terminates the run
    pub debt_explosion_multiple: f64,

    /// Annual inflation above which a year counts as runaway
    pub hyperinflation_rate: f64,

    /// Consecutive runaway years that terminate the run
    pub hyperinflation_years: u32,

    /// Consecutive negative-growth years that enter recession mode
    pub recession_trigger_years: u32,

    /// Additional multiplicative drag on revenue during recession mode
    pub recession_revenue_drag: f64,

    pub surplus_redirect: Option<SurplusRedirectRule>,
}

impl Default for SafeguardThresholds {
    fn default() -> Self {
        Self {
            spending_ceiling: None,
            ceiling_categories: Vec::new(),
            breaker_release_margin: 0.0,
            debt_explosion_multiple: 10.0,
            hyperinflation_rate: 0.50,
            hyperinflation_years: 2,
            recession_trigger_years: 2,
            recession_revenue_drag: 0.02,
            surplus_redirect: None,
        }
    }
}

/// Economy-wide parameters for a projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralParameters {
    pub initial_gdp: f64,
    pub initial_debt: f64,
    pub gdp_growth_rate: f64,
    pub inflation_rate: f64,
    pub interest_rate: f64,
    pub horizon_years: u32,

    #[serde(default = "default_start_year")]
    pub start_year: i32,

    /// Year-specific growth rates; index t overrides `gdp_growth_rate`
    #[serde(default)]
    pub growth_path: Option<Vec<f64>>,

    /// Year-specific inflation rates; index t overrides `inflation_rate`
    #[serde(default)]
    pub inflation_path: Option<Vec<f64>>,

    #[serde(default)]
    pub safeguards: SafeguardThresholds,
}

fn default_start_year() -> i32 {
    2025
}

impl GeneralParameters {
    /// Zero rates, default safeguards, starting in 2025
    pub fn new(initial_gdp: f64, initial_debt: f64, horizon_years: u32) -> Self {
        Self {
            initial_gdp,
            initial_debt,
            gdp_growth_rate: 0.0,
            inflation_rate: 0.0,
            interest_rate: 0.0,
            horizon_years,
            start_year: default_start_year(),
            growth_path: None,
            inflation_path: None,
            safeguards: SafeguardThresholds::default(),
        }
    }

    /// Real growth rate applied in a given year
    pub fn growth_rate_at(&self, year_index: u32) -> f64 {
        rate_at(self.growth_path.as_deref(), year_index, self.gdp_growth_rate)
    }

    /// Inflation rate applied in a given year
    pub fn inflation_rate_at(&self, year_index: u32) -> f64 {
        rate_at(self.inflation_path.as_deref(), year_index, self.inflation_rate)
    }
}

fn rate_at(path: Option<&[f64]>, year_index: u32, base: f64) -> f64 {
    path.and_then(|p| p.get(year_index as usize).copied())
        .unwrap_or(base)
}

/// Immutable description of one fiscal policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfiguration {
    pub name: String,
    pub revenue_streams: Vec<RevenueStream>,
    pub spending_categories: Vec<SpendingCategory>,
    pub general_parameters: GeneralParameters,
}

impl PolicyConfiguration {
    /// Policy with no streams or categories yet
    pub fn new(name: impl Into<String>, general_parameters: GeneralParameters) -> Self {
        Self {
            name: name.into(),
            revenue_streams: Vec::new(),
            spending_categories: Vec::new(),
            general_parameters,
        }
    }

    pub fn with_stream(mut self, stream: RevenueStream) -> Self {
        self.revenue_streams.push(stream);
        self
    }

    pub fn with_category(mut self, category: SpendingCategory) -> Self {
        self.spending_categories.push(category);
        self
    }

    /// Position of the named revenue stream
    pub fn stream_index(&self, name: &str) -> Option<usize> {
        self.revenue_streams.iter().position(|s| s.name == name)
    }

    /// Position of the named spending category
    pub fn category_index(&self, name: &str) -> Option<usize> {
        self.spending_categories.iter().position(|c| c.name == name)
    }

    /// Safeguard thresholds from the general parameters
    pub fn safeguards(&self) -> &SafeguardThresholds {
        &self.general_parameters.safeguards
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_path_overrides_base() {
        let mut params = GeneralParameters::new(100.0, 0.0, 5);
        params.gdp_growth_rate = 0.02;
        params.growth_path = Some(vec![-0.01, -0.02]);

        assert_eq!(params.growth_rate_at(0), -0.01);
        assert_eq!(params.growth_rate_at(1), -0.02);
        assert_eq!(params.growth_rate_at(2), 0.02);
    }

    #[test]
    fn test_scheduled_relief_accumulates() {
        let stream = RevenueStream::percent_of_gdp("income tax", 0.1)
            .with_relief(2, 0.05)
            .with_relief(4, 0.05);

        assert_eq!(stream.scheduled_relief(0), 0.0);
        assert_eq!(stream.scheduled_relief(2), 0.05);
        assert!((stream.scheduled_relief(10) - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "name": "minimal",
            "revenue_streams": [
                {"name": "tax", "amount": {"kind": "percent_of_gdp", "rate": 0.2},
                 "destinations": [{"target": "general fund", "share": 1.0}]}
            ],
            "spending_categories": [
                {"name": "services", "amount": {"kind": "fixed", "amount": 5.0}}
            ],
            "general_parameters": {
                "initial_gdp": 30.0, "initial_debt": 10.0, "gdp_growth_rate": 0.025,
                "inflation_rate": 0.025, "interest_rate": 0.0, "horizon_years": 5
            }
        }"#;

        let policy: PolicyConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(policy.spending_categories[0].cost_multiplier, 1.0);
        assert_eq!(policy.safeguards().debt_explosion_multiple, 10.0);
        assert!(policy.safeguards().surplus_redirect.is_none());
        assert_eq!(policy.general_parameters.start_year, 2025);
    }
}
