//! Single-year revenue and spending resolution
//!
//! Pure: the same inputs always give the same `Resolution`. No RNG and no
//! history live here.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::policy::{AmountKind, PolicyConfiguration, RevenueStream, SpendingCategory};

/// Economic state for the year being resolved
#[derive(Debug, Clone, Copy)]
pub struct YearInputs<'a> {
    pub year_index: u32,
    pub gdp: f64,
    pub scale_factor: f64,
    pub inflation_factor: f64,
    /// Interest on prior debt, charged to the general fund
    pub interest_expense: f64,
    /// Relief in force per revenue stream, aligned with the policy's stream order
    pub relief: &'a [f64],
    /// Recession drag on non-derived revenue streams
    pub revenue_drag: f64,
}

/// Why a resolution was replaced by zeros
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArithmeticFallback {
    /// GDP was zero, negative, or not finite
    NonPositiveGdp(f64),
    /// A computed amount overflowed or became NaN
    NonFinite { item: String },
}

/// One year's ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Revenue by stream
    pub totals: BTreeMap<String, f64>,
    /// Cost by spending category, after reductions
    pub category_costs: BTreeMap<String, f64>,
    /// Revenue that reached each category through sources and destinations
    pub category_funding: BTreeMap<String, f64>,
    /// Funding minus cost per category
    pub category_surplus: BTreeMap<String, f64>,
    /// Revenue not earmarked to any category
    pub general_revenue: f64,
    /// General revenue minus interest
    pub general_fund_surplus: f64,
    /// Category shortfalls covered implicitly by general revenue
    pub general_revenue_contribution: f64,
    pub total_revenue: f64,
    pub program_spending: f64,
    pub interest_expense: f64,
    pub total_spending: f64,
    pub surplus: f64,
    pub fallback: Option<ArithmeticFallback>,
}

impl Resolution {
    /// Sum of category surpluses plus the general fund
    pub fn aggregate_surplus(&self) -> f64 {
        self.category_surplus.values().sum::<f64>() + self.general_fund_surplus
    }

    /// Program spending on the named categories; all categories when empty
    pub fn watched_spending(&self, categories: &[String]) -> f64 {
        if categories.is_empty() {
            return self.program_spending;
        }
        categories
            .iter()
            .filter_map(|name| self.category_costs.get(name))
            .sum()
    }

    fn zeroed(resolver: &AnnualResolver<'_>, fallback: ArithmeticFallback) -> Self {
        let zeros = |names: Vec<&str>| -> BTreeMap<String, f64> {
            names.into_iter().map(|n| (n.to_string(), 0.0)).collect()
        };
        let streams: Vec<&str> = resolver.streams.iter().map(|s| s.name.as_str()).collect();
        let categories: Vec<&str> = resolver.categories.iter().map(|c| c.name.as_str()).collect();

        Self {
            totals: zeros(streams),
            category_costs: zeros(categories.clone()),
            category_funding: zeros(categories.clone()),
            category_surplus: zeros(categories),
            general_revenue: 0.0,
            general_fund_surplus: 0.0,
            general_revenue_contribution: 0.0,
            total_revenue: 0.0,
            program_spending: 0.0,
            interest_expense: 0.0,
            total_spending: 0.0,
            surplus: 0.0,
            fallback: Some(fallback),
        }
    }
}

/// Resolves revenue, categorized spending, and surplus for one year
#[derive(Debug, Clone)]
pub struct AnnualResolver<'a> {
    streams: &'a [RevenueStream],
    categories: &'a [SpendingCategory],
    stream_lookup: HashMap<&'a str, usize>,
    category_lookup: HashMap<&'a str, usize>,
}

impl<'a> AnnualResolver<'a> {
    /// Resolver over a policy's streams and categories
    pub fn new(policy: &'a PolicyConfiguration) -> Self {
        Self::from_parts(&policy.revenue_streams, &policy.spending_categories)
    }

    /// Resolver over explicit streams and categories, e.g. a sampled copy
    pub fn from_parts(streams: &'a [RevenueStream], categories: &'a [SpendingCategory]) -> Self {
        Self {
            streams,
            categories,
            stream_lookup: streams
                .iter()
                .enumerate()
                .map(|(i, s)| (s.name.as_str(), i))
                .collect(),
            category_lookup: categories
                .iter()
                .enumerate()
                .map(|(i, c)| (c.name.as_str(), i))
                .collect(),
        }
    }

    /// Resolve one year. Never panics; pathological inputs produce a zeroed
    /// resolution with `fallback` set.
    pub fn resolve(&self, inputs: &YearInputs<'_>) -> Resolution {
        if !inputs.gdp.is_finite() || inputs.gdp <= 0.0 {
            return Resolution::zeroed(self, ArithmeticFallback::NonPositiveGdp(inputs.gdp));
        }

        // Revenue, in list order so derived streams see their base
        let mut revenue = vec![0.0; self.streams.len()];
        for (i, stream) in self.streams.iter().enumerate() {
            let base = self.base_amount(&stream.amount, stream.gdp_indexed, inputs, &revenue);
            let relief = inputs.relief.get(i).copied().unwrap_or(0.0);
            let drag = match stream.amount {
                AmountKind::PercentOfStream { .. } => 0.0,
                _ => inputs.revenue_drag,
            };
            revenue[i] = base * (1.0 - relief) * (1.0 - drag);
        }

        let costs: Vec<f64> = self
            .categories
            .iter()
            .map(|category| {
                let base = self.base_amount(&category.amount, category.gdp_indexed, inputs, &revenue);
                base * category.cost_multiplier * (1.0 - category.reduction_at(inputs.year_index))
            })
            .collect();

        // Funding waterfall: declared sources first, then destination split
        let mut remaining = revenue.clone();
        let mut funding = vec![0.0; self.categories.len()];
        for (c, category) in self.categories.iter().enumerate() {
            for source in &category.funding_sources {
                if let Some(&s) = self.stream_lookup.get(source.target.as_str()) {
                    let draw = (source.share * costs[c]).min(remaining[s]).max(0.0);
                    remaining[s] -= draw;
                    funding[c] += draw;
                }
            }
        }

        let mut general_revenue = 0.0;
        for (s, stream) in self.streams.iter().enumerate() {
            for destination in &stream.destinations {
                let amount = remaining[s] * destination.share;
                match self.category_lookup.get(destination.target.as_str()) {
                    Some(&c) => funding[c] += amount,
                    None => general_revenue += amount,
                }
            }
        }

        let total_revenue: f64 = revenue.iter().sum();
        let program_spending: f64 = costs.iter().sum();
        let total_spending = program_spending + inputs.interest_expense;
        let general_revenue_contribution: f64 = costs
            .iter()
            .zip(&funding)
            .map(|(cost, funded)| (cost - funded).max(0.0))
            .sum();

        if let Some(item) = self.first_non_finite(&revenue, &costs, total_spending) {
            return Resolution::zeroed(self, ArithmeticFallback::NonFinite { item });
        }

        Resolution {
            totals: self
                .streams
                .iter()
                .zip(&revenue)
                .map(|(s, v)| (s.name.clone(), *v))
                .collect(),
            category_costs: self
                .categories
                .iter()
                .zip(&costs)
                .map(|(c, v)| (c.name.clone(), *v))
                .collect(),
            category_funding: self
                .categories
                .iter()
                .zip(&funding)
                .map(|(c, v)| (c.name.clone(), *v))
                .collect(),
            category_surplus: self
                .categories
                .iter()
                .enumerate()
                .map(|(i, c)| (c.name.clone(), funding[i] - costs[i]))
                .collect(),
            general_revenue,
            general_fund_surplus: general_revenue - inputs.interest_expense,
            general_revenue_contribution,
            total_revenue,
            program_spending,
            interest_expense: inputs.interest_expense,
            total_spending,
            surplus: total_revenue - total_spending,
            fallback: None,
        }
    }

    fn base_amount(
        &self,
        amount: &AmountKind,
        gdp_indexed: bool,
        inputs: &YearInputs<'_>,
        revenue: &[f64],
    ) -> f64 {
        match amount {
            AmountKind::Fixed { amount } => {
                let real = if gdp_indexed { inputs.scale_factor } else { 1.0 };
                amount * inputs.inflation_factor * real
            }
            AmountKind::PercentOfGdp { rate } => rate * inputs.gdp,
            AmountKind::PercentOfStream { stream, rate } => self
                .stream_lookup
                .get(stream.as_str())
                .and_then(|&i| revenue.get(i))
                .map_or(0.0, |base| rate * base),
        }
    }

    fn first_non_finite(&self, revenue: &[f64], costs: &[f64], total_spending: f64) -> Option<String> {
        if let Some(i) = revenue.iter().position(|v| !v.is_finite()) {
            return Some(self.streams[i].name.clone());
        }
        if let Some(i) = costs.iter().position(|v| !v.is_finite()) {
            return Some(self.categories[i].name.clone());
        }
        if !total_spending.is_finite() {
            return Some("interest".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{GeneralParameters, ReductionCurve, GENERAL_FUND};
    use approx::assert_relative_eq;

    const GDP: f64 = 30.0e12;

    fn inputs(relief: &[f64]) -> YearInputs<'_> {
        YearInputs {
            year_index: 0,
            gdp: GDP,
            scale_factor: 1.0,
            inflation_factor: 1.0,
            interest_expense: 0.0,
            relief,
            revenue_drag: 0.0,
        }
    }

    fn simple_policy() -> PolicyConfiguration {
        PolicyConfiguration::new("simple", GeneralParameters::new(GDP, 10.0e12, 5))
            .with_stream(RevenueStream::percent_of_gdp("tax", 0.20).with_destination("services", 1.0))
            .with_category(SpendingCategory::percent_of_gdp("services", 0.18).funded_by("tax", 1.0))
    }

    #[test]
    fn test_scenario_year_one_surplus() {
        let policy = simple_policy();
        let resolver = AnnualResolver::new(&policy);
        let res = resolver.resolve(&inputs(&[0.0]));

        assert_relative_eq!(res.total_revenue, 6.0e12, max_relative = 1e-12);
        assert_relative_eq!(res.program_spending, 5.4e12, max_relative = 1e-12);
        assert_relative_eq!(res.surplus, 0.6e12, max_relative = 1e-9);
        assert_relative_eq!(res.category_surplus["services"], 0.6e12, max_relative = 1e-9);
        assert_eq!(res.general_revenue_contribution, 0.0);
        assert!(res.fallback.is_none());
    }

    #[test]
    fn test_partial_funding_records_general_contribution() {
        let policy = PolicyConfiguration::new("partial", GeneralParameters::new(GDP, 0.0, 5))
            .with_stream(RevenueStream::percent_of_gdp("earmarked", 0.05).with_destination("health", 1.0))
            .with_stream(RevenueStream::percent_of_gdp("income", 0.15).with_destination(GENERAL_FUND, 1.0))
            .with_category(SpendingCategory::percent_of_gdp("health", 0.08).funded_by("earmarked", 0.5));

        let res = AnnualResolver::new(&policy).resolve(&inputs(&[0.0, 0.0]));

        // Draw 4% of GDP from earmarked, remaining 1% lands in health too
        assert_relative_eq!(res.category_funding["health"], 0.05 * GDP, max_relative = 1e-12);
        assert_relative_eq!(res.general_revenue_contribution, 0.03 * GDP, max_relative = 1e-9);
        assert_relative_eq!(res.general_revenue, 0.15 * GDP, max_relative = 1e-12);
        assert_relative_eq!(res.aggregate_surplus(), res.surplus, max_relative = 1e-9);
    }

    #[test]
    fn test_source_draw_limited_by_stream_total() {
        let policy = PolicyConfiguration::new("thin", GeneralParameters::new(GDP, 0.0, 5))
            .with_stream(RevenueStream::percent_of_gdp("levy", 0.02).with_destination(GENERAL_FUND, 1.0))
            .with_category(SpendingCategory::percent_of_gdp("a", 0.03).funded_by("levy", 1.0))
            .with_category(SpendingCategory::percent_of_gdp("b", 0.01).funded_by("levy", 1.0));

        let res = AnnualResolver::new(&policy).resolve(&inputs(&[0.0]));

        assert_relative_eq!(res.category_funding["a"], 0.02 * GDP, max_relative = 1e-12);
        assert_eq!(res.category_funding["b"], 0.0);
        assert_eq!(res.general_revenue, 0.0);
        assert_relative_eq!(res.general_revenue_contribution, 0.02 * GDP, max_relative = 1e-9);
    }

    #[test]
    fn test_fixed_amounts_inflate_and_index() {
        let policy = PolicyConfiguration::new("fixed", GeneralParameters::new(GDP, 0.0, 5))
            .with_stream(RevenueStream::fixed("fees", 100.0).with_destination(GENERAL_FUND, 1.0))
            .with_stream(
                RevenueStream::fixed("indexed fees", 100.0)
                    .gdp_indexed()
                    .with_destination(GENERAL_FUND, 1.0),
            );
        let resolver = AnnualResolver::new(&policy);
        let relief = [0.0, 0.0];
        let res = resolver.resolve(&YearInputs {
            scale_factor: 1.5,
            inflation_factor: 2.0,
            ..inputs(&relief)
        });

        assert_relative_eq!(res.totals["fees"], 200.0);
        assert_relative_eq!(res.totals["indexed fees"], 300.0);
    }

    #[test]
    fn test_reduction_curve_lowers_cost() {
        let policy = PolicyConfiguration::new("curve", GeneralParameters::new(GDP, 0.0, 10))
            .with_stream(RevenueStream::percent_of_gdp("tax", 0.2).with_destination(GENERAL_FUND, 1.0))
            .with_category(
                SpendingCategory::percent_of_gdp("health", 0.10)
                    .with_reduction(ReductionCurve::overhead_glide(0.16, 0.03, 9)),
            );
        let resolver = AnnualResolver::new(&policy);
        let relief = [0.0];
        let year9 = resolver.resolve(&YearInputs { year_index: 9, ..inputs(&relief) });

        assert_relative_eq!(year9.category_costs["health"], 0.10 * GDP * 0.87, max_relative = 1e-12);
    }

    #[test]
    fn test_relief_and_drag_reduce_revenue() {
        let policy = PolicyConfiguration::new("relief", GeneralParameters::new(GDP, 0.0, 10))
            .with_stream(RevenueStream::percent_of_gdp("tax", 0.2).with_destination(GENERAL_FUND, 1.0))
            .with_stream(
                RevenueStream::new(
                    "surtax",
                    AmountKind::PercentOfStream { stream: "tax".to_string(), rate: 0.5 },
                )
                .with_destination(GENERAL_FUND, 1.0),
            );
        let resolver = AnnualResolver::new(&policy);
        let relief = [0.10, 0.0];
        let res = resolver.resolve(&YearInputs { revenue_drag: 0.02, ..inputs(&relief) });

        let tax = 0.2 * GDP * 0.9 * 0.98;
        assert_relative_eq!(res.totals["tax"], tax, max_relative = 1e-12);
        // Derived stream inherits the drag through its base only
        assert_relative_eq!(res.totals["surtax"], 0.5 * tax, max_relative = 1e-12);
    }

    #[test]
    fn test_interest_charged_to_general_fund() {
        let policy = simple_policy();
        let relief = [0.0];
        let res = AnnualResolver::new(&policy).resolve(&YearInputs {
            interest_expense: 1.0e12,
            ..inputs(&relief)
        });

        assert_relative_eq!(res.total_spending, 6.4e12, max_relative = 1e-12);
        assert_relative_eq!(res.general_fund_surplus, -1.0e12, max_relative = 1e-12);
        assert_relative_eq!(res.surplus, res.total_revenue - res.total_spending);
        assert_relative_eq!(res.aggregate_surplus(), res.surplus, max_relative = 1e-9);
    }

    #[test]
    fn test_collapsed_gdp_falls_back_to_zeros() {
        let policy = simple_policy();
        let relief = [0.0];
        let res = AnnualResolver::new(&policy).resolve(&YearInputs { gdp: 0.0, ..inputs(&relief) });

        assert_eq!(res.fallback, Some(ArithmeticFallback::NonPositiveGdp(0.0)));
        assert_eq!(res.total_revenue, 0.0);
        assert_eq!(res.totals["tax"], 0.0);
        assert_eq!(res.category_surplus["services"], 0.0);
    }

    #[test]
    fn test_overflow_falls_back() {
        let policy = PolicyConfiguration::new("huge", GeneralParameters::new(GDP, 0.0, 5))
            .with_stream(RevenueStream::fixed("tax", f64::MAX).with_destination(GENERAL_FUND, 1.0));
        let relief = [0.0];
        let res = AnnualResolver::new(&policy).resolve(&YearInputs {
            inflation_factor: 10.0,
            ..inputs(&relief)
        });

        assert!(matches!(res.fallback, Some(ArithmeticFallback::NonFinite { .. })));
    }
}
