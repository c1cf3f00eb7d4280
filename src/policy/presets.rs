//! In-memory scenario builders
//!
//! Baseline figures are round national-accounts style numbers (dollars),
//! not an official forecast.

use super::curve::ReductionCurve;
use super::data::{
    GeneralParameters, PolicyConfiguration, RevenueStream, SafeguardThresholds, SpendingCategory,
    SurplusRedirectRule, GENERAL_FUND,
};

const BASELINE_GDP: f64 = 30.0e12;
const BASELINE_DEBT: f64 = 36.0e12;

fn baseline_parameters(horizon_years: u32) -> GeneralParameters {
    GeneralParameters {
        gdp_growth_rate: 0.02,
        inflation_rate: 0.025,
        interest_rate: 0.035,
        ..GeneralParameters::new(BASELINE_GDP, BASELINE_DEBT, horizon_years)
    }
}

/// Current-law baseline: payroll taxes split between healthcare and pensions
pub fn status_quo(horizon_years: u32) -> PolicyConfiguration {
    PolicyConfiguration::new("status quo", baseline_parameters(horizon_years))
        .with_stream(RevenueStream::percent_of_gdp("income tax", 0.090).with_destination(GENERAL_FUND, 1.0))
        .with_stream(
            RevenueStream::percent_of_gdp("payroll tax", 0.060)
                .with_destination("healthcare", 0.40)
                .with_destination("pensions", 0.60),
        )
        .with_stream(RevenueStream::percent_of_gdp("corporate tax", 0.015).with_destination(GENERAL_FUND, 1.0))
        .with_stream(RevenueStream::percent_of_gdp("other revenue", 0.015).with_destination(GENERAL_FUND, 1.0))
        .with_category(SpendingCategory::percent_of_gdp("healthcare", 0.080).funded_by("payroll tax", 0.30))
        .with_category(SpendingCategory::percent_of_gdp("pensions", 0.050).funded_by("payroll tax", 0.70))
        .with_category(SpendingCategory::percent_of_gdp("defense", 0.030).funded_by("income tax", 1.0))
        .with_category(SpendingCategory::percent_of_gdp("other programs", 0.055).funded_by("income tax", 0.8))
}

/// Single-payer style reform: dedicated premium, admin overhead glide from
/// 16% to 3% over 9 years, a 13% of GDP ceiling on healthcare, and income
/// tax relief that is only granted while spending stays under the ceiling.
pub fn healthcare_reform(horizon_years: u32) -> PolicyConfiguration {
    let mut params = baseline_parameters(horizon_years);
    params.safeguards = SafeguardThresholds {
        spending_ceiling: Some(0.13),
        ceiling_categories: vec!["healthcare".to_string()],
        surplus_redirect: Some(SurplusRedirectRule::default()),
        ..SafeguardThresholds::default()
    };

    PolicyConfiguration::new("healthcare reform", params)
        .with_stream(
            RevenueStream::percent_of_gdp("income tax", 0.090)
                .with_destination(GENERAL_FUND, 1.0)
                .with_relief(3, 0.05)
                .with_relief(6, 0.05),
        )
        .with_stream(
            RevenueStream::percent_of_gdp("payroll tax", 0.060)
                .with_destination("healthcare", 0.40)
                .with_destination("pensions", 0.60),
        )
        .with_stream(
            RevenueStream::percent_of_gdp("healthcare premium", 0.055)
                .with_destination("healthcare", 1.0),
        )
        .with_stream(RevenueStream::percent_of_gdp("corporate tax", 0.015).with_destination(GENERAL_FUND, 1.0))
        .with_stream(RevenueStream::percent_of_gdp("other revenue", 0.015).with_destination(GENERAL_FUND, 1.0))
        .with_category(
            SpendingCategory::percent_of_gdp("healthcare", 0.080)
                .funded_by("healthcare premium", 0.65)
                .funded_by("payroll tax", 0.30)
                .with_reduction(ReductionCurve::overhead_glide(0.16, 0.03, 9)),
        )
        .with_category(SpendingCategory::percent_of_gdp("pensions", 0.050).funded_by("payroll tax", 0.70))
        .with_category(SpendingCategory::percent_of_gdp("defense", 0.030).funded_by("income tax", 1.0))
        .with_category(SpendingCategory::percent_of_gdp("other programs", 0.055).funded_by("income tax", 0.8))
}

/// Look up a preset by name (as used on the command line)
pub fn by_name(name: &str, horizon_years: u32) -> Option<PolicyConfiguration> {
    match name {
        "status-quo" | "status_quo" | "baseline" => Some(status_quo(horizon_years)),
        "healthcare-reform" | "healthcare_reform" | "reform" => Some(healthcare_reform(horizon_years)),
        _ => None,
    }
}
