//! Eager validation of policy configurations
//!
//! Every check here runs before a simulator exists, so malformed allocations
//! never surface mid-run.

use std::collections::HashSet;

use crate::error::ConfigError;

use super::data::{AmountKind, Allocation, GeneralParameters, PolicyConfiguration};

/// Longest supported projection
pub const MAX_HORIZON_YEARS: u32 = 200;

/// Tolerance for "sums to exactly 100%"
pub const SHARE_TOLERANCE: f64 = 1e-9;

/// Validate a policy configuration
pub fn validate_policy(policy: &PolicyConfiguration) -> Result<(), ConfigError> {
    validate_general(&policy.general_parameters)?;

    if policy.revenue_streams.is_empty() {
        return Err(ConfigError::NoRevenueStreams);
    }

    let mut stream_names: HashSet<&str> = HashSet::new();
    for stream in &policy.revenue_streams {
        if stream.name.trim().is_empty() {
            return Err(ConfigError::EmptyName { kind: "revenue stream" });
        }
        check_amount(&stream.name, &stream.amount)?;

        // Streams may only build on streams resolved before them
        if let Some(base) = stream.amount.base_stream() {
            if !stream_names.contains(base) {
                return Err(if policy.stream_index(base).is_some() {
                    ConfigError::ForwardReference {
                        stream: stream.name.clone(),
                        base: base.to_string(),
                    }
                } else {
                    ConfigError::UnknownStream {
                        owner: stream.name.clone(),
                        stream: base.to_string(),
                    }
                });
            }
        }

        if !stream_names.insert(stream.name.as_str()) {
            return Err(ConfigError::DuplicateName {
                kind: "revenue stream",
                name: stream.name.clone(),
            });
        }

        if stream.destinations.is_empty() {
            return Err(ConfigError::MissingDestinations {
                stream: stream.name.clone(),
            });
        }
        let total = share_total(&stream.name, &stream.destinations)?;
        if (total - 1.0).abs() > SHARE_TOLERANCE {
            return Err(ConfigError::DestinationSum {
                stream: stream.name.clone(),
                total,
            });
        }

        for relief in &stream.relief_schedule {
            check_unit_interval(format!("{} relief cut", stream.name), relief.cut)?;
        }
    }

    let mut category_names: HashSet<&str> = HashSet::new();
    for category in &policy.spending_categories {
        if category.name.trim().is_empty() {
            return Err(ConfigError::EmptyName { kind: "spending category" });
        }
        if !category_names.insert(category.name.as_str()) {
            return Err(ConfigError::DuplicateName {
                kind: "spending category",
                name: category.name.clone(),
            });
        }
        check_amount(&category.name, &category.amount)?;
        if let Some(base) = category.amount.base_stream() {
            if !stream_names.contains(base) {
                return Err(ConfigError::UnknownStream {
                    owner: category.name.clone(),
                    stream: base.to_string(),
                });
            }
        }

        for source in &category.funding_sources {
            if !stream_names.contains(source.target.as_str()) {
                return Err(ConfigError::UnknownStream {
                    owner: category.name.clone(),
                    stream: source.target.clone(),
                });
            }
        }
        let total = share_total(&category.name, &category.funding_sources)?;
        if total > 1.0 + SHARE_TOLERANCE {
            return Err(ConfigError::FundingSum {
                category: category.name.clone(),
                total,
            });
        }

        if let Some(curve) = &category.reduction {
            curve.check().map_err(|reason| ConfigError::InvalidCurve {
                category: category.name.clone(),
                reason,
            })?;
        }

        if !category.cost_multiplier.is_finite() || category.cost_multiplier < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: format!("{} cost multiplier", category.name),
                min: 0.0,
                max: f64::MAX,
                value: category.cost_multiplier,
            });
        }
    }

    Ok(())
}

fn validate_general(params: &GeneralParameters) -> Result<(), ConfigError> {
    if params.horizon_years == 0 || params.horizon_years > MAX_HORIZON_YEARS {
        return Err(ConfigError::InvalidHorizon {
            value: params.horizon_years,
            max: MAX_HORIZON_YEARS,
        });
    }

    for (field, value) in [
        ("initial_gdp", params.initial_gdp),
        ("initial_debt", params.initial_debt),
        ("gdp_growth_rate", params.gdp_growth_rate),
        ("inflation_rate", params.inflation_rate),
        ("interest_rate", params.interest_rate),
    ] {
        check_finite(field, value)?;
    }
    if params.initial_gdp <= 0.0 {
        return Err(ConfigError::NonPositiveGdp(params.initial_gdp));
    }
    check_range("gdp_growth_rate", params.gdp_growth_rate, -1.0, f64::MAX)?;
    check_range("inflation_rate", params.inflation_rate, -1.0, f64::MAX)?;

    for (field, path) in [
        ("growth_path", &params.growth_path),
        ("inflation_path", &params.inflation_path),
    ] {
        if let Some(rates) = path {
            for &rate in rates {
                check_finite(field, rate)?;
                check_range(field, rate, -1.0, f64::MAX)?;
            }
        }
    }

    let guards = &params.safeguards;
    if let Some(ceiling) = guards.spending_ceiling {
        check_range("spending_ceiling", ceiling, 0.0, f64::MAX)?;
    }
    check_range("breaker_release_margin", guards.breaker_release_margin, 0.0, f64::MAX)?;
    check_range("debt_explosion_multiple", guards.debt_explosion_multiple, 0.0, f64::MAX)?;
    check_range("hyperinflation_rate", guards.hyperinflation_rate, 0.0, f64::MAX)?;
    check_unit_interval("recession_revenue_drag".to_string(), guards.recession_revenue_drag)?;
    if guards.hyperinflation_years == 0 {
        return Err(ConfigError::OutOfRange {
            field: "hyperinflation_years".to_string(),
            min: 1.0,
            max: f64::MAX,
            value: 0.0,
        });
    }

    if let Some(rule) = &guards.surplus_redirect {
        check_range("surplus_redirect.trigger_ratio", rule.trigger_ratio, 1.0, f64::MAX)?;
        for (field, share) in [
            ("reserve", rule.reserve),
            ("debt_paydown", rule.debt_paydown),
            ("reinvestment", rule.reinvestment),
            ("rebate", rule.rebate),
        ] {
            check_unit_interval(format!("surplus_redirect.{field}"), share)?;
        }
        let total = rule.share_total();
        if (total - 1.0).abs() > SHARE_TOLERANCE {
            return Err(ConfigError::RedirectSharesSum(total));
        }
    }

    Ok(())
}

fn check_amount(owner: &str, amount: &AmountKind) -> Result<(), ConfigError> {
    let (field, value) = match amount {
        AmountKind::Fixed { amount } => ("amount", *amount),
        AmountKind::PercentOfGdp { rate } | AmountKind::PercentOfStream { rate, .. } => {
            ("rate", *rate)
        }
    };
    check_finite(&format!("{owner} {field}"), value)?;
    check_range(&format!("{owner} {field}"), value, 0.0, f64::MAX)
}

fn share_total(owner: &str, allocations: &[Allocation]) -> Result<f64, ConfigError> {
    let mut total = 0.0;
    for allocation in allocations {
        if !allocation.share.is_finite() || !(0.0..=1.0).contains(&allocation.share) {
            return Err(ConfigError::InvalidShare {
                owner: owner.to_string(),
                share: allocation.share,
            });
        }
        total += allocation.share;
    }
    Ok(total)
}

fn check_finite(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite {
            field: field.to_string(),
            value,
        })
    }
}

/// Rejects NaN along with values outside `[min, max]`
fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::OutOfRange {
            field: field.to_string(),
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn check_unit_interval(field: String, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfRange {
            field,
            min: 0.0,
            max: 1.0,
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::data::{RevenueStream, SpendingCategory, SurplusRedirectRule};

    fn base_policy() -> PolicyConfiguration {
        PolicyConfiguration::new("test", GeneralParameters::new(30.0, 10.0, 5))
            .with_stream(RevenueStream::percent_of_gdp("tax", 0.2).with_destination("services", 1.0))
            .with_category(SpendingCategory::percent_of_gdp("services", 0.18).funded_by("tax", 1.0))
    }

    #[test]
    fn test_valid_policy_passes() {
        assert_eq!(validate_policy(&base_policy()), Ok(()));
    }

    #[test]
    fn test_destinations_must_sum_to_one() {
        let mut policy = base_policy();
        policy.revenue_streams[0].destinations[0].share = 0.9;

        assert!(matches!(
            validate_policy(&policy),
            Err(ConfigError::DestinationSum { .. })
        ));
    }

    #[test]
    fn test_destination_sum_within_tolerance() {
        let mut policy = base_policy();
        policy.revenue_streams[0].destinations = vec![
            Allocation::new("services", 0.1),
            Allocation::new("services", 0.2),
            Allocation::new("general fund", 0.7),
        ];
        assert_eq!(validate_policy(&policy), Ok(()));
    }

    #[test]
    fn test_funding_may_be_partial_but_not_over() {
        let mut policy = base_policy();
        policy.spending_categories[0].funding_sources[0].share = 0.6;
        assert_eq!(validate_policy(&policy), Ok(()));

        policy.spending_categories[0] = policy.spending_categories[0]
            .clone()
            .funded_by("tax", 0.5);
        assert!(matches!(
            validate_policy(&policy),
            Err(ConfigError::FundingSum { .. })
        ));
    }

    #[test]
    fn test_nan_safeguard_thresholds_rejected() {
        let cases: [fn(&mut PolicyConfiguration); 5] = [
            |p| p.general_parameters.safeguards.spending_ceiling = Some(f64::NAN),
            |p| p.general_parameters.safeguards.breaker_release_margin = f64::NAN,
            |p| p.general_parameters.safeguards.debt_explosion_multiple = f64::NAN,
            |p| p.general_parameters.safeguards.hyperinflation_rate = f64::NAN,
            |p| {
                p.general_parameters.safeguards.surplus_redirect = Some(SurplusRedirectRule {
                    trigger_ratio: f64::NAN,
                    ..Default::default()
                })
            },
        ];
        for set_nan in cases {
            let mut policy = base_policy();
            set_nan(&mut policy);
            assert!(matches!(
                validate_policy(&policy),
                Err(ConfigError::OutOfRange { .. })
            ));
        }
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let mut policy = base_policy();
        policy.general_parameters.horizon_years = 0;
        assert!(matches!(
            validate_policy(&policy),
            Err(ConfigError::InvalidHorizon { value: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_funding_source_rejected() {
        let mut policy = base_policy();
        policy.spending_categories[0].funding_sources[0].target = "tariffs".to_string();
        assert!(matches!(
            validate_policy(&policy),
            Err(ConfigError::UnknownStream { .. })
        ));
    }

    #[test]
    fn test_forward_stream_reference_rejected() {
        let policy = PolicyConfiguration::new("fwd", GeneralParameters::new(30.0, 0.0, 5))
            .with_stream(
                RevenueStream::new(
                    "surcharge",
                    AmountKind::PercentOfStream {
                        stream: "tax".to_string(),
                        rate: 0.1,
                    },
                )
                .with_destination("general fund", 1.0),
            )
            .with_stream(RevenueStream::percent_of_gdp("tax", 0.2).with_destination("general fund", 1.0));

        assert!(matches!(
            validate_policy(&policy),
            Err(ConfigError::ForwardReference { .. })
        ));
    }

    #[test]
    fn test_redirect_shares_must_close() {
        let mut policy = base_policy();
        policy.general_parameters.safeguards.surplus_redirect = Some(SurplusRedirectRule {
            rebate: 0.30,
            ..Default::default()
        });
        assert!(matches!(
            validate_policy(&policy),
            Err(ConfigError::RedirectSharesSum(_))
        ));
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let policy = base_policy()
            .with_category(SpendingCategory::fixed("services", 1.0));
        assert!(matches!(
            validate_policy(&policy),
            Err(ConfigError::DuplicateName { kind: "spending category", .. })
        ));
    }
}
