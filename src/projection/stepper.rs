//! One-year state transitions: ledger, debt, compounding, and safeguards

use log::{debug, warn};

use crate::economics::{AnnualResolver, Resolution, YearInputs};
use crate::policy::{BreakerRedirectPolicy, PolicyConfiguration, SafeguardThresholds};

use super::state::{Phase, SimulationState, TerminationReason};
use super::trajectory::{RedirectSplit, YearRow};

/// Advances a `SimulationState` one year at a time
pub struct YearStateStepper<'a> {
    policy: &'a PolicyConfiguration,
    resolver: AnnualResolver<'a>,
}

impl<'a> YearStateStepper<'a> {
    /// Stepper for an already validated policy
    pub fn new(policy: &'a PolicyConfiguration) -> Self {
        Self {
            policy,
            resolver: AnnualResolver::new(policy),
        }
    }

    fn guards(&self) -> &SafeguardThresholds {
        self.policy.safeguards()
    }

    /// Project the year at `state.year_index` and advance the state.
    ///
    /// Never fails: non-finite results are replaced by the last valid value
    /// and the row is flagged `degraded`. Once the state is terminated the
    /// last values are repeated as extrapolated rows.
    pub fn step(&self, state: &mut SimulationState) -> YearRow {
        let year = state.year_index;
        if state.is_terminated() {
            let row = match &state.last_row {
                Some(last) => last.extrapolate_to(year, state.calendar_year()),
                None => self.frozen_row(state),
            };
            state.year_index += 1;
            return row;
        }

        let params = &self.policy.general_parameters;
        let guards = self.guards();
        let growth = params.growth_rate_at(year);
        let inflation = params.inflation_rate_at(year);

        let mut row = YearRow::new(year, state.calendar_year());
        row.gdp = state.gdp;
        row.scale_factor = state.scale_factor;
        row.inflation_factor = state.inflation_factor;
        row.growth_rate = growth;
        row.inflation_rate = inflation;

        // Recession mode: negative growth for enough consecutive years
        if growth < 0.0 {
            state.consecutive_negative_growth_years += 1;
        } else {
            state.consecutive_negative_growth_years = 0;
        }
        let in_recession = guards.recession_trigger_years > 0
            && state.consecutive_negative_growth_years >= guards.recession_trigger_years;
        if in_recession != state.recession_active {
            debug!(
                "{}: recession mode {} in {}",
                self.policy.name,
                if in_recession { "entered" } else { "cleared" },
                state.calendar_year()
            );
        }
        state.recession_active = in_recession;
        let drag = if in_recession { guards.recession_revenue_drag } else { 0.0 };

        let debt_start = state.cumulative_debt;
        // Net creditor positions earn nothing
        let interest = debt_start.max(0.0) * params.interest_rate;

        // First pass with the relief scheduled for this year
        let scheduled: Vec<f64> = self
            .policy
            .revenue_streams
            .iter()
            .map(|s| s.scheduled_relief(year))
            .collect();
        let mut resolution = self.resolve(state, interest, &scheduled, drag);

        let ratio = self.spending_ratio(&resolution, state.gdp);
        let breaker = self.breaker_guard(state.phase, ratio);
        if breaker != state.circuit_breaker_active() {
            debug!(
                "{}: circuit breaker {} in {} (spending/GDP {:.4})",
                self.policy.name,
                if breaker { "tripped" } else { "released" },
                state.calendar_year(),
                ratio
            );
        }

        // Tax relief is frozen at last year's level while the breaker is active
        if breaker && state.relief_levels != scheduled {
            resolution = self.resolve(state, interest, &state.relief_levels, drag);
        } else {
            state.relief_levels = scheduled;
        }
        state.phase = if breaker { Phase::CircuitBreakerActive } else { Phase::Normal };

        let mut degraded = false;
        if let Some(fallback) = &resolution.fallback {
            warn!(
                "{}: arithmetic fallback in {}: {:?}",
                self.policy.name,
                state.calendar_year(),
                fallback
            );
            degraded = true;
        }

        // Surplus redirect and debt
        let redirect = self.redirect(&resolution, breaker);
        let mut new_debt = debt_start - resolution.surplus + redirect.outflows();
        if !new_debt.is_finite() {
            new_debt = debt_start;
            degraded = true;
        }

        if resolution.surplus < 0.0 {
            state.consecutive_deficit_years += 1;
        } else {
            state.consecutive_deficit_years = 0;
        }

        // Compound the economy for next year
        let new_gdp = substitute(state.gdp * (1.0 + growth), state.gdp, &mut degraded);
        let new_scale = substitute(state.scale_factor * (1.0 + growth), state.scale_factor, &mut degraded);
        let new_inflation = substitute(
            state.inflation_factor * (1.0 + inflation),
            state.inflation_factor,
            &mut degraded,
        );

        row.revenue_by_stream = resolution.totals;
        row.spending_by_category = resolution.category_costs;
        row.category_surplus = resolution.category_surplus;
        row.total_revenue = resolution.total_revenue;
        row.program_spending = resolution.program_spending;
        row.interest_expense = resolution.interest_expense;
        row.total_spending = resolution.total_spending;
        row.primary_surplus = resolution.total_revenue - resolution.program_spending;
        row.surplus = resolution.surplus;
        row.general_revenue_contribution = resolution.general_revenue_contribution;
        row.redirect = redirect;
        row.debt_start = debt_start;
        row.cumulative_debt = new_debt;
        row.debt_to_gdp = if row.gdp > 0.0 { new_debt / row.gdp } else { 0.0 };
        row.spending_to_gdp = ratio;
        row.phase = state.phase;
        row.recession = in_recession;

        state.cumulative_debt = new_debt;
        state.gdp = new_gdp;
        state.scale_factor = new_scale;
        state.inflation_factor = new_inflation;
        state.year_index += 1;

        if degraded {
            warn!("{}: degraded values substituted in {}", self.policy.name, row.calendar_year);
            state.degraded = true;
        }
        row.degraded = degraded;

        // Termination guards, highest priority first
        if inflation > guards.hyperinflation_rate {
            state.consecutive_runaway_inflation_years += 1;
        } else {
            state.consecutive_runaway_inflation_years = 0;
        }
        let reason = if guards.hyperinflation_years > 0
            && state.consecutive_runaway_inflation_years >= guards.hyperinflation_years
        {
            Some(TerminationReason::Hyperinflation)
        } else if row.gdp > 0.0 && row.debt_to_gdp > guards.debt_explosion_multiple {
            Some(TerminationReason::DebtExplosion)
        } else {
            None
        };

        if let Some(reason) = reason {
            warn!(
                "{}: terminated early in {} ({:?})",
                self.policy.name, row.calendar_year, reason
            );
            state.phase = Phase::TerminatedEarly;
            state.termination = Some(reason);
            row.phase = Phase::TerminatedEarly;
            row.termination = Some(reason);
            state.last_row = Some(row.clone());
        }

        row
    }

    fn resolve(&self, state: &SimulationState, interest: f64, relief: &[f64], drag: f64) -> Resolution {
        self.resolver.resolve(&YearInputs {
            year_index: state.year_index,
            gdp: state.gdp,
            scale_factor: state.scale_factor,
            inflation_factor: state.inflation_factor,
            interest_expense: interest,
            relief,
            revenue_drag: drag,
        })
    }

    fn spending_ratio(&self, resolution: &Resolution, gdp: f64) -> f64 {
        if gdp > 0.0 {
            resolution.watched_spending(&self.guards().ceiling_categories) / gdp
        } else {
            0.0
        }
    }

    /// Breaker trips above the ceiling and releases once the ratio falls back
    /// under it (minus the configured release margin)
    fn breaker_guard(&self, phase: Phase, ratio: f64) -> bool {
        let guards = self.guards();
        match guards.spending_ceiling {
            None => false,
            Some(ceiling) if phase == Phase::CircuitBreakerActive => {
                ratio > ceiling - guards.breaker_release_margin
            }
            Some(ceiling) => ratio > ceiling,
        }
    }

    fn redirect(&self, resolution: &Resolution, breaker_active: bool) -> RedirectSplit {
        let rule = match &self.guards().surplus_redirect {
            Some(rule) => rule,
            None => return RedirectSplit::default(),
        };
        if resolution.surplus <= 0.0
            || resolution.total_revenue <= rule.trigger_ratio * resolution.total_spending
        {
            return RedirectSplit::default();
        }

        let excess = resolution.total_revenue - rule.trigger_ratio * resolution.total_spending;
        match (breaker_active, rule.during_breaker) {
            (true, BreakerRedirectPolicy::Suspend) => RedirectSplit::default(),
            (true, BreakerRedirectPolicy::DebtPaydownOnly) => RedirectSplit {
                debt_paydown: excess,
                ..RedirectSplit::default()
            },
            _ => RedirectSplit {
                reserve: excess * rule.reserve,
                debt_paydown: excess * rule.debt_paydown,
                reinvestment: excess * rule.reinvestment,
                rebate: excess * rule.rebate,
            },
        }
    }

    /// Extrapolated row for a state terminated without a recorded last row
    fn frozen_row(&self, state: &SimulationState) -> YearRow {
        let mut row = YearRow::new(state.year_index, state.calendar_year());
        row.gdp = state.gdp;
        row.scale_factor = state.scale_factor;
        row.inflation_factor = state.inflation_factor;
        row.debt_start = state.cumulative_debt;
        row.cumulative_debt = state.cumulative_debt;
        row.debt_to_gdp = state.debt_to_gdp().unwrap_or(0.0);
        row.phase = Phase::TerminatedEarly;
        row.termination = state.termination;
        row.extrapolated = true;
        row
    }
}

fn substitute(candidate: f64, last_valid: f64, degraded: &mut bool) -> f64 {
    if candidate.is_finite() {
        candidate
    } else {
        *degraded = true;
        last_valid
    }
}
