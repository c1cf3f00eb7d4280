//! Mutable per-trajectory simulation state

use serde::{Deserialize, Serialize};

use crate::policy::PolicyConfiguration;

use super::trajectory::YearRow;

/// Stepper state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Normal,
    /// Spending above the ceiling; scheduled tax relief frozen
    CircuitBreakerActive,
    /// A runaway condition stopped the projection
    TerminatedEarly,
}

/// Why a run stopped before its horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    Hyperinflation,
    DebtExplosion,
}

/// Starting point of a projection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub start_year: i32,
    pub gdp: f64,
    pub debt: f64,
}

impl InitialState {
    /// Starting point taken from the policy's general parameters
    pub fn from_policy(policy: &PolicyConfiguration) -> Self {
        let params = &policy.general_parameters;
        Self {
            start_year: params.start_year,
            gdp: params.initial_gdp,
            debt: params.initial_debt,
        }
    }
}

/// State of one trajectory between years. Owned by a single run.
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Years already projected; the next step resolves this index
    pub year_index: u32,

    pub start_year: i32,

    pub gdp: f64,

    pub cumulative_debt: f64,

    /// Compounded real growth multiplier
    pub scale_factor: f64,

    /// Compounded inflation multiplier
    pub inflation_factor: f64,

    pub phase: Phase,

    pub termination: Option<TerminationReason>,

    pub consecutive_deficit_years: u32,

    pub consecutive_negative_growth_years: u32,

    pub consecutive_runaway_inflation_years: u32,

    pub recession_active: bool,

    /// Relief in force per revenue stream
    pub relief_levels: Vec<f64>,

    /// Set once any value had to be substituted
    pub degraded: bool,

    /// Row of the terminating year, repeated for every later year
    pub last_row: Option<YearRow>,
}

impl SimulationState {
    /// Year-0 state from a policy's general parameters
    pub fn from_policy(policy: &PolicyConfiguration) -> Self {
        Self::from_initial(policy, &InitialState::from_policy(policy))
    }

    /// Year-0 state from an explicit starting point
    pub fn from_initial(policy: &PolicyConfiguration, initial: &InitialState) -> Self {
        Self {
            year_index: 0,
            start_year: initial.start_year,
            gdp: initial.gdp,
            cumulative_debt: initial.debt,
            scale_factor: 1.0,
            inflation_factor: 1.0,
            phase: Phase::Normal,
            termination: None,
            consecutive_deficit_years: 0,
            consecutive_negative_growth_years: 0,
            consecutive_runaway_inflation_years: 0,
            recession_active: false,
            relief_levels: vec![0.0; policy.revenue_streams.len()],
            degraded: false,
            last_row: None,
        }
    }

    pub fn circuit_breaker_active(&self) -> bool {
        self.phase == Phase::CircuitBreakerActive
    }

    /// True once a runaway guard stopped the projection
    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::TerminatedEarly
    }

    /// Calendar year of the next step
    pub fn calendar_year(&self) -> i32 {
        self.start_year + self.year_index as i32
    }

    /// Debt over GDP, or None when GDP is not positive
    pub fn debt_to_gdp(&self) -> Option<f64> {
        if self.gdp > 0.0 {
            Some(self.cumulative_debt / self.gdp)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{GeneralParameters, RevenueStream, GENERAL_FUND};

    #[test]
    fn test_initial_state_from_parameters() {
        let policy = PolicyConfiguration::new("p", GeneralParameters::new(30.0, 10.0, 5))
            .with_stream(RevenueStream::percent_of_gdp("tax", 0.2).with_destination(GENERAL_FUND, 1.0));
        let state = SimulationState::from_policy(&policy);

        assert_eq!(state.year_index, 0);
        assert_eq!(state.gdp, 30.0);
        assert_eq!(state.cumulative_debt, 10.0);
        assert_eq!(state.scale_factor, 1.0);
        assert_eq!(state.inflation_factor, 1.0);
        assert_eq!(state.phase, Phase::Normal);
        assert_eq!(state.relief_levels, vec![0.0]);
        assert_eq!(state.calendar_year(), 2025);
        assert_eq!(state.debt_to_gdp(), Some(10.0 / 30.0));
        assert!(state.last_row.is_none());
    }
}
