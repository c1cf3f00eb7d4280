//! Deterministic multi-year projection driver

use log::debug;

use crate::error::ConfigError;
use crate::policy::{validate_policy, PolicyConfiguration};

use super::state::{InitialState, SimulationState};
use super::stepper::YearStateStepper;
use super::trajectory::Trajectory;

/// Runs one policy year by year over its horizon.
///
/// The policy is validated once on construction; `run` then never fails and
/// always returns `horizon_years` rows. Years after an early termination
/// repeat the last valid row, flagged `extrapolated`.
#[derive(Debug, Clone)]
pub struct DeterministicSimulator {
    policy: PolicyConfiguration,
}

impl DeterministicSimulator {
    /// Validate the policy and build a simulator for it
    pub fn new(policy: PolicyConfiguration) -> Result<Self, ConfigError> {
        validate_policy(&policy)?;
        Ok(Self { policy })
    }

    /// Skip validation for policies derived from an already validated one
    pub(crate) fn from_validated(policy: PolicyConfiguration) -> Self {
        Self { policy }
    }

    /// The validated policy this simulator runs
    pub fn policy(&self) -> &PolicyConfiguration {
        &self.policy
    }

    /// Project from the policy's own starting point
    pub fn run(&self) -> Trajectory {
        self.run_from(&InitialState::from_policy(&self.policy))
    }

    /// Project from an explicit starting GDP, debt, and year
    pub fn run_from(&self, initial: &InitialState) -> Trajectory {
        let horizon = self.policy.general_parameters.horizon_years;
        let stepper = YearStateStepper::new(&self.policy);
        let mut state = SimulationState::from_initial(&self.policy, initial);
        let mut trajectory = Trajectory::new(self.policy.name.clone(), initial.start_year);

        // Terminated states keep stepping; the stepper repeats the last row
        while state.year_index < horizon {
            trajectory.add_row(stepper.step(&mut state));
        }

        debug!(
            "{}: projected {} years (terminated: {:?}, degraded: {})",
            self.policy.name,
            trajectory.len(),
            trajectory.terminated_at(),
            trajectory.degraded
        );

        trajectory
    }
}
