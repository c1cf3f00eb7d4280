//! Year-by-year projection of a single policy

mod engine;
mod state;
mod stepper;
mod trajectory;

pub use engine::DeterministicSimulator;
pub use state::{InitialState, Phase, SimulationState, TerminationReason};
pub use stepper::YearStateStepper;
pub use trajectory::{
    RedirectSplit, Termination, TrackedField, Trajectory, TrajectorySummary, YearRow,
};
