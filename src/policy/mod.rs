//! Policy configuration: data model, validation, loading, and presets

mod curve;
mod data;
mod validation;
pub mod loader;
pub mod presets;

pub use curve::{CurvePoint, ReductionCurve, TaxRelief};
pub use data::{
    Allocation, AmountKind, BreakerRedirectPolicy, GeneralParameters, PolicyConfiguration,
    RevenueStream, SafeguardThresholds, SpendingCategory, SurplusRedirectRule, GENERAL_FUND,
};
pub use loader::{load_policy, load_policy_from_reader, load_sampling_config, PolicyLoadError};
pub use validation::{validate_policy, MAX_HORIZON_YEARS, SHARE_TOLERANCE};
