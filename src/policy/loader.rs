//! Load policy and sampling configurations from JSON
//!
//! The engine itself never touches the filesystem; this module is the thin
//! boundary used by the binaries and other collaborators.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use thiserror::Error;

use crate::error::{ConfigError, SamplingError};
use crate::stochastic::{SamplingConfig, StochasticSampler};

use super::data::PolicyConfiguration;
use super::validation::validate_policy;

#[derive(Debug, Error)]
pub enum PolicyLoadError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid policy: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid sampling configuration: {0}")]
    Sampling(#[from] SamplingError),
}

/// Load and validate a policy from a JSON file
pub fn load_policy<P: AsRef<Path>>(path: P) -> Result<PolicyConfiguration, PolicyLoadError> {
    let file = File::open(path)?;
    load_policy_from_reader(BufReader::new(file))
}

/// Load and validate a policy from any reader (e.g., string buffer, network stream)
pub fn load_policy_from_reader<R: Read>(reader: R) -> Result<PolicyConfiguration, PolicyLoadError> {
    let policy: PolicyConfiguration = serde_json::from_reader(reader)?;
    validate_policy(&policy)?;
    Ok(policy)
}

/// Load and validate a sampling configuration from a JSON file
pub fn load_sampling_config<P: AsRef<Path>>(path: P) -> Result<SamplingConfig, PolicyLoadError> {
    let file = File::open(path)?;
    load_sampling_config_from_reader(BufReader::new(file))
}

/// Load and check a sampling configuration from any reader
pub fn load_sampling_config_from_reader<R: Read>(reader: R) -> Result<SamplingConfig, PolicyLoadError> {
    let config: SamplingConfig = serde_json::from_reader(reader)?;
    StochasticSampler::check_config(&config)?;
    Ok(config)
}
