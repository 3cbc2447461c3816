//! Provisioning error types

use crate::step::PipelineStep;
use thiserror::Error;

/// Provisioning errors
///
/// `AlreadySatisfied`, `TimedOut` and `NotReadyYet` are not errors and are
/// modelled as values (see [`crate::StepOutcome`], [`crate::Readiness`],
/// [`crate::Resolution`]).
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("atlas CLI is not installed and could not be installed automatically")]
    ToolMissing,

    #[error("Step '{step}' failed: {detail}")]
    StepFailed { step: PipelineStep, detail: String },

    #[error("`{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("Could not parse output of `{command}`: {output}")]
    UnparsableOutput { command: String, output: String },

    #[error("Provisioning record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid provisioning record: {0}")]
    InvalidRecord(String),

    #[error(
        "Invalid MongoDB connection string. It should start with 'mongodb://' or 'mongodb+srv://'"
    )]
    InvalidConnectionString,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProvisionError {
    /// Captured error text used when a step fails
    pub fn detail(&self) -> String {
        match self {
            ProvisionError::CommandFailed { detail, .. } => detail.clone(),
            ProvisionError::StepFailed { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
