//! Atlas CLI error types

use mernboot_provision::ProvisionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("atlas not found. Please install the MongoDB Atlas CLI")]
    NotInstalled,

    #[error("No install command known for this platform")]
    NoInstallCommand,

    #[error("`{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("Could not parse output of `{command}`: {output}")]
    UnparsableOutput { command: String, output: String },

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<AtlasError> for ProvisionError {
    fn from(err: AtlasError) -> Self {
        match err {
            AtlasError::NotInstalled | AtlasError::NoInstallCommand => ProvisionError::ToolMissing,
            AtlasError::CommandFailed { command, detail } => {
                ProvisionError::CommandFailed { command, detail }
            }
            AtlasError::UnparsableOutput { command, output } => {
                ProvisionError::UnparsableOutput { command, output }
            }
            AtlasError::JsonError(e) => ProvisionError::Json(e),
            AtlasError::IoError(e) => ProvisionError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, AtlasError>;
