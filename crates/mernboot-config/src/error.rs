use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine the user configuration directory")]
    ConfigDirNotFound,

    #[error("Invalid settings file: {path}\nReason: {message}")]
    InvalidSettings { path: PathBuf, message: String },

    #[error("Invalid value for {name}: {value}")]
    InvalidEnvValue { name: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
