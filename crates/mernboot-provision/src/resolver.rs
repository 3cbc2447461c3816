//! Connection string resolution
//!
//! Turns the persisted record plus the interactively supplied password into a
//! usable `MONGO_URI`, and merges it into the project's `.env` file.
//!
//! ## Security
//!
//! - The password is never logged or written to the record file
//! - `ConnectionString`'s `Debug` output hides the password

use crate::error::{ProvisionError, Result};
use crate::provider::AtlasGateway;
use crate::record::ProvisioningRecord;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Marker Atlas prints while the cluster has no address yet
pub const NIL_SENTINEL: &str = "<nil>";

/// Key written to the environment file
pub const MONGO_URI_KEY: &str = "MONGO_URI";

/// Used when the user skips Atlas setup
pub const LOCAL_PLACEHOLDER_URI: &str = "mongodb://localhost:27017/your-database";

const SCHEMES: [&str; 2] = ["mongodb+srv://", "mongodb://"];
const QUERY_PARAMS: &str = "retryWrites=true&w=majority";

/// A complete MongoDB connection string (may contain credentials)
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString(String);

impl ConnectionString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The string with the password part of the userinfo masked
    pub fn redacted(&self) -> String {
        let Some((scheme, rest)) = self.0.split_once("://") else {
            return self.0.clone();
        };
        match rest.split_once('@') {
            Some((userinfo, host)) => {
                let user = userinfo.split(':').next().unwrap_or_default();
                format!("{}://{}:***@{}", scheme, user, host)
            }
            None => self.0.clone(),
        }
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionString")
            .field(&self.redacted())
            .finish()
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a resolution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Ready(ConnectionString),
    /// Cluster has no address yet; try again later
    NotReadyYet,
}

/// Fetch the cluster's connection template and inject the credentials
pub async fn resolve(
    gateway: &dyn AtlasGateway,
    record: &ProvisioningRecord,
    password: &str,
) -> Result<Resolution> {
    tracing::debug!(
        project_id = %record.project_id(),
        cluster = %record.cluster_name(),
        "Resolving connection string"
    );

    let template = match gateway
        .connection_template(record.project_id(), record.cluster_name())
        .await
    {
        Ok(template) => template,
        Err(e) if e.detail().contains(NIL_SENTINEL) => {
            tracing::info!("Cluster has no connection string yet");
            return Ok(Resolution::NotReadyYet);
        }
        Err(e) => return Err(e),
    };

    if template.trim().is_empty() || template.contains(NIL_SENTINEL) {
        tracing::info!("Cluster has no connection string yet");
        return Ok(Resolution::NotReadyYet);
    }

    build_connection_string(&template, record, password).map(Resolution::Ready)
}

/// Insert `username:password@` after the scheme and append the database
/// name plus the standard query parameters
pub fn build_connection_string(
    template: &str,
    record: &ProvisioningRecord,
    password: &str,
) -> Result<ConnectionString> {
    let template = template.trim();
    let scheme = SCHEMES
        .iter()
        .find(|scheme| template.starts_with(*scheme))
        .ok_or_else(|| ProvisionError::UnparsableOutput {
            command: "atlas clusters connectionStrings describe".to_string(),
            output: template.to_string(),
        })?;
    let host = &template[scheme.len()..];

    Ok(ConnectionString(format!(
        "{}{}:{}@{}/{}?{}",
        scheme, record.username(), password, host, record.cluster_name(), QUERY_PARAMS
    )))
}

/// Validate a connection string typed in by the user
pub fn parse_manual(input: &str) -> Result<ConnectionString> {
    let trimmed = input.trim();
    if SCHEMES
        .iter()
        .any(|scheme| trimmed.starts_with(scheme) && trimmed.len() > scheme.len())
    {
        Ok(ConnectionString(trimmed.to_string()))
    } else {
        Err(ProvisionError::InvalidConnectionString)
    }
}

/// The local placeholder used when Atlas setup is skipped
pub fn local_placeholder() -> ConnectionString {
    ConnectionString(LOCAL_PLACEHOLDER_URI.to_string())
}

/// A `KEY=value` environment file
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace every `key=` line with a single entry placed first
    pub async fn upsert(&self, key: &str, value: &str) -> Result<()> {
        let existing = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        fs::write(&self.path, merge_entry(&existing, key, value)).await?;
        tracing::debug!(key, path = %self.path.display(), "Updated env file");
        Ok(())
    }

    /// Write the connection string as `MONGO_URI`
    pub async fn write_connection_string(&self, uri: &ConnectionString) -> Result<()> {
        self.upsert(MONGO_URI_KEY, uri.as_str()).await
    }
}

/// Merge `key=value` into env file content: old entries for `key` are
/// dropped and the new one goes first. Other lines are kept byte for byte.
pub fn merge_entry(existing: &str, key: &str, value: &str) -> String {
    let prefix = format!("{}=", key);
    let mut rest: String = existing
        .split_inclusive('\n')
        .filter(|line| !line.starts_with(&prefix))
        .collect();

    if !rest.is_empty() && !rest.ends_with('\n') {
        rest.push('\n');
    }

    format!("{}{}\n{}", prefix, value, rest)
}
