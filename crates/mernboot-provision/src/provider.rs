//! Atlas gateway trait definition
//!
//! The pipeline, poller and resolver talk to MongoDB Atlas only through this
//! trait. `mernboot-atlas` implements it on top of the `atlas` CLI.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operations the provisioning pipeline needs from Atlas
///
/// Every call blocks until the underlying command exits. Implementations
/// translate a missing binary into [`crate::ProvisionError::ToolMissing`],
/// a non-zero exit into [`crate::ProvisionError::CommandFailed`] and output
/// they cannot interpret into [`crate::ProvisionError::UnparsableOutput`].
#[async_trait]
pub trait AtlasGateway: Send + Sync {
    /// Whether the backing tool is installed
    async fn is_installed(&self) -> bool;

    /// Try to install the backing tool once
    async fn install(&self) -> Result<()>;

    /// Names of the configured (authenticated) profiles
    async fn list_profiles(&self) -> Result<Vec<String>>;

    /// Interactive login
    async fn login(&self) -> Result<()>;

    async fn logout(&self) -> Result<()>;

    /// Create a project and return its id
    async fn create_project(&self, name: &str) -> Result<String>;

    async fn create_cluster(&self, project_id: &str, spec: &ClusterSpec) -> Result<()>;

    async fn create_db_user(&self, project_id: &str, user: &DatabaseUser) -> Result<()>;

    /// Whether a database user with this name exists in the project
    async fn db_user_exists(&self, project_id: &str, username: &str) -> Result<bool>;

    async fn create_access_rule(&self, project_id: &str, rule: &AccessRule) -> Result<()>;

    async fn cluster_status(&self, project_id: &str, cluster_name: &str) -> Result<ClusterStatus>;

    /// Raw connection string template (no credentials, no database)
    async fn connection_template(&self, project_id: &str, cluster_name: &str) -> Result<String>;
}

/// Cluster state as reported by Atlas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterStatus {
    Creating,
    /// Ready for connections
    Idle,
    /// Anything else, kept verbatim
    Other(String),
}

impl ClusterStatus {
    pub fn parse(state: &str) -> Self {
        match state.trim() {
            "CREATING" => Self::Creating,
            "IDLE" => Self::Idle,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterStatus::Creating => write!(f, "CREATING"),
            ClusterStatus::Idle => write!(f, "IDLE"),
            ClusterStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Shape of the cluster to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpec {
    pub name: String,
    pub provider: String,
    pub region: String,
    pub tier: String,
}

impl ClusterSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: "AWS".to_string(),
            region: "US_EAST_1".to_string(),
            tier: "M0".to_string(),
        }
    }
}

/// Database user to create
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseUser {
    pub username: String,
    pub password: String,
    pub role: String,
}

impl DatabaseUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role: "readWriteAnyDatabase".to_string(),
        }
    }
}

// Keep the password out of debug output and logs
impl fmt::Debug for DatabaseUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseUser")
            .field("username", &self.username)
            .field("password", &"***")
            .field("role", &self.role)
            .finish()
    }
}

/// IP access list entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub cidr: String,
    pub comment: String,
}

impl Default for AccessRule {
    fn default() -> Self {
        Self {
            cidr: "0.0.0.0/0".to_string(),
            comment: "Allow access from anywhere".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_status_parse() {
        assert_eq!(ClusterStatus::parse("CREATING"), ClusterStatus::Creating);
        assert_eq!(ClusterStatus::parse("IDLE\n"), ClusterStatus::Idle);
        assert_eq!(
            ClusterStatus::parse("DELETING"),
            ClusterStatus::Other("DELETING".to_string())
        );
        assert_eq!(ClusterStatus::parse("REPAIRING").to_string(), "REPAIRING");
    }

    #[test]
    fn test_database_user_debug_hides_password() {
        let user = DatabaseUser::new("alice", "s3cret");
        let debug = format!("{:?}", user);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("s3cret"));
    }
}
