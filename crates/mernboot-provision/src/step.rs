//! Pipeline steps and their outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provisioning steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    /// Atlas login (skipped when a profile already exists)
    Authenticate,
    CreateProject,
    CreateCluster,
    /// Database user creation
    CreateUser,
    /// IP access list entry
    OpenNetworkAccess,
    /// Wait until the cluster reports IDLE
    AwaitReady,
}

impl PipelineStep {
    /// All steps in the fixed order the orchestrator runs them
    pub const ALL: [PipelineStep; 6] = [
        Self::Authenticate,
        Self::CreateProject,
        Self::CreateCluster,
        Self::CreateUser,
        Self::OpenNetworkAccess,
        Self::AwaitReady,
    ];

    /// Human readable step name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authenticate => "Authenticate",
            Self::CreateProject => "Create project",
            Self::CreateCluster => "Create cluster",
            Self::CreateUser => "Create database user",
            Self::OpenNetworkAccess => "Open network access",
            Self::AwaitReady => "Wait for cluster",
        }
    }

    /// Short identifier used in logs
    pub fn id(&self) -> &'static str {
        match self {
            Self::Authenticate => "auth",
            Self::CreateProject => "project",
            Self::CreateCluster => "cluster",
            Self::CreateUser => "user",
            Self::OpenNetworkAccess => "access",
            Self::AwaitReady => "ready",
        }
    }

    /// Position in the pipeline (0-based)
    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or(Self::ALL.len())
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a single step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded { message: Option<String> },
    /// Idempotent no-op (already logged in, rule already exists, ...)
    AlreadySatisfied { reason: String },
    Failed { detail: String },
}

impl StepOutcome {
    pub fn succeeded() -> Self {
        Self::Succeeded { message: None }
    }

    pub fn succeeded_with(message: impl Into<String>) -> Self {
        Self::Succeeded {
            message: Some(message.into()),
        }
    }

    pub fn already_satisfied(reason: impl Into<String>) -> Self {
        Self::AlreadySatisfied {
            reason: reason.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self::Failed {
            detail: detail.into(),
        }
    }

    /// Whether the pipeline may advance past this step
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::AlreadySatisfied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        let mut sorted = PipelineStep::ALL;
        sorted.sort();
        assert_eq!(sorted, PipelineStep::ALL);
        assert_eq!(PipelineStep::Authenticate.index(), 0);
        assert_eq!(PipelineStep::AwaitReady.index(), 5);
    }

    #[test]
    fn test_outcome_success() {
        assert!(StepOutcome::succeeded().is_success());
        assert!(StepOutcome::already_satisfied("rule exists").is_success());
        assert!(!StepOutcome::failed("boom").is_success());
    }
}
