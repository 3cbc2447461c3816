//! Cluster readiness polling
//!
//! Atlas reports `CREATING` for several minutes after `clusters create`.
//! The poller queries the status at a fixed interval until the cluster is
//! `IDLE`, reports anything unexpected immediately, and gives up with
//! [`Readiness::TimedOut`] once the attempt budget is spent.

use crate::error::Result;
use crate::provider::{AtlasGateway, ClusterStatus};
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Polling budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait between two status queries
    pub interval: Duration,

    /// Maximum number of status queries
    pub max_attempts: u32,

    /// Optional limit on the whole wait
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 30,
            deadline: None,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Result of waiting for a cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Cluster reported IDLE after `attempts` queries
    Ready { attempts: u32 },
    /// Still CREATING when the budget ran out. Not a failure.
    TimedOut { attempts: u32 },
    /// A status outside CREATING/IDLE
    Unexpected(ClusterStatus),
}

/// Wait until the cluster is ready
pub async fn await_ready(
    gateway: &dyn AtlasGateway,
    project_id: &str,
    cluster_name: &str,
    policy: &PollPolicy,
) -> Result<Readiness> {
    await_ready_with(gateway, project_id, cluster_name, policy, |_, _| {}).await
}

/// Same as [`await_ready`], calling `on_status` after every query
pub async fn await_ready_with<F>(
    gateway: &dyn AtlasGateway,
    project_id: &str,
    cluster_name: &str,
    policy: &PollPolicy,
    mut on_status: F,
) -> Result<Readiness>
where
    F: FnMut(u32, &ClusterStatus),
{
    let started = Instant::now();
    let mut attempts = 0;

    while attempts < policy.max_attempts {
        attempts += 1;
        let status = gateway.cluster_status(project_id, cluster_name).await?;
        tracing::debug!(attempt = attempts, %status, cluster = %cluster_name, "Polled cluster status");
        on_status(attempts, &status);

        match status {
            ClusterStatus::Idle => return Ok(Readiness::Ready { attempts }),
            ClusterStatus::Creating => {}
            other => {
                tracing::warn!(status = %other, "Unexpected cluster status");
                return Ok(Readiness::Unexpected(other));
            }
        }

        if attempts >= policy.max_attempts {
            break;
        }

        if let Some(deadline) = policy.deadline
            && started.elapsed() + policy.interval > deadline
        {
            tracing::debug!("Readiness deadline reached after {} attempts", attempts);
            break;
        }

        sleep(policy.interval).await;
    }

    tracing::info!(
        attempts,
        cluster = %cluster_name,
        "Cluster is still being created"
    );
    Ok(Readiness::TimedOut { attempts })
}
