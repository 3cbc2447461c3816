//! Atlas provisioning pipeline
//!
//! Runs the provisioning steps in a fixed order:
//!
//! ```text
//! Authenticate → CreateProject → CreateCluster → CreateUser
//!     → OpenNetworkAccess → AwaitReady
//! ```
//!
//! A failed step aborts the rest of the run. Nothing is retried
//! automatically; the caller decides whether to run the pipeline again,
//! give up, or fall back to a manually entered connection string. Re-running
//! against a partially provisioned project is supported: steps that find
//! their work already done report [`StepOutcome::AlreadySatisfied`].

use crate::error::{ProvisionError, Result};
use crate::poller::{PollPolicy, Readiness, await_ready_with};
use crate::provider::{AccessRule, AtlasGateway, ClusterSpec, ClusterStatus, DatabaseUser};
use crate::record::{ProvisioningRecord, RecordStore};
use crate::step::{PipelineStep, StepOutcome};

/// Error text Atlas returns when the access list entry is already present.
/// This is the only failure text the pipeline treats as success.
const ACCESS_RULE_EXISTS: &str = "already exists";

/// Inputs of one provisioning run
#[derive(Debug, Clone)]
pub struct ProvisioningRequest {
    pub project_name: String,

    /// Reuse this project instead of creating one (resuming a previous run)
    pub existing_project_id: Option<String>,

    pub cluster: ClusterSpec,
    pub user: DatabaseUser,
    pub access_rule: AccessRule,
}

impl ProvisioningRequest {
    pub fn new(
        project_name: impl Into<String>,
        cluster: ClusterSpec,
        user: DatabaseUser,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            existing_project_id: None,
            cluster,
            user,
            access_rule: AccessRule::default(),
        }
    }

    /// Resume against an existing project
    pub fn resuming(mut self, project_id: impl Into<String>) -> Self {
        self.existing_project_id = Some(project_id.into());
        self
    }

    pub fn with_access_rule(mut self, rule: AccessRule) -> Self {
        self.access_rule = rule;
        self
    }

    fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.project_name.trim().is_empty() && self.existing_project_id.is_none() {
            missing.push("project name");
        }
        if self.cluster.name.trim().is_empty() {
            missing.push("cluster name");
        }
        if self.user.username.trim().is_empty() {
            missing.push("username");
        }
        if self.user.password.is_empty() {
            missing.push("password");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProvisionError::InvalidRecord(format!(
                "missing {}",
                missing.join(", ")
            )))
        }
    }
}

/// Progress hooks, called as the pipeline advances
pub trait PipelineObserver {
    fn step_started(&mut self, _step: PipelineStep) {}

    fn step_finished(&mut self, _step: PipelineStep, _outcome: &StepOutcome) {}

    /// Called after the record was written (or failed to be written)
    fn record_persisted(&mut self, _record: &ProvisioningRecord, _saved: bool) {}

    fn status_polled(&mut self, _attempt: u32, _status: &ClusterStatus) {}

    fn detail(&mut self, _message: &str) {}
}

/// Observer that ignores every event
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// How a completed run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Cluster is IDLE, the connection string can be resolved now
    Ready,
    /// Still being created; resolve later from the saved record
    InProgress,
    /// Cluster reported a status outside CREATING/IDLE
    Unexpected(ClusterStatus),
}

/// Summary of a run that reached the end of the pipeline
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub steps: Vec<(PipelineStep, StepOutcome)>,
    pub record: ProvisioningRecord,
    /// False if the record could not be written to disk
    pub record_saved: bool,
    pub readiness: Readiness,
}

impl PipelineReport {
    pub fn outcome(&self) -> PipelineOutcome {
        match &self.readiness {
            Readiness::Ready { .. } => PipelineOutcome::Ready,
            Readiness::TimedOut { .. } => PipelineOutcome::InProgress,
            Readiness::Unexpected(status) => PipelineOutcome::Unexpected(status.clone()),
        }
    }

    pub fn outcome_of(&self, step: PipelineStep) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, outcome)| outcome)
    }
}

/// Per-run state, owned by a single `run` call
#[derive(Default)]
struct RunState {
    project_id: Option<String>,
    record: Option<ProvisioningRecord>,
    record_saved: bool,
    readiness: Option<Readiness>,
}

/// Drives the provisioning steps against an [`AtlasGateway`]
pub struct Pipeline<'a> {
    gateway: &'a dyn AtlasGateway,
    store: &'a RecordStore,
    policy: PollPolicy,
}

impl<'a> Pipeline<'a> {
    pub fn new(gateway: &'a dyn AtlasGateway, store: &'a RecordStore, policy: PollPolicy) -> Self {
        Self {
            gateway,
            store,
            policy,
        }
    }

    /// Run every step in order
    ///
    /// Returns [`ProvisionError::ToolMissing`] if the atlas CLI is missing and
    /// cannot be installed, and [`ProvisionError::StepFailed`] for the first
    /// step that fails. The record is written right after the cluster step,
    /// so it survives a later failure, a readiness timeout or an interrupted
    /// process.
    pub async fn run(
        &self,
        request: &ProvisioningRequest,
        observer: &mut dyn PipelineObserver,
    ) -> Result<PipelineReport> {
        request.validate()?;
        self.ensure_tool(observer).await?;

        let mut state = RunState {
            project_id: request.existing_project_id.clone(),
            ..Default::default()
        };
        let mut steps = Vec::with_capacity(PipelineStep::ALL.len());

        for step in PipelineStep::ALL {
            tracing::info!(step = step.id(), "Starting step");
            observer.step_started(step);

            let outcome = match self.execute(step, request, &mut state, observer).await {
                Ok(outcome) => outcome,
                Err(e) => StepOutcome::failed(e.detail()),
            };

            observer.step_finished(step, &outcome);
            steps.push((step, outcome.clone()));

            if let StepOutcome::Failed { detail } = outcome {
                tracing::error!(step = step.id(), %detail, "Step failed, aborting pipeline");
                return Err(ProvisionError::StepFailed { step, detail });
            }
        }

        match (state.record, state.readiness) {
            (Some(record), Some(readiness)) => Ok(PipelineReport {
                steps,
                record,
                record_saved: state.record_saved,
                readiness,
            }),
            _ => Err(ProvisionError::StepFailed {
                step: PipelineStep::AwaitReady,
                detail: "pipeline finished without a cluster record".to_string(),
            }),
        }
    }

    /// Make sure the atlas CLI is available, installing it once if needed
    async fn ensure_tool(&self, observer: &mut dyn PipelineObserver) -> Result<()> {
        if self.gateway.is_installed().await {
            return Ok(());
        }

        tracing::warn!("atlas CLI not found, attempting installation");
        observer.detail("atlas CLI not found, installing it...");

        if let Err(e) = self.gateway.install().await {
            tracing::warn!(error = %e, "atlas CLI installation failed");
            return Err(ProvisionError::ToolMissing);
        }

        if self.gateway.is_installed().await {
            observer.detail("atlas CLI installed");
            Ok(())
        } else {
            Err(ProvisionError::ToolMissing)
        }
    }

    async fn execute(
        &self,
        step: PipelineStep,
        request: &ProvisioningRequest,
        state: &mut RunState,
        observer: &mut dyn PipelineObserver,
    ) -> Result<StepOutcome> {
        match step {
            PipelineStep::Authenticate => self.authenticate().await,
            PipelineStep::CreateProject => self.create_project(request, state).await,
            PipelineStep::CreateCluster => {
                let outcome = self.create_cluster(request, state).await?;
                self.persist_record(request, state, observer).await?;
                Ok(outcome)
            }
            PipelineStep::CreateUser => self.create_user(request, state).await,
            PipelineStep::OpenNetworkAccess => self.open_network_access(request, state).await,
            PipelineStep::AwaitReady => self.await_ready(request, state, observer).await,
        }
    }

    async fn authenticate(&self) -> Result<StepOutcome> {
        let profiles = match self.gateway.list_profiles().await {
            Ok(profiles) => profiles,
            Err(ProvisionError::ToolMissing) => return Err(ProvisionError::ToolMissing),
            Err(e) => {
                // Fresh installs have no config file yet, so listing fails
                tracing::debug!(error = %e, "Could not list atlas profiles, logging in");
                Vec::new()
            }
        };
        if let Some(profile) = profiles.first() {
            tracing::debug!(%profile, "Existing atlas profile found, skipping login");
            return Ok(StepOutcome::already_satisfied(format!(
                "already logged in with profile {}",
                profile
            )));
        }

        self.gateway.login().await?;
        Ok(StepOutcome::succeeded_with("Logged in to MongoDB Atlas"))
    }

    async fn create_project(
        &self,
        request: &ProvisioningRequest,
        state: &mut RunState,
    ) -> Result<StepOutcome> {
        if let Some(project_id) = &state.project_id {
            return Ok(StepOutcome::already_satisfied(format!(
                "using existing project {}",
                project_id
            )));
        }

        let project_id = self.gateway.create_project(&request.project_name).await?;
        tracing::info!(%project_id, "Project created");
        let message = format!("Project created with ID: {}", project_id);
        state.project_id = Some(project_id);
        Ok(StepOutcome::succeeded_with(message))
    }

    async fn create_cluster(
        &self,
        request: &ProvisioningRequest,
        state: &mut RunState,
    ) -> Result<StepOutcome> {
        let project_id = require_project(state)?;

        // Only a resumed run can already own the cluster
        if request.existing_project_id.is_some()
            && let Ok(status) = self
                .gateway
                .cluster_status(project_id, &request.cluster.name)
                .await
        {
            return Ok(StepOutcome::already_satisfied(format!(
                "cluster {} already exists ({})",
                request.cluster.name, status
            )));
        }

        self.gateway
            .create_cluster(project_id, &request.cluster)
            .await?;
        Ok(StepOutcome::succeeded_with(format!(
            "Cluster {} creation initiated",
            request.cluster.name
        )))
    }

    async fn create_user(
        &self,
        request: &ProvisioningRequest,
        state: &RunState,
    ) -> Result<StepOutcome> {
        let project_id = require_project(state)?;
        let username = &request.user.username;

        // A resumed run may have created the user before it stopped
        if request.existing_project_id.is_some()
            && matches!(
                self.gateway.db_user_exists(project_id, username).await,
                Ok(true)
            )
        {
            return Ok(StepOutcome::already_satisfied(format!(
                "database user {} already exists",
                username
            )));
        }

        self.gateway
            .create_db_user(project_id, &request.user)
            .await?;
        Ok(StepOutcome::succeeded_with(format!(
            "Database user {} created",
            username
        )))
    }

    async fn persist_record(
        &self,
        request: &ProvisioningRequest,
        state: &mut RunState,
        observer: &mut dyn PipelineObserver,
    ) -> Result<()> {
        let record = ProvisioningRecord::new(
            require_project(state)?,
            request.cluster.name.as_str(),
            request.user.username.as_str(),
        )?;

        state.record_saved = match self.store.save(&record).await {
            Ok(()) => true,
            Err(ProvisionError::StoreUnavailable(reason)) => {
                tracing::error!(%reason, "Could not save provisioning record");
                observer.detail(&format!(
                    "Could not save provisioning record ({}). Note project {} / cluster {}",
                    reason,
                    record.project_id(),
                    record.cluster_name()
                ));
                false
            }
            Err(e) => return Err(e),
        };

        observer.record_persisted(&record, state.record_saved);
        state.record = Some(record);
        Ok(())
    }

    async fn open_network_access(
        &self,
        request: &ProvisioningRequest,
        state: &RunState,
    ) -> Result<StepOutcome> {
        let project_id = require_project(state)?;
        match self
            .gateway
            .create_access_rule(project_id, &request.access_rule)
            .await
        {
            Ok(()) => Ok(StepOutcome::succeeded_with("IP access list entry created")),
            Err(e) if access_rule_exists(&e) => {
                tracing::debug!("Access list entry already exists");
                Ok(StepOutcome::already_satisfied(
                    "IP access list entry already exists",
                ))
            }
            Err(e) => Err(e),
        }
    }

    async fn await_ready(
        &self,
        request: &ProvisioningRequest,
        state: &mut RunState,
        observer: &mut dyn PipelineObserver,
    ) -> Result<StepOutcome> {
        let project_id = require_project(state)?;
        let readiness = await_ready_with(
            self.gateway,
            project_id,
            &request.cluster.name,
            &self.policy,
            |attempt, status| observer.status_polled(attempt, status),
        )
        .await?;

        let outcome = match &readiness {
            Readiness::Ready { .. } => StepOutcome::succeeded_with("Cluster is ready"),
            Readiness::TimedOut { attempts } => StepOutcome::succeeded_with(format!(
                "Cluster still being created after {} checks, check again later",
                attempts
            )),
            Readiness::Unexpected(status) => {
                StepOutcome::succeeded_with(format!("Unexpected cluster status: {}", status))
            }
        };
        state.readiness = Some(readiness);
        Ok(outcome)
    }
}

fn require_project(state: &RunState) -> Result<&str> {
    state
        .project_id
        .as_deref()
        .ok_or_else(|| ProvisionError::StepFailed {
            step: PipelineStep::CreateProject,
            detail: "no project id available".to_string(),
        })
}

fn access_rule_exists(err: &ProvisionError) -> bool {
    matches!(err, ProvisionError::CommandFailed { detail, .. } if detail.contains(ACCESS_RULE_EXISTS))
}
