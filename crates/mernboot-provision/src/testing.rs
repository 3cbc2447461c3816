//! Scripted in-memory gateway used by the unit tests

use crate::error::{ProvisionError, Result};
use crate::provider::{AccessRule, AtlasGateway, ClusterSpec, ClusterStatus, DatabaseUser};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

struct FakeState {
    installed: bool,
    install_succeeds: bool,
    profiles: Vec<String>,
    project_id: String,
    user_exists: bool,
    failures: HashMap<&'static str, String>,
    statuses: VecDeque<ClusterStatus>,
    template: std::result::Result<String, String>,
    calls: Vec<&'static str>,
}

pub struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                installed: true,
                install_succeeds: false,
                profiles: vec!["default".to_string()],
                project_id: "p1".to_string(),
                user_exists: false,
                failures: HashMap::new(),
                statuses: VecDeque::new(),
                template: Ok("mongodb+srv://c1.example.net".to_string()),
                calls: Vec::new(),
            }),
        }
    }

    pub fn not_installed(self, install_succeeds: bool) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.installed = false;
            state.install_succeeds = install_succeeds;
        }
        self
    }

    pub fn without_profiles(self) -> Self {
        self.state.lock().unwrap().profiles.clear();
        self
    }

    pub fn with_existing_user(self) -> Self {
        self.state.lock().unwrap().user_exists = true;
        self
    }

    /// Make `op` fail with the given stderr text
    pub fn failing(self, op: &'static str, detail: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(op, detail.to_string());
        self
    }

    pub fn with_statuses(self, statuses: impl IntoIterator<Item = ClusterStatus>) -> Self {
        self.state.lock().unwrap().statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_template(self, template: std::result::Result<&str, &str>) -> Self {
        self.state.lock().unwrap().template = template
            .map(str::to_string)
            .map_err(str::to_string);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| **c == op).count()
    }

    fn record(&self, op: &'static str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op);
        match state.failures.get(op) {
            Some(detail) => Err(ProvisionError::CommandFailed {
                command: format!("atlas {}", op),
                detail: detail.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AtlasGateway for FakeGateway {
    async fn is_installed(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        state.calls.push("is_installed");
        state.installed
    }

    async fn install(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("install");
        if state.install_succeeds {
            state.installed = true;
            Ok(())
        } else {
            Err(ProvisionError::ToolMissing)
        }
    }

    async fn list_profiles(&self) -> Result<Vec<String>> {
        self.record("list_profiles")?;
        Ok(self.state.lock().unwrap().profiles.clone())
    }

    async fn login(&self) -> Result<()> {
        self.record("login")
    }

    async fn logout(&self) -> Result<()> {
        self.record("logout")
    }

    async fn create_project(&self, _name: &str) -> Result<String> {
        self.record("create_project")?;
        Ok(self.state.lock().unwrap().project_id.clone())
    }

    async fn create_cluster(&self, _project_id: &str, _spec: &ClusterSpec) -> Result<()> {
        self.record("create_cluster")
    }

    async fn create_db_user(&self, _project_id: &str, _user: &DatabaseUser) -> Result<()> {
        self.record("create_db_user")
    }

    async fn db_user_exists(&self, _project_id: &str, _username: &str) -> Result<bool> {
        self.record("db_user_exists")?;
        Ok(self.state.lock().unwrap().user_exists)
    }

    async fn create_access_rule(&self, _project_id: &str, _rule: &AccessRule) -> Result<()> {
        self.record("create_access_rule")
    }

    async fn cluster_status(&self, _project_id: &str, cluster_name: &str) -> Result<ClusterStatus> {
        self.record("cluster_status")?;
        self.state
            .lock()
            .unwrap()
            .statuses
            .pop_front()
            .ok_or_else(|| ProvisionError::CommandFailed {
                command: "atlas cluster_status".to_string(),
                detail: format!("cluster {} not found", cluster_name),
            })
    }

    async fn connection_template(&self, _project_id: &str, _cluster_name: &str) -> Result<String> {
        self.record("connection_template")?;
        self.state
            .lock()
            .unwrap()
            .template
            .clone()
            .map_err(|detail| ProvisionError::CommandFailed {
                command: "atlas connection_template".to_string(),
                detail,
            })
    }
}
