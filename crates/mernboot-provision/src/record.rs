//! Provisioning record persistence
//!
//! Manages the `atlas-config.json` file which remembers the project, cluster
//! and database user created by the last successful provisioning run, so the
//! connection string can be resolved later.

use crate::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Identifiers needed to rediscover a provisioned cluster
///
/// A record is always fully populated: every constructor and the loader
/// reject empty fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningRecord {
    project_id: String,
    cluster_name: String,
    username: String,
}

impl ProvisioningRecord {
    pub fn new(
        project_id: impl Into<String>,
        cluster_name: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<Self> {
        let record = Self {
            project_id: project_id.into(),
            cluster_name: cluster_name.into(),
            username: username.into(),
        };
        record.validate()?;
        Ok(record)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("projectId", &self.project_id),
            ("clusterName", &self.cluster_name),
            ("username", &self.username),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

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

/// Reads and writes the provisioning record file
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Load the record. A missing file is not an error.
    pub async fn load(&self) -> Result<Option<ProvisioningRecord>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Record file not found: {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(unavailable(&self.path, e)),
        };

        let record: ProvisioningRecord = serde_json::from_str(&content)
            .map_err(|e| ProvisionError::InvalidRecord(e.to_string()))?;
        record.validate()?;

        tracing::debug!(
            project_id = %record.project_id,
            cluster = %record.cluster_name,
            "Loaded provisioning record"
        );
        Ok(Some(record))
    }

    /// Save the record, replacing any previous one
    ///
    /// The content is written to a sibling temp file first and then renamed
    /// over the target, so readers never observe a half-written record.
    pub async fn save(&self, record: &ProvisioningRecord) -> Result<()> {
        record.validate()?;

        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| unavailable(dir, e))?;
        }

        let content = serde_json::to_string_pretty(record)?;
        let temp = self.temp_path();
        fs::write(&temp, content)
            .await
            .map_err(|e| unavailable(&temp, e))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| unavailable(&self.path, e))?;

        tracing::debug!("Saved provisioning record to {}", self.path.display());
        Ok(())
    }
}

fn unavailable(path: &Path, err: std::io::Error) -> ProvisionError {
    ProvisionError::StoreUnavailable(format!("{}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_record_save_load() {
        let temp_dir = tempdir().unwrap();
        let store = RecordStore::new(temp_dir.path().join("mernboot").join("atlas-config.json"));

        let record = ProvisioningRecord::new("p1", "c1", "u1").unwrap();
        store.save(&record).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, Some(record));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_missing_record_is_absent() {
        let temp_dir = tempdir().unwrap();
        let store = RecordStore::new(temp_dir.path().join("atlas-config.json"));

        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_record() {
        let temp_dir = tempdir().unwrap();
        let store = RecordStore::new(temp_dir.path().join("atlas-config.json"));

        store
            .save(&ProvisioningRecord::new("p1", "c1", "u1").unwrap())
            .await
            .unwrap();
        let second = ProvisioningRecord::new("p2", "c2", "u2").unwrap();
        store.save(&second).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_on_disk_format_is_camel_case() {
        let temp_dir = tempdir().unwrap();
        let store = RecordStore::new(temp_dir.path().join("atlas-config.json"));
        store
            .save(&ProvisioningRecord::new("p1", "c1", "u1").unwrap())
            .await
            .unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["projectId"], "p1");
        assert_eq!(value["clusterName"], "c1");
        assert_eq!(value["username"], "u1");
    }

    #[tokio::test]
    async fn test_unknown_fields_are_ignored() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("atlas-config.json");
        std::fs::write(
            &path,
            r#"{"projectId":"p1","clusterName":"c1","username":"u1","createdBy":"legacy"}"#,
        )
        .unwrap();

        let loaded = RecordStore::new(&path).load().await.unwrap().unwrap();
        assert_eq!(loaded.project_id(), "p1");
    }

    #[tokio::test]
    async fn test_partial_record_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("atlas-config.json");
        std::fs::write(&path, r#"{"projectId":"p1","clusterName":"c1"}"#).unwrap();
        let result = RecordStore::new(&path).load().await;
        assert!(matches!(result, Err(ProvisionError::InvalidRecord(_))));

        std::fs::write(
            &path,
            r#"{"projectId":"p1","clusterName":"","username":"u1"}"#,
        )
        .unwrap();
        let result = RecordStore::new(&path).load().await;
        assert!(matches!(result, Err(ProvisionError::InvalidRecord(_))));
    }

    #[test]
    fn test_new_rejects_empty_fields() {
        let err = ProvisioningRecord::new("p1", " ", "").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("clusterName"));
        assert!(message.contains("username"));
    }

    #[tokio::test]
    async fn test_store_unavailable_on_fs_error() {
        let temp_dir = tempdir().unwrap();
        // A regular file where the parent directory should be
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = RecordStore::new(blocker.join("atlas-config.json"));

        let result = store
            .save(&ProvisioningRecord::new("p1", "c1", "u1").unwrap())
            .await;
        assert!(matches!(result, Err(ProvisionError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unreadable_record_is_not_absent() {
        let temp_dir = tempdir().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = RecordStore::new(blocker.join("atlas-config.json"));

        let result = store.load().await;
        assert!(matches!(result, Err(ProvisionError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_directory_in_place_of_record_is_unavailable() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("atlas-config.json");
        std::fs::create_dir(&path).unwrap();

        let result = RecordStore::new(&path).load().await;
        assert!(matches!(result, Err(ProvisionError::StoreUnavailable(_))));
    }
}
