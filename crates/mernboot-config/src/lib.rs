//! MERNBoot configuration
//!
//! Resolves the per-user configuration directory and loads the optional
//! `settings.yaml` that tunes Atlas provisioning (polling budget, cluster
//! shape, access rule, env file name).

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides the configuration directory (mainly for tests and CI)
pub const CONFIG_DIR_ENV: &str = "MERNBOOT_CONFIG_DIR";
pub const POLL_INTERVAL_ENV: &str = "MERNBOOT_POLL_INTERVAL_SECS";
pub const MAX_POLL_ATTEMPTS_ENV: &str = "MERNBOOT_MAX_POLL_ATTEMPTS";

const APP_DIR: &str = "mernboot";
const RECORD_FILE: &str = "atlas-config.json";
const SETTINGS_FILE: &str = "settings.yaml";

/// Get the MERNBoot configuration directory, creating it if missing
///
/// Resolution order:
/// 1. `MERNBOOT_CONFIG_DIR`
/// 2. `<platform config dir>/mernboot` (e.g. `~/.config/mernboot`)
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::config_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(APP_DIR),
    };

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        tracing::debug!("Created config directory: {}", config_dir.display());
    }

    Ok(config_dir)
}

/// Path of the persisted provisioning record
pub fn record_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(RECORD_FILE))
}

/// Path of the optional settings file
pub fn settings_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(SETTINGS_FILE))
}

/// Tunables for Atlas provisioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between cluster status queries
    pub poll_interval_secs: u64,

    /// Maximum number of status queries before reporting "still in progress"
    pub max_poll_attempts: u32,

    /// Optional hard limit on the whole readiness wait
    pub poll_deadline_secs: Option<u64>,

    pub provider: String,
    pub region: String,
    pub tier: String,
    pub default_cluster_name: String,

    /// Role granted to the database user
    pub user_role: String,

    pub access_cidr: String,
    pub access_comment: String,

    /// Environment file that receives MONGO_URI
    pub env_file: String,

    /// Command used to install the atlas CLI when it is missing
    pub install_command: Option<Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            max_poll_attempts: 30,
            poll_deadline_secs: None,
            provider: "AWS".to_string(),
            region: "US_EAST_1".to_string(),
            tier: "M0".to_string(),
            default_cluster_name: "myCluster".to_string(),
            user_role: "readWriteAnyDatabase".to_string(),
            access_cidr: "0.0.0.0/0".to_string(),
            access_comment: "Allow access from anywhere".to_string(),
            env_file: ".env".to_string(),
            install_command: None,
        }
    }
}

impl Settings {
    /// Load settings from the configuration directory, then apply env overrides
    pub fn load() -> Result<Self> {
        let path = settings_path()?;
        let settings = Self::load_from(&path)?;
        settings.with_env_overrides()
    }

    /// Load settings from a specific file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Settings file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Self =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::InvalidSettings {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if settings.max_poll_attempts == 0 {
            return Err(ConfigError::InvalidSettings {
                path: path.to_path_buf(),
                message: "max_poll_attempts must be at least 1".to_string(),
            });
        }
        Ok(settings)
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(secs) = env_number::<u64>(POLL_INTERVAL_ENV)? {
            self.poll_interval_secs = secs;
        }
        match env_number::<u32>(MAX_POLL_ATTEMPTS_ENV)? {
            Some(0) => {
                return Err(ConfigError::InvalidEnvValue {
                    name: MAX_POLL_ATTEMPTS_ENV.to_string(),
                    value: "0".to_string(),
                });
            }
            Some(attempts) => self.max_poll_attempts = attempts,
            None => {}
        }
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_deadline(&self) -> Option<Duration> {
        self.poll_deadline_secs.map(Duration::from_secs)
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvValue {
                name: name.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    #[serial]
    fn test_config_dir_env_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = temp_dir.path().join("nested").join("mernboot");

        temp_env::with_var(CONFIG_DIR_ENV, Some(target.as_os_str()), || {
            let dir = get_config_dir().unwrap();
            assert_eq!(dir, target);
            assert!(dir.exists());
            assert_eq!(record_path().unwrap(), target.join("atlas-config.json"));
        });
    }

    #[test]
    fn test_settings_missing_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&temp_dir.path().join("settings.yaml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.poll_interval(), Duration::from_secs(10));
        assert_eq!(settings.max_poll_attempts, 30);
    }

    #[test]
    fn test_settings_partial_file_keeps_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.yaml");
        fs::write(
            &path,
            "tier: M10\nregion: EU_WEST_1\nunknown_key: ignored\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.tier, "M10");
        assert_eq!(settings.region, "EU_WEST_1");
        assert_eq!(settings.provider, "AWS");
        assert_eq!(settings.default_cluster_name, "myCluster");
    }

    #[test]
    fn test_settings_invalid_yaml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.yaml");
        fs::write(&path, "max_poll_attempts: [not, a, number]\n").unwrap();

        let result = Settings::load_from(&path);
        assert!(matches!(result, Err(ConfigError::InvalidSettings { .. })));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let temp_dir = tempfile::tempdir().unwrap();

        temp_env::with_vars(
            [
                (CONFIG_DIR_ENV, Some(temp_dir.path().to_str().unwrap())),
                (POLL_INTERVAL_ENV, Some("2")),
                (MAX_POLL_ATTEMPTS_ENV, Some("5")),
            ],
            || {
                let settings = Settings::load().unwrap();
                assert_eq!(settings.poll_interval(), Duration::from_secs(2));
                assert_eq!(settings.max_poll_attempts, 5);
            },
        );
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_garbage() {
        let temp_dir = tempfile::tempdir().unwrap();

        temp_env::with_vars(
            [
                (CONFIG_DIR_ENV, Some(temp_dir.path().to_str().unwrap())),
                (MAX_POLL_ATTEMPTS_ENV, Some("many")),
            ],
            || {
                let result = Settings::load();
                assert!(matches!(result, Err(ConfigError::InvalidEnvValue { .. })));
            },
        );
    }

    #[test]
    fn test_settings_zero_poll_attempts_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.yaml");
        fs::write(&path, "max_poll_attempts: 0
").unwrap();

        match Settings::load_from(&path) {
            Err(ConfigError::InvalidSettings { message, .. }) => {
                assert!(message.contains("max_poll_attempts"))
            }
            other => panic!("expected InvalidSettings, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_zero_attempts() {
        let temp_dir = tempfile::tempdir().unwrap();

        temp_env::with_vars(
            [
                (CONFIG_DIR_ENV, Some(temp_dir.path().to_str().unwrap())),
                (MAX_POLL_ATTEMPTS_ENV, Some("0")),
            ],
            || {
                let result = Settings::load();
                assert!(matches!(
                    result,
                    Err(ConfigError::InvalidEnvValue { ref name, .. }) if name == MAX_POLL_ATTEMPTS_ENV
                ));
            },
        );
    }

    #[test]
    fn test_unreadable_settings_file_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.yaml");
        fs::create_dir(&path).unwrap();

        assert!(matches!(
            Settings::load_from(&path),
            Err(ConfigError::Io(_))
        ));
    }
}
