//! MongoDB Atlas gateway implementation

use crate::cli::{AtlasCli, OutputMode};
use crate::error::AtlasError;
use crate::parse::{
    parse_connection_template, parse_profiles, parse_project_id, parse_state_name,
};
use async_trait::async_trait;
use mernboot_provision::{
    AccessRule, AtlasGateway, ClusterSpec, ClusterStatus, DatabaseUser, ProvisionError,
};

type ProvisionResult<T> = mernboot_provision::Result<T>;

/// Install command for the current platform, if one is known
pub fn default_install_command() -> Option<Vec<String>> {
    let command: &[&str] = if cfg!(target_os = "windows") {
        &["winget", "install", "-e", "--id", "MongoDB.MongoDBAtlasCLI"]
    } else if cfg!(target_os = "macos") {
        &["brew", "install", "mongodb-atlas-cli"]
    } else {
        return None;
    };
    Some(command.iter().map(|s| s.to_string()).collect())
}

/// Atlas gateway backed by the `atlas` CLI
pub struct AtlasProvider {
    cli: AtlasCli,
    install_command: Option<Vec<String>>,
}

impl Default for AtlasProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AtlasProvider {
    pub fn new() -> Self {
        Self {
            cli: AtlasCli::new(),
            install_command: default_install_command(),
        }
    }

    pub fn with_cli(mut self, cli: AtlasCli) -> Self {
        self.cli = cli;
        self
    }

    /// Override the platform install command. `None` keeps the default.
    pub fn with_install_command(mut self, command: Option<Vec<String>>) -> Self {
        if command.is_some() {
            self.install_command = command;
        }
        self
    }

    pub fn cli(&self) -> &AtlasCli {
        &self.cli
    }

    async fn capture(&self, args: &[&str]) -> ProvisionResult<String> {
        Ok(self.cli.run_checked(args, OutputMode::Capture).await?)
    }

    async fn stream(&self, args: &[&str]) -> ProvisionResult<()> {
        self.cli.run_checked(args, OutputMode::Stream).await?;
        Ok(())
    }

    fn unparsable(&self, args: &[&str], output: &str) -> ProvisionError {
        AtlasError::UnparsableOutput {
            command: self.cli.display(args),
            output: output.trim().to_string(),
        }
        .into()
    }
}

#[async_trait]
impl AtlasGateway for AtlasProvider {
    async fn is_installed(&self) -> bool {
        match self.cli.version().await {
            Ok(version) => {
                tracing::debug!(%version, "atlas CLI found");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "atlas CLI not available");
                false
            }
        }
    }

    async fn install(&self) -> ProvisionResult<()> {
        let Some((program, args)) = self
            .install_command
            .as_ref()
            .and_then(|command| command.split_first())
        else {
            return Err(AtlasError::NoInstallCommand.into());
        };

        tracing::info!("Installing atlas CLI with {}", program);
        let installer = AtlasCli::with_command(program.as_str(), args.iter().cloned());
        installer.run_checked(&[], OutputMode::Stream).await?;
        Ok(())
    }

    async fn list_profiles(&self) -> ProvisionResult<Vec<String>> {
        let output = self.capture(&["config", "list"]).await?;
        Ok(parse_profiles(&output))
    }

    async fn login(&self) -> ProvisionResult<()> {
        self.stream(&["auth", "login"]).await
    }

    async fn logout(&self) -> ProvisionResult<()> {
        self.stream(&["auth", "logout", "--force"]).await
    }

    async fn create_project(&self, name: &str) -> ProvisionResult<String> {
        let args = ["projects", "create", name, "-o", "json"];
        let output = self.capture(&args).await?;
        parse_project_id(&output).ok_or_else(|| self.unparsable(&args, &output))
    }

    async fn create_cluster(&self, project_id: &str, spec: &ClusterSpec) -> ProvisionResult<()> {
        self.capture(&[
            "clusters",
            "create",
            spec.name.as_str(),
            "--projectId",
            project_id,
            "--provider",
            spec.provider.as_str(),
            "--region",
            spec.region.as_str(),
            "--tier",
            spec.tier.as_str(),
        ])
        .await?;
        Ok(())
    }

    async fn create_db_user(&self, project_id: &str, user: &DatabaseUser) -> ProvisionResult<()> {
        self.capture(&[
            "dbusers",
            "create",
            "--username",
            user.username.as_str(),
            "--password",
            user.password.as_str(),
            "--projectId",
            project_id,
            "--role",
            user.role.as_str(),
        ])
        .await?;
        Ok(())
    }

    async fn db_user_exists(&self, project_id: &str, username: &str) -> ProvisionResult<bool> {
        let args = [
            "dbusers",
            "describe",
            username,
            "--projectId",
            project_id,
            "-o",
            "json",
        ];
        match self.capture(&args).await {
            Ok(_) => Ok(true),
            Err(ProvisionError::CommandFailed { detail, .. }) => {
                tracing::debug!(%username, %detail, "Database user not found");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_access_rule(&self, project_id: &str, rule: &AccessRule) -> ProvisionResult<()> {
        self.capture(&[
            "accessLists",
            "create",
            rule.cidr.as_str(),
            "--comment",
            rule.comment.as_str(),
            "--projectId",
            project_id,
        ])
        .await?;
        Ok(())
    }

    async fn cluster_status(
        &self,
        project_id: &str,
        cluster_name: &str,
    ) -> ProvisionResult<ClusterStatus> {
        let args = [
            "clusters",
            "describe",
            cluster_name,
            "--projectId",
            project_id,
            "-o",
            "json",
        ];
        let output = self.capture(&args).await?;
        parse_state_name(&output)
            .map(|state| ClusterStatus::parse(&state))
            .ok_or_else(|| self.unparsable(&args, &output))
    }

    async fn connection_template(
        &self,
        project_id: &str,
        cluster_name: &str,
    ) -> ProvisionResult<String> {
        let output = self
            .capture(&[
                "clusters",
                "connectionStrings",
                "describe",
                cluster_name,
                "--projectId",
                project_id,
            ])
            .await?;
        Ok(parse_connection_template(&output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    /// Shell script standing in for `atlas`, answering by subcommand
    const FAKE_ATLAS: &str = r#"
case "$1 $2" in
  "--version ") echo "atlascli version: 1.20.0" ;;
  "config list") printf 'PROFILE NAME\ndefault\n' ;;
  "projects create") echo '{"id":"p1","name":"'"$3"'"}' ;;
  "clusters create") echo "Cluster '$3' is being created." ;;
  "clusters describe") echo '{"name":"'"$3"'","stateName":"CREATING"}' ;;
  "clusters connectionStrings") printf 'STANDARD CONNECTION STRING\nmongodb+srv://c1.example.net\n' ;;
  "accessLists create") echo "Error: IP address $3 already exists" >&2; exit 1 ;;
  "dbusers create") echo "Error: weak password" >&2; exit 1 ;;
  "dbusers describe")
    if [ "$3" = "u1" ]; then echo '{"username":"u1","databaseName":"admin"}'
    else echo "Error: USER_NOT_FOUND" >&2; exit 1; fi ;;
  *) echo "unknown command" >&2; exit 2 ;;
esac
"#;

    fn fake_provider(dir: &Path) -> AtlasProvider {
        let script = dir.join("atlas.sh");
        std::fs::write(&script, FAKE_ATLAS).unwrap();
        AtlasProvider::new().with_cli(AtlasCli::with_command(
            "sh",
            [script.to_string_lossy().to_string()],
        ))
    }

    #[test]
    fn test_default_install_command() {
        let command = default_install_command();
        if cfg!(target_os = "macos") {
            assert_eq!(
                command,
                Some(vec![
                    "brew".to_string(),
                    "install".to_string(),
                    "mongodb-atlas-cli".to_string()
                ])
            );
        } else if cfg!(target_os = "windows") {
            assert_eq!(command.unwrap()[0], "winget");
        } else {
            assert_eq!(command, None);
        }
    }

    #[test]
    fn test_install_command_override() {
        let provider = AtlasProvider::new()
            .with_install_command(Some(vec!["npm".to_string(), "i".to_string()]));
        assert_eq!(
            provider.install_command,
            Some(vec!["npm".to_string(), "i".to_string()])
        );
    }

    #[tokio::test]
    async fn test_install_without_command_is_tool_missing() {
        let mut provider = AtlasProvider::new();
        provider.install_command = None;
        let result = provider.install().await;
        assert!(matches!(result, Err(ProvisionError::ToolMissing)));
    }

    #[tokio::test]
    async fn test_missing_atlas_is_not_installed() {
        let provider = AtlasProvider::new().with_cli(AtlasCli::with_command(
            "mernboot-no-such-atlas",
            Vec::<String>::new(),
        ));
        assert!(!provider.is_installed().await);
        assert!(matches!(
            provider.list_profiles().await,
            Err(ProvisionError::ToolMissing)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_gateway_against_scripted_cli() {
        let temp_dir = tempdir().unwrap();
        let provider = fake_provider(temp_dir.path());

        assert!(provider.is_installed().await);
        assert_eq!(provider.list_profiles().await.unwrap(), vec!["default"]);
        assert_eq!(provider.create_project("demo").await.unwrap(), "p1");
        provider
            .create_cluster("p1", &ClusterSpec::new("c1"))
            .await
            .unwrap();
        assert_eq!(
            provider.cluster_status("p1", "c1").await.unwrap(),
            ClusterStatus::Creating
        );
        assert_eq!(
            provider.connection_template("p1", "c1").await.unwrap(),
            "mongodb+srv://c1.example.net"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failures_carry_stderr_and_hide_password() {
        let temp_dir = tempdir().unwrap();
        let provider = fake_provider(temp_dir.path());

        match provider
            .create_access_rule("p1", &AccessRule::default())
            .await
        {
            Err(ProvisionError::CommandFailed { detail, .. }) => {
                assert!(detail.contains("already exists"))
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }

        match provider
            .create_db_user("p1", &DatabaseUser::new("u1", "hunter2"))
            .await
        {
            Err(ProvisionError::CommandFailed { command, detail }) => {
                assert_eq!(detail, "Error: weak password");
                assert!(!command.contains("hunter2"));
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_db_user_exists() {
        let temp_dir = tempdir().unwrap();
        let provider = fake_provider(temp_dir.path());

        assert!(provider.db_user_exists("p1", "u1").await.unwrap());
        assert!(!provider.db_user_exists("p1", "someone-else").await.unwrap());
    }

    #[tokio::test]
    async fn test_db_user_exists_without_atlas_is_tool_missing() {
        let provider = AtlasProvider::new().with_cli(AtlasCli::with_command(
            "mernboot-no-such-atlas",
            Vec::<String>::new(),
        ));
        assert!(matches!(
            provider.db_user_exists("p1", "u1").await,
            Err(ProvisionError::ToolMissing)
        ));
    }
}
