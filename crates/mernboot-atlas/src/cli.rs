//! atlas CLI wrapper
//!
//! Runs `atlas` subcommands either capturing their output for parsing or
//! streaming it to the terminal (interactive login, package installers).

use crate::error::{AtlasError, Result};
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::process::Command;

const ATLAS_BIN: &str = "atlas";

/// Flags whose value must never appear in logs or error messages
const SECRET_FLAGS: [&str; 1] = ["--password"];

/// How the child process' stdio is wired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Pipe stdout/stderr so the caller can parse them
    Capture,
    /// Inherit stdio; the user sees the output and can interact
    Stream,
}

/// Result of a finished command. In `Stream` mode stdout/stderr are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Text to report when the command failed
    fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        "command exited with a non-zero status".to_string()
    }
}

/// atlas CLI wrapper
#[derive(Debug, Clone)]
pub struct AtlasCli {
    program: String,
    base_args: Vec<String>,
}

impl Default for AtlasCli {
    fn default() -> Self {
        Self::new()
    }
}

impl AtlasCli {
    pub fn new() -> Self {
        Self::with_command(ATLAS_BIN, Vec::<String>::new())
    }

    /// Use another program, with arguments placed before every invocation
    pub fn with_command(
        program: impl Into<String>,
        base_args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            base_args: base_args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command line for logs and error messages, secrets redacted
    pub fn display(&self, args: &[&str]) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.base_args.iter().cloned());
        parts.extend(redact_args(args));
        parts.join(" ")
    }

    /// Run a command. A non-zero exit is reported in the output, not as an error.
    pub async fn run(&self, args: &[&str], mode: OutputMode) -> Result<CommandOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args);
        cmd.args(args);

        tracing::debug!("Running: {}", self.display(args));

        let result = match mode {
            OutputMode::Capture => {
                cmd.stdin(Stdio::null());
                cmd.stdout(Stdio::piped());
                cmd.stderr(Stdio::piped());
                cmd.output().await.map(|output| CommandOutput {
                    success: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                })
            }
            OutputMode::Stream => {
                cmd.stdin(Stdio::inherit());
                cmd.stdout(Stdio::inherit());
                cmd.stderr(Stdio::inherit());
                cmd.status().await.map(|status| CommandOutput {
                    success: status.success(),
                    ..Default::default()
                })
            }
        };

        match result {
            Ok(output) => Ok(output),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AtlasError::NotInstalled),
            Err(e) => Err(AtlasError::IoError(e)),
        }
    }

    /// Run a command and return stdout, turning a non-zero exit into `CommandFailed`
    pub async fn run_checked(&self, args: &[&str], mode: OutputMode) -> Result<String> {
        let output = self.run(args, mode).await?;

        if !output.success {
            let detail = output.failure_detail();
            tracing::debug!("Command failed: {}", detail);
            return Err(AtlasError::CommandFailed {
                command: self.display(args),
                detail,
            });
        }

        Ok(output.stdout)
    }

    /// `atlas --version`
    pub async fn version(&self) -> Result<String> {
        let output = self.run_checked(&["--version"], OutputMode::Capture).await?;
        Ok(output.lines().next().unwrap_or_default().trim().to_string())
    }
}

fn redact_args(args: &[&str]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut hide_next = false;

    for arg in args {
        if hide_next {
            redacted.push("***".to_string());
            hide_next = false;
            continue;
        }
        if let Some((flag, _)) = arg.split_once('=')
            && SECRET_FLAGS.contains(&flag)
        {
            redacted.push(format!("{}=***", flag));
            continue;
        }
        hide_next = SECRET_FLAGS.contains(arg);
        redacted.push(arg.to_string());
    }

    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_redacts_password() {
        let cli = AtlasCli::new();
        let line = cli.display(&[
            "dbusers",
            "create",
            "--username",
            "u1",
            "--password",
            "s3cret",
            "--projectId",
            "p1",
        ]);

        assert_eq!(
            line,
            "atlas dbusers create --username u1 --password *** --projectId p1"
        );
        assert!(!cli.display(&["--password=s3cret"]).contains("s3cret"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_installed() {
        let cli = AtlasCli::with_command("mernboot-no-such-binary", Vec::<String>::new());
        let result = cli.run(&["--version"], OutputMode::Capture).await;
        assert!(matches!(result, Err(AtlasError::NotInstalled)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_command_failed() {
        let cli = AtlasCli::with_command("sh", ["-c", "echo 'bad thing' >&2; exit 3", "sh"]);

        let output = cli.run(&[], OutputMode::Capture).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.stderr.trim(), "bad thing");

        match cli.run_checked(&[], OutputMode::Capture).await {
            Err(AtlasError::CommandFailed { detail, .. }) => assert_eq!(detail, "bad thing"),
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captured_stdout() {
        let cli = AtlasCli::with_command("sh", ["-c", "echo \"atlascli version: $1\"", "sh"]);
        let version = cli.version().await.unwrap();
        assert_eq!(version, "atlascli version: --version");
    }
}
