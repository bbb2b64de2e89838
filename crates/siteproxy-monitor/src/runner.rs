//! Remote command execution
//!
//! Probes talk to a site's administrative command interface over SSH. The
//! transport sits behind [`CommandRunner`] so parsing and scoring can be
//! exercised without a network.

use async_trait::async_trait;
use siteproxy_core::{MonitorConfig, SiteDescriptor};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::ProbeError;

/// Administrative commands issued against a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCommand {
    /// Lightweight reachability check
    Version,
    /// Active session listing
    ShowConnections,
    /// Background task queue listing
    ShowQueue,
}

impl RemoteCommand {
    /// Arguments following the command prefix
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            RemoteCommand::Version => &["version"],
            RemoteCommand::ShowConnections => &["show-connections", "-w"],
            RemoteCommand::ShowQueue => &["show-queue", "-w"],
        }
    }
}

impl std::fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.args().join(" "))
    }
}

/// Runs one remote command for a site and returns its standard output
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Execute `command` against `site`
    async fn run(&self, site: &SiteDescriptor, command: RemoteCommand)
        -> Result<String, ProbeError>;

    /// Get the runner name
    fn name(&self) -> &'static str;
}

/// SSH runner configuration
#[derive(Debug, Clone)]
pub struct SshRunnerConfig {
    /// Path to the ssh client
    pub ssh_binary: PathBuf,
    /// Command namespace on the remote side
    pub command_prefix: String,
    /// Passed to ssh as `ConnectTimeout`
    pub connect_timeout: Duration,
    /// Hard limit for the whole command
    pub command_timeout: Duration,
}

impl Default for SshRunnerConfig {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

impl From<&MonitorConfig> for SshRunnerConfig {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            ssh_binary: PathBuf::from(&config.ssh_binary),
            command_prefix: config.command_prefix.clone(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            command_timeout: Duration::from_secs(config.command_timeout_secs),
        }
    }
}

/// Runs commands through the system `ssh` client
pub struct SshRunner {
    config: SshRunnerConfig,
}

impl SshRunner {
    /// Create a new SSH runner
    pub fn new(config: SshRunnerConfig) -> Self {
        Self { config }
    }

    /// Build the ssh invocation for a command
    fn build_command(&self, site: &SiteDescriptor, command: RemoteCommand) -> Command {
        let mut cmd = Command::new(&self.config.ssh_binary);

        cmd.arg("-p").arg(site.port.to_string());
        cmd.arg("-o").arg(format!(
            "ConnectTimeout={}",
            self.config.connect_timeout.as_secs().max(1)
        ));
        // Never stop for a password or host key prompt
        cmd.arg("-o").arg("BatchMode=yes");

        if let Some(key) = &site.key {
            cmd.arg("-i").arg(key);
        }

        cmd.arg(site.destination());
        cmd.arg(&self.config.command_prefix);
        cmd.args(command.args());

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        cmd
    }
}

impl Default for SshRunner {
    fn default() -> Self {
        Self::new(SshRunnerConfig::default())
    }
}

#[async_trait]
impl CommandRunner for SshRunner {
    async fn run(
        &self,
        site: &SiteDescriptor,
        command: RemoteCommand,
    ) -> Result<String, ProbeError> {
        let mut cmd = self.build_command(site, command);

        debug!(
            site = %site.name,
            destination = %site.destination(),
            command = %command,
            "Running remote command"
        );

        let output = tokio::time::timeout(self.config.command_timeout, cmd.output())
            .await
            .map_err(|_| ProbeError::Timeout(self.config.command_timeout))?
            .map_err(|e| ProbeError::Spawn {
                program: self.config.ssh_binary.display().to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ProbeError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &'static str {
        "ssh"
    }
}
