//! Scripted command runner for tests

use async_trait::async_trait;
use siteproxy_core::SiteDescriptor;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{CommandRunner, ProbeError, RemoteCommand};

pub fn connections_output(count: u32) -> String {
    format!("Session Start Idle User Remote Host\n----\n----\n{} connections: SSHD Backend: nio2\n", count)
}

pub fn queue_output(count: u32) -> String {
    format!("Task State StartTime Command\n----\n----\n  {} tasks, 4 worker threads\n", count)
}

/// Answers commands from a fixed table; unknown commands fail with exit 255
#[derive(Default)]
pub struct ScriptedRunner {
    responses: HashMap<(String, RemoteCommand), Result<String, ProbeError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `site` answer every command with the given counts
    pub fn site(mut self, site: &str, connections: u32, queue: u32) -> Self {
        self = self.respond(site, RemoteCommand::Version, Ok("gerrit version 3.9.1\n".to_string()));
        self = self.respond(site, RemoteCommand::ShowConnections, Ok(connections_output(connections)));
        self.respond(site, RemoteCommand::ShowQueue, Ok(queue_output(queue)))
    }

    pub fn respond(
        mut self,
        site: &str,
        command: RemoteCommand,
        response: Result<String, ProbeError>,
    ) -> Self {
        self.responses.insert((site.to_string(), command), response);
        self
    }

    /// Delay every answer
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        site: &SiteDescriptor,
        command: RemoteCommand,
    ) -> Result<String, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .get(&(site.name.clone(), command))
            .cloned()
            .unwrap_or_else(|| {
                Err(ProbeError::Exit {
                    status: "exit status: 255".to_string(),
                    stderr: "Connection refused".to_string(),
                })
            })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
