//! Probing a single site

use chrono::Utc;
use siteproxy_core::{
    SiteDescriptor, SiteStatus, CONNECTION_MAX, QUEUE_MAX, RESPONSE_TIME_UNKNOWN,
};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::parse::{parse_connections, parse_queue};
use crate::score::{score, LATENCY_PENALTY_MS};
use crate::{CommandRunner, ProbeError, RemoteCommand};

/// A measured value. On failure `value` holds the worst-case sentinel and
/// `error` says why, so callers can always use `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading<T> {
    pub value: T,
    pub error: Option<ProbeError>,
}

impl<T> Reading<T> {
    fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    fn failed(value: T, error: ProbeError) -> Self {
        Self {
            value,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs the diagnostic commands for one site
pub struct Prober {
    runner: Arc<dyn CommandRunner>,
}

impl Prober {
    /// Create a new prober on top of a command runner
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Active connection count, or [`CONNECTION_MAX`] if it cannot be read
    pub async fn connections(&self, site: &SiteDescriptor) -> Reading<u32> {
        match self
            .counted(site, RemoteCommand::ShowConnections, parse_connections, "connection")
            .await
        {
            Ok(count) => Reading::ok(count),
            Err(e) => Reading::failed(CONNECTION_MAX, e),
        }
    }

    /// Queued task count, or [`QUEUE_MAX`] if it cannot be read
    pub async fn queue(&self, site: &SiteDescriptor) -> Reading<u32> {
        match self
            .counted(site, RemoteCommand::ShowQueue, parse_queue, "task")
            .await
        {
            Ok(count) => Reading::ok(count),
            Err(e) => Reading::failed(QUEUE_MAX, e),
        }
    }

    /// Round trip of the reachability check in milliseconds, or
    /// [`LATENCY_PENALTY_MS`] if it fails
    pub async fn latency(&self, site: &SiteDescriptor) -> Reading<f64> {
        let start = Instant::now();
        match self.runner.run(site, RemoteCommand::Version).await {
            Ok(_) => Reading::ok(start.elapsed().as_secs_f64() * 1000.0),
            Err(e) => Reading::failed(LATENCY_PENALTY_MS, e),
        }
    }

    /// Full probe round: latency, connections and queue, scored
    pub async fn probe(&self, site: &SiteDescriptor) -> SiteStatus {
        let (latency, connections, queue) = tokio::join!(
            self.latency(site),
            self.connections(site),
            self.queue(site)
        );

        build_status(site, latency, connections, queue)
    }

    /// Like [`Prober::probe`], but gives up when `cancel` fires
    pub async fn probe_until(&self, site: &SiteDescriptor, cancel: &CancellationToken) -> SiteStatus {
        tokio::select! {
            status = self.probe(site) => status,
            _ = cancel.cancelled() => {
                debug!(site = %site.name, "Probe cancelled");
                build_status(
                    site,
                    Reading::failed(LATENCY_PENALTY_MS, ProbeError::Cancelled),
                    Reading::failed(CONNECTION_MAX, ProbeError::Cancelled),
                    Reading::failed(QUEUE_MAX, ProbeError::Cancelled),
                )
            }
        }
    }

    /// Reachability check followed by a listing command
    async fn counted(
        &self,
        site: &SiteDescriptor,
        command: RemoteCommand,
        parse: fn(&str) -> Option<u32>,
        what: &'static str,
    ) -> Result<u32, ProbeError> {
        self.runner.run(site, RemoteCommand::Version).await?;
        let output = self.runner.run(site, command).await?;
        parse(&output).ok_or(ProbeError::Parse(what))
    }
}

fn build_status(
    site: &SiteDescriptor,
    latency: Reading<f64>,
    connections: Reading<u32>,
    queue: Reading<u32>,
) -> SiteStatus {
    let failures: Vec<String> = [
        ("latency", &latency.error),
        ("connections", &connections.error),
        ("queue", &queue.error),
    ]
    .into_iter()
    .filter_map(|(what, err)| err.as_ref().map(|e| format!("{}: {}", what, e)))
    .collect();

    let error = failures.join("; ");
    if !error.is_empty() {
        warn!(site = %site.name, error = %error, "Probe failed");
    }

    let response_time = if latency.is_ok() {
        latency.value as i64
    } else {
        RESPONSE_TIME_UNKNOWN
    };

    let score = score(
        connections.value,
        queue.value,
        latency.value,
        site.importance(),
    );

    debug!(
        site = %site.name,
        connections = connections.value,
        queue = queue.value,
        latency_ms = latency.value,
        score = score,
        "Probe finished"
    );

    SiteStatus {
        name: site.name.clone(),
        location: site.location.clone(),
        url: site.url.clone(),
        host: site.host.clone(),
        healthy: error.is_empty(),
        response_time,
        connections: connections.value,
        queue_size: queue.value,
        score,
        last_check: Some(Utc::now()),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use std::time::Duration;

    fn site(name: &str) -> SiteDescriptor {
        SiteDescriptor::new(name, format!("{}.example.com", name))
    }

    fn prober(runner: ScriptedRunner) -> Prober {
        Prober::new(Arc::new(runner))
    }

    #[tokio::test]
    async fn test_healthy_probe() {
        let prober = prober(ScriptedRunner::new().site("east", 3, 2));
        let status = prober.probe(&site("east")).await;

        assert!(status.healthy);
        assert!(status.error.is_empty());
        assert_eq!(status.connections, 3);
        assert_eq!(status.queue_size, 2);
        assert!(status.response_time >= 0);
        assert!(status.last_check.is_some());
        assert_eq!(status.score, score(3, 2, status.response_time as f64, 1.0));
    }

    #[tokio::test]
    async fn test_unreachable_site_gets_sentinels() {
        let prober = prober(ScriptedRunner::new());
        let mut east = site("east");
        east.weight = Some(0.5);

        let status = prober.probe(&east).await;

        assert!(!status.healthy);
        assert!(!status.error.is_empty());
        assert_eq!(status.connections, CONNECTION_MAX);
        assert_eq!(status.queue_size, QUEUE_MAX);
        assert_eq!(status.response_time, RESPONSE_TIME_UNKNOWN);
        assert_eq!(
            status.score,
            score(CONNECTION_MAX, QUEUE_MAX, LATENCY_PENALTY_MS, 0.5)
        );
    }

    #[tokio::test]
    async fn test_reachability_failure_skips_listing() {
        let runner = ScriptedRunner::new().respond(
            "east",
            RemoteCommand::ShowConnections,
            Ok("5 connections: x\n".to_string()),
        );
        let prober = prober(runner);

        let reading = prober.connections(&site("east")).await;
        assert_eq!(reading.value, CONNECTION_MAX);
        assert!(matches!(reading.error, Some(ProbeError::Exit { .. })));
    }

    #[tokio::test]
    async fn test_unparsable_output() {
        let runner = ScriptedRunner::new()
            .site("east", 1, 1)
            .respond("east", RemoteCommand::ShowQueue, Ok("permission denied\n".to_string()));
        let prober = prober(runner);

        let queue = prober.queue(&site("east")).await;
        assert_eq!(queue.value, QUEUE_MAX);
        assert_eq!(queue.error, Some(ProbeError::Parse("task")));

        let status = prober.probe(&site("east")).await;
        assert!(!status.healthy);
        assert_eq!(status.connections, 1);
        assert_eq!(status.error, "queue: no task count in command output");
    }

    #[tokio::test]
    async fn test_latency_failure_uses_penalty() {
        let runner = ScriptedRunner::new().respond(
            "east",
            RemoteCommand::Version,
            Err(ProbeError::Timeout(Duration::from_secs(10))),
        );
        let prober = prober(runner);

        let latency = prober.latency(&site("east")).await;
        assert_eq!(latency.value, LATENCY_PENALTY_MS);
        assert!(!latency.is_ok());
    }

    #[tokio::test]
    async fn test_probe_until_cancelled() {
        let runner = ScriptedRunner::new()
            .site("east", 0, 0)
            .with_delay(Duration::from_secs(30));
        let prober = prober(runner);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let status = prober.probe_until(&site("east"), &cancel).await;
        assert!(!status.healthy);
        assert!(status.error.contains("probe cancelled"));
        assert_eq!(status.connections, CONNECTION_MAX);
    }
}
