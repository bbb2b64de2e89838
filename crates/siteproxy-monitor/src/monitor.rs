//! Site selection and per-site queries

use siteproxy_core::{
    MonitorConfig, ProxyError, ProxyResult, SiteConnections, SiteHealth, SiteQueues,
    SiteRegistry, SiteStatus,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::score::FALLBACK_SCORE;
use crate::{CommandRunner, Prober, SshRunner, SshRunnerConfig, StatusCache};

/// Probes registered sites and picks the best one to serve requests
pub struct SiteMonitor {
    /// Registered sites
    registry: Arc<SiteRegistry>,
    /// Prober shared by all probe tasks
    prober: Arc<Prober>,
    /// Last-known status per site
    cache: StatusCache,
    /// Parent of every round's token
    cancel: CancellationToken,
}

impl SiteMonitor {
    /// Create a monitor over `registry` using `runner` for remote commands
    pub fn new(registry: SiteRegistry, runner: Arc<dyn CommandRunner>) -> Self {
        let cache = StatusCache::seeded(&registry);

        info!(
            sites = registry.len(),
            runner = runner.name(),
            "Site monitor initialized"
        );

        Self {
            registry: Arc::new(registry),
            prober: Arc::new(Prober::new(runner)),
            cache,
            cancel: CancellationToken::new(),
        }
    }

    /// Create a monitor that probes over SSH
    pub fn with_ssh(registry: SiteRegistry, config: &MonitorConfig) -> Self {
        let runner = SshRunner::new(SshRunnerConfig::from(config));
        Self::new(registry, Arc::new(runner))
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    /// Probe every site concurrently and return the best-scoring healthy one.
    ///
    /// Fails only when no sites are registered. When every probe fails, the
    /// first registered site is returned with its failed status.
    pub async fn get_available_site(&self) -> ProxyResult<SiteStatus> {
        let fallback = self.registry.first().ok_or(ProxyError::NoSites)?;

        let round = self.cancel.child_token();
        let mut tasks = JoinSet::new();
        for site in self.registry.iter() {
            let prober = Arc::clone(&self.prober);
            let site = site.clone();
            let token = round.clone();
            tasks.spawn(async move { prober.probe_until(&site, &token).await });
        }

        let dispatched = tasks.len();
        let mut best: Option<SiteStatus> = None;
        let mut best_score = FALLBACK_SCORE;
        let mut fallback_status = None;

        // Arrival order decides ties
        while let Some(joined) = tasks.join_next().await {
            let status = match joined {
                Ok(status) => status,
                Err(e) => {
                    warn!(error = %e, "Probe task did not complete");
                    continue;
                }
            };

            self.cache.update(status.clone()).await;

            if status.name == fallback.name {
                fallback_status = Some(status.clone());
            }
            if status.error.is_empty() && status.score < best_score {
                best_score = status.score;
                best = Some(status);
            }
        }

        let chosen = match best {
            Some(status) => status,
            None => {
                warn!(
                    site = %fallback.name,
                    sites = dispatched,
                    "No healthy site found, using fallback"
                );
                fallback_status.unwrap_or_else(|| SiteStatus::pending(fallback))
            }
        };

        info!(
            site = %chosen.name,
            score = chosen.score,
            healthy = chosen.healthy,
            sites = dispatched,
            "Selected site"
        );

        Ok(chosen)
    }

    /// Run a selection round only to refresh the cache
    pub async fn refresh_all(&self) -> ProxyResult<()> {
        self.get_available_site().await.map(|_| ())
    }

    /// Cached status of every site
    pub async fn all_sites_status(&self) -> Vec<SiteStatus> {
        self.cache.snapshot().await
    }

    /// Probe one site now and store the result
    pub async fn probe_site(&self, name: &str) -> ProxyResult<SiteStatus> {
        let site = self.registry.get(name)?;
        let status = self.prober.probe_until(site, &self.cancel.child_token()).await;
        self.cache.update(status.clone()).await;
        Ok(status)
    }

    /// Fresh health view of one site
    pub async fn site_health(&self, name: &str) -> ProxyResult<SiteHealth> {
        self.probe_site(name).await.map(|s| SiteHealth::from(&s))
    }

    /// Fresh queue view of one site
    pub async fn site_queues(&self, name: &str) -> ProxyResult<SiteQueues> {
        self.probe_site(name).await.map(|s| SiteQueues::from(&s))
    }

    /// Fresh connection view of one site
    pub async fn site_connections(&self, name: &str) -> ProxyResult<SiteConnections> {
        self.probe_site(name).await.map(|s| SiteConnections::from(&s))
    }

    /// Refresh all sites every `period` until shutdown
    pub fn spawn_refresh(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let mut interval = refresh_ticker(period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Refresh loop stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = monitor.refresh_all().await {
                            warn!(error = %e, "Refresh failed");
                        }
                    }
                }
            }
        })
    }

    /// Cancel in-flight probes and stop the refresh loop
    pub fn shutdown(&self) {
        info!("Shutting down site monitor");
        self.cancel.cancel();
    }
}

/// Ticker for the refresh loop. A round that overruns `period` pushes the
/// next one back instead of firing the missed ticks in a burst.
fn refresh_ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
