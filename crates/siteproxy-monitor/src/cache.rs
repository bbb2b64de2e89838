//! Last-known status of every site

use siteproxy_core::{SiteRegistry, SiteStatus};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

type StatusMap = HashMap<String, SiteStatus>;

/// Status table shared between the selector and API readers.
///
/// Entries are only ever replaced whole.
pub struct StatusCache {
    entries: RwLock<StatusMap>,
}

impl StatusCache {
    /// Create a cache holding a pending entry for every registered site
    pub fn seeded(registry: &SiteRegistry) -> Self {
        let entries = registry
            .iter()
            .map(|site| (site.name.clone(), SiteStatus::pending(site)))
            .collect();

        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Replace the entry for `status.name`
    pub async fn update(&self, status: SiteStatus) {
        debug!(
            site = %status.name,
            healthy = status.healthy,
            score = status.score,
            "Updated site status"
        );
        self.entries.write().await.insert(status.name.clone(), status);
    }

    /// Current entry for one site
    pub async fn get(&self, name: &str) -> Option<SiteStatus> {
        self.entries.read().await.get(name).cloned()
    }

    /// Copy of all entries, ordered by site name
    pub async fn snapshot(&self) -> Vec<SiteStatus> {
        let mut sites: Vec<SiteStatus> = self.entries.read().await.values().cloned().collect();
        sites.sort_by(|a, b| a.name.cmp(&b.name));
        sites
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
