//! Site descriptor, status record, and the partial views served to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Connection count substituted when the connections probe fails
pub const CONNECTION_MAX: u32 = 65536;

/// Queue depth substituted when the queue probe fails
pub const QUEUE_MAX: u32 = 65536;

/// Response time reported when latency could not be measured
pub const RESPONSE_TIME_UNKNOWN: i64 = -1;

/// Static description of one monitored site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDescriptor {
    /// Unique site name
    pub name: String,
    /// Location label
    pub location: String,
    /// HTTP endpoint URL
    pub url: String,
    /// Remote command host
    pub host: String,
    /// Remote command port
    pub port: u16,
    /// Remote command user
    pub user: Option<String>,
    /// Identity file for the remote command channel
    pub key: Option<PathBuf>,
    /// Configured importance weight, if any
    pub weight: Option<f64>,
}

impl SiteDescriptor {
    /// Create a descriptor with default port and full importance
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: String::new(),
            url: String::new(),
            host: host.into(),
            port: crate::DEFAULT_SSH_PORT,
            user: None,
            key: None,
            weight: None,
        }
    }

    /// Importance used for scoring.
    ///
    /// A missing, zero, or otherwise unusable weight counts as full importance.
    pub fn importance(&self) -> f64 {
        match self.weight {
            Some(w) if w.is_finite() && w > 0.0 => w,
            _ => 1.0,
        }
    }

    /// `user@host` destination for the remote command channel
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) if !user.is_empty() => format!("{}@{}", user, self.host),
            _ => self.host.clone(),
        }
    }

    /// `ssh://host:port` form used in listings
    pub fn ssh_url(&self) -> String {
        format!("ssh://{}:{}", self.host, self.port)
    }
}

/// Last known state of one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStatus {
    pub name: String,
    pub location: String,
    pub url: String,
    pub host: String,
    pub healthy: bool,
    /// Milliseconds, or -1 when unmeasured
    pub response_time: i64,
    pub connections: u32,
    pub queue_size: u32,
    pub score: i64,
    pub last_check: Option<DateTime<Utc>>,
    /// Empty when the last probe succeeded
    pub error: String,
}

impl SiteStatus {
    /// Placeholder for a site that has not been probed yet
    pub fn pending(site: &SiteDescriptor) -> Self {
        Self {
            name: site.name.clone(),
            location: site.location.clone(),
            url: site.url.clone(),
            host: site.host.clone(),
            healthy: false,
            response_time: RESPONSE_TIME_UNKNOWN,
            connections: CONNECTION_MAX,
            queue_size: QUEUE_MAX,
            score: i64::MAX,
            last_check: None,
            error: "not probed yet".to_string(),
        }
    }
}

/// Health subset of a [`SiteStatus`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteHealth {
    pub name: String,
    pub healthy: bool,
    pub response_time: i64,
    pub last_check: Option<DateTime<Utc>>,
    pub error: String,
}

impl From<&SiteStatus> for SiteHealth {
    fn from(status: &SiteStatus) -> Self {
        Self {
            name: status.name.clone(),
            healthy: status.healthy,
            response_time: status.response_time,
            last_check: status.last_check,
            error: status.error.clone(),
        }
    }
}

/// Queue subset of a [`SiteStatus`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteQueues {
    pub name: String,
    pub queue_size: u32,
}

impl From<&SiteStatus> for SiteQueues {
    fn from(status: &SiteStatus) -> Self {
        Self {
            name: status.name.clone(),
            queue_size: status.queue_size,
        }
    }
}

/// Connection subset of a [`SiteStatus`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConnections {
    pub name: String,
    pub connections: u32,
}

impl From<&SiteStatus> for SiteConnections {
    fn from(status: &SiteStatus) -> Self {
        Self {
            name: status.name.clone(),
            connections: status.connections,
        }
    }
}
