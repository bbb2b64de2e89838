//! siteproxy-monitor: Site probing and selection
//!
//! This crate provides the routing decision core:
//! - Remote command execution over SSH
//! - Parsing of administrative command output
//! - Per-site probing with sentinel values on failure
//! - Scoring and concurrent best-site selection
//! - The shared status cache

pub mod cache;
pub mod error;
pub mod monitor;
pub mod parse;
pub mod prober;
pub mod runner;
pub mod score;

#[cfg(test)]
mod testing;

pub use cache::StatusCache;
pub use error::ProbeError;
pub use monitor::SiteMonitor;
pub use prober::{Prober, Reading};
pub use runner::{CommandRunner, RemoteCommand, SshRunner, SshRunnerConfig};
