//! Probe failures

use std::time::Duration;
use thiserror::Error;

/// Why a single remote command or reading failed.
///
/// These never leave the monitor as errors; they end up as sentinel
/// metrics plus the status record's error string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The command could not be started
    #[error("failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    /// The remote command ran but reported failure
    #[error("remote command failed ({status}): {stderr}")]
    Exit { status: String, stderr: String },

    /// The command did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Output did not contain the expected summary line
    #[error("no {0} count in command output")]
    Parse(&'static str),

    /// The round was cancelled before the probe finished
    #[error("probe cancelled")]
    Cancelled,
}
