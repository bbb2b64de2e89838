//! Site scoring. Lower scores are preferred.

use siteproxy_core::{CONNECTION_MAX, QUEUE_MAX};

/// Cost of one active connection relative to one queued task
pub const WEIGHT: i64 = 10;

/// Latency charged when the reachability check fails, in milliseconds
pub const LATENCY_PENALTY_MS: f64 = 1000.0;

/// Starting score of a selection round; beaten by any healthy site
pub const FALLBACK_SCORE: i64 = CONNECTION_MAX as i64 * WEIGHT + QUEUE_MAX as i64 + 1000;

/// Score a site from its raw signals.
///
/// `importance` scales the result: the total is divided by it, so less
/// important sites get larger scores. Values that are not strictly positive
/// count as 1.0.
pub fn score(connections: u32, queue: u32, latency_ms: f64, importance: f64) -> i64 {
    let base = connections as i64 * WEIGHT + queue as i64;
    let total = base
        + latency_penalty(latency_ms)
        + connection_efficiency(connections)
        + queue_efficiency(queue);

    (total as f64 / effective_importance(importance)) as i64
}

/// One point per 10ms of latency
pub fn latency_penalty(latency_ms: f64) -> i64 {
    if !latency_ms.is_finite() || latency_ms <= 0.0 {
        return 0;
    }
    (latency_ms * 0.1).floor() as i64
}

/// Bonus for idle sites, growing penalty for busy ones
pub fn connection_efficiency(connections: u32) -> i64 {
    match connections {
        0 => -5,
        1..=5 => -2,
        6..=10 => 0,
        c => c as i64 / 5,
    }
}

/// Bonus for empty queues, steeper penalty past 20 tasks
pub fn queue_efficiency(queue: u32) -> i64 {
    match queue {
        0 => -10,
        1..=5 => -3,
        6..=20 => queue as i64 / 4,
        q => q as i64 / 2,
    }
}

pub fn effective_importance(importance: f64) -> f64 {
    if importance.is_finite() && importance > 0.0 {
        importance
    } else {
        1.0
    }
}
