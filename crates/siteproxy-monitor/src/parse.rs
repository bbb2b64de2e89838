//! Text scraping of administrative command output.
//!
//! The review server only offers human-readable listings, so these parsers
//! look for the summary line. Keep them in sync with the samples in the tests.

/// Extract the active connection count from `show-connections -w` output.
///
/// Takes the first line mentioning `connections` whose text before the first
/// `:` starts with an integer.
pub fn parse_connections(output: &str) -> Option<u32> {
    output
        .lines()
        .filter(|line| line.contains("connections"))
        .find_map(|line| {
            let head = line.split(':').next().unwrap_or_default();
            leading_number(head)
        })
}

/// Extract the queued task count from `show-queue -w` output.
///
/// Takes the first line mentioning `tasks` but not `waiting` that starts
/// with an integer.
pub fn parse_queue(output: &str) -> Option<u32> {
    output
        .lines()
        .filter(|line| line.contains("tasks") && !line.contains("waiting"))
        .find_map(leading_number)
}

fn leading_number(text: &str) -> Option<u32> {
    text.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONNECTIONS: &str = "\
Session     Start     Idle   User                 Remote Host
--------------------------------------------------------------
3e9a5c71 09:14:02 00:00:03 alice                10.20.1.15
8b21f0d4 09:15:40 00:00:00 bob                  10.20.1.22
--------------------------------------------------------------
2 connections: SSHD Backend: nio2
";

    const QUEUE: &str = "\
Task     State        StartTime         Command
------------------------------------------------------------------------------
7f3a21c0 09:20:11.123 git-upload-pack '/platform/build' (alice)
1b44c9e2 09:20:12.456 git-receive-pack '/platform/build' (bob)
4 tasks waiting for a worker thread
------------------------------------------------------------------------------
  7 tasks, 4 worker threads
";

    #[test]
    fn test_parse_connections() {
        assert_eq!(parse_connections(CONNECTIONS), Some(2));
    }

    #[test]
    fn test_parse_connections_skips_unparsable_lines() {
        let output = "open connections: many\n  15 connections: SSHD Backend: mina\n";
        assert_eq!(parse_connections(output), Some(15));
    }

    #[test]
    fn test_parse_connections_missing() {
        assert_eq!(parse_connections(""), None);
        assert_eq!(parse_connections("Session Start Idle\n--\n"), None);
    }

    #[test]
    fn test_parse_queue_ignores_waiting_line() {
        assert_eq!(parse_queue(QUEUE), Some(7));
    }

    #[test]
    fn test_parse_queue_zero() {
        let output = "Task State StartTime Command\n----\n----\n  0 tasks, 4 worker threads\n";
        assert_eq!(parse_queue(output), Some(0));
    }

    #[test]
    fn test_parse_queue_missing() {
        assert_eq!(parse_queue("fatal: not a Gerrit administrator\n"), None);
        assert_eq!(parse_queue("3 tasks waiting\n"), None);
    }

    #[test]
    fn test_negative_counts_rejected() {
        assert_eq!(parse_queue("-1 tasks\n"), None);
        assert_eq!(parse_connections("-1 connections: x\n"), None);
    }
}
