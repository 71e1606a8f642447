//! Snapshot cleaning applied between fetch and cache update.
//!
//! Two passes per record: fill an empty host from the agent's fallback
//! destination field, then collapse the host against the configured
//! suffix allow-list so subdomain variants map to one logical host.

use crate::agent::types::Snapshot;

/// Normalizes every connection in the snapshot in place.
///
/// The allow-list is scanned in its configured order and the first suffix
/// the host ends with replaces the whole host. Applying this twice yields
/// the same result as once: a collapsed host still ends with its own
/// suffix.
pub fn normalize_snapshot(snapshot: &mut Snapshot, suffixes: &[String]) {
    for conn in &mut snapshot.connections {
        if conn.metadata.host.is_empty() {
            conn.metadata.host = conn.metadata.remote_destination.clone();
        }

        for suffix in suffixes {
            if conn.metadata.host.ends_with(suffix.as_str()) {
                conn.metadata.host = suffix.clone();
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::types::{AgentConnection, Metadata};
    use chrono::Utc;

    fn conn(host: &str, fallback: &str) -> AgentConnection {
        AgentConnection {
            id: "a".into(),
            metadata: Metadata {
                source_ip: "10.0.0.1".into(),
                host: host.into(),
                remote_destination: fallback.into(),
            },
            upload: 100,
            download: 200,
            start: Utc::now(),
            chains: vec![],
            rule: String::new(),
            rule_payload: String::new(),
        }
    }

    fn snapshot(connections: Vec<AgentConnection>) -> Snapshot {
        Snapshot {
            download_total: 0,
            upload_total: 0,
            connections,
        }
    }

    #[test]
    fn test_empty_host_falls_back_to_remote_destination() {
        let mut snap = snapshot(vec![conn("", "1.2.3.4:443")]);
        normalize_snapshot(&mut snap, &[]);
        assert_eq!(snap.connections[0].metadata.host, "1.2.3.4:443");
    }

    #[test]
    fn test_suffix_collapses_subdomains() {
        let suffixes = vec!["googlevideo.com".to_string()];
        let mut snap = snapshot(vec![conn("v22.lscache6.googlevideo.com", "")]);
        normalize_snapshot(&mut snap, &suffixes);
        assert_eq!(snap.connections[0].metadata.host, "googlevideo.com");
    }

    #[test]
    fn test_first_matching_suffix_wins() {
        // Both suffixes match; the configured order decides.
        let suffixes = vec!["cdn.example.com".to_string(), "example.com".to_string()];
        let mut snap = snapshot(vec![conn("v1.cdn.example.com", "")]);
        normalize_snapshot(&mut snap, &suffixes);
        assert_eq!(snap.connections[0].metadata.host, "cdn.example.com");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let suffixes = vec!["example.com".to_string()];
        let mut snap = snapshot(vec![conn("v22.edge.cdn.example.com", ""), conn("", "9.9.9.9:53")]);

        normalize_snapshot(&mut snap, &suffixes);
        let once: Vec<String> = snap
            .connections
            .iter()
            .map(|c| c.metadata.host.clone())
            .collect();

        normalize_snapshot(&mut snap, &suffixes);
        let twice: Vec<String> = snap
            .connections
            .iter()
            .map(|c| c.metadata.host.clone())
            .collect();

        assert_eq!(once, vec!["example.com", "9.9.9.9:53"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unmatched_host_is_untouched() {
        let suffixes = vec!["example.com".to_string()];
        let mut snap = snapshot(vec![conn("other.net", "")]);
        normalize_snapshot(&mut snap, &suffixes);
        assert_eq!(snap.connections[0].metadata.host, "other.net");
    }
}
