use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::storage::types::ConnectionRecord;

/// Full point-in-time listing of open connections as served by the agent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default, rename = "downloadTotal")]
    pub download_total: u64,
    #[serde(default, rename = "uploadTotal")]
    pub upload_total: u64,
    #[serde(default)]
    pub connections: Vec<AgentConnection>,
}

/// One connection as reported by the agent. `upload`/`download` are
/// cumulative totals since `start`, not per-interval deltas.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConnection {
    pub id: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub upload: u64,
    #[serde(default)]
    pub download: u64,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default)]
    pub rule: String,
    #[serde(default, rename = "rulePayload")]
    pub rule_payload: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default, rename = "sourceIP")]
    pub source_ip: String,
    #[serde(default)]
    pub host: String,
    #[serde(default, rename = "remoteDestination")]
    pub remote_destination: String,
}

impl AgentConnection {
    /// Collapses the wire shape into the stored record. Only the exit hop
    /// of the proxy chain is kept.
    pub fn into_record(self) -> ConnectionRecord {
        let chain = self.chains.last().cloned().unwrap_or_default();
        ConnectionRecord {
            id: self.id,
            source_ip: self.metadata.source_ip,
            host: self.metadata.host,
            upload: self.upload,
            download: self.download,
            start: self.start,
            chain,
        }
    }
}
