use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::agent::client::AgentClient;
use crate::agent::normalizer::normalize_snapshot;
use crate::agent::types::Snapshot;
use crate::cache::LiveCache;

/// Timed fetch → normalize → cache-upsert loop.
///
/// Poll failures skip the cycle and leave the cache untouched; the next
/// tick is the retry.
pub struct Poller {
    client: AgentClient,
    cache: Arc<LiveCache>,
    suffixes: Vec<String>,
    interval: Duration,
}

impl Poller {
    pub fn new(
        client: AgentClient,
        cache: Arc<LiveCache>,
        suffixes: Vec<String>,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            cache,
            suffixes,
            interval,
        }
    }

    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    async fn poll_once(&self) {
        let snapshot = match self.client.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Snapshot fetch failed, keeping previous cache state: {}", e);
                return;
            }
        };

        let count = apply_snapshot(&self.cache, snapshot, &self.suffixes);
        debug!("Synced {} connections into the live cache", count);
    }
}

/// Normalizes the snapshot and upserts every record into the cache.
pub(crate) fn apply_snapshot(cache: &LiveCache, mut snapshot: Snapshot, suffixes: &[String]) -> usize {
    normalize_snapshot(&mut snapshot, suffixes);
    let count = snapshot.connections.len();
    for conn in snapshot.connections {
        cache.put(conn.into_record());
    }
    count
}
