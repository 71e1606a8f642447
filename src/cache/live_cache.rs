use std::collections::HashMap;
use std::mem;
use std::sync::Mutex;

use crate::storage::types::ConnectionRecord;

/// In-memory write-behind buffer holding the latest record per connection.
///
/// The poller overwrites entries on every sighting; the flusher takes the
/// whole map in one swap. A `put` racing with a `drain_all` is never lost:
/// it lands either in the drained batch or in the fresh map that replaces
/// it.
#[derive(Debug, Default)]
pub struct LiveCache {
    inner: Mutex<HashMap<String, ConnectionRecord>>,
}

impl LiveCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Unconditionally overwrites the entry for the record's id.
    pub fn put(&self, record: ConnectionRecord) {
        let mut map = self.lock();
        map.insert(record.id.clone(), record);
    }

    /// Atomically removes and returns every held record.
    pub fn drain_all(&self) -> Vec<ConnectionRecord> {
        let mut map = self.lock();
        let drained = mem::take(&mut *map);
        drained.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ConnectionRecord>> {
        // A panicked holder leaves the map intact; keep serving it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn record(id: &str, upload: u64, download: u64) -> ConnectionRecord {
        ConnectionRecord {
            id: id.into(),
            source_ip: "10.0.0.1".into(),
            host: "example.com".into(),
            upload,
            download,
            start: Utc::now(),
            chain: "Exit".into(),
        }
    }

    #[test]
    fn test_put_overwrites_instead_of_adding() {
        let cache = LiveCache::new();
        cache.put(record("a", 100, 200));
        cache.put(record("a", 150, 260));

        let drained = cache.drain_all();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].upload, 150);
        assert_eq!(drained[0].download, 260);
    }

    #[test]
    fn test_drain_empties_the_cache() {
        let cache = LiveCache::new();
        cache.put(record("a", 1, 1));
        cache.put(record("b", 2, 2));

        assert_eq!(cache.drain_all().len(), 2);
        assert!(cache.is_empty());
        assert!(cache.drain_all().is_empty());
    }

    #[test]
    fn test_put_after_drain_survives_for_next_cycle() {
        let cache = LiveCache::new();
        cache.put(record("a", 1, 1));
        let first = cache.drain_all();
        assert_eq!(first.len(), 1);

        cache.put(record("a", 5, 5));
        let second = cache.drain_all();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].upload, 5);
    }

    #[test]
    fn test_concurrent_puts_are_never_lost_across_drains() {
        let cache = Arc::new(LiveCache::new());
        let writers = 4;
        let per_writer = 100;

        let handles: Vec<_> = (0..writers)
            .map(|w| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..per_writer {
                        cache.put(record(&format!("{}-{}", w, i), i as u64, i as u64));
                    }
                })
            })
            .collect();

        let mut seen: HashSet<String> = HashSet::new();
        // Drain while writers are active, then once more after they join.
        for _ in 0..50 {
            for rec in cache.drain_all() {
                seen.insert(rec.id);
            }
        }
        for handle in handles {
            handle.join().unwrap();
        }
        for rec in cache.drain_all() {
            seen.insert(rec.id);
        }

        assert_eq!(seen.len(), writers * per_writer);
    }
}
