use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::Probe;

/// TTL cache for probe lookup results.
///
/// `get` performs a passive expiry check only; removal of expired entries is
/// left to `sweep`, which an external scheduler invokes periodically.
pub struct ProbeCache {
    ttl: Duration,
    entries: RwLock<HashMap<i64, CacheEntry>>,
}

struct CacheEntry {
    expires: Instant,
    probe: Probe,
}

impl ProbeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Retrieves a probe from the cache. Returns `None` for entries whose
    /// expiry has passed without removing them.
    pub fn get(&self, id: i64) -> Option<Probe> {
        let entries = self.entries.read();
        match entries.get(&id) {
            Some(entry) if entry.expires > Instant::now() => Some(entry.probe.clone()),
            _ => None,
        }
    }

    /// Inserts or overwrites a probe, resetting its expiry to now + TTL.
    pub fn add(&self, id: i64, probe: Probe) {
        let entry = CacheEntry {
            expires: Instant::now() + self.ttl,
            probe,
        };
        self.entries.write().insert(id, entry);
    }

    /// Removes expired entries and returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires > now);
        before - entries.len()
    }
}
