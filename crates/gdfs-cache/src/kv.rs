use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Generic TTL key/value store.
///
/// Failures are reported to the caller, which decides whether they matter.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> anyhow::Result<()>;
    fn forget(&self, key: &str) -> anyhow::Result<()>;
}

struct Slot {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-memory KV store with lazy expiry.
pub struct MemoryKvStore {
    data: RwLock<HashMap<String, Slot>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self { data: RwLock::new(HashMap::new()) }
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.data.read().values().filter(|s| s.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.data.write().retain(|_, s| s.expires_at > now);
    }

    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self { Self::new() }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let data = self.data.read();
            match data.get(key) {
                Some(slot) if slot.expires_at > now => return Ok(Some(slot.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // expired
        self.data.write().remove(key);
        Ok(None)
    }

    fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> anyhow::Result<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| anyhow::anyhow!("ttl out of range: {ttl:?}"))?;
        self.data.write().insert(key.to_string(), Slot { value, expires_at });
        Ok(())
    }

    fn forget(&self, key: &str) -> anyhow::Result<()> {
        self.data.write().remove(key);
        Ok(())
    }
}
