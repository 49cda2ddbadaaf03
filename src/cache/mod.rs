//! Advisory, TTL-based cache (§4.6). Last-writer-wins; safe to lose on restart since it is
//! rebuilt from the latest `DeviceEvent` per charge point (see `Router::rebuild_cache`).
//!
//! Grounded on the teacher's `SessionRegistry`'s `DashMap<String, DateTime<Utc>>` debounce
//! map — same "small map of mostly-fresh entries" shape, generalized with an explicit TTL.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::PhysicalStatus;

struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

pub struct Cache {
    last_seen: DashMap<String, Entry<DateTime<Utc>>>,
    status: DashMap<String, Entry<PhysicalStatus>>,
    pending_calls: DashMap<(String, String), Entry<()>>,
    id_tags: DashMap<String, Entry<crate::domain::IdTagStatus>>,
    id_tag_ttl: Duration,
}

impl Cache {
    pub fn new(id_tag_ttl: Duration) -> Self {
        Self {
            last_seen: DashMap::new(),
            status: DashMap::new(),
            pending_calls: DashMap::new(),
            id_tags: DashMap::new(),
            id_tag_ttl,
        }
    }

    pub fn set_last_seen(&self, charger_id: &str, at: DateTime<Utc>) {
        self.last_seen.insert(charger_id.to_string(), Entry { value: at, expires_at: None });
    }

    pub fn last_seen(&self, charger_id: &str) -> Option<DateTime<Utc>> {
        self.last_seen.get(charger_id).map(|e| e.value)
    }

    pub fn set_status(&self, charger_id: &str, status: PhysicalStatus) {
        self.status.insert(charger_id.to_string(), Entry { value: status, expires_at: None });
    }

    pub fn status(&self, charger_id: &str) -> Option<PhysicalStatus> {
        self.status.get(charger_id).map(|e| e.value)
    }

    pub fn track_pending_call(&self, charger_id: &str, message_id: &str, deadline: Instant) {
        self.pending_calls.insert(
            (charger_id.to_string(), message_id.to_string()),
            Entry { value: (), expires_at: Some(deadline) },
        );
    }

    pub fn clear_pending_call(&self, charger_id: &str, message_id: &str) {
        self.pending_calls.remove(&(charger_id.to_string(), message_id.to_string()));
    }

    pub fn set_id_tag_status(&self, tag: &str, status: crate::domain::IdTagStatus) {
        let expires_at = Instant::now() + self.id_tag_ttl;
        self.id_tags.insert(tag.to_string(), Entry { value: status, expires_at: Some(expires_at) });
    }

    pub fn id_tag_status(&self, tag: &str) -> Option<crate::domain::IdTagStatus> {
        let now = Instant::now();
        let entry = self.id_tags.get(tag)?;
        if entry.is_expired(now) {
            drop(entry);
            self.id_tags.remove(tag);
            return None;
        }
        Some(entry.value)
    }

    /// Sweeps expired entries. Called periodically by the Router's watchdog; the cache never
    /// blocks reads/writes on expiry, so this is purely a memory-bound housekeeping pass.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        self.pending_calls.retain(|_, e| !e.is_expired(now));
        self.id_tags.retain(|_, e| !e.is_expired(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_tag_expires_after_ttl() {
        let cache = Cache::new(Duration::from_millis(1));
        cache.set_id_tag_status("TAG1", crate::domain::IdTagStatus::Accepted);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.id_tag_status("TAG1").is_none());
    }

    #[test]
    fn last_seen_has_no_ttl() {
        let cache = Cache::new(Duration::from_secs(300));
        let now = Utc::now();
        cache.set_last_seen("CP1", now);
        assert_eq!(cache.last_seen("CP1"), Some(now));
    }
}
