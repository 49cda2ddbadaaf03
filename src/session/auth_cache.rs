//! Per-session authorization cache (§4.4): `idTag -> (status, expiry)`, capped and
//! TTL'd, preserved across reconnects since it lives on the `Session`, not the transport.
//!
//! No LRU crate appears anywhere in the corpus, so this is hand-rolled: a map plus a
//! recency queue, the same shape the teacher uses for its small in-memory registries
//! (see `cache::Cache`) generalized with an eviction cap.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::domain::IdTagStatus;

struct Entry {
    status: IdTagStatus,
    expires_at: Instant,
}

pub struct AuthCache {
    entries: HashMap<String, Entry>,
    order: VecDeque<String>,
    capacity: usize,
    ttl: Duration,
}

impl AuthCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { entries: HashMap::new(), order: VecDeque::new(), capacity, ttl }
    }

    pub fn get(&mut self, tag: &str) -> Option<IdTagStatus> {
        let expired = match self.entries.get(tag) {
            Some(e) => Instant::now() >= e.expires_at,
            None => return None,
        };
        if expired {
            self.entries.remove(tag);
            self.order.retain(|t| t != tag);
            return None;
        }
        self.touch(tag);
        self.entries.get(tag).map(|e| e.status)
    }

    pub fn insert(&mut self, tag: &str, status: IdTagStatus) {
        let expires_at = Instant::now() + self.ttl;
        if self.entries.insert(tag.to_string(), Entry { status, expires_at }).is_none() {
            self.order.push_back(tag.to_string());
            if self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        } else {
            self.touch(tag);
        }
    }

    fn touch(&mut self, tag: &str) {
        self.order.retain(|t| t != tag);
        self.order.push_back(tag.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut cache = AuthCache::new(2, Duration::from_secs(300));
        cache.insert("A", IdTagStatus::Accepted);
        cache.insert("B", IdTagStatus::Accepted);
        cache.insert("C", IdTagStatus::Accepted);
        assert!(cache.get("A").is_none());
        assert!(cache.get("B").is_some());
        assert!(cache.get("C").is_some());
    }

    #[test]
    fn expires_after_ttl() {
        let mut cache = AuthCache::new(10, Duration::from_millis(1));
        cache.insert("A", IdTagStatus::Accepted);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("A").is_none());
    }
}
