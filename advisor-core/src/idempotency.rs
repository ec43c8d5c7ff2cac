//! Bounded first-write-wins stores for retry handling.
//!
//! Three instances back the service at runtime: ingestion receipts,
//! rebalance results, and acknowledgements. Each store holds its lock
//! across the whole check-then-write so racing callers for the same key
//! observe at-most-once semantics, and each is bounded by capacity and a
//! TTL so process-lifetime retention stays finite.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default maximum live entries per store.
pub const DEFAULT_CAPACITY: usize = 4096;
/// Default retention window for a stored outcome.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct Entry<T> {
    value: T,
    stored_at: Instant,
}

struct Inner<T> {
    entries: HashMap<String, Entry<T>>,
    order: VecDeque<String>,
}

/// Key-value store where the first write for a key is final.
///
/// `get` returns exactly the value stored by the first `put_if_absent` for
/// that key until the entry ages out or is evicted; no overwrite path
/// exists.
pub struct IdempotencyStore<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
    ttl: Duration,
}

impl<T: Clone> IdempotencyStore<T> {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CAPACITY, DEFAULT_TTL)
    }

    pub fn with_limits(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Returns the stored value for `key`, or `None` if absent or expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                inner.entries.remove(key);
                inner.order.retain(|k| k != key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key` unless a live entry already exists.
    ///
    /// Returns the value now associated with the key and whether the key
    /// was already present; the pre-existing value always wins a race.
    pub fn put_if_absent(&self, key: &str, value: T) -> (T, bool) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                return (entry.value.clone(), true);
            }
            Some(_) => {
                inner.entries.remove(key);
                inner.order.retain(|k| k != key);
            }
            None => {}
        }
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                stored_at: Instant::now(),
            },
        );
        inner.order.push_back(key.to_string());
        while inner.entries.len() > self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
        (value, false)
    }
}

impl<T: Clone> Default for IdempotencyStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Records which rebalance request IDs have been acknowledged.
///
/// No linkage to the original result is verified; acknowledging an unknown
/// or fabricated ID succeeds as not-duplicate.
pub struct AckTracker {
    seen: IdempotencyStore<()>,
}

impl AckTracker {
    pub fn new() -> Self {
        Self {
            seen: IdempotencyStore::new(),
        }
    }

    /// Marks `request_id` acknowledged, returning whether it already was.
    pub fn acknowledge(&self, request_id: &str) -> bool {
        self.seen.put_if_absent(request_id, ()).1
    }
}

impl Default for AckTracker {
    fn default() -> Self {
        Self::new()
    }
}
