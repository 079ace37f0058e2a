//! Cache groups: a named getter plus a byte-bounded local store.

use anyhow::Result;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::protocol::StatsResponse;
use crate::error::RoutingError;

/// Type alias for a thread-safe, asynchronous value loader.
/// It takes the requested key and resolves to the value's bytes.
pub type GetterFn =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>> + Send + Sync>;

/// Wraps an async closure into a [`GetterFn`].
pub fn getter_fn<F, Fut>(getter: F) -> GetterFn
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<u8>>> + Send + 'static,
{
    Arc::new(move |key: String| {
        Box::pin(getter(key)) as Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>>
    })
}

#[derive(Debug, Default)]
pub struct GroupStats {
    pub gets: AtomicU64,
    pub cache_hits: AtomicU64,
    pub peer_loads: AtomicU64,
    pub peer_errors: AtomicU64,
    pub loads: AtomicU64,
    pub local_loads: AtomicU64,
    pub local_load_errs: AtomicU64,
    pub server_requests: AtomicU64,
}

impl GroupStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Insertion-ordered store that drops its oldest entries once the total size
/// of keys and values exceeds `capacity` bytes.
#[derive(Debug)]
struct ByteStore {
    entries: HashMap<String, Vec<u8>>,
    order: VecDeque<String>,
    bytes: usize,
    capacity: usize,
}

impl ByteStore {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            bytes: 0,
            capacity,
        }
    }

    fn insert(&mut self, key: String, value: Vec<u8>) {
        if let Some(old) = self.entries.remove(&key) {
            self.bytes -= key.len() + old.len();
            self.order.retain(|k| k != &key);
        }

        self.bytes += key.len() + value.len();
        self.order.push_back(key.clone());
        self.entries.insert(key, value);

        while self.bytes > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(value) = self.entries.remove(&oldest) {
                self.bytes -= oldest.len() + value.len();
            }
        }
    }
}

pub struct CacheGroup {
    name: String,
    getter: GetterFn,
    store: Mutex<ByteStore>,
    pub stats: GroupStats,
}

impl CacheGroup {
    pub fn new(name: impl Into<String>, capacity_bytes: usize, getter: GetterFn) -> Self {
        Self {
            name: name.into(),
            getter,
            store: Mutex::new(ByteStore::new(capacity_bytes)),
            stats: GroupStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lookup(&self, key: &str) -> Option<Vec<u8>> {
        self.store.lock().entries.get(key).cloned()
    }

    pub fn populate(&self, key: &str, value: Vec<u8>) {
        self.store.lock().insert(key.to_string(), value);
    }

    /// Returns the cached value or runs the getter and caches its result.
    /// Only the owner of a key should call this.
    pub async fn load_local(&self, key: &str) -> Result<Vec<u8>, RoutingError> {
        if let Some(value) = self.lookup(key) {
            return Ok(value);
        }

        GroupStats::bump(&self.stats.local_loads);
        match (self.getter)(key.to_string()).await {
            Ok(value) => {
                self.populate(key, value.clone());
                Ok(value)
            }
            Err(e) => {
                GroupStats::bump(&self.stats.local_load_errs);
                tracing::warn!("Group {} failed to load {:?}: {}", self.name, key, e);
                Err(RoutingError::Load(e))
            }
        }
    }

    pub fn cached_items(&self) -> usize {
        self.store.lock().entries.len()
    }

    pub fn cached_bytes(&self) -> usize {
        self.store.lock().bytes
    }

    pub fn stats_snapshot(&self) -> StatsResponse {
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let (cached_items, cached_bytes) = {
            let store = self.store.lock();
            (store.entries.len(), store.bytes)
        };

        StatsResponse {
            group: self.name.clone(),
            gets: read(&self.stats.gets),
            cache_hits: read(&self.stats.cache_hits),
            peer_loads: read(&self.stats.peer_loads),
            peer_errors: read(&self.stats.peer_errors),
            loads: read(&self.stats.loads),
            local_loads: read(&self.stats.local_loads),
            local_load_errs: read(&self.stats.local_load_errs),
            server_requests: read(&self.stats.server_requests),
            cached_items,
            cached_bytes,
        }
    }
}
