use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use super::group::{CacheGroup, GetterFn, GroupStats};
use super::protocol::DEFAULT_BASE_PATH;
use super::ring::{DEFAULT_REPLICAS, HashRing};
use crate::error::RoutingError;

#[derive(Clone)]
pub struct PoolOptions {
    /// Path prefix peers fetch from, without surrounding slashes.
    pub base_path: String,
    pub replicas: usize,
    /// Custom transport for peer fetches; a default client otherwise.
    pub client: Option<reqwest::Client>,
    pub fetch_timeout: Duration,
    pub fetch_attempts: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            replicas: DEFAULT_REPLICAS,
            client: None,
            fetch_timeout: Duration::from_millis(500),
            fetch_attempts: 2,
        }
    }
}

/// Routes each key to the peer owning it on the hash ring and serves the keys
/// this node owns from its local groups.
pub struct CachePool {
    self_uri: String,
    base_path: String,
    ring: RwLock<HashRing>,
    groups: DashMap<String, Arc<CacheGroup>>,
    http_client: reqwest::Client,
    fetch_timeout: Duration,
    fetch_attempts: usize,
}

impl CachePool {
    pub fn new(self_uri: impl Into<String>, options: PoolOptions) -> Self {
        let base_path = options.base_path.trim_matches('/').to_string();

        Self {
            self_uri: self_uri.into(),
            base_path,
            ring: RwLock::new(HashRing::new(options.replicas)),
            groups: DashMap::new(),
            http_client: options.client.unwrap_or_default(),
            fetch_timeout: options.fetch_timeout,
            fetch_attempts: options.fetch_attempts.max(1),
        }
    }

    pub fn self_uri(&self) -> &str {
        &self.self_uri
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn add_group(&self, name: &str, capacity_bytes: usize, getter: GetterFn) -> Arc<CacheGroup> {
        let group = Arc::new(CacheGroup::new(name, capacity_bytes, getter));
        self.groups.insert(name.to_string(), group.clone());
        tracing::info!("Registered cache group {} ({} bytes)", name, capacity_bytes);
        group
    }

    pub fn group(&self, name: &str) -> Option<Arc<CacheGroup>> {
        self.groups.get(name).map(|entry| entry.value().clone())
    }

    /// Replaces the whole peer set and rebuilds the ring.
    pub fn set_peers<S: AsRef<str>>(&self, peers: &[S]) {
        self.ring.write().set(peers);
    }

    pub fn peers(&self) -> Vec<String> {
        self.ring.read().peers().to_vec()
    }

    /// The remote peer owning `key`, or `None` when the key belongs to this
    /// node or no peers are known.
    pub fn pick_peer(&self, key: &str) -> Option<String> {
        let ring = self.ring.read();
        match ring.get(key) {
            Some(peer) if peer != self.self_uri => Some(peer.to_string()),
            _ => None,
        }
    }

    pub async fn get(&self, group_name: &str, key: &str) -> Result<Vec<u8>, RoutingError> {
        let group = self
            .group(group_name)
            .ok_or_else(|| RoutingError::NoSuchGroup(group_name.to_string()))?;

        GroupStats::bump(&group.stats.gets);
        if let Some(value) = group.lookup(key) {
            GroupStats::bump(&group.stats.cache_hits);
            return Ok(value);
        }

        GroupStats::bump(&group.stats.loads);
        if let Some(peer) = self.pick_peer(key) {
            match self.fetch_remote(&peer, group_name, key).await {
                Ok(value) => {
                    GroupStats::bump(&group.stats.peer_loads);
                    return Ok(value);
                }
                Err(e) => {
                    GroupStats::bump(&group.stats.peer_errors);
                    tracing::warn!("Fetch of {:?} from {} failed, loading locally: {}", key, peer, e);
                }
            }
        }

        group.load_local(key).await
    }

    pub async fn fetch_remote(
        &self,
        peer: &str,
        group_name: &str,
        key: &str,
    ) -> Result<Vec<u8>, RoutingError> {
        let mut url =
            reqwest::Url::parse(peer).map_err(|_| RoutingError::InvalidPeer(peer.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| RoutingError::InvalidPeer(peer.to_string()))?
            .pop_if_empty()
            .extend(self.base_path.split('/').filter(|segment| !segment.is_empty()))
            .push(group_name)
            .push(key);

        let response = self.get_with_retry(peer, url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RoutingError::PeerStatus {
                peer: peer.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| RoutingError::Fetch {
            peer: peer.to_string(),
            source,
        })?;
        tracing::debug!("Fetched {:?} from {} ({} bytes)", key, peer, body.len());
        Ok(body.to_vec())
    }

    async fn get_with_retry(
        &self,
        peer: &str,
        url: reqwest::Url,
    ) -> Result<reqwest::Response, RoutingError> {
        let mut delay_ms = 50u64;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let response = self
                .http_client
                .get(url.clone())
                .timeout(self.fetch_timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(source) if attempt >= self.fetch_attempts => {
                    return Err(RoutingError::Fetch {
                        peer: peer.to_string(),
                        source,
                    });
                }
                Err(e) => {
                    tracing::debug!("Fetch attempt {} to {} failed: {}", attempt, peer, e);
                    let jitter = rand::random::<u64>() % 25;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(400);
                }
            }
        }
    }
}
