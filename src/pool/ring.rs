//! Consistent hash ring with virtual replicas per peer.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Virtual points placed on the ring for every peer.
pub const DEFAULT_REPLICAS: usize = 50;

#[derive(Debug, Clone)]
pub struct HashRing {
    replicas: usize,
    peers: Vec<String>,
    ring: BTreeMap<u64, usize>,
}

impl HashRing {
    pub fn new(replicas: usize) -> Self {
        Self {
            replicas: replicas.max(1),
            peers: Vec::new(),
            ring: BTreeMap::new(),
        }
    }

    /// Rebuilds the ring from scratch for the given peer list.
    pub fn set<S: AsRef<str>>(&mut self, peers: &[S]) {
        self.ring.clear();
        self.peers = peers.iter().map(|peer| peer.as_ref().to_string()).collect();

        for (idx, peer) in self.peers.iter().enumerate() {
            for replica in 0..self.replicas {
                let point = hash64(format!("{}:{}", replica, peer).as_bytes());
                self.ring.insert(point, idx);
            }
        }
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// The peer owning `key`: the first ring point at or after the key's hash,
    /// wrapping around to the start.
    pub fn get(&self, key: &str) -> Option<&str> {
        let point = hash64(key.as_bytes());
        self.ring
            .range(point..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, &idx)| self.peers[idx].as_str())
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(DEFAULT_REPLICAS)
    }
}

fn hash64(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}
