use super::address::PeerUri;

/// Ordered, duplicate-free list of peer URIs.
///
/// Order reflects insertion only; the pool derives its own ring order.
#[derive(Debug, Clone, Default)]
pub struct PeerSet {
    peers: Vec<PeerUri>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `uri` to the end, inserting it if absent.
    pub fn add(&mut self, uri: PeerUri) {
        self.remove(&uri);
        self.peers.push(uri);
    }

    /// Drops every entry equal to `uri`.
    pub fn remove(&mut self, uri: &PeerUri) {
        self.peers.retain(|peer| peer != uri);
    }

    pub fn contains(&self, uri: &PeerUri) -> bool {
        self.peers.contains(uri)
    }

    pub fn snapshot(&self) -> &[PeerUri] {
        &self.peers
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
