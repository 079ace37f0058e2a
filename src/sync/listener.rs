use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::address::{AddressBuilder, PeerUri};
use super::peers::PeerSet;
use super::publisher::PoolPublisher;
use crate::error::BootstrapError;
use crate::membership::delegate::EventDelegate;
use crate::membership::types::{Node, NodeId};
use crate::pool::pool::CachePool;

/// The peer set plus the members currently behind each of its URIs. Several
/// members map to one URI when they share a host, e.g. a restarted process
/// whose predecessor has not been declared dead yet.
#[derive(Default)]
struct Peers {
    set: PeerSet,
    holders: HashMap<PeerUri, HashSet<NodeId>>,
}

/// Keeps the pool's peer set in line with cluster membership.
///
/// Join and leave events mutate the peer set and republish it while holding
/// one lock, so the published set always equals the in-memory one. A URI
/// leaves the set with the last member behind it.
pub struct PeerSynchronizer {
    addresses: AddressBuilder,
    peers: Mutex<Peers>,
    publisher: PoolPublisher,
}

impl PeerSynchronizer {
    pub fn new(addresses: AddressBuilder) -> Self {
        Self {
            addresses,
            peers: Mutex::new(Peers::default()),
            publisher: PoolPublisher::new(),
        }
    }

    pub fn addresses(&self) -> &AddressBuilder {
        &self.addresses
    }

    pub fn peers(&self) -> Vec<PeerUri> {
        self.peers.lock().set.snapshot().to_vec()
    }

    pub fn pool(&self) -> Option<&Arc<CachePool>> {
        self.publisher.pool()
    }

    /// Installs the pool and immediately publishes whatever joined before it
    /// existed.
    pub fn initialize_pool(&self, pool: Arc<CachePool>) -> Result<(), BootstrapError> {
        self.publisher.initialize(pool)?;
        self.publish();
        Ok(())
    }

    /// Pushes the current peer set to the pool, if there is one.
    pub fn publish(&self) -> bool {
        let peers = self.peers.lock();
        self.publisher.publish(peers.set.snapshot())
    }
}

impl EventDelegate for PeerSynchronizer {
    fn notify_join(&self, node: &Node) {
        let uri = self.addresses.for_node(node);

        let mut peers = self.peers.lock();
        peers
            .holders
            .entry(uri.clone())
            .or_default()
            .insert(node.id.clone());
        peers.set.remove(&uri);
        peers.set.add(uri.clone());
        if self.publisher.publish(peers.set.snapshot()) {
            tracing::info!("Peer joined: {} (peers: {})", uri, peers.set.len());
        } else {
            tracing::debug!("Peer joined before pool init: {}", uri);
        }
    }

    fn notify_leave(&self, node: &Node) {
        let uri = self.addresses.for_node(node);

        let mut peers = self.peers.lock();
        let remaining = match peers.holders.get_mut(&uri) {
            Some(holders) => {
                holders.remove(&node.id);
                holders.len()
            }
            None => 0,
        };
        if remaining > 0 {
            tracing::info!(
                "Member {:?} left but {} still serves {} other member(s)",
                node.id,
                uri,
                remaining
            );
            return;
        }

        peers.holders.remove(&uri);
        peers.set.remove(&uri);
        self.publisher.publish(peers.set.snapshot());
        tracing::info!("Peer left: {} (peers: {})", uri, peers.set.len());
    }

    fn notify_update(&self, node: &Node) {
        tracing::debug!(
            "Peer updated: {:?} at {} ({:?}, inc={})",
            node.id,
            node.addr,
            node.state,
            node.incarnation
        );
    }
}
