//! Boundary between the gossip protocol and whoever consumes its events.

use anyhow::Result;
use std::future::Future;

use super::types::Node;

/// Receives membership changes. Implementations are invoked on the gossip
/// service's own tasks and must not block.
///
/// The `Node` argument must not be retained beyond the call.
pub trait EventDelegate: Send + Sync {
    /// A node became reachable, including the local node at creation.
    fn notify_join(&self, node: &Node);

    /// A node left gracefully or was declared dead.
    fn notify_leave(&self, node: &Node);

    /// A live node changed state or incarnation.
    fn notify_update(&self, node: &Node);
}

/// A membership change collected while the member table is locked and
/// dispatched once the lock has been released.
#[derive(Debug, Clone)]
pub enum MemberEvent {
    Join(Node),
    Leave(Node),
    Update(Node),
}

impl MemberEvent {
    pub fn dispatch(&self, delegate: &dyn EventDelegate) {
        match self {
            MemberEvent::Join(node) => delegate.notify_join(node),
            MemberEvent::Leave(node) => delegate.notify_leave(node),
            MemberEvent::Update(node) => delegate.notify_update(node),
        }
    }
}

/// The handle the peer synchronizer drives during bootstrap and shutdown.
pub trait Membership: Send + Sync + 'static {
    /// Live members, local node first.
    fn members(&self) -> Vec<Node>;

    /// Contacts the seeds and returns how many of them answered.
    /// Fails when none did.
    fn join(&self, seeds: &[String]) -> impl Future<Output = Result<usize>> + Send;

    /// Announces departure and stops gossiping.
    fn leave(&self) -> impl Future<Output = Result<()>> + Send;
}
