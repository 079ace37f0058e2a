//! Peer Synchronization Module
//!
//! Keeps the cache pool's peer set equal to the live cluster membership.
//!
//! ## Flow
//! - **Bootstrap**: validates options, starts membership with the synchronizer as its
//!   event sink, resolves the local node, installs the pool once and joins the seeds.
//! - **Events**: every join/leave turns the member's IP into a `PeerUri` (`AddressBuilder`),
//!   updates the `PeerSet` and republishes the whole set (`PoolPublisher`) under one lock.
//! - **Serving**: client and peer requests go straight to the pool; a node without a pool answers 500.

pub mod address;
pub mod bootstrap;
pub mod handlers;
pub mod listener;
pub mod peers;
pub mod publisher;
