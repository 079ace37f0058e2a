//! Cache Pool Module
//!
//! A consistent-hashing request router in front of named cache groups.
//!
//! ## Core Concepts
//! - **Ring**: Every peer URI is hashed onto a ring with virtual replicas; a key belongs to the next point clockwise.
//! - **Peer set**: Replaced wholesale through `CachePool::set_peers`, which rebuilds the ring in one step.
//! - **Groups**: A group pairs a getter with a byte-bounded local store. Only the owner of a key runs the getter.
//! - **Transport**: Non-owners fetch from the owner over HTTP and fall back to a local load if the owner is unreachable.

pub mod group;
pub mod handlers;
pub mod pool;
pub mod protocol;
pub mod ring;
