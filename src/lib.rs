//! Cache Cluster Library
//!
//! A distributed in-memory cache whose peer set follows gossip membership.
//! The binary (`main.rs`) wires these modules into a single node.
//!
//! ## Architecture Modules
//! - **`membership`**: UDP gossip (SWIM-like) with join/leave/update events delivered to an
//!   `EventDelegate`.
//! - **`pool`**: The cache pool. Groups with byte-bounded storage, a consistent hash ring
//!   over peer URIs and the HTTP protocol peers use to fetch keys from each other.
//! - **`sync`**: Glue between the two. Turns membership events into peer URIs, keeps the
//!   deduplicated peer set and republishes it to the pool; also owns node startup.
//! - **`config`** / **`error`**: Node options and the error taxonomy.

pub mod config;
pub mod error;
pub mod membership;
pub mod pool;
pub mod sync;

pub use config::{JoinPolicy, Options};
pub use error::{Error, Result};
pub use sync::bootstrap::{Bootstrap, CacheNode};
