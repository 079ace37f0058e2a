//! Error taxonomy for bootstrapping a node and serving cache requests.
//!
//! Configuration and bootstrap failures abort construction. Routing failures
//! only ever reach the HTTP caller that triggered them.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("must supply at least one seed node")]
    MissingSeeds,

    #[error("scheme is required")]
    MissingScheme,

    #[error("group name is required")]
    MissingGroupName,

    #[error("cache capacity must be greater than zero")]
    ZeroCacheCapacity,

    #[error("pool base path is required")]
    MissingBasePath,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("membership protocol failed to start: {0}")]
    Membership(#[source] anyhow::Error),

    #[error("membership can't find self")]
    NoLocalMember,

    #[error("membership self address {0} is not routable")]
    MissingSelfAddress(std::net::SocketAddr),

    #[error("cache pool is already initialized")]
    PoolAlreadyInitialized,
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("no seed node reachable: {0}")]
    Unreachable(#[source] anyhow::Error),

    #[error("joining seeds timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("no such group: {0}")]
    NoSuchGroup(String),

    #[error("cache pool is not initialized")]
    PoolUninitialized,

    #[error("invalid peer address {0}")]
    InvalidPeer(String),

    #[error("fetch from {peer} failed: {source}")]
    Fetch {
        peer: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("peer {peer} answered {status}")]
    PeerStatus { peer: String, status: u16 },

    #[error("load failed: {0}")]
    Load(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("membership error: {0}")]
    Membership(#[source] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
