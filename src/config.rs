//! Node configuration, validated once before anything touches the network.

use std::time::Duration;

use crate::error::ConfigError;
use crate::membership::types::MembershipConfig;
use crate::pool::group::GetterFn;
use crate::pool::pool::PoolOptions;

/// Default byte capacity of the configured cache group.
pub const DEFAULT_CACHE_BYTES: usize = 4 << 20;

/// What to do when no seed answers the initial join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    /// Refuse to start without reaching at least one seed.
    #[default]
    RequirePeer,
    /// Log the failure and run as the only member until someone joins us.
    AllowSolo,
}

#[derive(Clone)]
pub struct Options {
    // Routing
    pub scheme: String,
    /// Port appended to every peer URI; `None` leaves it off.
    pub port: Option<u16>,

    // Cache group
    pub group_name: String,
    pub cache_bytes: usize,
    pub getter: GetterFn,
    pub enable_stats: bool,
    pub pool: PoolOptions,

    // Membership
    pub seed_nodes: Vec<String>,
    pub join_policy: JoinPolicy,
    pub join_timeout: Duration,
    pub membership: MembershipConfig,
}

impl Options {
    pub fn new(group_name: impl Into<String>, getter: GetterFn) -> Self {
        Self {
            scheme: "http".to_string(),
            port: None,
            group_name: group_name.into(),
            cache_bytes: DEFAULT_CACHE_BYTES,
            getter,
            enable_stats: false,
            pool: PoolOptions::default(),
            seed_nodes: Vec::new(),
            join_policy: JoinPolicy::default(),
            join_timeout: Duration::from_secs(10),
            membership: MembershipConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.group_name.is_empty() {
            return Err(ConfigError::MissingGroupName);
        }
        if self.scheme.is_empty() {
            return Err(ConfigError::MissingScheme);
        }
        if self.cache_bytes == 0 {
            return Err(ConfigError::ZeroCacheCapacity);
        }
        if self.pool.base_path.trim_matches('/').is_empty() {
            return Err(ConfigError::MissingBasePath);
        }
        if self.seed_nodes.is_empty() {
            return Err(ConfigError::MissingSeeds);
        }
        Ok(())
    }
}
