use std::sync::{Arc, OnceLock};

use super::address::PeerUri;
use crate::error::BootstrapError;
use crate::pool::pool::CachePool;

/// Holds the pool handle and pushes complete peer sets into it.
#[derive(Default)]
pub struct PoolPublisher {
    pool: OnceLock<Arc<CachePool>>,
}

impl PoolPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the pool. A pool can only be installed once.
    pub fn initialize(&self, pool: Arc<CachePool>) -> Result<(), BootstrapError> {
        self.pool
            .set(pool)
            .map_err(|_| BootstrapError::PoolAlreadyInitialized)
    }

    pub fn pool(&self) -> Option<&Arc<CachePool>> {
        self.pool.get()
    }

    /// Replaces the pool's peers with `snapshot`. Returns `false` without
    /// doing anything while no pool is installed.
    pub fn publish(&self, snapshot: &[PeerUri]) -> bool {
        match self.pool.get() {
            Some(pool) => {
                pool.set_peers(snapshot);
                true
            }
            None => {
                tracing::debug!("Pool not initialized, skipping publish of {} peers", snapshot.len());
                false
            }
        }
    }
}
