use axum::Router;
use std::future::Future;
use std::sync::Arc;

use super::address::{AddressBuilder, PeerUri};
use super::handlers::node_router;
use super::listener::PeerSynchronizer;
use crate::config::{JoinPolicy, Options};
use crate::error::{BootstrapError, Error, JoinError, Result, RoutingError};
use crate::membership::delegate::{EventDelegate, Membership};
use crate::membership::service::MembershipService;
use crate::pool::pool::CachePool;

/// Startup sequence of a node. Configuration is checked in [`Bootstrap::new`],
/// everything that touches the network happens in [`Bootstrap::run`].
pub struct Bootstrap {
    options: Options,
    sync: Arc<PeerSynchronizer>,
}

impl Bootstrap {
    pub fn new(options: Options) -> Result<Self> {
        options.validate()?;
        let sync = Arc::new(PeerSynchronizer::new(AddressBuilder::new(
            options.scheme.clone(),
            options.port,
        )));
        Ok(Self { options, sync })
    }

    pub fn synchronizer(&self) -> &Arc<PeerSynchronizer> {
        &self.sync
    }

    /// Starts membership through `create`, resolves the local node, installs
    /// the pool and joins the seeds.
    pub async fn run<M, F, Fut>(self, create: F) -> Result<CacheNode<M>>
    where
        M: Membership,
        F: FnOnce(Arc<dyn EventDelegate>) -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<M>>>,
    {
        let Bootstrap { options, sync } = self;

        let delegate: Arc<dyn EventDelegate> = sync.clone();
        let membership = create(delegate)
            .await
            .map_err(BootstrapError::Membership)?;

        let self_uri = match install_pool(&options, &sync, &*membership) {
            Ok(self_uri) => self_uri,
            Err(err) => {
                stop_membership(&*membership).await;
                return Err(err.into());
            }
        };

        let joined = tokio::time::timeout(
            options.join_timeout,
            membership.join(&options.seed_nodes),
        )
        .await;
        let failure = match joined {
            Ok(Ok(count)) => {
                tracing::info!("Joined {} of {} seed node(s)", count, options.seed_nodes.len());
                None
            }
            Ok(Err(e)) => Some(JoinError::Unreachable(e)),
            Err(_) => Some(JoinError::Timeout(options.join_timeout)),
        };

        if let Some(err) = failure {
            match options.join_policy {
                JoinPolicy::AllowSolo => {
                    tracing::warn!("Starting as the only member: {}", err);
                }
                JoinPolicy::RequirePeer => {
                    stop_membership(&*membership).await;
                    return Err(err.into());
                }
            }
        }

        Ok(CacheNode {
            sync,
            membership,
            self_uri,
            group_name: options.group_name,
            base_path: options.pool.base_path,
            enable_stats: options.enable_stats,
        })
    }
}

/// Resolves the local node and installs its pool.
fn install_pool<M: Membership>(
    options: &Options,
    sync: &PeerSynchronizer,
    membership: &M,
) -> Result<PeerUri, BootstrapError> {
    let members = membership.members();
    let local = members.first().ok_or(BootstrapError::NoLocalMember)?;
    if local.addr.ip().is_unspecified() {
        return Err(BootstrapError::MissingSelfAddress(local.addr));
    }

    let self_uri = sync.addresses().for_node(local);
    tracing::info!("Resolved self as {} (node {:?})", self_uri, local.id);

    let pool = Arc::new(CachePool::new(self_uri.as_str(), options.pool.clone()));
    pool.add_group(
        &options.group_name,
        options.cache_bytes,
        options.getter.clone(),
    );
    sync.initialize_pool(pool)?;
    Ok(self_uri)
}

async fn stop_membership<M: Membership>(membership: &M) {
    if let Err(e) = membership.leave().await {
        tracing::warn!("Failed to stop membership after failed bootstrap: {}", e);
    }
}

/// A running cache node: membership, synchronizer and pool wired together.
pub struct CacheNode<M: Membership = MembershipService> {
    sync: Arc<PeerSynchronizer>,
    membership: Arc<M>,
    self_uri: PeerUri,
    group_name: String,
    base_path: String,
    enable_stats: bool,
}

impl CacheNode<MembershipService> {
    pub async fn bootstrap(options: Options) -> Result<Self> {
        let mut config = options.membership.clone();
        if config.route_probe.is_none() {
            config.route_probe = options.seed_nodes.first().cloned();
        }
        Self::bootstrap_with(options, move |delegate| {
            MembershipService::create(config, delegate)
        })
        .await
    }
}

impl<M: Membership> CacheNode<M> {
    pub async fn bootstrap_with<F, Fut>(options: Options, create: F) -> Result<Self>
    where
        F: FnOnce(Arc<dyn EventDelegate>) -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<M>>>,
    {
        Bootstrap::new(options)?.run(create).await
    }

    pub fn self_uri(&self) -> &PeerUri {
        &self.self_uri
    }

    pub fn peers(&self) -> Vec<PeerUri> {
        self.sync.peers()
    }

    pub fn synchronizer(&self) -> &Arc<PeerSynchronizer> {
        &self.sync
    }

    pub fn membership(&self) -> &Arc<M> {
        &self.membership
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>, RoutingError> {
        let pool = self.sync.pool().ok_or(RoutingError::PoolUninitialized)?;
        pool.get(&self.group_name, key).await
    }

    pub fn router(&self) -> Router {
        node_router(
            self.sync.clone(),
            &self.group_name,
            &self.base_path,
            self.enable_stats,
        )
    }

    pub async fn leave(&self) -> Result<()> {
        self.membership.leave().await.map_err(Error::Membership)
    }
}
