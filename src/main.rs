use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use cache_cluster::config::{JoinPolicy, Options};
use cache_cluster::pool::group::getter_fn;
use cache_cluster::sync::bootstrap::CacheNode;
use clap::Parser;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cache-cluster")]
#[command(about = "Cache node whose peer set follows gossip membership")]
struct Args {
    /// HTTP listen address for client and peer requests
    #[arg(long, env = "ADDR", default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// UDP address the gossip layer binds to
    #[arg(long, env = "GOSSIP_BIND", default_value = "0.0.0.0:7946")]
    gossip_bind: SocketAddr,

    /// Address announced to other members when binding a wildcard
    #[arg(long = "advertise", env = "ADVERTISE_ADDR")]
    advertise: Option<SocketAddr>,

    /// Seed members to join, comma-separated
    #[arg(long, env = "NODES", value_delimiter = ',')]
    nodes: Vec<String>,

    /// Scheme of peer URIs
    #[arg(long, env = "SCHEME", default_value = "http")]
    scheme: String,

    /// Port of peer URIs (defaults to the HTTP listen port)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Keep running when no seed answers
    #[arg(long)]
    solo: bool,

    /// Serve group statistics on /stats/
    #[arg(long)]
    stats: bool,
}

/// Deliberately slow and salted: a cache hit is visibly faster and returns
/// the same hash twice.
async fn hash_key(key: String) -> anyhow::Result<Vec<u8>> {
    let now = Instant::now();
    let hashed = tokio::task::spawn_blocking({
        let key = key.clone();
        move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(key.as_bytes(), &salt)
                .map(|hash| hash.to_string().into_bytes())
                .map_err(|e| anyhow!("argon2: {}", e))
        }
    })
    .await??;
    tracing::info!("argon2Key/key:{:?}\ttime:{:?}", key, now.elapsed());
    Ok(hashed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut options = Options::new("argon2", getter_fn(hash_key));
    options.scheme = args.scheme;
    options.port = Some(args.port.unwrap_or(args.addr.port()));
    options.seed_nodes = args
        .nodes
        .into_iter()
        .map(|node| node.trim().to_string())
        .filter(|node| !node.is_empty())
        .collect();
    options.enable_stats = args.stats;
    if args.solo {
        options.join_policy = JoinPolicy::AllowSolo;
    }
    options.membership = options.membership.with_bind_addr(args.gossip_bind);
    if let Some(advertise) = args.advertise {
        options.membership = options.membership.with_advertise_addr(advertise);
    }

    tracing::info!("Starting node, gossip on {}", args.gossip_bind);
    tracing::info!("Seed nodes: {:?}", options.seed_nodes);

    let node = CacheNode::bootstrap(options).await?;
    tracing::info!("Node ID: {:?}", node.membership().local_member().id);
    tracing::info!("Serving as {}", node.self_uri());

    let stats_service = node.membership().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));

        loop {
            interval.tick().await;
            let alive = stats_service.get_alive_members();
            tracing::info!("Cluster stats: {} alive nodes", alive.len());
            for member in alive {
                tracing::debug!("  - {:?} addr={} (inc={})", member.id, member.addr, member.incarnation);
            }
        }
    });

    tracing::info!("HTTP server listening on {}", args.addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    axum::serve(listener, node.router())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await?;

    tracing::info!("Leaving cluster");
    node.leave().await?;

    Ok(())
}
