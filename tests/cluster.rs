//! Two nodes on distinct loopback addresses: discovery, cross-node fetch and leave.

use cache_cluster::config::Options;
use cache_cluster::error::{BootstrapError, Error};
use cache_cluster::membership::service::MembershipService;
use cache_cluster::pool::group::getter_fn;
use cache_cluster::sync::bootstrap::CacheNode;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use tokio::net::TcpListener;

fn free_udp_port(ip: &str) -> u16 {
    let socket = UdpSocket::bind((ip, 0)).unwrap();
    socket.local_addr().unwrap().port()
}

fn node_options(tag: &'static str, gossip: SocketAddr, seed: SocketAddr, http_port: u16) -> Options {
    let mut options = Options::new(
        "words",
        getter_fn(move |key: String| async move { Ok(format!("{}:{}", tag, key).into_bytes()) }),
    );
    options.port = Some(http_port);
    options.seed_nodes = vec![seed.to_string()];
    options.join_timeout = Duration::from_secs(3);
    options.enable_stats = true;
    options.membership = options.membership.with_bind_addr(gossip);
    options
}

async fn wait_until(cond: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    cond()
}

fn serve(node: &CacheNode<MembershipService>, listener: TcpListener) {
    let app = node.router();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}

#[tokio::test]
async fn test_two_nodes_share_peers_and_keys() {
    let http_a = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let http_port = http_a.local_addr().unwrap().port();
    let http_b = TcpListener::bind(("127.0.0.2", http_port)).await.unwrap();

    let gossip_a: SocketAddr = format!("127.0.0.1:{}", free_udp_port("127.0.0.1"))
        .parse()
        .unwrap();
    let gossip_b: SocketAddr = format!("127.0.0.2:{}", free_udp_port("127.0.0.2"))
        .parse()
        .unwrap();

    // The first node seeds itself.
    let a = CacheNode::bootstrap(node_options("a", gossip_a, gossip_a, http_port))
        .await
        .unwrap();
    let b = CacheNode::bootstrap(node_options("b", gossip_b, gossip_a, http_port))
        .await
        .unwrap();
    serve(&a, http_a);
    serve(&b, http_b);

    let uri_a = format!("http://127.0.0.1:{}", http_port);
    let uri_b = format!("http://127.0.0.2:{}", http_port);
    assert_eq!(a.self_uri().as_str(), uri_a);
    assert_eq!(b.self_uri().as_str(), uri_b);

    assert!(wait_until(|| a.peers().len() == 2).await);
    assert!(wait_until(|| b.peers().len() == 2).await);

    let pool_a = a.synchronizer().pool().unwrap().clone();
    let pool_b = b.synchronizer().pool().unwrap().clone();
    let mut expected = vec![uri_a.clone(), uri_b.clone()];
    expected.sort();
    let mut published = pool_a.peers();
    published.sort();
    assert_eq!(published, expected);

    // Both rings agree, so a key owned by A is loaded on A even when asked through B.
    let key = (0..1000)
        .map(|i| format!("key-{}", i))
        .find(|key| pool_b.pick_peer(key).as_deref() == Some(uri_a.as_str()))
        .unwrap();
    assert_eq!(b.get(&key).await.unwrap(), format!("a:{}", key).into_bytes());

    let stats_a = pool_a.group("words").unwrap().stats_snapshot();
    assert_eq!(stats_a.server_requests, 1);
    assert_eq!(stats_a.local_loads, 1);
    let stats_b = pool_b.group("words").unwrap().stats_snapshot();
    assert_eq!(stats_b.peer_loads, 1);

    b.leave().await.unwrap();

    assert!(wait_until(|| a.peers().len() == 1).await);
    assert_eq!(pool_a.peers(), vec![uri_a]);

    a.leave().await.unwrap();
}

fn fast_failure_detection(mut options: Options) -> Options {
    options.membership.gossip_interval = Duration::from_millis(50);
    options.membership.failure_detection_interval = Duration::from_millis(50);
    options.membership.suspect_timeout = Duration::from_millis(400);
    options.membership.dead_timeout = Duration::from_millis(400);
    options
}

#[tokio::test]
async fn test_restarted_peer_survives_death_of_its_predecessor() {
    let http_port = 18080;
    let gossip_a: SocketAddr = format!("127.0.0.1:{}", free_udp_port("127.0.0.1"))
        .parse()
        .unwrap();
    let first_b: SocketAddr = format!("127.0.0.2:{}", free_udp_port("127.0.0.2"))
        .parse()
        .unwrap();
    let second_b: SocketAddr = format!("127.0.0.2:{}", free_udp_port("127.0.0.2"))
        .parse()
        .unwrap();

    let a = CacheNode::bootstrap(fast_failure_detection(node_options("a", gossip_a, gossip_a, http_port)))
        .await
        .unwrap();
    let b1 = CacheNode::bootstrap(fast_failure_detection(node_options("b", first_b, gossip_a, http_port)))
        .await
        .unwrap();
    assert!(wait_until(|| a.peers().len() == 2).await);
    let b1_id = b1.membership().local_node.id.clone();

    // Crash: the gossip loops stop without a leave.
    b1.membership().shutdown();

    let b2 = CacheNode::bootstrap(fast_failure_detection(node_options("b", second_b, gossip_a, http_port)))
        .await
        .unwrap();
    assert_eq!(b2.self_uri(), b1.self_uri());

    let declared_dead = || {
        a.membership()
            .get_member(&b1_id)
            .map_or(true, |node| !node.is_live())
    };
    assert!(wait_until(declared_dead).await);

    // Give the leave of the old process time to reach the pool.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let pool_a = a.synchronizer().pool().unwrap();
    assert_eq!(a.peers().len(), 2);
    assert!(pool_a.peers().contains(&b2.self_uri().to_string()));

    b2.leave().await.unwrap();
    assert!(wait_until(|| a.peers().len() == 1).await);

    a.leave().await.unwrap();
}

#[tokio::test]
async fn test_failed_bootstrap_releases_gossip_socket() {
    let gossip: SocketAddr = format!("127.0.0.1:{}", free_udp_port("127.0.0.1"))
        .parse()
        .unwrap();
    let mut options = node_options("a", gossip, gossip, 18081);
    options.membership = options
        .membership
        .with_advertise_addr(format!("0.0.0.0:{}", gossip.port()).parse().unwrap());

    let result = CacheNode::bootstrap(options).await;
    assert!(matches!(
        result,
        Err(Error::Bootstrap(BootstrapError::MissingSelfAddress(_)))
    ));

    assert!(UdpSocket::bind(gossip).is_ok());
}
