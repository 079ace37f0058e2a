use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Port used for seed addresses that do not carry one.
pub const DEFAULT_GOSSIP_PORT: u16 = 7946;

/// Routed-to address whose outgoing interface a wildcard bind advertises
/// when no seed is known.
pub const DEFAULT_ROUTE_PROBE: &str = "8.8.8.8:53";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeState {
    Alive,
    Suspect,
    Dead,
}

/// Represents a single member in the cluster.
///
/// Contains identity, the gossip address the member is reachable on, and its
/// current lifecycle state. The `incarnation` field is a logical clock used to
/// order updates and resolve conflicts (e.g., refuting a false "Suspect" claim).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub addr: SocketAddr,
    pub state: NodeState,
    pub incarnation: u64,

    #[serde(skip)]
    pub last_seen: Option<Instant>,
}

impl Node {
    pub fn is_live(&self) -> bool {
        self.state != NodeState::Dead
    }
}

/// The wire protocol for inter-node communication.
///
/// - `Ping/Ack`: Used for liveness checks and state synchronization.
/// - `Join/JoinAck`: Sent by new nodes to seed nodes to enter the cluster; the
///   seed answers with its member table, echoing the joiner's nonce.
/// - `Suspect/Alive`: Disseminates changes in node health.
/// - `Leave`: Graceful departure announced by the leaving node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GossipMessage {
    Ping {
        from: NodeId,
        incarnation: u64,
    },

    Ack {
        from: NodeId,
        incarnation: u64,
        members: Vec<Node>,
    },

    Join {
        node: Node,
        nonce: u64,
    },

    JoinAck {
        from: NodeId,
        nonce: u64,
        members: Vec<Node>,
    },

    Suspect {
        node_id: NodeId,
        incarnation: u64,
    },

    Alive {
        node_id: NodeId,
        incarnation: u64,
    },

    Leave {
        node_id: NodeId,
        incarnation: u64,
    },
}

/// Tuning knobs for the gossip protocol.
///
/// `bind_addr` may use port 0; the node then advertises whatever port the OS
/// assigned. `advertise_addr` overrides the address other members use to reach
/// this node. Without it, a node bound to an unspecified IP advertises the
/// local IP its traffic towards `route_probe` leaves from.
#[derive(Debug, Clone)]
pub struct MembershipConfig {
    pub bind_addr: SocketAddr,
    pub advertise_addr: Option<SocketAddr>,
    pub gossip_interval: Duration,
    pub failure_detection_interval: Duration,
    pub suspect_timeout: Duration,
    pub dead_timeout: Duration,
    pub join_ack_timeout: Duration,
    /// How long a dead member stays in the table before it is forgotten.
    pub dead_retention: Duration,
    /// `host:port` used to pick the advertised IP of a wildcard bind.
    pub route_probe: Option<String>,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_GOSSIP_PORT)),
            advertise_addr: None,
            gossip_interval: Duration::from_millis(500),
            failure_detection_interval: Duration::from_secs(2),
            suspect_timeout: Duration::from_secs(5),
            dead_timeout: Duration::from_secs(10),
            join_ack_timeout: Duration::from_secs(3),
            dead_retention: Duration::from_secs(30),
            route_probe: None,
        }
    }
}

impl MembershipConfig {
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    pub fn with_advertise_addr(mut self, advertise_addr: SocketAddr) -> Self {
        self.advertise_addr = Some(advertise_addr);
        self
    }

    pub fn with_route_probe(mut self, route_probe: impl Into<String>) -> Self {
        self.route_probe = Some(route_probe.into());
        self
    }
}
