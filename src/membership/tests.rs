//! Membership Module Tests
//!
//! Validates the fundamental components of the cluster membership system.
//!
//! ## Test Scopes
//! - **Data Structures**: Ensures uniqueness of IDs and correct serialization of wire protocol messages.
//! - **Service Logic**: Verifies initialization, member listing and seed joins.
//! - **Events**: Checks that join/leave/update notifications reach the delegate.
//! - **Lifecycle**: Restarts under a fresh id, forgetting dead members, advertised address selection.

#[cfg(test)]
mod tests {
    use crate::membership::delegate::{EventDelegate, MemberEvent};
    use crate::membership::service::MembershipService;
    use crate::membership::types::{GossipMessage, MembershipConfig, Node, NodeId, NodeState};
    use parking_lot::Mutex;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(&'static str, NodeId)>>,
    }

    impl Recorder {
        fn count(&self, kind: &str) -> usize {
            self.events.lock().iter().filter(|(k, _)| *k == kind).count()
        }
    }

    impl EventDelegate for Recorder {
        fn notify_join(&self, node: &Node) {
            self.events.lock().push(("join", node.id.clone()));
        }

        fn notify_leave(&self, node: &Node) {
            self.events.lock().push(("leave", node.id.clone()));
        }

        fn notify_update(&self, node: &Node) {
            self.events.lock().push(("update", node.id.clone()));
        }
    }

    fn loopback() -> MembershipConfig {
        let mut config = MembershipConfig::default().with_bind_addr("127.0.0.1:0".parse().unwrap());
        config.join_ack_timeout = Duration::from_millis(500);
        config
    }

    fn node(id: &str, addr: &str, state: NodeState, incarnation: u64) -> Node {
        Node {
            id: NodeId(id.to_string()),
            addr: addr.parse().unwrap(),
            state,
            incarnation,
            last_seen: None,
        }
    }

    async fn wait_until(cond: impl Fn() -> bool) -> bool {
        for _ in 0..60 {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        cond()
    }

    // ============================================================
    // NODE ID TESTS
    // ============================================================

    #[test]
    fn test_node_id_is_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();

        assert_ne!(id1, id2, "Each NodeId should be unique");
    }

    #[test]
    fn test_node_id_equality() {
        let id1 = NodeId("test-123".to_string());
        let id2 = NodeId("test-123".to_string());
        let id3 = NodeId("test-456".to_string());

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    // ============================================================
    // NODE TESTS
    // ============================================================

    #[test]
    fn test_dead_node_is_not_live() {
        assert!(node("a", "127.0.0.1:5000", NodeState::Alive, 1).is_live());
        assert!(node("a", "127.0.0.1:5000", NodeState::Suspect, 1).is_live());
        assert!(!node("a", "127.0.0.1:5000", NodeState::Dead, 1).is_live());
    }

    #[test]
    fn test_node_serialization_skips_last_seen() {
        let mut original = node("test-node", "192.168.1.1:5000", NodeState::Alive, 42);
        original.last_seen = Some(Instant::now());

        let json = serde_json::to_string(&original).expect("Serialization failed");
        let restored: Node = serde_json::from_str(&json).expect("Deserialization failed");

        assert_eq!(restored.id, original.id);
        assert_eq!(restored.addr, original.addr);
        assert_eq!(restored.state, original.state);
        assert_eq!(restored.incarnation, original.incarnation);
        assert!(restored.last_seen.is_none());
    }

    // ============================================================
    // GOSSIP MESSAGE TESTS
    // ============================================================

    #[test]
    fn test_gossip_join_carries_nonce() {
        let msg = GossipMessage::Join {
            node: node("new-joiner", "192.168.0.100:5000", NodeState::Alive, 1),
            nonce: 77,
        };

        let encoded = bincode::serialize(&msg).expect("Failed to serialize Join");
        let decoded: GossipMessage =
            bincode::deserialize(&encoded).expect("Failed to deserialize Join");

        if let GossipMessage::Join { node, nonce } = decoded {
            assert_eq!(node.id.0, "new-joiner");
            assert_eq!(nonce, 77);
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_gossip_leave_serialization() {
        let msg = GossipMessage::Leave {
            node_id: NodeId("leaving-node".to_string()),
            incarnation: 9,
        };

        let encoded = bincode::serialize(&msg).expect("Failed to serialize Leave");
        let decoded: GossipMessage =
            bincode::deserialize(&encoded).expect("Failed to deserialize Leave");

        if let GossipMessage::Leave {
            node_id,
            incarnation,
        } = decoded
        {
            assert_eq!(node_id.0, "leaving-node");
            assert_eq!(incarnation, 9);
        } else {
            panic!("Wrong message type");
        }
    }

    // ============================================================
    // EVENT DISPATCH TESTS
    // ============================================================

    #[test]
    fn test_member_event_dispatch_routes_to_matching_callback() {
        let recorder = Recorder::default();
        let n = node("n", "127.0.0.1:5000", NodeState::Alive, 1);

        MemberEvent::Join(n.clone()).dispatch(&recorder);
        MemberEvent::Update(n.clone()).dispatch(&recorder);
        MemberEvent::Leave(n).dispatch(&recorder);

        assert_eq!(recorder.count("join"), 1);
        assert_eq!(recorder.count("update"), 1);
        assert_eq!(recorder.count("leave"), 1);
    }

    // ============================================================
    // MEMBERSHIP SERVICE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_creation_announces_local_node() {
        let recorder = Arc::new(Recorder::default());
        let service = MembershipService::create(loopback(), recorder.clone())
            .await
            .expect("Failed to create service");

        let events = recorder.events.lock().clone();
        assert_eq!(events, vec![("join", service.local_node.id.clone())]);

        let members = service.members();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, service.local_node.id);

        service.shutdown();
    }

    #[tokio::test]
    async fn test_membership_get_member() {
        let service = MembershipService::create(loopback(), Arc::new(Recorder::default()))
            .await
            .unwrap();

        let member = service.get_member(&service.local_node.id);
        assert!(member.is_some());
        assert_eq!(member.unwrap().id, service.local_node.id);

        let fake_id = NodeId("non-existent".to_string());
        assert!(service.get_member(&fake_id).is_none());

        service.shutdown();
    }

    #[tokio::test]
    async fn test_advertise_addr_overrides_bound_addr() {
        let advertised: SocketAddr = "10.1.2.3:7946".parse().unwrap();
        let config = loopback().with_advertise_addr(advertised);

        let service = MembershipService::create(config, Arc::new(Recorder::default()))
            .await
            .unwrap();

        assert_eq!(service.local_node.addr, advertised);
        service.shutdown();
    }

    #[tokio::test]
    async fn test_join_self_counts_as_one_seed() {
        let service = MembershipService::create(loopback(), Arc::new(Recorder::default()))
            .await
            .unwrap();

        let seeds = vec![service.local_node.addr.to_string()];
        let joined = service.join(&seeds).await.expect("self join failed");

        assert_eq!(joined, 1);
        assert_eq!(service.members().len(), 1);
        service.shutdown();
    }

    #[tokio::test]
    async fn test_join_fails_when_no_seed_answers() {
        // A bound socket that never replies.
        let silent = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let seeds = vec![silent.local_addr().unwrap().to_string()];

        let service = MembershipService::create(loopback(), Arc::new(Recorder::default()))
            .await
            .unwrap();

        assert!(service.join(&seeds).await.is_err());
        assert!(service.join(&[]).await.is_err());
        service.shutdown();
    }

    #[tokio::test]
    async fn test_two_nodes_discover_each_other() {
        let first_events = Arc::new(Recorder::default());
        let second_events = Arc::new(Recorder::default());

        let first = MembershipService::create(loopback(), first_events.clone())
            .await
            .unwrap();
        let second = MembershipService::create(loopback(), second_events.clone())
            .await
            .unwrap();

        let joined = second
            .join(&[first.local_node.addr.to_string()])
            .await
            .unwrap();
        assert_eq!(joined, 1);

        assert!(wait_until(|| first.members().len() == 2).await);
        assert!(wait_until(|| second.members().len() == 2).await);
        assert_eq!(second.members()[0].id, second.local_node.id);

        // Each side saw itself and the other join.
        assert!(wait_until(|| first_events.count("join") == 2).await);
        assert!(wait_until(|| second_events.count("join") == 2).await);

        second.leave().await.unwrap();

        assert!(wait_until(|| first_events.count("leave") == 1).await);
        assert_eq!(first.members().len(), 1);
        assert_eq!(
            first.get_member(&second.local_node.id).unwrap().state,
            NodeState::Dead
        );

        first.shutdown();
    }

    #[tokio::test]
    async fn test_silent_member_is_suspected_then_declared_dead() {
        let mut config = loopback();
        config.failure_detection_interval = Duration::from_millis(50);
        config.suspect_timeout = Duration::from_millis(100);
        config.dead_timeout = Duration::from_millis(100);

        let recorder = Arc::new(Recorder::default());
        let service = MembershipService::create(config, recorder.clone())
            .await
            .unwrap();

        // Register a peer that will never answer.
        let ghost = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let ghost_node = Node {
            id: NodeId("ghost".to_string()),
            addr: ghost.local_addr().unwrap(),
            state: NodeState::Alive,
            incarnation: 1,
            last_seen: Some(Instant::now()),
        };
        service.members.insert(ghost_node.id.clone(), ghost_node);

        assert!(wait_until(|| recorder.count("leave") == 1).await);
        assert!(recorder.count("update") >= 1);
        assert_eq!(service.members().len(), 1);

        service.shutdown();
    }

    #[tokio::test]
    async fn test_dead_members_are_forgotten() {
        let mut config = loopback();
        config.failure_detection_interval = Duration::from_millis(50);
        config.suspect_timeout = Duration::from_millis(100);
        config.dead_timeout = Duration::from_millis(100);
        config.dead_retention = Duration::from_millis(100);

        let service = MembershipService::create(config, Arc::new(Recorder::default()))
            .await
            .unwrap();

        let ghost = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let ghost_id = NodeId("ghost".to_string());
        service.members.insert(
            ghost_id.clone(),
            Node {
                id: ghost_id.clone(),
                addr: ghost.local_addr().unwrap(),
                state: NodeState::Alive,
                incarnation: 1,
                last_seen: Some(Instant::now()),
            },
        );

        assert!(wait_until(|| service.get_member(&ghost_id).is_none()).await);
        assert!(service.get_member(&service.local_node.id).is_some());

        service.shutdown();
    }

    // ============================================================
    // RESTART & ADDRESS TESTS
    // ============================================================

    #[tokio::test]
    async fn test_restart_at_same_address_replaces_old_entry() {
        let recorder = Arc::new(Recorder::default());
        let first = MembershipService::create(loopback(), recorder.clone())
            .await
            .unwrap();

        let crashed = MembershipService::create(loopback(), Arc::new(Recorder::default()))
            .await
            .unwrap();
        let crashed_id = crashed.local_node.id.clone();
        let addr = crashed.local_node.addr;
        crashed.join(&[first.local_node.addr.to_string()]).await.unwrap();
        assert!(wait_until(|| first.members().len() == 2).await);

        // Simulate a crash: no leave is broadcast.
        crashed.shutdown();
        drop(crashed);

        let mut restarted = None;
        for _ in 0..40 {
            match MembershipService::create(loopback().with_bind_addr(addr), Arc::new(Recorder::default())).await {
                Ok(service) => {
                    restarted = Some(service);
                    break;
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
        let restarted = restarted.unwrap();
        restarted.join(&[first.local_node.addr.to_string()]).await.unwrap();

        assert!(wait_until(|| first.get_member(&crashed_id).is_none()).await);
        assert_eq!(first.members().len(), 2);

        // The newcomer is announced before its predecessor goes away.
        let events = recorder.events.lock().clone();
        let join_at = events
            .iter()
            .position(|(kind, id)| *kind == "join" && *id == restarted.local_node.id)
            .unwrap();
        let leave_at = events
            .iter()
            .position(|(kind, id)| *kind == "leave" && *id == crashed_id)
            .unwrap();
        assert!(join_at < leave_at);

        restarted.shutdown();
        first.shutdown();
    }

    #[tokio::test]
    async fn test_wildcard_bind_advertises_routed_ip() {
        let config = MembershipConfig::default()
            .with_bind_addr("0.0.0.0:0".parse().unwrap())
            .with_route_probe("127.0.0.1:9");

        let service = MembershipService::create(config, Arc::new(Recorder::default()))
            .await
            .unwrap();
        let addr = service.local_member().addr;

        assert_eq!(addr.ip(), "127.0.0.1".parse::<std::net::IpAddr>().unwrap());
        assert_ne!(addr.port(), 0);

        service.shutdown();
    }

    #[tokio::test]
    async fn test_explicit_advertise_wins_over_route_probe() {
        let advertised: SocketAddr = "10.1.2.3:7000".parse().unwrap();
        let config = MembershipConfig::default()
            .with_bind_addr("0.0.0.0:0".parse().unwrap())
            .with_advertise_addr(advertised)
            .with_route_probe("127.0.0.1:9");

        let service = MembershipService::create(config, Arc::new(Recorder::default()))
            .await
            .unwrap();

        assert_eq!(service.local_member().addr, advertised);
        service.shutdown();
    }
}
