use anyhow::Result;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::sync::{RwLock, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

use super::delegate::{EventDelegate, MemberEvent, Membership};
use super::types::{
    DEFAULT_GOSSIP_PORT, DEFAULT_ROUTE_PROBE, GossipMessage, MembershipConfig, Node, NodeId, NodeState,
};

pub struct MembershipService {
    pub local_node: Node,
    pub members: Arc<DashMap<NodeId, Node>>,
    socket: Arc<UdpSocket>,
    incarnation: Arc<RwLock<u64>>,
    config: MembershipConfig,
    delegate: Arc<dyn EventDelegate>,
    pending_joins: DashMap<u64, oneshot::Sender<()>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl MembershipService {
    /// Binds the gossip socket, registers the local node and starts the
    /// background loops. The delegate sees the local node's join before this
    /// returns.
    pub async fn create(
        config: MembershipConfig,
        delegate: Arc<dyn EventDelegate>,
    ) -> Result<Arc<Self>> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        let bound = socket.local_addr()?;
        let addr = match config.advertise_addr {
            Some(addr) => addr,
            None if bound.ip().is_unspecified() => {
                let probe = config.route_probe.as_deref().unwrap_or(DEFAULT_ROUTE_PROBE);
                let ip = route_ip(probe).await.map_err(|e| {
                    anyhow::anyhow!(
                        "no routable address for wildcard bind {} (set an advertise address): {}",
                        bound,
                        e
                    )
                })?;
                SocketAddr::new(ip, bound.port())
            }
            None => bound,
        };

        let incarnation_counter = Arc::new(RwLock::new(1));
        let current_inc = *incarnation_counter.read().await;
        let local_node = Node {
            id: NodeId::new(),
            addr,
            state: NodeState::Alive,
            incarnation: current_inc,
            last_seen: Some(Instant::now()),
        };
        let members = Arc::new(DashMap::new());
        members.insert(local_node.id.clone(), local_node.clone());

        info!("Gossip bound on {} (advertising {})", bound, addr);

        let service = Arc::new(Self {
            local_node,
            members,
            socket: Arc::new(socket),
            incarnation: incarnation_counter,
            config,
            delegate,
            pending_joins: DashMap::new(),
            tasks: Mutex::new(Vec::new()),
        });

        service.emit(MemberEvent::Join(service.local_node.clone()));
        service.start();

        Ok(service)
    }

    fn start(self: &Arc<Self>) {
        tracing::info!("Starting membership service...");

        let gossip_handle = {
            let service = self.clone();
            tokio::spawn(async move {
                service.gossip_loop().await;
            })
        };

        let receive_handle = {
            let service = self.clone();
            tokio::spawn(async move {
                service.receive_loop().await;
            })
        };

        let failure_detection_handle = {
            let service = self.clone();
            tokio::spawn(async move {
                service.failure_detection_loop().await;
            })
        };

        self.tasks
            .lock()
            .extend([gossip_handle, receive_handle, failure_detection_handle]);

        tracing::info!("All background tasks started");
    }

    /// Stops the background loops without telling anyone.
    pub fn shutdown(&self) {
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
    }

    /// Like [`shutdown`](Self::shutdown), but returns only once every loop
    /// has released its handle on the socket.
    async fn stop(&self) {
        let handles: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for handle in &handles {
            handle.abort();
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// The local node as currently recorded in the member table.
    pub fn local_member(&self) -> Node {
        self.members
            .get(&self.local_node.id)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| self.local_node.clone())
    }

    /// Every member that is not dead, local node first.
    pub fn members(&self) -> Vec<Node> {
        let mut members = vec![self.local_member()];
        members.extend(
            self.members
                .iter()
                .filter(|entry| entry.key() != &self.local_node.id && entry.value().is_live())
                .map(|entry| entry.value().clone()),
        );
        members
    }

    pub fn get_alive_members(&self) -> Vec<Node> {
        self.members
            .iter()
            .filter(|entry| entry.value().state == NodeState::Alive)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn get_member(&self, id: &NodeId) -> Option<Node> {
        self.members.get(id).map(|entry| entry.value().clone())
    }

    /// Sends a join request to every seed and waits for their acknowledgements
    /// until `join_ack_timeout` elapses. Returns the number of seeds that
    /// answered; it is an error when none did.
    pub async fn join(&self, seeds: &[String]) -> Result<usize> {
        if seeds.is_empty() {
            anyhow::bail!("no seed nodes supplied");
        }

        info!("Joining cluster via {} seed node(s)", seeds.len());

        let local = self.local_member();
        let mut waiting = Vec::with_capacity(seeds.len());

        for seed in seeds {
            let target = match resolve_seed(seed).await {
                Ok(target) => target,
                Err(e) => {
                    tracing::warn!("Failed to resolve seed {}: {}", seed, e);
                    continue;
                }
            };

            let nonce = rand::random::<u64>();
            let (tx, rx) = oneshot::channel();
            self.pending_joins.insert(nonce, tx);

            let msg = GossipMessage::Join {
                node: local.clone(),
                nonce,
            };
            let encoded = bincode::serialize(&msg)?;
            if let Err(e) = self.socket.send_to(&encoded, target).await {
                tracing::warn!("Failed to send join request to {}: {}", target, e);
                self.pending_joins.remove(&nonce);
                continue;
            }
            info!("Sent join request to {} ({})", seed, target);
            waiting.push((seed, nonce, rx));
        }

        let deadline = tokio::time::Instant::now() + self.config.join_ack_timeout;
        let mut joined = 0;
        for (seed, nonce, rx) in waiting {
            match tokio::time::timeout_at(deadline, rx).await {
                Ok(Ok(())) => joined += 1,
                _ => {
                    tracing::warn!("Seed {} did not answer join request", seed);
                    self.pending_joins.remove(&nonce);
                }
            }
        }

        if joined == 0 {
            anyhow::bail!("none of {} seed node(s) answered", seeds.len());
        }

        info!("Joined cluster through {} seed node(s)", joined);
        Ok(joined)
    }

    /// Broadcasts a graceful leave and stops the background loops.
    pub async fn leave(&self) -> Result<()> {
        let incarnation = {
            let mut inc = self.incarnation.write().await;
            *inc += 1;
            *inc
        };

        info!("Leaving cluster (inc={})", incarnation);

        self.stop().await;
        self.broadcast_message(GossipMessage::Leave {
            node_id: self.local_node.id.clone(),
            incarnation,
        })
        .await;

        if let Some(mut me) = self.members.get_mut(&self.local_node.id) {
            me.state = NodeState::Dead;
            me.incarnation = incarnation;
        }

        Ok(())
    }

    /// Must be called without holding a guard into `members`.
    fn emit(&self, event: MemberEvent) {
        tracing::debug!("Membership event: {:?}", event);
        event.dispatch(self.delegate.as_ref());
    }

    /// Drops entries of earlier processes at the address `node` now announces
    /// under a fresh id. Returns leave events for those that were still
    /// considered live; they must be emitted after `node`'s join.
    fn retire_replaced(&self, node: &Node) -> Vec<MemberEvent> {
        let replaced: Vec<NodeId> = self
            .members
            .iter()
            .filter(|entry| {
                let old = entry.value();
                old.id != node.id && old.id != self.local_node.id && old.addr == node.addr
            })
            .map(|entry| entry.key().clone())
            .collect();

        let mut events = Vec::new();
        for id in replaced {
            if let Some((_, mut old)) = self.members.remove(&id) {
                tracing::info!("{:?} at {} replaced by {:?}", id, node.addr, node.id);
                if old.is_live() {
                    old.state = NodeState::Dead;
                    events.push(MemberEvent::Leave(old));
                }
            }
        }
        events
    }

    async fn gossip_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.gossip_interval);

        loop {
            interval.tick().await;

            let live_members: Vec<Node> = self
                .members
                .iter()
                .filter(|entry| entry.value().id != self.local_node.id && entry.value().is_live())
                .map(|entry| entry.value().clone())
                .collect();

            if live_members.is_empty() {
                continue;
            }

            use rand::Rng;
            let idx = rand::thread_rng().gen_range(0..live_members.len());
            let target = &live_members[idx];

            let incarnation = *self.incarnation.read().await;
            let msg = GossipMessage::Ping {
                from: self.local_node.id.clone(),
                incarnation,
            };

            if let Ok(encoded) = bincode::serialize(&msg) {
                if let Err(e) = self.socket.send_to(&encoded, target.addr).await {
                    tracing::warn!("Failed to send ping to {:?}: {}", target.id, e);
                } else {
                    tracing::debug!("Sent ping to {:?}", target.id);
                }
            } else {
                tracing::error!("Failed to serialize GossipMessage::Ping");
            }
        }
    }

    async fn receive_loop(self: Arc<Self>) {
        let mut buf = vec![0u8; 65536];

        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, src)) => match bincode::deserialize::<GossipMessage>(&buf[..len]) {
                    Ok(msg) => {
                        if let Err(e) = self.handle_message(msg, src).await {
                            tracing::error!("Error handling message from {}: {}", src, e);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to deserialize message from {}: {}", src, e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to receive UDP packet: {}", e);
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    }

    async fn handle_message(&self, msg: GossipMessage, src: SocketAddr) -> Result<()> {
        match msg {
            GossipMessage::Ping { from, incarnation } => {
                self.handle_ping(from, incarnation, src).await?;
            }

            GossipMessage::Ack {
                from,
                incarnation,
                members,
            } => {
                self.handle_ack(from, incarnation, members);
            }

            GossipMessage::Join { node, nonce } => {
                self.handle_join(node, nonce, src).await?;
            }

            GossipMessage::JoinAck {
                from,
                nonce,
                members,
            } => {
                self.handle_join_ack(from, nonce, members);
            }

            GossipMessage::Suspect {
                node_id,
                incarnation,
            } => {
                self.handle_suspect(node_id, incarnation).await;
            }

            GossipMessage::Alive {
                node_id,
                incarnation,
            } => {
                self.handle_alive(node_id, incarnation);
            }

            GossipMessage::Leave {
                node_id,
                incarnation,
            } => {
                self.handle_leave(node_id, incarnation);
            }
        }

        Ok(())
    }

    /// Records direct contact with a known member. Suspect members come back
    /// to life on any contact; dead ones only with a newer incarnation.
    fn touch(&self, from: &NodeId, from_incarnation: u64) -> Option<MemberEvent> {
        let mut member = self.members.get_mut(from)?;
        member.last_seen = Some(Instant::now());

        let was_live = member.is_live();
        let newer = from_incarnation > member.incarnation;
        if newer {
            member.incarnation = from_incarnation;
        }

        match member.state {
            NodeState::Suspect => {
                member.state = NodeState::Alive;
                transition(was_live, &member)
            }
            NodeState::Dead if newer => {
                member.state = NodeState::Alive;
                transition(was_live, &member)
            }
            NodeState::Alive if newer => transition(was_live, &member),
            _ => None,
        }
    }

    async fn handle_ping(&self, from: NodeId, from_incarnation: u64, src: SocketAddr) -> Result<()> {
        tracing::debug!("Received ping from {:?}", from);

        let mut events = Vec::new();
        if self.members.contains_key(&from) {
            events.extend(self.touch(&from, from_incarnation));
        } else {
            tracing::info!("Discovered new member via ping: {:?} at {}", from, src);

            let new_node = Node {
                id: from.clone(),
                addr: src,
                state: NodeState::Alive,
                incarnation: from_incarnation,
                last_seen: Some(Instant::now()),
            };

            let retired = self.retire_replaced(&new_node);
            self.members.insert(new_node.id.clone(), new_node.clone());
            events.push(MemberEvent::Join(new_node));
            events.extend(retired);
        }

        for event in events {
            self.emit(event);
        }

        let my_incarnation = *self.incarnation.read().await;
        let reply = GossipMessage::Ack {
            from: self.local_node.id.clone(),
            incarnation: my_incarnation,
            members: self.all_members(),
        };

        let encoded = bincode::serialize(&reply)?;
        self.socket.send_to(&encoded, src).await?;

        tracing::debug!("Sent ack to {:?} with {} members", from, self.members.len());

        Ok(())
    }

    fn handle_ack(&self, from: NodeId, from_incarnation: u64, members: Vec<Node>) {
        tracing::debug!(
            "Received ack from {:?} (inc={}) with {} members",
            from,
            from_incarnation,
            members.len()
        );

        if let Some(event) = self.touch(&from, from_incarnation) {
            self.emit(event);
        }

        for member in members {
            for event in self.merge_member(member) {
                self.emit(event);
            }
        }
    }

    fn merge_member(&self, new_member: Node) -> Vec<MemberEvent> {
        if new_member.id == self.local_node.id {
            return Vec::new();
        }

        match self.members.get_mut(&new_member.id) {
            Some(mut existing) => {
                if new_member.incarnation > existing.incarnation {
                    tracing::debug!(
                        "Updating {:?}: inc {} -> {}",
                        new_member.id,
                        existing.incarnation,
                        new_member.incarnation,
                    );

                    let was_live = existing.is_live();
                    existing.state = new_member.state;
                    existing.incarnation = new_member.incarnation;
                    existing.addr = new_member.addr;
                    existing.last_seen = Some(Instant::now());
                    transition(was_live, &existing).into_iter().collect()
                } else if new_member.incarnation == existing.incarnation
                    && new_member.state == NodeState::Alive
                    && existing.state == NodeState::Suspect
                {
                    tracing::info!("{:?} refuted suspicion", new_member.id);
                    existing.state = NodeState::Alive;
                    existing.last_seen = Some(Instant::now());
                    vec![MemberEvent::Update(existing.clone())]
                } else {
                    Vec::new()
                }
            }
            None => {
                if !new_member.is_live() {
                    return Vec::new();
                }

                tracing::info!(
                    "Discovered new member: {:?} at {}",
                    new_member.id,
                    new_member.addr
                );

                let mut member_with_timestamp = new_member;
                member_with_timestamp.last_seen = Some(Instant::now());

                let retired = self.retire_replaced(&member_with_timestamp);
                self.members.insert(
                    member_with_timestamp.id.clone(),
                    member_with_timestamp.clone(),
                );
                let mut events = vec![MemberEvent::Join(member_with_timestamp)];
                events.extend(retired);
                events
            }
        }
    }

    async fn handle_join(&self, mut node: Node, nonce: u64, src: SocketAddr) -> Result<()> {
        tracing::info!("Node {:?} joining cluster at {}", node.id, node.addr);

        let events = if node.id == self.local_node.id {
            Vec::new()
        } else {
            match self.members.get_mut(&node.id) {
                Some(mut existing) => {
                    let was_live = existing.is_live();
                    let newer = node.incarnation > existing.incarnation;
                    existing.addr = node.addr;
                    existing.state = NodeState::Alive;
                    existing.incarnation = existing.incarnation.max(node.incarnation);
                    existing.last_seen = Some(Instant::now());
                    if !was_live || newer {
                        transition(was_live, &existing).into_iter().collect()
                    } else {
                        Vec::new()
                    }
                }
                None => {
                    node.state = NodeState::Alive;
                    node.last_seen = Some(Instant::now());
                    let retired = self.retire_replaced(&node);
                    self.members.insert(node.id.clone(), node.clone());
                    let mut events = vec![MemberEvent::Join(node)];
                    events.extend(retired);
                    events
                }
            }
        };

        if !events.is_empty() {
            for event in events {
                self.emit(event);
            }
            tracing::info!("Cluster size now: {}", self.members().len());
        }

        let reply = GossipMessage::JoinAck {
            from: self.local_node.id.clone(),
            nonce,
            members: self.all_members(),
        };
        let encoded = bincode::serialize(&reply)?;
        self.socket.send_to(&encoded, src).await?;

        Ok(())
    }

    fn handle_join_ack(&self, from: NodeId, nonce: u64, members: Vec<Node>) {
        tracing::debug!("Received join ack from {:?} with {} members", from, members.len());

        for member in members {
            for event in self.merge_member(member) {
                self.emit(event);
            }
        }

        if let Some((_, waiter)) = self.pending_joins.remove(&nonce) {
            let _ = waiter.send(());
        }
    }

    async fn handle_suspect(&self, node_id: NodeId, incarnation: u64) {
        if node_id == self.local_node.id {
            let my_incarnation = {
                let mut inc = self.incarnation.write().await;
                if incarnation < *inc {
                    return;
                }
                *inc = incarnation + 1;
                *inc
            };

            tracing::info!("Refuting suspicion of local node (inc={})", my_incarnation);

            if let Some(mut me) = self.members.get_mut(&node_id) {
                me.incarnation = my_incarnation;
                me.state = NodeState::Alive;
                me.last_seen = Some(Instant::now());
            }

            self.broadcast_message(GossipMessage::Alive {
                node_id,
                incarnation: my_incarnation,
            })
            .await;
            return;
        }

        let event = match self.members.get_mut(&node_id) {
            Some(mut existing)
                if existing.state == NodeState::Alive && incarnation >= existing.incarnation =>
            {
                tracing::info!("Node {:?} at {} suspected", existing.id, existing.addr);
                existing.state = NodeState::Suspect;
                existing.incarnation = incarnation;
                existing.last_seen = Some(Instant::now());
                Some(MemberEvent::Update(existing.clone()))
            }
            Some(_) => None,
            None => {
                tracing::debug!("Suspected node {:?} doesn't exist", node_id);
                None
            }
        };

        if let Some(event) = event {
            self.emit(event);
        }
    }

    fn handle_alive(&self, node_id: NodeId, incarnation: u64) {
        let event = match self.members.get_mut(&node_id) {
            Some(mut existing) => {
                if incarnation > existing.incarnation {
                    tracing::info!(
                        "Node {:?} at {} is now Alive (inc={})",
                        existing.id,
                        existing.addr,
                        incarnation
                    );
                    let was_live = existing.is_live();
                    existing.state = NodeState::Alive;
                    existing.incarnation = incarnation;
                    existing.last_seen = Some(Instant::now());
                    transition(was_live, &existing)
                } else if incarnation == existing.incarnation
                    && existing.state == NodeState::Suspect
                {
                    tracing::info!(
                        "Node {:?} at {} successfully refuted suspicion",
                        existing.id,
                        existing.addr,
                    );
                    existing.state = NodeState::Alive;
                    existing.last_seen = Some(Instant::now());
                    Some(MemberEvent::Update(existing.clone()))
                } else {
                    None
                }
            }
            None => {
                tracing::debug!("Alive message for unknown node {:?}", node_id);
                None
            }
        };

        if let Some(event) = event {
            self.emit(event);
        }
    }

    fn handle_leave(&self, node_id: NodeId, incarnation: u64) {
        if node_id == self.local_node.id {
            return;
        }

        let event = match self.members.get_mut(&node_id) {
            Some(mut existing) if existing.is_live() && incarnation >= existing.incarnation => {
                tracing::info!("Node {:?} at {} left the cluster", existing.id, existing.addr);
                existing.state = NodeState::Dead;
                existing.incarnation = incarnation;
                existing.last_seen = Some(Instant::now());
                Some(MemberEvent::Leave(existing.clone()))
            }
            _ => None,
        };

        if let Some(event) = event {
            self.emit(event);
        }
    }

    async fn failure_detection_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.failure_detection_interval);

        loop {
            interval.tick().await;
            let now = Instant::now();

            let mut messages_to_broadcast = Vec::new();
            let mut events = Vec::new();
            let mut forgotten = Vec::new();

            for mut entry in self.members.iter_mut() {
                let member = entry.value_mut();

                if member.id == self.local_node.id {
                    continue;
                }

                if let Some(last_seen) = member.last_seen {
                    let elapsed = now.duration_since(last_seen);

                    match member.state {
                        NodeState::Alive => {
                            if elapsed > self.config.suspect_timeout {
                                tracing::warn!(
                                    "Node {:?} suspected (no contact for {:?})",
                                    member.id,
                                    elapsed
                                );

                                member.state = NodeState::Suspect;

                                messages_to_broadcast.push(GossipMessage::Suspect {
                                    node_id: member.id.clone(),
                                    incarnation: member.incarnation,
                                });
                                events.push(MemberEvent::Update(member.clone()));
                            }
                        }

                        NodeState::Suspect => {
                            if elapsed > self.config.dead_timeout {
                                tracing::info!(
                                    "Node {:?} declared DEAD (no contact for {:?})",
                                    member.id,
                                    elapsed
                                );

                                member.state = NodeState::Dead;
                                member.last_seen = Some(now);
                                events.push(MemberEvent::Leave(member.clone()));
                            }
                        }

                        NodeState::Dead => {
                            if elapsed > self.config.dead_retention {
                                forgotten.push(member.id.clone());
                            }
                        }
                    }
                } else {
                    member.last_seen = Some(now);
                }
            }

            for id in forgotten {
                tracing::debug!("Forgetting dead member {:?}", id);
                self.members.remove(&id);
            }

            let departed = events
                .iter()
                .any(|event| matches!(event, MemberEvent::Leave(_)));
            for event in events {
                self.emit(event);
            }
            if departed {
                tracing::info!(
                    "Cluster size now: {} alive nodes",
                    self.get_alive_members().len()
                );
            }

            for msg in messages_to_broadcast {
                self.broadcast_message(msg).await;
            }
        }
    }

    async fn broadcast_message(&self, msg: GossipMessage) {
        let targets: Vec<(NodeId, SocketAddr)> = self
            .members
            .iter()
            .filter(|entry| {
                entry.value().id != self.local_node.id && entry.value().state == NodeState::Alive
            })
            .map(|entry| (entry.value().id.clone(), entry.value().addr))
            .collect();

        if let Ok(encoded) = bincode::serialize(&msg) {
            for (id, addr) in targets {
                if let Err(e) = self.socket.send_to(&encoded, addr).await {
                    tracing::warn!("Failed to broadcast to {:?}: {}", id, e);
                }
            }
        }
    }

    fn all_members(&self) -> Vec<Node> {
        self.members
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl Membership for MembershipService {
    fn members(&self) -> Vec<Node> {
        MembershipService::members(self)
    }

    async fn join(&self, seeds: &[String]) -> Result<usize> {
        MembershipService::join(self, seeds).await
    }

    async fn leave(&self) -> Result<()> {
        MembershipService::leave(self).await
    }
}

fn transition(was_live: bool, node: &Node) -> Option<MemberEvent> {
    match (was_live, node.is_live()) {
        (false, true) => Some(MemberEvent::Join(node.clone())),
        (true, false) => Some(MemberEvent::Leave(node.clone())),
        (true, true) => Some(MemberEvent::Update(node.clone())),
        (false, false) => None,
    }
}

/// The local IP the OS would send from to reach `probe`. Connecting a UDP
/// socket sends nothing.
async fn route_ip(probe: &str) -> Result<IpAddr> {
    let target = resolve_seed(probe).await?;
    let local: SocketAddr = if target.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };

    let socket = UdpSocket::bind(local).await?;
    socket.connect(target).await?;
    let ip = socket.local_addr()?.ip();
    if ip.is_unspecified() {
        anyhow::bail!("no route towards {}", target);
    }
    Ok(ip)
}

async fn resolve_seed(seed: &str) -> Result<SocketAddr> {
    if let Ok(addr) = seed.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let addrs: Vec<SocketAddr> = match tokio::net::lookup_host(seed).await {
        Ok(addrs) => addrs.collect(),
        Err(_) => tokio::net::lookup_host((seed, DEFAULT_GOSSIP_PORT))
            .await?
            .collect(),
    };

    addrs
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("seed {} did not resolve", seed))
}
