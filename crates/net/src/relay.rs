//! Host-authoritative relay
//!
//! A single actor task owns every peer connection and all match bookkeeping.
//! The accept task and the host's game loop only talk to it through a command
//! channel, so nothing is shared and no send happens under a lock.
//!
//! Once per host frame the game loop calls [`RelayHandle::poll_and_route`]: the
//! host board goes out to everyone, each peer's queued frames are routed, and
//! the end of the match is decided here and nowhere else.

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::RelayConfig;
use crate::error::NetError;
use crate::protocol::*;
use crate::transport::Connection;

/// What the host's loop gets back from one routing pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Garbage lines sent by peers during this pass, all aimed at the host among others
    pub attacks: u32,
    pub roster: Roster,
    /// Last board string reported by each peer
    pub boards: BTreeMap<PlayerId, String>,
    /// Alive flag of each peer
    pub alive: BTreeMap<PlayerId, bool>,
    /// Set from the pass that ended the match onwards
    pub end: Option<EndPacket>,
}

enum RelayCommand {
    Accepted(TcpStream, SocketAddr),
    Roster(oneshot::Sender<Roster>),
    ScheduleStart(f64),
    Tick {
        host_name: String,
        host_board: String,
        host_alive: bool,
        reply: oneshot::Sender<TickReport>,
    },
    BroadcastAttack(u32),
    HostDied,
    Shutdown(oneshot::Sender<()>),
}

/// Cheap handle to a running relay
#[derive(Debug, Clone)]
pub struct RelayHandle {
    commands: mpsc::UnboundedSender<RelayCommand>,
    local_addr: SocketAddr,
}

impl std::fmt::Debug for RelayCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RelayCommand::Accepted(..) => "Accepted",
            RelayCommand::Roster(_) => "Roster",
            RelayCommand::ScheduleStart(_) => "ScheduleStart",
            RelayCommand::Tick { .. } => "Tick",
            RelayCommand::BroadcastAttack(_) => "BroadcastAttack",
            RelayCommand::HostDied => "HostDied",
            RelayCommand::Shutdown(_) => "Shutdown",
        };
        f.write_str(name)
    }
}

impl RelayHandle {
    /// Bind the listener and start the accept and relay tasks
    pub async fn start(config: RelayConfig) -> Result<Self, NetError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| NetError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!("relay listening on {}", local_addr);

        let (tx, rx) = mpsc::unbounded_channel::<RelayCommand>();
        let running = Arc::new(AtomicBool::new(true));

        // Only handles keep the relay alive; dropping the last one tears it down.
        let accept_task = tokio::spawn(accept_loop(
            listener,
            tx.downgrade(),
            config.accept_poll(),
            Arc::clone(&running),
        ));

        let relay = Relay::new(config, running, accept_task);
        tokio::spawn(relay.run(rx));

        Ok(Self {
            commands: tx,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn send(&self, cmd: RelayCommand) -> Result<(), NetError> {
        self.commands.send(cmd).map_err(|_| NetError::RelayClosed)
    }

    /// Current roster, host included
    pub async fn roster(&self) -> Result<Roster, NetError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Roster(reply))?;
        rx.await.map_err(|_| NetError::RelayClosed)
    }

    /// Freeze the player count, mark the match started and announce `start{at}`
    pub fn schedule_start(&self, at: f64) -> Result<(), NetError> {
        self.send(RelayCommand::ScheduleStart(at))
    }

    /// One routing pass; call once per host frame
    pub async fn poll_and_route(
        &self,
        host_name: &str,
        host_board: String,
        host_alive: bool,
    ) -> Result<TickReport, NetError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Tick {
            host_name: host_name.to_string(),
            host_board,
            host_alive,
            reply,
        })?;
        rx.await.map_err(|_| NetError::RelayClosed)
    }

    /// Send the host's own attack to every peer
    pub fn broadcast_attack(&self, n: u32) -> Result<(), NetError> {
        self.send(RelayCommand::BroadcastAttack(n))
    }

    /// Tell every peer the host topped out
    pub fn announce_host_death(&self) -> Result<(), NetError> {
        self.send(RelayCommand::HostDied)
    }

    /// Stop accepting, close the listener and every connection.
    ///
    /// Returns once the relay is torn down; later calls return immediately.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.send(RelayCommand::Shutdown(reply)).is_ok() {
            let _ = rx.await;
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    commands: mpsc::WeakUnboundedSender<RelayCommand>,
    poll: std::time::Duration,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Acquire) {
        match tokio::time::timeout(poll, listener.accept()).await {
            Err(_) => continue,
            Ok(Ok((stream, addr))) => {
                let Some(commands) = commands.upgrade() else {
                    break;
                };
                if commands.send(RelayCommand::Accepted(stream, addr)).is_err() {
                    break;
                }
            }
            Ok(Err(e)) => {
                warn!("accept failed: {}", e);
                break;
            }
        }
    }
    debug!("accept loop stopped");
}

struct PeerRecord {
    conn: Connection,
    last_board: String,
    alive: bool,
}

struct Relay {
    config: RelayConfig,
    running: Arc<AtomicBool>,
    accept_task: Option<JoinHandle<()>>,
    peers: BTreeMap<PlayerId, PeerRecord>,
    roster: Roster,
    next_id: PlayerId,
    started: bool,
    initial_player_count: usize,
    host_alive: bool,
    elimination_order: Vec<PlayerId>,
    eliminated: HashSet<PlayerId>,
    end: Option<EndPacket>,
}

impl Relay {
    fn new(config: RelayConfig, running: Arc<AtomicBool>, accept_task: JoinHandle<()>) -> Self {
        Self {
            config,
            running,
            accept_task: Some(accept_task),
            peers: BTreeMap::new(),
            roster: Roster::with_host(),
            next_id: FIRST_PEER_ID,
            started: false,
            initial_player_count: 1,
            host_alive: true,
            elimination_order: Vec::new(),
            eliminated: HashSet::new(),
            end: None,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<RelayCommand>) {
        while let Some(cmd) = commands.recv().await {
            match cmd {
                RelayCommand::Accepted(stream, addr) => self.on_accept(stream, addr),
                RelayCommand::Roster(reply) => {
                    self.reap();
                    let _ = reply.send(self.roster.clone());
                }
                RelayCommand::ScheduleStart(at) => self.schedule_start(at),
                RelayCommand::Tick {
                    host_name,
                    host_board,
                    host_alive,
                    reply,
                } => {
                    let report = self.poll_and_route(host_name, host_board, host_alive);
                    let _ = reply.send(report);
                }
                RelayCommand::BroadcastAttack(n) => {
                    if n > 0 {
                        self.broadcast(&create_attack(n), None);
                    }
                }
                RelayCommand::HostDied => {
                    if self.started {
                        self.host_alive = false;
                        self.eliminate(HOST_ID);
                        self.broadcast(&create_dead(Some(HOST_ID)), None);
                    }
                }
                RelayCommand::Shutdown(reply) => {
                    self.teardown().await;
                    let _ = reply.send(());
                    break;
                }
            }
        }
        // Every handle dropped without an explicit shutdown.
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(task) = self.accept_task.take() {
            task.abort();
            let _ = task.await;
            info!("relay stopped accepting");
        }
        for (_, mut peer) in std::mem::take(&mut self.peers) {
            peer.conn.close();
        }
    }

    fn on_accept(&mut self, stream: TcpStream, addr: SocketAddr) {
        let mut conn = Connection::spawn(stream);

        if self.started {
            info!("rejecting {}: game already started", addr);
            conn.send(create_reject(RejectReason::GameStarted));
            conn.close();
            return;
        }

        self.reap();
        if self.peers.len() >= self.config.max_clients {
            info!("rejecting {}: room is full", addr);
            conn.send(create_reject(RejectReason::RoomFull));
            conn.close();
            return;
        }

        let id = self.next_id;
        self.next_id += 1;
        let name = default_name(id);
        self.roster.insert(id, name.clone());

        conn.send(Message::Welcome(Welcome {
            id,
            roster: self.roster.clone(),
        }));
        self.peers.insert(
            id,
            PeerRecord {
                conn,
                last_board: String::new(),
                alive: true,
            },
        );
        info!("player {} joined from {}", id, addr);
        self.broadcast(&Message::Join(Join { id, name }), None);
    }

    fn schedule_start(&mut self, at: f64) {
        self.reap();
        self.initial_player_count = self.roster.len();
        self.started = true;
        info!(
            "match starting at {:.3} with {} players",
            at, self.initial_player_count
        );
        self.broadcast(&Message::Start(Start { at }), None);
    }

    fn broadcast(&self, msg: &Message, exclude: Option<PlayerId>) {
        for (id, peer) in &self.peers {
            if Some(*id) == exclude || !peer.conn.is_alive() {
                continue;
            }
            peer.conn.send(msg.clone());
        }
    }

    fn eliminate(&mut self, id: PlayerId) {
        if self.eliminated.insert(id) {
            self.elimination_order.push(id);
        }
    }

    /// Deal with peers whose connection died.
    ///
    /// In the lobby they simply leave; once the match runs they count as eliminated.
    fn reap(&mut self) {
        let dead: Vec<PlayerId> = self
            .peers
            .iter()
            .filter(|(_, peer)| !peer.conn.is_alive())
            .map(|(id, _)| *id)
            .collect();
        if dead.is_empty() {
            return;
        }

        if !self.started {
            for id in dead {
                if let Some(mut peer) = self.peers.remove(&id) {
                    peer.conn.close();
                }
                self.roster.remove(id);
                info!("player {} left the lobby", id);
            }
            self.broadcast(&create_roster(&self.roster), None);
            return;
        }

        for id in dead {
            let Some(peer) = self.peers.get_mut(&id) else {
                continue;
            };
            peer.conn.close();
            if peer.alive {
                peer.alive = false;
                info!("player {} disconnected mid-match", id);
                self.eliminate(id);
                self.broadcast(&create_dead(Some(id)), Some(id));
            }
        }
    }

    fn poll_and_route(&mut self, host_name: String, host_board: String, host_alive: bool) -> TickReport {
        self.roster.insert(HOST_ID, host_name);
        self.broadcast(&create_board(Some(HOST_ID), host_board, host_alive), None);

        let mut attacks: u32 = 0;
        let ids: Vec<PlayerId> = self.peers.keys().copied().collect();
        for id in ids {
            while let Some(msg) = self.peers.get_mut(&id).and_then(|p| p.conn.try_recv()) {
                attacks = attacks.saturating_add(self.route(id, msg));
            }
        }
        self.reap();

        if !host_alive && self.started {
            self.host_alive = false;
            self.eliminate(HOST_ID);
        }
        self.check_end();

        TickReport {
            attacks,
            roster: self.roster.clone(),
            boards: self
                .peers
                .iter()
                .map(|(id, p)| (*id, p.last_board.clone()))
                .collect(),
            alive: self.peers.iter().map(|(id, p)| (*id, p.alive)).collect(),
            end: self.end.clone(),
        }
    }

    /// Handle one frame from peer `id`; returns garbage credited to the host
    fn route(&mut self, id: PlayerId, msg: Message) -> u32 {
        match msg {
            Message::Hello(hello) => {
                let name = hello
                    .name
                    .map(|n| truncate_name(&n))
                    .unwrap_or_else(|| default_name(id));
                debug!("player {} is now {:?}", id, name);
                self.roster.insert(id, name);
                self.broadcast(&create_roster(&self.roster), None);
                0
            }
            Message::Board(board) => {
                let Some(peer) = self.peers.get_mut(&id) else {
                    return 0;
                };
                peer.last_board = board.s.clone();
                if !board.alive {
                    peer.alive = false;
                    self.eliminate(id);
                }
                self.broadcast(&create_board(Some(id), board.s, board.alive), Some(id));
                0
            }
            Message::Attack(Attack { n }) => {
                if n == 0 {
                    return 0;
                }
                self.broadcast(&create_attack(n), Some(id));
                n
            }
            Message::Dead(_) => {
                if let Some(peer) = self.peers.get_mut(&id) {
                    peer.alive = false;
                }
                self.eliminate(id);
                self.broadcast(&create_dead(Some(id)), Some(id));
                0
            }
            other => {
                debug!("ignoring {} from player {}", other.kind(), id);
                0
            }
        }
    }

    fn check_end(&mut self) {
        if !self.started || self.end.is_some() {
            return;
        }

        let mut alive_ids: Vec<PlayerId> = Vec::new();
        if self.host_alive {
            alive_ids.push(HOST_ID);
        }
        alive_ids.extend(self.peers.iter().filter(|(_, p)| p.alive).map(|(id, _)| *id));

        let winner = match (self.initial_player_count >= 2, alive_ids.len()) {
            (_, 0) => None,
            (true, 1) => Some(alive_ids[0]),
            _ => return,
        };

        let mut ranking = Vec::with_capacity(self.elimination_order.len() + 1);
        ranking.extend(winner);
        for id in self.elimination_order.iter().rev() {
            if Some(*id) != winner && !ranking.contains(id) {
                ranking.push(*id);
            }
        }

        let end = EndPacket {
            winner,
            ranking,
            roster: self.roster.clone(),
        };
        info!("match over: winner {:?}, ranking {:?}", end.winner, end.ranking);
        self.broadcast(&Message::End(end.clone()), None);
        self.end = Some(end);
    }
}
