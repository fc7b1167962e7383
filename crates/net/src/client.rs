//! Joining player side: connect, learn the assigned id, mirror the match.

use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, info};
use tokio::time::Instant;

use lan_tetris_core::Board;

use crate::config::REJECT_WAIT_MS;
use crate::error::NetError;
use crate::protocol::*;
use crate::transport::Connection;

/// Everything a player learns about the match from the host
#[derive(Debug, Clone, Default)]
pub struct ClientView {
    pub roster: Roster,
    /// Opponent boards as last reported, host included
    pub boards: BTreeMap<PlayerId, Board>,
    pub alive: BTreeMap<PlayerId, bool>,
    /// Match start time, seconds since the Unix epoch
    pub start_at: Option<f64>,
    pub end: Option<EndPacket>,
}

/// A connection to the host plus the state mirrored from it
#[derive(Debug)]
pub struct ClientPeer {
    conn: Connection,
    id: Option<PlayerId>,
    view: ClientView,
    /// Frames read while checking for a reject, replayed first
    held: VecDeque<Message>,
    unclaimed_attacks: u32,
}

impl ClientPeer {
    /// Connect to a host and make sure it did not turn us away.
    ///
    /// Waits up to a second for the first frame; a `reject` closes the connection and
    /// becomes [`NetError::Rejected`]. Any other frame is kept for later.
    pub async fn join(addr: SocketAddr, timeout: Duration) -> Result<Self, NetError> {
        let mut conn = Connection::connect(addr, timeout).await?;
        let mut held = VecDeque::new();

        match tokio::time::timeout(Duration::from_millis(REJECT_WAIT_MS), conn.recv()).await {
            Ok(Some(Message::Reject(reject))) => {
                conn.close();
                return Err(NetError::Rejected(reject.reason));
            }
            Ok(Some(msg)) => held.push_back(msg),
            Ok(None) => {
                return Err(NetError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "host closed the connection",
                )))
            }
            Err(_) => debug!("no frame from {} yet", addr),
        }

        Ok(Self {
            conn,
            id: None,
            view: ClientView {
                roster: Roster::with_host(),
                ..ClientView::default()
            },
            held,
            unclaimed_attacks: 0,
        })
    }

    /// Wait for `welcome` and return the assigned id.
    ///
    /// Falls back to the first peer id when nothing arrives in time.
    pub async fn wait_welcome(&mut self, timeout: Duration) -> PlayerId {
        let deadline = Instant::now() + timeout;

        while self.id.is_none() {
            if let Some(msg) = self.held.pop_front() {
                self.apply(msg);
                continue;
            }
            match tokio::time::timeout_at(deadline, self.conn.recv()).await {
                Ok(Some(msg)) => self.apply(msg),
                Ok(None) | Err(_) => break,
            }
        }

        *self.id.get_or_insert_with(|| {
            info!("no welcome from host, assuming id {}", FIRST_PEER_ID);
            FIRST_PEER_ID
        })
    }

    pub fn id(&self) -> Option<PlayerId> {
        self.id
    }

    pub fn view(&self) -> &ClientView {
        &self.view
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_alive()
    }

    pub fn send_hello(&self, name: &str) {
        self.conn.send(create_hello(name));
    }

    pub fn send_board(&self, s: String, alive: bool) {
        self.conn.send(create_board(None, s, alive));
    }

    pub fn send_attack(&self, n: u32) {
        if n > 0 {
            self.conn.send(create_attack(n));
        }
    }

    pub fn send_dead(&self) {
        self.conn.send(create_dead(None));
    }

    /// Apply every frame received so far; returns garbage lines aimed at us
    pub fn drain(&mut self) -> u32 {
        while let Some(msg) = self.held.pop_front() {
            self.apply(msg);
        }
        while let Some(msg) = self.conn.try_recv() {
            self.apply(msg);
        }
        std::mem::take(&mut self.unclaimed_attacks)
    }

    pub fn close(&mut self) {
        self.conn.close();
    }

    fn apply(&mut self, msg: Message) {
        let view = &mut self.view;
        match msg {
            Message::Welcome(welcome) => {
                self.id = Some(welcome.id);
                view.roster = welcome.roster;
            }
            Message::Roster(update) => view.roster = update.roster,
            Message::Join(join) => view.roster.insert(join.id, join.name),
            Message::Board(board) => {
                if let Some(id) = board.id {
                    view.boards.insert(id, Board::deserialize(&board.s));
                    view.alive.insert(id, board.alive);
                }
            }
            Message::Dead(dead) => {
                if let Some(id) = dead.id {
                    view.alive.insert(id, false);
                }
            }
            Message::Attack(attack) => {
                self.unclaimed_attacks = self.unclaimed_attacks.saturating_add(attack.n);
            }
            Message::Start(start) => view.start_at = Some(start.at),
            Message::End(end) => {
                if view.end.is_none() {
                    view.end = Some(end);
                }
            }
            other => debug!("ignoring {} from host", other.kind()),
        }
    }
}
