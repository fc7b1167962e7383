//! Line-framed JSON transport over TCP
//!
//! Each [`Connection`] owns two tasks. The reader buffers bytes until a full
//! `\n`-terminated line, decodes it and queues the message; the writer drains an
//! unbounded queue of frames so callers never wait on the socket. Either task
//! marks the connection dead when its half of the socket fails.
//!
//! A peer that stops reading cannot pin the writer: each write is bounded by
//! [`WRITE_TIMEOUT_MS`], and once [`Connection::close`] runs a stuck write is
//! abandoned after [`CLOSE_GRACE_MS`].

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};

use crate::config::{CLOSE_GRACE_MS, WRITE_TIMEOUT_MS};
use crate::error::NetError;
use crate::protocol::{encode_line, parse_message, Message};

/// Work item for the writer task
#[derive(Debug)]
enum Outbound {
    Frame(Message),
    Close,
}

/// One framed TCP connection
#[derive(Debug)]
pub struct Connection {
    peer_addr: Option<SocketAddr>,
    outbound: mpsc::UnboundedSender<Outbound>,
    inbound: mpsc::UnboundedReceiver<Message>,
    alive: Arc<AtomicBool>,
    closing: watch::Sender<bool>,
    closed: bool,
}

impl Connection {
    /// Take over an established stream and start its reader and writer tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(stream: TcpStream) -> Self {
        let _ = stream.set_nodelay(true);
        let peer_addr = stream.peer_addr().ok();
        let (read_half, write_half) = stream.into_split();

        let alive = Arc::new(AtomicBool::new(true));
        let (out_tx, out_rx) = mpsc::unbounded_channel::<Outbound>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<Message>();
        let (stop_tx, stop_rx) = watch::channel(false);
        let (closing_tx, closing_rx) = watch::channel(false);

        let label = peer_addr
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown peer".to_string());

        tokio::spawn(read_loop(
            read_half,
            in_tx,
            Arc::clone(&alive),
            stop_rx,
            label.clone(),
        ));
        tokio::spawn(write_loop(
            write_half,
            out_rx,
            Arc::clone(&alive),
            closing_rx,
            stop_tx,
            label,
        ));

        Self {
            peer_addr,
            outbound: out_tx,
            inbound: in_rx,
            alive,
            closing: closing_tx,
            closed: false,
        }
    }

    /// Connect with an explicit timeout
    pub async fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self, NetError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| NetError::ConnectTimeout { addr, timeout })??;
        Ok(Self::spawn(stream))
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// False once either direction failed, the peer hung up, or [`Connection::close`] ran
    pub fn is_alive(&self) -> bool {
        !self.closed && self.alive.load(Ordering::Acquire)
    }

    /// Queue a frame. Best effort: frames to a dead connection are dropped.
    pub fn send(&self, msg: Message) {
        if !self.is_alive() {
            return;
        }
        let _ = self.outbound.send(Outbound::Frame(msg));
    }

    /// Next decoded message, if one is waiting
    pub fn try_recv(&mut self) -> Option<Message> {
        self.inbound.try_recv().ok()
    }

    /// Wait for the next decoded message.
    ///
    /// Returns `None` once the reader has stopped and the queue is empty.
    pub async fn recv(&mut self) -> Option<Message> {
        self.inbound.recv().await
    }

    /// Flush queued frames, then shut the socket down. Safe to call repeatedly.
    ///
    /// A write the peer is not draining is given up after [`CLOSE_GRACE_MS`].
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.alive.store(false, Ordering::Release);
        self.closing.send_replace(true);
        let _ = self.outbound.send(Outbound::Close);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_loop(
    read_half: OwnedReadHalf,
    inbound: mpsc::UnboundedSender<Message>,
    alive: Arc<AtomicBool>,
    mut stop: watch::Receiver<bool>,
    peer: String,
) {
    let mut reader = BufReader::new(read_half);
    let mut buf: Vec<u8> = Vec::with_capacity(512);

    loop {
        buf.clear();
        let read = tokio::select! {
            r = reader.read_until(b'\n', &mut buf) => r,
            _ = stop.changed() => break,
        };

        match read {
            Ok(0) => {
                debug!("{} closed the connection", peer);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("read from {} failed: {}", peer, e);
                break;
            }
        }

        let Ok(line) = std::str::from_utf8(&buf) else {
            debug!("discarding non-UTF-8 frame from {}", peer);
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_message(line) {
            Ok(msg) => {
                if inbound.send(msg).is_err() {
                    break;
                }
            }
            Err(e) => debug!("discarding frame from {}: {}", peer, e),
        }
    }

    alive.store(false, Ordering::Release);
}

async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    alive: Arc<AtomicBool>,
    mut closing: watch::Receiver<bool>,
    stop: watch::Sender<bool>,
    peer: String,
) {
    let write_timeout = Duration::from_millis(WRITE_TIMEOUT_MS);

    while let Some(item) = outbound.recv().await {
        let msg = match item {
            Outbound::Frame(msg) => msg,
            Outbound::Close => break,
        };

        let line = match encode_line(&msg) {
            Ok(line) => line,
            Err(e) => {
                warn!("could not encode {} for {}: {}", msg.kind(), peer, e);
                continue;
            }
        };

        let write = async {
            write_half.write_all(line.as_bytes()).await?;
            write_half.flush().await
        };
        let written = tokio::select! {
            r = tokio::time::timeout(write_timeout, write) => r,
            _ = close_grace(&mut closing) => {
                debug!("giving up on a stalled write to {}", peer);
                break;
            }
        };

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("send to {} failed: {}", peer, e);
                break;
            }
            Err(_) => {
                warn!("send to {} timed out, dropping the connection", peer);
                break;
            }
        }
    }

    alive.store(false, Ordering::Release);
    let _ = tokio::time::timeout(
        Duration::from_millis(CLOSE_GRACE_MS),
        write_half.shutdown(),
    )
    .await;
    // Wakes the reader; both halves then drop and the socket is released.
    let _ = stop.send(true);
}

/// Resolves [`CLOSE_GRACE_MS`] after the connection starts closing
async fn close_grace(closing: &mut watch::Receiver<bool>) {
    // An error means the handle is gone, which counts as closing too.
    let _ = closing.wait_for(|closing| *closing).await;
    tokio::time::sleep(Duration::from_millis(CLOSE_GRACE_MS)).await;
}
