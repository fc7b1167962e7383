//! LAN Tetris runner (default binary).
//!
//! `lan-tetris host` opens a room and plays as player 1; `lan-tetris join <ip>`
//! connects to one. Rendering lives elsewhere, so both sides are driven by the
//! headless autoplayer and report the final ranking on stdout.

use std::net::SocketAddr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::time::MissedTickBehavior;

use lan_tetris::autoplay::AutoPlayer;
use lan_tetris::core::{GameSession, SessionEvent};
use lan_tetris::net::config::{
    lan_address, BOARD_SEND_INTERVAL_MS, DEFAULT_PORT, START_DELAY_SECONDS, WELCOME_WAIT_MS,
};
use lan_tetris::net::{ClientPeer, EndPacket, RelayConfig, RelayHandle, Roster};

/// Frame length of the simulation loop (about 60 FPS)
const FRAME_MS: u64 = 16;

/// Connect timeout when joining a host
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Parser, Debug)]
#[command(author, version, about = "LAN multiplayer falling-block game")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Milliseconds the autoplayer waits before placing each piece
    #[arg(long, global = true, default_value_t = 250)]
    think_ms: u32,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a room and play as the host
    Host {
        /// Port to listen on (defaults to LAN_TETRIS_PORT or 5000)
        #[arg(short, long)]
        port: Option<u16>,
        /// Peers accepted besides the host (defaults to LAN_TETRIS_MAX_CLIENTS or 7)
        #[arg(long)]
        max_clients: Option<usize>,
        /// Start once this many players, host included, are in the room
        #[arg(long, default_value_t = 2)]
        players: usize,
        #[arg(short, long, default_value = "Host")]
        name: String,
        /// Seconds between start and the first frame
        #[arg(long, default_value_t = START_DELAY_SECONDS)]
        start_delay: f64,
    },
    /// Join a room
    Join {
        /// Host IP address or name
        host: String,
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(short, long, default_value = "Player")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let Cli { command, think_ms } = Cli::parse();

    let run = async move {
        match command {
            Command::Host {
                port,
                max_clients,
                players,
                name,
                start_delay,
            } => {
                let mut config = RelayConfig::from_env();
                if let Some(port) = port {
                    config.port = port;
                }
                if let Some(max_clients) = max_clients {
                    config.max_clients = max_clients;
                }
                run_host(config, players, name, start_delay, think_ms).await
            }
            Command::Join { host, port, name } => {
                run_join(&host, port, name, think_ms).await
            }
        }
    };

    tokio::select! {
        result = run => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, leaving");
            Ok(())
        }
    }
}

fn now_epoch() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn session_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
        .unwrap_or(1)
}

async fn sleep_until_epoch(at: f64) {
    let delay = at - now_epoch();
    if delay > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(delay)).await;
    }
}

fn print_ranking(end: &EndPacket) {
    let name = |id| end.roster.get(id).unwrap_or("?").to_string();
    match end.winner {
        Some(id) => println!("Winner: {} (id {})", name(id), id),
        None => println!("No winner"),
    }
    for (place, id) in end.ranking.iter().enumerate() {
        println!("{:>2}. {} (id {})", place + 1, name(*id), id);
    }
}

fn describe_roster(roster: &Roster) -> String {
    roster
        .iter()
        .map(|(id, name)| format!("{}:{}", id, name))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn run_host(
    config: RelayConfig,
    players: usize,
    name: String,
    start_delay: f64,
    think_ms: u32,
) -> Result<()> {
    let relay = RelayHandle::start(config)
        .await
        .context("failed to open the room")?;
    let local = relay.local_addr();
    if local.ip().is_unspecified() {
        println!("Hosting on {} (port {})", lan_address().await, local.port());
    } else {
        println!("Hosting on {}", local);
    }

    let result = host_match(&relay, players.max(1), &name, start_delay, think_ms).await;
    relay.shutdown().await;
    result
}

async fn host_match(
    relay: &RelayHandle,
    players: usize,
    name: &str,
    start_delay: f64,
    think_ms: u32,
) -> Result<()> {
    let mut seen = 0;
    loop {
        let roster = relay.roster().await?;
        if roster.len() != seen {
            seen = roster.len();
            info!("lobby: {}", describe_roster(&roster));
        }
        if roster.len() >= players {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let at = now_epoch() + start_delay;
    relay.schedule_start(at)?;
    sleep_until_epoch(at).await;

    let mut session = GameSession::new(session_seed());
    let mut bot = AutoPlayer::new(think_ms);
    let mut frames = tokio::time::interval(Duration::from_millis(FRAME_MS));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();

    loop {
        frames.tick().await;
        let elapsed_ms = last.elapsed().as_millis().min(u32::MAX as u128) as u32;
        last = Instant::now();

        let report = relay
            .poll_and_route(name, session.board_string(), session.alive())
            .await?;
        if report.attacks > 0 {
            session.receive_garbage(report.attacks);
        }
        if let Some(end) = report.end {
            print_ranking(&end);
            return Ok(());
        }

        if session.alive() {
            bot.drive(&mut session, elapsed_ms);
            session.tick(elapsed_ms);
        }
        for event in session.take_events() {
            match event {
                SessionEvent::Attack(n) => relay.broadcast_attack(n)?,
                SessionEvent::Died => {
                    info!("host topped out");
                    relay.announce_host_death()?;
                }
            }
        }
    }
}

async fn run_join(host: &str, port: u16, name: String, think_ms: u32) -> Result<()> {
    let addr: SocketAddr = tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("could not resolve {}", host))?
        .next()
        .with_context(|| format!("no address for {}", host))?;

    let mut peer = ClientPeer::join(addr, CONNECT_TIMEOUT)
        .await
        .with_context(|| format!("could not join {}", addr))?;
    let id = peer
        .wait_welcome(Duration::from_millis(WELCOME_WAIT_MS))
        .await;
    println!("Joined {} as player {}", addr, id);
    peer.send_hello(&name);

    let start_at = loop {
        peer.drain();
        if let Some(at) = peer.view().start_at {
            break at;
        }
        if !peer.is_connected() {
            bail!("host closed the connection before the match started");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    sleep_until_epoch(start_at).await;

    let mut session = GameSession::new(session_seed());
    let mut bot = AutoPlayer::new(think_ms);
    let mut frames = tokio::time::interval(Duration::from_millis(FRAME_MS));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();
    let mut last_board_send = Instant::now();

    loop {
        frames.tick().await;
        let elapsed_ms = last.elapsed().as_millis().min(u32::MAX as u128) as u32;
        last = Instant::now();

        let attacks = peer.drain();
        if attacks > 0 {
            session.receive_garbage(attacks);
        }
        if let Some(end) = peer.view().end.clone() {
            print_ranking(&end);
            peer.close();
            return Ok(());
        }
        if !peer.is_connected() {
            warn!("lost the connection to the host");
            bail!("disconnected from host");
        }

        if last_board_send.elapsed() >= Duration::from_millis(BOARD_SEND_INTERVAL_MS) {
            last_board_send = Instant::now();
            peer.send_board(session.board_string(), session.alive());
        }

        if session.alive() {
            bot.drive(&mut session, elapsed_ms);
            session.tick(elapsed_ms);
        }
        for event in session.take_events() {
            match event {
                SessionEvent::Attack(n) => peer.send_attack(n),
                SessionEvent::Died => {
                    info!("topped out");
                    peer.send_dead();
                }
            }
        }
    }
}
