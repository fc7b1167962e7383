//! Protocol module - JSON messages exchanged between host and players
//!
//! Every frame is one JSON object on its own line, tagged by the `t` field.
//! Clients send `hello`, `board`, `atk` and `dead`; the host sends everything
//! else, plus relayed copies of `board` and `dead` carrying the sender's `id`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Player identity; the host is always [`HOST_ID`], peers count up from 2
pub type PlayerId = u32;

pub const HOST_ID: PlayerId = 1;

/// First id handed to a joining peer
pub const FIRST_PEER_ID: PlayerId = 2;

/// Display names are cut to this many chars
pub const MAX_NAME_CHARS: usize = 16;

/// Name used for the host until it reports its own
pub const DEFAULT_HOST_NAME: &str = "Host";

/// Name a peer carries until its `hello` arrives
pub fn default_name(id: PlayerId) -> String {
    format!("Player{}", id)
}

/// Cut a display name to [`MAX_NAME_CHARS`] chars
pub fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_CHARS).collect()
}

/// Player id to display name.
///
/// JSON object keys are strings, so ids travel stringified (`{"1":"Host"}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct Roster(BTreeMap<PlayerId, String>);

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roster holding only the host under its default name
    pub fn with_host() -> Self {
        let mut roster = Self::new();
        roster.insert(HOST_ID, DEFAULT_HOST_NAME.to_string());
        roster
    }

    pub fn insert(&mut self, id: PlayerId, name: String) {
        self.0.insert(id, name);
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<String> {
        self.0.remove(&id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &str)> + '_ {
        self.0.iter().map(|(id, name)| (*id, name.as_str()))
    }
}

impl TryFrom<BTreeMap<String, String>> for Roster {
    type Error = String;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        map.into_iter()
            .map(|(key, name)| {
                key.trim()
                    .parse::<PlayerId>()
                    .map(|id| (id, name))
                    .map_err(|_| format!("invalid player id {:?}", key))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Roster)
    }
}

impl From<Roster> for BTreeMap<String, String> {
    fn from(roster: Roster) -> Self {
        roster
            .0
            .into_iter()
            .map(|(id, name)| (id.to_string(), name))
            .collect()
    }
}

/// Why the host turned a connection away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    RoomFull,
    GameStarted,
    /// Any reason this build does not know about
    Unknown,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::RoomFull => "room_full",
            RejectReason::GameStarted => "game_started",
            RejectReason::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RejectReason {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.eq_ignore_ascii_case("room_full") {
            Ok(Self::RoomFull)
        } else if s.eq_ignore_ascii_case("game_started") {
            Ok(Self::GameStarted)
        } else {
            Ok(Self::Unknown)
        }
    }
}

impl Serialize for RejectReason {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

fn default_alive() -> bool {
    true
}

fn default_reject_reason() -> RejectReason {
    RejectReason::Unknown
}

/// Client introduces its display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Host assigns an id to a new connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Welcome {
    pub id: PlayerId,
    #[serde(default)]
    pub roster: Roster,
}

/// A player joined the lobby
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterUpdate {
    #[serde(default)]
    pub roster: Roster,
}

/// A player's visible board and whether it is still in the game.
///
/// `id` is absent on the copy a client sends and filled in on relayed copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PlayerId>,
    #[serde(default)]
    pub s: String,
    #[serde(default = "default_alive")]
    pub alive: bool,
}

/// Garbage lines sent to opponents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    #[serde(default)]
    pub n: u32,
}

/// A player topped out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dead {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PlayerId>,
}

/// The match begins at `at` (seconds since the Unix epoch)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Start {
    pub at: f64,
}

/// Final standings, best first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndPacket {
    pub winner: Option<PlayerId>,
    #[serde(default)]
    pub ranking: Vec<PlayerId>,
    #[serde(default)]
    pub roster: Roster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reject {
    #[serde(default = "default_reject_reason")]
    pub reason: RejectReason,
}

/// Every frame on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum Message {
    Hello(Hello),
    Welcome(Welcome),
    Join(Join),
    Roster(RosterUpdate),
    Board(BoardUpdate),
    #[serde(rename = "atk")]
    Attack(Attack),
    Dead(Dead),
    Start(Start),
    End(EndPacket),
    Reject(Reject),
}

impl Message {
    /// Wire name of the variant, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello(_) => "hello",
            Message::Welcome(_) => "welcome",
            Message::Join(_) => "join",
            Message::Roster(_) => "roster",
            Message::Board(_) => "board",
            Message::Attack(_) => "atk",
            Message::Dead(_) => "dead",
            Message::Start(_) => "start",
            Message::End(_) => "end",
            Message::Reject(_) => "reject",
        }
    }
}

// ============== Utility Functions ==============

/// Serialize a message as one newline-terminated line
pub fn encode_line(msg: &Message) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(msg)?;
    line.push('\n');
    Ok(line)
}

/// Parse one line (without its terminator) into a message
pub fn parse_message(line: &str) -> Result<Message, serde_json::Error> {
    serde_json::from_str(line.trim())
}

pub fn create_hello(name: &str) -> Message {
    Message::Hello(Hello {
        name: Some(name.to_string()),
    })
}

pub fn create_board(id: Option<PlayerId>, s: String, alive: bool) -> Message {
    Message::Board(BoardUpdate { id, s, alive })
}

pub fn create_attack(n: u32) -> Message {
    Message::Attack(Attack { n })
}

pub fn create_dead(id: Option<PlayerId>) -> Message {
    Message::Dead(Dead { id })
}

pub fn create_reject(reason: RejectReason) -> Message {
    Message::Reject(Reject { reason })
}

pub fn create_roster(roster: &Roster) -> Message {
    Message::Roster(RosterUpdate {
        roster: roster.clone(),
    })
}
