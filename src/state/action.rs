//! Card actions and server responses.
//!
//! Every state transition in a session consumes a [`CardAction`] sent by a
//! client and produces a sequence of [`ServerAction`]s for the transport
//! layer to broadcast. The shapes here are the shared vocabulary between the
//! Match and Free session variants.

use std::collections::HashMap;

use serde::Deserialize;

use super::free_session::FreeCardState;
use super::match_session::MatchCardState;
use super::roster::{Member, RosterError};

/// What a client is trying to do to a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientActionKind {
    /// Flip a card face-up (Match) or toggle its face (Free)
    Open,
    /// Drag a card by a relative delta (Free only)
    Move,
    /// Release a card at an absolute position (Free only)
    Drop,
}

impl ClientActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Move => "move",
            Self::Drop => "drop",
        }
    }
}

/// A 2D point on the card table, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({"x": self.x, "y": self.y})
    }
}

/// An inbound card action from a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardAction {
    #[serde(rename = "type")]
    pub kind: ClientActionKind,

    /// Index into the session's card list
    pub position: usize,

    /// Acting player's display name
    pub player: String,

    /// Room the action targets
    pub room_code: String,

    /// Drag delta or drop position, for Move/Drop
    #[serde(default)]
    pub payload: Option<Point>,
}

impl CardAction {
    /// Shorthand used by tests and the protocol adapter for Open actions.
    pub fn open(position: usize, player: &str, room_code: &str) -> Self {
        Self {
            kind: ClientActionKind::Open,
            position,
            player: player.to_string(),
            room_code: room_code.to_string(),
            payload: None,
        }
    }
}

/// Card states carried by an `UpdateCardStates` action.
///
/// The two session variants track different per-card state, so the payload
/// is a sealed choice rather than a generic parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum CardStates {
    Match(Vec<MatchCardState>),
    Free(Vec<FreeCardState>),
}

impl CardStates {
    pub fn len(&self) -> usize {
        match self {
            Self::Match(states) => states.len(),
            Self::Free(states) => states.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Match(states) => {
                serde_json::Value::Array(states.iter().map(|s| s.to_json()).collect())
            }
            Self::Free(states) => {
                serde_json::Value::Array(states.iter().map(|s| s.to_json()).collect())
            }
        }
    }
}

/// A server-side result of a state transition, to be broadcast to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerAction {
    /// Roster changed; payload is the full current name list
    SetMembers { names: Vec<String> },

    /// Turn moved to (or started with) this player
    ChangeTurns { player: Member },

    /// First card of a pair was revealed
    OpenCard { position: usize, player: String },

    /// Card states changed; `timeout_ms` is an advisory client-side delay
    /// before applying (the server state is already final)
    UpdateCardStates {
        states: CardStates,
        player: Option<String>,
        timeout_ms: Option<u64>,
    },

    /// Scoreboard changed
    SetScores {
        scores: HashMap<String, u32>,
        player: Option<String>,
    },

    /// Round finished; payload is every player tied for the maximum score
    EndGame { winners: Vec<String>, timeout_ms: u64 },
}

impl ServerAction {
    /// Wire name of this action.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::SetMembers { .. } => "set members",
            Self::ChangeTurns { .. } => "change turns",
            Self::OpenCard { .. } => "open card",
            Self::UpdateCardStates { .. } => "update card states",
            Self::SetScores { .. } => "set scores",
            Self::EndGame { .. } => "end game",
        }
    }

    /// Convert to the JSON envelope sent to clients.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::SetMembers { names } => serde_json::json!({
                "type": self.kind_str(),
                "payload": names,
            }),
            Self::ChangeTurns { player } => serde_json::json!({
                "type": self.kind_str(),
                "payload": player.to_json(),
                "player": player.name,
            }),
            Self::OpenCard { position, player } => serde_json::json!({
                "type": self.kind_str(),
                "payload": position,
                "player": player,
            }),
            Self::UpdateCardStates {
                states,
                player,
                timeout_ms,
            } => {
                let mut obj = serde_json::json!({
                    "type": self.kind_str(),
                    "payload": states.to_json(),
                });
                if let Some(player) = player {
                    obj["player"] = serde_json::json!(player);
                }
                if let Some(timeout) = timeout_ms {
                    obj["timeout"] = serde_json::json!(timeout);
                }
                obj
            }
            Self::SetScores { scores, player } => {
                let mut obj = serde_json::json!({
                    "type": self.kind_str(),
                    "payload": scores,
                });
                if let Some(player) = player {
                    obj["player"] = serde_json::json!(player);
                }
                obj
            }
            Self::EndGame {
                winners,
                timeout_ms,
            } => serde_json::json!({
                "type": self.kind_str(),
                "payload": winners,
                "timeout": timeout_ms,
            }),
        }
    }
}

/// Session errors.
///
/// `CardNotFound` and `UnrecognizedAction` are expected client mistakes
/// (stale or malformed actions) and resolve to a rejection for the sender.
/// `ScoreLookup` and `NoPlayers` are invariant violations: the room reached
/// a state the state machine promises is impossible, and the failure is
/// surfaced loudly instead of being swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Position is out of range, inactive, or already the flipped card
    CardNotFound(usize),
    /// Acting player has no scoreboard entry
    ScoreLookup(String),
    /// Action kind is not valid for this session variant
    UnrecognizedAction(ClientActionKind),
    /// Turn rotation requested with zero members
    NoPlayers,
    /// Room is locked and cannot accept this operation
    RoomLocked,
    /// Display name already taken in this room
    DuplicateName(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CardNotFound(position) => {
                write!(f, "Card {} does not exist or is inactive", position)
            }
            Self::ScoreLookup(player) => {
                write!(f, "Player {} has no score entry", player)
            }
            Self::UnrecognizedAction(kind) => {
                write!(f, "Action {} is not recognizable here", kind.as_str())
            }
            Self::NoPlayers => write!(f, "No player exists in the room"),
            Self::RoomLocked => write!(f, "Room is locked"),
            Self::DuplicateName(name) => {
                write!(f, "Name {} is already taken in this room", name)
            }
        }
    }
}

impl std::error::Error for SessionError {}

impl From<RosterError> for SessionError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::NoPlayers => Self::NoPlayers,
            RosterError::RoomLocked => Self::RoomLocked,
            RosterError::DuplicateName(name) => Self::DuplicateName(name),
        }
    }
}
