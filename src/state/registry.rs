//! Room registry.
//!
//! Process-wide mapping from a room code to its active session. Codes are
//! drawn from a fixed pool of human-readable names, so capacity is bounded;
//! a code goes back into circulation only once its room has been evicted.
//! The registry also remembers which room each connection joined, so a bare
//! disconnect can be routed without the client naming its room.

use std::collections::HashMap;

use serde::Deserialize;

use super::action::ServerAction;
use super::free_session::FreeSession;
use super::match_session::{MatchSession, DEFAULT_WORD_COUNT};
use super::roster::{Roster, RoomState};

/// The fixed pool of room codes.
pub const ROOM_NAMES: [&str; 10] = [
    "Apple",
    "Watermelon",
    "Orange",
    "Strawberry",
    "Grape",
    "Blueberry",
    "Lychee",
    "Pear",
    "Banana",
    "Tangerine",
];

/// Which session variant a room runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Match,
    Free,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Free => "free",
        }
    }
}

/// A room's session, dispatched by variant at the protocol boundary.
#[derive(Debug, Clone)]
pub enum SessionKind {
    Match(MatchSession),
    Free(FreeSession),
}

impl SessionKind {
    pub fn mode(&self) -> SessionMode {
        match self {
            Self::Match(_) => SessionMode::Match,
            Self::Free(_) => SessionMode::Free,
        }
    }

    pub fn roster(&self) -> &Roster {
        match self {
            Self::Match(session) => &session.roster,
            Self::Free(session) => &session.roster,
        }
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        match self {
            Self::Match(session) => &mut session.roster,
            Self::Free(session) => &mut session.roster,
        }
    }

    pub fn room_state(&self) -> RoomState {
        self.roster().state()
    }
}

/// One active room.
#[derive(Debug, Clone)]
pub struct Room {
    pub code: String,
    pub session: SessionKind,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Every code in the name pool is in use
    NoCapacity,
    /// No room holds this code
    RoomNotFound(String),
    /// The room exists but runs the other session variant
    ModeMismatch { code: String, requested: SessionMode },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCapacity => write!(f, "All room names are in use"),
            Self::RoomNotFound(code) => write!(f, "Room {} does not exist", code),
            Self::ModeMismatch { code, requested } => {
                write!(f, "Room {} is not a {} room", code, requested.as_str())
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// What happened when a connection left its room.
#[derive(Debug, Clone)]
pub struct Departure {
    pub room_code: String,

    /// Display name of the member who left, when they had submitted one
    pub member_name: Option<String>,

    /// Actions to broadcast to the remaining members
    pub actions: Vec<ServerAction>,

    /// True when the room emptied and was removed
    pub evicted: bool,
}

/// Process-wide room bookkeeping.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,

    /// Connection id to room code, for routing disconnects
    member_index: HashMap<String, String>,

    /// Seed every new session starts from
    initial_seed: u64,

    /// Hand size every new session is configured with
    word_count: usize,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(1, DEFAULT_WORD_COUNT)
    }
}

impl RoomRegistry {
    pub fn new(initial_seed: u64, word_count: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            member_index: HashMap::new(),
            initial_seed,
            word_count,
        }
    }

    /// Allocate a code from the name pool and create a room.
    pub fn create_room(&mut self, mode: SessionMode) -> Result<&mut Room, RegistryError> {
        let code = ROOM_NAMES
            .iter()
            .find(|name| !self.rooms.contains_key(**name))
            .ok_or(RegistryError::NoCapacity)?
            .to_string();

        let session = match mode {
            SessionMode::Match => {
                SessionKind::Match(MatchSession::new(self.initial_seed, self.word_count))
            }
            SessionMode::Free => {
                SessionKind::Free(FreeSession::new(self.initial_seed, self.word_count))
            }
        };

        let room = Room {
            code: code.clone(),
            session,
            created_at: chrono::Utc::now(),
        };
        self.rooms.insert(code.clone(), room);
        Ok(self.rooms.get_mut(&code).unwrap())
    }

    pub fn get(&self, code: &str) -> Result<&Room, RegistryError> {
        self.rooms
            .get(code)
            .ok_or_else(|| RegistryError::RoomNotFound(code.to_string()))
    }

    pub fn get_mut(&mut self, code: &str) -> Result<&mut Room, RegistryError> {
        self.rooms
            .get_mut(code)
            .ok_or_else(|| RegistryError::RoomNotFound(code.to_string()))
    }

    /// Look up a room and require a session variant.
    pub fn get_mut_as(
        &mut self,
        code: &str,
        mode: SessionMode,
    ) -> Result<&mut Room, RegistryError> {
        let room = self.get_mut(code)?;
        if room.session.mode() != mode {
            return Err(RegistryError::ModeMismatch {
                code: code.to_string(),
                requested: mode,
            });
        }
        Ok(room)
    }

    /// Record that a connection joined a room.
    pub fn register_member(&mut self, connection_id: &str, code: &str) {
        self.member_index
            .insert(connection_id.to_string(), code.to_string());
    }

    /// Which room a connection joined, if any.
    pub fn room_of(&self, connection_id: &str) -> Option<&str> {
        self.member_index.get(connection_id).map(String::as_str)
    }

    /// Remove a connection from its room, evicting the room when it
    /// empties. Connections that never joined a room return `None`.
    pub fn remove_member(&mut self, connection_id: &str) -> Option<Departure> {
        let code = self.member_index.remove(connection_id)?;
        let room = self.rooms.get_mut(&code)?;

        let member_name = room
            .session
            .roster()
            .get_member(connection_id)
            .map(|m| m.name.clone());
        let actions = room.session.roster_mut().remove_member(connection_id);

        let evicted = room.session.roster().is_empty();
        if evicted {
            self.rooms.remove(&code);
        }

        Some(Departure {
            room_code: code,
            member_name,
            actions,
            evicted,
        })
    }

    pub fn count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_codes(&self) -> impl Iterator<Item = &String> {
        self.rooms.keys()
    }
}
