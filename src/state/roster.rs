//! Room roster and turn rotation.
//!
//! Both session variants share this state: who is in the room, in what
//! order they joined (join order is turn order), whose turn it is, and
//! whether the room is still open for joining. The variants embed a
//! [`Roster`] rather than inheriting from it; everything game-specific
//! lives in the variant itself.

use std::collections::HashMap;

use super::action::ServerAction;

/// A player (or spectator role) inside a room.
///
/// Keyed by connection id; immutable once created. Display names are
/// unique within an open room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Display name, unique within the room
    pub name: String,

    /// Client-chosen role label
    pub role: String,

    /// Transport connection id
    pub connection_id: String,
}

impl Member {
    pub fn new(connection_id: String, name: String, role: String) -> Self {
        Self {
            name,
            role,
            connection_id,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "role": self.role,
            "connectionId": self.connection_id,
        })
    }
}

/// Room lifecycle state.
///
/// Open rooms accept joins; the transition to Locked happens exactly once,
/// at game start, and never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomState {
    #[default]
    Open,
    Locked,
}

impl RoomState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Locked => "locked",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Roster errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    /// Join attempted after the room locked
    RoomLocked,
    /// Display name already present in the room
    DuplicateName(String),
    /// Turn rotation requested with zero members
    NoPlayers,
}

impl std::fmt::Display for RosterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoomLocked => write!(f, "Room is locked"),
            Self::DuplicateName(name) => {
                write!(f, "Name {} is already taken in this room", name)
            }
            Self::NoPlayers => write!(f, "No player exists in the room"),
        }
    }
}

impl std::error::Error for RosterError {}

/// Shared membership and turn state for one room.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    /// Members indexed by connection id
    members: HashMap<String, Member>,

    /// Connection ids in join order; doubles as turn order
    join_order: Vec<String>,

    /// Current player's connection id, if a game has assigned one
    current_player: Option<String>,

    /// Room lifecycle state
    state: RoomState,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member at the end of turn order.
    ///
    /// Fails with `RoomLocked` once play has started and with
    /// `DuplicateName` when the display name is already taken; name
    /// uniqueness inside an open room is a hard invariant.
    pub fn add_member(
        &mut self,
        connection_id: &str,
        name: &str,
        role: &str,
    ) -> Result<Vec<ServerAction>, RosterError> {
        if !self.state.is_open() {
            return Err(RosterError::RoomLocked);
        }

        if self.members.values().any(|m| m.name == name) {
            return Err(RosterError::DuplicateName(name.to_string()));
        }

        let member = Member::new(
            connection_id.to_string(),
            name.to_string(),
            role.to_string(),
        );
        self.members.insert(connection_id.to_string(), member);
        self.join_order.push(connection_id.to_string());

        Ok(vec![ServerAction::SetMembers {
            names: self.member_names(),
        }])
    }

    /// Remove a member by connection id.
    ///
    /// Unknown ids are a no-op (empty action list). Removing the last
    /// member returns only the membership notification; the caller is
    /// expected to evict the room. Otherwise the current player is
    /// re-derived, because the departing member might have been mid-turn.
    pub fn remove_member(&mut self, connection_id: &str) -> Vec<ServerAction> {
        if self.members.remove(connection_id).is_none() {
            return Vec::new();
        }
        self.join_order.retain(|id| id != connection_id);

        let set_members = ServerAction::SetMembers {
            names: self.member_names(),
        };

        if self.members.is_empty() {
            self.current_player = None;
            return vec![set_members];
        }

        // next_player cannot fail here, the roster is non-empty.
        let next = self
            .next_player()
            .expect("non-empty roster has a next player")
            .clone();
        self.current_player = Some(next.connection_id.clone());

        vec![ServerAction::ChangeTurns { player: next }, set_members]
    }

    /// Compute who plays next in join order, wrapping after the last
    /// member.
    ///
    /// No current player, or a current player whose connection id is no
    /// longer present (already removed), wraps to the first member.
    pub fn next_player(&self) -> Result<&Member, RosterError> {
        if self.join_order.is_empty() {
            return Err(RosterError::NoPlayers);
        }

        let current_index = self
            .current_player
            .as_deref()
            .and_then(|id| self.join_order.iter().position(|key| key == id));

        let next_id = match current_index {
            Some(index) if index + 1 < self.join_order.len() => &self.join_order[index + 1],
            // Last in order, stale id, or no current player: wrap to first
            _ => &self.join_order[0],
        };

        self.members.get(next_id).ok_or(RosterError::NoPlayers)
    }

    /// Advance the turn and return the new current player.
    pub fn rotate_turn(&mut self) -> Result<Member, RosterError> {
        let next = self.next_player()?.clone();
        self.current_player = Some(next.connection_id.clone());
        Ok(next)
    }

    /// Lock the room at game start. Idempotent; Locked never reverts.
    pub fn lock(&mut self) {
        self.state = RoomState::Locked;
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn current_player(&self) -> Option<&Member> {
        self.current_player
            .as_deref()
            .and_then(|id| self.members.get(id))
    }

    pub fn get_member(&self, connection_id: &str) -> Option<&Member> {
        self.members.get(connection_id)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.members.values().any(|m| m.name == name)
    }

    /// Display names in join order.
    pub fn member_names(&self) -> Vec<String> {
        self.join_order
            .iter()
            .filter_map(|id| self.members.get(id))
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let members: Vec<serde_json::Value> = self
            .join_order
            .iter()
            .filter_map(|id| self.members.get(id))
            .map(|m| m.to_json())
            .collect();

        serde_json::json!({
            "roomState": self.state.as_str(),
            "members": members,
            "currentPlayer": self.current_player().map(|m| m.to_json()),
        })
    }
}
