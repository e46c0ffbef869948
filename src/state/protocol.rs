//! Event protocol adapter.
//!
//! Translates inbound named client events into calls on the registry and
//! sessions, and the results into named outbound events with a delivery
//! scope. This is the whole transport boundary: the crate stays free of
//! sockets, and a WebSocket layer only has to feed [`ClientEvent`]s in and
//! fan [`Outbound`]s out.
//!
//! Expected client mistakes (stale card positions, unknown room codes,
//! duplicate names) become a rejection addressed to the sender only.
//! Invariant violations inside a session are surfaced as an explicit
//! invalid-room-state rejection rather than being swallowed; they never
//! take the process down, only the one room is affected.

use serde::Deserialize;

use super::action::{CardAction, ClientActionKind, ServerAction, SessionError};
use super::free_session::LayoutRule;
use super::registry::{RegistryError, RoomRegistry, SessionKind, SessionMode};

/// Inbound named events, as sent by clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "create room")]
    CreateRoom { mode: SessionMode },

    #[serde(rename = "enter room")]
    #[serde(rename_all = "camelCase")]
    EnterRoom { room_code: String, mode: SessionMode },

    #[serde(rename = "submit name")]
    #[serde(rename_all = "camelCase")]
    SubmitName {
        player_name: String,
        room_code: String,
        player_role: String,
    },

    #[serde(rename = "set words")]
    #[serde(rename_all = "camelCase")]
    SetWords {
        words: Vec<(String, String)>,
        room_code: String,
    },

    #[serde(rename = "confirm cards layout")]
    #[serde(rename_all = "camelCase")]
    ConfirmCardsLayout {
        room_code: String,
        layout_rules: Vec<LayoutRule>,
        group_words_by_set: bool,
    },

    #[serde(rename = "send action")]
    SendAction(CardAction),
}

/// Who an outbound event is delivered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Only the client whose event produced this
    Sender,
    /// Every member of the room
    Room(String),
    /// Every member of the room except the sender
    RoomExceptSender(String),
}

/// An outbound named event ready for the transport layer.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub event: &'static str,
    pub payload: serde_json::Value,
    pub scope: Scope,
}

impl Outbound {
    fn to_sender(event: &'static str, payload: serde_json::Value) -> Self {
        Self {
            event,
            payload,
            scope: Scope::Sender,
        }
    }

    fn to_room(event: &'static str, payload: serde_json::Value, code: &str) -> Self {
        Self {
            event,
            payload,
            scope: Scope::Room(code.to_string()),
        }
    }
}

const CREATED_ROOM: &str = "created new room";
const CONFIRMED_ROOM: &str = "confirmed room exists";
const REJECTED_ROOM: &str = "rejected room exists";
const JOINED_ROOM: &str = "joined room";
const GOT_NEW_MEMBER: &str = "got new member";
const READY_TO_SET_LAYOUT: &str = "ready to set layout";
const STARTED_GAME: &str = "started game";
const UPDATE_GAME_STATE: &str = "update game state";
const LEFT_ROOM: &str = "member left room";
const REJECTED_ACTION: &str = "rejected action";
const INVALID_ROOM_STATE: &str = "invalid room state";

/// Routes client events into the room registry.
#[derive(Debug, Default)]
pub struct EventRouter {
    pub registry: RoomRegistry,
}

impl EventRouter {
    pub fn new(registry: RoomRegistry) -> Self {
        Self { registry }
    }

    /// Handle one inbound event from `connection_id`, to completion.
    ///
    /// All state mutation happens synchronously here; callers are expected
    /// to feed events one at a time (single-threaded event loop, or one
    /// worker per room).
    pub fn handle(&mut self, connection_id: &str, event: ClientEvent) -> Vec<Outbound> {
        match event {
            ClientEvent::CreateRoom { mode } => self.create_room(mode),
            ClientEvent::EnterRoom { room_code, mode } => self.enter_room(&room_code, mode),
            ClientEvent::SubmitName {
                player_name,
                room_code,
                player_role,
            } => self.submit_name(connection_id, &player_name, &room_code, &player_role),
            ClientEvent::SetWords { words, room_code } => self.set_words(words, &room_code),
            ClientEvent::ConfirmCardsLayout {
                room_code,
                layout_rules,
                group_words_by_set,
            } => self.confirm_cards_layout(&room_code, &layout_rules, group_words_by_set),
            ClientEvent::SendAction(action) => self.send_action(&action),
        }
    }

    /// Handle a transport-level disconnect for `connection_id`.
    pub fn handle_disconnect(&mut self, connection_id: &str) -> Vec<Outbound> {
        let Some(departure) = self.registry.remove_member(connection_id) else {
            return Vec::new();
        };
        if departure.evicted {
            // Last member out; the room is gone and nobody is left to tell.
            return Vec::new();
        }

        vec![Outbound::to_room(
            LEFT_ROOM,
            serde_json::json!({
                "name": departure.member_name.unwrap_or_default(),
                "actions": action_json(&departure.actions),
            }),
            &departure.room_code,
        )]
    }

    fn create_room(&mut self, mode: SessionMode) -> Vec<Outbound> {
        match self.registry.create_room(mode) {
            Ok(room) => vec![Outbound::to_sender(
                CREATED_ROOM,
                serde_json::json!({"roomCode": room.code}),
            )],
            Err(err @ RegistryError::NoCapacity) => vec![Outbound::to_sender(
                REJECTED_ROOM,
                serde_json::json!({"reason": err.to_string()}),
            )],
            Err(err) => reject(err.to_string()),
        }
    }

    fn enter_room(&mut self, room_code: &str, mode: SessionMode) -> Vec<Outbound> {
        let rejected = |reason: String| {
            vec![Outbound::to_sender(
                REJECTED_ROOM,
                serde_json::json!({"roomCode": room_code, "reason": reason}),
            )]
        };

        match self.registry.get(room_code) {
            Ok(room) if room.session.mode() != mode => {
                rejected(format!("Room {} is not a {} room", room_code, mode.as_str()))
            }
            Ok(room) if !room.session.room_state().is_open() => {
                rejected(format!("Room {} has already started", room_code))
            }
            Ok(_) => vec![Outbound::to_sender(
                CONFIRMED_ROOM,
                serde_json::json!({"roomCode": room_code}),
            )],
            Err(err) => rejected(err.to_string()),
        }
    }

    fn submit_name(
        &mut self,
        connection_id: &str,
        player_name: &str,
        room_code: &str,
        player_role: &str,
    ) -> Vec<Outbound> {
        let room = match self.registry.get_mut(room_code) {
            Ok(room) => room,
            Err(err) => {
                return vec![Outbound::to_sender(
                    REJECTED_ROOM,
                    serde_json::json!({"roomCode": room_code, "reason": err.to_string()}),
                )];
            }
        };

        match room
            .session
            .roster_mut()
            .add_member(connection_id, player_name, player_role)
        {
            Ok(actions) => {
                self.registry.register_member(connection_id, room_code);
                vec![
                    Outbound::to_sender(
                        JOINED_ROOM,
                        serde_json::json!({"playerName": player_name}),
                    ),
                    Outbound::to_room(
                        GOT_NEW_MEMBER,
                        serde_json::json!({
                            "roomCode": room_code,
                            "actions": action_json(&actions),
                        }),
                        room_code,
                    ),
                ]
            }
            Err(err) => vec![Outbound::to_sender(
                REJECTED_ROOM,
                serde_json::json!({"roomCode": room_code, "reason": err.to_string()}),
            )],
        }
    }

    fn set_words(&mut self, words: Vec<(String, String)>, room_code: &str) -> Vec<Outbound> {
        let room = match self.registry.get_mut(room_code) {
            Ok(room) => room,
            Err(err) => return reject(err.to_string()),
        };

        match &mut room.session {
            SessionKind::Match(session) => match session.create_new_game(words) {
                Ok(setup) => vec![Outbound::to_room(
                    STARTED_GAME,
                    serde_json::json!({
                        "shuffledCards": setup
                            .shuffled_cards
                            .iter()
                            .map(|c| c.to_json())
                            .collect::<Vec<_>>(),
                        "cardStates": setup
                            .card_states
                            .iter()
                            .map(|s| s.to_json())
                            .collect::<Vec<_>>(),
                        "actions": action_json(&setup.actions),
                    }),
                    room_code,
                )],
                Err(err) => session_rejection(err),
            },
            SessionKind::Free(session) => match session.create_new_game(words) {
                Ok(()) => vec![Outbound::to_room(
                    READY_TO_SET_LAYOUT,
                    serde_json::Value::Null,
                    room_code,
                )],
                Err(err) => session_rejection(err),
            },
        }
    }

    fn confirm_cards_layout(
        &mut self,
        room_code: &str,
        layout_rules: &[LayoutRule],
        group_words_by_set: bool,
    ) -> Vec<Outbound> {
        let room = match self.registry.get_mut_as(room_code, SessionMode::Free) {
            Ok(room) => room,
            Err(err) => return reject(err.to_string()),
        };

        let SessionKind::Free(session) = &mut room.session else {
            // get_mut_as already checked the mode.
            unreachable!("free room dispatched to the match variant");
        };

        let setup = session.create_initial_card_states(layout_rules, group_words_by_set);
        vec![Outbound::to_room(
            STARTED_GAME,
            serde_json::json!({
                "shuffledCards": setup
                    .shuffled_cards
                    .iter()
                    .map(|c| c.to_json())
                    .collect::<Vec<_>>(),
                "cardStates": setup
                    .card_states
                    .iter()
                    .map(|s| s.to_json())
                    .collect::<Vec<_>>(),
                "actions": action_json(&setup.actions),
            }),
            room_code,
        )]
    }

    fn send_action(&mut self, action: &CardAction) -> Vec<Outbound> {
        let room = match self.registry.get_mut(&action.room_code) {
            Ok(room) => room,
            Err(err) => return reject(err.to_string()),
        };

        let result = match &mut room.session {
            SessionKind::Match(session) => session.implement_game_action(action),
            SessionKind::Free(session) => match action.kind {
                ClientActionKind::Open => session.open_card(action),
                ClientActionKind::Move => session.move_card(action),
                ClientActionKind::Drop => session.drop_card(action),
            },
        };

        match result {
            Ok(actions) => {
                // A lone first-flip reveal goes to everyone but the sender,
                // whose client already shows the card; resolved transitions
                // go to the whole room.
                let scope = if actions
                    .iter()
                    .all(|a| matches!(a, ServerAction::OpenCard { .. }))
                {
                    Scope::RoomExceptSender(action.room_code.clone())
                } else {
                    Scope::Room(action.room_code.clone())
                };
                vec![Outbound {
                    event: UPDATE_GAME_STATE,
                    payload: action_json(&actions),
                    scope,
                }]
            }
            Err(err) => session_rejection(err),
        }
    }
}

fn action_json(actions: &[ServerAction]) -> serde_json::Value {
    serde_json::Value::Array(actions.iter().map(|a| a.to_json()).collect())
}

fn reject(reason: String) -> Vec<Outbound> {
    vec![Outbound::to_sender(
        REJECTED_ACTION,
        serde_json::json!({"reason": reason}),
    )]
}

fn session_rejection(err: SessionError) -> Vec<Outbound> {
    let event = match err {
        // Contract failures: the room reached a state the machine promises
        // is impossible. Loud, sender-scoped, process keeps running.
        SessionError::ScoreLookup(_) | SessionError::NoPlayers => INVALID_ROOM_STATE,
        _ => REJECTED_ACTION,
    };
    vec![Outbound::to_sender(
        event,
        serde_json::json!({"reason": err.to_string()}),
    )]
}
