//! State management module for FlipCard.
//!
//! This module provides the core state types for the game server:
//!
//! - `rng` - Seeded randomness (pure hash-to-float, deterministic shuffle,
//!   circular sampling, incrementing seed source)
//! - `roster` - Room membership and turn rotation, shared by both variants
//! - `action` - Client card actions, server result actions, session errors
//! - `match_session` - Turn-based memory-matching game
//! - `free_session` - Free-form card table (flip/drag/drop, no turns)
//! - `registry` - Room-code allocation and lookup
//! - `protocol` - Named-event adapter at the transport boundary
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          EventRouter                             │
//! │   named client events ◀──▶ named broadcast events + scopes       │
//! │                                                                  │
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │                        RoomRegistry                        │  │
//! │  │   room code ──▶ Room { SessionKind }                       │  │
//! │  │   connection id ──▶ room code                              │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! │                                                                  │
//! │  ┌──────────────────────────┐  ┌──────────────────────────────┐  │
//! │  │       MatchSession       │  │         FreeSession          │  │
//! │  │  cards, flipped, scores  │  │  cards, positions, layers    │  │
//! │  │  Idle ─▶ OneOpen ─▶ Idle │  │  flip / move / drop          │  │
//! │  │            └─▶ Ended     │  │                              │  │
//! │  ├──────────────────────────┤  ├──────────────────────────────┤  │
//! │  │   Roster (membership,    │  │   Roster (membership,        │  │
//! │  │   turn order, lock)      │  │   turn order, lock)          │  │
//! │  └──────────────────────────┘  └──────────────────────────────┘  │
//! │                                                                  │
//! │            rng: random(seed) / shuffle / SeedSequence            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All mutation is synchronous and runs to completion per event. Rooms
//! never share mutable state with each other; a multi-threaded caller only
//! has to guard the registry and keep each room's events on one worker.

pub mod action;
pub mod free_session;
pub mod match_session;
pub mod protocol;
pub mod registry;
pub mod rng;
pub mod roster;

// Re-export commonly used types
pub use action::{CardAction, CardStates, ClientActionKind, Point, ServerAction, SessionError};
pub use free_session::{
    Content, FreeCard, FreeCardState, FreeSession, FreeSetup, LayoutRule, ZIndexLayer,
};
pub use match_session::{
    CardSide, MatchCardState, MatchSession, MatchSetup, WordCard, CLOSE_CARD_DELAY_MS,
    DEFAULT_WORD_COUNT, END_GAME_DELAY_MS,
};
pub use protocol::{ClientEvent, EventRouter, Outbound, Scope};
pub use registry::{
    Departure, RegistryError, Room, RoomRegistry, SessionKind, SessionMode, ROOM_NAMES,
};
pub use rng::{random, sample_circular, shuffle, SeedSequence};
pub use roster::{Member, RoomState, Roster, RosterError};
