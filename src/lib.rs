//! FlipCard State Library
//!
//! This crate provides state management for FlipCard game logic: the
//! server-side session engine for a turn-based, multiplayer flashcard
//! matching game played over a real-time event channel.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Deterministic RNG** - Seeded hash-to-float, deterministic shuffle,
//!   and an incrementing seed source, so a fixed seed reproduces an exact
//!   card layout.
//!
//! - **Roster and Turns** - Room membership keyed by connection, join order
//!   as turn order, wrap-around rotation, open/locked room lifecycle.
//!
//! - **Match Sessions** - The memory-matching game: sampled word pairs,
//!   shuffled word/translation cards, open/match/mismatch transitions,
//!   scoring, and win detection with ties.
//!
//! - **Free Sessions** - A shared free-form card table: per-set layout
//!   rules, grid placement, and flip/drag/drop on any card by any member.
//!
//! - **Room Registry** - Rooms by human-readable code from a bounded name
//!   pool, with eviction when the last member leaves.
//!
//! - **Event Protocol** - Translation between inbound named client events
//!   and outbound broadcast events with delivery scopes.
//!
//! # Design Principles
//!
//! 1. **Validate before mutating** - Every transition checks its inputs
//!    fully before writing, so a failed action leaves the room untouched.
//!
//! 2. **Determinism by seed** - Card layouts are pure functions of a seed,
//!    which keeps game logic reproducible in tests without transmitting
//!    full card state.
//!
//! 3. **No networking** - This crate is pure state, no WebSocket or HTTP.
//!
//! 4. **Serialization-ready** - All types can be converted to JSON for
//!    clients.
//!
//! # Example
//!
//! ```rust
//! use flipcard_state::state::{ClientEvent, EventRouter, SessionMode};
//!
//! let mut router = EventRouter::default();
//!
//! // Create a match room and read back its code
//! let out = router.handle("conn-1", ClientEvent::CreateRoom { mode: SessionMode::Match });
//! let room_code = out[0].payload["roomCode"].as_str().unwrap().to_string();
//!
//! // A player joins
//! router.handle("conn-1", ClientEvent::SubmitName {
//!     player_name: "Alice".to_string(),
//!     room_code: room_code.clone(),
//!     player_role: "host".to_string(),
//! });
//!
//! // Submitting a word pool starts the game
//! let words = vec![("apple".to_string(), "リンゴ".to_string())];
//! let out = router.handle("conn-1", ClientEvent::SetWords { words, room_code });
//! assert_eq!(out[0].event, "started game");
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
