//! Match session: the turn-based memory-matching game.
//!
//! A hand of word pairs is sampled from the room's word pool, expanded into
//! word/translation cards, shuffled, and laid face-down. Players take turns
//! revealing two cards; a revealed pair that are each other's counterpart
//! scores a point and stays face-up, anything else flips back and passes the
//! turn.
//!
//! # State Diagram
//!
//! ```text
//!             open (first card)
//!  ┌──────┐ ─────────────────────▶ ┌─────────┐
//!  │ Idle │                        │ OneOpen │
//!  └──────┘ ◀───────────────────── └─────────┘
//!     │        open (second card)
//!     │        match: score, keep both up, same turn
//!     │        mismatch: close both, rotate turn
//!     ▼
//!  ┌───────┐  matched_pairs == hand size
//!  │ Ended │
//!  └───────┘
//! ```

use std::collections::HashMap;

use super::action::{CardAction, CardStates, ClientActionKind, ServerAction, SessionError};
use super::rng::{sample_circular, shuffle, SeedSequence};
use super::roster::Roster;

/// Default hand size: 8 word pairs, 16 cards.
pub const DEFAULT_WORD_COUNT: usize = 8;

/// Advisory client-side delay before closing mismatched cards.
pub const CLOSE_CARD_DELAY_MS: u64 = 1000;

/// Advisory client-side delay before showing the end-game screen.
pub const END_GAME_DELAY_MS: u64 = 1000;

/// Which half of a pair a card shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSide {
    Word,
    Translation,
}

impl CardSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Translation => "translation",
        }
    }
}

/// One face of the card table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCard {
    /// Text shown on this card
    pub word: String,

    /// Whether this is the word or the translation half
    pub side: CardSide,

    /// Text of the matching card
    pub counterpart: String,
}

impl WordCard {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "word": self.word,
            "side": self.side.as_str(),
            "counterpart": self.counterpart,
        })
    }
}

/// Per-card state, parallel-indexed to the shuffled card list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCardState {
    /// Inactive cards are resolved and ignore further actions
    pub is_active: bool,

    /// Face-up on clients
    pub is_open: bool,
}

impl Default for MatchCardState {
    fn default() -> Self {
        Self {
            is_active: true,
            is_open: false,
        }
    }
}

impl MatchCardState {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "isActive": self.is_active,
            "isOpen": self.is_open,
        })
    }
}

/// The single face-up, not-yet-resolved card awaiting a second reveal.
#[derive(Debug, Clone)]
struct FlippedCard {
    position: usize,
    card: WordCard,
}

/// Everything a client needs to render a freshly started game.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSetup {
    pub shuffled_cards: Vec<WordCard>,
    pub card_states: Vec<MatchCardState>,
    pub actions: Vec<ServerAction>,
}

/// Turn-based matching session for one room.
#[derive(Debug, Clone)]
pub struct MatchSession {
    /// Shared membership and turn state
    pub roster: Roster,

    seeds: SeedSequence,

    /// Configured hand size in word pairs
    word_count: usize,

    /// All words the room submitted to practice
    word_pool: Vec<(String, String)>,

    /// The pairs sampled for the current round
    selected_words: Vec<(String, String)>,

    /// Card layout for the current round
    shuffled_cards: Vec<WordCard>,

    /// Per-card state, same length as `shuffled_cards`
    card_states: Vec<MatchCardState>,

    flipped: Option<FlippedCard>,

    matched_pairs: usize,

    /// Points per display name
    scores: HashMap<String, u32>,
}

impl MatchSession {
    pub fn new(initial_seed: u64, word_count: usize) -> Self {
        Self {
            roster: Roster::new(),
            seeds: SeedSequence::new(initial_seed),
            word_count,
            word_pool: Vec::new(),
            selected_words: Vec::new(),
            shuffled_cards: Vec::new(),
            card_states: Vec::new(),
            flipped: None,
            matched_pairs: 0,
            scores: HashMap::new(),
        }
    }

    /// Start (or reset) a round from a word pool.
    ///
    /// Samples a hand, builds and shuffles the card layout, zeroes scores
    /// for every current member, assigns the first turn, and locks the
    /// room. The hand is clamped to the pool size when the pool is small.
    pub fn create_new_game(
        &mut self,
        word_pool: Vec<(String, String)>,
    ) -> Result<MatchSetup, SessionError> {
        let current_player = self.roster.rotate_turn()?;

        self.word_pool = word_pool;

        let sample_seed = self.seeds.advance();
        self.selected_words = sample_circular(&self.word_pool, sample_seed, self.word_count);

        let mut cards = Vec::with_capacity(self.selected_words.len() * 2);
        for (word, translation) in &self.selected_words {
            cards.push(WordCard {
                word: word.clone(),
                side: CardSide::Word,
                counterpart: translation.clone(),
            });
            cards.push(WordCard {
                word: translation.clone(),
                side: CardSide::Translation,
                counterpart: word.clone(),
            });
        }

        let shuffle_seed = self.seeds.advance();
        self.shuffled_cards = shuffle(cards, shuffle_seed);
        self.card_states = vec![MatchCardState::default(); self.shuffled_cards.len()];
        self.flipped = None;
        self.matched_pairs = 0;

        self.scores = self
            .roster
            .member_names()
            .into_iter()
            .map(|name| (name, 0))
            .collect();

        self.roster.lock();

        let actions = vec![
            ServerAction::ChangeTurns {
                player: current_player,
            },
            ServerAction::SetScores {
                scores: self.scores.clone(),
                player: None,
            },
        ];

        Ok(MatchSetup {
            shuffled_cards: self.shuffled_cards.clone(),
            card_states: self.card_states.clone(),
            actions,
        })
    }

    /// Run one Open action through the match state machine.
    ///
    /// All validation happens before any state is written, so a failed
    /// action leaves the session untouched.
    pub fn implement_game_action(
        &mut self,
        action: &CardAction,
    ) -> Result<Vec<ServerAction>, SessionError> {
        if action.kind != ClientActionKind::Open {
            return Err(SessionError::UnrecognizedAction(action.kind));
        }

        let position = action.position;
        let card = self
            .shuffled_cards
            .get(position)
            .ok_or(SessionError::CardNotFound(position))?
            .clone();
        let state = self.card_states[position];
        if !state.is_active {
            return Err(SessionError::CardNotFound(position));
        }

        let flipped = match &self.flipped {
            None => {
                // First card of the pair: reveal and wait. No turn change,
                // no score change.
                self.card_states[position] = MatchCardState {
                    is_active: true,
                    is_open: true,
                };
                self.flipped = Some(FlippedCard {
                    position,
                    card,
                });
                return Ok(vec![ServerAction::OpenCard {
                    position,
                    player: action.player.clone(),
                }]);
            }
            Some(flipped) => {
                // Re-sending the already-flipped position is a stale
                // client action, not a self-match.
                if flipped.position == position {
                    return Err(SessionError::CardNotFound(position));
                }
                flipped.clone()
            }
        };

        if card.word == flipped.card.counterpart {
            self.resolve_match(position, flipped.position, &action.player)
        } else {
            self.resolve_mismatch(position, flipped.position, &action.player)
        }
    }

    /// Second card matched the flipped one: both stay up and score.
    fn resolve_match(
        &mut self,
        position: usize,
        flipped_position: usize,
        player: &str,
    ) -> Result<Vec<ServerAction>, SessionError> {
        // Validate the score entry before touching any card state.
        if !self.scores.contains_key(player) {
            return Err(SessionError::ScoreLookup(player.to_string()));
        }

        let resolved = MatchCardState {
            is_active: false,
            is_open: true,
        };
        self.card_states[position] = resolved;
        self.card_states[flipped_position] = resolved;

        self.matched_pairs += 1;
        if let Some(score) = self.scores.get_mut(player) {
            *score += 1;
        }
        self.flipped = None;

        let mut actions = vec![
            ServerAction::UpdateCardStates {
                states: CardStates::Match(self.card_states.clone()),
                player: Some(player.to_string()),
                timeout_ms: None,
            },
            ServerAction::SetScores {
                scores: self.scores.clone(),
                player: Some(player.to_string()),
            },
        ];

        if self.is_finished() {
            actions.push(ServerAction::EndGame {
                winners: self.winners(),
                timeout_ms: END_GAME_DELAY_MS,
            });
        }

        Ok(actions)
    }

    /// Second card did not match: both flip back down and the turn passes.
    ///
    /// The first-flipped card stays active so it can be re-opened later.
    fn resolve_mismatch(
        &mut self,
        position: usize,
        flipped_position: usize,
        player: &str,
    ) -> Result<Vec<ServerAction>, SessionError> {
        let next_player = self.roster.rotate_turn()?;

        let closed = MatchCardState {
            is_active: true,
            is_open: false,
        };
        self.card_states[flipped_position] = closed;
        self.card_states[position] = closed;
        self.flipped = None;

        Ok(vec![
            ServerAction::UpdateCardStates {
                states: CardStates::Match(self.card_states.clone()),
                player: Some(player.to_string()),
                timeout_ms: Some(CLOSE_CARD_DELAY_MS),
            },
            ServerAction::ChangeTurns {
                player: next_player,
            },
        ])
    }

    /// Every player tied for the maximum score.
    fn winners(&self) -> Vec<String> {
        let max = self.scores.values().copied().max().unwrap_or(0);
        let mut winners: Vec<String> = self
            .scores
            .iter()
            .filter(|(_, score)| **score == max)
            .map(|(name, _)| name.clone())
            .collect();
        winners.sort();
        winners
    }

    /// Terminal once every pair of the hand is matched.
    pub fn is_finished(&self) -> bool {
        !self.selected_words.is_empty() && self.matched_pairs == self.selected_words.len()
    }

    pub fn shuffled_cards(&self) -> &[WordCard] {
        &self.shuffled_cards
    }

    pub fn card_states(&self) -> &[MatchCardState] {
        &self.card_states
    }

    pub fn scores(&self) -> &HashMap<String, u32> {
        &self.scores
    }

    pub fn matched_pairs(&self) -> usize {
        self.matched_pairs
    }

    /// Full state snapshot for clients.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "roster": self.roster.to_json(),
            "shuffledCards": self.shuffled_cards.iter().map(|c| c.to_json()).collect::<Vec<_>>(),
            "cardStates": self.card_states.iter().map(|s| s.to_json()).collect::<Vec<_>>(),
            "scores": self.scores,
            "matchedPairs": self.matched_pairs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn word_pool() -> Vec<(String, String)> {
        [
            ("apple", "リンゴ"),
            ("pear", "桃"),
            ("strawberry", "イチゴ"),
            ("banana", "バナナ"),
        ]
        .iter()
        .map(|(w, t)| (w.to_string(), t.to_string()))
        .collect()
    }

    /// Two members, three-pair hand, fixed seed 1.
    fn started_session() -> MatchSession {
        let mut session = MatchSession::new(1, 3);
        session.roster.add_member("c1", "bee", "player").unwrap();
        session.roster.add_member("c2", "bing", "player").unwrap();
        session.create_new_game(word_pool()).unwrap();
        session
    }

    /// Position of the counterpart of the card at `position`.
    fn counterpart_position(session: &MatchSession, position: usize) -> usize {
        let counterpart = &session.shuffled_cards()[position].counterpart;
        session
            .shuffled_cards()
            .iter()
            .enumerate()
            .find(|(i, c)| *i != position && c.word == *counterpart)
            .map(|(i, _)| i)
            .unwrap()
    }

    /// An active position whose card is neither `position` nor its
    /// counterpart.
    fn non_counterpart_position(session: &MatchSession, position: usize) -> usize {
        let counterpart = &session.shuffled_cards()[position].counterpart;
        session
            .shuffled_cards()
            .iter()
            .enumerate()
            .find(|(i, c)| {
                *i != position && c.word != *counterpart && session.card_states()[*i].is_active
            })
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn test_new_game_shape() {
        let session = started_session();

        assert_eq!(session.shuffled_cards().len(), 6);
        assert_eq!(session.card_states().len(), 6);
        for state in session.card_states() {
            assert_eq!(*state, MatchCardState::default());
        }
        assert_eq!(session.matched_pairs(), 0);
        assert_eq!(session.scores().len(), 2);
        assert!(session.scores().values().all(|s| *s == 0));
        assert!(!session.roster.state().is_open());
    }

    #[test]
    fn test_new_game_actions() {
        let mut session = MatchSession::new(1, 3);
        session.roster.add_member("c1", "bee", "player").unwrap();
        session.roster.add_member("c2", "bing", "player").unwrap();
        let setup = session.create_new_game(word_pool()).unwrap();

        assert_eq!(setup.actions.len(), 2);
        assert!(matches!(
            setup.actions[0],
            ServerAction::ChangeTurns { ref player } if player.name == "bee"
        ));
        assert!(matches!(setup.actions[1], ServerAction::SetScores { .. }));
    }

    #[test]
    fn test_new_game_is_deterministic() {
        let layout = |seed| {
            let mut session = MatchSession::new(seed, 3);
            session.roster.add_member("c1", "bee", "player").unwrap();
            session.create_new_game(word_pool()).unwrap().shuffled_cards
        };

        assert_eq!(layout(7), layout(7));
        assert_ne!(layout(7), layout(8));
    }

    #[test]
    fn test_new_game_without_members_fails() {
        let mut session = MatchSession::new(1, 3);
        assert_eq!(
            session.create_new_game(word_pool()),
            Err(SessionError::NoPlayers)
        );
    }

    #[test]
    fn test_sampling_wraps_around_small_pool() {
        // Every seed must yield a full hand even when the circular slice
        // runs past the end of the pool.
        for seed in 0..40 {
            let mut session = MatchSession::new(seed, 3);
            session.roster.add_member("c1", "bee", "player").unwrap();
            let setup = session.create_new_game(word_pool()).unwrap();
            assert_eq!(setup.shuffled_cards.len(), 6, "seed {}", seed);
        }
    }

    #[test]
    fn test_hand_clamped_to_pool_size() {
        let mut session = MatchSession::new(1, 10);
        session.roster.add_member("c1", "bee", "player").unwrap();
        let setup = session.create_new_game(word_pool()).unwrap();

        // Pool has 4 pairs, so at most 8 cards.
        assert_eq!(setup.shuffled_cards.len(), 8);
    }

    #[test]
    fn test_first_flip_opens_one_card() {
        let mut session = started_session();
        let actions = session
            .implement_game_action(&CardAction::open(0, "bee", "Apple"))
            .unwrap();

        assert_eq!(
            actions,
            vec![ServerAction::OpenCard {
                position: 0,
                player: "bee".to_string(),
            }]
        );
        assert_eq!(session.matched_pairs(), 0);
        assert_eq!(session.roster.current_player().unwrap().name, "bee");

        let open_count = session
            .card_states()
            .iter()
            .filter(|s| s.is_open)
            .count();
        assert_eq!(open_count, 1);
        assert!(session.card_states()[0].is_active);
    }

    #[test]
    fn test_match_scores_and_keeps_turn() {
        let mut session = started_session();
        let pair = counterpart_position(&session, 0);

        session
            .implement_game_action(&CardAction::open(0, "bee", "Apple"))
            .unwrap();
        let actions = session
            .implement_game_action(&CardAction::open(pair, "bee", "Apple"))
            .unwrap();

        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[0], ServerAction::UpdateCardStates { .. }));
        assert!(matches!(actions[1], ServerAction::SetScores { .. }));

        assert_eq!(session.matched_pairs(), 1);
        assert_eq!(session.scores()["bee"], 1);
        assert!(!session.card_states()[0].is_active);
        assert!(session.card_states()[0].is_open);
        assert!(!session.card_states()[pair].is_active);
        assert!(session.card_states()[pair].is_open);

        // Same player continues after a match.
        assert_eq!(session.roster.current_player().unwrap().name, "bee");
    }

    #[test]
    fn test_mismatch_closes_cards_and_rotates_turn() {
        let mut session = started_session();
        let other = non_counterpart_position(&session, 0);

        session
            .implement_game_action(&CardAction::open(0, "bee", "Apple"))
            .unwrap();
        let actions = session
            .implement_game_action(&CardAction::open(other, "bee", "Apple"))
            .unwrap();

        assert!(matches!(
            actions[0],
            ServerAction::UpdateCardStates {
                timeout_ms: Some(CLOSE_CARD_DELAY_MS),
                ..
            }
        ));
        assert!(matches!(
            actions[1],
            ServerAction::ChangeTurns { ref player } if player.name == "bing"
        ));

        // Both cards reset to closed and active; the first-flipped card
        // can be opened again immediately.
        for position in [0, other] {
            assert!(session.card_states()[position].is_active);
            assert!(!session.card_states()[position].is_open);
        }
        assert_eq!(session.matched_pairs(), 0);
        assert_eq!(session.scores()["bee"], 0);
    }

    #[test]
    fn test_full_round_ends_with_tied_winners() {
        let mut session = started_session();

        // bee clears the whole board alone.
        let mut remaining = 3;
        while remaining > 0 {
            let first = session
                .card_states()
                .iter()
                .position(|s| s.is_active)
                .unwrap();
            let pair = counterpart_position(&session, first);

            session
                .implement_game_action(&CardAction::open(first, "bee", "Apple"))
                .unwrap();
            let actions = session
                .implement_game_action(&CardAction::open(pair, "bee", "Apple"))
                .unwrap();
            remaining -= 1;

            if remaining == 0 {
                assert!(matches!(
                    actions.last().unwrap(),
                    ServerAction::EndGame { winners, timeout_ms: END_GAME_DELAY_MS }
                        if winners == &vec!["bee".to_string()]
                ));
            } else {
                assert!(!actions
                    .iter()
                    .any(|a| matches!(a, ServerAction::EndGame { .. })));
            }
        }

        assert!(session.is_finished());
        assert_eq!(session.scores()["bee"], 3);
    }

    #[test]
    fn test_tied_winners_include_everyone_at_max() {
        let mut session = started_session();
        session.scores.insert("bee".to_string(), 2);
        session.scores.insert("bing".to_string(), 2);

        assert_eq!(
            session.winners(),
            vec!["bee".to_string(), "bing".to_string()]
        );
    }

    #[test]
    fn test_open_out_of_range_fails() {
        let mut session = started_session();
        assert_eq!(
            session.implement_game_action(&CardAction::open(99, "bee", "Apple")),
            Err(SessionError::CardNotFound(99))
        );
    }

    #[test]
    fn test_open_inactive_card_fails() {
        let mut session = started_session();
        let pair = counterpart_position(&session, 0);
        session
            .implement_game_action(&CardAction::open(0, "bee", "Apple"))
            .unwrap();
        session
            .implement_game_action(&CardAction::open(pair, "bee", "Apple"))
            .unwrap();

        // Both cards are resolved now.
        assert_eq!(
            session.implement_game_action(&CardAction::open(0, "bee", "Apple")),
            Err(SessionError::CardNotFound(0))
        );
    }

    #[test]
    fn test_reopening_flipped_position_fails() {
        let mut session = started_session();
        session
            .implement_game_action(&CardAction::open(0, "bee", "Apple"))
            .unwrap();

        assert_eq!(
            session.implement_game_action(&CardAction::open(0, "bee", "Apple")),
            Err(SessionError::CardNotFound(0))
        );
        // The failed action must not have disturbed the flip in progress.
        assert!(session.card_states()[0].is_open);
    }

    #[test]
    fn test_unknown_player_score_lookup_fails_without_mutation() {
        let mut session = started_session();
        let pair = counterpart_position(&session, 0);
        session
            .implement_game_action(&CardAction::open(0, "bee", "Apple"))
            .unwrap();

        let result = session.implement_game_action(&CardAction::open(pair, "ghost", "Apple"));
        assert_eq!(
            result,
            Err(SessionError::ScoreLookup("ghost".to_string()))
        );

        // No partial mutation: the pair is still unresolved.
        assert_eq!(session.matched_pairs(), 0);
        assert!(session.card_states()[pair].is_active);
        assert!(!session.card_states()[pair].is_open);
    }

    #[test]
    fn test_non_open_action_is_rejected() {
        let mut session = started_session();
        let mut action = CardAction::open(0, "bee", "Apple");
        action.kind = ClientActionKind::Move;

        assert_eq!(
            session.implement_game_action(&action),
            Err(SessionError::UnrecognizedAction(ClientActionKind::Move))
        );
    }

    #[test]
    fn test_reset_draws_fresh_seeds() {
        let mut session = started_session();
        let first_layout = session.shuffled_cards().to_vec();
        session.create_new_game(word_pool()).unwrap();

        // Locked room stays locked, scores reset, and the layout comes
        // from fresh seeds.
        assert!(!session.roster.state().is_open());
        assert!(session.scores().values().all(|s| *s == 0));
        assert_ne!(session.shuffled_cards().to_vec(), first_layout);
    }

    #[test]
    fn test_scenario_fixed_pool_two_players() {
        // Pool of four pairs, members bee and bing, hand of 3 pairs
        // (6 cards), seed fixed at 1: a counterpart pair matched by bee
        // scores 1, two non-counterpart cards rotate the turn to bing.
        let mut session = started_session();
        let pair = counterpart_position(&session, 0);

        session
            .implement_game_action(&CardAction::open(0, "bee", "Apple"))
            .unwrap();
        session
            .implement_game_action(&CardAction::open(pair, "bee", "Apple"))
            .unwrap();
        assert_eq!(session.scores()["bee"], 1);
        assert_eq!(session.matched_pairs(), 1);

        let first = session
            .card_states()
            .iter()
            .position(|s| s.is_active)
            .unwrap();
        let other = non_counterpart_position(&session, first);
        session
            .implement_game_action(&CardAction::open(first, "bee", "Apple"))
            .unwrap();
        session
            .implement_game_action(&CardAction::open(other, "bee", "Apple"))
            .unwrap();

        assert_eq!(session.roster.current_player().unwrap().name, "bing");
        assert!(!session.card_states()[first].is_open);
        assert!(!session.card_states()[other].is_open);
    }
}
