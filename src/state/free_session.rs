//! Free session: a shared table of freely arranged cards.
//!
//! No match state machine and no turn enforcement here. Once the layout is
//! confirmed, any member may flip, drag, or drop any active card at any
//! time; the session just keeps every client's view of the table in sync.
//! The roster and turn bookkeeping are still shared with the Match variant
//! so a room can report who is present either way.

use super::action::{CardAction, CardStates, Point, ServerAction, SessionError};
use super::rng::{sample_circular, shuffle, SeedSequence};
use super::roster::Roster;
use serde::Deserialize;

/// Card footprint on the client grid, in pixels.
pub const CARD_WIDTH: f64 = 150.0;
pub const CARD_HEIGHT: f64 = 150.0;
pub const MARGIN_PX: f64 = 20.0;
pub const SET_SPACE_PX: f64 = 20.0;

/// Cards per grid row within a set.
pub const SET_PER_ROW: usize = 2;

/// What a card face displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Content {
    Word,
    Translation,
    None,
}

impl Content {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Translation => "translation",
            Self::None => "none",
        }
    }
}

/// Stacking layer for a card.
///
/// Exactly one card sits on the upper layer at a time: the one most
/// recently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZIndexLayer {
    #[default]
    Normal,
    Upper,
}

impl ZIndexLayer {
    pub fn as_number(&self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Upper => 10,
        }
    }
}

/// One card on the free table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeCard {
    /// Stable id across reshuffles, unique per set and word
    pub id: usize,

    /// Face shown while `is_face_up`
    pub face_up: Content,

    /// Face shown otherwise
    pub face_down: Content,

    /// The word pair this card carries
    pub content: (String, String),
}

impl FreeCard {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "faceUp": self.face_up.as_str(),
            "faceDown": self.face_down.as_str(),
            "content": [self.content.0, self.content.1],
        })
    }
}

/// Per-card table state, parallel-indexed to the card list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeCardState {
    pub is_face_up: bool,
    pub is_active: bool,
    pub position: Point,
    pub z_index: ZIndexLayer,
}

impl FreeCardState {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "isFaceUp": self.is_face_up,
            "isActive": self.is_active,
            "position": self.position.to_json(),
            "zIndex": self.z_index.as_number(),
        })
    }
}

/// Layout configuration for one set of cards.
///
/// Each rule produces one copy of the sampled words with its own face
/// assignment, optionally reshuffled independently of the other sets.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRule {
    pub face_up: Content,
    pub face_down: Content,
    pub is_randomized: bool,
}

/// Everything a client needs to render the confirmed layout.
#[derive(Debug, Clone)]
pub struct FreeSetup {
    pub shuffled_cards: Vec<FreeCard>,
    pub card_states: Vec<FreeCardState>,
    pub actions: Vec<ServerAction>,
}

/// Free-form card table session for one room.
#[derive(Debug, Clone)]
pub struct FreeSession {
    /// Shared membership and turn state
    pub roster: Roster,

    seeds: SeedSequence,

    /// Configured number of word pairs per set
    word_count: usize,

    word_pool: Vec<(String, String)>,

    selected_words: Vec<(String, String)>,

    shuffled_cards: Vec<FreeCard>,

    card_states: Vec<FreeCardState>,
}

impl FreeSession {
    pub fn new(initial_seed: u64, word_count: usize) -> Self {
        Self {
            roster: Roster::new(),
            seeds: SeedSequence::new(initial_seed),
            word_count,
            word_pool: Vec::new(),
            selected_words: Vec::new(),
            shuffled_cards: Vec::new(),
            card_states: Vec::new(),
        }
    }

    /// Store the pool and sample the working word set.
    ///
    /// The table stays empty until the layout is confirmed; the room also
    /// stays open for joining until then.
    pub fn create_new_game(
        &mut self,
        word_pool: Vec<(String, String)>,
    ) -> Result<(), SessionError> {
        self.roster.rotate_turn()?;
        self.word_pool = word_pool;

        let sample_seed = self.seeds.advance();
        self.selected_words = sample_circular(&self.word_pool, sample_seed, self.word_count);
        Ok(())
    }

    /// Grid position for a card, by set and position within the set.
    ///
    /// A single set wraps into rows of `SET_PER_ROW`. Multiple sets are
    /// either laid out column-adjacent per set (`group_by_set`) or
    /// interleaved across alternating columns.
    fn grid_position(
        overall_sets: usize,
        set_index: usize,
        word_index: usize,
        group_by_set: bool,
    ) -> Point {
        let cell = CARD_WIDTH + MARGIN_PX;
        let column = (word_index % SET_PER_ROW) as f64;
        let y = (word_index / SET_PER_ROW) as f64 * (CARD_HEIGHT + MARGIN_PX);

        if overall_sets <= 1 {
            return Point::new(column * cell, y);
        }

        if group_by_set {
            let set_offset = set_index as f64 * (overall_sets as f64 * cell + SET_SPACE_PX);
            Point::new(set_offset + column * cell, y)
        } else {
            let column_width = overall_sets as f64 * cell + SET_SPACE_PX;
            Point::new(set_index as f64 * cell + column * column_width, y)
        }
    }

    /// Build the table from the layout rules and lock the room.
    ///
    /// One card per sampled pair per rule; randomized sets reshuffle
    /// independently with fresh seeds. All cards start face-up, active,
    /// and on the normal layer.
    pub fn create_initial_card_states(
        &mut self,
        layout_rules: &[LayoutRule],
        group_by_set: bool,
    ) -> FreeSetup {
        let mut final_cards = Vec::with_capacity(layout_rules.len() * self.selected_words.len());
        let mut final_states = Vec::with_capacity(final_cards.capacity());

        for (set_index, rule) in layout_rules.iter().enumerate() {
            let mut cards: Vec<FreeCard> = self
                .selected_words
                .iter()
                .enumerate()
                .map(|(word_index, content)| FreeCard {
                    id: self.word_count * set_index + word_index,
                    face_up: rule.face_up,
                    face_down: rule.face_down,
                    content: content.clone(),
                })
                .collect();
            if rule.is_randomized {
                cards = shuffle(cards, self.seeds.advance());
            }
            final_cards.extend(cards);

            for word_index in 0..self.selected_words.len() {
                final_states.push(FreeCardState {
                    is_face_up: true,
                    is_active: true,
                    position: Self::grid_position(
                        layout_rules.len(),
                        set_index,
                        word_index,
                        group_by_set,
                    ),
                    z_index: ZIndexLayer::Normal,
                });
            }
        }

        self.shuffled_cards = final_cards;
        self.card_states = final_states;
        self.roster.lock();

        FreeSetup {
            shuffled_cards: self.shuffled_cards.clone(),
            card_states: self.card_states.clone(),
            actions: Vec::new(),
        }
    }

    /// Toggle the targeted card's face. Only that card changes.
    pub fn open_card(&mut self, action: &CardAction) -> Result<Vec<ServerAction>, SessionError> {
        let position = action.position;
        let state = self
            .card_states
            .get_mut(position)
            .ok_or(SessionError::CardNotFound(position))?;

        state.is_face_up = !state.is_face_up;
        Ok(self.update_actions(&action.player))
    }

    /// Apply a relative drag delta to the targeted card.
    pub fn move_card(&mut self, action: &CardAction) -> Result<Vec<ServerAction>, SessionError> {
        let delta = action
            .payload
            .ok_or(SessionError::UnrecognizedAction(action.kind))?;
        let position = action.position;
        let state = self
            .card_states
            .get_mut(position)
            .ok_or(SessionError::CardNotFound(position))?;

        state.position.x += delta.x;
        state.position.y += delta.y;
        Ok(self.update_actions(&action.player))
    }

    /// Place the targeted card at its final position and raise it above
    /// every other card; all others drop back to the normal layer.
    pub fn drop_card(&mut self, action: &CardAction) -> Result<Vec<ServerAction>, SessionError> {
        let point = action
            .payload
            .ok_or(SessionError::UnrecognizedAction(action.kind))?;
        let position = action.position;
        if position >= self.card_states.len() {
            return Err(SessionError::CardNotFound(position));
        }

        for (index, state) in self.card_states.iter_mut().enumerate() {
            if index == position {
                state.position = point;
                state.z_index = ZIndexLayer::Upper;
            } else {
                state.z_index = ZIndexLayer::Normal;
            }
        }
        Ok(self.update_actions(&action.player))
    }

    fn update_actions(&self, player: &str) -> Vec<ServerAction> {
        vec![ServerAction::UpdateCardStates {
            states: CardStates::Free(self.card_states.clone()),
            player: Some(player.to_string()),
            timeout_ms: None,
        }]
    }

    pub fn shuffled_cards(&self) -> &[FreeCard] {
        &self.shuffled_cards
    }

    pub fn card_states(&self) -> &[FreeCardState] {
        &self.card_states
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "roster": self.roster.to_json(),
            "shuffledCards": self.shuffled_cards.iter().map(|c| c.to_json()).collect::<Vec<_>>(),
            "cardStates": self.card_states.iter().map(|s| s.to_json()).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::action::ClientActionKind;
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

    fn rule(randomized: bool) -> LayoutRule {
        LayoutRule {
            face_up: Content::Word,
            face_down: Content::Translation,
            is_randomized: randomized,
        }
    }

    fn laid_out_session(rules: &[LayoutRule], group_by_set: bool) -> FreeSession {
        let mut session = FreeSession::new(1, 4);
        session.roster.add_member("c1", "bee", "player").unwrap();
        session.create_new_game(word_pool()).unwrap();
        session.create_initial_card_states(rules, group_by_set);
        session
    }

    fn open(position: usize) -> CardAction {
        CardAction::open(position, "bee", "Pear")
    }

    fn with_payload(kind: ClientActionKind, position: usize, x: f64, y: f64) -> CardAction {
        let mut action = CardAction::open(position, "bee", "Pear");
        action.kind = kind;
        action.payload = Some(Point::new(x, y));
        action
    }

    #[test]
    fn test_single_set_layout() {
        let session = laid_out_session(&[rule(false)], false);

        assert_eq!(session.shuffled_cards().len(), 4);
        assert_eq!(session.card_states().len(), 4);
        assert!(!session.roster.state().is_open());

        // Row-wrap of 2: (0,0) (170,0) / (0,170) (170,170)
        let positions: Vec<Point> = session.card_states().iter().map(|s| s.position).collect();
        assert_eq!(positions[0], Point::new(0.0, 0.0));
        assert_eq!(positions[1], Point::new(170.0, 0.0));
        assert_eq!(positions[2], Point::new(0.0, 170.0));
        assert_eq!(positions[3], Point::new(170.0, 170.0));

        for state in session.card_states() {
            assert!(state.is_face_up);
            assert!(state.is_active);
            assert_eq!(state.z_index, ZIndexLayer::Normal);
        }
    }

    #[test]
    fn test_grouped_sets_are_column_adjacent() {
        let session = laid_out_session(&[rule(false), rule(false)], true);

        assert_eq!(session.shuffled_cards().len(), 8);
        let positions: Vec<Point> = session.card_states().iter().map(|s| s.position).collect();

        // Set 0 at x 0/170, set 1 shifted by 2*170 + 20 = 360.
        assert_eq!(positions[0].x, 0.0);
        assert_eq!(positions[1].x, 170.0);
        assert_eq!(positions[4].x, 360.0);
        assert_eq!(positions[5].x, 530.0);
    }

    #[test]
    fn test_interleaved_sets_alternate_columns() {
        let session = laid_out_session(&[rule(false), rule(false)], false);
        let positions: Vec<Point> = session.card_states().iter().map(|s| s.position).collect();

        // Column width 2*170 + 20 = 360; set 0 at 0/360, set 1 at 170/530.
        assert_eq!(positions[0].x, 0.0);
        assert_eq!(positions[1].x, 360.0);
        assert_eq!(positions[4].x, 170.0);
        assert_eq!(positions[5].x, 530.0);
    }

    #[test]
    fn test_randomized_set_is_a_permutation() {
        let ordered = laid_out_session(&[rule(false)], false);
        let randomized = laid_out_session(&[rule(true)], false);

        let mut ordered_ids: Vec<usize> =
            ordered.shuffled_cards().iter().map(|c| c.id).collect();
        let mut randomized_ids: Vec<usize> =
            randomized.shuffled_cards().iter().map(|c| c.id).collect();
        ordered_ids.sort_unstable();
        randomized_ids.sort_unstable();
        assert_eq!(ordered_ids, randomized_ids);

        // Same seed, same permutation.
        let again = laid_out_session(&[rule(true)], false);
        assert_eq!(randomized.shuffled_cards(), again.shuffled_cards());
    }

    #[test]
    fn test_card_ids_are_unique_across_sets() {
        let session = laid_out_session(&[rule(false), rule(false)], true);
        let mut ids: Vec<usize> = session.shuffled_cards().iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn test_open_card_toggles_only_target() {
        let mut session = laid_out_session(&[rule(false)], false);

        let actions = session.open_card(&open(2)).unwrap();
        assert_eq!(actions.len(), 1);
        assert!(!session.card_states()[2].is_face_up);
        assert!(session.card_states()[0].is_face_up);

        session.open_card(&open(2)).unwrap();
        assert!(session.card_states()[2].is_face_up);
    }

    #[test]
    fn test_move_card_accumulates_deltas() {
        let mut session = laid_out_session(&[rule(false)], false);
        let start = session.card_states()[1].position;

        session
            .move_card(&with_payload(ClientActionKind::Move, 1, 10.0, -5.0))
            .unwrap();
        session
            .move_card(&with_payload(ClientActionKind::Move, 1, 2.5, 4.0))
            .unwrap();

        let moved = session.card_states()[1].position;
        assert_eq!(moved.x, start.x + 12.5);
        assert_eq!(moved.y, start.y - 1.0);
    }

    #[test]
    fn test_drop_card_holds_the_only_upper_layer() {
        let mut session = laid_out_session(&[rule(false)], false);

        session
            .drop_card(&with_payload(ClientActionKind::Drop, 1, 300.0, 40.0))
            .unwrap();
        assert_eq!(session.card_states()[1].z_index, ZIndexLayer::Upper);
        assert_eq!(session.card_states()[1].position, Point::new(300.0, 40.0));

        session
            .drop_card(&with_payload(ClientActionKind::Drop, 3, 10.0, 10.0))
            .unwrap();

        let upper: Vec<usize> = session
            .card_states()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.z_index == ZIndexLayer::Upper)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(upper, vec![3]);
    }

    #[test]
    fn test_bad_position_fails() {
        let mut session = laid_out_session(&[rule(false)], false);

        assert_eq!(
            session.open_card(&open(99)),
            Err(SessionError::CardNotFound(99))
        );
        assert_eq!(
            session.move_card(&with_payload(ClientActionKind::Move, 99, 1.0, 1.0)),
            Err(SessionError::CardNotFound(99))
        );
        assert_eq!(
            session.drop_card(&with_payload(ClientActionKind::Drop, 99, 1.0, 1.0)),
            Err(SessionError::CardNotFound(99))
        );
    }

    #[test]
    fn test_move_without_payload_is_malformed() {
        let mut session = laid_out_session(&[rule(false)], false);
        let mut action = open(0);
        action.kind = ClientActionKind::Move;

        assert_eq!(
            session.move_card(&action),
            Err(SessionError::UnrecognizedAction(
                ClientActionKind::Move
            ))
        );
    }

    #[test]
    fn test_room_open_until_layout_confirmed() {
        let mut session = FreeSession::new(1, 4);
        session.roster.add_member("c1", "bee", "player").unwrap();
        session.create_new_game(word_pool()).unwrap();

        // Word submission alone does not lock the room.
        assert!(session.roster.state().is_open());

        session.create_initial_card_states(&[rule(false)], false);
        assert!(!session.roster.state().is_open());
    }

    #[test]
    fn test_layout_rule_deserialize() {
        let parsed: LayoutRule = serde_json::from_str(
            r#"{"faceUp": "word", "faceDown": "none", "isRandomized": true}"#,
        )
        .unwrap();
        assert_eq!(parsed.face_up, Content::Word);
        assert_eq!(parsed.face_down, Content::None);
        assert!(parsed.is_randomized);
    }
}
