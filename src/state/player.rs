//! Player card zones.
//!
//! A player holds cards in three zones:
//!
//! ```text
//!   hand       12 cards, private, played first
//!   face_up     4 cards on the table, playable alongside the hand
//!   face_down   4 hidden cards, revealed one at a time once the rest is gone
//! ```
//!
//! Each face-up card was dealt over one face-down card and carries the same
//! [`PairId`], so the pairing survives removal from anywhere in the row.

use serde::{Deserialize, Serialize};

use super::card::{Card, CardId, PairId};

/// A card on the table, tagged with the pair it was dealt into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCard {
    pub pair: PairId,
    pub card: Card,
}

impl TableCard {
    pub fn new(pair: PairId, card: Card) -> Self {
        Self { pair, card }
    }
}

/// A seated player.
#[derive(Debug, Clone)]
pub struct Player {
    /// Stable for the lifetime of the room
    pub id: String,

    /// Display name, unique within the room
    pub name: String,

    pub hand: Vec<Card>,
    pub face_up: Vec<TableCard>,
    pub face_down: Vec<TableCard>,

    /// Points taken in the last completed round
    pub round_score: u32,

    /// Points accumulated over all completed rounds
    pub total_score: u32,

    /// When the player joined the room
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hand: Vec::new(),
            face_up: Vec::new(),
            face_down: Vec::new(),
            round_score: 0,
            total_score: 0,
            joined_at: chrono::Utc::now(),
        }
    }

    /// Total cards held across all three zones.
    pub fn card_count(&self) -> usize {
        self.hand.len() + self.face_up.len() + self.face_down.len()
    }

    /// True when every zone is empty.
    pub fn has_no_cards(&self) -> bool {
        self.card_count() == 0
    }

    /// Iterate over every card the player holds, regardless of zone.
    pub fn all_cards(&self) -> impl Iterator<Item = &Card> {
        self.hand
            .iter()
            .chain(self.face_up.iter().map(|t| &t.card))
            .chain(self.face_down.iter().map(|t| &t.card))
    }

    /// Find a card that may be played directly (hand or face-up).
    pub fn find_playable(&self, card_id: &CardId) -> Option<&Card> {
        self.hand.iter().find(|c| &c.id == card_id).or_else(|| {
            self.face_up
                .iter()
                .find(|t| &t.card.id == card_id)
                .map(|t| &t.card)
        })
    }

    pub fn find_face_down(&self, card_id: &CardId) -> Option<&TableCard> {
        self.face_down.iter().find(|t| &t.card.id == card_id)
    }

    /// Whether the face-up card dealt over `pair` is still on the table.
    pub fn has_face_up_partner(&self, pair: PairId) -> bool {
        self.face_up.iter().any(|t| t.pair == pair)
    }

    /// Remove a card from the hand or face-up row.
    pub fn take_playable(&mut self, card_id: &CardId) -> Option<Card> {
        if let Some(pos) = self.hand.iter().position(|c| &c.id == card_id) {
            return Some(self.hand.remove(pos));
        }
        let pos = self.face_up.iter().position(|t| &t.card.id == card_id)?;
        Some(self.face_up.remove(pos).card)
    }

    pub fn take_face_down(&mut self, card_id: &CardId) -> Option<Card> {
        let pos = self.face_down.iter().position(|t| &t.card.id == card_id)?;
        Some(self.face_down.remove(pos).card)
    }

    /// Drop every card, keeping identity and scores.
    pub fn clear_cards(&mut self) {
        self.hand.clear();
        self.face_up.clear();
        self.face_down.clear();
    }
}
