//! Deck construction, dealing and scoring.
//!
//! The shoe grows with the table: 2 decks for 3-5 players, 3 decks for 6-7,
//! 4 decks for 8-10. Every card gets a unique id within the shoe.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::card::{Card, CardId, PairId, Rank, Suit};
use super::game::GameError;
use super::player::{Player, TableCard};

/// Minimum seated players.
pub const MIN_PLAYERS: usize = 3;

/// Maximum seated players.
pub const MAX_PLAYERS: usize = 10;

/// Face-down cards dealt per player.
pub const FACE_DOWN_COUNT: usize = 4;

/// Face-up cards dealt per player.
pub const FACE_UP_COUNT: usize = 4;

/// Hand cards dealt per player.
pub const HAND_COUNT: usize = 12;

/// Shuffling RNG for one game.
#[derive(Debug, Clone)]
pub struct GameRng {
    inner: ChaCha8Rng,
}

impl GameRng {
    /// Deterministic stream, for tests and replays.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            inner: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }
}

/// Number of 52-card decks needed for a table size.
pub fn decks_for(player_count: usize) -> Result<usize, GameError> {
    match player_count {
        3..=5 => Ok(2),
        6..=7 => Ok(3),
        8..=10 => Ok(4),
        _ => Err(GameError::InvalidPlayerCount(player_count)),
    }
}

/// Build an unshuffled shoe sized for `player_count`.
pub fn build_deck(player_count: usize) -> Result<Vec<Card>, GameError> {
    let decks = decks_for(player_count)?;
    let mut deck = Vec::with_capacity(decks * 52);

    for _ in 0..decks {
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                deck.push(Card {
                    id: CardId::nth(deck.len()),
                    suit,
                    rank,
                });
            }
        }
    }

    Ok(deck)
}

/// Fisher-Yates shuffle in place.
pub fn shuffle(deck: &mut [Card], rng: &mut GameRng) {
    rng.shuffle(deck);
}

/// Deal round-robin in three passes: face-down, face-up, hand.
///
/// Returns whatever is left over, which becomes the discard pile. A short
/// deck simply stops dealing.
pub fn deal(deck: Vec<Card>, players: &mut [Player]) -> Vec<Card> {
    let mut cards = deck.into_iter();

    'down: for pass in 0..FACE_DOWN_COUNT {
        for player in players.iter_mut() {
            let Some(card) = cards.next() else {
                break 'down;
            };
            player
                .face_down
                .push(TableCard::new(PairId(pass as u8), card));
        }
    }

    'up: for pass in 0..FACE_UP_COUNT {
        for player in players.iter_mut() {
            let Some(card) = cards.next() else {
                break 'up;
            };
            player.face_up.push(TableCard::new(PairId(pass as u8), card));
        }
    }

    'hand: for _ in 0..HAND_COUNT {
        for player in players.iter_mut() {
            let Some(card) = cards.next() else {
                break 'hand;
            };
            player.hand.push(card);
        }
    }

    cards.collect()
}

/// Scoring value of a card. Tens are wild in play but cost 25 at round end.
pub fn point_value(card: &Card) -> u32 {
    match card.rank {
        Rank::Ten => 25,
        rank => u32::from(rank.order()),
    }
}

/// Points a player is holding across hand, face-up and face-down.
pub fn player_score(player: &Player) -> u32 {
    player.all_cards().map(point_value).sum()
}
