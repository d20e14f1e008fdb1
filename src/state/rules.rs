//! Pure rule predicates over card collections.

use super::card::{Card, Rank};

/// Reason an over-value play is rejected by [`is_legal_play`].
pub const VALUE_TOO_HIGH: &str = "card value too high";

/// Result of checking a candidate play against the pile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayCheck {
    Legal,
    Illegal(&'static str),
}

impl PlayCheck {
    pub fn is_legal(&self) -> bool {
        matches!(self, Self::Legal)
    }
}

/// Consecutive same-rank cards at the top of a pile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingRun {
    pub count: usize,
    pub rank: Rank,
}

impl TrailingRun {
    /// Four or more of a kind on top is a set.
    pub fn is_set(&self) -> bool {
        self.count >= 4
    }
}

/// Numeric order of a card for comparisons.
pub fn rank(card: &Card) -> u8 {
    card.rank.order()
}

/// True when every card shares one rank. Empty and single inputs qualify.
pub fn same_value(cards: &[Card]) -> bool {
    match cards.split_first() {
        None => true,
        Some((first, rest)) => rest.iter().all(|c| c.rank == first.rank),
    }
}

/// Whether `cards` may be laid on `center_pile`.
///
/// Anything goes after a pickup, on an empty pile, or with a ten. Otherwise
/// the play must not outrank the top of the pile.
pub fn is_legal_play(cards: &[Card], center_pile: &[Card], after_pickup: bool) -> PlayCheck {
    if after_pickup {
        return PlayCheck::Legal;
    }
    let (Some(top), Some(lead)) = (center_pile.last(), cards.first()) else {
        return PlayCheck::Legal;
    };
    if lead.rank.is_wild() || rank(lead) <= rank(top) {
        PlayCheck::Legal
    } else {
        PlayCheck::Illegal(VALUE_TOO_HIGH)
    }
}

/// Count same-rank cards from the top of the pile downwards.
pub fn trailing_run(center_pile: &[Card]) -> Option<TrailingRun> {
    let top = center_pile.last()?;
    let count = center_pile
        .iter()
        .rev()
        .take_while(|c| c.rank == top.rank)
        .count();
    Some(TrailingRun {
        count,
        rank: top.rank,
    })
}
