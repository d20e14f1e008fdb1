//! Rules engine.
//!
//! One [`Game`] per started room. Seating is set when the game starts and
//! only shrinks when a player leaves. Every operation validates completely
//! before it touches any state, so a rejected command leaves the game
//! exactly as it was.
//!
//! # Phases
//!
//! ```text
//! Dealing ──▶ Playing ──▶ RoundEnd ──▶ Dealing ──▶ ... ──▶ Finished
//! ```
//!
//! The turn only moves on a play or flip that neither clears the pile nor
//! ends the round. Clears and pickups hand the same player another action.

use std::slice;

use tracing::{debug, info};

use super::card::{Card, CardId, Rank};
use super::config::{OverValuePolicy, RulesConfig};
use super::deck::{self, GameRng, MAX_PLAYERS, MIN_PLAYERS};
use super::player::Player;
use super::rules::{is_legal_play, same_value, trailing_run, PlayCheck, TrailingRun, VALUE_TOO_HIGH};

/// Clear message for a wild ten.
pub const TEN_CLEAR_MESSAGE: &str = "Cleared by 10!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GamePhase {
    /// Cards are being dealt
    #[default]
    Dealing,
    /// Round in progress
    Playing,
    /// Someone went out; waiting for the next deal
    RoundEnd,
    /// Last configured round is over
    Finished,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dealing => "dealing",
            Self::Playing => "playing",
            Self::RoundEnd => "round_end",
            Self::Finished => "finished",
        }
    }
}

/// What happened after a successful engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Turn passed to the next seat.
    Advanced,
    /// Pile went to the discard; the same player acts again.
    Cleared,
    /// The player took cards from the pile and acts again.
    PickedUp,
    /// The acting player is out of cards and the round has been scored.
    RoundWon { winner_id: String },
}

/// Whether a player has shed every card.
pub fn check_win(player: &Player) -> bool {
    player.has_no_cards()
}

/// `"Cleared by 4 9s!"`
pub fn set_clear_message(run: &TrailingRun) -> String {
    format!("Cleared by {} {}s!", run.count, run.rank)
}

/// A game in progress.
#[derive(Debug, Clone)]
pub struct Game {
    /// Unique game ID
    pub id: String,

    /// Room this game belongs to
    pub room_code: String,

    pub phase: GamePhase,

    /// Seating order, which is also turn order
    players: Vec<Player>,

    pub current_player_index: usize,
    pub dealer_index: usize,

    /// Current round (1-indexed)
    pub round: u32,

    /// Last element is the top of the pile
    center_pile: Vec<Card>,

    /// Cleared and undealt cards; only the count is ever shown
    discard_pile: Vec<Card>,

    /// Set between a pickup and the same player's next play
    pub after_pickup: bool,

    /// UI hint from the last call, reset by every accepted mutation
    pub last_clear_message: Option<String>,

    /// Winner of the most recently scored round
    pub last_winner: Option<String>,

    rules: RulesConfig,
    rng: GameRng,

    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl Game {
    /// Seat `players` in the given order, shuffle and deal round one.
    pub fn start(
        room_code: impl Into<String>,
        players: Vec<Player>,
        rules: RulesConfig,
    ) -> Result<Self, GameError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players.len()) {
            return Err(GameError::InvalidPlayerCount(players.len()));
        }

        let rng = match rules.seed {
            Some(seed) => GameRng::from_seed(seed),
            None => GameRng::from_entropy(),
        };

        let mut game = Self {
            id: uuid::Uuid::new_v4().to_string(),
            room_code: room_code.into(),
            phase: GamePhase::Dealing,
            players,
            current_player_index: 0,
            dealer_index: 0,
            round: 1,
            center_pile: Vec::new(),
            discard_pile: Vec::new(),
            after_pickup: false,
            last_clear_message: None,
            last_winner: None,
            rules,
            rng,
            started_at: chrono::Utc::now(),
        };

        for player in &mut game.players {
            player.round_score = 0;
            player.total_score = 0;
        }
        game.deal_round()?;

        info!(
            game_id = %game.id,
            room_code = %game.room_code,
            players = game.players.len(),
            "Game started"
        );
        Ok(game)
    }

    fn deal_round(&mut self) -> Result<(), GameError> {
        self.phase = GamePhase::Dealing;

        let mut deck = deck::build_deck(self.players.len())?;
        deck::shuffle(&mut deck, &mut self.rng);

        for player in &mut self.players {
            player.clear_cards();
        }
        self.center_pile.clear();
        self.discard_pile = deck::deal(deck, &mut self.players);

        self.after_pickup = false;
        self.last_clear_message = None;
        self.phase = GamePhase::Playing;
        Ok(())
    }

    /// Players in seating order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    #[cfg(test)]
    pub(crate) fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn seat_of(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    pub fn center_pile(&self) -> &[Card] {
        &self.center_pile
    }

    pub fn discard_count(&self) -> usize {
        self.discard_pile.len()
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// Every card id currently in the game, across all zones and piles.
    pub fn card_ids(&self) -> Vec<&CardId> {
        self.players
            .iter()
            .flat_map(|p| p.all_cards())
            .chain(self.center_pile.iter())
            .chain(self.discard_pile.iter())
            .map(|c| &c.id)
            .collect()
    }

    fn phase_error(&self) -> GameError {
        match self.phase {
            GamePhase::Finished => GameError::GameFinished,
            _ => GameError::RoundNotActive,
        }
    }

    /// Resolve the seat of the player about to act, checking phase and turn.
    fn acting_seat(&self, player_id: &str) -> Result<usize, GameError> {
        let seat = self.seat_of(player_id).ok_or(GameError::PlayerNotFound)?;
        if self.phase != GamePhase::Playing {
            return Err(self.phase_error());
        }
        if seat != self.current_player_index {
            return Err(GameError::NotYourTurn);
        }
        Ok(seat)
    }

    /// Play one or more same-rank cards from the hand or face-up row.
    pub fn play_cards(
        &mut self,
        player_id: &str,
        card_ids: &[CardId],
        after_pickup_hint: bool,
    ) -> Result<TurnOutcome, GameError> {
        let seat = self.acting_seat(player_id)?;
        if card_ids.is_empty() {
            return Err(GameError::NoCardsSelected);
        }

        let player = &self.players[seat];
        let mut cards = Vec::with_capacity(card_ids.len());
        for (i, card_id) in card_ids.iter().enumerate() {
            if card_ids[..i].contains(card_id) {
                return Err(GameError::DuplicateCard(card_id.clone()));
            }
            let card = player
                .find_playable(card_id)
                .ok_or_else(|| GameError::CardNotFound(card_id.clone()))?;
            cards.push(card.clone());
        }

        if !same_value(&cards) {
            return Err(GameError::MixedRanks);
        }

        let after_pickup = after_pickup_hint || self.after_pickup;
        match is_legal_play(&cards, &self.center_pile, after_pickup) {
            PlayCheck::Legal => {}
            PlayCheck::Illegal(reason) if reason == VALUE_TOO_HIGH => {
                if self.rules.over_value == OverValuePolicy::ForcePickup {
                    self.last_clear_message = None;
                    self.pick_up_pile(seat);
                    debug!(game_id = %self.id, player_id, "Over-value play forced a pickup");
                    return Ok(TurnOutcome::PickedUp);
                }
            }
            PlayCheck::Illegal(reason) => return Err(GameError::InvalidPlay(reason)),
        }

        self.last_clear_message = None;
        self.after_pickup = false;
        let previous_top = self.center_pile.last().map(|c| c.rank);

        let player = &mut self.players[seat];
        for card_id in card_ids {
            let taken = player.take_playable(card_id);
            debug_assert!(taken.is_some(), "validated card vanished");
        }

        let rank = cards[0].rank;
        self.center_pile.extend(cards);

        let outcome = self.resolve_play(seat, rank, previous_top);
        debug!(game_id = %self.id, player_id, ?outcome, "Cards played");
        Ok(outcome)
    }

    /// Reveal a face-down card and play it blind.
    ///
    /// Only allowed once the hand and face-up row are empty. If the revealed
    /// card cannot go on the pile, the player takes it together with the
    /// whole pile and acts again.
    pub fn flip_face_down(
        &mut self,
        player_id: &str,
        card_id: &CardId,
    ) -> Result<TurnOutcome, GameError> {
        let seat = self.acting_seat(player_id)?;
        let player = &self.players[seat];

        if !player.hand.is_empty() {
            return Err(GameError::HandNotEmpty);
        }
        let target = player
            .find_face_down(card_id)
            .ok_or_else(|| GameError::CardNotFound(card_id.clone()))?;
        if player.has_face_up_partner(target.pair) {
            return Err(GameError::PairedFaceUpRemaining);
        }
        if !player.face_up.is_empty() {
            return Err(GameError::FaceUpNotEmpty);
        }

        self.last_clear_message = None;
        let card = self.players[seat]
            .take_face_down(card_id)
            .ok_or_else(|| GameError::CardNotFound(card_id.clone()))?;

        if !is_legal_play(slice::from_ref(&card), &self.center_pile, self.after_pickup).is_legal() {
            let player = &mut self.players[seat];
            player.hand.push(card);
            player.hand.append(&mut self.center_pile);
            self.after_pickup = true;
            debug!(game_id = %self.id, player_id, "Flipped card could not be played");
            return Ok(TurnOutcome::PickedUp);
        }

        self.after_pickup = false;
        let previous_top = self.center_pile.last().map(|c| c.rank);
        let rank = card.rank;
        self.center_pile.push(card);

        let outcome = self.resolve_play(seat, rank, previous_top);
        debug!(game_id = %self.id, player_id, ?outcome, "Face-down card flipped");
        Ok(outcome)
    }

    /// Take the whole center pile into the hand. The turn stays put.
    pub fn pickup_pile(&mut self, player_id: &str) -> Result<TurnOutcome, GameError> {
        let seat = self.acting_seat(player_id)?;
        self.last_clear_message = None;
        self.pick_up_pile(seat);
        debug!(game_id = %self.id, player_id, "Pile picked up");
        Ok(TurnOutcome::PickedUp)
    }

    /// Take a departed player out of the seating.
    ///
    /// Their cards go to the discard pile and later seats shift down. If it
    /// was their turn, the next remaining seat acts. With fewer than
    /// [`MIN_PLAYERS`] seats left the game is finished without scoring.
    pub fn remove_seat(&mut self, player_id: &str) -> Result<Player, GameError> {
        let seat = self.seat_of(player_id).ok_or(GameError::PlayerNotFound)?;
        let mut player = self.players.remove(seat);

        self.discard_pile.append(&mut player.hand);
        self.discard_pile.extend(player.face_up.drain(..).map(|t| t.card));
        self.discard_pile.extend(player.face_down.drain(..).map(|t| t.card));
        self.last_clear_message = None;

        let seats = self.players.len();
        if seats == 0 {
            self.current_player_index = 0;
            self.dealer_index = 0;
        } else {
            if seat == self.current_player_index {
                self.after_pickup = false;
            } else if seat < self.current_player_index {
                self.current_player_index -= 1;
            }
            self.current_player_index %= seats;

            // A departed dealer leaves the deal with the seat before them
            if seat <= self.dealer_index {
                self.dealer_index = (self.dealer_index + seats - 1) % seats;
            }
        }

        if seats < MIN_PLAYERS && self.phase != GamePhase::Finished {
            self.phase = GamePhase::Finished;
            info!(
                game_id = %self.id,
                room_code = %self.room_code,
                seats,
                "Game finished, too few players left"
            );
        }

        debug!(game_id = %self.id, player_id, seat, "Seat removed");
        Ok(player)
    }

    fn pick_up_pile(&mut self, seat: usize) {
        self.players[seat].hand.append(&mut self.center_pile);
        self.after_pickup = true;
    }

    fn clear_pile(&mut self, message: String) {
        self.discard_pile.append(&mut self.center_pile);
        self.last_clear_message = Some(message);
    }

    /// After-effects of cards landing on the pile, in priority order:
    /// wild ten, completed set, over-value split, plain play.
    fn resolve_play(&mut self, seat: usize, rank: Rank, previous_top: Option<Rank>) -> TurnOutcome {
        let outcome = if rank.is_wild() {
            self.clear_pile(TEN_CLEAR_MESSAGE.to_string());
            TurnOutcome::Cleared
        } else if let Some(run) = trailing_run(&self.center_pile).filter(TrailingRun::is_set) {
            self.clear_pile(set_clear_message(&run));
            TurnOutcome::Cleared
        } else if previous_top.is_some_and(|top| rank.order() > top.order()) {
            let pile = std::mem::take(&mut self.center_pile);
            let (kept, rest): (Vec<Card>, Vec<Card>) =
                pile.into_iter().partition(|c| c.rank == rank);
            self.players[seat].hand.extend(rest);
            self.center_pile = kept;

            match trailing_run(&self.center_pile).filter(TrailingRun::is_set) {
                Some(run) => {
                    self.clear_pile(set_clear_message(&run));
                    TurnOutcome::Cleared
                }
                None => TurnOutcome::Advanced,
            }
        } else {
            TurnOutcome::Advanced
        };

        if check_win(&self.players[seat]) {
            let winner_id = self.players[seat].id.clone();
            self.score_round(seat);
            return TurnOutcome::RoundWon { winner_id };
        }

        if outcome == TurnOutcome::Advanced {
            self.advance_turn();
        }
        outcome
    }

    fn advance_turn(&mut self) {
        self.current_player_index = (self.current_player_index + 1) % self.players.len();
    }

    /// Score the round for `winner_id` and stop play.
    pub fn end_round(&mut self, winner_id: &str) -> Result<(), GameError> {
        let seat = self.seat_of(winner_id).ok_or(GameError::PlayerNotFound)?;
        if self.phase != GamePhase::Playing {
            return Err(self.phase_error());
        }
        self.score_round(seat);
        Ok(())
    }

    fn score_round(&mut self, winner_seat: usize) {
        for (seat, player) in self.players.iter_mut().enumerate() {
            player.round_score = if seat == winner_seat {
                0
            } else {
                deck::player_score(player)
            };
            player.total_score += player.round_score;
        }

        let winner_id = self.players[winner_seat].id.clone();
        self.phase = if self.should_finish() {
            GamePhase::Finished
        } else {
            GamePhase::RoundEnd
        };

        info!(
            game_id = %self.id,
            room_code = %self.room_code,
            round = self.round,
            winner_id = %winner_id,
            phase = self.phase.as_str(),
            "Round ended"
        );
        self.last_winner = Some(winner_id);
    }

    fn should_finish(&self) -> bool {
        self.rules.max_rounds.is_some_and(|max| self.round >= max)
    }

    /// Rotate the dealer, re-deal, and give the first turn to the seat left
    /// of the new dealer. Cumulative totals carry over.
    pub fn start_next_round(&mut self) -> Result<(), GameError> {
        match self.phase {
            GamePhase::RoundEnd => {}
            GamePhase::Finished => return Err(GameError::GameFinished),
            GamePhase::Playing | GamePhase::Dealing => return Err(GameError::RoundInProgress),
        }

        let seats = self.players.len();
        self.round += 1;
        self.dealer_index = (self.dealer_index + 1) % seats;
        for player in &mut self.players {
            player.round_score = 0;
        }
        self.deal_round()?;
        self.current_player_index = (self.dealer_index + 1) % seats;

        info!(
            game_id = %self.id,
            round = self.round,
            dealer_index = self.dealer_index,
            "Round started"
        );
        Ok(())
    }
}

/// Game errors. All are recoverable and leave the game unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("game needs 3-10 players, got {0}")]
    InvalidPlayerCount(usize),
    #[error("player not found")]
    PlayerNotFound,
    #[error("not your turn")]
    NotYourTurn,
    #[error("card not found: {0}")]
    CardNotFound(CardId),
    #[error("card selected more than once: {0}")]
    DuplicateCard(CardId),
    #[error("no cards selected")]
    NoCardsSelected,
    #[error("all cards must have the same value")]
    MixedRanks,
    #[error("invalid play: {0}")]
    InvalidPlay(&'static str),
    #[error("must play all hand cards first")]
    HandNotEmpty,
    #[error("must play all face-up cards first")]
    FaceUpNotEmpty,
    #[error("the face-up card covering this card is still on the table")]
    PairedFaceUpRemaining,
    #[error("round is not in progress")]
    RoundNotActive,
    #[error("round is still in progress")]
    RoundInProgress,
    #[error("game is finished")]
    GameFinished,
}
