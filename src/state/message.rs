//! Wire protocol.
//!
//! Inbound frames decode into [`ClientCommand`], outbound snapshots encode
//! from [`ServerMessage`]. Both are tagged by a `"type"` field:
//!
//! ```json
//! {"type": "PLAY_CARDS", "cardIds": ["card-3", "card-51"], "afterPickup": false}
//! {"type": "GAME_UPDATE", "game": {...}}
//! ```
//!
//! The game view is broadcast to every member of the room, so face-down
//! cards are reduced to their id and pair.

use serde::{Deserialize, Serialize};

use super::card::{Card, CardId, PairId};
use super::game::Game;
use super::player::{Player, TableCard};
use super::room::Room;

/// Commands a client can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientCommand {
    #[serde(rename_all = "camelCase")]
    CreateRoom { player_name: String },

    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_code: String,
        player_name: String,
    },

    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_code: String, player_id: String },

    #[serde(rename_all = "camelCase")]
    StartGame { room_code: String, player_id: String },

    #[serde(rename_all = "camelCase")]
    PlayCards {
        card_ids: Vec<CardId>,
        #[serde(default)]
        after_pickup: bool,
    },

    #[serde(rename_all = "camelCase")]
    FlipFaceDown { card_id: CardId },

    PickupPile {},

    NextRound {},
}

impl ClientCommand {
    /// Decode a raw text frame.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Wire name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "CREATE_ROOM",
            Self::JoinRoom { .. } => "JOIN_ROOM",
            Self::LeaveRoom { .. } => "LEAVE_ROOM",
            Self::StartGame { .. } => "START_GAME",
            Self::PlayCards { .. } => "PLAY_CARDS",
            Self::FlipFaceDown { .. } => "FLIP_FACE_DOWN",
            Self::PickupPile {} => "PICKUP_PILE",
            Self::NextRound {} => "NEXT_ROUND",
        }
    }
}

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    RoomCreated {
        room_code: String,
        player_id: String,
        room: RoomView,
    },

    #[serde(rename_all = "camelCase")]
    RoomJoined { player_id: String, room: RoomView },

    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player_id: String,
        player_name: String,
        room: RoomView,
    },

    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: String,
        player_name: String,
        room: RoomView,
    },

    GameStarted { game: GameView },

    GameUpdate { game: GameView },

    RoundEnd {
        winner: PlayerSummary,
        scores: Vec<ScoreLine>,
        round: u32,
        game: GameView,
    },

    RoundStarted { game: GameView },

    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Wire name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RoomCreated { .. } => "ROOM_CREATED",
            Self::RoomJoined { .. } => "ROOM_JOINED",
            Self::PlayerJoined { .. } => "PLAYER_JOINED",
            Self::PlayerLeft { .. } => "PLAYER_LEFT",
            Self::GameStarted { .. } => "GAME_STARTED",
            Self::GameUpdate { .. } => "GAME_UPDATE",
            Self::RoundEnd { .. } => "ROUND_END",
            Self::RoundStarted { .. } => "ROUND_STARTED",
            Self::Error { .. } => "ERROR",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self)
    }

    /// Build the round-end message from a game that has just been scored.
    ///
    /// Returns `None` while no round has been won yet.
    pub fn round_end(game: &Game) -> Option<Self> {
        let winner = game
            .last_winner
            .as_deref()
            .and_then(|id| game.player(id))
            .map(PlayerSummary::from_player)?;

        Some(Self::RoundEnd {
            winner,
            scores: game.players().iter().map(ScoreLine::from_player).collect(),
            round: game.round,
            game: GameView::from_game(game),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSummary {
    pub id: String,
    pub name: String,
}

impl PlayerSummary {
    pub fn from_player(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
        }
    }
}

/// Lobby snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub code: String,
    pub host_id: String,
    pub players: Vec<PlayerSummary>,
    pub player_count: usize,
    pub in_game: bool,
}

impl RoomView {
    pub fn from_room(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            host_id: room.host_id.clone(),
            players: room.members().iter().map(PlayerSummary::from_player).collect(),
            player_count: room.member_count(),
            in_game: room.in_game(),
        }
    }
}

/// Per-player line in a round result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreLine {
    pub player_id: String,
    pub name: String,
    pub round_score: u32,
    pub total_score: u32,
}

impl ScoreLine {
    pub fn from_player(player: &Player) -> Self {
        Self {
            player_id: player.id.clone(),
            name: player.name.clone(),
            round_score: player.round_score,
            total_score: player.total_score,
        }
    }
}

/// A face-up card with the pair it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceUpView {
    #[serde(flatten)]
    pub card: Card,
    pub pair_id: PairId,
}

/// A face-down card as everyone sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HiddenCard {
    pub id: CardId,
    pub pair_id: PairId,
    pub hidden: bool,
}

impl HiddenCard {
    fn from_table(table: &TableCard) -> Self {
        Self {
            id: table.card.id.clone(),
            pair_id: table.pair,
            hidden: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub hand: Vec<Card>,
    pub face_up: Vec<FaceUpView>,
    pub face_down: Vec<HiddenCard>,
    pub hand_count: usize,
    pub round_score: u32,
    pub total_score: u32,
}

impl PlayerView {
    pub fn from_player(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            hand: player.hand.clone(),
            face_up: player
                .face_up
                .iter()
                .map(|t| FaceUpView {
                    card: t.card.clone(),
                    pair_id: t.pair,
                })
                .collect(),
            face_down: player.face_down.iter().map(HiddenCard::from_table).collect(),
            hand_count: player.hand.len(),
            round_score: player.round_score,
            total_score: player.total_score,
        }
    }
}

/// Game snapshot broadcast after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub id: String,
    pub players: Vec<PlayerView>,
    pub center_pile: Vec<Card>,
    pub discard_count: usize,
    pub current_player_index: usize,
    pub dealer_index: usize,
    pub round: u32,
    pub phase: &'static str,
    pub after_pickup: bool,
    pub last_clear_message: Option<String>,
}

impl GameView {
    pub fn from_game(game: &Game) -> Self {
        Self {
            id: game.id.clone(),
            players: game.players().iter().map(PlayerView::from_player).collect(),
            center_pile: game.center_pile().to_vec(),
            discard_count: game.discard_count(),
            current_player_index: game.current_player_index,
            dealer_index: game.dealer_index,
            round: game.round,
            phase: game.phase.as_str(),
            after_pickup: game.after_pickup,
            last_clear_message: game.last_clear_message.clone(),
        }
    }
}

impl Game {
    /// Convert to JSON for sending to clients.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(GameView::from_game(self))
    }
}
