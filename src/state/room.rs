//! Room state management.
//!
//! A room is the pre-game lobby players gather in under a shareable code.
//! Once the host starts it, the room carries the running [`Game`] until the
//! last member leaves and the room is destroyed.

use rand::Rng;

use super::config::RulesConfig;
use super::deck::MAX_PLAYERS;
use super::game::{Game, GameError};
use super::player::Player;

/// Length of a room code.
pub const ROOM_CODE_LEN: usize = 6;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draw a fresh room code, uniformly per character from `[A-Z0-9]`.
///
/// Collisions with live rooms are the registry's problem; it re-draws.
pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Canonical form of a user-typed code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Room state.
#[derive(Debug, Clone)]
pub struct Room {
    /// Shareable code, unique among live rooms
    pub code: String,

    /// Current host player ID
    pub host_id: String,

    /// Members in join order; the order is also host-succession order
    members: Vec<Player>,

    /// Maximum players allowed
    pub max_players: usize,

    /// Running game, once started
    pub game: Option<Game>,

    /// When room was created
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Room {
    /// Create a room with `host` as its first member.
    pub fn new(code: impl Into<String>, host: Player) -> Self {
        Self {
            code: code.into(),
            host_id: host.id.clone(),
            members: vec![host],
            max_players: MAX_PLAYERS,
            game: None,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn with_max_players(mut self, max_players: usize) -> Self {
        self.max_players = max_players;
        self
    }

    /// Add a member to the room.
    pub fn add_member(&mut self, player: Player) -> Result<(), RoomError> {
        if player.name.trim().is_empty() {
            return Err(RoomError::EmptyName);
        }
        if self.in_game() {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        if self.members.iter().any(|m| m.name == player.name) {
            return Err(RoomError::DuplicateName(player.name));
        }

        self.members.push(player);
        Ok(())
    }

    /// Remove a member from the room.
    ///
    /// When the host leaves, the earliest-joined remaining member takes over.
    pub fn remove_member(&mut self, player_id: &str) -> Option<Player> {
        let pos = self.members.iter().position(|m| m.id == player_id)?;
        let member = self.members.remove(pos);

        if self.host_id == player_id {
            if let Some(next) = self.members.first() {
                self.host_id = next.id.clone();
            }
        }

        Some(member)
    }

    /// Get a member by player ID.
    pub fn get_member(&self, player_id: &str) -> Option<&Player> {
        self.members.iter().find(|m| m.id == player_id)
    }

    /// Check if player is a member.
    pub fn has_member(&self, player_id: &str) -> bool {
        self.get_member(player_id).is_some()
    }

    /// Check if player is the host.
    pub fn is_host(&self, player_id: &str) -> bool {
        self.host_id == player_id
    }

    /// Members in join order.
    pub fn members(&self) -> &[Player] {
        &self.members
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_players
    }

    /// An empty room is dead and must not be joined.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn in_game(&self) -> bool {
        self.game.is_some()
    }

    /// Start a game with the current members seated in join order.
    pub fn start_game(
        &mut self,
        requester_id: &str,
        min_players: usize,
        rules: RulesConfig,
    ) -> Result<&Game, RoomError> {
        if !self.is_host(requester_id) {
            return Err(RoomError::NotHost);
        }
        if self.in_game() {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.members.len() < min_players {
            return Err(RoomError::InsufficientPlayers {
                have: self.members.len(),
                need: min_players,
            });
        }

        let game = Game::start(self.code.clone(), self.members.clone(), rules)?;
        Ok(self.game.insert(game))
    }

    /// Convert to JSON for sending to clients.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(super::message::RoomView::from_room(self))
    }
}

/// Room errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room not found")]
    RoomNotFound,
    #[error("player name cannot be empty")]
    EmptyName,
    #[error("room is full")]
    RoomFull,
    #[error("name already taken: {0}")]
    DuplicateName(String),
    #[error("only the host can do that")]
    NotHost,
    #[error("need at least {need} players to start, have {have}")]
    InsufficientPlayers { have: usize, need: usize },
    #[error("player not in this room")]
    PlayerNotFound,
    #[error("game already started")]
    GameAlreadyStarted,
    #[error(transparent)]
    Game(#[from] GameError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::GamePhase;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn make_room(names: &[&str]) -> Room {
        let mut room = Room::new("ABC123", Player::new("id-0", names[0]));
        for (i, name) in names.iter().enumerate().skip(1) {
            room.add_member(Player::new(format!("id-{}", i), *name)).unwrap();
        }
        room
    }

    fn seeded() -> RulesConfig {
        RulesConfig {
            seed: Some(9),
            ..Default::default()
        }
    }

    #[test]
    fn test_room_new() {
        let room = make_room(&["Alice"]);
        assert_eq!(room.member_count(), 1);
        assert!(room.is_host("id-0"));
        assert!(!room.is_empty());
        assert!(!room.in_game());
    }

    #[test]
    fn test_room_members_keep_join_order() {
        let room = make_room(&["Alice", "Bob", "Carol"]);
        let names: Vec<&str> = room.members().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
        assert!(room.has_member("id-2"));
        assert!(!room.is_host("id-1"));
    }

    #[test]
    fn test_room_add_member_rejections() {
        let mut room = make_room(&["Alice"]);

        assert_eq!(
            room.add_member(Player::new("x", "  ")),
            Err(RoomError::EmptyName)
        );
        assert_eq!(
            room.add_member(Player::new("x", "Alice")),
            Err(RoomError::DuplicateName("Alice".to_string()))
        );
        // Names are case-sensitive
        room.add_member(Player::new("x", "alice")).unwrap();
    }

    #[test]
    fn test_room_full() {
        let names: Vec<String> = (0..MAX_PLAYERS).map(|i| format!("P{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut room = make_room(&refs);

        assert!(room.is_full());
        assert_eq!(
            room.add_member(Player::new("late", "Late")),
            Err(RoomError::RoomFull)
        );
    }

    #[test]
    fn test_room_host_succession() {
        let mut room = make_room(&["Alice", "Bob", "Carol"]);

        // Non-host leaving does not move the host
        room.remove_member("id-1").unwrap();
        assert!(room.is_host("id-0"));

        room.add_member(Player::new("id-3", "Dave")).unwrap();

        // Earliest-joined remaining member takes over
        room.remove_member("id-0").unwrap();
        assert!(room.is_host("id-2"));

        room.remove_member("id-2").unwrap();
        assert!(room.is_host("id-3"));

        room.remove_member("id-3").unwrap();
        assert!(room.is_empty());
        assert!(room.remove_member("id-3").is_none());
    }

    #[test]
    fn test_room_start_game() {
        let mut room = make_room(&["Alice", "Bob"]);

        assert_eq!(
            room.start_game("id-1", 3, seeded()).unwrap_err(),
            RoomError::NotHost
        );
        assert_eq!(
            room.start_game("id-0", 3, seeded()).unwrap_err(),
            RoomError::InsufficientPlayers { have: 2, need: 3 }
        );
        assert!(!room.in_game());

        room.add_member(Player::new("id-2", "Carol")).unwrap();
        let game = room.start_game("id-0", 3, seeded()).unwrap();
        assert_eq!(game.phase, GamePhase::Playing);
        let seats: Vec<&str> = game.players().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(seats, vec!["id-0", "id-1", "id-2"]);

        assert_eq!(
            room.start_game("id-0", 3, seeded()).unwrap_err(),
            RoomError::GameAlreadyStarted
        );
        assert_eq!(
            room.add_member(Player::new("id-3", "Dave")),
            Err(RoomError::GameAlreadyStarted)
        );
    }

    #[test]
    fn test_room_code_format() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..200 {
            let code = generate_room_code(&mut rng);
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
        assert_ne!(generate_room_code(&mut rng), generate_room_code(&mut rng));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" abc123 "), "ABC123");
    }

    #[test]
    fn test_room_to_json() {
        let room = make_room(&["Alice", "Bob"]);
        let json = room.to_json();

        assert_eq!(json["code"], "ABC123");
        assert_eq!(json["hostId"], "id-0");
        assert_eq!(json["playerCount"], 2);
        assert_eq!(json["inGame"], false);
        assert_eq!(json["players"][1]["name"], "Bob");
    }
}
