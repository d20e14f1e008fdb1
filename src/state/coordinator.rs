//! Room and session coordinator.
//!
//! Entry point for the gateway: every decoded command goes through
//! [`Coordinator::handle`], which mutates one room and fans the result out
//! to every connection bound to it.
//!
//! # Locking
//!
//! ```text
//!   rooms (DashMap shard) ──▶ RoomHandle.state ──▶ RoomHandle.fanout ──▶ SessionRegistry
//! ```
//!
//! Locks are normally taken left to right. The one exception is a leave
//! that empties a room: it removes the map entry while still holding the
//! room's state lock. No path waits on a state lock while holding a shard,
//! so this cannot deadlock.
//!
//! Each room has its own state lock, so unrelated rooms never serialize.
//! The fan-out lock is taken before the state lock is released, which makes
//! every member observe a room's broadcasts in mutation order. Sinks are
//! called with no state lock held.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::card::CardId;
use super::config::CoordinatorConfig;
use super::connection::{ConnectionId, MessageSink, Session, SessionRegistry};
use super::game::{Game, GameError, TurnOutcome};
use super::message::{ClientCommand, GameView, RoomView, ServerMessage};
use super::player::Player;
use super::room::{generate_room_code, normalize_code, Room, RoomError};

/// One live room and its ordering lock.
#[derive(Debug)]
pub struct RoomHandle {
    state: Mutex<Room>,

    /// Held while delivering, so one room's broadcasts never interleave
    fanout: Mutex<()>,
}

impl RoomHandle {
    fn new(room: Room) -> Self {
        Self {
            state: Mutex::new(room),
            fanout: Mutex::new(()),
        }
    }

    /// Lock the room, treating a destroyed (empty) room as gone.
    fn lock_live(&self) -> Result<MutexGuard<'_, Room>, CommandError> {
        let room = self.state.lock();
        if room.is_empty() {
            return Err(RoomError::RoomNotFound.into());
        }
        Ok(room)
    }
}

/// Why a command was rejected. Sent back to the issuing connection only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Room(#[from] RoomError),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("not in a room")]
    NotInRoom,
    #[error("already in a room")]
    AlreadyInRoom,
    #[error("game not started")]
    GameNotStarted,
    #[error("unknown connection")]
    UnknownConnection,
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Owns every live room and connection.
#[derive(Debug, Default)]
pub struct Coordinator {
    config: CoordinatorConfig,

    /// Rooms by code
    rooms: DashMap<String, Arc<RoomHandle>>,

    sessions: SessionRegistry,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            rooms: DashMap::new(),
            sessions: SessionRegistry::new(),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Register a new connection and return its id.
    pub fn connect(&self, sink: Arc<dyn MessageSink>) -> ConnectionId {
        let id = ConnectionId::new();
        self.sessions.register(id, sink);
        debug!(connection_id = %id, "Connection registered");
        id
    }

    /// Count live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Snapshot of a live room.
    pub fn room_view(&self, code: &str) -> Option<RoomView> {
        let handle = self.room(&normalize_code(code)).ok()?;
        let room = handle.lock_live().ok()?;
        Some(RoomView::from_room(&room))
    }

    /// Snapshot of a room's running game.
    pub fn game_view(&self, code: &str) -> Option<GameView> {
        let handle = self.room(&normalize_code(code)).ok()?;
        let room = handle.lock_live().ok()?;
        room.game.as_ref().map(GameView::from_game)
    }

    fn room(&self, code: &str) -> Result<Arc<RoomHandle>, CommandError> {
        self.rooms
            .get(code)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(CommandError::Room(RoomError::RoomNotFound))
    }

    fn ensure_unbound(&self, conn: ConnectionId) -> Result<(), CommandError> {
        if !self.sessions.is_registered(conn) {
            return Err(CommandError::UnknownConnection);
        }
        if self.sessions.session(conn).is_some() {
            return Err(CommandError::AlreadyInRoom);
        }
        Ok(())
    }

    /// Decode a raw text frame and dispatch it.
    pub fn handle_text(&self, conn: ConnectionId, text: &str) -> Result<(), CommandError> {
        match ClientCommand::from_json(text) {
            Ok(command) => self.handle(conn, command),
            Err(err) => {
                let err = CommandError::Malformed(err.to_string());
                warn!(connection_id = %conn, error = %err, "Undecodable frame");
                self.send_to(conn, &ServerMessage::error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Dispatch one command. A rejection is reported to `conn` as `ERROR`.
    pub fn handle(&self, conn: ConnectionId, command: ClientCommand) -> Result<(), CommandError> {
        let kind = command.kind();

        let result = match command {
            ClientCommand::CreateRoom { player_name } => {
                self.create_room(conn, &player_name).map(|_| ())
            }
            ClientCommand::JoinRoom {
                room_code,
                player_name,
            } => self.join_room(conn, &room_code, &player_name).map(|_| ()),
            ClientCommand::LeaveRoom {
                room_code,
                player_id,
            } => self.leave_room(&room_code, &player_id),
            ClientCommand::StartGame {
                room_code,
                player_id,
            } => self.start_game(&room_code, &player_id),
            ClientCommand::PlayCards {
                card_ids,
                after_pickup,
            } => self.play_cards(conn, &card_ids, after_pickup),
            ClientCommand::FlipFaceDown { card_id } => self.flip_face_down(conn, &card_id),
            ClientCommand::PickupPile {} => self.pickup_pile(conn),
            ClientCommand::NextRound {} => self.next_round(conn),
        };

        if let Err(err) = &result {
            warn!(connection_id = %conn, command = kind, error = %err, "Command rejected");
            self.send_to(conn, &ServerMessage::error(err.to_string()));
        }
        result
    }

    /// Open a new room with the caller as host and sole member.
    ///
    /// Returns the room snapshot and the new player's id.
    pub fn create_room(
        &self,
        conn: ConnectionId,
        player_name: &str,
    ) -> Result<(RoomView, String), CommandError> {
        let name = player_name.trim();
        if name.is_empty() {
            return Err(RoomError::EmptyName.into());
        }
        self.ensure_unbound(conn)?;

        let player_id = Uuid::new_v4().to_string();
        let mut rng = rand::thread_rng();
        let handle = loop {
            let code = generate_room_code(&mut rng);
            if let Entry::Vacant(slot) = self.rooms.entry(code.clone()) {
                let room = Room::new(code, Player::new(player_id.clone(), name))
                    .with_max_players(self.config.max_room_players);
                let handle = Arc::new(RoomHandle::new(room));
                slot.insert(Arc::clone(&handle));
                break handle;
            }
        };

        let room = handle.state.lock();
        self.sessions
            .bind(conn, Session::new(room.code.clone(), player_id.clone()));
        let view = RoomView::from_room(&room);
        let _order = handle.fanout.lock();
        drop(room);

        info!(room_code = %view.code, player_id = %player_id, "Room created");
        self.send_to(
            conn,
            &ServerMessage::RoomCreated {
                room_code: view.code.clone(),
                player_id: player_id.clone(),
                room: view.clone(),
            },
        );
        Ok((view, player_id))
    }

    /// Add the caller to an existing room.
    pub fn join_room(
        &self,
        conn: ConnectionId,
        code: &str,
        player_name: &str,
    ) -> Result<(RoomView, String), CommandError> {
        let code = normalize_code(code);
        let handle = self.room(&code)?;
        self.ensure_unbound(conn)?;

        let mut room = handle.lock_live()?;
        let player = Player::new(Uuid::new_v4().to_string(), player_name.trim());
        let player_id = player.id.clone();
        let player_name = player.name.clone();
        room.add_member(player)?;

        self.sessions
            .bind(conn, Session::new(code.clone(), player_id.clone()));
        let view = RoomView::from_room(&room);
        let _order = handle.fanout.lock();
        drop(room);

        info!(
            room_code = %code,
            player_id = %player_id,
            players = view.player_count,
            "Player joined room"
        );
        self.send_to(
            conn,
            &ServerMessage::RoomJoined {
                player_id: player_id.clone(),
                room: view.clone(),
            },
        );
        self.deliver(
            &code,
            &ServerMessage::PlayerJoined {
                player_id: player_id.clone(),
                player_name,
                room: view.clone(),
            },
            Some(conn),
        );
        Ok((view, player_id))
    }

    /// Remove a player, and their seat if a game is running. The last one
    /// out destroys the room and its game.
    pub fn leave_room(&self, code: &str, player_id: &str) -> Result<(), CommandError> {
        let code = normalize_code(code);
        let handle = self.room(&code)?;
        let mut room = handle.lock_live()?;

        let player = room
            .remove_member(player_id)
            .ok_or(RoomError::PlayerNotFound)?;
        self.sessions.unbind_player(&code, player_id);
        let update = room.game.as_mut().and_then(|game| {
            game.remove_seat(player_id).ok()?;
            Some(ServerMessage::GameUpdate {
                game: GameView::from_game(game),
            })
        });

        if room.is_empty() {
            self.rooms.remove_if(&code, |_, h| Arc::ptr_eq(h, &handle));
            drop(room);
            self.sessions.unbind_room(&code);
            info!(room_code = %code, player_id = %player_id, "Room destroyed");
            return Ok(());
        }

        let view = RoomView::from_room(&room);
        let _order = handle.fanout.lock();
        drop(room);

        info!(
            room_code = %code,
            player_id = %player_id,
            host_id = %view.host_id,
            "Player left room"
        );
        self.deliver(
            &code,
            &ServerMessage::PlayerLeft {
                player_id: player.id,
                player_name: player.name,
                room: view,
            },
            None,
        );
        if let Some(update) = update {
            self.deliver(&code, &update, None);
        }
        Ok(())
    }

    /// Drop a connection. If it was in a room, the player leaves it.
    pub fn disconnect(&self, conn: ConnectionId) {
        let Some(session) = self.sessions.deregister(conn) else {
            debug!(connection_id = %conn, "Unbound connection closed");
            return;
        };

        info!(
            connection_id = %conn,
            room_code = %session.room_code,
            player_id = %session.player_id,
            "Connection closed"
        );
        if let Err(err) = self.leave_room(&session.room_code, &session.player_id) {
            debug!(connection_id = %conn, error = %err, "Nothing to leave on disconnect");
        }
    }

    /// Host starts the game with the current members.
    pub fn start_game(&self, code: &str, requester_id: &str) -> Result<(), CommandError> {
        let code = normalize_code(code);
        let handle = self.room(&code)?;
        let mut room = handle.lock_live()?;

        let game = room.start_game(
            requester_id,
            self.config.min_start_players,
            self.config.rules.clone(),
        )?;
        info!(
            room_code = %code,
            game_id = %game.id,
            players = game.players().len(),
            "Game started"
        );
        let message = ServerMessage::GameStarted {
            game: GameView::from_game(game),
        };

        let _order = handle.fanout.lock();
        drop(room);
        self.deliver(&code, &message, None);
        Ok(())
    }

    pub fn play_cards(
        &self,
        conn: ConnectionId,
        card_ids: &[CardId],
        after_pickup: bool,
    ) -> Result<(), CommandError> {
        self.game_command(conn, |room, player_id| {
            let game = room.game.as_mut().ok_or(CommandError::GameNotStarted)?;
            let outcome = game.play_cards(player_id, card_ids, after_pickup)?;
            Ok(outcome_message(game, &outcome))
        })
    }

    pub fn flip_face_down(&self, conn: ConnectionId, card_id: &CardId) -> Result<(), CommandError> {
        self.game_command(conn, |room, player_id| {
            let game = room.game.as_mut().ok_or(CommandError::GameNotStarted)?;
            let outcome = game.flip_face_down(player_id, card_id)?;
            Ok(outcome_message(game, &outcome))
        })
    }

    pub fn pickup_pile(&self, conn: ConnectionId) -> Result<(), CommandError> {
        self.game_command(conn, |room, player_id| {
            let game = room.game.as_mut().ok_or(CommandError::GameNotStarted)?;
            let outcome = game.pickup_pile(player_id)?;
            Ok(outcome_message(game, &outcome))
        })
    }

    /// Host deals the next round once the current one has been scored.
    pub fn next_round(&self, conn: ConnectionId) -> Result<(), CommandError> {
        self.game_command(conn, |room, player_id| {
            if !room.is_host(player_id) {
                return Err(RoomError::NotHost.into());
            }
            let game = room.game.as_mut().ok_or(CommandError::GameNotStarted)?;
            game.start_next_round()?;
            Ok(ServerMessage::RoundStarted {
                game: GameView::from_game(game),
            })
        })
    }

    /// Run `apply` against the caller's room and broadcast what it returns.
    fn game_command<F>(&self, conn: ConnectionId, apply: F) -> Result<(), CommandError>
    where
        F: FnOnce(&mut Room, &str) -> Result<ServerMessage, CommandError>,
    {
        let session = self
            .sessions
            .session(conn)
            .ok_or(CommandError::NotInRoom)?;
        let handle = self.room(&session.room_code)?;
        let mut room = handle.lock_live()?;

        let message = apply(&mut *room, &session.player_id)?;

        let _order = handle.fanout.lock();
        drop(room);
        self.deliver(&session.room_code, &message, None);
        Ok(())
    }

    /// Deliver `message` to every connection in a room except `exclude`.
    ///
    /// Returns how many deliveries succeeded.
    pub fn broadcast(
        &self,
        code: &str,
        message: &ServerMessage,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let code = normalize_code(code);
        match self.room(&code) {
            Ok(handle) => {
                let _order = handle.fanout.lock();
                self.deliver(&code, message, exclude)
            }
            Err(_) => self.deliver(&code, message, exclude),
        }
    }

    /// Fan-out with the room's fan-out lock already held.
    fn deliver(&self, code: &str, message: &ServerMessage, exclude: Option<ConnectionId>) -> usize {
        let sinks = self.sessions.sinks_for_room(code, exclude);
        let total = sinks.len();
        let mut delivered = 0;

        for (conn, sink) in sinks {
            match sink.send(message) {
                Ok(()) => delivered += 1,
                Err(err) => warn!(
                    room_code = %code,
                    connection_id = %conn,
                    kind = message.kind(),
                    error = %err,
                    "Failed to deliver message"
                ),
            }
        }

        debug!(
            room_code = %code,
            kind = message.kind(),
            delivered,
            total,
            "Broadcast"
        );
        delivered
    }

    fn send_to(&self, conn: ConnectionId, message: &ServerMessage) {
        let Some(sink) = self.sessions.sink(conn) else {
            return;
        };
        if let Err(err) = sink.send(message) {
            warn!(
                connection_id = %conn,
                kind = message.kind(),
                error = %err,
                "Failed to send message"
            );
        }
    }
}

fn outcome_message(game: &Game, outcome: &TurnOutcome) -> ServerMessage {
    if let TurnOutcome::RoundWon { .. } = outcome {
        if let Some(message) = ServerMessage::round_end(game) {
            return message;
        }
    }
    ServerMessage::GameUpdate {
        game: GameView::from_game(game),
    }
}
