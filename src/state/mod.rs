//! State management module for the shedding card game.
//!
//! This module provides the core state types and managers:
//!
//! - `card` / `deck` / `rules` - Card values, shoe building, dealing, scoring, rule predicates
//! - `player` - A player's hand, face-up and face-down zones
//! - `game` - The rules engine, one per started room
//! - `room` - Room membership and host succession
//! - `connection` - Live connections and their session bindings
//! - `message` - Wire commands, outbound messages and client views
//! - `coordinator` - Ties rooms, games and connections together
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                            Coordinator                               │
//! │                                                                      │
//! │  ┌────────────────────────────┐      ┌─────────────────────────────┐ │
//! │  │ rooms: DashMap             │      │ SessionRegistry (RwLock)    │ │
//! │  │                            │      │                             │ │
//! │  │ code → RoomHandle          │      │ connection → sink, session  │ │
//! │  │   state:  Mutex<Room>      │      │ room code  → connections    │ │
//! │  │             └─ Game        │      │                             │ │
//! │  │   fanout: Mutex<()>        │      │                             │ │
//! │  └────────────────────────────┘      └─────────────────────────────┘ │
//! │                                                                      │
//! │  ┌────────────────────────────────────────────────────────────────┐  │
//! │  │                       GamePhase (per game)                     │  │
//! │  │                                                                │  │
//! │  │   Dealing ──▶ Playing ──▶ RoundEnd ──▶ Dealing ──▶ Finished    │  │
//! │  └────────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::{mpsc, Arc};
//! use shedding_state::state::{ClientCommand, Coordinator, CoordinatorConfig, ServerMessage};
//!
//! let coordinator = Coordinator::new(CoordinatorConfig::default());
//!
//! let (tx, rx) = mpsc::channel::<ServerMessage>();
//! let conn = coordinator.connect(Arc::new(tx));
//!
//! coordinator
//!     .handle(conn, ClientCommand::CreateRoom { player_name: "Alice".into() })
//!     .unwrap();
//! assert_eq!(rx.try_recv().unwrap().kind(), "ROOM_CREATED");
//! ```

pub mod card;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod deck;
pub mod game;
pub mod message;
pub mod player;
pub mod room;
pub mod rules;

// Re-export commonly used types
pub use card::{Card, CardId, PairId, Rank, Suit};
pub use config::{CoordinatorConfig, OverValuePolicy, RulesConfig};
pub use connection::{ConnectionId, MessageSink, SendError, Session, SessionRegistry};
pub use coordinator::{CommandError, Coordinator};
pub use deck::{GameRng, MAX_PLAYERS, MIN_PLAYERS};
pub use game::{check_win, Game, GameError, GamePhase, TurnOutcome};
pub use message::{ClientCommand, GameView, RoomView, ServerMessage};
pub use player::{Player, TableCard};
pub use room::{Room, RoomError, ROOM_CODE_LEN};
pub use rules::{PlayCheck, TrailingRun};
