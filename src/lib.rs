//! Shedding Game State Library
//!
//! This crate provides the authoritative server state for a real-time,
//! multi-player shedding card game.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Rules Engine** - Multi-deck shoe, three-zone deal, wild tens, set
//!   clears, over-value pickups, face-down flips and end-of-round scoring.
//!
//! - **Room Management** - Shareable room codes, join-ordered membership,
//!   host succession when the host leaves.
//!
//! - **Session Management** - Binds each live connection to a room and
//!   player, and fans state snapshots out to every member in mutation order.
//!
//! # Design Principles
//!
//! 1. **Validate before mutating** - A rejected command leaves rooms and games
//!    exactly as they were and is reported to the issuing connection only.
//!
//! 2. **One lock per room** - Unrelated rooms never wait on each other.
//!
//! 3. **No networking** - The gateway plugs in through [`MessageSink`] and
//!    typed [`ClientCommand`]s; this crate never touches a socket.
//!
//! 4. **Serialization-ready** - Every outbound message serializes to the
//!    client JSON protocol, with face-down cards redacted.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{mpsc, Arc};
//! use shedding_state::{ClientCommand, Coordinator, CoordinatorConfig, ServerMessage};
//!
//! let coordinator = Coordinator::new(CoordinatorConfig::default());
//!
//! let (host_tx, host_rx) = mpsc::channel::<ServerMessage>();
//! let host = coordinator.connect(Arc::new(host_tx));
//! let (room, _host_id) = coordinator.create_room(host, "Alice").unwrap();
//!
//! let (guest_tx, _guest_rx) = mpsc::channel::<ServerMessage>();
//! let guest = coordinator.connect(Arc::new(guest_tx));
//! coordinator
//!     .handle(guest, ClientCommand::JoinRoom { room_code: room.code.clone(), player_name: "Bob".into() })
//!     .unwrap();
//!
//! assert!(matches!(host_rx.try_recv().unwrap(), ServerMessage::RoomCreated { .. }));
//! assert!(matches!(host_rx.try_recv().unwrap(), ServerMessage::PlayerJoined { .. }));
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
