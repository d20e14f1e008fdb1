//! End-to-end room flows driven through the coordinator's command surface.
//!
//! Every client is a recording sink; assertions look at what each one
//! actually received, as JSON, in order.

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use serde_json::Value;
use shedding_state::{
    ClientCommand, ConnectionId, Coordinator, CoordinatorConfig, MessageSink, RulesConfig,
    SendError, ServerMessage,
};

#[derive(Default)]
struct Client {
    inbox: Mutex<Vec<Value>>,
}

impl MessageSink for Client {
    fn send(&self, message: &ServerMessage) -> Result<(), SendError> {
        self.inbox.lock().push(message.to_json());
        Ok(())
    }
}

impl Client {
    fn types(&self) -> Vec<String> {
        self.inbox
            .lock()
            .iter()
            .map(|m| m["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn last(&self) -> Value {
        self.inbox.lock().last().cloned().unwrap_or(Value::Null)
    }

    fn take(&self) -> Vec<Value> {
        std::mem::take(&mut *self.inbox.lock())
    }
}

fn coordinator() -> Coordinator {
    Coordinator::new(CoordinatorConfig {
        rules: RulesConfig {
            seed: Some(2024),
            ..Default::default()
        },
        ..Default::default()
    })
}

fn connect(coordinator: &Coordinator) -> (ConnectionId, Arc<Client>) {
    let client = Arc::new(Client::default());
    let id = coordinator.connect(client.clone());
    (id, client)
}

fn send(coordinator: &Coordinator, conn: ConnectionId, frame: Value) {
    // Rejections come back as ERROR frames; the tests inspect those.
    let _ = coordinator.handle_text(conn, &frame.to_string());
}

#[test]
fn test_lobby_to_first_play() {
    let coordinator = coordinator();
    let (alice, alice_rx) = connect(&coordinator);
    let (bob, bob_rx) = connect(&coordinator);
    let (carol, carol_rx) = connect(&coordinator);

    send(
        &coordinator,
        alice,
        serde_json::json!({"type": "CREATE_ROOM", "playerName": "Alice"}),
    );
    let created = alice_rx.last();
    assert_eq!(created["type"], "ROOM_CREATED");
    let code = created["roomCode"].as_str().unwrap().to_string();
    let alice_id = created["playerId"].as_str().unwrap().to_string();
    assert_eq!(created["room"]["hostId"], alice_id.as_str());

    for (conn, name) in [(bob, "Bob"), (carol, "Carol")] {
        send(
            &coordinator,
            conn,
            serde_json::json!({"type": "JOIN_ROOM", "roomCode": code, "playerName": name}),
        );
    }
    assert_eq!(bob_rx.types(), vec!["ROOM_JOINED", "PLAYER_JOINED"]);
    assert_eq!(carol_rx.types(), vec!["ROOM_JOINED"]);
    assert_eq!(
        alice_rx.types(),
        vec!["ROOM_CREATED", "PLAYER_JOINED", "PLAYER_JOINED"]
    );
    let bob_id = bob_rx.take()[0]["playerId"].as_str().unwrap().to_string();

    // Bob is not the host
    send(
        &coordinator,
        bob,
        serde_json::json!({"type": "START_GAME", "roomCode": code, "playerId": bob_id}),
    );
    assert_eq!(bob_rx.last()["type"], "ERROR");
    assert_eq!(bob_rx.last()["message"], "only the host can do that");
    assert!(!coordinator.room_view(&code).unwrap().in_game);
    bob_rx.take();

    send(
        &coordinator,
        alice,
        serde_json::json!({"type": "START_GAME", "roomCode": code, "playerId": alice_id}),
    );
    let started = carol_rx.last();
    assert_eq!(started["type"], "GAME_STARTED");
    let game = &started["game"];
    assert_eq!(game["players"].as_array().unwrap().len(), 3);
    assert_eq!(game["discardCount"], 44);
    assert_eq!(game["currentPlayerIndex"], 0);
    for player in game["players"].as_array().unwrap() {
        assert_eq!(player["hand"].as_array().unwrap().len(), 12);
        for hidden in player["faceDown"].as_array().unwrap() {
            assert_eq!(hidden["hidden"], true);
            assert!(hidden.get("value").is_none());
        }
    }

    // Alice is seated first and plays her first hand card onto the empty pile
    let card_id = game["players"][0]["hand"][0]["id"].clone();
    send(
        &coordinator,
        alice,
        serde_json::json!({"type": "PLAY_CARDS", "cardIds": [card_id], "afterPickup": false}),
    );
    let update = bob_rx.last();
    assert_eq!(update["type"], "GAME_UPDATE");
    assert_eq!(update["game"]["players"][0]["handCount"], 11);

    // Everyone saw the same broadcasts in the same order
    let alice_seen: Vec<Value> = alice_rx.take().split_off(3);
    let bob_seen = bob_rx.take();
    let carol_seen: Vec<Value> = carol_rx.take().split_off(1);
    assert_eq!(alice_seen, bob_seen);
    assert_eq!(bob_seen, carol_seen);
}

#[test]
fn test_rejections_reach_only_the_sender() {
    let coordinator = coordinator();
    let (alice, alice_rx) = connect(&coordinator);
    let (bob, bob_rx) = connect(&coordinator);

    send(
        &coordinator,
        alice,
        serde_json::json!({"type": "CREATE_ROOM", "playerName": "Alice"}),
    );
    let code = alice_rx.last()["roomCode"].as_str().unwrap().to_string();
    alice_rx.take();

    send(
        &coordinator,
        bob,
        serde_json::json!({"type": "JOIN_ROOM", "roomCode": code, "playerName": "Alice"}),
    );
    assert_eq!(bob_rx.last()["message"], "name already taken: Alice");

    send(
        &coordinator,
        bob,
        serde_json::json!({"type": "JOIN_ROOM", "roomCode": "NOPE00", "playerName": "Bob"}),
    );
    assert_eq!(bob_rx.last()["message"], "room not found");

    send(
        &coordinator,
        bob,
        serde_json::json!({"type": "FLIP_FACE_DOWN", "cardId": "card-1"}),
    );
    assert_eq!(bob_rx.last()["message"], "not in a room");

    send(&coordinator, bob, serde_json::json!({"type": "DANCE"}));
    assert_eq!(bob_rx.last()["type"], "ERROR");

    assert_eq!(bob_rx.types(), vec!["ERROR"; 4]);
    assert!(alice_rx.types().is_empty());
}

#[test]
fn test_room_lifecycle_through_leaves() {
    let coordinator = coordinator();
    let (alice, alice_rx) = connect(&coordinator);
    let (bob, bob_rx) = connect(&coordinator);

    send(
        &coordinator,
        alice,
        serde_json::json!({"type": "CREATE_ROOM", "playerName": "Alice"}),
    );
    let created = alice_rx.last();
    let code = created["roomCode"].as_str().unwrap().to_string();
    let alice_id = created["playerId"].as_str().unwrap().to_string();
    send(
        &coordinator,
        bob,
        serde_json::json!({"type": "JOIN_ROOM", "roomCode": code, "playerName": "Bob"}),
    );
    let bob_id = bob_rx.last()["playerId"].as_str().unwrap().to_string();

    send(
        &coordinator,
        alice,
        serde_json::json!({"type": "LEAVE_ROOM", "roomCode": code, "playerId": alice_id}),
    );
    let left = bob_rx.last();
    assert_eq!(left["type"], "PLAYER_LEFT");
    assert_eq!(left["playerName"], "Alice");
    assert_eq!(left["room"]["hostId"], bob_id.as_str());

    // Alice is free to open another room
    send(
        &coordinator,
        alice,
        serde_json::json!({"type": "CREATE_ROOM", "playerName": "Alice"}),
    );
    assert_eq!(alice_rx.last()["type"], "ROOM_CREATED");
    assert_eq!(coordinator.room_count(), 2);

    coordinator.disconnect(bob);
    assert_eq!(coordinator.room_count(), 1);
    assert!(coordinator.room_view(&code).is_none());
}

#[test]
fn test_concurrent_joins_and_leaves_keep_room_consistent() {
    let coordinator = Arc::new(coordinator());
    let (host, host_rx) = connect(&coordinator);
    let (host_view, _host_id) = coordinator.create_room(host, "Host").unwrap();
    let code = host_view.code;

    let (watcher, watcher_rx) = connect(&coordinator);
    coordinator.join_room(watcher, &code, "Watcher").unwrap();
    host_rx.take();
    watcher_rx.take();

    let workers: Vec<_> = (0..6)
        .map(|t| {
            let coordinator = Arc::clone(&coordinator);
            let code = code.clone();
            thread::spawn(move || {
                for i in 0..40 {
                    let (conn, _rx) = connect(&coordinator);
                    let name = format!("T{}-{}", t, i);
                    let (_, player_id) = coordinator
                        .join_room(conn, &code, &name)
                        .expect("room has space for every worker");
                    if i % 2 == 0 {
                        coordinator.leave_room(&code, &player_id).unwrap();
                    } else {
                        coordinator.disconnect(conn);
                    }
                }
            })
        })
        .collect();

    // A second room churns at the same time
    let other = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || {
            for i in 0..40 {
                let (conn, _rx) = connect(&coordinator);
                let (view, player_id) = coordinator
                    .create_room(conn, &format!("Solo{}", i))
                    .unwrap();
                coordinator.leave_room(&view.code, &player_id).unwrap();
            }
        })
    };

    for worker in workers {
        worker.join().unwrap();
    }
    other.join().unwrap();

    let view = coordinator.room_view(&code).unwrap();
    assert_eq!(view.player_count, 2);
    assert_eq!(view.players[0].name, "Host");
    assert_eq!(view.players[1].name, "Watcher");
    assert_eq!(coordinator.room_count(), 1);
    assert_eq!(coordinator.sessions().sinks_for_room(&code, None).len(), 2);

    // Both stayed bound the whole time, so both saw the same ordered stream
    let host_seen = host_rx.take();
    let watcher_seen = watcher_rx.take();
    assert_eq!(host_seen.len(), 6 * 40 * 2);
    assert_eq!(host_seen, watcher_seen);

    // Every snapshot is internally consistent
    for message in &host_seen {
        let room = &message["room"];
        let count = room["playerCount"].as_u64().unwrap() as usize;
        assert_eq!(room["players"].as_array().unwrap().len(), count);
        assert!((2..=8).contains(&count));
    }
}
