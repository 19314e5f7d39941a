//! Integration tests for the multiplayer game server
//!
//! These tests validate cross-component interactions and real network
//! behavior: a server bound to an ephemeral port, driven over live
//! WebSocket connections.

use futures_util::{SinkExt, StreamExt};
use server::config::GameConfig;
use server::network::Server;
use shared::{ClientMessage, FoodView, PlayerView, ServerMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn foodless_config() -> GameConfig {
    GameConfig {
        food_target: 0,
        ..GameConfig::default()
    }
}

async fn start_server(config: GameConfig) -> SocketAddr {
    let mut server = Server::bind("127.0.0.1:0", config)
        .await
        .expect("Failed to bind server");
    let addr = server.local_addr().expect("Failed to read local address");

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{}", addr))
        .await
        .expect("Failed to connect");
    ws
}

async fn send(ws: &mut WsClient, msg: &ClientMessage) {
    let text = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(text)).await.expect("Failed to send");
}

/// Reads frames until the next parseable server message.
async fn next_message(ws: &mut WsClient) -> ServerMessage {
    loop {
        let frame = timeout(Duration::from_secs(3), ws.next())
            .await
            .expect("Timed out waiting for a server message")
            .expect("Connection closed unexpectedly")
            .expect("WebSocket error");

        if let Message::Text(text) = frame {
            if let Ok(msg) = serde_json::from_str(&text) {
                return msg;
            }
        }
    }
}

/// Reads messages until the next snapshot.
async fn next_state(ws: &mut WsClient) -> (u64, Vec<PlayerView>, Vec<FoodView>) {
    loop {
        if let ServerMessage::State { t, players, foods, .. } = next_message(ws).await {
            return (t, players, foods);
        }
    }
}

/// Joins and returns the assigned player id.
async fn join(ws: &mut WsClient, name: &str) -> String {
    send(
        ws,
        &ClientMessage::Join {
            name: Some(name.to_string()),
            avatar: None,
        },
    )
    .await;

    loop {
        if let ServerMessage::Joined { id } = next_message(ws).await {
            return id;
        }
    }
}

/// CONNECTION AND SESSION TESTS
mod session_tests {
    use super::*;

    /// A fresh connection is greeted first, then gets a joined reply and
    /// eventually sees itself in a snapshot.
    #[tokio::test]
    async fn hello_then_join_flow() {
        let addr = start_server(foodless_config()).await;
        let mut ws = connect(addr).await;

        match next_message(&mut ws).await {
            ServerMessage::Hello { msg } => assert!(!msg.is_empty()),
            other => panic!("Expected hello first, got {:?}", other),
        }

        let id = join(&mut ws, "Tester").await;

        let (_, players, _) = next_state(&mut ws).await;
        let me = players
            .iter()
            .find(|p| p.id == id)
            .expect("joined player must appear in snapshots");
        assert_eq!(me.name, "Tester");
        assert_eq!(me.mass, 10.0);
        assert_eq!(me.xp, 0.0);
        assert!(me.x.abs() <= 500.0);
        assert!(me.y.abs() <= 500.0);
    }

    /// An over-long requested name is stored clamped, not rejected.
    #[tokio::test]
    async fn long_name_is_clamped_to_twenty_chars() {
        let addr = start_server(foodless_config()).await;
        let mut ws = connect(addr).await;

        let id = join(&mut ws, &"x".repeat(50)).await;

        let (_, players, _) = next_state(&mut ws).await;
        let me = players.iter().find(|p| p.id == id).unwrap();
        assert_eq!(me.name.chars().count(), 20);
    }

    /// Two concurrent joins produce two distinct players.
    #[tokio::test]
    async fn two_joins_get_distinct_players() {
        let addr = start_server(foodless_config()).await;
        let mut ws_a = connect(addr).await;
        let mut ws_b = connect(addr).await;

        let id_a = join(&mut ws_a, "Alice").await;
        let id_b = join(&mut ws_b, "Bob").await;
        assert_ne!(id_a, id_b);

        // Wait until one snapshot shows both players.
        for _ in 0..50 {
            let (_, players, _) = next_state(&mut ws_a).await;
            if players.len() == 2 {
                let names: Vec<&str> = players.iter().map(|p| p.name.as_str()).collect();
                assert!(names.contains(&"Alice"));
                assert!(names.contains(&"Bob"));
                return;
            }
        }
        panic!("Both players should appear in a snapshot");
    }

    /// Closing a connection removes its player from subsequent snapshots.
    #[tokio::test]
    async fn disconnect_removes_player_from_world() {
        let addr = start_server(foodless_config()).await;
        let mut ws_a = connect(addr).await;
        let mut ws_b = connect(addr).await;

        let id_a = join(&mut ws_a, "Alice").await;
        let id_b = join(&mut ws_b, "Bob").await;

        // Make sure the server saw both before dropping one.
        for _ in 0..50 {
            let (_, players, _) = next_state(&mut ws_b).await;
            if players.len() == 2 {
                break;
            }
        }

        ws_a.close(None).await.expect("Failed to close");

        for _ in 0..50 {
            let (_, players, _) = next_state(&mut ws_b).await;
            if players.len() == 1 {
                assert_eq!(players[0].id, id_b);
                assert!(players.iter().all(|p| p.id != id_a));
                return;
            }
        }
        panic!("Disconnected player should disappear from snapshots");
    }
}

/// PROTOCOL ROBUSTNESS TESTS
mod protocol_tests {
    use super::*;

    /// Garbage and unknown message types are absorbed without any error
    /// frame and without disturbing the session.
    #[tokio::test]
    async fn malformed_messages_are_ignored() {
        let addr = start_server(foodless_config()).await;
        let mut ws = connect(addr).await;

        ws.send(Message::Text("definitely not json".to_string()))
            .await
            .unwrap();
        ws.send(Message::Text(r#"{"type":"warp","to":"moon"}"#.to_string()))
            .await
            .unwrap();
        ws.send(Message::Binary(vec![0, 1, 2, 3])).await.unwrap();

        // The connection is still healthy enough to join and get snapshots.
        let id = join(&mut ws, "Survivor").await;
        let (_, players, _) = next_state(&mut ws).await;
        assert!(players.iter().any(|p| p.id == id));
    }

    /// Input sent before join must not create a player.
    #[tokio::test]
    async fn input_before_join_is_ignored() {
        let addr = start_server(foodless_config()).await;
        let mut ws = connect(addr).await;

        send(&mut ws, &ClientMessage::Input { dx: 1.0, dy: 1.0 }).await;

        let id = join(&mut ws, "Late").await;
        let (_, players, _) = next_state(&mut ws).await;
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].id, id);
    }

    /// Snapshot timestamps never go backwards.
    #[tokio::test]
    async fn snapshot_timestamps_are_monotonic() {
        let addr = start_server(foodless_config()).await;
        let mut ws = connect(addr).await;

        let (t1, _, _) = next_state(&mut ws).await;
        let (t2, _, _) = next_state(&mut ws).await;
        let (t3, _, _) = next_state(&mut ws).await;
        assert!(t2 >= t1);
        assert!(t3 >= t2);
    }
}

/// SIMULATION TESTS OVER THE WIRE
mod simulation_tests {
    use super::*;

    /// A constant rightward intent moves the player right across snapshots.
    #[tokio::test]
    async fn input_moves_player() {
        let addr = start_server(foodless_config()).await;
        let mut ws = connect(addr).await;
        let id = join(&mut ws, "Runner").await;

        send(&mut ws, &ClientMessage::Input { dx: 1.0, dy: 0.0 }).await;

        let (_, players, _) = next_state(&mut ws).await;
        let start_x = players.iter().find(|p| p.id == id).unwrap().x;

        let mut last_x = start_x;
        for _ in 0..10 {
            let (_, players, _) = next_state(&mut ws).await;
            let me = players.iter().find(|p| p.id == id).unwrap();
            assert!(me.x >= last_x, "rightward intent must never move left");
            assert!(me.x.abs() <= 2000.0);
            last_x = me.x;
        }
        assert!(last_x > start_x, "player should have made progress");
    }

    /// The food population in every snapshot is at the configured target.
    #[tokio::test]
    async fn snapshots_hold_food_at_target() {
        let config = GameConfig {
            world_width: 1000.0,
            world_height: 1000.0,
            food_target: 30,
            ..GameConfig::default()
        };
        let addr = start_server(config).await;
        let mut ws = connect(addr).await;

        for _ in 0..5 {
            let (_, _, foods) = next_state(&mut ws).await;
            assert!(foods.len() >= 30);
            for food in &foods {
                assert!(food.x.abs() <= 500.0);
                assert!(food.y.abs() <= 500.0);
                assert_eq!(food.r, config.food_radius);
            }
        }
    }
}
