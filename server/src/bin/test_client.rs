//! Manual smoke-test client: joins a running server and steers in a circle
//! while printing the snapshots it gets back.

use futures_util::{SinkExt, StreamExt};
use shared::{ClientMessage, ServerMessage};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:8080".to_string());

    println!("Connecting to {}", url);
    let (mut ws, _) = connect_async(url.as_str()).await?;

    // The server greets first.
    if let Some(greeting) = next_server_message(&mut ws).await {
        println!("Received: {:?}", greeting);
    }

    // Join with a test profile
    let join = ClientMessage::Join {
        name: Some("test-client".to_string()),
        avatar: None,
    };
    ws.send(Message::Text(serde_json::to_string(&join)?)).await?;

    let my_id = loop {
        match next_server_message(&mut ws).await {
            Some(ServerMessage::Joined { id }) => break id,
            Some(other) => println!("Skipping: {:?}", message_kind(&other)),
            None => return Err("connection closed before join reply".into()),
        }
    };
    println!("Joined as player {}", my_id);

    // Steer in a circle for a few seconds and report what comes back
    for i in 0..20 {
        let angle = i as f32 / 20.0 * std::f32::consts::TAU;
        let input = ClientMessage::Input {
            dx: angle.cos(),
            dy: angle.sin(),
        };
        ws.send(Message::Text(serde_json::to_string(&input)?)).await?;

        if let Some(ServerMessage::State { t, players, foods, .. }) =
            next_server_message(&mut ws).await
        {
            let me = players.iter().find(|p| p.id == my_id);
            match me {
                Some(me) => println!(
                    "t={} players={} foods={} me=({:.1}, {:.1}) mass={:.1}",
                    t,
                    players.len(),
                    foods.len(),
                    me.x,
                    me.y,
                    me.mass
                ),
                None => println!("t={} (not in snapshot yet)", t),
            }
        }

        sleep(Duration::from_millis(250)).await;
    }

    ws.close(None).await?;
    println!("Test client finished");
    Ok(())
}

/// Reads frames until the next parseable server message, skipping anything
/// else.
async fn next_server_message(ws: &mut WsClient) -> Option<ServerMessage> {
    while let Some(frame) = ws.next().await {
        if let Ok(Message::Text(text)) = frame {
            if let Ok(msg) = serde_json::from_str(&text) {
                return Some(msg);
            }
        }
    }
    None
}

fn message_kind(msg: &ServerMessage) -> &'static str {
    match msg {
        ServerMessage::Hello { .. } => "hello",
        ServerMessage::Joined { .. } => "joined",
        ServerMessage::State { .. } => "state",
    }
}
