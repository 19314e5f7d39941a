//! Server network layer handling WebSocket connections and game loop coordination

use crate::config::GameConfig;
use crate::session::{self, SessionManager};
use crate::world::World;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientMessage, ServerMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;

/// Greeting sent to every connection as soon as it is accepted.
const SERVER_GREETING: &str = "orbium-server";

/// Ticks between health log lines (10s at the default 20 Hz).
const HEALTH_LOG_INTERVAL: u64 = 200;

/// Events sent from connection tasks to the game loop. This channel is the
/// only path from the network into the world: joins, inputs, and disconnects
/// all arrive here and are applied between simulation steps, in order per
/// connection.
#[derive(Debug)]
pub enum ServerEvent {
    Connected {
        conn_id: u64,
        sender: mpsc::UnboundedSender<Message>,
    },
    Inbound {
        conn_id: u64,
        msg: ClientMessage,
    },
    Disconnected {
        conn_id: u64,
    },
}

/// Main server coordinating networking and the authoritative simulation.
///
/// The game loop task owns the world and the session table outright. The
/// tick interval drives the simulation at a fixed rate with
/// `MissedTickBehavior::Skip`, so an overrunning tick delays the next one
/// but two ticks never mutate the world concurrently.
pub struct Server {
    listener: Arc<TcpListener>,
    world: World,
    sessions: SessionManager,
    config: GameConfig,

    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        config: GameConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let listener = Arc::new(TcpListener::bind(addr).await?);
        info!("Server listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            world: World::new(config),
            sessions: SessionManager::new(),
            config,
            event_tx,
            event_rx,
        })
    }

    /// Address the listener actually bound to. Lets tests bind port 0 and
    /// discover the assigned port.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns the task that accepts TCP connections, performs the WebSocket
    /// handshake, and hands each connection its own reader/writer tasks.
    fn spawn_acceptor(&self) {
        let listener = Arc::clone(&self.listener);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let mut next_conn_id: u64 = 1;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let conn_id = next_conn_id;
                        next_conn_id += 1;
                        debug!("Accepted connection {} from {}", conn_id, addr);
                        tokio::spawn(handle_connection(conn_id, stream, event_tx.clone()));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Applies a network event to the session table and world. Runs on the
    /// game loop task only, strictly between simulation steps.
    fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Connected { conn_id, sender } => {
                self.sessions.register(conn_id, sender);
                self.sessions.send_to(
                    conn_id,
                    &ServerMessage::Hello {
                        msg: SERVER_GREETING.to_string(),
                    },
                );
            }

            ServerEvent::Inbound { conn_id, msg } => match msg {
                ClientMessage::Join { name, avatar } => self.handle_join(conn_id, name, avatar),
                ClientMessage::Input { dx, dy } => self.handle_input(conn_id, dx, dy),
            },

            ServerEvent::Disconnected { conn_id } => {
                if let Some(player_id) = self.sessions.unregister(conn_id) {
                    self.world.remove_player(&player_id);
                }
            }
        }
    }

    fn handle_join(&mut self, conn_id: u64, name: Option<String>, avatar: Option<String>) {
        if self.sessions.player_id(conn_id).is_some() {
            debug!("Connection {} sent join while already bound", conn_id);
            return;
        }

        let name = session::sanitize_name(name);
        let avatar = session::sanitize_avatar(avatar);
        let player_id = self.world.spawn_player(&name, &avatar);

        if self.sessions.bind(conn_id, player_id.clone()) {
            self.sessions
                .send_to(conn_id, &ServerMessage::Joined { id: player_id });
        } else {
            // The connection is gone; don't leave an orphan player behind.
            self.world.remove_player(&player_id);
        }
    }

    fn handle_input(&mut self, conn_id: u64, dx: f32, dy: f32) {
        match self.sessions.player_id(conn_id) {
            Some(player_id) => self.world.set_intent(player_id, dx, dy),
            // A race between disconnect and in-flight input is expected.
            None => debug!("Ignoring input from unbound connection {}", conn_id),
        }
    }

    /// One simulation tick: advance the world by the fixed step, then fan
    /// the fresh snapshot out to every connection in a single pass.
    fn tick(&mut self) {
        self.world.step(self.config.tick_dt());

        if self.world.tick % HEALTH_LOG_INTERVAL == 0 {
            debug!(
                "Tick {}: {} connections, {} players, {} food",
                self.world.tick,
                self.sessions.len(),
                self.world.players.len(),
                self.world.food.len()
            );
        }

        if self.sessions.is_empty() {
            return;
        }

        let snapshot = self.world.snapshot(crate::get_timestamp());
        self.sessions.broadcast(&snapshot);
    }

    /// Main server loop coordinating all operations.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.spawn_acceptor();

        let mut tick_interval = interval(self.config.tick_interval());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Skip the first tick since it fires immediately
        tick_interval.tick().await;

        info!(
            "Server started: {} Hz, world {}x{}, food target {}",
            self.config.tick_hz,
            self.config.world_width,
            self.config.world_height,
            self.config.food_target
        );

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    self.tick();
                },
            }
        }

        Ok(())
    }
}

/// Runs one client connection: WebSocket handshake, a writer task draining
/// the outbound queue, and a read loop forwarding parsed messages to the
/// game loop. Anything unparseable is dropped without a reply.
async fn handle_connection(
    conn_id: u64,
    stream: TcpStream,
    event_tx: mpsc::UnboundedSender<ServerEvent>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed for connection {}: {}", conn_id, e);
            return;
        }
    };

    let (mut ws_sink, mut ws_stream) = ws.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

    // Writer task: the only place this connection's sink is touched.
    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            if ws_sink.send(message).await.is_err() {
                break;
            }
        }
    });

    if event_tx
        .send(ServerEvent::Connected { conn_id, sender: out_tx })
        .is_err()
    {
        return;
    }

    while let Some(frame) = ws_stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Connection {} read error: {}", conn_id, e);
                break;
            }
        };

        match frame {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    if event_tx.send(ServerEvent::Inbound { conn_id, msg }).is_err() {
                        break;
                    }
                }
                Err(_) => {
                    debug!("Ignoring unparseable message from connection {}", conn_id);
                }
            },
            Message::Close(_) => break,
            // Binary, ping, and pong frames carry nothing in this protocol.
            _ => {}
        }
    }

    let _ = event_tx.send(ServerEvent::Disconnected { conn_id });
    writer.abort();
}
