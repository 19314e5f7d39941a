//! # Game Server Library
//!
//! This library provides the authoritative server for a real-time
//! area-control game: every connected client steers a circular entity that
//! grows by consuming scattered food particles inside a bounded 2D world,
//! slowing down as it grows. The server owns the one true copy of the game
//! state and broadcasts it to all clients at a fixed rate.
//!
//! ## Architecture Design
//!
//! ### Single-Owner Game Loop
//! One task owns the world and the session table outright. Connection tasks
//! never touch either; they push `join`, `input`, and `disconnect` events
//! into a channel that the loop drains between simulation steps. A tick
//! therefore never observes a half-applied join, leave, or intent update,
//! and both intent axes always land together.
//!
//! ### Fixed-Rate Simulation
//! A `tokio` interval drives ticks at a fixed rate (default 20 Hz) with the
//! skip policy for overruns: a slow tick delays the next one, but tick
//! logic is never re-entered. Each tick runs its phases in a fixed order
//! (replenish food, integrate motion, resolve consumption) and then
//! broadcasts one snapshot to every connection.
//!
//! ### Lenient Protocol Surface
//! All client input is absorbed, never rejected: unparseable frames and
//! unknown message types are dropped, out-of-range numbers are clamped,
//! non-string profile fields fall back to defaults, and inputs from
//! connections that never joined are silently ignored. No protocol error is
//! ever surfaced back to a client.
//!
//! ## Module Organization
//!
//! - [`config`]: every tunable constant of the simulation in one struct.
//! - [`physics`]: 2D vector plus the mass-to-radius and mass-to-speed curves.
//! - [`world`]: the authoritative state and the per-tick simulation step.
//! - [`session`]: connection registry, player binding, outbound fan-out.
//! - [`network`]: WebSocket transport, event mailbox, and the game loop.

pub mod config;
pub mod network;
pub mod physics;
pub mod session;
pub mod world;

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, used to stamp outgoing snapshots.
/// A clock set before the epoch reads as zero rather than failing.
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
