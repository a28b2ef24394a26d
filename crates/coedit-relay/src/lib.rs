//! coedit-relay: room directory, snapshot fan-out and completion endpoint.
//!
//! Accepts one WebSocket per participant on `/ws/{room_id}` and relays each
//! text frame (a full document snapshot) to every other participant of the
//! same room. The relay never inspects or merges snapshots.

pub mod completion;
pub mod connection;
pub mod outbox;
pub mod rooms;
pub mod routes;
pub mod server;

pub use completion::{build_engine, ClaudeEngine, CompletionEngine, MockEngine};
pub use rooms::{Joined, RoomError, RoomHandle, RoomPolicy, RoomStore};
pub use routes::{router, ApiError, AppState};
pub use server::{serve, spawn_reaper};
