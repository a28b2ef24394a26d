//! Listener setup and the stale room reaper.

use std::net::SocketAddr;
use std::time::Duration;

use coedit_common::CompletionError;
use coedit_config::RelayConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::completion::build_engine;
use crate::rooms::{RoomPolicy, RoomStore};
use crate::routes::{router, AppState};

impl AppState {
    /// Build relay state from config. Fails only when the selected
    /// completion provider cannot be set up.
    pub fn from_config(config: &RelayConfig) -> Result<Self, CompletionError> {
        let policy = RoomPolicy {
            empty_ttl: Duration::from_secs(config.room_ttl_secs),
            replay_on_join: config.replay_on_join,
        };
        Ok(Self {
            rooms: RoomStore::new(policy),
            completion: build_engine(&config.completion)?,
            outbound_queue: config.outbound_queue,
        })
    }
}

/// Serve HTTP and WebSocket routes on `listener` until the process exits.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

/// Periodically drop rooms that stayed empty past their TTL.
pub fn spawn_reaper(store: RoomStore, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let reaped = store.reap_stale().await;
            let count = store.room_count().await;
            tracing::debug!(rooms = count, reaped, "Reaper tick");
        }
    })
}
