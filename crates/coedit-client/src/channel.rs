//! Room channel: a WebSocket to `/ws/{room_id}` owned by a background task.
//!
//! The caller sends snapshots through [`RoomChannel::send`] and receives
//! everything the relay forwards as [`ChannelEvent`]s. The channel never
//! reconnects; once it closes a [`ChannelEvent::Closed`] is the last event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use coedit_common::{ConnectionError, TransportError};
use coedit_config::ClientConfig;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::directory::normalize_room_id;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Snapshots waiting to be written to the socket.
const OUTBOUND_QUEUE: usize = 64;

/// Events waiting to be consumed by the participant.
const INBOUND_QUEUE: usize = 256;

/// How long `close` waits for the close frame to go out.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// What the relay delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A full document snapshot from another participant.
    Snapshot(String),
    /// The channel is gone. No further events follow.
    Closed { reason: String },
}

/// Outbound half of a room connection, as seen by the participant loop.
#[async_trait]
pub trait RoomTransport: Send {
    /// Queue a snapshot for the other participants. Never blocks.
    fn send_snapshot(&self, snapshot: String) -> Result<(), TransportError>;

    /// Close the connection. Safe to call more than once.
    async fn close(&mut self);
}

enum Outbound {
    Snapshot(String),
    Close,
}

pub struct RoomChannel {
    room_id: String,
    outbound: mpsc::Sender<Outbound>,
    open: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl RoomChannel {
    /// Open a channel to `room_id` on the configured relay.
    pub async fn connect(
        config: &ClientConfig,
        room_id: &str,
    ) -> Result<(Self, mpsc::Receiver<ChannelEvent>), ConnectionError> {
        let room_id = normalize_room_id(room_id)?;
        let url = config
            .ws_url(&room_id)
            .ok_or_else(|| ConnectionError::InvalidUrl(config.server_url.clone()))?;
        Self::connect_url(
            &url,
            room_id,
            Duration::from_millis(config.connect_timeout_ms),
        )
        .await
    }

    /// Open a channel to an explicit `ws://` or `wss://` URL.
    pub async fn connect_url(
        url: &str,
        room_id: String,
        timeout: Duration,
    ) -> Result<(Self, mpsc::Receiver<ChannelEvent>), ConnectionError> {
        info!(url = %url, room = %room_id, "Connecting to room");

        let ws = match tokio::time::timeout(timeout, connect_async(url)).await {
            Ok(Ok((ws, _))) => ws,
            Ok(Err(e)) => return Err(ConnectionError::Handshake(e.to_string())),
            Err(_) => return Err(ConnectionError::Timeout(timeout.as_millis() as u64)),
        };

        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (event_tx, event_rx) = mpsc::channel(INBOUND_QUEUE);
        let open = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(channel_loop(
            ws,
            room_id.clone(),
            out_rx,
            event_tx,
            Arc::clone(&open),
        ));

        info!(room = %room_id, "Room channel open");
        let channel = Self {
            room_id,
            outbound: out_tx,
            open,
            task: Some(task),
        };
        Ok((channel, event_rx))
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Queue a snapshot. Fails fast when the channel is closed or backed up.
    pub fn send(&self, snapshot: String) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        self.outbound
            .try_send(Outbound::Snapshot(snapshot))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => TransportError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
            })
    }

    /// Send a close frame and wait briefly for the task to finish.
    pub async fn close(&mut self) {
        let Some(mut task) = self.task.take() else {
            return;
        };
        self.open.store(false, Ordering::SeqCst);
        let graceful = async {
            let _ = self.outbound.send(Outbound::Close).await;
            let _ = (&mut task).await;
        };
        if tokio::time::timeout(CLOSE_GRACE, graceful).await.is_err() {
            debug!(room = %self.room_id, "Channel task slow to stop, aborting");
            task.abort();
        }
    }
}

impl Drop for RoomChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl RoomTransport for RoomChannel {
    fn send_snapshot(&self, snapshot: String) -> Result<(), TransportError> {
        self.send(snapshot)
    }

    async fn close(&mut self) {
        RoomChannel::close(self).await;
    }
}

async fn channel_loop(
    ws: WsStream,
    room_id: String,
    mut outbound: mpsc::Receiver<Outbound>,
    events: mpsc::Sender<ChannelEvent>,
    open: Arc<AtomicBool>,
) {
    let (mut sink, mut stream) = ws.split();

    let reason = loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Snapshot(text)) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        break format!("send failed: {e}");
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break "closed locally".to_string();
                }
            },

            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let snapshot = text.as_str().to_owned();
                    if events.send(ChannelEvent::Snapshot(snapshot)).await.is_err() {
                        break "receiver dropped".to_string();
                    }
                }
                Some(Ok(Message::Close(_))) | None => break "closed by relay".to_string(),
                Some(Err(e)) => break format!("websocket error: {e}"),
                _ => {}
            },
        }
    };

    open.store(false, Ordering::SeqCst);
    if reason == "closed locally" {
        info!(room = %room_id, "Room channel closed");
    } else {
        warn!(room = %room_id, reason = %reason, "Room channel lost");
    }
    let _ = events.send(ChannelEvent::Closed { reason }).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_room_is_rejected_before_dialing() {
        let config = ClientConfig::default();
        let result = RoomChannel::connect(&config, "no/slashes").await;
        assert!(matches!(result, Err(ConnectionError::InvalidRoom(_))));
    }

    #[tokio::test]
    async fn non_http_server_url_is_rejected() {
        let config = ClientConfig {
            server_url: "ftp://relay".into(),
            ..Default::default()
        };
        let result = RoomChannel::connect(&config, "abcd1234").await;
        assert!(matches!(result, Err(ConnectionError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn refused_connection_is_handshake_error() {
        let result = RoomChannel::connect_url(
            "ws://127.0.0.1:9/ws/r1",
            "r1".into(),
            Duration::from_secs(2),
        )
        .await;
        assert!(matches!(
            result,
            Err(ConnectionError::Handshake(_)) | Err(ConnectionError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn close_returns_while_events_are_unread() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            for i in 0..INBOUND_QUEUE * 2 {
                if ws.send(Message::Text(i.to_string().into())).await.is_err() {
                    return;
                }
            }
            std::future::pending::<()>().await;
        });

        let (mut channel, _events) = RoomChannel::connect_url(
            &format!("ws://{addr}/ws/r1"),
            "r1".into(),
            Duration::from_secs(2),
        )
        .await
        .unwrap();

        // Nobody reads `_events`, so the socket task stalls and the
        // outbound queue backs up behind it.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let mut backed_up = false;
        for _ in 0..OUTBOUND_QUEUE * 2 {
            if channel.send("x".into()) == Err(TransportError::QueueFull) {
                backed_up = true;
                break;
            }
        }
        assert!(backed_up);

        let closed = tokio::time::timeout(CLOSE_GRACE * 3, channel.close()).await;
        assert!(closed.is_ok());
        assert!(!channel.is_open());
    }
}
