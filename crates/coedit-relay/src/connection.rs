//! Per-connection handler: join the room, then forward snapshots both ways.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket};
use coedit_common::ParticipantId;
use futures_util::{SinkExt, StreamExt};

use crate::outbox;
use crate::rooms::RoomStore;

/// Handle a single WebSocket connection bound to `room_id`.
///
/// Every text frame from the client is a full document snapshot and is
/// relayed verbatim to the other participants of the room.
pub async fn handle_connection(
    socket: WebSocket,
    addr: SocketAddr,
    room_id: String,
    store: RoomStore,
    queue: usize,
) {
    let (mut sink, mut stream) = socket.split();
    let participant = ParticipantId::new();

    // 1. Create our receive channel and join.
    let (tx, mut rx) = outbox::channel(queue);
    let joined = match store.join(&room_id, participant.clone(), tx).await {
        Ok(joined) => joined,
        Err(e) => {
            tracing::warn!(peer = %addr, room = %room_id, error = %e, "Join failed");
            store.leave(&room_id, &participant).await;
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };

    let participants = store.participant_count(&room_id).await;
    tracing::info!(
        peer = %addr,
        room = %room_id,
        participant = %participant,
        participants,
        "Participant joined"
    );

    // 2. Catch the newcomer up with the room's last snapshot.
    if let Some(snapshot) = joined.latest {
        if sink.send(Message::Text(snapshot)).await.is_err() {
            store.leave(&room_id, &participant).await;
            return;
        }
    }

    // 3. Forwarding loop.
    loop {
        tokio::select! {
            // Snapshots from other participants → this client's WebSocket
            Some(snapshot) = rx.recv() => {
                if sink.send(Message::Text(snapshot)).await.is_err() {
                    break;
                }
            }

            // Snapshots from this client → room dispatcher
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if !joined.room.publish(&participant, text).await {
                            tracing::debug!(room = %room_id, "Room dispatcher gone");
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!(peer = %addr, "Ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // 4. Cleanup.
    store.leave(&room_id, &participant).await;
    tracing::info!(
        peer = %addr,
        room = %room_id,
        participant = %participant,
        "Participant disconnected"
    );
}
