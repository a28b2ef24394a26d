//! Room store: maps room ids to a per-room dispatcher task.
//!
//! Each room owns one command queue drained by one task, so snapshots from
//! different senders in the same room are fanned out one whole message at a
//! time and in queue order. Nothing is persisted; the dispatcher keeps only
//! the last relayed snapshot in memory for late joiners.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use coedit_common::ParticipantId;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::outbox::{OutboxSender, Push};

/// Capacity of each room's command queue.
const ROOM_QUEUE: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("Room ID already exists")]
    AlreadyExists(String),

    #[error("room {0} is closed")]
    Closed(String),
}

/// Commands processed by a room's dispatcher, strictly in arrival order.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        participant: ParticipantId,
        outbound: OutboxSender,
        ack: oneshot::Sender<Option<String>>,
    },
    Leave {
        participant: ParticipantId,
    },
    Publish {
        from: ParticipantId,
        snapshot: String,
    },
}

/// Cheap handle for publishing into one room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: String,
    commands: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Queue `snapshot` for fan-out to every other member. Returns false if
    /// the dispatcher is gone.
    pub async fn publish(&self, from: &ParticipantId, snapshot: String) -> bool {
        self.commands
            .send(RoomCommand::Publish {
                from: from.clone(),
                snapshot,
            })
            .await
            .is_ok()
    }
}

/// Result of joining a room.
#[derive(Debug)]
pub struct Joined {
    pub room: RoomHandle,
    /// Last snapshot relayed in this room, if replay is enabled.
    pub latest: Option<String>,
}

/// Room retention and replay policy.
#[derive(Debug, Clone, Copy)]
pub struct RoomPolicy {
    /// How long an empty room survives. Zero removes it on last leave.
    pub empty_ttl: Duration,
    pub replay_on_join: bool,
}

impl Default for RoomPolicy {
    fn default() -> Self {
        Self {
            empty_ttl: Duration::from_secs(300),
            replay_on_join: true,
        }
    }
}

struct RoomEntry {
    handle: RoomHandle,
    members: HashSet<ParticipantId>,
    /// When the room last became empty (or was created empty).
    vacated_at: Option<Instant>,
}

impl RoomEntry {
    fn open(room_id: &str, replay_on_join: bool) -> Self {
        let (tx, rx) = mpsc::channel(ROOM_QUEUE);
        tokio::spawn(dispatch_loop(room_id.to_string(), rx, replay_on_join));
        Self {
            handle: RoomHandle {
                room_id: room_id.to_string(),
                commands: tx,
            },
            members: HashSet::new(),
            vacated_at: Some(Instant::now()),
        }
    }
}

/// Thread-safe room store.
#[derive(Clone)]
pub struct RoomStore {
    rooms: Arc<RwLock<HashMap<String, RoomEntry>>>,
    policy: RoomPolicy,
}

impl RoomStore {
    pub fn new(policy: RoomPolicy) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            policy,
        }
    }

    /// Register a new, empty room. Fails if the id is already in use.
    pub async fn create(&self, room_id: &str) -> Result<(), RoomError> {
        let mut map = self.rooms.write().await;
        if map.contains_key(room_id) {
            return Err(RoomError::AlreadyExists(room_id.to_string()));
        }
        map.insert(
            room_id.to_string(),
            RoomEntry::open(room_id, self.policy.replay_on_join),
        );
        info!(room = %room_id, "Room created");
        Ok(())
    }

    /// Add a participant, opening the room if it does not exist yet.
    pub async fn join(
        &self,
        room_id: &str,
        participant: ParticipantId,
        outbound: OutboxSender,
    ) -> Result<Joined, RoomError> {
        let handle = {
            let mut map = self.rooms.write().await;
            let entry = map.entry(room_id.to_string()).or_insert_with(|| {
                info!(room = %room_id, "Opening room on first join");
                RoomEntry::open(room_id, self.policy.replay_on_join)
            });
            entry.members.insert(participant.clone());
            entry.vacated_at = None;
            entry.handle.clone()
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        handle
            .commands
            .send(RoomCommand::Join {
                participant,
                outbound,
                ack: ack_tx,
            })
            .await
            .map_err(|_| RoomError::Closed(room_id.to_string()))?;
        let latest = ack_rx
            .await
            .map_err(|_| RoomError::Closed(room_id.to_string()))?;

        Ok(Joined {
            room: handle,
            latest,
        })
    }

    /// Remove a participant. Calling it twice for the same participant is a no-op.
    pub async fn leave(&self, room_id: &str, participant: &ParticipantId) {
        let handle = {
            let mut map = self.rooms.write().await;
            let Some(entry) = map.get_mut(room_id) else {
                return;
            };
            if !entry.members.remove(participant) {
                return;
            }
            let handle = entry.handle.clone();
            if entry.members.is_empty() {
                if self.policy.empty_ttl.is_zero() {
                    map.remove(room_id);
                    info!(room = %room_id, "Room closed (last participant left)");
                } else {
                    entry.vacated_at = Some(Instant::now());
                    info!(room = %room_id, "Room is now empty");
                }
            }
            handle
        };

        let _ = handle
            .commands
            .send(RoomCommand::Leave {
                participant: participant.clone(),
            })
            .await;
    }

    /// Drop rooms that have been empty for longer than the policy TTL.
    /// Returns the number of rooms removed.
    pub async fn reap_stale(&self) -> usize {
        let ttl = self.policy.empty_ttl;
        let mut map = self.rooms.write().await;
        let before = map.len();
        let now = Instant::now();
        map.retain(|id, entry| {
            let stale = entry.members.is_empty()
                && entry
                    .vacated_at
                    .is_some_and(|at| now.duration_since(at) >= ttl);
            if stale {
                info!(room = %id, "Reaping empty room");
            }
            !stale
        });
        before - map.len()
    }

    /// Check if a room exists.
    pub async fn exists(&self, room_id: &str) -> bool {
        self.rooms.read().await.contains_key(room_id)
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Number of participants currently in `room_id`.
    pub async fn participant_count(&self, room_id: &str) -> usize {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map_or(0, |entry| entry.members.len())
    }
}

/// Per-room dispatcher. Exits once every handle to the room is dropped.
async fn dispatch_loop(
    room_id: String,
    mut commands: mpsc::Receiver<RoomCommand>,
    replay_on_join: bool,
) {
    let mut members: HashMap<ParticipantId, OutboxSender> = HashMap::new();
    let mut latest: Option<String> = None;

    while let Some(command) = commands.recv().await {
        match command {
            RoomCommand::Join {
                participant,
                outbound,
                ack,
            } => {
                members.insert(participant, outbound);
                let replay = if replay_on_join { latest.clone() } else { None };
                let _ = ack.send(replay);
            }
            RoomCommand::Leave { participant } => {
                members.remove(&participant);
            }
            RoomCommand::Publish { from, snapshot } => {
                members.retain(|id, outbox| {
                    if *id == from {
                        return true;
                    }
                    match outbox.push(snapshot.clone()) {
                        Push::Queued => true,
                        Push::Coalesced => {
                            debug!(room = %room_id, participant = %id, "Outbound queue full, pending snapshot replaced");
                            true
                        }
                        Push::Closed => {
                            debug!(room = %room_id, participant = %id, "Participant channel closed");
                            false
                        }
                    }
                });
                latest = Some(snapshot);
            }
        }
    }

    debug!(room = %room_id, "Room dispatcher stopped");
}
