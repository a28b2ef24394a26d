//! The participant event loop.
//!
//! One task per joined room owns the [`DocumentSession`], the outbound
//! transport and the suggestion requester. Local input, relayed snapshots,
//! debounce expiry and completion outcomes are all serialized through a
//! single `select!` loop, and the resulting state is published on a watch
//! channel for whatever renders it.

use std::sync::Arc;
use std::time::Duration;

use coedit_common::{CoeditError, TransportError};
use coedit_config::ClientConfig;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::{ChannelEvent, RoomChannel, RoomTransport};
use crate::completion::{CompletionService, HttpCompletionService};
use crate::debounce::Debounce;
use crate::requester::{CompletionOutcome, SuggestionRequester};
use crate::session::{DocumentSession, Phase};

/// How long a snapshot held back by a full outbound queue waits before
/// the next send attempt.
const RESEND_DELAY: Duration = Duration::from_millis(50);

/// Timing knobs for a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantSettings {
    pub debounce: Duration,
    pub completion_timeout: Duration,
}

impl Default for ParticipantSettings {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for ParticipantSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            completion_timeout: Duration::from_millis(config.completion_timeout_ms),
        }
    }
}

/// What a renderer needs to draw the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub room_id: String,
    pub document: String,
    pub suggestion: Option<String>,
    pub phase: Phase,
    /// False once the channel is gone, and while the latest local snapshot
    /// is waiting on a full outbound queue.
    pub connected: bool,
}

#[derive(Debug)]
enum Input {
    Edit(String),
    AppendLine(String),
    Apply,
    Dismiss,
    Close,
}

/// Handle to a running participant. Dropping it closes the room.
pub struct ParticipantHandle {
    inputs: mpsc::Sender<Input>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<()>,
}

impl ParticipantHandle {
    /// Replace the document with `text`. Returns `false` once closed.
    pub async fn edit(&self, text: impl Into<String>) -> bool {
        self.inputs.send(Input::Edit(text.into())).await.is_ok()
    }

    /// Append `line` to the document as its own line.
    pub async fn append_line(&self, line: impl Into<String>) -> bool {
        self.inputs.send(Input::AppendLine(line.into())).await.is_ok()
    }

    /// Accept the displayed suggestion.
    pub async fn apply(&self) -> bool {
        self.inputs.send(Input::Apply).await.is_ok()
    }

    /// Reject the displayed suggestion.
    pub async fn dismiss(&self) -> bool {
        self.inputs.send(Input::Dismiss).await.is_ok()
    }

    /// Latest published view.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Leave the room and wait for the loop to finish.
    pub async fn close(self) {
        let _ = self.inputs.send(Input::Close).await;
        let _ = self.task.await;
    }
}

/// Connect to `room_id` on the configured relay and start its event loop.
pub async fn join_room(
    config: &ClientConfig,
    room_id: &str,
) -> Result<ParticipantHandle, CoeditError> {
    let (channel, inbound) = RoomChannel::connect(config, room_id).await?;
    let service = HttpCompletionService::from_config(config)?;
    let room_id = channel.room_id().to_string();
    Ok(spawn_participant(
        room_id,
        channel,
        inbound,
        Arc::new(service),
        ParticipantSettings::from(config),
    ))
}

/// Start the event loop for an already-connected room.
pub fn spawn_participant<T>(
    room_id: impl Into<String>,
    transport: T,
    inbound: mpsc::Receiver<ChannelEvent>,
    service: Arc<dyn CompletionService>,
    settings: ParticipantSettings,
) -> ParticipantHandle
where
    T: RoomTransport + 'static,
{
    let room_id = room_id.into();
    let (input_tx, input_rx) = mpsc::channel(64);
    let (requester, outcomes) =
        SuggestionRequester::new(service, settings.debounce, settings.completion_timeout);

    let session = DocumentSession::new();
    let (view_tx, view_rx) = watch::channel(SessionView {
        room_id: room_id.clone(),
        document: String::new(),
        suggestion: None,
        phase: Phase::Idle,
        connected: true,
    });

    let participant = Participant {
        room_id,
        session,
        transport,
        inbound,
        inbound_open: true,
        unsent: None,
        resend: Debounce::new(RESEND_DELAY),
        inputs: input_rx,
        requester,
        outcomes,
        view: view_tx,
    };
    let task = tokio::spawn(participant.run());

    ParticipantHandle {
        inputs: input_tx,
        view: view_rx,
        task,
    }
}

struct Participant<T> {
    room_id: String,
    session: DocumentSession,
    transport: T,
    inbound: mpsc::Receiver<ChannelEvent>,
    inbound_open: bool,
    /// Latest local snapshot the transport refused with `QueueFull`.
    unsent: Option<String>,
    resend: Debounce,
    inputs: mpsc::Receiver<Input>,
    requester: SuggestionRequester,
    outcomes: mpsc::Receiver<CompletionOutcome>,
    view: watch::Sender<SessionView>,
}

impl<T: RoomTransport> Participant<T> {
    async fn run(mut self) {
        info!(room = %self.room_id, "Participant started");

        loop {
            tokio::select! {
                input = self.inputs.recv() => match input {
                    Some(Input::Edit(text)) => self.local_edit(text),
                    Some(Input::AppendLine(line)) => {
                        let text = match self.session.document() {
                            "" => line,
                            document => format!("{document}\n{line}"),
                        };
                        self.local_edit(text);
                    }
                    Some(Input::Apply) => {
                        if let Some(snapshot) = self.session.apply() {
                            self.broadcast(snapshot);
                            self.requester.schedule();
                        }
                    }
                    Some(Input::Dismiss) => {
                        self.session.dismiss();
                    }
                    Some(Input::Close) | None => break,
                },

                event = self.inbound.recv(), if self.inbound_open => match event {
                    Some(ChannelEvent::Snapshot(text)) => {
                        self.session.remote_snapshot(text);
                        // The adopted document supersedes a held local one.
                        if self.unsent.take().is_some() {
                            self.resend.cancel();
                        }
                        if self.requester.is_scheduled() {
                            debug!(room = %self.room_id, "Remote snapshot cancels pending suggestion");
                            self.requester.cancel();
                        }
                    }
                    Some(ChannelEvent::Closed { reason }) => {
                        warn!(room = %self.room_id, reason = %reason, "Disconnected from room");
                        self.inbound_open = false;
                    }
                    None => self.inbound_open = false,
                },

                () = self.resend.fired() => {
                    if let Some(snapshot) = self.unsent.clone() {
                        self.broadcast(snapshot);
                    }
                }

                () = self.requester.quiet_period() => {
                    if let Some(ticket) = self.session.begin_request() {
                        self.requester.issue(ticket);
                    }
                }

                Some(outcome) = self.outcomes.recv() => {
                    let resolution = self.session.resolve(outcome.generation, outcome.result);
                    debug!(generation = outcome.generation, ?resolution, "Completion resolved");
                }
            }

            self.publish();
        }

        self.transport.close().await;
        self.inbound_open = false;
        self.publish();
        info!(room = %self.room_id, "Participant stopped");
    }

    fn local_edit(&mut self, text: String) {
        let snapshot = self.session.local_edit(text);
        self.broadcast(snapshot);
        self.requester.schedule();
    }

    /// Send `snapshot`, superseding any snapshot still held back.
    fn broadcast(&mut self, snapshot: String) {
        match self.transport.send_snapshot(snapshot.clone()) {
            Ok(()) => {
                if self.unsent.take().is_some() {
                    self.resend.cancel();
                }
            }
            Err(TransportError::Closed) => {
                debug!(room = %self.room_id, "Snapshot not sent, channel closed");
                self.inbound_open = false;
                self.unsent = None;
                self.resend.cancel();
            }
            Err(TransportError::QueueFull) => {
                if self.unsent.replace(snapshot).is_none() {
                    warn!(room = %self.room_id, "Outbound queue full, holding latest snapshot");
                }
                self.resend.arm();
            }
        }
    }

    fn publish(&self) {
        let next = SessionView {
            room_id: self.room_id.clone(),
            document: self.session.document().to_string(),
            suggestion: self.session.suggestion().map(str::to_string),
            phase: self.session.phase(),
            connected: self.inbound_open && self.unsent.is_none(),
        };
        self.view.send_if_modified(|view| {
            if *view == next {
                false
            } else {
                *view = next;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests;
