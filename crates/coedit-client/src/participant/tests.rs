use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use coedit_common::{CompletionError, CompletionRequest};
use tokio::sync::oneshot;

use super::*;

type Reply = Result<Option<String>, CompletionError>;
type Call = (CompletionRequest, oneshot::Sender<Reply>);

/// Transport that records what it was asked to send.
#[derive(Clone, Default)]
struct Recorder {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    full: Arc<AtomicBool>,
}

#[async_trait]
impl RoomTransport for Recorder {
    fn send_snapshot(&self, snapshot: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if self.full.load(Ordering::SeqCst) {
            return Err(TransportError::QueueFull);
        }
        self.sent.lock().unwrap().push(snapshot);
        Ok(())
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Completion service answered by the test body.
struct Remote {
    calls: mpsc::UnboundedSender<Call>,
}

#[async_trait]
impl CompletionService for Remote {
    async fn complete(&self, request: &CompletionRequest) -> Reply {
        let (tx, rx) = oneshot::channel();
        self.calls
            .send((request.clone(), tx))
            .map_err(|_| CompletionError::Network("test harness gone".into()))?;
        rx.await
            .unwrap_or_else(|_| Err(CompletionError::Network("reply dropped".into())))
    }
}

struct Harness {
    handle: ParticipantHandle,
    view: watch::Receiver<SessionView>,
    calls: mpsc::UnboundedReceiver<Call>,
    inbound: mpsc::Sender<ChannelEvent>,
    transport: Recorder,
}

impl Harness {
    fn new() -> Self {
        let transport = Recorder::default();
        let (inbound_tx, inbound_rx) = mpsc::channel(16);
        let (calls_tx, calls_rx) = mpsc::unbounded_channel();
        let settings = ParticipantSettings {
            debounce: Duration::from_millis(600),
            completion_timeout: Duration::from_secs(5),
        };
        let handle = spawn_participant(
            "abcd1234",
            transport.clone(),
            inbound_rx,
            Arc::new(Remote { calls: calls_tx }),
            settings,
        );
        let view = handle.subscribe();
        Self {
            handle,
            view,
            calls: calls_rx,
            inbound: inbound_tx,
            transport,
        }
    }

    async fn next_call(&mut self) -> Call {
        tokio::time::timeout(Duration::from_secs(30), self.calls.recv())
            .await
            .expect("no completion call issued")
            .expect("service dropped")
    }

    async fn wait_until(&mut self, pred: impl FnMut(&SessionView) -> bool) -> SessionView {
        let reached = tokio::time::timeout(Duration::from_secs(30), self.view.wait_for(pred))
            .await
            .expect("view never reached expected state")
            .expect("participant gone")
            .clone();
        reached
    }

    fn sent(&self) -> Vec<String> {
        self.transport.sent.lock().unwrap().clone()
    }

    async fn show(&mut self, text: &str, suggestion: &str) {
        self.handle.edit(text).await;
        let (request, reply) = self.next_call().await;
        assert_eq!(request.context, text);
        reply.send(Ok(Some(suggestion.into()))).unwrap();
        self.wait_until(|v| v.phase == Phase::ShowingSuggestion).await;
    }
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_issues_one_request() {
    let mut h = Harness::new();
    for text in ["d", "de", "def", "def f():"] {
        h.handle.edit(text).await;
        tokio::time::advance(Duration::from_millis(100)).await;
    }

    let (request, reply) = h.next_call().await;
    assert_eq!(request.context, "def f():");
    assert_eq!(request.cursor_position, 8);
    reply.send(Ok(Some("    pass".into()))).unwrap();

    let view = h.wait_until(|v| v.phase == Phase::ShowingSuggestion).await;
    assert_eq!(view.suggestion.as_deref(), Some("    pass"));
    assert_eq!(h.sent(), vec!["d", "de", "def", "def f():"]);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.calls.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn remote_snapshot_is_adopted_without_request() {
    let mut h = Harness::new();
    h.inbound
        .send(ChannelEvent::Snapshot("x = 1".into()))
        .await
        .unwrap();

    let view = h.wait_until(|v| v.document == "x = 1").await;
    assert_eq!(view.phase, Phase::Idle);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.calls.try_recv().is_err());
    assert!(h.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn response_after_further_edit_is_discarded() {
    let mut h = Harness::new();
    h.handle.edit("def f():").await;
    let (_, stale_reply) = h.next_call().await;
    h.wait_until(|v| v.phase == Phase::PendingSuggestion).await;

    h.handle.edit("def f():\n    return 1").await;
    h.wait_until(|v| v.document == "def f():\n    return 1" && v.phase == Phase::Idle)
        .await;
    stale_reply.send(Ok(Some("    pass".into()))).unwrap();

    let (request, fresh_reply) = h.next_call().await;
    assert_eq!(request.context, "def f():\n    return 1");
    let view = h.handle.view();
    assert!(view.suggestion.is_none());
    assert_eq!(view.phase, Phase::PendingSuggestion);

    fresh_reply.send(Ok(Some("\nprint(f())".into()))).unwrap();
    let view = h.wait_until(|v| v.phase == Phase::ShowingSuggestion).await;
    assert_eq!(view.suggestion.as_deref(), Some("\nprint(f())"));
}

#[tokio::test(start_paused = true)]
async fn remote_snapshot_while_pending_discards_response() {
    let mut h = Harness::new();
    h.handle.edit("x = 1").await;
    let (_, reply) = h.next_call().await;

    h.inbound
        .send(ChannelEvent::Snapshot("x = 2".into()))
        .await
        .unwrap();
    h.wait_until(|v| v.document == "x = 2").await;
    reply.send(Ok(Some("y = 3".into()))).unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    let view = h.handle.view();
    assert!(view.suggestion.is_none());
    assert_eq!(view.phase, Phase::Idle);
    assert!(h.calls.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn failed_request_returns_to_idle() {
    let mut h = Harness::new();
    h.handle.edit("def f():").await;
    let (_, reply) = h.next_call().await;
    reply
        .send(Err(CompletionError::Status {
            status: 502,
            body: "upstream".into(),
        }))
        .unwrap();

    let view = h
        .wait_until(|v| v.phase == Phase::Idle && v.document == "def f():")
        .await;
    assert!(view.suggestion.is_none());
}

#[tokio::test(start_paused = true)]
async fn apply_broadcasts_merged_document() {
    let mut h = Harness::new();
    h.show("def f():", "    pass").await;

    h.handle.apply().await;
    let view = h.wait_until(|v| v.document == "def f():\n    pass").await;
    assert_eq!(view.phase, Phase::Idle);
    assert!(view.suggestion.is_none());
    assert_eq!(h.sent().last().map(String::as_str), Some("def f():\n    pass"));

    let (request, _reply) = h.next_call().await;
    assert_eq!(request.context, "def f():\n    pass");
}

#[tokio::test(start_paused = true)]
async fn dismiss_keeps_document() {
    let mut h = Harness::new();
    h.show("def f():", "    pass").await;

    h.handle.dismiss().await;
    let view = h.wait_until(|v| v.phase == Phase::Idle).await;
    assert_eq!(view.document, "def f():");
    assert_eq!(h.sent(), vec!["def f():"]);
}

#[tokio::test(start_paused = true)]
async fn remote_snapshot_clears_suggestion() {
    let mut h = Harness::new();
    h.show("def f():", "    pass").await;

    h.inbound
        .send(ChannelEvent::Snapshot("def g():".into()))
        .await
        .unwrap();
    let view = h.wait_until(|v| v.document == "def g():").await;
    assert!(view.suggestion.is_none());
    assert_eq!(view.phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn channel_loss_marks_disconnected() {
    let mut h = Harness::new();
    h.inbound
        .send(ChannelEvent::Closed {
            reason: "closed by relay".into(),
        })
        .await
        .unwrap();
    h.wait_until(|v| !v.connected).await;

    h.handle.edit("offline").await;
    let view = h.wait_until(|v| v.document == "offline").await;
    assert!(!view.connected);
}

#[tokio::test(start_paused = true)]
async fn append_line_joins_with_newline() {
    let mut h = Harness::new();
    h.handle.append_line("def f():").await;
    h.handle.append_line("    return 1").await;

    h.wait_until(|v| v.document == "def f():\n    return 1").await;
    assert_eq!(h.sent(), vec!["def f():", "def f():\n    return 1"]);
}

#[tokio::test(start_paused = true)]
async fn close_closes_transport() {
    let h = Harness::new();
    let closed = Arc::clone(&h.transport.closed);
    h.handle.close().await;
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn full_queue_holds_latest_snapshot_until_it_drains() {
    let mut h = Harness::new();
    h.transport.full.store(true, Ordering::SeqCst);
    h.handle.edit("a").await;
    h.handle.edit("ab").await;

    let view = h.wait_until(|v| v.document == "ab").await;
    assert!(!view.connected);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(h.sent().is_empty());

    h.transport.full.store(false, Ordering::SeqCst);
    h.wait_until(|v| v.connected).await;
    assert_eq!(h.sent(), vec!["ab"]);
}

#[tokio::test(start_paused = true)]
async fn new_edit_supersedes_held_snapshot() {
    let mut h = Harness::new();
    h.transport.full.store(true, Ordering::SeqCst);
    h.handle.edit("a").await;
    h.wait_until(|v| !v.connected).await;

    h.transport.full.store(false, Ordering::SeqCst);
    h.handle.edit("abc").await;
    let view = h.wait_until(|v| v.document == "abc" && v.connected).await;
    assert_eq!(view.document, "abc");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.sent(), vec!["abc"]);
}

#[tokio::test(start_paused = true)]
async fn remote_snapshot_drops_held_local_snapshot() {
    let mut h = Harness::new();
    h.transport.full.store(true, Ordering::SeqCst);
    h.handle.edit("mine").await;
    h.wait_until(|v| !v.connected).await;

    h.inbound
        .send(ChannelEvent::Snapshot("theirs".into()))
        .await
        .unwrap();
    let view = h.wait_until(|v| v.document == "theirs").await;
    assert!(view.connected);

    h.transport.full.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(h.sent().is_empty());
}
