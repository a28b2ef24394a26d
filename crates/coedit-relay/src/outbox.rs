//! Per-participant delivery queue.
//!
//! Bounded like an mpsc channel, but a push into a full queue replaces the
//! newest queued snapshot instead of failing. Snapshots are whole documents,
//! so the reader always ends on the last one published while the dispatcher
//! never waits on a slow socket.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Outcome of [`OutboxSender::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    Queued,
    /// The queue was full; the newest pending snapshot was replaced.
    Coalesced,
    /// The receiving connection is gone.
    Closed,
}

struct State {
    queue: VecDeque<String>,
    capacity: usize,
    sender_alive: bool,
    receiver_alive: bool,
}

struct Shared {
    state: Mutex<State>,
    notify: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create an outbox holding at most `capacity` snapshots (minimum one).
pub fn channel(capacity: usize) -> (OutboxSender, OutboxReceiver) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            queue: VecDeque::new(),
            capacity: capacity.max(1),
            sender_alive: true,
            receiver_alive: true,
        }),
        notify: Notify::new(),
    });
    (
        OutboxSender {
            shared: Arc::clone(&shared),
        },
        OutboxReceiver { shared },
    )
}

/// Dispatcher side.
pub struct OutboxSender {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for OutboxSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboxSender").finish_non_exhaustive()
    }
}

impl OutboxSender {
    /// Queue `snapshot` without waiting.
    pub fn push(&self, snapshot: String) -> Push {
        let outcome = {
            let mut state = self.shared.lock();
            if !state.receiver_alive {
                return Push::Closed;
            }
            let outcome = if state.queue.len() >= state.capacity {
                state.queue.pop_back();
                Push::Coalesced
            } else {
                Push::Queued
            };
            state.queue.push_back(snapshot);
            outcome
        };
        self.shared.notify.notify_one();
        outcome
    }
}

impl Drop for OutboxSender {
    fn drop(&mut self) {
        self.shared.lock().sender_alive = false;
        self.shared.notify.notify_one();
    }
}

/// Connection side.
pub struct OutboxReceiver {
    shared: Arc<Shared>,
}

impl OutboxReceiver {
    /// Next snapshot in publish order, or `None` once the sender is dropped
    /// and the queue is drained. Cancel safe.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            {
                let mut state = self.shared.lock();
                if let Some(snapshot) = state.queue.pop_front() {
                    return Some(snapshot);
                }
                if !state.sender_alive {
                    return None;
                }
            }
            // notify_one stores a permit, so a push between the check and
            // this await still wakes us.
            self.shared.notify.notified().await;
        }
    }
}

impl Drop for OutboxReceiver {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.receiver_alive = false;
        state.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn delivers_in_push_order() {
        let (tx, mut rx) = channel(4);
        assert_eq!(tx.push("a".into()), Push::Queued);
        assert_eq!(tx.push("ab".into()), Push::Queued);
        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await.as_deref(), Some("ab"));
    }

    #[tokio::test]
    async fn full_queue_keeps_newest_snapshot() {
        let (tx, mut rx) = channel(2);
        tx.push("a".into());
        tx.push("ab".into());
        assert_eq!(tx.push("abc".into()), Push::Coalesced);
        assert_eq!(tx.push("abcd".into()), Push::Coalesced);

        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await.as_deref(), Some("abcd"));
    }

    #[tokio::test]
    async fn recv_wakes_on_later_push() {
        let (tx, mut rx) = channel(1);
        let reader = tokio::spawn(async move { rx.recv().await });
        tokio::task::yield_now().await;
        tx.push("late".into());
        let got = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn dropped_sender_ends_after_drain() {
        let (tx, mut rx) = channel(4);
        tx.push("last".into());
        drop(tx);
        assert_eq!(rx.recv().await.as_deref(), Some("last"));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn dropped_receiver_reports_closed() {
        let (tx, rx) = channel(4);
        drop(rx);
        assert_eq!(tx.push("x".into()), Push::Closed);
    }
}
