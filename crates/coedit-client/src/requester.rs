//! Debounced, fire-and-forget completion calls.
//!
//! Calls are never cancelled once issued. Each one reports back through the
//! outcome channel with the generation it was issued for, and the session
//! decides whether the result still matters.

use std::sync::Arc;
use std::time::Duration;

use coedit_common::CompletionError;
use tokio::sync::mpsc;
use tracing::debug;

use crate::completion::CompletionService;
use crate::debounce::Debounce;
use crate::session::SuggestionTicket;

/// Result of one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub generation: u64,
    pub result: Result<Option<String>, CompletionError>,
}

pub struct SuggestionRequester {
    debounce: Debounce,
    service: Arc<dyn CompletionService>,
    timeout: Duration,
    outcomes: mpsc::Sender<CompletionOutcome>,
    issued: u64,
}

impl SuggestionRequester {
    pub fn new(
        service: Arc<dyn CompletionService>,
        debounce: Duration,
        timeout: Duration,
    ) -> (Self, mpsc::Receiver<CompletionOutcome>) {
        let (tx, rx) = mpsc::channel(16);
        let requester = Self {
            debounce: Debounce::new(debounce),
            service,
            timeout,
            outcomes: tx,
            issued: 0,
        };
        (requester, rx)
    }

    /// Restart the quiet period.
    pub fn schedule(&mut self) {
        self.debounce.arm();
    }

    /// Drop the pending quiet period, if any. Calls already issued still
    /// report back.
    pub fn cancel(&mut self) {
        self.debounce.cancel();
    }

    pub fn is_scheduled(&self) -> bool {
        self.debounce.is_armed()
    }

    /// Resolves when the quiet period elapses.
    pub async fn quiet_period(&mut self) {
        self.debounce.fired().await;
    }

    /// Start the call described by `ticket` in the background.
    pub fn issue(&mut self, ticket: SuggestionTicket) {
        self.issued += 1;
        let service = Arc::clone(&self.service);
        let outcomes = self.outcomes.clone();
        let timeout = self.timeout;

        debug!(
            generation = ticket.generation,
            issued = self.issued,
            "Issuing completion request"
        );
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, service.complete(&ticket.request)).await
            {
                Ok(result) => result,
                Err(_) => Err(CompletionError::Timeout),
            };
            let _ = outcomes
                .send(CompletionOutcome {
                    generation: ticket.generation,
                    result,
                })
                .await;
        });
    }
}
