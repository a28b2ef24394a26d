//! Per-room document state machine.
//!
//! The session owns the participant's view of the document and the current
//! suggestion. It performs no I/O: callers feed it events and act on what it
//! returns (a snapshot to broadcast, a completion ticket to issue).
//!
//! Relevance of in-flight completions is tracked with a generation counter.
//! Every event that changes the document bumps it, and a completion result
//! is accepted only if it carries the generation it was requested at. Two
//! edits that happen to produce identical text are still different
//! generations.

use coedit_common::{CompletionError, CompletionRequest};
use tracing::{debug, warn};

/// Where the session is in the suggestion lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionState {
    Idle,
    Pending { generation: u64 },
    Showing { generation: u64, suggestion: String },
}

/// Data-free view of [`SuggestionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    PendingSuggestion,
    ShowingSuggestion,
}

/// One completion call, tagged with the generation it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionTicket {
    pub generation: u64,
    pub request: CompletionRequest,
}

/// What happened to a completion result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Tag matched and a suggestion is now displayed.
    Shown,
    /// Tag matched but the service had nothing to offer.
    Empty,
    /// Tag matched but the call failed.
    Failed,
    /// The document moved on; the result was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct DocumentSession {
    document: String,
    generation: u64,
    state: SuggestionState,
}

impl Default for DocumentSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentSession {
    /// `Idle` with an empty document.
    pub fn new() -> Self {
        Self {
            document: String::new(),
            generation: 0,
            state: SuggestionState::Idle,
        }
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> &SuggestionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            SuggestionState::Idle => Phase::Idle,
            SuggestionState::Pending { .. } => Phase::PendingSuggestion,
            SuggestionState::Showing { .. } => Phase::ShowingSuggestion,
        }
    }

    /// The displayed suggestion, if any.
    pub fn suggestion(&self) -> Option<&str> {
        match &self.state {
            SuggestionState::Showing { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Replace the document with locally typed text. Returns the snapshot
    /// to broadcast.
    pub fn local_edit(&mut self, text: impl Into<String>) -> String {
        self.invalidate();
        self.document = text.into();
        self.document.clone()
    }

    /// Replace the document with a snapshot from another participant.
    pub fn remote_snapshot(&mut self, text: impl Into<String>) {
        self.invalidate();
        self.document = text.into();
    }

    /// Debounce elapsed: move to `PendingSuggestion` and hand back the
    /// request to issue. Returns `None` for an empty document or when the
    /// session is not `Idle`.
    pub fn begin_request(&mut self) -> Option<SuggestionTicket> {
        if self.document.is_empty() || self.state != SuggestionState::Idle {
            return None;
        }
        self.state = SuggestionState::Pending {
            generation: self.generation,
        };
        Some(SuggestionTicket {
            generation: self.generation,
            request: CompletionRequest::at_end(self.document.clone()),
        })
    }

    /// Feed back the result of the completion call tagged `generation`.
    pub fn resolve(
        &mut self,
        generation: u64,
        result: Result<Option<String>, CompletionError>,
    ) -> Resolution {
        match self.state {
            SuggestionState::Pending { generation: pending } if pending == generation => {}
            _ => {
                debug!(
                    tag = generation,
                    current = self.generation,
                    "Discarding stale suggestion"
                );
                return Resolution::Stale;
            }
        }

        match result {
            Ok(Some(suggestion)) if !suggestion.is_empty() => {
                self.state = SuggestionState::Showing {
                    generation,
                    suggestion,
                };
                Resolution::Shown
            }
            Ok(_) => {
                self.state = SuggestionState::Idle;
                Resolution::Empty
            }
            Err(e) => {
                warn!(error = %e, "Completion failed, no suggestion");
                self.state = SuggestionState::Idle;
                Resolution::Failed
            }
        }
    }

    /// Append the displayed suggestion after a line break. Returns the
    /// merged snapshot to broadcast, or `None` if nothing is displayed.
    pub fn apply(&mut self) -> Option<String> {
        let SuggestionState::Showing { suggestion, .. } = &self.state else {
            return None;
        };
        let merged = format!("{}\n{}", self.document, suggestion);
        Some(self.local_edit(merged))
    }

    /// Discard the displayed suggestion without touching the document.
    pub fn dismiss(&mut self) -> bool {
        if matches!(self.state, SuggestionState::Showing { .. }) {
            self.state = SuggestionState::Idle;
            true
        } else {
            false
        }
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.state = SuggestionState::Idle;
    }
}
