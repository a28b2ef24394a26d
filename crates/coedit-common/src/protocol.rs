//! JSON bodies exchanged over the HTTP routes. Snapshots on the WebSocket
//! are raw text frames and have no type here.

use serde::{Deserialize, Serialize};

/// Body of `POST /rooms`. The whole body is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
}

/// Body of `POST /autocomplete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub context: String,
    #[serde(alias = "cursorPosition")]
    pub cursor_position: usize,
}

impl CompletionRequest {
    /// Request a continuation at the end of `context`.
    pub fn at_end(context: impl Into<String>) -> Self {
        let context = context.into();
        let cursor_position = cursor_at_end(&context);
        Self {
            context,
            cursor_position,
        }
    }

    /// The text before the cursor. Positions past the end clamp to it.
    pub fn prefix(&self) -> &str {
        match self.context.char_indices().nth(self.cursor_position) {
            Some((byte, _)) => &self.context[..byte],
            None => &self.context,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl CompletionResponse {
    /// The suggestion, with an empty string treated as absent.
    pub fn into_suggestion(self) -> Option<String> {
        self.suggestion.filter(|s| !s.is_empty())
    }
}

/// Error body for non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Cursor offset at the end of `text`, counted in chars.
pub fn cursor_at_end(text: &str) -> usize {
    text.chars().count()
}
