use serde::{Deserialize, Serialize};

/// Participant-side settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base HTTP URL of the relay (`http://` or `https://`).
    pub server_url: String,
    /// Quiet period before a suggestion is requested, in milliseconds.
    pub debounce_ms: u64,
    /// Completion request timeout in milliseconds.
    pub completion_timeout_ms: u64,
    /// WebSocket connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".into(),
            debounce_ms: 600,
            completion_timeout_ms: 5_000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl ClientConfig {
    fn base(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    /// `POST` target for room creation.
    pub fn rooms_url(&self) -> String {
        format!("{}/rooms", self.base())
    }

    /// `POST` target for completion requests.
    pub fn autocomplete_url(&self) -> String {
        format!("{}/autocomplete", self.base())
    }

    /// WebSocket URL for `room_id`, or `None` when `server_url` is not http(s).
    pub fn ws_url(&self, room_id: &str) -> Option<String> {
        let base = self.base();
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return None;
        };
        Some(format!("{ws_base}/ws/{room_id}"))
    }
}
