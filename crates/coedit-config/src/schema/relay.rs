use serde::{Deserialize, Serialize};

/// Relay server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Socket address the HTTP/WebSocket listener binds to.
    pub bind: String,
    /// Seconds an empty room is kept before the reaper drops it.
    /// `0` drops a room as soon as its last participant leaves.
    pub room_ttl_secs: u64,
    /// Seconds between reaper sweeps.
    pub reap_interval_secs: u64,
    /// Per-participant outbound queue capacity (snapshots).
    pub outbound_queue: usize,
    /// Send the last relayed snapshot to participants when they join.
    pub replay_on_join: bool,
    pub completion: CompletionConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".into(),
            room_ttl_secs: 300,
            reap_interval_secs: 60,
            outbound_queue: 256,
            replay_on_join: true,
            completion: CompletionConfig::default(),
        }
    }
}

/// Which engine answers `POST /autocomplete`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompletionProvider {
    /// Canned snippets, no network.
    #[default]
    Mock,
    /// Anthropic Messages API; key from `ANTHROPIC_API_KEY`.
    Claude,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub provider: CompletionProvider,
    pub model: String,
    pub max_tokens: u32,
    /// Upstream request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: CompletionProvider::Mock,
            model: "claude-sonnet-4-20250514".into(),
            max_tokens: 256,
            timeout_ms: 20_000,
        }
    }
}
