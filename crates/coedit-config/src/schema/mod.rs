//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod client;
mod logging;
mod relay;

pub use client::*;
pub use logging::*;
pub use relay::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration shared by the relay and the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoeditConfig {
    pub relay: RelayConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_all_defaults() {
        let config: CoeditConfig = toml::from_str("").unwrap();
        assert_eq!(config.relay.bind, "0.0.0.0:8000");
        assert_eq!(config.relay.room_ttl_secs, 300);
        assert_eq!(config.relay.completion.provider, CompletionProvider::Mock);
        assert_eq!(config.client.debounce_ms, 600);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: CoeditConfig = toml::from_str(
            r#"
[relay]
room_ttl_secs = 0

[relay.completion]
provider = "claude"
"#,
        )
        .unwrap();
        assert_eq!(config.relay.room_ttl_secs, 0);
        assert_eq!(config.relay.reap_interval_secs, 60);
        assert_eq!(config.relay.completion.provider, CompletionProvider::Claude);
        assert_eq!(config.relay.completion.max_tokens, 256);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = CoeditConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: CoeditConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.client.server_url, config.client.server_url);
        assert_eq!(parsed.relay.outbound_queue, config.relay.outbound_queue);
    }
}
