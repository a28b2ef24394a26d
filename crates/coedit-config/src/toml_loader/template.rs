//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# coedit configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[relay]
# bind = "0.0.0.0:8000"
# room_ttl_secs = 300        # 0 drops a room when its last participant leaves
# reap_interval_secs = 60    # 1-3600
# outbound_queue = 256       # 1-65536
# replay_on_join = true

[relay.completion]
# provider = "mock"          # "mock" or "claude" (needs ANTHROPIC_API_KEY)
# model = "claude-sonnet-4-20250514"
# max_tokens = 256           # 1-4096
# timeout_ms = 20000

[client]
# server_url = "http://localhost:8000"
# debounce_ms = 600          # 1-60000
# completion_timeout_ms = 5000
# connect_timeout_ms = 10000

[logging]
# level = "info"             # trace, debug, info, warn, error
"##
    .to_string()
}
