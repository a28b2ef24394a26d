//! Full configuration validation.
//!
//! Validates numeric ranges, the bind address and the server URL scheme.
//! Each binary checks only the section it runs on; [`validate`] checks all.

use std::net::SocketAddr;

use crate::schema::{ClientConfig, CoeditConfig, RelayConfig};
use coedit_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &CoeditConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    relay_errors(&config.relay, &mut errors);
    client_errors(&config.client, &mut errors);
    into_result(errors)
}

/// Validate only `[relay]`.
pub fn validate_relay(relay: &RelayConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();
    relay_errors(relay, &mut errors);
    into_result(errors)
}

/// Validate only `[client]`.
pub fn validate_client(client: &ClientConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();
    client_errors(client, &mut errors);
    into_result(errors)
}

fn into_result(errors: Vec<String>) -> Result<(), ConfigError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn relay_errors(relay: &RelayConfig, errors: &mut Vec<String>) {
    if !is_bind_address(&relay.bind) {
        errors.push(format!(
            "relay.bind = {:?} is not a host:port address",
            relay.bind
        ));
    }
    validate_range(errors, "relay.reap_interval_secs", relay.reap_interval_secs, 1, 3_600);
    validate_range(
        errors,
        "relay.outbound_queue",
        relay.outbound_queue as u64,
        1,
        65_536,
    );
    validate_range(
        errors,
        "relay.completion.max_tokens",
        u64::from(relay.completion.max_tokens),
        1,
        4_096,
    );
    validate_range(
        errors,
        "relay.completion.timeout_ms",
        relay.completion.timeout_ms,
        100,
        300_000,
    );
}

fn client_errors(client: &ClientConfig, errors: &mut Vec<String>) {
    if client.ws_url("room").is_none() {
        errors.push(format!(
            "client.server_url = {:?} must start with http:// or https://",
            client.server_url
        ));
    }
    validate_range(errors, "client.debounce_ms", client.debounce_ms, 1, 60_000);
    validate_range(
        errors,
        "client.completion_timeout_ms",
        client.completion_timeout_ms,
        100,
        300_000,
    );
    validate_range(
        errors,
        "client.connect_timeout_ms",
        client.connect_timeout_ms,
        100,
        300_000,
    );
}

/// A literal socket address, or `host:port` with a name the listener
/// resolves at bind time.
fn is_bind_address(bind: &str) -> bool {
    if bind.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match bind.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !host.contains(char::is_whitespace) && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

fn validate_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}
