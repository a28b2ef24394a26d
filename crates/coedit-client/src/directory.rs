//! Room creation over `POST /rooms`.

use std::time::Duration;

use coedit_common::{ConnectionError, CreateRoomRequest, CreateRoomResponse, ErrorBody};
use coedit_config::ClientConfig;
use tracing::info;

#[derive(Debug, Clone)]
pub struct RoomDirectory {
    rooms_url: String,
    http: reqwest::Client,
}

impl RoomDirectory {
    pub fn new(config: &ClientConfig) -> Result<Self, ConnectionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| ConnectionError::RoomCreation(e.to_string()))?;
        Ok(Self {
            rooms_url: config.rooms_url(),
            http,
        })
    }

    /// Ask the relay for a room. With `custom_id` the relay either reserves
    /// that id or refuses because it exists; without, it mints one.
    pub async fn create_room(&self, custom_id: Option<&str>) -> Result<String, ConnectionError> {
        let body = CreateRoomRequest {
            custom_id: custom_id.map(str::to_string),
        };
        let response = self
            .http
            .post(&self.rooms_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConnectionError::RoomCreation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.detail)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            return Err(ConnectionError::RoomCreation(detail));
        }

        let created: CreateRoomResponse = response
            .json()
            .await
            .map_err(|e| ConnectionError::RoomCreation(e.to_string()))?;
        info!(room = %created.room_id, "Room created");
        Ok(created.room_id)
    }
}

/// Trim a user-supplied room id and reject ones that cannot form a URL path
/// segment.
pub fn normalize_room_id(input: &str) -> Result<String, ConnectionError> {
    let id = input.trim();
    let usable = !id.is_empty()
        && !id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#' | '%'));
    if usable {
        Ok(id.to_string())
    } else {
        Err(ConnectionError::InvalidRoom(input.to_string()))
    }
}
