//! HTTP surface: room creation, completion, liveness and the WebSocket
//! upgrade for `/ws/{room_id}`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use coedit_common::{
    new_room_id, CompletionRequest, CompletionResponse, CreateRoomRequest, CreateRoomResponse,
    ErrorBody,
};
use tracing::{info, warn};

use crate::completion::CompletionEngine;
use crate::connection::handle_connection;
use crate::rooms::{RoomError, RoomStore};

/// Longest accepted custom room id.
const MAX_ROOM_ID_LEN: usize = 64;

/// Attempts at minting a fresh id before giving up.
const MINT_ATTEMPTS: usize = 4;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomStore,
    pub completion: Arc<dyn CompletionEngine>,
    /// Per-participant outbound queue capacity.
    pub outbound_queue: usize,
}

/// Errors returned to HTTP callers as `{ "detail": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("completion failed: {0}")]
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<RoomError> for ApiError {
    fn from(e: RoomError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/rooms", post(create_room))
        .route("/autocomplete", post(autocomplete))
        .route("/ws/:room_id", get(ws_upgrade))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "coedit relay running" }))
}

/// `POST /rooms`. The body is optional; `{}` and an empty body both mint an id.
async fn create_room(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CreateRoomResponse>, ApiError> {
    let request: CreateRoomRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateRoomRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid body: {e}")))?
    };

    let room_id = match request.custom_id.as_deref().map(str::trim) {
        Some(custom) if !custom.is_empty() => {
            validate_custom_id(custom)?;
            state.rooms.create(custom).await.inspect_err(|_| {
                warn!(room = %custom, "Room creation failed, id already exists");
            })?;
            custom.to_string()
        }
        _ => mint_room(&state.rooms).await?,
    };

    info!(room = %room_id, "Room created via API");
    Ok(Json(CreateRoomResponse { room_id }))
}

async fn mint_room(rooms: &RoomStore) -> Result<String, ApiError> {
    for _ in 0..MINT_ATTEMPTS {
        let id = new_room_id();
        match rooms.create(&id).await {
            Ok(()) => return Ok(id),
            Err(RoomError::AlreadyExists(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(ApiError::BadRequest("could not mint a unique room id".into()))
}

fn validate_custom_id(id: &str) -> Result<(), ApiError> {
    let valid = id.len() <= MAX_ROOM_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "room id must be 1-{MAX_ROOM_ID_LEN} characters of [A-Za-z0-9_-]"
        )))
    }
}

/// `POST /autocomplete`.
async fn autocomplete(
    State(state): State<AppState>,
    Json(request): Json<CompletionRequest>,
) -> Result<Json<CompletionResponse>, ApiError> {
    info!(
        context_len = request.context.len(),
        cursor = request.cursor_position,
        "Autocomplete requested"
    );
    match state.completion.complete(&request).await {
        Ok(suggestion) => Ok(Json(CompletionResponse { suggestion })),
        Err(e) => {
            warn!(error = %e, "Completion engine failed");
            Err(ApiError::Upstream(e.to_string()))
        }
    }
}

/// `GET /ws/{room_id}`. Any id is accepted; unknown rooms are opened empty.
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    info!(peer = %addr, room = %room_id, "WebSocket connection attempt");
    ws.on_upgrade(move |socket| {
        handle_connection(socket, addr, room_id, state.rooms, state.outbound_queue)
    })
}

/// Log method, path, status and duration of every request.
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "HTTP request"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_id_validation() {
        assert!(validate_custom_id("abcd1234").is_ok());
        assert!(validate_custom_id("team_room-2").is_ok());
        assert!(validate_custom_id("has space").is_err());
        assert!(validate_custom_id("slash/room").is_err());
        assert!(validate_custom_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn api_error_status_codes() {
        let resp = ApiError::BadRequest("nope".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError::Upstream("timed out".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn duplicate_room_maps_to_bad_request() {
        let err: ApiError = RoomError::AlreadyExists("abcd1234".into()).into();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Room ID already exists"));
    }
}
