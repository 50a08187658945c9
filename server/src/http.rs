//! HTTP surface: room creation, the public room list, join/leave, and the
//! websocket upgrade. Requests authenticate with the same opaque token the
//! websocket session uses.

use crate::auth::Authenticator;
use crate::registry::RoomRegistry;
use crate::room::JoinError;
use crate::ws::ws_handler;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use shared::RoomSummary;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub auth: Arc<dyn Authenticator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/rooms", post(create_room).get(list_rooms))
        .route("/rooms/:id/join", post(join_room))
        .route("/rooms/:id/leave", post(leave_room))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

#[derive(Deserialize)]
struct CreateRoomRequest {
    token: String,
    name: String,
    password: Option<String>,
    win_threshold: Option<u32>,
}

#[derive(Serialize)]
struct CreateRoomResponse {
    room_id: String,
}

#[derive(Deserialize)]
struct JoinRoomRequest {
    token: String,
    password: Option<String>,
}

#[derive(Deserialize)]
struct LeaveRoomRequest {
    token: String,
}

struct ApiError {
    status: StatusCode,
    reason: &'static str,
}

impl ApiError {
    fn new(status: StatusCode, reason: &'static str) -> Self {
        ApiError { status, reason }
    }

    fn unauthorized() -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, "invalid_credential")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Body {
            error: &'static str,
        }
        (self.status, Json(Body { error: self.reason })).into_response()
    }
}

fn join_error_status(err: JoinError) -> StatusCode {
    match err {
        JoinError::NotFound => StatusCode::NOT_FOUND,
        JoinError::BadPassword => StatusCode::FORBIDDEN,
        JoinError::Finished | JoinError::AlreadyPlaying | JoinError::Full => StatusCode::CONFLICT,
    }
}

async fn create_room(
    State(state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, ApiError> {
    let identity = state
        .auth
        .authenticate(&request.token)
        .map_err(|_| ApiError::unauthorized())?;
    if request.name.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "invalid_name"));
    }
    let room_id = state
        .registry
        .create_room(
            &identity,
            request.name,
            request.password,
            request.win_threshold,
        )
        .await;
    Ok(Json(CreateRoomResponse { room_id }))
}

async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(state.registry.list_public().await)
}

async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<JoinRoomRequest>,
) -> Result<StatusCode, ApiError> {
    let identity = state
        .auth
        .authenticate(&request.token)
        .map_err(|_| ApiError::unauthorized())?;
    state
        .registry
        .join_room(&room_id, &identity, request.password.as_deref())
        .await
        .map_err(|err| ApiError::new(join_error_status(err), err.reason()))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn leave_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<LeaveRoomRequest>,
) -> Result<StatusCode, ApiError> {
    let identity = state
        .auth
        .authenticate(&request.token)
        .map_err(|_| ApiError::unauthorized())?;
    state.registry.leave_room(&room_id, &identity.id).await;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_error_status_mapping() {
        assert_eq!(join_error_status(JoinError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            join_error_status(JoinError::BadPassword),
            StatusCode::FORBIDDEN
        );
        assert_eq!(join_error_status(JoinError::Full), StatusCode::CONFLICT);
        assert_eq!(
            join_error_status(JoinError::AlreadyPlaying),
            StatusCode::CONFLICT
        );
        assert_eq!(join_error_status(JoinError::Finished), StatusCode::CONFLICT);
    }
}
