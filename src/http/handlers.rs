use super::state::AppState;
use crate::session::{LeaveStatus, SessionError, SessionSnapshot};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub channel_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinResponse {
    pub channel_id: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub status: LeaveStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn status_for(error: &SessionError) -> StatusCode {
    match error {
        SessionError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        SessionError::AlreadyActive(_) | SessionError::NotJoined => StatusCode::CONFLICT,
        SessionError::EngineRejected { .. } | SessionError::EngineUnavailable(_) => {
            StatusCode::BAD_GATEWAY
        }
        SessionError::ControllerDisposed => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(error: SessionError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        error!("Session command failed: {}", error);
    }

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /channel/join
pub async fn join_channel(
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> Response {
    info!("Join requested for channel: {}", req.channel_id);

    match state.controller.request_join(req.channel_id.clone()).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(JoinResponse {
                channel_id: req.channel_id,
                status: "joining".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /channel/leave
pub async fn leave_channel(State(state): State<AppState>) -> Response {
    match state.controller.request_leave().await {
        Ok(status) => (StatusCode::ACCEPTED, Json(LeaveResponse { status })).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /channel/mute
/// Returns the new mute intent
pub async fn toggle_mute(State(state): State<AppState>) -> Response {
    match state.controller.toggle_mute().await {
        Ok(enabled) => (StatusCode::OK, Json(ToggleResponse { enabled })).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /channel/speaker
/// Returns the new loudspeaker routing intent
pub async fn toggle_speaker(State(state): State<AppState>) -> Response {
    match state.controller.toggle_speaker().await {
        Ok(enabled) => (StatusCode::OK, Json(ToggleResponse { enabled })).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /channel
pub async fn get_channel(State(state): State<AppState>) -> Response {
    match state.controller.snapshot().await {
        Ok(snapshot) => (StatusCode::OK, Json::<SessionSnapshot>(snapshot)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
