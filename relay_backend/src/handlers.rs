use crate::{
    AppState,
    shared_types::{
        ConfigResponse, CurrentPathResponse, DeviceConfig, PathSubmission, RootResponse,
        StatusResponse, SubmitResponse,
    },
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use tracing::debug;

// Errors surfaced to HTTP clients. Board failures are not errors; they are
// reported inside the `board_response` of a successful submission.
#[derive(Debug)]
pub enum AppError {
    InvalidPayload(JsonRejection),
    Internal(String),
}

// Converts our AppError into a `{"detail": ...}` JSON response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::InvalidPayload(rejection) => {
                debug!("Rejected request body: {}", rejection.body_text());
                (rejection.status(), rejection.body_text())
            }
            AppError::Internal(e) => {
                tracing::error!("Path processing error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("An error occurred while processing the path: {}", e),
                )
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidPayload(rejection)
    }
}

/// Liveness check.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Board control API server is running".to_string(),
    })
}

/// Handler to receive a drawing path and forward it to the board.
pub async fn submit_path(
    State(state): State<AppState>,
    payload: Result<Json<PathSubmission>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let Json(submission) = payload?;
    let outcome = state.relay.submit_path(submission.path).await;

    Ok(Json(SubmitResponse {
        success: true,
        message: "Path received and forwarded to the board".to_string(),
        points_received: outcome.points_received,
        board_response: outcome.board.to_json(),
        timestamp: Utc::now(),
    }))
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.relay.status().await;
    Json(StatusResponse {
        status: "active".to_string(),
        current_path_points: snapshot.current_path_points,
        esp32_url: snapshot.device_url,
        timestamp: Utc::now(),
    })
}

pub async fn get_current_path(State(state): State<AppState>) -> Json<CurrentPathResponse> {
    let path = state.relay.current_path().await;
    Json(CurrentPathResponse {
        points_count: path.len(),
        path,
        timestamp: Utc::now(),
    })
}

/// Handler to change the board address used by later submissions.
pub async fn update_device_config(
    State(state): State<AppState>,
    payload: Result<Json<DeviceConfig>, JsonRejection>,
) -> Result<Json<ConfigResponse>, AppError> {
    let Json(config) = payload?;
    let esp32_url = state.relay.update_device(config).await;

    Ok(Json(ConfigResponse {
        success: true,
        esp32_url,
        message: "Configuration updated".to_string(),
    }))
}

/// Turns a panic inside a handler into a 500 response instead of a dropped connection.
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let reason = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    AppError::Internal(reason).into_response()
}
