use crate::controller::ApiResponse;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// Diagnostic snapshot of the broadcast hub.
#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct HubStats {
    /// `idle`, `running` or `closed`
    state: String,
    /// Number of currently registered WebSocket subscribers
    clients: usize,
}

/// GET the state of the real-time broadcast hub
#[utoipa::path(
    get,
    path = "/hub/stats",
    responses(
        (status = 200, description = "Current hub state and subscriber count", body = HubStats),
    )
)]
pub async fn stats(State(app_state): State<AppState>) -> impl IntoResponse {
    let stats = HubStats {
        state: app_state.hub.state().to_string(),
        clients: app_state.hub.client_count(),
    };

    Json(ApiResponse::new(StatusCode::OK, stats))
}
