use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "service": "drip-scheduler",
        "send_window_open": state.scheduler.send_window_open(chrono::Utc::now()),
    });
    (StatusCode::OK, Json(body))
}
