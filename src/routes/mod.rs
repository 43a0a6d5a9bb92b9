pub mod drip;
pub mod health;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/drip/campaigns", post(drip::create_campaign))
        .route("/api/drip/status/:user_id", get(drip::campaign_status))
        .with_state(state)
}
