pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/booklets", post(handlers::handle_generate))
        .route("/api/v1/booklets/plan", post(handlers::handle_plan))
        .route("/api/v1/page-formats", get(handlers::handle_page_formats))
        .with_state(state)
}
