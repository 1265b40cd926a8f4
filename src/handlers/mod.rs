pub mod booking;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/booking/message", post(booking::handle_message))
        .route("/api/booking/times", get(booking::available_times))
        .route("/api/booking/sessions/:id", get(booking::get_session))
        .route(
            "/api/booking/sessions/:id/reset",
            post(booking::reset_session),
        )
        .route("/api/booking/sessions/:id/book", post(booking::book_session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
