use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Client Router Module
///
/// Nested under `/dashboard`. Handlers here extract `CurrentSession`, which the
/// `AnyAuth` guard layer places on the request.
pub fn client_routes() -> Router<AppState> {
    Router::new()
        // GET /dashboard
        // Meal plan, weight history and the log-weight form.
        .route("/", get(handlers::dashboard))
        // POST /dashboard/weight-log
        .route("/weight-log", post(handlers::log_weight))
        .fallback(handlers::not_found)
}
