use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Pages reachable without a session, including both guard redirect targets
/// (`/login` and `/not-authorized`), which must stay outside every guard.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        .route("/", get(handlers::home))
        // Contact form: stored through the API, then handed to WhatsApp.
        .route(
            "/contact",
            get(handlers::contact_form).post(handlers::submit_contact),
        )
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/not-authorized", get(handlers::not_authorized))
}
