use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
    routing::get,
};

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Remote portal API client and the session source the guard relies on.
pub mod api;
pub mod session;

// Route guarding, page rendering and request handling.
pub mod guard;
pub mod handlers;
pub mod pages;

pub mod config;
pub mod error;
pub mod models;

// Module for routing segregation (Public, Client, Admin).
pub mod routes;
use routes::{admin, client, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use api::{ApiState, HttpPortalApi, PortalApi};
pub use config::AppConfig;
pub use guard::{GuardRequirement, GuardState, RouteGuard};
pub use session::{FixedSessionProvider, HttpSessionProvider, Role, Session, SessionState};

/// AppState
///
/// Implements the **Unified State Pattern**. The single, thread-safe and immutable
/// container holding the portal's services and configuration, shared across all
/// incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Remote API: every page's data goes through this trait object.
    pub api: ApiState,
    /// Session source used by the route guards.
    pub sessions: SessionState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Handlers pull only the component they need out of the AppState.

impl FromRef<AppState> for ApiState {
    fn from_ref(app_state: &AppState) -> ApiState {
        app_state.api.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl AppState {
    /// A guard over this state's session source with the configured resolve timeout.
    pub fn guard(&self, requirement: GuardRequirement) -> RouteGuard {
        RouteGuard::new(self.sessions.clone(), requirement)
            .with_timeout(self.config.resolve_timeout)
    }
}

/// create_router
///
/// Assembles the portal's routing structure, applies the route guards and the
/// observability layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let client_guard = middleware::from_fn_with_state(
        state.guard(GuardRequirement::AnyAuth),
        guard::route_guard,
    );
    let admin_guard = middleware::from_fn_with_state(
        state.guard(GuardRequirement::RoleAuth(Role::Admin)),
        guard::route_guard,
    );

    // 1. Base Router Assembly
    let base_router = Router::new()
        // Public Routes: No guard. Holds both redirect targets.
        .merge(public::public_routes())
        // Client Routes: any signed-in viewer. `layer` rather than `route_layer`
        // so unknown paths under the prefix are guarded as well.
        .nest("/dashboard", client::client_routes().layer(client_guard.clone()))
        // Admin Routes: admin role only.
        .nest("/admin", admin::admin_routes().layer(admin_guard.clone()))
        // A nest does not match its prefix with a trailing slash; the index
        // pages are registered there explicitly, behind the same guards.
        .route("/dashboard/", get(handlers::dashboard).layer(client_guard))
        .route("/admin/", get(handlers::admin_dashboard).layer(admin_guard))
        .fallback(handlers::not_found)
        // Apply the Unified State to all routes.
        .with_state(state);

    // 2. Observability and Correlation Layers (Applied outermost/first)
    base_router.layer(
        ServiceBuilder::new()
            // 2a. Request ID Generation: a unique UUID for every incoming request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            // 2b. Request Tracing: wraps the request/response lifecycle in a span
            // carrying the generated request ID.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // 2c. Request ID Propagation: returns the x-request-id header to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Used by `TraceLayer` to open one span per request. It includes the
/// `x-request-id` header (if present) alongside the HTTP method and URI, so every
/// log line of a request, including the guard's, is correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
