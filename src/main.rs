use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wellness_portal::{
    AppState,
    api::{ApiState, HttpPortalApi},
    config::{AppConfig, Env},
    create_router,
    session::{FixedSessionProvider, HttpSessionProvider, SessionState},
};

/// main
///
/// The asynchronous entry point: loads configuration, initializes logging, wires
/// the remote API and session source into the shared state, and serves HTTP.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise sensible defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wellness_portal=debug,tower_http=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON output for log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Remote API Client
    // One connection pool shared by the API client and the identity check.
    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .build()
        .expect("FATAL: Failed to build the HTTP client.");

    let api = Arc::new(HttpPortalApi::new(http.clone(), &config.api_base_url)) as ApiState;

    // 5. Session Source
    // LOCAL-ONLY: DEV_SESSION_ROLE replaces the identity endpoint with a fixed session.
    let sessions = match config.dev_role {
        Some(role) => {
            tracing::warn!(%role, "using fixed development session");
            Arc::new(FixedSessionProvider::signed_in("dev", role)) as SessionState
        }
        None => {
            let provider = HttpSessionProvider::new(http, &config.api_base_url);
            tracing::info!(endpoint = provider.endpoint(), "resolving sessions remotely");
            Arc::new(provider) as SessionState
        }
    };

    let bind_addr = config.bind_addr.clone();

    // 6. Unified State Assembly
    let app_state = AppState {
        api,
        sessions,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
