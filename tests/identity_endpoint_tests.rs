use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceExt;
use wellness_portal::{
    AppConfig, AppState, HttpSessionProvider, Role, Session, create_router,
    api::HttpPortalApi,
    session::{Credentials, SessionProvider, SessionState},
};

// --- FAKE IDENTITY SERVER ---

// Answers `GET /api/auth/me` based on the forwarded cookie alone.
async fn me(headers: HeaderMap) -> Response {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match cookie {
        "token=client" => Json(json!({ "user": { "userId": "u-7", "role": "user" } })).into_response(),
        "token=admin" => Json(json!({ "user": { "userId": "a-1", "role": "admin" } })).into_response(),
        "token=coach" => Json(json!({ "user": { "userId": "c-1", "role": "coach" } })).into_response(),
        "token=garbled" => (StatusCode::OK, "<html>not json</html>").into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Not authenticated" }))).into_response(),
    }
}

/// Spawns the fake API and returns its base URL (`http://127.0.0.1:{port}/api`).
async fn spawn_identity_server() -> String {
    let router = Router::new().route("/api/auth/me", get(me));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}/api", port)
}

async fn resolve(base_url: &str, cookie: &str) -> Option<Session> {
    HttpSessionProvider::new(reqwest::Client::new(), base_url)
        .resolve_session(&Credentials::from_cookie(cookie))
        .await
}

// --- PROVIDER TESTS ---

#[tokio::test]
async fn test_forwarded_cookie_resolves_session() {
    let base_url = spawn_identity_server().await;

    let client = resolve(&base_url, "token=client").await.unwrap();
    assert_eq!(client.user_id, "u-7");
    assert_eq!(client.role, Role::User);

    let admin = resolve(&base_url, "token=admin").await.unwrap();
    assert_eq!(admin.role, Role::Admin);
}

#[tokio::test]
async fn test_rejected_or_malformed_identity_is_no_session() {
    let base_url = spawn_identity_server().await;

    assert_eq!(resolve(&base_url, "token=expired").await, None);
    assert_eq!(resolve(&base_url, "token=garbled").await, None);
    assert_eq!(resolve(&base_url, "token=coach").await, None);

    let anonymous = HttpSessionProvider::new(reqwest::Client::new(), &base_url)
        .resolve_session(&Credentials::anonymous())
        .await;
    assert_eq!(anonymous, None);
}

#[tokio::test]
async fn test_unreachable_identity_endpoint_is_no_session() {
    // Reserve a port, then close it so nothing is listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let session = resolve(&format!("http://127.0.0.1:{port}/api"), "token=client").await;

    assert_eq!(session, None);
}

// --- END-TO-END GUARD TESTS ---

async fn portal(base_url: &str) -> Router {
    let http = reqwest::Client::new();
    create_router(AppState {
        api: Arc::new(HttpPortalApi::new(http.clone(), base_url)),
        sessions: Arc::new(HttpSessionProvider::new(http, base_url)) as SessionState,
        config: AppConfig::default(),
    })
}

async fn navigate(router: Router, uri: &str, cookie: &str) -> Response {
    router
        .oneshot(
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn test_expired_cookie_is_sent_to_login() {
    let base_url = spawn_identity_server().await;

    let response = navigate(portal(&base_url).await, "/dashboard", "token=expired").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
}

#[tokio::test]
async fn test_client_cookie_on_admin_path_is_not_authorized() {
    let base_url = spawn_identity_server().await;

    let response = navigate(portal(&base_url).await, "/admin", "token=client").await;

    assert_eq!(location(&response), Some("/not-authorized"));
}

#[tokio::test]
async fn test_unknown_role_cannot_enter_any_portal() {
    let base_url = spawn_identity_server().await;

    for uri in ["/dashboard", "/admin"] {
        let response = navigate(portal(&base_url).await, uri, "token=coach").await;
        assert_eq!(location(&response), Some("/login"), "{uri}");
    }
}

#[tokio::test]
async fn test_admin_cookie_passes_guard() {
    let base_url = spawn_identity_server().await;

    // The fake server has no client list, so the page renders its load error.
    let response = navigate(portal(&base_url).await, "/admin", "token=admin").await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(body.contains("Failed to load clients from server"));
}
