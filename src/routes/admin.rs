use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

const EDIT_CLIENT_BASE: &str = "http://portal.invalid/admin/edit-client";

/// Admin Router Module
///
/// Nested under `/admin` behind a `RoleAuth(Admin)` guard. The `{client_id}`
/// segment reaches the handlers as-is; an identifier the API does not know
/// renders the not-found page.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin
        // Client table with derived billing status.
        .route("/", get(handlers::admin_dashboard))
        .route(
            "/add-client",
            get(handlers::add_client_form).post(handlers::add_client),
        )
        .route("/edit-client/{client_id}", get(handlers::edit_client))
        // The three independent forms of the edit page.
        .route(
            "/edit-client/{client_id}/details",
            post(handlers::update_details),
        )
        .route(
            "/edit-client/{client_id}/billing",
            post(handlers::update_billing),
        )
        .route(
            "/edit-client/{client_id}/meal-plan",
            post(handlers::update_meal_plan),
        )
        .fallback(handlers::not_found)
}

/// edit_client_path
///
/// `/admin/edit-client/{client_id}` with the identifier percent-encoded as one
/// path segment, safe for links and `Location` headers.
pub fn edit_client_path(client_id: &str) -> String {
    let Ok(mut url) = reqwest::Url::parse(EDIT_CLIENT_BASE) else {
        return "/admin".to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(client_id);
    }
    url.path().to_string()
}
