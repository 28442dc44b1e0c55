use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header, request::Parts},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

/// Role
///
/// Coarse permission level carried by every resolved session.
/// Any other role string on the wire is treated as a malformed identity payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Parses the lowercase wire name. Used for the `DEV_SESSION_ROLE` override.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session
///
/// The server-confirmed identity of the current viewer. A `Session` only exists
/// once the role is known; an unresolved or failed check is represented by `None`
/// at every call site, never by a partially filled value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub role: Role,
}

/// MeResponse
///
/// Success body of `GET /auth/me` (and of `POST /auth/login` when the API echoes the user).
#[derive(Debug, Deserialize)]
pub struct MeResponse {
    pub user: Session,
}

/// Credentials
///
/// The viewer's ambient credentials as received by the portal. Only the raw
/// `Cookie` header is kept; it is forwarded verbatim to the remote API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    cookie: Option<HeaderValue>,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            cookie: headers.get(header::COOKIE).cloned(),
        }
    }

    pub fn from_cookie(cookie: &str) -> Self {
        Self {
            cookie: HeaderValue::from_str(cookie).ok(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn cookie(&self) -> Option<&HeaderValue> {
        self.cookie.as_ref()
    }

    /// Attaches the forwarded cookie (if any) to an outgoing API request.
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.cookie {
            Some(cookie) => request.header(header::COOKIE, cookie.clone()),
            None => request,
        }
    }
}

// Every page handler that talks to the remote API needs the viewer's cookie,
// guarded or not, so extraction never fails.
impl<S> FromRequestParts<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Credentials::from_headers(&parts.headers))
    }
}

/// SessionProvider
///
/// The injected "current session" source consulted by every route guard.
/// Implementations must fold every failure into `None` and must not cache
/// between calls: each invocation answers for the server-side state at that moment.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn resolve_session(&self, credentials: &Credentials) -> Option<Session>;
}

/// SessionState
///
/// Shared handle to the configured provider, cloned into each guard.
pub type SessionState = Arc<dyn SessionProvider>;

/// HttpSessionProvider
///
/// Resolves the viewer by calling the remote identity endpoint once per invocation.
#[derive(Clone)]
pub struct HttpSessionProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSessionProvider {
    /// Builds a provider for `{api_base_url}/auth/me`.
    pub fn new(client: reqwest::Client, api_base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/auth/me", api_base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    async fn resolve_session(&self, credentials: &Credentials) -> Option<Session> {
        let request = credentials.apply(self.client.get(&self.endpoint));

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(error = %e, "identity check failed to send");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "identity check rejected");
            return None;
        }

        match response.json::<MeResponse>().await {
            Ok(me) => Some(me.user),
            Err(e) => {
                tracing::debug!(error = %e, "identity payload malformed");
                None
            }
        }
    }
}

/// FixedSessionProvider
///
/// Answers every call with the same value. Backs the local `DEV_SESSION_ROLE`
/// override and lets tests pin the viewer without an identity server.
#[derive(Clone, Debug, Default)]
pub struct FixedSessionProvider {
    session: Option<Session>,
}

impl FixedSessionProvider {
    pub fn new(session: Option<Session>) -> Self {
        Self { session }
    }

    pub fn signed_in(user_id: &str, role: Role) -> Self {
        Self::new(Some(Session {
            user_id: user_id.to_string(),
            role,
        }))
    }

    pub fn signed_out() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl SessionProvider for FixedSessionProvider {
    async fn resolve_session(&self, _credentials: &Credentials) -> Option<Session> {
        self.session.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn me_response_parses_known_roles() {
        let me: MeResponse =
            serde_json::from_str(r#"{"user":{"userId":"a1","role":"admin"}}"#).unwrap();
        assert_eq!(me.user.user_id, "a1");
        assert_eq!(me.user.role, Role::Admin);
    }

    #[test]
    fn me_response_rejects_unknown_role() {
        let parsed = serde_json::from_str::<MeResponse>(r#"{"user":{"userId":"x","role":"owner"}}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::parse(" Admin "), Some(Role::Admin));
        assert_eq!(Role::parse("USER"), Some(Role::User));
        assert_eq!(Role::parse("guest"), None);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let provider = HttpSessionProvider::new(reqwest::Client::new(), "http://api.local/api/");
        assert_eq!(provider.endpoint(), "http://api.local/api/auth/me");
    }
}
