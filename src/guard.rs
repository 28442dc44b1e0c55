use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle};
use uuid::Uuid;

use crate::{
    pages,
    session::{Credentials, Role, Session, SessionProvider, SessionState},
};

/// Where an unauthenticated viewer is sent.
pub const LOGIN_PATH: &str = "/login";
/// Where a signed-in viewer without the required role is sent.
pub const NOT_AUTHORIZED_PATH: &str = "/not-authorized";

/// GuardRequirement
///
/// Static access rule attached to a route subtree when the routing table is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRequirement {
    /// Anyone may render the subtree; the resolver is never consulted.
    NoAuth,
    /// Any resolved session is sufficient.
    AnyAuth,
    /// The resolved session must carry exactly this role.
    RoleAuth(Role),
}

impl GuardRequirement {
    pub fn needs_session(self) -> bool {
        !matches!(self, GuardRequirement::NoAuth)
    }
}

/// Why a mount ended in `Denied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    Forbidden,
}

impl DenyReason {
    pub fn redirect_target(self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => LOGIN_PATH,
            DenyReason::Forbidden => NOT_AUTHORIZED_PATH,
        }
    }
}

/// GuardState
///
/// Lifecycle of a single guard mount. `Resolving` is the only non-terminal state
/// and is left at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Resolving,
    Denied(DenyReason),
    /// Carries the session that satisfied the requirement (`None` only for `NoAuth`).
    Authorized(Option<Session>),
}

impl GuardState {
    pub fn is_resolving(&self) -> bool {
        matches!(self, GuardState::Resolving)
    }
}

/// decide
///
/// Maps a requirement and a resolution outcome to the terminal state of a mount.
pub fn decide(requirement: GuardRequirement, session: Option<Session>) -> GuardState {
    match (requirement, session) {
        (GuardRequirement::NoAuth, session) => GuardState::Authorized(session),
        (_, None) => GuardState::Denied(DenyReason::Unauthenticated),
        (GuardRequirement::AnyAuth, Some(session)) => GuardState::Authorized(Some(session)),
        (GuardRequirement::RoleAuth(role), Some(session)) if session.role == role => {
            GuardState::Authorized(Some(session))
        }
        (GuardRequirement::RoleAuth(_), Some(_)) => GuardState::Denied(DenyReason::Forbidden),
    }
}

/// RouteGuard
///
/// Per-subtree guard configuration: the injected session source, the subtree's
/// requirement and an optional bound on how long `Resolving` may last.
/// Cloned into the router as middleware state.
#[derive(Clone)]
pub struct RouteGuard {
    sessions: SessionState,
    requirement: GuardRequirement,
    resolve_timeout: Option<Duration>,
}

impl RouteGuard {
    pub fn new(sessions: SessionState, requirement: GuardRequirement) -> Self {
        Self {
            sessions,
            requirement,
            resolve_timeout: None,
        }
    }

    /// Bounds the resolver call; an elapsed timeout counts as "no session".
    pub fn with_timeout(mut self, resolve_timeout: Option<Duration>) -> Self {
        self.resolve_timeout = resolve_timeout;
        self
    }

    pub fn requirement(&self) -> GuardRequirement {
        self.requirement
    }

    /// mount
    ///
    /// Starts a new mount for one navigation. For guarded subtrees the resolver call
    /// is spawned immediately and the mount starts in `Resolving`; `NoAuth` mounts
    /// are born `Authorized`.
    pub fn mount(&self, credentials: Credentials) -> GuardMount {
        let id = Uuid::new_v4();
        let mounted = Arc::new(AtomicBool::new(true));

        if !self.requirement.needs_session() {
            let (state, _) = watch::channel(GuardState::Authorized(None));
            return GuardMount {
                id,
                state: Arc::new(state),
                mounted,
                task: None,
            };
        }

        let (state, _) = watch::channel(GuardState::Resolving);
        let state = Arc::new(state);

        let task = tokio::spawn({
            let state = Arc::clone(&state);
            let mounted = Arc::clone(&mounted);
            let sessions = Arc::clone(&self.sessions);
            let requirement = self.requirement;
            let resolve_timeout = self.resolve_timeout;

            async move {
                let session =
                    resolve_bounded(sessions.as_ref(), &credentials, resolve_timeout).await;
                let next = decide(requirement, session);

                // The liveness check and the write happen under the channel lock, which
                // `GuardMount::drop` also takes before clearing the flag.
                let applied = state.send_if_modified(|current| {
                    if !mounted.load(Ordering::Acquire) || !current.is_resolving() {
                        return false;
                    }
                    *current = next;
                    true
                });

                if !applied {
                    tracing::debug!(mount = %id, "discarding session resolution for unmounted guard");
                }
            }
        });

        GuardMount {
            id,
            state,
            mounted,
            task: Some(task),
        }
    }
}

async fn resolve_bounded(
    sessions: &dyn SessionProvider,
    credentials: &Credentials,
    resolve_timeout: Option<Duration>,
) -> Option<Session> {
    match resolve_timeout {
        Some(limit) => {
            match tokio::time::timeout(limit, sessions.resolve_session(credentials)).await {
                Ok(session) => session,
                Err(_) => {
                    tracing::warn!(timeout_ms = limit.as_millis() as u64, "identity check timed out");
                    None
                }
            }
        }
        None => sessions.resolve_session(credentials).await,
    }
}

/// GuardMount
///
/// One guard instance bound to one navigation. Dropping it is the unmount: any
/// resolution still in flight is aborted and, if it already finished, its result
/// is not applied.
pub struct GuardMount {
    id: Uuid,
    state: Arc<watch::Sender<GuardState>>,
    mounted: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl GuardMount {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state of the mount.
    pub fn state(&self) -> GuardState {
        self.state.borrow().clone()
    }

    /// Observe state changes; the receiver outlives the mount.
    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.state.subscribe()
    }

    /// settled
    ///
    /// Waits for the resolver call to finish and returns the resulting state.
    /// Only stays `Resolving` if the resolution task itself failed.
    pub async fn settled(&mut self) -> GuardState {
        if let Some(task) = self.task.as_mut() {
            if let Err(e) = task.await {
                tracing::error!(mount = %self.id, error = %e, "session resolution task failed");
            }
            self.task = None;
        }
        self.state()
    }

    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for GuardMount {
    fn drop(&mut self) {
        let mounted = &self.mounted;
        self.state.send_if_modified(|_| {
            mounted.store(false, Ordering::Release);
            false
        });
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// route_guard
///
/// Middleware wrapping a guarded subtree. The request is the mount: it holds the
/// placeholder position while the session resolves, then either passes through
/// (with the `Session` in the request extensions) or is answered with a
/// replace-style redirect. A dropped request drops the mount with it.
pub async fn route_guard(
    State(guard): State<RouteGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let credentials = Credentials::from_headers(request.headers());
    let mut mount = guard.mount(credentials);
    let outcome = mount.settled().await;
    drop(mount);

    match outcome {
        GuardState::Authorized(session) => {
            if let Some(session) = session {
                tracing::debug!(user_id = %session.user_id, role = %session.role, "guard authorized");
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
        GuardState::Denied(reason) => {
            let target = reason.redirect_target();
            tracing::debug!(
                path = %request.uri().path(),
                requirement = ?guard.requirement(),
                redirect = target,
                "guard denied navigation"
            );
            Redirect::to(target).into_response()
        }
        GuardState::Resolving => pages::placeholder(),
    }
}

/// CurrentSession
///
/// Extractor for handlers mounted below a guard. Reads the session the guard
/// placed in the request extensions.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(CurrentSession)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> Option<Session> {
        Some(Session {
            user_id: "u1".to_string(),
            role,
        })
    }

    #[test]
    fn no_auth_ignores_session() {
        assert_eq!(decide(GuardRequirement::NoAuth, None), GuardState::Authorized(None));
        assert_eq!(
            decide(GuardRequirement::NoAuth, session(Role::User)),
            GuardState::Authorized(session(Role::User))
        );
    }

    #[test]
    fn missing_session_is_unauthenticated_for_every_protected_requirement() {
        for requirement in [
            GuardRequirement::AnyAuth,
            GuardRequirement::RoleAuth(Role::Admin),
            GuardRequirement::RoleAuth(Role::User),
        ] {
            assert_eq!(
                decide(requirement, None),
                GuardState::Denied(DenyReason::Unauthenticated)
            );
        }
    }

    #[test]
    fn role_mismatch_is_forbidden() {
        assert_eq!(
            decide(GuardRequirement::RoleAuth(Role::Admin), session(Role::User)),
            GuardState::Denied(DenyReason::Forbidden)
        );
        assert_eq!(
            decide(GuardRequirement::RoleAuth(Role::Admin), session(Role::Admin)),
            GuardState::Authorized(session(Role::Admin))
        );
    }

    #[test]
    fn any_auth_accepts_both_roles() {
        for role in [Role::Admin, Role::User] {
            assert!(matches!(
                decide(GuardRequirement::AnyAuth, session(role)),
                GuardState::Authorized(Some(_))
            ));
        }
    }

    #[test]
    fn deny_reasons_map_to_distinct_paths() {
        assert_eq!(DenyReason::Unauthenticated.redirect_target(), "/login");
        assert_eq!(DenyReason::Forbidden.redirect_target(), "/not-authorized");
    }
}
