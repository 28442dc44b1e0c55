/// Router Module Index
///
/// The portal's routing table, split by access level. Each module returns an
/// unguarded `Router`; `create_router` nests the client and admin trees under
/// their prefixes and wraps them in a `route_guard` layer, so every child path
/// (including unknown ones) inherits the guard of its subtree.

/// Marketing site, login and the redirect targets. Never guarded.
pub mod public;

/// Client portal under `/dashboard`. Any signed-in viewer.
pub mod client;

/// Admin portal under `/admin`. Admin role only.
pub mod admin;
