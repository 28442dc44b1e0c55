use std::env;
use std::time::Duration;

use crate::session::Role;

/// Default upper bound on an identity check before the guard gives up and denies.
pub const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 10;

/// AppConfig
///
/// Holds the portal's entire configuration. Loaded once at startup and never
/// mutated; handlers pull it out of `AppState` via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and the dev session override.
    pub env: Env,
    // Base URL of the remote portal API, e.g. `https://api.example.com/api`.
    pub api_base_url: String,
    // Address the HTTP server binds to.
    pub bind_addr: String,
    // Upper bound on the guard's identity check. `None` waits indefinitely.
    pub resolve_timeout: Option<Duration>,
    // Business WhatsApp number that contact inquiries are forwarded to.
    pub whatsapp_number: String,
    // Local only: replaces the identity endpoint with a fixed session of this role.
    pub dev_role: Option<Role>,
}

/// Env
///
/// Runtime context: `Local` for development conveniences, `Production` for
/// mandatory configuration and machine-readable logs.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for tests and local scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            api_base_url: "http://localhost:10010/api".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            resolve_timeout: Some(Duration::from_secs(DEFAULT_RESOLVE_TIMEOUT_SECS)),
            whatsapp_number: "917010732223".to_string(),
            dev_role: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in `Production` when `API_BASE_URL` is missing, and whenever
    /// `SESSION_RESOLVE_TIMEOUT_SECS` is set to something other than a whole number.
    pub fn load() -> Self {
        let defaults = Self::default();

        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let api_base_url = match env {
            Env::Production => env::var("API_BASE_URL")
                .expect("FATAL: API_BASE_URL must be set in production."),
            Env::Local => env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
        };

        let resolve_timeout = match env::var("SESSION_RESOLVE_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .expect("FATAL: SESSION_RESOLVE_TIMEOUT_SECS must be a whole number of seconds.");
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            Err(_) => defaults.resolve_timeout,
        };

        // The fixed dev session must never leak into production.
        let dev_role = match env {
            Env::Local => env::var("DEV_SESSION_ROLE")
                .ok()
                .and_then(|raw| Role::parse(&raw)),
            Env::Production => None,
        };

        Self {
            env,
            api_base_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            resolve_timeout,
            whatsapp_number: env::var("WHATSAPP_NUMBER").unwrap_or(defaults.whatsapp_number),
            dev_role,
        }
    }
}
