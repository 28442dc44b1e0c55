use serial_test::serial;
use std::{env, panic, time::Duration};
use wellness_portal::{AppConfig, Role, config::Env};

const CONFIG_VARS: [&str; 6] = [
    "APP_ENV",
    "API_BASE_URL",
    "BIND_ADDR",
    "SESSION_RESOLVE_TIMEOUT_SECS",
    "WHATSAPP_NUMBER",
    "DEV_SESSION_ROLE",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` against a clean configuration environment and restores the
/// original variables afterward, even if the test panics.
fn run_with_env<T, R>(test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(key, val);
            } else {
                env::remove_var(key);
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    // API_BASE_URL is missing, which is fatal in production.
    let result = run_with_env(|| {
        panic::catch_unwind(|| {
            unsafe {
                env::set_var("APP_ENV", "production");
            }
            AppConfig::load()
        })
    });

    assert!(
        result.is_err(),
        "Production config loading should panic without API_BASE_URL"
    );
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "local");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.api_base_url, "http://localhost:10010/api");
    assert_eq!(config.bind_addr, "0.0.0.0:3000");
    assert_eq!(config.resolve_timeout, Some(Duration::from_secs(10)));
    assert_eq!(config.whatsapp_number, "917010732223");
    assert_eq!(config.dev_role, None);
}

#[test]
#[serial]
fn test_app_config_production_reads_overrides() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "production");
            env::set_var("API_BASE_URL", "https://api.example.com/api");
            env::set_var("SESSION_RESOLVE_TIMEOUT_SECS", "3");
            env::set_var("WHATSAPP_NUMBER", "15550001111");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.api_base_url, "https://api.example.com/api");
    assert_eq!(config.resolve_timeout, Some(Duration::from_secs(3)));
    assert_eq!(config.whatsapp_number, "15550001111");
}

#[test]
#[serial]
fn test_zero_timeout_disables_bound() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("SESSION_RESOLVE_TIMEOUT_SECS", "0");
        }
        AppConfig::load()
    });

    assert_eq!(config.resolve_timeout, None);
}

#[test]
#[serial]
fn test_invalid_timeout_is_fatal() {
    let result = run_with_env(|| {
        panic::catch_unwind(|| {
            unsafe {
                env::set_var("SESSION_RESOLVE_TIMEOUT_SECS", "soon");
            }
            AppConfig::load()
        })
    });

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_dev_session_role_only_applies_locally() {
    let local = run_with_env(|| {
        unsafe {
            env::set_var("DEV_SESSION_ROLE", "Admin");
        }
        AppConfig::load()
    });
    assert_eq!(local.dev_role, Some(Role::Admin));

    let production = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "production");
            env::set_var("API_BASE_URL", "https://api.example.com/api");
            env::set_var("DEV_SESSION_ROLE", "admin");
        }
        AppConfig::load()
    });
    assert_eq!(production.dev_role, None);
}
