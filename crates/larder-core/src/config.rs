use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value fails to parse.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a value fails to parse.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
///
/// Every variable has a default: the directory serves public data and must come up
/// with zero configuration.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("LARDER_ENV", "development"));

    let bind_addr = parse_addr("LARDER_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("LARDER_LOG_LEVEL", "info");
    let regions_path = PathBuf::from(or_default("LARDER_REGIONS_PATH", "./config/regions.yaml"));

    let source_request_timeout_secs = parse_u64("LARDER_SOURCE_REQUEST_TIMEOUT_SECS", "30")?;
    let source_user_agent = or_default(
        "LARDER_SOURCE_USER_AGENT",
        "larder/0.1 (food-support-directory)",
    );

    let position_timeout_secs = parse_u64("LARDER_POSITION_TIMEOUT_SECS", "10")?;
    let position_max_age_secs = parse_u64("LARDER_POSITION_MAX_AGE_SECS", "300")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        regions_path,
        source_request_timeout_secs,
        source_user_agent,
        position_timeout_secs,
        position_max_age_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
