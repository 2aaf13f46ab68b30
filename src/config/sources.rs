use super::models::{Config, CredentialsConfig};
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "WAYBACK_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/wayback.toml";
const ENV_PREFIX: &str = "WAYBACK";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;

    config.credentials = load_credentials(|name| env::var(name).ok());

    Ok(config)
}

/// Credentials are never stored in TOML files, only in the environment
pub(crate) fn load_credentials<F>(lookup: F) -> CredentialsConfig
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    CredentialsConfig {
        access_key: non_empty("WAYBACK_ACCESS_KEY"),
        secret_key: non_empty("WAYBACK_SECRET_KEY"),
        logged_in_user: non_empty("WAYBACK_LOGGED_IN_USER"),
        logged_in_sig: non_empty("WAYBACK_LOGGED_IN_SIG"),
    }
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // WAYBACK__CAPTURE__POLL_INTERVAL -> capture.poll_interval
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}
