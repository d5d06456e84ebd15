use std::fs;
use tracing::{debug, error, info};

use crate::types::server_config::{AppConfig, ConfigError};

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Loading configuration from: {}", path);

    let contents = fs::read_to_string(path)?;
    debug!("Processing file: {}", path);

    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config: AppConfig = toml::from_str(&contents)?;

    info!("Configuration loaded successfully");
    debug!("Config: {:?}", config);

    validate_config(&config)?;

    info!("Config validated");

    Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.app.name.is_empty() {
        return Err(ConfigError::InvalidConfig("app.name cannot be empty".into()));
    }

    if config.database.path.is_empty() {
        return Err(ConfigError::InvalidConfig(
            "database.path cannot be empty".into(),
        ));
    }

    if config.auth.token_name.is_empty() {
        return Err(ConfigError::InvalidConfig(
            "token_name cannot be empty".into(),
        ));
    }

    if config.server.max_connections == 0 {
        return Err(ConfigError::InvalidConfig(
            "max_connections must be greater than 0".into(),
        ));
    }

    // The signing secret must be resolvable (env var or config field) and
    // long enough.  Validated here so a bad config is rejected immediately —
    // including on SIGHUP hot-reloads — rather than failing at the first
    // login.
    match config.auth.resolved_secret() {
        None => {
            return Err(ConfigError::InvalidConfig(
                "secret_key must be set via the SECRET_KEY env var or auth.secret_key config field"
                    .into(),
            ));
        }
        Some(secret) if secret.len() < 32 => {
            return Err(ConfigError::InvalidConfig(
                "secret_key must be at least 32 characters long".into(),
            ));
        }
        _ => {}
    }

    Ok(())
}
