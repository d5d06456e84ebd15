use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
    /// `"development"` makes the verification-code endpoints return the code
    /// in the response body instead of calling the SMS gateway.
    #[serde(default = "default_env")]
    pub env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: Option<u16>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Path to the sqlite database file. Created on first start.
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Header (and body-field) name the client uses to present its token.
    #[serde(default = "default_token_name")]
    pub token_name: String,

    /// Session lifetime in seconds. `0` means tokens never expire and the
    /// cache entry is stored without a TTL.
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_secs: u64,

    /// HMAC key used to sign and verify session tokens.
    ///
    /// Prefer loading this via the `SECRET_KEY` environment variable.  This
    /// config field is the fallback for deployments that cannot inject env
    /// vars at runtime (e.g. certain container setups).
    ///
    /// **Minimum length:** 32 characters.
    /// **Hot-reload safe:** NO — the server reads this once at startup and
    /// stores it in `AppState.secret`.  Changing it via SIGHUP requires a
    /// restart because rotating the secret immediately invalidates every
    /// active session.
    pub secret_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmsConfig {
    /// How long a verification code stays redeemable, in seconds.
    #[serde(default = "default_code_valid")]
    pub code_valid_secs: u64,
    /// Minimum pause between two code sends to the same number.
    #[serde(default = "default_code_interval")]
    pub code_interval_secs: u64,
    #[serde(default = "default_register_limit")]
    pub max_register_codes_per_day: u32,
    #[serde(default = "default_reset_limit")]
    pub max_reset_codes_per_day: u32,
    #[serde(default = "default_change_limit")]
    pub max_change_codes_per_day: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSection,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub sms: SmsConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl AppSection {
    pub fn is_development(&self) -> bool {
        self.env == "development"
    }
}

impl ServerConfig {
    /// Full bind address, e.g. `"0.0.0.0:1337"`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port.unwrap_or(1337))
    }
}

impl AuthConfig {
    /// Resolve the signing secret with the `SECRET_KEY` env-var taking
    /// priority over the config file field.
    ///
    /// Returns `None` when neither source is set (the server startup code
    /// treats this as a hard error).
    pub fn resolved_secret(&self) -> Option<String> {
        std::env::var("SECRET_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.secret_key.clone())
            .filter(|s| !s.is_empty())
    }
}

impl SmsConfig {
    /// Daily issue cap for a given code business.
    pub fn daily_limit(&self, business: &str) -> u32 {
        match business {
            "register" => self.max_register_codes_per_day,
            "reset_password" => self.max_reset_codes_per_day,
            "change_account" => self.max_change_codes_per_day,
            _ => 0,
        }
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            code_valid_secs: default_code_valid(),
            code_interval_secs: default_code_interval(),
            max_register_codes_per_day: default_register_limit(),
            max_reset_codes_per_day: default_reset_limit(),
            max_change_codes_per_day: default_change_limit(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_env() -> String {
    "development".to_string()
}

pub fn default_port() -> Option<u16> {
    Some(1337)
}

pub fn default_max_connections() -> usize {
    1000
}

pub fn default_token_name() -> String {
    "token".to_string()
}

pub fn default_token_lifetime() -> u64 {
    7 * 24 * 60 * 60
}

fn default_code_valid() -> u64 {
    10 * 60
}

fn default_code_interval() -> u64 {
    60
}

fn default_register_limit() -> u32 {
    5
}

fn default_reset_limit() -> u32 {
    5
}

fn default_change_limit() -> u32 {
    1
}
