pub mod response;
pub mod server_config;

pub use self::response::{ApiCode, ApiReply};
pub use self::server_config::{AppConfig, ConfigError};
