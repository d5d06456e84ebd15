pub mod config;
pub mod types;

pub use config::LiveConfig;
pub use types::response::{ApiCode, ApiReply};
pub use types::server_config::AppConfig;
