pub mod config;

pub use self::config::load_config;

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::server_config::AppConfig;

/// Shared handle to the running configuration.
///
/// The server tunes things like the token lifetime and the SMS rate caps
/// without a restart: a SIGHUP swaps the `AppConfig` behind this handle,
/// and every request task sees the new values on its next read.  Clones
/// are pointer copies over the same lock.
///
/// Guards must stay short-lived.  A handler that needs a config value on
/// the far side of an `.await` copies it out first:
///
/// ```rust,no_run
/// // let lifetime = state.config.read().await.auth.token_lifetime_secs;
/// // issue_token(lifetime).await;
/// ```
///
/// The token signing secret is the one setting NOT served through this
/// handle — it is resolved once at startup (see `AppState.secret`).
#[derive(Clone, Debug)]
pub struct LiveConfig(Arc<RwLock<AppConfig>>);

impl LiveConfig {
    pub fn new(config: AppConfig) -> Self {
        Self(Arc::new(RwLock::new(config)))
    }

    /// Read access to the current config.  Do not hold the guard across
    /// an `.await`.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.0.read().await
    }

    /// Replace the config wholesale.  Callers validate the replacement
    /// before handing it over; a half-loaded config never lands here.
    pub async fn reload(&self, new: AppConfig) {
        *self.0.write().await = new;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> AppConfig {
        toml::from_str(
            r#"
            [app]
            name = "accounts"

            [server]
            bind = "127.0.0.1"

            [database]
            path = "test.db"

            [auth]
            secret_key = "0123456789abcdef0123456789abcdef"
            "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn reload_is_visible_through_every_clone() {
        let live = LiveConfig::new(minimal_config());
        let other = live.clone();

        let mut updated = minimal_config();
        updated.auth.token_lifetime_secs = 60;
        live.reload(updated).await;

        assert_eq!(other.read().await.auth.token_lifetime_secs, 60);
    }
}
