use std::time::{Duration, SystemTime, UNIX_EPOCH};

use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;

use shared::ApiCode;

use crate::auth::codec::{self, TokenClaims};
use crate::auth::ident::ClientInfo;
use crate::cache::{Cache, CacheError};

/// Cache key prefix; one slot per user, `user_token_{user_id}`.
pub const TOKEN_PREFIX: &str = "user_token_";

/// Why a presented token was rejected.  Variants after `Malformed` carry
/// the user id from the decoded claims so rejections can be logged against
/// an account.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no token presented")]
    NotFound,
    #[error("token failed to decode")]
    Malformed,
    /// Fingerprint mismatch — same account, different client environment.
    #[error("login environment changed for user {user_id}")]
    Changed { user_id: i64 },
    /// The token lost against the cache slot (evicted, superseded, or the
    /// password changed since issue).
    #[error("token superseded or expired for user {user_id}")]
    Invalid { user_id: i64 },
    /// Token was valid but the user row is gone.
    #[error("token references unknown user {user_id}")]
    UnknownUser { user_id: i64 },
    /// Token was valid but the account is disabled.
    #[error("account {account} (user {user_id}) is disabled")]
    Disabled { user_id: i64, account: String },
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// Storage failure while resolving the token's user.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TokenError {
    /// Business code reported to the client for this rejection.
    pub fn api_code(&self) -> ApiCode {
        match self {
            Self::NotFound => ApiCode::TokenNotFound,
            Self::Malformed => ApiCode::TokenError,
            Self::Changed { .. } => ApiCode::TokenChanged,
            Self::Invalid { .. } => ApiCode::TokenInvalid,
            Self::UnknownUser { .. } => ApiCode::TokenUserError,
            Self::Disabled { .. } => ApiCode::TokenUserInvalid,
            Self::Cache(_) | Self::Internal(_) => ApiCode::Err,
        }
    }
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: i64,
    /// When the accepted token was issued (unix seconds).
    pub issued_at: u64,
}

fn cache_key(user_id: i64) -> String {
    format!("{}{}", TOKEN_PREFIX, user_id)
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn cache_ttl(lifetime_secs: u64) -> Option<Duration> {
    (lifetime_secs != 0).then(|| Duration::from_secs(lifetime_secs))
}

/// Issue a fresh token for `user_id` and make it the user's single live
/// login.  Any previously cached token is overwritten, which is exactly
/// how "log in on a new phone logs out the old one" works.
pub async fn create_token(
    cache: &dyn Cache,
    secret: &str,
    user_id: i64,
    password_hash: &str,
    client: &ClientInfo,
    lifetime_secs: u64,
) -> Result<String, TokenError> {
    let claims = TokenClaims {
        user_id,
        password_hash: password_hash.to_string(),
        client_ident: client.fingerprint(),
        lifetime_secs,
        issued_at: now_unix(),
    };

    let token = codec::encode(&claims, secret).map_err(|_| TokenError::Malformed)?;
    cache
        .set(&cache_key(user_id), &token, cache_ttl(lifetime_secs))
        .await?;
    Ok(token)
}

/// Drop the user's cached token.  Idempotent: clearing an already-empty
/// slot is not an error.
pub async fn clear_token(cache: &dyn Cache, user_id: i64) -> Result<(), TokenError> {
    cache.delete(&cache_key(user_id)).await?;
    Ok(())
}

/// Run a presented token through the full validation pipeline.
///
/// Order matters and is part of the contract:
///
/// 1. decode + signature check            → `Malformed`
/// 2. client fingerprint vs claims        → `Changed`
/// 3. cache slot lookup                   → `Invalid` on miss
/// 4. byte-compare with the cached token  → accepted when equal
/// 5. claim-by-claim comparison otherwise → `Invalid` / `Changed`
///
/// The fingerprint check runs BEFORE the cache is touched, so a stolen
/// token replayed from another device never reaches storage.  All token
/// and fingerprint comparisons are constant-time.
///
/// On success the presented token is re-cached with a renewed TTL, so an
/// active user never ages out mid-session.  Tokens issued with
/// `lifetime_secs = 0` are never refreshed (their slot has no TTL).
pub async fn validate_token(
    cache: &dyn Cache,
    secret: &str,
    token: &str,
    client: &ClientInfo,
) -> Result<AuthSession, TokenError> {
    let claims = codec::decode(token, secret).map_err(|_| TokenError::Malformed)?;
    let user_id = claims.user_id;

    let fingerprint = client.fingerprint();
    if !bool::from(claims.client_ident.as_bytes().ct_eq(fingerprint.as_bytes())) {
        return Err(TokenError::Changed { user_id });
    }

    let key = cache_key(user_id);
    let cached = cache
        .get(&key)
        .await?
        .ok_or(TokenError::Invalid { user_id })?;

    if !bool::from(cached.as_bytes().ct_eq(token.as_bytes())) {
        // The tokens differ.  Decode the cached one and compare claims so
        // the client gets told precisely why its copy lost.
        let current =
            codec::decode(&cached, secret).map_err(|_| TokenError::Invalid { user_id })?;

        if claims.user_id != current.user_id || claims.password_hash != current.password_hash {
            return Err(TokenError::Invalid { user_id });
        }
        if claims.client_ident != current.client_ident {
            return Err(TokenError::Changed { user_id });
        }
        if claims.issued_at < current.issued_at {
            debug!(
                "token superseded: user_id={}, presented={}, current={}",
                user_id, claims.issued_at, current.issued_at
            );
            return Err(TokenError::Invalid { user_id });
        }
        // Same claims that matter, equal-or-newer issue time: accept.
        // Serializer output can differ between issuers for identical
        // claims, so byte inequality alone is not a rejection.
    }

    if claims.lifetime_secs != 0 {
        cache
            .set(&key, token, cache_ttl(claims.lifetime_secs))
            .await?;
    }

    Ok(AuthSession {
        user_id,
        issued_at: claims.issued_at,
    })
}
