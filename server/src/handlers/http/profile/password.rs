use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::Response;
use tracing::{debug, error, info};

use shared::ApiCode;

use crate::auth::clear_token;
use crate::database::users;
use crate::database::utils::{hash_password, verify_password};
use crate::handlers::http::routes::CurrentUser;
use crate::handlers::http::utils::validate::is_password;
use crate::handlers::http::utils::{api_return, ApiRequest};
use crate::AppState;

/// POST /api/update_password/ — change the password, then force a fresh
/// login by clearing the cached token.  Even if the clear failed, the
/// old token dies at its next validation: it carries the old password
/// hash and any token issued afterwards won't.
pub async fn update_password(
    req: ApiRequest,
    state: AppState,
    current: CurrentUser,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let account = &current.user.account;
    let old_password = req.data.get_str("old_password").unwrap_or_default();
    let new_password = req.data.get_str("new_password").unwrap_or_default();

    if old_password == new_password {
        debug!("New password equals old: account:{}", account);
        return api_return(
            ApiCode::ParamError,
            Some("new password must differ from the old one"),
            None,
        );
    }
    if !is_password(&old_password) || !is_password(&new_password) {
        debug!("Bad password format: account:{}", account);
        return api_return(ApiCode::ParamError, Some("invalid password"), None);
    }

    if !verify_password(&old_password, &current.user.password_hash) {
        debug!("Old password wrong: account:{}", account);
        return api_return(ApiCode::UserPwdError, Some("old password is wrong"), None);
    }

    let hash = hash_password(&new_password).map_err(|e| anyhow::anyhow!("password hash: {}", e))?;
    if let Err(e) = users::update_password(&state.db, current.user.id, &hash).await {
        error!("Password update failed: account:{}, {}", account, e);
        return api_return(ApiCode::Failed, Some("update failed"), None);
    }

    clear_token(state.cache.as_ref(), current.user.id).await?;

    info!("Password updated: account:{}", account);
    api_return(ApiCode::Ok, Some("password updated, please log in again"), None)
}
