use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::Response;
use tracing::{debug, error, info};

use shared::ApiCode;

use crate::database::utils::hash_password;
use crate::database::{codes, users};
use crate::handlers::http::auth::login_user;
use crate::handlers::http::codes::{check_submitted_code, send_verify_code, CodeOutcome};
use crate::handlers::http::utils::validate::{is_mobile, is_password, is_sms_code};
use crate::handlers::http::utils::{api_return, ApiRequest};
use crate::AppState;

const BUSINESS: &str = "reset_password";

/// POST /api/get_reset_password_code/ — send a reset code.  The account
/// must exist and be active; these flows are open (the caller has lost
/// their password), so the SMS itself is the proof of ownership.
pub async fn get_reset_password_code(
    req: ApiRequest,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let account = req.data.get_str("account").unwrap_or_default();

    if !is_mobile(&account) {
        debug!("Bad mobile number: account:{}", account);
        return api_return(ApiCode::ParamMobileError, None, None);
    }

    let Some(user) = users::get_by_account(&state.db, &account).await? else {
        debug!("Unknown account: account:{}", account);
        return api_return(ApiCode::UserNotFound, None, None);
    };
    if !user.is_active() {
        debug!("Disabled account: account:{}, status:{}", account, user.status);
        return api_return(ApiCode::UserInvalid, None, None);
    }

    send_verify_code(&state, &account, BUSINESS).await
}

/// POST /api/reset_password/ — set a new password against a valid code,
/// then log the user straight in.
pub async fn reset_password(
    req: ApiRequest,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let account = req.data.get_str("account").unwrap_or_default();
    let password = req.data.get_str("password").unwrap_or_default();
    let code = req.data.get_str("code").unwrap_or_default();

    if !is_mobile(&account) {
        debug!("Bad mobile number: account:{}", account);
        return api_return(ApiCode::ParamMobileError, None, None);
    }
    if !is_password(&password) {
        debug!("Bad password format: account:{}", account);
        return api_return(ApiCode::ParamFormatError, Some("invalid password"), None);
    }
    if !is_sms_code(&code) {
        debug!("Bad code format: account:{}", account);
        return api_return(
            ApiCode::ParamFormatError,
            Some("invalid verification code"),
            None,
        );
    }

    let Some(user) = users::get_by_account(&state.db, &account).await? else {
        debug!("Unknown account: account:{}", account);
        return api_return(ApiCode::UserNotFound, None, None);
    };
    if !user.is_active() {
        debug!("Disabled account: account:{}, status:{}", account, user.status);
        return api_return(ApiCode::UserInvalid, None, None);
    }

    let code_id = match check_submitted_code(&state, &account, BUSINESS, &code).await? {
        CodeOutcome::Valid { id } => id,
        CodeOutcome::NotFound => {
            debug!("Code rejected: account:{}", account);
            return api_return(ApiCode::ParamCodeError, None, None);
        }
        CodeOutcome::Expired => {
            debug!("Code expired: account:{}", account);
            return api_return(ApiCode::ParamCodeInvalid, None, None);
        }
    };

    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("password hash: {}", e))?;
    if let Err(e) = users::update_password(&state.db, user.id, &hash).await {
        error!("Password reset failed: account:{}, {}", account, e);
        return api_return(ApiCode::Failed, Some("reset failed"), None);
    }
    codes::mark_used(&state.db, code_id).await?;

    // Issue the token against the NEW hash: the reset supersedes any
    // session the old password had.
    let user = users::get_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {} vanished during reset", user.id))?;
    let token = login_user(&state, &req, &user).await?;

    info!("Password reset: account:{}, user_id:{}", account, user.id);
    api_return(
        ApiCode::Ok,
        Some("password reset"),
        Some(user.login_info(&token)),
    )
}
