use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::Response;
use tracing::{debug, error, info};

use shared::ApiCode;

use crate::database::utils::verify_password;
use crate::database::{codes, users};
use crate::handlers::http::codes::{check_submitted_code, send_verify_code, CodeOutcome};
use crate::handlers::http::routes::CurrentUser;
use crate::handlers::http::utils::validate::{is_mobile, is_sms_code};
use crate::handlers::http::utils::{api_return, ApiRequest};
use crate::AppState;

const BUSINESS: &str = "change_account";

/// POST /api/get_change_account_code/ — send a code to the NEW number.
///
/// Requires the current password: changing the login account is the most
/// sensitive self-service operation, so holding a token alone is not
/// enough.  The code goes to the new number to prove the caller controls
/// it, and the daily cap on this flow is deliberately tight.
pub async fn get_change_account_code(
    req: ApiRequest,
    state: AppState,
    current: CurrentUser,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let account = &current.user.account;
    let new_account = req.data.get_str("new_account").unwrap_or_default();
    let password = req.data.get_str("password").unwrap_or_default();

    if !is_mobile(&new_account) {
        debug!(
            "Bad mobile number: account:{}, new_account:{}",
            account, new_account
        );
        return api_return(ApiCode::ParamMobileError, None, None);
    }

    if !verify_password(&password, &current.user.password_hash) {
        debug!("Wrong password: account:{}", account);
        return api_return(ApiCode::UserPwdError, None, None);
    }

    if users::get_by_account(&state.db, &new_account)
        .await?
        .is_some()
    {
        debug!(
            "New account taken: account:{}, new_account:{}",
            account, new_account
        );
        return api_return(ApiCode::ParamError, Some("account already in use"), None);
    }

    send_verify_code(&state, &new_account, BUSINESS).await
}

/// POST /api/change_account/ — move the login to the new number.
///
/// The live token stays valid: it is bound to user id and password hash,
/// neither of which changes here.
pub async fn change_account(
    req: ApiRequest,
    state: AppState,
    current: CurrentUser,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let account = &current.user.account;
    let new_account = req.data.get_str("new_account").unwrap_or_default();
    let code = req.data.get_str("code").unwrap_or_default();

    if !is_mobile(&new_account) {
        debug!(
            "Bad mobile number: account:{}, new_account:{}",
            account, new_account
        );
        return api_return(ApiCode::ParamMobileError, None, None);
    }
    if !is_sms_code(&code) {
        debug!(
            "Bad code format: account:{}, new_account:{}",
            account, new_account
        );
        return api_return(
            ApiCode::ParamFormatError,
            Some("invalid verification code"),
            None,
        );
    }

    if users::get_by_account(&state.db, &new_account)
        .await?
        .is_some()
    {
        debug!(
            "New account taken: account:{}, new_account:{}",
            account, new_account
        );
        return api_return(ApiCode::ParamError, Some("account already in use"), None);
    }

    let code_id = match check_submitted_code(&state, &new_account, BUSINESS, &code).await? {
        CodeOutcome::Valid { id } => id,
        CodeOutcome::NotFound => {
            debug!(
                "Code rejected: account:{}, new_account:{}",
                account, new_account
            );
            return api_return(ApiCode::ParamCodeError, None, None);
        }
        CodeOutcome::Expired => {
            debug!(
                "Code expired: account:{}, new_account:{}",
                account, new_account
            );
            return api_return(ApiCode::ParamCodeInvalid, None, None);
        }
    };

    if let Err(e) = users::update_account(&state.db, current.user.id, &new_account).await {
        error!(
            "Account change failed: account:{}, new_account:{}, {}",
            account, new_account, e
        );
        return api_return(ApiCode::Failed, Some("change failed"), None);
    }
    codes::mark_used(&state.db, code_id).await?;

    info!(
        "Account changed: account:{}, new_account:{}",
        account, new_account
    );
    api_return(ApiCode::Ok, Some("account updated"), None)
}
