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

const BUSINESS: &str = "register";

/// POST /api/get_register_code/ — send a registration code to a number
/// that does not have an account yet.
pub async fn get_register_code(
    req: ApiRequest,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let account = req.data.get_str("account").unwrap_or_default();

    if !is_mobile(&account) {
        debug!("Bad mobile number: account:{}", account);
        return api_return(ApiCode::ParamMobileError, None, None);
    }

    if users::get_by_account(&state.db, &account).await?.is_some() {
        debug!("Account already exists: account:{}", account);
        return api_return(ApiCode::DataExist, Some("account already exists"), None);
    }

    send_verify_code(&state, &account, BUSINESS).await
}

/// POST /api/register/ — create the account and log it straight in.
pub async fn register(
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

    if users::get_by_account(&state.db, &account).await?.is_some() {
        debug!("Account already exists: account:{}", account);
        return api_return(ApiCode::DataExist, Some("account already exists"), None);
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
    let user = match users::create(&state.db, &account, &hash).await {
        Ok(user) => user,
        Err(e) => {
            error!("Registration failed: account:{}, {}", account, e);
            return api_return(ApiCode::Failed, Some("registration failed"), None);
        }
    };
    codes::mark_used(&state.db, code_id).await?;

    let token = login_user(&state, &req, &user).await?;

    info!("Registered: account:{}, user_id:{}", account, user.id);
    api_return(
        ApiCode::Ok,
        Some("registered"),
        Some(user.login_info(&token)),
    )
}
