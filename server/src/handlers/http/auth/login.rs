use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::Response;
use tracing::{debug, error, info};

use shared::ApiCode;

use crate::database::users;
use crate::database::utils::verify_password;
use crate::handlers::http::auth::login_user;
use crate::handlers::http::utils::validate::{is_mobile, is_password};
use crate::handlers::http::utils::{api_return, ApiRequest};
use crate::AppState;

/// POST /api/login/ — password login.  Issues a fresh token, which also
/// signs out any session the account had on another device.
pub async fn login(
    req: ApiRequest,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let account = req.data.get_str("account").unwrap_or_default();
    let password = req.data.get_str("password").unwrap_or_default();

    if !is_mobile(&account) {
        debug!("Bad mobile number: account:{}", account);
        return api_return(ApiCode::ParamMobileError, None, None);
    }
    if !is_password(&password) {
        debug!("Bad password format: account:{}", account);
        return api_return(ApiCode::ParamFormatError, Some("invalid password"), None);
    }

    let Some(user) = users::get_by_account(&state.db, &account).await? else {
        debug!("Unknown account: account:{}", account);
        return api_return(ApiCode::UserNotFound, None, None);
    };
    if !user.is_active() {
        debug!("Disabled account: account:{}, status:{}", account, user.status);
        return api_return(ApiCode::UserInvalid, None, None);
    }
    if !verify_password(&password, &user.password_hash) {
        debug!("Wrong password: account:{}", account);
        return api_return(ApiCode::UserPwdError, None, None);
    }

    // Record the client environment; login still succeeds if this write
    // fails.
    if let Err(e) = users::update_client_info(
        &state.db,
        user.id,
        &req.common.app_channel,
        &req.common.app_version,
        &req.common.os_type,
        &req.common.os_version,
    )
    .await
    {
        error!(
            "Login succeeded but client info update failed: account:{}, {}",
            account, e
        );
    }

    let token = login_user(&state, &req, &user).await?;

    info!(
        "Login: account:{}, app_channel:{}, app_version:{}, os_type:{}, os_version:{}",
        account,
        req.common.app_channel,
        req.common.app_version,
        req.common.os_type,
        req.common.os_version
    );
    api_return(
        ApiCode::Ok,
        Some("login successful"),
        Some(user.login_info(&token)),
    )
}
