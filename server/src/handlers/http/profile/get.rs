use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::Response;
use serde_json::json;
use tracing::{error, info};

use shared::ApiCode;

use crate::database::users;
use crate::handlers::http::routes::CurrentUser;
use crate::handlers::http::utils::{api_return, ApiRequest};
use crate::AppState;

/// POST /api/get_user_info/ — the caller's own profile.
///
/// Piggybacks a version refresh: if the app or OS version in the common
/// parameters moved on from what is stored, record the new ones.
pub async fn get_user_info(
    req: ApiRequest,
    state: AppState,
    current: CurrentUser,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let user = &current.user;

    let data = json!({
        "user_id": user.id,
        "account": user.account,
        "nickname": user.nickname,
        "avatar_url": user.avatar_url,
        "sex": user.sex,
        "birthday": user.birthday.as_deref().unwrap_or(""),
        "age": user.age(),
        "remark": user.remark,
    });

    if req.common.app_version != user.app_version || req.common.os_version != user.os_version {
        if let Err(e) = users::update_versions(
            &state.db,
            user.id,
            &req.common.app_version,
            &req.common.os_version,
        )
        .await
        {
            error!(
                "Profile read succeeded but version update failed: account:{}, {}",
                user.account, e
            );
        }
    }

    info!(
        "Profile read: account:{}, app_version:{}, os_version:{}",
        user.account, req.common.app_version, req.common.os_version
    );
    api_return(ApiCode::Ok, None, Some(data))
}
