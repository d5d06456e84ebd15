use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::Response;
use tracing::info;

use shared::ApiCode;

use crate::auth::clear_token;
use crate::handlers::http::routes::CurrentUser;
use crate::handlers::http::utils::{api_return, ApiRequest};
use crate::AppState;

/// POST /api/logout/ — drop the caller's cached token.  Idempotent from
/// the client's point of view: logging out twice still reports success.
pub async fn logout(
    _req: ApiRequest,
    state: AppState,
    current: CurrentUser,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    clear_token(state.cache.as_ref(), current.user.id).await?;
    info!("Logout: account:{}", current.user.account);
    api_return(ApiCode::Ok, Some("logged out"), None)
}
