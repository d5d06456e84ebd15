use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use chrono::Local;
use http_body_util::combinators::BoxBody;
use hyper::Response;
use tracing::{debug, error, info};

use shared::ApiCode;

use crate::database::users;
use crate::handlers::http::routes::CurrentUser;
use crate::handlers::http::utils::validate::parse_date;
use crate::handlers::http::utils::{api_return, ApiRequest};
use crate::AppState;

const NICKNAME_MAX: usize = 30;
const REMARK_MAX: usize = 250;

/// POST /api/update_user/ — partial profile edit.  Only the fields the
/// client sends are touched; each is validated before anything is written.
pub async fn update_user(
    req: ApiRequest,
    state: AppState,
    current: CurrentUser,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let account = &current.user.account;

    let nickname = match req.data.get_str("nickname") {
        Some(n) => {
            let count = n.chars().count();
            if count < 1 || count > NICKNAME_MAX {
                debug!("Nickname length rejected: account:{}, nickname:{}", account, n);
                return api_return(
                    ApiCode::ParamError,
                    Some("nickname must be 1-30 characters"),
                    None,
                );
            }
            Some(n)
        }
        None => None,
    };

    let sex = if req.data.contains("sex") {
        match req.data.get_i64("sex") {
            Some(s @ (1 | 2)) => Some(s),
            _ => {
                debug!("Sex value rejected: account:{}", account);
                return api_return(ApiCode::ParamError, Some("invalid sex value"), None);
            }
        }
    } else {
        None
    };

    let birthday = match req.data.get_str("birthday") {
        Some(b) => {
            // Must be a real date strictly before today.  Stored
            // normalized so later comparisons stay textual.
            match parse_date(&b) {
                Some(date) if date < Local::now().date_naive() => {
                    Some(date.format("%Y-%m-%d").to_string())
                }
                _ => {
                    debug!("Birthday rejected: account:{}, birthday:{}", account, b);
                    return api_return(ApiCode::ParamError, Some("invalid birthday"), None);
                }
            }
        }
        None => None,
    };

    let remark = match req.data.get_str("remark") {
        Some(r) => {
            if r.chars().count() > REMARK_MAX {
                debug!("Remark length rejected: account:{}", account);
                return api_return(
                    ApiCode::ParamError,
                    Some("remark must be under 250 characters"),
                    None,
                );
            }
            Some(r)
        }
        None => None,
    };

    if let Err(e) = users::update_profile(
        &state.db,
        current.user.id,
        nickname.as_deref(),
        sex,
        birthday.as_deref(),
        remark.as_deref(),
    )
    .await
    {
        error!("Profile update failed: account:{}, {}", account, e);
        return api_return(ApiCode::Failed, Some("update failed"), None);
    }

    info!("Profile updated: account:{}", account);
    api_return(ApiCode::Ok, Some("updated"), None)
}
