//! The SMS verification-code flow shared by registration, password reset
//! and account change: rate-limit, mint, deliver, record — then later
//! check what the client typed back.

use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::Response;
use serde_json::json;
use tracing::{debug, error, info};

use shared::ApiCode;

use crate::database::codes;
use crate::database::utils::{create_business_id, create_numeric_code, get_timestamp};
use crate::handlers::http::utils::api_return;
use crate::AppState;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
const CODE_LENGTH: usize = 6;

/// Issue a verification code to `phone` for one business flow.
///
/// Enforces the per-day cap and the minimum gap between sends, then mints
/// a 6-digit code and records it.  In development the code comes back in
/// the response body and no SMS is sent; in production the SMS gateway
/// must accept the send before the code is recorded.
pub async fn send_verify_code(
    state: &AppState,
    phone: &str,
    business: &str,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let (app_name, interval, development, daily_limit) = {
        let cfg = state.config.read().await;
        (
            cfg.app.name.clone(),
            cfg.sms.code_interval_secs,
            cfg.app.is_development(),
            cfg.sms.daily_limit(business),
        )
    };

    let since = get_timestamp() - SECONDS_PER_DAY;
    let sent_today = codes::count_since(&state.db, &app_name, phone, business, since).await?;
    if sent_today >= daily_limit as i64 {
        debug!(
            "Code request over daily cap: phone:{}, business:{}, sent:{}, cap:{}",
            phone, business, sent_today, daily_limit
        );
        return api_return(ApiCode::RequestNumberLimit, None, None);
    }

    if let Some(last) = codes::latest(&state.db, &app_name, phone, business).await? {
        if get_timestamp() - last.created_at < interval as i64 {
            debug!(
                "Code request too soon: phone:{}, business:{}",
                phone, business
            );
            return api_return(ApiCode::RequestIntervalLimit, None, None);
        }
    }

    let code = create_numeric_code(CODE_LENGTH);
    let (business_id, res_data) = if development {
        // Test builds read the code straight from the response.
        (String::new(), Some(json!({ "code": code })))
    } else {
        let business_id = create_business_id();
        if let Err(e) = state.sms.send_code(phone, &code, &business_id).await {
            error!("SMS send failed: phone:{}, {:#}", phone, e);
            return api_return(ApiCode::SmsSendFailed, None, None);
        }
        (business_id, None)
    };

    if let Err(e) = codes::insert(&state.db, &app_name, phone, business, &code, &business_id).await
    {
        error!("Failed to record code: phone:{}, {}", phone, e);
        return api_return(ApiCode::Failed, None, None);
    }

    info!(
        "Verification code issued: phone:{}, business:{}",
        phone, business
    );
    api_return(ApiCode::Ok, None, res_data)
}

/// Verdict on a code the client typed back.
pub enum CodeOutcome {
    /// Row id of the matching code, for `mark_used`.
    Valid { id: i64 },
    /// No live code matches — wrong code, wrong flow, or already used.
    NotFound,
    /// The code matched but sat unused past its validity window.
    Expired,
}

pub async fn check_submitted_code(
    state: &AppState,
    phone: &str,
    business: &str,
    code: &str,
) -> Result<CodeOutcome> {
    let (app_name, valid_secs) = {
        let cfg = state.config.read().await;
        (cfg.app.name.clone(), cfg.sms.code_valid_secs)
    };

    let Some(row) = codes::find_unused(&state.db, &app_name, phone, business, code).await? else {
        return Ok(CodeOutcome::NotFound);
    };
    if get_timestamp() - row.created_at > valid_secs as i64 {
        return Ok(CodeOutcome::Expired);
    }
    Ok(CodeOutcome::Valid { id: row.id })
}
