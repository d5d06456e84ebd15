use std::convert::Infallible;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::{header, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use shared::{ApiCode, ApiReply};

/// Build the uniform `{"code", "msg", "data"}` response.
///
/// Always HTTP 200: business outcomes travel in the envelope's `code`
/// field, never in the status line.  `msg = None` uses the code's default
/// message; `data = None` serializes as `""`.
pub fn api_return(
    code: ApiCode,
    msg: Option<&str>,
    data: Option<Value>,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let reply = ApiReply::new(code, msg, data);
    let json = serde_json::to_string(&reply).context("Failed to serialize response envelope")?;

    debug!("api_return: code={}, size={} bytes", reply.code, json.len());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(json)).boxed())
        .map_err(|e| anyhow!("Failed to build response: {}", e))
}
