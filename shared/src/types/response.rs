use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Symbolic names for every business outcome the API can report.
///
/// The mobile client switches on the numeric `code`, never on the HTTP
/// status: every response, success or failure, goes out as HTTP 200 with
/// this envelope.  Numbers are wire contract — do not renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCode {
    Ok,
    Failed,
    Err,

    SmsSendFailed,

    RequestNumberLimit,
    RequestIntervalLimit,

    ParamNotFound,
    ParamError,
    ParamFormatError,
    ParamMobileError,
    ParamCodeError,
    ParamCodeInvalid,

    DataExist,
    DataNotFound,

    TokenNotFound,
    TokenError,
    TokenInvalid,
    TokenChanged,
    TokenExpired,
    TokenUserError,
    TokenUserInvalid,
    TokenPwdError,

    UserNotFound,
    UserInvalid,
    UserPwdError,

    NotFound,
    MethodNotAllowed,
}

impl ApiCode {
    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Failed => 1,
            Self::Err => -1,

            Self::SmsSendFailed => 20,

            Self::RequestNumberLimit => 1000,
            Self::RequestIntervalLimit => 1001,

            Self::ParamNotFound => 1100,
            Self::ParamError => 1102,
            Self::ParamFormatError => 1104,
            Self::ParamMobileError => 1105,
            Self::ParamCodeError => 1109,
            Self::ParamCodeInvalid => 1110,

            Self::DataExist => 2000,
            Self::DataNotFound => 2001,

            Self::TokenNotFound => 2100,
            Self::TokenError => 2101,
            Self::TokenInvalid => 2102,
            Self::TokenChanged => 2103,
            Self::TokenExpired => 2104,
            Self::TokenUserError => 2106,
            Self::TokenUserInvalid => 2107,
            Self::TokenPwdError => 2108,

            Self::UserNotFound => 2201,
            Self::UserInvalid => 2202,
            Self::UserPwdError => 2204,

            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
        }
    }

    /// Default human-readable message, used when the handler does not supply
    /// a more specific one.
    pub fn message(self) -> &'static str {
        match self {
            Self::Ok => "success",
            Self::Failed => "failed",
            Self::Err => "unknown error",

            Self::SmsSendFailed => "failed to send SMS",

            Self::RequestNumberLimit => "too many requests",
            Self::RequestIntervalLimit => "requests too frequent",

            Self::ParamNotFound => "missing parameter",
            Self::ParamError => "invalid parameter",
            Self::ParamFormatError => "malformed parameter",
            Self::ParamMobileError => "invalid mobile number",
            Self::ParamCodeError => "invalid verification code",
            Self::ParamCodeInvalid => "verification code expired",

            Self::DataExist => "data already exists",
            Self::DataNotFound => "data not found",

            Self::TokenNotFound => "missing login token",
            Self::TokenError => "illegal login token",
            Self::TokenInvalid => "login token no longer valid",
            Self::TokenChanged => "login environment changed",
            Self::TokenExpired => "login token expired",
            Self::TokenUserError => "unknown user",
            Self::TokenUserInvalid => "account disabled",
            Self::TokenPwdError => "password has been changed",

            Self::UserNotFound => "account not found",
            Self::UserInvalid => "account disabled",
            Self::UserPwdError => "wrong password",

            Self::NotFound => "endpoint not found",
            Self::MethodNotAllowed => "method not supported",
        }
    }
}

/// The uniform response envelope: `{"code": .., "msg": .., "data": ..}`.
///
/// `data` defaults to an empty string rather than `null` — the mobile
/// client predates null-safe JSON parsing and expects it that way.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiReply {
    pub code: i32,
    pub msg: String,
    pub data: Value,
}

impl ApiReply {
    pub fn new(code: ApiCode, msg: Option<&str>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            msg: msg.unwrap_or_else(|| code.message()).to_string(),
            data: data.unwrap_or_else(|| Value::String(String::new())),
        }
    }

    pub fn ok(data: Value) -> Self {
        Self::new(ApiCode::Ok, None, Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_codes_match_wire_contract() {
        assert_eq!(ApiCode::TokenNotFound.code(), 2100);
        assert_eq!(ApiCode::TokenError.code(), 2101);
        assert_eq!(ApiCode::TokenInvalid.code(), 2102);
        assert_eq!(ApiCode::TokenChanged.code(), 2103);
        assert_eq!(ApiCode::TokenUserError.code(), 2106);
        assert_eq!(ApiCode::TokenUserInvalid.code(), 2107);
    }

    #[test]
    fn ok_is_zero() {
        assert_eq!(ApiCode::Ok.code(), 0);
    }

    #[test]
    fn default_message_used_when_none_given() {
        let reply = ApiReply::new(ApiCode::UserPwdError, None, None);
        assert_eq!(reply.msg, "wrong password");
    }

    #[test]
    fn explicit_message_overrides_default() {
        let reply = ApiReply::new(ApiCode::ParamError, Some("nickname too long"), None);
        assert_eq!(reply.msg, "nickname too long");
    }

    #[test]
    fn missing_data_serializes_as_empty_string() {
        let reply = ApiReply::new(ApiCode::Ok, None, None);
        let v = serde_json::to_value(&reply).unwrap();
        assert_eq!(v["data"], json!(""));
    }

    #[test]
    fn data_payload_passes_through() {
        let reply = ApiReply::ok(json!({"user_id": 7}));
        let v = serde_json::to_value(&reply).unwrap();
        assert_eq!(v["data"]["user_id"], 7);
        assert_eq!(v["code"], 0);
    }
}
