use serde_json::{Map, Value};
use tracing::debug;

use crate::auth::ClientInfo;
use crate::handlers::http::utils::headers::get_header_value;

/// Flattened request parameters, whatever the transport.
///
/// The mobile client is inconsistent about how it sends things: JSON
/// bodies, urlencoded forms, and query strings all occur in the wild.
/// Handlers read from one map and never care which it was.  Body fields
/// win over query-string fields of the same name.
#[derive(Debug, Default)]
pub struct RequestData(Map<String, Value>);

impl RequestData {
    pub fn parse(content_type: Option<&str>, query: Option<&str>, body: &[u8]) -> Self {
        let mut map = Map::new();

        if let Some(query) = query {
            for (k, v) in form_urlencoded::parse(query.as_bytes()) {
                map.insert(k.into_owned(), Value::String(v.into_owned()));
            }
        }

        let is_form = content_type
            .map(|ct| ct.contains("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        if is_form {
            for (k, v) in form_urlencoded::parse(body) {
                map.insert(k.into_owned(), Value::String(v.into_owned()));
            }
        } else if let Ok(Value::Object(obj)) = serde_json::from_slice::<Value>(body) {
            // JSON object body; also the fallback for requests that send
            // JSON without a content-type.
            for (k, v) in obj {
                map.insert(k, v);
            }
        } else if !body.is_empty() {
            debug!("request body ignored: not a JSON object or form");
        }

        Self(map)
    }

    #[cfg(test)]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Field as a trimmed string.  Numbers coerce (the client sometimes
    /// sends `"sex": 1` and sometimes `"sex": "1"`); other JSON types
    /// read as absent.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether the field was present at all, regardless of type.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

/// Parameters every client call carries alongside its endpoint-specific
/// ones.  `app_channel`, `os_type` and `device_uuid` are mandatory; the
/// version fields are best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonParams {
    pub app_channel: String,
    pub app_version: String,
    pub os_type: String,
    pub os_version: String,
    pub device_uuid: String,
}

fn has_word_char(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl CommonParams {
    /// Extract and check the common parameters.  `Err` carries the name of
    /// the first offending field.
    pub fn extract(data: &RequestData) -> Result<Self, &'static str> {
        let required = |key: &'static str| -> Result<String, &'static str> {
            let v = data.get_str(key).unwrap_or_default();
            if has_word_char(&v) { Ok(v) } else { Err(key) }
        };

        Ok(Self {
            app_channel: required("app_channel")?,
            os_type: required("os_type")?,
            device_uuid: required("device_uuid")?,
            app_version: data.get_str("app_version").unwrap_or_default(),
            os_version: data.get_str("os_version").unwrap_or_default(),
        })
    }

    /// Device identity string baked into token fingerprints.
    pub fn client_ident(&self) -> String {
        format!(
            "{}-{}-{}",
            self.app_channel, self.os_type, self.device_uuid
        )
    }
}

/// A fully parsed inbound request, handed to every handler.
pub struct ApiRequest {
    pub parts: http::request::Parts,
    pub data: RequestData,
    pub common: CommonParams,
    pub client: ClientInfo,
}

impl ApiRequest {
    /// The presented login token: header first, body field second.
    pub fn token(&self, token_name: &str) -> Option<String> {
        get_header_value(&self.parts.headers, token_name)
            .or_else(|| self.data.get_str(token_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data_from(v: Value) -> RequestData {
        RequestData::parse(
            Some("application/json"),
            None,
            v.to_string().as_bytes(),
        )
    }

    #[test]
    fn json_body_parses() {
        let data = data_from(json!({"account": " 15800881234 ", "sex": 1}));
        assert_eq!(data.get_str("account").as_deref(), Some("15800881234"));
        assert_eq!(data.get_i64("sex"), Some(1));
        assert_eq!(data.get_str("sex").as_deref(), Some("1"));
    }

    #[test]
    fn form_body_parses() {
        let data = RequestData::parse(
            Some("application/x-www-form-urlencoded"),
            None,
            b"account=15800881234&password=p%40ssword",
        );
        assert_eq!(data.get_str("account").as_deref(), Some("15800881234"));
        assert_eq!(data.get_str("password").as_deref(), Some("p@ssword"));
    }

    #[test]
    fn body_wins_over_query() {
        let data = RequestData::parse(
            Some("application/json"),
            Some("account=query&extra=1"),
            json!({"account": "body"}).to_string().as_bytes(),
        );
        assert_eq!(data.get_str("account").as_deref(), Some("body"));
        assert_eq!(data.get_str("extra").as_deref(), Some("1"));
    }

    #[test]
    fn non_object_body_is_ignored() {
        let data = RequestData::parse(Some("application/json"), None, b"[1,2,3]");
        assert!(!data.contains("0"));
    }

    #[test]
    fn numeric_string_parses_as_i64() {
        let data = data_from(json!({"sex": "2"}));
        assert_eq!(data.get_i64("sex"), Some(2));
    }

    #[test]
    fn common_params_extract() {
        let data = data_from(json!({
            "app_channel": "appstore",
            "os_type": "ios",
            "device_uuid": "abc-123",
            "app_version": "2.1.0",
        }));
        let common = CommonParams::extract(&data).unwrap();
        assert_eq!(common.client_ident(), "appstore-ios-abc-123");
        assert_eq!(common.app_version, "2.1.0");
        assert_eq!(common.os_version, "");
    }

    #[test]
    fn missing_required_common_param_names_the_field() {
        let data = data_from(json!({"app_channel": "appstore", "os_type": "ios"}));
        assert_eq!(CommonParams::extract(&data), Err("device_uuid"));

        let data = data_from(json!({"os_type": "ios", "device_uuid": "x"}));
        assert_eq!(CommonParams::extract(&data), Err("app_channel"));
    }

    #[test]
    fn blank_required_common_param_rejected() {
        let data = data_from(json!({
            "app_channel": "  ",
            "os_type": "ios",
            "device_uuid": "abc",
        }));
        assert_eq!(CommonParams::extract(&data), Err("app_channel"));
    }

    fn api_request(headers: &[(&str, &str)], body: Value) -> ApiRequest {
        let mut builder = http::Request::builder().method("POST").uri("/api/logout/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        ApiRequest {
            parts,
            data: data_from(body),
            common: CommonParams::default(),
            client: ClientInfo::default(),
        }
    }

    #[test]
    fn token_in_header_wins_over_body() {
        let req = api_request(
            &[("token", "from-header")],
            json!({"token": "from-body"}),
        );
        assert_eq!(req.token("token").as_deref(), Some("from-header"));
    }

    #[test]
    fn token_falls_back_to_body_field() {
        let req = api_request(&[], json!({"token": "from-body"}));
        assert_eq!(req.token("token").as_deref(), Some("from-body"));
    }

    #[test]
    fn absent_token_is_none() {
        let req = api_request(&[], json!({"account": "15800881234"}));
        assert!(req.token("token").is_none());
    }

    #[test]
    fn token_lookup_honors_configured_name() {
        // The header/field name comes from config, not a hard-coded "token".
        let req = api_request(&[("x-session", "abc")], json!({}));
        assert_eq!(req.token("x-session").as_deref(), Some("abc"));
        assert!(req.token("token").is_none());
    }
}
