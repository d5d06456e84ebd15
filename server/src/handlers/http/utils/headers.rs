use hyper::header::HeaderMap;
use tracing::debug;

/// Extract a header value as a string.
pub fn get_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(|s| {
        debug!("Retrieved header: {}", name);
        s.to_string()
    })
}

/// Extract the user-agent string.
pub fn get_user_agent(headers: &HeaderMap) -> Option<String> {
    get_header_value(headers, "user-agent")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn present_header_is_returned() {
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", HeaderValue::from_static("MyApp/1.0"));
        assert_eq!(get_user_agent(&headers).as_deref(), Some("MyApp/1.0"));
    }

    #[test]
    fn missing_header_is_none() {
        let headers = HeaderMap::new();
        assert!(get_header_value(&headers, "token").is_none());
    }

    #[test]
    fn non_utf8_header_is_none() {
        let mut headers = HeaderMap::new();
        headers.insert("token", HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());
        assert!(get_header_value(&headers, "token").is_none());
    }
}
