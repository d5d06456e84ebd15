use sha2::{Digest, Sha512};

/// Hashed in place of the user-agent when the client sent none, so that
/// two UA-less requests from the same device still fingerprint equal.
const NO_USER_AGENT: &str = "unknown";

/// What we know about the calling client, taken from the request.
///
/// `ident` is the composite device identity the mobile app reports in its
/// common parameters (`app_channel-os_type-device_uuid`); browsers and other
/// plain HTTP clients have only a user-agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ident: Option<String>,
}

impl ClientInfo {
    /// Collapse the client environment into a fixed-width fingerprint.
    ///
    /// SHA-512 hex over `"{ident}|{user_agent}"`, or over the user-agent
    /// alone when no device identity was supplied.  Tokens embed this
    /// value; a mismatch on a later request means the login environment
    /// changed.
    pub fn fingerprint(&self) -> String {
        let ua = self.user_agent.as_deref().unwrap_or(NO_USER_AGENT);
        let base = match self.ident.as_deref() {
            Some(ident) if !ident.is_empty() => format!("{}|{}", ident, ua),
            _ => ua.to_string(),
        };

        let mut hasher = Sha512::new();
        hasher.update(base.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(ident: Option<&str>, ua: Option<&str>) -> ClientInfo {
        ClientInfo {
            user_agent: ua.map(str::to_string),
            ident: ident.map(str::to_string),
        }
    }

    #[test]
    fn fingerprint_is_sha512_hex() {
        let fp = client(Some("appstore-ios-abc123"), Some("MyApp/1.0")).fingerprint();
        assert_eq!(fp.len(), 128);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn same_inputs_same_fingerprint() {
        let a = client(Some("appstore-ios-abc123"), Some("MyApp/1.0")).fingerprint();
        let b = client(Some("appstore-ios-abc123"), Some("MyApp/1.0")).fingerprint();
        assert_eq!(a, b);
    }

    #[test]
    fn different_device_different_fingerprint() {
        let a = client(Some("appstore-ios-abc123"), Some("MyApp/1.0")).fingerprint();
        let b = client(Some("appstore-ios-def456"), Some("MyApp/1.0")).fingerprint();
        assert_ne!(a, b);
    }

    #[test]
    fn different_user_agent_different_fingerprint() {
        let a = client(Some("appstore-ios-abc123"), Some("MyApp/1.0")).fingerprint();
        let b = client(Some("appstore-ios-abc123"), Some("MyApp/1.1")).fingerprint();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_ident_falls_back_to_user_agent_only() {
        let with_empty = client(Some(""), Some("MyApp/1.0")).fingerprint();
        let without = client(None, Some("MyApp/1.0")).fingerprint();
        assert_eq!(with_empty, without);
    }

    #[test]
    fn missing_user_agent_is_stable() {
        let a = client(None, None).fingerprint();
        let b = client(None, None).fingerprint();
        assert_eq!(a, b);
    }
}
