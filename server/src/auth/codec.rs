use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything a token carries.  The token is self-contained: validation
/// can run its checks against these claims without a user lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: i64,
    /// Hash of the password the token was issued under.  A password change
    /// makes every older token comparison fail.
    pub password_hash: String,
    /// Client environment fingerprint, see [`crate::auth::ident`].
    pub client_ident: String,
    /// Cache TTL in seconds at issue time.  `0` means the cache entry never
    /// expires and is never refreshed.
    pub lifetime_secs: u64,
    /// Unix seconds at issue.  Later wins when two tokens race.
    pub issued_at: u64,
}

#[derive(Debug, Error)]
#[error("malformed token")]
pub struct DecodeError;

pub fn encode(claims: &TokenClaims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    jsonwebtoken::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Decode and verify the signature.  Expiry is NOT checked here — token
/// lifetime is enforced by the cache TTL, not by the claims.  Any failure
/// collapses into the one opaque [`DecodeError`]; callers have no reason
/// to distinguish a bad signature from garbage input.
pub fn decode(token: &str, secret: &str) -> Result<TokenClaims, DecodeError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| DecodeError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn claims() -> TokenClaims {
        TokenClaims {
            user_id: 42,
            password_hash: "$argon2id$stub".to_string(),
            client_ident: "a".repeat(128),
            lifetime_secs: 604800,
            issued_at: 1_700_000_000,
        }
    }

    #[test]
    fn encode_decode_round_trips() {
        let token = encode(&claims(), SECRET).unwrap();
        let back = decode(&token, SECRET).unwrap();
        assert_eq!(back, claims());
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = encode(&claims(), SECRET).unwrap();
        assert!(decode(&token, "another-secret-another-secret-xx").is_err());
    }

    #[test]
    fn garbage_rejected() {
        assert!(decode("not.a.token", SECRET).is_err());
        assert!(decode("", SECRET).is_err());
    }

    #[test]
    fn zero_lifetime_survives_decode() {
        let mut c = claims();
        c.lifetime_secs = 0;
        let token = encode(&c, SECRET).unwrap();
        assert_eq!(decode(&token, SECRET).unwrap().lifetime_secs, 0);
    }

    proptest! {
        // Flipping any byte of the token must not yield valid claims.
        #[test]
        fn tampered_token_rejected(idx in 0usize..64, bit in 0u8..8) {
            let token = encode(&claims(), SECRET).unwrap();
            let mut bytes = token.into_bytes();
            let i = idx % bytes.len();
            bytes[i] ^= 1 << bit;
            if let Ok(tampered) = String::from_utf8(bytes) {
                if let Ok(back) = decode(&tampered, SECRET) {
                    // The flip may leave the token byte-identical in rare
                    // base64 edge cases; claims must still match exactly.
                    prop_assert_eq!(back, claims());
                }
            }
        }
    }
}
