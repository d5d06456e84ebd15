pub mod codec;
pub mod ident;
pub mod tokens;

pub use codec::TokenClaims;
pub use ident::ClientInfo;
pub use tokens::{clear_token, create_token, validate_token, AuthSession, TokenError};
