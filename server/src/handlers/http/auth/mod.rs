pub mod login;
pub mod logout;
pub mod register;

use anyhow::Result;

use crate::auth::create_token;
use crate::database::users::User;
use crate::handlers::http::utils::ApiRequest;
use crate::AppState;

/// Issue a login token for `user` bound to the calling client, making it
/// the account's single live session.
pub async fn login_user(state: &AppState, req: &ApiRequest, user: &User) -> Result<String> {
    let lifetime = state.config.read().await.auth.token_lifetime_secs;
    let token = create_token(
        state.cache.as_ref(),
        &state.secret,
        user.id,
        &user.password_hash,
        &req.client,
        lifetime,
    )
    .await?;
    Ok(token)
}
