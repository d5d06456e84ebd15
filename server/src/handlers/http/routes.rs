use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt};
use hyper::{Method, Request, Response};
use tracing::{debug, error, warn};

use shared::ApiCode;

use crate::auth::{validate_token, AuthSession, ClientInfo, TokenError};
use crate::database::users::{self, User};
use crate::handlers::http::utils::headers::get_user_agent;
use crate::handlers::http::utils::{api_return, ApiRequest, RequestData};
use crate::handlers::http::utils::request_data::CommonParams;
use crate::handlers::http::{account, auth, profile};
use crate::AppState;

// ---------------------------------------------------------------------------
// Handler type aliases
// ---------------------------------------------------------------------------
//
// Two security tiers:
//
//   OpenHandler  — no auth.  Receives (req, state).
//                  Use for: register, login, password reset.
//
//   AuthHandler  — full token validation + user row load.
//                  Receives (req, state, user).
//                  Use for: everything a logged-in user does.

type OpenHandler = Box<
    dyn Fn(
            ApiRequest,
            AppState,
        )
            -> Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>
        + Send
        + Sync,
>;

type AuthHandler = Box<
    dyn Fn(
            ApiRequest,
            AppState,
            CurrentUser, // validated by the router
        )
            -> Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>
        + Send
        + Sync,
>;

/// The authenticated caller: the accepted token's session plus the user
/// row it resolved to.  Built by the router; handlers never re-validate.
pub struct CurrentUser {
    pub session: AuthSession,
    pub user: User,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

enum RouteKind {
    /// No authentication check.
    Open(OpenHandler),
    /// Token pipeline + user load before the handler runs.
    Auth(AuthHandler),
}

struct Route {
    method: Method,
    path: String,
    kind: RouteKind,
}

pub struct Router {
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    // ── Open (no auth) ────────────────────────────────────────────────────

    /// POST with no authentication — register / login / reset flows only.
    pub fn post<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(ApiRequest, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::POST,
            path: path.to_string(),
            kind: RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    // ── Auth (token pipeline + user load) ─────────────────────────────────
    //
    // The router runs the whole validation pipeline before the handler is
    // called.  Handlers receive the resolved `CurrentUser` and must NOT
    // call any auth function themselves.

    /// POST guarded by token auth.
    pub fn post_auth<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(ApiRequest, AppState, CurrentUser) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::POST,
            path: path.to_string(),
            kind: RouteKind::Auth(Box::new(move |req, state, user| {
                Box::pin(handler(req, state, user))
            })),
        });
        self
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    pub async fn route(
        &self,
        req: Request<hyper::body::Incoming>,
        state: AppState,
    ) -> Result<Response<BoxBody<Bytes, Infallible>>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let Some(route) = self
            .routes
            .iter()
            .find(|r| Self::path_matches(&r.path, &path))
        else {
            warn!("No route for {} {}", method, path);
            return api_return(ApiCode::NotFound, None, None);
        };

        if route.method != method {
            warn!("Method {} not allowed on {}", method, path);
            return api_return(ApiCode::MethodNotAllowed, None, None);
        }

        // Buffer the body once and flatten body + query into one parameter
        // map; handlers never see the raw stream.
        let (parts, body) = req.into_parts();
        let bytes = body.collect().await?.to_bytes();
        let content_type = parts
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = RequestData::parse(content_type.as_deref(), parts.uri.query(), &bytes);

        let common = match CommonParams::extract(&data) {
            Ok(common) => common,
            Err(field) => {
                warn!("Common parameter rejected on {}: {}", path, field);
                return api_return(
                    ApiCode::ParamError,
                    Some(&format!("invalid common parameter: {}", field)),
                    None,
                );
            }
        };

        let client = ClientInfo {
            user_agent: get_user_agent(&parts.headers),
            ident: Some(common.client_ident()),
        };
        let api_req = ApiRequest {
            parts,
            data,
            common,
            client,
        };

        match &route.kind {
            RouteKind::Open(h) => h(api_req, state).await,
            RouteKind::Auth(h) => match authenticate(&api_req, &state).await {
                Ok(user) => h(api_req, state, user).await,
                Err(err) => token_error_response(&method, &path, err),
            },
        }
    }

    // ── Path matching ─────────────────────────────────────────────────────

    pub fn path_matches(route_path: &str, request_path: &str) -> bool {
        // Strip query string, then ignore a trailing slash on either side —
        // client builds are split on whether they send one.
        let clean = request_path.split('?').next().unwrap_or(request_path);
        let clean = if clean.len() > 1 {
            clean.trim_end_matches('/')
        } else {
            clean
        };
        let route = if route_path.len() > 1 {
            route_path.trim_end_matches('/')
        } else {
            route_path
        };

        route == clean
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Auth guard
// ---------------------------------------------------------------------------

/// Run the token pipeline and resolve the user row.
///
/// Rejection order: missing token, decode failure, fingerprint mismatch,
/// cache verdict, unknown user, disabled account.  Handlers behind
/// `post_auth` only ever see callers that passed all six.
async fn authenticate(req: &ApiRequest, state: &AppState) -> Result<CurrentUser, TokenError> {
    let token_name = state.config.read().await.auth.token_name.clone();
    let token = req.token(&token_name).ok_or(TokenError::NotFound)?;

    let session = validate_token(state.cache.as_ref(), &state.secret, &token, &req.client).await?;

    let user = users::get_by_id(&state.db, session.user_id)
        .await
        .map_err(|e| TokenError::Internal(e.to_string()))?
        .ok_or(TokenError::UnknownUser {
            user_id: session.user_id,
        })?;

    if !user.is_active() {
        return Err(TokenError::Disabled {
            user_id: user.id,
            account: user.account.clone(),
        });
    }

    Ok(CurrentUser { session, user })
}

fn token_error_response(
    method: &Method,
    path: &str,
    err: TokenError,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    match &err {
        TokenError::Cache(_) | TokenError::Internal(_) => {
            error!("Auth backend failure on {} {}: {}", method, path, err)
        }
        _ => debug!("Auth rejected {} {}: {}", method, path, err),
    }
    api_return(err.api_code(), None, None)
}

// ---------------------------------------------------------------------------
// Route table
//
// Auth tier is enforced here at the routing level — handlers MUST NOT
// repeat the auth call.  The contract is:
//
//   .post(...)       → Open  — handler gets (req, state)
//   .post_auth(...)  → Auth  — handler gets (req, state, current)
// ---------------------------------------------------------------------------

pub fn build_router() -> Router {
    Router::new()
        // ── Public: no auth ──────────────────────────────────────────────
        //
        // The only routes where auth is intentionally absent: everything a
        // user can do before (or instead of) being logged in.
        .post("/api/get_register_code/", |req, state| async move {
            auth::register::get_register_code(req, state).await
        })
        .post("/api/register/", |req, state| async move {
            auth::register::register(req, state).await
        })
        .post("/api/login/", |req, state| async move {
            auth::login::login(req, state).await
        })
        .post("/api/get_reset_password_code/", |req, state| async move {
            account::reset::get_reset_password_code(req, state).await
        })
        .post("/api/reset_password/", |req, state| async move {
            account::reset::reset_password(req, state).await
        })
        // ── Token auth ───────────────────────────────────────────────────
        .post_auth("/api/logout/", |req, state, current| async move {
            auth::logout::logout(req, state, current).await
        })
        .post_auth("/api/get_user_info/", |req, state, current| async move {
            profile::get::get_user_info(req, state, current).await
        })
        .post_auth("/api/update_user/", |req, state, current| async move {
            profile::update::update_user(req, state, current).await
        })
        .post_auth("/api/update_password/", |req, state, current| async move {
            profile::password::update_password(req, state, current).await
        })
        .post_auth(
            "/api/get_change_account_code/",
            |req, state, current| async move {
                account::change::get_change_account_code(req, state, current).await
            },
        )
        .post_auth("/api/change_account/", |req, state, current| async move {
            account::change::change_account(req, state, current).await
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
