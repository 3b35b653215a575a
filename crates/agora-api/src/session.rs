use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "agora_session";

/// Per-request view of the caller's session, attached by [`session_context`].
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub session_id: Option<String>,
    pub user_id: Option<i64>,
}

/// Id of the signed-in user. Rejects with 401 when the session is anonymous,
/// before any body is read.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .and_then(|ctx| ctx.user_id)
            .map(AuthUser)
            .ok_or(ApiError::Unauthenticated)
    }
}

/// Resolve the session cookie into a [`RequestContext`] extension. Unknown
/// or missing ids yield an anonymous context.
pub async fn session_context(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = match jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        Some(id) => {
            let row = state.run_db(move |db| db.get_session(&id)).await?;
            match row {
                Some(row) => RequestContext {
                    session_id: Some(row.id),
                    user_id: row.user_id,
                },
                None => {
                    debug!("Ignoring unknown session cookie");
                    RequestContext::default()
                }
            }
        }
        None => RequestContext::default(),
    };

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

pub fn session_cookie(id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn new_session_id() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// Anti-forgery token for the OAuth redirect.
pub fn new_oauth_state() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}
