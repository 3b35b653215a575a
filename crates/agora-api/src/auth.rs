use axum::{
    Extension, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::{WithRejection, cookie::{Cookie, CookieJar}};
use tracing::{info, warn};

use agora_types::api::{CurrentUser, OAuthCallbackQuery};

use crate::error::ApiError;
use crate::session::{
    AuthUser, RequestContext, SESSION_COOKIE, new_oauth_state, new_session_id, session_cookie,
};
use crate::state::AppState;

/// GET /api/auth/user
pub async fn current_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    // A session can outlive its user row; treat that as signed out.
    let user = state
        .run_db(move |db| db.get_user(user_id))
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(Json(CurrentUser {
        id: user.id,
        name: user.display_name,
        email: user.email,
    }))
}

/// GET /api/auth/login/google
///
/// Stores a fresh anti-forgery token in the session (creating one if the
/// caller has none) and redirects to the provider's consent screen.
pub async fn login_google(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let oauth_state = new_oauth_state();
    let url = state.google.authorization_url(&oauth_state)?;

    // Pruning may remove the caller's own stale session; hand out a new one then.
    let (session_id, fresh) = state
        .run_db(move |db| {
            db.prune_sessions()?;
            let (sid, fresh) = match ctx.session_id {
                Some(id) if db.get_session(&id)?.is_some() => (id, false),
                _ => {
                    let id = new_session_id();
                    db.create_session(&id)?;
                    (id, true)
                }
            };
            db.set_oauth_state(&sid, &oauth_state)?;
            Ok((sid, fresh))
        })
        .await?;

    let jar = if fresh {
        jar.add(session_cookie(session_id, state.cookie_secure))
    } else {
        jar
    };

    Ok((jar, Redirect::to(url.as_str())))
}

/// GET /api/auth/callback/google
///
/// On success the signed-in user is attached to a newly issued session id;
/// the id used during the redirect is discarded.
pub async fn callback_google(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    jar: CookieJar,
    WithRejection(Query(query), _): WithRejection<Query<OAuthCallbackQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(session_id) = ctx.session_id else {
        warn!("OAuth callback without a session");
        return Err(ApiError::InvalidState);
    };

    let presented = query.state.unwrap_or_default();
    let sid = session_id.clone();
    let matched = state
        .run_db(move |db| db.take_oauth_state(&sid, &presented))
        .await?;
    if !matched {
        warn!("OAuth state mismatch");
        return Err(ApiError::InvalidState);
    }

    if let Some(reason) = &query.error {
        warn!("Provider returned error: {}", reason);
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::InvalidPayload("Missing authorization code".into()))?;

    let access_token = state.google.exchange_code(&code).await?;
    let profile = state.google.fetch_profile(&access_token).await?;

    let new_id = new_session_id();
    let sid = new_id.clone();
    let user_id = state
        .run_db(move |db| {
            let user_id = db.upsert_user(&profile.email, &profile.display_name)?;
            db.rotate_session(&session_id, &sid, user_id)?;
            Ok(user_id)
        })
        .await?;

    info!("User {} signed in", user_id);
    let jar = jar.add(session_cookie(new_id, state.cookie_secure));
    Ok((jar, Redirect::to("/")))
}

/// GET /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(session_id) = ctx.session_id {
        state.run_db(move |db| db.delete_session(&session_id)).await?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Redirect::to("/")))
}
