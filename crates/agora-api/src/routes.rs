//! Declarative route table: method + path pattern to handler.

use axum::{
    Json, Router,
    extract::OriginalUri,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};

use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePath;
use tower_http::trace::TraceLayer;

use agora_types::api::ErrorBody;

use crate::error::ApiError;
use crate::session::session_context;
use crate::state::AppState;
use crate::{auth, contact, intelligence, journal, projects};

/// Build the `/api` router. Every API route runs behind the session
/// middleware so handlers can read the caller's [`crate::session::RequestContext`].
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Projects
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/projects/{id}/upvote", post(projects::upvote_project))
        .route("/my/projects", get(projects::my_projects))
        // Intelligence
        .route("/intelligence", get(intelligence::summary))
        // Journal
        .route(
            "/journal",
            get(journal::list_entries).post(journal::create_entry),
        )
        // Contact
        .route("/contact", get(contact::inbox).post(contact::send_message))
        // Auth
        .route("/auth/user", get(auth::current_user))
        .route("/auth/login/google", get(auth::login_google))
        .route("/auth/callback/google", get(auth::callback_google))
        .route("/auth/logout", get(auth::logout))
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn_with_state(state.clone(), session_context))
        .with_state(state);

    Router::new().nest("/api", api).fallback(not_found)
}

/// The served application: the API router with CORS and request tracing,
/// wrapped so `/api/projects/` and `/api/projects` reach the same handler.
/// Trimming has to happen before routing, hence the outer wrapper.
pub fn app(state: AppState) -> NormalizePath<Router> {
    let router = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    NormalizePath::trim_trailing_slash(router)
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not found".into(),
            path: Some(uri.path().to_string()),
        }),
    )
}
