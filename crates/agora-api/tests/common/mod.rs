#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use tower_http::normalize_path::NormalizePath;

use agora_api::config::GoogleConfig;
use agora_api::google::GoogleClient;
use agora_api::routes;
use agora_api::session::SESSION_COOKIE;
use agora_api::state::{AppState, AppStateInner};
use agora_db::Database;

pub const REDIRECT_URI: &str = "http://localhost:3000/api/auth/callback/google";

pub struct TestApp {
    pub state: AppState,
    pub router: NormalizePath<Router>,
}

impl TestApp {
    /// App whose provider endpoints point nowhere; fine for non-OAuth tests.
    pub fn new() -> Self {
        Self::with_provider("http://127.0.0.1:9")
    }

    pub fn with_provider(base: &str) -> Self {
        let google = GoogleConfig {
            client_id: "test-client".into(),
            client_secret: "test-secret".into(),
            redirect_uri: REDIRECT_URI.into(),
            auth_url: format!("{base}/auth"),
            token_url: format!("{base}/token"),
            userinfo_url: format!("{base}/userinfo"),
        };
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().expect("in-memory db"),
            google: GoogleClient::new(google),
            cookie_secure: false,
        });
        let router = routes::app(state.clone());
        Self { state, router }
    }

    /// Create a user plus an authenticated session; returns the user id and
    /// a `Cookie` header value for that session.
    pub fn sign_in(&self, email: &str, name: &str) -> (i64, String) {
        let user_id = self.state.db.upsert_user(email, name).expect("upsert user");
        let pending = format!("test-pending-{user_id}");
        let session_id = format!("test-session-{user_id}");
        self.state.db.create_session(&pending).expect("create session");
        self.state
            .db
            .rotate_session(&pending, &session_id, user_id)
            .expect("rotate session");
        (user_id, format!("{SESSION_COOKIE}={session_id}"))
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, cookie: Option<&str>, body: Value) -> Response<Body> {
        self.post_raw(uri, cookie, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, cookie: Option<&str>, body: String) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub fn project_count(&self) -> i64 {
        self.scalar("SELECT COUNT(*) FROM projects", [])
    }

    pub fn vote_count(&self, project_id: i64) -> i64 {
        self.scalar(
            "SELECT COUNT(*) FROM project_votes WHERE project_id = ?1",
            [project_id],
        )
    }

    pub fn contact_count(&self) -> i64 {
        self.scalar("SELECT COUNT(*) FROM contact_messages", [])
    }

    pub fn session_count(&self) -> i64 {
        self.scalar("SELECT COUNT(*) FROM sessions", [])
    }

    pub fn execute<const N: usize>(&self, sql: &str, params: [i64; N]) {
        self.state
            .db
            .with_conn(|conn| {
                conn.execute(sql, rusqlite::params_from_iter(params))?;
                Ok(())
            })
            .unwrap()
    }

    fn scalar<const N: usize>(&self, sql: &str, params: [i64; N]) -> i64 {
        self.state
            .db
            .with_conn(|conn| Ok(conn.query_row(sql, rusqlite::params_from_iter(params), |r| r.get(0))?))
            .unwrap()
    }
}

pub async fn json_body(resp: Response<Body>) -> Value {
    let bytes = resp.into_body().collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn header_value(resp: &Response<Body>, name: header::HeaderName) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// The `name=value` pair from the response's Set-Cookie header, ready to be
/// sent back as a Cookie header.
pub fn session_pair(resp: &Response<Body>) -> Option<String> {
    header_value(resp, header::SET_COOKIE)
        .and_then(|v| v.split(';').next().map(str::to_string))
}
