use std::sync::Arc;

use tracing::error;

use agora_db::Database;

use crate::error::ApiError;
use crate::google::GoogleClient;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub google: GoogleClient,
    /// Adds `Secure` to the session cookie; enable behind HTTPS.
    pub cookie_secure: bool,
}

impl AppStateInner {
    /// Run a blocking database call off the async runtime.
    pub async fn run_db<F, T>(self: &Arc<Self>, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&state.db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::ConnectionFailed(e.into())
            })?
            .map_err(ApiError::from)
    }
}
