use axum::{Json, extract::State, response::IntoResponse};

use agora_types::api::IntelligenceSummary;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/intelligence: activity over the last seven days.
pub async fn summary(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let (active_projects, recent_votes) = state.run_db(|db| db.recent_activity()).await?;

    Ok(Json(IntelligenceSummary {
        active_projects,
        recent_votes,
    }))
}
