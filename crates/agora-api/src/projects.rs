use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{debug, info};

use agora_db::models::ProjectRow;
use agora_types::api::{CreateProjectRequest, ProjectDto};

use crate::error::{ApiError, required};
use crate::session::{AuthUser, RequestContext};
use crate::state::AppState;

/// Project DTO as seen by `viewer`. Anonymous viewers can neither edit nor
/// upvote; signed-in viewers can edit their own projects and upvote others'.
pub fn project_to_dto(row: ProjectRow, viewer: Option<i64>) -> ProjectDto {
    let is_owner = viewer.is_some() && viewer == row.user_id;

    ProjectDto {
        id: row.id,
        owner_id: row.user_id,
        owner_name: row.owner_name,
        name: row.name,
        description: row.description,
        involvement_sought: row.involvement_sought,
        is_active: true,
        upvotes_last7_days: row.upvotes_last_7_days,
        can_edit: is_owner,
        can_upvote: viewer.is_some() && !is_owner,
    }
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.run_db(|db| db.list_projects()).await?;

    let projects: Vec<ProjectDto> = rows
        .into_iter()
        .map(|row| project_to_dto(row, ctx.user_id))
        .collect();

    Ok(Json(projects))
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    WithRejection(Json(req), _): WithRejection<Json<CreateProjectRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let name = required("name", &req.name)?;
    let description = required("description", &req.description)?;
    let involvement_sought = required("involvementSought", &req.involvement_sought)?;

    let row = state
        .run_db(move |db| {
            let id = db.insert_project(user_id, &name, &description, &involvement_sought)?;
            db.get_project(id)?
                .ok_or_else(|| anyhow::anyhow!("project {} vanished after insert", id))
        })
        .await?;

    info!("User {} created project {}", user_id, row.id);
    Ok((StatusCode::CREATED, Json(project_to_dto(row, Some(user_id)))))
}

/// POST /api/projects/{id}/upvote
///
/// Repeat votes are absorbed: the response is the same refreshed DTO.
pub async fn upvote_project(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    WithRejection(Path(project_id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = state
        .run_db(move |db| db.project_owner(project_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;

    if owner == Some(user_id) {
        return Err(ApiError::InvalidPayload("Cannot upvote your own project".into()));
    }

    let row = state
        .run_db(move |db| {
            if !db.insert_vote(project_id, user_id)? {
                debug!("User {} already voted for project {}", user_id, project_id);
            }
            db.get_project(project_id)
        })
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;

    Ok(Json(project_to_dto(row, Some(user_id))))
}

/// GET /api/my/projects
pub async fn my_projects(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .run_db(move |db| db.list_projects_by_owner(user_id))
        .await?;

    let projects: Vec<ProjectDto> = rows
        .into_iter()
        .map(|row| project_to_dto(row, Some(user_id)))
        .collect();

    Ok(Json(projects))
}
