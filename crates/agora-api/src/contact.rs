use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};

use agora_db::models::parse_timestamp;
use agora_types::api::{ContactMessageDto, ContactRequest, StatusResponse};

use crate::error::{ApiError, required};
use crate::session::AuthUser;
use crate::state::AppState;

/// POST /api/contact
///
/// Sends a message to the owner of `projectId`.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(sender_id): AuthUser,
    WithRejection(Json(req), _): WithRejection<Json<ContactRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let body = required("body", &req.body)?;
    if req.project_id <= 0 {
        return Err(ApiError::InvalidPayload("Invalid payload: projectId is required".into()));
    }
    let project_id = req.project_id;

    let recipient_id = state
        .run_db(move |db| db.project_owner(project_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?
        .ok_or_else(|| ApiError::NotFound("Project owner not found".into()))?;

    state
        .run_db(move |db| db.insert_contact_message(sender_id, recipient_id, project_id, &body))
        .await?;

    info!("User {} contacted owner of project {}", sender_id, project_id);
    Ok((
        StatusCode::CREATED,
        Json(StatusResponse {
            status: "ok".into(),
        }),
    ))
}

/// GET /api/contact
///
/// Messages where the caller is the recipient, newest first.
pub async fn inbox(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .run_db(move |db| db.list_contact_messages_for(user_id))
        .await?;

    let messages: Vec<ContactMessageDto> = rows
        .into_iter()
        .map(|row| ContactMessageDto {
            sent_at: parse_timestamp(&row.sent_at).unwrap_or_else(|| {
                warn!("Corrupt created_at '{}' on contact message {}", row.sent_at, row.id);
                chrono::DateTime::default()
            }),
            id: row.id,
            body: row.body,
            sender_name: row.sender_name,
            recipient_name: row.recipient_name,
            project_name: row.project_name,
        })
        .collect();

    Ok(Json(messages))
}
