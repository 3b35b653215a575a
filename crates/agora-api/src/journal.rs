use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::warn;

use agora_db::models::{JournalRow, parse_timestamp};
use agora_types::api::{CreateJournalRequest, JournalPage, JournalPost, JournalQuery};

use crate::error::{ApiError, required};
use crate::session::RequestContext;
use crate::state::AppState;

const DEFAULT_TAKE: i64 = 10;
const MAX_TAKE: i64 = 100;
const ANONYMOUS_AUTHOR: &str = "Unknown";

/// Clamp paging input to `skip >= 0` and `1 <= take <= 100`.
pub fn page_bounds(query: &JournalQuery) -> (u32, u32) {
    let skip = query.skip.unwrap_or(0).clamp(0, u32::MAX as i64);
    let take = query.take.unwrap_or(DEFAULT_TAKE).clamp(1, MAX_TAKE);
    (skip as u32, take as u32)
}

fn row_to_post(row: JournalRow) -> JournalPost {
    let created_at = parse_timestamp(&row.created_at).unwrap_or_else(|| {
        warn!("Corrupt created_at '{}' on journal entry {}", row.created_at, row.id);
        chrono::DateTime::default()
    });

    JournalPost {
        id: row.id,
        title: row.title,
        body: row.body,
        created_at,
        author_name: row.author_name.unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
    }
}

/// GET /api/journal?skip=&take=
pub async fn list_entries(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<JournalQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let (skip, take) = page_bounds(&query);

    let (total_count, rows) = state
        .run_db(move |db| {
            let total = db.count_journal_entries()?;
            if total == 0 {
                return Ok((0, Vec::new()));
            }
            Ok((total, db.list_journal_entries(skip, take)?))
        })
        .await?;

    Ok(Json(JournalPage {
        posts: rows.into_iter().map(row_to_post).collect(),
        total_count,
    }))
}

/// POST /api/journal
///
/// Open to anonymous callers; the entry is attributed to the session user
/// when there is one.
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    WithRejection(Json(req), _): WithRejection<Json<CreateJournalRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let title = required("title", &req.title)?;
    let body = required("body", &req.body)?;
    let author_id = ctx.user_id;

    let row = state
        .run_db(move |db| {
            let id = db.insert_journal_entry(author_id, &title, &body)?;
            db.get_journal_entry(id)?
                .ok_or_else(|| anyhow::anyhow!("journal entry {} vanished after insert", id))
        })
        .await?;

    Ok((StatusCode::CREATED, Json(row_to_post(row))))
}
