use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

// -- Auth --

/// The signed-in user as returned by `GET /api/auth/user`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    /// Set by the provider when the user denies consent.
    pub error: Option<String>,
}

// -- Projects --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: String,
    pub involvement_sought: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
    pub id: i64,
    pub owner_id: Option<i64>,
    pub owner_name: Option<String>,
    pub name: String,
    pub description: String,
    pub involvement_sought: String,
    pub is_active: bool,
    #[serde(rename = "upvotesLast7Days")]
    pub upvotes_last7_days: i64,
    pub can_edit: bool,
    pub can_upvote: bool,
}

// -- Intelligence --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceSummary {
    pub active_projects: i64,
    pub recent_votes: i64,
}

// -- Journal --

#[derive(Debug, Deserialize)]
pub struct JournalQuery {
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateJournalRequest {
    pub title: String,
    pub body: String,
}

/// Journal posts keep the PascalCase keys the presentation client reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JournalPost {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub author_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalPage {
    pub posts: Vec<JournalPost>,
    pub total_count: i64,
}

// -- Contact --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ContactRequest {
    pub project_id: i64,
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessageDto {
    pub id: i64,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub sender_name: Option<String>,
    pub recipient_name: Option<String>,
    pub project_name: Option<String>,
}
