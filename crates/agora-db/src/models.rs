//! Database row types. These map directly to SQLite rows and are kept
//! separate from the agora-types DTOs so the storage layer stays independent.

use chrono::{DateTime, NaiveDateTime, Utc};

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub display_name: String,
}

pub struct ProjectRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub owner_name: Option<String>,
    pub name: String,
    pub description: String,
    pub involvement_sought: String,
    pub upvotes_last_7_days: i64,
}

pub struct JournalRow {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub created_at: String,
    pub author_name: Option<String>,
}

pub struct ContactMessageRow {
    pub id: i64,
    pub body: String,
    pub sent_at: String,
    pub sender_name: Option<String>,
    pub recipient_name: Option<String>,
    pub project_name: Option<String>,
}

pub struct SessionRow {
    pub id: String,
    pub user_id: Option<i64>,
    pub oauth_state: Option<String>,
}

/// SQLite stores `datetime('now')` as "YYYY-MM-DD HH:MM:SS" without a
/// timezone; the value is UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}
