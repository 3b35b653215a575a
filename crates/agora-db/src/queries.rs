use crate::Database;
use crate::models::{ContactMessageRow, JournalRow, ProjectRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

/// Projects joined with their owner's name and the number of votes cast in
/// the last seven days, so one query yields everything the DTO needs.
const PROJECT_SELECT: &str = "
    SELECT p.id, p.user_id, u.display_name, p.name, p.description,
           p.involvement_sought,
           (SELECT COUNT(*) FROM project_votes v
             WHERE v.project_id = p.id
               AND v.created_at >= datetime('now', '-7 days'))
    FROM projects p
    LEFT JOIN users u ON u.id = p.user_id";

impl Database {
    // -- Users --

    /// Insert the user keyed by `email`, or refresh the display name of the
    /// existing row. Returns the local user id either way.
    pub fn upsert_user(&self, email: &str, display_name: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let id = conn.query_row(
                "INSERT INTO users (email, display_name) VALUES (?1, ?2)
                 ON CONFLICT(email) DO UPDATE SET display_name = excluded.display_name
                 RETURNING id",
                (email, display_name),
                |row| row.get(0),
            )?;
            Ok(id)
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, email, display_name FROM users WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(UserRow {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            display_name: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Projects --

    pub fn insert_project(
        &self,
        owner_id: i64,
        name: &str,
        description: &str,
        involvement_sought: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO projects (user_id, name, description, involvement_sought)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![owner_id, name, description, involvement_sought],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_project(&self, id: i64) -> Result<Option<ProjectRow>> {
        self.with_conn(|conn| {
            let sql = format!("{PROJECT_SELECT} WHERE p.id = ?1");
            let row = conn.query_row(&sql, [id], project_from_row).optional()?;
            Ok(row)
        })
    }

    /// All projects, newest first.
    pub fn list_projects(&self) -> Result<Vec<ProjectRow>> {
        self.with_conn(|conn| {
            let sql = format!("{PROJECT_SELECT} ORDER BY p.created_at DESC, p.id DESC");
            query_projects(conn, &sql, rusqlite::params![])
        })
    }

    pub fn list_projects_by_owner(&self, owner_id: i64) -> Result<Vec<ProjectRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{PROJECT_SELECT} WHERE p.user_id = ?1 ORDER BY p.created_at DESC, p.id DESC"
            );
            query_projects(conn, &sql, rusqlite::params![owner_id])
        })
    }

    /// Owner of a project. `None` when the project does not exist,
    /// `Some(None)` when it exists but its owner has been deleted.
    pub fn project_owner(&self, project_id: i64) -> Result<Option<Option<i64>>> {
        self.with_conn(|conn| {
            let owner = conn
                .query_row(
                    "SELECT user_id FROM projects WHERE id = ?1",
                    [project_id],
                    |row| row.get::<_, Option<i64>>(0),
                )
                .optional()?;
            Ok(owner)
        })
    }

    // -- Votes --

    /// Record a vote unless one already exists for the pair. Returns whether
    /// a row was inserted.
    pub fn insert_vote(&self, project_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO project_votes (project_id, user_id) VALUES (?1, ?2)",
                [project_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Intelligence --

    /// (projects created, votes cast) over the last seven days.
    pub fn recent_activity(&self) -> Result<(i64, i64)> {
        self.with_conn(|conn| {
            let projects = conn.query_row(
                "SELECT COUNT(*) FROM projects WHERE created_at >= datetime('now', '-7 days')",
                [],
                |row| row.get(0),
            )?;
            let votes = conn.query_row(
                "SELECT COUNT(*) FROM project_votes WHERE created_at >= datetime('now', '-7 days')",
                [],
                |row| row.get(0),
            )?;
            Ok((projects, votes))
        })
    }

    // -- Journal --

    pub fn insert_journal_entry(&self, author_id: Option<i64>, title: &str, body: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO journal_entries (user_id, title, body) VALUES (?1, ?2, ?3)",
                rusqlite::params![author_id, title, body],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn count_journal_entries(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM journal_entries", [], |row| row.get(0))?;
            Ok(count)
        })
    }

    pub fn get_journal_entry(&self, id: i64) -> Result<Option<JournalRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT je.id, je.title, je.body, je.created_at, u.display_name
                     FROM journal_entries je
                     LEFT JOIN users u ON u.id = je.user_id
                     WHERE je.id = ?1",
                    [id],
                    journal_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// One page of entries, newest first.
    pub fn list_journal_entries(&self, skip: u32, take: u32) -> Result<Vec<JournalRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT je.id, je.title, je.body, je.created_at, u.display_name
                 FROM journal_entries je
                 LEFT JOIN users u ON u.id = je.user_id
                 ORDER BY je.created_at DESC, je.id DESC
                 LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map([take, skip], journal_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Contact messages --

    pub fn insert_contact_message(
        &self,
        sender_id: i64,
        recipient_id: i64,
        project_id: i64,
        body: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO contact_messages (sender_user_id, recipient_user_id, project_id, body)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![sender_id, recipient_id, project_id, body],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Messages addressed to `recipient_id`, newest first.
    pub fn list_contact_messages_for(&self, recipient_id: i64) -> Result<Vec<ContactMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT cm.id, cm.body, cm.created_at, s.display_name, r.display_name, p.name
                 FROM contact_messages cm
                 LEFT JOIN users s ON s.id = cm.sender_user_id
                 LEFT JOIN users r ON r.id = cm.recipient_user_id
                 LEFT JOIN projects p ON p.id = cm.project_id
                 WHERE cm.recipient_user_id = ?1
                 ORDER BY cm.created_at DESC, cm.id DESC",
            )?;
            let rows = stmt
                .query_map([recipient_id], |row| {
                    Ok(ContactMessageRow {
                        id: row.get(0)?,
                        body: row.get(1)?,
                        sent_at: row.get(2)?,
                        sender_name: row.get(3)?,
                        recipient_name: row.get(4)?,
                        project_name: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_projects<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<ProjectRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, project_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        owner_name: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        involvement_sought: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        upvotes_last_7_days: row.get(6)?,
    })
}

fn journal_from_row(row: &Row<'_>) -> rusqlite::Result<JournalRow> {
    Ok(JournalRow {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        created_at: row.get(3)?,
        author_name: row.get(4)?,
    })
}
