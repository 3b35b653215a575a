use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

/// A named schema change. Names sort in application order and are recorded
/// in the `migrations` table once applied.
pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "001_init_schema",
        sql: "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            email           TEXT NOT NULL UNIQUE,
            display_name    TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            is_active       INTEGER
        );

        CREATE TABLE IF NOT EXISTS projects (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id             INTEGER REFERENCES users(id) ON DELETE SET NULL,
            name                TEXT NOT NULL,
            description         TEXT NOT NULL,
            involvement_sought  TEXT,
            created_at          TEXT NOT NULL DEFAULT (datetime('now')),
            is_active           INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_projects_owner
            ON projects(user_id, created_at);

        CREATE TABLE IF NOT EXISTS journal_entries (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER REFERENCES users(id) ON DELETE SET NULL,
            title       TEXT NOT NULL,
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_journal_entries_created
            ON journal_entries(created_at, id);

        CREATE TABLE IF NOT EXISTS contact_messages (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            sender_user_id      INTEGER REFERENCES users(id) ON DELETE SET NULL,
            recipient_user_id   INTEGER REFERENCES users(id) ON DELETE SET NULL,
            project_id          INTEGER REFERENCES projects(id) ON DELETE SET NULL,
            body                TEXT NOT NULL,
            created_at          TEXT NOT NULL DEFAULT (datetime('now')),
            is_active           INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_contact_messages_recipient
            ON contact_messages(recipient_user_id, created_at);

        CREATE TABLE IF NOT EXISTS project_votes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id  INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(project_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_project_votes_created
            ON project_votes(project_id, created_at);
        ",
    },
    Migration {
        name: "002_sessions",
        sql: "
        CREATE TABLE IF NOT EXISTS sessions (
            id           TEXT PRIMARY KEY,
            user_id      INTEGER REFERENCES users(id) ON DELETE CASCADE,
            oauth_state  TEXT,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    },
];

pub fn run(conn: &mut Connection) -> Result<()> {
    apply(conn, MIGRATIONS)
}

/// Apply every migration in `migrations` that has not been recorded yet.
///
/// Each one runs in its own transaction together with its bookkeeping row,
/// so a failure rolls back only that migration and stops the run; the ones
/// before it stay applied.
pub fn apply(conn: &mut Connection, migrations: &[Migration]) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS migrations (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE,
            applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let mut applied = 0;
    for migration in migrations {
        let already: Option<i64> = conn
            .query_row(
                "SELECT id FROM migrations WHERE name = ?1",
                [migration.name],
                |row| row.get(0),
            )
            .optional()?;
        if already.is_some() {
            debug!("Migration {} already applied", migration.name);
            continue;
        }

        info!("Applying migration: {}", migration.name);
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)
            .with_context(|| format!("migration {} failed", migration.name))?;
        tx.execute("INSERT INTO migrations (name) VALUES (?1)", [migration.name])?;
        tx.commit()?;
        applied += 1;
    }

    info!("Database migrations complete ({} applied)", applied);
    Ok(())
}

pub fn applied_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM migrations ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(names)
}
