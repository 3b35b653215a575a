//! Server-side session store. The cookie only carries the session id; the
//! signed-in user and the pending OAuth anti-forgery token live here.

use crate::Database;
use crate::models::SessionRow;
use anyhow::Result;
use rusqlite::OptionalExtension;
use tracing::debug;

/// Sessions that never finished signing in are dropped after an hour.
pub const ANONYMOUS_SESSION_MAX_AGE: &str = "-1 hours";
/// Signed-in sessions are dropped after thirty days.
pub const AUTHENTICATED_SESSION_MAX_AGE: &str = "-30 days";

impl Database {
    pub fn create_session(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("INSERT INTO sessions (id) VALUES (?1)", [id])?;
            Ok(())
        })
    }

    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, user_id, oauth_state FROM sessions WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(SessionRow {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            oauth_state: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn set_oauth_state(&self, session_id: &str, state: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE sessions SET oauth_state = ?2 WHERE id = ?1",
                [session_id, state],
            )?;
            Ok(())
        })
    }

    /// Clear the stored anti-forgery token and report whether `presented`
    /// matched it. The token is consumed whether or not it matched.
    pub fn take_oauth_state(&self, session_id: &str, presented: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let stored: Option<String> = tx
                .query_row(
                    "SELECT oauth_state FROM sessions WHERE id = ?1",
                    [session_id],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?
                .flatten();
            tx.execute("UPDATE sessions SET oauth_state = NULL WHERE id = ?1", [session_id])?;
            tx.commit()?;

            Ok(stored.is_some_and(|s| s == presented))
        })
    }

    /// Move a session's user onto a fresh id and drop the old row, so the id
    /// a client held before signing in never becomes an authenticated one.
    pub fn rotate_session(&self, old_id: &str, new_id: &str, user_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO sessions (id, user_id) VALUES (?1, ?2)",
                rusqlite::params![new_id, user_id],
            )?;
            tx.execute("DELETE FROM sessions WHERE id = ?1", [old_id])?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Delete expired sessions. Returns the number of rows removed.
    pub fn prune_sessions(&self) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM sessions
                 WHERE (user_id IS NULL AND created_at < datetime('now', ?1))
                    OR created_at < datetime('now', ?2)",
                [ANONYMOUS_SESSION_MAX_AGE, AUTHENTICATED_SESSION_MAX_AGE],
            )?;
            if removed > 0 {
                debug!("Pruned {} expired sessions", removed);
            }
            Ok(removed)
        })
    }

    pub fn delete_session(&self, session_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", [session_id])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    #[test]
    fn oauth_state_is_single_use() {
        let db = Database::open_in_memory().unwrap();
        db.create_session("s1").unwrap();
        db.set_oauth_state("s1", "abc").unwrap();

        assert!(db.take_oauth_state("s1", "abc").unwrap());
        assert!(!db.take_oauth_state("s1", "abc").unwrap());
    }

    #[test]
    fn mismatched_state_is_consumed_too() {
        let db = Database::open_in_memory().unwrap();
        db.create_session("s1").unwrap();
        db.set_oauth_state("s1", "abc").unwrap();

        assert!(!db.take_oauth_state("s1", "xyz").unwrap());
        assert!(db.get_session("s1").unwrap().unwrap().oauth_state.is_none());
        assert!(!db.take_oauth_state("missing", "abc").unwrap());
    }

    fn backdate(db: &Database, id: &str, modifier: &str) {
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE sessions SET created_at = datetime('now', ?2) WHERE id = ?1",
                [id, modifier],
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn prune_drops_stale_anonymous_and_expired_sessions() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_user("ada@example.com", "Ada").unwrap();
        for id in ["fresh-anon", "stale-anon", "pending-1", "pending-2"] {
            db.create_session(id).unwrap();
        }
        db.rotate_session("pending-1", "old-user", user).unwrap();
        db.rotate_session("pending-2", "expired-user", user).unwrap();
        backdate(&db, "stale-anon", "-2 hours");
        backdate(&db, "old-user", "-2 days");
        backdate(&db, "expired-user", "-31 days");

        assert_eq!(db.prune_sessions().unwrap(), 2);

        assert!(db.get_session("fresh-anon").unwrap().is_some());
        assert!(db.get_session("old-user").unwrap().is_some());
        assert!(db.get_session("stale-anon").unwrap().is_none());
        assert!(db.get_session("expired-user").unwrap().is_none());
        assert_eq!(db.prune_sessions().unwrap(), 0);
    }

    #[test]
    fn rotation_moves_user_to_new_id() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_user("ada@example.com", "Ada").unwrap();
        db.create_session("before").unwrap();

        db.rotate_session("before", "after", user).unwrap();

        assert!(db.get_session("before").unwrap().is_none());
        let session = db.get_session("after").unwrap().unwrap();
        assert_eq!(session.user_id, Some(user));
        assert!(session.oauth_state.is_none());
    }

    #[test]
    fn session_user_round_trip_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_user("ada@example.com", "Ada").unwrap();
        db.create_session("pending").unwrap();
        db.rotate_session("pending", "s1", user).unwrap();

        assert_eq!(db.get_session("s1").unwrap().unwrap().user_id, Some(user));

        db.delete_session("s1").unwrap();
        assert!(db.get_session("s1").unwrap().is_none());
    }
}
