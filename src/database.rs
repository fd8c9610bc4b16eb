use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{error, info, Level};
use logging_timer::timer;
use rusqlite::{params, Connection, OpenFlags};

use crate::config::DbLogin;
use crate::error::SeqStatusError;

const PRELOAD_SQL: &str = r#"
    SELECT s._Sequence_key
    FROM   SEQ_Sequence s
    WHERE  s.division = ?1
      AND  s._SequenceStatus_key = ?2
"#;

/// Executes update statements one batch (one round-trip) at a time.
pub trait BatchExecutor {
    /// Execute every statement in `statements` as a single batch. `batch_no` is 1-based.
    fn execute_batch(&mut self, batch_no: usize, statements: &[String])
        -> Result<(), SeqStatusError>;
}

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Opens an existing database. The file is never created here: a missing
    /// database is a connection failure.
    pub fn connect(login: &DbLogin) -> Result<Self, SeqStatusError> {
        let path = login.database_path();

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| SeqStatusError::ConnectionError {
            path: path.clone(),
            source,
        })?;

        info!("Database opened at: {} (user {})", path.display(), login.user);

        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keys of every sequence in `division` whose status is `status_key`.
    pub fn load_deleted_keys(
        &self,
        division: &str,
        status_key: i64,
    ) -> Result<HashSet<i64>, SeqStatusError> {
        let _tmr = timer!(Level::Trace; "Database.load_deleted_keys", "{}", division);

        let mut stmt = self
            .conn
            .prepare(PRELOAD_SQL)
            .map_err(SeqStatusError::PreloadError)?;

        let rows = stmt
            .query_map(params![division, status_key], |row| row.get::<_, i64>(0))
            .map_err(SeqStatusError::PreloadError)?;

        rows.collect::<Result<HashSet<i64>, _>>()
            .map_err(SeqStatusError::PreloadError)
    }

    /// Starts an update session on this connection. In atomic mode the whole
    /// session runs inside one transaction that commits only in `finish`.
    pub fn update_session(&self, atomic: bool) -> Result<UpdateSession<'_>, SeqStatusError> {
        if atomic {
            self.conn
                .execute_batch("BEGIN IMMEDIATE")
                .map_err(SeqStatusError::TransactionError)?;
        }

        Ok(UpdateSession {
            conn: &self.conn,
            atomic,
            open: atomic,
        })
    }

    pub fn close(self) -> Result<(), SeqStatusError> {
        let Database { conn, path } = self;
        conn.close()
            .map_err(|(_, source)| SeqStatusError::ConnectionError { path, source })
    }
}

/// Batch executor bound to one open connection.
///
/// Without `atomic`, each batch commits in its own transaction and earlier batches
/// stay applied if a later one fails. With `atomic`, nothing is committed until
/// `finish`, and dropping an unfinished session rolls everything back.
pub struct UpdateSession<'a> {
    conn: &'a Connection,
    atomic: bool,
    open: bool,
}

impl UpdateSession<'_> {
    pub fn finish(mut self) -> Result<(), SeqStatusError> {
        if self.open {
            self.conn
                .execute_batch("COMMIT")
                .map_err(SeqStatusError::TransactionError)?;
            self.open = false;
        }
        Ok(())
    }
}

impl BatchExecutor for UpdateSession<'_> {
    fn execute_batch(
        &mut self,
        batch_no: usize,
        statements: &[String],
    ) -> Result<(), SeqStatusError> {
        let _tmr = timer!(Level::Trace; "UpdateSession.execute_batch", "{}", batch_no);

        let sql = statements.join(";\n");
        let to_err = |source| SeqStatusError::StatementError {
            batch: batch_no,
            source,
        };

        if self.atomic {
            self.conn.execute_batch(&sql).map_err(to_err)
        } else {
            let tx = self.conn.unchecked_transaction().map_err(to_err)?;
            tx.execute_batch(&sql).map_err(to_err)?;
            tx.commit().map_err(to_err)
        }
    }
}

impl Drop for UpdateSession<'_> {
    fn drop(&mut self) {
        // Only reachable with an open transaction when an update failed
        if self.open {
            error!("Update session dropped before finishing - rolling back all batches");
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use rusqlite::{params, Connection};

    use crate::config::DbLogin;

    pub const CREATE_SEQUENCE_SQL: &str = r#"
        CREATE TABLE SEQ_Sequence (
            _Sequence_key INTEGER PRIMARY KEY,
            _SequenceStatus_key INTEGER NOT NULL,
            division TEXT NOT NULL
        );
    "#;

    /// Creates `mgd.db` in `dir` holding `(key, status, division)` rows.
    pub fn create_sequence_db(dir: &Path, rows: &[(i64, i64, &str)]) -> DbLogin {
        let login = DbLogin::new(&dir.display().to_string(), "mgd", "mgd_dbo", "pw");
        let conn = Connection::open(login.database_path()).expect("Failed to create test db");
        conn.execute_batch(CREATE_SEQUENCE_SQL)
            .expect("Failed to create schema");
        for (key, status, division) in rows {
            conn.execute(
                "INSERT INTO SEQ_Sequence (_Sequence_key, _SequenceStatus_key, division) VALUES (?, ?, ?)",
                params![key, status, division],
            )
            .expect("Failed to insert sequence");
        }
        login
    }

    pub fn status_of(login: &DbLogin, seq_key: i64) -> i64 {
        let conn = Connection::open(login.database_path()).expect("Failed to open test db");
        conn.query_row(
            "SELECT _SequenceStatus_key FROM SEQ_Sequence WHERE _Sequence_key = ?",
            [seq_key],
            |row| row.get(0),
        )
        .expect("Sequence should exist")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::status::{ACTIVE_STATUS_KEY, DELETED_STATUS_KEY};
    use pretty_assertions::assert_eq;

    fn update_sql(seq_key: i64) -> String {
        format!(
            "UPDATE SEQ_Sequence SET _SequenceStatus_key = {} WHERE _Sequence_key = {}",
            ACTIVE_STATUS_KEY, seq_key
        )
    }

    #[test]
    fn test_connect_missing_database_fails() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let login = DbLogin::new(&dir.path().display().to_string(), "absent", "u", "p");

        let result = Database::connect(&login);
        assert!(matches!(
            result,
            Err(SeqStatusError::ConnectionError { .. })
        ));
        assert!(!login.database_path().exists());
    }

    #[test]
    fn test_load_deleted_keys_filters_division_and_status() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let login = create_sequence_db(
            dir.path(),
            &[
                (10, DELETED_STATUS_KEY, "GSS"),
                (20, DELETED_STATUS_KEY, "GSS"),
                (30, ACTIVE_STATUS_KEY, "GSS"),
                (40, DELETED_STATUS_KEY, "EST"),
            ],
        );

        let db = Database::connect(&login).unwrap();
        let keys = db.load_deleted_keys("GSS", DELETED_STATUS_KEY).unwrap();
        assert_eq!(keys, HashSet::from([10, 20]));
        db.close().unwrap();
    }

    #[test]
    fn test_load_deleted_keys_without_table_is_preload_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let login = DbLogin::new(&dir.path().display().to_string(), "empty", "u", "p");
        Connection::open(login.database_path())
            .unwrap()
            .execute_batch("CREATE TABLE other (x INTEGER)")
            .unwrap();

        let db = Database::connect(&login).unwrap();
        assert!(matches!(
            db.load_deleted_keys("GSS", DELETED_STATUS_KEY),
            Err(SeqStatusError::PreloadError(_))
        ));
    }

    #[test]
    fn test_failed_batch_keeps_earlier_batches() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let login = create_sequence_db(
            dir.path(),
            &[(1, DELETED_STATUS_KEY, "GSS"), (2, DELETED_STATUS_KEY, "GSS")],
        );

        let db = Database::connect(&login).unwrap();
        {
            let mut session = db.update_session(false).unwrap();
            session.execute_batch(1, &[update_sql(1)]).unwrap();
            let result =
                session.execute_batch(2, &[update_sql(2), "UPDATE no_such_table SET x = 1".to_owned()]);
            assert!(matches!(
                result,
                Err(SeqStatusError::StatementError { batch: 2, .. })
            ));
        }
        db.close().unwrap();

        assert_eq!(status_of(&login, 1), ACTIVE_STATUS_KEY);
        assert_eq!(status_of(&login, 2), DELETED_STATUS_KEY);
    }

    #[test]
    fn test_atomic_session_rolls_back_on_drop() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let login = create_sequence_db(
            dir.path(),
            &[(1, DELETED_STATUS_KEY, "GSS"), (2, DELETED_STATUS_KEY, "GSS")],
        );

        let db = Database::connect(&login).unwrap();
        {
            let mut session = db.update_session(true).unwrap();
            session.execute_batch(1, &[update_sql(1)]).unwrap();
            assert!(session
                .execute_batch(2, &["UPDATE no_such_table SET x = 1".to_owned()])
                .is_err());
        }
        db.close().unwrap();

        assert_eq!(status_of(&login, 1), DELETED_STATUS_KEY);
        assert_eq!(status_of(&login, 2), DELETED_STATUS_KEY);
    }

    #[test]
    fn test_atomic_session_commits_on_finish() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let login = create_sequence_db(
            dir.path(),
            &[(1, DELETED_STATUS_KEY, "GSS"), (2, DELETED_STATUS_KEY, "GSS")],
        );

        let db = Database::connect(&login).unwrap();
        let mut session = db.update_session(true).unwrap();
        session.execute_batch(1, &[update_sql(1)]).unwrap();
        session.execute_batch(2, &[update_sql(2)]).unwrap();
        session.finish().unwrap();
        db.close().unwrap();

        assert_eq!(status_of(&login, 1), ACTIVE_STATUS_KEY);
        assert_eq!(status_of(&login, 2), ACTIVE_STATUS_KEY);
    }
}
