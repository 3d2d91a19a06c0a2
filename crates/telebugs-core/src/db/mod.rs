//! SQLite storage access for the Telebugs database.
//!
//! The database belongs to the Telebugs application; this crate only reads it
//! and applies narrow guarded writes. Runtime defaults match the app's own:
//! - `journal_mode = WAL` so reads never block the app's writer
//! - `busy_timeout` so writes wait out the app's lock instead of failing
//! - `foreign_keys = ON`
//!
//! Three primitives only: [`Store::query_many`], [`Store::query_one`] and
//! [`Store::execute_write`]. Every value is bound as a parameter; SQL text is
//! assembled only from static fragments and `?N` placeholders.

pub mod filter;
pub mod schema;

use crate::config::ServerConfig;
use crate::error::{StoreContext, StoreError};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params_from_iter};
use std::time::Duration;
use tracing::{debug, trace};

/// Handle to the relational store. One per session/connection.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

/// One statement of a multi-statement write.
#[derive(Debug, Clone)]
pub struct WriteStatement {
    sql: &'static str,
    params: Vec<Value>,
    expected_rows: Option<usize>,
}

impl WriteStatement {
    #[must_use]
    pub const fn new(sql: &'static str, params: Vec<Value>) -> Self {
        Self {
            sql,
            params,
            expected_rows: None,
        }
    }

    /// Roll the whole write back unless this statement changes exactly `rows`.
    #[must_use]
    pub const fn expect_rows(mut self, rows: usize) -> Self {
        self.expected_rows = Some(rows);
        self
    }
}

/// Per-write summary for a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// Rows changed by each statement, in order.
    pub affected: Vec<usize>,
    /// `last_insert_rowid()` observed before commit.
    pub last_insert_rowid: i64,
}

/// Result of [`Store::execute_write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Committed(WriteSummary),
    /// A statement's row guard did not hold; nothing was applied.
    RolledBack { statement: usize, affected: usize },
}

impl Store {
    /// Open an existing Telebugs database and apply runtime pragmas.
    ///
    /// The file is never created: a missing database is an open failure.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] or [`StoreError::Configure`].
    pub fn open(config: &ServerConfig) -> Result<Self, StoreError> {
        let path = &config.database_path;
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;

        configure_connection(&conn, config.busy_timeout()).map_err(StoreError::Configure)?;
        debug!(path = %path.display(), "opened telebugs database");
        Ok(Self { conn })
    }

    /// Wrap an already-open connection (fixtures, in-memory databases).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Configure`] if pragmas cannot be applied.
    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(StoreError::Configure)?;
        Ok(Self { conn })
    }

    /// Borrow the raw connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run a read query and map every row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if preparing, binding, or reading fails.
    pub fn query_many<T, F>(
        &self,
        op: &'static str,
        sql: &str,
        params: &[Value],
        map: F,
    ) -> Result<Vec<T>, StoreError>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        trace!(op, sql, "query_many");
        let mut stmt = self.conn.prepare(sql).op(op)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), map).op(op)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.op(op)?);
        }
        Ok(out)
    }

    /// Run a read query expected to yield at most one row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the query fails.
    pub fn query_one<T, F>(
        &self,
        op: &'static str,
        sql: &str,
        params: &[Value],
        map: F,
    ) -> Result<Option<T>, StoreError>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        trace!(op, sql, "query_one");
        let mut stmt = self.conn.prepare(sql).op(op)?;
        stmt.query_row(params_from_iter(params.iter()), map)
            .optional()
            .op(op)
    }

    /// Run a `SELECT COUNT(*) ...` style query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the query fails.
    pub fn count(&self, op: &'static str, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        let count: Option<i64> = self.query_one(op, sql, params, |row| row.get(0))?;
        Ok(count.and_then(|c| u64::try_from(c).ok()).unwrap_or(0))
    }

    /// Apply `statements` atomically.
    ///
    /// Either every statement commits or none does. A statement built with
    /// [`WriteStatement::expect_rows`] that changes a different number of rows
    /// rolls the transaction back and yields [`WriteOutcome::RolledBack`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transaction`] if any statement or the commit fails;
    /// the transaction is rolled back on drop.
    pub fn execute_write(
        &self,
        op: &'static str,
        statements: &[WriteStatement],
    ) -> Result<WriteOutcome, StoreError> {
        self.execute_write_then(op, statements, |_| Ok(()))
            .map(|(outcome, _)| outcome)
    }

    /// [`Store::execute_write`], then `read` inside the same transaction just
    /// before commit. The read result is returned only when the write commits.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transaction`] if a statement, the read, or the
    /// commit fails.
    pub fn execute_write_then<T, F>(
        &self,
        op: &'static str,
        statements: &[WriteStatement],
        read: F,
    ) -> Result<(WriteOutcome, Option<T>), StoreError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let tx_err = |source| StoreError::Transaction { op, source };

        let tx = self.conn.unchecked_transaction().map_err(tx_err)?;
        let mut affected = Vec::with_capacity(statements.len());

        for (index, statement) in statements.iter().enumerate() {
            trace!(op, sql = statement.sql, "execute_write statement");
            let changed = tx
                .execute(statement.sql, params_from_iter(statement.params.iter()))
                .map_err(tx_err)?;

            if statement.expected_rows.is_some_and(|expected| expected != changed) {
                tx.rollback().map_err(tx_err)?;
                debug!(op, statement = index, changed, "write guard failed, rolled back");
                let outcome = WriteOutcome::RolledBack {
                    statement: index,
                    affected: changed,
                };
                return Ok((outcome, None));
            }
            affected.push(changed);
        }

        let last_insert_rowid = tx.last_insert_rowid();
        let readback = read(&tx).map_err(tx_err)?;
        tx.commit().map_err(tx_err)?;

        let outcome = WriteOutcome::Committed(WriteSummary {
            affected,
            last_insert_rowid,
        });
        Ok((outcome, Some(readback)))
    }
}

fn configure_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Store, WriteOutcome, WriteStatement};
    use crate::config::ServerConfig;
    use crate::error::StoreError;
    use rusqlite::Connection;
    use rusqlite::types::Value;
    use std::time::Duration;

    fn scratch_store() -> Store {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(
            "CREATE TABLE counters (id INTEGER PRIMARY KEY, n INTEGER NOT NULL);
             CREATE TABLE entries (id INTEGER PRIMARY KEY, body TEXT NOT NULL);
             INSERT INTO counters (id, n) VALUES (1, 0);",
        )
        .expect("create scratch tables");
        Store::from_connection(conn).expect("wrap connection")
    }

    fn counter(store: &Store) -> i64 {
        store
            .query_one("counter", "SELECT n FROM counters WHERE id = 1", &[], |row| {
                row.get(0)
            })
            .expect("read counter")
            .expect("counter row")
    }

    #[test]
    fn open_missing_database_fails_without_creating_it() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing.sqlite3");
        let config = ServerConfig {
            database_path: path.clone(),
            ..ServerConfig::default()
        };

        let err = Store::open(&config).unwrap_err();
        assert!(matches!(err, StoreError::Open { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn open_sets_wal_busy_timeout_and_fk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("telebugs.sqlite3");
        Connection::open(&path).expect("create db file");

        let config = ServerConfig {
            database_path: path,
            busy_timeout_ms: 1_500,
        };
        let store = Store::open(&config).expect("open store");
        let conn = store.connection();

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(u128::from(busy_timeout_ms), Duration::from_millis(1_500).as_millis());

        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("query foreign_keys");
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn query_one_absent_row_is_none() {
        let store = scratch_store();
        let found: Option<i64> = store
            .query_one(
                "absent",
                "SELECT n FROM counters WHERE id = ?1",
                &[Value::Integer(99)],
                |row| row.get(0),
            )
            .expect("query");
        assert!(found.is_none());
    }

    #[test]
    fn query_fault_carries_operation_label() {
        let store = scratch_store();
        let err = store
            .query_many("bogus_table", "SELECT * FROM nope", &[], |row| {
                row.get::<_, i64>(0)
            })
            .unwrap_err();
        assert!(err.to_string().contains("bogus_table"), "{err}");
    }

    #[test]
    fn execute_write_commits_all_statements() {
        let store = scratch_store();
        let outcome = store
            .execute_write(
                "insert_and_bump",
                &[
                    WriteStatement::new(
                        "INSERT INTO entries (body) VALUES (?1)",
                        vec![Value::Text("hello".to_string())],
                    ),
                    WriteStatement::new("UPDATE counters SET n = n + 1 WHERE id = 1", vec![])
                        .expect_rows(1),
                ],
            )
            .expect("write");

        let WriteOutcome::Committed(summary) = outcome else {
            panic!("expected commit, got {outcome:?}");
        };
        assert_eq!(summary.affected, vec![1, 1]);
        assert_eq!(summary.last_insert_rowid, 1);
        assert_eq!(counter(&store), 1);
    }

    #[test]
    fn execute_write_guard_mismatch_rolls_back_everything() {
        let store = scratch_store();
        let outcome = store
            .execute_write(
                "guarded",
                &[
                    WriteStatement::new("UPDATE counters SET n = n + 1 WHERE id = 1", vec![]),
                    WriteStatement::new("DELETE FROM entries WHERE id = 42", vec![])
                        .expect_rows(1),
                ],
            )
            .expect("write");

        assert_eq!(
            outcome,
            WriteOutcome::RolledBack {
                statement: 1,
                affected: 0
            }
        );
        assert_eq!(counter(&store), 0);
    }

    #[test]
    fn readback_sees_the_write_and_is_dropped_on_rollback() {
        let store = scratch_store();
        let bump = || {
            WriteStatement::new("UPDATE counters SET n = n + 1 WHERE id = 1 AND n = 0", vec![])
                .expect_rows(1)
        };
        let read = |conn: &Connection| {
            conn.query_row("SELECT n FROM counters WHERE id = 1", [], |row| row.get::<_, i64>(0))
        };

        let (outcome, n) = store.execute_write_then("bump", &[bump()], read).expect("write");
        assert!(matches!(outcome, WriteOutcome::Committed(_)));
        assert_eq!(n, Some(1));

        let (outcome, n) = store.execute_write_then("bump", &[bump()], read).expect("write");
        assert!(matches!(outcome, WriteOutcome::RolledBack { statement: 0, affected: 0 }));
        assert_eq!(n, None);
        assert_eq!(counter(&store), 1);
    }

    #[test]
    fn execute_write_fault_applies_nothing() {
        let store = scratch_store();
        let err = store
            .execute_write(
                "broken",
                &[
                    WriteStatement::new("UPDATE counters SET n = n + 1 WHERE id = 1", vec![]),
                    WriteStatement::new("INSERT INTO entries (body) VALUES (NULL)", vec![]),
                ],
            )
            .unwrap_err();

        assert!(matches!(err, StoreError::Transaction { op: "broken", .. }));
        assert_eq!(counter(&store), 0);
    }
}
