use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::types::ValueRef;
use tracing::{debug, warn};

use crate::error::SQLError;
use crate::traits::{Row, SQLExecutor, SQLStore, SQLTransaction, Value};

/// How long a statement waits on a locked database file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
///
/// A single connection is shared behind a mutex. A [`SqliteTransaction`] holds
/// that mutex for its whole lifetime, so statements from other callers queue
/// behind an open transaction instead of interleaving with it. Do not call
/// back into the store from inside a transaction on the same thread; use the
/// transaction handle.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path)
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        // Enable WAL mode for better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        debug!("SqliteStore: opened {}", path.display());
        Self::configure(conn)
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> Result<Self, SQLError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SQLError> {
        self.conn
            .lock()
            .map_err(|e| SQLError::Connection(e.to_string()))
    }
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<Box<dyn rusqlite::types::ToSql + '_>> {
    params
        .iter()
        .map(|v| -> Box<dyn rusqlite::types::ToSql + '_> {
            match v {
                Value::Null => Box::new(rusqlite::types::Null),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.as_str()),
                Value::Blob(b) => Box::new(b.as_slice()),
            }
        })
        .collect()
}

/// Classify a failed write. Duplicate keys get their own variant so the
/// caller can branch on them.
fn exec_error(e: rusqlite::Error) -> SQLError {
    if let rusqlite::Error::SqliteFailure(ref code, _) = e {
        if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        {
            return SQLError::UniqueViolation(e.to_string());
        }
    }
    SQLError::Execution(e.to_string())
}

fn run_query(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        bound.iter().map(|b| b.as_ref()).collect();

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| SQLError::Query(e.to_string()))?;

    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            let mut columns = Vec::with_capacity(column_names.len());
            for (i, name) in column_names.iter().enumerate() {
                columns.push((name.clone(), row_value_at(row, i)));
            }
            Ok(Row { columns })
        })
        .map_err(|e| SQLError::Query(e.to_string()))?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(|e| SQLError::Query(e.to_string()))?);
    }
    Ok(result)
}

fn run_exec(conn: &Connection, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        bound.iter().map(|b| b.as_ref()).collect();

    let affected = conn
        .execute(sql, param_refs.as_slice())
        .map_err(exec_error)?;

    Ok(affected as u64)
}

/// Extract a Value from a rusqlite row at a given column index.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> Value {
    match row.get_ref(idx) {
        Ok(ValueRef::Integer(i)) => Value::Integer(i),
        Ok(ValueRef::Real(f)) => Value::Real(f),
        Ok(ValueRef::Text(t)) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        Ok(ValueRef::Blob(b)) => Value::Blob(b.to_vec()),
        Ok(ValueRef::Null) | Err(_) => Value::Null,
    }
}

impl SQLExecutor for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self.lock()?;
        run_query(&conn, sql, params)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self.lock()?;
        run_exec(&conn, sql, params)
    }
}

impl SQLStore for SqliteStore {
    fn begin(&self) -> Result<Box<dyn SQLTransaction + '_>, SQLError> {
        let conn = self.lock()?;
        // IMMEDIATE takes the write lock up front so two writers never both
        // read a snapshot and then race to upgrade it.
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| SQLError::Transaction(e.to_string()))?;
        Ok(Box::new(SqliteTransaction {
            conn,
            finished: false,
        }))
    }
}

/// A transaction on a [`SqliteStore`] connection. Rolls back on drop unless
/// committed.
pub struct SqliteTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl SQLExecutor for SqliteTransaction<'_> {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        run_query(&self.conn, sql, params)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        run_exec(&self.conn, sql, params)
    }
}

impl SQLTransaction for SqliteTransaction<'_> {
    fn commit(mut self: Box<Self>) -> Result<(), SQLError> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| SQLError::Transaction(e.to_string()))?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            warn!("SqliteTransaction: rollback failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn store_with_table() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec(
                "CREATE TABLE pairs (a TEXT NOT NULL, b TEXT NOT NULL, n INTEGER NOT NULL DEFAULT 0, PRIMARY KEY (a, b))",
                &[],
            )
            .unwrap();
        store
    }

    fn count(store: &SqliteStore) -> i64 {
        store
            .query("SELECT COUNT(*) AS cnt FROM pairs", &[])
            .unwrap()[0]
            .get_i64("cnt")
            .unwrap()
    }

    #[test]
    fn test_query_and_exec() {
        let store = store_with_table();
        let affected = store
            .exec(
                "INSERT INTO pairs (a, b, n) VALUES (?1, ?2, ?3)",
                &[Value::from("x"), Value::from("y"), Value::Integer(3)],
            )
            .unwrap();
        assert_eq!(affected, 1);

        let rows = store
            .query("SELECT a, b, n FROM pairs WHERE a = ?1", &[Value::from("x")])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("b"), Some("y"));
        assert_eq!(rows[0].get_i64("n"), Some(3));
    }

    #[test]
    fn test_duplicate_key_is_unique_violation() {
        let store = store_with_table();
        let params = [Value::from("x"), Value::from("y")];
        store
            .exec("INSERT INTO pairs (a, b) VALUES (?1, ?2)", &params)
            .unwrap();
        let err = store
            .exec("INSERT INTO pairs (a, b) VALUES (?1, ?2)", &params)
            .unwrap_err();
        assert!(err.is_unique_violation(), "got {err:?}");

        let err = store.exec("INSERT INTO missing VALUES (1)", &[]).unwrap_err();
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn test_commit_persists() {
        let store = store_with_table();
        let tx = store.begin().unwrap();
        tx.exec("INSERT INTO pairs (a, b) VALUES ('1', '2')", &[]).unwrap();
        let inside = tx.query("SELECT COUNT(*) AS cnt FROM pairs", &[]).unwrap();
        assert_eq!(inside[0].get_i64("cnt"), Some(1));
        tx.commit().unwrap();
        assert_eq!(count(&store), 1);
    }

    #[test]
    fn test_drop_rolls_back() {
        let store = store_with_table();
        {
            let tx = store.begin().unwrap();
            tx.exec("INSERT INTO pairs (a, b) VALUES ('1', '2')", &[]).unwrap();
            tx.exec("UPDATE pairs SET n = n + 1", &[]).unwrap();
        }
        assert_eq!(count(&store), 0);

        // The connection is usable again after the rollback.
        let tx = store.begin().unwrap();
        tx.exec("INSERT INTO pairs (a, b) VALUES ('1', '2')", &[]).unwrap();
        tx.commit().unwrap();
        assert_eq!(count(&store), 1);
    }

    #[test]
    fn test_failed_statement_rolls_back_whole_transaction() {
        let store = store_with_table();
        store.exec("INSERT INTO pairs (a, b) VALUES ('1', '2')", &[]).unwrap();

        let result = (|| -> Result<(), SQLError> {
            let tx = store.begin()?;
            tx.exec("UPDATE pairs SET n = n + 10", &[])?;
            tx.exec("INSERT INTO pairs (a, b) VALUES ('1', '2')", &[])?;
            tx.commit()
        })();
        assert!(result.unwrap_err().is_unique_violation());

        let rows = store.query("SELECT n FROM pairs", &[]).unwrap();
        assert_eq!(rows[0].get_i64("n"), Some(0));
    }

    #[test]
    fn test_concurrent_transactions_serialize() {
        let store = Arc::new(store_with_table());
        store.exec("INSERT INTO pairs (a, b) VALUES ('c', 'c')", &[]).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let tx = store.begin().unwrap();
                        let n = tx.query("SELECT n FROM pairs", &[]).unwrap()[0]
                            .get_i64("n")
                            .unwrap();
                        tx.exec("UPDATE pairs SET n = ?1", &[Value::Integer(n + 1)])
                            .unwrap();
                        tx.commit().unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let rows = store.query("SELECT n FROM pairs", &[]).unwrap();
        assert_eq!(rows[0].get_i64("n"), Some(200));
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.sqlite");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.exec("CREATE TABLE t (v TEXT)", &[]).unwrap();
            store.exec("INSERT INTO t VALUES ('kept')", &[]).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let rows = store.query("SELECT v FROM t", &[]).unwrap();
        assert_eq!(rows[0].get_str("v"), Some("kept"));
    }
}
