//! The engine boundary: a shared, single-threaded handle on one SQLite
//! connection.

use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use rusqlite::{params_from_iter, Connection};

use crate::error::{Error, Result};
use crate::value::{Row, Value};

/// Column as reported by `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
}

/// Shared handle on a database connection.
///
/// Clones share the same connection. Once [`DatabaseHandle::close`] has run,
/// every clone fails with [`Error::ConnectionError`].
#[derive(Clone)]
pub struct DatabaseHandle {
    connection: Rc<RefCell<Option<Connection>>>,
}

impl DatabaseHandle {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|e| {
            Error::ConnectionError(format!("failed to open {}: {e}", path.display()))
        })?;
        Self::from_connection(connection)
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().map_err(|e| {
            Error::ConnectionError(format!("failed to open in-memory database: {e}"))
        })?;
        Self::from_connection(connection)
    }

    // Opening is lazy; read the schema version so unreadable files fail here.
    fn from_connection(connection: Connection) -> Result<Self> {
        connection
            .query_row("PRAGMA schema_version", [], |_| Ok(()))
            .map_err(|e| Error::ConnectionError(format!("failed to read database: {e}")))?;
        Ok(Self {
            connection: Rc::new(RefCell::new(Some(connection))),
        })
    }

    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.connection.borrow();
        let connection = guard.as_ref().ok_or_else(Error::closed)?;
        f(connection)
    }

    pub fn is_open(&self) -> bool {
        self.connection.borrow().is_some()
    }

    /// Execute a single non-query statement verbatim.
    pub fn exec(&self, sql: &str) -> Result<usize> {
        tracing::debug!(%sql, "exec");
        self.with_connection(|conn| conn.execute(sql, []).map_err(|e| Error::statement(sql, e)))
    }

    /// Execute a single statement with positional parameters.
    pub fn exec_bound(&self, sql: &str, values: &[&Value]) -> Result<usize> {
        tracing::debug!(%sql, params = values.len(), "exec");
        self.with_connection(|conn| {
            conn.execute(sql, params_from_iter(values.iter()))
                .map_err(|e| Error::statement(sql, e))
        })
    }

    /// Run a SELECT and collect every result row, in engine order.
    pub fn query_rows(&self, sql: &str) -> Result<Vec<Row>> {
        tracing::debug!(%sql, "query");
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(sql).map_err(|e| Error::statement(sql, e))?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let rows = stmt
                .query_map([], |row| {
                    let mut out = Row::new();
                    for (i, column) in columns.iter().enumerate() {
                        out.insert(column.as_str(), Value::from(row.get_ref(i)?));
                    }
                    Ok(out)
                })
                .map_err(|e| Error::statement(sql, e))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::statement(sql, e))
        })
    }

    /// Whether `sql` yields at least one row. Only the first step is taken.
    pub fn exists(&self, sql: &str, values: &[&Value]) -> Result<bool> {
        tracing::debug!(%sql, params = values.len(), "probe");
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(sql).map_err(|e| Error::statement(sql, e))?;
            stmt.exists(params_from_iter(values.iter()))
                .map_err(|e| Error::statement(sql, e))
        })
    }

    /// Columns of `table` (name and declared type) in engine order.
    ///
    /// An unknown table yields an empty list.
    pub fn introspect_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let sql = format!("PRAGMA table_info({table})");
        tracing::debug!(%sql, "introspect");
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql).map_err(|e| Error::statement(&sql, e))?;
            let columns = stmt
                .query_map([], |row| {
                    Ok(ColumnInfo {
                        name: row.get(1)?,
                        declared_type: row.get(2)?,
                    })
                })
                .map_err(|e| Error::statement(&sql, e))?;
            columns
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::statement(&sql, e))
        })
    }

    /// Release the connection. Closing an already closed handle is a no-op.
    pub fn close(&self) -> Result<()> {
        let Some(connection) = self.connection.borrow_mut().take() else {
            return Ok(());
        };
        connection
            .close()
            .map_err(|(_, e)| Error::ConnectionError(format!("failed to close database: {e}")))
    }
}

impl fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_with_people() -> Result<DatabaseHandle> {
        let handle = DatabaseHandle::open_in_memory()?;
        handle.exec("CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT)")?;
        handle.exec("INSERT INTO people (id, name) VALUES ('1', 'Alice')")?;
        Ok(handle)
    }

    #[test]
    fn query_rows_keeps_column_order() {
        let handle = handle_with_people().unwrap();
        let rows = handle.query_rows("SELECT name, id FROM people").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns().collect::<Vec<_>>(), vec!["name", "id"]);
        assert_eq!(rows[0].get("id"), Some(&Value::Integer(1)));
    }

    #[test]
    fn introspection_reports_declared_types() {
        let handle = handle_with_people().unwrap();
        let columns = handle.introspect_columns("people").unwrap();
        let described: Vec<_> = columns
            .iter()
            .map(|c| (c.name.as_str(), c.declared_type.as_str()))
            .collect();
        assert_eq!(described, vec![("id", "INTEGER"), ("name", "TEXT")]);
        assert!(handle.introspect_columns("nobody").unwrap().is_empty());
    }

    #[test]
    fn exists_binds_parameters() {
        let handle = handle_with_people().unwrap();
        let alice = Value::from("Alice");
        let bob = Value::from("Bob");
        let sql = "SELECT name FROM people WHERE name = ?1";
        assert!(handle.exists(sql, &[&alice]).unwrap());
        assert!(!handle.exists(sql, &[&bob]).unwrap());
    }

    #[test]
    fn closed_handle_is_shared_by_clones() {
        let handle = handle_with_people().unwrap();
        let clone = handle.clone();
        handle.close().unwrap();
        handle.close().unwrap();
        assert!(!clone.is_open());
        assert!(matches!(
            clone.query_rows("SELECT * FROM people"),
            Err(Error::ConnectionError(_))
        ));
    }

    #[test]
    fn rejected_statement_carries_its_text() {
        let handle = handle_with_people().unwrap();
        match handle.exec("INSERT INTO nowhere VALUES (1)") {
            Err(Error::StatementError { sql, .. }) => {
                assert_eq!(sql, "INSERT INTO nowhere VALUES (1)")
            }
            other => panic!("expected statement error, got {other:?}"),
        }
    }
}
