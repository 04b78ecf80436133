//! In-memory rows bound to one table, and the statements that sync them.

use serde::Serialize;

use crate::config::StatementMode;
use crate::error::Result;
use crate::sqlite::DatabaseHandle;
use crate::value::{Row, Value};

/// Per-row result of [`Model::sync_status`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub row: Row,
    pub synced: bool,
}

/// An ordered collection of rows bound to one table.
///
/// Every operation runs its statements immediately, one per row, with no
/// surrounding transaction. A failure part way through leaves the earlier
/// statements committed.
#[derive(Debug, Clone)]
pub struct Model {
    table: String,
    handle: DatabaseHandle,
    mode: StatementMode,
    rows: Vec<Row>,
}

/// Statement text plus the values bound to its placeholders
#[derive(Debug, PartialEq)]
struct Statement<'a> {
    sql: String,
    params: Vec<&'a Value>,
}

impl Model {
    pub(crate) fn new(
        table: impl Into<String>,
        handle: DatabaseHandle,
        mode: StatementMode,
        rows: Vec<Row>,
    ) -> Self {
        Self {
            table: table.into(),
            handle,
            mode,
            rows,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row to the in-memory sequence without touching storage.
    pub fn push(&mut self, row: Row) -> &mut Self {
        self.rows.push(row);
        self
    }

    /// Insert every held row, one statement per row, in sequence order.
    pub fn save(&mut self) -> Result<&mut Self> {
        tracing::debug!(table = %self.table, rows = self.rows.len(), "save");
        for row in &self.rows {
            let statement = insert_statement(&self.table, row, self.mode);
            self.run(&statement)?;
        }
        Ok(self)
    }

    /// Replace the held rows with `SELECT * FROM <table> WHERE <expr>`.
    ///
    /// `expr` is inserted verbatim.
    #[doc(alias = "where")]
    pub fn where_(&mut self, expr: &str) -> Result<&mut Self> {
        self.rows = self.select(expr)?;
        Ok(self)
    }

    /// Like [`Model::where_`], but appends the results. Rows already held are
    /// not de-duplicated.
    #[doc(alias = "addwhere")]
    pub fn add_where(&mut self, expr: &str) -> Result<&mut Self> {
        let rows = self.select(expr)?;
        self.rows.extend(rows);
        Ok(self)
    }

    /// A new model over the same table holding at most the first row.
    pub fn first(&self) -> Model {
        Model::new(
            self.table.clone(),
            self.handle.clone(),
            self.mode,
            self.rows.first().cloned().into_iter().collect(),
        )
    }

    /// Delete every held row from storage, matching on all of its columns.
    ///
    /// The in-memory rows stay in place, so a later [`Model::save`] puts them
    /// back.
    pub fn delete(&mut self) -> Result<&mut Self> {
        tracing::debug!(table = %self.table, rows = self.rows.len(), "delete");
        for row in &self.rows {
            let statement = delete_statement(&self.table, row, self.mode);
            self.run(&statement)?;
        }
        Ok(self)
    }

    /// Report, per held row, whether it looks persisted.
    ///
    /// A row counts as synced when each of its column values exists somewhere
    /// in its column. The probes are independent, so the values may come from
    /// different stored rows.
    pub fn sync_status(&self) -> Result<Vec<SyncStatus>> {
        self.rows
            .iter()
            .map(|row| {
                Ok(SyncStatus {
                    row: row.clone(),
                    synced: self.is_synced(row)?,
                })
            })
            .collect()
    }

    /// One line per row: `{col='val', ...} (Synced: true|false)`.
    pub fn to_display_string(&self) -> Result<String> {
        let lines = self
            .sync_status()?
            .into_iter()
            .map(|status| format!("{} (Synced: {})", status.row, status.synced))
            .collect::<Vec<_>>();
        Ok(lines.join("\n"))
    }

    fn select(&self, expr: &str) -> Result<Vec<Row>> {
        self.handle
            .query_rows(&format!("SELECT * FROM {} WHERE {expr}", self.table))
    }

    fn is_synced(&self, row: &Row) -> Result<bool> {
        for (column, value) in row.iter() {
            let statement = probe_statement(&self.table, column, value, self.mode);
            if !self.handle.exists(&statement.sql, &statement.params)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn run(&self, statement: &Statement<'_>) -> Result<usize> {
        if statement.params.is_empty() {
            self.handle.exec(&statement.sql)
        } else {
            self.handle.exec_bound(&statement.sql, &statement.params)
        }
    }
}

impl<'a> IntoIterator for &'a Model {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

// A row without columns yields a statement the engine rejects.
fn insert_statement<'a>(table: &str, row: &'a Row, mode: StatementMode) -> Statement<'a> {
    let columns = row.columns().collect::<Vec<_>>().join(", ");
    let (values, params) = match mode {
        StatementMode::Interpolated => (
            row.values()
                .map(Value::to_sql_literal)
                .collect::<Vec<_>>()
                .join(", "),
            Vec::new(),
        ),
        StatementMode::Bound => (
            (1..=row.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", "),
            row.values().collect(),
        ),
    };
    Statement {
        sql: format!("INSERT INTO {table} ({columns}) VALUES ({values})"),
        params,
    }
}

fn delete_statement<'a>(table: &str, row: &'a Row, mode: StatementMode) -> Statement<'a> {
    let mut params = Vec::new();
    let conditions = row
        .iter()
        .map(|(column, value)| condition(column, value, mode, &mut params))
        .collect::<Vec<_>>()
        .join(" AND ");
    Statement {
        sql: format!("DELETE FROM {table} WHERE {conditions}"),
        params,
    }
}

fn probe_statement<'a>(
    table: &str,
    column: &str,
    value: &'a Value,
    mode: StatementMode,
) -> Statement<'a> {
    let mut params = Vec::new();
    let condition = condition(column, value, mode, &mut params);
    Statement {
        sql: format!("SELECT {column} FROM {table} WHERE {condition}"),
        params,
    }
}

fn condition<'a>(
    column: &str,
    value: &'a Value,
    mode: StatementMode,
    params: &mut Vec<&'a Value>,
) -> String {
    if value.is_null() {
        return format!("{column} IS NULL");
    }
    match mode {
        StatementMode::Interpolated => format!("{column} = {}", value.to_sql_literal()),
        StatementMode::Bound => {
            params.push(value);
            format!("{column} = ?{}", params.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    #[test]
    fn interpolated_insert_quotes_every_value() {
        let row = row! { "id" => 1, "name" => "Alice" };
        let statement = insert_statement("people", &row, StatementMode::Interpolated);
        assert_eq!(
            statement.sql,
            "INSERT INTO people (id, name) VALUES ('1', 'Alice')"
        );
        assert!(statement.params.is_empty());
    }

    #[test]
    fn bound_insert_uses_placeholders() {
        let row = row! { "id" => 1, "name" => "Alice" };
        let statement = insert_statement("people", &row, StatementMode::Bound);
        assert_eq!(statement.sql, "INSERT INTO people (id, name) VALUES (?1, ?2)");
        assert_eq!(
            statement.params,
            vec![&Value::Integer(1), &Value::Text("Alice".to_string())]
        );
    }

    #[test]
    fn empty_row_builds_malformed_statements() {
        let row = Row::new();
        let insert = insert_statement("people", &row, StatementMode::Interpolated);
        assert_eq!(insert.sql, "INSERT INTO people () VALUES ()");
        let delete = delete_statement("people", &row, StatementMode::Bound);
        assert_eq!(delete.sql, "DELETE FROM people WHERE ");
        assert!(delete.params.is_empty());
    }

    #[test]
    fn delete_conditions_are_and_combined() {
        let row = row! { "id" => 1, "name" => "Alice", "email" => Value::Null };
        let statement = delete_statement("people", &row, StatementMode::Interpolated);
        assert_eq!(
            statement.sql,
            "DELETE FROM people WHERE id = '1' AND name = 'Alice' AND email IS NULL"
        );

        let statement = delete_statement("people", &row, StatementMode::Bound);
        assert_eq!(
            statement.sql,
            "DELETE FROM people WHERE id = ?1 AND name = ?2 AND email IS NULL"
        );
        assert_eq!(statement.params.len(), 2);
    }

    #[test]
    fn probe_selects_a_single_column() {
        let value = Value::from("Alice");
        let statement = probe_statement("people", "name", &value, StatementMode::Interpolated);
        assert_eq!(statement.sql, "SELECT name FROM people WHERE name = 'Alice'");
    }
}
