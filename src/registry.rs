//! Owner of the database handle and of one model factory per table.

use std::collections::HashMap;
use std::path::Path;

use crate::config::{RegistryConfig, StatementMode};
use crate::error::{Error, Result};
use crate::model::Model;
use crate::sqlite::DatabaseHandle;
use crate::value::Row;

/// Builds [`Model`]s over a single table
#[derive(Debug, Clone)]
pub struct TableFactory {
    name: String,
    handle: DatabaseHandle,
    mode: StatementMode,
}

impl TableFactory {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A model over this table holding exactly `rows`, unvalidated.
    pub fn build(&self, rows: impl IntoIterator<Item = Row>) -> Model {
        Model::new(
            self.name.clone(),
            self.handle.clone(),
            self.mode,
            rows.into_iter().collect(),
        )
    }

    pub fn empty(&self) -> Model {
        self.build(Vec::new())
    }
}

/// Textual difference between a requested schema and the live table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDrift {
    pub table: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug)]
pub struct Registry {
    handle: DatabaseHandle,
    mode: StatementMode,
    tables: HashMap<String, TableFactory>,
}

impl Registry {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "opening database");
        Ok(Self::with_handle(
            DatabaseHandle::open(path)?,
            StatementMode::default(),
        ))
    }

    pub fn open_in_memory() -> Result<Self> {
        tracing::info!("opening in-memory database");
        Ok(Self::with_handle(
            DatabaseHandle::open_in_memory()?,
            StatementMode::default(),
        ))
    }

    /// Open the configured database and define its declared tables in order.
    pub fn open_with_config(config: RegistryConfig) -> Result<Self> {
        tracing::info!(path = %config.db_path, mode = ?config.statement_mode, "opening database");
        let handle = DatabaseHandle::open(&config.db_path)?;
        let mut registry = Self::with_handle(handle, config.statement_mode);
        for table in &config.tables {
            registry.table(&table.name, Some(&table.schema))?;
        }
        Ok(registry)
    }

    fn with_handle(handle: DatabaseHandle, mode: StatementMode) -> Self {
        Self {
            handle,
            mode,
            tables: HashMap::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// The shared handle every factory and model of this registry uses
    pub fn handle(&self) -> &DatabaseHandle {
        &self.handle
    }

    /// Release the connection and forget every factory. Safe to call twice.
    pub fn close(&mut self) -> Result<()> {
        self.tables.clear();
        if !self.handle.is_open() {
            return Ok(());
        }
        tracing::info!("closing database");
        self.handle.close()
    }

    /// Names of the tables with a registered factory
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Define `name` or retrieve its existing factory.
    ///
    /// A new table needs `schema`, which is used verbatim in
    /// `CREATE TABLE IF NOT EXISTS`. For a known table, a supplied schema is
    /// only compared against the live columns and a mismatch is logged as a
    /// warning; the existing factory is returned either way.
    pub fn table(&mut self, name: &str, schema: Option<&str>) -> Result<TableFactory> {
        if let Some(factory) = self.tables.get(name) {
            if let Some(schema) = schema {
                if let Some(drift) = self.check_schema(name, schema)? {
                    tracing::warn!(
                        table = %drift.table,
                        expected = %drift.expected,
                        actual = %drift.actual,
                        "schema mismatch for existing table"
                    );
                }
            }
            return Ok(factory.clone());
        }

        let schema = schema.ok_or_else(|| Error::SchemaRequiredError(name.to_string()))?;
        self.handle
            .exec(&format!("CREATE TABLE IF NOT EXISTS {name} ({schema})"))?;
        tracing::info!(table = %name, "table defined");

        let factory = TableFactory {
            name: name.to_string(),
            handle: self.handle.clone(),
            mode: self.mode,
        };
        self.tables.insert(name.to_string(), factory.clone());
        Ok(factory)
    }

    /// Compare `schema` with the live columns of `name`, rendered as
    /// `col1 type1, col2 type2`.
    ///
    /// The comparison is purely textual, so constraints, spacing or type
    /// aliases in `schema` all count as drift.
    pub fn check_schema(&self, name: &str, schema: &str) -> Result<Option<SchemaDrift>> {
        let actual = self
            .handle
            .introspect_columns(name)?
            .iter()
            .map(|column| format!("{} {}", column.name, column.declared_type))
            .collect::<Vec<_>>()
            .join(", ");
        if actual == schema {
            return Ok(None);
        }
        Ok(Some(SchemaDrift {
            table: name.to_string(),
            expected: schema.to_string(),
            actual,
        }))
    }
}
