use serde::Deserialize;

/// How row values reach the engine in `save`, `delete` and the sync probe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementMode {
    /// Values are spliced into the statement text as `'value'` with no
    /// escaping. A value containing a quote produces a malformed statement.
    #[default]
    Interpolated,
    /// Values are bound as positional parameters.
    Bound,
}

/// A table created (or checked) when the registry opens
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableDeclaration {
    pub name: String,
    pub schema: String,
}

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryConfig {
    /// Path to the SQLite database file, or `:memory:`
    pub db_path: String,
    #[serde(default)]
    pub statement_mode: StatementMode,
    /// Tables to define on open, in order
    #[serde(default)]
    pub tables: Vec<TableDeclaration>,
}

impl RegistryConfig {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            statement_mode: StatementMode::default(),
            tables: Vec::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    pub fn with_table(mut self, name: impl Into<String>, schema: impl Into<String>) -> Self {
        self.tables.push(TableDeclaration {
            name: name.into(),
            schema: schema.into(),
        });
        self
    }

    pub fn with_statement_mode(mut self, mode: StatementMode) -> Self {
        self.statement_mode = mode;
        self
    }
}
