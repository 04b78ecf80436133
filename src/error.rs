use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Schema required to create table '{0}'")]
    SchemaRequiredError(String),

    #[error("Statement error: {source} (statement: {sql})")]
    StatementError {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },
}

impl Error {
    pub(crate) fn statement(sql: &str, source: rusqlite::Error) -> Self {
        Self::StatementError {
            sql: sql.to_string(),
            source,
        }
    }

    pub(crate) fn closed() -> Self {
        Self::ConnectionError("database handle is closed".to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
