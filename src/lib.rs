//! A minimal table/model layer over an embedded SQLite database.
//!
//! # Intention
//!
//! - Define a named table from a column schema and hand out models over it.
//! - Keep rows as plain column/value maps and sync them with `save`,
//!   `where_`, `add_where` and `delete`, one statement per row.
//!
//! # Architectural Boundaries
//!
//! - No transactions, pooling, migrations or query building. Expressions and
//!   (by default) values are spliced into statement text unescaped.
//! - Single-threaded: a registry and its models share one connection and must
//!   not be used from several threads or processes at once.
//!
//! ```
//! use sqlite_model::{row, Registry};
//!
//! # fn main() -> sqlite_model::Result<()> {
//! let mut registry = Registry::open_in_memory()?;
//! let people = registry.table("people", Some("id INTEGER PRIMARY KEY, name TEXT"))?;
//!
//! people.build([row! { "id" => 1, "name" => "Alice" }]).save()?;
//!
//! let mut found = people.empty();
//! found.where_("id=1")?;
//! assert_eq!(found.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod registry;
pub mod sqlite;
pub mod value;

pub use config::{RegistryConfig, StatementMode, TableDeclaration};
pub use error::{Error, Result};
pub use model::{Model, SyncStatus};
pub use registry::{Registry, SchemaDrift, TableFactory};
pub use sqlite::{ColumnInfo, DatabaseHandle};
pub use value::{Row, Value};
