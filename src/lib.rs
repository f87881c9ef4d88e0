//! dbint - A synchronous, backend-agnostic database client
//!
//! One small API over prepared statements, bound parameters and scrollable
//! result cursors, whatever backend sits behind it. Backends plug in
//! through the [`Driver`] trait; a PostgreSQL driver and an in-memory test
//! driver ship with the crate.
//!
//! # Example
//! ```
//! use dbint::drivers::{InMemoryTestDriver, InMemoryTestResponseBuilder};
//! use dbint::{ConnectOptions, Connection, Environment};
//!
//! let driver = InMemoryTestDriver::new().with_response(
//!     InMemoryTestResponseBuilder::new()
//!         .columns(&["id", "name"])
//!         .row(&["1", "Alice"])
//!         .row(&["2", "Bob"])
//!         .build(),
//! );
//!
//! let env = Environment::new()?;
//! let conn = Connection::connect(&env, &driver, ConnectOptions::new("h", "d", "u", "p"));
//! assert!(!conn.last_error());
//!
//! let mut stmt = conn.create_statement()?;
//! stmt.prepare("SELECT id, name FROM users WHERE id > ?")?;
//! stmt.bind_string(1, "0")?;
//! stmt.execute_select("")?;
//!
//! let mut names = Vec::new();
//! while !stmt.is_eof() {
//!     names.push(stmt.column_value("name").to_string());
//!     stmt.next()?;
//! }
//! assert_eq!(names, ["Alice", "Bob"]);
//! stmt.free()?;
//! # Ok::<(), dbint::DbIntError>(())
//! ```

pub mod binding;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod traits;
pub mod types;

mod connection;
mod environment;
mod options;
mod statement;

// Re-export main types for convenient access
pub use binding::{ColumnBinding, Indicator, ParameterBinding};
pub use connection::Connection;
pub use diagnostics::{CallResult, Diagnostic, Failure, Outcome};
pub use environment::{Environment, EnvironmentConfig};
pub use error::{DbIntError, Result};
pub use options::{parse_descriptor, ConnectOptions};
pub use statement::{Statement, StatementState};
pub use traits::{BackendKind, CursorMode, Driver, FetchOrientation, NativeStatement, Session};
pub use types::{BindKind, ColumnDescription, ColumnType, ParamDescription, SqlType, SqlValue};
