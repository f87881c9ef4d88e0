use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::diagnostics::{check, ErrorChannel};
use crate::environment::Environment;
use crate::error::{DbIntError, Result};
use crate::options::ConnectOptions;
use crate::statement::Statement;
use crate::traits::{BackendKind, CursorMode, Driver, Session};

const PRIMARY_KEY_COLUMN_SQL: &str = "SELECT kcu.COLUMN_NAME \
     FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
     JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu \
       ON kcu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA \
      AND kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME \
      AND kcu.TABLE_NAME = tc.TABLE_NAME \
     WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' \
       AND LOWER(tc.TABLE_SCHEMA) = LOWER(?) \
       AND LOWER(tc.TABLE_NAME) = LOWER(?) \
       AND kcu.ORDINAL_POSITION = ?";

/// A session with one backend.
///
/// Opening never fails outright: a connection whose session could not be
/// established is still returned, with the failure recorded on its error
/// channel. Check [`last_error`](Self::last_error) after
/// [`connect`](Self::connect).
///
/// Every public operation clears the error channel on entry and records the
/// text of its failure, if any. Callers serialize access to a connection.
pub struct Connection {
    env: Arc<Environment>,
    kind: BackendKind,
    options: ConnectOptions,
    descriptor: String,
    session: Option<Box<dyn Session>>,
    errors: ErrorChannel,
}

impl Connection {
    /// Builds the descriptor for `driver` and opens a session.
    pub fn connect(env: &Arc<Environment>, driver: &dyn Driver, options: ConnectOptions) -> Self {
        let descriptor = options.descriptor(driver.name());
        env.attach();
        let mut conn = Self {
            env: Arc::clone(env),
            kind: driver.kind(),
            options,
            descriptor,
            session: None,
            errors: ErrorChannel::default(),
        };

        let opened = conn.run(|| {
            check("connect", conn.block_on(driver.connect(&conn.descriptor))).map_err(|e| match e {
                DbIntError::Backend { message, .. } => DbIntError::ConnectionFailed(message),
                other => other,
            })
        });
        match opened {
            Ok(session) => {
                debug!(
                    backend = ?conn.kind,
                    host = %conn.options.host,
                    database = %conn.options.database,
                    "connection opened"
                );
                conn.session = Some(session);
            }
            Err(err) => {
                warn!(backend = ?conn.kind, host = %conn.options.host, error = %err, "connection failed");
            }
        }
        conn
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn host(&self) -> &str {
        &self.options.host
    }

    /// Name of the database this connection was opened for.
    pub fn database_name(&self) -> &str {
        &self.options.database
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// The descriptor the session was opened with. Contains the password.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Resets the error channel without doing anything else.
    pub fn clear_error(&self) {
        self.errors.reset();
    }

    /// Whether the last public operation failed.
    pub fn last_error(&self) -> bool {
        self.errors.failed()
    }

    /// Text of the last failure; `None` when the last operation succeeded.
    pub fn last_error_text(&self) -> Option<String> {
        self.errors.text()
    }

    /// Verifies liveness with a no-op round trip.
    pub fn is_open(&self) -> bool {
        self.run(|| check("ping", self.block_on(self.session()?.ping())))
            .is_ok()
    }

    /// Allocates a statement with a scrollable cursor.
    pub fn create_statement(&self) -> Result<Statement<'_>> {
        self.run(|| self.allocate_statement(CursorMode::Static))
    }

    /// Commits the current transaction.
    ///
    /// `Ok` means the commit executed; on `Err` the error text is set.
    pub fn commit(&self) -> Result<()> {
        self.run(|| self.end_transaction("commit"))
    }

    /// Rolls back the current transaction. Same contract as [`commit`](Self::commit).
    pub fn rollback(&self) -> Result<()> {
        self.run(|| self.end_transaction("rollback"))
    }

    /// Name of the primary key column at `position` (1-based) of
    /// `schema.table`, or `None` if there is no such column.
    pub fn primary_key_column(
        &self,
        schema: &str,
        table: &str,
        position: u32,
    ) -> Result<Option<String>> {
        self.run(|| {
            let mut stmt = self.allocate_statement(CursorMode::ForwardOnly)?;
            stmt.prepare_sql(PRIMARY_KEY_COLUMN_SQL)?;
            stmt.bind_value(1, schema)?;
            stmt.bind_value(2, table)?;
            stmt.bind_value(3, &position.to_string())?;
            stmt.execute_sql(PRIMARY_KEY_COLUMN_SQL)?;
            if stmt.is_eof() {
                return Ok(None);
            }
            let name = stmt.column_value_at(0).to_string();
            stmt.release()?;
            Ok(Some(name))
        })
    }

    /// Releases the backend session. The environment stays up for other
    /// connections. Dropping the connection does the same, minus the error
    /// reporting.
    pub fn close(mut self) -> Result<()> {
        let session = self.session.take();
        self.run(|| self.disconnect(session))
    }

    fn end_transaction(&self, verb: &str) -> Result<()> {
        let mut stmt = self.allocate_statement(CursorMode::ForwardOnly)?;
        stmt.prepare_sql(verb)?;
        stmt.execute_sql(verb)?;
        stmt.release()
    }

    /// Internal helpers that read at most the first row ask for a
    /// forward-only cursor.
    fn allocate_statement(&self, mode: CursorMode) -> Result<Statement<'_>> {
        let native = check(
            "allocate statement",
            self.block_on(self.session()?.allocate_statement(mode)),
        )?;
        Ok(Statement::new(self, native))
    }

    fn disconnect(&self, session: Option<Box<dyn Session>>) -> Result<()> {
        let Some(session) = session else {
            return Ok(());
        };
        check("disconnect", self.block_on(session.disconnect()))?;
        debug!(backend = ?self.kind, host = %self.options.host, "connection closed");
        Ok(())
    }

    fn session(&self) -> Result<&dyn Session> {
        self.session.as_deref().ok_or(DbIntError::NotConnected)
    }

    /// Runs one public operation against the error channel.
    pub(crate) fn run<T>(&self, op: impl FnOnce() -> Result<T>) -> Result<T> {
        self.errors.reset();
        let result = op();
        if let Err(err) = &result {
            self.errors.record(err);
        }
        result
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.env.block_on(future)
    }

    pub(crate) fn errors(&self) -> &ErrorChannel {
        &self.errors
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let session = self.session.take();
        // failures are already logged by the diagnostics channel
        let _ = self.disconnect(session);
        self.env.detach();
    }
}
