//! The statement and cursor engine.
//!
//! A [`Statement`] walks through prepare, bind, execute and fetch against a
//! [`NativeStatement`], owning the parameter and column buffers in between.
//! Cursor positions are zero-based here and converted to the backend's
//! 1-based absolute addressing on fetch.

use tracing::debug;

use crate::binding::{parse_integer, ColumnBinding, ParameterBinding};
use crate::connection::Connection;
use crate::diagnostics::check;
use crate::error::{DbIntError, Result};
use crate::types::ColumnType;
use crate::traits::{FetchOrientation, NativeStatement};

/// Where a statement is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    Created,
    Prepared,
    /// Result columns are described but nothing was executed.
    Described,
    /// Executed a command that produced no result set.
    Executed,
    /// The cursor is on a row.
    Positioned,
    /// Executed a query that returned no rows.
    EmptyResult,
    /// The cursor moved past the last row.
    Exhausted,
}

/// A statement allocated on a [`Connection`].
///
/// Dropping a statement releases it like [`free`](Self::free) does, minus
/// the error reporting.
pub struct Statement<'c> {
    conn: &'c Connection,
    columns: Vec<ColumnBinding>,
    params: Vec<ParameterBinding>,
    native: Box<dyn NativeStatement>,
    state: StatementState,
    prepared: bool,
    position: u64,
    row_count: u64,
    affected_rows: u64,
    closed: bool,
}

impl<'c> Statement<'c> {
    pub(crate) fn new(conn: &'c Connection, native: Box<dyn NativeStatement>) -> Self {
        Self {
            conn,
            columns: Vec::new(),
            params: Vec::new(),
            native,
            state: StatementState::Created,
            prepared: false,
            position: 0,
            row_count: 0,
            affected_rows: 0,
            closed: false,
        }
    }

    pub fn state(&self) -> StatementState {
        self.state
    }

    /// Number of placeholders found by the last [`prepare`](Self::prepare).
    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }

    pub fn parameters(&self) -> &[ParameterBinding] {
        &self.params
    }

    /// Prepares `sql` and allocates one buffer per placeholder, sized from
    /// the backend's parameter description.
    pub fn prepare(&mut self, sql: &str) -> Result<()> {
        let conn = self.conn;
        conn.run(|| self.prepare_sql(sql))
    }

    /// Binds a value to the 1-based `ordinal`. The slot's described type
    /// decides the encoding: numeric slots parse `value` as an integer.
    pub fn bind_string(&mut self, ordinal: usize, value: &str) -> Result<()> {
        let conn = self.conn;
        conn.run(|| self.bind_value(ordinal, value))
    }

    /// Like [`bind_string`](Self::bind_string), but `value` must be an integer.
    pub fn bind_number(&mut self, ordinal: usize, value: &str) -> Result<()> {
        let conn = self.conn;
        conn.run(|| {
            parse_integer(ordinal, value)?;
            self.bind_value(ordinal, value)
        })
    }

    pub fn bind_null(&mut self, ordinal: usize) -> Result<()> {
        let conn = self.conn;
        conn.run(|| {
            self.param_mut(ordinal)?.bind_null();
            Ok(())
        })
    }

    /// Executes the statement and positions the cursor on the first row.
    ///
    /// A prepared statement runs its prepared text with the bound
    /// parameters and `sql` is ignored; otherwise `sql` runs directly. The
    /// other `execute_*` methods behave the same way.
    pub fn execute_select(&mut self, sql: &str) -> Result<()> {
        let conn = self.conn;
        conn.run(|| self.execute_sql(sql))
    }

    /// Returns the number of inserted rows.
    pub fn execute_insert(&mut self, sql: &str) -> Result<u64> {
        let conn = self.conn;
        conn.run(|| {
            self.execute_sql(sql)?;
            Ok(self.affected_rows)
        })
    }

    pub fn execute_update(&mut self, sql: &str) -> Result<()> {
        let conn = self.conn;
        conn.run(|| self.execute_sql(sql))
    }

    pub fn execute_delete(&mut self, sql: &str) -> Result<()> {
        let conn = self.conn;
        conn.run(|| self.execute_sql(sql))
    }

    pub fn execute_anonymous_block(&mut self, sql: &str) -> Result<()> {
        let conn = self.conn;
        conn.run(|| self.execute_sql(sql))
    }

    /// Prepares `sql` and binds its result columns without executing it.
    ///
    /// Column metadata (names, types, sizes) becomes available while the
    /// result stays empty: the row count is 0 and the cursor is at EOF.
    /// Parameters can still be bound and the statement executed afterwards.
    pub fn execute_describe(&mut self, sql: &str) -> Result<()> {
        let conn = self.conn;
        conn.run(|| {
            self.prepare_sql(sql)?;
            let count = check("describe results", conn.block_on(self.native.num_result_cols()))?;
            self.bind_columns(count)?;
            self.state = StatementState::Described;
            debug!(columns = count, "statement described");
            Ok(())
        })
    }

    /// Rows affected by the last command, or rows in the last result set.
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// Rows in the current result set.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Zero-based cursor position.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn first(&mut self) -> Result<()> {
        let conn = self.conn;
        conn.run(|| {
            if !self.has_result_set() {
                return Ok(());
            }
            self.position = 0;
            if self.row_count > 0 {
                self.fetch(FetchOrientation::Absolute(1))?;
            }
            Ok(())
        })
    }

    pub fn last(&mut self) -> Result<()> {
        let conn = self.conn;
        conn.run(|| {
            if !self.has_result_set() || self.row_count == 0 {
                return Ok(());
            }
            self.position = self.row_count - 1;
            self.fetch(FetchOrientation::Absolute(self.row_count as i64))
                .map(|_| ())
        })
    }

    /// Advances one row. Returns `true` when the cursor is on a row afterwards.
    pub fn next(&mut self) -> Result<bool> {
        let conn = self.conn;
        conn.run(|| {
            if self.is_eof() {
                return Ok(false);
            }
            self.position += 1;
            if self.position >= self.row_count {
                self.invalidate_row();
                self.state = StatementState::Exhausted;
                return Ok(false);
            }
            self.fetch(FetchOrientation::Next)
        })
    }

    /// Steps back one row if not already on the first. Returns whether the
    /// cursor is now on the first row.
    pub fn prev(&mut self) -> Result<bool> {
        let conn = self.conn;
        conn.run(|| {
            if self.has_result_set() && self.position > 0 {
                self.position -= 1;
                if self.position < self.row_count {
                    self.fetch(FetchOrientation::Absolute(self.position as i64 + 1))?;
                }
            }
            Ok(self.position == 0)
        })
    }

    /// Moves to the 1-based row `row`. Zero or negative rows leave the
    /// cursor where it is.
    pub fn seek(&mut self, row: i64) -> Result<()> {
        let conn = self.conn;
        conn.run(|| {
            if row <= 0 || !self.has_result_set() {
                return Ok(());
            }
            self.position = row as u64 - 1;
            self.fetch(FetchOrientation::Absolute(row)).map(|_| ())
        })
    }

    /// True when there is no result set, it is empty, or the cursor is past its end.
    pub fn is_eof(&self) -> bool {
        !self.has_result_set() || self.row_count == 0 || self.position >= self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Name of the zero-based column `index`.
    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|c| c.name())
    }

    /// Abstract type of the named column; [`ColumnType::Unset`] when unknown.
    pub fn column_type(&self, name: &str) -> ColumnType {
        self.find_column(name)
            .map_or(ColumnType::Unset, |i| self.columns[i].column_type())
    }

    /// Display width of the named column; 0 when unknown.
    pub fn column_size(&self, name: &str) -> usize {
        self.find_column(name)
            .map_or(0, |i| self.columns[i].display_size())
    }

    pub fn columns(&self) -> &[ColumnBinding] {
        &self.columns
    }

    /// Value of the named column in the current row.
    ///
    /// Names match case-insensitively. An unknown name, a NULL value, or no
    /// current row all yield an empty string; none of them is an error.
    pub fn column_value(&mut self, name: &str) -> &str {
        self.conn.errors().reset();
        match self.find_column(name) {
            Some(index) => self.column_value_at(index),
            None => "",
        }
    }

    /// Value of the zero-based column `index` in the current row.
    pub fn column_value_by_index(&mut self, index: usize) -> &str {
        self.conn.errors().reset();
        self.column_value_at(index)
    }

    /// Value of a LOB column: the backend's identifier or representation of
    /// the object. Any other column type is a usage error.
    pub fn lob(&mut self, name: &str) -> Result<&str> {
        self.conn.errors().reset();
        match self.find_column(name) {
            Some(index) if self.columns[index].column_type() == ColumnType::Lob => {
                Ok(self.column_value_at(index))
            }
            _ => {
                let err = DbIntError::NotALob(name.to_string());
                self.conn.errors().record(&err);
                Err(err)
            }
        }
    }

    /// Releases column and parameter buffers, then the native handle.
    pub fn free(mut self) -> Result<()> {
        let conn = self.conn;
        conn.run(|| self.close_native())
    }

    pub(crate) fn prepare_sql(&mut self, sql: &str) -> Result<()> {
        let wide: Vec<u16> = sql.encode_utf16().collect();
        self.release_bindings();
        self.prepared = false;

        let conn = self.conn;
        check("prepare", conn.block_on(self.native.prepare(&wide)))?;
        let count = check("describe parameters", conn.block_on(self.native.num_params()))?;

        // assigned only once every description succeeded
        let mut params = Vec::with_capacity(count);
        for ordinal in 1..=count {
            let description = check(
                "describe parameter",
                conn.block_on(self.native.describe_param(ordinal)),
            )?;
            params.push(ParameterBinding::allocate(ordinal, &description));
        }
        self.params = params;
        self.prepared = true;
        self.state = StatementState::Prepared;
        debug!(parameters = count, "statement prepared");
        Ok(())
    }

    pub(crate) fn bind_value(&mut self, ordinal: usize, value: &str) -> Result<()> {
        self.param_mut(ordinal)?.bind(value)
    }

    pub(crate) fn execute_sql(&mut self, sql: &str) -> Result<()> {
        self.release_columns();
        let conn = self.conn;

        if self.prepared {
            if let Some(unbound) = self.params.iter().find(|p| !p.is_bound()) {
                return Err(DbIntError::UnboundParameter(unbound.ordinal()));
            }
            check("execute", conn.block_on(self.native.execute(&self.params)))?;
        } else {
            let wide: Vec<u16> = sql.encode_utf16().collect();
            check("execute", conn.block_on(self.native.execute_direct(&wide)))?;
        }

        let count = check("describe results", conn.block_on(self.native.num_result_cols()))?;
        let rows = check("row count", conn.block_on(self.native.row_count()))?;
        if count == 0 {
            self.affected_rows = rows;
            self.state = StatementState::Executed;
            debug!(affected_rows = rows, "command executed");
            return Ok(());
        }

        self.bind_columns(count)?;
        self.row_count = rows;
        self.affected_rows = rows;
        debug!(columns = count, rows, "query executed");

        self.fetch(FetchOrientation::Next)?;
        Ok(())
    }

    /// Describes `count` result columns and allocates their buffers.
    fn bind_columns(&mut self, count: usize) -> Result<()> {
        let conn = self.conn;
        let mut columns = Vec::with_capacity(count);
        for column in 1..=count {
            let description = check(
                "describe column",
                conn.block_on(self.native.describe_col(column)),
            )?;
            columns.push(ColumnBinding::allocate(&description));
        }
        self.columns = columns;
        Ok(())
    }

    pub(crate) fn column_value_at(&mut self, index: usize) -> &str {
        if self.is_eof() {
            return "";
        }
        match self.columns.get_mut(index) {
            Some(column) => column.value(),
            None => "",
        }
    }

    /// [`free`](Self::free) without touching the error channel.
    pub(crate) fn release(mut self) -> Result<()> {
        self.close_native()
    }

    fn fetch(&mut self, orientation: FetchOrientation) -> Result<bool> {
        let conn = self.conn;
        let found = check(
            "fetch",
            conn.block_on(self.native.fetch(orientation, &mut self.columns)),
        )?;
        self.state = if found {
            StatementState::Positioned
        } else if self.row_count == 0 {
            StatementState::EmptyResult
        } else {
            self.invalidate_row();
            StatementState::Exhausted
        };
        Ok(found)
    }

    /// A described statement has columns but no native cursor yet.
    fn has_result_set(&self) -> bool {
        !self.columns.is_empty() && self.state != StatementState::Described
    }

    fn find_column(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(name))
    }

    fn param_mut(&mut self, ordinal: usize) -> Result<&mut ParameterBinding> {
        if !self.prepared {
            return Err(DbIntError::NotPrepared);
        }
        let count = self.params.len();
        if ordinal == 0 || ordinal > count {
            return Err(DbIntError::ParameterOutOfRange { ordinal, count });
        }
        Ok(&mut self.params[ordinal - 1])
    }

    fn invalidate_row(&mut self) {
        for column in &mut self.columns {
            column.clear();
        }
    }

    fn release_columns(&mut self) {
        self.columns.clear();
        self.position = 0;
        self.row_count = 0;
        self.affected_rows = 0;
    }

    fn release_bindings(&mut self) {
        self.release_columns();
        self.params.clear();
    }

    fn close_native(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.release_bindings();
        self.closed = true;
        let conn = self.conn;
        check("free statement", conn.block_on(self.native.close()))?;
        debug!("statement freed");
        Ok(())
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        // errors are already logged by the diagnostics channel
        let _ = self.close_native();
    }
}
