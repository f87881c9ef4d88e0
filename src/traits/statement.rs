use async_trait::async_trait;

use crate::binding::{ColumnBinding, ParameterBinding};
use crate::diagnostics::CallResult;
use crate::types::{ColumnDescription, ParamDescription};

/// Where a fetch moves the native cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrientation {
    Next,
    /// 1-based absolute row. Negative values count from the end.
    Absolute(i64),
}

/// A native statement handle.
///
/// Parameter ordinals and column numbers are 1-based, as in the native
/// protocols. SQL text arrives in the wide (UTF-16) encoding.
#[async_trait]
pub trait NativeStatement: Send {
    async fn prepare(&mut self, sql: &[u16]) -> CallResult<()>;

    /// Number of placeholders in the prepared text.
    async fn num_params(&mut self) -> CallResult<usize>;

    async fn describe_param(&mut self, ordinal: usize) -> CallResult<ParamDescription>;

    /// Executes the prepared text with the bound parameter buffers.
    async fn execute(&mut self, params: &[ParameterBinding]) -> CallResult<()>;

    /// Executes `sql` without a prior prepare.
    async fn execute_direct(&mut self, sql: &[u16]) -> CallResult<()>;

    /// Result columns produced by the last execution; 0 for commands.
    ///
    /// Between a prepare and the first execution, reports the columns the
    /// prepared text would produce.
    async fn num_result_cols(&mut self) -> CallResult<usize>;

    /// Describes a result column, under the same rules as
    /// [`num_result_cols`](Self::num_result_cols).
    async fn describe_col(&mut self, column: usize) -> CallResult<ColumnDescription>;

    /// Rows in the current result set, or rows affected by the last command.
    async fn row_count(&mut self) -> CallResult<u64>;

    /// Moves the cursor and writes the row into `columns` in place.
    ///
    /// Returns `false` when there is no row at the target position.
    async fn fetch(
        &mut self,
        orientation: FetchOrientation,
        columns: &mut [ColumnBinding],
    ) -> CallResult<bool>;

    async fn close(&mut self) -> CallResult<()>;
}
