use crate::binding::ColumnBinding;
use crate::diagnostics::{CallResult, Diagnostic, Failure, Outcome};
use crate::traits::FetchOrientation;
use crate::types::ColumnDescription;

/// A fully materialized result set with a scrollable cursor, shared by the
/// backends that read whole results up front.
#[derive(Debug, Clone, Default)]
pub(crate) struct RowSet {
    pub(crate) columns: Vec<ColumnDescription>,
    rows: Vec<Vec<Option<String>>>,
    /// 1-based; 0 is before the first row, `len + 1` after the last.
    cursor: usize,
}

impl RowSet {
    pub(crate) fn new(columns: Vec<ColumnDescription>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            columns,
            rows,
            cursor: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn describe(&self, column: usize) -> CallResult<ColumnDescription> {
        describe_prepared(&self.columns, column)
    }

    pub(crate) fn fetch(
        &mut self,
        orientation: FetchOrientation,
        columns: &mut [ColumnBinding],
    ) -> CallResult<bool> {
        let len = self.rows.len() as i64;
        let target = match orientation {
            FetchOrientation::Next => self.cursor as i64 + 1,
            FetchOrientation::Absolute(n) if n < 0 => len + 1 + n,
            FetchOrientation::Absolute(n) => n,
        };
        if target < 1 {
            self.cursor = 0;
            return Ok(Outcome::ok(false));
        }
        if target > len {
            self.cursor = self.rows.len() + 1;
            return Ok(Outcome::ok(false));
        }
        self.cursor = target as usize;

        let row = &self.rows[self.cursor - 1];
        let mut warnings = Vec::new();
        for (binding, value) in columns.iter_mut().zip(row) {
            if binding.fill(value.as_deref()) && warnings.is_empty() {
                warnings.push(Diagnostic::truncated());
            }
        }
        Ok(Outcome::with_warnings(true, warnings))
    }
}

/// Looks up the 1-based `column` in a list of descriptions.
pub(crate) fn describe_prepared(
    columns: &[ColumnDescription],
    column: usize,
) -> CallResult<ColumnDescription> {
    column
        .checked_sub(1)
        .and_then(|i| columns.get(i))
        .cloned()
        .map(Outcome::ok)
        .ok_or_else(|| invalid_descriptor(column))
}

fn invalid_descriptor(column: usize) -> Failure {
    Failure::new(Diagnostic::new(
        "07009",
        0,
        format!("Invalid descriptor index {column}"),
    ))
}
