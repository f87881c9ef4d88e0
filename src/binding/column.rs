use super::Indicator;
use crate::types::{ColumnDescription, ColumnType, SqlType};

/// Buffer size used when a backend reports an unbounded display width.
pub const DEFAULT_LONG_COLUMN_SIZE: usize = 8000;
/// Upper bound on a single column fetch buffer, in UTF-16 units.
pub const MAX_COLUMN_SIZE: usize = 1 << 16;

/// One result column: its metadata, the wide buffer the backend fetches
/// into, and the narrow copy handed to callers.
///
/// The narrow copy is only materialized when the value is read, and is
/// dropped again by the next fetch.
#[derive(Debug)]
pub struct ColumnBinding {
    name: String,
    column_type: ColumnType,
    sql_type: SqlType,
    display_size: usize,
    wide: Vec<u16>,
    indicator: Indicator,
    narrow: Option<String>,
}

impl ColumnBinding {
    pub(crate) fn allocate(description: &ColumnDescription) -> Self {
        let width = match description.display_size {
            0 => DEFAULT_LONG_COLUMN_SIZE,
            n => n.min(MAX_COLUMN_SIZE),
        };
        Self {
            name: String::from_utf16_lossy(&description.name),
            column_type: description.sql_type.column_type(),
            sql_type: description.sql_type,
            display_size: description.display_size,
            wide: vec![0; width + 1],
            indicator: Indicator::Unbound,
            narrow: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    /// Display width as the backend reported it.
    pub fn display_size(&self) -> usize {
        self.display_size
    }

    /// Number of value units the fetch buffer holds, terminator excluded.
    pub fn capacity(&self) -> usize {
        self.wide.len() - 1
    }

    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    /// Writes one fetched value into the wide buffer.
    ///
    /// Returns `true` when the value did not fit and was truncated; the
    /// indicator still reports the full length.
    pub fn fill(&mut self, value: Option<&str>) -> bool {
        self.narrow = None;
        let Some(value) = value else {
            self.indicator = Indicator::Null;
            return false;
        };
        let capacity = self.capacity();
        let mut total = 0;
        for unit in value.encode_utf16() {
            if total < capacity {
                self.wide[total] = unit;
            }
            total += 1;
        }
        self.wide[total.min(capacity)] = 0;
        self.indicator = Indicator::Length(total);
        total > capacity
    }

    pub(crate) fn clear(&mut self) {
        self.narrow = None;
        self.indicator = Indicator::Unbound;
    }

    /// Current value in the narrow encoding; empty for NULL or nothing fetched.
    pub(crate) fn value(&mut self) -> &str {
        let len = match self.indicator {
            Indicator::Unbound | Indicator::Null => return "",
            Indicator::Length(len) => len.min(self.capacity()),
        };
        let wide = &self.wide[..len];
        self.narrow
            .get_or_insert_with(|| String::from_utf16_lossy(wide))
            .as_str()
    }

    #[cfg(test)]
    pub(crate) fn is_materialized(&self) -> bool {
        self.narrow.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_sizes() {
        let col = ColumnBinding::allocate(&ColumnDescription::new("ID", SqlType::INTEGER, 11));
        assert_eq!(col.name(), "ID");
        assert_eq!(col.column_type(), ColumnType::Number);
        assert_eq!(col.capacity(), 11);

        let col = ColumnBinding::allocate(&ColumnDescription::new("doc", SqlType::WLONGVARCHAR, 0));
        assert_eq!(col.capacity(), DEFAULT_LONG_COLUMN_SIZE);
        assert_eq!(col.display_size(), 0);

        let col = ColumnBinding::allocate(&ColumnDescription::new("big", SqlType::VARCHAR, 1 << 30));
        assert_eq!(col.capacity(), MAX_COLUMN_SIZE);
    }

    #[test]
    fn test_value_is_materialized_lazily() {
        let mut col = ColumnBinding::allocate(&ColumnDescription::new("name", SqlType::WVARCHAR, 20));
        assert!(!col.fill(Some("Zoë")));
        assert!(!col.is_materialized());
        assert_eq!(col.value(), "Zoë");
        assert!(col.is_materialized());

        col.fill(Some("Al"));
        assert!(!col.is_materialized());
        assert_eq!(col.value(), "Al");
    }

    #[test]
    fn test_truncated_fill_keeps_full_length() {
        let mut col = ColumnBinding::allocate(&ColumnDescription::new("code", SqlType::CHAR, 3));
        assert!(col.fill(Some("ABCDE")));
        assert_eq!(col.indicator(), Indicator::Length(5));
        assert_eq!(col.value(), "ABC");
    }

    #[test]
    fn test_null_reads_as_empty() {
        let mut col = ColumnBinding::allocate(&ColumnDescription::new("x", SqlType::VARCHAR, 3));
        assert_eq!(col.value(), "");
        col.fill(None);
        assert_eq!(col.indicator(), Indicator::Null);
        assert_eq!(col.value(), "");
    }
}
