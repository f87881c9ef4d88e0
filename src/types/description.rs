use super::SqlType;

/// Backend-reported metadata for one placeholder of a prepared statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescription {
    pub sql_type: SqlType,
    /// Column size in characters (or digits for numeric types). 0 means unbounded.
    pub size: usize,
    pub decimal_digits: i16,
    pub nullable: bool,
}

impl ParamDescription {
    pub fn new(sql_type: SqlType, size: usize) -> Self {
        Self {
            sql_type,
            size,
            decimal_digits: 0,
            nullable: true,
        }
    }
}

/// Backend-reported metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    /// Column name in the wide (UTF-16) encoding.
    pub name: Vec<u16>,
    pub sql_type: SqlType,
    /// Display width in characters. 0 means unbounded.
    pub display_size: usize,
    pub nullable: bool,
}

impl ColumnDescription {
    pub fn new(name: &str, sql_type: SqlType, display_size: usize) -> Self {
        Self {
            name: name.encode_utf16().collect(),
            sql_type,
            display_size,
            nullable: true,
        }
    }
}
