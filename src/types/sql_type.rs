use std::fmt;

/// Abstract column type every backend maps its native type codes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Number,
    Text,
    Date,
    Lob,
    Unset,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Number => "NUMBER",
            ColumnType::Text => "TEXT",
            ColumnType::Date => "DATE",
            ColumnType::Lob => "LOB",
            ColumnType::Unset => "UNSET",
        };
        f.write_str(name)
    }
}

/// How a parameter slot stores and encodes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    /// Fixed 64-bit integer slot.
    Numeric,
    /// UTF-16 buffer.
    WideText,
    /// UTF-8 buffer.
    NarrowText,
}

/// Native concise SQL type code as reported by a backend.
///
/// Codes follow the ODBC numbering; backends speaking other protocols
/// translate their own type identifiers into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SqlType(pub i16);

impl SqlType {
    pub const UNKNOWN: SqlType = SqlType(0);
    pub const CHAR: SqlType = SqlType(1);
    pub const NUMERIC: SqlType = SqlType(2);
    pub const DECIMAL: SqlType = SqlType(3);
    pub const INTEGER: SqlType = SqlType(4);
    pub const SMALLINT: SqlType = SqlType(5);
    pub const FLOAT: SqlType = SqlType(6);
    pub const REAL: SqlType = SqlType(7);
    pub const DOUBLE: SqlType = SqlType(8);
    pub const DATETIME: SqlType = SqlType(9);
    pub const TIME: SqlType = SqlType(10);
    pub const TIMESTAMP: SqlType = SqlType(11);
    pub const VARCHAR: SqlType = SqlType(12);
    pub const TYPE_DATE: SqlType = SqlType(91);
    pub const TYPE_TIME: SqlType = SqlType(92);
    pub const TYPE_TIMESTAMP: SqlType = SqlType(93);
    pub const INTERVAL_YEAR: SqlType = SqlType(101);
    pub const INTERVAL_MINUTE_TO_SECOND: SqlType = SqlType(113);
    pub const LONGVARCHAR: SqlType = SqlType(-1);
    pub const BINARY: SqlType = SqlType(-2);
    pub const VARBINARY: SqlType = SqlType(-3);
    pub const LONGVARBINARY: SqlType = SqlType(-4);
    pub const BIGINT: SqlType = SqlType(-5);
    pub const TINYINT: SqlType = SqlType(-6);
    pub const BIT: SqlType = SqlType(-7);
    pub const WCHAR: SqlType = SqlType(-8);
    pub const WVARCHAR: SqlType = SqlType(-9);
    pub const WLONGVARCHAR: SqlType = SqlType(-10);
    pub const GUID: SqlType = SqlType(-11);
    pub const SS_XML: SqlType = SqlType(-152);
    pub const SS_TIME2: SqlType = SqlType(-154);
    pub const SS_TIMESTAMPOFFSET: SqlType = SqlType(-155);

    /// Classifies the native code into the abstract column taxonomy.
    pub fn column_type(self) -> ColumnType {
        match self {
            SqlType::NUMERIC
            | SqlType::DECIMAL
            | SqlType::INTEGER
            | SqlType::SMALLINT
            | SqlType::FLOAT
            | SqlType::REAL
            | SqlType::DOUBLE
            | SqlType::BIGINT
            | SqlType::TINYINT
            | SqlType::BIT => ColumnType::Number,
            _ if self.is_interval() => ColumnType::Number,
            SqlType::CHAR
            | SqlType::VARCHAR
            | SqlType::LONGVARCHAR
            | SqlType::WCHAR
            | SqlType::WVARCHAR
            | SqlType::WLONGVARCHAR
            | SqlType::GUID => ColumnType::Text,
            SqlType::DATETIME
            | SqlType::TIME
            | SqlType::TIMESTAMP
            | SqlType::TYPE_DATE
            | SqlType::TYPE_TIME
            | SqlType::TYPE_TIMESTAMP
            | SqlType::SS_TIME2
            | SqlType::SS_TIMESTAMPOFFSET => ColumnType::Date,
            SqlType::BINARY | SqlType::VARBINARY | SqlType::LONGVARBINARY | SqlType::SS_XML => {
                ColumnType::Lob
            }
            _ => ColumnType::Unset,
        }
    }

    /// Picks the parameter slot layout for a placeholder of this type.
    pub fn bind_kind(self) -> BindKind {
        match self {
            SqlType::INTEGER
            | SqlType::SMALLINT
            | SqlType::BIGINT
            | SqlType::TINYINT
            | SqlType::BIT => BindKind::Numeric,
            SqlType::CHAR
            | SqlType::VARCHAR
            | SqlType::LONGVARCHAR
            | SqlType::WCHAR
            | SqlType::WVARCHAR
            | SqlType::WLONGVARCHAR
            | SqlType::NUMERIC
            | SqlType::DECIMAL => BindKind::WideText,
            _ => BindKind::NarrowText,
        }
    }

    fn is_interval(self) -> bool {
        (SqlType::INTERVAL_YEAR.0..=SqlType::INTERVAL_MINUTE_TO_SECOND.0).contains(&self.0)
    }
}
