mod description;
mod sql_type;
mod sql_value;

pub use description::{ColumnDescription, ParamDescription};
pub use sql_type::{BindKind, ColumnType, SqlType};
pub use sql_value::SqlValue;
