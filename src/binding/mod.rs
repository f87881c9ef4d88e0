mod column;
mod parameter;

pub use column::{ColumnBinding, DEFAULT_LONG_COLUMN_SIZE, MAX_COLUMN_SIZE};
pub use parameter::{
    Indicator, ParameterBinding, DEFAULT_LONG_PARAMETER_SIZE, MAX_PARAMETER_SIZE,
};

pub(crate) use parameter::parse_integer;
