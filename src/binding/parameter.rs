use crate::error::{DbIntError, Result};
use crate::types::{BindKind, ParamDescription, SqlType, SqlValue};

/// Buffer size used when a backend reports an unbounded parameter.
pub const DEFAULT_LONG_PARAMETER_SIZE: usize = 8000;
/// Upper bound on a single parameter buffer, in its own units.
pub const MAX_PARAMETER_SIZE: usize = 1 << 16;

/// Length/indicator slot shared by parameter and column buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Nothing bound or fetched yet.
    Unbound,
    Null,
    /// Length of the value in buffer units, before any truncation.
    Length(usize),
}

#[derive(Debug)]
enum ParamBuffer {
    Numeric(i64),
    Wide(Vec<u16>),
    Narrow(Vec<u8>),
}

/// One placeholder of a prepared statement and its pre-sized value buffer.
///
/// The buffer is allocated once from the backend's parameter description and
/// reused by every subsequent bind until the statement is re-prepared or freed.
#[derive(Debug)]
pub struct ParameterBinding {
    ordinal: usize,
    kind: BindKind,
    sql_type: SqlType,
    buffer: ParamBuffer,
    indicator: Indicator,
}

impl ParameterBinding {
    pub(crate) fn allocate(ordinal: usize, description: &ParamDescription) -> Self {
        let size = match description.size {
            0 => DEFAULT_LONG_PARAMETER_SIZE,
            n => n.min(MAX_PARAMETER_SIZE),
        };
        let kind = description.sql_type.bind_kind();
        // one extra unit for the terminator
        let buffer = match kind {
            BindKind::Numeric => ParamBuffer::Numeric(0),
            BindKind::WideText => ParamBuffer::Wide(vec![0; size + 1]),
            BindKind::NarrowText => ParamBuffer::Narrow(vec![0; size + 1]),
        };
        Self {
            ordinal,
            kind,
            sql_type: description.sql_type,
            buffer,
            indicator: Indicator::Unbound,
        }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn kind(&self) -> BindKind {
        self.kind
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    pub fn is_bound(&self) -> bool {
        self.indicator != Indicator::Unbound
    }

    /// Largest value the slot accepts, in its own units (UTF-16 units for
    /// wide text, bytes for narrow text). `None` for numeric slots.
    pub fn capacity(&self) -> Option<usize> {
        match &self.buffer {
            ParamBuffer::Numeric(_) => None,
            ParamBuffer::Wide(buf) => Some(buf.len() - 1),
            ParamBuffer::Narrow(buf) => Some(buf.len() - 1),
        }
    }

    /// Stores `value` in the slot, encoded the way the slot was described.
    ///
    /// Numeric slots parse the text as an integer. Text slots reject input
    /// that does not fit the buffer and leave the previous value in place.
    pub(crate) fn bind(&mut self, value: &str) -> Result<()> {
        let ordinal = self.ordinal;
        match &mut self.buffer {
            ParamBuffer::Numeric(slot) => {
                *slot = parse_integer(ordinal, value)?;
                self.indicator = Indicator::Length(std::mem::size_of::<i64>());
            }
            ParamBuffer::Wide(buf) => {
                let units: Vec<u16> = value.encode_utf16().collect();
                let capacity = buf.len() - 1;
                if units.len() > capacity {
                    return Err(DbIntError::ValueTooLong {
                        ordinal,
                        length: units.len(),
                        capacity,
                    });
                }
                buf[..units.len()].copy_from_slice(&units);
                buf[units.len()] = 0;
                self.indicator = Indicator::Length(units.len());
            }
            ParamBuffer::Narrow(buf) => {
                let bytes = value.as_bytes();
                let capacity = buf.len() - 1;
                if bytes.len() > capacity {
                    return Err(DbIntError::ValueTooLong {
                        ordinal,
                        length: bytes.len(),
                        capacity,
                    });
                }
                buf[..bytes.len()].copy_from_slice(bytes);
                buf[bytes.len()] = 0;
                self.indicator = Indicator::Length(bytes.len());
            }
        }
        Ok(())
    }

    pub(crate) fn bind_null(&mut self) {
        self.indicator = Indicator::Null;
    }

    /// Decodes the bound buffer for the backend.
    pub fn value(&self) -> SqlValue {
        let len = match self.indicator {
            Indicator::Unbound | Indicator::Null => return SqlValue::Null,
            Indicator::Length(len) => len,
        };
        match &self.buffer {
            ParamBuffer::Numeric(n) => SqlValue::Int64(*n),
            ParamBuffer::Wide(buf) => SqlValue::Text(String::from_utf16_lossy(&buf[..len])),
            ParamBuffer::Narrow(buf) => {
                SqlValue::Text(String::from_utf8_lossy(&buf[..len]).into_owned())
            }
        }
    }
}

pub(crate) fn parse_integer(ordinal: usize, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| DbIntError::InvalidNumber {
            ordinal,
            value: value.to_string(),
        })
}
