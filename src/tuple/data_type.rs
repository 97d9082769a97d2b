use std::fmt;

use crate::common::{DEFAULT_STRING_LEN, INT_SIZE, STRING_LENGTH_PREFIX};

/// Represents the data types a field can hold.
/// Every type has a fixed on-page width so that heap page slots are uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit signed integer: 4 bytes, big-endian
    Integer,

    /// String of at most n bytes
    /// Stored as: length (4 bytes, big-endian) + data zero-padded to n bytes
    Char(u16),
}

impl DataType {
    /// String type with the default maximum length.
    pub fn string() -> Self {
        DataType::Char(DEFAULT_STRING_LEN)
    }

    /// Returns the number of bytes a value of this type occupies on a page.
    pub fn size(&self) -> usize {
        match self {
            DataType::Integer => INT_SIZE,
            DataType::Char(n) => STRING_LENGTH_PREFIX + *n as usize,
        }
    }

    /// Returns true for string types.
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::Char(_))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Char(n) => write!(f, "CHAR({})", n),
        }
    }
}
