use std::cmp::Ordering;
use std::fmt;

use bytes::{Buf, BufMut};

use super::DataType;

/// Comparison operators a [`Field`] can be evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
    /// Substring containment for strings, equality for integers
    Like,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Equals => "=",
            CompareOp::NotEquals => "<>",
            CompareOp::LessThan => "<",
            CompareOp::LessThanOrEq => "<=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterThanOrEq => ">=",
            CompareOp::Like => "LIKE",
        };
        f.write_str(symbol)
    }
}

/// A typed value stored in one column of a tuple.
///
/// Fields are hashable so that they can key aggregation groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    /// 32-bit signed integer
    Int(i32),

    /// String value (at most the column's declared length in bytes)
    Str(String),
}

impl Field {
    /// Returns the narrowest DataType that can hold this field.
    pub fn data_type(&self) -> DataType {
        match self {
            Field::Int(_) => DataType::Integer,
            Field::Str(s) => DataType::Char(s.len().min(u16::MAX as usize) as u16),
        }
    }

    /// Returns true if this field can be stored in a column of the given type.
    pub fn fits(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (Field::Int(_), DataType::Integer) => true,
            (Field::Str(s), DataType::Char(n)) => s.len() <= *n as usize,
            _ => false,
        }
    }

    /// Returns the integer value, if this is an integer field.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Field::Int(v) => Some(*v),
            Field::Str(_) => None,
        }
    }

    /// Returns the string value, if this is a string field.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Str(s) => Some(s),
            Field::Int(_) => None,
        }
    }

    /// Writes the field into `buf` using exactly `data_type.size()` bytes.
    /// Returns None if the field is incompatible with the type.
    pub fn serialize(&self, data_type: &DataType, buf: &mut impl BufMut) -> Option<()> {
        match (self, data_type) {
            (Field::Int(v), DataType::Integer) => {
                buf.put_i32(*v);
                Some(())
            }

            (Field::Str(s), DataType::Char(n)) => {
                let n = *n as usize;
                let bytes = s.as_bytes();
                if bytes.len() > n {
                    return None;
                }
                buf.put_u32(bytes.len() as u32);
                buf.put_slice(bytes);
                buf.put_bytes(0, n - bytes.len());
                Some(())
            }

            _ => None,
        }
    }

    /// Reads a field of the given type from the front of `data`.
    /// Returns the field and number of bytes consumed.
    pub fn deserialize(data: &[u8], data_type: &DataType) -> Option<(Self, usize)> {
        let size = data_type.size();
        if data.len() < size {
            return None;
        }
        let mut buf = &data[..size];

        match data_type {
            DataType::Integer => Some((Field::Int(buf.get_i32()), size)),

            DataType::Char(n) => {
                let len = (buf.get_u32() as usize).min(*n as usize);
                let s = String::from_utf8_lossy(&buf[..len]).into_owned();
                Some((Field::Str(s), size))
            }
        }
    }

    /// Evaluates `self <op> other`.
    /// Fields of different kinds never satisfy any operator.
    pub fn compare(&self, op: CompareOp, other: &Field) -> bool {
        match (self, other) {
            (Field::Str(a), Field::Str(b)) if op == CompareOp::Like => a.contains(b.as_str()),
            _ => {
                let Some(ordering) = self.partial_cmp(other) else {
                    return false;
                };
                match op {
                    CompareOp::Equals | CompareOp::Like => ordering == Ordering::Equal,
                    CompareOp::NotEquals => ordering != Ordering::Equal,
                    CompareOp::LessThan => ordering == Ordering::Less,
                    CompareOp::LessThanOrEq => ordering != Ordering::Greater,
                    CompareOp::GreaterThan => ordering == Ordering::Greater,
                    CompareOp::GreaterThanOrEq => ordering != Ordering::Less,
                }
            }
        }
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => Some(a.cmp(b)),
            (Field::Str(a), Field::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Int(v)
    }
}

impl From<String> for Field {
    fn from(v: String) -> Self {
        Field::Str(v)
    }
}

impl From<&str> for Field {
    fn from(v: &str) -> Self {
        Field::Str(v.to_string())
    }
}
