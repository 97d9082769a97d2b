use std::fmt;

use crate::common::Result;
use crate::tuple::{CompareOp, Field, Tuple};

/// Compares one field of a tuple against a constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    field: usize,
    op: CompareOp,
    operand: Field,
}

impl Predicate {
    pub fn new(field: usize, op: CompareOp, operand: impl Into<Field>) -> Self {
        Self {
            field,
            op,
            operand: operand.into(),
        }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn operand(&self) -> &Field {
        &self.operand
    }

    /// Returns whether `tuple.field(field) <op> operand` holds.
    /// Fails if the tuple has no such field.
    pub fn filter(&self, tuple: &Tuple) -> Result<bool> {
        Ok(tuple.field(self.field)?.compare(self.op, &self.operand))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f = {} op = {} operand = {}", self.field, self.op, self.operand)
    }
}
