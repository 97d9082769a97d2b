use std::fmt;
use std::sync::Arc;

use bytes::BufMut;

use crate::common::{DbError, RecordId, Result};

use super::{DataType, Field, Schema};

/// Represents a single row.
///
/// A tuple holds one [`Field`] per column of its schema and, once it has
/// been stored or read from a heap page, the [`RecordId`] of its slot.
///
/// ## Tuple Binary Format
///
/// ```text
/// +-----------+-----------+-----+-----------+
/// | Field 0   | Field 1   | ... | Field n-1 |
/// +-----------+-----------+-----+-----------+
/// ```
///
/// Every field occupies exactly its column's fixed width, so a stored tuple
/// is always `schema.size()` bytes and never carries per-tuple metadata.
#[derive(Debug, Clone)]
pub struct Tuple {
    /// The schema describing this tuple
    schema: Arc<Schema>,

    /// The values for each column (in schema order)
    fields: Vec<Field>,

    /// Where the tuple is stored, if anywhere
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Creates a new tuple with the given schema and fields.
    /// Fails if the field count or any field type does not match the schema.
    pub fn new(schema: Arc<Schema>, fields: Vec<Field>) -> Result<Self> {
        if fields.len() != schema.field_count() {
            return Err(DbError::SchemaMismatch {
                expected: schema.to_string(),
                found: format!("{} fields", fields.len()),
            });
        }
        for (index, (field, col)) in fields.iter().zip(schema.columns()).enumerate() {
            check_field(index, field, col.data_type())?;
        }
        Ok(Self {
            schema,
            fields,
            record_id: None,
        })
    }

    /// Creates a tuple from raw slot bytes using the given schema.
    pub fn from_bytes(schema: Arc<Schema>, data: &[u8]) -> Option<Self> {
        let mut fields = Vec::with_capacity(schema.field_count());
        let mut offset = 0;
        for col in schema.columns() {
            let (field, size) = Field::deserialize(&data[offset..], &col.data_type())?;
            fields.push(field);
            offset += size;
        }
        Some(Self {
            schema,
            fields,
            record_id: None,
        })
    }

    /// Serializes the tuple into `buf`, writing exactly `schema.size()` bytes.
    pub fn write_to(&self, buf: &mut impl BufMut) -> Result<()> {
        for (index, (field, col)) in self.fields.iter().zip(self.schema.columns()).enumerate() {
            let data_type = col.data_type();
            field
                .serialize(&data_type, buf)
                .ok_or_else(|| DbError::TypeMismatch {
                    index,
                    expected: data_type.to_string(),
                    found: field.data_type().to_string(),
                })?;
        }
        Ok(())
    }

    /// Returns the schema of this tuple.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Replaces the schema without touching the stored fields.
    /// The new schema must be equal (same types) to the current one.
    pub fn reset_schema(&mut self, schema: Arc<Schema>) -> Result<()> {
        if *schema != *self.schema {
            return Err(DbError::SchemaMismatch {
                expected: self.schema.to_string(),
                found: schema.to_string(),
            });
        }
        self.schema = schema;
        Ok(())
    }

    /// Returns the field at the given column index.
    pub fn field(&self, index: usize) -> Result<&Field> {
        self.fields.get(index).ok_or(DbError::FieldIndexOutOfRange {
            index,
            count: self.fields.len(),
        })
    }

    /// Sets the field at the given column index.
    pub fn set_field(&mut self, index: usize, field: Field) -> Result<()> {
        let data_type = self.schema.field_type(index)?;
        check_field(index, &field, data_type)?;
        self.fields[index] = field;
        Ok(())
    }

    /// Returns an iterator over all fields.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Returns the number of fields in this tuple.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if this tuple has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the on-disk location of this tuple, if it has one.
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    /// Sets or clears the on-disk location of this tuple.
    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }
}

fn check_field(index: usize, field: &Field, data_type: DataType) -> Result<()> {
    if field.fits(&data_type) {
        return Ok(());
    }
    match (field, data_type) {
        (Field::Str(s), DataType::Char(max)) => Err(DbError::FieldTooLong {
            len: s.len(),
            max: max as usize,
        }),
        _ => Err(DbError::TypeMismatch {
            index,
            expected: data_type.to_string(),
            found: field.data_type().to_string(),
        }),
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.fields == other.fields
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}

/// Builder for constructing tuples fluently.
pub struct TupleBuilder {
    schema: Arc<Schema>,
    fields: Vec<Field>,
}

impl TupleBuilder {
    /// Creates a new tuple builder for the given schema.
    pub fn new(schema: Arc<Schema>) -> Self {
        let count = schema.field_count();
        Self {
            schema,
            fields: Vec::with_capacity(count),
        }
    }

    /// Appends the next field.
    pub fn value(mut self, field: impl Into<Field>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Builds the tuple.
    pub fn build(self) -> Result<Tuple> {
        Tuple::new(self.schema, self.fields)
    }
}
