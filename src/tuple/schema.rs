use std::fmt;
use std::sync::Arc;

use crate::common::{DbError, Result};

use super::DataType;

/// Represents a single column in a schema: a type and an optional name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column data type
    data_type: DataType,

    /// Column name, if one was given
    name: Option<String>,
}

impl Column {
    /// Creates a named column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            data_type,
            name: Some(name.into()),
        }
    }

    /// Creates a column without a name.
    pub fn unnamed(data_type: DataType) -> Self {
        Self {
            data_type,
            name: None,
        }
    }

    /// Returns the column name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the column data type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the number of bytes this column occupies in a stored tuple.
    pub fn size(&self) -> usize {
        self.data_type.size()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.data_type, self.name().unwrap_or(""))
    }
}

/// The shape of a tuple: an ordered, non-empty list of typed columns.
///
/// Two schemas are equal when they have the same number of columns and the
/// same type at every position. Column names do not take part in equality.
/// Schemas are immutable; operators share them behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Ordered list of columns
    columns: Vec<Column>,

    /// Sum of all column widths in bytes
    size: usize,
}

impl Schema {
    /// Creates a new schema from a list of columns.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(DbError::InvalidSchema(
                "a schema needs at least one column".to_string(),
            ));
        }
        let size = columns.iter().map(Column::size).sum();
        Ok(Self { columns, size })
    }

    /// Creates a schema of unnamed columns.
    pub fn from_types(types: &[DataType]) -> Result<Self> {
        Self::new(types.iter().copied().map(Column::unnamed).collect())
    }

    /// Creates a schema from parallel type and name lists.
    pub fn from_types_and_names(types: &[DataType], names: &[&str]) -> Result<Self> {
        if types.len() != names.len() {
            return Err(DbError::InvalidSchema(format!(
                "{} types but {} names",
                types.len(),
                names.len()
            )));
        }
        Self::new(
            types
                .iter()
                .zip(names)
                .map(|(ty, name)| Column::new(*name, *ty))
                .collect(),
        )
    }

    /// Creates a schema builder for fluent construction.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Concatenates two schemas: `a`'s columns followed by `b`'s.
    pub fn merge(a: &Schema, b: &Schema) -> Schema {
        let columns: Vec<Column> = a.columns.iter().chain(&b.columns).cloned().collect();
        Schema {
            columns,
            size: a.size + b.size,
        }
    }

    /// Returns a copy of this schema whose column names are prefixed with `"<alias>."`.
    pub fn with_prefix(&self, alias: &str) -> Schema {
        let columns = self
            .columns
            .iter()
            .map(|col| Column {
                data_type: col.data_type,
                name: Some(format!("{}.{}", alias, col.name().unwrap_or(""))),
            })
            .collect();
        Schema {
            columns,
            size: self.size,
        }
    }

    /// Returns the number of columns in the schema.
    pub fn field_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column at the given index.
    pub fn column(&self, index: usize) -> Result<&Column> {
        self.columns
            .get(index)
            .ok_or(DbError::FieldIndexOutOfRange {
                index,
                count: self.columns.len(),
            })
    }

    /// Returns the type of the column at the given index.
    pub fn field_type(&self, index: usize) -> Result<DataType> {
        self.column(index).map(Column::data_type)
    }

    /// Returns the name of the column at the given index (None if unnamed).
    pub fn field_name(&self, index: usize) -> Result<Option<&str>> {
        self.column(index).map(Column::name)
    }

    /// Returns the index of the first column with the given name.
    pub fn field_name_to_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|col| col.name() == Some(name))
            .ok_or_else(|| DbError::FieldNameNotFound(name.to_string()))
    }

    /// Returns an iterator over all columns.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Returns the size in bytes of a stored tuple with this schema.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.data_type == b.data_type)
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", col)?;
        }
        Ok(())
    }
}

/// Builder for constructing schemas fluently.
pub struct SchemaBuilder {
    columns: Vec<Column>,
}

impl SchemaBuilder {
    /// Creates a new schema builder.
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Adds a named column.
    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type));
        self
    }

    /// Adds an unnamed column.
    pub fn unnamed(mut self, data_type: DataType) -> Self {
        self.columns.push(Column::unnamed(data_type));
        self
    }

    /// Builds the schema.
    pub fn build(self) -> Result<Schema> {
        Schema::new(self.columns)
    }

    /// Builds the schema wrapped in an Arc for shared ownership.
    pub fn build_arc(self) -> Result<Arc<Schema>> {
        self.build().map(Arc::new)
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
