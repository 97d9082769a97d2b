use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Column, DataType, Field, Schema, Tuple};

/// Aggregate function applied to the aggregate field of every group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Count,
    Avg,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Count => "count",
            AggregateOp::Avg => "avg",
        };
        f.write_str(name)
    }
}

/// Running state of one group.
///
/// `value` holds the min, max or sum; `count` is kept for every op so that
/// AVG can divide at read time.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    value: i64,
    count: i64,
}

impl Accumulator {
    fn start(value: Option<i64>) -> Self {
        Self {
            value: value.unwrap_or(0),
            count: 1,
        }
    }

    fn update(&mut self, op: AggregateOp, value: Option<i64>) -> Result<()> {
        self.count += 1;
        let Some(v) = value else {
            return Ok(());
        };
        self.value = match op {
            AggregateOp::Min => self.value.min(v),
            AggregateOp::Max => self.value.max(v),
            AggregateOp::Sum | AggregateOp::Avg => {
                self.value
                    .checked_add(v)
                    .ok_or_else(|| DbError::AggregateOverflow {
                        op: op.to_string(),
                        value: self.value,
                    })?
            }
            AggregateOp::Count => self.value,
        };
        Ok(())
    }

    fn result(&self, op: AggregateOp) -> Result<i32> {
        let value = match op {
            AggregateOp::Count => self.count,
            AggregateOp::Avg => self.value / self.count,
            AggregateOp::Min | AggregateOp::Max | AggregateOp::Sum => self.value,
        };
        i32::try_from(value).map_err(|_| DbError::AggregateOverflow {
            op: op.to_string(),
            value,
        })
    }
}

/// Groups tuples by an optional field and aggregates one other field.
///
/// Integer fields support every [`AggregateOp`]; string fields support
/// only COUNT. Groups are reported in the order they were first seen.
pub struct Aggregator {
    group_field: Option<usize>,
    agg_field: usize,
    op: AggregateOp,
    /// Output schema: `[group, agg]` or `[agg]`
    schema: Arc<Schema>,
    groups: HashMap<Option<Field>, Accumulator>,
    /// Group keys in first-seen order
    order: Vec<Option<Field>>,
}

impl Aggregator {
    /// Creates an aggregator for tuples of `input`.
    ///
    /// Fails if a field index is out of range or if `op` is not supported for
    /// the aggregate field's type.
    pub fn new(input: &Schema, group_field: Option<usize>, agg_field: usize, op: AggregateOp) -> Result<Self> {
        let agg_type = input.field_type(agg_field)?;
        if agg_type.is_string() && op != AggregateOp::Count {
            return Err(DbError::UnsupportedAggregate {
                op: op.to_string(),
                data_type: agg_type.to_string(),
            });
        }

        let agg_name = format!("{}({})", op, input.field_name(agg_field)?.unwrap_or(""));
        let agg_column = Column::new(agg_name, DataType::Integer);
        let columns = match group_field {
            Some(index) => vec![input.column(index)?.clone(), agg_column],
            None => vec![agg_column],
        };

        Ok(Self {
            group_field,
            agg_field,
            op,
            schema: Arc::new(Schema::new(columns)?),
            groups: HashMap::new(),
            order: Vec::new(),
        })
    }

    /// Folds one tuple into its group.
    pub fn merge(&mut self, tuple: &Tuple) -> Result<()> {
        let key = match self.group_field {
            Some(index) => Some(tuple.field(index)?.clone()),
            None => None,
        };
        let value = tuple.field(self.agg_field)?.as_int().map(i64::from);

        match self.groups.get_mut(&key) {
            Some(acc) => acc.update(self.op, value)?,
            None => {
                self.order.push(key.clone());
                self.groups.insert(key, Accumulator::start(value));
            }
        }
        Ok(())
    }

    pub fn group_field(&self) -> Option<usize> {
        self.group_field
    }

    pub fn aggregate_field(&self) -> usize {
        self.agg_field
    }

    pub fn op(&self) -> AggregateOp {
        self.op
    }

    /// Forgets every group.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.order.clear();
    }

    /// Returns the output schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns an iterator over one result tuple per group.
    pub fn iter(&self) -> Result<AggregateIter> {
        let mut rows = Vec::with_capacity(self.order.len());
        for key in &self.order {
            let Some(acc) = self.groups.get(key) else {
                continue;
            };
            let value = Field::Int(acc.result(self.op)?);
            let fields = match key {
                Some(group) => vec![group.clone(), value],
                None => vec![value],
            };
            rows.push(Tuple::new(Arc::clone(&self.schema), fields)?);
        }
        Ok(AggregateIter { rows, position: 0 })
    }
}

/// Restartable iterator over computed aggregate rows.
pub struct AggregateIter {
    rows: Vec<Tuple>,
    position: usize,
}

impl AggregateIter {
    /// Restarts at the first row.
    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl Iterator for AggregateIter {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
        }
        row
    }
}
