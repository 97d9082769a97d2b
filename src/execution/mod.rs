mod aggregate;
mod aggregator;
mod delete;
mod filter;
mod insert;
mod mutation;
mod operator;
mod predicate;
mod seq_scan;
mod tuple_iterator;

pub use aggregate::Aggregate;
pub use aggregator::{AggregateIter, AggregateOp, Aggregator};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use operator::OpIterator;
pub use predicate::Predicate;
pub use seq_scan::SeqScan;
pub use tuple_iterator::TupleIterator;

pub use crate::tuple::CompareOp;
