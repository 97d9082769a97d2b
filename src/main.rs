use std::sync::Arc;

use strata::common::{DbConfig, TransactionId};
use strata::execution::{
    Aggregate, AggregateOp, CompareOp, Filter, Insert, OpIterator, Predicate, SeqScan, TupleIterator,
};
use strata::tuple::{DataType, Schema, TupleBuilder};
use strata::Database;

fn main() -> strata::Result<()> {
    println!("Strata - page-oriented storage and execution core");
    println!("=================================================\n");

    // Create a temporary table file for demonstration
    let table_path = "demo.dat";

    // Small pages and a small pool so eviction actually happens
    let config = DbConfig::new().with_page_size(256).with_pool_pages(4);
    let db = Database::new(config);
    println!(
        "Created database: page size {} bytes, pool of {} pages",
        config.page_size, config.pool_pages
    );

    let schema = Schema::builder()
        .column("dept", DataType::Integer)
        .column("salary", DataType::Integer)
        .column("name", DataType::Char(12))
        .build_arc()?;
    let table = db.create_table(table_path, "emp", Arc::clone(&schema), "name")?;
    println!("Created table emp ({})\n", schema);

    // Insert some rows through the Insert operator
    let txn = TransactionId::new();
    let rows = (0..40)
        .map(|i| {
            TupleBuilder::new(Arc::clone(&schema))
                .value(i % 4)
                .value(1000 + i * 10)
                .value(format!("emp{}", i))
                .build()
        })
        .collect::<strata::Result<Vec<_>>>()?;
    let source = TupleIterator::new(Arc::clone(&schema), rows)?;

    let mut insert = Insert::new(&db, txn, Box::new(source), table)?;
    insert.open()?;
    if let Some(count) = insert.next()? {
        println!("Inserted {} rows", count);
    }
    insert.close();
    db.buffer_pool().transaction_complete(txn, true)?;

    let file = db.catalog().file(table)?;
    println!("  - Pages on disk: {}", file.num_pages()?);
    println!("  - Cached pages: {:?}\n", db.buffer_pool().cached_page_ids());

    // SELECT dept, AVG(salary) FROM emp WHERE salary < 1200 GROUP BY dept
    let txn = TransactionId::new();
    let scan = SeqScan::new(&db, txn, table, Some("e"))?;
    let filter = Filter::new(Predicate::new(1, CompareOp::LessThan, 1200), Box::new(scan));
    let mut avg = Aggregate::new(Box::new(filter), 1, Some(0), AggregateOp::Avg)?;

    avg.open()?;
    println!("{}", avg.schema());
    while let Some(row) = avg.next()? {
        println!("{}", row);
    }
    avg.close();
    db.buffer_pool().transaction_complete(txn, true)?;

    // Clean up
    std::fs::remove_file(table_path).ok();
    println!("\nDemo completed successfully!");
    Ok(())
}
