//! FILENAME: grouping-engine/benches/grouping_calculations.rs
//! Criterion benchmarks for the grouping engine over synthetic row sets.

use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use grouping_engine::{group_rows, GroupingContext};
use table_model::{Column, ColumnSet, DataValue, Record, Row};

const DEPTS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];
const REGIONS: [&str; 4] = ["north", "south", "east", "west"];

fn synthetic_rows(count: usize) -> Vec<Rc<Row>> {
    (0..count)
        .map(|i| {
            Rc::new(Row::leaf(
                i.to_string(),
                i,
                Rc::new(Record::from_pairs([
                    ("dept", DataValue::from(DEPTS[i % DEPTS.len()])),
                    ("region", DataValue::from(REGIONS[i % REGIONS.len()])),
                    ("amount", DataValue::from((i % 97) as f64)),
                ])),
            ))
        })
        .collect()
}

fn context() -> GroupingContext {
    GroupingContext::new(ColumnSet::new(vec![
        Column::new("dept"),
        Column::new("region"),
        Column::aggregated("amount", "sum"),
    ]))
}

fn bench_grouping(c: &mut Criterion) {
    let ctx = context();
    let keys = vec!["dept".to_string(), "region".to_string()];

    for &count in &[1_000usize, 10_000] {
        let rows = synthetic_rows(count);
        c.bench_function(&format!("group_two_levels_{}", count), |b| {
            b.iter(|| {
                let result = group_rows(black_box(&rows), black_box(&keys), &ctx);
                black_box(result.flat_rows.len())
            })
        });
    }
}

fn bench_grouping_with_aggregation(c: &mut Criterion) {
    let ctx = context();
    let keys = vec!["dept".to_string()];
    let rows = synthetic_rows(10_000);

    c.bench_function("group_and_aggregate_10000", |b| {
        b.iter(|| {
            let result = group_rows(black_box(&rows), black_box(&keys), &ctx);
            // Force the lazy aggregates.
            for group in &result.rows {
                black_box(group.value(&ctx, "amount"));
            }
        })
    });
}

criterion_group!(benches, bench_grouping, bench_grouping_with_aggregation);
criterion_main!(benches);
