use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sheet_stacker::processing::combine;
use sheet_stacker::types::{SheetTable, Value};

/// `tables` tables of `rows` rows; each table shares half its columns with the previous one.
fn overlapping_tables(tables: usize, rows: usize, width: usize) -> Vec<SheetTable> {
    (0..tables)
        .map(|t| {
            let offset = t * width / 2;
            let columns: Vec<String> = (offset..offset + width).map(|c| format!("col{c}")).collect();
            let data = (0..rows)
                .map(|r| (0..width).map(|c| Value::Int64((r * width + c) as i64)).collect())
                .collect();
            SheetTable::new(columns, data)
        })
        .collect()
}

fn bench_combine(c: &mut Criterion) {
    let mut group = c.benchmark_group("combine");
    for &tables in &[4usize, 32, 128] {
        let input = overlapping_tables(tables, 500, 12);
        group.bench_with_input(BenchmarkId::from_parameter(tables), &input, |b, input| {
            b.iter(|| combine(black_box(input.clone())))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_combine);
criterion_main!(benches);
