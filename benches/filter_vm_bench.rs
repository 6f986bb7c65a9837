//! Benchmarks for filter compilation and bytecode execution.
//!
//! Compiles once per benchmark group, then measures `vm::execute` per
//! document, plus a separate group measuring `compile_filter` itself since
//! the parser and compiler run once per query, not once per document.

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use infidex::filter::{compile_filter, vm};
use infidex::types::{Document, Field, FieldValue, InternalId, WeightClass};

fn doc_with(year: i64, genre: &str, rating: f64) -> Document {
    let mut fields = HashMap::new();
    fields.insert(
        "text".to_string(),
        Field {
            value: FieldValue::Str("a document".to_string()),
            weight: WeightClass::Med,
            indexable: true,
            facetable: false,
        },
    );
    fields.insert("year".to_string(), Field::new(FieldValue::Int(year)));
    fields.insert("genre".to_string(), Field::new(FieldValue::Str(genre.to_string())));
    fields.insert("rating".to_string(), Field::new(FieldValue::Float(rating)));
    Document {
        key: year,
        segment: 0,
        internal_id: InternalId::new(0),
        fields,
        text_field: "text".to_string(),
        deleted: false,
    }
}

const EXPRESSIONS: &[&str] = &[
    "year >= 2000",
    "genre = 'drama' AND rating > 7.5",
    "genre IN ('drama', 'comedy', 'action') OR year BETWEEN 1990 AND 2000",
    "year >= 2000 ? rating > 8.0 : rating > 9.0",
];

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_compile");
    for expr in EXPRESSIONS {
        group.bench_function(*expr, |b| {
            b.iter(|| compile_filter(black_box(expr)).unwrap());
        });
    }
    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_execute");
    let doc = doc_with(2010, "drama", 8.2);

    for expr in EXPRESSIONS {
        let compiled = compile_filter(expr).unwrap();
        group.bench_function(*expr, |b| {
            b.iter(|| vm::execute(black_box(&compiled), black_box(&doc)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_execute);
criterion_main!(benches);
