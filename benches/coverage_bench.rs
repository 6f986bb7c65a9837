//! Benchmarks for the Coverage Engine and the Damerau-Levenshtein distance
//! it leans on for fuzzy sub-matching.
//!
//! A fixed table of word pairs at increasing edit distance, run through
//! the distance function in a tight loop, plus `compute_coverage` itself
//! over query/doc text pairs of a few representative shapes.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use infidex::config::EngineConfig;
use infidex::coverage::compute_coverage;
use infidex::damerau::damerau_distance;

fn word_pairs() -> Vec<(&'static str, &'static str)> {
    vec![
        ("rust", "rust"),
        ("rust", "ruts"),
        ("programming", "programing"),
        ("algorithm", "algorythm"),
        ("performance", "performence"),
        ("optimization", "optimisation"),
        ("document", "docmuent"),
        ("serverless", "serveless"),
        ("engineering", "engeneering"),
        ("completely", "diferent"),
    ]
}

fn bench_damerau_distance(c: &mut Criterion) {
    let pairs = word_pairs();
    c.bench_function("damerau_distance/pairs", |b| {
        b.iter(|| {
            for (a, bstr) in &pairs {
                black_box(damerau_distance(a, bstr));
            }
        });
    });
}

fn bench_compute_coverage(c: &mut Criterion) {
    let config = EngineConfig::default();
    let mut group = c.benchmark_group("compute_coverage");

    let cases: &[(&str, &str, &str)] = &[
        ("exact", "batman begins", "batman begins is a film about batman"),
        ("fuzzy_typo", "battamam", "the story of batman and his allies"),
        ("prefix", "prog", "programming in rust is a joy for programmers"),
        (
            "long_doc",
            "rust async programming",
            "this article covers rust programming patterns including async \
             rust, ownership, borrowing, and concurrency in modern rust code",
        ),
    ];

    for (name, query, doc) in cases {
        let words: Vec<String> = query.split_whitespace().map(str::to_string).collect();
        group.bench_function(*name, |b| {
            b.iter(|| {
                compute_coverage(
                    black_box(&words),
                    black_box(doc),
                    black_box(0),
                    |_| 1.0,
                    black_box(&config),
                )
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_damerau_distance, bench_compute_coverage);
criterion_main!(benches);
