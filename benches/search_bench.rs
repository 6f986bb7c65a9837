//! End-to-end `SearchEngine::search` benchmarks over synthetic corpora.
//!
//! A small vocabulary of technical and filler words, shuffled into
//! documents of a few realistic sizes, then benchmarked across a handful
//! of representative query shapes (exact, prefix, multi-term, rare,
//! no-match).

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use infidex::config::EngineConfig;
use infidex::index::{assign_internal_ids, build_index};
use infidex::types::{Document, Field, FieldValue, Query, WeightClass};
use infidex::SearchEngine;

const TECHNICAL_WORDS: &[&str] = &[
    "rust", "programming", "typescript", "javascript", "python", "kubernetes", "docker",
    "microservices", "api", "database", "postgresql", "redis", "graphql", "websocket",
    "authentication", "encryption", "performance", "optimization", "caching", "indexing",
    "algorithm", "concurrency", "parallelism", "async", "ownership", "borrowing", "lifetime",
    "trait", "generic", "compiler", "bytecode", "webassembly",
];

const GENERAL_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "system", "solution", "approach", "method",
    "technique", "implementation", "development", "architecture", "design", "pattern",
];

fn generate_content(word_count: usize, seed: usize) -> String {
    let all_words: Vec<&str> = TECHNICAL_WORDS.iter().chain(GENERAL_WORDS.iter()).copied().collect();
    (0..word_count)
        .map(|i| all_words[(seed * 7 + i * 3) % all_words.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

fn make_corpus(doc_count: usize, words_per_doc: usize) -> Vec<Document> {
    let docs = (0..doc_count)
        .map(|i| {
            let mut fields = HashMap::new();
            fields.insert(
                "text".to_string(),
                Field {
                    value: FieldValue::Str(generate_content(words_per_doc, i)),
                    weight: WeightClass::Med,
                    indexable: true,
                    facetable: false,
                },
            );
            Document {
                key: i as i64,
                segment: 0,
                internal_id: infidex::types::InternalId::new(0),
                fields,
                text_field: "text".to_string(),
                deleted: false,
            }
        })
        .collect();
    assign_internal_ids(docs)
}

fn build_engine(doc_count: usize, words_per_doc: usize) -> SearchEngine {
    let config = EngineConfig::default();
    let index = build_index(make_corpus(doc_count, words_per_doc), &config);
    SearchEngine::new(index, config)
}

fn bench_build_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    for (name, docs, words) in [("small", 20, 200), ("medium", 100, 500)] {
        let corpus = make_corpus(docs, words);
        group.bench_with_input(BenchmarkId::new("build_index", name), &corpus, |b, corpus| {
            b.iter(|| build_index(black_box(corpus.clone()), black_box(&EngineConfig::default())));
        });
    }
    group.finish();
}

fn bench_search_queries(c: &mut Criterion) {
    let engine = build_engine(100, 500);
    let mut group = c.benchmark_group("search_query");

    let queries = [
        ("single_term", "rust"),
        ("multi_term", "rust async programming"),
        ("prefix", "prog"),
        ("rare_term", "webassembly"),
        ("no_match", "xyznonexistent"),
    ];

    for (name, text) in queries {
        group.bench_with_input(BenchmarkId::new("search", name), &text, |b, text| {
            let query = Query::new(*text);
            b.iter(|| engine.search(black_box(&query)));
        });
    }
    group.finish();
}

fn bench_corpus_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("corpus_scaling");
    for (name, docs) in [("small", 20), ("medium", 100), ("large", 500)] {
        let engine = build_engine(docs, 500);
        let query = Query::new("rust programming");
        group.bench_with_input(BenchmarkId::new("search", name), &docs, |b, _| {
            b.iter(|| engine.search(black_box(&query)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_index, bench_search_queries, bench_corpus_scaling);
criterion_main!(benches);
