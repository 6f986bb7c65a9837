//! End-to-end search and filter scenarios exercised against a full
//! `SearchEngine`, rather than individual module units.

use std::collections::HashMap;

use infidex::config::EngineConfig;
use infidex::filter::compile_filter;
use infidex::index::{assign_internal_ids, build_index};
use infidex::types::{Document, Field, FieldValue, Query, WeightClass};
use infidex::SearchEngine;

fn text_doc(key: i64, text: &str) -> Document {
    let mut fields = HashMap::new();
    fields.insert(
        "text".to_string(),
        Field {
            value: FieldValue::Str(text.to_string()),
            weight: WeightClass::Med,
            indexable: true,
            facetable: false,
        },
    );
    Document {
        key,
        segment: 0,
        internal_id: infidex::types::InternalId::new(0),
        fields,
        text_field: "text".to_string(),
        deleted: false,
    }
}

fn engine_from(docs: Vec<Document>) -> SearchEngine {
    let config = EngineConfig::default();
    let index = build_index(assign_internal_ids(docs), &config);
    SearchEngine::new(index, config)
}

fn record_keys(engine: &SearchEngine, query_text: &str, max_results: i64) -> Vec<i64> {
    let query = Query::new(query_text).with_max_results(max_results);
    engine.search(&query).records.iter().map(|r| r.key).collect()
}

#[test]
fn fuzzy_query_ranks_closer_typo_first() {
    let engine = engine_from(vec![
        text_doc(1, "The quick brown fox jumps over the lazy dog"),
        text_doc(5, "The fox was quick and clever in the forest"),
    ]);
    assert_eq!(record_keys(&engine, "qick fux", 10), vec![5, 1]);
}

#[test]
fn exact_text_query_ranks_first() {
    let engine = engine_from(vec![
        text_doc(1, "The quick brown fox jumps over the lazy dog"),
        text_doc(5, "The fox was quick and clever in the forest"),
        text_doc(6, "Batman and Robin fight crime in Gotham City"),
    ]);
    assert_eq!(record_keys(&engine, "batman", 10), vec![6]);
}

#[test]
fn fuzzy_typo_still_finds_exact_match() {
    let engine = engine_from(vec![
        text_doc(1, "The quick brown fox jumps over the lazy dog"),
        text_doc(5, "The fox was quick and clever in the forest"),
        text_doc(6, "Batman and Robin fight crime in Gotham City"),
    ]);
    assert_eq!(record_keys(&engine, "battamam", 10), vec![6]);
}

#[test]
fn single_word_exact_query() {
    let engine = engine_from(vec![text_doc(7, "Superman flies faster than a speeding bullet")]);
    assert_eq!(record_keys(&engine, "speeding", 10), vec![7]);
}

fn library_corpus() -> Vec<Document> {
    let make = |key: i64, genre: &str, year: i64| {
        let mut fields = HashMap::new();
        fields.insert(
            "text".to_string(),
            Field {
                value: FieldValue::Str(format!("a {genre} book from {year}")),
                weight: WeightClass::Med,
                indexable: true,
                facetable: false,
            },
        );
        fields.insert("genre".to_string(), Field::new(FieldValue::Str(genre.to_string())));
        fields.insert("year".to_string(), Field::new(FieldValue::Str(year.to_string())));
        Document {
            key,
            segment: 0,
            internal_id: infidex::types::InternalId::new(0),
            fields,
            text_field: "text".to_string(),
            deleted: false,
        }
    };
    vec![
        make(1, "Fantasy", 2005),
        make(2, "Fantasy", 1995),
        make(3, "Horror", 1980),
        make(4, "Horror", 1960),
        make(5, "Mystery", 2010),
    ]
}

#[test]
fn filter_on_genre_and_year_range() {
    let engine = engine_from(library_corpus());
    let mut query = Query::new("book").with_max_results(10);
    query.filter = Some(compile_filter("genre = 'Fantasy' AND year >= '2000'").unwrap());
    let mut keys: Vec<i64> = engine.search(&query).records.iter().map(|r| r.key).collect();
    keys.sort();
    assert_eq!(keys, vec![1]);
}

#[test]
fn compound_or_filter_across_genres() {
    let engine = engine_from(library_corpus());
    let mut query = Query::new("book").with_max_results(10);
    query.filter = Some(
        compile_filter("(genre = 'Fantasy' AND year >= '2000') OR (genre = 'Horror' AND year >= '1970')").unwrap(),
    );
    let mut keys: Vec<i64> = engine.search(&query).records.iter().map(|r| r.key).collect();
    keys.sort();
    assert_eq!(keys, vec![1, 3]);
}

#[test]
fn ternary_filter_branches_on_condition() {
    use infidex::filter::vm;
    use infidex::types::InternalId;

    let compiled = compile_filter("age >= 18 ? true : false").unwrap();

    let mut adult_fields = HashMap::new();
    adult_fields.insert("age".to_string(), Field::new(FieldValue::Int(20)));
    let adult = Document {
        key: 1,
        segment: 0,
        internal_id: InternalId::new(0),
        fields: adult_fields,
        text_field: "text".to_string(),
        deleted: false,
    };
    assert!(vm::execute(&compiled, &adult));

    let mut minor_fields = HashMap::new();
    minor_fields.insert("age".to_string(), Field::new(FieldValue::Int(10)));
    let minor = Document {
        key: 2,
        segment: 0,
        internal_id: InternalId::new(0),
        fields: minor_fields,
        text_field: "text".to_string(),
        deleted: false,
    };
    assert!(!vm::execute(&compiled, &minor));
}

#[test]
fn ternary_accepts_bare_literal_branches() {
    use infidex::filter::ast::FilterAst;
    use infidex::filter::parser;

    let ast = parser::parse("age >= 18 ? 'adult' : 'minor'").unwrap();
    assert!(matches!(ast, FilterAst::Ternary(_)));
}

#[test]
fn bad_magic_bytecode_is_rejected_without_state_mutation() {
    use infidex::filter::bytecode::CompiledFilter;

    let filter = compile_filter("year >= 2000").unwrap();
    let mut bytes = filter.to_bytes();
    bytes[0] = b'X';

    let result = CompiledFilter::from_bytes(&bytes);
    assert!(result.is_err());
}

#[test]
fn empty_query_returns_no_results() {
    let engine = engine_from(vec![text_doc(1, "anything at all")]);
    assert_eq!(record_keys(&engine, "", 10), Vec::<i64>::new());
}

#[test]
fn delimiters_only_query_returns_no_results() {
    let engine = engine_from(vec![text_doc(1, "anything at all")]);
    assert_eq!(record_keys(&engine, "   ,, ..  ", 10), Vec::<i64>::new());
}
