use clap::Parser;
use std::collections::HashMap;
use std::fs;

use infidex::cli::{Cli, Commands};
use infidex::config::EngineConfig;
use infidex::filter;
use infidex::index::{assign_internal_ids, build_index};
use infidex::snapshot::{load_snapshot, save_snapshot};
use infidex::types::{Document, Field, FieldValue, InternalId, Query, WeightClass};
use infidex::SearchEngine;

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Index { input, output } => run_index(&input, &output),
        Commands::Search { index, query, limit, filter } => run_search(&index, &query, limit, filter),
        Commands::FilterCheck { expression } => run_filter_check(&expression),
    };

    if let Err(message) = result {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

#[cfg(feature = "serde_json")]
fn json_to_field_value(value: &serde_json::Value) -> FieldValue {
    match value {
        serde_json::Value::Null => FieldValue::Null,
        serde_json::Value::Bool(b) => FieldValue::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Int(i)
            } else {
                FieldValue::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => FieldValue::Str(s.clone()),
        other => FieldValue::Str(other.to_string()),
    }
}

#[cfg(feature = "serde_json")]
fn load_documents(path: &str) -> Result<Vec<Document>, String> {
    let raw = fs::read_to_string(path).map_err(|e| format!("reading `{path}`: {e}"))?;
    let parsed: serde_json::Value = serde_json::from_str(&raw).map_err(|e| format!("parsing JSON: {e}"))?;
    let entries = parsed.as_array().ok_or("expected a top-level JSON array")?;

    let mut documents = Vec::with_capacity(entries.len());
    for entry in entries {
        let key = entry.get("key").and_then(|v| v.as_i64()).ok_or("document missing integer `key`")?;
        let text = entry.get("text").and_then(|v| v.as_str()).ok_or("document missing string `text`")?;

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
        if let Some(extra) = entry.get("fields").and_then(|v| v.as_object()) {
            for (name, value) in extra {
                fields.insert(
                    name.clone(),
                    Field {
                        value: json_to_field_value(value),
                        weight: WeightClass::Med,
                        indexable: false,
                        facetable: true,
                    },
                );
            }
        }

        documents.push(Document {
            key,
            segment: 0,
            internal_id: InternalId::new(0),
            fields,
            text_field: "text".to_string(),
            deleted: false,
        });
    }
    Ok(documents)
}

#[cfg(not(feature = "serde_json"))]
fn load_documents(_path: &str) -> Result<Vec<Document>, String> {
    Err("the `index` command requires the `serde_json` feature".to_string())
}

fn run_index(input: &str, output: &str) -> Result<(), String> {
    let documents = load_documents(input)?;
    let index = build_index(assign_internal_ids(documents), &EngineConfig::default());
    let bytes = save_snapshot(&index).map_err(|e| e.to_string())?;
    fs::write(output, bytes).map_err(|e| format!("writing `{output}`: {e}"))?;
    println!("indexed {} documents into `{output}`", index.stats.doc_count);
    Ok(())
}

fn run_search(index_path: &str, query_text: &str, limit: i64, filter_expr: Option<String>) -> Result<(), String> {
    let bytes = fs::read(index_path).map_err(|e| format!("reading `{index_path}`: {e}"))?;
    let index = load_snapshot(&bytes).map_err(|e| e.to_string())?;
    let engine = SearchEngine::new(index, EngineConfig::default());

    let mut query = Query::new(query_text).with_max_results(limit);
    if let Some(expr) = filter_expr {
        query.filter = Some(filter::compile_filter(&expr).map_err(|e| e.to_string())?);
    }

    let result = engine.search(&query);
    for record in &result.records {
        println!("{}\t{}\t{}", record.key, record.score, record.tiebreaker);
    }
    if result.did_time_out {
        eprintln!("warning: search timed out before ranking all candidates");
    }
    Ok(())
}

fn run_filter_check(expression: &str) -> Result<(), String> {
    filter::compile_filter(expression).map_err(|e| e.to_string())?;
    println!("ok: `{expression}` compiles");
    Ok(())
}
