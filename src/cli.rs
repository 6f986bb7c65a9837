//! CLI argument surface. Orientation-only: enough to index a JSON corpus,
//! run one search, and check a filter expression compiles — not a full
//! operator tool.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "infidex", about = "In-memory prefix-sensitive full-text search", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build an index from a JSON array of documents and save a snapshot.
    Index {
        /// Path to a JSON file: an array of `{"key": i64, "text": string, "fields": {...}}`.
        #[arg(short, long)]
        input: String,

        /// Output path for the index snapshot.
        #[arg(short, long)]
        output: String,
    },

    /// Load an index snapshot and run one search.
    Search {
        /// Path to an index snapshot produced by `index`.
        #[arg(short, long)]
        index: String,

        /// Query text.
        query: String,

        /// Maximum number of results.
        #[arg(short, long, default_value_t = 10)]
        limit: i64,

        /// Optional filter expression.
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Parse and compile a filter expression without running a search, to
    /// check it for syntax errors.
    FilterCheck {
        /// The filter expression to check.
        expression: String,
    },
}
