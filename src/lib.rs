//! In-memory, error-tolerant, prefix-sensitive full-text search.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   ┌───────────────┐   ┌──────────────┐   ┌────────────┐
//! │ tokenizer.rs│──▶│  index/build  │──▶│ candidate.rs │──▶│ pipeline.rs│
//! │             │   │ (InvertedIdx) │   │  (stage 1)   │   │ (search()) │
//! └─────────────┘   └───────────────┘   └──────────────┘   └─────┬──────┘
//!                                                                 │
//!            ┌────────────────────────────────────────────────────┘
//!            ▼
//! ┌───────────────┐   ┌────────────┐   ┌────────────┐   ┌───────────┐
//! │ coverage/*.rs │──▶│ fusion.rs  │──▶│ segment.rs │──▶│  filter/* │
//! │   (stage 2)   │   │ (ranking)  │   │ (top-K)    │   │ (VM post- │
//! └───────────────┘   └────────────┘   └────────────┘   │  filter)  │
//!                                                        └───────────┘
//! ```
//!
//! `SearchEngine::search` (in [`pipeline`]) is the single entry point: it
//! runs candidate selection, the coverage re-scoring pass, fusion ranking,
//! consolidation, filtering, and top-K selection in one call.

pub mod candidate;
pub mod cli;
pub mod config;
pub mod coverage;
pub mod damerau;
pub mod error;
pub mod filter;
pub mod fusion;
pub mod index;
pub mod lcs;
pub mod pipeline;
pub mod postings_iter;
pub mod scoring;
pub mod scratch;
pub mod segment;
pub mod snapshot;
pub mod tokenizer;
pub mod types;
pub mod wordmatcher;

pub use config::EngineConfig;
pub use error::{FilterParseError, FilterRuntimeError, InfidexError, InvariantError, SerializationError, Result};
pub use pipeline::SearchEngine;
pub use types::{
    Boost, CorpusStats, DocKey, Document, Facets, Field, FieldValue, InternalId, InvertedIndex,
    Posting, Query, ScoreEntry, SearchResult, SortBy, Term, WeightClass,
};
