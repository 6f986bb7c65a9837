//! Core data model: documents, terms, the inverted index, corpus statistics,
//! queries, and score entries.
//!
//! Newtypes wrap the bare integers that have crate-wide meaning (`InternalId`,
//! `DocKey`) so a caller cannot accidentally pass a document key where an
//! internal id is expected, or vice versa. Validated construction happens at
//! the boundary (ingestion); once a `Document` exists its fields are
//! considered trusted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::index::prefix::PrefixIndex;

/// Dense, zero-based identifier assigned at index build time. Never reused;
/// segments of the same document key are assigned contiguous internal ids
/// with segment 0 first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternalId(pub u32);

impl InternalId {
    pub fn new(value: u32) -> Self {
        InternalId(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// External document key. Signed 64-bit; not required to be unique — the
/// same key may label multiple segments of one long document.
pub type DocKey = i64;

/// An untyped scalar field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Str(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_str_repr(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(fl) => fl.to_string(),
            FieldValue::Str(s) => s.clone(),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Int(i) => *i != 0,
            FieldValue::Float(f) => *f != 0.0,
            FieldValue::Str(s) => !s.is_empty(),
        }
    }

    /// Ordering used by comparison opcodes. Numeric when both sides parse as
    /// numbers; otherwise falls back to a case-insensitive lexicographic
    /// compare. This is the coercion policy spec'd for BETWEEN / `>=` / `<=`
    /// on numeric-looking string fields (see DESIGN.md open question 3).
    pub fn compare_to(&self, other: &FieldValue) -> Option<std::cmp::Ordering> {
        if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
            return a.partial_cmp(&b);
        }
        let a = self.as_str_repr().to_lowercase();
        let b = other.as_str_repr().to_lowercase();
        Some(a.cmp(&b))
    }

    /// Case-insensitive equality, with `null` never equal to anything but
    /// another `null`.
    pub fn eq_ci(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Null, _) | (_, FieldValue::Null) => false,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            _ => {
                if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
                    a == b
                } else {
                    self.as_str_repr().to_lowercase() == other.as_str_repr().to_lowercase()
                }
            }
        }
    }
}

/// Relative importance of a field, used by the consumed inverted-index
/// builder to weight postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightClass {
    Low,
    Med,
    High,
}

impl WeightClass {
    pub fn as_byte(self) -> u8 {
        match self {
            WeightClass::Low => 1,
            WeightClass::Med => 2,
            WeightClass::High => 4,
        }
    }
}

/// A single named, typed attribute on a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub value: FieldValue,
    pub weight: WeightClass,
    pub indexable: bool,
    pub facetable: bool,
}

impl Field {
    pub fn new(value: FieldValue) -> Self {
        Field {
            value,
            weight: WeightClass::Med,
            indexable: false,
            facetable: false,
        }
    }
}

/// An immutable (post-ingestion) document.
///
/// Invariant: for any external key `K`, either exactly one document has
/// `segment == 0` and no others share `K`, or segments `0..M` all exist with
/// contiguous internal ids, segment 0 first. The segment-0 document carries
/// the full original text in the designated text field even when later
/// segments only carry a chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub key: DocKey,
    pub segment: u32,
    pub internal_id: InternalId,
    pub fields: HashMap<String, Field>,
    /// Name of the one designated indexable text field.
    pub text_field: String,
    pub deleted: bool,
}

impl Document {
    /// The normalized searchable text, or an empty string if the text field
    /// is missing or not a string.
    pub fn text(&self) -> &str {
        match self.fields.get(&self.text_field) {
            Some(Field {
                value: FieldValue::Str(s),
                ..
            }) => s.as_str(),
            _ => "",
        }
    }
}

/// A single posting: one (internal document id, weight, term frequency)
/// entry in a term's postings list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub internal_id: u32,
    pub weight: u8,
    pub term_freq: u32,
}

/// One record per distinct token or n-gram observed at index time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    pub text: String,
    pub id: u32,
    /// Postings sorted ascending by `internal_id`; `doc_freq == postings.len()`.
    pub postings: Vec<Posting>,
}

impl Term {
    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }
}

/// The frozen, read-only index built in one pass over the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvertedIndex {
    /// term text -> term id
    pub term_ids: HashMap<String, u32>,
    /// dense id-indexed term table
    pub terms: Vec<Term>,
    /// positional-prefix / FST-equivalent structure over term text
    pub prefix: PrefixIndex,
    pub documents: Vec<Document>,
    pub stats: CorpusStats,
}

impl InvertedIndex {
    pub fn term(&self, text: &str) -> Option<&Term> {
        self.term_ids.get(text).map(|&id| &self.terms[id as usize])
    }

    pub fn document(&self, internal_id: InternalId) -> Option<&Document> {
        self.documents.get(internal_id.get() as usize)
    }

    /// Verifies the one-pass-build invariants: dense, gapless internal ids
    /// and postings sorted ascending by internal id. Debug-only; a corrupt
    /// index built some other way should fail loudly in tests, not silently
    /// misrank in release.
    #[cfg(debug_assertions)]
    pub fn check_well_formed(&self) -> Result<(), crate::error::InvariantError> {
        for (i, doc) in self.documents.iter().enumerate() {
            if doc.internal_id.get() != i as u32 {
                return Err(crate::error::InvariantError::DenseIdGap {
                    expected: i as u32,
                    found: doc.internal_id.get(),
                });
            }
        }
        for term in &self.terms {
            if !term.postings.windows(2).all(|w| w[0].internal_id < w[1].internal_id) {
                return Err(crate::error::InvariantError::PostingListNotSorted {
                    term: term.text.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Corpus-wide statistics computed once, after the one-pass build.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CorpusStats {
    pub doc_count: u32,
    pub avg_doc_len: f64,
}

/// A field-sort direction and name pair.
#[derive(Debug, Clone)]
pub struct SortBy {
    pub field: String,
    pub ascending: bool,
}

/// A per-field score multiplier applied after filtering.
#[derive(Debug, Clone)]
pub struct Boost {
    pub field: String,
    pub value: FieldValue,
    pub multiplier: f64,
}

/// The internal, fully-resolved search request.
#[derive(Debug, Clone)]
pub struct Query {
    pub text: String,
    pub max_results: usize,
    pub time_out_ms: u64,
    pub enable_coverage: bool,
    pub coverage_depth: usize,
    pub enable_facets: bool,
    pub enable_boost: bool,
    pub remove_duplicates: bool,
    pub filter: Option<crate::filter::bytecode::CompiledFilter>,
    pub boosts: Option<Vec<Boost>>,
    pub sort_by: Option<SortBy>,
}

impl Query {
    /// Builds a query from free text, clamping/normalizing its fields:
    /// `time_out_ms` is clamped to `[0, 10000]`; `max_results < 1` is
    /// normalized to a 0-result response (represented here as `max_results:
    /// 0`, which the pipeline short-circuits on).
    pub fn new(text: impl Into<String>) -> Self {
        Query {
            text: text.into(),
            max_results: 10,
            time_out_ms: 1000,
            enable_coverage: true,
            coverage_depth: 500,
            enable_facets: false,
            enable_boost: false,
            remove_duplicates: true,
            filter: None,
            boosts: None,
            sort_by: None,
        }
    }

    pub fn with_max_results(mut self, max_results: i64) -> Self {
        self.max_results = if max_results < 1 { 0 } else { max_results as usize };
        self
    }

    pub fn with_time_out_ms(mut self, time_out_ms: i64) -> Self {
        self.time_out_ms = time_out_ms.clamp(0, 10_000) as u64;
        self
    }
}

/// One ranked hit. Primary score is the packed `(precedence << 8) |
/// semantic_byte` produced by the Fusion Scorer; ordering is primary score
/// descending, then tiebreaker descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEntry {
    pub key: DocKey,
    pub score: u16,
    pub tiebreaker: u8,
    pub segment: u32,
}

impl ScoreEntry {
    pub fn new(key: DocKey, score: u16, tiebreaker: u8, segment: u32) -> Self {
        ScoreEntry {
            key,
            score,
            tiebreaker,
            segment,
        }
    }

    fn sort_key(&self) -> (u16, u8) {
        (self.score, self.tiebreaker)
    }
}

impl PartialOrd for ScoreEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoreEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Rich per-(query, document) feature vector produced by the Coverage
/// Engine and consumed by the Fusion Scorer.
#[derive(Debug, Clone, Default)]
pub struct CoverageFeatures {
    pub coverage_byte: u8,
    pub distinct_query_terms: u32,
    pub terms_with_any_match: u32,
    pub terms_fully_matched: u32,
    pub terms_strict_whole: u32,
    pub terms_with_prefix: u32,
    pub first_match_token_index: Option<u32>,
    pub sum_coverage_ratio: f64,
    pub word_hits: u32,
    pub doc_token_count: u32,
    pub longest_prefix_run: u32,
    pub suffix_aligned_run: u32,
    pub span_token_count: u32,
    pub strictly_matched_before_last: u32,
    pub last_term_has_prefix: bool,
    pub per_token_idf: Vec<f64>,
    pub per_token_coverage: Vec<f64>,
    pub idf_weighted_coverage: f64,
    pub total_idf: f64,
    pub missing_idf: f64,
}

impl CoverageFeatures {
    pub fn query_term_count(&self) -> u32 {
        self.distinct_query_terms
    }
}

/// A facet count table: field name -> (value representation -> count).
pub type Facets = HashMap<String, HashMap<String, u64>>;

/// The outcome of one `search()` call.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub records: Vec<ScoreEntry>,
    pub facets: Option<Facets>,
    pub did_time_out: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_entry_orders_by_score_then_tiebreaker() {
        let a = ScoreEntry::new(1, 100, 5, 0);
        let b = ScoreEntry::new(2, 100, 9, 0);
        let c = ScoreEntry::new(3, 200, 0, 0);
        assert!(c > b);
        assert!(b > a);
    }

    #[test]
    fn field_value_null_never_equals_non_null() {
        assert!(!FieldValue::Null.eq_ci(&FieldValue::Int(0)));
        assert!(FieldValue::Null.eq_ci(&FieldValue::Null));
    }

    #[test]
    fn field_value_numeric_string_coercion() {
        let a = FieldValue::Str("2000".into());
        let b = FieldValue::Int(1999);
        assert_eq!(a.compare_to(&b), Some(std::cmp::Ordering::Greater));
    }

    #[test]
    fn field_value_non_numeric_string_falls_back_to_lexicographic() {
        let a = FieldValue::Str("apple".into());
        let b = FieldValue::Str("banana".into());
        assert_eq!(a.compare_to(&b), Some(std::cmp::Ordering::Less));
    }

    #[test]
    fn query_normalizes_invalid_max_results_to_zero() {
        let q = Query::new("hello").with_max_results(-1);
        assert_eq!(q.max_results, 0);
    }

    #[test]
    fn query_clamps_timeout() {
        let q = Query::new("hello").with_time_out_ms(50_000);
        assert_eq!(q.time_out_ms, 10_000);
    }
}
