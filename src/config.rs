//! Engine-wide tunables.
//!
//! There is no config-file layer: an `EngineConfig` is just a plain struct
//! with a `Default` impl, constructed in code and threaded through index
//! building and search. Named-constant-with-`Default`-impl, not a parsed
//! file format.

/// Tunables that affect both index construction and search.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// BM25 term-frequency saturation constant.
    pub bm25_k1: f64,
    /// BM25 document-length normalization constant.
    pub bm25_b: f64,
    /// Minimum whole-word length considered by the coverage engine's
    /// word-boundary matchers and the lexical pre-screen.
    pub min_word_size: usize,
    /// Configured n-gram sizes, smallest first. The smallest size is also
    /// used as "minimum stem length" by the Fusion Scorer.
    pub ngram_sizes: Vec<usize>,
    /// Ordered delimiter character set used to split text into word tokens.
    pub delimiters: Vec<char>,
    /// Default stage-1 → stage-2 fan-out when a `Query` does not override it.
    pub default_coverage_depth: usize,
    /// Result truncation threshold: once a descending walk from the tail
    /// reaches a score at or above this, earlier (higher) entries are all
    /// kept without further individual justification.
    pub truncation_score: u16,
    /// Minimum word-hit count that, on its own, halts the truncation walk.
    pub min_word_hits: u32,
    /// Capacity of the per-query IDF cache (`query text -> per-token IDF`).
    pub idf_cache_capacity: usize,
    /// Positional-prefix doc-count threshold above which very short queries
    /// skip the coverage stage entirely.
    pub short_query_prefix_skip_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bm25_k1: 1.2,
            bm25_b: 0.75,
            min_word_size: 2,
            ngram_sizes: vec![3, 4],
            delimiters: vec![
                ' ', '\t', '\n', '\r', ',', '.', ';', ':', '!', '?', '"', '\'', '(', ')', '[', ']',
                '{', '}', '/', '\\', '-', '_',
            ],
            default_coverage_depth: 500,
            truncation_score: 254,
            min_word_hits: 1,
            idf_cache_capacity: 4096,
            short_query_prefix_skip_threshold: 500,
        }
    }
}
