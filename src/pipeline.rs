//! Search Pipeline: the orchestrator tying candidate selection, the
//! Coverage Engine, the Fusion Scorer, and segment consolidation/top-K
//! together into one `search()` call.
//!
//! Staged-dispatch shape: reject degenerate input up front, compute a
//! cheap backbone pass, escalate to a more expensive re-scoring pass only
//! for the candidates that need it, then consolidate and truncate.
//! `INFIDEX_COVERAGE_DEBUG` gates `eprintln!` tracing rather than pulling
//! in a logging crate.

use std::time::Instant;

use crate::candidate::select_candidates;
use crate::config::EngineConfig;
use crate::filter::vm;
use crate::fusion::fuse;
use crate::lcs::lcs_with_tolerance;
use crate::scoring::{idf, BackboneHeap};
use crate::segment::{consolidate_segments, get_top_k};
use crate::tokenizer::{StandardTokenizer, Tokenizer};
use crate::types::{Boost, DocKey, InternalId, InvertedIndex, Query, ScoreEntry, SearchResult, SortBy};
use crate::wordmatcher::{DefaultWordMatcher, WordMatcher};

fn debug_enabled() -> bool {
    std::env::var_os("INFIDEX_COVERAGE_DEBUG").is_some()
}

macro_rules! coverage_trace {
    ($($arg:tt)*) => {
        if debug_enabled() {
            eprintln!($($arg)*);
        }
    };
}

/// Owns the frozen index plus the stateful pieces (`WordMatcher` cache) a
/// search needs across calls. Every interior mutable piece is its own
/// mutex, so concurrent `search` calls are safe.
pub struct SearchEngine {
    pub index: InvertedIndex,
    pub config: EngineConfig,
    word_matcher: DefaultWordMatcher,
    key_index: std::collections::HashMap<(DocKey, u32), usize>,
    /// Per-term IDF memoization, shared across concurrent `search` calls.
    /// Capacity-bounded per `config.idf_cache_capacity`: once exceeded the
    /// whole cache is cleared rather than tracking per-entry recency, since
    /// IDF is cheap enough to recompute and the corpus rarely churns between
    /// queries.
    idf_cache: dashmap::DashMap<String, f64>,
}

impl SearchEngine {
    pub fn new(index: InvertedIndex, config: EngineConfig) -> Self {
        let key_index = index
            .documents
            .iter()
            .enumerate()
            .map(|(i, d)| ((d.key, d.segment), i))
            .collect();
        SearchEngine {
            index,
            config,
            word_matcher: DefaultWordMatcher::new(),
            key_index,
            idf_cache: dashmap::DashMap::new(),
        }
    }

    fn idf_of(&self, word: &str) -> f64 {
        if let Some(cached) = self.idf_cache.get(word) {
            return *cached;
        }
        let value = self.index.term(word).map(|t| idf(self.index.stats.doc_count, t.doc_freq())).unwrap_or(0.0);
        if self.idf_cache.len() >= self.config.idf_cache_capacity {
            self.idf_cache.clear();
        }
        self.idf_cache.insert(word.to_string(), value);
        value
    }

    /// Runs the full ten-step pipeline for one query.
    pub fn search(&self, query: &Query) -> SearchResult {
        let started = Instant::now();
        let timeout = std::time::Duration::from_millis(query.time_out_ms);

        // Step 1: reject degenerate input.
        if query.text.trim().is_empty() || query.max_results == 0 {
            return SearchResult::default();
        }

        // Step 2: normalize.
        let normalized = crate::tokenizer::normalize(&query.text);
        let tokenizer = StandardTokenizer::from_config(&self.config);
        let coverage_depth = if query.coverage_depth > 0 {
            query.coverage_depth
        } else {
            self.config.default_coverage_depth
        };

        // Step 3: stage-1 candidate selection.
        let candidate_result = select_candidates(&self.index, &normalized, &self.config, query.max_results.max(coverage_depth));
        coverage_trace!("stage1: {} candidates for `{}`", candidate_result.candidates.len(), normalized);

        if candidate_result.candidates.is_empty() {
            return SearchResult::default();
        }

        let mut did_time_out = false;

        // Step 4: consolidate stage-1 results for the fallback path, ranked
        // purely by backbone upper bound.
        let mut backbone_heap = BackboneHeap::new(coverage_depth);
        for internal_id in candidate_result.candidates.iter() {
            let bound = candidate_result.upper_bounds.get(internal_id as usize).copied().unwrap_or(0.0);
            backbone_heap.push(internal_id, bound);
        }
        let backbone_ranked = backbone_heap.into_sorted_vec();

        // Step 5: coverage-eligibility decision. Disabled explicitly, or the
        // query is too short relative to the corpus's prefix fan-out, or the
        // candidate set is already small enough that backbone ranking alone
        // is reliable: skip the expensive re-scoring pass.
        let query_words = tokenizer.word_tokens_for_coverage(&normalized, self.config.min_word_size);
        let skip_coverage = !query.enable_coverage
            || query_words.is_empty()
            || (normalized.chars().count() < 3
                && self.index.prefix.prefix_count(&normalized, self.config.short_query_prefix_skip_threshold + 1)
                    > self.config.short_query_prefix_skip_threshold);

        let mut scores: Vec<ScoreEntry> = Vec::with_capacity(backbone_ranked.len());
        // Per-(key, segment) word-hit/LCS data backing the tail-walk below.
        // Absent entries (the skip-coverage path never computes coverage
        // features) default to (0, 0), which still lets the score-floor
        // branch of the walk's stop condition apply.
        let mut coverage_aux: std::collections::HashMap<(DocKey, u32), (u32, usize)> = std::collections::HashMap::new();

        if skip_coverage {
            coverage_trace!("stage2: skipped (coverage disabled or query too short)");
            for (internal_id, bound) in &backbone_ranked {
                if let Some(doc) = self.index.document(InternalId::new(*internal_id)) {
                    let packed = bound.clamp(0.0, u16::MAX as f64) as u16;
                    scores.push(ScoreEntry::new(doc.key, packed, 0, doc.segment));
                }
            }
        } else {
            // WordMatcher supplementation: union in any additional internal
            // ids the LD1/affix matcher finds that stage 1 missed.
            let supplemental = self.word_matcher.matching_ids(&self.index, &query_words);
            let mut seen: std::collections::HashSet<u32> =
                backbone_ranked.iter().map(|(id, _)| *id).collect();
            let mut all_ids: Vec<u32> = backbone_ranked.iter().map(|(id, _)| *id).collect();
            for id in supplemental {
                if seen.insert(id) {
                    all_ids.push(id);
                }
            }

            let total_idf: f64 = query_words.iter().map(|w| self.idf_of(w)).sum();
            let idf_lookup = |word: &str| -> f64 { self.idf_of(word) };

            for (i, internal_id) in all_ids.iter().enumerate() {
                // Timeout check at a stage boundary, not per-candidate: cheap
                // enough to check every candidate, but checking on a coarser
                // cadence keeps this branch off the hottest path.
                if i % 64 == 0 && started.elapsed() > timeout {
                    did_time_out = true;
                    break;
                }

                let Some(doc) = self.index.document(InternalId::new(*internal_id)) else {
                    continue;
                };
                let doc_text = doc.text();
                let lcs = if query_words.len() == 1 {
                    lcs_with_tolerance(&query_words[0], doc_text)
                } else {
                    0
                };
                let bm25_bound = candidate_result.upper_bounds.get(*internal_id as usize).copied().unwrap_or(0.0);
                let bm25_norm = if total_idf > 0.0 { (bm25_bound / (total_idf * 3.0)).min(1.0) } else { 0.0 };

                let features = crate::coverage::compute_coverage(&query_words, doc_text, lcs, idf_lookup, &self.config);
                let doc_words: Vec<String> = doc_text.split_whitespace().map(|w| w.to_lowercase()).collect();
                let query_char_len: usize = query_words.iter().map(|w| w.chars().count()).sum::<usize>().max(1);
                let doc_char_len: usize = doc_text.chars().count().max(1);
                let smallest_ngram = *self.config.ngram_sizes.iter().min().unwrap_or(&3);

                let fusion = fuse(
                    &query_words,
                    &doc_words,
                    &features,
                    bm25_norm,
                    smallest_ngram,
                    query_char_len,
                    doc_char_len,
                );

                coverage_aux.insert((doc.key, doc.segment), (features.word_hits, lcs));
                scores.push(ScoreEntry::new(doc.key, fusion.packed_score(), fusion.tiebreaker, doc.segment));
            }
        }

        // Step 6: consolidate again (segments of the same key may have
        // scored independently above).
        let (consolidated, _best_segments) = consolidate_segments(&scores);

        // Step 7: truncation walk from the tail. Once a descending walk
        // reaches an entry at or above the configured threshold, everything
        // before it (higher-scoring) is kept without individually
        // re-justifying it; this is just an early exit, since the list is
        // about to be sorted and truncated to top-K regardless.
        let mut sorted = consolidated;
        sorted.sort_by(|a, b| b.cmp(a));
        truncate_by_tail_walk(&mut sorted, &coverage_aux, self.config.min_word_hits, self.config.truncation_score);
        coverage_trace!("post-consolidate: {} unique documents", sorted.len());

        // Step 8: apply filter.
        let mut filtered: Vec<ScoreEntry> = if let Some(filter) = &query.filter {
            sorted
                .into_iter()
                .filter(|entry| {
                    self.document_by_key(entry.key, entry.segment)
                        .map(|doc| vm::execute(filter, doc))
                        .unwrap_or(false)
                })
                .collect()
        } else {
            sorted
        };

        // Step 9: boost.
        if query.enable_boost {
            if let Some(boosts) = &query.boosts {
                apply_boosts(&mut filtered, boosts, |key, segment| self.document_by_key(key, segment));
            }
        }

        // Step 10: dedup + sort + top-K.
        if query.remove_duplicates {
            filtered = dedup_by_key(filtered);
        }
        if let Some(sort_by) = &query.sort_by {
            sort_by_field(&mut filtered, sort_by, |key, segment| self.document_by_key(key, segment));
        } else {
            filtered.sort_by(|a, b| b.cmp(a));
        }

        let top = get_top_k(&filtered, query.max_results);

        SearchResult {
            records: top,
            facets: None,
            did_time_out,
        }
    }

    fn document_by_key(&self, key: DocKey, segment: u32) -> Option<&crate::types::Document> {
        self.key_index.get(&(key, segment)).and_then(|&i| self.index.documents.get(i))
    }
}

/// Walks `entries` (already sorted score-descending) from the tail looking
/// for the first entry, scanning worst-to-best, that is already good enough
/// to keep on its own merit: enough word hits, a partial LCS match, or a
/// score at or above the floor. Everything past that entry (strictly worse,
/// and not individually justified) is dropped. If no entry qualifies, the
/// list is left untouched.
fn truncate_by_tail_walk(
    entries: &mut Vec<ScoreEntry>,
    aux: &std::collections::HashMap<(DocKey, u32), (u32, usize)>,
    min_word_hits: u32,
    truncation_score: u16,
) {
    let cutoff = entries.iter().enumerate().rev().find_map(|(i, entry)| {
        let (word_hits, lcs) = aux.get(&(entry.key, entry.segment)).copied().unwrap_or((0, 0));
        let good_enough = word_hits >= min_word_hits || lcs > 0 || entry.score >= truncation_score;
        good_enough.then_some(i)
    });
    if let Some(cutoff) = cutoff {
        entries.truncate(cutoff + 1);
    }
}

fn apply_boosts(
    entries: &mut [ScoreEntry],
    boosts: &[Boost],
    lookup: impl Fn(DocKey, u32) -> Option<&crate::types::Document>,
) {
    for entry in entries.iter_mut() {
        let Some(doc) = lookup(entry.key, entry.segment) else { continue };
        for boost in boosts {
            if let Some(field) = doc.fields.get(&boost.field) {
                if field.value.eq_ci(&boost.value) {
                    let boosted = (entry.score as f64 * boost.multiplier).clamp(0.0, u16::MAX as f64);
                    entry.score = boosted as u16;
                }
            }
        }
    }
}

fn dedup_by_key(entries: Vec<ScoreEntry>) -> Vec<ScoreEntry> {
    let mut seen = std::collections::HashSet::new();
    entries.into_iter().filter(|e| seen.insert(e.key)).collect()
}

fn sort_by_field(
    entries: &mut [ScoreEntry],
    sort_by: &SortBy,
    lookup: impl Fn(DocKey, u32) -> Option<&crate::types::Document>,
) {
    entries.sort_by(|a, b| {
        let av = lookup(a.key, a.segment).and_then(|d| d.fields.get(&sort_by.field)).map(|f| f.value.clone());
        let bv = lookup(b.key, b.segment).and_then(|d| d.fields.get(&sort_by.field)).map(|f| f.value.clone());
        let ordering = match (av, bv) {
            (Some(a), Some(b)) => a.compare_to(&b).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => std::cmp::Ordering::Equal,
        };
        if sort_by.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{assign_internal_ids, build_index};
    use crate::types::{Field, FieldValue, WeightClass};
    use std::collections::HashMap;

    fn doc(key: i64, text: &str) -> crate::types::Document {
        let mut fields = HashMap::new();
        fields.insert(
            "body".to_string(),
            Field {
                value: FieldValue::Str(text.to_string()),
                weight: WeightClass::Med,
                indexable: true,
                facetable: false,
            },
        );
        crate::types::Document {
            key,
            segment: 0,
            internal_id: InternalId::new(0),
            fields,
            text_field: "body".to_string(),
            deleted: false,
        }
    }

    fn build_engine(texts: &[(i64, &str)]) -> SearchEngine {
        let docs = assign_internal_ids(texts.iter().map(|(k, t)| doc(*k, t)).collect());
        let index = build_index(docs, &EngineConfig::default());
        SearchEngine::new(index, EngineConfig::default())
    }

    #[test]
    fn exact_text_query_ranks_first() {
        let engine = build_engine(&[
            (1, "batman and robin fight crime"),
            (2, "battamam is a typo-laden review of a movie"),
        ]);
        let result = engine.search(&Query::new("batman"));
        assert!(!result.records.is_empty());
        assert_eq!(result.records[0].key, 1);
    }

    #[test]
    fn empty_query_returns_empty_result() {
        let engine = build_engine(&[(1, "hello world")]);
        let result = engine.search(&Query::new(""));
        assert!(result.records.is_empty());
    }

    #[test]
    fn max_results_bounds_record_count() {
        let engine = build_engine(&[
            (1, "quick fox jumps"),
            (2, "quick fox runs"),
            (3, "quick fox sleeps"),
        ]);
        let result = engine.search(&Query::new("quick fox").with_max_results(2));
        assert!(result.records.len() <= 2);
    }

    #[test]
    fn tail_walk_drops_only_the_unqualified_tail() {
        // Descending by score: 300, 200, 100, 50. Only key 3 (score 100) has
        // a qualifying word-hit count; everything above it is kept
        // regardless of its own aux data, everything below it is dropped.
        let mut entries = vec![
            ScoreEntry::new(1, 300, 0, 0),
            ScoreEntry::new(2, 200, 0, 0),
            ScoreEntry::new(3, 100, 0, 0),
            ScoreEntry::new(4, 50, 0, 0),
        ];
        let mut aux = std::collections::HashMap::new();
        aux.insert((3, 0), (5, 0));
        truncate_by_tail_walk(&mut entries, &aux, 1, u16::MAX);
        assert_eq!(entries.iter().map(|e| e.key).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn tail_walk_keeps_everything_when_nothing_qualifies() {
        let mut entries = vec![ScoreEntry::new(1, 10, 0, 0), ScoreEntry::new(2, 5, 0, 0)];
        let aux = std::collections::HashMap::new();
        truncate_by_tail_walk(&mut entries, &aux, 1, u16::MAX);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn tail_walk_score_floor_alone_can_qualify() {
        let mut entries = vec![ScoreEntry::new(1, 300, 0, 0), ScoreEntry::new(2, 255, 0, 0), ScoreEntry::new(3, 10, 0, 0)];
        let aux = std::collections::HashMap::new();
        truncate_by_tail_walk(&mut entries, &aux, 1, 254);
        assert_eq!(entries.iter().map(|e| e.key).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn filter_excludes_non_matching_documents() {
        let mut engine = build_engine(&[(1, "quick fox"), (2, "quick fox")]);
        engine.index.documents[0].fields.insert(
            "year".to_string(),
            Field {
                value: FieldValue::Int(1999),
                weight: WeightClass::Med,
                indexable: false,
                facetable: true,
            },
        );
        engine.index.documents[1].fields.insert(
            "year".to_string(),
            Field {
                value: FieldValue::Int(2020),
                weight: WeightClass::Med,
                indexable: false,
                facetable: true,
            },
        );
        let filter = crate::filter::compile_filter("year >= 2000").unwrap();
        let mut query = Query::new("quick fox");
        query.filter = Some(filter);
        let result = engine.search(&query);
        for record in &result.records {
            assert_eq!(record.key, 2);
        }
    }
}
