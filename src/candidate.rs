//! Candidate Selector (stage 1).
//!
//! Branches by query shape, following the three-tier dispatch pattern of
//! `TierSearcher::search` (single-term fast paths, a short-query prefix
//! expansion, and tiered AND/OR for everything else), generalized into a
//! structured backbone-score contract rather than ad hoc weighting.

use roaring::RoaringBitmap;

use crate::config::EngineConfig;
use crate::postings_iter::{intersect, union};
use crate::scoring::{bm25_term_score, idf};
use crate::tokenizer::{StandardTokenizer, Tokenizer};
use crate::types::InvertedIndex;

const TIER0_SHORT_CIRCUIT_FACTOR: usize = 2;
const RARE_TERM_DF_THRESHOLD: u32 = 10;
const SHORT_QUERY_PATTERN_TERM_LIMIT: usize = 4096;
const PREFIX_OVERRIDE_MULTIPLIER: usize = 10;

/// Stage-1 output: the candidate set plus a dense per-document upper-bound
/// array (`0.0` for non-candidates).
pub struct CandidateResult {
    pub candidates: RoaringBitmap,
    pub upper_bounds: Vec<f64>,
}

pub fn select_candidates(
    index: &InvertedIndex,
    normalized_query: &str,
    config: &EngineConfig,
    k: usize,
) -> CandidateResult {
    let doc_count = index.documents.len();
    let mut upper_bounds = vec![0.0f64; doc_count];
    let smallest_ngram = *config.ngram_sizes.iter().min().unwrap_or(&3);
    let char_len = normalized_query.chars().count();

    if char_len == 0 {
        return CandidateResult {
            candidates: RoaringBitmap::new(),
            upper_bounds,
        };
    }

    if char_len == 1 {
        return single_char_candidates(index, normalized_query, &mut upper_bounds);
    }

    // Prefix precedence override: if the leading characters already have a
    // non-empty, small-enough posting list in the prefix structure, prefer
    // it over the generic tiered search — short autocomplete-style queries
    // benefit from exact prefix continuity more than from BM25 ranking.
    if let Some(result) = prefix_precedence_override(index, normalized_query, k, &mut upper_bounds)
    {
        return result;
    }

    if char_len < smallest_ngram {
        return short_query_candidates(index, normalized_query, config, &mut upper_bounds);
    }

    normal_query_candidates(index, normalized_query, config, k, &mut upper_bounds)
}

fn single_char_candidates(
    index: &InvertedIndex,
    query: &str,
    upper_bounds: &mut [f64],
) -> CandidateResult {
    let mut bitmap = RoaringBitmap::new();
    let ch = query.chars().next().unwrap();
    for doc in &index.documents {
        if doc.deleted {
            continue;
        }
        let text = doc.text();
        let lower: Vec<char> = text.chars().collect();
        let mut occurrences = 0u32;
        let mut earliest: Option<usize> = None;
        let mut at_word_start = false;
        let mut at_title_equals = false;
        for (i, c) in lower.iter().enumerate() {
            if c.eq_ignore_ascii_case(&ch) {
                occurrences += 1;
                if earliest.is_none() {
                    earliest = Some(i);
                }
                let is_word_start = i == 0 || lower[i - 1] == ' ';
                if is_word_start {
                    at_word_start = true;
                    if i == 0 {
                        at_title_equals = lower.len() == 1;
                    }
                }
            }
        }
        if occurrences == 0 {
            continue;
        }
        let precedence: u8 = if earliest == Some(0) && at_word_start {
            4
        } else if at_word_start {
            3
        } else if at_title_equals {
            2
        } else {
            1
        };
        let base = (occurrences.min(255)) as u8;
        let packed = ((precedence as u16) << 8) | base as u16;
        bitmap.insert(doc.internal_id.get());
        upper_bounds[doc.internal_id.get() as usize] = packed as f64;
    }
    CandidateResult {
        candidates: bitmap,
        upper_bounds: upper_bounds.to_vec(),
    }
}

fn prefix_precedence_override(
    index: &InvertedIndex,
    query: &str,
    k: usize,
    upper_bounds: &mut [f64],
) -> Option<CandidateResult> {
    let bound = PREFIX_OVERRIDE_MULTIPLIER * k.max(1);
    // Prefer the longest prefix (the full query) that still has a
    // manageable posting-list cardinality.
    let count = index.prefix.prefix_count(query, bound + 1);
    if count == 0 || count > bound {
        return None;
    }
    let term_ids = index.prefix.prefix_search(query, bound);
    let mut bitmap = RoaringBitmap::new();
    let mut term_counts: std::collections::HashMap<u32, u32> = std::collections::HashMap::new();
    for term_id in term_ids {
        let term = &index.terms[term_id as usize];
        for p in &term.postings {
            bitmap.insert(p.internal_id);
            *term_counts.entry(p.internal_id).or_insert(0) += 1;
        }
    }
    for (internal_id, count) in term_counts {
        upper_bounds[internal_id as usize] = (count * 10) as f64;
    }
    Some(CandidateResult {
        candidates: bitmap,
        upper_bounds: upper_bounds.to_vec(),
    })
}

fn short_query_candidates(
    index: &InvertedIndex,
    query: &str,
    config: &EngineConfig,
    upper_bounds: &mut [f64],
) -> CandidateResult {
    const START_PAD: char = '\u{2402}';
    let mut bitmap = RoaringBitmap::new();
    let mut accum: std::collections::HashMap<u32, f64> = std::collections::HashMap::new();

    for &size in &config.ngram_sizes {
        let query_len = query.chars().count();
        if query_len >= size {
            continue;
        }
        let pad_count = size - query_len;
        let pattern: String = std::iter::repeat(START_PAD).take(pad_count.min(1)).chain(query.chars()).collect();
        let term_ids = index.prefix.prefix_search(&pattern, SHORT_QUERY_PATTERN_TERM_LIMIT);
        for term_id in term_ids {
            let term = &index.terms[term_id as usize];
            let exact = term.text.starts_with(&pattern);
            for p in &term.postings {
                bitmap.insert(p.internal_id);
                let contribution = if exact {
                    p.weight as f64 * 10.0
                } else {
                    p.weight as f64 * 1.0
                };
                *accum.entry(p.internal_id).or_insert(0.0) += contribution;
            }
        }
    }

    for (internal_id, score) in accum {
        upper_bounds[internal_id as usize] = score;
    }
    CandidateResult {
        candidates: bitmap,
        upper_bounds: upper_bounds.to_vec(),
    }
}

fn normal_query_candidates(
    index: &InvertedIndex,
    query: &str,
    config: &EngineConfig,
    k: usize,
    upper_bounds: &mut [f64],
) -> CandidateResult {
    let tokenizer = StandardTokenizer::from_config(config);
    let query_terms: Vec<String> = tokenizer
        .tokenize_for_search(query)
        .into_iter()
        .map(|t| t.text)
        .collect();

    if query_terms.is_empty() {
        return CandidateResult {
            candidates: RoaringBitmap::new(),
            upper_bounds: upper_bounds.to_vec(),
        };
    }

    let mut term_infos: Vec<(String, f64, u32)> = Vec::new(); // (text, idf, df)
    let mut has_missing = false;
    let mut has_rare = false;
    for t in &query_terms {
        match index.term(t) {
            Some(term) => {
                let df = term.doc_freq();
                if df < RARE_TERM_DF_THRESHOLD {
                    has_rare = true;
                }
                term_infos.push((t.clone(), idf(index.stats.doc_count, df), df));
            }
            None => has_missing = true,
        }
    }

    let disjunctive = has_missing || has_rare || query_terms.len() == 1;

    let mut bitmap = RoaringBitmap::new();

    if disjunctive {
        for (text, term_idf, _) in &term_infos {
            if let Some(term) = index.term(text) {
                for p in &term.postings {
                    bitmap.insert(p.internal_id);
                    let score = bm25_term_score(
                        *term_idf,
                        p.term_freq,
                        doc_len(index, p.internal_id),
                        index.stats.avg_doc_len,
                        config.bm25_k1,
                        config.bm25_b,
                    );
                    let slot = &mut upper_bounds[p.internal_id as usize];
                    *slot += score;
                }
            }
        }
        return CandidateResult {
            candidates: bitmap,
            upper_bounds: upper_bounds.to_vec(),
        };
    }

    // Tiered AND/OR. All query terms are present with df >= threshold here.
    let postings: Vec<&[crate::types::Posting]> = term_infos
        .iter()
        .map(|(text, _, _)| index.term(text).unwrap().postings.as_slice())
        .collect();

    let max_idf = term_infos.iter().map(|(_, i, _)| *i).fold(0.0, f64::max);

    // Tier 0: full intersection.
    let tier0 = intersect(&postings);
    for &id in &tier0 {
        bitmap.insert(id);
        upper_bounds[id as usize] = term_bound_sum(&term_infos);
    }
    if tier0.len() >= TIER0_SHORT_CIRCUIT_FACTOR * k.max(1) {
        return CandidateResult {
            candidates: bitmap,
            upper_bounds: upper_bounds.to_vec(),
        };
    }

    // Tier 1: intersect all but the lowest-IDF term.
    if postings.len() > 1 {
        let lowest_idf_idx = term_infos
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.1.partial_cmp(&b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let subset: Vec<&[crate::types::Posting]> = postings
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != lowest_idf_idx)
            .map(|(_, p)| *p)
            .collect();
        let tier1 = intersect(&subset);
        for id in tier1 {
            bitmap.insert(id);
            upper_bounds[id as usize] = upper_bounds[id as usize].max(term_bound_sum(&term_infos) * 0.9);
        }
    }

    // Tier 2: union of the up-to-2 most selective terms (idf > 0.3 * max_idf).
    let mut selective: Vec<(usize, f64)> = term_infos
        .iter()
        .enumerate()
        .filter(|(_, (_, i, _))| *i > 0.3 * max_idf)
        .map(|(i, (_, idf_val, _))| (i, *idf_val))
        .collect();
    selective.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    selective.truncate(2);
    let selective_postings: Vec<&[crate::types::Posting]> =
        selective.iter().map(|(i, _)| postings[*i]).collect();
    let tier2 = union(&selective_postings);
    for id in tier2 {
        bitmap.insert(id);
        if upper_bounds[id as usize] == 0.0 {
            upper_bounds[id as usize] = term_bound_sum(&term_infos) * 0.5;
        }
    }

    CandidateResult {
        candidates: bitmap,
        upper_bounds: upper_bounds.to_vec(),
    }
}

fn term_bound_sum(term_infos: &[(String, f64, u32)]) -> f64 {
    term_infos.iter().map(|(_, i, _)| i * 2.2).sum()
}

fn doc_len(index: &InvertedIndex, internal_id: u32) -> f64 {
    index
        .document(crate::types::InternalId::new(internal_id))
        .map(|d| d.text().split_whitespace().count() as f64)
        .unwrap_or(0.0)
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
            internal_id: crate::types::InternalId::new(0),
            fields,
            text_field: "body".to_string(),
            deleted: false,
        }
    }

    fn build_test_index() -> InvertedIndex {
        let docs = assign_internal_ids(vec![
            doc(1, "the quick brown fox jumps over the lazy dog"),
            doc(5, "the fox was quick and clever in the forest"),
        ]);
        build_index(docs, &EngineConfig::default())
    }

    #[test]
    fn normal_query_finds_candidates_for_shared_terms() {
        let index = build_test_index();
        let result = select_candidates(&index, "quick fox", &EngineConfig::default(), 10);
        assert!(!result.candidates.is_empty());
    }

    #[test]
    fn single_char_query_scans_linearly() {
        let index = build_test_index();
        let result = select_candidates(&index, "q", &EngineConfig::default(), 10);
        assert!(!result.candidates.is_empty());
    }

    #[test]
    fn empty_query_has_no_candidates() {
        let index = build_test_index();
        let result = select_candidates(&index, "", &EngineConfig::default(), 10);
        assert!(result.candidates.is_empty());
    }
}
