//! Fusion Scorer: combines `CoverageFeatures` and the BM25 backbone score
//! into a packed `(precedence << 8) | semantic_byte` plus a tiebreaker
//! byte.
//!
//! Grounded on `src/scoring.rs`'s bit-packing-with-named-constants style
//! (kept the all-caps `PRECEDENCE_*` constant table convention).

use crate::damerau::damerau_distance;
use crate::types::CoverageFeatures;

const PRECEDENCE_ALL_FOUND: u8 = 1 << 7;
const PRECEDENCE_ALL_FULLY_MATCHED: u8 = 1 << 6;

const TERM_GAP: f64 = 0.5;
const PHRASE_BIT_SUFFIX_STRONG: u8 = 1 << 3;
const PHRASE_BIT_SUFFIX_WEAK: u8 = 1 << 2;
const PHRASE_BIT_LONGEST_RUN: u8 = 1 << 1;
const PHRASE_BIT_SPAN_TWO: u8 = 1;

/// Precedence + semantic + tiebreaker, packed per `ScoreEntry`'s layout
/// convention (the caller packs `(precedence, semantic)` into the `u16`
/// primary score).
pub struct FusionResult {
    pub precedence: u8,
    pub semantic_byte: u8,
    pub tiebreaker: u8,
}

impl FusionResult {
    pub fn packed_score(&self) -> u16 {
        ((self.precedence as u16) << 8) | self.semantic_byte as u16
    }
}

pub fn fuse(
    query_tokens: &[String],
    doc_tokens: &[String],
    features: &CoverageFeatures,
    bm25: f64,
    min_stem_len: usize,
    query_char_len: usize,
    doc_char_len: usize,
) -> FusionResult {
    let distinct = features.distinct_query_terms;
    let mut precedence = 0u8;

    if distinct > 0 && features.terms_with_any_match == distinct {
        precedence |= PRECEDENCE_ALL_FOUND;
    }
    if distinct > 0 && features.terms_fully_matched == distinct {
        precedence |= PRECEDENCE_ALL_FULLY_MATCHED;
    }

    if distinct == 1 {
        let starts_at_zero = features.first_match_token_index == Some(0);
        let strict_exact = features.terms_strict_whole >= 1;
        let clean_prefix = features.terms_with_prefix >= 1;
        let tier: u8 = if starts_at_zero && strict_exact {
            4
        } else if starts_at_zero && clean_prefix {
            3
        } else if !starts_at_zero && strict_exact {
            2
        } else if !starts_at_zero && clean_prefix {
            1
        } else {
            0
        };
        precedence |= tier * 8;
    } else if distinct >= 2 {
        let prefix_last_strong =
            features.strictly_matched_before_last == distinct.saturating_sub(1) && features.last_term_has_prefix;
        let lexical_prefix_last = features.last_term_has_prefix && !prefix_last_strong;

        let perfect_doc = !doc_tokens.is_empty()
            && doc_tokens.iter().all(|d| {
                query_tokens
                    .iter()
                    .any(|q| d.starts_with(q.as_str()) || q.starts_with(d.as_str()))
            });
        let anchor_stem_with_run = query_tokens
            .first()
            .map(|first| first.chars().count() >= 4 && doc_tokens.iter().any(|d| d.contains(first.as_str())))
            .unwrap_or(false)
            && features.longest_prefix_run >= 2;

        let tier: u8 = if prefix_last_strong {
            3
        } else if lexical_prefix_last {
            2
        } else if perfect_doc || anchor_stem_with_run {
            1
        } else {
            0
        };
        precedence |= tier * 16;

        let min_terms = features.terms_with_any_match.min(distinct);
        if features.suffix_aligned_run >= 2.max(min_terms.saturating_sub(1)) {
            precedence |= PHRASE_BIT_SUFFIX_STRONG;
        }
        if features.suffix_aligned_run >= 2 {
            precedence |= PHRASE_BIT_SUFFIX_WEAK;
        }
        if features.longest_prefix_run >= 3 {
            precedence |= PHRASE_BIT_LONGEST_RUN;
        }
        if features.span_token_count == 2 && features.terms_with_any_match >= 2 {
            precedence |= PHRASE_BIT_SPAN_TWO;
        }
    }

    // Stem-evidence nudge.
    if distinct >= 2 && features.terms_with_any_match > 0 && features.terms_with_any_match < distinct {
        let all_unmatched_share_stem = query_tokens
            .iter()
            .enumerate()
            .filter(|(i, _)| features.per_token_coverage.get(*i).copied().unwrap_or(0.0) == 0.0)
            .all(|(_, q)| {
                doc_tokens
                    .iter()
                    .any(|d| common_prefix_len(q, d) >= min_stem_len)
            });
        if all_unmatched_share_stem {
            precedence |= PRECEDENCE_ALL_FOUND;
        } else {
            let exactly_one_unmatched = distinct - features.terms_with_any_match == 1;
            let last_is_type_ahead = is_last_term_type_ahead(features);
            let gap_small = features.total_idf > 0.0 && (features.missing_idf / features.total_idf) < TERM_GAP;
            if exactly_one_unmatched && gap_small && (features.last_term_has_prefix || !last_is_type_ahead) {
                precedence |= PHRASE_BIT_SUFFIX_STRONG;
            }
        }
    }

    let coverage_ratio = if distinct > 0 {
        features.terms_with_any_match as f64 / distinct as f64
    } else {
        0.0
    };
    let avg_ci = if distinct > 0 {
        features.sum_coverage_ratio / distinct as f64
    } else {
        0.0
    };

    let mut semantic = if distinct == 1 {
        let similarity = single_term_lexical_similarity(query_tokens.first().map(|s| s.as_str()).unwrap_or(""), doc_tokens);
        (avg_ci + similarity) / 2.0
    } else if doc_tokens.is_empty() {
        avg_ci
    } else {
        let base_coverage = if features.idf_weighted_coverage > avg_ci && distinct.saturating_sub(features.terms_with_any_match) == 1 {
            features.idf_weighted_coverage
        } else {
            avg_ci
        };
        let density = if features.doc_token_count > 0 {
            features.word_hits as f64 / features.doc_token_count as f64
        } else {
            0.0
        };
        let mut s = base_coverage * density;

        let anchor_stem_len = query_tokens.first().map(|t| t.chars().count().min(3)).unwrap_or(0);
        if distinct >= 3 && anchor_stem_len == 3 {
            let anchor_present = query_tokens
                .first()
                .map(|first| doc_tokens.iter().any(|d| d.contains(first.as_str())))
                .unwrap_or(false);
            let suffix_signal = features.suffix_aligned_run >= 2;
            let signals = anchor_present as u8 as f64 + suffix_signal as u8 as f64;
            s += (0.15 * signals).min(1.0);
        }

        if let Some(last) = query_tokens.last() {
            let last_len = last.chars().count();
            if (1..=2).contains(&last_len) {
                let matches = doc_tokens.iter().filter(|d| d.starts_with(last.as_str()) || d.contains(last.as_str())).count();
                if features.doc_token_count > 0 {
                    s += (1.0 - s) * (matches as f64 / features.doc_token_count as f64);
                }
            }
        }
        s
    };

    if coverage_ratio > 0.0 && coverage_ratio < 1.0 && bm25 >= (1.0 - coverage_ratio) {
        semantic = coverage_ratio * semantic + (1.0 - coverage_ratio) * bm25;
    }

    let semantic_byte = (semantic.clamp(0.0, 1.0) * 255.0).round() as u8;

    let tiebreaker = if distinct >= 2 && doc_char_len > 0 {
        (((query_char_len as f64 / doc_char_len as f64).min(1.0)) * 255.0).round() as u8
    } else {
        0
    };

    FusionResult {
        precedence,
        semantic_byte,
        tiebreaker,
    }
}

fn is_last_term_type_ahead(features: &CoverageFeatures) -> bool {
    if features.total_idf <= 0.0 {
        return false;
    }
    let last_idf = features.per_token_idf.last().copied().unwrap_or(0.0);
    let q_count = features.distinct_query_terms as f64;
    last_idf / features.total_idf <= 1.0 / (q_count + 1.0)
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

fn single_term_lexical_similarity(query: &str, doc_tokens: &[String]) -> f64 {
    if query.is_empty() || doc_tokens.is_empty() {
        return 0.0;
    }
    let qlen = query.chars().count().max(1);
    let mut best = 0.0_f64;
    for d in doc_tokens {
        if d.contains(query) {
            best = best.max(1.0);
            continue;
        }
        let overlap = common_prefix_len(query, d).max(common_suffix_len(query, d));
        if overlap >= 2 {
            best = best.max(overlap as f64 / qlen as f64);
        }
        let dist = damerau_distance(query, d);
        if dist <= 2 {
            best = best.max((qlen as f64 - dist as f64).max(0.0) / qlen as f64);
        }
        if qlen >= 6 {
            let split = qlen / 2;
            let (prefix, suffix): (String, String) = {
                let chars: Vec<char> = query.chars().collect();
                (chars[..split].iter().collect(), chars[split..].iter().collect())
            };
            if prefix.chars().count() >= 3 && d.contains(&prefix) {
                best = best.max(0.5);
            }
            if suffix.chars().count() >= 3 && d.contains(&suffix) {
                best = best.max(0.5);
            }
        }
    }
    best.min(1.0)
}

fn common_suffix_len(a: &str, b: &str) -> usize {
    a.chars().rev().zip(b.chars().rev()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::compute_coverage;
    use crate::config::EngineConfig;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(|w| w.to_string()).collect()
    }

    #[test]
    fn exact_match_yields_top_precedence_bits() {
        let config = EngineConfig::default();
        let q = words("quick fox");
        let d = words("quick fox");
        let features = compute_coverage(&q, "quick fox", 0, |_| 1.0, &config);
        let result = fuse(&q, &d, &features, 0.5, 3, 9, 9);
        assert!(result.precedence & PRECEDENCE_ALL_FOUND != 0);
        assert!(result.precedence & PRECEDENCE_ALL_FULLY_MATCHED != 0);
    }

    #[test]
    fn packed_score_preserves_precedence_in_high_byte() {
        let result = FusionResult {
            precedence: 200,
            semantic_byte: 50,
            tiebreaker: 0,
        };
        let packed = result.packed_score();
        assert_eq!((packed >> 8) as u8, 200);
        assert_eq!((packed & 0xFF) as u8, 50);
    }

    #[test]
    fn no_match_yields_zero_top_bits() {
        let config = EngineConfig::default();
        let q = words("zzzzz");
        let d = words("completely unrelated content");
        let features = compute_coverage(&q, "completely unrelated content", 0, |_| 1.0, &config);
        let result = fuse(&q, &d, &features, 0.0, 3, 5, 30);
        assert_eq!(result.precedence & PRECEDENCE_ALL_FOUND, 0);
    }
}
