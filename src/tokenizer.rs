//! The text tokenizer (consumed contract).
//!
//! The tokenizer is deliberately scoped to just the operations the pipeline
//! requires of it. `Tokenizer` is that consumed interface;
//! `StandardTokenizer` is a concrete, realistic implementation used by the
//! index builder and the default engine so the rest of the crate has
//! something to run against.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::config::EngineConfig;

#[cfg(feature = "unicode-normalization")]
use unicode_normalization::UnicodeNormalization;

/// One emitted index-time token: its text, the field weight it should be
/// recorded under, and its position (token index for word tokens, start
/// offset for n-grams) within the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexToken {
    pub text: String,
    pub position: u32,
}

/// The tokenizer's consumed contract.
pub trait Tokenizer {
    fn tokenize_for_index(&self, text: &str) -> Vec<IndexToken>;
    fn tokenize_for_search(&self, text: &str) -> Vec<IndexToken>;
    fn word_tokens_for_coverage(&self, text: &str, min_word_size: usize) -> Vec<String>;
    fn delimiters(&self) -> &[char];
    fn ngram_sizes(&self) -> &[usize];
}

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
        "it", "its", "of", "on", "that", "the", "to", "was", "were", "will", "with",
    ]
    .into_iter()
    .collect()
});

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Normalize a string for search: lowercase, strip diacritics, collapse
/// whitespace. Matching is case-insensitive throughout the crate, so every
/// path that compares text first runs it through this function.
#[cfg(feature = "unicode-normalization")]
pub fn normalize(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(not(feature = "unicode-normalization"))]
pub fn normalize(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(feature = "unicode-normalization")]
fn is_combining_mark(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}' |
        '\u{1DC0}'..='\u{1DFF}' |
        '\u{20D0}'..='\u{20FF}' |
        '\u{FE20}'..='\u{FE2F}'
    )
}

/// A default, configuration-driven tokenizer: delimiter-split word tokens
/// plus start/stop-padded character n-grams at the configured sizes.
pub struct StandardTokenizer {
    delimiters: Vec<char>,
    ngram_sizes: Vec<usize>,
}

impl StandardTokenizer {
    pub fn from_config(config: &EngineConfig) -> Self {
        StandardTokenizer {
            delimiters: config.delimiters.clone(),
            ngram_sizes: config.ngram_sizes.clone(),
        }
    }

    fn split_words(&self, text: &str) -> Vec<(String, u32)> {
        let normalized = normalize(text);
        let mut words = Vec::new();
        let mut current = String::new();
        let mut position = 0u32;
        for c in normalized.chars() {
            if self.delimiters.contains(&c) {
                if !current.is_empty() {
                    words.push((std::mem::take(&mut current), position));
                    position += 1;
                }
            } else {
                current.push(c);
            }
        }
        if !current.is_empty() {
            words.push((current, position));
        }
        words
    }

    fn ngrams_of(&self, word: &str, size: usize, padded: bool) -> Vec<String> {
        let chars: Vec<char> = word.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }
        let padded_word: Vec<char> = if padded {
            let mut v = vec!['\u{2402}']; // start pad
            v.extend(chars.iter().copied());
            v.push('\u{2403}'); // stop pad
            v
        } else {
            chars.clone()
        };
        if padded_word.len() < size {
            return vec![padded_word.iter().collect()];
        }
        padded_word
            .windows(size)
            .map(|w| w.iter().collect::<String>())
            .collect()
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize_for_index(&self, text: &str) -> Vec<IndexToken> {
        let mut out = Vec::new();
        for (word, position) in self.split_words(text) {
            for &size in &self.ngram_sizes {
                for gram in self.ngrams_of(&word, size, true) {
                    out.push(IndexToken { text: gram, position });
                }
            }
        }
        out
    }

    fn tokenize_for_search(&self, text: &str) -> Vec<IndexToken> {
        let mut out = Vec::new();
        for (word, position) in self.split_words(text) {
            for &size in &self.ngram_sizes {
                for gram in self.ngrams_of(&word, size, false) {
                    out.push(IndexToken { text: gram, position });
                }
            }
        }
        out
    }

    fn word_tokens_for_coverage(&self, text: &str, min_word_size: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (word, _) in self.split_words(text) {
            if word.chars().count() < min_word_size || is_stop_word(&word) {
                continue;
            }
            if seen.insert(word.clone()) {
                out.push(word);
            }
        }
        out
    }

    fn delimiters(&self) -> &[char] {
        &self.delimiters
    }

    fn ngram_sizes(&self) -> &[usize] {
        &self.ngram_sizes
    }
}
