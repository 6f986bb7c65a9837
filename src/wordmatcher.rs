//! `WordMatcher` (consumed contract): supplies an additional set of
//! internal ids matching the query with LD1 (edit distance <= 1) and affix
//! support, to fill out stage-2 candidates beyond what stage 1 found.
//!
//! Query-state mutation is serialized with a `parking_lot::Mutex`: caches
//! must serialize query-text mutation, while look-ups stay pure functions
//! of the cached query state.

use parking_lot::Mutex;

use crate::damerau::damerau_within;
use crate::types::InvertedIndex;

pub trait WordMatcher {
    /// Internal ids of documents containing a word within edit distance 1
    /// of some query word, or sharing an affix with it.
    fn matching_ids(&self, index: &InvertedIndex, query_words: &[String]) -> Vec<u32>;
}

struct CachedQuery {
    words: Vec<String>,
    result: Vec<u32>,
}

/// A default LD1/affix matcher built on the prefix structure and Damerau
/// distance. Caches the last query's result set behind a mutex so repeated
/// lookups for the same query text (e.g. stage-2 re-entry after a timeout
/// check) are free.
pub struct DefaultWordMatcher {
    cache: Mutex<Option<CachedQuery>>,
}

impl DefaultWordMatcher {
    pub fn new() -> Self {
        DefaultWordMatcher {
            cache: Mutex::new(None),
        }
    }
}

impl Default for DefaultWordMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl WordMatcher for DefaultWordMatcher {
    fn matching_ids(&self, index: &InvertedIndex, query_words: &[String]) -> Vec<u32> {
        {
            let cache = self.cache.lock();
            if let Some(cached) = cache.as_ref() {
                if cached.words == query_words {
                    return cached.result.clone();
                }
            }
        }

        let mut ids = std::collections::BTreeSet::new();
        for word in query_words {
            // Affix: any term whose text starts with this word.
            for term_id in index.prefix.prefix_search(word, 256) {
                let term = &index.terms[term_id as usize];
                for p in &term.postings {
                    ids.insert(p.internal_id);
                }
            }
            // LD1: scan the vocabulary for terms within edit distance 1.
            // Bounded to terms whose length is close to the query word's,
            // since Damerau distance 1 cannot reconcile a larger gap.
            for term in &index.terms {
                if term.text.chars().count().abs_diff(word.chars().count()) > 1 {
                    continue;
                }
                if damerau_within(word, &term.text, 1) {
                    for p in &term.postings {
                        ids.insert(p.internal_id);
                    }
                }
            }
        }

        let result: Vec<u32> = ids.into_iter().collect();
        let mut cache = self.cache.lock();
        *cache = Some(CachedQuery {
            words: query_words.to_vec(),
            result: result.clone(),
        });
        result
    }
}
