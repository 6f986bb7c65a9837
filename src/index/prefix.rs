//! Prefix-iterable structure over a term vocabulary.
//!
//! Uses the same shape as `prefix_search_vocabulary`: a sorted
//! `Vec<String>` searched with `partition_point`, rather than a
//! finite-state transducer — for vocabularies in the thousands-of-terms
//! range (typical of one in-memory corpus) a binary search over a sorted
//! vector is already galloping-search-fast and needs no extra dependency.

/// Maps a prefix to the ordered set of term ids whose text starts with it.
/// Built once, read-only after that — consistent with the index's
/// single-writer-then-frozen lifecycle.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PrefixIndex {
    /// (term text, term id) pairs sorted ascending by text.
    sorted: Vec<(String, u32)>,
}

impl PrefixIndex {
    /// Builds from a dense, id-indexed slice of term texts (`texts[id] ==`
    /// the term's text).
    pub fn build(texts: &[String]) -> Self {
        let mut sorted: Vec<(String, u32)> = texts
            .iter()
            .enumerate()
            .map(|(id, text)| (text.clone(), id as u32))
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        PrefixIndex { sorted }
    }

    /// Term ids whose text starts with `prefix`, in ascending text order,
    /// bounded to at most `limit` ids (a 4096-per-pattern cap for
    /// short-query expansion; pass `usize::MAX` for no bound).
    pub fn prefix_search(&self, prefix: &str, limit: usize) -> Vec<u32> {
        if prefix.is_empty() {
            return Vec::new();
        }
        let start = self.sorted.partition_point(|(text, _)| text.as_str() < prefix);
        let mut out = Vec::new();
        for (text, id) in &self.sorted[start..] {
            if !text.starts_with(prefix) {
                break;
            }
            out.push(*id);
            if out.len() >= limit {
                break;
            }
        }
        out
    }

    /// Number of term ids whose text starts with `prefix`, without
    /// materializing the full list (still bounded, for cheap cardinality
    /// checks used by the candidate selector's prefix-precedence override).
    pub fn prefix_count(&self, prefix: &str, bound: usize) -> usize {
        self.prefix_search(prefix, bound).len()
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PrefixIndex {
        PrefixIndex::build(&[
            "apple".to_string(),
            "applesauce".to_string(),
            "apply".to_string(),
            "banana".to_string(),
        ])
    }

    #[test]
    fn prefix_search_finds_all_matches_in_sorted_order() {
        let idx = sample();
        let ids = idx.prefix_search("appl", 100);
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn prefix_search_respects_limit() {
        let idx = sample();
        let ids = idx.prefix_search("appl", 2);
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn prefix_search_empty_for_unknown_prefix() {
        let idx = sample();
        assert!(idx.prefix_search("zzz", 10).is_empty());
    }

    #[test]
    fn longer_prefix_is_more_selective() {
        let idx = sample();
        assert!(idx.prefix_search("app", 100).len() >= idx.prefix_search("appl", 100).len());
    }
}
