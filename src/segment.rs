//! Segment Consolidation and Top-K selection.
//!
//! Grounded on `search/dedup.rs::ResultMerger` (keep-better-of merge
//! semantics over a `HashMap` keyed by document identity) generalized from
//! doc_id-only keys to document-key-with-segment-tracking, and on
//! `search/tiered.rs`'s `OrderedFloat`/`BTreeMap`-based top-K pattern.

use std::collections::HashMap;

use crate::types::{DocKey, ScoreEntry};

/// Append-only list of `ScoreEntry` produced by one pipeline stage.
#[derive(Debug, Clone, Default)]
pub struct ScoreArray {
    pub entries: Vec<ScoreEntry>,
}

impl ScoreArray {
    pub fn push(&mut self, entry: ScoreEntry) {
        self.entries.push(entry);
    }
}

/// For each document key present (possibly across several segments), keeps
/// only the highest-scoring segment (ties broken by tiebreaker). Returns
/// the consolidated entries and records, for each surviving key, which
/// segment won — used by the coverage stage to decide which segment's text
/// to re-score against.
pub fn consolidate_segments(entries: &[ScoreEntry]) -> (Vec<ScoreEntry>, HashMap<DocKey, u32>) {
    let mut best: HashMap<DocKey, ScoreEntry> = HashMap::new();
    for &entry in entries {
        best.entry(entry.key)
            .and_modify(|existing| {
                if entry > *existing {
                    *existing = entry;
                }
            })
            .or_insert(entry);
    }
    let best_segments: HashMap<DocKey, u32> = best.iter().map(|(&k, e)| (k, e.segment)).collect();
    (best.into_values().collect(), best_segments)
}

/// Exact top-K selection via a size-K min-heap: equivalent to sorting and
/// truncating, but avoids materializing and sorting the full entry set when
/// only the top few matter.
pub fn get_top_k(entries: &[ScoreEntry], k: usize) -> Vec<ScoreEntry> {
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    if k == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<ScoreEntry>> = BinaryHeap::with_capacity(k);
    for &entry in entries {
        if heap.len() < k {
            heap.push(Reverse(entry));
        } else if let Some(Reverse(min)) = heap.peek() {
            if entry > *min {
                heap.pop();
                heap.push(Reverse(entry));
            }
        }
    }
    let mut out: Vec<ScoreEntry> = heap.into_iter().map(|Reverse(e)| e).collect();
    out.sort_by(|a, b| b.cmp(a));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consolidate_keeps_max_scoring_segment_per_key() {
        let entries = vec![
            ScoreEntry::new(1, 100, 0, 0),
            ScoreEntry::new(1, 200, 0, 1),
            ScoreEntry::new(2, 50, 0, 0),
        ];
        let (consolidated, best_segments) = consolidate_segments(&entries);
        let entry_for_1 = consolidated.iter().find(|e| e.key == 1).unwrap();
        assert_eq!(entry_for_1.score, 200);
        assert_eq!(best_segments[&1], 1);
    }

    #[test]
    fn consolidate_breaks_ties_by_tiebreaker() {
        let entries = vec![ScoreEntry::new(1, 100, 5, 0), ScoreEntry::new(1, 100, 9, 1)];
        let (consolidated, _) = consolidate_segments(&entries);
        assert_eq!(consolidated[0].segment, 1);
    }

    #[test]
    fn top_k_returns_exact_count_sorted_descending() {
        let entries = vec![
            ScoreEntry::new(1, 50, 0, 0),
            ScoreEntry::new(2, 200, 0, 0),
            ScoreEntry::new(3, 100, 0, 0),
        ];
        let top = get_top_k(&entries, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key, 2);
        assert_eq!(top[1].key, 3);
    }

    #[test]
    fn top_k_bounded_by_available_entries() {
        let entries = vec![ScoreEntry::new(1, 50, 0, 0)];
        let top = get_top_k(&entries, 5);
        assert_eq!(top.len(), 1);
    }
}
