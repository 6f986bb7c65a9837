//! Posting-list iterator protocol.
//!
//! `next_doc` / `advance(target)` / `cost()`, with `NO_MORE_DOCS` as the
//! exhausted sentinel. `advance` must be monotonic: each call moves forward
//! to the first id `>= target`, never backward. Backed by a sorted slice
//! with a `partition_point` binary search, which is already galloping-search-
//! fast for the posting-list sizes one in-memory corpus produces.

use crate::types::Posting;

pub const NO_MORE_DOCS: u32 = u32::MAX;

pub struct PostingIterator<'a> {
    postings: &'a [Posting],
    pos: usize,
}

impl<'a> PostingIterator<'a> {
    pub fn new(postings: &'a [Posting]) -> Self {
        PostingIterator { postings, pos: 0 }
    }

    pub fn current(&self) -> u32 {
        self.postings.get(self.pos).map(|p| p.internal_id).unwrap_or(NO_MORE_DOCS)
    }

    pub fn current_posting(&self) -> Option<&'a Posting> {
        self.postings.get(self.pos)
    }

    /// Moves one step forward and returns the new current id.
    pub fn next_doc(&mut self) -> u32 {
        if self.pos < self.postings.len() {
            self.pos += 1;
        }
        self.current()
    }

    /// Moves forward to the first id `>= target`, returning it (or
    /// `NO_MORE_DOCS`). Never moves backward, even if `target` is behind
    /// the current position.
    pub fn advance(&mut self, target: u32) -> u32 {
        if self.current() >= target {
            return self.current();
        }
        let remaining = &self.postings[self.pos..];
        let skip = remaining.partition_point(|p| p.internal_id < target);
        self.pos += skip;
        self.current()
    }

    /// Estimated cost of fully draining this iterator: the number of
    /// remaining postings. Used to pick the lowest-cost driver in an
    /// intersection.
    pub fn cost(&self) -> usize {
        self.postings.len().saturating_sub(self.pos)
    }
}

/// Intersects N posting lists using the lowest-cardinality list as the
/// driver: walk it, and for each candidate `advance` every other iterator
/// to that id, accepting only when all agree.
pub fn intersect(lists: &[&[Posting]]) -> Vec<u32> {
    if lists.is_empty() || lists.iter().any(|l| l.is_empty()) {
        return Vec::new();
    }
    let driver_idx = lists
        .iter()
        .enumerate()
        .min_by_key(|(_, l)| l.len())
        .map(|(i, _)| i)
        .unwrap();

    let mut iters: Vec<PostingIterator> = lists.iter().map(|l| PostingIterator::new(l)).collect();
    let mut out = Vec::new();

    loop {
        let candidate = iters[driver_idx].current();
        if candidate == NO_MORE_DOCS {
            break;
        }
        let mut all_match = true;
        for (i, it) in iters.iter_mut().enumerate() {
            if i == driver_idx {
                continue;
            }
            if it.advance(candidate) != candidate {
                all_match = false;
            }
        }
        if all_match {
            out.push(candidate);
            iters[driver_idx].next_doc();
        } else {
            // advance the driver past the candidate so the loop progresses
            iters[driver_idx].advance(candidate + 1);
        }
    }
    out
}

/// Unions posting lists, returning distinct internal ids ascending.
pub fn union(lists: &[&[Posting]]) -> Vec<u32> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for list in lists {
        for p in *list {
            set.insert(p.internal_id);
        }
    }
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postings(ids: &[u32]) -> Vec<Posting> {
        ids.iter()
            .map(|&id| Posting {
                internal_id: id,
                weight: 2,
                term_freq: 1,
            })
            .collect()
    }

    #[test]
    fn advance_is_monotonic_and_finds_target() {
        let p = postings(&[1, 5, 9, 12]);
        let mut it = PostingIterator::new(&p);
        assert_eq!(it.advance(6), 9);
        assert_eq!(it.advance(9), 9);
        assert_eq!(it.advance(100), NO_MORE_DOCS);
    }

    #[test]
    fn intersect_finds_common_ids() {
        let a = postings(&[1, 2, 3, 4, 5]);
        let b = postings(&[2, 4, 6]);
        let result = intersect(&[&a, &b]);
        assert_eq!(result, vec![2, 4]);
    }

    #[test]
    fn union_merges_and_dedupes() {
        let a = postings(&[1, 2, 3]);
        let b = postings(&[2, 3, 4]);
        let result = union(&[&a, &b]);
        assert_eq!(result, vec![1, 2, 3, 4]);
    }
}
