//! Whole-word sub-matcher: exact, case-insensitive equality between a
//! query token and a doc token.

use super::{DocToken, QueryToken};

/// Runs the whole-word pass, mutating both token slices in place, and
/// returns this pass's contribution to `combined`.
pub(super) fn run(qtoks: &mut [QueryToken], dtoks: &mut [DocToken], penalty: &mut u32) -> f64 {
    let mut score = 0.0;
    let qcount = qtoks.len();

    for i in 0..qtoks.len() {
        if qtoks[i].matched_chars > 0 {
            continue;
        }
        let target_len = qtoks[i].len;
        let target_text = qtoks[i].text.clone();
        let found = dtoks
            .iter()
            .position(|d| d.active && d.len == target_len && d.text == target_text);

        if let Some(idx) = found {
            dtoks[idx].active = false;
            let q = &mut qtoks[i];
            q.has_whole = true;
            q.matched_chars = q.len;
            if q.first_matched_position.is_none() {
                q.first_matched_position = Some(dtoks[idx].position);
            }
            score += q.len as f64;
            if qcount >= 2 && i != qcount - 1 {
                score += 1.0;
            }
        }

        // Order-mismatch penalty: compare the doc token sitting at this
        // query token's own index position, independent of whether a match
        // was found elsewhere.
        if dtoks.get(i).map(|d| d.text != target_text).unwrap_or(true) {
            *penalty += 1;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::{build_doc_tokens, build_query_tokens};

    #[test]
    fn matches_exact_whole_words() {
        let mut q = build_query_tokens(&["fox".to_string()], |_| 1.0);
        let mut d = build_doc_tokens("the quick fox");
        let mut penalty = 0;
        let score = run(&mut q, &mut d, &mut penalty);
        assert!(score >= 3.0);
        assert!(q[0].has_whole);
    }

    #[test]
    fn does_not_match_different_length_tokens() {
        let mut q = build_query_tokens(&["fo".to_string()], |_| 1.0);
        let mut d = build_doc_tokens("the quick fox");
        let mut penalty = 0;
        run(&mut q, &mut d, &mut penalty);
        assert!(!q[0].has_whole);
    }
}
