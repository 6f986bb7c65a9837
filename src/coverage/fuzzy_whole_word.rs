//! Fuzzy whole-word sub-matcher: the last-resort pass, tolerating
//! increasing edit distance up to a length-scaled bound.

use crate::damerau::{damerau_distance, max_edit_distance_for_length};

use super::{DocToken, QueryToken};

pub(super) fn run(qtoks: &mut [QueryToken], dtoks: &mut [DocToken], min_word_size: usize) -> f64 {
    let mut score = 0.0;

    for i in 0..qtoks.len() {
        if qtoks[i].matched_chars > 0 {
            continue;
        }
        let qlen = qtoks[i].len;
        let qtext = qtoks[i].text.clone();
        let max_d = max_edit_distance_for_length(qlen);
        let len_bound = max_d.min(63);

        let mut matched: Option<(usize, usize)> = None; // (doc idx, distance)
        'outer: for d in 1..=max_d {
            for (j, dtok) in dtoks.iter().enumerate() {
                if !dtok.active {
                    continue;
                }
                if dtok.len < min_word_size || dtok.len > len_bound.max(min_word_size) {
                    continue;
                }
                if damerau_distance(&qtext, &dtok.text) <= d {
                    matched = Some((j, d));
                    break 'outer;
                }
            }
        }

        if let Some((j, dist)) = matched {
            dtoks[j].active = false;
            let contribution = (qlen as f64 - dist as f64).max(0.0);
            score += contribution;
            let q = &mut qtoks[i];
            q.has_whole = true;
            q.matched_chars = q.matched_chars.max(contribution.round() as usize).min(q.len);
            if q.first_matched_position.is_none() {
                q.first_matched_position = Some(dtoks[j].position);
            }
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::{build_doc_tokens, build_query_tokens};

    #[test]
    fn tolerates_typos_within_bound() {
        let mut q = build_query_tokens(&["battamam".to_string()], |_| 1.0);
        let mut d = build_doc_tokens("batman and robin fight crime");
        let score = run(&mut q, &mut d, 2);
        assert!(score > 0.0);
        assert!(q[0].has_whole);
    }

    #[test]
    fn does_not_match_wildly_different_words() {
        let mut q = build_query_tokens(&["xyz".to_string()], |_| 1.0);
        let mut d = build_doc_tokens("completely unrelated content");
        run(&mut q, &mut d, 2);
        assert_eq!(q[0].matched_chars, 0);
    }
}
