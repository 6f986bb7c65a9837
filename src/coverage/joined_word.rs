//! Joined-word sub-matcher: detects "newyork" <-> "new york" in both
//! directions.

use super::{DocToken, QueryToken};

pub(super) fn run(qtoks: &mut [QueryToken], dtoks: &mut [DocToken]) -> f64 {
    let mut score = 0.0;

    // Consecutive query tokens joined into one doc token.
    for i in 0..qtoks.len().saturating_sub(1) {
        if qtoks[i].matched_chars > 0 || qtoks[i + 1].matched_chars > 0 {
            continue;
        }
        let combined_len = qtoks[i].len + qtoks[i + 1].len;
        let first = qtoks[i].text.clone();
        let second = qtoks[i + 1].text.clone();
        let found = dtoks.iter().position(|d| {
            d.active && d.len == combined_len && d.text.starts_with(&first) && d.text.ends_with(&second)
        });
        if let Some(idx) = found {
            dtoks[idx].active = false;
            score += combined_len as f64;
            for t in [&mut qtoks[i], &mut qtoks[i + 1]] {
                t.has_joined = true;
                t.has_prefix = true;
                t.matched_chars = t.len;
                if t.first_matched_position.is_none() {
                    t.first_matched_position = Some(dtoks[idx].position);
                }
            }
        }
    }

    // Symmetric: a single query token explained by two consecutive doc
    // tokens joined together.
    for q in qtoks.iter_mut() {
        if q.matched_chars > 0 {
            continue;
        }
        let mut found: Option<(usize, usize)> = None;
        for j in 0..dtoks.len().saturating_sub(1) {
            if !dtoks[j].active || !dtoks[j + 1].active {
                continue;
            }
            if dtoks[j].len + dtoks[j + 1].len == q.len
                && q.text.starts_with(&dtoks[j].text)
                && q.text.ends_with(&dtoks[j + 1].text)
            {
                found = Some((j, j + 1));
                break;
            }
        }
        if let Some((a, b)) = found {
            dtoks[a].active = false;
            dtoks[b].active = false;
            q.has_joined = true;
            q.has_prefix = true;
            q.matched_chars = q.len;
            if q.first_matched_position.is_none() {
                q.first_matched_position = Some(dtoks[a].position);
            }
            score += q.len as f64;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::{build_doc_tokens, build_query_tokens};

    #[test]
    fn joins_two_query_tokens_into_one_doc_token() {
        let mut q = build_query_tokens(&["new".to_string(), "york".to_string()], |_| 1.0);
        let mut d = build_doc_tokens("i love newyork city");
        let score = run(&mut q, &mut d);
        assert!(score > 0.0);
        assert!(q[0].has_joined && q[1].has_joined);
    }

    #[test]
    fn joins_one_query_token_from_two_doc_tokens() {
        let mut q = build_query_tokens(&["newyork".to_string()], |_| 1.0);
        let mut d = build_doc_tokens("i love new york city");
        let score = run(&mut q, &mut d);
        assert!(score > 0.0);
        assert!(q[0].has_joined);
    }
}
