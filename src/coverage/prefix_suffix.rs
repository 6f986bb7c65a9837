//! Prefix/suffix sub-matcher: two passes (exact, then fuzzy) over query
//! tokens sorted by length descending, longest first so the most specific
//! match claims a doc token before a shorter token can.

use crate::damerau::damerau_distance;

use super::{DocToken, QueryToken};

pub(super) fn run(qtoks: &mut [QueryToken], dtoks: &mut [DocToken]) -> f64 {
    let mut score = 0.0;
    let last_index = qtoks.len().saturating_sub(1);

    let mut order: Vec<usize> = (0..qtoks.len()).collect();
    order.sort_by(|&a, &b| qtoks[b].len.cmp(&qtoks[a].len));

    // Exact pass.
    for &i in &order {
        if qtoks[i].matched_chars > 0 {
            continue;
        }
        let qlen = qtoks[i].len;
        let qtext = qtoks[i].text.clone();
        let mut best: Option<(usize, f64, bool)> = None; // (doc idx, score, is_prefix)

        for (j, d) in dtoks.iter().enumerate() {
            if !d.active {
                continue;
            }
            let dlen = d.len;
            let (s, is_prefix) = if qlen < dlen && d.text.starts_with(&qtext) {
                (qlen as f64, true)
            } else if qlen < dlen && d.text.ends_with(&qtext) {
                ((qlen as f64 / 2.0).max(1.0), false)
            } else if qlen >= 4 && d.text.contains(&qtext) {
                (qlen as f64 * 0.6, false)
            } else if qlen > dlen && qtext.ends_with(&d.text) {
                (dlen as f64, false)
            } else {
                continue;
            };
            if best.as_ref().map(|(_, bs, _)| s > *bs).unwrap_or(true) {
                best = Some((j, s, is_prefix));
            }
        }

        if let Some((j, s, is_prefix)) = best {
            dtoks[j].active = false;
            score += s;
            let q = &mut qtoks[i];
            q.matched_chars = (s.round() as usize).min(q.len).max(q.matched_chars);
            if is_prefix {
                q.has_prefix = true;
            }
            if q.first_matched_position.is_none() {
                q.first_matched_position = Some(dtoks[j].position);
            }
        }
    }

    // Fuzzy prefix pass: for still-unmatched tokens, allow a clean prefix
    // within edit distance 1.
    for &i in &order {
        if qtoks[i].matched_chars > 0 {
            continue;
        }
        let qlen = qtoks[i].len;
        let eligible = qlen >= 4 || (qlen >= 2 && i == last_index);
        if !eligible {
            continue;
        }
        let qtext = qtoks[i].text.clone();
        let mut best: Option<(usize, f64)> = None;

        for (j, d) in dtoks.iter().enumerate() {
            if !d.active {
                continue;
            }
            for window_len in [qlen.saturating_sub(1), qlen, qlen + 1] {
                if window_len == 0 || window_len > d.len {
                    continue;
                }
                let prefix: String = d.text.chars().take(window_len).collect();
                let dist = damerau_distance(&qtext, &prefix);
                if dist <= 1 {
                    let matched_len = window_len.min(qlen);
                    let s = ((matched_len as f64 - dist as f64) * 0.5).max(0.1);
                    if best.as_ref().map(|(_, bs)| s > *bs).unwrap_or(true) {
                        best = Some((j, s));
                    }
                }
            }
        }

        if let Some((j, s)) = best {
            dtoks[j].active = false;
            score += s;
            let q = &mut qtoks[i];
            q.has_prefix = true;
            q.matched_chars = q.matched_chars.max((s.round() as usize).min(q.len));
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
    fn exact_prefix_matches() {
        let mut q = build_query_tokens(&["qui".to_string()], |_| 1.0);
        let mut d = build_doc_tokens("the quick brown fox");
        let score = run(&mut q, &mut d);
        assert!(score > 0.0);
        assert!(q[0].has_prefix);
    }

    #[test]
    fn fuzzy_prefix_tolerates_one_edit() {
        let mut q = build_query_tokens(&["quuck".to_string()], |_| 1.0);
        let mut d = build_doc_tokens("the quick brown fox");
        let score = run(&mut q, &mut d);
        assert!(score > 0.0);
    }
}
