//! Damerau-Levenshtein edit distance (adjacent transpositions included).
//!
//! The unrestricted (true) Damerau-Levenshtein algorithm: a
//! last-occurrence-per-character bookkeeping table plus a sentinel-padded DP
//! matrix, following the standard Lowrance-Wagner recurrence. Unlike Optimal
//! String Alignment (a plain edit distance with one bolted-on transposition
//! term), this allows a substring to be edited more than once, which is what
//! gives it the triangle inequality the Coverage Engine's fuzzy
//! sub-matchers rely on.

use std::collections::HashMap;

/// Full (unbounded) Damerau-Levenshtein distance between two strings,
/// operating on `char`s for Unicode correctness.
pub fn damerau_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }

    let max_dist = n + m;
    // d is offset by one in each dimension so the sentinel row/column at
    // logical index -1 lands at 0.
    let mut d = vec![vec![0usize; m + 2]; n + 2];
    d[0][0] = max_dist;
    for i in 0..=n {
        d[i + 1][0] = max_dist;
        d[i + 1][1] = i;
    }
    for j in 0..=m {
        d[0][j + 1] = max_dist;
        d[1][j + 1] = j;
    }

    // Last row (1-indexed) at which each character of `a` was seen.
    let mut last_row: HashMap<char, usize> = HashMap::new();

    for i in 1..=n {
        let mut last_match_col = 0;
        for j in 1..=m {
            let i_prime = *last_row.get(&b[j - 1]).unwrap_or(&0);
            let j_prime = last_match_col;
            let cost = if a[i - 1] == b[j - 1] {
                last_match_col = j;
                0
            } else {
                1
            };
            let deletion = d[i][j + 1] + 1;
            let insertion = d[i + 1][j] + 1;
            let substitution = d[i][j] + cost;
            let transposition = d[i_prime][j_prime] + (i - i_prime - 1) + 1 + (j - j_prime - 1);
            d[i + 1][j + 1] = deletion.min(insertion).min(substitution).min(transposition);
        }
        last_row.insert(a[i - 1], i);
    }
    d[n + 1][m + 1]
}

/// Returns `true` if the Damerau distance between `a` and `b` is `<= max`.
/// Bounded by an early length-difference exit: if `|len(a) - len(b)| > max`,
/// no edit sequence of length `max` can possibly reconcile them.
pub fn damerau_within(a: &str, b: &str, max: usize) -> bool {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len.abs_diff(b_len) > max {
        return false;
    }
    damerau_distance(a, b) <= max
}

/// Maximum tolerable edit distance for a token of the given character
/// length, under a Binomial(L, p=0.04) error model with a one-sided tail
/// probability `alpha = 0.01`: the smallest `d` such that
/// `P(X > d) <= alpha` for `X ~ Binomial(L, 0.04)`. Always at least 1 for
/// any non-empty token.
pub fn max_edit_distance_for_length(token_len: usize) -> usize {
    if token_len == 0 {
        return 0;
    }
    let l = token_len as f64;
    let p = 0.04_f64;
    let alpha = 0.01_f64;

    let mean = l * p;
    let variance = l * p * (1.0 - p);
    let std_dev = variance.sqrt();

    // Normal approximation to the binomial tail with a continuity
    // correction, solved for the smallest d with P(X > d) <= alpha.
    // z_{1-alpha} for alpha = 0.01 is ~2.326.
    let z = 2.326_f64;
    let d = mean + z * std_dev + 0.5;
    (d.ceil() as usize).max(1)
}
