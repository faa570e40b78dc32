//! Token-level similarity: Jaccard overlap and normalized LCS.

use std::collections::HashSet;

/// Lowercase, treat every non-alphanumeric char as a separator.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text
        .chars()
        .flat_map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![' ']
            }
        })
        .collect();
    normalized.split_whitespace().map(str::to_string).collect()
}

/// `|A ∩ B| / |A ∪ B|` over token sets. Both empty → 1.0, one empty → 0.0.
pub fn jaccard(prediction: &str, reference: &str) -> f64 {
    let a: HashSet<String> = tokenize(prediction).into_iter().collect();
    let b: HashSet<String> = tokenize(reference).into_iter().collect();
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        _ => {
            let inter = a.intersection(&b).count();
            let union = a.union(&b).count();
            inter as f64 / union as f64
        }
    }
}

/// Longest common subsequence length of two token sequences, O(m·n) time
/// with a single rolling row.
pub fn lcs_len<T: PartialEq>(x: &[T], y: &[T]) -> usize {
    let mut dp = vec![0usize; y.len() + 1];
    for xi in x {
        let mut diag = 0;
        for (j, yj) in y.iter().enumerate() {
            let above = dp[j + 1];
            dp[j + 1] = if xi == yj {
                diag + 1
            } else {
                above.max(dp[j])
            };
            diag = above;
        }
    }
    dp[y.len()]
}

/// LCS length over `max(m, n)`. Same empty-input rules as [`jaccard`].
pub fn lcs_ratio(prediction: &str, reference: &str) -> f64 {
    let x = tokenize(prediction);
    let y = tokenize(reference);
    match (x.is_empty(), y.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        _ => lcs_len(&x, &y) as f64 / x.len().max(y.len()) as f64,
    }
}
