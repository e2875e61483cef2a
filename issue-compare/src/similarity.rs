//! Token-set similarity primitives for cross-branch matching.
//!
//! Both measures are Jaccard-style with the *max* cardinality in the
//! denominator, which keeps them symmetric and penalizes one-sided
//! verbosity.

use std::collections::BTreeSet;

/// Word similarity over lowercased whitespace tokens:
/// `|A ∩ B| / max(|A|, |B|)`.
pub fn message_similarity(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<String> = a.split_whitespace().map(str::to_lowercase).collect();
    let set_b: BTreeSet<String> = b.split_whitespace().map(str::to_lowercase).collect();
    token_similarity(&set_a, &set_b)
}

/// Code similarity after light normalization: whitespace runs collapse to
/// single spaces, `{`, `}`, `(`, `)` are stripped, everything lowercased.
pub fn code_similarity(a: &str, b: &str) -> f64 {
    let set_a = normalize_code(a);
    let set_b = normalize_code(b);
    token_similarity(&set_a, &set_b)
}

fn normalize_code(code: &str) -> BTreeSet<String> {
    code.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '{' | '}' | '(' | ')'))
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn token_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let larger = a.len().max(b.len());
    if larger == 0 {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / larger as f64
}
