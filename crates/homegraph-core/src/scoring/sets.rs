//! Set-similarity primitives

use std::collections::HashSet;

/// Jaccard overlap of two sets: |A ∩ B| / |A ∪ B|.
///
/// Two empty sets score 1.0: "no information" on both sides is treated as
/// a perfect match, not a mismatch. Downstream weighting relies on this
/// policy, so it is part of the contract.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    intersection as f64 / union as f64
}

/// Flatten raw topic strings into a normalized set: split on commas,
/// lowercase, trim, drop empties.
pub fn normalize_topics<I, S>(raw: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = HashSet::new();
    for entry in raw {
        for part in entry.as_ref().split(',') {
            let topic = part.trim().to_lowercase();
            if !topic.is_empty() {
                out.insert(topic);
            }
        }
    }
    out
}
