//! Scoring Primitives
//!
//! Pure math the engines build on: great-circle distance, set similarity,
//! and weighted composite scoring. Nothing here touches a store.

pub mod composite;
pub mod geo;
pub mod sets;

pub use composite::{CompositeScorer, WEIGHT_SUM_EPSILON};
pub use geo::{distance_km, proximity_score};
pub use sets::{jaccard, normalize_topics};

/// Price closeness: 1 − |a−b| / max(a,b), clamped to [0,1].
///
/// Two zero (or negative, i.e. unpriced) values compare as a perfect
/// match; a single zero against a positive price scores 0.
pub fn price_closeness(a: f64, b: f64) -> f64 {
    let max = a.max(b);
    if max <= 0.0 {
        return 1.0;
    }
    (1.0 - (a - b).abs() / max).clamp(0.0, 1.0)
}
