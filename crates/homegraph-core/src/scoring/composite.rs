//! Weighted composite scoring
//!
//! Combines named, normalized sub-scores into one [0,1] value. Weights are
//! configuration, validated at construction: a weight map that does not
//! sum to 1.0 within tolerance is rejected before any scoring happens.

use crate::error::{EnrichmentError, EnrichmentResult};
use std::collections::BTreeMap;

/// Tolerance for the weight-sum contract
pub const WEIGHT_SUM_EPSILON: f64 = 0.001;

/// Combines named sub-scores with configured weights and an optional flat
/// bonus, clamping the result to [0,1].
#[derive(Debug, Clone)]
pub struct CompositeScorer {
    weights: BTreeMap<String, f64>,
}

impl CompositeScorer {
    /// Build a scorer from a weight map.
    ///
    /// Fails with a configuration error unless every weight is
    /// non-negative and the weights sum to 1.0 ± 0.001.
    pub fn new(weights: BTreeMap<String, f64>) -> EnrichmentResult<Self> {
        if weights.is_empty() {
            return Err(EnrichmentError::configuration(
                "composite scorer requires at least one weight",
            ));
        }
        for (name, weight) in &weights {
            if *weight < 0.0 || weight.is_nan() {
                return Err(EnrichmentError::configuration(format!(
                    "weight '{}' must be non-negative, got {}",
                    name, weight
                )));
            }
        }
        let sum: f64 = weights.values().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(EnrichmentError::configuration(format!(
                "weights must sum to 1.0 (±{}), got {:.4}",
                WEIGHT_SUM_EPSILON, sum
            )));
        }
        Ok(Self { weights })
    }

    /// Weighted sum of the given sub-scores, clamped to [0,1].
    ///
    /// Sub-scores without a configured weight are ignored; weights without
    /// a sub-score contribute nothing. A sub-score outside [0,1] is an
    /// invariant violation, not a clamping case.
    pub fn score(&self, sub_scores: &BTreeMap<String, f64>) -> EnrichmentResult<f64> {
        self.score_with_bonus(sub_scores, 0.0)
    }

    /// Weighted sum plus a flat bonus (e.g. "same neighborhood"), clamped.
    pub fn score_with_bonus(
        &self,
        sub_scores: &BTreeMap<String, f64>,
        bonus: f64,
    ) -> EnrichmentResult<f64> {
        let mut total = 0.0;
        for (name, weight) in &self.weights {
            if let Some(score) = sub_scores.get(name) {
                if !(0.0..=1.0).contains(score) || score.is_nan() {
                    return Err(EnrichmentError::ScoreOutOfRange {
                        name: name.clone(),
                        value: *score,
                    });
                }
                total += score * weight;
            }
        }
        Ok((total + bonus).clamp(0.0, 1.0))
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }
}
