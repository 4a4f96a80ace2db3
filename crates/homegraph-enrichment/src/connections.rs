//! Neighborhood Connection Scoring
//!
//! All-pairs connection strength over the neighborhood set. The set is
//! small (hundreds, not millions), so the O(n²) pass is deliberate; pairs
//! are never silently skipped. Pair scoring is CPU-bound and runs on
//! rayon workers.

use homegraph_config::ConnectionConfig;
use homegraph_core::error::{EnrichmentError, EnrichmentResult};
use homegraph_core::outputs::ConnectionEdge;
use homegraph_core::records::NeighborhoodRecord;
use homegraph_core::scoring::{
    distance_km, jaccard, normalize_topics, price_closeness, proximity_score, CompositeScorer,
};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// Result of the all-pairs connection pass
#[derive(Debug, Default)]
pub struct ConnectionBatch {
    pub edges: Vec<ConnectionEdge>,
    pub pairs_scored: usize,
    /// Edges dropped for out-of-range scores (invariant violations)
    pub dropped: usize,
}

/// Pre-extracted per-neighborhood scoring inputs, so the pair loop never
/// re-normalizes tag or topic sets.
struct ScoringView<'a> {
    record: &'a NeighborhoodRecord,
    lifestyle: HashSet<String>,
    topics: HashSet<String>,
}

impl<'a> ScoringView<'a> {
    fn new(record: &'a NeighborhoodRecord) -> Self {
        let topics = normalize_topics(
            record
                .article_correlations
                .iter()
                .flat_map(|c| c.topics.iter()),
        );
        Self {
            record,
            lifestyle: normalize_topics(record.lifestyle_tags.iter()),
            topics,
        }
    }
}

/// Scores every unordered neighborhood pair and keeps edges above the
/// configured threshold.
pub struct NeighborhoodConnectionEngine {
    config: ConnectionConfig,
    scorer: CompositeScorer,
}

impl NeighborhoodConnectionEngine {
    pub fn new(config: ConnectionConfig) -> EnrichmentResult<Self> {
        let scorer = CompositeScorer::new(config.weights.clone())?;
        Ok(Self { config, scorer })
    }

    /// One-time, whole-dataset pass over all unordered pairs.
    pub fn connect_all(
        &self,
        neighborhoods: &[NeighborhoodRecord],
    ) -> EnrichmentResult<ConnectionBatch> {
        let views: Vec<ScoringView> = neighborhoods.iter().map(ScoringView::new).collect();

        let n = views.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();

        let scored: Vec<EnrichmentResult<Option<ConnectionEdge>>> = pairs
            .par_iter()
            .map(|&(i, j)| self.score_pair(&views[i], &views[j]))
            .collect();

        let mut result = ConnectionBatch {
            pairs_scored: pairs.len(),
            ..Default::default()
        };
        for (outcome, &(i, j)) in scored.into_iter().zip(pairs.iter()) {
            match outcome {
                Ok(Some(edge)) => result.edges.push(edge),
                Ok(None) => {}
                Err(EnrichmentError::ScoreOutOfRange { name, value }) => {
                    warn!(
                        neighborhood_a = %views[i].record.id,
                        neighborhood_b = %views[j].record.id,
                        score = %name,
                        value,
                        "Dropping connection edge with out-of-range score"
                    );
                    result.dropped += 1;
                }
                Err(other) => return Err(other),
            }
        }

        // Deterministic output order regardless of worker scheduling
        result
            .edges
            .sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(result)
    }

    fn score_pair(
        &self,
        a: &ScoringView,
        b: &ScoringView,
    ) -> EnrichmentResult<Option<ConnectionEdge>> {
        let (geographic, distance) = self.geographic_proximity(a.record, b.record);
        let lifestyle = jaccard(&a.lifestyle, &b.lifestyle);
        let topics = jaccard(&a.topics, &b.topics);
        let price = self.price_similarity(a.record, b.record);

        let mut sub_scores = BTreeMap::new();
        sub_scores.insert("geographic".to_string(), geographic);
        sub_scores.insert("lifestyle".to_string(), lifestyle);
        sub_scores.insert("topics".to_string(), topics);
        sub_scores.insert("price".to_string(), price);

        let strength = self.scorer.score(&sub_scores)?;
        if strength <= self.config.threshold {
            return Ok(None);
        }

        let edge = ConnectionEdge::new(
            &a.record.id,
            &b.record.id,
            strength,
            geographic,
            lifestyle,
            topics,
            price,
            distance,
        )?;
        Ok(Some(edge))
    }

    /// Centroid-based proximity, falling back to a coarse same-city /
    /// different-city value when either centroid is missing.
    fn geographic_proximity(
        &self,
        a: &NeighborhoodRecord,
        b: &NeighborhoodRecord,
    ) -> (f64, Option<f64>) {
        match (a.centroid, b.centroid) {
            (Some(ca), Some(cb)) => {
                let distance = distance_km(ca, cb);
                (
                    proximity_score(distance, self.config.max_distance_km),
                    Some(distance),
                )
            }
            _ => {
                let proximity = if a.city.eq_ignore_ascii_case(&b.city) {
                    self.config.same_city_proximity
                } else {
                    self.config.different_city_proximity
                };
                (proximity, None)
            }
        }
    }

    /// Price-range similarity over median statistics; a side with no
    /// statistics scores a neutral 0.5.
    fn price_similarity(&self, a: &NeighborhoodRecord, b: &NeighborhoodRecord) -> f64 {
        match (a.price_stats, b.price_stats) {
            (Some(sa), Some(sb)) => price_closeness(sa.median, sb.median),
            _ => 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homegraph_core::records::{ArticleCorrelation, PriceStats, RelationshipKind};
    use homegraph_core::test_support::{centroid, neighborhood_fixture};

    fn engine() -> NeighborhoodConnectionEngine {
        NeighborhoodConnectionEngine::new(ConnectionConfig::default()).unwrap()
    }

    fn with_topics(mut hood: NeighborhoodRecord, topics: &[&str]) -> NeighborhoodRecord {
        hood.article_correlations.push(ArticleCorrelation {
            article_id: format!("article:{}", hood.id),
            relationship: RelationshipKind::Primary,
            confidence: 0.9,
            topics: topics.iter().map(|t| t.to_string()).collect(),
        });
        hood
    }

    #[test]
    fn test_close_similar_neighborhoods_connect() {
        let mut a = neighborhood_fixture("n1", "Austin", &["parks", "music", "food"]);
        a.centroid = Some(centroid(30.26, -97.74));
        a.price_stats = Some(PriceStats {
            min: 300_000.0,
            max: 900_000.0,
            median: 500_000.0,
        });
        let mut b = neighborhood_fixture("n2", "Austin", &["parks", "music", "coffee"]);
        b.centroid = Some(centroid(30.29, -97.73));
        b.price_stats = Some(PriceStats {
            min: 320_000.0,
            max: 880_000.0,
            median: 520_000.0,
        });

        let a = with_topics(a, &["live music", "barbecue"]);
        let b = with_topics(b, &["live music", "barbecue"]);

        let result = engine().connect_all(&[a, b]).unwrap();
        assert_eq!(result.pairs_scored, 1);
        assert_eq!(result.edges.len(), 1);

        let edge = &result.edges[0];
        assert!(edge.connection_strength > 0.5);
        assert!(edge.distance_km.unwrap() < 5.0);
        assert_eq!(edge.topic_overlap, 1.0);
    }

    #[test]
    fn test_distant_disjoint_neighborhoods_do_not_connect() {
        // ~200 km apart with max proximity distance 50 km, disjoint tags
        // and topics: geographic proximity must be zero and the edge must
        // fall below the default threshold.
        let mut a = neighborhood_fixture("n1", "Austin", &["nightlife"]);
        a.centroid = Some(centroid(30.2672, -97.7431));
        let mut b = neighborhood_fixture("n2", "Waco", &["fishing"]);
        b.centroid = Some(centroid(32.0, -97.0));

        let a = with_topics(a, &["live music"]);
        let b = with_topics(b, &["rivers"]);

        let result = engine().connect_all(&[a, b]).unwrap();
        assert!(result.edges.is_empty());
    }

    #[test]
    fn test_missing_centroids_fall_back_to_city_match() {
        let a = neighborhood_fixture("n1", "Austin", &["parks", "food"]);
        let b = neighborhood_fixture("n2", "Austin", &["parks", "food"]);
        let a = with_topics(a, &["tech"]);
        let b = with_topics(b, &["tech"]);

        let result = engine().connect_all(&[a, b]).unwrap();
        assert_eq!(result.edges.len(), 1);
        let edge = &result.edges[0];
        assert_eq!(edge.geographic_proximity, 1.0);
        assert!(edge.distance_km.is_none());
    }

    #[test]
    fn test_all_pairs_are_scored() {
        let hoods: Vec<NeighborhoodRecord> = (0..6)
            .map(|i| neighborhood_fixture(&format!("n{}", i), "Austin", &[]))
            .collect();
        let result = engine().connect_all(&hoods).unwrap();
        // 6 choose 2
        assert_eq!(result.pairs_scored, 15);
    }

    #[test]
    fn test_no_self_edges() {
        let a = neighborhood_fixture("n1", "Austin", &["parks"]);
        let result = engine().connect_all(&[a]).unwrap();
        assert_eq!(result.pairs_scored, 0);
        assert!(result.edges.is_empty());
    }

    #[test]
    fn test_comma_separated_topics_are_flattened() {
        let mut a = neighborhood_fixture("n1", "Austin", &[]);
        a.article_correlations.push(ArticleCorrelation {
            article_id: "a1".to_string(),
            relationship: RelationshipKind::Primary,
            confidence: 0.9,
            topics: vec!["Live Music, Barbecue".to_string()],
        });
        let mut b = neighborhood_fixture("n2", "Austin", &[]);
        b.article_correlations.push(ArticleCorrelation {
            article_id: "a2".to_string(),
            relationship: RelationshipKind::Primary,
            confidence: 0.9,
            topics: vec!["barbecue".to_string(), " live music ".to_string()],
        });

        let result = engine().connect_all(&[a, b]).unwrap();
        assert_eq!(result.edges.len(), 1);
        assert_eq!(result.edges[0].topic_overlap, 1.0);
    }
}
