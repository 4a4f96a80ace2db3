//! Property-to-Property Similarity
//!
//! For every property with an embedding, consumes approximate nearest
//! neighbors from the vector index and recomputes a composite score that
//! folds structured attributes (price, bedrooms, neighborhood) into the
//! raw vector similarity. Edges above the final threshold are emitted
//! once per unordered pair.
//!
//! The raw vector floor and the final composite threshold are independent
//! knobs: the first bounds what the index returns, the second decides
//! what gets persisted.

use homegraph_config::SimilarityConfig;
use homegraph_core::error::{EnrichmentError, EnrichmentResult};
use homegraph_core::outputs::{canonical_pair, SimilarityEdge};
use homegraph_core::records::PropertyRecord;
use homegraph_core::scoring::{price_closeness, CompositeScorer};
use homegraph_core::store::{DocumentStore, GraphStore, VectorIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Method tag recorded on every edge this engine emits
const METHOD: &str = "vector_knn_composite";

/// Result of scoring one batch of properties
#[derive(Debug, Default)]
pub struct SimilarityBatch {
    pub edges: Vec<SimilarityEdge>,
    /// Candidates skipped because the source id matched the candidate id
    /// or the unordered pair was already emitted
    pub deduplicated: usize,
    /// Edges dropped for out-of-range scores (invariant violations)
    pub dropped: usize,
    /// k-NN queries issued
    pub queries: usize,
}

/// Scores vector-index candidates against structured attributes.
///
/// Holds the run-scoped set of emitted unordered pairs, so an engine
/// instance must live for the whole run to keep the no-duplicate-edge
/// invariant across batches.
pub struct PropertySimilarityEngine {
    config: SimilarityConfig,
    scorer: CompositeScorer,
    seen_pairs: HashSet<(String, String)>,
}

impl PropertySimilarityEngine {
    pub fn new(config: SimilarityConfig) -> EnrichmentResult<Self> {
        let scorer = CompositeScorer::new(config.weights.clone())?;
        Ok(Self {
            config,
            scorer,
            seen_pairs: HashSet::new(),
        })
    }

    /// Verify the required vector index exists.
    ///
    /// A missing index is fatal for the whole run: there is no
    /// structured-attribute-only fallback, because a partial run would
    /// produce a misleadingly sparse similarity graph.
    pub async fn preflight(&self, graph: &dyn GraphStore) -> EnrichmentResult<()> {
        let name = &self.config.vector_index_name;
        if !graph.vector_index_exists(name).await? {
            return Err(EnrichmentError::VectorIndexMissing {
                index: name.clone(),
            });
        }
        Ok(())
    }

    /// Score one batch of properties against their nearest neighbors.
    ///
    /// Candidates outside the batch are resolved with a single bulk
    /// property fetch; the k-NN queries themselves are the only
    /// per-property calls.
    pub async fn score_batch(
        &mut self,
        batch: &[PropertyRecord],
        index: &dyn VectorIndex,
        documents: &dyn DocumentStore,
    ) -> EnrichmentResult<SimilarityBatch> {
        let mut result = SimilarityBatch::default();

        let mut neighbor_lists: Vec<(&PropertyRecord, Vec<homegraph_core::VectorMatch>)> =
            Vec::new();
        for property in batch.iter().filter(|p| p.has_embedding()) {
            let matches = index
                .nearest(
                    &property.id,
                    self.config.max_neighbors,
                    self.config.min_vector_similarity,
                )
                .await?;
            result.queries += 1;
            neighbor_lists.push((property, matches));
        }

        // Resolve candidate records: batch members first, then one bulk
        // fetch for everything the index pointed at outside the batch.
        let mut candidates: HashMap<String, PropertyRecord> = batch
            .iter()
            .map(|p| (p.id.clone(), p.clone()))
            .collect();
        let missing: Vec<String> = neighbor_lists
            .iter()
            .flat_map(|(_, matches)| matches.iter())
            .map(|m| m.id.clone())
            .filter(|id| !candidates.contains_key(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !missing.is_empty() {
            for record in documents.fetch_properties(&missing).await? {
                candidates.insert(record.id.clone(), record);
            }
        }

        for (property, matches) in neighbor_lists {
            for candidate_match in matches {
                if candidate_match.id == property.id {
                    result.deduplicated += 1;
                    continue;
                }
                let pair = canonical_pair(&property.id, &candidate_match.id);
                if self.seen_pairs.contains(&pair) {
                    result.deduplicated += 1;
                    continue;
                }
                let Some(candidate) = candidates.get(&candidate_match.id) else {
                    debug!(
                        "Candidate {} from index has no catalog record, skipping",
                        candidate_match.id
                    );
                    continue;
                };

                match self.score_pair(property, candidate, candidate_match.similarity) {
                    Ok(Some(edge)) => {
                        self.seen_pairs.insert(pair);
                        result.edges.push(edge);
                    }
                    Ok(None) => {
                        // below threshold; the pair stays eligible in case
                        // a later query sees it with a stronger signal
                    }
                    Err(EnrichmentError::ScoreOutOfRange { name, value }) => {
                        warn!(
                            property_a = %property.id,
                            property_b = %candidate.id,
                            score = %name,
                            value,
                            "Dropping edge with out-of-range score"
                        );
                        result.dropped += 1;
                    }
                    Err(other) => return Err(other),
                }
            }
        }

        Ok(result)
    }

    /// Composite-score one candidate pair; `None` means below threshold.
    fn score_pair(
        &self,
        a: &PropertyRecord,
        b: &PropertyRecord,
        vector_similarity: f64,
    ) -> EnrichmentResult<Option<SimilarityEdge>> {
        let same_neighborhood = match (&a.neighborhood_id, &b.neighborhood_id) {
            (Some(na), Some(nb)) => na == nb,
            _ => false,
        };

        let mut sub_scores = BTreeMap::new();
        sub_scores.insert("vector".to_string(), vector_similarity);
        sub_scores.insert("price".to_string(), price_closeness(a.price, b.price));
        sub_scores.insert("bedrooms".to_string(), bedroom_closeness(a.bedrooms, b.bedrooms));
        sub_scores.insert(
            "location".to_string(),
            if same_neighborhood { 1.0 } else { 0.0 },
        );

        let bonus = if same_neighborhood {
            self.config.same_neighborhood_bonus
        } else {
            0.0
        };
        let composite = self.scorer.score_with_bonus(&sub_scores, bonus)?;

        if composite <= self.config.final_threshold {
            return Ok(None);
        }

        let mut shared_features = Vec::new();
        let mut reasons = vec![format!("vector similarity {:.2}", vector_similarity)];
        if same_neighborhood {
            shared_features.push("same_neighborhood".to_string());
            reasons.push("located in the same neighborhood".to_string());
        }
        if a.property_type == b.property_type {
            shared_features.push(format!("type:{}", a.property_type.as_str()));
        }
        if a.bedrooms == b.bedrooms {
            shared_features.push(format!("bedrooms:{}", a.bedrooms));
            reasons.push(format!("both have {} bedrooms", a.bedrooms));
        }
        if sub_scores["price"] >= 0.9 {
            reasons.push("similarly priced".to_string());
        }

        let edge = SimilarityEdge::new(
            &a.id,
            &b.id,
            composite,
            sub_scores,
            shared_features,
            reasons,
            METHOD,
        )?;
        Ok(Some(edge))
    }
}

/// Step function over bedroom-count difference: exact match scores 1.0,
/// off-by-one 0.5, anything else 0. The weighted contribution at the
/// default 0.2 weight is therefore 0.2 / 0.1 / 0.
fn bedroom_closeness(a: u32, b: u32) -> f64 {
    match a.abs_diff(b) {
        0 => 1.0,
        1 => 0.5,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homegraph_core::test_support::{
        property_fixture, InMemoryDocumentStore, InMemoryGraphStore, InMemoryVectorIndex,
    };

    fn engine() -> PropertySimilarityEngine {
        PropertySimilarityEngine::new(SimilarityConfig::default()).unwrap()
    }

    fn embedded(id: &str, price: f64, bedrooms: u32, hood: Option<&str>) -> PropertyRecord {
        let mut p = property_fixture(id, price, bedrooms);
        p.embedding = Some(vec![0.1; 8]);
        p.neighborhood_id = hood.map(|h| h.to_string());
        p
    }

    #[test]
    fn test_bedroom_closeness_steps() {
        assert_eq!(bedroom_closeness(3, 3), 1.0);
        assert_eq!(bedroom_closeness(3, 4), 0.5);
        assert_eq!(bedroom_closeness(3, 5), 0.0);
    }

    #[tokio::test]
    async fn test_twin_listings_produce_edge() {
        // Identical price, identical bedrooms, same neighborhood, vector
        // similarity 0.9: must clear the default final threshold.
        let a = embedded("p1", 500_000.0, 3, Some("n1"));
        let b = embedded("p2", 500_000.0, 3, Some("n1"));

        let index = InMemoryVectorIndex::new();
        index.set_neighbors("p1", vec![("p2", 0.9)]);
        index.set_neighbors("p2", vec![("p1", 0.9)]);
        let documents = InMemoryDocumentStore::new();

        let mut engine = engine();
        let result = engine
            .score_batch(&[a, b], &index, &documents)
            .await
            .unwrap();

        assert_eq!(result.edges.len(), 1);
        let edge = &result.edges[0];
        assert!(edge.composite_score > SimilarityConfig::default().final_threshold);
        assert_eq!(edge.property_a, "p1");
        assert_eq!(edge.property_b, "p2");
        assert!(edge.shared_features.contains(&"same_neighborhood".to_string()));
    }

    #[tokio::test]
    async fn test_unordered_pair_emitted_once() {
        let a = embedded("p1", 500_000.0, 3, Some("n1"));
        let b = embedded("p2", 500_000.0, 3, Some("n1"));

        let index = InMemoryVectorIndex::new();
        // both directions returned by the index
        index.set_neighbors("p1", vec![("p2", 0.95)]);
        index.set_neighbors("p2", vec![("p1", 0.95)]);
        let documents = InMemoryDocumentStore::new();

        let mut engine = engine();
        let result = engine
            .score_batch(&[a, b], &index, &documents)
            .await
            .unwrap();

        assert_eq!(result.edges.len(), 1);
        assert_eq!(result.deduplicated, 1);
    }

    #[tokio::test]
    async fn test_self_match_is_skipped() {
        let a = embedded("p1", 500_000.0, 3, None);

        let index = InMemoryVectorIndex::new();
        index.set_neighbors("p1", vec![("p1", 1.0)]);
        let documents = InMemoryDocumentStore::new();

        let mut engine = engine();
        let result = engine.score_batch(&[a], &index, &documents).await.unwrap();
        assert!(result.edges.is_empty());
        assert_eq!(result.deduplicated, 1);
    }

    #[tokio::test]
    async fn test_dissimilar_pair_below_threshold() {
        // Barely over the vector floor, very different price, different
        // bedroom count, different neighborhoods.
        let a = embedded("p1", 200_000.0, 2, Some("n1"));
        let b = embedded("p2", 900_000.0, 5, Some("n2"));

        let index = InMemoryVectorIndex::new();
        index.set_neighbors("p1", vec![("p2", 0.7)]);
        let documents = InMemoryDocumentStore::new();

        let mut engine = engine();
        let result = engine
            .score_batch(&[a, b], &index, &documents)
            .await
            .unwrap();
        assert!(result.edges.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_batch_candidates_fetched_in_one_bulk_call() {
        let a = embedded("p1", 500_000.0, 3, None);

        let index = InMemoryVectorIndex::new();
        index.set_neighbors("p1", vec![("p2", 0.9), ("p3", 0.85)]);

        let documents = InMemoryDocumentStore::new();
        documents.add_property(embedded("p2", 510_000.0, 3, None));
        documents.add_property(embedded("p3", 495_000.0, 3, None));

        let mut engine = engine();
        let result = engine.score_batch(&[a], &index, &documents).await.unwrap();

        assert_eq!(
            documents
                .property_fetch_calls
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
        assert_eq!(result.edges.len(), 2);
    }

    #[tokio::test]
    async fn test_property_without_embedding_is_skipped() {
        let mut a = property_fixture("p1", 500_000.0, 3);
        a.embedding = None;

        let index = InMemoryVectorIndex::new();
        let documents = InMemoryDocumentStore::new();

        let mut engine = engine();
        let result = engine.score_batch(&[a], &index, &documents).await.unwrap();
        assert_eq!(result.queries, 0);
        assert!(result.edges.is_empty());
    }

    #[tokio::test]
    async fn test_missing_index_is_fatal() {
        let graph = InMemoryGraphStore::new();
        let engine = engine();
        let err = engine.preflight(&graph).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_present_index_passes_preflight() {
        let graph = InMemoryGraphStore::with_index("property_embedding_idx");
        let engine = engine();
        engine.preflight(&graph).await.unwrap();
    }

    #[tokio::test]
    async fn test_out_of_range_vector_score_drops_edge() {
        let a = embedded("p1", 500_000.0, 3, None);
        let b = embedded("p2", 500_000.0, 3, None);

        let index = InMemoryVectorIndex::new();
        // a buggy index reporting similarity above 1.0
        index.set_neighbors("p1", vec![("p2", 1.4)]);
        let documents = InMemoryDocumentStore::new();

        let mut engine = engine();
        let result = engine
            .score_batch(&[a, b], &index, &documents)
            .await
            .unwrap();
        assert!(result.edges.is_empty());
        assert_eq!(result.dropped, 1);
    }
}
