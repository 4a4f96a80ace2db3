//! Store Abstractions
//!
//! The enrichment layer talks to three external systems through these
//! traits and never touches their wire protocols. Core owns the
//! abstraction; concrete clients live in infrastructure crates and are
//! injected by the caller.
//!
//! All lookups and writes are bulk operations keyed by caller-supplied
//! ids. Per-entity round trips against any of these collaborators are a
//! performance regression, not an implementation detail.

use crate::error::EnrichmentResult;
use crate::outputs::{ConnectionEdge, RelationshipDocument, SimilarityEdge, TopicCluster};
use crate::records::{ArticleRecord, NeighborhoodRecord, PropertyRecord};
use async_trait::async_trait;

/// One nearest-neighbor candidate from the vector index
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    /// Raw vector similarity as reported by the index, in [0,1]
    pub similarity: f64,
}

/// Graph store: bulk edge/cluster upserts keyed by deterministic ids,
/// pattern queries returning joined entity tuples, and index capability
/// checks. Treated as synchronous request/response.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Upsert similarity edges, keyed by `SimilarityEdge::key`
    async fn upsert_similarity_edges(&self, edges: &[SimilarityEdge]) -> EnrichmentResult<()>;

    /// Upsert connection edges, keyed by `ConnectionEdge::key`
    async fn upsert_connection_edges(&self, edges: &[ConnectionEdge]) -> EnrichmentResult<()>;

    /// Upsert topic clusters, keyed by cluster id
    async fn upsert_topic_clusters(&self, clusters: &[TopicCluster]) -> EnrichmentResult<()>;

    /// Pattern query: every neighborhood joined with its article
    /// correlations (and their topic lists).
    async fn neighborhoods_with_articles(&self) -> EnrichmentResult<Vec<NeighborhoodRecord>>;

    /// Whether the named vector index exists. A missing index is a fatal
    /// configuration error for the run, checked before any writes.
    async fn vector_index_exists(&self, name: &str) -> EnrichmentResult<bool>;
}

/// Vector index: k-nearest-neighbor queries with a raw similarity floor.
/// How the index is built is not this layer's concern.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Top-k approximate neighbors of the entity with the given id, with
    /// raw similarity at or above `min_similarity`. May include the
    /// source entity itself; callers must drop self-matches.
    async fn nearest(
        &self,
        source_id: &str,
        k: usize,
        min_similarity: f64,
    ) -> EnrichmentResult<Vec<VectorMatch>>;
}

/// Document store: bulk lookups by id list and bulk idempotent upserts.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All property ids in the catalog, in stable order. The pipeline
    /// pages over this list to form batches.
    async fn list_property_ids(&self) -> EnrichmentResult<Vec<String>>;

    async fn fetch_properties(&self, ids: &[String]) -> EnrichmentResult<Vec<PropertyRecord>>;

    async fn fetch_neighborhoods(&self, ids: &[String])
        -> EnrichmentResult<Vec<NeighborhoodRecord>>;

    async fn fetch_articles(&self, ids: &[String]) -> EnrichmentResult<Vec<ArticleRecord>>;

    /// Upsert relationship documents, keyed by document id (== property id)
    async fn upsert_relationship_documents(
        &self,
        docs: &[RelationshipDocument],
    ) -> EnrichmentResult<()>;
}
