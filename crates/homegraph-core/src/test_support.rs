//! Test Support
//!
//! In-memory implementations of the store traits plus fixture builders,
//! for downstream crate tests. Gated behind the `test-utils` feature; not
//! part of the production surface. The stores count bulk calls so tests
//! can assert the batching contract, and can be told to fail the next N
//! operations to exercise retry paths.

use crate::error::{EnrichmentError, EnrichmentResult};
use crate::outputs::{ConnectionEdge, RelationshipDocument, SimilarityEdge, TopicCluster};
use crate::records::{
    ArticleRecord, GeoPoint, NeighborhoodRecord, PropertyRecord, PropertyType,
};
use crate::store::{DocumentStore, GraphStore, VectorIndex, VectorMatch};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn take_failure(counter: &AtomicUsize, store: &str) -> EnrichmentResult<()> {
    loop {
        let current = counter.load(Ordering::SeqCst);
        if current == 0 {
            return Ok(());
        }
        if counter
            .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return Err(EnrichmentError::store_unavailable(store, "injected failure"));
        }
    }
}

/// In-memory graph store recording upserts by key
#[derive(Default)]
pub struct InMemoryGraphStore {
    pub neighborhoods: Mutex<Vec<NeighborhoodRecord>>,
    pub similarity_edges: Mutex<BTreeMap<String, SimilarityEdge>>,
    pub connection_edges: Mutex<BTreeMap<String, ConnectionEdge>>,
    pub clusters: Mutex<BTreeMap<String, TopicCluster>>,
    pub existing_indexes: Mutex<Vec<String>>,
    pub edge_upsert_calls: AtomicUsize,
    fail_next: AtomicUsize,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(name: &str) -> Self {
        let store = Self::default();
        store.existing_indexes.lock().unwrap().push(name.to_string());
        store
    }

    pub fn add_neighborhood(&self, hood: NeighborhoodRecord) {
        self.neighborhoods.lock().unwrap().push(hood);
    }

    /// Fail the next `n` upsert calls with `StoreUnavailable`
    pub fn fail_next_upserts(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn upsert_similarity_edges(&self, edges: &[SimilarityEdge]) -> EnrichmentResult<()> {
        take_failure(&self.fail_next, "graph")?;
        self.edge_upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut map = self.similarity_edges.lock().unwrap();
        for edge in edges {
            map.insert(edge.key(), edge.clone());
        }
        Ok(())
    }

    async fn upsert_connection_edges(&self, edges: &[ConnectionEdge]) -> EnrichmentResult<()> {
        take_failure(&self.fail_next, "graph")?;
        self.edge_upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut map = self.connection_edges.lock().unwrap();
        for edge in edges {
            map.insert(edge.key(), edge.clone());
        }
        Ok(())
    }

    async fn upsert_topic_clusters(&self, clusters: &[TopicCluster]) -> EnrichmentResult<()> {
        take_failure(&self.fail_next, "graph")?;
        let mut map = self.clusters.lock().unwrap();
        for cluster in clusters {
            map.insert(cluster.cluster_id.clone(), cluster.clone());
        }
        Ok(())
    }

    async fn neighborhoods_with_articles(&self) -> EnrichmentResult<Vec<NeighborhoodRecord>> {
        Ok(self.neighborhoods.lock().unwrap().clone())
    }

    async fn vector_index_exists(&self, name: &str) -> EnrichmentResult<bool> {
        Ok(self
            .existing_indexes
            .lock()
            .unwrap()
            .iter()
            .any(|n| n == name))
    }
}

/// In-memory vector index backed by a fixed candidate table
#[derive(Default)]
pub struct InMemoryVectorIndex {
    pub candidates: Mutex<BTreeMap<String, Vec<VectorMatch>>>,
    pub query_calls: AtomicUsize,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_neighbors(&self, source_id: &str, matches: Vec<(&str, f64)>) {
        self.candidates.lock().unwrap().insert(
            source_id.to_string(),
            matches
                .into_iter()
                .map(|(id, similarity)| VectorMatch {
                    id: id.to_string(),
                    similarity,
                })
                .collect(),
        );
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn nearest(
        &self,
        source_id: &str,
        k: usize,
        min_similarity: f64,
    ) -> EnrichmentResult<Vec<VectorMatch>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let map = self.candidates.lock().unwrap();
        let mut matches = map.get(source_id).cloned().unwrap_or_default();
        matches.retain(|m| m.similarity >= min_similarity);
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(k);
        Ok(matches)
    }
}

/// In-memory document store with per-method bulk call counters
#[derive(Default)]
pub struct InMemoryDocumentStore {
    pub properties: Mutex<BTreeMap<String, PropertyRecord>>,
    pub neighborhoods: Mutex<BTreeMap<String, NeighborhoodRecord>>,
    pub articles: Mutex<BTreeMap<String, ArticleRecord>>,
    pub relationship_documents: Mutex<BTreeMap<String, RelationshipDocument>>,
    pub property_fetch_calls: AtomicUsize,
    pub neighborhood_fetch_calls: AtomicUsize,
    pub article_fetch_calls: AtomicUsize,
    pub document_upsert_calls: AtomicUsize,
    fail_next: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_property(&self, record: PropertyRecord) {
        self.properties
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    pub fn add_neighborhood(&self, record: NeighborhoodRecord) {
        self.neighborhoods
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    pub fn add_article(&self, record: ArticleRecord) {
        self.articles
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    /// Fail the next `n` fetch or upsert calls with `StoreUnavailable`
    pub fn fail_next_calls(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list_property_ids(&self) -> EnrichmentResult<Vec<String>> {
        Ok(self.properties.lock().unwrap().keys().cloned().collect())
    }

    async fn fetch_properties(&self, ids: &[String]) -> EnrichmentResult<Vec<PropertyRecord>> {
        take_failure(&self.fail_next, "document")?;
        self.property_fetch_calls.fetch_add(1, Ordering::SeqCst);
        let map = self.properties.lock().unwrap();
        Ok(ids.iter().filter_map(|id| map.get(id).cloned()).collect())
    }

    async fn fetch_neighborhoods(
        &self,
        ids: &[String],
    ) -> EnrichmentResult<Vec<NeighborhoodRecord>> {
        take_failure(&self.fail_next, "document")?;
        self.neighborhood_fetch_calls.fetch_add(1, Ordering::SeqCst);
        let map = self.neighborhoods.lock().unwrap();
        Ok(ids.iter().filter_map(|id| map.get(id).cloned()).collect())
    }

    async fn fetch_articles(&self, ids: &[String]) -> EnrichmentResult<Vec<ArticleRecord>> {
        take_failure(&self.fail_next, "document")?;
        self.article_fetch_calls.fetch_add(1, Ordering::SeqCst);
        let map = self.articles.lock().unwrap();
        Ok(ids.iter().filter_map(|id| map.get(id).cloned()).collect())
    }

    async fn upsert_relationship_documents(
        &self,
        docs: &[RelationshipDocument],
    ) -> EnrichmentResult<()> {
        take_failure(&self.fail_next, "document")?;
        self.document_upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut map = self.relationship_documents.lock().unwrap();
        for doc in docs {
            map.insert(doc.id.clone(), doc.clone());
        }
        Ok(())
    }
}

/// Fixture: a house listing with sensible defaults
pub fn property_fixture(id: &str, price: f64, bedrooms: u32) -> PropertyRecord {
    PropertyRecord {
        id: id.to_string(),
        price,
        bedrooms,
        bathrooms: 2.0,
        square_feet: Some(1800),
        property_type: PropertyType::House,
        description: Some(format!("Charming {}-bedroom home", bedrooms)),
        neighborhood_id: None,
        embedding: None,
        location: None,
    }
}

/// Fixture: a neighborhood with tags and an optional centroid
pub fn neighborhood_fixture(id: &str, city: &str, tags: &[&str]) -> NeighborhoodRecord {
    NeighborhoodRecord {
        id: id.to_string(),
        name: format!("{} Heights", id),
        city: city.to_string(),
        state: "TX".to_string(),
        description: Some(format!("A walkable part of {}", city)),
        lifestyle_tags: tags.iter().map(|t| t.to_string()).collect(),
        centroid: None,
        price_stats: None,
        article_correlations: vec![],
    }
}

/// Fixture: an article with a summary and topic list
pub fn article_fixture(id: &str, title: &str, topics: &[&str]) -> ArticleRecord {
    ArticleRecord {
        id: id.to_string(),
        title: title.to_string(),
        summary: format!("{} is covered in depth here.", title),
        topics: Some(topics.iter().map(|t| t.to_string()).collect()),
        relevance: Some(0.8),
    }
}

/// Fixture: a centroid point, panicking on bad test coordinates
pub fn centroid(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint::new(lat, lon).expect("valid fixture coordinates")
}
