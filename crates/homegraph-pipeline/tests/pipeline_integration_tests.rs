//! End-to-end pipeline tests against the in-memory stores.

use homegraph_config::EnrichmentConfig;
use homegraph_core::records::{ArticleCorrelation, NeighborhoodRecord, PriceStats, RelationshipKind};
use homegraph_core::test_support::{
    article_fixture, centroid, neighborhood_fixture, property_fixture, InMemoryDocumentStore,
    InMemoryGraphStore, InMemoryVectorIndex,
};
use homegraph_pipeline::EnrichmentPipeline;
use std::sync::Arc;

struct Fixture {
    graph: Arc<InMemoryGraphStore>,
    vectors: Arc<InMemoryVectorIndex>,
    documents: Arc<InMemoryDocumentStore>,
    config: EnrichmentConfig,
}

impl Fixture {
    fn pipeline(&self) -> EnrichmentPipeline {
        EnrichmentPipeline::new(
            self.graph.clone(),
            self.vectors.clone(),
            self.documents.clone(),
            self.config.clone(),
        )
    }
}

fn hood(id: &str, lat: f64, lon: f64) -> NeighborhoodRecord {
    let mut hood = neighborhood_fixture(id, "Austin", &["parks", "music"]);
    hood.centroid = Some(centroid(lat, lon));
    hood.price_stats = Some(PriceStats {
        min: 300_000.0,
        max: 900_000.0,
        median: 500_000.0,
    });
    hood.article_correlations = vec![ArticleCorrelation {
        article_id: "a1".to_string(),
        relationship: RelationshipKind::Primary,
        confidence: 0.9,
        topics: vec!["live music".to_string()],
    }];
    hood
}

/// Three listings in two connected neighborhoods; p1 and p2 are near
/// twins with embeddings, p3 has no embedding.
fn fixture() -> Fixture {
    let graph = Arc::new(InMemoryGraphStore::with_index("property_embedding_idx"));
    let vectors = Arc::new(InMemoryVectorIndex::new());
    let documents = Arc::new(InMemoryDocumentStore::new());

    let n1 = hood("n1", 30.26, -97.74);
    let n2 = hood("n2", 30.28, -97.73);
    graph.add_neighborhood(n1.clone());
    graph.add_neighborhood(n2.clone());
    documents.add_neighborhood(n1);
    documents.add_neighborhood(n2);
    documents.add_article(article_fixture("a1", "Austin Music Scene", &["live music"]));

    let mut p1 = property_fixture("p1", 500_000.0, 3);
    p1.neighborhood_id = Some("n1".to_string());
    p1.embedding = Some(vec![0.1; 8]);
    let mut p2 = property_fixture("p2", 505_000.0, 3);
    p2.neighborhood_id = Some("n1".to_string());
    p2.embedding = Some(vec![0.1; 8]);
    let mut p3 = property_fixture("p3", 350_000.0, 2);
    p3.neighborhood_id = Some("n2".to_string());
    documents.add_property(p1);
    documents.add_property(p2);
    documents.add_property(p3);

    vectors.set_neighbors("p1", vec![("p2", 0.9)]);
    vectors.set_neighbors("p2", vec![("p1", 0.9)]);

    let mut config = EnrichmentConfig::default();
    config.batch.retry_backoff_ms = 1;
    Fixture {
        graph,
        vectors,
        documents,
        config,
    }
}

#[tokio::test]
async fn test_full_run_produces_all_outputs() {
    let fixture = fixture();
    let report = fixture.pipeline().run().await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.properties_processed, 3);
    assert_eq!(report.documents_written, 3);
    assert_eq!(report.similarity_edges, 1);
    assert_eq!(report.connection_edges, 1);
    assert_eq!(report.topic_clusters, 1);
    assert_eq!(report.resolution_gaps, 0);
    assert_eq!(report.dropped_edges, 0);

    let edges = fixture.graph.similarity_edges.lock().unwrap();
    assert!(edges.contains_key("sim:p1:p2"));
    let connections = fixture.graph.connection_edges.lock().unwrap();
    assert!(connections.contains_key("conn:n1:n2"));
    let clusters = fixture.graph.clusters.lock().unwrap();
    let cluster = clusters.get("cluster:live music").unwrap();
    assert_eq!(cluster.member_count, 2);

    let docs = fixture.documents.relationship_documents.lock().unwrap();
    let doc = docs.get("p1").unwrap();
    assert_eq!(doc.neighborhood.as_ref().unwrap().id, "n1");
    assert_eq!(doc.articles.len(), 1);
    assert_eq!(doc.articles[0].article_id, "a1");
    assert!(doc.search_text.contains("austin music scene"));
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let fixture = fixture();
    fixture.pipeline().run().await.unwrap();

    let docs_first = fixture
        .documents
        .relationship_documents
        .lock()
        .unwrap()
        .clone();
    let sim_first = fixture.graph.similarity_edges.lock().unwrap().clone();
    let conn_first = fixture.graph.connection_edges.lock().unwrap().clone();

    // Fresh pipeline, unchanged input: outputs must be identical.
    fixture.pipeline().run().await.unwrap();

    assert_eq!(
        *fixture.documents.relationship_documents.lock().unwrap(),
        docs_first
    );
    assert_eq!(*fixture.graph.similarity_edges.lock().unwrap(), sim_first);
    assert_eq!(*fixture.graph.connection_edges.lock().unwrap(), conn_first);
}

#[tokio::test]
async fn test_pair_emitted_once_even_across_batches() {
    let mut fixture = fixture();
    // batch size 1 forces p1 and p2 into separate batches; the index
    // returns the pair from both directions
    fixture.config.batch.batch_size = 1;

    let report = fixture.pipeline().run().await.unwrap();
    assert_eq!(report.batches_total, 3);
    assert_eq!(report.similarity_edges, 1);
    assert_eq!(
        fixture.graph.similarity_edges.lock().unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_missing_vector_index_aborts_before_writes() {
    let fixture = fixture();
    fixture.graph.existing_indexes.lock().unwrap().clear();

    let result = fixture.pipeline().run().await;
    assert!(result.is_err());

    // nothing was written
    assert!(fixture.graph.similarity_edges.lock().unwrap().is_empty());
    assert!(fixture.graph.connection_edges.lock().unwrap().is_empty());
    assert!(fixture
        .documents
        .relationship_documents
        .lock()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_invalid_weights_rejected_before_writes() {
    let mut fixture = fixture();
    fixture
        .config
        .similarity
        .weights
        .insert("vector".to_string(), 0.9);

    let result = fixture.pipeline().run().await;
    assert!(result.is_err());
    assert!(fixture
        .documents
        .relationship_documents
        .lock()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_transient_store_outage_recovers_via_retry() {
    let fixture = fixture();
    fixture.documents.fail_next_calls(1);

    let report = fixture.pipeline().run().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.documents_written, 3);
}

#[tokio::test]
async fn test_exhausted_retries_fail_batch_but_run_continues() {
    let mut fixture = fixture();
    fixture.config.batch.batch_size = 2;
    fixture.config.batch.max_retries = 1;
    // first bulk call and its single retry both fail, then the store heals
    fixture.documents.fail_next_calls(2);

    let report = fixture.pipeline().run().await.unwrap();
    assert_eq!(report.batches_total, 2);
    assert_eq!(report.batches_failed, 1);
    assert!(!report.is_complete());

    // the surviving batch still wrote its document
    let docs = fixture.documents.relationship_documents.lock().unwrap();
    assert_eq!(docs.len(), 1);
    assert!(docs.contains_key("p3"));
}

#[tokio::test]
async fn test_unresolvable_neighborhood_counts_gap_but_writes_document() {
    let fixture = fixture();
    let mut orphan = property_fixture("p9", 275_000.0, 2);
    orphan.neighborhood_id = Some("ghost".to_string());
    fixture.documents.add_property(orphan);

    let report = fixture.pipeline().run().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.resolution_gaps, 1);

    let docs = fixture.documents.relationship_documents.lock().unwrap();
    let doc = docs.get("p9").unwrap();
    assert!(doc.neighborhood.is_none());
    assert!(doc.articles.is_empty());
}
