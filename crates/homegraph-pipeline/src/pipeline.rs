//! Enrichment Pipeline
//!
//! Top-level driver for one enrichment run:
//!
//! 1. **Preflight**: validate configuration and check that the required
//!    vector index exists. Fatal failures abort before any writes.
//! 2. **Neighborhood phase**: one whole-dataset pass computing connection
//!    edges and topic clusters, persisted with bulk upserts.
//! 3. **Batch loop**: properties in fixed-size batches; each batch is
//!    fetched, denormalized, similarity-scored, and persisted. Store
//!    failures are retried with bounded backoff; a batch that exhausts
//!    its retries is reported failed and the run continues.
//!
//! Every write is an idempotent upsert keyed by a deterministic id, so a
//! run aborted between batches leaves a consistent, resumable state.

use crate::report::RunReport;
use anyhow::{Context, Result};
use chrono::Utc;
use homegraph_config::{BatchConfig, EnrichmentConfig};
use homegraph_core::error::{EnrichmentError, EnrichmentResult};
use homegraph_core::store::{DocumentStore, GraphStore, VectorIndex};
use homegraph_enrichment::{
    BatchFetcher, NeighborhoodConnectionEngine, PropertySimilarityEngine,
    RelationshipDenormalizer, TopicClusterBuilder,
};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of one successfully processed property batch
#[derive(Debug, Default)]
struct BatchOutcome {
    properties: usize,
    documents: usize,
    similarity_edges: usize,
    resolution_gaps: usize,
    dropped_edges: usize,
}

/// Drives one enrichment run end to end.
pub struct EnrichmentPipeline {
    graph: Arc<dyn GraphStore>,
    vectors: Arc<dyn VectorIndex>,
    documents: Arc<dyn DocumentStore>,
    config: EnrichmentConfig,
}

impl EnrichmentPipeline {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        vectors: Arc<dyn VectorIndex>,
        documents: Arc<dyn DocumentStore>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            graph,
            vectors,
            documents,
            config,
        }
    }

    /// Run the full enrichment pipeline.
    ///
    /// Returns a [`RunReport`] on completion, including partial-success
    /// accounting. Errors are returned only for fatal conditions
    /// (invalid configuration, missing vector index).
    pub async fn run(&self) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        info!("Starting enrichment run");

        // Preflight: reject bad configuration and missing indexes before
        // any store writes.
        self.config
            .validate()
            .map_err(|e| EnrichmentError::configuration(e.to_string()))
            .context("configuration rejected in preflight")?;

        let mut similarity_engine = PropertySimilarityEngine::new(self.config.similarity.clone())?;
        let connection_engine = NeighborhoodConnectionEngine::new(self.config.connection.clone())?;
        let cluster_builder = TopicClusterBuilder::new(self.config.cluster.clone());
        let fetcher = BatchFetcher::new(self.config.batch.max_articles_per_property);
        let denormalizer =
            RelationshipDenormalizer::new(self.config.batch.max_articles_per_property);

        similarity_engine
            .preflight(self.graph.as_ref())
            .await
            .context("vector index preflight failed")?;

        self.run_neighborhood_phase(&connection_engine, &cluster_builder, &mut report)
            .await?;

        self.run_batch_loop(&mut similarity_engine, &fetcher, &denormalizer, &mut report)
            .await?;

        report.total_duration = start.elapsed();
        info!(
            "Enrichment run complete in {:?}: {}/{} batches ok, {} similarity edges, \
             {} connection edges, {} clusters, {} documents, {} gaps, {} dropped edges",
            report.total_duration,
            report.batches_total - report.batches_failed,
            report.batches_total,
            report.similarity_edges,
            report.connection_edges,
            report.topic_clusters,
            report.documents_written,
            report.resolution_gaps,
            report.dropped_edges,
        );
        Ok(report)
    }

    /// One-time, whole-dataset pass: neighborhood connections + topic
    /// clusters. The neighborhood set is small, so this is not batched.
    async fn run_neighborhood_phase(
        &self,
        engine: &NeighborhoodConnectionEngine,
        builder: &TopicClusterBuilder,
        report: &mut RunReport,
    ) -> Result<()> {
        let phase_start = Instant::now();

        let neighborhoods = self
            .graph
            .neighborhoods_with_articles()
            .await
            .context("failed to load neighborhoods from graph store")?;
        info!(
            "Neighborhood phase: scoring {} neighborhoods all-pairs",
            neighborhoods.len()
        );

        let connections = engine.connect_all(&neighborhoods)?;
        let clusters = builder.build(&neighborhoods)?;
        report.dropped_edges += connections.dropped;

        let persisted = async {
            with_retry(&self.config.batch, "connection edge upsert", || {
                self.graph.upsert_connection_edges(&connections.edges)
            })
            .await?;
            with_retry(&self.config.batch, "topic cluster upsert", || {
                self.graph.upsert_topic_clusters(&clusters)
            })
            .await
        }
        .await;

        match persisted {
            Ok(()) => {
                report.connection_edges = connections.edges.len();
                report.topic_clusters = clusters.len();
            }
            Err(err) if !err.is_fatal() => {
                warn!("Neighborhood phase writes failed after retries: {}", err);
                report.neighborhood_phase_failed = true;
            }
            Err(err) => return Err(err.into()),
        }

        report.neighborhood_phase_duration = phase_start.elapsed();
        debug!(
            "Neighborhood phase complete in {:?} ({} edges from {} pairs, {} clusters)",
            report.neighborhood_phase_duration,
            report.connection_edges,
            connections.pairs_scored,
            report.topic_clusters,
        );
        Ok(())
    }

    /// Sequential batch loop over the property catalog.
    async fn run_batch_loop(
        &self,
        engine: &mut PropertySimilarityEngine,
        fetcher: &BatchFetcher,
        denormalizer: &RelationshipDenormalizer,
        report: &mut RunReport,
    ) -> Result<()> {
        let property_ids = self
            .documents
            .list_property_ids()
            .await
            .context("failed to list property ids")?;
        info!(
            "Batch loop: {} properties in batches of {}",
            property_ids.len(),
            self.config.batch.batch_size
        );

        for chunk in property_ids.chunks(self.config.batch.batch_size) {
            report.batches_total += 1;
            match self
                .process_batch(chunk, engine, fetcher, denormalizer)
                .await
            {
                Ok(outcome) => {
                    report.properties_processed += outcome.properties;
                    report.documents_written += outcome.documents;
                    report.similarity_edges += outcome.similarity_edges;
                    report.resolution_gaps += outcome.resolution_gaps;
                    report.dropped_edges += outcome.dropped_edges;
                }
                Err(err) if !err.is_fatal() => {
                    warn!(
                        "Batch {} failed after retries, continuing: {}",
                        report.batches_total, err
                    );
                    report.batches_failed += 1;
                }
                Err(err) => return Err(err).context("fatal error in batch loop"),
            }
        }
        Ok(())
    }

    async fn process_batch(
        &self,
        ids: &[String],
        engine: &mut PropertySimilarityEngine,
        fetcher: &BatchFetcher,
        denormalizer: &RelationshipDenormalizer,
    ) -> EnrichmentResult<BatchOutcome> {
        let batch_start = Instant::now();
        let batch_config = &self.config.batch;

        let batch = with_retry(batch_config, "property fetch", || {
            self.documents.fetch_properties(ids)
        })
        .await?;

        let maps = with_retry(batch_config, "batch reference fetch", || {
            fetcher.fetch(&batch, self.documents.as_ref())
        })
        .await?;

        let denormalized = denormalizer.denormalize(&batch, &maps);
        with_retry(batch_config, "relationship document upsert", || {
            self.documents
                .upsert_relationship_documents(&denormalized.documents)
        })
        .await?;

        let similarity = engine
            .score_batch(&batch, self.vectors.as_ref(), self.documents.as_ref())
            .await?;
        if !similarity.edges.is_empty() {
            with_retry(batch_config, "similarity edge upsert", || {
                self.graph.upsert_similarity_edges(&similarity.edges)
            })
            .await?;
        }

        debug!(
            "Batch of {} processed in {:?} ({} documents, {} edges, {} gaps)",
            batch.len(),
            batch_start.elapsed(),
            denormalized.documents.len(),
            similarity.edges.len(),
            denormalized.gaps(),
        );

        Ok(BatchOutcome {
            properties: batch.len(),
            documents: denormalized.documents.len(),
            similarity_edges: similarity.edges.len(),
            resolution_gaps: denormalized.gaps(),
            dropped_edges: similarity.dropped,
        })
    }
}

/// Retry a bulk store operation with doubling backoff.
///
/// Only retryable errors (store unavailability) are retried; everything
/// else propagates immediately.
async fn with_retry<T, F, Fut>(
    config: &BatchConfig,
    op_name: &str,
    mut op: F,
) -> EnrichmentResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EnrichmentResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_retries => {
                attempt += 1;
                let backoff =
                    Duration::from_millis(config.retry_backoff_ms << (attempt - 1).min(16));
                warn!(
                    "{} failed ({}), retrying in {:?} (attempt {}/{})",
                    op_name, err, backoff, attempt, config.max_retries
                );
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}
