//! Batch-Scoped Reference Resolution
//!
//! Collects every foreign key a batch of properties references and
//! resolves each referenced entity type with one bulk lookup. The
//! contract is at most two bulk queries per batch, regardless of batch
//! size; a per-property fetch loop here is a regression, not an
//! implementation detail.
//!
//! The result maps are batch-scoped and discarded after the batch
//! completes. There is no process-wide cache.

use homegraph_core::error::EnrichmentResult;
use homegraph_core::records::{ArticleRecord, NeighborhoodRecord, PropertyRecord};
use homegraph_core::store::DocumentStore;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Pre-fetched reference maps for one batch
#[derive(Debug, Default)]
pub struct BatchMaps {
    pub neighborhoods: HashMap<String, NeighborhoodRecord>,
    pub articles: HashMap<String, ArticleRecord>,
}

/// Resolves a batch's neighborhood and article references in two bulk
/// lookups.
pub struct BatchFetcher {
    max_articles_per_property: usize,
}

impl BatchFetcher {
    pub fn new(max_articles_per_property: usize) -> Self {
        Self {
            max_articles_per_property,
        }
    }

    pub async fn fetch(
        &self,
        batch: &[PropertyRecord],
        store: &dyn DocumentStore,
    ) -> EnrichmentResult<BatchMaps> {
        let mut maps = BatchMaps::default();

        // Bulk query 1: every distinct neighborhood the batch references
        let neighborhood_ids: Vec<String> = batch
            .iter()
            .filter_map(|p| p.neighborhood_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if neighborhood_ids.is_empty() {
            return Ok(maps);
        }
        for record in store.fetch_neighborhoods(&neighborhood_ids).await? {
            maps.neighborhoods.insert(record.id.clone(), record);
        }

        // Bulk query 2: every distinct article those neighborhoods
        // correlate with, capped per property at the embed limit so we
        // never fetch records the denormalizer cannot use
        let article_ids: Vec<String> = maps
            .neighborhoods
            .values()
            .flat_map(|hood| {
                hood.correlations_by_confidence()
                    .into_iter()
                    .take(self.max_articles_per_property)
                    .map(|c| c.article_id.clone())
                    .collect::<Vec<_>>()
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if article_ids.is_empty() {
            return Ok(maps);
        }
        for record in store.fetch_articles(&article_ids).await? {
            maps.articles.insert(record.id.clone(), record);
        }

        debug!(
            "Batch fetch resolved {} neighborhoods, {} articles for {} properties",
            maps.neighborhoods.len(),
            maps.articles.len(),
            batch.len()
        );
        Ok(maps)
    }
}
