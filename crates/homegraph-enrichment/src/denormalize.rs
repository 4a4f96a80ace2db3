//! Relationship Document Assembly
//!
//! Merges each property with its pre-fetched neighborhood and article
//! records into one self-contained document. Works only from the
//! batch-scoped maps the fetcher produced; no store access happens here.
//!
//! Missing references are not errors: the document is emitted with the
//! gap left empty and the gap is counted, replacing the source system's
//! silent best-effort swallowing.

use crate::batch::BatchMaps;
use homegraph_core::outputs::{EmbeddedArticle, EmbeddedNeighborhood, RelationshipDocument};
use homegraph_core::records::{NeighborhoodRecord, PropertyRecord};
use tracing::debug;

/// Result of denormalizing one batch
#[derive(Debug, Default)]
pub struct DenormalizedBatch {
    pub documents: Vec<RelationshipDocument>,
    /// Properties referencing a neighborhood the fetch could not resolve
    pub neighborhood_gaps: usize,
    /// Article correlations whose article record was missing
    pub article_gaps: usize,
}

impl DenormalizedBatch {
    pub fn gaps(&self) -> usize {
        self.neighborhood_gaps + self.article_gaps
    }
}

/// Assembles relationship documents from pre-fetched maps.
pub struct RelationshipDenormalizer {
    max_articles_per_property: usize,
}

impl RelationshipDenormalizer {
    pub fn new(max_articles_per_property: usize) -> Self {
        Self {
            max_articles_per_property,
        }
    }

    pub fn denormalize(&self, batch: &[PropertyRecord], maps: &BatchMaps) -> DenormalizedBatch {
        let mut result = DenormalizedBatch::default();

        for property in batch {
            let neighborhood = match &property.neighborhood_id {
                Some(id) => {
                    let found = maps.neighborhoods.get(id);
                    if found.is_none() {
                        result.neighborhood_gaps += 1;
                        debug!(
                            property = %property.id,
                            neighborhood = %id,
                            "Neighborhood unresolvable, emitting partial document"
                        );
                    }
                    found
                }
                None => None,
            };

            let articles = match neighborhood {
                Some(hood) => self.select_articles(hood, maps, &mut result.article_gaps),
                None => Vec::new(),
            };

            let search_text = build_search_text(property, neighborhood, &articles);

            result.documents.push(RelationshipDocument {
                id: property.id.clone(),
                price: property.price,
                bedrooms: property.bedrooms,
                bathrooms: property.bathrooms,
                square_feet: property.square_feet,
                property_type: property.property_type,
                description: property.description.clone(),
                neighborhood: neighborhood.map(embed_neighborhood),
                articles,
                search_text,
            });
        }

        result
    }

    /// Primary article first (highest confidence), then related articles
    /// up to the configured cap.
    fn select_articles(
        &self,
        hood: &NeighborhoodRecord,
        maps: &BatchMaps,
        article_gaps: &mut usize,
    ) -> Vec<EmbeddedArticle> {
        let mut articles = Vec::new();
        for correlation in hood.correlations_by_confidence() {
            if articles.len() >= self.max_articles_per_property {
                break;
            }
            match maps.articles.get(&correlation.article_id) {
                Some(record) => articles.push(EmbeddedArticle {
                    article_id: record.id.clone(),
                    title: record.title.clone(),
                    summary: record.summary.clone(),
                    relationship: correlation.relationship,
                    confidence: correlation.confidence,
                }),
                None => *article_gaps += 1,
            }
        }
        articles
    }
}

fn embed_neighborhood(hood: &NeighborhoodRecord) -> EmbeddedNeighborhood {
    EmbeddedNeighborhood {
        id: hood.id.clone(),
        name: hood.name.clone(),
        city: hood.city.clone(),
        state: hood.state.clone(),
        description: hood.description.clone(),
        lifestyle_tags: hood.lifestyle_tags.clone(),
    }
}

/// Space-joined, lowercased concatenation of property description,
/// neighborhood description, and article summaries.
fn build_search_text(
    property: &PropertyRecord,
    neighborhood: Option<&NeighborhoodRecord>,
    articles: &[EmbeddedArticle],
) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(description) = &property.description {
        parts.push(description);
    }
    if let Some(description) = neighborhood.and_then(|h| h.description.as_deref()) {
        parts.push(description);
    }
    for article in articles {
        parts.push(&article.summary);
    }
    parts.join(" ").to_lowercase()
}
