//! Persisted Outputs
//!
//! The four record types an enrichment run writes: similarity edges,
//! neighborhood connection edges, topic clusters, and denormalized
//! relationship documents. Each carries a deterministic upsert key so a
//! re-run replaces the previous version instead of duplicating it.

use crate::error::{EnrichmentError, EnrichmentResult};
use crate::records::{PropertyType, RelationshipKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn check_unit_range(name: &str, value: f64) -> EnrichmentResult<()> {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        return Err(EnrichmentError::ScoreOutOfRange {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

/// Order two entity ids canonically so an unordered pair has one key.
pub fn canonical_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// A weighted similarity edge between two properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub property_a: String,
    pub property_b: String,
    pub composite_score: f64,
    /// Named sub-scores that went into the composite, for explainability
    pub sub_scores: BTreeMap<String, f64>,
    pub shared_features: Vec<String>,
    pub reasons: Vec<String>,
    pub method: String,
}

impl SimilarityEdge {
    /// Build an edge with endpoints in canonical order.
    ///
    /// Rejects self-pairs and out-of-range composite scores.
    pub fn new(
        a: &str,
        b: &str,
        composite_score: f64,
        sub_scores: BTreeMap<String, f64>,
        shared_features: Vec<String>,
        reasons: Vec<String>,
        method: impl Into<String>,
    ) -> EnrichmentResult<Self> {
        if a == b {
            return Err(EnrichmentError::InvalidRecord(format!(
                "similarity edge endpoints must differ: {}",
                a
            )));
        }
        check_unit_range("composite_score", composite_score)?;

        let (property_a, property_b) = canonical_pair(a, b);
        Ok(Self {
            property_a,
            property_b,
            composite_score,
            sub_scores,
            shared_features,
            reasons,
            method: method.into(),
        })
    }

    /// Deterministic upsert key for the unordered pair
    pub fn key(&self) -> String {
        format!("sim:{}:{}", self.property_a, self.property_b)
    }
}

/// A connection-strength edge between two neighborhoods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEdge {
    pub neighborhood_a: String,
    pub neighborhood_b: String,
    pub connection_strength: f64,
    pub geographic_proximity: f64,
    pub lifestyle_similarity: f64,
    pub topic_overlap: f64,
    pub price_similarity: f64,
    pub distance_km: Option<f64>,
}

impl ConnectionEdge {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        a: &str,
        b: &str,
        connection_strength: f64,
        geographic_proximity: f64,
        lifestyle_similarity: f64,
        topic_overlap: f64,
        price_similarity: f64,
        distance_km: Option<f64>,
    ) -> EnrichmentResult<Self> {
        if a == b {
            return Err(EnrichmentError::InvalidRecord(format!(
                "connection edge endpoints must differ: {}",
                a
            )));
        }
        check_unit_range("connection_strength", connection_strength)?;
        check_unit_range("geographic_proximity", geographic_proximity)?;
        check_unit_range("lifestyle_similarity", lifestyle_similarity)?;
        check_unit_range("topic_overlap", topic_overlap)?;
        check_unit_range("price_similarity", price_similarity)?;
        if let Some(d) = distance_km {
            if d < 0.0 || d.is_nan() {
                return Err(EnrichmentError::InvalidRecord(format!(
                    "distance_km must be non-negative, got {}",
                    d
                )));
            }
        }

        let (neighborhood_a, neighborhood_b) = canonical_pair(a, b);
        Ok(Self {
            neighborhood_a,
            neighborhood_b,
            connection_strength,
            geographic_proximity,
            lifestyle_similarity,
            topic_overlap,
            price_similarity,
            distance_km,
        })
    }

    pub fn key(&self) -> String {
        format!("conn:{}:{}", self.neighborhood_a, self.neighborhood_b)
    }
}

/// A named cluster of neighborhoods sharing an encyclopedia topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCluster {
    pub cluster_id: String,
    pub topic: String,
    pub members: Vec<String>,
    pub member_count: usize,
    pub cluster_strength: f64,
}

impl TopicCluster {
    pub fn new(topic: &str, members: Vec<String>, cluster_strength: f64) -> EnrichmentResult<Self> {
        check_unit_range("cluster_strength", cluster_strength)?;
        Ok(Self {
            cluster_id: format!("cluster:{}", topic),
            topic: topic.to_string(),
            member_count: members.len(),
            members,
            cluster_strength,
        })
    }
}

/// Neighborhood snapshot embedded in a relationship document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedNeighborhood {
    pub id: String,
    pub name: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lifestyle_tags: Vec<String>,
}

/// Article summary embedded in a relationship document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedArticle {
    pub article_id: String,
    pub title: String,
    pub summary: String,
    pub relationship: RelationshipKind,
    pub confidence: f64,
}

/// Fully denormalized, self-contained document for one property.
///
/// The document id equals the source property id, which makes the upsert
/// idempotent. The document is a pure function of its inputs: no
/// timestamps, so re-running on unchanged data produces identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDocument {
    pub id: String,
    pub price: f64,
    pub bedrooms: u32,
    pub bathrooms: f64,
    pub square_feet: Option<u32>,
    pub property_type: PropertyType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<EmbeddedNeighborhood>,
    #[serde(default)]
    pub articles: Vec<EmbeddedArticle>,
    /// Lowercased property + neighborhood + article text, space-joined
    pub search_text: String,
}
