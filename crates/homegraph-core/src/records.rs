//! Input Records
//!
//! Typed snapshots of the catalog entities consumed by an enrichment run.
//! These replace the loosely-typed rows the stores hand back: records are
//! validated once at the store-read boundary and passed by reference
//! through the engines, read-only.

use crate::error::{EnrichmentError, EnrichmentResult};
use serde::{Deserialize, Serialize};

/// A latitude/longitude point with range-checked construction.
///
/// Out-of-range coordinates are a caller error; constructing a `GeoPoint`
/// is the checkpoint, so distance math never sees bad input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> EnrichmentResult<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(EnrichmentError::InvalidCoordinate(format!(
                "latitude {} outside [-90, 90]",
                latitude
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(EnrichmentError::InvalidCoordinate(format!(
                "longitude {} outside [-180, 180]",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Property type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    House,
    Condo,
    Townhouse,
    Apartment,
    Land,
    MultiFamily,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::House => "house",
            PropertyType::Condo => "condo",
            PropertyType::Townhouse => "townhouse",
            PropertyType::Apartment => "apartment",
            PropertyType::Land => "land",
            PropertyType::MultiFamily => "multi_family",
        }
    }
}

/// A listing as read from the catalog at the start of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    pub price: f64,
    pub bedrooms: u32,
    pub bathrooms: f64,
    pub square_feet: Option<u32>,
    pub property_type: PropertyType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub neighborhood_id: Option<String>,
    /// Embedding produced upstream; properties without one are skipped by
    /// the similarity engine, not treated as errors.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

impl PropertyRecord {
    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// Aggregated price statistics for a neighborhood
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

/// How an encyclopedia article relates to a neighborhood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Primary,
    Historical,
    Cultural,
    Geographic,
    Related,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Primary => "primary",
            RelationshipKind::Historical => "historical",
            RelationshipKind::Cultural => "cultural",
            RelationshipKind::Geographic => "geographic",
            RelationshipKind::Related => "related",
        }
    }
}

/// A neighborhood's link to one encyclopedia article, with the topic list
/// that article contributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleCorrelation {
    pub article_id: String,
    pub relationship: RelationshipKind,
    /// Confidence that the article genuinely describes this neighborhood
    pub confidence: f64,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// A neighborhood as read from the graph store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborhoodRecord {
    pub id: String,
    pub name: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lifestyle_tags: Vec<String>,
    /// Centroid; absent for neighborhoods not yet geocoded
    #[serde(default)]
    pub centroid: Option<GeoPoint>,
    #[serde(default)]
    pub price_stats: Option<PriceStats>,
    #[serde(default)]
    pub article_correlations: Vec<ArticleCorrelation>,
}

impl NeighborhoodRecord {
    /// Article correlations ordered by confidence, highest first, with a
    /// stable tie-break on article id.
    pub fn correlations_by_confidence(&self) -> Vec<&ArticleCorrelation> {
        let mut sorted: Vec<&ArticleCorrelation> = self.article_correlations.iter().collect();
        sorted.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.article_id.cmp(&b.article_id))
        });
        sorted
    }
}

/// An encyclopedia article as read from the document store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub topics: Option<Vec<String>>,
    #[serde(default)]
    pub relevance: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_rejects_bad_latitude() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(-90.5, 0.0).is_err());
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
    }

    #[test]
    fn test_geo_point_rejects_bad_longitude() {
        assert!(GeoPoint::new(0.0, 180.1).is_err());
        assert!(GeoPoint::new(0.0, -181.0).is_err());
    }

    #[test]
    fn test_correlations_sorted_by_confidence() {
        let hood = NeighborhoodRecord {
            id: "n1".to_string(),
            name: "Riverside".to_string(),
            city: "Austin".to_string(),
            state: "TX".to_string(),
            description: None,
            lifestyle_tags: vec![],
            centroid: None,
            price_stats: None,
            article_correlations: vec![
                ArticleCorrelation {
                    article_id: "a1".to_string(),
                    relationship: RelationshipKind::Related,
                    confidence: 0.4,
                    topics: vec![],
                },
                ArticleCorrelation {
                    article_id: "a2".to_string(),
                    relationship: RelationshipKind::Primary,
                    confidence: 0.9,
                    topics: vec![],
                },
            ],
        };

        let sorted = hood.correlations_by_confidence();
        assert_eq!(sorted[0].article_id, "a2");
        assert_eq!(sorted[1].article_id, "a1");
    }
}
