//! # HomeGraph Configuration
//!
//! Typed configuration for the enrichment engine, loadable from TOML or
//! YAML files. This crate is the foundation layer: it depends on nothing
//! else in the workspace, and every knob the engines recognize lives
//! here with the source system's baseline as the default.
//!
//! Validation is explicit: callers load (or build) a config and must call
//! [`EnrichmentConfig::validate`] before handing it to the pipeline. The
//! weight-sum contract (each weight map sums to 1.0 ± 0.001) is enforced
//! both here and again when the scorers are constructed, so hand-built
//! configs get the same guarantee as file-loaded ones.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Tolerance for weight-sum validation
pub const WEIGHT_SUM_EPSILON: f64 = 0.001;

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "toml")]
    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "yaml")]
    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn check_weight_sum(name: &str, weights: &BTreeMap<String, f64>) -> Result<(), ConfigError> {
    for (key, weight) in weights {
        if *weight < 0.0 || weight.is_nan() {
            return Err(ConfigError::Invalid(format!(
                "{} weight '{}' must be non-negative, got {}",
                name, key, weight
            )));
        }
    }
    let sum: f64 = weights.values().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
        return Err(ConfigError::Invalid(format!(
            "{} weights must sum to 1.0 (±{}), got {:.4}",
            name, WEIGHT_SUM_EPSILON, sum
        )));
    }
    Ok(())
}

fn check_unit_range(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        return Err(ConfigError::Invalid(format!(
            "{} must be in [0,1], got {}",
            name, value
        )));
    }
    Ok(())
}

/// Property-to-property similarity knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Name of the vector index the run requires; a missing index aborts
    /// the run before any writes
    pub vector_index_name: String,
    /// Neighbors requested per k-NN query
    pub max_neighbors: usize,
    /// Raw vector-similarity floor passed to the index
    pub min_vector_similarity: f64,
    /// Composite-score threshold for emitting an edge; independent of the
    /// raw vector floor
    pub final_threshold: f64,
    /// Named weights for the composite combine (vector/price/bedrooms/location)
    pub weights: BTreeMap<String, f64>,
    /// Flat bonus applied on top of the weighted sum when both properties
    /// sit in the same neighborhood
    pub same_neighborhood_bonus: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        let mut weights = BTreeMap::new();
        weights.insert("vector".to_string(), 0.5);
        weights.insert("price".to_string(), 0.2);
        weights.insert("bedrooms".to_string(), 0.2);
        weights.insert("location".to_string(), 0.1);

        Self {
            vector_index_name: "property_embedding_idx".to_string(),
            max_neighbors: 20,
            min_vector_similarity: 0.7,
            final_threshold: 0.55,
            weights,
            same_neighborhood_bonus: 0.1,
        }
    }
}

impl SimilarityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vector_index_name.is_empty() {
            return Err(ConfigError::Invalid(
                "similarity.vector_index_name must not be empty".to_string(),
            ));
        }
        if self.max_neighbors == 0 {
            return Err(ConfigError::Invalid(
                "similarity.max_neighbors must be greater than 0".to_string(),
            ));
        }
        check_unit_range("similarity.min_vector_similarity", self.min_vector_similarity)?;
        check_unit_range("similarity.final_threshold", self.final_threshold)?;
        check_unit_range(
            "similarity.same_neighborhood_bonus",
            self.same_neighborhood_bonus,
        )?;
        check_weight_sum("similarity", &self.weights)
    }
}

/// Neighborhood connection-strength knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Connection-strength threshold for emitting an edge
    pub threshold: f64,
    /// Distance at which geographic proximity decays to zero
    pub max_distance_km: f64,
    /// Named weights (geographic/lifestyle/topics/price)
    pub weights: BTreeMap<String, f64>,
    /// Fallback proximity when centroids are missing and both
    /// neighborhoods share a city
    pub same_city_proximity: f64,
    /// Fallback proximity when centroids are missing and the cities differ
    pub different_city_proximity: f64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let mut weights = BTreeMap::new();
        weights.insert("geographic".to_string(), 0.30);
        weights.insert("lifestyle".to_string(), 0.30);
        weights.insert("topics".to_string(), 0.25);
        weights.insert("price".to_string(), 0.15);

        Self {
            threshold: 0.5,
            max_distance_km: 50.0,
            weights,
            same_city_proximity: 1.0,
            different_city_proximity: 0.3,
        }
    }
}

impl ConnectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit_range("connection.threshold", self.threshold)?;
        if self.max_distance_km <= 0.0 {
            return Err(ConfigError::Invalid(
                "connection.max_distance_km must be positive".to_string(),
            ));
        }
        check_unit_range("connection.same_city_proximity", self.same_city_proximity)?;
        check_unit_range(
            "connection.different_city_proximity",
            self.different_city_proximity,
        )?;
        check_weight_sum("connection", &self.weights)
    }
}

/// Topic clustering knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Minimum distinct neighborhoods a topic needs to form a cluster
    pub min_cluster_size: usize,
    /// Keep only the K largest clusters
    pub top_k: usize,
    /// Cluster strength is min(1.0, member_count / strength_normalizer).
    /// A carried-over constant from the source system, not a derived value.
    pub strength_normalizer: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 2,
            top_k: 20,
            strength_normalizer: 10.0,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_cluster_size == 0 {
            return Err(ConfigError::Invalid(
                "cluster.min_cluster_size must be greater than 0".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(ConfigError::Invalid(
                "cluster.top_k must be greater than 0".to_string(),
            ));
        }
        if self.strength_normalizer <= 0.0 {
            return Err(ConfigError::Invalid(
                "cluster.strength_normalizer must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Batching and retry knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Properties per processing batch
    pub batch_size: usize,
    /// Embedded-article cap per relationship document
    pub max_articles_per_property: usize,
    /// Bounded retries for a failed bulk store operation
    pub max_retries: usize,
    /// Base backoff between retries; doubles per attempt
    pub retry_backoff_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_articles_per_property: 5,
            max_retries: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.max_articles_per_property == 0 {
            return Err(ConfigError::Invalid(
                "batch.max_articles_per_property must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration consumed by the enrichment pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub similarity: SimilarityConfig,
    pub connection: ConnectionConfig,
    pub cluster: ClusterConfig,
    pub batch: BatchConfig,
}

impl EnrichmentConfig {
    /// Validate every section; the pipeline calls this in preflight,
    /// before any store writes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.similarity.validate()?;
        self.connection.validate()?;
        self.cluster.validate()?;
        self.batch.validate()?;
        Ok(())
    }

    /// Load from a TOML file
    #[cfg(feature = "toml")]
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading enrichment config from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Load from a YAML file
    #[cfg(feature = "yaml")]
    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading enrichment config from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        Ok(config)
    }
}
