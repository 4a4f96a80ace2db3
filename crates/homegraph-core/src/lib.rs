//! # HomeGraph Core
//!
//! Core domain layer for the HomeGraph enrichment engine: typed catalog
//! records, the four persisted output types, the pure scoring math, the
//! error taxonomy, and the abstract store collaborators.
//!
//! ## Architecture
//!
//! This crate owns the abstractions and the math; it performs no I/O of
//! its own. Engines (homegraph-enrichment) and the run driver
//! (homegraph-pipeline) depend on the traits defined here, and concrete
//! store clients are injected by the application:
//!
//! 1. Records are read once at the store boundary into the types in
//!    [`records`] and passed read-only through the engines.
//! 2. Engines produce the output types in [`outputs`], each carrying a
//!    deterministic upsert key so re-runs replace rather than duplicate.
//! 3. Writes go back out through the [`store`] traits as bulk upserts.
//!
//! ## Modules
//!
//! - [`records`]: read-only input snapshots (properties, neighborhoods,
//!   encyclopedia articles) and `GeoPoint` validation
//! - [`outputs`]: persisted outputs (similarity edges, connection edges,
//!   topic clusters, relationship documents)
//! - [`scoring`]: haversine distance, Jaccard overlap, composite scoring
//! - [`store`]: graph store / vector index / document store traits
//! - [`error`]: `EnrichmentError` taxonomy
//! - [`test_support`] (feature `test-utils`): in-memory stores + fixtures

pub mod error;
pub mod outputs;
pub mod records;
pub mod scoring;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use error::{EnrichmentError, EnrichmentResult};
pub use outputs::{
    canonical_pair, ConnectionEdge, EmbeddedArticle, EmbeddedNeighborhood, RelationshipDocument,
    SimilarityEdge, TopicCluster,
};
pub use records::{
    ArticleCorrelation, ArticleRecord, GeoPoint, NeighborhoodRecord, PriceStats, PropertyRecord,
    PropertyType, RelationshipKind,
};
pub use scoring::{CompositeScorer, WEIGHT_SUM_EPSILON};
pub use store::{DocumentStore, GraphStore, VectorIndex, VectorMatch};
