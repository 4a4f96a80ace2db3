//! # HomeGraph Enrichment
//!
//! The scoring engines that turn catalog records into relationships:
//!
//! - **similarity**: property-to-property edges from vector-index
//!   candidates recombined with structured attributes
//! - **connections**: all-pairs neighborhood connection strength
//! - **clusters**: topic clusters over neighborhood article correlations
//! - **batch**: two-bulk-lookup reference resolution per batch
//! - **denormalize**: self-contained relationship documents
//!
//! Engines depend on `homegraph-core` for math, records, and store
//! traits; orchestration and persistence live in `homegraph-pipeline`.

pub mod batch;
pub mod clusters;
pub mod connections;
pub mod denormalize;
pub mod similarity;

pub use batch::{BatchFetcher, BatchMaps};
pub use clusters::TopicClusterBuilder;
pub use connections::{ConnectionBatch, NeighborhoodConnectionEngine};
pub use denormalize::{DenormalizedBatch, RelationshipDenormalizer};
pub use similarity::{PropertySimilarityEngine, SimilarityBatch};
